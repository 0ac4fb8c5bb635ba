//! Adaptive Window-TinyLFU cache-replacement core.
//!
//! A simulator-grade implementation of a segmented admission/main cache
//! whose window-to-main size ratio is continuously retuned by a
//! hill-climbing controller in response to the live workload: a
//! fixed-capacity keyspace, three LRU segments (window / probation /
//! protected), a frequency-sketch-based admission filter consumed only
//! through the [`Admittor`] contract, and an online optimiser ([`HillClimber`])
//! that perturbs the segment boundary and reads back the effect on hit
//! rate.
//!
//! This crate is the core state machine only. Trace parsing, a
//! production-grade frequency sketch, stats aggregation/reporting, and
//! configuration loading are all external collaborators the enclosing
//! simulator harness owns; this crate consumes them only through the
//! [`Admittor`] and [`HillClimber`] traits.
//!
//! # Concurrency
//!
//! [`WindowTinyLfu`] is single-threaded and offline: `record` runs to
//! completion before the next call, with no interior mutability beyond
//! plain `&mut self`. There is no thread-safe variant — that is explicitly
//! out of scope.
//!
//! # Example
//!
//! ```
//! use wtinylfu_core::{AlwaysAdmitCandidate, HoldClimber, WindowTinyLfu, WindowTinyLfuConfig};
//!
//! let config = WindowTinyLfuConfig::new(100, 0.9, 0.8);
//! let mut policy = WindowTinyLfu::new(config, AlwaysAdmitCandidate, HoldClimber).unwrap();
//!
//! for key in 0..200 {
//!     policy.record(key);
//! }
//!
//! let report = policy.finished();
//! assert!(report.stats.total_accesses() == 200);
//! ```

pub mod admittor;
pub mod climber;
pub mod error;
pub mod list;
pub mod node;
pub mod policy;
pub mod stats;

pub use admittor::{Admittor, AlwaysAdmitCandidate, AlwaysAdmitVictim, CountingAdmittor};
pub use climber::{Adaptation, AdaptationKind, HillClimber, HoldClimber, SimpleHillClimber};
pub use error::PolicyError;
pub use node::{Node, Segment};
pub use policy::{WindowTinyLfu, WindowTinyLfuConfig};
pub use stats::{FinalReport, PolicyStats};
