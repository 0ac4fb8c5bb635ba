//! Error types.
//!
//! Per-access invariant violations are programmer errors with no recoverable
//! failure mode (spec section 7): the crate formats them into
//! [`PolicyError::InvariantViolation`] and hands that straight to `panic!` —
//! it never returns the variant to a caller. The only variant a caller can
//! actually receive is [`PolicyError::InvalidConfig`], raised once, at
//! construction, before any cache state exists.

use std::fmt;

/// Error conditions surfaced by the policy core.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum PolicyError {
    /// One of invariants I1-I7 (spec section 3) failed to hold. Always
    /// fatal; the crate panics with this before returning it anywhere.
    InvariantViolation {
        invariant: &'static str,
        expected: i64,
        actual: i64,
    },

    /// Construction-time parameter validation failure (e.g. `capacity == 0`,
    /// `initial_percent_main` outside `(0, 1]`). Recoverable: the caller
    /// (typically a harness resolving configuration) can report this and
    /// decline to run, without ever having called `record`.
    InvalidConfig(String),
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvariantViolation {
                invariant,
                expected,
                actual,
            } => write!(
                f,
                "invariant {invariant} violated: expected {expected}, observed {actual}"
            ),
            Self::InvalidConfig(message) => write!(f, "invalid configuration: {message}"),
        }
    }
}

impl std::error::Error for PolicyError {}

impl From<anyhow::Error> for PolicyError {
    fn from(err: anyhow::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

impl PolicyError {
    #[must_use]
    pub fn invariant(invariant: &'static str, expected: i64, actual: i64) -> Self {
        Self::InvariantViolation {
            invariant,
            expected,
            actual,
        }
    }

    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}
