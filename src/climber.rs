//! The hill-climbing adaptation contract and a concrete fixed-step climber.
//!
//! The core treats a climber as opaque: it feeds every access to
//! `on_hit`/`on_miss` and, on every access, asks `adapt` for a directive. The
//! only contract obligations (spec 4.5) are that `Hold` is idempotent,
//! `amount` is never negative, and the climber never mutates cache state
//! directly — it only ever returns a directive for the core to execute.

/// What the climber wants done to the window/main boundary this round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptationKind {
    IncreaseWindow,
    DecreaseWindow,
    Hold,
}

/// A climber directive: grow/shrink the window by `amount`, or hold.
///
/// `amount` is a real-valued magnitude (fractional residue carries into the
/// policy's `window_size`/`protected_size` accumulators); it is always
/// non-negative, with direction carried by `kind`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adaptation {
    pub kind: AdaptationKind,
    pub amount: f64,
}

impl Adaptation {
    pub const HOLD: Adaptation = Adaptation {
        kind: AdaptationKind::Hold,
        amount: 0.0,
    };

    pub fn increase(amount: f64) -> Self {
        debug_assert!(amount >= 0.0, "adaptation amount must be non-negative");
        Self {
            kind: AdaptationKind::IncreaseWindow,
            amount,
        }
    }

    pub fn decrease(amount: f64) -> Self {
        debug_assert!(amount >= 0.0, "adaptation amount must be non-negative");
        Self {
            kind: AdaptationKind::DecreaseWindow,
            amount,
        }
    }
}

/// Online controller that perturbs the window/main boundary and reads back
/// hit-rate deltas to find a workload-optimal window fraction.
pub trait HillClimber {
    /// Informs the climber that `key` was a hit in `segment`.
    fn on_hit(&mut self, key: u64, segment: crate::node::Segment, is_full: bool);

    /// Informs the climber that `key` was a miss.
    fn on_miss(&mut self, key: u64, is_full: bool);

    /// Asked once per access, after the hit/miss has been reported. Returns
    /// `Hold` most of the time; periodically returns a directive based on
    /// accumulated hit-rate feedback.
    fn adapt(
        &mut self,
        window_size: f64,
        probation_size: f64,
        protected_size: f64,
        is_full: bool,
    ) -> Adaptation;
}

/// A climber that never adapts. Useful for tests that want to pin
/// `max_window`/`max_protected` and exercise the segment state machine in
/// isolation from the adaptation loop.
#[derive(Debug, Default, Clone, Copy)]
pub struct HoldClimber;

impl HillClimber for HoldClimber {
    fn on_hit(&mut self, _key: u64, _segment: crate::node::Segment, _is_full: bool) {}
    fn on_miss(&mut self, _key: u64, _is_full: bool) {}
    fn adapt(&mut self, _w: f64, _p: f64, _pr: f64, _is_full: bool) -> Adaptation {
        Adaptation::HOLD
    }
}

const STEP_DECAY_RATE: f64 = 0.98;
const STEP_PERCENT: f64 = 0.0625;
/// A hit-rate delta smaller than this is treated as noise: the climber keeps
/// decaying its step size instead of snapping to a fresh full-size step.
const STEP_RESET_THRESHOLD: f64 = 0.05;

/// Fixed-step hill climber with step decay, grounded on the teacher's
/// `TinyLfu::climb`.
///
/// Every `sample_size` accesses, it compares the hit rate observed over the
/// just-completed sample against the previous sample's hit rate. If the hit
/// rate did not regress, it keeps stepping in the same direction (decayed by
/// `STEP_DECAY_RATE`); if it regressed, it reverses direction. A hit-rate
/// swing at least `STEP_RESET_THRESHOLD` in magnitude resets the step back
/// to a full-size step (`capacity * STEP_PERCENT`) in the new direction,
/// so the climber can react quickly to a real workload shift rather than
/// crawling back up from a decayed step.
#[derive(Debug)]
pub struct SimpleHillClimber {
    capacity: usize,
    sample_size: usize,
    hits_in_sample: usize,
    misses_in_sample: usize,
    hit_rate: f64,
    step: f64,
}

impl SimpleHillClimber {
    /// Builds a climber with an explicit sample window.
    pub fn new(capacity: usize, sample_size: usize) -> Self {
        let capacity = capacity.max(1);
        let sample_size = sample_size.max(1);
        Self {
            capacity,
            sample_size,
            hits_in_sample: 0,
            misses_in_sample: 0,
            hit_rate: 0.0,
            step: -(capacity as f64) * STEP_PERCENT,
        }
    }

    /// Builds a climber with the teacher's effective cadence: one
    /// adaptation round every `capacity * 10` accesses.
    pub fn for_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self::new(capacity, capacity.saturating_mul(10).max(1))
    }

    fn due(&self) -> bool {
        self.hits_in_sample + self.misses_in_sample >= self.sample_size
    }
}

impl HillClimber for SimpleHillClimber {
    fn on_hit(&mut self, _key: u64, _segment: crate::node::Segment, _is_full: bool) {
        self.hits_in_sample = self.hits_in_sample.saturating_add(1);
    }

    fn on_miss(&mut self, _key: u64, _is_full: bool) {
        self.misses_in_sample = self.misses_in_sample.saturating_add(1);
    }

    fn adapt(
        &mut self,
        _window_size: f64,
        _probation_size: f64,
        _protected_size: f64,
        _is_full: bool,
    ) -> Adaptation {
        if !self.due() {
            return Adaptation::HOLD;
        }

        let total = self.hits_in_sample + self.misses_in_sample;
        let delta = if total == 0 {
            0.0
        } else {
            let sample_hit_rate = self.hits_in_sample as f64 / total as f64;
            let delta = sample_hit_rate - self.hit_rate;
            self.hit_rate = sample_hit_rate;
            delta
        };
        self.hits_in_sample = 0;
        self.misses_in_sample = 0;

        let direction = if delta >= 0.0 { self.step } else { -self.step };

        self.step = if delta.abs() >= STEP_RESET_THRESHOLD {
            let full_step = self.capacity as f64 * STEP_PERCENT;
            if direction >= 0.0 { full_step } else { -full_step }
        } else {
            direction * STEP_DECAY_RATE
        };

        match direction.partial_cmp(&0.0) {
            Some(std::cmp::Ordering::Greater) => Adaptation::increase(direction),
            Some(std::cmp::Ordering::Less) => Adaptation::decrease(-direction),
            _ => Adaptation::HOLD,
        }
    }
}
