//! The three-segment LRU state machine: admission, promotion, demotion,
//! eviction, and the resize executor that the hill climber drives.
//!
//! This is the core of the crate (spec sections 3-4), generalized from the
//! teacher's hard-wired `TinyLfu` (LRU window + SLRU main) into explicit
//! window/probation/protected segments behind pluggable [`Admittor`] and
//! [`HillClimber`] implementations.

use std::collections::HashMap;

use crate::admittor::Admittor;
use crate::climber::{AdaptationKind, HillClimber};
use crate::error::PolicyError;
use crate::list::SegmentList;
use crate::node::{Node, Segment};
use crate::stats::{FinalReport, PolicyStats};

/// Already-resolved construction scalars (spec section 6). No file/CLI
/// parsing happens here — that is the enclosing harness's job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowTinyLfuConfig {
    pub capacity: usize,
    /// Fraction of `capacity` initially assigned to main (protected +
    /// probation); window gets the remainder. Must be in `(0, 1]`.
    pub initial_percent_main: f64,
    /// Fraction of main initially assigned to protected. Must be in `[0, 1]`.
    pub percent_main_protected: f64,
}

impl WindowTinyLfuConfig {
    pub fn new(capacity: usize, initial_percent_main: f64, percent_main_protected: f64) -> Self {
        Self {
            capacity,
            initial_percent_main,
            percent_main_protected,
        }
    }

    fn validate(&self) -> Result<(), PolicyError> {
        self.validate_inner().map_err(PolicyError::from)
    }

    /// Built on `anyhow`, matching the teacher's construction/validation
    /// idiom (`anyhow::Result` internally, converted at the crate boundary
    /// via `From<anyhow::Error> for PolicyError`).
    fn validate_inner(&self) -> anyhow::Result<()> {
        if self.capacity == 0 {
            return Err(anyhow::anyhow!("capacity must be positive"));
        }
        if !(self.initial_percent_main > 0.0 && self.initial_percent_main <= 1.0) {
            return Err(anyhow::anyhow!("initial_percent_main must be in (0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.percent_main_protected) {
            return Err(anyhow::anyhow!("percent_main_protected must be in [0, 1]"));
        }
        Ok(())
    }
}

/// The adaptive Window-TinyLFU segmented cache-replacement core.
///
/// Single-threaded, offline-simulator semantics throughout: `record` runs to
/// completion before the next call, with no suspension points (spec
/// section 5).
pub struct WindowTinyLfu<A: Admittor, C: HillClimber> {
    capacity: usize,
    max_window: usize,
    max_protected: usize,
    window_size: f64,
    protected_size: f64,
    initial_percent_main: f64,

    window: SegmentList<u64>,
    probation: SegmentList<u64>,
    protected: SegmentList<u64>,
    directory: HashMap<u64, Node>,

    admittor: A,
    climber: C,
    stats: PolicyStats,
}

impl<A: Admittor, C: HillClimber> WindowTinyLfu<A, C> {
    /// Builds a new policy instance. Fails only on malformed configuration
    /// (spec section 7) — never mid-run.
    pub fn new(config: WindowTinyLfuConfig, admittor: A, climber: C) -> Result<Self, PolicyError> {
        config.validate()?;

        let capacity = config.capacity;
        let max_main = (capacity as f64 * config.initial_percent_main).floor() as usize;
        let max_main = max_main.min(capacity);
        let max_protected = (max_main as f64 * config.percent_main_protected).floor() as usize;
        let max_window = capacity - max_main;

        log::debug!(
            "WindowTinyLfu created: capacity={capacity}, max_window={max_window}, \
             max_main={max_main}, max_protected={max_protected}"
        );

        Ok(Self {
            capacity,
            max_window,
            max_protected,
            window_size: 0.0,
            protected_size: 0.0,
            initial_percent_main: config.initial_percent_main,
            window: SegmentList::new(max_window.max(1)),
            probation: SegmentList::new(max_main.max(1)),
            protected: SegmentList::new(max_protected.max(1)),
            directory: HashMap::with_capacity(capacity),
            admittor,
            climber,
            stats: PolicyStats::new(),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.directory.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.directory.is_empty()
    }

    #[inline]
    pub fn max_window(&self) -> usize {
        self.max_window
    }

    #[inline]
    pub fn max_protected(&self) -> usize {
        self.max_protected
    }

    #[inline]
    pub fn max_main(&self) -> usize {
        self.capacity - self.max_window
    }

    #[inline]
    pub fn stats(&self) -> &PolicyStats {
        &self.stats
    }

    /// Ingests one access. Mirrors spec section 4.4's six-step `record`.
    pub fn record(&mut self, key: u64) {
        let is_full = self.directory.len() >= self.capacity;
        self.admittor.record(key);

        let classified_segment = match self.directory.get(&key).and_then(|n| n.segment) {
            Some(segment) => {
                self.on_hit(key);
                self.stats.record_hit();
                Some(segment)
            }
            None => {
                self.on_miss(key);
                self.stats.record_miss();
                None
            }
        };

        self.climb(key, classified_segment, is_full);
        self.assert_invariants();
    }

    fn on_miss(&mut self, key: u64) {
        let index = self.window.append_to_tail(key);
        self.directory.insert(
            key,
            Node {
                segment: Some(Segment::Window),
                index: Some(index),
            },
        );
        self.window_size += 1.0;
        self.evict();
    }

    fn on_hit(&mut self, key: u64) {
        let Some(segment) = self.directory.get(&key).and_then(|n| n.segment) else {
            let err = PolicyError::invariant("on_hit-directory-entry", 1, 0);
            log::error!("{err}: key={key}");
            panic!("{err}");
        };

        match segment {
            Segment::Window => {
                let index = self.node_index(key);
                self.window.move_to_tail(index);
            }
            Segment::Probation => {
                let index = self.node_index(key);
                self.probation.remove(index);
                let new_index = self.protected.append_to_tail(key);
                self.relocate(key, Segment::Protected, new_index);
                self.protected_size += 1.0;
                self.demote_protected();
            }
            Segment::Protected => {
                let index = self.node_index(key);
                self.protected.move_to_tail(index);
            }
        }
    }

    /// If protected is over its budget, slides its LRU resident back to
    /// probation. At most one node demoted per call; invariant I5 keeps
    /// pace because insertion always precedes demotion (spec 4.4).
    fn demote_protected(&mut self) {
        if self.protected_size <= self.max_protected as f64 {
            return;
        }
        if let Some(key) = self.protected.pop_head() {
            log::trace!("demote_protected: key={key} back to probation");
            let new_index = self.probation.append_to_tail(key);
            self.relocate(key, Segment::Probation, new_index);
            self.protected_size -= 1.0;
        }
    }

    /// Called after every `on_miss` insertion. `window_size` may be up to
    /// `max_window + 1` on entry (spec 4.4).
    fn evict(&mut self) {
        if self.window_size <= self.max_window as f64 {
            return;
        }

        let Some(candidate) = self.window.pop_head() else {
            return;
        };
        self.window_size -= 1.0;
        let index = self.probation.append_to_tail(candidate);
        self.relocate(candidate, Segment::Probation, index);

        if self.directory.len() <= self.capacity {
            return;
        }

        let loser = match self.probation.head().copied() {
            Some(victim) if victim != candidate => {
                if self.admittor.admit(candidate, victim) {
                    victim
                } else {
                    candidate
                }
            }
            _ => candidate,
        };
        log::debug!("evict: candidate={candidate}, loser={loser}");
        self.evict_resident(loser);
    }

    fn evict_resident(&mut self, key: u64) {
        let Some(node) = self.directory.remove(&key) else {
            log::warn!("evict_resident: key={key} already absent from directory");
            return;
        };
        if let (Some(segment), Some(index)) = (node.segment, node.index) {
            self.segment_list_mut(segment).remove(index);
        }
        self.stats.record_eviction();
        log::trace!("evict_resident: key={key} removed, segment={:?}", node.segment);
    }

    /// Dispatches one access to the climber and executes the directive it
    /// returns (spec 4.6).
    fn climb(&mut self, key: u64, segment: Option<Segment>, is_full: bool) {
        match segment {
            Some(segment) => self.climber.on_hit(key, segment, is_full),
            None => self.climber.on_miss(key, is_full),
        }

        let probation_size = self.capacity as f64 - self.window_size - self.protected_size;
        let adaptation =
            self.climber
                .adapt(self.window_size, probation_size, self.protected_size, is_full);

        match adaptation.kind {
            AdaptationKind::Hold => {}
            AdaptationKind::IncreaseWindow => self.increase_window(adaptation.amount),
            AdaptationKind::DecreaseWindow => self.decrease_window(adaptation.amount),
        }
    }

    /// Grows window at protected's expense. No-op if protected has no
    /// budget to donate (spec 4.6).
    ///
    /// `quota` is clamped both by the protected budget and by the number of
    /// main residents actually available to move (`probation.len() +
    /// protected.len()`) — a climber is only required to keep `amount`
    /// non-negative (spec 4.5), so a directive can arrive asking to move
    /// more nodes than currently exist in main. Without this second clamp,
    /// `window_size` would advance past what the transfer loop can realize
    /// and the post-call invariant audit would see a residency count that
    /// doesn't match it.
    fn increase_window(&mut self, amount: f64) {
        if self.max_protected == 0 || amount <= 0.0 {
            return;
        }

        let available = (self.probation.len() + self.protected.len()) as f64;
        let quota = amount.min(self.max_protected as f64).min(available);
        let steps = (self.window_size + quota).floor() as i64 - self.window_size.floor() as i64;
        self.window_size += quota;

        log::debug!(
            "increase_window: amount={amount}, quota={quota}, steps={steps}, max_window={} -> {}",
            self.max_window,
            self.max_window + steps.max(0) as usize
        );

        for _ in 0..steps.max(0) {
            self.max_window += 1;
            self.max_protected -= 1;
            self.demote_protected();

            let Some(key) = self.probation.pop_head() else {
                log::warn!("increase_window: probation ran dry before the full quota was moved");
                break;
            };
            let index = self.window.append_to_tail(key);
            self.relocate(key, Segment::Window, index);
        }

        self.assert_invariants();
    }

    /// Shrinks window in favor of protected. No-op if window has no budget
    /// to donate (spec 4.6). Transferred nodes land at the probation
    /// **head** (LRU end) — a deliberate asymmetry versus `evict` and
    /// `increase_window`, which both use the tail. See spec section 9.
    ///
    /// `quota` is clamped both by the window budget and by the number of
    /// residents actually in the window (`window.len()`), for the same
    /// reason as `increase_window` above.
    fn decrease_window(&mut self, amount: f64) {
        if self.max_window == 0 || amount <= 0.0 {
            return;
        }

        let available = self.window.len() as f64;
        let quota = amount.min(self.max_window as f64).min(available);
        let steps = self.window_size.floor() as i64 - (self.window_size - quota).floor() as i64;
        self.window_size -= quota;

        log::debug!(
            "decrease_window: amount={amount}, quota={quota}, steps={steps}, max_window={} -> {}",
            self.max_window,
            self.max_window.saturating_sub(steps.max(0) as usize)
        );

        for _ in 0..steps.max(0) {
            self.max_window -= 1;
            self.max_protected += 1;

            let Some(key) = self.window.pop_head() else {
                log::warn!("decrease_window: window ran dry before the full quota was moved");
                break;
            };
            let index = self.probation.append_to_head(key);
            self.relocate(key, Segment::Probation, index);
        }

        self.assert_invariants();
    }

    /// End-of-run invariant audit and final stat commit (spec 4.7).
    ///
    /// Recounts actual segment sizes by walking the directory's owning
    /// lists and asserts I3/I4/I5 plus the probation-size identity; any
    /// violation is fatal (programmer error), surfaced as a panic rather
    /// than returned, matching spec section 7.
    pub fn finished(&mut self) -> FinalReport {
        self.assert_invariants();

        let actual_window = self.window.len();
        let actual_protected = self.protected.len();
        let actual_probation = self.probation.len();

        let expected_probation = self.directory.len() as i64 - actual_window as i64 - actual_protected as i64;
        if actual_probation as i64 != expected_probation {
            let err = PolicyError::invariant(
                "probation-size-identity",
                expected_probation,
                actual_probation as i64,
            );
            log::error!("{err}");
            panic!("{err}");
        }

        let percent_adaptation = (self.max_window as f64 / self.capacity as f64)
            - (1.0 - self.initial_percent_main);

        log::debug!(
            "finished: hits={}, misses={}, evictions={}, percent_adaptation={percent_adaptation:.4}",
            self.stats.hits,
            self.stats.misses,
            self.stats.evictions,
        );

        FinalReport {
            stats: self.stats,
            percent_adaptation,
            actual_window,
            actual_probation,
            actual_protected,
        }
    }

    /// Cheap, O(1) check of I3 (directory size within capacity), I4/I5
    /// (fractional sizes track actual segment membership), and the
    /// `max_protected <= max_main` half of I2. Run after every `record` and
    /// every resize (spec design note: "keep them on even in release
    /// builds; the cost is negligible").
    fn assert_invariants(&self) {
        if self.directory.len() > self.capacity {
            let err = PolicyError::invariant("I3", self.capacity as i64, self.directory.len() as i64);
            log::error!("{err}");
            panic!("{err}");
        }
        if self.max_protected > self.max_main() {
            let err = PolicyError::invariant("I2", self.max_main() as i64, self.max_protected as i64);
            log::error!("{err}");
            panic!("{err}");
        }
        let expected_window = self.window_size.floor() as i64;
        let actual_window = self.window.len() as i64;
        if expected_window != actual_window {
            let err = PolicyError::invariant("I4", expected_window, actual_window);
            log::error!("{err}");
            panic!("{err}");
        }
        let expected_protected = self.protected_size.floor() as i64;
        let actual_protected = self.protected.len() as i64;
        if expected_protected != actual_protected {
            let err = PolicyError::invariant("I5", expected_protected, actual_protected);
            log::error!("{err}");
            panic!("{err}");
        }
    }

    fn node_index(&self, key: u64) -> dlv_list::Index<u64> {
        match self.directory.get(&key).and_then(|n| n.index) {
            Some(index) => index,
            None => {
                let err = PolicyError::invariant("node-index-present", 1, 0);
                log::error!("{err}: key={key}");
                panic!("{err}");
            }
        }
    }

    fn relocate(&mut self, key: u64, segment: Segment, index: dlv_list::Index<u64>) {
        if let Some(node) = self.directory.get_mut(&key) {
            node.segment = Some(segment);
            node.index = Some(index);
        }
    }

    fn segment_list_mut(&mut self, segment: Segment) -> &mut SegmentList<u64> {
        match segment {
            Segment::Window => &mut self.window,
            Segment::Probation => &mut self.probation,
            Segment::Protected => &mut self.protected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admittor::AlwaysAdmitCandidate;
    use crate::climber::HoldClimber;

    fn policy(
        capacity: usize,
        initial_percent_main: f64,
        percent_main_protected: f64,
    ) -> WindowTinyLfu<AlwaysAdmitCandidate, HoldClimber> {
        WindowTinyLfu::new(
            WindowTinyLfuConfig::new(capacity, initial_percent_main, percent_main_protected),
            AlwaysAdmitCandidate,
            HoldClimber,
        )
        .unwrap()
    }

    // Scenario 1: cold fill then re-access.
    #[test]
    fn cold_fill_then_reaccess_has_no_evictions() {
        let mut p = policy(3, 0.5, 0.5);
        for key in [1, 2, 3, 1, 2, 3] {
            p.record(key);
        }
        let report = p.finished();
        assert_eq!(report.stats.misses, 3);
        assert_eq!(report.stats.hits, 3);
        assert_eq!(report.stats.evictions, 0);
        assert_eq!(p.len(), 3);
        let mut keys: Vec<_> = p.directory.keys().copied().collect();
        keys.sort_unstable();
        assert_eq!(keys, vec![1, 2, 3]);
    }

    // Scenario 2: forced eviction, insertion order decides the loser.
    #[test_log::test]
    fn forced_eviction_evicts_oldest_first() {
        let mut p = policy(2, 0.5, 0.5);
        for key in [1, 2, 3] {
            p.record(key);
        }
        let report = p.finished();
        assert_eq!(report.stats.misses, 3);
        assert_eq!(report.stats.evictions, 1);
        let mut keys: Vec<_> = p.directory.keys().copied().collect();
        keys.sort_unstable();
        assert_eq!(keys, vec![2, 3]);
    }

    // Scenario 3: promotion within window via move-to-tail, no evictions.
    #[test]
    fn repeated_window_hits_do_not_evict() {
        let mut p = policy(4, 0.5, 1.0);
        for key in [1, 2, 3, 4, 3, 3] {
            p.record(key);
        }
        let report = p.finished();
        assert_eq!(report.stats.misses, 4);
        assert_eq!(report.stats.hits, 2);
        assert_eq!(report.stats.evictions, 0);
    }

    // Scenario 4: probation -> protected promotion with no demotion since
    // protected is still within budget.
    #[test]
    fn probation_promotes_to_protected() {
        let mut p = policy(3, 0.67, 0.5);
        assert_eq!(p.max_window(), 1);
        assert_eq!(p.max_protected(), 1);

        for key in [1, 2, 3, 1] {
            p.record(key);
        }
        let report = p.finished();
        assert_eq!(report.stats.misses, 3);
        assert_eq!(report.stats.hits, 1);
        assert_eq!(
            p.directory.get(&1).and_then(|n| n.segment),
            Some(Segment::Protected)
        );
    }

    #[test]
    fn zero_protected_budget_demotes_immediately() {
        // percent_main_protected = 0: promotions must no-op gracefully.
        let mut p = policy(3, 0.66, 0.0);
        assert_eq!(p.max_protected(), 0);
        for key in [1, 2, 3, 1] {
            p.record(key);
        }
        // Node 1 was promoted then immediately demoted back to probation.
        assert_eq!(
            p.directory.get(&1).and_then(|n| n.segment),
            Some(Segment::Probation)
        );
        p.finished();
    }

    #[test]
    fn reaccessing_a_resident_key_never_evicts() {
        let mut p = policy(5, 0.5, 0.5);
        for key in [1, 2, 3, 4, 5] {
            p.record(key);
        }
        let before = p.finished().stats.evictions;
        for _ in 0..20 {
            p.record(1);
        }
        let after = p.stats().evictions;
        assert_eq!(before, after);
    }

    #[test]
    fn capacity_of_one_does_not_panic() {
        let mut p = policy(1, 1.0, 0.0);
        for key in 0..50 {
            p.record(key);
        }
        assert_eq!(p.len(), 1);
        p.finished();
    }

    #[test]
    fn capacity_of_two_and_three_do_not_panic() {
        for capacity in [2usize, 3] {
            let mut p = policy(capacity, 0.5, 0.5);
            for key in 0..50 {
                p.record(key);
            }
            assert_eq!(p.len(), capacity);
            p.finished();
        }
    }

    #[test]
    fn initial_percent_main_of_one_has_no_window() {
        let mut p = policy(4, 1.0, 0.5);
        assert_eq!(p.max_window(), 0);
        for key in 0..20 {
            p.record(key);
        }
        p.finished();
    }

    #[test]
    fn hit_plus_miss_equals_total_accesses() {
        let mut p = policy(4, 0.5, 0.5);
        let keys = [1, 2, 3, 4, 1, 5, 2, 6, 7, 1];
        for key in keys {
            p.record(key);
        }
        let report = p.finished();
        assert_eq!(report.stats.total_accesses(), keys.len() as u64);
        assert!(report.stats.misses >= report.stats.evictions);
    }

    // Scenario 5: adaptation grow.
    #[test_log::test]
    fn increase_window_grows_at_protected_expense() {
        let mut p = policy(3, 0.67, 0.5);
        for key in [1, 2, 3, 1] {
            p.record(key);
        }
        assert_eq!(p.max_window(), 1);
        assert_eq!(p.max_protected(), 1);

        p.increase_window(1.0);

        assert_eq!(p.max_window(), 2);
        assert_eq!(p.max_protected(), 0);
        assert_eq!(p.window.len(), 2);
        assert_eq!(p.protected.len(), 0);
        assert_eq!(p.len(), 3);
    }

    // Scenario 6: adaptation shrink round-trip restores the pre-scenario-5
    // boundary, with the migrated node landing at the probation LRU end.
    #[test_log::test]
    fn decrease_window_round_trips_after_increase() {
        let mut p = policy(3, 0.67, 0.5);
        for key in [1, 2, 3, 1] {
            p.record(key);
        }
        p.increase_window(1.0);
        p.decrease_window(1.0);

        assert_eq!(p.max_window(), 1);
        assert_eq!(p.max_protected(), 1);
        assert_eq!(p.window.len(), 1);
        assert_eq!(p.len(), 3);
    }

    // P7: round-trip restores max_window exactly when no independent
    // demote_protected side effects fire.
    #[test]
    fn increase_then_decrease_restores_max_window_exactly() {
        let mut p = policy(10, 0.5, 0.5);
        for key in 0..10 {
            p.record(key);
        }
        let before = p.max_window();
        p.increase_window(2.0);
        p.decrease_window(2.0);
        assert_eq!(p.max_window(), before);
    }

    #[test]
    fn increase_window_amount_larger_than_donor_is_clamped() {
        let mut p = policy(10, 0.5, 1.0);
        for key in 0..10 {
            p.record(key);
        }
        let donor = p.max_protected();
        p.increase_window(f64::from(donor as u32) + 100.0);
        assert_eq!(p.max_protected(), 0);
        assert_eq!(p.max_window(), p.capacity);
    }

    // A climber only has to keep `amount >= 0` (spec 4.5); budget headroom
    // (max_protected/max_window) does not imply there are that many actual
    // residents to move yet. Regression test for a quota clamped only by
    // budget running the transfer loop dry while window_size/protected_size
    // had already advanced past what the loop could realize.
    #[test_log::test]
    fn increase_window_clamps_to_actual_main_residents_not_just_budget() {
        let mut p = policy(10, 0.5, 1.0);
        p.record(0);
        assert_eq!(p.max_window(), 5);
        assert_eq!(p.max_protected(), 5);

        p.increase_window(3.0);
        p.finished();
    }

    #[test_log::test]
    fn decrease_window_clamps_to_actual_window_residents_not_just_budget() {
        let mut p = policy(10, 0.5, 0.5);
        p.record(0);
        p.record(1);
        assert_eq!(p.max_window(), 5);

        p.decrease_window(3.0);
        p.finished();
    }

    #[test_log::test]
    fn fractional_adaptations_carry_across_steps() {
        let mut p = policy(20, 0.5, 1.0);
        for key in 0..20 {
            p.record(key);
        }
        let start = p.max_window();
        // Each sub-1.0 nudge should not immediately move a whole node, but
        // the fractional remainder must still accumulate in window_size
        // rather than being discarded: 4 * 0.3 crosses the next integer
        // boundary and finally moves exactly one node.
        for _ in 0..3 {
            p.increase_window(0.3);
        }
        assert_eq!(p.max_window(), start);
        p.increase_window(0.3);
        assert_eq!(p.max_window(), start + 1);
    }
}
