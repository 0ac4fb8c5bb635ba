//! The frequency-sketch admission filter contract.
//!
//! The core never inspects sketch internals — it only ever calls
//! [`Admittor::record`] (once per access, before classification) and
//! [`Admittor::admit`] (once per forced eviction, to decide candidate vs.
//! victim). A production-grade implementation (count-min sketch + Bloom
//! doorkeeper) is an external collaborator referenced only by this
//! contract; the stubs below exist so the crate is independently testable.

/// Frequency-sketch-based admission filter, consumed behind its interface.
pub trait Admittor {
    /// Informs the sketch that `key` was referenced. Called once per access,
    /// before the key is classified as a hit or a miss.
    fn record(&mut self, key: u64);

    /// Answers "should `candidate` replace `victim`?"
    ///
    /// `true` means the candidate should be kept and the victim evicted;
    /// `false` means the victim survives and the candidate is evicted
    /// instead, even though the candidate was the one just promoted out of
    /// the window.
    fn admit(&mut self, candidate: u64, victim: u64) -> bool;
}

/// Always prefers the candidate. Used by the forced-eviction and adaptation
/// end-to-end scenarios, which specify "a stub admittor that always admits
/// the candidate".
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysAdmitCandidate;

impl Admittor for AlwaysAdmitCandidate {
    #[inline]
    fn record(&mut self, _key: u64) {}

    #[inline]
    fn admit(&mut self, _candidate: u64, _victim: u64) -> bool {
        true
    }
}

/// Always prefers the victim, i.e. never admits a new candidate over an
/// existing resident. Useful for exercising the "candidate is the loser"
/// eviction path in isolation.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysAdmitVictim;

impl Admittor for AlwaysAdmitVictim {
    #[inline]
    fn record(&mut self, _key: u64) {}

    #[inline]
    fn admit(&mut self, _candidate: u64, _victim: u64) -> bool {
        false
    }
}

/// A minimal reference-frequency admittor: a per-key saturating access
/// counter, admitting whichever of candidate/victim has been seen more
/// often (ties favor the victim, matching a real sketch's conservative
/// tie-break). This is deliberately not a production sketch — no hashing,
/// no fixed memory bound, no decay — just enough frequency sensitivity for
/// tests that want admission to depend on access history instead of being
/// unconditional.
#[derive(Debug, Default)]
pub struct CountingAdmittor {
    counts: std::collections::HashMap<u64, u32>,
}

impl CountingAdmittor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frequency(&self, key: u64) -> u32 {
        self.counts.get(&key).copied().unwrap_or(0)
    }
}

impl Admittor for CountingAdmittor {
    fn record(&mut self, key: u64) {
        let count = self.counts.entry(key).or_insert(0);
        *count = count.saturating_add(1);
    }

    fn admit(&mut self, candidate: u64, victim: u64) -> bool {
        self.frequency(candidate) > self.frequency(victim)
    }
}
