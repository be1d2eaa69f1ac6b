//! The validator contract.

use confluence_core::{Candidate, Frame, RegimeSnapshot};

/// Outcome of one validator's audit.
///
/// A `Fail` is a vote against fusion eligibility; a `Veto` removes the
/// candidate outright no matter how the other validators vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(String),
    Veto(String),
}

impl Verdict {
    #[must_use]
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// An audit component filtering candidates before fusion.
///
/// Audits are CPU-bound and synchronous; anything needing I/O (like an
/// event calendar) is injected behind its own trait.
pub trait Validator: Send + Sync {
    fn name(&self) -> &'static str;

    fn audit(&self, candidate: &Candidate, frame: &Frame, regime: &RegimeSnapshot) -> Verdict;
}
