//! Outcome records for the append-only performance ledger.
//!
//! One record per resolved signal. Records are immutable once written;
//! the adaptive learner is their only consumer.

use crate::candidate::SignalDirection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Realized result of a trade taken on a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeOutcome {
    Win,
    Loss,
    Breakeven,
}

/// Snapshot of one specialist's vote at signal time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentVote {
    pub agent_id: String,
    pub strategy_name: String,
    pub direction: SignalDirection,
    pub confidence: f64,
}

/// Snapshot of one validator's verdict at signal time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorVote {
    pub name: String,
    pub passed: bool,
}

/// One signal-to-result pair, appended when the caller reports the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub signal_id: String,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub direction: SignalDirection,
    pub agent_votes: Vec<AgentVote>,
    pub validator_votes: Vec<ValidatorVote>,
    pub outcome: TradeOutcome,
    pub profit_pips: f64,
}

impl OutcomeRecord {
    /// Returns true when `strategy` voted on this signal.
    #[must_use]
    pub fn involves(&self, strategy: &str) -> bool {
        self.agent_votes
            .iter()
            .any(|vote| vote.strategy_name == strategy)
            || self.validator_votes.iter().any(|vote| vote.name == strategy)
    }

    /// Agent votes that agreed with the signal's actual direction.
    pub fn aligned_votes(&self) -> impl Iterator<Item = &AgentVote> {
        self.agent_votes
            .iter()
            .filter(|vote| vote.direction == self.direction)
    }
}
