//! Governance decisions: amplify, maintain or fade. Nothing is ever deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Contributions, EdgeKey, NodeId};

/// Sequential decision identifier, assigned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DecisionId(pub u64);

impl std::fmt::Display for DecisionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "decision-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Amplify,
    Maintain,
    Fade,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Amplify => write!(f, "amplify"),
            Outcome::Maintain => write!(f, "maintain"),
            Outcome::Fade => write!(f, "fade"),
        }
    }
}

/// What a decision is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Subject {
    Node(NodeId),
    Relationship(EdgeKey),
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subject::Node(id) => write!(f, "node {id}"),
            Subject::Relationship(key) => write!(f, "edge {key}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceDecision {
    pub id: DecisionId,
    pub subject: Subject,
    pub outcome: Outcome,
    /// The resonance score the outcome was derived from.
    pub basis_score: f64,
    /// The basis had no signal (isolated subject or no shared axes).
    pub undefined_basis: bool,
    /// Per-axis rationale, copied from the basis score.
    pub rationale: Contributions,
    pub weight_before: f64,
    pub weight_after: f64,
    /// Trust in the outcome: the basis score plus a bonus for the number of
    /// participants behind it, in [0, 1].
    #[serde(default)]
    pub confidence: f64,
    pub decided_at: DateTime<Utc>,
}
