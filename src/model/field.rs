//! Coherence fields: aggregate resonance over a bounded neighborhood.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::NodeId;

/// Pattern classification of a field's pair-score distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldPattern {
    /// Tight distribution around a high mean.
    Harmonic,
    /// Mostly aligned, but not tightly.
    Sympathetic,
    /// No dominant signal.
    Neutral,
    /// Tight distribution around a low mean.
    Dissonant,
}

impl std::fmt::Display for FieldPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldPattern::Harmonic => write!(f, "harmonic"),
            FieldPattern::Sympathetic => write!(f, "sympathetic"),
            FieldPattern::Neutral => write!(f, "neutral"),
            FieldPattern::Dissonant => write!(f, "dissonant"),
        }
    }
}

/// Field identity: an anchor and the traversal radius around it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldKey {
    pub anchor: NodeId,
    pub radius: usize,
}

impl FieldKey {
    pub fn new(anchor: impl Into<NodeId>, radius: usize) -> Self {
        Self { anchor: anchor.into(), radius }
    }
}

impl std::fmt::Display for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.anchor, self.radius)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoherenceField {
    pub anchor: NodeId,
    pub radius: usize,
    /// Traversal order, anchor first.
    pub participants: Vec<NodeId>,
    /// Mean pairwise resonance among participants, in [0, 1].
    pub aggregate: f64,
    /// Population variance of the defined pair scores.
    pub variance: f64,
    pub pattern: FieldPattern,
    /// Graph revision the field was computed against.
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

impl CoherenceField {
    pub fn key(&self) -> FieldKey {
        FieldKey { anchor: self.anchor.clone(), radius: self.radius }
    }

    pub fn contains(&self, node: &NodeId) -> bool {
        self.participants.contains(node)
    }
}
