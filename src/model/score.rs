//! Resonance scores and their per-axis breakdown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::{AxisId, NodeId};

/// How much one axis contributed to a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisContribution {
    pub axis: AxisId,
    /// `1 − |Δ|` on this axis (averaged over neighbors for neighborhoods).
    pub alignment: f64,
    /// Normalized share of the total weight, in [0, 1].
    pub weight: f64,
}

/// Per-axis breakdown. Most nodes sit on a handful of axes.
pub type Contributions = SmallVec<[AxisContribution; 4]>;

/// How two profiles relate, read off their alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairRelationship {
    /// Alignment of at least 0.9.
    Harmonic,
    /// At least 0.7.
    Sympathetic,
    /// At least 0.4.
    Neutral,
    /// Below 0.4.
    Dissonant,
}

impl PairRelationship {
    pub fn from_alignment(alignment: f64) -> Self {
        if alignment >= 0.9 {
            PairRelationship::Harmonic
        } else if alignment >= 0.7 {
            PairRelationship::Sympathetic
        } else if alignment >= 0.4 {
            PairRelationship::Neutral
        } else {
            PairRelationship::Dissonant
        }
    }
}

impl std::fmt::Display for PairRelationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PairRelationship::Harmonic => write!(f, "harmonic"),
            PairRelationship::Sympathetic => write!(f, "sympathetic"),
            PairRelationship::Neutral => write!(f, "neutral"),
            PairRelationship::Dissonant => write!(f, "dissonant"),
        }
    }
}

/// What a score was computed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreScope {
    Peer(NodeId),
    Neighborhood { radius: usize },
}

/// Similarity/alignment between a subject and a peer or neighborhood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResonanceScore {
    pub subject: NodeId,
    pub scope: ScoreScope,
    /// In [0, 1]. Zero when `undefined` is set.
    pub score: f64,
    pub contributions: Contributions,
    /// No shared axes (or no contributing neighbors): the score carries no signal.
    pub undefined: bool,
    pub computed_at: DateTime<Utc>,
}

impl ResonanceScore {
    pub fn defined(subject: NodeId, scope: ScoreScope, score: f64, contributions: Contributions) -> Self {
        Self {
            subject,
            scope,
            score: score.clamp(0.0, 1.0),
            contributions,
            undefined: false,
            computed_at: Utc::now(),
        }
    }

    pub fn undefined(subject: NodeId, scope: ScoreScope) -> Self {
        Self {
            subject,
            scope,
            score: 0.0,
            contributions: Contributions::new(),
            undefined: true,
            computed_at: Utc::now(),
        }
    }

    pub fn is_undefined(&self) -> bool {
        self.undefined
    }

    /// Relationship class of the score. `None` when the score is undefined.
    pub fn relationship(&self) -> Option<PairRelationship> {
        (!self.undefined).then(|| PairRelationship::from_alignment(self.score))
    }

    /// The axis that pulled the score down the most.
    pub fn weakest_axis(&self) -> Option<&AxisContribution> {
        self.contributions
            .iter()
            .min_by(|a, b| a.alignment.partial_cmp(&b.alignment).unwrap_or(std::cmp::Ordering::Equal))
    }
}
