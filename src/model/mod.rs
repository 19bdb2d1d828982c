//! # Codex Data Model
//!
//! Plain DTOs shared by the registry, graph, resonance and governance layers.
//! These types cross every boundary: core ↔ persistence ↔ display.
//!
//! Design rule: this module is pure data. No locks, no I/O, no async.

pub mod axis;
pub mod node;
pub mod edge;
pub mod value;
pub mod tags;
pub mod score;
pub mod field;
pub mod decision;

pub use axis::{AxisId, AxisValue, HarmonicTag, Polarity, VibrationalAxis};
pub use node::{FractalNode, NodeId, ScaleLayer};
pub use edge::{Direction, EdgeKey, PartEdge};
pub use value::Value;
pub use tags::{tags, Tags};
pub use score::{AxisContribution, Contributions, PairRelationship, ResonanceScore, ScoreScope};
pub use field::{CoherenceField, FieldKey, FieldPattern};
pub use decision::{DecisionId, GovernanceDecision, Outcome, Subject};

/// Returns true when `v` is a finite number inside the closed unit interval.
pub(crate) fn in_unit_range(v: f64) -> bool {
    v.is_finite() && (0.0..=1.0).contains(&v)
}
