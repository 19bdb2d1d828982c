//! Part/whole edge in the fractal graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::NodeId;

/// Traversal direction along part/whole edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Whole → parts (hasPart).
    HasPart,
    /// Part → wholes (isPartOf).
    IsPartOf,
    Both,
}

/// Identity of an edge: the (parent, child) pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    pub parent: NodeId,
    pub child: NodeId,
}

impl EdgeKey {
    pub fn new(parent: impl Into<NodeId>, child: impl Into<NodeId>) -> Self {
        Self { parent: parent.into(), child: child.into() }
    }
}

impl std::fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}", self.parent, self.child)
    }
}

/// A hasPart/isPartOf pair, stored once and indexed from both endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartEdge {
    pub parent: NodeId,
    pub child: NodeId,
    /// Reach weight in (0, 1]. Logical removal lowers it to the floor.
    pub weight: f64,
    /// Endpoints sit on different scale layers (self-similarity analog).
    pub cross_layer: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PartEdge {
    pub fn new(parent: NodeId, child: NodeId, cross_layer: bool) -> Self {
        let now = Utc::now();
        Self { parent, child, weight: 1.0, cross_layer, created_at: now, updated_at: now }
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey { parent: self.parent.clone(), child: self.child.clone() }
    }
}
