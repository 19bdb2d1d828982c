//! Node in the fractal concept graph.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};
use super::{AxisId, AxisValue, Tags, Value};

/// Stable node identifier. Ordered lexicographically, which is the
/// tie-break order everywhere a deterministic choice is needed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self { Self(s) }
}

/// Self-similarity tier a node lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleLayer {
    /// Quantum / biological.
    Micro,
    /// Human / cultural.
    Meso,
    /// Planetary / cosmic.
    Macro,
    /// Transcendent / holographic.
    Meta,
}

impl ScaleLayer {
    pub const ALL: [ScaleLayer; 4] = [
        ScaleLayer::Micro,
        ScaleLayer::Meso,
        ScaleLayer::Macro,
        ScaleLayer::Meta,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScaleLayer::Micro => "micro",
            ScaleLayer::Meso => "meso",
            ScaleLayer::Macro => "macro",
            ScaleLayer::Meta => "meta",
        }
    }
}

impl std::fmt::Display for ScaleLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScaleLayer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "micro" => Ok(ScaleLayer::Micro),
            "meso" => Ok(ScaleLayer::Meso),
            "macro" => Ok(ScaleLayer::Macro),
            "meta" => Ok(ScaleLayer::Meta),
            other => Err(Error::InvalidValue(format!(
                "unknown scale layer '{other}' (expected micro, meso, macro or meta)"
            ))),
        }
    }
}

/// A concept in the fractal graph.
///
/// `children` (hasPart) and `parents` (isPartOf) are maintained by
/// [`FractalGraph`](crate::graph::FractalGraph) only; a node handed to
/// `add_node` must not carry edges of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FractalNode {
    pub id: NodeId,
    pub name: String,
    pub layer: ScaleLayer,
    pub axis_values: BTreeMap<AxisId, AxisValue>,
    /// hasPart
    pub children: BTreeSet<NodeId>,
    /// isPartOf
    pub parents: BTreeSet<NodeId>,
    /// Display-only symbolic metadata.
    #[serde(default)]
    pub tags: Tags,
    /// Governance weight in neighborhood calculations, in [floor, 1].
    pub contribution: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FractalNode {
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>, layer: ScaleLayer) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            layer,
            axis_values: BTreeMap::new(),
            children: BTreeSet::new(),
            parents: BTreeSet::new(),
            tags: Tags::new(),
            contribution: 1.0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder: place the node on an axis. Range is checked by the graph on insert.
    pub fn with_axis_value(mut self, axis: impl Into<AxisId>, value: f64, confidence: f64) -> Self {
        self.axis_values.insert(axis.into(), AxisValue { value, confidence });
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn axis_value(&self, axis: &AxisId) -> Option<&AxisValue> {
        self.axis_values.get(axis)
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn has_parts(&self) -> bool {
        !self.children.is_empty()
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
