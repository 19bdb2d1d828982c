//! Content ingestion requests.
//!
//! Upstream collaborators describe concepts as plain data (layer as a
//! string, axis placements as a list). [`Codex::ingest`](crate::Codex::ingest)
//! validates the whole request before touching the graph, so a bad
//! placement never leaves a half-placed node behind.

use serde::{Deserialize, Serialize};

use crate::model::*;
use crate::Result;

fn full_confidence() -> f64 {
    1.0
}

/// One axis placement inside a [`NodeRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisPlacement {
    pub axis: String,
    pub value: f64,
    #[serde(default = "full_confidence")]
    pub confidence: f64,
}

impl AxisPlacement {
    pub fn new(axis: impl Into<String>, value: f64, confidence: f64) -> Self {
        Self { axis: axis.into(), value, confidence }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRequest {
    pub id: String,
    pub name: String,
    /// `micro`, `meso`, `macro` or `meta` (case-insensitive).
    pub layer: String,
    #[serde(default)]
    pub axis_values: Vec<AxisPlacement>,
    #[serde(default)]
    pub tags: Tags,
}

impl NodeRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, layer: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            layer: layer.into(),
            axis_values: Vec::new(),
            tags: Tags::new(),
        }
    }

    pub fn with_axis_value(mut self, axis: impl Into<String>, value: f64, confidence: f64) -> Self {
        self.axis_values.push(AxisPlacement::new(axis, value, confidence));
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse the layer and check every placement's range.
    /// Axis existence is checked by the caller against its registry.
    pub(crate) fn validate(&self) -> Result<ScaleLayer> {
        let layer = self.layer.parse::<ScaleLayer>()?;
        for placement in &self.axis_values {
            AxisValue::new(placement.value, placement.confidence)?;
        }
        Ok(layer)
    }

    /// The bare node, without axis values.
    pub(crate) fn to_node(&self, layer: ScaleLayer) -> FractalNode {
        let mut node = FractalNode::new(self.id.as_str(), self.name.as_str(), layer);
        node.tags = self.tags.clone();
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_request_from_json() {
        let req = NodeRequest::from_json(
            r#"{
                "id": "river",
                "name": "River",
                "layer": "Macro",
                "axis_values": [{ "axis": "noise-harmony", "value": 0.7 }]
            }"#,
        ).unwrap();
        assert_eq!(req.validate().unwrap(), ScaleLayer::Macro);
        assert_eq!(req.axis_values[0].confidence, 1.0);
        assert!(req.tags.is_empty());
    }

    #[test]
    fn test_bad_layer() {
        let req = NodeRequest::new("x", "X", "galactic");
        assert!(matches!(req.validate(), Err(Error::InvalidValue(_))));
    }

    #[test]
    fn test_bad_placement() {
        let req = NodeRequest::new("x", "X", "micro").with_axis_value("fear-trust", 0.5, 1.5);
        assert!(matches!(req.validate(), Err(Error::InvalidValue(_))));
    }
}
