//! Structural measures over the fractal graph: depth, self-similarity,
//! pattern detection and whole-graph statistics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{vector_similarity, FractalGraph};
use crate::config::SimilarityMetric;
use crate::model::{Direction, NodeId, ScaleLayer};
use crate::Result;

/// Self-similarity above this marks a node [`FractalPattern::SelfSimilar`].
const SELF_SIMILAR_THRESHOLD: f64 = 0.8;

/// Structural patterns a node can exhibit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FractalPattern {
    /// Parts resemble the whole.
    SelfSimilar,
    /// Has parts of its own.
    Recursive,
    /// A root that contains parts.
    Holographic,
    /// Linked to a node on another scale layer.
    CrossScale,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub cross_layer_edges: usize,
    /// Edges below full weight.
    pub weakened_edges: usize,
    pub nodes_per_layer: BTreeMap<ScaleLayer, usize>,
    /// Mean over nodes that reach a root.
    pub average_fractal_depth: f64,
    /// Mean over nodes that have parts.
    pub average_self_similarity: f64,
    pub revision: u64,
}

impl FractalGraph {
    /// Fewest isPartOf hops from `node` to a root. `None` if every upward
    /// path loops through cross-layer links without reaching one.
    pub fn fractal_depth(&self, node: &NodeId) -> Result<Option<usize>> {
        let depth = self
            .traverse(node, Direction::IsPartOf, self.config.max_traversal_depth)?
            .find(|step| self.nodes.get(&step.node).is_some_and(|n| n.is_root()))
            .map(|step| step.depth);
        Ok(depth)
    }

    /// Mean alignment between a whole and its direct parts. 0 without parts
    /// that share an axis with it.
    pub fn self_similarity(&self, node: &NodeId) -> Result<f64> {
        let whole = self.get_node(node)?;
        let scores: Vec<f64> = whole
            .children
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .filter_map(|part| vector_similarity(whole, part, SimilarityMetric::Alignment))
            .collect();
        if scores.is_empty() {
            return Ok(0.0);
        }
        Ok(scores.iter().sum::<f64>() / scores.len() as f64)
    }

    /// Patterns present at `node`, in declaration order.
    pub fn fractal_patterns(&self, node: &NodeId) -> Result<Vec<FractalPattern>> {
        let n = self.get_node(node)?;
        let mut patterns = Vec::new();
        if self.self_similarity(node)? > SELF_SIMILAR_THRESHOLD {
            patterns.push(FractalPattern::SelfSimilar);
        }
        if n.has_parts() {
            patterns.push(FractalPattern::Recursive);
            if n.is_root() {
                patterns.push(FractalPattern::Holographic);
            }
        }
        if self.neighbors(node, Direction::Both).iter().any(|(_, edge)| edge.cross_layer) {
            patterns.push(FractalPattern::CrossScale);
        }
        Ok(patterns)
    }

    pub fn statistics(&self) -> GraphStats {
        let mut nodes_per_layer: BTreeMap<ScaleLayer, usize> =
            ScaleLayer::ALL.iter().map(|layer| (*layer, 0)).collect();
        let mut depths = Vec::new();
        let mut similarities = Vec::new();

        for node in self.nodes.values() {
            *nodes_per_layer.entry(node.layer).or_default() += 1;
            if let Ok(Some(depth)) = self.fractal_depth(&node.id) {
                depths.push(depth as f64);
            }
            if node.has_parts() {
                if let Ok(similarity) = self.self_similarity(&node.id) {
                    similarities.push(similarity);
                }
            }
        }

        GraphStats {
            node_count: self.nodes.len(),
            edge_count: self.edges.len(),
            cross_layer_edges: self.edges.values().filter(|e| e.cross_layer).count(),
            weakened_edges: self.edges.values().filter(|e| e.weight < 1.0).count(),
            nodes_per_layer,
            average_fractal_depth: mean(&depths),
            average_self_similarity: mean(&similarities),
            revision: self.revision,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConsonancePolicy, GraphConfig};
    use crate::model::FractalNode;
    use crate::registry::AxisRegistry;

    fn sample() -> FractalGraph {
        let reg = AxisRegistry::with_canonical_axes(ConsonancePolicy::default()).unwrap();
        let mut g = FractalGraph::new(GraphConfig::default());
        let nodes = [
            ("forest", ScaleLayer::Macro, 0.7),
            ("tree", ScaleLayer::Macro, 0.75),
            ("leaf", ScaleLayer::Macro, 0.65),
            ("cell", ScaleLayer::Micro, 0.2),
        ];
        for (id, layer, v) in nodes {
            g.add_node(&reg, FractalNode::new(id, id, layer).with_axis_value("noise-harmony", v, 1.0))
                .unwrap();
        }
        g.add_relationship(&"forest".into(), &"tree".into()).unwrap();
        g.add_relationship(&"tree".into(), &"leaf".into()).unwrap();
        g.add_relationship(&"leaf".into(), &"cell".into()).unwrap();
        g
    }

    #[test]
    fn test_fractal_depth() {
        let g = sample();
        assert_eq!(g.fractal_depth(&"forest".into()).unwrap(), Some(0));
        assert_eq!(g.fractal_depth(&"leaf".into()).unwrap(), Some(2));
        assert_eq!(g.fractal_depth(&"cell".into()).unwrap(), Some(3));
    }

    #[test]
    fn test_self_similarity() {
        let g = sample();
        assert!((g.self_similarity(&"forest".into()).unwrap() - 0.95).abs() < 1e-9);
        assert_eq!(g.self_similarity(&"cell".into()).unwrap(), 0.0);
    }

    #[test]
    fn test_fractal_patterns() {
        let g = sample();
        assert_eq!(
            g.fractal_patterns(&"forest".into()).unwrap(),
            vec![FractalPattern::SelfSimilar, FractalPattern::Recursive, FractalPattern::Holographic]
        );
        assert_eq!(
            g.fractal_patterns(&"leaf".into()).unwrap(),
            vec![FractalPattern::Recursive, FractalPattern::CrossScale]
        );
        assert_eq!(g.fractal_patterns(&"cell".into()).unwrap(), vec![FractalPattern::CrossScale]);
    }

    #[test]
    fn test_statistics() {
        let g = sample();
        let stats = g.statistics();
        assert_eq!(stats.node_count, 4);
        assert_eq!(stats.edge_count, 3);
        assert_eq!(stats.cross_layer_edges, 1);
        assert_eq!(stats.nodes_per_layer[&ScaleLayer::Macro], 3);
        assert_eq!(stats.nodes_per_layer[&ScaleLayer::Meta], 0);
        assert!((stats.average_fractal_depth - 1.5).abs() < 1e-9);
    }
}
