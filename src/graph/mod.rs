//! # Fractal Graph
//!
//! Arena of [`FractalNode`]s keyed by stable ids, with explicit forward
//! (`children`, hasPart) and backward (`parents`, isPartOf) id sets. Both
//! directions are always written together by one operation, so an edge is
//! never one-directional.
//!
//! ## Invariants
//!
//! - every hasPart edge has a matching isPartOf edge, and a [`PartEdge`] record
//! - no cycle among nodes of the same scale layer
//! - axis values and confidences stay within [0, 1]
//! - edges and nodes are never deleted; logical removal lowers an edge's
//!   weight to the configured floor
//!
//! Cross-layer links (a Meta node holding a Micro analog) are exempt from the
//! cycle check. Traversal depth is capped by `GraphConfig::max_traversal_depth`
//! so loops through such links stay bounded.

mod stats;
mod traversal;

pub use stats::{FractalPattern, GraphStats};
pub use traversal::{Traversal, TraversalStep};

use hashbrown::{Equivalent, HashMap, HashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{GovernanceConfig, GraphConfig, SimilarityMetric};
use crate::model::*;
use crate::registry::AxisRegistry;
use crate::{Error, Result};

// ============================================================================
// Borrowed edge lookups
// ============================================================================

/// Borrowed form of [`EdgeKey`], so lookups don't clone ids.
#[derive(Hash)]
struct EdgeRef<'a> {
    parent: &'a NodeId,
    child: &'a NodeId,
}

impl Equivalent<EdgeKey> for EdgeRef<'_> {
    fn equivalent(&self, key: &EdgeKey) -> bool {
        *self.parent == key.parent && *self.child == key.child
    }
}

/// A candidate returned by [`FractalGraph::cross_scale_map`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossScaleMatch {
    pub node: NodeId,
    pub layer: ScaleLayer,
    pub similarity: f64,
}

// ============================================================================
// FractalGraph
// ============================================================================

/// The concept graph.
#[derive(Debug, Clone)]
pub struct FractalGraph {
    config: GraphConfig,
    nodes: HashMap<NodeId, FractalNode>,
    edges: HashMap<EdgeKey, PartEdge>,
    /// Lowest contribution a node may carry. Matches the governance floor.
    contribution_floor: f64,
    /// Bumped on every mutation.
    revision: u64,
}

impl FractalGraph {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            nodes: HashMap::new(),
            edges: HashMap::new(),
            contribution_floor: GovernanceConfig::default().weight_floor,
            revision: 0,
        }
    }

    /// Set the lowest contribution weight a node may be inserted with.
    pub fn with_contribution_floor(mut self, floor: f64) -> Self {
        self.contribution_floor = floor;
        self
    }

    pub fn contribution_floor(&self) -> f64 {
        self.contribution_floor
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Monotonic mutation counter.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Register a concept.
    ///
    /// The node must be new, carry no edges, have a contribution in
    /// [floor, 1], and every axis value must be in range and on a registered axis.
    pub fn add_node(&mut self, registry: &AxisRegistry, node: FractalNode) -> Result<NodeId> {
        if node.id.as_str().is_empty() {
            return Err(Error::InvalidValue("node id must not be empty".into()));
        }
        if self.nodes.contains_key(&node.id) {
            warn!(node = %node.id, "rejected duplicate node");
            return Err(Error::InvalidValue(format!("node {} already registered", node.id)));
        }
        if !node.children.is_empty() || !node.parents.is_empty() {
            return Err(Error::InvalidValue(format!(
                "node {} carries edges; use add_relationship", node.id
            )));
        }
        if !in_unit_range(node.contribution) || node.contribution < self.contribution_floor {
            warn!(node = %node.id, contribution = node.contribution, "rejected node contribution");
            return Err(Error::InvalidValue(format!(
                "node {} contribution {} outside [{}, 1]",
                node.id, node.contribution, self.contribution_floor
            )));
        }
        for (axis, value) in &node.axis_values {
            registry.get_axis(axis)?;
            value.validate()?;
        }

        let id = node.id.clone();
        info!(node = %id, layer = %node.layer, axes = node.axis_values.len(), "added node");
        self.nodes.insert(id.clone(), node);
        self.revision += 1;
        Ok(id)
    }

    pub fn get_node(&self, id: &NodeId) -> Result<&FractalNode> {
        self.nodes.get(id).ok_or_else(|| Error::NotFound(format!("Node {id}")))
    }

    fn node_mut(&mut self, id: &NodeId) -> Result<&mut FractalNode> {
        self.nodes.get_mut(id).ok_or_else(|| Error::NotFound(format!("Node {id}")))
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All nodes, unordered.
    pub fn nodes(&self) -> impl Iterator<Item = &FractalNode> {
        self.nodes.values()
    }

    /// All node ids, sorted.
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Nodes on one scale layer, sorted by id.
    pub fn nodes_in_layer(&self, layer: ScaleLayer) -> Vec<&FractalNode> {
        let mut nodes: Vec<&FractalNode> = self.nodes.values().filter(|n| n.layer == layer).collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    /// Place a node on an axis (upsert).
    pub fn set_axis_value(
        &mut self,
        registry: &AxisRegistry,
        node: &NodeId,
        axis: &AxisId,
        value: f64,
        confidence: f64,
    ) -> Result<()> {
        registry.get_axis(axis)?;
        let axis_value = AxisValue::new(value, confidence)?;
        let n = self.node_mut(node)?;
        n.axis_values.insert(axis.clone(), axis_value);
        n.touch();
        self.revision += 1;
        debug!(node = %node, axis = %axis, value, confidence, "set axis value");
        Ok(())
    }

    /// Attach display metadata to a node.
    pub fn set_tag(&mut self, node: &NodeId, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let n = self.node_mut(node)?;
        n.tags.insert(key.into(), value.into());
        n.touch();
        self.revision += 1;
        Ok(())
    }

    /// Governance hook: set a node's contribution weight.
    pub(crate) fn set_contribution(&mut self, node: &NodeId, weight: f64) -> Result<()> {
        let n = self.node_mut(node)?;
        n.contribution = weight;
        n.touch();
        self.revision += 1;
        Ok(())
    }

    // ========================================================================
    // Relationships
    // ========================================================================

    /// Install `parent hasPart child` and `child isPartOf parent` together.
    ///
    /// Same-layer edges that would close a cycle are rejected with
    /// [`Error::Cycle`]. Re-adding an existing edge restores its weight to 1.0.
    pub fn add_relationship(&mut self, parent: &NodeId, child: &NodeId) -> Result<EdgeKey> {
        let parent_layer = self.get_node(parent)?.layer;
        let child_layer = self.get_node(child)?.layer;
        let key = EdgeKey::new(parent.clone(), child.clone());

        if let Some(edge) = self.edges.get_mut(&key) {
            edge.weight = 1.0;
            edge.updated_at = chrono::Utc::now();
            self.revision += 1;
            debug!(edge = %key, "re-established relationship");
            return Ok(key);
        }

        let cross_layer = parent_layer != child_layer;
        if !cross_layer && (parent == child || self.reaches_within_layer(child, parent, parent_layer)) {
            warn!(parent = %parent, child = %child, layer = %parent_layer, "rejected same-layer cycle");
            return Err(Error::Cycle {
                parent: parent.clone(),
                child: child.clone(),
                layer: parent_layer,
            });
        }

        let p = self.node_mut(parent)?;
        p.children.insert(child.clone());
        p.touch();
        let c = self.node_mut(child)?;
        c.parents.insert(parent.clone());
        c.touch();
        self.edges.insert(key.clone(), PartEdge::new(parent.clone(), child.clone(), cross_layer));
        self.revision += 1;
        info!(parent = %parent, child = %child, cross_layer, "added relationship");
        Ok(key)
    }

    /// Logical removal: lower the edge's weight to the floor. Nothing is deleted.
    pub fn remove_relationship(&mut self, parent: &NodeId, child: &NodeId) -> Result<&PartEdge> {
        let floor = self.config.edge_weight_floor;
        let edge = self
            .edges
            .get_mut(&EdgeRef { parent, child })
            .ok_or_else(|| Error::NotFound(format!("Relationship {parent}->{child}")))?;
        edge.weight = floor;
        edge.updated_at = chrono::Utc::now();
        self.revision += 1;
        info!(parent = %parent, child = %child, weight = floor, "relationship faded to floor");
        Ok(edge)
    }

    /// Governance hook: set an edge weight, kept within [floor, 1].
    pub(crate) fn set_edge_weight(&mut self, key: &EdgeKey, weight: f64) -> Result<()> {
        let floor = self.config.edge_weight_floor;
        let edge = self
            .edges
            .get_mut(key)
            .ok_or_else(|| Error::NotFound(format!("Relationship {key}")))?;
        edge.weight = weight.clamp(floor, 1.0);
        edge.updated_at = chrono::Utc::now();
        self.revision += 1;
        Ok(())
    }

    pub fn get_relationship(&self, parent: &NodeId, child: &NodeId) -> Result<&PartEdge> {
        self.edge(parent, child)
            .ok_or_else(|| Error::NotFound(format!("Relationship {parent}->{child}")))
    }

    fn edge(&self, parent: &NodeId, child: &NodeId) -> Option<&PartEdge> {
        self.edges.get(&EdgeRef { parent, child })
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// All edges, sorted by (parent, child).
    pub fn relationships(&self) -> Vec<&PartEdge> {
        let mut edges: Vec<&PartEdge> = self.edges.values().collect();
        edges.sort_by(|a, b| (&a.parent, &a.child).cmp(&(&b.parent, &b.child)));
        edges
    }

    /// Adjacent nodes in id order with the edge that connects them.
    /// For `Both`, parts come before wholes.
    pub fn neighbors(&self, id: &NodeId, direction: Direction) -> Vec<(&NodeId, &PartEdge)> {
        let Some(node) = self.nodes.get(id) else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(node.children.len() + node.parents.len());
        if matches!(direction, Direction::HasPart | Direction::Both) {
            for child in &node.children {
                if let Some(edge) = self.edge(id, child) {
                    out.push((child, edge));
                }
            }
        }
        if matches!(direction, Direction::IsPartOf | Direction::Both) {
            for parent in &node.parents {
                if let Some(edge) = self.edge(parent, id) {
                    out.push((parent, edge));
                }
            }
        }
        out
    }

    /// Does `from` reach `target` over hasPart edges whose endpoints both sit on `layer`?
    fn reaches_within_layer(&self, from: &NodeId, target: &NodeId, layer: ScaleLayer) -> bool {
        let mut stack = vec![from];
        let mut seen: HashSet<&NodeId> = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            let Some(node) = self.nodes.get(current) else { continue };
            for child in &node.children {
                if self.nodes.get(child).is_some_and(|c| c.layer == layer) {
                    stack.push(child);
                }
            }
        }
        false
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Lazy breadth-first walk from `start`, yielding each reachable node once.
    ///
    /// `max_depth` is clamped to `GraphConfig::max_traversal_depth`.
    /// `max_depth == 0` yields only the start node.
    pub fn traverse(&self, start: &NodeId, direction: Direction, max_depth: usize) -> Result<Traversal<'_>> {
        self.get_node(start)?;
        let depth = max_depth.min(self.config.max_traversal_depth);
        debug!(start = %start, ?direction, depth, "traversal");
        Ok(Traversal::new(self, start.clone(), direction, depth))
    }

    // ========================================================================
    // Cross-scale mapping
    // ========================================================================

    /// Nodes on `target_layer` whose axis vectors resemble `node`'s by more
    /// than the configured threshold, best first (ties by id).
    pub fn cross_scale_map(&self, node: &NodeId, target_layer: ScaleLayer) -> Result<Vec<CrossScaleMatch>> {
        let source = self.get_node(node)?;
        let threshold = self.config.cross_scale_threshold;
        let mut matches: Vec<CrossScaleMatch> = self
            .nodes
            .values()
            .filter(|candidate| candidate.layer == target_layer && candidate.id != source.id)
            .filter_map(|candidate| {
                let similarity = self.similarity_between(source, candidate)?;
                (similarity > threshold).then(|| CrossScaleMatch {
                    node: candidate.id.clone(),
                    layer: candidate.layer,
                    similarity,
                })
            })
            .collect();
        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.node.cmp(&b.node))
        });
        debug!(node = %node, layer = %target_layer, found = matches.len(), "cross-scale map");
        Ok(matches)
    }

    /// Similarity of two nodes' axis vectors under the configured metric.
    /// `None` when they share no axes.
    pub fn similarity_between(&self, a: &FractalNode, b: &FractalNode) -> Option<f64> {
        vector_similarity(a, b, self.config.similarity)
    }

    // ========================================================================
    // Snapshot restore
    // ========================================================================

    /// Rebuild a graph from persisted nodes and edges, re-checking every invariant.
    ///
    /// Edge sets recorded on the nodes must agree with the edge list. The
    /// revision counter resumes from `revision` so stored fields keep their
    /// staleness.
    pub fn from_parts(
        config: GraphConfig,
        contribution_floor: f64,
        registry: &AxisRegistry,
        nodes: Vec<FractalNode>,
        edges: Vec<PartEdge>,
        revision: u64,
    ) -> Result<Self> {
        let mut graph = Self::new(config).with_contribution_floor(contribution_floor);
        let mut recorded = Vec::with_capacity(nodes.len());
        for mut node in nodes {
            let children = std::mem::take(&mut node.children);
            let parents = std::mem::take(&mut node.parents);
            recorded.push((node.id.clone(), children, parents, node.updated_at));
            graph.add_node(registry, node)?;
        }

        let mut edges = edges;
        edges.sort_by(|a, b| (&a.parent, &a.child).cmp(&(&b.parent, &b.child)));
        for edge in edges {
            let key = graph.add_relationship(&edge.parent, &edge.child)?;
            if !(edge.weight > 0.0 && edge.weight <= 1.0) {
                return Err(Error::InvalidValue(format!("edge {key} weight {} outside (0, 1]", edge.weight)));
            }
            if let Some(stored) = graph.edges.get_mut(&key) {
                stored.weight = edge.weight;
                stored.created_at = edge.created_at;
                stored.updated_at = edge.updated_at;
            }
        }

        for (id, children, parents, updated_at) in recorded {
            let node = graph.node_mut(&id)?;
            if node.children != children || node.parents != parents {
                return Err(Error::InvalidValue(format!(
                    "node {id} edge sets disagree with the edge list"
                )));
            }
            node.updated_at = updated_at;
        }
        graph.revision = graph.revision.max(revision);
        Ok(graph)
    }
}

/// Similarity over the axes both nodes are placed on.
pub(crate) fn vector_similarity(a: &FractalNode, b: &FractalNode, metric: SimilarityMetric) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .axis_values
        .iter()
        .filter_map(|(axis, va)| b.axis_values.get(axis).map(|vb| (va.value, vb.value)))
        .collect();
    if pairs.is_empty() {
        return None;
    }
    let similarity = match metric {
        SimilarityMetric::Alignment => {
            let diff: f64 = pairs.iter().map(|(x, y)| (x - y).abs()).sum();
            1.0 - diff / pairs.len() as f64
        }
        SimilarityMetric::Cosine => {
            let dot: f64 = pairs.iter().map(|(x, y)| x * y).sum();
            let na = pairs.iter().map(|(x, _)| x * x).sum::<f64>().sqrt();
            let nb = pairs.iter().map(|(_, y)| y * y).sum::<f64>().sqrt();
            match (na == 0.0, nb == 0.0) {
                (true, true) => 1.0,
                (true, false) | (false, true) => 0.0,
                (false, false) => dot / (na * nb),
            }
        }
    };
    Some(similarity.clamp(0.0, 1.0))
}

// ============================================================================
// Tests
// ============================================================================
