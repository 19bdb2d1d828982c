//! # fractal-codex: Fractal Concept Graph with Resonance Governance
//!
//! Concepts live on four self-similar scale layers and are placed on
//! bipolar vibrational axes. Relationships are part/whole links. Resonance
//! between concepts is computed from their axis positions, and governance
//! amplifies, maintains or fades concepts and links by that resonance.
//! Nothing is ever deleted.
//!
//! ## Design Principles
//!
//! 1. **Registry first**: every axis value refers to a registered `VibrationalAxis`
//! 2. **Clean DTOs**: `FractalNode`, `PartEdge`, `ResonanceScore` cross all boundaries
//! 3. **Pure scoring**: resonance reads the graph and never mutates it
//! 4. **Fade, don't delete**: governance only moves weights toward a non-zero floor
//!
//! ## Quick Start
//!
//! ```rust
//! use fractal_codex::{Codex, CodexConfig, FractalNode, ScaleLayer, Outcome};
//!
//! # fn main() -> fractal_codex::Result<()> {
//! let codex = Codex::with_canonical_axes(CodexConfig::default())?;
//!
//! codex.add_node(FractalNode::new("forest", "Forest", ScaleLayer::Macro)
//!     .with_axis_value("noise-harmony", 0.8, 1.0))?;
//! codex.add_node(FractalNode::new("tree", "Tree", ScaleLayer::Macro)
//!     .with_axis_value("noise-harmony", 0.85, 1.0))?;
//! codex.add_relationship(&"forest".into(), &"tree".into())?;
//!
//! let decision = codex.evaluate(&"forest".into(), 1)?;
//! assert_eq!(decision.outcome, Outcome::Amplify);
//! # Ok(())
//! # }
//! ```
//!
//! ## Components
//!
//! | Component | Module | Description |
//! |-----------|--------|-------------|
//! | `AxisRegistry` | `registry` | Axes and the consonance function |
//! | `FractalGraph` | `graph` | Node arena, part/whole edges, traversal |
//! | `ResonanceCalculator` | `resonance` | Pairwise and neighborhood scoring |
//! | `GovernanceEngine` | `governance` | Decisions and coherence fields |
//! | `StateStore` | `store` | Async persistence seam |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod config;
pub mod registry;
pub mod graph;
pub mod resonance;
pub mod governance;
pub mod store;
pub mod ingest;
pub mod report;

use std::io::Write;

use parking_lot::{RwLock, RwLockReadGuard};
use tracing::info;

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{
    AxisId, AxisValue, HarmonicTag, Polarity, VibrationalAxis,
    FractalNode, NodeId, ScaleLayer,
    Direction, EdgeKey, PartEdge,
    Value, Tags,
    AxisContribution, PairRelationship, ResonanceScore, ScoreScope,
    CoherenceField, FieldKey, FieldPattern,
    DecisionId, GovernanceDecision, Outcome, Subject,
};
pub use config::{
    BonusCap, CodexConfig, ConsonancePolicy, GovernanceConfig, GraphConfig,
    ResonanceConfig, SimilarityMetric,
};
pub use registry::AxisRegistry;
pub use graph::{CrossScaleMatch, FractalGraph, FractalPattern, GraphStats, Traversal, TraversalStep};
pub use resonance::{NeighborhoodResonance, ResonanceCalculator};
pub use governance::{
    ExplorationStrategy, FirstCandidate, GovernanceAnalytics, GovernanceEngine, RoundRobin,
};
pub use store::{CodexState, MemoryStore, StateStore};
pub use ingest::{AxisPlacement, NodeRequest};
pub use report::CodexReport;

// ============================================================================
// Codex: the composition root
// ============================================================================

/// Owns the registry, graph and governance state.
///
/// Each part sits behind its own `RwLock`. Locks are always taken in the
/// order registry → graph → governance. Reads run concurrently; mutations
/// are serialized per component.
pub struct Codex {
    config: CodexConfig,
    registry: RwLock<AxisRegistry>,
    graph: RwLock<FractalGraph>,
    governance: RwLock<GovernanceEngine>,
}

impl Codex {
    /// Empty codex: no axes, no nodes.
    pub fn new(config: CodexConfig) -> Result<Self> {
        config.validate()?;
        let registry = AxisRegistry::new(config.registry);
        Ok(Self::assemble(config, registry))
    }

    /// Codex pre-seeded with the four canonical axes.
    pub fn with_canonical_axes(config: CodexConfig) -> Result<Self> {
        config.validate()?;
        let registry = AxisRegistry::with_canonical_axes(config.registry)?;
        Ok(Self::assemble(config, registry))
    }

    fn assemble(config: CodexConfig, registry: AxisRegistry) -> Self {
        let graph = FractalGraph::new(config.graph.clone())
            .with_contribution_floor(config.governance.weight_floor);
        let engine = GovernanceEngine::new(
            config.governance.clone(),
            ResonanceCalculator::new(config.resonance.clone()),
        );
        Self {
            config,
            registry: RwLock::new(registry),
            graph: RwLock::new(graph),
            governance: RwLock::new(engine),
        }
    }

    pub fn config(&self) -> &CodexConfig {
        &self.config
    }

    /// Shared read access to the graph, e.g. for lazy traversal.
    /// Mutations block until the guard is dropped.
    pub fn graph(&self) -> RwLockReadGuard<'_, FractalGraph> {
        self.graph.read()
    }

    pub fn registry(&self) -> RwLockReadGuard<'_, AxisRegistry> {
        self.registry.read()
    }

    // ========================================================================
    // Axes
    // ========================================================================

    pub fn register_axis(&self, axis: VibrationalAxis) -> Result<AxisId> {
        self.registry.write().register_axis(axis)
    }

    pub fn get_axis(&self, id: &AxisId) -> Result<VibrationalAxis> {
        self.registry.read().get_axis(id).cloned()
    }

    /// Consonance of `value` on a registered axis.
    pub fn consonance(&self, value: f64, axis: &AxisId) -> Result<f64> {
        let registry = self.registry.read();
        let axis = registry.get_axis(axis)?;
        Ok(registry.consonance(value, axis))
    }

    // ========================================================================
    // Graph
    // ========================================================================

    pub fn add_node(&self, node: FractalNode) -> Result<NodeId> {
        let registry = self.registry.read();
        self.graph.write().add_node(&registry, node)
    }

    pub fn get_node(&self, id: &NodeId) -> Result<FractalNode> {
        self.graph.read().get_node(id).cloned()
    }

    pub fn set_axis_value(&self, node: &NodeId, axis: &AxisId, value: f64, confidence: f64) -> Result<()> {
        let registry = self.registry.read();
        self.graph.write().set_axis_value(&registry, node, axis, value, confidence)
    }

    pub fn add_relationship(&self, parent: &NodeId, child: &NodeId) -> Result<EdgeKey> {
        self.graph.write().add_relationship(parent, child)
    }

    /// Logical removal. Returns the edge at its lowered weight.
    pub fn remove_relationship(&self, parent: &NodeId, child: &NodeId) -> Result<PartEdge> {
        self.graph.write().remove_relationship(parent, child).cloned()
    }

    pub fn get_relationship(&self, parent: &NodeId, child: &NodeId) -> Result<PartEdge> {
        self.graph.read().get_relationship(parent, child).cloned()
    }

    /// Nodes on one layer, sorted by id.
    pub fn nodes_in_layer(&self, layer: ScaleLayer) -> Vec<FractalNode> {
        self.graph.read().nodes_in_layer(layer).into_iter().cloned().collect()
    }

    /// Collected traversal. Use [`graph`](Self::graph) for a lazy walk.
    pub fn traverse(&self, start: &NodeId, direction: Direction, max_depth: usize) -> Result<Vec<TraversalStep>> {
        Ok(self.graph.read().traverse(start, direction, max_depth)?.collect())
    }

    pub fn cross_scale_map(&self, node: &NodeId, target_layer: ScaleLayer) -> Result<Vec<CrossScaleMatch>> {
        self.graph.read().cross_scale_map(node, target_layer)
    }

    /// Let `strategy` pick one cross-scale candidate to explore next.
    pub fn suggest_exploration(
        &self,
        node: &NodeId,
        target_layer: ScaleLayer,
        strategy: &dyn ExplorationStrategy,
    ) -> Result<Option<CrossScaleMatch>> {
        let candidates = self.cross_scale_map(node, target_layer)?;
        let choice = strategy.choose(&candidates).cloned();
        info!(
            node = %node,
            strategy = strategy.name(),
            candidates = candidates.len(),
            chosen = ?choice.as_ref().map(|c| c.node.as_str()),
            "exploration suggestion"
        );
        Ok(choice)
    }

    pub fn statistics(&self) -> GraphStats {
        self.graph.read().statistics()
    }

    /// Validate and insert a node described by plain data.
    ///
    /// Every placement is checked before anything is written.
    pub fn ingest(&self, request: NodeRequest) -> Result<NodeId> {
        let registry = self.registry.read();
        let layer = request.validate()?;
        let placements = request
            .axis_values
            .iter()
            .map(|p| {
                let axis = AxisId::new(p.axis.as_str());
                registry.get_axis(&axis)?;
                Ok((axis, p.value, p.confidence))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut graph = self.graph.write();
        let id = graph.add_node(&registry, request.to_node(layer))?;
        for (axis, value, confidence) in placements {
            graph.set_axis_value(&registry, &id, &axis, value, confidence)?;
        }
        Ok(id)
    }

    // ========================================================================
    // Resonance
    // ========================================================================

    pub fn pairwise_resonance(&self, a: &NodeId, b: &NodeId) -> Result<ResonanceScore> {
        let graph = self.graph.read();
        let governance = self.governance.read();
        governance.calculator().pairwise_resonance(&graph, a, b)
    }

    pub fn neighborhood_resonance(&self, node: &NodeId, radius: usize) -> Result<NeighborhoodResonance> {
        let graph = self.graph.read();
        let governance = self.governance.read();
        governance.calculator().neighborhood_resonance(&graph, node, radius)
    }

    pub fn rank_neighborhoods(&self, anchors: &[NodeId], radius: usize) -> Result<Vec<NeighborhoodResonance>> {
        let graph = self.graph.read();
        let governance = self.governance.read();
        governance.calculator().rank_neighborhoods(&graph, anchors, radius)
    }

    pub fn profile_consonance(&self, node: &NodeId) -> Result<Option<f64>> {
        let registry = self.registry.read();
        let graph = self.graph.read();
        let governance = self.governance.read();
        governance.calculator().profile_consonance(&registry, &graph, node)
    }

    pub fn axis_coherence(&self, axis: &AxisId) -> Result<f64> {
        self.registry.read().get_axis(axis)?;
        let graph = self.graph.read();
        let governance = self.governance.read();
        Ok(governance.calculator().axis_coherence(&graph, axis))
    }

    // ========================================================================
    // Governance
    // ========================================================================

    pub fn evaluate(&self, node: &NodeId, context_radius: usize) -> Result<GovernanceDecision> {
        let mut graph = self.graph.write();
        self.governance.write().evaluate(&mut graph, node, context_radius)
    }

    pub fn evaluate_relationship(&self, parent: &NodeId, child: &NodeId) -> Result<GovernanceDecision> {
        let mut graph = self.graph.write();
        self.governance.write().evaluate_relationship(&mut graph, parent, child)
    }

    pub fn update_coherence_field(&self, anchor: &NodeId, radius: usize) -> Result<CoherenceField> {
        let graph = self.graph.read();
        self.governance.write().update_coherence_field(&graph, anchor, radius).cloned()
    }

    pub fn get_coherence_field(&self, anchor: &NodeId, radius: usize) -> Result<CoherenceField> {
        self.governance.read().get_coherence_field(anchor, radius).cloned()
    }

    pub fn stale_fields(&self) -> Vec<FieldKey> {
        let graph = self.graph.read();
        self.governance.read().stale_fields(&graph)
    }

    pub fn refresh_stale_fields(&self) -> Result<Vec<FieldKey>> {
        let graph = self.graph.read();
        self.governance.write().refresh_stale_fields(&graph)
    }

    pub fn decisions(&self) -> Vec<GovernanceDecision> {
        self.governance.read().decisions().to_vec()
    }

    pub fn analytics(&self) -> GovernanceAnalytics {
        self.governance.read().analytics()
    }

    /// Mean of the most recent coherence contributions.
    pub fn system_coherence(&self) -> f64 {
        self.governance.read().system_coherence()
    }

    /// Basis scores of decisions involving `node`, oldest first.
    pub fn node_history(&self, node: &NodeId) -> Result<Vec<f64>> {
        let graph = self.graph.read();
        graph.get_node(node)?;
        Ok(self.governance.read().node_history(node))
    }

    // ========================================================================
    // Snapshots & persistence
    // ========================================================================

    /// Consistent copy of the whole state.
    pub fn snapshot(&self) -> CodexState {
        let registry = self.registry.read();
        let graph = self.graph.read();
        let governance = self.governance.read();

        let mut nodes: Vec<FractalNode> = graph.nodes().cloned().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        CodexState {
            version: store::STATE_VERSION,
            saved_at: chrono::Utc::now(),
            config: self.config.clone(),
            axes: registry.axes().cloned().collect(),
            revision: graph.revision(),
            nodes,
            edges: graph.relationships().into_iter().cloned().collect(),
            decisions: governance.decisions().to_vec(),
            fields: governance.fields().cloned().collect(),
        }
    }

    /// Rebuild a codex from a snapshot, re-checking every invariant.
    pub fn restore(state: CodexState) -> Result<Self> {
        let CodexState { config, axes, revision, nodes, edges, decisions, fields, .. } = state;
        config.validate()?;
        let mut registry = AxisRegistry::new(config.registry);
        for axis in axes {
            registry.register_axis(axis)?;
        }
        let graph = FractalGraph::from_parts(
            config.graph.clone(),
            config.governance.weight_floor,
            &registry,
            nodes,
            edges,
            revision,
        )?;
        let engine = GovernanceEngine::from_parts(
            config.governance.clone(),
            ResonanceCalculator::new(config.resonance.clone()),
            decisions,
            fields,
        );
        info!(
            axes = registry.len(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "codex restored"
        );
        Ok(Self {
            config,
            registry: RwLock::new(registry),
            graph: RwLock::new(graph),
            governance: RwLock::new(engine),
        })
    }

    pub async fn save_to(&self, store: &dyn StateStore) -> Result<()> {
        let state = self.snapshot();
        store.save_state(&state).await?;
        info!(store = store.name(), nodes = state.nodes.len(), "codex saved");
        Ok(())
    }

    /// Restore from the store's latest snapshot, if it has one.
    pub async fn load_from(store: &dyn StateStore) -> Result<Option<Self>> {
        match store.load_state().await? {
            Some(state) => Ok(Some(Self::restore(state)?)),
            None => Ok(None),
        }
    }

    // ========================================================================
    // Reports
    // ========================================================================

    pub fn report(&self) -> Result<CodexReport> {
        let registry = self.registry.read();
        let graph = self.graph.read();
        let governance = self.governance.read();
        CodexReport::build(&registry, &graph, &governance)
    }

    pub fn write_report(&self, writer: &mut dyn Write) -> Result<()> {
        report::write_json_report(&self.report()?, writer)
    }

    pub fn write_text_report(&self, writer: &mut dyn Write) -> Result<()> {
        let report = self.report()?;
        report::write_text_report(&report, &self.graph.read(), writer)
    }
}

impl std::fmt::Debug for Codex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let graph = self.graph.read();
        f.debug_struct("Codex")
            .field("axes", &self.registry.read().len())
            .field("nodes", &graph.node_count())
            .field("edges", &graph.edge_count())
            .field("revision", &graph.revision())
            .finish()
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Cycle: {parent} -> {child} would close a loop on the {layer} layer")]
    Cycle {
        parent: NodeId,
        child: NodeId,
        layer: ScaleLayer,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_codex_is_send_sync() {
        assert_send_sync::<Codex>();
    }

    #[test]
    fn test_error_display() {
        let err = Error::Cycle {
            parent: NodeId::from("a"),
            child: NodeId::from("b"),
            layer: ScaleLayer::Meso,
        };
        assert_eq!(err.to_string(), "Cycle: a -> b would close a loop on the meso layer");
        assert_eq!(Error::NotFound("Node x".into()).to_string(), "Not found: Node x");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = CodexConfig::default();
        config.governance.fade_rate = 1.5;
        assert!(matches!(Codex::new(config), Err(Error::InvalidValue(_))));
    }

    #[test]
    fn test_ingest_is_all_or_nothing() {
        let codex = Codex::with_canonical_axes(CodexConfig::default()).unwrap();
        let bad = NodeRequest::new("x", "X", "meso")
            .with_axis_value("fear-trust", 0.4, 1.0)
            .with_axis_value("joy-grief", 0.4, 1.0);
        assert!(matches!(codex.ingest(bad), Err(Error::NotFound(_))));
        assert!(matches!(codex.get_node(&"x".into()), Err(Error::NotFound(_))));

        let good = NodeRequest::new("x", "X", "Meso").with_axis_value("fear-trust", 0.4, 0.8);
        let id = codex.ingest(good).unwrap();
        let node = codex.get_node(&id).unwrap();
        assert_eq!(node.layer, ScaleLayer::Meso);
        assert_eq!(node.axis_value(&AxisId::from("fear-trust")).map(|v| v.confidence), Some(0.8));
    }

    #[test]
    fn test_text_report() {
        let codex = Codex::with_canonical_axes(CodexConfig::default()).unwrap();
        codex.add_node(FractalNode::new("sun", "Sun", ScaleLayer::Macro).with_tag("color", "gold")).unwrap();
        let mut out = Vec::new();
        codex.write_text_report(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("// Nodes: 1"));
        assert!(text.contains("[macro] sun \"Sun\""));
        assert!(text.contains("{color: \"gold\"}"));
    }

    #[test]
    fn test_text_report_classifies_edges() {
        let codex = Codex::with_canonical_axes(CodexConfig::default()).unwrap();
        codex.add_node(FractalNode::new("a", "A", ScaleLayer::Meso).with_axis_value("fear-trust", 0.5, 1.0)).unwrap();
        codex.add_node(FractalNode::new("b", "B", ScaleLayer::Meso).with_axis_value("fear-trust", 0.45, 1.0)).unwrap();
        codex.add_node(FractalNode::new("c", "C", ScaleLayer::Meso)).unwrap();
        codex.add_relationship(&"a".into(), &"b".into()).unwrap();
        codex.add_relationship(&"a".into(), &"c".into()).unwrap();
        let mut out = Vec::new();
        codex.write_text_report(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("a -> b (1.000) harmonic"));
        assert!(text.lines().any(|line| line == "a -> c (1.000)"));
    }
}
