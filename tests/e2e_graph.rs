//! End-to-end tests for the fractal graph through the `Codex` handle.
//!
//! Covers node registration, part/whole links, same-layer cycle rejection,
//! logical removal, traversal and cross-scale mapping.

use fractal_codex::{
    AxisId, Codex, CodexConfig, Direction, Error, FractalNode, FractalPattern, NodeId,
    NodeRequest, ScaleLayer,
};
use pretty_assertions::assert_eq;

// ============================================================================
// Helper: a small body → organ → cell hierarchy plus a cosmic analog.
// ============================================================================

fn setup_body() -> Codex {
    let codex = Codex::with_canonical_axes(CodexConfig::default()).unwrap();
    let nodes = [
        ("body", ScaleLayer::Meso, 0.7),
        ("heart", ScaleLayer::Meso, 0.75),
        ("lung", ScaleLayer::Meso, 0.6),
        ("cell", ScaleLayer::Micro, 0.72),
        ("sun", ScaleLayer::Macro, 0.74),
    ];
    for (id, layer, trust) in nodes {
        codex
            .add_node(FractalNode::new(id, id, layer).with_axis_value("fear-trust", trust, 1.0))
            .unwrap();
    }
    codex.add_relationship(&id("body"), &id("heart")).unwrap();
    codex.add_relationship(&id("body"), &id("lung")).unwrap();
    codex.add_relationship(&id("heart"), &id("cell")).unwrap();
    codex
}

fn id(s: &str) -> NodeId {
    NodeId::from(s)
}

fn step_ids(codex: &Codex, start: &str, direction: Direction, depth: usize) -> Vec<String> {
    codex
        .traverse(&id(start), direction, depth)
        .unwrap()
        .into_iter()
        .map(|s| s.node.0)
        .collect()
}

// ============================================================================
// 1. Relationships are installed in both directions
// ============================================================================

#[test]
fn test_relationship_both_directions() {
    let codex = setup_body();
    let body = codex.get_node(&id("body")).unwrap();
    let heart = codex.get_node(&id("heart")).unwrap();
    assert!(body.children.contains(&id("heart")));
    assert!(heart.parents.contains(&id("body")));
    assert_eq!(codex.get_relationship(&id("body"), &id("heart")).unwrap().weight, 1.0);
    assert!(codex.get_relationship(&id("heart"), &id("cell")).unwrap().cross_layer);
}

// ============================================================================
// 2. Same-layer cycles are rejected, graph unchanged
// ============================================================================

#[test]
fn test_two_node_cycle_rejected() {
    let codex = Codex::with_canonical_axes(CodexConfig::default()).unwrap();
    codex.add_node(FractalNode::new("a", "A", ScaleLayer::Meso)).unwrap();
    codex.add_node(FractalNode::new("b", "B", ScaleLayer::Meso)).unwrap();
    codex.add_relationship(&id("a"), &id("b")).unwrap();

    let err = codex.add_relationship(&id("b"), &id("a")).unwrap_err();
    match err {
        Error::Cycle { parent, child, layer } => {
            assert_eq!(parent, id("b"));
            assert_eq!(child, id("a"));
            assert_eq!(layer, ScaleLayer::Meso);
        }
        other => panic!("expected cycle error, got {other:?}"),
    }
    assert!(codex.get_node(&id("b")).unwrap().children.is_empty());
    assert!(matches!(codex.get_relationship(&id("b"), &id("a")), Err(Error::NotFound(_))));
}

#[test]
fn test_unknown_endpoint() {
    let codex = setup_body();
    assert!(matches!(codex.add_relationship(&id("body"), &id("ghost")), Err(Error::NotFound(_))));
}

// ============================================================================
// 3. Logical removal keeps the node and the edge record
// ============================================================================

#[test]
fn test_remove_relationship_keeps_history() {
    let codex = setup_body();
    let edge = codex.remove_relationship(&id("body"), &id("lung")).unwrap();
    assert_eq!(edge.weight, 0.05);
    assert!(codex.get_node(&id("lung")).is_ok());
    assert_eq!(codex.statistics().edge_count, 3);
    assert_eq!(codex.statistics().weakened_edges, 1);
}

// ============================================================================
// 4. Traversal
// ============================================================================

#[test]
fn test_traverse_depth_zero() {
    let codex = setup_body();
    assert_eq!(step_ids(&codex, "body", Direction::HasPart, 0), vec!["body"]);
}

#[test]
fn test_traverse_downward() {
    let codex = setup_body();
    assert_eq!(
        step_ids(&codex, "body", Direction::HasPart, 10),
        vec!["body", "heart", "lung", "cell"]
    );
    assert_eq!(step_ids(&codex, "body", Direction::HasPart, 1), vec!["body", "heart", "lung"]);
}

#[test]
fn test_traverse_both_directions() {
    let codex = setup_body();
    assert_eq!(
        step_ids(&codex, "heart", Direction::Both, 2),
        vec!["heart", "cell", "body", "lung"]
    );
}

#[test]
fn test_lazy_traversal_through_guard() {
    let codex = setup_body();
    let graph = codex.graph();
    let first = graph
        .traverse(&id("body"), Direction::HasPart, 5)
        .unwrap()
        .find(|s| s.node.as_str() == "cell")
        .unwrap();
    assert_eq!(first.depth, 2);
}

#[test]
fn test_cross_layer_loop_is_bounded() {
    let codex = Codex::with_canonical_axes(CodexConfig::default()).unwrap();
    codex.add_node(FractalNode::new("cosmos", "Cosmos", ScaleLayer::Meta)).unwrap();
    codex.add_node(FractalNode::new("atom", "Atom", ScaleLayer::Micro)).unwrap();
    codex.add_relationship(&id("cosmos"), &id("atom")).unwrap();
    codex.add_relationship(&id("atom"), &id("cosmos")).unwrap();

    let steps = codex.traverse(&id("cosmos"), Direction::HasPart, usize::MAX).unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(codex.graph().fractal_depth(&id("atom")).unwrap(), None);
}

// ============================================================================
// 5. Cross-scale mapping and structure
// ============================================================================

#[test]
fn test_cross_scale_map() {
    let codex = setup_body();
    let matches = codex.cross_scale_map(&id("heart"), ScaleLayer::Macro).unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].node, id("sun"));
    assert!(matches[0].similarity > 0.98);

    let micro = codex.cross_scale_map(&id("heart"), ScaleLayer::Micro).unwrap();
    assert_eq!(micro.iter().map(|m| m.node.as_str()).collect::<Vec<_>>(), vec!["cell"]);
}

#[test]
fn test_fractal_patterns() {
    let codex = setup_body();
    let patterns = codex.graph().fractal_patterns(&id("body")).unwrap();
    assert_eq!(
        patterns,
        vec![FractalPattern::SelfSimilar, FractalPattern::Recursive, FractalPattern::Holographic]
    );
    let stats = codex.statistics();
    assert_eq!(stats.node_count, 5);
    assert_eq!(stats.cross_layer_edges, 1);
    assert_eq!(stats.nodes_per_layer[&ScaleLayer::Meso], 3);
}

// ============================================================================
// 6. Validation
// ============================================================================

#[test]
fn test_out_of_range_value_rejected() {
    let codex = setup_body();
    let result = codex.set_axis_value(&id("body"), &AxisId::from("fear-trust"), 1.01, 1.0);
    assert!(matches!(result, Err(Error::InvalidValue(_))));
    assert_eq!(
        codex.get_node(&id("body")).unwrap().axis_value(&AxisId::from("fear-trust")).map(|v| v.value),
        Some(0.7)
    );
}

#[test]
fn test_duplicate_node_rejected() {
    let codex = setup_body();
    let result = codex.add_node(FractalNode::new("body", "Other", ScaleLayer::Macro));
    assert!(matches!(result, Err(Error::InvalidValue(_))));
    assert_eq!(codex.get_node(&id("body")).unwrap().layer, ScaleLayer::Meso);
}

#[test]
fn test_ingest_malformed_layer() {
    let codex = setup_body();
    let result = codex.ingest(NodeRequest::new("river", "River", "oceanic"));
    assert!(matches!(result, Err(Error::InvalidValue(_))));

    let ok = codex
        .ingest(NodeRequest::new("river", "River", "MACRO").with_tag("water_state", "ws.flowing"))
        .unwrap();
    assert_eq!(codex.get_node(&ok).unwrap().layer, ScaleLayer::Macro);
}

#[test]
fn test_contribution_below_floor_rejected() {
    let codex = setup_body();
    let mut faint = FractalNode::new("dust", "Dust", ScaleLayer::Micro);
    faint.contribution = 0.001;
    assert!(matches!(codex.add_node(faint), Err(Error::InvalidValue(_))));
    assert!(matches!(codex.get_node(&id("dust")), Err(Error::NotFound(_))));

    let mut at_floor = FractalNode::new("dust", "Dust", ScaleLayer::Micro);
    at_floor.contribution = 0.05;
    codex.add_node(at_floor).unwrap();
    assert_eq!(codex.get_node(&id("dust")).unwrap().contribution, 0.05);
}
