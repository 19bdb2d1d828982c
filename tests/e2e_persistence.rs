//! End-to-end tests for snapshots, the state store and reports.
//!
//! Each test builds a small codex, persists it through `MemoryStore` or
//! JSON, restores it, and checks that scores and decisions carry over.

use fractal_codex::{
    Codex, CodexConfig, CodexState, Error, FractalNode, MemoryStore, NodeId, Outcome, ScaleLayer,
    StateStore,
};
use pretty_assertions::assert_eq;

fn id(s: &str) -> NodeId {
    NodeId::from(s)
}

fn setup_forest() -> Codex {
    let codex = Codex::with_canonical_axes(CodexConfig::default()).unwrap();
    let nodes = [
        ("forest", ScaleLayer::Macro, 0.8, 0.6),
        ("tree", ScaleLayer::Macro, 0.75, 0.55),
        ("leaf", ScaleLayer::Meso, 0.7, 0.4),
        ("cell", ScaleLayer::Micro, 0.2, 0.9),
    ];
    for (name, layer, harmony, trust) in nodes {
        codex
            .add_node(
                FractalNode::new(name, name, layer)
                    .with_axis_value("noise-harmony", harmony, 1.0)
                    .with_axis_value("fear-trust", trust, 0.5)
                    .with_tag("kind", "living"),
            )
            .unwrap();
    }
    codex.add_relationship(&id("forest"), &id("tree")).unwrap();
    codex.add_relationship(&id("tree"), &id("leaf")).unwrap();
    codex.add_relationship(&id("leaf"), &id("cell")).unwrap();
    codex.remove_relationship(&id("leaf"), &id("cell")).unwrap();
    codex.evaluate(&id("cell"), 2).unwrap();
    codex.evaluate(&id("forest"), 1).unwrap();
    codex.update_coherence_field(&id("forest"), 2).unwrap();
    codex
}

// ============================================================================
// 1. Store round trip
// ============================================================================

#[tokio::test]
async fn test_save_and_load_through_store() {
    let codex = setup_forest();
    let store = MemoryStore::new();
    codex.save_to(&store).await.unwrap();
    assert_eq!(store.save_count(), 1);

    let restored = Codex::load_from(&store).await.unwrap().unwrap();
    assert_eq!(restored.get_node(&id("leaf")).unwrap(), codex.get_node(&id("leaf")).unwrap());
    assert_eq!(
        restored.get_relationship(&id("leaf"), &id("cell")).unwrap().weight,
        0.05
    );
    assert_eq!(restored.decisions(), codex.decisions());
    assert_eq!(
        restored.get_coherence_field(&id("forest"), 2).unwrap(),
        codex.get_coherence_field(&id("forest"), 2).unwrap()
    );
}

#[tokio::test]
async fn test_empty_store_loads_nothing() {
    let store = MemoryStore::new();
    assert!(Codex::load_from(&store).await.unwrap().is_none());
}

#[tokio::test]
async fn test_restored_codex_scores_identically() {
    let codex = setup_forest();
    let store = MemoryStore::new();
    codex.save_to(&store).await.unwrap();
    let restored = Codex::load_from(&store).await.unwrap().unwrap();

    for (a, b) in [("forest", "tree"), ("leaf", "cell"), ("tree", "cell")] {
        assert_eq!(
            codex.pairwise_resonance(&id(a), &id(b)).unwrap().score,
            restored.pairwise_resonance(&id(a), &id(b)).unwrap().score
        );
    }
    assert_eq!(
        codex.neighborhood_resonance(&id("tree"), 2).unwrap().score.score,
        restored.neighborhood_resonance(&id("tree"), 2).unwrap().score.score
    );

    // decision ids continue where the snapshot left off
    let next = restored.evaluate(&id("tree"), 1).unwrap();
    assert_eq!(next.id.0, codex.decisions().len() as u64 + 1);
}

#[tokio::test]
async fn test_store_after_shutdown() {
    let store = MemoryStore::new();
    store.shutdown().await.unwrap();
    let codex = setup_forest();
    assert!(matches!(codex.save_to(&store).await, Err(Error::Storage(_))));
}

// ============================================================================
// 2. JSON snapshots
// ============================================================================

#[test]
fn test_snapshot_json_round_trip() {
    let codex = setup_forest();
    let state = codex.snapshot();
    assert_eq!(state.axes.len(), 4);
    assert_eq!(state.nodes.len(), 4);
    assert_eq!(state.edges.len(), 3);

    let json = state.to_json().unwrap();
    let parsed = CodexState::from_json(&json).unwrap();
    assert_eq!(parsed, state);

    let restored = Codex::restore(parsed).unwrap();
    assert_eq!(restored.statistics().edge_count, 3);
    assert_eq!(
        restored.get_node(&id("cell")).unwrap().contribution,
        codex.get_node(&id("cell")).unwrap().contribution
    );
}

#[test]
fn test_restore_rejects_same_layer_cycle() {
    let codex = Codex::with_canonical_axes(CodexConfig::default()).unwrap();
    codex.add_node(FractalNode::new("a", "A", ScaleLayer::Meso)).unwrap();
    codex.add_node(FractalNode::new("b", "B", ScaleLayer::Meso)).unwrap();
    codex.add_relationship(&id("a"), &id("b")).unwrap();

    let mut state = codex.snapshot();
    let mut reversed = state.edges[0].clone();
    std::mem::swap(&mut reversed.parent, &mut reversed.child);
    state.edges.push(reversed);
    for node in &mut state.nodes {
        let other = if node.id == id("a") { id("b") } else { id("a") };
        node.children.insert(other.clone());
        node.parents.insert(other);
    }
    assert!(matches!(Codex::restore(state), Err(Error::Cycle { .. })));
}

#[test]
fn test_restore_rejects_out_of_range_values() {
    let codex = setup_forest();
    let mut state = codex.snapshot();
    if let Some(value) = state.nodes[0].axis_values.values_mut().next() {
        value.value = 1.5;
    }
    assert!(matches!(Codex::restore(state), Err(Error::InvalidValue(_))));
}

#[test]
fn test_restore_rejects_contribution_below_floor() {
    let codex = setup_forest();
    let mut state = codex.snapshot();
    state.nodes[0].contribution = 0.001;
    assert!(matches!(Codex::restore(state), Err(Error::InvalidValue(_))));
}

#[test]
fn test_malformed_snapshot() {
    assert!(matches!(CodexState::from_json("{\"version\": 1"), Err(Error::Serialization(_))));
}

// ============================================================================
// 3. Reports
// ============================================================================

#[test]
fn test_json_report() {
    let codex = setup_forest();
    let mut out = Vec::new();
    codex.write_report(&mut out).unwrap();

    let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(doc["graph"]["node_count"], 4);
    assert_eq!(doc["governance"]["decisions"], 2);
    assert_eq!(doc["nodes"].as_array().map(Vec::len), Some(4));
    assert_eq!(doc["axes"].as_array().map(Vec::len), Some(4));
    assert_eq!(doc["fields"][0]["stale"], false);

    let report = codex.report().unwrap();
    let forest = report.nodes.iter().find(|n| n.id == id("forest")).unwrap();
    assert!(forest.consonance.is_some());
    assert_eq!(report.governance.outcomes.values().sum::<usize>(), 2);
    assert!(report.governance.outcomes.contains_key(&Outcome::Fade));
}
