//! # Resonance
//!
//! Pure scoring over the graph. Nothing here mutates state; every function
//! takes the graph (and registry, where consonance is involved) by reference.
//!
//! - pairwise: confidence-weighted mean of `1 − |va − vb|` over shared axes
//! - neighborhood: pairwise scores against every node within a radius,
//!   weighted by `exp(−λ · depth)` × contribution × reach

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ResonanceConfig;
use crate::graph::FractalGraph;
use crate::model::*;
use crate::registry::AxisRegistry;
use crate::Result;

/// A neighborhood score together with who produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborhoodResonance {
    pub score: ResonanceScore,
    /// Neighbors whose pairwise resonance was defined.
    pub contributors: BTreeSet<NodeId>,
    /// Deepest hop among contributors. 0 when there are none.
    pub depth_reached: usize,
}

impl NeighborhoodResonance {
    pub fn anchor(&self) -> &NodeId {
        &self.score.subject
    }
}

/// Stateless scorer, parameterized by its decay rate.
#[derive(Debug, Clone, Default)]
pub struct ResonanceCalculator {
    config: ResonanceConfig,
}

#[derive(Default)]
struct AxisAccumulator {
    weighted_alignment: f64,
    weight: f64,
}

impl ResonanceCalculator {
    pub fn new(config: ResonanceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResonanceConfig {
        &self.config
    }

    /// Resonance between two nodes. Symmetric; `pairwise(a, a) == 1.0`
    /// whenever `a` sits on at least one axis.
    pub fn pairwise_resonance(&self, graph: &FractalGraph, a: &NodeId, b: &NodeId) -> Result<ResonanceScore> {
        let na = graph.get_node(a)?;
        let nb = graph.get_node(b)?;
        Ok(pairwise(na, nb))
    }

    /// Weighted resonance of `node` against everything within `radius` hops,
    /// in both directions.
    pub fn neighborhood_resonance(
        &self,
        graph: &FractalGraph,
        node: &NodeId,
        radius: usize,
    ) -> Result<NeighborhoodResonance> {
        let subject = graph.get_node(node)?;
        let scope = ScoreScope::Neighborhood { radius };

        let mut contributors = BTreeSet::new();
        let mut depth_reached = 0;
        let mut total_weight = 0.0;
        let mut weighted_sum = 0.0;
        let mut per_axis: BTreeMap<AxisId, AxisAccumulator> = BTreeMap::new();

        for step in graph.traverse(node, Direction::Both, radius)?.skip(1) {
            let neighbor = graph.get_node(&step.node)?;
            let pair = pairwise(subject, neighbor);
            if pair.is_undefined() {
                continue;
            }
            let weight = (-self.config.decay_rate * step.depth as f64).exp() * neighbor.contribution * step.reach;
            weighted_sum += weight * pair.score;
            total_weight += weight;
            for c in &pair.contributions {
                let acc = per_axis.entry(c.axis.clone()).or_default();
                acc.weighted_alignment += weight * c.alignment;
                acc.weight += weight;
            }
            depth_reached = depth_reached.max(step.depth);
            contributors.insert(step.node);
        }

        let score = if contributors.is_empty() {
            ResonanceScore::undefined(node.clone(), scope)
        } else if total_weight > 0.0 {
            let axis_total: f64 = per_axis.values().map(|acc| acc.weight).sum();
            let contributions = per_axis
                .into_iter()
                .map(|(axis, acc)| AxisContribution {
                    axis,
                    alignment: if acc.weight > 0.0 { acc.weighted_alignment / acc.weight } else { 0.0 },
                    weight: if axis_total > 0.0 { acc.weight / axis_total } else { 0.0 },
                })
                .collect();
            ResonanceScore::defined(node.clone(), scope, weighted_sum / total_weight, contributions)
        } else {
            // Every path weight underflowed; there is no usable signal.
            ResonanceScore::undefined(node.clone(), scope)
        };

        debug!(
            node = %node,
            radius,
            contributors = contributors.len(),
            score = score.score,
            undefined = score.undefined,
            "neighborhood resonance"
        );
        Ok(NeighborhoodResonance { score, contributors, depth_reached })
    }

    /// Neighborhood scores for each anchor, strongest first.
    ///
    /// Ties go to the shallower neighborhood, then the smaller anchor id.
    /// Undefined neighborhoods sort last.
    pub fn rank_neighborhoods(
        &self,
        graph: &FractalGraph,
        anchors: &[NodeId],
        radius: usize,
    ) -> Result<Vec<NeighborhoodResonance>> {
        let mut ranked = anchors
            .iter()
            .map(|anchor| self.neighborhood_resonance(graph, anchor, radius))
            .collect::<Result<Vec<_>>>()?;
        ranked.sort_by(compare_neighborhoods);
        Ok(ranked)
    }

    pub fn strongest_neighborhood(
        &self,
        graph: &FractalGraph,
        anchors: &[NodeId],
        radius: usize,
    ) -> Result<Option<NeighborhoodResonance>> {
        Ok(self.rank_neighborhoods(graph, anchors, radius)?.into_iter().next())
    }

    /// Mean consonance of a node's axis positions.
    pub fn profile_consonance(&self, registry: &AxisRegistry, graph: &FractalGraph, node: &NodeId) -> Result<Option<f64>> {
        Ok(registry.profile_consonance(&graph.get_node(node)?.axis_values))
    }

    /// How tightly the graph agrees on one axis: mean `1 − |Δ|` over every
    /// pair of nodes placed on it. 0 with fewer than two placements.
    pub fn axis_coherence(&self, graph: &FractalGraph, axis: &AxisId) -> f64 {
        let mut values: Vec<(&NodeId, f64)> = graph
            .nodes()
            .filter_map(|n| n.axis_value(axis).map(|v| (&n.id, v.value)))
            .collect();
        if values.len() < 2 {
            return 0.0;
        }
        values.sort_by(|a, b| a.0.cmp(b.0));

        let mut sum = 0.0;
        let mut pairs = 0usize;
        for (i, (_, x)) in values.iter().enumerate() {
            for (_, y) in &values[i + 1..] {
                sum += 1.0 - (x - y).abs();
                pairs += 1;
            }
        }
        sum / pairs as f64
    }
}

/// Pairwise resonance between two nodes already in hand.
pub(crate) fn pairwise(a: &FractalNode, b: &FractalNode) -> ResonanceScore {
    let scope = ScoreScope::Peer(b.id.clone());
    let shared: Vec<(&AxisId, f64, f64)> = a
        .axis_values
        .iter()
        .filter_map(|(axis, va)| {
            b.axis_values
                .get(axis)
                .map(|vb| (axis, 1.0 - (va.value - vb.value).abs(), va.confidence * vb.confidence))
        })
        .collect();
    if shared.is_empty() {
        return ResonanceScore::undefined(a.id.clone(), scope);
    }

    let total: f64 = shared.iter().map(|(_, _, w)| w).sum();
    let n = shared.len() as f64;
    let share = |w: f64| if total > 0.0 { w / total } else { 1.0 / n };

    let score = if total > 0.0 {
        shared.iter().map(|(_, align, w)| align * w).sum::<f64>() / total
    } else {
        shared.iter().map(|(_, align, _)| align).sum::<f64>() / n
    };
    let contributions: Contributions = shared
        .iter()
        .map(|(axis, align, w)| AxisContribution {
            axis: (*axis).clone(),
            alignment: *align,
            weight: share(*w),
        })
        .collect();
    ResonanceScore::defined(a.id.clone(), scope, score, contributions)
}

fn compare_neighborhoods(a: &NeighborhoodResonance, b: &NeighborhoodResonance) -> Ordering {
    a.score
        .undefined
        .cmp(&b.score.undefined)
        .then_with(|| b.score.score.partial_cmp(&a.score.score).unwrap_or(Ordering::Equal))
        .then_with(|| a.depth_reached.cmp(&b.depth_reached))
        .then_with(|| a.anchor().cmp(b.anchor()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConsonancePolicy, GraphConfig};

    const FT: &str = "fear-trust";
    const NH: &str = "noise-harmony";

    fn setup(nodes: Vec<FractalNode>) -> (AxisRegistry, FractalGraph) {
        let reg = AxisRegistry::with_canonical_axes(ConsonancePolicy::default()).unwrap();
        let mut g = FractalGraph::new(GraphConfig::default());
        for n in nodes {
            g.add_node(&reg, n).unwrap();
        }
        (reg, g)
    }

    fn node(id: &str) -> FractalNode {
        FractalNode::new(id, id, ScaleLayer::Meso)
    }

    #[test]
    fn test_pairwise_single_axis() {
        let (_, g) = setup(vec![node("x").with_axis_value(FT, 0.9, 1.0), node("y").with_axis_value(FT, 0.1, 1.0)]);
        let calc = ResonanceCalculator::default();
        let s = calc.pairwise_resonance(&g, &"x".into(), &"y".into()).unwrap();
        assert!((s.score - 0.2).abs() < 1e-9);
        assert!(!s.undefined);
        assert_eq!(s.contributions.len(), 1);
    }

    #[test]
    fn test_pairwise_confidence_weighting() {
        let (_, g) = setup(vec![
            node("a").with_axis_value(FT, 0.5, 1.0).with_axis_value(NH, 0.0, 1.0),
            node("b").with_axis_value(FT, 0.5, 1.0).with_axis_value(NH, 1.0, 0.0),
        ]);
        let s = ResonanceCalculator::default().pairwise_resonance(&g, &"a".into(), &"b".into()).unwrap();
        // the zero-confidence axis carries no weight
        assert!((s.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pairwise_no_shared_axes() {
        let (_, g) = setup(vec![node("a").with_axis_value(FT, 0.5, 1.0), node("b").with_axis_value(NH, 0.5, 1.0)]);
        let s = ResonanceCalculator::default().pairwise_resonance(&g, &"a".into(), &"b".into()).unwrap();
        assert!(s.undefined);
        assert_eq!(s.score, 0.0);
    }

    #[test]
    fn test_pairwise_reflexive_with_zero_confidence() {
        let (_, g) = setup(vec![node("a").with_axis_value(FT, 0.3, 0.0)]);
        let s = ResonanceCalculator::default().pairwise_resonance(&g, &"a".into(), &"a".into()).unwrap();
        assert_eq!(s.score, 1.0);
    }

    #[test]
    fn test_pairwise_unknown_node() {
        let (_, g) = setup(vec![node("a")]);
        let result = ResonanceCalculator::default().pairwise_resonance(&g, &"a".into(), &"zz".into());
        assert!(matches!(result, Err(crate::Error::NotFound(_))));
    }

    #[test]
    fn test_neighborhood_isolated_is_undefined() {
        let (_, g) = setup(vec![node("a").with_axis_value(FT, 0.5, 1.0)]);
        let n = ResonanceCalculator::default().neighborhood_resonance(&g, &"a".into(), 3).unwrap();
        assert!(n.score.undefined);
        assert!(n.contributors.is_empty());
    }

    #[test]
    fn test_neighborhood_decay() {
        let (_, mut g) = setup(vec![
            node("a").with_axis_value(FT, 0.5, 1.0),
            node("b").with_axis_value(FT, 0.5, 1.0),
            node("c").with_axis_value(FT, 0.0, 1.0),
        ]);
        g.add_relationship(&"a".into(), &"b".into()).unwrap();
        g.add_relationship(&"b".into(), &"c".into()).unwrap();

        let calc = ResonanceCalculator::default();
        let near = calc.neighborhood_resonance(&g, &"a".into(), 1).unwrap();
        assert!((near.score.score - 1.0).abs() < 1e-9);
        assert_eq!(near.depth_reached, 1);

        // b at depth 1 (weight 0.5, score 1.0), c at depth 2 (weight 0.25, score 0.5)
        let far = calc.neighborhood_resonance(&g, &"a".into(), 2).unwrap();
        let expected = (0.5 * 1.0 + 0.25 * 0.5) / 0.75;
        assert!((far.score.score - expected).abs() < 1e-9);
        assert_eq!(far.contributors.len(), 2);
    }

    #[test]
    fn test_neighborhood_skips_undefined_neighbors() {
        let (_, mut g) = setup(vec![
            node("a").with_axis_value(FT, 0.5, 1.0),
            node("b").with_axis_value(NH, 0.5, 1.0),
            node("c").with_axis_value(FT, 0.4, 1.0),
        ]);
        g.add_relationship(&"a".into(), &"b".into()).unwrap();
        g.add_relationship(&"a".into(), &"c".into()).unwrap();
        let n = ResonanceCalculator::default().neighborhood_resonance(&g, &"a".into(), 1).unwrap();
        assert_eq!(n.contributors.iter().map(|c| c.as_str()).collect::<Vec<_>>(), vec!["c"]);
        assert!((n.score.score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_rank_tie_breaks_by_anchor() {
        let (_, mut g) = setup(vec![
            node("b").with_axis_value(FT, 0.5, 1.0),
            node("a").with_axis_value(FT, 0.5, 1.0),
            node("c").with_axis_value(FT, 0.5, 1.0),
        ]);
        g.add_relationship(&"a".into(), &"c".into()).unwrap();
        g.add_relationship(&"b".into(), &"c".into()).unwrap();
        let calc = ResonanceCalculator::default();
        let ranked = calc.rank_neighborhoods(&g, &["b".into(), "a".into()], 1).unwrap();
        assert_eq!(ranked[0].anchor().as_str(), "a");
        let best = calc.strongest_neighborhood(&g, &["b".into(), "a".into()], 1).unwrap().unwrap();
        assert_eq!(best.anchor().as_str(), "a");
    }

    #[test]
    fn test_axis_coherence() {
        let (_, g) = setup(vec![
            node("a").with_axis_value(FT, 0.2, 1.0),
            node("b").with_axis_value(FT, 0.4, 1.0),
            node("c").with_axis_value(NH, 0.9, 1.0),
        ]);
        let calc = ResonanceCalculator::default();
        assert!((calc.axis_coherence(&g, &AxisId::from(FT)) - 0.8).abs() < 1e-9);
        assert_eq!(calc.axis_coherence(&g, &AxisId::from(NH)), 0.0);
    }

    #[test]
    fn test_profile_consonance() {
        let (reg, g) = setup(vec![node("a").with_axis_value(FT, 0.5, 1.0), node("b")]);
        let calc = ResonanceCalculator::default();
        assert_eq!(calc.profile_consonance(&reg, &g, &"a".into()).unwrap(), Some(1.0));
        assert_eq!(calc.profile_consonance(&reg, &g, &"b".into()).unwrap(), None);
    }
}
