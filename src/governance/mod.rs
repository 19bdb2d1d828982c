//! # Governance
//!
//! Turns resonance into decisions. A subject whose neighborhood resonates is
//! amplified, one that clashes fades toward a non-zero floor, everything in
//! between is maintained. Nothing is ever removed.
//!
//! The engine also owns the coherence fields: aggregate pair-resonance over a
//! bounded neighborhood, classified into a [`FieldPattern`]. Fields remember
//! the graph revision they were computed at and can be refreshed in batch
//! once the graph has moved on.
//!
//! Every decision with a defined basis feeds two bounded histories: a rolling
//! system coherence log and a per-node log of basis scores. Both are derived
//! from the decision log, so a restored engine rebuilds them by replay.

mod strategy;

pub use strategy::{ExplorationStrategy, FirstCandidate, RoundRobin};

use std::collections::{BTreeMap, VecDeque};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::GovernanceConfig;
use crate::graph::FractalGraph;
use crate::model::*;
use crate::resonance::{pairwise, ResonanceCalculator};
use crate::{Error, Result};

/// Summary of everything the engine has decided so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceAnalytics {
    pub decisions: usize,
    pub outcomes: BTreeMap<Outcome, usize>,
    /// Mean basis score over decisions with a defined basis.
    pub mean_basis_score: f64,
    pub fields: usize,
    pub patterns: BTreeMap<FieldPattern, usize>,
    /// Rolling mean of recent coherence contributions.
    pub system_coherence: f64,
    /// Mean confidence over all decisions.
    pub mean_confidence: f64,
}

/// Confidence bonus per participant behind a decision.
const CONFIDENCE_PER_PARTICIPANT: f64 = 0.05;
/// Ceiling on the participant bonus.
const MAX_PARTICIPANT_BONUS: f64 = 0.3;

/// Confidence in a decision: the basis score plus a capped bonus for the
/// number of participants it was computed from, clamped to [0, 1].
pub fn decision_confidence(basis_score: f64, participants: usize) -> f64 {
    let bonus = (participants as f64 * CONFIDENCE_PER_PARTICIPANT).min(MAX_PARTICIPANT_BONUS);
    (basis_score + bonus).clamp(0.0, 1.0)
}

#[derive(Debug, Clone)]
pub struct GovernanceEngine {
    config: GovernanceConfig,
    calculator: ResonanceCalculator,
    fields: BTreeMap<FieldKey, CoherenceField>,
    decisions: Vec<GovernanceDecision>,
    next_decision: u64,
    coherence_history: VecDeque<f64>,
    node_history: BTreeMap<NodeId, VecDeque<f64>>,
}

impl GovernanceEngine {
    pub fn new(config: GovernanceConfig, calculator: ResonanceCalculator) -> Self {
        Self {
            config,
            calculator,
            fields: BTreeMap::new(),
            decisions: Vec::new(),
            next_decision: 1,
            coherence_history: VecDeque::new(),
            node_history: BTreeMap::new(),
        }
    }

    /// Rebuild an engine from persisted decisions and fields. Histories are
    /// replayed from the decision log.
    pub fn from_parts(
        config: GovernanceConfig,
        calculator: ResonanceCalculator,
        decisions: Vec<GovernanceDecision>,
        fields: Vec<CoherenceField>,
    ) -> Self {
        let next_decision = decisions.iter().map(|d| d.id.0).max().map_or(1, |max| max + 1);
        let mut engine = Self {
            config,
            calculator,
            fields: fields.into_iter().map(|f| (f.key(), f)).collect(),
            decisions: Vec::new(),
            next_decision,
            coherence_history: VecDeque::new(),
            node_history: BTreeMap::new(),
        };
        for decision in &decisions {
            engine.track(decision);
        }
        engine.decisions = decisions;
        engine
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    pub fn calculator(&self) -> &ResonanceCalculator {
        &self.calculator
    }

    // ========================================================================
    // Decisions
    // ========================================================================

    /// Classify a basis score. Undefined bases are always maintained.
    pub fn decide(&self, score: f64, undefined: bool) -> Outcome {
        if undefined {
            Outcome::Maintain
        } else if score >= self.config.amplify_threshold {
            Outcome::Amplify
        } else if score <= self.config.fade_threshold {
            Outcome::Fade
        } else {
            Outcome::Maintain
        }
    }

    /// Weight after applying `outcome` to `weight`.
    ///
    /// Amplify adds a step, capped at 1. Fade closes a fixed fraction of the
    /// gap to the floor, so repeated fades approach but never cross it.
    pub fn apply(&self, outcome: Outcome, weight: f64) -> f64 {
        let floor = self.config.weight_floor;
        match outcome {
            Outcome::Amplify => (weight + self.config.amplify_step).min(1.0),
            Outcome::Maintain => weight,
            Outcome::Fade => (floor + (weight - floor) * (1.0 - self.config.fade_rate)).max(floor),
        }
    }

    /// Judge a node by its neighborhood and adjust its contribution weight.
    pub fn evaluate(&mut self, graph: &mut FractalGraph, node: &NodeId, radius: usize) -> Result<GovernanceDecision> {
        let neighborhood = self.calculator.neighborhood_resonance(graph, node, radius)?;
        let participants = neighborhood.contributors.len();
        let basis = neighborhood.score;
        let weight_before = graph.get_node(node)?.contribution;
        let outcome = self.decide(basis.score, basis.undefined);
        let weight_after = self.apply(outcome, weight_before);
        if weight_after != weight_before {
            graph.set_contribution(node, weight_after)?;
        }
        Ok(self.record(Subject::Node(node.clone()), outcome, basis, participants, weight_before, weight_after))
    }

    /// Judge an edge by how well its endpoints resonate and adjust its weight.
    pub fn evaluate_relationship(
        &mut self,
        graph: &mut FractalGraph,
        parent: &NodeId,
        child: &NodeId,
    ) -> Result<GovernanceDecision> {
        let key = graph.get_relationship(parent, child)?.key();
        let weight_before = graph.get_relationship(parent, child)?.weight;
        let basis = self.calculator.pairwise_resonance(graph, parent, child)?;
        let outcome = self.decide(basis.score, basis.undefined);
        let target = self.apply(outcome, weight_before);
        if target != weight_before {
            graph.set_edge_weight(&key, target)?;
        }
        let weight_after = graph.get_relationship(parent, child)?.weight;
        Ok(self.record(Subject::Relationship(key), outcome, basis, 2, weight_before, weight_after))
    }

    fn record(
        &mut self,
        subject: Subject,
        outcome: Outcome,
        basis: ResonanceScore,
        participants: usize,
        weight_before: f64,
        weight_after: f64,
    ) -> GovernanceDecision {
        let confidence = decision_confidence(basis.score, participants);
        let decision = GovernanceDecision {
            id: DecisionId(self.next_decision),
            subject,
            outcome,
            basis_score: basis.score,
            undefined_basis: basis.undefined,
            rationale: basis.contributions,
            weight_before,
            weight_after,
            confidence,
            decided_at: Utc::now(),
        };
        self.next_decision += 1;
        self.track(&decision);
        info!(
            id = %decision.id,
            subject = %decision.subject,
            %outcome,
            score = decision.basis_score,
            weight = weight_after,
            confidence,
            "governance decision"
        );
        self.decisions.push(decision.clone());
        decision
    }

    /// Decision log, oldest first.
    pub fn decisions(&self) -> &[GovernanceDecision] {
        &self.decisions
    }

    /// Feed a decision into the bounded histories. Undefined bases carry no
    /// signal and are skipped.
    fn track(&mut self, decision: &GovernanceDecision) {
        if decision.undefined_basis {
            return;
        }
        let score = decision.basis_score;
        push_bounded(&mut self.coherence_history, score, self.config.coherence_history_limit);

        let limit = self.config.node_history_limit;
        let nodes = match &decision.subject {
            Subject::Node(id) => vec![id],
            Subject::Relationship(key) => vec![&key.parent, &key.child],
        };
        for id in nodes {
            let history = self.node_history.entry(id.clone()).or_default();
            push_bounded(history, score, limit);
        }
    }

    // ========================================================================
    // Histories
    // ========================================================================

    /// Mean of the most recent coherence contributions (`coherence_window`
    /// of them). 0 before any decision with a defined basis.
    pub fn system_coherence(&self) -> f64 {
        let window = self.config.coherence_window.min(self.coherence_history.len());
        if window == 0 {
            return 0.0;
        }
        let recent = self.coherence_history.iter().rev().take(window);
        recent.sum::<f64>() / window as f64
    }

    /// Every retained coherence contribution, oldest first.
    pub fn coherence_history(&self) -> Vec<f64> {
        self.coherence_history.iter().copied().collect()
    }

    /// Basis scores of decisions involving `node`, oldest first.
    pub fn node_history(&self, node: &NodeId) -> Vec<f64> {
        self.node_history
            .get(node)
            .map(|h| h.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Mean of the node's retained basis scores.
    pub fn mean_node_resonance(&self, node: &NodeId) -> Option<f64> {
        let history = self.node_history.get(node).filter(|h| !h.is_empty())?;
        Some(history.iter().sum::<f64>() / history.len() as f64)
    }

    // ========================================================================
    // Coherence fields
    // ========================================================================

    /// Compute (or recompute) the field around `anchor` and store it.
    ///
    /// Participants are the traversal order within `radius`, anchor first,
    /// capped at `max_field_participants`. The aggregate is the mean of every
    /// defined pairwise resonance among them.
    pub fn update_coherence_field(
        &mut self,
        graph: &FractalGraph,
        anchor: &NodeId,
        radius: usize,
    ) -> Result<&CoherenceField> {
        let field = self.compute_field(graph, anchor, radius)?;
        debug!(
            field = %field.key(),
            participants = field.participants.len(),
            aggregate = field.aggregate,
            pattern = %field.pattern,
            "coherence field updated"
        );
        let key = field.key();
        self.fields.insert(key.clone(), field);
        self.get_coherence_field(&key.anchor, key.radius)
    }

    fn compute_field(&self, graph: &FractalGraph, anchor: &NodeId, radius: usize) -> Result<CoherenceField> {
        let participants: Vec<NodeId> = graph
            .traverse(anchor, Direction::Both, radius)?
            .take(self.config.max_field_participants)
            .map(|step| step.node)
            .collect();
        let nodes = participants
            .iter()
            .map(|id| graph.get_node(id))
            .collect::<Result<Vec<_>>>()?;

        let mut scores = Vec::new();
        for (i, a) in nodes.iter().enumerate() {
            for b in &nodes[i + 1..] {
                let pair = pairwise(a, b);
                if !pair.undefined {
                    scores.push(pair.score);
                }
            }
        }

        let (aggregate, variance) = if scores.is_empty() {
            (0.0, 0.0)
        } else {
            let n = scores.len() as f64;
            let mean = scores.iter().sum::<f64>() / n;
            let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
            (mean.clamp(0.0, 1.0), variance)
        };
        let pattern = if scores.is_empty() {
            FieldPattern::Neutral
        } else {
            self.classify(aggregate, variance)
        };

        Ok(CoherenceField {
            anchor: anchor.clone(),
            radius,
            participants,
            aggregate,
            variance,
            pattern,
            revision: graph.revision(),
            updated_at: Utc::now(),
        })
    }

    /// Pattern for a field with the given mean and variance of pair scores.
    pub fn classify(&self, mean: f64, variance: f64) -> FieldPattern {
        let tight = variance <= self.config.low_variance;
        if tight && mean >= self.config.harmonic_mean {
            FieldPattern::Harmonic
        } else if tight && mean <= self.config.dissonant_mean {
            FieldPattern::Dissonant
        } else if mean >= self.config.sympathetic_mean {
            FieldPattern::Sympathetic
        } else {
            FieldPattern::Neutral
        }
    }

    pub fn get_coherence_field(&self, anchor: &NodeId, radius: usize) -> Result<&CoherenceField> {
        self.fields
            .get(&FieldKey::new(anchor.clone(), radius))
            .ok_or_else(|| Error::NotFound(format!("Coherence field {anchor}@{radius}")))
    }

    /// All stored fields, in (anchor, radius) order.
    pub fn fields(&self) -> impl Iterator<Item = &CoherenceField> {
        self.fields.values()
    }

    /// Fields computed against an older graph revision.
    pub fn stale_fields(&self, graph: &FractalGraph) -> Vec<FieldKey> {
        let current = graph.revision();
        self.fields
            .values()
            .filter(|f| f.revision < current)
            .map(CoherenceField::key)
            .collect()
    }

    /// Recompute every stale field. Returns the keys that were refreshed.
    ///
    /// Fields whose anchor no longer resolves are left untouched.
    pub fn refresh_stale_fields(&mut self, graph: &FractalGraph) -> Result<Vec<FieldKey>> {
        let stale = self.stale_fields(graph);
        let mut refreshed = Vec::with_capacity(stale.len());
        for key in stale {
            if !graph.contains(&key.anchor) {
                continue;
            }
            let field = self.compute_field(graph, &key.anchor, key.radius)?;
            self.fields.insert(key.clone(), field);
            refreshed.push(key);
        }
        if !refreshed.is_empty() {
            info!(count = refreshed.len(), revision = graph.revision(), "refreshed stale coherence fields");
        }
        Ok(refreshed)
    }

    pub fn analytics(&self) -> GovernanceAnalytics {
        let mut outcomes = BTreeMap::new();
        for outcome in [Outcome::Amplify, Outcome::Maintain, Outcome::Fade] {
            outcomes.insert(outcome, 0);
        }
        let mut basis_sum = 0.0;
        let mut basis_count = 0usize;
        for d in &self.decisions {
            *outcomes.entry(d.outcome).or_default() += 1;
            if !d.undefined_basis {
                basis_sum += d.basis_score;
                basis_count += 1;
            }
        }
        let mut patterns = BTreeMap::new();
        for f in self.fields.values() {
            *patterns.entry(f.pattern).or_default() += 1;
        }
        let mean_confidence = if self.decisions.is_empty() {
            0.0
        } else {
            self.decisions.iter().map(|d| d.confidence).sum::<f64>() / self.decisions.len() as f64
        };
        GovernanceAnalytics {
            decisions: self.decisions.len(),
            outcomes,
            mean_basis_score: if basis_count == 0 { 0.0 } else { basis_sum / basis_count as f64 },
            fields: self.fields.len(),
            patterns,
            system_coherence: self.system_coherence(),
            mean_confidence,
        }
    }
}

fn push_bounded(history: &mut VecDeque<f64>, value: f64, limit: usize) {
    history.push_back(value);
    while history.len() > limit {
        history.pop_front();
    }
}
