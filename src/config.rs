//! Configuration for the codex components.
//!
//! Every section deserializes with per-field defaults, so a partial JSON
//! document (or none at all) yields a usable configuration:
//!
//! ```rust
//! use fractal_codex::CodexConfig;
//!
//! let config = CodexConfig::from_json(r#"{ "governance": { "amplify_threshold": 0.9 } }"#).unwrap();
//! assert_eq!(config.governance.amplify_threshold, 0.9);
//! assert_eq!(config.governance.weight_floor, 0.05);
//! ```

use serde::{Deserialize, Serialize};

use crate::model::in_unit_range;
use crate::{Error, Result};

/// Top-level configuration handed to [`Codex`](crate::Codex).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodexConfig {
    pub registry: ConsonancePolicy,
    pub graph: GraphConfig,
    pub resonance: ResonanceConfig,
    pub governance: GovernanceConfig,
}

impl CodexConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.registry.validate()?;
        self.graph.validate()?;
        self.resonance.validate()?;
        self.governance.validate()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// How metaphor bonuses are capped when consonance is aggregated over a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BonusCap {
    /// Each axis is clamped to [0, 1] on its own.
    PerAxis,
    /// The sum of all bonuses on a node may not exceed `ceiling`.
    Global { ceiling: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsonancePolicy {
    pub bonus_cap: BonusCap,
}

impl Default for ConsonancePolicy {
    fn default() -> Self {
        Self { bonus_cap: BonusCap::PerAxis }
    }
}

impl ConsonancePolicy {
    fn validate(&self) -> Result<()> {
        if let BonusCap::Global { ceiling } = self.bonus_cap {
            if !ceiling.is_finite() || ceiling < 0.0 {
                return Err(Error::InvalidValue(format!("bonus ceiling {ceiling} must be >= 0")));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Graph
// ============================================================================

/// Metric used by cross-scale mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// `1 − mean |Δ|` over shared axes.
    Alignment,
    /// Cosine similarity over shared axes.
    Cosine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Hard ceiling on any traversal depth. Bounds recursion through
    /// cross-layer analog links.
    pub max_traversal_depth: usize,
    /// Minimum (exclusive) similarity for a cross-scale candidate.
    pub cross_scale_threshold: f64,
    pub similarity: SimilarityMetric,
    /// Weight a logically removed edge is lowered to. Must be > 0.
    pub edge_weight_floor: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_traversal_depth: 16,
            cross_scale_threshold: 0.8,
            similarity: SimilarityMetric::Alignment,
            edge_weight_floor: 0.05,
        }
    }
}

impl GraphConfig {
    fn validate(&self) -> Result<()> {
        if !in_unit_range(self.cross_scale_threshold) {
            return Err(Error::InvalidValue(format!(
                "cross_scale_threshold {} outside [0, 1]", self.cross_scale_threshold
            )));
        }
        if !in_unit_range(self.edge_weight_floor) || self.edge_weight_floor == 0.0 {
            return Err(Error::InvalidValue(format!(
                "edge_weight_floor {} must be in (0, 1]", self.edge_weight_floor
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Resonance
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResonanceConfig {
    /// λ in `exp(−λ · depth)`. The default halves a neighbor's weight per hop.
    pub decay_rate: f64,
}

impl Default for ResonanceConfig {
    fn default() -> Self {
        Self { decay_rate: std::f64::consts::LN_2 }
    }
}

impl ResonanceConfig {
    fn validate(&self) -> Result<()> {
        if !self.decay_rate.is_finite() || self.decay_rate < 0.0 {
            return Err(Error::InvalidValue(format!(
                "decay_rate {} must be a finite value >= 0", self.decay_rate
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Governance
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Score at or above which a subject is amplified.
    pub amplify_threshold: f64,
    /// Score at or below which a subject fades.
    pub fade_threshold: f64,
    /// Additive weight increase per amplify, capped at 1.0.
    pub amplify_step: f64,
    /// Fraction of the distance to the floor removed per fade, in (0, 1).
    pub fade_rate: f64,
    /// Contribution weights never go below this. Must be > 0.
    pub weight_floor: f64,
    /// Pair-score variance at or below which a field counts as "tight".
    pub low_variance: f64,
    pub harmonic_mean: f64,
    pub sympathetic_mean: f64,
    pub dissonant_mean: f64,
    /// Upper bound on field participants, nearest first.
    pub max_field_participants: usize,
    /// Coherence contributions kept for the system coherence score.
    pub coherence_history_limit: usize,
    /// Most recent contributions averaged into the system coherence score.
    pub coherence_window: usize,
    /// Basis scores kept per node.
    pub node_history_limit: usize,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            amplify_threshold: 0.8,
            fade_threshold: 0.3,
            amplify_step: 0.1,
            fade_rate: 0.5,
            weight_floor: 0.05,
            low_variance: 0.01,
            harmonic_mean: 0.8,
            sympathetic_mean: 0.6,
            dissonant_mean: 0.4,
            max_field_participants: 256,
            coherence_history_limit: 100,
            coherence_window: 10,
            node_history_limit: 50,
        }
    }
}

impl GovernanceConfig {
    fn validate(&self) -> Result<()> {
        let unit = [
            ("amplify_threshold", self.amplify_threshold),
            ("fade_threshold", self.fade_threshold),
            ("amplify_step", self.amplify_step),
            ("weight_floor", self.weight_floor),
            ("harmonic_mean", self.harmonic_mean),
            ("sympathetic_mean", self.sympathetic_mean),
            ("dissonant_mean", self.dissonant_mean),
        ];
        for (name, v) in unit {
            if !in_unit_range(v) {
                return Err(Error::InvalidValue(format!("{name} {v} outside [0, 1]")));
            }
        }
        if self.fade_threshold >= self.amplify_threshold {
            return Err(Error::InvalidValue(format!(
                "fade_threshold {} must be below amplify_threshold {}",
                self.fade_threshold, self.amplify_threshold
            )));
        }
        if self.weight_floor == 0.0 {
            return Err(Error::InvalidValue("weight_floor must be > 0".into()));
        }
        if !(self.fade_rate > 0.0 && self.fade_rate < 1.0) {
            return Err(Error::InvalidValue(format!(
                "fade_rate {} must be in (0, 1)", self.fade_rate
            )));
        }
        if !self.low_variance.is_finite() || self.low_variance < 0.0 {
            return Err(Error::InvalidValue(format!(
                "low_variance {} must be >= 0", self.low_variance
            )));
        }
        let limits = [
            ("max_field_participants", self.max_field_participants),
            ("coherence_history_limit", self.coherence_history_limit),
            ("coherence_window", self.coherence_window),
            ("node_history_limit", self.node_history_limit),
        ];
        for (name, v) in limits {
            if v == 0 {
                return Err(Error::InvalidValue(format!("{name} must be > 0")));
            }
        }
        if self.coherence_window > self.coherence_history_limit {
            return Err(Error::InvalidValue(format!(
                "coherence_window {} exceeds coherence_history_limit {}",
                self.coherence_window, self.coherence_history_limit
            )));
        }
        Ok(())
    }
}
