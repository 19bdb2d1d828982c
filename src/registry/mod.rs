//! # Axis Registry
//!
//! Owns the set of vibrational axes and the consonance function. Built once
//! by the composition root and passed by reference to whatever needs it.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::config::{BonusCap, ConsonancePolicy};
use crate::model::{in_unit_range, AxisId, AxisValue, HarmonicTag, Polarity, VibrationalAxis};
use crate::{Error, Result};

/// Registry of scoring dimensions.
#[derive(Debug, Clone, Default)]
pub struct AxisRegistry {
    axes: BTreeMap<AxisId, VibrationalAxis>,
    policy: ConsonancePolicy,
}

impl AxisRegistry {
    pub fn new(policy: ConsonancePolicy) -> Self {
        Self { axes: BTreeMap::new(), policy }
    }

    /// Registry pre-seeded with the four canonical axes.
    pub fn with_canonical_axes(policy: ConsonancePolicy) -> Result<Self> {
        let mut registry = Self::new(policy);
        for axis in canonical_axes() {
            registry.register_axis(axis)?;
        }
        Ok(registry)
    }

    /// Register an axis. Fails if the default is out of range or the id is taken.
    pub fn register_axis(&mut self, axis: VibrationalAxis) -> Result<AxisId> {
        if !in_unit_range(axis.default_value) {
            warn!(axis = %axis.id, default = axis.default_value, "rejected axis with out-of-range default");
            return Err(Error::InvalidValue(format!(
                "axis {} default {} outside [0, 1]", axis.id, axis.default_value
            )));
        }
        if self.axes.contains_key(&axis.id) {
            warn!(axis = %axis.id, "rejected duplicate axis");
            return Err(Error::InvalidValue(format!("axis {} already registered", axis.id)));
        }
        let id = axis.id.clone();
        info!(axis = %id, polarity = %axis.polarity, "registered axis");
        self.axes.insert(id.clone(), axis);
        Ok(id)
    }

    pub fn get_axis(&self, id: &AxisId) -> Result<&VibrationalAxis> {
        self.axes.get(id).ok_or_else(|| Error::NotFound(format!("Axis {id}")))
    }

    pub fn contains(&self, id: &AxisId) -> bool {
        self.axes.contains_key(id)
    }

    /// All axes in id order.
    pub fn axes(&self) -> impl Iterator<Item = &VibrationalAxis> {
        self.axes.values()
    }

    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    pub fn policy(&self) -> ConsonancePolicy {
        self.policy
    }

    /// Consonance of a position on an axis.
    ///
    /// `1 − |0.5 − value| × 2`, plus the axis metaphor bonus, clamped to [0, 1].
    /// Out-of-range inputs are clamped first. NaN scores 0, bonus included.
    pub fn consonance(&self, value: f64, axis: &VibrationalAxis) -> f64 {
        if value.is_nan() {
            return 0.0;
        }
        (base_consonance(value) + metaphor_bonus(axis)).clamp(0.0, 1.0)
    }

    /// Mean consonance over a node's axis values, under the configured bonus cap.
    ///
    /// Values on unregistered axes are skipped. Returns `None` if nothing remains.
    pub fn profile_consonance(&self, values: &BTreeMap<AxisId, AxisValue>) -> Option<f64> {
        let placed: Vec<(&VibrationalAxis, f64)> = values
            .iter()
            .filter_map(|(id, v)| self.axes.get(id).map(|axis| (axis, v.value)))
            .collect();
        if placed.is_empty() {
            return None;
        }
        let n = placed.len() as f64;
        let mean = match self.policy.bonus_cap {
            BonusCap::PerAxis => {
                placed.iter().map(|(axis, v)| self.consonance(*v, axis)).sum::<f64>() / n
            }
            BonusCap::Global { ceiling } => {
                let base: f64 = placed.iter().map(|(_, v)| base_consonance(*v)).sum();
                let bonus: f64 = placed.iter().map(|(axis, _)| metaphor_bonus(axis)).sum();
                (base + bonus.min(ceiling)) / n
            }
        };
        debug!(axes = placed.len(), consonance = mean, "profile consonance");
        Some(mean.clamp(0.0, 1.0))
    }
}

fn base_consonance(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    1.0 - (0.5 - value.clamp(0.0, 1.0)).abs() * 2.0
}

fn metaphor_bonus(axis: &VibrationalAxis) -> f64 {
    axis.metaphor.map_or(0.0, HarmonicTag::bonus)
}

// ============================================================================
// Canonical axes
// ============================================================================

/// The four axes every codex starts from.
pub fn canonical_axes() -> Vec<VibrationalAxis> {
    vec![
        VibrationalAxis::new("fear-trust", "Fear↔Trust", Polarity::new("Fear", "Trust"))
            .with_metaphor(HarmonicTag::Major)
            .with_scale_labels(["Fear", "Anxiety", "Caution", "Neutral", "Confidence", "Trust"]),
        VibrationalAxis::new(
            "ownership-stewardship",
            "Ownership↔Stewardship",
            Polarity::new("Ownership", "Stewardship"),
        )
        .with_metaphor(HarmonicTag::Perfect)
        .with_scale_labels(["Ownership", "Control", "Management", "Care", "Nurturing", "Stewardship"]),
        VibrationalAxis::new(
            "protection-openness",
            "Protection↔Openness",
            Polarity::new("Protection", "Openness"),
        )
        .with_metaphor(HarmonicTag::Minor)
        .with_scale_labels(["Protection", "Defense", "Boundaries", "Balance", "Receptivity", "Openness"]),
        VibrationalAxis::new("noise-harmony", "Noise↔Harmony", Polarity::new("Noise", "Harmony"))
            .with_metaphor(HarmonicTag::Perfect)
            .with_scale_labels(["Noise", "Chaos", "Dissonance", "Balance", "Resonance", "Harmony"]),
    ]
}

// ============================================================================
// Tests
// ============================================================================
