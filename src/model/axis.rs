//! Vibrational axes: the scoring dimensions every node is placed on.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};
use super::in_unit_range;

/// Stable axis identifier (e.g. `"fear-trust"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AxisId(pub String);

impl AxisId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AxisId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AxisId {
    fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for AxisId {
    fn from(s: String) -> Self { Self(s) }
}

/// Musical metaphor attached to an axis. Only used for the bounded
/// consonance bonus, never for resonance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarmonicTag {
    Perfect,
    Major,
    Minor,
}

impl HarmonicTag {
    /// Fixed consonance bonus for this tag.
    pub fn bonus(self) -> f64 {
        match self {
            HarmonicTag::Perfect => 0.10,
            HarmonicTag::Major => 0.05,
            HarmonicTag::Minor => 0.03,
        }
    }
}

/// The two named ends of an axis. Value 0.0 sits at `low`, 1.0 at `high`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polarity {
    pub low: String,
    pub high: String,
}

impl Polarity {
    pub fn new(low: impl Into<String>, high: impl Into<String>) -> Self {
        Self { low: low.into(), high: high.into() }
    }
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}↔{}", self.low, self.high)
    }
}

/// A named scoring dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VibrationalAxis {
    pub id: AxisId,
    pub name: String,
    pub polarity: Polarity,
    /// Balance point, in [0, 1].
    pub default_value: f64,
    pub metaphor: Option<HarmonicTag>,
    /// Labels for evenly spaced points along the spectrum, low to high.
    #[serde(default)]
    pub scale_labels: Vec<String>,
}

impl VibrationalAxis {
    pub fn new(id: impl Into<AxisId>, name: impl Into<String>, polarity: Polarity) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            polarity,
            default_value: 0.5,
            metaphor: None,
            scale_labels: Vec::new(),
        }
    }

    pub fn with_default(mut self, default_value: f64) -> Self {
        self.default_value = default_value;
        self
    }

    pub fn with_metaphor(mut self, tag: HarmonicTag) -> Self {
        self.metaphor = Some(tag);
        self
    }

    pub fn with_scale_labels(mut self, labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.scale_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// The scale label closest to `value`, if the axis has labels.
    pub fn label_for(&self, value: f64) -> Option<&str> {
        let n = self.scale_labels.len();
        if n == 0 || !value.is_finite() {
            return None;
        }
        let idx = (value.clamp(0.0, 1.0) * (n - 1) as f64).round() as usize;
        self.scale_labels.get(idx.min(n - 1)).map(String::as_str)
    }
}

/// A node's position on one axis, with the confidence of that placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisValue {
    pub value: f64,
    pub confidence: f64,
}

impl AxisValue {
    /// Validated constructor. Both fields must lie in [0, 1].
    pub fn new(value: f64, confidence: f64) -> Result<Self> {
        let v = Self { value, confidence };
        v.validate()?;
        Ok(v)
    }

    /// Full-confidence value.
    pub fn certain(value: f64) -> Result<Self> {
        Self::new(value, 1.0)
    }

    pub fn validate(&self) -> Result<()> {
        if !in_unit_range(self.value) {
            return Err(Error::InvalidValue(format!(
                "axis value {} outside [0, 1]", self.value
            )));
        }
        if !in_unit_range(self.confidence) {
            return Err(Error::InvalidValue(format!(
                "confidence {} outside [0, 1]", self.confidence
            )));
        }
        Ok(())
    }
}
