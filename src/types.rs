//! Core types for the PCOS CDSS pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw answers, feature vectors, scaled vectors, predictions and
//! explanations.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CdssError;

/// Ordered list of feature names the model was trained on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FeatureSchema(Vec<String>);

impl FeatureSchema {
    /// Build a schema, rejecting duplicate names
    pub fn new(names: Vec<String>) -> Result<Self, CdssError> {
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(CdssError::DuplicateFeature(name.clone()));
            }
        }
        Ok(Self(names))
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<'de> Deserialize<'de> for FeatureSchema {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let names = Vec::<String>::deserialize(deserializer)?;
        FeatureSchema::new(names).map_err(serde::de::Error::custom)
    }
}

/// A single raw form answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// Small integer code (0/1/2) or whole-number measurement
    Integer(i64),
    /// Numeric measurement
    Number(f64),
    /// Categorical label ("Yes", "Irregular", ...)
    Text(String),
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Integer(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Integer(v) => write!(f, "{v}"),
            RawValue::Number(v) => write!(f, "{v}"),
            RawValue::Text(s) => f.write_str(s),
        }
    }
}

/// Question label → raw answer, created fresh per submission
pub type RawAnswers = BTreeMap<String, RawValue>;

/// Unscaled numeric features, in schema order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Feature vector after the fitted scaler's affine transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScaledVector(Vec<f64>);

impl ScaledVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Discrete risk class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLabel {
    NoRisk,
    Risk,
}

impl RiskLabel {
    pub fn from_class(class: u8) -> Self {
        if class == 1 {
            RiskLabel::Risk
        } else {
            RiskLabel::NoRisk
        }
    }

    pub fn as_class(&self) -> u8 {
        match self {
            RiskLabel::NoRisk => 0,
            RiskLabel::Risk => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::NoRisk => "Low Risk of PCOS",
            RiskLabel::Risk => "High Risk of PCOS",
        }
    }
}

/// Class names used by the explanation report, indexed by class
pub const CLASS_NAMES: [&str; 2] = ["No PCOS", "PCOS"];

/// Predicted label plus the positive-class probability when the model has one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: RiskLabel,
    /// Probability of the risk class (0-1); None if the classifier has no
    /// probabilistic output
    pub probability: Option<f64>,
}

impl PredictionResult {
    /// Probability formatted to two decimals, or "unavailable"
    pub fn probability_display(&self) -> String {
        match self.probability {
            Some(p) => format!("{p:.2}"),
            None => "unavailable".to_string(),
        }
    }

    /// One-line summary, e.g. "High Risk of PCOS (Probability: 0.87)"
    pub fn summary(&self) -> String {
        format!(
            "{} (Probability: {})",
            self.label.as_str(),
            self.probability_display()
        )
    }
}

/// One feature's signed contribution to the risk class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    /// Feature name from the schema
    pub feature: String,
    /// Human-readable condition, e.g. "Cycle(R/I) > 0.61"
    pub condition: String,
    /// Signed surrogate weight toward the risk class
    pub weight: f64,
    /// The instance's value as seen by the model (scaled)
    pub value: f64,
    /// The instance's raw questionnaire value, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_value: Option<f64>,
}

/// Local surrogate explanation for a single scaled instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    /// Class names, indexed by class
    pub class_names: Vec<String>,
    /// Model probabilities [no-risk, risk] for the explained instance
    pub predicted_proba: [f64; 2],
    /// Top-k contributions ordered by descending |weight|
    pub contributions: Vec<FeatureContribution>,
    /// Surrogate intercept
    pub intercept: f64,
    /// Surrogate prediction at the instance
    pub local_prediction: f64,
    /// Weighted R^2 of the surrogate on the perturbation sample
    pub score: f64,
    /// Number of perturbation samples
    pub num_samples: usize,
    pub computed_at: DateTime<Utc>,
}

impl Explanation {
    /// (feature, weight) pairs in rank order
    pub fn as_list(&self) -> Vec<(&str, f64)> {
        self.contributions
            .iter()
            .map(|c| (c.feature.as_str(), c.weight))
            .collect()
    }

    /// Attach raw questionnaire values to each contribution
    pub fn with_raw_values(mut self, schema: &FeatureSchema, raw: &[f64]) -> Self {
        for contribution in &mut self.contributions {
            contribution.raw_value = schema
                .position(&contribution.feature)
                .and_then(|idx| raw.get(idx).copied());
        }
        self
    }
}
