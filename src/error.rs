//! Error types for the PCOS CDSS core

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The artifacts loaded once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Model,
    Scaler,
    Features,
    Background,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Model => "model",
            ArtifactKind::Scaler => "scaler",
            ArtifactKind::Features => "features",
            ArtifactKind::Background => "background",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while loading artifacts or running the pipeline
#[derive(Debug, Error)]
pub enum CdssError {
    #[error("Failed to load {artifact} artifact: {reason}")]
    StartupFailure {
        artifact: ArtifactKind,
        reason: String,
    },

    #[error("Shape mismatch: classifier expects {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Dimension mismatch: {features} feature names but instance has {instance} values")]
    DimensionMismatch { features: usize, instance: usize },

    #[error("No prediction in this session yet; run a prediction first")]
    MissingPriorState,

    #[error("Unknown categorical value {value:?} for {feature}")]
    UnknownCategory { feature: String, value: String },

    #[error("Invalid answer for {feature}: {reason}")]
    InvalidAnswer { feature: String, reason: String },

    #[error("Duplicate feature name in schema: {0}")]
    DuplicateFeature(String),

    #[error("Classifier does not expose probability estimates")]
    ProbabilityUnavailable,

    #[error("Invalid background sample: {0}")]
    InvalidBackground(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CdssError {
    /// Wrap any displayable failure as a startup failure for `artifact`
    pub fn startup(artifact: ArtifactKind, reason: impl fmt::Display) -> Self {
        CdssError::StartupFailure {
            artifact,
            reason: reason.to_string(),
        }
    }

    /// Stable machine-readable code used by the CLI and FFI surfaces
    pub fn code(&self) -> &'static str {
        match self {
            CdssError::StartupFailure { .. } => "STARTUP_FAILURE",
            CdssError::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            CdssError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            CdssError::MissingPriorState => "MISSING_PRIOR_STATE",
            CdssError::UnknownCategory { .. } => "UNKNOWN_CATEGORY",
            CdssError::InvalidAnswer { .. } => "INVALID_ANSWER",
            CdssError::DuplicateFeature(_) => "DUPLICATE_FEATURE",
            CdssError::ProbabilityUnavailable => "PROBABILITY_UNAVAILABLE",
            CdssError::InvalidBackground(_) => "INVALID_BACKGROUND",
            CdssError::Config(_) => "CONFIG_ERROR",
            CdssError::Json(_) => "JSON_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_failure_names_artifact() {
        let err = CdssError::startup(ArtifactKind::Scaler, "file not found");
        assert_eq!(
            err.to_string(),
            "Failed to load scaler artifact: file not found"
        );
        assert_eq!(err.code(), "STARTUP_FAILURE");
    }

    #[test]
    fn test_unknown_category_message() {
        let err = CdssError::UnknownCategory {
            feature: "Pimples(Y/N)".to_string(),
            value: "Maybe".to_string(),
        };
        assert!(err.to_string().contains("\"Maybe\""));
        assert!(err.to_string().contains("Pimples(Y/N)"));
    }
}
