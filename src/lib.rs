//! PCOS CDSS - Clinical decision support core for PCOS risk
//!
//! Turns a questionnaire submission into a risk prediction through a
//! deterministic pipeline: answer validation → normalization → scaling →
//! classification. The most recent prediction of a session can be explained
//! with a local surrogate model and rendered as a self-contained HTML report.
//!
//! ## Modules
//!
//! - **Pipeline**: `CdssPipeline` over shared artifacts, `Session` for per-user state
//! - **Explainer**: perturbation sampling, surrogate fitting and report rendering

pub mod artifacts;
pub mod classifier;
pub mod config;
pub mod error;
pub mod explainer;
pub mod normalizer;
pub mod pipeline;
pub mod predictor;
pub mod questionnaire;
pub mod scaler;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use artifacts::{ArtifactPaths, ArtifactStore};
pub use classifier::{Classifier, ClassifierModel};
pub use config::CdssConfig;
pub use error::{ArtifactKind, CdssError};
pub use explainer::{ExplainerConfig, ReportRenderer};
pub use normalizer::InputNormalizer;
pub use pipeline::{assess_answers_json, Assessment, CdssPipeline, Session};
pub use scaler::FeatureScaler;
pub use types::{
    Explanation, FeatureContribution, FeatureSchema, FeatureVector, PredictionResult, RawAnswers,
    RawValue, RiskLabel, ScaledVector,
};

/// Library version
pub const CDSS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "pcos-cdss";
