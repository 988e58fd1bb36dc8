//! Pipeline orchestration
//!
//! This module provides the public API for the decision support core.
//! It runs raw questionnaire answers through normalization, scaling and
//! prediction, and explains the most recent prediction of a session.
//!
//! Pipeline stages:
//! 1. validate_answers - Reject out-of-range answers (when enabled)
//! 2. InputNormalizer - Encode answers in schema order
//! 3. FeatureScaler - Apply the fitted affine transform
//! 4. predict - Label and optional risk probability
//! 5. explain - Local surrogate over the stored scaled vector

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::artifacts::ArtifactStore;
use crate::classifier::Classifier;
use crate::config::CdssConfig;
use crate::error::CdssError;
use crate::explainer::{self, ReportRenderer};
use crate::normalizer::InputNormalizer;
use crate::predictor;
use crate::questionnaire::validate_answers;
use crate::types::{Explanation, FeatureVector, PredictionResult, RawAnswers, ScaledVector};

/// Outcome of one assessment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    /// Scaled vector the prediction was made on; feed back into `explain`
    pub scaled: ScaledVector,
    pub prediction: PredictionResult,
}

/// Stateless pipeline over shared, read-only artifacts.
///
/// Cloning is cheap; clones share the same artifact store.
#[derive(Debug, Clone)]
pub struct CdssPipeline {
    artifacts: Arc<ArtifactStore>,
    config: CdssConfig,
}

impl CdssPipeline {
    /// Create a pipeline over already loaded artifacts
    pub fn new(artifacts: Arc<ArtifactStore>, config: CdssConfig) -> Self {
        Self { artifacts, config }
    }

    /// Load artifacts named by `config` and build a pipeline
    pub fn from_config(config: CdssConfig) -> Result<Self, CdssError> {
        config.validate()?;
        let artifacts = ArtifactStore::load(&config.artifacts)?;
        Ok(Self::new(Arc::new(artifacts), config))
    }

    pub fn artifacts(&self) -> &Arc<ArtifactStore> {
        &self.artifacts
    }

    pub fn config(&self) -> &CdssConfig {
        &self.config
    }

    /// Renderer configured for this pipeline's report layout
    pub fn renderer(&self) -> ReportRenderer {
        ReportRenderer::with_frame_height(self.config.report.frame_height)
    }

    /// Validate, normalize and scale one submission
    pub fn prepare(&self, answers: &RawAnswers) -> Result<(FeatureVector, ScaledVector), CdssError> {
        if self.config.validate_ranges {
            if let Some(issue) = validate_answers(answers).into_iter().next() {
                return Err(issue.into());
            }
        }

        let features = InputNormalizer::normalize(answers, self.artifacts.schema())?;
        let scaled = self.artifacts.scaler().transform(&features)?;
        Ok((features, scaled))
    }

    /// Run one submission through to a prediction
    pub fn assess(&self, answers: &RawAnswers) -> Result<Assessment, CdssError> {
        let (_, scaled) = self.prepare(answers)?;
        let prediction = predictor::predict(self.artifacts.classifier(), &scaled)?;
        Ok(Assessment { scaled, prediction })
    }

    /// Explain the prediction made on `last`.
    ///
    /// `last` is the scaled vector of the caller's most recent assessment;
    /// without one there is nothing to explain.
    pub fn explain(&self, last: Option<&ScaledVector>) -> Result<Explanation, CdssError> {
        let scaled = last.ok_or(CdssError::MissingPriorState)?;
        let schema = self.artifacts.schema();
        let classifier = self.artifacts.classifier();
        let background = self.artifacts.background_rows()?;

        let explanation = explainer::explain(
            |row| classifier.predict_proba(row),
            &background,
            schema.names(),
            scaled,
            &self.config.explainer,
        )?;

        let raw = self.artifacts.scaler().inverse_transform(scaled)?;
        Ok(explanation.with_raw_values(schema, raw.as_slice()))
    }
}

/// Assess a JSON object of answers and return the assessment as JSON.
///
/// # Example
/// ```ignore
/// let json = assess_answers_json(&pipeline, r#"{"Age (yrs)": 25, "Cycle(R/I)": "Regular"}"#)?;
/// ```
pub fn assess_answers_json(pipeline: &CdssPipeline, answers_json: &str) -> Result<String, CdssError> {
    let answers: RawAnswers = serde_json::from_str(answers_json)?;
    let assessment = pipeline.assess(&answers)?;
    Ok(serde_json::to_string(&assessment)?)
}

/// One user's interaction: the last scaled vector lives here and nowhere else.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    pipeline: CdssPipeline,
    last_scaled: Option<ScaledVector>,
}

impl Session {
    /// Start a fresh session with no prior prediction
    pub fn new(pipeline: CdssPipeline) -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            pipeline,
            last_scaled: None,
        };
        log::debug!("Session {} started", session.id);
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn pipeline(&self) -> &CdssPipeline {
        &self.pipeline
    }

    /// Predict and remember the scaled vector for a later explanation.
    ///
    /// A failed submission leaves the previous vector untouched.
    pub fn predict(&mut self, answers: &RawAnswers) -> Result<PredictionResult, CdssError> {
        let assessment = self.pipeline.assess(answers)?;
        self.last_scaled = Some(assessment.scaled);
        Ok(assessment.prediction)
    }

    /// Explain this session's most recent prediction
    pub fn explain(&self) -> Result<Explanation, CdssError> {
        self.pipeline.explain(self.last_scaled.as_ref())
    }

    /// Explain and render the report as HTML
    pub fn explain_html(&self) -> Result<String, CdssError> {
        let explanation = self.explain()?;
        Ok(self.pipeline.renderer().render_html(&explanation))
    }

    pub fn has_prediction(&self) -> bool {
        self.last_scaled.is_some()
    }

    pub fn last_scaled(&self) -> Option<&ScaledVector> {
        self.last_scaled.as_ref()
    }

    /// Forget the stored vector
    pub fn reset(&mut self) {
        self.last_scaled = None;
    }
}
