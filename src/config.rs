//! Runtime configuration
//!
//! A single JSON document covering artifact locations, explainer tuning and
//! report layout. Every field has a default so partial files are accepted.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::artifacts::ArtifactPaths;
use crate::error::CdssError;
use crate::explainer::report::DEFAULT_FRAME_HEIGHT;
use crate::explainer::ExplainerConfig;

/// Report layout options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub frame_height: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            frame_height: DEFAULT_FRAME_HEIGHT,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CdssConfig {
    pub artifacts: ArtifactPaths,
    pub explainer: ExplainerConfig,
    pub report: ReportConfig,
    /// Reject out-of-range questionnaire answers before normalization
    pub validate_ranges: bool,
}

impl Default for CdssConfig {
    fn default() -> Self {
        Self {
            artifacts: ArtifactPaths::default(),
            explainer: ExplainerConfig::default(),
            report: ReportConfig::default(),
            validate_ranges: true,
        }
    }
}

impl CdssConfig {
    /// Parse and validate a JSON configuration document
    pub fn from_json_str(json: &str) -> Result<Self, CdssError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CdssError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CdssError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| CdssError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&content)
    }

    /// Configuration with artifacts under `dir` and defaults elsewhere
    pub fn with_artifact_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            artifacts: ArtifactPaths::in_dir(dir),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), CdssError> {
        self.explainer.validate()?;
        if self.report.frame_height == 0 {
            return Err(CdssError::Config(
                "report.frame_height must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
