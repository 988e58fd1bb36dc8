//! Artifact store
//!
//! Loads the trained classifier, the fitted scaler, the ordered feature list and
//! an optional background sample of scaled training rows. Everything here is
//! read-only after load and can be shared across sessions behind an `Arc`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::classifier::{Classifier, ClassifierModel};
use crate::error::{ArtifactKind, CdssError};
use crate::scaler::FeatureScaler;
use crate::types::{FeatureSchema, FeatureVector};

pub const MODEL_FILE: &str = "pcos_knn_model.json";
pub const SCALER_FILE: &str = "pcos_scaler.json";
pub const FEATURES_FILE: &str = "pcos_features.json";
pub const BACKGROUND_FILE: &str = "pcos_background.json";

/// Locations of the artifact files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: PathBuf,
    pub features: PathBuf,
    /// Scaled training sample for explanations; optional
    #[serde(default)]
    pub background: Option<PathBuf>,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::in_dir("artifacts")
    }
}

impl ArtifactPaths {
    /// Standard file names under `dir`, with the background file included
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            model: dir.join(MODEL_FILE),
            scaler: dir.join(SCALER_FILE),
            features: dir.join(FEATURES_FILE),
            background: Some(dir.join(BACKGROUND_FILE)),
        }
    }
}

/// Immutable artifacts shared by every session
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    classifier: ClassifierModel,
    scaler: FeatureScaler,
    schema: FeatureSchema,
    background: Option<Vec<Vec<f64>>>,
    loaded_at: DateTime<Utc>,
}

impl ArtifactStore {
    /// Load all artifacts from disk.
    ///
    /// A missing background file is tolerated (explanations fall back to the
    /// scaled zero row); every other failure is fatal and names the artifact.
    pub fn load(paths: &ArtifactPaths) -> Result<Self, CdssError> {
        let schema: FeatureSchema = read_artifact(ArtifactKind::Features, &paths.features)?;
        let scaler: FeatureScaler = read_artifact(ArtifactKind::Scaler, &paths.scaler)?;
        let classifier: ClassifierModel = read_artifact(ArtifactKind::Model, &paths.model)?;

        let background = match &paths.background {
            Some(path) if path.exists() => Some(read_artifact::<Vec<Vec<f64>>>(
                ArtifactKind::Background,
                path,
            )?),
            Some(path) => {
                log::warn!(
                    "Background sample {} not found; explanations will use the zero-row fallback",
                    path.display()
                );
                None
            }
            None => None,
        };

        let store = Self::from_parts(classifier, scaler, schema, background)?;
        log::info!(
            "Loaded {} model with {} features from {}",
            store.classifier.kind(),
            store.schema.len(),
            paths.model.display()
        );
        Ok(store)
    }

    /// Assemble a store from in-memory artifacts, with the same checks as `load`
    pub fn from_parts(
        classifier: ClassifierModel,
        scaler: FeatureScaler,
        schema: FeatureSchema,
        background: Option<Vec<Vec<f64>>>,
    ) -> Result<Self, CdssError> {
        if schema.is_empty() {
            return Err(CdssError::startup(
                ArtifactKind::Features,
                "feature list is empty",
            ));
        }

        scaler
            .validate()
            .map_err(|e| CdssError::startup(ArtifactKind::Scaler, e))?;
        if scaler.n_features() != schema.len() {
            return Err(CdssError::startup(
                ArtifactKind::Scaler,
                format!(
                    "fitted on {} features but the feature list has {}",
                    scaler.n_features(),
                    schema.len()
                ),
            ));
        }

        classifier
            .validate()
            .map_err(|e| CdssError::startup(ArtifactKind::Model, e))?;
        if classifier.n_features() != schema.len() {
            return Err(CdssError::startup(
                ArtifactKind::Model,
                format!(
                    "trained on {} features but the feature list has {}",
                    classifier.n_features(),
                    schema.len()
                ),
            ));
        }

        if let Some(rows) = &background {
            if rows.is_empty() {
                return Err(CdssError::startup(
                    ArtifactKind::Background,
                    "background sample has no rows",
                ));
            }
            if let Some(idx) = rows.iter().position(|r| r.len() != schema.len()) {
                return Err(CdssError::startup(
                    ArtifactKind::Background,
                    format!(
                        "row {idx} has {} values, expected {}",
                        rows[idx].len(),
                        schema.len()
                    ),
                ));
            }
        }

        Ok(Self {
            classifier,
            scaler,
            schema,
            background,
            loaded_at: Utc::now(),
        })
    }

    pub fn classifier(&self) -> &ClassifierModel {
        &self.classifier
    }

    pub fn scaler(&self) -> &FeatureScaler {
        &self.scaler
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn has_background(&self) -> bool {
        self.background.is_some()
    }

    /// Background rows for the explainer: the stored training sample, or the
    /// all-zero questionnaire row passed through the scaler
    pub fn background_rows(&self) -> Result<Vec<Vec<f64>>, CdssError> {
        if let Some(rows) = &self.background {
            return Ok(rows.clone());
        }
        let zeros = FeatureVector::new(vec![0.0; self.schema.len()]);
        let scaled = self.scaler.transform(&zeros)?;
        Ok(vec![scaled.as_slice().to_vec()])
    }
}

fn read_artifact<T: DeserializeOwned>(kind: ArtifactKind, path: &Path) -> Result<T, CdssError> {
    let content = fs::read_to_string(path)
        .map_err(|e| CdssError::startup(kind, format!("{}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| CdssError::startup(kind, format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn make_test_parts() -> (ClassifierModel, FeatureScaler, FeatureSchema) {
        let schema = FeatureSchema::new(vec!["a".to_string(), "b".to_string()]).unwrap();
        let scaler = FeatureScaler::Standard {
            mean: vec![1.0, 2.0],
            scale: vec![2.0, 4.0],
        };
        let model = ClassifierModel::Logistic {
            coefficients: vec![1.0, -1.0],
            intercept: 0.0,
        };
        (model, scaler, schema)
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("pcos-cdss-{name}-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_from_parts_checks_widths() {
        let (model, _, schema) = make_test_parts();
        let narrow = FeatureScaler::Standard {
            mean: vec![0.0],
            scale: vec![1.0],
        };
        let err = ArtifactStore::from_parts(model, narrow, schema, None).unwrap_err();
        assert!(matches!(
            err,
            CdssError::StartupFailure {
                artifact: ArtifactKind::Scaler,
                ..
            }
        ));
    }

    #[test]
    fn test_background_fallback_is_scaled_zero_row() {
        let (model, scaler, schema) = make_test_parts();
        let store = ArtifactStore::from_parts(model, scaler, schema, None).unwrap();

        assert!(!store.has_background());
        assert_eq!(store.background_rows().unwrap(), vec![vec![-0.5, -0.5]]);
    }

    #[test]
    fn test_background_width_checked() {
        let (model, scaler, schema) = make_test_parts();
        let err = ArtifactStore::from_parts(model, scaler, schema, Some(vec![vec![0.0]]))
            .unwrap_err();
        assert!(matches!(
            err,
            CdssError::StartupFailure {
                artifact: ArtifactKind::Background,
                ..
            }
        ));
    }

    #[test]
    fn test_load_from_dir() {
        let dir = temp_dir("load");
        let (model, scaler, schema) = make_test_parts();
        fs::write(dir.join(FEATURES_FILE), serde_json::to_string(&schema).unwrap()).unwrap();
        fs::write(dir.join(SCALER_FILE), serde_json::to_string(&scaler).unwrap()).unwrap();
        fs::write(dir.join(MODEL_FILE), serde_json::to_string(&model).unwrap()).unwrap();

        let store = ArtifactStore::load(&ArtifactPaths::in_dir(&dir)).unwrap();
        assert_eq!(store.schema().names(), &["a".to_string(), "b".to_string()]);
        assert_eq!(store.classifier().kind(), "logistic");
        assert!(!store.has_background());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_model_names_artifact() {
        let dir = temp_dir("missing");
        let (_, scaler, schema) = make_test_parts();
        fs::write(dir.join(FEATURES_FILE), serde_json::to_string(&schema).unwrap()).unwrap();
        fs::write(dir.join(SCALER_FILE), serde_json::to_string(&scaler).unwrap()).unwrap();

        let err = ArtifactStore::load(&ArtifactPaths::in_dir(&dir)).unwrap_err();
        assert!(matches!(
            err,
            CdssError::StartupFailure {
                artifact: ArtifactKind::Model,
                ..
            }
        ));
        assert!(err.to_string().starts_with("Failed to load model artifact"));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_corrupt_features_file() {
        let dir = temp_dir("corrupt");
        fs::write(dir.join(FEATURES_FILE), "not json").unwrap();

        let err = ArtifactStore::load(&ArtifactPaths::in_dir(&dir)).unwrap_err();
        assert!(matches!(
            err,
            CdssError::StartupFailure {
                artifact: ArtifactKind::Features,
                ..
            }
        ));

        fs::remove_dir_all(&dir).ok();
    }
}
