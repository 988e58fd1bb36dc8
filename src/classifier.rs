//! Risk classifiers
//!
//! The [`Classifier`] trait separates the decision function from the optional
//! probability capability; [`ClassifierModel`] is the serializable model family
//! loaded from the model artifact.

use serde::{Deserialize, Serialize};

/// Binary classifier over scaled feature rows
pub trait Classifier {
    /// Number of features the model was trained on
    fn n_features(&self) -> usize;

    /// Decision function: 0 (no risk) or 1 (risk)
    fn predict_class(&self, row: &[f64]) -> u8;

    /// Class probabilities [p(0), p(1)], or None if the model has no
    /// probabilistic output
    fn predict_proba(&self, row: &[f64]) -> Option<[f64; 2]>;

    /// Short model name for logs and reports
    fn kind(&self) -> &'static str;
}

/// Serializable classifier artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierModel {
    /// k-nearest neighbours with uniform weights over stored training rows
    Knn {
        k: usize,
        samples: Vec<Vec<f64>>,
        labels: Vec<u8>,
    },
    /// Logistic regression
    Logistic {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    /// Linear SVM; decision only, no probability estimates
    LinearSvm {
        coefficients: Vec<f64>,
        intercept: f64,
    },
}

impl ClassifierModel {
    /// Check the model parameters are internally consistent
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ClassifierModel::Knn { k, samples, labels } => {
                if *k == 0 {
                    return Err("k must be at least 1".to_string());
                }
                if samples.is_empty() {
                    return Err("knn model has no stored samples".to_string());
                }
                if samples.len() != labels.len() {
                    return Err(format!(
                        "{} samples but {} labels",
                        samples.len(),
                        labels.len()
                    ));
                }
                let width = samples[0].len();
                if let Some(row) = samples.iter().position(|s| s.len() != width) {
                    return Err(format!("sample {row} has a different width"));
                }
                if labels.iter().any(|&l| l > 1) {
                    return Err("labels must be 0 or 1".to_string());
                }
                Ok(())
            }
            ClassifierModel::Logistic { coefficients, intercept }
            | ClassifierModel::LinearSvm { coefficients, intercept } => {
                if coefficients.is_empty() {
                    return Err("model has no coefficients".to_string());
                }
                if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
                    return Err("coefficients must be finite".to_string());
                }
                Ok(())
            }
        }
    }

    fn linear_decision(coefficients: &[f64], intercept: f64, row: &[f64]) -> f64 {
        coefficients
            .iter()
            .zip(row)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + intercept
    }

    /// Fraction of the k nearest stored samples labelled 1
    fn knn_risk_fraction(k: usize, samples: &[Vec<f64>], labels: &[u8], row: &[f64]) -> f64 {
        let mut distances: Vec<(f64, u8)> = samples
            .iter()
            .zip(labels)
            .map(|(sample, &label)| {
                let d2: f64 = sample.iter().zip(row).map(|(a, b)| (a - b).powi(2)).sum();
                (d2, label)
            })
            .collect();
        distances.sort_by(|a, b| a.0.total_cmp(&b.0));

        let k = k.min(distances.len());
        let risk = distances[..k].iter().filter(|(_, l)| *l == 1).count();
        risk as f64 / k as f64
    }
}

impl Classifier for ClassifierModel {
    fn n_features(&self) -> usize {
        match self {
            ClassifierModel::Knn { samples, .. } => samples.first().map_or(0, Vec::len),
            ClassifierModel::Logistic { coefficients, .. }
            | ClassifierModel::LinearSvm { coefficients, .. } => coefficients.len(),
        }
    }

    fn predict_class(&self, row: &[f64]) -> u8 {
        match self {
            ClassifierModel::Knn { k, samples, labels } => {
                // Ties go to the lower class
                let p = Self::knn_risk_fraction(*k, samples, labels, row);
                u8::from(p > 0.5)
            }
            ClassifierModel::Logistic { coefficients, intercept }
            | ClassifierModel::LinearSvm { coefficients, intercept } => {
                u8::from(Self::linear_decision(coefficients, *intercept, row) > 0.0)
            }
        }
    }

    fn predict_proba(&self, row: &[f64]) -> Option<[f64; 2]> {
        match self {
            ClassifierModel::Knn { k, samples, labels } => {
                let p = Self::knn_risk_fraction(*k, samples, labels, row);
                Some([1.0 - p, p])
            }
            ClassifierModel::Logistic { coefficients, intercept } => {
                let p = sigmoid(Self::linear_decision(coefficients, *intercept, row));
                Some([1.0 - p, p])
            }
            ClassifierModel::LinearSvm { .. } => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ClassifierModel::Knn { .. } => "knn",
            ClassifierModel::Logistic { .. } => "logistic",
            ClassifierModel::LinearSvm { .. } => "linear_svm",
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_knn() -> ClassifierModel {
        ClassifierModel::Knn {
            k: 3,
            samples: vec![
                vec![0.0, 0.0],
                vec![0.1, 0.1],
                vec![0.2, 0.0],
                vec![2.0, 2.0],
                vec![2.1, 1.9],
                vec![1.9, 2.2],
            ],
            labels: vec![0, 0, 0, 1, 1, 1],
        }
    }

    #[test]
    fn test_knn_predict() {
        let model = make_test_knn();
        assert!(model.validate().is_ok());
        assert_eq!(model.n_features(), 2);

        assert_eq!(model.predict_class(&[0.05, 0.05]), 0);
        assert_eq!(model.predict_class(&[2.0, 2.1]), 1);
        assert_eq!(model.predict_proba(&[2.0, 2.1]), Some([0.0, 1.0]));
    }

    #[test]
    fn test_knn_mixed_neighbourhood() {
        let model = ClassifierModel::Knn {
            k: 3,
            samples: vec![vec![0.0], vec![1.0], vec![1.1], vec![5.0]],
            labels: vec![0, 1, 1, 0],
        };
        let proba = model.predict_proba(&[0.9]).unwrap();
        assert!((proba[1] - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(model.predict_class(&[0.9]), 1);
    }

    #[test]
    fn test_logistic_threshold_consistency() {
        let model = ClassifierModel::Logistic {
            coefficients: vec![1.5, -0.5],
            intercept: -0.2,
        };
        for x in [-3.0, -0.5, 0.0, 0.2, 0.5, 3.0] {
            let row = [x, x / 2.0];
            let p = model.predict_proba(&row).unwrap()[1];
            let label = model.predict_class(&row);
            assert!((0.0..=1.0).contains(&p));
            assert_eq!(label == 1, p > 0.5, "x = {x}, p = {p}");
        }
    }

    #[test]
    fn test_linear_svm_has_no_probability() {
        let model = ClassifierModel::LinearSvm {
            coefficients: vec![1.0],
            intercept: 0.0,
        };
        assert_eq!(model.predict_class(&[0.3]), 1);
        assert!(model.predict_proba(&[0.3]).is_none());
        assert_eq!(model.kind(), "linear_svm");
    }

    #[test]
    fn test_validate_rejects_bad_knn() {
        let model = ClassifierModel::Knn {
            k: 1,
            samples: vec![vec![0.0, 1.0], vec![1.0]],
            labels: vec![0, 1],
        };
        assert!(model.validate().is_err());

        let no_labels = ClassifierModel::Knn {
            k: 1,
            samples: vec![vec![0.0]],
            labels: vec![],
        };
        assert!(no_labels.validate().is_err());
    }

    #[test]
    fn test_deserialize_model() {
        let json = r#"{"kind": "logistic", "coefficients": [0.5, 1.0], "intercept": -1.0}"#;
        let model: ClassifierModel = serde_json::from_str(json).unwrap();
        assert_eq!(model.kind(), "logistic");
        assert_eq!(model.n_features(), 2);
    }
}
