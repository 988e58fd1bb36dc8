//! Risk prediction
//!
//! Applies a classifier to a single scaled vector and reports the discrete
//! label together with the risk-class probability when the model exposes one.

use crate::classifier::Classifier;
use crate::error::CdssError;
use crate::types::{PredictionResult, RiskLabel, ScaledVector};

/// Predict the risk label (and probability, when available) for one instance
pub fn predict(
    classifier: &dyn Classifier,
    scaled: &ScaledVector,
) -> Result<PredictionResult, CdssError> {
    let expected = classifier.n_features();
    if scaled.len() != expected {
        return Err(CdssError::ShapeMismatch {
            expected,
            actual: scaled.len(),
        });
    }

    let row = scaled.as_slice();
    let label = RiskLabel::from_class(classifier.predict_class(row));
    let probability = classifier
        .predict_proba(row)
        .map(|proba| proba[1].clamp(0.0, 1.0));

    log::debug!(
        "{} prediction: label={:?} probability={:?}",
        classifier.kind(),
        label,
        probability
    );

    Ok(PredictionResult { label, probability })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierModel;

    #[test]
    fn test_predict_with_probability() {
        let model = ClassifierModel::Logistic {
            coefficients: vec![2.0, 1.0],
            intercept: 0.0,
        };
        let result = predict(&model, &ScaledVector::new(vec![1.0, 1.0])).unwrap();

        assert_eq!(result.label, RiskLabel::Risk);
        let p = result.probability.unwrap();
        assert!(p > 0.5 && p <= 1.0);
    }

    #[test]
    fn test_predict_without_probability() {
        let model = ClassifierModel::LinearSvm {
            coefficients: vec![1.0, 1.0],
            intercept: 0.0,
        };
        let result = predict(&model, &ScaledVector::new(vec![-1.0, -0.5])).unwrap();

        assert_eq!(result.label, RiskLabel::NoRisk);
        assert!(result.probability.is_none());
    }

    #[test]
    fn test_predict_shape_mismatch() {
        let model = ClassifierModel::Logistic {
            coefficients: vec![1.0; 13],
            intercept: 0.0,
        };
        let err = predict(&model, &ScaledVector::new(vec![0.0; 12])).unwrap_err();
        assert!(matches!(
            err,
            CdssError::ShapeMismatch {
                expected: 13,
                actual: 12
            }
        ));
    }

    #[test]
    fn test_label_matches_probability_threshold() {
        let model = ClassifierModel::Knn {
            k: 4,
            samples: vec![vec![0.0], vec![0.5], vec![1.0], vec![1.5], vec![2.0]],
            labels: vec![0, 0, 1, 1, 1],
        };
        for x in [-1.0, 0.25, 0.75, 1.0, 3.0] {
            let result = predict(&model, &ScaledVector::new(vec![x])).unwrap();
            let p = result.probability.unwrap();
            assert!((0.0..=1.0).contains(&p));
            if result.label == RiskLabel::Risk {
                assert!(p >= 0.5, "x = {x}, p = {p}");
            } else {
                assert!(p <= 0.5, "x = {x}, p = {p}");
            }
        }
    }
}
