//! Fitted feature scaler
//!
//! Per-feature affine transform learned at training time. Zero-width scales
//! (constant training columns) are treated as 1 so the transform stays finite.

use serde::{Deserialize, Serialize};

use crate::error::CdssError;
use crate::types::{FeatureVector, ScaledVector};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureScaler {
    /// (x - mean) / scale
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// (x - min) / (max - min)
    MinMax { min: Vec<f64>, max: Vec<f64> },
}

impl FeatureScaler {
    /// Number of features the scaler was fitted on
    pub fn n_features(&self) -> usize {
        match self {
            FeatureScaler::Standard { mean, .. } => mean.len(),
            FeatureScaler::MinMax { min, .. } => min.len(),
        }
    }

    /// Check the fitted parameters are internally consistent
    pub fn validate(&self) -> Result<(), String> {
        let (a, b) = match self {
            FeatureScaler::Standard { mean, scale } => (mean, scale),
            FeatureScaler::MinMax { min, max } => (min, max),
        };
        if a.len() != b.len() {
            return Err(format!(
                "parameter lengths differ ({} vs {})",
                a.len(),
                b.len()
            ));
        }
        if a.iter().chain(b.iter()).any(|v| !v.is_finite()) {
            return Err("parameters must be finite".to_string());
        }
        Ok(())
    }

    /// Apply the fitted transform
    pub fn transform(&self, features: &FeatureVector) -> Result<ScaledVector, CdssError> {
        self.check_width(features.len())?;
        let values = features
            .as_slice()
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                let (offset, width) = self.affine(i);
                (x - offset) / width
            })
            .collect();
        Ok(ScaledVector::new(values))
    }

    /// Map a scaled vector back to questionnaire units
    pub fn inverse_transform(&self, scaled: &ScaledVector) -> Result<FeatureVector, CdssError> {
        self.check_width(scaled.len())?;
        let values = scaled
            .as_slice()
            .iter()
            .enumerate()
            .map(|(i, &z)| {
                let (offset, width) = self.affine(i);
                z * width + offset
            })
            .collect();
        Ok(FeatureVector::new(values))
    }

    fn check_width(&self, actual: usize) -> Result<(), CdssError> {
        let expected = self.n_features();
        if actual != expected {
            return Err(CdssError::ShapeMismatch { expected, actual });
        }
        Ok(())
    }

    /// (offset, width) for feature `i`
    fn affine(&self, i: usize) -> (f64, f64) {
        match self {
            FeatureScaler::Standard { mean, scale } => {
                (mean[i], non_zero(scale.get(i).copied().unwrap_or(1.0)))
            }
            FeatureScaler::MinMax { min, max } => {
                let span = max.get(i).map_or(1.0, |hi| hi - min[i]);
                (min[i], non_zero(span))
            }
        }
    }
}

fn non_zero(width: f64) -> f64 {
    if width == 0.0 {
        1.0
    } else {
        width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_transform() {
        let scaler = FeatureScaler::Standard {
            mean: vec![30.0, 0.5],
            scale: vec![5.0, 0.0],
        };
        let scaled = scaler
            .transform(&FeatureVector::new(vec![25.0, 1.0]))
            .unwrap();

        assert!((scaled.as_slice()[0] + 1.0).abs() < 1e-12);
        // Zero scale is treated as 1
        assert!((scaled.as_slice()[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_min_max_inverse() {
        let scaler = FeatureScaler::MinMax {
            min: vec![30.0, 130.0],
            max: vec![120.0, 190.0],
        };
        let raw = FeatureVector::new(vec![75.0, 160.0]);
        let scaled = scaler.transform(&raw).unwrap();
        assert!((scaled.as_slice()[0] - 0.5).abs() < 1e-12);

        let back = scaler.inverse_transform(&scaled).unwrap();
        assert!((back.as_slice()[1] - 160.0).abs() < 1e-9);
    }

    #[test]
    fn test_width_mismatch() {
        let scaler = FeatureScaler::Standard {
            mean: vec![0.0; 3],
            scale: vec![1.0; 3],
        };
        let err = scaler
            .transform(&FeatureVector::new(vec![1.0, 2.0]))
            .unwrap_err();
        assert!(matches!(
            err,
            CdssError::ShapeMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_deserialize_tagged() {
        let scaler: FeatureScaler =
            serde_json::from_str(r#"{"kind": "standard", "mean": [1.0], "scale": [2.0]}"#)
                .unwrap();
        assert_eq!(scaler.n_features(), 1);
        assert!(scaler.validate().is_ok());

        let broken = FeatureScaler::MinMax {
            min: vec![0.0, 1.0],
            max: vec![1.0],
        };
        assert!(broken.validate().is_err());
    }
}
