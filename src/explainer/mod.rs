//! Local surrogate explanations
//!
//! Explains one scaled instance by perturbing it against a background
//! distribution, querying the model's probability function on every perturbed
//! row, and fitting a sparse proximity-weighted linear model to the risk-class
//! probability.
//!
//! Pipeline: Background → Discretizer → Perturbation sample → Kernel weights →
//! Feature selection → Ridge surrogate → Explanation

pub mod discretizer;
pub mod report;
pub mod surrogate;

pub use discretizer::{Discretizer, FeatureBinning};
pub use report::ReportRenderer;
pub use surrogate::RidgeFit;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::CdssError;
use crate::types::{Explanation, FeatureContribution, ScaledVector, CLASS_NAMES};

/// Number of features reported by default
pub const DEFAULT_TOP_K: usize = 6;

/// Perturbation sample size by default
pub const DEFAULT_NUM_SAMPLES: usize = 5000;

/// Up to this many features, selection is greedy forward selection
const FORWARD_SELECTION_LIMIT: usize = 6;

/// Tuning for the explainer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainerConfig {
    /// Maximum number of contributions reported
    pub top_k: usize,
    /// Perturbation rows, including the instance itself
    pub num_samples: usize,
    /// Kernel width; defaults to 0.75 * sqrt(number of features)
    pub kernel_width: Option<f64>,
    /// Fixed seed for reproducible sampling; entropy when None
    pub seed: Option<u64>,
}

impl Default for ExplainerConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            num_samples: DEFAULT_NUM_SAMPLES,
            kernel_width: None,
            seed: None,
        }
    }
}

impl ExplainerConfig {
    pub fn validate(&self) -> Result<(), CdssError> {
        if self.top_k == 0 {
            return Err(CdssError::Config("top_k must be at least 1".to_string()));
        }
        if self.num_samples < 2 {
            return Err(CdssError::Config(
                "num_samples must be at least 2".to_string(),
            ));
        }
        if let Some(width) = self.kernel_width {
            if !(width.is_finite() && width > 0.0) {
                return Err(CdssError::Config(
                    "kernel_width must be a positive number".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Perturbation sample around one instance
struct Neighbourhood {
    /// Interpretable representation; row 0 is the instance
    data: Vec<Vec<f64>>,
    /// Model-space rows fed to the probability function; row 0 is the instance
    inverse: Vec<Vec<f64>>,
}

/// Explain `instance` with a local surrogate of `probability_fn`.
///
/// `probability_fn` returns class probabilities [p(no risk), p(risk)] for a
/// scaled row, or None when the model has no probabilistic output.
pub fn explain<F>(
    probability_fn: F,
    background: &[Vec<f64>],
    feature_names: &[String],
    instance: &ScaledVector,
    config: &ExplainerConfig,
) -> Result<Explanation, CdssError>
where
    F: Fn(&[f64]) -> Option<[f64; 2]>,
{
    if instance.len() != feature_names.len() {
        return Err(CdssError::DimensionMismatch {
            features: feature_names.len(),
            instance: instance.len(),
        });
    }
    config.validate()?;

    let n_features = feature_names.len();
    let discretizer = Discretizer::fit(background, n_features)?;
    if discretizer.continuous_count() > 0 {
        log::warn!(
            "{} of {} background columns are constant; perturbing them continuously",
            discretizer.continuous_count(),
            n_features
        );
    }

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let neighbourhood = sample_neighbourhood(&discretizer, instance.as_slice(), config, &mut rng);

    let predicted_proba = probability_fn(instance.as_slice()).ok_or(CdssError::ProbabilityUnavailable)?;
    let target = neighbourhood
        .inverse
        .iter()
        .map(|row| probability_fn(row).map(|p| p[1]))
        .collect::<Option<Vec<f64>>>()
        .ok_or(CdssError::ProbabilityUnavailable)?;

    let width = config
        .kernel_width
        .unwrap_or_else(|| 0.75 * (n_features as f64).sqrt());
    let origin = &neighbourhood.data[0];
    let weights: Vec<f64> = neighbourhood
        .data
        .iter()
        .map(|row| kernel(euclidean(row, origin), width))
        .collect();

    let k = config.top_k.min(n_features);
    let selected = if k <= FORWARD_SELECTION_LIMIT {
        surrogate::forward_selection(&neighbourhood.data, &target, &weights, k)
    } else {
        surrogate::highest_weights(&neighbourhood.data, &target, &weights, k)
    };

    let fit = RidgeFit::fit(
        &neighbourhood.data,
        &selected,
        &target,
        &weights,
        surrogate::SURROGATE_ALPHA,
    )
    .ok_or_else(|| CdssError::InvalidBackground("surrogate fit is singular".to_string()))?;
    let score = fit.score(&neighbourhood.data, &target, &weights);
    let local_prediction = fit.predict_row(origin);

    let mut contributions: Vec<FeatureContribution> = fit
        .columns
        .iter()
        .zip(&fit.coefficients)
        .map(|(&j, &weight)| {
            let value = instance.as_slice()[j];
            FeatureContribution {
                feature: feature_names[j].clone(),
                condition: discretizer.condition(j, &feature_names[j], value),
                weight,
                value,
                raw_value: None,
            }
        })
        .collect();
    contributions.sort_by(|a, b| b.weight.abs().total_cmp(&a.weight.abs()));

    log::debug!(
        "Surrogate over {} samples: score={:.3} intercept={:.3} local_prediction={:.3}",
        config.num_samples,
        score,
        fit.intercept,
        local_prediction
    );

    Ok(Explanation {
        class_names: CLASS_NAMES.iter().map(|s| s.to_string()).collect(),
        predicted_proba,
        contributions,
        intercept: fit.intercept,
        local_prediction,
        score,
        num_samples: config.num_samples,
        computed_at: Utc::now(),
    })
}

fn sample_neighbourhood(
    discretizer: &Discretizer,
    instance: &[f64],
    config: &ExplainerConfig,
    rng: &mut StdRng,
) -> Neighbourhood {
    let n = config.num_samples;
    let mut data = Vec::with_capacity(n);
    let mut inverse = Vec::with_capacity(n);

    let origin: Vec<f64> = discretizer
        .features()
        .iter()
        .zip(instance)
        .map(|(binning, &x)| match binning {
            FeatureBinning::Quartile(_) => 1.0,
            FeatureBinning::Continuous { mean, std } => (x - mean) / std,
        })
        .collect();
    data.push(origin);
    inverse.push(instance.to_vec());

    for _ in 1..n {
        let mut representation = Vec::with_capacity(instance.len());
        let mut row = Vec::with_capacity(instance.len());
        for (binning, &x) in discretizer.features().iter().zip(instance) {
            match binning {
                FeatureBinning::Quartile(bins) => {
                    let bin = bins.sample_bin(rng);
                    row.push(bins.sample_value(bin, rng));
                    representation.push(if bin == bins.bin_of(x) { 1.0 } else { 0.0 });
                }
                FeatureBinning::Continuous { mean, std } => {
                    let value = discretizer::standard_normal(rng) * std + mean;
                    row.push(value);
                    representation.push((value - mean) / std);
                }
            }
        }
        data.push(representation);
        inverse.push(row);
    }

    Neighbourhood { data, inverse }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

fn kernel(distance: f64, width: f64) -> f64 {
    (-(distance * distance) / (width * width)).exp().sqrt()
}
