//! Quartile discretization of the background distribution
//!
//! Each background column with at least two distinct values is split at its
//! unique 25/50/75th percentiles. Per-bin statistics drive perturbation
//! sampling. Constant columns are perturbed continuously instead.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::error::CdssError;

const STD_EPSILON: f64 = 1e-11;
const MAX_REJECTIONS: usize = 100;

/// How one feature is binned and perturbed
#[derive(Debug, Clone)]
pub enum FeatureBinning {
    Quartile(QuartileBins),
    /// Constant background column; perturb around `mean` with unit spread
    Continuous { mean: f64, std: f64 },
}

/// Bin boundaries and per-bin statistics for one feature
#[derive(Debug, Clone)]
pub struct QuartileBins {
    /// Sorted unique quartile boundaries; there are `boundaries.len() + 1` bins
    pub boundaries: Vec<f64>,
    /// Fraction of background rows in each bin
    pub frequencies: Vec<f64>,
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
    pub mins: Vec<f64>,
    pub maxs: Vec<f64>,
    sampler: WeightedIndex<f64>,
}

impl QuartileBins {
    fn fit(column: &[f64]) -> Result<Self, CdssError> {
        let mut sorted = column.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mut boundaries: Vec<f64> = [25.0, 50.0, 75.0]
            .iter()
            .map(|&p| percentile(&sorted, p))
            .collect();
        boundaries.dedup();

        let n_bins = boundaries.len() + 1;
        let mut members: Vec<Vec<f64>> = vec![Vec::new(); n_bins];
        for &value in column {
            members[bin_index(&boundaries, value)].push(value);
        }

        let total = column.len() as f64;
        let frequencies: Vec<f64> = members.iter().map(|m| m.len() as f64 / total).collect();
        let means: Vec<f64> = members.iter().map(|m| mean(m)).collect();
        let stds: Vec<f64> = members
            .iter()
            .zip(&means)
            .map(|(m, &mu)| population_std(m, mu) + STD_EPSILON)
            .collect();

        let mut mins = vec![sorted[0]];
        mins.extend_from_slice(&boundaries);
        let mut maxs = boundaries.clone();
        maxs.push(sorted[sorted.len() - 1]);

        let sampler = WeightedIndex::new(&frequencies)
            .map_err(|e| CdssError::InvalidBackground(format!("bin frequencies: {e}")))?;

        Ok(Self {
            boundaries,
            frequencies,
            means,
            stds,
            mins,
            maxs,
            sampler,
        })
    }

    /// Bin containing `value` (values on a boundary fall in the lower bin)
    pub fn bin_of(&self, value: f64) -> usize {
        bin_index(&self.boundaries, value)
    }

    /// Draw a bin by background frequency
    pub fn sample_bin<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.sampler.sample(rng)
    }

    /// Draw a value inside `bin` from its truncated normal
    pub fn sample_value<R: Rng + ?Sized>(&self, bin: usize, rng: &mut R) -> f64 {
        let (mu, sigma) = (self.means[bin], self.stds[bin]);
        let (lo, hi) = (self.mins[bin], self.maxs[bin]);
        if hi - lo <= STD_EPSILON || sigma <= 2.0 * STD_EPSILON {
            return mu.clamp(lo, hi);
        }
        for _ in 0..MAX_REJECTIONS {
            let candidate = mu + sigma * standard_normal(rng);
            if (lo..=hi).contains(&candidate) {
                return candidate;
            }
        }
        rng.gen_range(lo..=hi)
    }

    /// Readable condition for `bin`, e.g. "0.12 < name <= 0.80"
    pub fn condition(&self, name: &str, bin: usize) -> String {
        let last = self.boundaries.len();
        if bin == 0 {
            format!("{name} <= {:.2}", self.boundaries[0])
        } else if bin >= last {
            format!("{name} > {:.2}", self.boundaries[last - 1])
        } else {
            format!(
                "{:.2} < {name} <= {:.2}",
                self.boundaries[bin - 1],
                self.boundaries[bin]
            )
        }
    }
}

/// Per-feature binning fitted on a background sample
#[derive(Debug, Clone)]
pub struct Discretizer {
    features: Vec<FeatureBinning>,
}

impl Discretizer {
    /// Fit on background rows; every row must have `n_features` values
    pub fn fit(background: &[Vec<f64>], n_features: usize) -> Result<Self, CdssError> {
        if background.is_empty() {
            return Err(CdssError::InvalidBackground(
                "background sample has no rows".to_string(),
            ));
        }
        if let Some(idx) = background.iter().position(|r| r.len() != n_features) {
            return Err(CdssError::InvalidBackground(format!(
                "row {idx} has {} values, expected {n_features}",
                background[idx].len()
            )));
        }
        if background.iter().flatten().any(|v| !v.is_finite()) {
            return Err(CdssError::InvalidBackground(
                "background values must be finite".to_string(),
            ));
        }

        let features = (0..n_features)
            .map(|j| {
                let column: Vec<f64> = background.iter().map(|row| row[j]).collect();
                if has_spread(&column) {
                    QuartileBins::fit(&column).map(FeatureBinning::Quartile)
                } else {
                    Ok(FeatureBinning::Continuous {
                        mean: column[0],
                        std: 1.0,
                    })
                }
            })
            .collect::<Result<Vec<_>, CdssError>>()?;

        Ok(Self { features })
    }

    pub fn features(&self) -> &[FeatureBinning] {
        &self.features
    }

    /// Number of features perturbed continuously
    pub fn continuous_count(&self) -> usize {
        self.features
            .iter()
            .filter(|f| matches!(f, FeatureBinning::Continuous { .. }))
            .count()
    }

    /// Readable condition describing where `value` sits for feature `j`
    pub fn condition(&self, j: usize, name: &str, value: f64) -> String {
        match &self.features[j] {
            FeatureBinning::Quartile(bins) => bins.condition(name, bins.bin_of(value)),
            FeatureBinning::Continuous { .. } => name.to_string(),
        }
    }
}

fn has_spread(column: &[f64]) -> bool {
    column.iter().any(|&v| v != column[0])
}

/// numpy-style percentile with linear interpolation over sorted values
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// Count of boundaries strictly below `value`
fn bin_index(boundaries: &[f64], value: f64) -> usize {
    boundaries.iter().take_while(|&&b| b < value).count()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_std(values: &[f64], mu: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let var = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Box-Muller draw from N(0, 1)
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn column_rows(values: &[f64]) -> Vec<Vec<f64>> {
        values.iter().map(|&v| vec![v]).collect()
    }

    #[test]
    fn test_percentile_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&sorted, 25.0) - 1.75).abs() < 1e-12);
        assert!((percentile(&sorted, 50.0) - 2.5).abs() < 1e-12);
        assert!((percentile(&sorted, 75.0) - 3.25).abs() < 1e-12);
    }

    #[test]
    fn test_quartile_bins() {
        let rows = column_rows(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let disc = Discretizer::fit(&rows, 1).unwrap();

        let FeatureBinning::Quartile(bins) = &disc.features()[0] else {
            panic!("expected quartile binning");
        };
        assert_eq!(bins.boundaries.len(), 3);
        assert_eq!(bins.frequencies, vec![0.25, 0.25, 0.25, 0.25]);
        assert_eq!(bins.bin_of(0.0), 0);
        assert_eq!(bins.bin_of(bins.boundaries[0]), 0);
        assert_eq!(bins.bin_of(100.0), 3);
    }

    #[test]
    fn test_binary_column_collapses_boundaries() {
        let rows = column_rows(&[0.0, 0.0, 0.0, 1.0]);
        let disc = Discretizer::fit(&rows, 1).unwrap();

        let FeatureBinning::Quartile(bins) = &disc.features()[0] else {
            panic!("expected quartile binning");
        };
        assert_eq!(bins.boundaries, vec![0.0, 0.25]);
        assert_eq!(disc.condition(0, "x", 1.0), "x > 0.25");
        assert_eq!(disc.condition(0, "x", 0.0), "x <= 0.00");
    }

    #[test]
    fn test_constant_column_is_continuous() {
        let rows = vec![vec![-0.5, 1.0], vec![-0.5, 2.0]];
        let disc = Discretizer::fit(&rows, 2).unwrap();

        assert_eq!(disc.continuous_count(), 1);
        assert!(matches!(
            disc.features()[0],
            FeatureBinning::Continuous { mean, std } if mean == -0.5 && std == 1.0
        ));
        assert_eq!(disc.condition(0, "Age (yrs)", 3.0), "Age (yrs)");
    }

    #[test]
    fn test_sampled_values_stay_in_bin() {
        let rows = column_rows(&(0..40).map(|i| i as f64 / 4.0).collect::<Vec<_>>());
        let disc = Discretizer::fit(&rows, 1).unwrap();
        let FeatureBinning::Quartile(bins) = &disc.features()[0] else {
            panic!("expected quartile binning");
        };

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let bin = bins.sample_bin(&mut rng);
            let value = bins.sample_value(bin, &mut rng);
            assert!(value >= bins.mins[bin] && value <= bins.maxs[bin]);
        }
    }

    #[test]
    fn test_rejects_ragged_background() {
        let rows = vec![vec![0.0, 1.0], vec![0.0]];
        assert!(matches!(
            Discretizer::fit(&rows, 2),
            Err(CdssError::InvalidBackground(_))
        ));
        assert!(Discretizer::fit(&[], 2).is_err());
    }
}
