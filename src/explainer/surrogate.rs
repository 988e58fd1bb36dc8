//! Weighted linear surrogate
//!
//! Ridge regression with intercept, fit on the perturbation sample weighted by
//! proximity to the explained instance, plus the two feature selection
//! strategies used to keep the surrogate sparse.

/// Regularization used while ranking candidate features
pub const SELECTION_ALPHA: f64 = 0.01;

/// Regularization of the final surrogate
pub const SURROGATE_ALPHA: f64 = 1.0;

/// Fitted ridge model over a subset of columns
#[derive(Debug, Clone, PartialEq)]
pub struct RidgeFit {
    pub columns: Vec<usize>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl RidgeFit {
    /// Weighted ridge fit of `target` on `columns` of `data`.
    ///
    /// Returns None when the normal equations are singular.
    pub fn fit(
        data: &[Vec<f64>],
        columns: &[usize],
        target: &[f64],
        weights: &[f64],
        alpha: f64,
    ) -> Option<Self> {
        let total_weight: f64 = weights.iter().sum();
        if total_weight <= 0.0 {
            return None;
        }

        let x_mean: Vec<f64> = columns
            .iter()
            .map(|&c| weighted_sum(data.iter().map(|row| row[c]), weights) / total_weight)
            .collect();
        let y_mean = weighted_sum(target.iter().copied(), weights) / total_weight;

        let p = columns.len();
        let mut gram = vec![vec![0.0; p]; p];
        let mut rhs = vec![0.0; p];
        for ((row, &y), &w) in data.iter().zip(target).zip(weights) {
            let centered: Vec<f64> = columns
                .iter()
                .zip(&x_mean)
                .map(|(&c, m)| row[c] - m)
                .collect();
            for a in 0..p {
                rhs[a] += w * centered[a] * (y - y_mean);
                for b in a..p {
                    gram[a][b] += w * centered[a] * centered[b];
                }
            }
        }
        for a in 0..p {
            gram[a][a] += alpha;
            for b in 0..a {
                gram[a][b] = gram[b][a];
            }
        }

        let coefficients = solve(gram, rhs)?;
        let intercept = y_mean
            - coefficients
                .iter()
                .zip(&x_mean)
                .map(|(w, m)| w * m)
                .sum::<f64>();

        Some(Self {
            columns: columns.to_vec(),
            coefficients,
            intercept,
        })
    }

    /// Surrogate output for one full-width row
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .columns
                .iter()
                .zip(&self.coefficients)
                .map(|(&c, w)| w * row[c])
                .sum::<f64>()
    }

    /// Weighted coefficient of determination on `data`
    pub fn score(&self, data: &[Vec<f64>], target: &[f64], weights: &[f64]) -> f64 {
        let total_weight: f64 = weights.iter().sum();
        let y_mean = weighted_sum(target.iter().copied(), weights) / total_weight;

        let mut residual = 0.0;
        let mut spread = 0.0;
        for ((row, &y), &w) in data.iter().zip(target).zip(weights) {
            residual += w * (y - self.predict_row(row)).powi(2);
            spread += w * (y - y_mean).powi(2);
        }

        if spread <= f64::EPSILON {
            return if residual <= f64::EPSILON { 1.0 } else { 0.0 };
        }
        1.0 - residual / spread
    }
}

/// Greedily add the feature that most improves the weighted R^2
pub fn forward_selection(
    data: &[Vec<f64>],
    target: &[f64],
    weights: &[f64],
    k: usize,
) -> Vec<usize> {
    let n_features = data.first().map_or(0, Vec::len);
    let mut used: Vec<usize> = Vec::with_capacity(k);

    for _ in 0..k.min(n_features) {
        let mut best: Option<(usize, f64)> = None;
        for candidate in (0..n_features).filter(|c| !used.contains(c)) {
            let mut columns = used.clone();
            columns.push(candidate);
            let score = RidgeFit::fit(data, &columns, target, weights, SELECTION_ALPHA)
                .map_or(f64::NEG_INFINITY, |fit| fit.score(data, target, weights));
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((candidate, score));
            }
        }
        match best {
            Some((feature, _)) => used.push(feature),
            None => break,
        }
    }
    used
}

/// Rank features by |coefficient × instance value| of a full ridge fit
pub fn highest_weights(
    data: &[Vec<f64>],
    target: &[f64],
    weights: &[f64],
    k: usize,
) -> Vec<usize> {
    let n_features = data.first().map_or(0, Vec::len);
    let all: Vec<usize> = (0..n_features).collect();
    let Some(fit) = RidgeFit::fit(data, &all, target, weights, SELECTION_ALPHA) else {
        return all.into_iter().take(k).collect();
    };

    let instance = &data[0];
    let mut ranked: Vec<(usize, f64)> = fit
        .coefficients
        .iter()
        .enumerate()
        .map(|(j, w)| (j, (w * instance[j]).abs()))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.into_iter().take(k).map(|(j, _)| j).collect()
}

fn weighted_sum(values: impl Iterator<Item = f64>, weights: &[f64]) -> f64 {
    values.zip(weights).map(|(v, w)| v * w).sum()
}

/// Gaussian elimination with partial pivoting
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_linear_data() -> (Vec<Vec<f64>>, Vec<f64>, Vec<f64>) {
        // y = 0.5 + 2 x0 - 1 x1, x2 is noise-free but irrelevant
        let mut data = Vec::new();
        let mut target = Vec::new();
        for i in 0..30 {
            let x0 = (i % 5 + 1) as f64;
            let x1 = ((i * 7) % 11 + 1) as f64 / 3.0;
            let x2 = ((i * 3) % 4 + 1) as f64;
            data.push(vec![x0, x1, x2]);
            target.push(0.5 + 2.0 * x0 - x1);
        }
        let weights = vec![1.0; data.len()];
        (data, target, weights)
    }

    #[test]
    fn test_solve_small_system() {
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let x = solve(a, vec![3.0, 5.0]).unwrap();
        assert!((x[0] - 0.8).abs() < 1e-12);
        assert!((x[1] - 1.4).abs() < 1e-12);
    }

    #[test]
    fn test_solve_singular() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(solve(a, vec![1.0, 2.0]).is_none());
    }

    #[test]
    fn test_ridge_recovers_linear_model() {
        let (data, target, weights) = make_linear_data();
        let fit = RidgeFit::fit(&data, &[0, 1, 2], &target, &weights, 1e-9).unwrap();

        assert!((fit.coefficients[0] - 2.0).abs() < 1e-6);
        assert!((fit.coefficients[1] + 1.0).abs() < 1e-6);
        assert!(fit.coefficients[2].abs() < 1e-6);
        assert!((fit.intercept - 0.5).abs() < 1e-6);
        assert!(fit.score(&data, &target, &weights) > 0.999_999);
    }

    #[test]
    fn test_ridge_shrinks_with_alpha() {
        let (data, target, weights) = make_linear_data();
        let loose = RidgeFit::fit(&data, &[0], &target, &weights, 0.0).unwrap();
        let tight = RidgeFit::fit(&data, &[0], &target, &weights, 100.0).unwrap();
        assert!(tight.coefficients[0].abs() < loose.coefficients[0].abs());
    }

    #[test]
    fn test_forward_selection_picks_informative_features() {
        let (data, target, weights) = make_linear_data();
        let selected = forward_selection(&data, &target, &weights, 2);

        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0], 0);
        assert!(selected.contains(&1));
    }

    #[test]
    fn test_highest_weights_respects_k() {
        let (data, target, weights) = make_linear_data();
        let selected = highest_weights(&data, &target, &weights, 2);
        assert_eq!(selected.len(), 2);
        assert!(!selected.contains(&2));
    }

    #[test]
    fn test_constant_target_scores_one() {
        let data = vec![vec![1.0], vec![2.0], vec![3.0]];
        let target = vec![0.3; 3];
        let weights = vec![1.0; 3];
        let fit = RidgeFit::fit(&data, &[0], &target, &weights, 1.0).unwrap();
        assert!(fit.coefficients[0].abs() < 1e-12);
        assert_eq!(fit.score(&data, &target, &weights), 1.0);
    }
}
