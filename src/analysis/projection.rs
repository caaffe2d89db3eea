//! Nonlinear 3D embedding of the standardized matrix.
//!
//! t-SNE with perplexity-calibrated Gaussian affinities, early exaggeration,
//! and momentum gradient descent. Local neighborhoods in the D-dimensional
//! space stay close in the embedding; global distances are not preserved.
//! The RNG is seeded from configuration, so identical input and settings
//! reproduce the same embedding.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::analysis::StandardizedMatrix;
use crate::config::ProjectionSettings;

const OUTPUT_DIM: usize = 3;
const INIT_STD_DEV: f64 = 1e-4;
const EARLY_EXAGGERATION: f64 = 12.0;
const EARLY_EXAGGERATION_ITERS: usize = 100;
const MOMENTUM_SWITCH_ITER: usize = 250;
const MIN_PROBABILITY: f64 = 1e-12;
const ENTROPY_TOLERANCE: f64 = 1e-5;
const ENTROPY_SEARCH_STEPS: usize = 50;

/// Strategy seam for the projection stage.
pub trait Projector: Send + Sync {
    /// Embed each matrix row into 3D, one coordinate triple per row.
    fn project(&self, matrix: &StandardizedMatrix) -> Vec<[f64; 3]>;
}

/// Canonical strategy: seeded t-SNE into three dimensions.
pub struct TsneProjector {
    settings: ProjectionSettings,
}

impl TsneProjector {
    pub fn new(settings: ProjectionSettings) -> Self {
        Self { settings }
    }
}

impl Projector for TsneProjector {
    fn project(&self, matrix: &StandardizedMatrix) -> Vec<[f64; 3]> {
        let n = matrix.n_rows();
        if n == 0 {
            return Vec::new();
        }

        let mut rng = StdRng::seed_from_u64(self.settings.seed);
        let init = Normal::new(0.0, INIT_STD_DEV).unwrap();
        let mut embedding: Vec<[f64; OUTPUT_DIM]> = (0..n)
            .map(|_| [init.sample(&mut rng), init.sample(&mut rng), init.sample(&mut rng)])
            .collect();

        // Too few points for neighborhood calibration; the seeded init is
        // already a valid (trivial) embedding.
        if n <= OUTPUT_DIM {
            return embedding;
        }

        let affinities = joint_affinities(matrix, self.settings.perplexity);
        let mut velocity = vec![[0.0f64; OUTPUT_DIM]; n];
        let mut gradient = vec![[0.0f64; OUTPUT_DIM]; n];

        for iter in 0..self.settings.iterations {
            let exaggeration = if iter < EARLY_EXAGGERATION_ITERS {
                EARLY_EXAGGERATION
            } else {
                1.0
            };
            let momentum = if iter < MOMENTUM_SWITCH_ITER { 0.5 } else { 0.8 };

            // Student-t kernel over the current embedding.
            let mut kernel = vec![vec![0.0f64; n]; n];
            let mut kernel_sum = 0.0;
            for i in 0..n {
                for j in (i + 1)..n {
                    let mut dist_sq = 0.0;
                    for d in 0..OUTPUT_DIM {
                        let diff = embedding[i][d] - embedding[j][d];
                        dist_sq += diff * diff;
                    }
                    let value = 1.0 / (1.0 + dist_sq);
                    kernel[i][j] = value;
                    kernel[j][i] = value;
                    kernel_sum += 2.0 * value;
                }
            }
            let kernel_sum = kernel_sum.max(MIN_PROBABILITY);

            for g in gradient.iter_mut() {
                *g = [0.0; OUTPUT_DIM];
            }
            for i in 0..n {
                for j in 0..n {
                    if i == j {
                        continue;
                    }
                    let q = (kernel[i][j] / kernel_sum).max(MIN_PROBABILITY);
                    let coefficient =
                        4.0 * (exaggeration * affinities[i][j] - q) * kernel[i][j];
                    for d in 0..OUTPUT_DIM {
                        gradient[i][d] += coefficient * (embedding[i][d] - embedding[j][d]);
                    }
                }
            }

            for i in 0..n {
                for d in 0..OUTPUT_DIM {
                    velocity[i][d] = momentum * velocity[i][d]
                        - self.settings.learning_rate * gradient[i][d];
                    embedding[i][d] += velocity[i][d];
                }
            }

            // Keep the embedding centered.
            let mut mean = [0.0f64; OUTPUT_DIM];
            for point in &embedding {
                for d in 0..OUTPUT_DIM {
                    mean[d] += point[d];
                }
            }
            for d in 0..OUTPUT_DIM {
                mean[d] /= n as f64;
            }
            for point in embedding.iter_mut() {
                for d in 0..OUTPUT_DIM {
                    point[d] -= mean[d];
                }
            }
        }

        embedding
    }
}

/// Symmetrized joint affinities with per-row Gaussian bandwidths calibrated
/// to the target perplexity.
fn joint_affinities(matrix: &StandardizedMatrix, perplexity: f64) -> Vec<Vec<f64>> {
    let n = matrix.n_rows();
    let sq_distances = matrix.pairwise_sq_distances();
    // Perplexity cannot exceed the neighbor count.
    let effective_perplexity = perplexity.min((n - 1) as f64 / 3.0).max(1.0);
    let target_entropy = effective_perplexity.ln();

    let mut conditional = vec![vec![0.0f64; n]; n];
    for i in 0..n {
        let row = conditional_row(&sq_distances[i], i, target_entropy);
        conditional[i] = row;
    }

    let mut joint = vec![vec![0.0f64; n]; n];
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            joint[i][j] =
                ((conditional[i][j] + conditional[j][i]) / (2.0 * n as f64)).max(MIN_PROBABILITY);
        }
    }
    joint
}

/// Binary-search the precision for row `i` until the conditional
/// distribution's entropy matches the target.
fn conditional_row(sq_distances: &[f64], i: usize, target_entropy: f64) -> Vec<f64> {
    let n = sq_distances.len();
    let mut beta = 1.0;
    let mut beta_min = f64::NEG_INFINITY;
    let mut beta_max = f64::INFINITY;
    let mut probabilities = vec![0.0f64; n];

    for _ in 0..ENTROPY_SEARCH_STEPS {
        let mut sum = 0.0;
        let mut weighted_dist = 0.0;
        for j in 0..n {
            if j == i {
                probabilities[j] = 0.0;
                continue;
            }
            let p = (-beta * sq_distances[j]).exp();
            probabilities[j] = p;
            sum += p;
            weighted_dist += sq_distances[j] * p;
        }

        if sum <= 0.0 {
            // Bandwidth collapsed; widen and retry.
            beta_max = beta;
            beta /= 2.0;
            continue;
        }

        let entropy = sum.ln() + beta * weighted_dist / sum;
        let diff = entropy - target_entropy;
        if diff.abs() < ENTROPY_TOLERANCE {
            break;
        }
        if diff > 0.0 {
            beta_min = beta;
            beta = if beta_max.is_finite() {
                (beta + beta_max) / 2.0
            } else {
                beta * 2.0
            };
        } else {
            beta_max = beta;
            beta = if beta_min.is_finite() {
                (beta + beta_min) / 2.0
            } else {
                beta / 2.0
            };
        }
    }

    let sum: f64 = probabilities.iter().sum();
    if sum > 0.0 {
        for p in probabilities.iter_mut() {
            *p /= sum;
        }
    }
    probabilities
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_far_groups() -> StandardizedMatrix {
        // Two tight groups of 12 points in 5D, centers far apart.
        let mut rows = Vec::new();
        for g in 0..2 {
            let offset = g as f64 * 20.0;
            for p in 0..12 {
                let jitter = (p as f64 * 0.037).sin() * 0.3;
                rows.push(vec![
                    offset + jitter,
                    offset - jitter,
                    jitter * 0.5,
                    -jitter,
                    offset + jitter * 0.2,
                ]);
            }
        }
        StandardizedMatrix::from_rows(rows)
    }

    fn settings(seed: u64) -> ProjectionSettings {
        ProjectionSettings {
            perplexity: 30.0,
            iterations: 400,
            learning_rate: 200.0,
            seed,
        }
    }

    fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    #[test]
    fn test_one_coordinate_per_row_all_finite() {
        let matrix = two_far_groups();
        let coords = TsneProjector::new(settings(42)).project(&matrix);
        assert_eq!(coords.len(), matrix.n_rows());
        for point in &coords {
            assert!(point.iter().all(|v| v.is_finite()), "{:?}", point);
        }
    }

    #[test]
    fn test_same_seed_reproduces_embedding() {
        let matrix = two_far_groups();
        let first = TsneProjector::new(settings(42)).project(&matrix);
        let second = TsneProjector::new(settings(42)).project(&matrix);
        assert_eq!(first, second);
    }

    #[test]
    fn test_different_seeds_differ() {
        let matrix = two_far_groups();
        let first = TsneProjector::new(settings(1)).project(&matrix);
        let second = TsneProjector::new(settings(2)).project(&matrix);
        assert_ne!(first, second);
    }

    #[test]
    fn test_local_structure_preserved() {
        let matrix = two_far_groups();
        let coords = TsneProjector::new(settings(42)).project(&matrix);

        let mut intra = Vec::new();
        let mut inter = Vec::new();
        for i in 0..coords.len() {
            for j in (i + 1)..coords.len() {
                let d = distance(&coords[i], &coords[j]);
                if (i < 12) == (j < 12) {
                    intra.push(d);
                } else {
                    inter.push(d);
                }
            }
        }
        let intra_mean: f64 = intra.iter().sum::<f64>() / intra.len() as f64;
        let inter_mean: f64 = inter.iter().sum::<f64>() / inter.len() as f64;
        assert!(
            intra_mean < inter_mean,
            "intra {} >= inter {}",
            intra_mean,
            inter_mean
        );
    }

    #[test]
    fn test_tiny_input_degrades_to_trivial_embedding() {
        let matrix = StandardizedMatrix::from_rows(vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
        let projector = TsneProjector::new(settings(42));
        let coords = projector.project(&matrix);
        assert_eq!(coords.len(), 2);
        assert_eq!(coords, projector.project(&matrix));
    }

    #[test]
    fn test_empty_input_yields_empty_embedding() {
        let matrix = StandardizedMatrix::from_rows(Vec::new());
        assert!(TsneProjector::new(settings(42)).project(&matrix).is_empty());
    }
}
