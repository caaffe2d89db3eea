//! Automatic neighborhood-radius tuning from the k-distance curve.
//!
//! For each row the distance to its k-th nearest neighbor (counting the row
//! itself) is computed; sorted ascending these form a monotone curve whose
//! knee marks the radius where density drops off. The knee is located as the
//! point of maximum perpendicular distance from the chord of the
//! [0,1]-normalized curve. When no knee exists the tuner falls back to a
//! fixed radius and flags the run as degraded instead of failing.

use std::f64::consts::SQRT_2;

use tracing::{debug, warn};

use crate::analysis::StandardizedMatrix;
use crate::config::TuningSettings;

/// Result of radius tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningOutcome {
    pub radius: f64,
    /// True when knee detection failed and the fallback radius was used.
    /// A warning, not an error; clustering quality may be reduced.
    pub degraded: bool,
}

/// Pick a neighborhood radius for density clustering. Deterministic for a
/// given matrix and settings.
pub fn tune_radius(matrix: &StandardizedMatrix, settings: &TuningSettings) -> TuningOutcome {
    let n = matrix.n_rows();
    let k = settings.k.max(2);

    if n < 2 * k {
        warn!(
            "k-distance curve too short for knee detection ({} rows, k={}), \
             falling back to radius {}",
            n, k, settings.fallback_radius
        );
        return TuningOutcome {
            radius: settings.fallback_radius,
            degraded: true,
        };
    }

    let sq_distances = matrix.pairwise_sq_distances();
    let mut k_distances: Vec<f64> = sq_distances
        .iter()
        .map(|row| {
            let mut sorted = row.clone(); // row includes the zero self-distance
            sorted.sort_by(|a, b| a.total_cmp(b));
            sorted[k - 1].sqrt()
        })
        .collect();
    k_distances.sort_by(|a, b| a.total_cmp(b));

    match locate_knee(&k_distances, settings.min_knee_deviation) {
        Some(index) => {
            let radius = k_distances[index];
            debug!("Knee at index {} of {}, radius {:.4}", index, n, radius);
            TuningOutcome {
                radius,
                degraded: false,
            }
        }
        None => {
            warn!(
                "No knee found on k-distance curve, falling back to radius {}",
                settings.fallback_radius
            );
            TuningOutcome {
                radius: settings.fallback_radius,
                degraded: true,
            }
        }
    }
}

/// Index of the point maximizing perpendicular distance from the chord of
/// the normalized curve, or None when the curve is flat or never deviates
/// more than `min_deviation`.
fn locate_knee(curve: &[f64], min_deviation: f64) -> Option<usize> {
    let n = curve.len();
    if n < 3 {
        return None;
    }
    let first = curve[0];
    let span = curve[n - 1] - first;
    if span <= 0.0 {
        return None; // flat curve, no knee
    }

    let mut best: Option<usize> = None;
    let mut best_deviation = min_deviation;
    for (i, value) in curve.iter().enumerate() {
        let x = i as f64 / (n - 1) as f64;
        let y = (value - first) / span;
        // Chord runs from (0,0) to (1,1); a convex increasing curve bows
        // below it, so the knee maximizes (x - y).
        let deviation = (x - y) / SQRT_2;
        if deviation > best_deviation {
            best_deviation = deviation;
            best = Some(i);
        }
    }
    best
}
