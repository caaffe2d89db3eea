//! Density-based clustering over the standardized matrix.
//!
//! A row is a core point when at least `min_samples` rows (itself included)
//! lie within `radius`. Clusters grow by expanding from core points through
//! their neighborhoods; rows reachable from no core point are labeled -1
//! (noise). The partition is a deterministic function of the inputs, with
//! labels numbered in discovery order.

use std::collections::VecDeque;

use tracing::debug;

use crate::analysis::{tune_radius, StandardizedMatrix, TuningOutcome};
use crate::config::TuningSettings;

const UNCLASSIFIED: i32 = -2;
/// Label for rows reachable from no core point.
pub const NOISE: i32 = -1;

/// Assign a cluster label to every row.
pub fn dbscan(matrix: &StandardizedMatrix, radius: f64, min_samples: usize) -> Vec<i32> {
    let n = matrix.n_rows();
    if n == 0 {
        return Vec::new();
    }

    let neighbors = neighbor_lists(matrix, radius);
    let mut labels = vec![UNCLASSIFIED; n];
    let mut cluster_id = 0;

    for i in 0..n {
        if labels[i] != UNCLASSIFIED {
            continue;
        }
        // Neighbor lists exclude the point itself, the core test includes it.
        if neighbors[i].len() + 1 < min_samples {
            labels[i] = NOISE;
            continue;
        }

        labels[i] = cluster_id;
        let mut queue: VecDeque<usize> = neighbors[i].iter().copied().collect();

        while let Some(j) = queue.pop_front() {
            if labels[j] == NOISE {
                labels[j] = cluster_id; // border point, not expanded
                continue;
            }
            if labels[j] != UNCLASSIFIED {
                continue;
            }
            labels[j] = cluster_id;

            if neighbors[j].len() + 1 >= min_samples {
                for &m in &neighbors[j] {
                    if labels[m] == UNCLASSIFIED || labels[m] == NOISE {
                        queue.push_back(m);
                    }
                }
            }
        }

        cluster_id += 1;
    }

    debug!("DBSCAN produced {} clusters over {} rows", cluster_id, n);
    labels
}

fn neighbor_lists(matrix: &StandardizedMatrix, radius: f64) -> Vec<Vec<usize>> {
    let n = matrix.n_rows();
    let radius_sq = radius * radius;
    let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); n];

    let sq_distances = matrix.pairwise_sq_distances();
    for i in 0..n {
        for j in (i + 1)..n {
            if sq_distances[i][j] <= radius_sq {
                neighbors[i].push(j);
                neighbors[j].push(i);
            }
        }
    }
    neighbors
}

/// Outcome of the clustering stage.
#[derive(Debug, Clone)]
pub struct ClusterAssignment {
    /// One label per matrix row; -1 is noise.
    pub labels: Vec<i32>,
    /// True when radius tuning fell back to its default.
    pub degraded_tuning: bool,
}

/// Strategy seam for the clustering stage.
pub trait Clusterer: Send + Sync {
    fn cluster(&self, matrix: &StandardizedMatrix) -> ClusterAssignment;
}

/// Canonical strategy: auto-tuned radius + density reachability.
pub struct DbscanClusterer {
    pub min_samples: usize,
    pub tuning: TuningSettings,
}

impl Clusterer for DbscanClusterer {
    fn cluster(&self, matrix: &StandardizedMatrix) -> ClusterAssignment {
        let TuningOutcome { radius, degraded } = tune_radius(matrix, &self.tuning);
        ClusterAssignment {
            labels: dbscan(matrix, radius, self.min_samples),
            degraded_tuning: degraded,
        }
    }
}
