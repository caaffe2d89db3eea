//! Feature-matrix assembly and standardization.

use rayon::prelude::*;
use thiserror::Error;

use crate::models::EnrichedTrack;

/// Too few tracks survived enrichment for clustering to be meaningful.
#[derive(Debug, Clone, Error)]
#[error("only {survivors} tracks usable, need at least {required}")]
pub struct InsufficientDataError {
    pub survivors: usize,
    pub required: usize,
}

/// N×D matrix with column-wise zero mean and unit variance.
///
/// Row order matches the survivor order of the tracks it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardizedMatrix {
    rows: Vec<Vec<f64>>,
}

impl StandardizedMatrix {
    /// Stack the feature vectors of surviving tracks and standardize each
    /// column to zero mean and unit variance (population statistics over
    /// this run's rows).
    pub fn from_enriched(
        tracks: &[EnrichedTrack],
        min_rows: usize,
    ) -> Result<Self, InsufficientDataError> {
        let rows: Vec<Vec<f64>> = tracks
            .iter()
            .filter_map(|t| t.features())
            .map(|f| f.to_row().to_vec())
            .collect();
        Self::standardize(rows, min_rows)
    }

    /// Standardize raw rows. Errors when fewer than `min_rows` rows are
    /// available.
    pub fn standardize(
        mut rows: Vec<Vec<f64>>,
        min_rows: usize,
    ) -> Result<Self, InsufficientDataError> {
        if rows.len() < min_rows.max(1) {
            return Err(InsufficientDataError {
                survivors: rows.len(),
                required: min_rows.max(1),
            });
        }

        let n = rows.len();
        let dim = rows[0].len();
        debug_assert!(rows.iter().all(|r| r.len() == dim));

        for col in 0..dim {
            let mean = rows.iter().map(|r| r[col]).sum::<f64>() / n as f64;
            let variance =
                rows.iter().map(|r| (r[col] - mean).powi(2)).sum::<f64>() / n as f64;
            // A constant column carries no signal; leave it centered at zero
            // instead of dividing by a zero deviation.
            let scale = if variance > 0.0 { variance.sqrt() } else { 1.0 };
            for row in rows.iter_mut() {
                row[col] = (row[col] - mean) / scale;
            }
        }

        Ok(Self { rows })
    }

    /// Wrap rows that are already on a common scale (e.g. synthetic data).
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        debug_assert!(rows.windows(2).all(|w| w[0].len() == w[1].len()));
        Self { rows }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }

    pub fn row(&self, index: usize) -> &[f64] {
        &self.rows[index]
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Full pairwise squared-Euclidean distance matrix.
    pub fn pairwise_sq_distances(&self) -> Vec<Vec<f64>> {
        (0..self.rows.len())
            .into_par_iter()
            .map(|i| {
                self.rows
                    .iter()
                    .map(|other| sq_distance(&self.rows[i], other))
                    .collect()
            })
            .collect()
    }
}

fn sq_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AudioFeatures, FeatureOutcome, TrackStub};

    const TOLERANCE: f64 = 1e-9;

    fn enriched(id: &str, features: Option<AudioFeatures>) -> EnrichedTrack {
        EnrichedTrack {
            stub: TrackStub {
                id: id.to_string(),
                name: id.to_string(),
                artists: vec![],
            },
            outcome: match features {
                Some(f) => FeatureOutcome::Features(f),
                None => FeatureOutcome::FetchFailed("scripted".to_string()),
            },
        }
    }

    fn features(value: f64) -> AudioFeatures {
        AudioFeatures {
            acousticness: value,
            danceability: value * 2.0,
            energy: 0.5,
            instrumentalness: -value,
            loudness: value * 10.0 - 5.0,
            tempo: 100.0 + value * 40.0,
            speechiness: value / 3.0,
        }
    }

    #[test]
    fn test_columns_have_zero_mean_unit_variance() {
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| features(i as f64 / 19.0).to_row().to_vec())
            .collect();
        let matrix = StandardizedMatrix::standardize(rows, 1).unwrap();

        for col in 0..matrix.n_cols() {
            let n = matrix.n_rows() as f64;
            let mean: f64 = matrix.rows().iter().map(|r| r[col]).sum::<f64>() / n;
            let variance: f64 =
                matrix.rows().iter().map(|r| (r[col] - mean).powi(2)).sum::<f64>() / n;
            assert!(mean.abs() < TOLERANCE, "column {} mean = {}", col, mean);
            if col == 2 {
                // The constant column standardizes to all zeros.
                assert!(variance.abs() < TOLERANCE);
            } else {
                assert!((variance - 1.0).abs() < 1e-6, "column {} var = {}", col, variance);
            }
        }
    }

    #[test]
    fn test_filters_dropped_tracks_preserving_order() {
        let tracks = vec![
            enriched("a", Some(features(0.1))),
            enriched("b", None),
            enriched("c", Some(features(0.9))),
        ];
        let matrix = StandardizedMatrix::from_enriched(&tracks, 2).unwrap();
        assert_eq!(matrix.n_rows(), 2);
        // Row 0 came from "a" (smaller acousticness), row 1 from "c".
        assert!(matrix.row(0)[0] < matrix.row(1)[0]);
    }

    #[test]
    fn test_insufficient_rows_is_an_error() {
        let tracks = vec![enriched("a", Some(features(0.1))), enriched("b", None)];
        let err = StandardizedMatrix::from_enriched(&tracks, 5).unwrap_err();
        assert_eq!(err.survivors, 1);
        assert_eq!(err.required, 5);
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let err = StandardizedMatrix::standardize(Vec::new(), 0).unwrap_err();
        assert_eq!(err.survivors, 0);
    }

    #[test]
    fn test_pairwise_distances_are_symmetric_with_zero_diagonal() {
        let matrix = StandardizedMatrix::from_rows(vec![
            vec![0.0, 0.0],
            vec![3.0, 4.0],
            vec![-1.0, 1.0],
        ]);
        let d = matrix.pairwise_sq_distances();
        assert_eq!(d[0][1], 25.0);
        for i in 0..3 {
            assert_eq!(d[i][i], 0.0);
            for j in 0..3 {
                assert_eq!(d[i][j], d[j][i]);
            }
        }
    }
}
