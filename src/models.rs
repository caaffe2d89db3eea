//! Data models for the enrichment and projection pipeline.

use serde::{Deserialize, Serialize};

/// Number of audio features per track. All feature vectors in one pipeline
/// run share this arity and field order.
pub const FEATURE_DIM: usize = 7;

/// A track as produced by the caller, before enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackStub {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<String>,
}

/// Audio features fetched from the analysis service.
///
/// Field order matches the feature-matrix column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub acousticness: f64,
    pub danceability: f64,
    pub energy: f64,
    pub instrumentalness: f64,
    pub loudness: f64, // dB
    pub tempo: f64,    // BPM
    pub speechiness: f64,
}

impl AudioFeatures {
    /// Feature values as a matrix row, in the fixed column order.
    pub fn to_row(&self) -> [f64; FEATURE_DIM] {
        [
            self.acousticness,
            self.danceability,
            self.energy,
            self.instrumentalness,
            self.loudness,
            self.tempo,
            self.speechiness,
        ]
    }
}

/// Outcome of enriching a single track.
///
/// A failed lookup is recorded, not raised; the track is dropped before
/// matrix construction and the reason is reported in pipeline diagnostics.
#[derive(Debug, Clone)]
pub enum FeatureOutcome {
    Features(AudioFeatures),
    FetchFailed(String),
    ParseFailed(String),
}

/// A track after the enrichment stage.
#[derive(Debug, Clone)]
pub struct EnrichedTrack {
    pub stub: TrackStub,
    pub outcome: FeatureOutcome,
}

impl EnrichedTrack {
    pub fn features(&self) -> Option<&AudioFeatures> {
        match &self.outcome {
            FeatureOutcome::Features(features) => Some(features),
            _ => None,
        }
    }
}

/// Terminal pipeline output, one per track that survived enrichment.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectedTrack {
    pub name: String,
    pub artists: Vec<String>,
    /// Cluster label; -1 marks noise/outlier tracks.
    pub cluster: i32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}
