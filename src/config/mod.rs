//! Configuration for the enrichment and analysis stages.
//!
//! Each component takes its own settings struct; `PipelineSettings` bundles
//! them for one pipeline invocation. All defaults come from the production
//! tuning of the analysis service integration.

use std::time::Duration;

/// Settings for the concurrent enrichment stage.
#[derive(Debug, Clone)]
pub struct EnricherSettings {
    /// Maximum requests admitted per sliding window.
    pub max_requests_per_window: usize,
    /// Length of the rate-limit window.
    pub window: Duration,
    /// Per-index launch stagger: request `i` starts `i * stagger` after the
    /// batch begins, so the limiter never sees the whole batch at once.
    pub stagger: Duration,
    /// Independent timeout for each feature request.
    pub request_timeout: Duration,
}

impl Default for EnricherSettings {
    fn default() -> Self {
        Self {
            max_requests_per_window: 10,
            window: Duration::from_secs(1),
            stagger: Duration::from_millis(150),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Settings for neighborhood-radius tuning from the k-distance curve.
#[derive(Debug, Clone)]
pub struct TuningSettings {
    /// Neighbor count for the k-distance curve. Counts the point itself,
    /// so the curve uses the distance to the (k-1)-th nearest other row.
    pub k: usize,
    /// Radius used when no knee can be located.
    pub fallback_radius: f64,
    /// Minimum chord deviation (on the [0,1]-normalized curve) for a point
    /// to count as a knee. Curves flatter than this fall back.
    pub min_knee_deviation: f64,
}

impl Default for TuningSettings {
    fn default() -> Self {
        Self {
            k: 9,
            fallback_radius: 0.5,
            min_knee_deviation: 0.01,
        }
    }
}

/// Settings for the 3D embedding.
#[derive(Debug, Clone)]
pub struct ProjectionSettings {
    /// Neighborhood-size analogue; clamped down for small inputs.
    pub perplexity: f64,
    /// Gradient-descent iterations.
    pub iterations: usize,
    pub learning_rate: f64,
    /// Fixed RNG seed so repeated runs embed consistently.
    pub seed: u64,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            perplexity: 30.0,
            iterations: 500,
            learning_rate: 200.0,
            seed: 42,
        }
    }
}

/// Bundled settings for one pipeline invocation.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub enricher: EnricherSettings,
    pub tuning: TuningSettings,
    pub projection: ProjectionSettings,
    /// DBSCAN minimum-samples count. Also the minimum number of tracks that
    /// must survive enrichment for the run to proceed.
    pub min_samples: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            enricher: EnricherSettings::default(),
            tuning: TuningSettings::default(),
            projection: ProjectionSettings::default(),
            min_samples: 16,
        }
    }
}
