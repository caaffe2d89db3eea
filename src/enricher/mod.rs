//! Track enrichment stage.
//!
//! Fetches per-track audio features concurrently under a shared sliding-window
//! rate limit. Individual failures are tolerated: a track whose request fails
//! or whose response cannot be parsed is tagged and dropped downstream, never
//! aborting its siblings or the batch.

mod client;
mod manager;
mod rate_limit;

pub use client::AudioFeaturesClient;
pub use manager::{AudioFeaturesSource, Enricher};
pub use rate_limit::{NoOpLimiter, RequestLimiter, SlidingWindowLimiter};

use thiserror::Error;

/// Errors produced while enriching a single track.
///
/// These are per-item outcomes, not batch failures: the enricher converts
/// them into tagged `FeatureOutcome` values at its boundary.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    /// Network failure, timeout, or non-success response status.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Missing or malformed numeric field in an otherwise successful response.
    #[error("parse failed: {0}")]
    Parse(String),
}
