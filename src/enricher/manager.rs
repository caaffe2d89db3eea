//! Concurrent enrichment orchestration.

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::EnricherSettings;
use crate::enricher::{EnrichmentError, RequestLimiter};
use crate::models::{AudioFeatures, EnrichedTrack, FeatureOutcome, TrackStub};

/// Source of per-track audio features.
///
/// Implemented by the HTTP client in production and by scripted fakes in
/// tests.
#[async_trait]
pub trait AudioFeaturesSource: Send + Sync {
    async fn fetch_features(&self, track: &TrackStub) -> Result<AudioFeatures, EnrichmentError>;
}

/// Runs the enrichment stage for one batch of track stubs.
///
/// Requests run concurrently, each staggered by its index and admitted
/// through the shared rate limiter. Results come back positionally aligned
/// with the input regardless of completion order.
pub struct Enricher {
    source: Arc<dyn AudioFeaturesSource>,
    limiter: Arc<dyn RequestLimiter>,
    settings: EnricherSettings,
}

impl Enricher {
    pub fn new(
        source: Arc<dyn AudioFeaturesSource>,
        limiter: Arc<dyn RequestLimiter>,
        settings: EnricherSettings,
    ) -> Self {
        Self {
            source,
            limiter,
            settings,
        }
    }

    /// Enrich every stub. The output has the same length and order as the
    /// input; failed lookups yield tagged outcomes instead of features.
    pub async fn enrich(&self, stubs: &[TrackStub]) -> Vec<EnrichedTrack> {
        let tasks = stubs
            .iter()
            .enumerate()
            .map(|(index, stub)| self.enrich_one(index, stub));
        let enriched = join_all(tasks).await;

        let dropped = enriched.iter().filter(|t| t.features().is_none()).count();
        if dropped > 0 {
            warn!(
                "Enrichment dropped {} of {} tracks",
                dropped,
                enriched.len()
            );
        }
        enriched
    }

    async fn enrich_one(&self, index: usize, stub: &TrackStub) -> EnrichedTrack {
        tokio::time::sleep(self.settings.stagger * index as u32).await;
        self.limiter.acquire().await;

        let outcome = match timeout(
            self.settings.request_timeout,
            self.source.fetch_features(stub),
        )
        .await
        {
            Ok(Ok(features)) => {
                debug!("Enriched '{}'", stub.name);
                FeatureOutcome::Features(features)
            }
            Ok(Err(EnrichmentError::Parse(reason))) => {
                warn!("Dropping '{}': {}", stub.name, reason);
                FeatureOutcome::ParseFailed(reason)
            }
            Ok(Err(EnrichmentError::Fetch(reason))) => {
                warn!("Dropping '{}': {}", stub.name, reason);
                FeatureOutcome::FetchFailed(reason)
            }
            Err(_) => {
                let reason = format!(
                    "request timed out after {}s",
                    self.settings.request_timeout.as_secs_f64()
                );
                warn!("Dropping '{}': {}", stub.name, reason);
                FeatureOutcome::FetchFailed(reason)
            }
        };

        EnrichedTrack {
            stub: stub.clone(),
            outcome,
        }
    }
}
