//! End-to-end enrichment-and-projection pipeline.
//!
//! Sequences enrichment, matrix construction, clustering, and projection,
//! then zips track metadata, cluster labels, and 3D coordinates into
//! `ProjectedTrack` records. Holds no algorithmic logic of its own.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::analysis::{
    Clusterer, DbscanClusterer, InsufficientDataError, Projector, StandardizedMatrix,
    TsneProjector,
};
use crate::config::PipelineSettings;
use crate::enricher::{AudioFeaturesSource, Enricher, RequestLimiter, SlidingWindowLimiter};
use crate::models::{EnrichedTrack, FeatureOutcome, ProjectedTrack, TrackStub};

/// Fatal pipeline failures. Per-track enrichment failures are not errors;
/// they surface as dropped tracks in the diagnostics.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    InsufficientData(#[from] InsufficientDataError),
}

/// Why a track was dropped during enrichment.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DropReason {
    Fetch(String),
    Parse(String),
}

/// A track that did not survive enrichment.
#[derive(Debug, Clone, Serialize)]
pub struct DroppedTrack {
    pub name: String,
    pub reason: DropReason,
}

/// Non-fatal observations from one pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineDiagnostics {
    /// Radius tuning fell back to its default; clustering quality may be
    /// reduced.
    pub degraded_tuning: bool,
    pub dropped: Vec<DroppedTrack>,
}

/// Result of a successful pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct NebulaResult {
    pub tracks: Vec<ProjectedTrack>,
    pub diagnostics: PipelineDiagnostics,
}

/// Runs the full stub-to-projection pipeline for one batch.
pub struct NebulaPipeline {
    enricher: Enricher,
    clusterer: Box<dyn Clusterer>,
    projector: Box<dyn Projector>,
    min_rows: usize,
}

impl NebulaPipeline {
    /// Build a pipeline with the canonical DBSCAN + t-SNE strategy pairing
    /// and a fresh rate limiter scoped to this pipeline.
    pub fn new(source: Arc<dyn AudioFeaturesSource>, settings: PipelineSettings) -> Self {
        let limiter: Arc<dyn RequestLimiter> = Arc::new(SlidingWindowLimiter::new(
            settings.enricher.max_requests_per_window,
            settings.enricher.window,
        ));
        Self::with_strategies(
            source,
            limiter,
            settings.clone(),
            Box::new(DbscanClusterer {
                min_samples: settings.min_samples,
                tuning: settings.tuning,
            }),
            Box::new(TsneProjector::new(settings.projection)),
        )
    }

    /// Build a pipeline with explicit clustering/projection strategies and
    /// rate limiter.
    pub fn with_strategies(
        source: Arc<dyn AudioFeaturesSource>,
        limiter: Arc<dyn RequestLimiter>,
        settings: PipelineSettings,
        clusterer: Box<dyn Clusterer>,
        projector: Box<dyn Projector>,
    ) -> Self {
        Self {
            enricher: Enricher::new(source, limiter, settings.enricher),
            clusterer,
            projector,
            min_rows: settings.min_samples,
        }
    }

    /// Run the pipeline over one ordered batch of stubs.
    ///
    /// Enrichment completes fully (every request finished or failed) before
    /// any analysis starts. Output preserves the order of surviving input
    /// tracks.
    pub async fn run(&self, stubs: &[TrackStub]) -> Result<NebulaResult, PipelineError> {
        info!("Starting pipeline for {} tracks", stubs.len());
        let enriched = self.enricher.enrich(stubs).await;
        let dropped = collect_dropped(&enriched);

        let matrix = StandardizedMatrix::from_enriched(&enriched, self.min_rows)?;
        let assignment = self.clusterer.cluster(&matrix);
        let coordinates = self.projector.project(&matrix);

        let survivors = enriched.iter().filter_map(|track| {
            track
                .features()
                .map(|_| (track.stub.name.clone(), track.stub.artists.clone()))
        });
        let tracks: Vec<ProjectedTrack> = survivors
            .zip(assignment.labels.iter().zip(&coordinates))
            .map(|((name, artists), (&cluster, position))| ProjectedTrack {
                name,
                artists,
                cluster,
                x: position[0],
                y: position[1],
                z: position[2],
            })
            .collect();

        info!(
            "Pipeline finished: {} projected, {} dropped, degraded_tuning={}",
            tracks.len(),
            dropped.len(),
            assignment.degraded_tuning
        );

        Ok(NebulaResult {
            tracks,
            diagnostics: PipelineDiagnostics {
                degraded_tuning: assignment.degraded_tuning,
                dropped,
            },
        })
    }
}

fn collect_dropped(enriched: &[EnrichedTrack]) -> Vec<DroppedTrack> {
    enriched
        .iter()
        .filter_map(|track| {
            let reason = match &track.outcome {
                FeatureOutcome::Features(_) => return None,
                FeatureOutcome::FetchFailed(detail) => DropReason::Fetch(detail.clone()),
                FeatureOutcome::ParseFailed(detail) => DropReason::Parse(detail.clone()),
            };
            Some(DroppedTrack {
                name: track.stub.name.clone(),
                reason,
            })
        })
        .collect()
}
