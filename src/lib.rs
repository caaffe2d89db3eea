//! Track Nebula Library
//!
//! Enriches track listings with audio-feature vectors from a rate-limited
//! external service, then standardizes, clusters, and projects them into 3D
//! coordinates for nebula rendering.

pub mod analysis;
pub mod config;
pub mod enricher;
pub mod models;
pub mod pipeline;
pub mod spotify;

// Re-export commonly used types for convenience
pub use analysis::{dbscan, DbscanClusterer, StandardizedMatrix, TsneProjector};
pub use enricher::{AudioFeaturesSource, Enricher, EnrichmentError, SlidingWindowLimiter};
pub use models::{AudioFeatures, EnrichedTrack, ProjectedTrack, TrackStub};
pub use pipeline::{NebulaPipeline, NebulaResult, PipelineError};
pub use spotify::{StaticTokenProvider, TokenProvider, TopTracksClient};
