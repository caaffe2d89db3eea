//! Unsupervised analysis of standardized feature matrices.
//!
//! Synchronous, CPU-bound stages that run after the enrichment barrier:
//! matrix standardization, neighborhood-radius tuning, density clustering,
//! and nonlinear 3D projection. Clustering and projection sit behind
//! strategy traits so the algorithm pairing can be swapped without touching
//! the pipeline.

mod dbscan;
mod matrix;
mod projection;
mod tuner;

pub use dbscan::{dbscan, ClusterAssignment, Clusterer, DbscanClusterer, NOISE};
pub use matrix::{InsufficientDataError, StandardizedMatrix};
pub use projection::{Projector, TsneProjector};
pub use tuner::{tune_radius, TuningOutcome};
