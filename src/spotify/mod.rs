//! Spotify-facing collaborators.
//!
//! This module provides the interfaces to the external Spotify side of the
//! system: a bearer-credential seam (token issuance and refresh live outside
//! this crate) and a client for the paged top-tracks listing that produces
//! the pipeline's input stubs.

mod token;
mod top_tracks;

pub use token::{StaticTokenProvider, TokenProvider};
pub use top_tracks::TopTracksClient;
