//! Client for the paged top-tracks listing.
//!
//! Fetches a user's top tracks in pages of 50 and maps the response items
//! into `TrackStub` records. Items missing an id or name are skipped.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::models::TrackStub;
use crate::spotify::TokenProvider;

const PAGE_SIZE: usize = 50;

pub struct TopTracksClient {
    client: Client,
    base_url: String,
    token_provider: Arc<dyn TokenProvider>,
}

#[derive(Deserialize)]
struct TopTracksResponse {
    items: Option<Vec<TopTrackItem>>,
}

#[derive(Deserialize)]
struct TopTrackItem {
    id: Option<String>,
    name: Option<String>,
    #[serde(default)]
    artists: Vec<TopTrackArtist>,
}

#[derive(Deserialize)]
struct TopTrackArtist {
    name: Option<String>,
}

impl TopTracksClient {
    /// Create a new TopTracksClient.
    ///
    /// # Arguments
    /// * `base_url` - Top-tracks endpoint (e.g. "https://api.spotify.com/v1/me/top/tracks")
    /// * `timeout_secs` - Request timeout in seconds
    pub fn new(
        base_url: String,
        timeout_secs: u64,
        token_provider: Arc<dyn TokenProvider>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            token_provider,
        })
    }

    /// Fetch up to `limit` top tracks for the given term, paging as needed.
    ///
    /// `term` is the listing's time range (e.g. "short_term", "medium_term",
    /// "long_term").
    pub async fn get_top_tracks(&self, term: &str, limit: usize) -> Result<Vec<TrackStub>> {
        let token = self.token_provider.bearer_token().await?;
        let mut stubs = Vec::with_capacity(limit);
        let mut offset = 0usize;

        while stubs.len() < limit {
            let page_limit = PAGE_SIZE.min(limit - stubs.len());
            let response = self
                .client
                .get(&self.base_url)
                .bearer_auth(&token)
                .query(&[
                    ("time_range", term),
                    ("limit", &page_limit.to_string()),
                    ("offset", &offset.to_string()),
                ])
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(anyhow!(
                    "Top tracks request failed with status: {}",
                    response.status()
                ));
            }

            let body: TopTracksResponse = response.json().await?;
            let items = body.items.unwrap_or_default();
            if items.is_empty() {
                break;
            }

            let page_len = items.len();
            stubs.extend(parse_items(items));
            if page_len < page_limit {
                break; // listing exhausted
            }
            offset += page_len;
        }

        Ok(stubs)
    }
}

fn parse_items(items: Vec<TopTrackItem>) -> Vec<TrackStub> {
    items
        .into_iter()
        .filter_map(|item| {
            let (id, name) = match (item.id, item.name) {
                (Some(id), Some(name)) => (id, name),
                _ => {
                    warn!("Skipping top-tracks item without id or name");
                    return None;
                }
            };
            let artists = item.artists.into_iter().filter_map(|a| a.name).collect();
            Some(TrackStub { id, name, artists })
        })
        .collect()
}
