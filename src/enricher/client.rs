//! HTTP client for the per-track audio analysis service.
//!
//! The service returns a JSON object with one numeric field per feature.
//! Loudness may arrive as a string with a dB unit suffix (e.g. "-5.3 dB");
//! it is parsed after stripping the suffix. A missing or non-numeric
//! required field is a parse failure for that track.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::manager::AudioFeaturesSource;
use super::EnrichmentError;
use crate::models::{AudioFeatures, TrackStub};
use crate::spotify::TokenProvider;

pub struct AudioFeaturesClient {
    client: Client,
    base_url: String,
    token_provider: Arc<dyn TokenProvider>,
}

#[derive(Deserialize)]
struct RawAudioFeatures {
    acousticness: Option<f64>,
    danceability: Option<f64>,
    energy: Option<f64>,
    instrumentalness: Option<f64>,
    /// Number, or a string like "-5.3 dB".
    loudness: Option<serde_json::Value>,
    tempo: Option<f64>,
    speechiness: Option<f64>,
}

impl AudioFeaturesClient {
    /// Create a new AudioFeaturesClient.
    ///
    /// # Arguments
    /// * `base_url` - Analysis endpoint; the track id is appended as a path segment
    /// * `timeout_secs` - Request timeout in seconds
    pub fn new(
        base_url: String,
        timeout_secs: u64,
        token_provider: Arc<dyn TokenProvider>,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            token_provider,
        })
    }
}

#[async_trait]
impl AudioFeaturesSource for AudioFeaturesClient {
    async fn fetch_features(&self, track: &TrackStub) -> Result<AudioFeatures, EnrichmentError> {
        let token = self
            .token_provider
            .bearer_token()
            .await
            .map_err(|e| EnrichmentError::Fetch(format!("no bearer token: {}", e)))?;

        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), track.id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| EnrichmentError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EnrichmentError::Fetch(format!(
                "audio features request failed with status {}",
                response.status()
            )));
        }

        let raw: RawAudioFeatures = response
            .json()
            .await
            .map_err(|e| EnrichmentError::Parse(e.to_string()))?;

        features_from_raw(raw)
    }
}

fn features_from_raw(raw: RawAudioFeatures) -> Result<AudioFeatures, EnrichmentError> {
    Ok(AudioFeatures {
        acousticness: required(raw.acousticness, "acousticness")?,
        danceability: required(raw.danceability, "danceability")?,
        energy: required(raw.energy, "energy")?,
        instrumentalness: required(raw.instrumentalness, "instrumentalness")?,
        loudness: parse_loudness(raw.loudness)?,
        tempo: required(raw.tempo, "tempo")?,
        speechiness: required(raw.speechiness, "speechiness")?,
    })
}

fn required(value: Option<f64>, field: &str) -> Result<f64, EnrichmentError> {
    value.ok_or_else(|| EnrichmentError::Parse(format!("missing numeric field '{}'", field)))
}

fn parse_loudness(value: Option<serde_json::Value>) -> Result<f64, EnrichmentError> {
    let value = value
        .ok_or_else(|| EnrichmentError::Parse("missing numeric field 'loudness'".to_string()))?;
    match value {
        serde_json::Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| EnrichmentError::Parse("loudness is not a finite number".to_string())),
        serde_json::Value::String(text) => {
            let stripped = text.trim().trim_end_matches("dB").trim();
            stripped.parse::<f64>().map_err(|_| {
                EnrichmentError::Parse(format!("cannot parse loudness value '{}'", text))
            })
        }
        other => Err(EnrichmentError::Parse(format!(
            "unexpected loudness value: {}",
            other
        ))),
    }
}
