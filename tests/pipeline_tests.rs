//! End-to-end pipeline tests with a scripted feature source.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use track_nebula::config::{EnricherSettings, PipelineSettings, ProjectionSettings, TuningSettings};
use track_nebula::enricher::EnrichmentError;
use track_nebula::pipeline::{DropReason, PipelineError};
use track_nebula::{
    AudioFeatures, AudioFeaturesSource, NebulaPipeline, TrackStub,
};

/// Deterministic in-memory feature source. Tracks are scripted either to
/// succeed with a response derived from one of four latent profiles, or to
/// fail with a fetch or parse error.
struct ScriptedSource {
    responses: HashMap<String, Result<AudioFeatures, &'static str>>,
}

impl ScriptedSource {
    fn new(stubs: &[TrackStub], failing: &[usize]) -> Self {
        let profiles = [
            // acoustic, dance, energy, instrumental, loudness, tempo, speech
            [0.9, 0.2, 0.2, 0.8, -18.0, 80.0, 0.03],
            [0.1, 0.9, 0.8, 0.0, -5.0, 125.0, 0.05],
            [0.2, 0.4, 0.95, 0.1, -4.0, 170.0, 0.08],
            [0.5, 0.6, 0.5, 0.3, -10.0, 100.0, 0.35],
        ];

        let mut responses = HashMap::new();
        for (index, stub) in stubs.iter().enumerate() {
            if failing.contains(&index) {
                // Alternate failure kinds across the scripted set.
                let error = if index % 2 == 0 { "fetch" } else { "parse" };
                responses.insert(stub.id.clone(), Err(error));
                continue;
            }
            let profile = profiles[index % profiles.len()];
            // Small index-dependent jitter keeps rows distinct while staying
            // within the profile's neighborhood.
            let jitter = (index as f64 * 0.61).sin() * 0.02;
            responses.insert(
                stub.id.clone(),
                Ok(AudioFeatures {
                    acousticness: profile[0] + jitter,
                    danceability: profile[1] - jitter,
                    energy: profile[2] + jitter,
                    instrumentalness: profile[3] + jitter,
                    loudness: profile[4] + jitter * 10.0,
                    tempo: profile[5] + jitter * 20.0,
                    speechiness: profile[6] + jitter,
                }),
            );
        }
        Self { responses }
    }
}

#[async_trait]
impl AudioFeaturesSource for ScriptedSource {
    async fn fetch_features(&self, track: &TrackStub) -> Result<AudioFeatures, EnrichmentError> {
        match self.responses.get(&track.id) {
            Some(Ok(features)) => Ok(features.clone()),
            Some(Err("fetch")) => Err(EnrichmentError::Fetch("scripted outage".to_string())),
            Some(Err(_)) => Err(EnrichmentError::Parse("scripted bad field".to_string())),
            None => Err(EnrichmentError::Fetch("unknown track".to_string())),
        }
    }
}

fn make_stubs(count: usize) -> Vec<TrackStub> {
    (0..count)
        .map(|i| TrackStub {
            id: format!("track-{:03}", i),
            name: format!("Track {:03}", i),
            artists: vec![format!("Artist {}", i % 7)],
        })
        .collect()
}

fn fast_settings(min_samples: usize) -> PipelineSettings {
    PipelineSettings {
        enricher: EnricherSettings {
            max_requests_per_window: 1000,
            window: Duration::from_secs(1),
            stagger: Duration::ZERO,
            request_timeout: Duration::from_secs(5),
        },
        tuning: TuningSettings::default(),
        projection: ProjectionSettings {
            iterations: 300,
            ..Default::default()
        },
        min_samples,
    }
}

#[tokio::test]
async fn test_partial_failures_produce_survivor_records() {
    let stubs = make_stubs(100);
    let failing: Vec<usize> = (0..20).map(|i| i * 5).collect();
    let source = Arc::new(ScriptedSource::new(&stubs, &failing));

    let pipeline = NebulaPipeline::new(source, fast_settings(5));
    let result = pipeline.run(&stubs).await.unwrap();

    assert_eq!(result.tracks.len(), 80);
    assert_eq!(result.diagnostics.dropped.len(), 20);

    for track in &result.tracks {
        assert!(track.cluster >= -1);
        assert!(track.x.is_finite() && track.y.is_finite() && track.z.is_finite());
    }

    // Survivor order matches input order.
    let expected_names: Vec<String> = stubs
        .iter()
        .enumerate()
        .filter(|(i, _)| !failing.contains(i))
        .map(|(_, s)| s.name.clone())
        .collect();
    let actual_names: Vec<String> = result.tracks.iter().map(|t| t.name.clone()).collect();
    assert_eq!(actual_names, expected_names);
}

#[tokio::test]
async fn test_drop_reasons_are_tagged() {
    let stubs = make_stubs(40);
    let failing = vec![2usize, 3];
    let source = Arc::new(ScriptedSource::new(&stubs, &failing));

    let pipeline = NebulaPipeline::new(source, fast_settings(5));
    let result = pipeline.run(&stubs).await.unwrap();

    assert_eq!(result.diagnostics.dropped.len(), 2);
    assert!(matches!(
        result.diagnostics.dropped[0].reason,
        DropReason::Fetch(_)
    ));
    assert!(matches!(
        result.diagnostics.dropped[1].reason,
        DropReason::Parse(_)
    ));
    assert_eq!(result.diagnostics.dropped[0].name, "Track 002");
    assert_eq!(result.diagnostics.dropped[1].name, "Track 003");
}

#[tokio::test]
async fn test_all_failures_is_insufficient_data() {
    let stubs = make_stubs(100);
    let failing: Vec<usize> = (0..100).collect();
    let source = Arc::new(ScriptedSource::new(&stubs, &failing));

    let pipeline = NebulaPipeline::new(source, fast_settings(5));
    let error = pipeline.run(&stubs).await.unwrap_err();

    match error {
        PipelineError::InsufficientData(details) => {
            assert_eq!(details.survivors, 0);
            assert_eq!(details.required, 5);
        }
    }
}

#[tokio::test]
async fn test_too_few_survivors_is_insufficient_data() {
    let stubs = make_stubs(10);
    let failing: Vec<usize> = (3..10).collect();
    let source = Arc::new(ScriptedSource::new(&stubs, &failing));

    let pipeline = NebulaPipeline::new(source, fast_settings(5));
    let error = pipeline.run(&stubs).await.unwrap_err();

    match error {
        PipelineError::InsufficientData(details) => {
            assert_eq!(details.survivors, 3);
            assert_eq!(details.required, 5);
        }
    }
}

#[tokio::test]
async fn test_identical_runs_are_reproducible() {
    let stubs = make_stubs(60);
    let failing = vec![7usize, 20];

    let mut results = Vec::new();
    for _ in 0..2 {
        let source = Arc::new(ScriptedSource::new(&stubs, &failing));
        let pipeline = NebulaPipeline::new(source, fast_settings(5));
        results.push(pipeline.run(&stubs).await.unwrap());
    }

    let first = &results[0];
    let second = &results[1];
    assert_eq!(first.tracks.len(), second.tracks.len());
    for (a, b) in first.tracks.iter().zip(&second.tracks) {
        assert_eq!(a.cluster, b.cluster);
        assert_eq!((a.x, a.y, a.z), (b.x, b.y, b.z));
    }
}
