use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use track_nebula::config::PipelineSettings;
use track_nebula::enricher::AudioFeaturesClient;
use track_nebula::{NebulaPipeline, StaticTokenProvider, TopTracksClient, TrackStub};

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a JSON file with the track stubs to analyze
    /// (array of {id, name, artists}). Mutually exclusive with --term.
    #[clap(long)]
    pub stubs_file: Option<PathBuf>,

    /// Fetch the listener's top tracks for this time range instead of
    /// reading a stubs file ("short_term", "medium_term", "long_term").
    #[clap(long)]
    pub term: Option<String>,

    /// Bearer token for the external APIs.
    #[clap(long)]
    pub token: String,

    /// Audio-features endpoint; the track id is appended as a path segment.
    #[clap(long, default_value = "https://track-analysis.p.rapidapi.com/pktx/spotify")]
    pub features_url: String,

    /// Top-tracks listing endpoint.
    #[clap(long, default_value = "https://api.spotify.com/v1/me/top/tracks")]
    pub top_tracks_url: String,

    /// Number of top tracks to fetch when --term is used.
    #[clap(long, default_value_t = 100)]
    pub track_limit: usize,

    /// Timeout in seconds for each feature request.
    #[clap(long, default_value_t = 10)]
    pub request_timeout_sec: u64,

    /// DBSCAN minimum-samples count (also the minimum usable track count).
    #[clap(long, default_value_t = 16)]
    pub min_samples: usize,

    /// RNG seed for the 3D projection.
    #[clap(long, default_value_t = 42)]
    pub seed: u64,

    /// Write the projected tracks to this file instead of stdout.
    #[clap(long)]
    pub output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let token_provider = Arc::new(StaticTokenProvider::new(&cli_args.token));

    let stubs: Vec<TrackStub> = match (&cli_args.stubs_file, &cli_args.term) {
        (Some(path), None) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Error reading stubs file {:?}", path))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Error parsing stubs file {:?}", path))?
        }
        (None, Some(term)) => {
            let client = TopTracksClient::new(
                cli_args.top_tracks_url.clone(),
                cli_args.request_timeout_sec,
                token_provider.clone(),
            )?;
            client.get_top_tracks(term, cli_args.track_limit).await?
        }
        _ => bail!("Provide exactly one of --stubs-file or --term"),
    };

    if stubs.is_empty() {
        bail!("No tracks to analyze");
    }
    info!("Analyzing {} tracks", stubs.len());

    let mut settings = PipelineSettings::default();
    settings.min_samples = cli_args.min_samples;
    settings.projection.seed = cli_args.seed;
    settings.enricher.request_timeout =
        std::time::Duration::from_secs(cli_args.request_timeout_sec);

    let source = Arc::new(AudioFeaturesClient::new(
        cli_args.features_url.clone(),
        cli_args.request_timeout_sec,
        token_provider,
    )?);

    let pipeline = NebulaPipeline::new(source, settings);
    let result = pipeline.run(&stubs).await?;

    if result.diagnostics.degraded_tuning {
        warn!("Radius tuning degraded to its fallback; clusters may be coarse");
    }
    for dropped in &result.diagnostics.dropped {
        warn!("Dropped '{}': {:?}", dropped.name, dropped.reason);
    }

    let json = serde_json::to_string_pretty(&result)?;
    match &cli_args.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Error writing output to {:?}", path))?;
            info!("Wrote {} projected tracks to {:?}", result.tracks.len(), path);
        }
        None => println!("{}", json),
    }

    Ok(())
}
