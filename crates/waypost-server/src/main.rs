//! Waypost server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens an
//! in-process SQLite store, wires up the external collaborators
//! (Google tokeninfo, LocationIQ, Cloudinary) and serves the JSON API
//! over HTTP.

mod cloudinary;
mod config;
mod google;
mod locationiq;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use waypost_api::AppState;
use waypost_store_sqlite::SqliteStore;

use crate::{
  cloudinary::CloudinaryHost, config::ServerConfig, google::GoogleVerifier,
  locationiq::LocationIqGeocoder,
};

const GEOCODING_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(author, version, about = "Waypost API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = ::config::Config::builder()
    .add_source(::config::File::from(cli.config).required(false))
    .add_source(::config::Environment::with_prefix("WAYPOST"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // External collaborators.
  let http = reqwest::Client::builder()
    .user_agent(concat!("waypost/", env!("CARGO_PKG_VERSION")))
    .build()
    .context("failed to build HTTP client")?;
  let geocoding_http = reqwest::Client::builder()
    .user_agent(concat!("waypost/", env!("CARGO_PKG_VERSION")))
    .timeout(GEOCODING_TIMEOUT)
    .build()
    .context("failed to build geocoding HTTP client")?;

  if server_cfg.locationiq_api_key.is_none() {
    tracing::warn!("no locationiq_api_key configured; geocoding is degraded");
  }

  let state = AppState {
    store:    Arc::new(store),
    verifier: Arc::new(GoogleVerifier::new(
      http.clone(),
      server_cfg.google_client_id.clone(),
    )),
    geocoder: Arc::new(LocationIqGeocoder::new(
      geocoding_http,
      server_cfg.locationiq_api_key.clone(),
    )),
    images:   Arc::new(CloudinaryHost::new(
      http,
      &server_cfg.cloudinary_cloud_name,
      server_cfg.cloudinary_upload_preset.clone(),
    )),
  };

  let app = waypost_api::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
