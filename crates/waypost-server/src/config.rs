//! Server configuration, loaded from `config.toml` and `WAYPOST_*`
//! environment variables.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,

  /// OAuth client id tokens must be issued for.
  pub google_client_id: String,

  /// Absent key degrades geocoding: lookups fail as misconfigured,
  /// autocomplete returns nothing.
  pub locationiq_api_key: Option<String>,

  pub cloudinary_cloud_name:    String,
  pub cloudinary_upload_preset: String,
}
