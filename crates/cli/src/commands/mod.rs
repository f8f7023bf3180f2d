pub mod ask;
pub mod check;
pub mod config_cmd;
pub mod ingest;
pub mod onboard;
pub mod serve;

use pokerag_config::AppConfig;
use std::path::Path;

/// Load config from `--config` or the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load_with(path).map_err(|e| format!("Failed to load config: {e}").into())
}
