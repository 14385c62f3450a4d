// Config file resolution for the meshlink CLI
//
// Default location:
// - macOS: ~/Library/Application Support/meshlink/config.json
// - Linux: ~/.config/meshlink/config.json
// - Windows: %APPDATA%\meshlink\config.json

use anyhow::{Context, Result};
use meshlink_core::AdapterConfig;
use std::path::{Path, PathBuf};

/// `--config` if given, otherwise the platform default.
pub fn config_file(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let dir = dirs::config_dir()
        .context("Failed to determine config directory")?
        .join("meshlink");
    Ok(dir.join("config.json"))
}

/// Load the file (defaults when it does not exist), then apply environment
/// overrides.
pub fn load(path: &Path) -> Result<AdapterConfig> {
    let mut config = AdapterConfig::load_or_default(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    config.apply_env();
    Ok(config)
}
