//! Configuration file management for convo-sync.

use anyhow::{Context, Result};
use convo_sync_client::ClientConfig;
use std::path::{Path, PathBuf};

/// File name of the client configuration inside the data directory.
pub const CONFIG_FILE: &str = "client.toml";

/// Path of the configuration file in `data_dir`.
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

/// Check if a configuration has been written.
pub fn exists(data_dir: &Path) -> bool {
    config_path(data_dir).exists()
}

/// Load the configuration, falling back to defaults when none was written.
pub fn load_or_default(data_dir: &Path) -> Result<ClientConfig> {
    let path = config_path(data_dir);
    if !path.exists() {
        return Ok(ClientConfig::default());
    }
    ClientConfig::from_file(&path).context("Invalid client configuration")
}

/// Save the configuration to `data_dir`.
pub async fn save(config: &ClientConfig, data_dir: &Path) -> Result<PathBuf> {
    let path = config_path(data_dir);
    let contents = config.to_toml()?;
    tokio::fs::write(&path, contents)
        .await
        .context("Failed to save client configuration")?;
    Ok(path)
}
