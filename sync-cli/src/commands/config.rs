//! Print the effective configuration.

use anyhow::Result;
use std::path::Path;

use crate::config;

/// Run the config command.
pub fn run(data_dir: &Path) -> Result<()> {
    let path = config::config_path(data_dir);
    let client_config = config::load_or_default(data_dir)?;

    if path.exists() {
        println!("# {}", path.display());
    } else {
        println!("# {} (not written, showing defaults)", path.display());
    }
    print!("{}", client_config.to_toml()?);

    Ok(())
}
