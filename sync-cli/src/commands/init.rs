//! Write a default client configuration.

use anyhow::Result;
use convo_sync_client::ClientConfig;
use std::path::Path;

use crate::config;

/// Run the init command.
pub async fn run(data_dir: &Path, user: Option<&str>) -> Result<()> {
    // Check if already initialized
    if config::exists(data_dir) {
        anyhow::bail!(
            "Client already initialized. Delete {} to reinitialize.",
            config::config_path(data_dir).display()
        );
    }

    let client_config = match user {
        Some(user) => ClientConfig::for_user(user),
        None => ClientConfig::default(),
    };
    let path = config::save(&client_config, data_dir).await?;

    println!("Client initialized successfully!");
    println!();
    println!("  User:     {}", client_config.user.name);
    println!("  Server:   {}", client_config.server.address);
    println!("  Config:   {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. Review the settings: convo-sync config");
    println!("  2. Replay a server transcript: convo-sync replay <file>");

    Ok(())
}
