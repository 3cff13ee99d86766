//! Client configuration.
//!
//! Configuration is loaded from a TOML file (the CLI keeps it in
//! `client.toml`). Every field has a default, so an empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration for a [`ChatClient`](crate::ChatClient).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server connection.
    #[serde(default)]
    pub server: ServerConfig,
    /// Identity used at login.
    #[serde(default)]
    pub user: UserConfig,
    /// Page sizes for every paginated request.
    #[serde(default)]
    pub paging: PagingConfig,
}

/// Server connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// WebSocket URL of the chat server (default: ws://localhost:8080/ws).
    #[serde(default = "default_address")]
    pub address: String,
}

/// Identity used at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    /// User name; doubles as the participant id (default: anonymous).
    #[serde(default = "default_user_name")]
    pub name: String,
}

/// Page sizes.
///
/// The defaults match what the reference web client requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingConfig {
    /// `load` size for the conversation list (default: 1).
    #[serde(default = "default_page_size")]
    pub conversations_page_size: usize,
    /// `load` size for the watch list (default: 1).
    #[serde(default = "default_page_size")]
    pub watching_page_size: usize,
    /// `load-messages` size (default: 1).
    #[serde(default = "default_page_size")]
    pub messages_page_size: usize,
    /// `messagesSize` sent with `join` (default: 5).
    #[serde(default = "default_join_messages_size")]
    pub join_messages_size: usize,
    /// `conversationsSize` sent with the login frame (default: 0).
    #[serde(default)]
    pub login_conversations_size: usize,
}

fn default_address() -> String {
    "ws://localhost:8080/ws".to_string()
}

fn default_user_name() -> String {
    "anonymous".to_string()
}

fn default_page_size() -> usize {
    1
}

fn default_join_messages_size() -> usize {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            name: default_user_name(),
        }
    }
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            conversations_page_size: default_page_size(),
            watching_page_size: default_page_size(),
            messages_page_size: default_page_size(),
            join_messages_size: default_join_messages_size(),
            login_conversations_size: 0,
        }
    }
}

impl ClientConfig {
    /// Default configuration for `user`.
    pub fn for_user(user: impl Into<String>) -> Self {
        Self {
            user: UserConfig { name: user.into() },
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeError)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Failed to render configuration.
    #[error("failed to serialize config: {0}")]
    SerializeError(#[source] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_matches_web_client() {
        let config = ClientConfig::default();
        assert_eq!(config.user.name, "anonymous");
        assert_eq!(config.paging.conversations_page_size, 1);
        assert_eq!(config.paging.watching_page_size, 1);
        assert_eq!(config.paging.messages_page_size, 1);
        assert_eq!(config.paging.join_messages_size, 5);
        assert_eq!(config.paging.login_conversations_size, 0);
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[server]
address = "wss://chat.example/ws"

[user]
name = "alice"

[paging]
conversations_page_size = 20
join_messages_size = 50
"#;

        let config: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.address, "wss://chat.example/ws");
        assert_eq!(config.user.name, "alice");
        assert_eq!(config.paging.conversations_page_size, 20);
        assert_eq!(config.paging.join_messages_size, 50);
        assert_eq!(config.paging.messages_page_size, 1);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn toml_output_reads_back() {
        let config = ClientConfig::for_user("bob");
        let text = config.to_toml().unwrap();
        assert!(text.contains("name = \"bob\""));
        assert_eq!(toml::from_str::<ClientConfig>(&text).unwrap(), config);
    }

    #[test]
    fn from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("client.toml");

        let err = ClientConfig::from_file(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { ref path, .. } if path == &missing));

        let mut file = std::fs::File::create(&missing).unwrap();
        writeln!(file, "[paging]\nmessages_page_size = \"many\"").unwrap();
        let err = ClientConfig::from_file(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("client.toml"));
    }
}
