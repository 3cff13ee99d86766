//! # convo-sync-client
//!
//! Client driver for convo-sync.
//!
//! This is the crate applications use: it owns the connection, decodes
//! server frames, feeds them to the stores from `convo-sync-core` and sends
//! the commands they produce.
//!
//! ## Features
//!
//! - **Transport Abstraction**: Pluggable text-frame transport (mock included)
//! - **Pure Stores**: All reconciliation happens in `convo-sync-core`
//! - **Observable**: Every change is published as a [`SessionSnapshot`]
//! - **TOML Configuration**: [`ClientConfig`] with defaults for every field
//!
//! ## Example
//!
//! ```ignore
//! use convo_sync_client::{ChatClient, ClientConfig, MockTransport};
//!
//! let client = ChatClient::new(ClientConfig::for_user("alice"), MockTransport::new());
//! client.connect().await?;
//! client.process_next().await?;
//! client.login("secret").await?;
//!
//! let mut updates = client.subscribe();
//! client.run().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod transport;

pub use client::{ChatClient, ClientError, DetailView, ListView, SessionSnapshot};
pub use config::{ClientConfig, ConfigError, PagingConfig, ServerConfig, UserConfig};
pub use transport::{MockTransport, Transport, TransportError};
