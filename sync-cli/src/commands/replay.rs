//! Replay a recorded server transcript through the engine.
//!
//! The transcript holds one server frame per line. Blank lines and lines
//! starting with `#` are skipped. Frames are fed to a [`ChatClient`] over a
//! [`MockTransport`]; the login frame is sent as soon as `hello` arrives.

use anyhow::{Context, Result};
use convo_sync_client::{ChatClient, MockTransport, SessionSnapshot};
use convo_sync_core::SessionState;
use std::path::Path;
use tracing::debug;

use crate::config;

/// Options for the replay command.
#[derive(Debug, Clone, Default)]
pub struct ReplayOptions<'a> {
    /// Log in as this user instead of the configured one.
    pub user: Option<&'a str>,
    /// Password sent in the login frame.
    pub password: &'a str,
    /// Print every frame the engine sent.
    pub show_commands: bool,
}

/// Run the replay command.
pub async fn run(data_dir: &Path, transcript: &Path, options: ReplayOptions<'_>) -> Result<()> {
    let contents = tokio::fs::read_to_string(transcript)
        .await
        .with_context(|| format!("Failed to read transcript {}", transcript.display()))?;

    let (snapshot, sent) = replay(data_dir, &contents, &options).await?;

    if options.show_commands {
        for frame in &sent {
            println!("> {frame}");
        }
    }
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    Ok(())
}

/// Feed `contents` through a client. Returns the last non-empty snapshot and
/// every frame the client sent.
async fn replay(
    data_dir: &Path,
    contents: &str,
    options: &ReplayOptions<'_>,
) -> Result<(SessionSnapshot, Vec<String>)> {
    let mut client_config = config::load_or_default(data_dir)?;
    if let Some(user) = options.user {
        client_config.user.name = user.to_string();
    }

    let transport = MockTransport::new();
    let frames = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'));
    let mut queued = 0;
    for frame in frames {
        transport.queue_frame(frame);
        queued += 1;
    }
    debug!(frames = queued, "transcript loaded");

    let client = ChatClient::new(client_config, transport.clone());
    client
        .connect()
        .await
        .context("Failed to open mock transport")?;

    let mut last = client.snapshot();
    while client.process_next().await? {
        if client.state() == SessionState::Connected {
            client.login(options.password).await?;
        }
        let snapshot = client.snapshot();
        if !snapshot.is_empty() {
            last = snapshot;
        }
    }

    Ok((last, transport.sent_frames()))
}
