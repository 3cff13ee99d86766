//! The duplex connection the client talks over.
//!
//! The chat server speaks JSON text frames over one long-lived connection,
//! a WebSocket in practice. [`Transport`] is that connection reduced to
//! what [`ChatClient`](crate::ChatClient) needs: open it, push a frame, pull
//! the next frame, close it. The end of the server's stream is reported as
//! [`TransportError::ConnectionClosed`] rather than as a frame, so the
//! client can tell "no more events" from a broken link.
//!
//! [`MockTransport`] implements it over an in-memory script of frames and
//! backs both the tests and the CLI's transcript replay.
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.queue_frame(r#"{"type":"hello"}"#);
//! transport.connect("ws://localhost:8080/ws").await?;
//! assert_eq!(transport.recv().await?, r#"{"type":"hello"}"#);
//! ```

mod mock;

pub use mock::MockTransport;

use async_trait::async_trait;
use thiserror::Error;

/// Why a transport call failed.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server could not be reached.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// The server ended the stream.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Connection timeout.
    #[error("connection timeout")]
    Timeout,
}

/// A connection carrying text frames in both directions.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to the server at `address`.
    async fn connect(&self, address: &str) -> Result<(), TransportError>;

    /// Send one text frame.
    async fn send(&self, frame: &str) -> Result<(), TransportError>;

    /// Receive one text frame.
    ///
    /// Waits until a frame is available; returns
    /// [`TransportError::ConnectionClosed`] once the peer has closed.
    async fn recv(&self) -> Result<String, TransportError>;

    /// Whether the connection is open.
    fn is_connected(&self) -> bool;

    /// Close the connection. Closing twice is not an error.
    async fn close(&self) -> Result<(), TransportError>;
}
