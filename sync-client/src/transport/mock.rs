//! Scripted in-memory transport.
//!
//! A [`MockTransport`] plays the server side of a session from a script of
//! frames: `recv()` hands them out in order and reports
//! [`TransportError::ConnectionClosed`] once the script runs dry, which is how
//! a transcript replay ends. Every frame the client sends is recorded.
//!
//! Clones share one script, so a test can keep a handle while the client
//! owns another.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Transport that replays queued server frames.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    script: Arc<Mutex<Script>>,
}

#[derive(Debug, Default)]
struct Script {
    open: bool,
    address: Option<String>,
    inbound: VecDeque<String>,
    outbound: Vec<String>,
    faults: Faults,
}

/// One-shot failures, consumed by the next matching call.
#[derive(Debug, Default)]
struct Faults {
    connect: Option<String>,
    send: Option<String>,
    recv: Option<String>,
}

impl MockTransport {
    /// An empty, closed transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a server frame to the script.
    pub fn queue_frame(&self, frame: impl Into<String>) {
        self.script().inbound.push_back(frame.into());
    }

    /// Server frames not yet received.
    pub fn pending_frames(&self) -> usize {
        self.script().inbound.len()
    }

    /// Every frame the client sent, oldest first.
    pub fn sent_frames(&self) -> Vec<String> {
        self.script().outbound.clone()
    }

    /// Most recent frame the client sent.
    pub fn last_sent(&self) -> Option<String> {
        self.script().outbound.last().cloned()
    }

    /// Address of the last successful `connect`.
    pub fn connected_address(&self) -> Option<String> {
        self.script().address.clone()
    }

    /// Fail the next `connect` with `reason`.
    pub fn fail_next_connect(&self, reason: &str) {
        self.script().faults.connect = Some(reason.to_string());
    }

    /// Fail the next `send` with `reason`.
    pub fn fail_next_send(&self, reason: &str) {
        self.script().faults.send = Some(reason.to_string());
    }

    /// Fail the next `recv` with `reason`.
    pub fn fail_next_recv(&self, reason: &str) {
        self.script().faults.recv = Some(reason.to_string());
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, address: &str) -> Result<(), TransportError> {
        let mut script = self.script();
        if let Some(reason) = script.faults.connect.take() {
            return Err(TransportError::ConnectionFailed(reason));
        }
        script.open = true;
        script.address = Some(address.to_string());
        Ok(())
    }

    async fn send(&self, frame: &str) -> Result<(), TransportError> {
        let mut script = self.script();
        if !script.open {
            return Err(TransportError::NotConnected);
        }
        if let Some(reason) = script.faults.send.take() {
            return Err(TransportError::SendFailed(reason));
        }
        script.outbound.push(frame.to_string());
        Ok(())
    }

    async fn recv(&self) -> Result<String, TransportError> {
        let mut script = self.script();
        if !script.open {
            return Err(TransportError::NotConnected);
        }
        if let Some(reason) = script.faults.recv.take() {
            return Err(TransportError::ReceiveFailed(reason));
        }
        script
            .inbound
            .pop_front()
            .ok_or(TransportError::ConnectionClosed)
    }

    fn is_connected(&self) -> bool {
        self.script().open
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.script().open = false;
        Ok(())
    }
}
