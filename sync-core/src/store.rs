//! The seam between the pure stores and the driver.
//!
//! A store never performs I/O. Applying an event returns [`Effect`]s that the
//! driver (convo-sync-client) carries out: sending a command, or telling
//! subscribers that a view changed.

use convo_sync_types::{Command, ServerEvent};
use serde::Serialize;

/// Which view a store maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreKind {
    /// The user's conversations
    Conversations,
    /// The observed conversations
    Watching,
    /// The open conversation and its messages
    Conversation,
}

/// Instruction produced by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send a command to the server.
    Send(Command),
    /// The store's view changed.
    Changed(StoreKind),
}

/// A store that reconciles server events into a view.
pub trait Synchronizer {
    /// Which view this store maintains.
    fn kind(&self) -> StoreKind;

    /// Apply one event. Total: events that do not concern the store are
    /// ignored and yield no effects.
    fn apply(&mut self, event: &ServerEvent) -> Vec<Effect>;

    /// Return to the empty, unloaded state and drop every in-flight flag.
    fn reset(&mut self);
}

/// `[Changed(kind)]` if `changed`, otherwise nothing.
pub(crate) fn changed(kind: StoreKind, changed: bool) -> Vec<Effect> {
    if changed {
        vec![Effect::Changed(kind)]
    } else {
        Vec::new()
    }
}
