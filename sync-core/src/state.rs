//! Session state machine for convo-sync.
//!
//! This module provides a pure, side-effect-free state machine for the
//! connection lifecycle. The state machine takes events as input and produces
//! a new state plus a list of actions to execute.
//!
//! The actual I/O (opening the socket, sending the login frame) is performed
//! by convo-sync-client, not by this module. Any loss of the connection
//! yields [`Action::ResetStores`] so no stale view survives a reconnect.

use convo_sync_types::{AuthInfo, ParticipantId};

/// Session state machine - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No connection.
    Disconnected,
    /// Connection attempt in progress.
    Connecting,
    /// Transport open, waiting for the server's `hello`.
    AwaitingHello,
    /// `hello` received, login may be sent.
    Connected,
    /// Login sent; the server streams this user's view.
    Authenticated {
        /// Logged-in user.
        user: ParticipantId,
    },
}

impl SessionState {
    /// Create a new state machine in the Disconnected state.
    pub fn new() -> Self {
        Self::Disconnected
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (convo-sync-client)
    /// is responsible for executing the returned actions.
    pub fn on_event(self, event: Event) -> (Self, Vec<Action>) {
        match (self, event) {
            // From Disconnected
            (Self::Disconnected, Event::ConnectRequested) => {
                (Self::Connecting, vec![Action::Connect])
            }

            // Handshake
            (Self::Connecting, Event::TransportOpened) => (Self::AwaitingHello, vec![]),
            (Self::AwaitingHello, Event::HelloReceived) => {
                (Self::Connected, vec![Action::Emit(SessionEvent::Ready)])
            }
            (Self::Connected, Event::LoginSent { auth }) => {
                let user = ParticipantId::from(auth.name.as_str());
                (
                    Self::Authenticated { user: user.clone() },
                    vec![
                        Action::SendLogin { auth },
                        Action::Emit(SessionEvent::LoggedIn { user }),
                    ],
                )
            }

            // Connection lost
            (state, Event::TransportClosed { reason }) if state != Self::Disconnected => (
                Self::Disconnected,
                vec![
                    Action::ResetStores,
                    Action::Emit(SessionEvent::Closed { reason }),
                ],
            ),
            (state, Event::DisconnectRequested) if state != Self::Disconnected => (
                Self::Disconnected,
                vec![
                    Action::Disconnect,
                    Action::ResetStores,
                    Action::Emit(SessionEvent::Closed {
                        reason: "user requested".into(),
                    }),
                ],
            ),

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Check if the login has been sent.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    /// Check if the transport is open (hello or later).
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            Self::AwaitingHello | Self::Connected | Self::Authenticated { .. }
        )
    }

    /// The logged-in user, if any.
    pub fn user(&self) -> Option<&ParticipantId> {
        match self {
            Self::Authenticated { user } => Some(user),
            _ => None,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Events that can occur in the session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Caller asked to connect.
    ConnectRequested,
    /// Transport connection succeeded.
    TransportOpened,
    /// Server sent `hello`.
    HelloReceived,
    /// Caller logged in.
    LoginSent {
        /// Credentials for the login frame.
        auth: AuthInfo,
    },
    /// Transport closed by the peer or failed.
    TransportClosed {
        /// Reason for disconnection.
        reason: String,
    },
    /// Caller asked to disconnect.
    DisconnectRequested,
}

/// Actions to be executed by convo-sync-client.
///
/// These are instructions, not side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Open the transport.
    Connect,
    /// Close the transport.
    Disconnect,
    /// Send the login frame.
    SendLogin {
        /// Credentials to send.
        auth: AuthInfo,
    },
    /// Reset every store to empty and drop its subscription.
    ResetStores,
    /// Emit an event to the application.
    Emit(SessionEvent),
}

/// Events emitted to the application layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Server greeted us; login may proceed.
    Ready,
    /// Login sent.
    LoggedIn {
        /// Logged-in user.
        user: ParticipantId,
    },
    /// Session ended.
    Closed {
        /// Reason for disconnection.
        reason: String,
    },
}
