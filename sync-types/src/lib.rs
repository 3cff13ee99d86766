//! # convo-sync-types
//!
//! Wire format types for the convo-sync chat protocol.
//!
//! This crate provides the foundational types used across all convo-sync crates:
//! - [`ConversationId`], [`MessageId`], [`ParticipantId`], [`Timestamp`] - Identity and ordering types
//! - [`Conversation`], [`Message`] - Entities held by the stores
//! - [`ServerEvent`] - Frames pushed by the server
//! - [`Command`], [`Login`] - Frames sent by the client
//! - [`SyncError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod commands;
mod entities;
mod error;
mod events;
mod ids;

pub use commands::{
    AuthInfo, Command, ConversationRef, JoinRequest, LoadMessagesRequest, LoadRequest, Login,
    MessageRef, MessageUpdateRequest, UpdateRequest,
};
pub use entities::{
    Conversation, ConversationData, ConversationPage, ConversationRecord, FileBody, Message,
    MessageBody, MessageKind, MessagePage, TextBody,
};
pub use error::SyncError;
pub use events::{
    ConnectionSnapshot, ConversationClosed, ConversationDeleted, ConversationSnapshot,
    ConversationUpdated, Envelope, Hello, LoadedConversations, LoadedMessages, MessageDeleted,
    MessageUpdated, NoPayload, Route, ServerEvent, WatchingSnapshot,
};
pub use ids::{ConversationId, MessageId, ParticipantId, Timestamp};
