//! # convo-sync-core
//!
//! Pure logic for convo-sync (no I/O, instant tests).
//!
//! This crate reconciles the server's event stream against locally held
//! conversations and messages without any network I/O:
//! - [`Dispatcher`] - fan-out of decoded events to registered stores
//! - [`ConversationList`], [`ConversationDetail`], [`WatchList`] - the stores
//! - [`Paged`] - the page-merge rule the stores share
//! - [`MutationGuard`] - advisory in-flight flags for mutations
//! - [`MessageCursor`] - backward pagination of a timeline
//! - [`SessionState`] - the connection lifecycle
//!
//! ## Design Philosophy
//!
//! Every store is a plain value: `apply(event)` edits it and returns the
//! [`Effect`]s (commands to send, views that changed) for the caller to carry
//! out. The I/O lives in `convo-sync-client`, which interprets those effects.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod conversations;
pub mod cursor;
pub mod detail;
pub mod dispatcher;
pub mod guard;
pub mod mutation;
pub mod page;
pub mod state;
pub mod store;
pub mod watch;

#[cfg(test)]
mod testing;

pub use conversations::ConversationList;
pub use cursor::MessageCursor;
pub use detail::ConversationDetail;
pub use dispatcher::{Dispatcher, Subscription, SubscriptionId};
pub use guard::MutationGuard;
pub use page::{Keyed, Paged};
pub use state::{Action, Event, SessionEvent, SessionState};
pub use store::{Effect, StoreKind, Synchronizer};
pub use watch::{WatchList, BACKFILL_SIZE};
