//! ChatClient - the driver that connects the stores to a transport.
//!
//! # Architecture
//!
//! ChatClient decodes inbound frames, feeds them to the pure stores from
//! convo-sync-core through a [`Dispatcher`], and carries out the effects
//! the stores return. The session lifecycle is the pure [`SessionState`]
//! machine; the client interprets its actions.
//!
//! ```text
//! Transport → ChatClient → Dispatcher → stores (convo-sync-core)
//!                 ↑                          │
//!                 └──── commands, changes ───┘
//! ```
//!
//! Every change is published as a [`SessionSnapshot`] on a
//! `tokio::sync::watch` channel.
//!
//! # Example
//!
//! ```ignore
//! let client = ChatClient::new(ClientConfig::for_user("alice"), transport);
//! client.connect().await?;
//! client.process_next().await?; // hello
//! client.login("secret").await?;
//! client.run().await?;
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use convo_sync_core::{
    Action, ConversationDetail, ConversationList, Dispatcher, Effect, Event, SessionEvent,
    SessionState, Subscription, Synchronizer, WatchList,
};
use convo_sync_types::{
    AuthInfo, Command, Conversation, ConversationId, ConversationRef, FileBody, JoinRequest, Login,
    Message, MessageBody, MessageId, MessageRef, MessageUpdateRequest, ParticipantId, ServerEvent,
    SyncError, UpdateRequest,
};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::transport::{Transport, TransportError};

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame encoding error.
    #[error("protocol error: {0}")]
    Protocol(#[from] SyncError),

    /// No open connection.
    #[error("not connected")]
    NotConnected,

    /// Connected, but the login frame has not been sent.
    #[error("not logged in")]
    NotAuthenticated,
}

/// A conversation list as seen by the application.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListView {
    /// Held conversations, in list order.
    pub conversations: Vec<Arc<Conversation>>,
    /// Server-reported total, `None` until loaded.
    pub total: Option<usize>,
    /// Whether another page can be requested.
    pub has_more: bool,
}

/// The open conversation as seen by the application.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailView {
    /// Header, `None` after a reset.
    pub conversation: Option<Arc<Conversation>>,
    /// Timeline, oldest first.
    pub messages: Vec<Arc<Message>>,
    /// Server-reported message total.
    pub total: Option<usize>,
    /// Whether older messages remain.
    pub has_more: bool,
}

/// Everything the application renders, published after each change.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Whether the transport is open.
    pub connected: bool,
    /// Logged-in user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<ParticipantId>,
    /// The user's conversations, if a `connection` snapshot arrived.
    pub conversations: Option<ListView>,
    /// The watch list, if a `watching` snapshot arrived.
    pub watching: Option<ListView>,
    /// The open conversation, if a `conversation` snapshot arrived.
    pub conversation: Option<DetailView>,
}

impl SessionSnapshot {
    /// Whether no store is mounted.
    pub fn is_empty(&self) -> bool {
        self.conversations.is_none() && self.watching.is_none() && self.conversation.is_none()
    }
}

type Outbox = Arc<Mutex<Vec<Effect>>>;

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A store registered with the dispatcher.
///
/// Dropping it unregisters the store's callback.
struct Mounted<S> {
    store: Arc<Mutex<S>>,
    _subscription: Subscription<ServerEvent>,
}

impl<S: Synchronizer + Send + 'static> Mounted<S> {
    fn register(store: S, dispatcher: &Dispatcher<ServerEvent>, outbox: &Outbox) -> Self {
        let store = Arc::new(Mutex::new(store));
        let target = Arc::clone(&store);
        let outbox = Arc::clone(outbox);
        let subscription = dispatcher.register(move |event: &ServerEvent| {
            let effects = lock(&target).apply(event);
            lock(&outbox).extend(effects);
        });
        Self {
            store,
            _subscription: subscription,
        }
    }

    fn read(&self) -> MutexGuard<'_, S> {
        lock(&self.store)
    }

    fn unmount(self) {
        lock(&self.store).reset();
    }
}

#[derive(Default)]
struct Stores {
    conversations: Option<Mounted<ConversationList>>,
    watching: Option<Mounted<WatchList>>,
    conversation: Option<Mounted<ConversationDetail>>,
}

/// The chat client.
///
/// Owns the session state, the dispatcher and the mounted stores. Locks are
/// only held for synchronous store access, never across an `.await`.
pub struct ChatClient<T: Transport> {
    config: ClientConfig,
    transport: T,
    dispatcher: Dispatcher<ServerEvent>,
    outbox: Outbox,
    stores: Mutex<Stores>,
    state: Mutex<SessionState>,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl<T: Transport> ChatClient<T> {
    /// Create a new ChatClient.
    pub fn new(config: ClientConfig, transport: T) -> Self {
        let (snapshot, _) = watch::channel(SessionSnapshot::default());
        Self {
            config,
            transport,
            dispatcher: Dispatcher::new(),
            outbox: Arc::default(),
            stores: Mutex::default(),
            state: Mutex::default(),
            snapshot,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        lock(&self.state).clone()
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receive every snapshot published from now on.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Open the transport to the configured server.
    ///
    /// The server answers with `hello`; call [`ChatClient::process_next`] to
    /// receive it before logging in.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let actions = self.transition(Event::ConnectRequested);
        if actions.is_empty() {
            debug!("connect ignored, session already active");
            return Ok(());
        }

        if let Err(e) = self.perform(actions).await {
            self.closed(e.to_string()).await;
            return Err(e);
        }

        let actions = self.transition(Event::TransportOpened);
        self.perform(actions).await?;
        self.publish();
        Ok(())
    }

    /// Send the login frame for the configured user.
    pub async fn login(&self, password: &str) -> Result<(), ClientError> {
        if !matches!(self.state(), SessionState::Connected) {
            return Err(ClientError::NotConnected);
        }

        let auth = AuthInfo {
            name: self.config.user.name.clone(),
            password: password.to_string(),
        };
        let actions = self.transition(Event::LoginSent { auth });
        self.perform(actions).await?;
        self.publish();
        Ok(())
    }

    /// Close the connection and drop every store.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        let actions = self.transition(Event::DisconnectRequested);
        let result = self.perform(actions).await;
        self.publish();
        result
    }

    /// Receive and apply one frame.
    ///
    /// Returns `Ok(false)` once the server has closed the connection.
    pub async fn process_next(&self) -> Result<bool, ClientError> {
        let open = lock(&self.state).is_open();
        if !open {
            return Err(ClientError::NotConnected);
        }

        let frame = match self.transport.recv().await {
            Ok(frame) => frame,
            Err(TransportError::ConnectionClosed) => {
                self.closed("connection closed".to_string()).await;
                return Ok(false);
            }
            Err(e) => {
                self.closed(e.to_string()).await;
                return Err(e.into());
            }
        };

        match ServerEvent::from_json(&frame) {
            Ok(event) => self.handle(event).await?,
            Err(e) => warn!(error = %e, "skipping undecodable frame"),
        }
        Ok(true)
    }

    /// Apply frames until the connection closes.
    pub async fn run(&self) -> Result<(), ClientError> {
        while self.process_next().await? {}
        Ok(())
    }

    // =========================================================================
    // Conversation list
    // =========================================================================

    /// Request the next page of the conversation list.
    pub async fn load_more_conversations(&self) -> Result<bool, ClientError> {
        self.require_login()?;
        let command = {
            let stores = lock(&self.stores);
            stores
                .conversations
                .as_ref()
                .map(|mounted| mounted.read().request_page())
        };
        self.send_if_any(command, "no conversation list").await
    }

    /// Switch to the watch list.
    ///
    /// The conversation list is dropped before `watch` is sent.
    pub async fn watch(&self) -> Result<(), ClientError> {
        self.require_login()?;
        let dropped = lock(&self.stores).conversations.take();
        if let Some(mounted) = dropped {
            mounted.unmount();
            self.publish();
        }
        self.send(&Command::Watch).await
    }

    /// Open conversation `id`.
    ///
    /// Returns `false` if a join for `id` is already in flight.
    pub async fn join(&self, id: &ConversationId) -> Result<bool, ClientError> {
        self.require_login()?;
        let size = self.config.paging.join_messages_size;
        let command = self.guarded(id, |list| list.join(id, size), || {
            Command::Join(JoinRequest {
                conversation_id: Some(id.clone()),
                title: None,
                messages_size: size,
                participants: None,
            })
        });
        self.send_if_any(command, "join already in flight").await
    }

    /// Create a conversation. The server answers with its `conversation`
    /// snapshot.
    pub async fn create(
        &self,
        title: Option<String>,
        participants: Vec<ParticipantId>,
    ) -> Result<(), ClientError> {
        self.require_login()?;
        self.send(&Command::Join(JoinRequest {
            conversation_id: None,
            title,
            messages_size: self.config.paging.join_messages_size,
            participants: Some(participants),
        }))
        .await
    }

    /// Change the title or participants of `id`.
    pub async fn update(
        &self,
        id: &ConversationId,
        title: Option<String>,
        participants: Option<Vec<ParticipantId>>,
    ) -> Result<bool, ClientError> {
        self.require_login()?;
        let fallback = (title.clone(), participants.clone());
        let command = self.guarded(
            id,
            |list| list.update(id, title, participants),
            || {
                Command::Update(UpdateRequest {
                    conversation_id: id.clone(),
                    title: fallback.0,
                    participants: fallback.1,
                })
            },
        );
        self.send_if_any(command, "mutation already in flight").await
    }

    /// Close conversation `id`.
    pub async fn close(&self, id: &ConversationId) -> Result<bool, ClientError> {
        self.require_login()?;
        let command = self.guarded(id, |list| list.close(id), || {
            Command::Close(ConversationRef {
                conversation_id: id.clone(),
            })
        });
        self.send_if_any(command, "mutation already in flight").await
    }

    /// Delete conversation `id`.
    pub async fn delete(&self, id: &ConversationId) -> Result<bool, ClientError> {
        self.require_login()?;
        let command = self.guarded(id, |list| list.delete(id), || {
            Command::Delete(ConversationRef {
                conversation_id: id.clone(),
            })
        });
        self.send_if_any(command, "mutation already in flight").await
    }

    // =========================================================================
    // Watch list
    // =========================================================================

    /// Request the next page of the watch list.
    pub async fn load_more_watching(&self) -> Result<bool, ClientError> {
        self.require_login()?;
        let command = {
            let stores = lock(&self.stores);
            stores
                .watching
                .as_ref()
                .map(|mounted| mounted.read().request_page())
        };
        self.send_if_any(command, "no watch list").await
    }

    // =========================================================================
    // Open conversation
    // =========================================================================

    /// Request the next page of older messages.
    pub async fn load_more_messages(&self) -> Result<bool, ClientError> {
        self.require_login()?;
        let command = self.with_detail(|detail| Some(detail.request_page()));
        self.send_if_any(command, "no open conversation").await
    }

    /// Send a text message to the open conversation.
    pub async fn send_text(&self, text: &str) -> Result<bool, ClientError> {
        self.require_login()?;
        let command = self.with_detail(|detail| Some(detail.send_text(text)));
        self.send_if_any(command, "no open conversation").await
    }

    /// Send a file message to the open conversation.
    pub async fn send_file(&self, file: FileBody) -> Result<bool, ClientError> {
        self.require_login()?;
        let command = self.with_detail(|detail| Some(detail.send_file(file)));
        self.send_if_any(command, "no open conversation").await
    }

    /// Edit message `id`.
    ///
    /// Returns `false` if a mutation of the held message is already in flight.
    pub async fn message_update(
        &self,
        id: &MessageId,
        body: MessageBody,
    ) -> Result<bool, ClientError> {
        self.require_login()?;
        let command = self
            .with_detail(|detail| {
                if detail.message(id).is_some() {
                    Some(detail.message_update(id, body.clone()))
                } else {
                    None
                }
            })
            .unwrap_or_else(|| {
                Some(Command::MessageUpdate(MessageUpdateRequest {
                    message_id: id.clone(),
                    body,
                }))
            });
        self.send_if_any(command, "message mutation already in flight")
            .await
    }

    /// Delete message `id`.
    pub async fn message_delete(&self, id: &MessageId) -> Result<bool, ClientError> {
        self.require_login()?;
        let command = self
            .with_detail(|detail| {
                if detail.message(id).is_some() {
                    Some(detail.message_delete(id))
                } else {
                    None
                }
            })
            .unwrap_or_else(|| {
                Some(Command::MessageDelete(MessageRef {
                    message_id: id.clone(),
                }))
            });
        self.send_if_any(command, "message mutation already in flight")
            .await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn handle(&self, event: ServerEvent) -> Result<(), ClientError> {
        debug!(event = event.event_type(), "received event");
        let mounted = match &event {
            ServerEvent::Hello(_) => {
                let actions = self.transition(Event::HelloReceived);
                self.perform(actions).await?;
                true
            }
            ServerEvent::Connection(snapshot) => {
                let list = ConversationList::from_snapshot(
                    snapshot,
                    self.config.paging.conversations_page_size,
                );
                info!(held = list.conversations().len(), "conversation list loaded");
                let mounted = Mounted::register(list, &self.dispatcher, &self.outbox);
                self.replace(|stores| stores.conversations.replace(mounted));
                true
            }
            ServerEvent::Watching(snapshot) => {
                let watch = WatchList::from_snapshot(
                    self.current_user(),
                    snapshot,
                    self.config.paging.watching_page_size,
                );
                info!(held = watch.conversations().len(), "watch list loaded");
                let mounted = Mounted::register(watch, &self.dispatcher, &self.outbox);
                self.replace(|stores| stores.watching.replace(mounted));
                true
            }
            ServerEvent::Conversation(snapshot) => {
                let detail = ConversationDetail::from_snapshot(
                    snapshot,
                    self.config.paging.messages_page_size,
                );
                info!(conversation_id = %snapshot.conversation.id, "conversation opened");
                let mounted = Mounted::register(detail, &self.dispatcher, &self.outbox);
                self.replace(|stores| stores.conversation.replace(mounted));
                true
            }
            _ => false,
        };

        let delivered = self.dispatcher.dispatch(&event);
        debug!(event = event.event_type(), delivered, "dispatched event");

        let changed = self.flush().await?;
        if mounted || changed {
            self.publish();
        }
        Ok(())
    }

    /// Swap a store slot and unmount whatever it held.
    fn replace<S, F>(&self, swap: F)
    where
        S: Synchronizer + Send + 'static,
        F: FnOnce(&mut Stores) -> Option<Mounted<S>>,
    {
        let previous = swap(&mut *lock(&self.stores));
        if let Some(previous) = previous {
            previous.unmount();
        }
    }

    /// Send every command the stores produced. Returns whether any view
    /// changed.
    async fn flush(&self) -> Result<bool, ClientError> {
        let effects = std::mem::take(&mut *lock(&self.outbox));
        let mut changed = false;
        for effect in effects {
            match effect {
                Effect::Send(command) => self.send(&command).await?,
                Effect::Changed(kind) => {
                    debug!(store = ?kind, "view changed");
                    changed = true;
                }
            }
        }
        Ok(changed)
    }

    fn transition(&self, event: Event) -> Vec<Action> {
        let mut state = lock(&self.state);
        let (next, actions) = state.clone().on_event(event);
        if *state != next {
            info!(from = ?*state, to = ?next, "session transition");
        }
        *state = next;
        actions
    }

    async fn perform(&self, actions: Vec<Action>) -> Result<(), ClientError> {
        for action in actions {
            match action {
                Action::Connect => {
                    self.transport.connect(&self.config.server.address).await?;
                }
                Action::Disconnect => self.transport.close().await?,
                Action::SendLogin { auth } => {
                    let login = Login {
                        auth_info: auth,
                        conversations_size: self.config.paging.login_conversations_size,
                    };
                    self.transport.send(&login.to_json()?).await?;
                }
                Action::ResetStores => self.reset_stores(),
                Action::Emit(event) => match event {
                    SessionEvent::Ready => info!("server ready for login"),
                    SessionEvent::LoggedIn { user } => info!(%user, "logged in"),
                    SessionEvent::Closed { reason } => info!(%reason, "session closed"),
                },
            }
        }
        Ok(())
    }

    async fn closed(&self, reason: String) {
        let actions = self.transition(Event::TransportClosed { reason });
        if let Err(e) = self.perform(actions).await {
            warn!(error = %e, "cleanup after close failed");
        }
        self.publish();
    }

    fn reset_stores(&self) {
        let stores = std::mem::take(&mut *lock(&self.stores));
        let mut dropped = 0;
        if let Some(mounted) = stores.conversations {
            mounted.unmount();
            dropped += 1;
        }
        if let Some(mounted) = stores.watching {
            mounted.unmount();
            dropped += 1;
        }
        if let Some(mounted) = stores.conversation {
            mounted.unmount();
            dropped += 1;
        }
        lock(&self.outbox).clear();
        debug!(dropped, "stores reset");
    }

    fn publish(&self) {
        let (connected, user) = {
            let state = lock(&self.state);
            (state.is_open(), state.user().cloned())
        };
        let snapshot = {
            let stores = lock(&self.stores);
            SessionSnapshot {
                connected,
                user,
                conversations: stores.conversations.as_ref().map(|mounted| {
                    let list = mounted.read();
                    ListView {
                        conversations: list.conversations().to_vec(),
                        total: list.total(),
                        has_more: list.has_more(),
                    }
                }),
                watching: stores.watching.as_ref().map(|mounted| {
                    let watch = mounted.read();
                    ListView {
                        conversations: watch.conversations().to_vec(),
                        total: watch.total(),
                        has_more: watch.has_more(),
                    }
                }),
                conversation: stores.conversation.as_ref().map(|mounted| {
                    let detail = mounted.read();
                    DetailView {
                        conversation: detail.conversation().cloned(),
                        messages: detail.messages().to_vec(),
                        total: detail.total(),
                        has_more: detail.has_more(),
                    }
                }),
            }
        };
        self.snapshot.send_replace(snapshot);
    }

    fn require_login(&self) -> Result<(), ClientError> {
        let state = lock(&self.state);
        if !state.is_open() {
            Err(ClientError::NotConnected)
        } else if !state.is_authenticated() {
            Err(ClientError::NotAuthenticated)
        } else {
            Ok(())
        }
    }

    fn current_user(&self) -> ParticipantId {
        lock(&self.state)
            .user()
            .cloned()
            .unwrap_or_else(|| ParticipantId::from(self.config.user.name.as_str()))
    }

    /// Route a conversation mutation through the list's guard when the list
    /// holds `id`; otherwise build the command directly.
    fn guarded(
        &self,
        id: &ConversationId,
        through_list: impl FnOnce(&mut ConversationList) -> Option<Command>,
        direct: impl FnOnce() -> Command,
    ) -> Option<Command> {
        let stores = lock(&self.stores);
        match stores.conversations.as_ref() {
            Some(mounted) => {
                let mut list = mounted.read();
                if list.get(id).is_some() {
                    through_list(&mut *list)
                } else {
                    Some(direct())
                }
            }
            None => Some(direct()),
        }
    }

    fn with_detail<R>(
        &self,
        f: impl FnOnce(&mut ConversationDetail) -> Option<R>,
    ) -> Option<R> {
        let stores = lock(&self.stores);
        stores
            .conversation
            .as_ref()
            .and_then(|mounted| f(&mut *mounted.read()))
    }

    async fn send_if_any(
        &self,
        command: Option<Command>,
        skipped: &'static str,
    ) -> Result<bool, ClientError> {
        match command {
            Some(command) => {
                self.send(&command).await?;
                Ok(true)
            }
            None => {
                debug!(reason = skipped, "command not sent");
                Ok(false)
            }
        }
    }

    async fn send(&self, command: &Command) -> Result<(), ClientError> {
        let frame = command.to_json()?;
        debug!(command = command.command_type(), "sending command");
        self.transport.send(&frame).await?;
        Ok(())
    }
}
