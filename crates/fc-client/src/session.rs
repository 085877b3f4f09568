//! Client session
//!
//! A [`Session`] owns one TCP connection to a game server at a time, the
//! request table correlating responses with callbacks, and the event bus
//! every extension hooks into.
//!
//! Each connection runs two tasks: a reader driving the packet framer and
//! dispatching in arrival order, and a writer fed by an unbounded channel.
//! Connections are tagged with a generation number so a late teardown from a
//! previous connection cannot close a newer one.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::AbortHandle;
use tokio_util::codec::FramedRead;

use fc_core::config::ClientConfig;
use fc_core::{CommandError, ConnectionError, FcError, ProtocolViolation};
use fc_protocol::{encode_to_bytes, Command, Message, PacketCodec, SequenceId, STATUS_OK};

use crate::auth::LoginHook;
use crate::bus::{EventBus, SubscriptionId};
use crate::extensions::{
    self, EventDecoder, Extension, ExtensionError, Operation, OperationError, OperationResult,
};
use crate::multiplexer::RequestTable;
use crate::notification::{NamedEvent, Notification, Topic};

/// Pre-send inspection; an `Err` vetoes the request with that reason
pub type Filter = Arc<dyn Fn(&Message) -> Result<(), String> + Send + Sync>;

/// Lifecycle of a session's connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected
    Idle,
    /// TCP dial in progress
    Connecting,
    /// Socket up, login hook running
    Authenticating,
    /// Accepting commands
    Ready,
    /// Write half shut down, waiting for the server to close
    Closing,
    /// Torn down; `connect()` may be called again
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Authenticating => "authenticating",
            ConnectionState::Ready => "ready",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Work queued for the writer task
enum Outbound {
    Packet(Bytes),
    Shutdown,
}

/// The live connection
struct Link {
    generation: u64,
    outbound: mpsc::UnboundedSender<Outbound>,
    reader: AbortHandle,
    closing: bool,
}

struct Inner {
    config: ClientConfig,
    state: Mutex<ConnectionState>,
    requests: Mutex<RequestTable>,
    link: Mutex<Option<Link>>,
    generation: AtomicU64,
    bus: EventBus,
    filters: RwLock<Vec<Filter>>,
    login: RwLock<Option<Arc<dyn LoginHook>>>,
    operations: RwLock<HashMap<String, Operation>>,
    decoders: RwLock<HashMap<String, EventDecoder>>,
    extensions: Mutex<Vec<&'static str>>,
}

/// Handle to an RCON client session
///
/// Cloning is cheap; all clones share the same connection, request table
/// and event bus.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    /// Create a session with no extensions loaded
    pub fn new(config: ClientConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(ConnectionState::Idle),
                requests: Mutex::new(RequestTable::new()),
                link: Mutex::new(None),
                generation: AtomicU64::new(0),
                bus: EventBus::new(),
                filters: RwLock::new(Vec::new()),
                login: RwLock::new(None),
                operations: RwLock::new(HashMap::new()),
                decoders: RwLock::new(HashMap::new()),
                extensions: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Create a session and load the game family named in `config.game`
    pub fn with_game(config: ClientConfig) -> Result<Self, ExtensionError> {
        let game = config.game.clone();
        let session = Self::new(config);
        session.use_family(&game)?;
        Ok(session)
    }

    /// Session configuration
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.lock()
    }

    /// Whether a socket is attached and not shutting down
    pub fn is_connected(&self) -> bool {
        self.inner
            .link
            .lock()
            .as_ref()
            .is_some_and(|link| !link.closing)
    }

    /// Number of requests awaiting a response
    pub fn pending_requests(&self) -> usize {
        self.inner.requests.lock().len()
    }

    fn set_state(&self, state: ConnectionState) {
        let mut current = self.inner.state.lock();
        if *current != state {
            tracing::debug!(from = %*current, to = %state, "State change");
            *current = state;
        }
    }

    // ---- Connection lifecycle ----

    /// Open the connection and run the login hook, if any
    ///
    /// Resolves once the session is Ready or the attempt failed. Failures
    /// are also published as [`Notification::Error`] followed by
    /// [`Notification::Closed`]; the returned error is the published one.
    /// Calling this while a connection is already underway does nothing.
    pub async fn connect(&self) -> Result<(), Arc<FcError>> {
        {
            let mut state = self.inner.state.lock();
            match *state {
                ConnectionState::Idle | ConnectionState::Closed => {
                    *state = ConnectionState::Connecting;
                }
                other => {
                    tracing::debug!(state = %other, "Connect ignored");
                    return Ok(());
                }
            }
        }

        let address = self.inner.config.address.clone();
        let timeout = self.inner.config.connect_timeout;
        tracing::debug!(address = %address, "Connecting");

        let dialed = tokio::time::timeout(timeout, TcpStream::connect(address.as_str())).await;
        let stream = match dialed {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(self.fail_dial(ConnectionError::ConnectFailed { address, source }));
            }
            Err(_) => {
                return Err(self.fail_dial(ConnectionError::Timeout {
                    address,
                    after: timeout,
                }));
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "Failed to set TCP_NODELAY");
        }

        let generation = self.attach(stream);
        tracing::info!(address = %address, "Connected");
        self.publish(Notification::Connected);

        let hook = self.inner.login.read().clone();
        if let Some(hook) = &hook {
            if !self.advance(generation, ConnectionState::Authenticating) {
                return Err(Arc::new(CommandError::ConnectionClosed.into()));
            }
            if let Err(err) = hook.login(self).await {
                tracing::error!(error = %err, "Login failed");
                let err = Arc::new(FcError::from(err));
                self.publish(Notification::Error(Arc::clone(&err)));
                self.close_link(generation, None);
                return Err(err);
            }
        }

        if !self.advance(generation, ConnectionState::Ready) {
            return Err(Arc::new(CommandError::ConnectionClosed.into()));
        }

        if hook.is_some() {
            self.publish(Notification::Login);
        }
        self.publish(Notification::Ready);
        Ok(())
    }

    /// Shut down the write half and fail every outstanding request
    ///
    /// The session settles in Closed once the server closes its side.
    /// Does nothing without a live connection.
    pub fn disconnect(&self) {
        {
            let mut link = self.inner.link.lock();
            let Some(link) = link.as_mut().filter(|link| !link.closing) else {
                return;
            };
            link.closing = true;
            // Writer already gone means the reader is about to tear down
            let _ = link.outbound.send(Outbound::Shutdown);
        }

        tracing::info!("Disconnecting");
        self.set_state(ConnectionState::Closing);
        self.fail_pending();
    }

    fn fail_dial(&self, err: ConnectionError) -> Arc<FcError> {
        tracing::error!(error = %err, "Connection failed");
        let err = Arc::new(FcError::from(err));
        self.set_state(ConnectionState::Closed);
        self.publish(Notification::Error(Arc::clone(&err)));
        self.publish(Notification::Closed);
        err
    }

    /// Install a fresh socket and spawn its reader and writer
    fn attach(&self, stream: TcpStream) -> u64 {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (read_half, write_half) = stream.into_split();
        let (outbound, rx) = mpsc::unbounded_channel();

        // Hold the slot while spawning so an instant EOF cannot race the install
        let mut link = self.inner.link.lock();
        let reader = tokio::spawn(read_loop(self.clone(), generation, read_half));
        tokio::spawn(write_loop(self.clone(), generation, write_half, rx));
        *link = Some(Link {
            generation,
            outbound,
            reader: reader.abort_handle(),
            closing: false,
        });
        generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner
            .link
            .lock()
            .as_ref()
            .is_some_and(|link| link.generation == generation)
    }

    /// Move to `state` if connection `generation` is still live
    ///
    /// Teardown takes the link slot before it sets Closed, so holding the
    /// slot here keeps a concurrent teardown from being overwritten.
    fn advance(&self, generation: u64, state: ConnectionState) -> bool {
        let link = self.inner.link.lock();
        let live = link
            .as_ref()
            .is_some_and(|link| link.generation == generation && !link.closing);
        if live {
            self.set_state(state);
        }
        live
    }

    /// Tear down connection `generation` if it is still the live one
    fn close_link(&self, generation: u64, cause: Option<FcError>) {
        let link = {
            let mut slot = self.inner.link.lock();
            match slot.as_ref() {
                Some(link) if link.generation == generation => slot.take(),
                _ => None,
            }
        };
        let Some(link) = link else {
            return;
        };

        // Dropping the sender ends the writer, which drops the write half
        link.reader.abort();
        drop(link);

        self.set_state(ConnectionState::Closed);
        self.fail_pending();
        if let Some(cause) = cause {
            self.publish(Notification::Error(Arc::new(cause)));
        }
        tracing::info!("Connection closed");
        self.publish(Notification::Closed);
    }

    fn fail_pending(&self) {
        let pending = self.inner.requests.lock().drain();
        if !pending.is_empty() {
            tracing::debug!(count = pending.len(), "Failing outstanding requests");
        }
        for (_, completion) in pending {
            completion(Err(CommandError::ConnectionClosed));
        }
    }

    /// Queue bytes on the live connection
    fn transmit(&self, outbound: Outbound) -> bool {
        let link = self.inner.link.lock();
        match link.as_ref() {
            Some(link) if !link.closing => link.outbound.send(outbound).is_ok(),
            _ => false,
        }
    }

    // ---- Requests ----

    /// Send a command; `on_complete` runs exactly once with the outcome
    ///
    /// Never blocks. Returns the id the request was sent under, or `None`
    /// if there was no connection (the callback has then already run with
    /// [`CommandError::NotConnected`]).
    pub fn exec<F>(&self, command: impl Into<Command>, on_complete: F) -> Option<SequenceId>
    where
        F: FnOnce(Result<Vec<String>, CommandError>) + Send + 'static,
    {
        let words = command.into().into_words();
        if !self.is_connected() {
            on_complete(Err(CommandError::NotConnected));
            return None;
        }

        let id = self.inner.requests.lock().register(Box::new(on_complete));
        let message = Message::request(id, words);

        if let Err(reason) = self.inspect(&message) {
            tracing::debug!(id = %id, reason = %reason, "Request vetoed");
            self.fail_request(id, CommandError::Vetoed(reason));
            return Some(id);
        }

        let packet = match encode_to_bytes(&message) {
            Ok(packet) => packet,
            Err(e) => {
                self.fail_request(id, CommandError::Encoding(e));
                return Some(id);
            }
        };

        if !self.transmit(Outbound::Packet(packet)) {
            self.fail_request(id, CommandError::NotConnected);
            return Some(id);
        }

        tracing::debug!(id = %id, command = message.head().unwrap_or(""), "Sent request");
        Some(id)
    }

    /// Send a command and wait for its response words (status excluded)
    pub async fn request(&self, command: impl Into<Command>) -> Result<Vec<String>, CommandError> {
        let (tx, rx) = oneshot::channel();
        self.exec(command, move |result| {
            let _ = tx.send(result);
        });
        rx.await.unwrap_or(Err(CommandError::ConnectionClosed))
    }

    fn inspect(&self, message: &Message) -> Result<(), String> {
        let filters = self.inner.filters.read().clone();
        filters.iter().try_for_each(|filter| filter(message))
    }

    fn fail_request(&self, id: SequenceId, err: CommandError) {
        let completion = self.inner.requests.lock().take(id);
        if let Some(completion) = completion {
            completion(Err(err));
        }
    }

    /// Add a pre-send filter; filters run in registration order
    pub fn on_exec<F>(&self, filter: F)
    where
        F: Fn(&Message) -> Result<(), String> + Send + Sync + 'static,
    {
        self.inner.filters.write().push(Arc::new(filter));
    }

    // ---- Dispatch ----

    fn dispatch(&self, message: Message) {
        tracing::debug!(
            id = %message.id,
            words = message.words.len(),
            response = message.is_response(),
            from_server = message.is_from_server(),
            "Received"
        );

        if message.words.is_empty() {
            self.report_empty(message.id);
            return;
        }

        if message.is_from_server() {
            let acknowledge = self.inner.config.acknowledge_events && !message.is_response();
            let ack = acknowledge.then(|| message.acknowledge());

            self.publish(Notification::Event(message));
            if let Some(ack) = ack {
                self.send_ack(ack);
            }
            return;
        }

        let completion = self.inner.requests.lock().take(message.id);
        let Some(completion) = completion else {
            tracing::debug!(id = %message.id, "Response matches no request");
            self.publish(Notification::Message(message));
            return;
        };

        let mut words = message.words;
        let status = words.remove(0);
        if status == STATUS_OK {
            completion(Ok(words));
        } else {
            completion(Err(CommandError::Rejected {
                status,
                detail: words,
            }));
        }
    }

    fn report_empty(&self, id: SequenceId) {
        tracing::warn!(id = %id, "Empty message received");
        self.publish(Notification::Error(Arc::new(
            ProtocolViolation::EmptyMessage { id }.into(),
        )));
    }

    fn send_ack(&self, ack: Message) {
        match encode_to_bytes(&ack) {
            Ok(packet) => {
                if !self.transmit(Outbound::Packet(packet)) {
                    tracing::debug!(id = %ack.id, "Connection gone before acknowledgement");
                }
            }
            Err(e) => tracing::warn!(id = %ack.id, error = %e, "Cannot encode acknowledgement"),
        }
    }

    // ---- Event bus ----

    /// Publish a notification to handlers and stream receivers
    pub fn publish(&self, notification: Notification) {
        self.inner.bus.publish(self, notification);
    }

    /// Publish an extension-level event
    pub fn publish_named(&self, event: NamedEvent) {
        self.publish(Notification::Named(event));
    }

    /// Run `handler` for every notification matching `topic`
    ///
    /// Handlers run on the connection's reader task and must not block.
    pub fn subscribe<F>(&self, topic: impl Into<Topic>, handler: F) -> SubscriptionId
    where
        F: Fn(&Session, &Notification) + Send + Sync + 'static,
    {
        self.inner.bus.subscribe(topic.into(), Arc::new(handler))
    }

    /// Remove a handler added with [`Session::subscribe`]
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.bus.unsubscribe(id)
    }

    /// Stream of every notification published from now on
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.inner.bus.stream()
    }

    // ---- Extension surface ----

    /// Replace the login sequence run after connecting
    pub fn set_login_hook(&self, hook: Arc<dyn LoginHook>) {
        *self.inner.login.write() = Some(hook);
    }

    /// Whether a login sequence is registered
    pub fn has_login_hook(&self) -> bool {
        self.inner.login.read().is_some()
    }

    /// Add or replace a named operation
    pub fn define_operation<F, Fut>(&self, name: impl Into<String>, op: F)
    where
        F: Fn(Session, Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = OperationResult> + Send + 'static,
    {
        let name = name.into();
        let op: Operation = Arc::new(
            move |session: Session, args: Vec<String>| -> BoxFuture<'static, OperationResult> {
                Box::pin(op(session, args))
            },
        );
        if self.inner.operations.write().insert(name.clone(), op).is_some() {
            tracing::debug!(operation = %name, "Operation overridden");
        }
    }

    /// Look up a named operation
    pub fn operation(&self, name: &str) -> Option<Operation> {
        self.inner.operations.read().get(name).cloned()
    }

    /// Names of all defined operations, sorted
    pub fn operation_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.operations.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Run a named operation
    pub async fn invoke(&self, name: &str, args: Vec<String>) -> OperationResult {
        let op = self
            .operation(name)
            .ok_or_else(|| OperationError::Unknown(name.to_string()))?;
        op(self.clone(), args).await
    }

    /// Install a typed argument decoder for raw event `raw_name`
    pub fn define_event_decoder<F>(&self, raw_name: impl Into<String>, decoder: F)
    where
        F: Fn(&[String]) -> Result<Vec<Value>, extensions::DecodeError> + Send + Sync + 'static,
    {
        self.inner
            .decoders
            .write()
            .insert(raw_name.into(), Arc::new(decoder));
    }

    /// Decoder registered for raw event `raw_name`
    pub fn event_decoder(&self, raw_name: &str) -> Option<EventDecoder> {
        self.inner.decoders.read().get(raw_name).cloned()
    }

    /// Load an extension unless one with the same name is already loaded
    pub fn use_extension(&self, extension: &dyn Extension) -> Result<(), ExtensionError> {
        let name = extension.name();
        {
            let mut loaded = self.inner.extensions.lock();
            if loaded.contains(&name) {
                return Ok(());
            }
            loaded.push(name);
        }

        tracing::debug!(extension = name, "Loading extension");
        let result = extension.load(self);
        if result.is_err() {
            self.inner.extensions.lock().retain(|loaded| *loaded != name);
        }
        result
    }

    /// Load the extension registered for a game family
    pub fn use_family(&self, family: &str) -> Result<(), ExtensionError> {
        let extension = extensions::lookup(family)
            .ok_or_else(|| ExtensionError::UnknownFamily(family.to_string()))?;
        self.use_extension(extension)
    }

    /// Names of loaded extensions in load order
    pub fn extensions(&self) -> Vec<&'static str> {
        self.inner.extensions.lock().clone()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.inner.config.address)
            .field("state", &self.state())
            .field("extensions", &self.extensions())
            .finish()
    }
}

/// Tears connection `generation` down when its reader exits, panics included
struct ReaderExit {
    session: Session,
    generation: u64,
    finished: bool,
    cause: Option<FcError>,
}

impl Drop for ReaderExit {
    fn drop(&mut self) {
        let cause = if self.finished {
            self.cause.take()
        } else if self.session.is_current(self.generation) {
            tracing::error!("Reader task stopped unexpectedly");
            Some(ConnectionError::Io(std::io::Error::other("reader task stopped")).into())
        } else {
            // Aborted by a teardown that already ran
            None
        };
        self.session.close_link(self.generation, cause);
    }
}

async fn read_loop(session: Session, generation: u64, read_half: OwnedReadHalf) {
    let codec = PacketCodec::with_max_packet_size(session.inner.config.max_packet_size);
    let mut frames = FramedRead::new(read_half, codec);
    let mut exit = ReaderExit {
        session: session.clone(),
        generation,
        finished: false,
        cause: None,
    };

    loop {
        match frames.next().await {
            Some(Ok(Ok(message))) => session.dispatch(message),
            Some(Ok(Err(framing))) => {
                tracing::warn!(error = %framing, "Dropping malformed packet");
                session.publish(Notification::Error(Arc::new(framing.into())));
            }
            Some(Err(e)) => {
                tracing::error!(error = %e, "Connection failed");
                exit.cause = Some(FcError::from(ConnectionError::from(e)));
                exit.finished = true;
                break;
            }
            None => {
                tracing::debug!("Server closed the connection");
                exit.finished = true;
                break;
            }
        }
    }
}

async fn write_loop(
    session: Session,
    generation: u64,
    mut write_half: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
) {
    while let Some(outbound) = rx.recv().await {
        match outbound {
            Outbound::Packet(packet) => {
                if let Err(e) = write_half.write_all(&packet).await {
                    tracing::error!(error = %e, "Write failed");
                    session.close_link(generation, Some(ConnectionError::Io(e).into()));
                    return;
                }
            }
            Outbound::Shutdown => {
                if let Err(e) = write_half.shutdown().await {
                    tracing::debug!(error = %e, "Shutdown failed");
                }
                return;
            }
        }
    }
}
