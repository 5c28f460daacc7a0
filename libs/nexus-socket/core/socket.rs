//! The logical socket handle
//!
//! `NexusSocket` is the stable, application-facing identity that persists
//! across physical reconnections. All methods are synchronous and
//! non-blocking: accessors read the controller's atomic mirror, mutations
//! enqueue commands to the controller task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::adapter::TransportAdapter;
use crate::config::SocketConfig;
use crate::controller::{run_controller, Command, LifecycleEvent};
use crate::dispatch::Dispatcher;
use crate::error::{NexusSocketError, Result, TransportError};
use crate::message::{CloseEvent, Frame, OpenEvent};
use crate::state::{BinaryType, PhysicalState, ReadyState, SharedState};

/// A resilient client socket with automatic reconnection
///
/// Construction begins connecting immediately, like the native socket.
/// Unexpected disconnects are retried on a fixed delay up to the configured
/// budget; a close with code 1000, a user-requested close, or an exhausted
/// budget is terminal.
///
/// # Example
/// ```ignore
/// let socket = nexus_socket::builder()
///     .url("wss://api.example.com/feed")
///     .on_message(|frame| println!("got: {:?}", frame))
///     .on_recovered(|| println!("reconnected"))
///     .connect();
///
/// socket.send(Frame::Text("hello".into()))?;
/// ```
pub struct NexusSocket {
    config: SocketConfig,
    shared: Arc<SharedState>,
    dispatcher: Arc<Mutex<Dispatcher>>,
    command_tx: mpsc::UnboundedSender<Command>,
    event_rx: crossbeam_channel::Receiver<LifecycleEvent>,
    destroyed: AtomicBool,
}

impl NexusSocket {
    /// Connect to `url` with the default reconnection policy
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn connect(url: impl Into<String>) -> Self {
        crate::builder().url(url).connect()
    }

    /// Spawn the lifecycle controller and return the handle
    pub(crate) fn spawn(config: SocketConfig, dispatcher: Dispatcher) -> Self {
        let shared = Arc::new(SharedState::new(config.max_reconnect_attempts));
        // The logical socket reads as CONNECTING from the moment it exists
        shared.begin_connecting();

        let dispatcher = Arc::new(Mutex::new(dispatcher));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = crossbeam_channel::unbounded();

        let transport = TransportAdapter::new(config.endpoint().clone());
        tokio::spawn(run_controller(
            transport,
            config.clone(),
            Arc::clone(&shared),
            Arc::clone(&dispatcher),
            command_rx,
            event_tx,
        ));

        Self {
            config,
            shared,
            dispatcher,
            command_tx,
            event_rx,
            destroyed: AtomicBool::new(false),
        }
    }

    /// Send a frame through the live connection
    ///
    /// No implicit queuing: fails with [`NexusSocketError::NotConnected`]
    /// when no physical connection exists (including while a handshake or a
    /// reconnect wait is in flight) and [`NexusSocketError::InvalidState`]
    /// when the connection exists but is no longer open.
    pub fn send(&self, frame: Frame) -> Result<()> {
        match self.shared.physical.get() {
            PhysicalState::Open => {}
            PhysicalState::Closing => {
                return Err(NexusSocketError::InvalidState(ReadyState::Closing));
            }
            _ => return Err(NexusSocketError::NotConnected),
        }

        self.shared
            .buffered
            .fetch_add(frame.len() as u64, Ordering::AcqRel);
        self.command_tx
            .send(Command::Send(frame))
            .map_err(|e| NexusSocketError::ChannelSend(e.to_string()))
    }

    /// Request a graceful close with an optional code and reason
    ///
    /// The next close notification is classified as manual regardless of
    /// the code the transport reports, so no retry follows. A close issued
    /// while reconnecting only records that intent; the pending retry is
    /// cancelled by [`destroy`](Self::destroy), not by `close`.
    pub fn close(&self, code: Option<u16>, reason: Option<String>) {
        debug!("User close requested (code: {:?})", code);
        let _ = self.command_tx.send(Command::Close { code, reason });
    }

    /// Tear the logical socket down: no further retries, pending retry
    /// cancelled, the live connection (if any) closed gracefully
    ///
    /// Idempotent; repeated calls have no further effect.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!("Destroying logical socket");
        let _ = self.command_tx.send(Command::Destroy);
    }

    /// Logical readiness, blending physical state with reconnection intent
    ///
    /// While a physical attempt or connection exists this is its state
    /// verbatim; between attempts it reads CONNECTING while a retry is
    /// pending and CLOSED once the socket is terminal.
    pub fn ready_state(&self) -> ReadyState {
        self.shared.logical_ready_state()
    }

    /// Outbound bytes accepted by `send` but not yet written; 0 when no
    /// connection exists
    pub fn buffered_amount(&self) -> u64 {
        match self.shared.physical.get() {
            PhysicalState::Detached => 0,
            _ => self.shared.buffered.load(Ordering::Acquire),
        }
    }

    /// Server-selected extensions; empty when no connection exists
    pub fn extensions(&self) -> String {
        self.shared.negotiated.read().extensions.clone()
    }

    /// Server-selected sub-protocol; empty when no connection exists
    pub fn protocol(&self) -> String {
        self.shared.negotiated.read().protocol.clone()
    }

    /// The fixed target address of this logical socket
    pub fn url(&self) -> &str {
        self.config.endpoint().url()
    }

    /// Delivery mode for inbound binary frames
    pub fn binary_type(&self) -> BinaryType {
        self.shared.binary_type()
    }

    /// Set the binary delivery mode; applies to the current physical
    /// connection only and resets on reconnect
    pub fn set_binary_type(&self, value: BinaryType) {
        self.shared.set_binary_type(value);
    }

    /// Try to receive a lifecycle event (non-blocking)
    pub fn try_recv_event(&self) -> Option<LifecycleEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive a lifecycle event (blocking; not for async contexts)
    pub fn recv_event(&self) -> std::result::Result<LifecycleEvent, crossbeam_channel::RecvError> {
        self.event_rx.recv()
    }

    // ---- notification surface ----
    //
    // Each kind has a single-slot handler and an append-only listener list;
    // delivery is handler first, then listeners in registration order.
    // Callbacks run on the controller task: do not register further
    // callbacks from inside one.

    /// Assign the single-slot `opened` handler
    pub fn set_on_opened(&self, callback: impl FnMut(&OpenEvent) + Send + 'static) {
        self.dispatcher.lock().opened.set_handler(callback);
    }

    /// Clear the single-slot `opened` handler
    pub fn clear_on_opened(&self) {
        self.dispatcher.lock().opened.clear_handler();
    }

    /// Register an additional `opened` listener
    pub fn add_opened_listener(&self, callback: impl FnMut(&OpenEvent) + Send + 'static) {
        self.dispatcher.lock().opened.add_listener(callback);
    }

    /// Assign the single-slot `message` handler
    pub fn set_on_message(&self, callback: impl FnMut(&Frame) + Send + 'static) {
        self.dispatcher.lock().message.set_handler(callback);
    }

    /// Clear the single-slot `message` handler
    pub fn clear_on_message(&self) {
        self.dispatcher.lock().message.clear_handler();
    }

    /// Register an additional `message` listener
    pub fn add_message_listener(&self, callback: impl FnMut(&Frame) + Send + 'static) {
        self.dispatcher.lock().message.add_listener(callback);
    }

    /// Assign the single-slot `closed` handler
    pub fn set_on_closed(&self, callback: impl FnMut(&CloseEvent) + Send + 'static) {
        self.dispatcher.lock().closed.set_handler(callback);
    }

    /// Clear the single-slot `closed` handler
    pub fn clear_on_closed(&self) {
        self.dispatcher.lock().closed.clear_handler();
    }

    /// Register an additional `closed` listener
    pub fn add_closed_listener(&self, callback: impl FnMut(&CloseEvent) + Send + 'static) {
        self.dispatcher.lock().closed.add_listener(callback);
    }

    /// Assign the single-slot `errored` handler
    pub fn set_on_errored(&self, callback: impl FnMut(&TransportError) + Send + 'static) {
        self.dispatcher.lock().errored.set_handler(callback);
    }

    /// Clear the single-slot `errored` handler
    pub fn clear_on_errored(&self) {
        self.dispatcher.lock().errored.clear_handler();
    }

    /// Register an additional `errored` listener
    pub fn add_errored_listener(&self, callback: impl FnMut(&TransportError) + Send + 'static) {
        self.dispatcher.lock().errored.add_listener(callback);
    }

    /// Assign the single-slot `recovered` handler
    pub fn set_on_recovered(&self, mut callback: impl FnMut() + Send + 'static) {
        self.dispatcher
            .lock()
            .recovered
            .set_handler(move |_| callback());
    }

    /// Clear the single-slot `recovered` handler
    pub fn clear_on_recovered(&self) {
        self.dispatcher.lock().recovered.clear_handler();
    }

    /// Register an additional `recovered` listener
    pub fn add_recovered_listener(&self, mut callback: impl FnMut() + Send + 'static) {
        self.dispatcher
            .lock()
            .recovered
            .add_listener(move |_| callback());
    }
}

impl Drop for NexusSocket {
    fn drop(&mut self) {
        // Dropping the last handle closes the command channel; the
        // controller treats that as a destroy and shuts the attempt down
        debug!("Logical socket handle dropped");
    }
}
