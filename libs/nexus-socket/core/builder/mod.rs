pub mod states;

use std::time::Duration;

use crate::config::{Endpoint, SocketConfig, DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_DELAY};
use crate::dispatch::Dispatcher;
use crate::error::TransportError;
use crate::message::{CloseEvent, Frame, OpenEvent};
use crate::socket::NexusSocket;
use states::*;

/// Type-state builder for a logical socket
///
/// The URL is the only required field; everything else has the documented
/// defaults. Notification callbacks registered here are installed before
/// the connection attempt starts, so no early event can be missed.
pub struct SocketBuilder<U>
where
    U: UrlState,
{
    _state: TypeState<U>,
    url: Option<String>,
    sub_protocols: Vec<String>,
    max_reconnect_attempts: u32,
    reconnect_delay: Duration,
    dispatcher: Dispatcher,
}

impl SocketBuilder<NoUrl> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            url: None,
            sub_protocols: Vec::new(),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            dispatcher: Dispatcher::new(),
        }
    }

    /// Set the target address (ws:// or wss://)
    pub fn url(self, url: impl Into<String>) -> SocketBuilder<HasUrl> {
        SocketBuilder {
            _state: TypeState::new(),
            url: Some(url.into()),
            sub_protocols: self.sub_protocols,
            max_reconnect_attempts: self.max_reconnect_attempts,
            reconnect_delay: self.reconnect_delay,
            dispatcher: self.dispatcher,
        }
    }
}

impl Default for SocketBuilder<NoUrl> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U> SocketBuilder<U>
where
    U: UrlState,
{
    /// Offer a sub-protocol during the handshake (may be called repeatedly)
    pub fn sub_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.sub_protocols.push(protocol.into());
        self
    }

    /// Maximum reconnection attempts before the socket goes terminal
    pub fn max_reconnect_attempts(mut self, max: u32) -> Self {
        self.max_reconnect_attempts = max;
        self
    }

    /// Fixed delay between reconnection attempts
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Assign the single-slot `opened` handler
    pub fn on_opened(mut self, callback: impl FnMut(&OpenEvent) + Send + 'static) -> Self {
        self.dispatcher.opened.set_handler(callback);
        self
    }

    /// Assign the single-slot `message` handler
    pub fn on_message(mut self, callback: impl FnMut(&Frame) + Send + 'static) -> Self {
        self.dispatcher.message.set_handler(callback);
        self
    }

    /// Assign the single-slot `closed` handler
    pub fn on_closed(mut self, callback: impl FnMut(&CloseEvent) + Send + 'static) -> Self {
        self.dispatcher.closed.set_handler(callback);
        self
    }

    /// Assign the single-slot `errored` handler
    pub fn on_errored(mut self, callback: impl FnMut(&TransportError) + Send + 'static) -> Self {
        self.dispatcher.errored.set_handler(callback);
        self
    }

    /// Assign the single-slot `recovered` handler
    pub fn on_recovered(mut self, mut callback: impl FnMut() + Send + 'static) -> Self {
        self.dispatcher.recovered.set_handler(move |_| callback());
        self
    }

    /// Register an additional `opened` listener
    pub fn opened_listener(mut self, callback: impl FnMut(&OpenEvent) + Send + 'static) -> Self {
        self.dispatcher.opened.add_listener(callback);
        self
    }

    /// Register an additional `message` listener
    pub fn message_listener(mut self, callback: impl FnMut(&Frame) + Send + 'static) -> Self {
        self.dispatcher.message.add_listener(callback);
        self
    }

    /// Register an additional `closed` listener
    pub fn closed_listener(mut self, callback: impl FnMut(&CloseEvent) + Send + 'static) -> Self {
        self.dispatcher.closed.add_listener(callback);
        self
    }

    /// Register an additional `errored` listener
    pub fn errored_listener(mut self, callback: impl FnMut(&TransportError) + Send + 'static) -> Self {
        self.dispatcher.errored.add_listener(callback);
        self
    }

    /// Register an additional `recovered` listener
    pub fn recovered_listener(mut self, mut callback: impl FnMut() + Send + 'static) -> Self {
        self.dispatcher.recovered.add_listener(move |_| callback());
        self
    }
}

impl SocketBuilder<HasUrl> {
    /// Build the logical socket and begin connecting immediately
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime; the lifecycle controller
    /// runs as a spawned task.
    pub fn connect(self) -> NexusSocket {
        let url = self.url.expect("type-state guarantees the url is set");
        let config = SocketConfig {
            endpoint: Endpoint::new(url, self.sub_protocols),
            max_reconnect_attempts: self.max_reconnect_attempts,
            reconnect_delay: self.reconnect_delay,
        };
        NexusSocket::spawn(config, self.dispatcher)
    }
}
