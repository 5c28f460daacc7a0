//! Two-tier notification dispatch
//!
//! Each notification kind has two independent sinks: an assignable
//! single-slot handler and an ordered list of listeners. Delivery order is
//! part of the contract: the handler slot fires first, then every listener
//! in registration order, each exactly once. This reproduces the native
//! socket's `onevent`-property-then-listeners semantics without inheriting
//! any event-target machinery.

use crate::error::TransportError;
use crate::message::{CloseEvent, Frame, OpenEvent};

type Callback<T> = Box<dyn FnMut(&T) + Send>;

/// The ordered pair of sinks for one notification kind
pub struct EventSinks<T> {
    handler: Option<Callback<T>>,
    listeners: Vec<Callback<T>>,
}

impl<T> EventSinks<T> {
    pub fn new() -> Self {
        Self {
            handler: None,
            listeners: Vec::new(),
        }
    }

    /// Assign the single-slot handler, replacing any previous one
    pub fn set_handler(&mut self, callback: impl FnMut(&T) + Send + 'static) {
        self.handler = Some(Box::new(callback));
    }

    /// Clear the single-slot handler
    pub fn clear_handler(&mut self) {
        self.handler = None;
    }

    /// Append a listener; listeners fire after the handler, in registration order
    pub fn add_listener(&mut self, callback: impl FnMut(&T) + Send + 'static) {
        self.listeners.push(Box::new(callback));
    }

    /// Deliver one event: handler slot first, then listeners in order
    pub fn dispatch(&mut self, event: &T) {
        if let Some(handler) = self.handler.as_mut() {
            handler(event);
        }
        for listener in self.listeners.iter_mut() {
            listener(event);
        }
    }
}

impl<T> Default for EventSinks<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// All notification sinks of one logical socket
///
/// Shared between the handle (registration) and the controller task
/// (delivery) behind a `parking_lot::Mutex`. Callbacks run on the
/// controller task while the lock is held, so registration methods must not
/// be called from inside a callback.
#[derive(Default)]
pub struct Dispatcher {
    pub opened: EventSinks<OpenEvent>,
    pub message: EventSinks<Frame>,
    pub closed: EventSinks<CloseEvent>,
    pub errored: EventSinks<TransportError>,
    /// No payload; fires once per successful reconnection
    pub recovered: EventSinks<()>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }
}
