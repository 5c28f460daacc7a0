//! Core socket machinery: adapter, controller, dispatch, and the handle

pub mod adapter;
pub mod builder;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod socket;
pub mod state;

// Re-export main types
pub use adapter::TransportAdapter;
pub use builder::{states, SocketBuilder};
pub use config::{Endpoint, SocketConfig, DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_DELAY};
pub use controller::LifecycleEvent;
pub use dispatch::{Dispatcher, EventSinks};
pub use socket::NexusSocket;
pub use state::{BinaryType, ReadyState};
