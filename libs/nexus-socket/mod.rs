//! # NexusSocket
//!
//! A resilient client-side WebSocket wrapper with transparent reconnection.
//!
//! ## Features
//!
//! - **One logical socket, many physical connections**: the handle keeps a
//!   stable identity while dropped connections are replaced underneath it
//! - **Fixed-delay reconnection policy**: bounded attempts, a single
//!   cancellable retry slot, normal closures (code 1000) and user closes
//!   are always terminal
//! - **Two-tier notifications**: an assignable handler plus ordered
//!   listeners per event kind, handler first, exactly-once delivery
//! - **Recovered signal**: a synthetic notification distinguishing a
//!   reconnection's success from the first connect
//! - **Lock-free observability**: `ready_state` and friends read atomic
//!   mirrors, never the controller's hot path
//!
//! ## Example
//!
//! ```rust,ignore
//! use nexus_socket::{Frame, ReadyState};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> nexus_socket::Result<()> {
//!     let socket = nexus_socket::builder()
//!         .url("wss://api.example.com/feed")
//!         .max_reconnect_attempts(5)
//!         .reconnect_delay(Duration::from_secs(3))
//!         .on_message(|frame| println!("message: {:?}", frame))
//!         .on_recovered(|| println!("connection recovered"))
//!         .connect();
//!
//!     while socket.ready_state() != ReadyState::Open {
//!         tokio::time::sleep(Duration::from_millis(10)).await;
//!     }
//!     socket.send(Frame::Text("hello".into()))?;
//!
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod traits;

// Re-export all traits and canonical types
pub use traits::*;

// Re-export core functionality
pub use self::core::{
    adapter, builder, config, controller, dispatch, socket, state,
    adapter::TransportAdapter,
    builder::SocketBuilder,
    config::{Endpoint, SocketConfig},
    controller::LifecycleEvent,
    socket::NexusSocket,
    state::{BinaryType, ReadyState},
};

/// Create a new socket builder
///
/// # Example
/// ```ignore
/// let socket = nexus_socket::builder()
///     .url("ws://127.0.0.1:9001")
///     .connect();
/// ```
pub fn builder() -> SocketBuilder<builder::states::NoUrl> {
    SocketBuilder::new()
}
