//! # NexusSocket Traits
//!
//! Core traits and types for the nexus-socket client library:
//!
//! - **Transport**: the seam over things that notify open/message/close/error
//! - **Frame / TransportEvent**: canonical message and notification types
//! - **NexusSocketError / TransportError**: the error taxonomy

pub mod error;
pub mod message;
pub mod transport;

// Re-export commonly used types
pub use error::{NexusSocketError, Result, TransportError};
pub use message::{close_code, CloseEvent, Frame, OpenEvent, TransportEvent};
pub use transport::Transport;
