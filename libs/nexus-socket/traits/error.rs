use thiserror::Error;

use crate::core::state::ReadyState;

/// Main error type for nexus-socket
///
/// Only `send` misuse is reported synchronously through this type.
/// Transport-layer failures never surface here; they are delivered through
/// the `errored` notification as a [`TransportError`].
#[derive(Error, Debug)]
pub enum NexusSocketError {
    /// `send` attempted with no physical connection
    #[error("not connected: no physical connection exists")]
    NotConnected,

    /// `send` attempted while the physical connection is not open
    #[error("invalid state: connection exists but is {0}")]
    InvalidState(ReadyState),

    /// Internal command channel failure
    #[error("channel send error: {0}")]
    ChannelSend(String),

    /// A write on the live connection failed
    ///
    /// Internal plumbing between adapter and controller; the public API
    /// surfaces this through the `errored` notification instead.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Physical-layer failure, delivered only via the `errored` notification.
///
/// Every `TransportError` is followed by a `closed` notification, which the
/// lifecycle controller then evaluates for retry.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// The connection handshake failed (DNS, refusal, bad upgrade)
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The live connection failed mid-stream
    #[error("websocket error: {0}")]
    WebSocket(String),
}

/// Result type for nexus-socket operations
pub type Result<T> = std::result::Result<T, NexusSocketError>;
