use async_trait::async_trait;

use crate::error::{Result, TransportError};
use crate::message::{Frame, OpenEvent, TransportEvent};

/// Trait over things that notify open/message/close/error
///
/// A `Transport` owns at most one physical connection at a time and
/// translates its native notifications into [`TransportEvent`]s. The
/// lifecycle controller drives any implementation of this trait; production
/// code uses [`TransportAdapter`](crate::core::adapter::TransportAdapter),
/// tests substitute scripted implementations.
#[async_trait]
pub trait Transport: Send {
    /// Open a new physical connection against the fixed endpoint.
    ///
    /// Any existing handle is discarded first; the previous connection's
    /// trailing events can therefore never interleave with the new one's.
    ///
    /// # Returns
    /// * `Ok(OpenEvent)` - handshake completed, handle is live
    /// * `Err(TransportError)` - handshake failed; the caller surfaces this
    ///   through the `errored` notification path, never as a panic
    async fn open(&mut self) -> std::result::Result<OpenEvent, TransportError>;

    /// Pull the next canonical notification from the live connection.
    ///
    /// Yields `Message` frames, then exactly one `Closed` (either a close
    /// handshake or a synthesized abnormal close when the stream ends), or
    /// an `Errored` after which the caller must discard the handle.
    async fn next_event(&mut self) -> TransportEvent;

    /// Write a frame through the live connection. No implicit queuing.
    async fn send(&mut self, frame: Frame) -> Result<()>;

    /// Request a graceful close of the live connection.
    ///
    /// No-op if no physical connection exists.
    async fn close(&mut self, code: Option<u16>, reason: Option<String>);

    /// Drop the physical handle immediately, without a close handshake.
    fn discard(&mut self);

    /// Whether a physical handle currently exists
    fn has_connection(&self) -> bool;
}
