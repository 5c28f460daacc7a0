//! Transport adapter over tokio-tungstenite
//!
//! Owns exactly one physical connection at a time and translates its native
//! notifications into the four canonical [`TransportEvent`] kinds. The
//! adapter never inspects reconnection-policy state; deciding whether a
//! closed connection gets replaced is the lifecycle controller's job.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::config::Endpoint;
use crate::error::{NexusSocketError, Result, TransportError};
use crate::message::{close_code, CloseEvent, Frame, OpenEvent, TransportEvent};
use crate::state::ReadyState;
use crate::transport::Transport;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// The live transport handle; replaced wholesale on every attempt
struct PhysicalConnection {
    write: WsSink,
    read: WsSource,
    /// A graceful close has been requested on this connection
    closing: bool,
}

/// Bridges one physical connection to the canonical notification set
pub struct TransportAdapter {
    endpoint: Endpoint,
    connection: Option<PhysicalConnection>,
}

impl TransportAdapter {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            connection: None,
        }
    }

    /// The fixed endpoint this adapter connects to
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Adapter-level readiness of the physical slot
    ///
    /// CONNECTING when no connection exists, modeling "not yet attempted"
    /// the same as "still connecting".
    pub fn ready_state(&self) -> ReadyState {
        match &self.connection {
            None => ReadyState::Connecting,
            Some(conn) if conn.closing => ReadyState::Closing,
            Some(_) => ReadyState::Open,
        }
    }

    /// Build the handshake request, offering any configured sub-protocols
    fn build_request(&self) -> std::result::Result<http::Request<()>, TransportError> {
        let mut request = self
            .endpoint
            .url()
            .into_client_request()
            .map_err(|e| TransportError::Handshake(e.to_string()))?;

        if !self.endpoint.sub_protocols().is_empty() {
            let offer = self.endpoint.sub_protocols().join(", ");
            match offer.parse::<http::header::HeaderValue>() {
                Ok(value) => {
                    request
                        .headers_mut()
                        .insert(http::header::SEC_WEBSOCKET_PROTOCOL, value);
                }
                Err(_) => {
                    warn!("Invalid sub-protocol offer: {}", offer);
                }
            }
        }

        Ok(request)
    }
}

fn response_header(response: &http::Response<Option<Vec<u8>>>, name: http::header::HeaderName) -> String {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Convert a domain frame to a tungstenite message
fn frame_to_tungstenite(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text),
        Frame::Binary(data) => Message::Binary(data),
    }
}

#[async_trait]
impl Transport for TransportAdapter {
    async fn open(&mut self) -> std::result::Result<OpenEvent, TransportError> {
        // The previous handle is fully discarded before the next attempt
        self.discard();

        let request = self.build_request()?;
        debug!("Opening physical connection to {}", self.endpoint.url());

        match connect_async(request).await {
            Ok((ws_stream, response)) => {
                let protocol =
                    response_header(&response, http::header::SEC_WEBSOCKET_PROTOCOL);
                let extensions =
                    response_header(&response, http::header::SEC_WEBSOCKET_EXTENSIONS);

                let (write, read) = ws_stream.split();
                self.connection = Some(PhysicalConnection {
                    write,
                    read,
                    closing: false,
                });

                debug!(
                    "Physical connection open (protocol: {:?}, extensions: {:?})",
                    protocol, extensions
                );
                Ok(OpenEvent {
                    protocol,
                    extensions,
                })
            }
            Err(e) => Err(TransportError::Handshake(e.to_string())),
        }
    }

    async fn next_event(&mut self) -> TransportEvent {
        let Some(conn) = self.connection.as_mut() else {
            // No handle to observe; report the slot as abnormally closed
            return TransportEvent::Closed(CloseEvent::abnormal());
        };

        loop {
            match conn.read.next().await {
                Some(Ok(Message::Text(text))) => {
                    return TransportEvent::Message(Frame::Text(text));
                }
                Some(Ok(Message::Binary(data))) => {
                    return TransportEvent::Message(Frame::Binary(data));
                }
                Some(Ok(Message::Close(frame))) => {
                    let close = match frame {
                        Some(frame) => CloseEvent {
                            code: u16::from(frame.code),
                            reason: frame.reason.to_string(),
                            was_clean: true,
                        },
                        None => CloseEvent {
                            code: close_code::NO_STATUS,
                            reason: String::new(),
                            was_clean: true,
                        },
                    };
                    debug!(
                        "Close frame received (code: {}, reason: {:?})",
                        close.code, close.reason
                    );
                    return TransportEvent::Closed(close);
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {
                    // Control frames are handled by the transport layer
                    continue;
                }
                Some(Err(e)) => {
                    return TransportEvent::Errored(TransportError::WebSocket(e.to_string()));
                }
                None => {
                    // Stream ended without a close handshake
                    return TransportEvent::Closed(CloseEvent::abnormal());
                }
            }
        }
    }

    async fn send(&mut self, frame: Frame) -> Result<()> {
        let conn = self
            .connection
            .as_mut()
            .ok_or(NexusSocketError::NotConnected)?;
        if conn.closing {
            return Err(NexusSocketError::InvalidState(ReadyState::Closing));
        }

        conn.write
            .send(frame_to_tungstenite(frame))
            .await
            .map_err(|e| NexusSocketError::Transport(TransportError::WebSocket(e.to_string())))
    }

    async fn close(&mut self, code: Option<u16>, reason: Option<String>) {
        let Some(conn) = self.connection.as_mut() else {
            debug!("Close requested with no physical connection; ignoring");
            return;
        };
        if conn.closing {
            return;
        }
        conn.closing = true;

        let frame = code.map(|code| CloseFrame {
            code: CloseCode::from(code),
            reason: reason.unwrap_or_default().into(),
        });
        debug!("Requesting graceful close (frame: {:?})", frame);

        // A failed close write means the connection is already gone; the
        // read side will observe that on its own
        if let Err(e) = conn.write.send(Message::Close(frame)).await {
            debug!("Close request failed: {}", e);
        }
    }

    fn discard(&mut self) {
        if self.connection.take().is_some() {
            debug!("Discarding physical connection");
        }
    }

    fn has_connection(&self) -> bool {
        self.connection.is_some()
    }
}
