//! Common test utilities for nexus-socket integration tests
//!
//! Provides a mock WebSocket server with per-connection scripted behavior
//! and helpers for event-driven waiting.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, accept_hdr_async};

/// What the server does with one accepted connection
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// Echo every text/binary frame back, complete close handshakes
    Echo,
    /// Complete the handshake, then immediately close with this code
    CloseWith { code: u16, reason: &'static str },
}

/// A scriptable mock WebSocket server
///
/// Connections are handled in accept order: connection `n` uses the `n`-th
/// scripted behavior, falling back to `Echo` when the script runs out.
pub struct MockWsServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
    connections: Arc<AtomicUsize>,
}

impl MockWsServer {
    /// Create and start a server that echoes on every connection
    pub async fn start() -> Self {
        Self::start_with(Vec::new(), None).await
    }

    /// Create and start a server with per-connection scripted behavior
    pub async fn start_scripted(script: Vec<Behavior>) -> Self {
        Self::start_with(script, None).await
    }

    /// Create and start an echo server that negotiates the given
    /// sub-protocol whenever the client offers one
    pub async fn start_with_protocol(protocol: &'static str) -> Self {
        Self::start_with(Vec::new(), Some(protocol)).await
    }

    async fn start_with(script: Vec<Behavior>, protocol: Option<&'static str>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let connections = Arc::new(AtomicUsize::new(0));

        let shutdown_clone = Arc::clone(&shutdown);
        let connections_clone = Arc::clone(&connections);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let index = connections_clone.fetch_add(1, Ordering::AcqRel);
                                let behavior = script.get(index).copied().unwrap_or(Behavior::Echo);
                                let shutdown = Arc::clone(&shutdown_clone);
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, behavior, protocol, shutdown)
                                        .await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown,
            connections,
        }
    }

    async fn handle_connection(
        stream: TcpStream,
        behavior: Behavior,
        protocol: Option<&'static str>,
        shutdown: Arc<Notify>,
    ) {
        let ws_stream = if let Some(protocol) = protocol {
            let accept = accept_hdr_async(stream, |request: &Request, mut response: Response| {
                if request.headers().contains_key("sec-websocket-protocol") {
                    response
                        .headers_mut()
                        .insert("sec-websocket-protocol", HeaderValue::from_static(protocol));
                }
                Ok(response)
            })
            .await;
            match accept {
                Ok(ws) => ws,
                Err(e) => {
                    eprintln!("WebSocket handshake failed: {}", e);
                    return;
                }
            }
        } else {
            match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    eprintln!("WebSocket handshake failed: {}", e);
                    return;
                }
            }
        };

        let (mut write, mut read) = ws_stream.split();

        if let Behavior::CloseWith { code, reason } = behavior {
            let frame = CloseFrame {
                code: CloseCode::from(code),
                reason: reason.into(),
            };
            let _ = write.send(Message::Close(Some(frame))).await;
            // Drain until the close handshake completes
            while let Some(Ok(msg)) = read.next().await {
                if msg.is_close() {
                    break;
                }
            }
            return;
        }

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(msg)) => {
                            if msg.is_text() || msg.is_binary() {
                                // Echo the message back
                                if write.send(msg).await.is_err() {
                                    break;
                                }
                            } else if msg.is_ping() {
                                let pong = Message::Pong(msg.into_data());
                                if write.send(pong).await.is_err() {
                                    break;
                                }
                            } else if let Message::Close(frame) = msg {
                                // Complete the close handshake so the client
                                // observes its own code
                                let _ = write.send(Message::Close(frame)).await;
                                break;
                            }
                        }
                        Some(Err(_)) | None => break,
                    }
                }
                _ = shutdown.notified() => {
                    break;
                }
            }
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Number of connections accepted so far
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Acquire)
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A ws:// URL on which connections are refused
pub async fn refused_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}", addr)
}

/// Poll `check` until it returns true or the timeout elapses
pub async fn wait_for(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
