use std::time::Duration;

/// Default retry budget
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Default fixed delay between reconnection attempts
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// The fixed target of a logical socket
///
/// Immutable for the socket's entire lifetime: every reconnection attempt
/// reuses the same endpoint, never a new one.
#[derive(Debug, Clone)]
pub struct Endpoint {
    url: String,
    sub_protocols: Vec<String>,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, sub_protocols: Vec<String>) -> Self {
        Self {
            url: url.into(),
            sub_protocols,
        }
    }

    /// Target address (ws:// or wss://)
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sub-protocols offered during the handshake
    pub fn sub_protocols(&self) -> &[String] {
        &self.sub_protocols
    }
}

/// Configuration for a logical socket
///
/// Built through the type-state builder; see [`crate::builder()`].
#[derive(Debug, Clone)]
pub struct SocketConfig {
    pub(crate) endpoint: Endpoint,
    /// Maximum reconnection attempts before the socket goes terminal
    pub(crate) max_reconnect_attempts: u32,
    /// Fixed delay between reconnection attempts
    pub(crate) reconnect_delay: Duration,
}

impl SocketConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn max_reconnect_attempts(&self) -> u32 {
        self.max_reconnect_attempts
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }
}
