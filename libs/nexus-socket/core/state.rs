//! Readiness state and the lock-free shared mirror
//!
//! The lifecycle controller is the single writer of everything in this
//! module; the application-facing handle only reads. Atomics keep the
//! accessors synchronous without locking the controller's hot path.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};

/// Readiness of a connection, mirroring the native socket's `readyState`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl std::fmt::Display for ReadyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReadyState::Connecting => "CONNECTING",
            ReadyState::Open => "OPEN",
            ReadyState::Closing => "CLOSING",
            ReadyState::Closed => "CLOSED",
        };
        f.write_str(s)
    }
}

/// Delivery mode for inbound binary frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum BinaryType {
    /// Deliver binary frames as raw bytes
    #[default]
    Bytes = 0,
    /// Lossy-decode binary frames to text before delivery
    Text = 1,
}

impl BinaryType {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => BinaryType::Text,
            _ => BinaryType::Bytes,
        }
    }
}

/// State of the physical connection slot
///
/// `Detached` means no handle exists at all: before the first attempt,
/// between attempts, and after terminal shutdown. `Connecting` means a
/// handshake is in flight but no handle has materialized yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PhysicalState {
    Detached = 0,
    Connecting = 1,
    Open = 2,
    Closing = 3,
    Closed = 4,
}

impl PhysicalState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => PhysicalState::Connecting,
            2 => PhysicalState::Open,
            3 => PhysicalState::Closing,
            4 => PhysicalState::Closed,
            _ => PhysicalState::Detached,
        }
    }

    /// Adapter-level readiness: an empty slot reads as CONNECTING, modeling
    /// "not yet attempted" the same as "still connecting"
    pub fn as_ready_state(self) -> ReadyState {
        match self {
            PhysicalState::Detached | PhysicalState::Connecting => ReadyState::Connecting,
            PhysicalState::Open => ReadyState::Open,
            PhysicalState::Closing => ReadyState::Closing,
            PhysicalState::Closed => ReadyState::Closed,
        }
    }
}

/// Atomic wrapper for [`PhysicalState`]
#[derive(Debug)]
pub struct AtomicPhysicalState(AtomicU8);

impl AtomicPhysicalState {
    pub fn new(state: PhysicalState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    #[inline]
    pub fn get(&self) -> PhysicalState {
        PhysicalState::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, state: PhysicalState) {
        self.0.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.get() == PhysicalState::Open
    }
}

/// Negotiated connection attributes, replaced wholesale on every attempt
#[derive(Debug, Default, Clone)]
pub struct Negotiated {
    pub protocol: String,
    pub extensions: String,
}

/// Observable state shared between the controller task and the handle
#[derive(Debug)]
pub struct SharedState {
    /// Physical connection slot state
    pub physical: AtomicPhysicalState,
    /// Outbound bytes enqueued but not yet flushed
    pub buffered: AtomicU64,
    /// Attributes negotiated by the current connection's handshake
    pub negotiated: RwLock<Negotiated>,
    /// Inbound binary delivery mode for the current connection
    binary_type: AtomicU8,
    /// A close was observed, a retry is pending or in flight
    pub reconnecting: AtomicBool,
    /// Mirror of the reconnection attempt counter
    pub attempts: AtomicU32,
    /// The fixed retry budget
    max_attempts: u32,
}

impl SharedState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            physical: AtomicPhysicalState::new(PhysicalState::Detached),
            buffered: AtomicU64::new(0),
            negotiated: RwLock::new(Negotiated::default()),
            binary_type: AtomicU8::new(BinaryType::default() as u8),
            reconnecting: AtomicBool::new(false),
            attempts: AtomicU32::new(0),
            max_attempts,
        }
    }

    /// A handshake is starting; reset all per-connection attributes
    pub fn begin_connecting(&self) {
        self.physical.set(PhysicalState::Connecting);
        self.buffered.store(0, Ordering::Release);
        self.binary_type
            .store(BinaryType::default() as u8, Ordering::Release);
        *self.negotiated.write() = Negotiated::default();
    }

    /// The handshake completed; record what was negotiated
    pub fn set_open(&self, protocol: &str, extensions: &str) {
        {
            let mut negotiated = self.negotiated.write();
            negotiated.protocol = protocol.to_string();
            negotiated.extensions = extensions.to_string();
        }
        self.physical.set(PhysicalState::Open);
    }

    /// A graceful close was requested on the live connection
    pub fn set_closing(&self) {
        if self.physical.get() == PhysicalState::Open {
            self.physical.set(PhysicalState::Closing);
        }
    }

    /// The physical handle was discarded
    pub fn detach(&self) {
        self.physical.set(PhysicalState::Detached);
        self.buffered.store(0, Ordering::Release);
        *self.negotiated.write() = Negotiated::default();
    }

    /// Current binary delivery mode; the default whenever no connection exists
    pub fn binary_type(&self) -> BinaryType {
        if self.physical.get() == PhysicalState::Detached {
            BinaryType::default()
        } else {
            BinaryType::from_u8(self.binary_type.load(Ordering::Acquire))
        }
    }

    /// Set the binary delivery mode; applies only while a connection exists
    pub fn set_binary_type(&self, value: BinaryType) {
        if self.physical.get() != PhysicalState::Detached {
            self.binary_type.store(value as u8, Ordering::Release);
        }
    }

    /// Whether the attempt counter has reached the retry budget
    pub fn budget_reached(&self) -> bool {
        self.attempts.load(Ordering::Acquire) >= self.max_attempts
    }

    /// Logical readiness: the physical state verbatim while an attempt or
    /// handle exists, otherwise blended from the reconnection state, with
    /// the budget check taking precedence over the reconnecting flag
    pub fn logical_ready_state(&self) -> ReadyState {
        match self.physical.get() {
            PhysicalState::Detached => {
                if self.budget_reached() {
                    ReadyState::Closed
                } else if self.reconnecting.load(Ordering::Acquire) {
                    ReadyState::Connecting
                } else {
                    ReadyState::Closed
                }
            }
            physical => physical.as_ready_state(),
        }
    }
}
