//! Observability sink injected into the codec, client and unlock engine

use std::fmt;

use parking_lot::Mutex;

use crate::security::UnlockState;
use crate::vpw::Header;

/// Notable things that happen during an exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A message was handed to the transport
    MessageSent { header: Header, payload: String },
    /// The transport returned frames for the last message
    FramesReceived { count: usize },
    /// A frame was dropped and processing continued without it
    FrameSkipped { frame: String, reason: String },
    /// Response priority differs from the request (tolerated)
    PriorityMismatch { expected: u8, actual: u8 },
    /// A packet definition was accepted by the controller
    PacketDefined { dpid: u8, parameters: usize },
    /// The unlock state machine moved
    UnlockStateChanged { from: UnlockState, to: UnlockState },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MessageSent { header, payload } => write!(f, "TX {} {}", header, payload),
            Self::FramesReceived { count } => write!(f, "RX {} frame(s)", count),
            Self::FrameSkipped { frame, reason } => {
                write!(f, "skipped frame {}: {}", frame, reason)
            }
            Self::PriorityMismatch { expected, actual } => write!(
                f,
                "response priority 0x{:02X} differs from request 0x{:02X}",
                actual, expected
            ),
            Self::PacketDefined { dpid, parameters } => {
                write!(f, "DPID 0x{:02X} defined with {} parameter(s)", dpid, parameters)
            }
            Self::UnlockStateChanged { from, to } => write!(f, "unlock {:?} -> {:?}", from, to),
        }
    }
}

/// Receiver for [`Event`]s
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: Event) {
        match &event {
            Event::MessageSent { header, payload } => {
                tracing::debug!(header = %header, payload = %payload, "TX");
            }
            Event::FramesReceived { count } => tracing::debug!(count, "RX"),
            Event::FrameSkipped { frame, reason } => {
                tracing::warn!(frame = %frame, reason = %reason, "Skipping frame");
            }
            Event::PriorityMismatch { expected, actual } => tracing::warn!(
                expected = format!("0x{:02X}", expected),
                actual = format!("0x{:02X}", actual),
                "Response priority differs from request"
            ),
            Event::PacketDefined { dpid, parameters } => tracing::info!(
                dpid = format!("0x{:02X}", dpid),
                parameters,
                "DPID defined"
            ),
            Event::UnlockStateChanged { from, to } => {
                tracing::info!(from = ?from, to = ?to, "Unlock state changed")
            }
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: Event) {
        self.events.lock().push(event);
    }
}
