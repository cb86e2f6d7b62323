//! VPW protocol errors

use thiserror::Error;

use super::NegativeResponseCode;

/// Malformed or inconsistent responses
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Malformed(String),

    #[error("Non-hex data: {0}")]
    NonHex(String),

    #[error("Request/submode too long: {0} bytes (max 3)")]
    RequestTooLong(usize),

    #[error(
        "Address mismatch: expected {expected_target:02X}<-{expected_source:02X}, got {target:02X}<-{responder:02X}"
    )]
    AddressMismatch {
        expected_target: u8,
        expected_source: u8,
        target: u8,
        responder: u8,
    },

    #[error("Unexpected response mode 0x{actual:02X} (expected 0x{expected:02X})")]
    UnexpectedMode { expected: u8, actual: u8 },

    #[error("Request echo mismatch: expected [{}], got [{}]", hex::encode_upper(.expected), hex::encode_upper(.actual))]
    RequestEchoMismatch { expected: Vec<u8>, actual: Vec<u8> },

    #[error("Negative response: {nrc} (0x{nrc:02X}) for mode 0x{mode:02X}")]
    UnknownNrc { mode: u8, nrc: NegativeResponseCode },

    #[error("No valid response frames")]
    NoResponse,

    #[error("Response too short: expected {expected} bytes, got {actual}")]
    ShortPayload { expected: usize, actual: usize },
}

/// Named outcomes of a refused security step
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SecurityError {
    #[error("Security access denied")]
    AccessDenied,

    #[error("Key not accepted")]
    InvalidKey,

    #[error("Exceeded number of unlock attempts")]
    ExceededAttempts,

    #[error("Required time delay not expired")]
    TimeDelayNotExpired,

    #[error("Unknown unlock response code: 0x{0:02X}")]
    UnknownResponse(u8),
}

/// Multi-frame reassembly failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("Sequence gap: expected frame {expected}, got {found}")]
    SequenceGap { expected: u8, found: u8 },

    #[error("No payload assembled")]
    Empty,
}
