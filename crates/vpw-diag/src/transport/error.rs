//! Transport layer errors

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Device rejected command: {0}")]
    Rejected(String),

    #[error("No data")]
    NoData,

    #[error("Header change failed: {0}")]
    HeaderChange(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                TransportError::Timeout(err.to_string())
            }
            std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::NotConnected
            | std::io::ErrorKind::AddrNotAvailable => {
                TransportError::ConnectionFailed(err.to_string())
            }
            std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::UnexpectedEof => TransportError::ConnectionClosed,
            _ => TransportError::ReceiveFailed(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::{Error, ErrorKind};

    #[rstest]
    #[case(ErrorKind::ConnectionRefused, "Connection failed: refused")]
    #[case(ErrorKind::TimedOut, "Timeout: refused")]
    #[case(ErrorKind::UnexpectedEof, "Connection closed")]
    #[case(ErrorKind::Other, "Receive failed: refused")]
    fn test_io_error_mapping(#[case] kind: ErrorKind, #[case] expected: &str) {
        let err = TransportError::from(Error::new(kind, "refused"));
        assert_eq!(err.to_string(), expected);
    }
}
