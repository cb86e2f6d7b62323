//! Crate-wide error type

use thiserror::Error;

use crate::config::ConfigError;
use crate::params::PacketError;
use crate::transport::TransportError;
use crate::vpw::{AssemblyError, ProtocolError, SecurityError};

/// Every failure an operation of this crate can return
#[derive(Debug, Error)]
pub enum VpwError {
    /// Malformed or inconsistent response
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Security step refused by the controller
    #[error("Security error: {0}")]
    Security(#[from] SecurityError),

    /// Multi-frame reassembly failed
    #[error("Assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    /// Packet definition violates the control byte limits
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),

    /// Transport failure, passed through unchanged
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Invalid configuration or argument
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl VpwError {
    /// Whether the controller asked for a wait before the next attempt
    pub fn requires_delay(&self) -> bool {
        matches!(
            self,
            VpwError::Security(SecurityError::ExceededAttempts)
                | VpwError::Security(SecurityError::TimeDelayNotExpired)
        )
    }
}

pub type VpwResult<T> = Result<T, VpwError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_passes_through() {
        let err: VpwError = TransportError::Timeout("no prompt".to_string()).into();
        assert_eq!(err.to_string(), "Transport error: Timeout: no prompt");
    }

    #[test]
    fn test_requires_delay() {
        assert!(VpwError::from(SecurityError::TimeDelayNotExpired).requires_delay());
        assert!(VpwError::from(SecurityError::ExceededAttempts).requires_delay());
        assert!(!VpwError::from(SecurityError::InvalidKey).requires_delay());
        assert!(!VpwError::from(AssemblyError::Empty).requires_delay());
    }
}
