//! Transport layer for VPW communication
//!
//! The protocol core only needs [`Transport::send`]: one message out, the
//! decoded reply frames back. This module provides:
//! - ELM327 adapter over any byte stream
//! - Mock adapter for testing
//! - [`SharedTransport`] to serialize exchanges from several owners
//!
//! # Example
//!
//! ```ignore
//! use vpw_diag::config::ElmConfig;
//! use vpw_diag::transport::elm327::Elm327;
//! use vpw_diag::vpw::VpwClient;
//!
//! let port = std::net::TcpStream::connect("192.168.0.10:35000")?;
//! let elm = Elm327::new(port, ElmConfig::default())?;
//! let mut client = VpwClient::new(elm);
//! let vin = client.read_vin()?;
//! ```

mod adapter;
pub mod elm327;
pub mod error;
pub mod mock;

pub use adapter::{Frame, SharedTransport, Transport};
pub use elm327::Elm327;
pub use error::TransportError;
pub use mock::MockTransport;
