//! SAE J1850 VPW protocol layer
//!
//! Message layout, response validation, multi-frame reassembly and the
//! service layer that drives a [`Transport`](crate::transport::Transport).

pub mod codec;
mod error;
mod message;
mod nrc;
mod service;

pub use codec::{reassemble, validate, validate_functional, Codec};
pub use error::{AssemblyError, ProtocolError, SecurityError};
pub use message::{Header, Message, MAX_REQUEST_LEN};
pub use nrc::NegativeResponseCode;
pub use service::{validate_vin, VpwClient, VIN_LEN};

/// First header byte: priority and message type (SAE J2178-1 7.2)
///
/// ```text
/// bits 7-5: priority (0-7)
/// bit 4:    header type (0 = 3 byte header)
/// bit 3:    IFR (1 = not allowed, GM)
/// bit 2:    addressing mode (1 = physical, 0 = functional)
/// bits 1-0: message type
/// ```
pub mod priority {
    /// Priority 3, functional addressing (J1979 requests)
    pub const FUNCTIONAL: u8 = 0x68;
    /// Priority 3, physical node-to-node addressing
    pub const PHYSICAL: u8 = 0x6C;
}

/// Physical node addresses
pub mod physical_address {
    pub const PCM: u8 = 0x10;
    pub const SCAN_TOOL: u8 = 0xF0;
    pub const BROADCAST: u8 = 0xFE;
}

/// Functional addresses used by legislated OBD traffic
pub mod functional_address {
    pub const OBD_REQUEST: u8 = 0x6A;
    pub const OBD_RESPONSE: u8 = 0x6B;
}

/// Data rate selector for modes $21-$23 and $2A (SAE J2190 5.10)
pub mod data_rate {
    pub const STOP_TRANSMISSION: u8 = 0x00;
    pub const SINGLE_RESPONSE: u8 = 0x01;
    pub const REPEAT_SLOW: u8 = 0x02;
    pub const REPEAT_MEDIUM: u8 = 0x03;
    pub const REPEAT_FAST: u8 = 0x04;
}

/// Mode bytes (SAE J1979 legislated and SAE J2190 enhanced)
pub mod mode {
    // J1979
    pub const GET_PID: u8 = 0x01;
    pub const GET_FREEZE_FRAME: u8 = 0x02;
    pub const GET_DTC: u8 = 0x03;
    pub const CLEAR_DTC: u8 = 0x04;
    pub const GET_TEST_RESULTS: u8 = 0x06;
    pub const GET_PENDING_DTC: u8 = 0x07;
    pub const GET_VEHICLE_INFO: u8 = 0x09;

    // J2190
    pub const GET_BY_PID: u8 = 0x22;
    pub const GET_BY_ADDRESS: u8 = 0x23;
    pub const SECURITY_ACCESS: u8 = 0x27;
    pub const REQUEST_DPID: u8 = 0x2A;
    pub const DEFINE_DPID: u8 = 0x2C;
    pub const DOWNLOAD_REQUEST: u8 = 0x34;
    pub const DATA_TRANSFER: u8 = 0x36;
    pub const WRITE_BLOCK: u8 = 0x3B;
    pub const READ_BLOCK: u8 = 0x3C;
    pub const TEST_DEVICE_PRESENT: u8 = 0x3F;
    pub const NEGATIVE_RESPONSE: u8 = 0x7F;

    /// Offset added to the request mode in a positive response
    pub const POSITIVE_RESPONSE_OFFSET: u8 = 0x40;
}

/// Security access (mode $27) sub-functions and in-band reply codes
pub mod security_access {
    pub const REQUEST_SEED: u8 = 0x01;
    pub const SEND_KEY: u8 = 0x02;

    /// Seed step: controller is already unlocked
    pub const ALREADY_UNLOCKED: u8 = 0x37;
    /// Key step: key accepted
    pub const KEY_ACCEPTED: u8 = 0x34;
}

/// Data block identifiers for modes $3B/$3C on GM controllers
pub mod block_id {
    /// Pad byte plus VIN characters 1-5
    pub const VIN_1: u8 = 0x01;
    /// VIN characters 6-11
    pub const VIN_2: u8 = 0x02;
    /// VIN characters 12-17
    pub const VIN_3: u8 = 0x03;
    /// Operating system id
    pub const OSID: u8 = 0x0A;
}
