//! Configuration
//!
//! Request defaults, controller variant selection, packet planning and
//! parameter definitions, loadable from TOML.
//!
//! ```toml
//! [controller]
//! variant = "p01"
//!
//! [defaults]
//! target = 0x10
//!
//! [[parameters]]
//! name = "rpm"
//! id = "0x000C"
//! size = 1
//! scale = 0.25
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::params::{decoders, Parameter, ParameterId};
use crate::security::{ControllerVariant, SeedKeyAlgorithm, ALGORITHM_LEN};
use crate::vpw::{data_rate, physical_address, priority, Header};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VpwConfig {
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub defaults: RequestDefaults,
    #[serde(default)]
    pub dpid: DpidConfig,
    #[serde(default)]
    pub parameters: Vec<ParameterConfig>,
    #[serde(default)]
    pub elm: ElmConfig,
}

impl VpwConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Build every configured parameter, in declaration order
    pub fn parameters(&self) -> Result<Vec<Parameter>, ConfigError> {
        self.parameters.iter().map(ParameterConfig::to_parameter).collect()
    }
}

// =============================================================================
// Request Defaults
// =============================================================================

/// Per-call addressing and rate defaults
///
/// Every request builder takes one of these instead of optional overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDefaults {
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default = "default_target")]
    pub target: u8,
    #[serde(default = "default_source")]
    pub source: u8,
    /// Data rate selector for modes $22/$23/$2A
    #[serde(default = "default_rate")]
    pub rate: u8,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            priority: default_priority(),
            target: default_target(),
            source: default_source(),
            rate: default_rate(),
        }
    }
}

impl RequestDefaults {
    pub fn header(&self) -> Header {
        Header::new(self.priority, self.target, self.source)
    }

    pub fn with_target(mut self, target: u8) -> Self {
        self.target = target;
        self
    }

    pub fn with_rate(mut self, rate: u8) -> Self {
        self.rate = rate;
        self
    }
}

fn default_priority() -> u8 {
    priority::PHYSICAL
}

fn default_target() -> u8 {
    physical_address::PCM
}

fn default_source() -> u8 {
    physical_address::SCAN_TOOL
}

fn default_rate() -> u8 {
    data_rate::SINGLE_RESPONSE
}

// =============================================================================
// Controller
// =============================================================================

/// Controller variant, or a literal seed/key algorithm
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<ControllerVariant>,
    /// 13 algorithm bytes; takes precedence over `variant`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<Vec<u8>>,
}

impl ControllerConfig {
    pub fn algorithm(&self) -> Result<SeedKeyAlgorithm, ConfigError> {
        if let Some(ref bytes) = self.algorithm {
            let table: [u8; ALGORITHM_LEN] = bytes.as_slice().try_into().map_err(|_| {
                ConfigError::InvalidValue(format!(
                    "seed/key algorithm needs {} entries, got {}",
                    ALGORITHM_LEN,
                    bytes.len()
                ))
            })?;
            return Ok(SeedKeyAlgorithm::new(table));
        }

        self.variant
            .map(ControllerVariant::algorithm)
            .ok_or_else(|| {
                ConfigError::InvalidValue("controller variant or algorithm required".to_string())
            })
    }
}

// =============================================================================
// Packet Planning
// =============================================================================

/// How parameter lists are split into DPIDs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DpidConfig {
    /// First packet id handed out
    #[serde(default = "default_dpid_start")]
    pub start: u8,
    /// Parameters per packet
    #[serde(default = "default_dpid_max_parameters")]
    pub max_parameters: usize,
}

impl Default for DpidConfig {
    fn default() -> Self {
        Self {
            start: default_dpid_start(),
            max_parameters: default_dpid_max_parameters(),
        }
    }
}

fn default_dpid_start() -> u8 {
    0xFA
}

fn default_dpid_max_parameters() -> usize {
    4
}

// =============================================================================
// Parameters
// =============================================================================

/// Parameter with a linear conversion (physical = raw * scale + offset)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterConfig {
    /// Display name
    pub name: String,
    /// 2 byte PID ("0x000C") or 3 byte memory address ("0x024170")
    pub id: String,
    /// Response size in bytes
    pub size: u8,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub offset: f64,
    /// Keep the raw hex string instead of applying scale/offset
    #[serde(default)]
    pub raw: bool,
}

fn default_scale() -> f64 {
    1.0
}

impl ParameterConfig {
    pub fn to_parameter(&self) -> Result<Parameter, ConfigError> {
        let id = parse_parameter_id(&self.id)?;
        let parameter = Parameter::new(&self.name, id, self.size);
        if self.raw {
            return Ok(parameter);
        }
        Ok(parameter.with_decoder(decoders::linear(self.scale, self.offset)))
    }
}

/// Parse a hex identifier; 4 digits give a PID, 6 digits a memory address
///
/// Accepts formats: "000C", "0x000C", "0X024170"
pub fn parse_parameter_id(s: &str) -> Result<ParameterId, ConfigError> {
    let digits = s.trim().trim_start_matches("0x").trim_start_matches("0X");
    let bytes = hex::decode(digits)
        .map_err(|e| ConfigError::InvalidValue(format!("parameter id {:?}: {}", s, e)))?;
    ParameterId::try_from(bytes.as_slice())
        .map_err(|_| ConfigError::InvalidValue(format!("parameter id {:?}: need 2 or 3 bytes", s)))
}

// =============================================================================
// ELM327 Adapter
// =============================================================================

/// ELM327 adapter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElmConfig {
    /// `ATSP` protocol number (2 = SAE J1850 VPW)
    #[serde(default = "default_elm_protocol")]
    pub protocol: u8,
    /// Frames end with a J1850 CRC byte that must be checked and removed
    #[serde(default = "default_true")]
    pub checksum: bool,
    /// Allow messages longer than 7 bytes (`ATAL`)
    #[serde(default = "default_true")]
    pub allow_long: bool,
}

impl Default for ElmConfig {
    fn default() -> Self {
        Self {
            protocol: default_elm_protocol(),
            checksum: default_true(),
            allow_long: default_true(),
        }
    }
}

fn default_elm_protocol() -> u8 {
    2
}

fn default_true() -> bool {
    true
}
