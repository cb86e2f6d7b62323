//! Single sensor parameters

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::config::RequestDefaults;
use crate::vpw::{mode, Message};

/// Maps the raw response bytes of a parameter to a domain value
pub type DecodeFn = Arc<dyn Fn(&[u8]) -> Value + Send + Sync>;

/// Parameter identifier: a 2 byte PID or a 3 byte memory address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterId {
    Pid([u8; 2]),
    Address([u8; 3]),
}

impl ParameterId {
    pub fn pid(pid: u16) -> Self {
        Self::Pid(pid.to_be_bytes())
    }

    /// Memory address; only the low 24 bits are used
    pub fn address(address: u32) -> Self {
        let [_, high, mid, low] = address.to_be_bytes();
        Self::Address([high, mid, low])
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Pid(bytes) => bytes,
            Self::Address(bytes) => bytes,
        }
    }

    /// Request mode: $22 get-by-PID, $23 get-by-address
    pub fn request_mode(&self) -> u8 {
        match self {
            Self::Pid(_) => mode::GET_BY_PID,
            Self::Address(_) => mode::GET_BY_ADDRESS,
        }
    }

    /// Addressing type field of the DPID control byte (bits 7-6)
    pub fn addressing_type(&self) -> u8 {
        match self {
            Self::Pid(_) => 0b01,
            Self::Address(_) => 0b10,
        }
    }
}

impl TryFrom<&[u8]> for ParameterId {
    type Error = usize;

    /// Fails with the offending length unless given 2 or 3 bytes
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        match *bytes {
            [high, low] => Ok(Self::Pid([high, low])),
            [high, mid, low] => Ok(Self::Address([high, mid, low])),
            _ => Err(bytes.len()),
        }
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode_upper(self.as_bytes()))
    }
}

/// A named sensor reading the controller can return
#[derive(Clone)]
pub struct Parameter {
    name: String,
    id: ParameterId,
    size: u8,
    decoder: Option<DecodeFn>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, id: ParameterId, size: u8) -> Self {
        Self {
            name: name.into(),
            id,
            size,
            decoder: None,
        }
    }

    pub fn with_decoder(
        mut self,
        decoder: impl Fn(&[u8]) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.decoder = Some(Arc::new(decoder));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> ParameterId {
        self.id
    }

    /// Number of response data bytes
    pub fn size(&self) -> u8 {
        self.size
    }

    pub fn has_decoder(&self) -> bool {
        self.decoder.is_some()
    }

    /// Single-parameter poll: mode $22/$23, identifier as submode, rate as data
    pub fn request(&self, defaults: &RequestDefaults) -> Message {
        Message::from_parts(
            defaults.header(),
            self.id.request_mode(),
            self.id.as_bytes().to_vec(),
            vec![defaults.rate],
        )
    }

    /// Apply the decoder, or render the bytes as lowercase hex when none is set
    pub fn decode(&self, raw: &[u8]) -> Value {
        match self.decoder {
            Some(ref decoder) => decoder(raw),
            None => Value::String(hex::encode(raw)),
        }
    }
}

impl PartialEq for Parameter {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.size == other.size && self.name == other.name
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("size", &self.size)
            .field("decoder", &self.decoder.is_some())
            .finish()
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
