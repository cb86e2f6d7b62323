//! Diagnostic data packets (DPIDs)
//!
//! A DPID bundles several parameters into one polled response. The packet
//! is defined with one mode $2C message per parameter (SAE J2190 5.19):
//!
//! ```text
//! bit 7-6: addressing type   01 = PID, 10 = memory address
//! bit 5-3: start offset      byte index of the value within the packet
//! bit 2-0: response size     number of value bytes
//! ```
//!
//! The controller packs values in definition order, so decoding walks the
//! parameters in that same order.

use serde_json::Value;
use thiserror::Error;

use super::Parameter;
use crate::config::RequestDefaults;
use crate::error::VpwError;
use crate::vpw::{mode, Message, ProtocolError};

/// Largest value the 3 bit offset and size fields can hold
pub const MAX_FIELD: u8 = 0b111;

/// Offset of the first value byte; byte 0 of the packet is the DPID itself
const FIRST_OFFSET: u8 = 1;

/// Packet definitions the control byte format cannot express
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("DPID 0x{0:02X} has no parameters")]
    Empty(u8),

    #[error("Parameter {name} size {size} outside 1..=7")]
    InvalidSize { name: String, size: u8 },

    #[error("Parameter {name} would start at offset {offset} (max 7)")]
    OffsetOverflow { name: String, offset: u8 },

    #[error("No DPID identifiers left after 0x{0:02X}")]
    IdsExhausted(u8),
}

/// An ordered bundle of parameters polled as one packet
#[derive(Debug, Clone)]
pub struct Dpid {
    id: u8,
    parameters: Vec<Parameter>,
    poll_defaults: RequestDefaults,
    poll: Message,
}

impl Dpid {
    pub fn new(id: u8, parameters: Vec<Parameter>) -> Result<Self, PacketError> {
        Self::with_defaults(id, parameters, RequestDefaults::default())
    }

    /// Build a packet whose cached poll message uses `defaults`
    pub fn with_defaults(
        id: u8,
        parameters: Vec<Parameter>,
        defaults: RequestDefaults,
    ) -> Result<Self, PacketError> {
        if parameters.is_empty() {
            return Err(PacketError::Empty(id));
        }
        start_offsets(&parameters)?;

        Ok(Self {
            id,
            poll: poll_message(id, &defaults),
            poll_defaults: defaults,
            parameters,
        })
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn contains(&self, parameter: &Parameter) -> bool {
        self.parameters.contains(parameter)
    }

    /// Value bytes a poll response carries after the DPID
    pub fn payload_len(&self) -> usize {
        self.parameters.iter().map(|p| usize::from(p.size())).sum()
    }

    /// Control byte for every parameter, in definition order
    pub fn control_bytes(&self) -> Vec<u8> {
        let mut offset = FIRST_OFFSET;
        self.parameters
            .iter()
            .map(|p| {
                let control = p.id().addressing_type() << 6 | offset << 3 | p.size();
                offset += p.size();
                control
            })
            .collect()
    }

    /// Mode $2C definition messages, one per parameter
    pub fn config(&self, defaults: &RequestDefaults) -> Vec<Message> {
        self.parameters
            .iter()
            .zip(self.control_bytes())
            .map(|(p, control)| {
                let mut data = Vec::with_capacity(1 + p.id().as_bytes().len());
                data.push(control);
                data.extend_from_slice(p.id().as_bytes());
                Message::from_parts(defaults.header(), mode::DEFINE_DPID, vec![self.id], data)
            })
            .collect()
    }

    /// Mode $2A poll message: DPID as submode, rate as data
    pub fn request(&self, defaults: &RequestDefaults) -> Message {
        if *defaults == self.poll_defaults {
            return self.poll.clone();
        }
        poll_message(self.id, defaults)
    }

    /// Split a poll response into per-parameter values, in definition order
    pub fn decode<'a>(&'a self, response: &Message) -> Result<Vec<(&'a Parameter, Value)>, VpwError> {
        if response.request() != [self.id] {
            return Err(ProtocolError::RequestEchoMismatch {
                expected: vec![self.id],
                actual: response.request().to_vec(),
            }
            .into());
        }

        let data = response.data();
        if data.len() < self.payload_len() {
            return Err(ProtocolError::ShortPayload {
                expected: self.payload_len(),
                actual: data.len(),
            }
            .into());
        }

        let mut read = 0;
        Ok(self
            .parameters
            .iter()
            .map(|p| {
                let end = read + usize::from(p.size());
                let value = p.decode(&data[read..end]);
                read = end;
                (p, value)
            })
            .collect())
    }
}

fn poll_message(id: u8, defaults: &RequestDefaults) -> Message {
    Message::from_parts(
        defaults.header(),
        mode::REQUEST_DPID,
        vec![id],
        vec![defaults.rate],
    )
}

/// Start offset of each parameter, checked against the 3 bit fields
fn start_offsets(parameters: &[Parameter]) -> Result<Vec<u8>, PacketError> {
    let mut offset = FIRST_OFFSET;
    let mut offsets = Vec::with_capacity(parameters.len());

    for p in parameters {
        if p.size() == 0 || p.size() > MAX_FIELD {
            return Err(PacketError::InvalidSize {
                name: p.name().to_string(),
                size: p.size(),
            });
        }
        if offset > MAX_FIELD {
            return Err(PacketError::OffsetOverflow {
                name: p.name().to_string(),
                offset,
            });
        }
        offsets.push(offset);
        offset += p.size();
    }

    Ok(offsets)
}

/// Split `parameters` into consecutive packets starting at id `first_id`.
///
/// A packet is closed when it holds `max_parameters` entries or when the next
/// parameter would start past offset 7.
pub fn plan_dpids(
    parameters: &[Parameter],
    first_id: u8,
    max_parameters: usize,
    defaults: &RequestDefaults,
) -> Result<Vec<Dpid>, PacketError> {
    let max_parameters = max_parameters.max(1);
    let mut groups: Vec<Vec<Parameter>> = Vec::new();
    let mut current: Vec<Parameter> = Vec::new();
    let mut offset = FIRST_OFFSET;

    for p in parameters {
        if p.size() == 0 || p.size() > MAX_FIELD {
            return Err(PacketError::InvalidSize {
                name: p.name().to_string(),
                size: p.size(),
            });
        }
        if !current.is_empty() && (current.len() >= max_parameters || offset > MAX_FIELD) {
            groups.push(std::mem::take(&mut current));
            offset = FIRST_OFFSET;
        }
        offset += p.size();
        current.push(p.clone());
    }
    if !current.is_empty() {
        groups.push(current);
    }

    let mut id = first_id;
    let mut dpids = Vec::with_capacity(groups.len());
    for (index, group) in groups.into_iter().enumerate() {
        if index > 0 {
            id = id.checked_add(1).ok_or(PacketError::IdsExhausted(id))?;
        }
        dpids.push(Dpid::with_defaults(id, group, *defaults)?);
    }

    Ok(dpids)
}
