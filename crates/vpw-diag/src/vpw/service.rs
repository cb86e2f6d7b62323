//! VPW service layer for diagnostic communication

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use super::{
    block_id, functional_address, mode, priority, Codec, Header, Message, ProtocolError,
};
use crate::config::{ConfigError, RequestDefaults, VpwConfig};
use crate::error::VpwError;
use crate::events::{Event, EventSink, TracingSink};
use crate::params::{Dpid, DpidRegistry, Parameter};
use crate::transport::{Frame, Transport};

/// Characters in a vehicle identification number
pub const VIN_LEN: usize = 17;

/// VIN characters stored in block 1, after the pad byte
const VIN_BLOCK_1_CHARS: usize = 5;
/// VIN characters stored in block 2
const VIN_BLOCK_2_CHARS: usize = 6;

/// Service layer over one [`Transport`]
///
/// Every call is one exchange at a time; wrap the transport in a
/// [`SharedTransport`](crate::transport::SharedTransport) when several owners
/// need to talk to the same adapter.
pub struct VpwClient<T> {
    transport: T,
    codec: Codec,
    defaults: RequestDefaults,
    dpids: DpidRegistry,
}

impl<T: Transport> VpwClient<T> {
    pub fn new(transport: T) -> Self {
        Self::with_codec(transport, Codec::default())
    }

    /// Create a client whose codec reports to a custom event sink
    pub fn with_codec(transport: T, codec: Codec) -> Self {
        Self {
            transport,
            codec,
            defaults: RequestDefaults::default(),
            dpids: DpidRegistry::default(),
        }
    }

    /// Create a client with the request defaults and packet planning of `config`
    pub fn from_config(transport: T, config: &VpwConfig) -> Self {
        Self::from_config_with_events(transport, config, Arc::new(TracingSink))
    }

    /// Like [`VpwClient::from_config`], reporting to `events`
    pub fn from_config_with_events(
        transport: T,
        config: &VpwConfig,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            transport,
            codec: Codec::new(events),
            defaults: config.defaults,
            dpids: DpidRegistry::new(&config.dpid),
        }
    }

    pub fn with_defaults(mut self, defaults: RequestDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> &RequestDefaults {
        &self.defaults
    }

    pub fn events(&self) -> &Arc<dyn EventSink> {
        self.codec.events()
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Packets defined through this client
    pub fn dpids(&self) -> &DpidRegistry {
        &self.dpids
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Build a message addressed with the client defaults
    pub fn message(&self, mode: u8, request: &[u8], data: &[u8]) -> Result<Message, VpwError> {
        Ok(Message::with_header(
            self.defaults.header(),
            mode,
            request,
            data,
        )?)
    }

    /// Hand `request` to the transport and return the raw frames
    pub fn send(&mut self, request: &Message) -> Result<Vec<Frame>, VpwError> {
        self.events().emit(Event::MessageSent {
            header: request.header(),
            payload: request.to_hex(),
        });

        let frames = self.transport.send(request)?;
        self.events().emit(Event::FramesReceived {
            count: frames.len(),
        });
        Ok(frames)
    }

    /// Send and validate the first reply addressed to us
    pub fn exchange(&mut self, request: &Message) -> Result<Message, VpwError> {
        self.first_response(request, Codec::validate)
    }

    /// Send a functionally addressed request and validate the first reply
    pub fn exchange_functional(&mut self, request: &Message) -> Result<Message, VpwError> {
        self.first_response(request, Codec::validate_functional)
    }

    /// Send and reassemble a multi-frame reply
    pub fn exchange_multi(&mut self, request: &Message) -> Result<Message, VpwError> {
        let frames = self.send(request)?;
        let response = self.codec.reassemble(request, &frames)?;
        self.codec.validate(request, &response)?;
        Ok(response)
    }

    /// First frame that decodes and passes `validate`.
    ///
    /// Undecodable frames and frames from other nodes are skipped. Any other
    /// validation failure (negative response, wrong mode or echo) is returned.
    fn first_response(
        &mut self,
        request: &Message,
        validate: fn(&Codec, &Message, &Message) -> Result<(), VpwError>,
    ) -> Result<Message, VpwError> {
        let frames = self.send(request)?;
        let request_len = request.request().len();
        let mut misaddressed = None;

        for frame in &frames {
            let skipped = match Message::decode(frame, request_len) {
                Ok(message) => match validate(&self.codec, request, &message) {
                    Ok(()) => return Ok(message),
                    Err(VpwError::Protocol(e @ ProtocolError::AddressMismatch { .. })) => {
                        let reason = e.to_string();
                        misaddressed.get_or_insert(e);
                        reason
                    }
                    Err(e) => return Err(e),
                },
                Err(e) => e.to_string(),
            };
            self.events().emit(Event::FrameSkipped {
                frame: hex::encode_upper(frame),
                reason: skipped,
            });
        }
        Err(misaddressed.unwrap_or(ProtocolError::NoResponse).into())
    }

    /// Read one parameter (mode $22 or $23) and decode it
    pub fn request_parameter(&mut self, parameter: &Parameter) -> Result<Value, VpwError> {
        let request = parameter.request(&self.defaults);
        let response = self.exchange(&request)?;
        let raw = take(response.data(), usize::from(parameter.size()))?;
        Ok(parameter.decode(raw))
    }

    /// Legislated OBD PID (J1979 mode $01), functionally addressed
    pub fn request_obd_pid(&mut self, pid: u8, size: usize) -> Result<Vec<u8>, VpwError> {
        let header = Header::new(
            priority::FUNCTIONAL,
            functional_address::OBD_REQUEST,
            self.defaults.source,
        );
        let request = Message::with_header(header, mode::GET_PID, &[pid], &[])?;
        let response = self.exchange_functional(&request)?;
        Ok(take(response.data(), size)?.to_vec())
    }

    /// Define `dpid` on the controller (mode $2C), one message per parameter
    pub fn define_dpid(&mut self, dpid: &Dpid) -> Result<(), VpwError> {
        for message in dpid.config(&self.defaults) {
            // the echoed submode must be the packet id
            self.exchange(&message)?;
        }

        self.dpids.insert(dpid.clone());
        self.events().emit(Event::PacketDefined {
            dpid: dpid.id(),
            parameters: dpid.parameters().len(),
        });
        Ok(())
    }

    /// Plan packets for `parameters` after the ones already defined, and define them
    pub fn setup_dpids(&mut self, parameters: &[Parameter]) -> Result<Vec<Dpid>, VpwError> {
        let planned = self.dpids.plan(parameters, &self.defaults)?;
        for dpid in &planned {
            self.define_dpid(dpid)?;
        }
        info!(count = planned.len(), "DPIDs set up");
        Ok(planned)
    }

    /// Poll a defined packet once (mode $2A) and decode every parameter
    pub fn poll_dpid<'a>(
        &mut self,
        dpid: &'a Dpid,
    ) -> Result<Vec<(&'a Parameter, Value)>, VpwError> {
        let request = dpid.request(&self.defaults);
        let response = self.exchange(&request)?;
        dpid.decode(&response)
    }

    /// Read a data block (mode $3C)
    pub fn read_block(&mut self, block: u8) -> Result<Vec<u8>, VpwError> {
        let request = self.message(mode::READ_BLOCK, &[block], &[])?;
        let response = self.exchange(&request)?;
        debug!(
            block = format!("0x{:02X}", block),
            len = response.data().len(),
            "Block read"
        );
        Ok(response.data().to_vec())
    }

    /// Write a data block (mode $3B); the reply must echo the block id
    pub fn write_block(&mut self, block: u8, data: &[u8]) -> Result<(), VpwError> {
        let request = self.message(mode::WRITE_BLOCK, &[block], data)?;
        self.exchange(&request)?;
        debug!(block = format!("0x{:02X}", block), "Block written");
        Ok(())
    }

    /// VIN from blocks 1-3; block 1 starts with a pad byte
    pub fn read_vin(&mut self) -> Result<String, VpwError> {
        let first = self.read_block(block_id::VIN_1)?;
        let mut bytes = first.get(1..).unwrap_or_default().to_vec();
        bytes.extend(self.read_block(block_id::VIN_2)?);
        bytes.extend(self.read_block(block_id::VIN_3)?);

        String::from_utf8(bytes).map_err(|e| {
            ProtocolError::Malformed(format!(
                "VIN is not ASCII: {}",
                hex::encode_upper(e.as_bytes())
            ))
            .into()
        })
    }

    /// Write the VIN across blocks 1-3. The controller must already be unlocked.
    pub fn write_vin(&mut self, vin: &str) -> Result<(), VpwError> {
        validate_vin(vin)?;
        let bytes = vin.as_bytes();
        let (head, rest) = bytes.split_at(VIN_BLOCK_1_CHARS);
        let (middle, tail) = rest.split_at(VIN_BLOCK_2_CHARS);

        let mut block1 = vec![0x00];
        block1.extend_from_slice(head);
        self.write_block(block_id::VIN_1, &block1)?;
        self.write_block(block_id::VIN_2, middle)?;
        self.write_block(block_id::VIN_3, tail)?;

        info!(vin, "VIN written");
        Ok(())
    }

    /// Operating system id from block $0A, as a big-endian integer
    pub fn read_osid(&mut self) -> Result<u32, VpwError> {
        let data = self.read_block(block_id::OSID)?;
        if data.is_empty() || data.len() > 4 {
            return Err(ProtocolError::Malformed(format!(
                "OSID block has {} bytes",
                data.len()
            ))
            .into());
        }
        Ok(data.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
    }
}

fn take(data: &[u8], size: usize) -> Result<&[u8], ProtocolError> {
    data.get(..size).ok_or(ProtocolError::ShortPayload {
        expected: size,
        actual: data.len(),
    })
}

/// 17 characters from `A-H J-N P R-Z 0-9` (no I, O or Q)
pub fn validate_vin(vin: &str) -> Result<(), ConfigError> {
    let valid = |c: char| c.is_ascii_digit() || (c.is_ascii_uppercase() && !"IOQ".contains(c));

    if vin.len() != VIN_LEN || !vin.chars().all(valid) {
        return Err(ConfigError::InvalidValue(format!("invalid VIN: {:?}", vin)));
    }
    Ok(())
}
