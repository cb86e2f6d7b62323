//! VPW message layout

use std::fmt;

use super::{mode, ProtocolError};

/// Longest request/submode a message may carry (bounded by the DPID control byte format)
pub const MAX_REQUEST_LEN: usize = 3;

const HEADER_LEN: usize = 3;

/// 3 byte J1850 header (SAE J2178-1 5.4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    pub priority: u8,
    pub target: u8,
    pub source: u8,
}

impl Header {
    pub fn new(priority: u8, target: u8, source: u8) -> Self {
        Self {
            priority,
            target,
            source,
        }
    }

    pub fn to_bytes(self) -> [u8; 3] {
        [self.priority, self.target, self.source]
    }

    /// Header a responder would use to answer this one
    pub fn reply(self) -> Self {
        Self {
            priority: self.priority,
            target: self.source,
            source: self.target,
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}{:02X}{:02X}",
            self.priority, self.target, self.source
        )
    }
}

/// A single VPW message: header, mode, echoed request/submode and data
///
/// Payload on the wire is `mode ‖ request ‖ data`; the header travels
/// out-of-band through the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Message {
    header: Header,
    mode: u8,
    request: Vec<u8>,
    data: Vec<u8>,
}

impl Message {
    pub fn new(
        priority: u8,
        target: u8,
        source: u8,
        mode: u8,
        request: &[u8],
        data: &[u8],
    ) -> Result<Self, ProtocolError> {
        Self::with_header(Header::new(priority, target, source), mode, request, data)
    }

    pub fn with_header(
        header: Header,
        mode: u8,
        request: &[u8],
        data: &[u8],
    ) -> Result<Self, ProtocolError> {
        if request.len() > MAX_REQUEST_LEN {
            return Err(ProtocolError::RequestTooLong(request.len()));
        }

        Ok(Self {
            header,
            mode,
            request: request.to_vec(),
            data: data.to_vec(),
        })
    }

    /// Build from parts whose request length the caller already bounds
    pub(crate) fn from_parts(header: Header, mode: u8, request: Vec<u8>, data: Vec<u8>) -> Self {
        debug_assert!(request.len() <= MAX_REQUEST_LEN);
        Self {
            header,
            mode,
            request,
            data,
        }
    }

    /// Decode a frame (`header ‖ mode ‖ request ‖ data`, no checksum).
    ///
    /// `request_len` is the submode length of the request that produced the
    /// frame; the responder echoes exactly that many bytes.
    pub fn decode(frame: &[u8], request_len: usize) -> Result<Self, ProtocolError> {
        if request_len > MAX_REQUEST_LEN {
            return Err(ProtocolError::RequestTooLong(request_len));
        }

        let data_start = HEADER_LEN + 1 + request_len;
        if frame.len() < data_start {
            return Err(ProtocolError::Malformed(format!(
                "frame {} shorter than {} bytes",
                hex::encode_upper(frame),
                data_start
            )));
        }

        Ok(Self {
            header: Header::new(frame[0], frame[1], frame[2]),
            mode: frame[HEADER_LEN],
            request: frame[HEADER_LEN + 1..data_start].to_vec(),
            data: frame[data_start..].to_vec(),
        })
    }

    pub fn header(&self) -> Header {
        self.header
    }

    pub fn priority(&self) -> u8 {
        self.header.priority
    }

    pub fn target(&self) -> u8 {
        self.header.target
    }

    pub fn source(&self) -> u8 {
        self.header.source
    }

    pub fn mode(&self) -> u8 {
        self.mode
    }

    /// Request/submode bytes, echoed by the responder
    pub fn request(&self) -> &[u8] {
        &self.request
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Wire payload: `mode ‖ request ‖ data`
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + self.request.len() + self.data.len());
        bytes.push(self.mode);
        bytes.extend_from_slice(&self.request);
        bytes.extend_from_slice(&self.data);
        bytes
    }

    /// Header followed by the payload, as a transport reports a frame
    pub fn to_frame(&self) -> Vec<u8> {
        let mut frame = self.header.to_bytes().to_vec();
        frame.extend(self.encode());
        frame
    }

    /// Payload rendered as ASCII hex for transmission
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.encode())
    }

    /// Mode a positive reply to this message carries
    pub fn positive_response_mode(&self) -> u8 {
        self.mode.wrapping_add(mode::POSITIVE_RESPONSE_OFFSET)
    }

    pub fn is_negative_response(&self) -> bool {
        self.mode == mode::NEGATIVE_RESPONSE
    }

    /// Trailing NRC byte of a negative response
    pub fn nrc_byte(&self) -> Option<u8> {
        if !self.is_negative_response() {
            return None;
        }
        self.data
            .last()
            .or_else(|| self.request.last())
            .copied()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.header, self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vpw::{physical_address, priority};
    use pretty_assertions::assert_eq;

    fn unlock_request() -> Message {
        Message::new(
            priority::PHYSICAL,
            physical_address::PCM,
            physical_address::SCAN_TOOL,
            mode::SECURITY_ACCESS,
            &[0x02],
            &[0xC7, 0xA2],
        )
        .unwrap()
    }

    #[test]
    fn test_encode_layout() {
        let msg = unlock_request();
        assert_eq!(msg.header().to_bytes(), [0x6C, 0x10, 0xF0]);
        assert_eq!(msg.encode(), vec![0x27, 0x02, 0xC7, 0xA2]);
        assert_eq!(msg.to_hex(), "2702C7A2");
        assert_eq!(msg.to_string(), "6C10F0 2702C7A2");
    }

    #[test]
    fn test_decode_inverts_encode() {
        let msg = unlock_request();
        let decoded = Message::decode(&msg.to_frame(), msg.request().len()).unwrap();
        assert_eq!(decoded, msg);

        let empty = Message::new(0x68, 0x6A, 0xF0, 0x01, &[], &[]).unwrap();
        assert_eq!(Message::decode(&empty.to_frame(), 0).unwrap(), empty);

        let full = Message::new(0x6C, 0x10, 0xF0, 0x23, &[0x02, 0x41, 0x70], &[0x01]).unwrap();
        assert_eq!(Message::decode(&full.to_frame(), 3).unwrap(), full);
    }

    #[test]
    fn test_request_limited_to_three_bytes() {
        let err = Message::new(0x6C, 0x10, 0xF0, 0x22, &[1, 2, 3, 4], &[]).unwrap_err();
        assert_eq!(err, ProtocolError::RequestTooLong(4));
    }

    #[test]
    fn test_decode_short_frame() {
        let err = Message::decode(&[0x6C, 0xF0, 0x10, 0x67], 1).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn test_nrc_byte() {
        let negative = Message::decode(&[0x6C, 0xF0, 0x10, 0x7F, 0x27, 0x02, 0x35], 1).unwrap();
        assert!(negative.is_negative_response());
        assert_eq!(negative.nrc_byte(), Some(0x35));

        let short = Message::decode(&[0x6C, 0xF0, 0x10, 0x7F, 0x33], 1).unwrap();
        assert_eq!(short.nrc_byte(), Some(0x33));

        assert_eq!(unlock_request().nrc_byte(), None);
    }

    #[test]
    fn test_reply_header_swaps_addresses() {
        let header = Header::new(0x6C, 0x10, 0xF0);
        assert_eq!(header.reply(), Header::new(0x6C, 0xF0, 0x10));
    }
}
