//! Response validation and multi-frame reassembly

use std::sync::Arc;

use super::{functional_address, AssemblyError, Message, NegativeResponseCode, ProtocolError};
use crate::error::VpwError;
use crate::events::{Event, EventSink, TracingSink};

const HEADER_LEN: usize = 3;

/// Validates responses against the request that produced them and
/// reassembles multi-frame payloads, reporting anomalies to an [`EventSink`]
#[derive(Clone)]
pub struct Codec {
    events: Arc<dyn EventSink>,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl Codec {
    pub fn new(events: Arc<dyn EventSink>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &Arc<dyn EventSink> {
        &self.events
    }

    pub fn validate(&self, request: &Message, response: &Message) -> Result<(), VpwError> {
        validate(request, response, self.events.as_ref())
    }

    pub fn validate_functional(
        &self,
        request: &Message,
        response: &Message,
    ) -> Result<(), VpwError> {
        validate_functional(request, response, self.events.as_ref())
    }

    pub fn reassemble(&self, request: &Message, frames: &[Vec<u8>]) -> Result<Message, VpwError> {
        reassemble(request, frames, self.events.as_ref())
    }
}

/// Check that `response` answers `request`.
///
/// Order of checks: address swap, priority (tolerated, reported), mode,
/// negative response code, request echo.
pub fn validate(
    request: &Message,
    response: &Message,
    events: &dyn EventSink,
) -> Result<(), VpwError> {
    if response.target() != request.source() || response.source() != request.target() {
        return Err(ProtocolError::AddressMismatch {
            expected_target: request.source(),
            expected_source: request.target(),
            target: response.target(),
            responder: response.source(),
        }
        .into());
    }

    check_payload(request, response, events)
}

/// Check a reply to a functionally addressed (J1979) request.
///
/// Functional replies come from whichever node answers, addressed to the
/// functional response address instead of back to the requester.
pub fn validate_functional(
    request: &Message,
    response: &Message,
    events: &dyn EventSink,
) -> Result<(), VpwError> {
    if response.target() != functional_address::OBD_RESPONSE {
        return Err(ProtocolError::AddressMismatch {
            expected_target: functional_address::OBD_RESPONSE,
            expected_source: response.source(),
            target: response.target(),
            responder: response.source(),
        }
        .into());
    }

    check_payload(request, response, events)
}

fn check_payload(
    request: &Message,
    response: &Message,
    events: &dyn EventSink,
) -> Result<(), VpwError> {
    if response.priority() != request.priority() {
        events.emit(Event::PriorityMismatch {
            expected: request.priority(),
            actual: response.priority(),
        });
    }

    if response.is_negative_response() {
        let nrc = response.nrc_byte().map(NegativeResponseCode::from).ok_or_else(|| {
            ProtocolError::Malformed("negative response without NRC".to_string())
        })?;

        return Err(match nrc.security_error() {
            Some(err) => err.into(),
            None => ProtocolError::UnknownNrc {
                mode: request.mode(),
                nrc,
            }
            .into(),
        });
    }

    if response.mode() != request.positive_response_mode() {
        return Err(ProtocolError::UnexpectedMode {
            expected: request.positive_response_mode(),
            actual: response.mode(),
        }
        .into());
    }

    if response.request() != request.request() {
        return Err(ProtocolError::RequestEchoMismatch {
            expected: request.request().to_vec(),
            actual: response.request().to_vec(),
        }
        .into());
    }

    Ok(())
}

/// Join the payloads of a multi-frame response.
///
/// Every frame is `header ‖ mode ‖ request echo ‖ index ‖ payload`. Frames whose
/// prefix differs from the first frame's are skipped; indices must run 1, 2, 3...
/// in arrival order.
pub fn reassemble(
    request: &Message,
    frames: &[Vec<u8>],
    events: &dyn EventSink,
) -> Result<Message, VpwError> {
    let prefix_len = HEADER_LEN + 1 + request.request().len();

    let mut reference: Option<&[u8]> = None;
    let mut retained: Vec<&[u8]> = Vec::with_capacity(frames.len());

    for frame in frames {
        if frame.len() <= prefix_len {
            events.emit(Event::FrameSkipped {
                frame: hex::encode_upper(frame),
                reason: format!("shorter than {} bytes", prefix_len + 1),
            });
            continue;
        }

        let prefix = &frame[..prefix_len];
        match reference {
            None => reference = Some(prefix),
            Some(expected) if expected != prefix => {
                events.emit(Event::FrameSkipped {
                    frame: hex::encode_upper(frame),
                    reason: format!("prefix differs from {}", hex::encode_upper(expected)),
                });
                continue;
            }
            Some(_) => {}
        }
        retained.push(frame.as_slice());
    }

    let Some(first) = retained.first() else {
        return Err(AssemblyError::Empty.into());
    };

    let mut payload = Vec::new();
    for (position, frame) in retained.iter().enumerate() {
        let expected = u8::try_from(position + 1).unwrap_or(u8::MAX);
        let found = frame[prefix_len];
        if found != expected {
            return Err(AssemblyError::SequenceGap { expected, found }.into());
        }
        payload.extend_from_slice(&frame[prefix_len + 1..]);
    }

    if payload.is_empty() {
        return Err(AssemblyError::Empty.into());
    }

    let head = Message::decode(&first[..prefix_len], request.request().len())?;
    Ok(Message::with_header(
        head.header(),
        head.mode(),
        head.request(),
        &payload,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use crate::vpw::{Header, SecurityError};
    use pretty_assertions::assert_eq;

    fn request() -> Message {
        Message::new(0x6C, 0x10, 0xF0, 0x3C, &[0x01], &[]).unwrap()
    }

    fn reply(mode: u8, request: &[u8], data: &[u8]) -> Message {
        Message::new(0x6C, 0xF0, 0x10, mode, request, data).unwrap()
    }

    #[test]
    fn test_validate_positive_response() {
        let sink = RecordingSink::new();
        let response = reply(0x7C, &[0x01], &[0x00, b'1', b'G']);
        validate(&request(), &response, &sink).unwrap();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_validate_rejects_unswapped_addresses() {
        let sink = RecordingSink::new();
        let response = Message::new(0x6C, 0x10, 0xF0, 0x7C, &[0x01], &[]).unwrap();
        let err = validate(&request(), &response, &sink).unwrap_err();
        assert!(matches!(
            err,
            VpwError::Protocol(ProtocolError::AddressMismatch { .. })
        ));

        let other_node = Message::new(0x6C, 0xF0, 0x18, 0x7C, &[0x01], &[]).unwrap();
        assert!(matches!(
            validate(&request(), &other_node, &sink).unwrap_err(),
            VpwError::Protocol(ProtocolError::AddressMismatch { responder: 0x18, .. })
        ));
    }

    #[test]
    fn test_validate_reports_priority_mismatch() {
        let sink = RecordingSink::new();
        let response = Message::new(0x48, 0xF0, 0x10, 0x7C, &[0x01], &[0xAA]).unwrap();
        validate(&request(), &response, &sink).unwrap();
        assert_eq!(
            sink.events(),
            vec![Event::PriorityMismatch {
                expected: 0x6C,
                actual: 0x48
            }]
        );
    }

    #[test]
    fn test_validate_functional_reply() {
        let request = Message::new(0x68, 0x6A, 0xF0, 0x01, &[0x0C], &[]).unwrap();
        let response = Message::new(0x48, 0x6B, 0x10, 0x41, &[0x0C], &[0x1A]).unwrap();
        let sink = RecordingSink::new();
        validate_functional(&request, &response, &sink).unwrap();
        assert_eq!(sink.events().len(), 1);

        let misrouted = Message::new(0x48, 0xF0, 0x10, 0x41, &[0x0C], &[0x1A]).unwrap();
        assert!(validate_functional(&request, &misrouted, &sink).is_err());
    }

    #[test]
    fn test_validate_unexpected_mode() {
        let err = validate(&request(), &reply(0x7B, &[0x01], &[]), &TracingSink).unwrap_err();
        assert!(matches!(
            err,
            VpwError::Protocol(ProtocolError::UnexpectedMode {
                expected: 0x7C,
                actual: 0x7B
            })
        ));
    }

    #[test]
    fn test_validate_negative_response_codes() {
        let denied = reply(0x7F, &[0x3C], &[0x01, 0x33]);
        assert!(matches!(
            validate(&request(), &denied, &TracingSink).unwrap_err(),
            VpwError::Security(SecurityError::AccessDenied)
        ));

        let delay = reply(0x7F, &[0x3C], &[0x01, 0x37]);
        assert!(matches!(
            validate(&request(), &delay, &TracingSink).unwrap_err(),
            VpwError::Security(SecurityError::TimeDelayNotExpired)
        ));

        let out_of_range = reply(0x7F, &[0x3C], &[0x01, 0x31]);
        match validate(&request(), &out_of_range, &TracingSink).unwrap_err() {
            VpwError::Protocol(ProtocolError::UnknownNrc { mode, nrc }) => {
                assert_eq!(mode, 0x3C);
                assert_eq!(nrc, NegativeResponseCode::RequestOutOfRange);
            }
            other => panic!("Expected UnknownNrc, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_request_echo() {
        let err = validate(&request(), &reply(0x7C, &[0x02], &[]), &TracingSink).unwrap_err();
        match err {
            VpwError::Protocol(ProtocolError::RequestEchoMismatch { expected, actual }) => {
                assert_eq!(expected, vec![0x01]);
                assert_eq!(actual, vec![0x02]);
            }
            other => panic!("Expected RequestEchoMismatch, got {:?}", other),
        }
    }

    fn frame(index: u8, payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![0x6C, 0xF0, 0x10, 0x7C, 0x01, index];
        frame.extend_from_slice(payload);
        frame
    }

    #[test]
    fn test_reassemble_in_order() {
        let frames = vec![
            frame(1, &[0xAA, 0xBB]),
            frame(2, &[0xCC]),
            frame(3, &[0xDD, 0xEE]),
        ];
        let message = reassemble(&request(), &frames, &TracingSink).unwrap();
        assert_eq!(message.header(), Header::new(0x6C, 0xF0, 0x10));
        assert_eq!(message.mode(), 0x7C);
        assert_eq!(message.request(), &[0x01]);
        assert_eq!(message.data(), &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE]);
    }

    #[test]
    fn test_reassemble_sequence_gap() {
        let frames = vec![frame(1, &[0xAA]), frame(3, &[0xCC])];
        let err = reassemble(&request(), &frames, &TracingSink).unwrap_err();
        assert!(matches!(
            err,
            VpwError::Assembly(AssemblyError::SequenceGap {
                expected: 2,
                found: 3
            })
        ));
    }

    #[test]
    fn test_reassemble_must_start_at_one() {
        let frames = vec![frame(2, &[0xAA])];
        assert!(matches!(
            reassemble(&request(), &frames, &TracingSink).unwrap_err(),
            VpwError::Assembly(AssemblyError::SequenceGap {
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn test_reassemble_skips_foreign_frames() {
        let sink = RecordingSink::new();
        let mut foreign = frame(2, &[0x99]);
        foreign[2] = 0x18;
        let frames = vec![frame(1, &[0xAA]), foreign, frame(2, &[0xBB]), vec![0x6C]];

        let message = reassemble(&request(), &frames, &sink).unwrap();
        assert_eq!(message.data(), &[0xAA, 0xBB]);
        assert_eq!(sink.events().len(), 2);
        assert!(sink
            .events()
            .iter()
            .all(|e| matches!(e, Event::FrameSkipped { .. })));
    }

    #[test]
    fn test_reassemble_empty() {
        assert!(matches!(
            reassemble(&request(), &[], &TracingSink).unwrap_err(),
            VpwError::Assembly(AssemblyError::Empty)
        ));

        let index_only = vec![frame(1, &[]), frame(2, &[])];
        assert!(matches!(
            reassemble(&request(), &index_only, &TracingSink).unwrap_err(),
            VpwError::Assembly(AssemblyError::Empty)
        ));

        let truncated = vec![vec![0x6C, 0xF0, 0x10, 0x7C, 0x01]];
        assert!(matches!(
            reassemble(&request(), &truncated, &TracingSink).unwrap_err(),
            VpwError::Assembly(AssemblyError::Empty)
        ));
    }
}
