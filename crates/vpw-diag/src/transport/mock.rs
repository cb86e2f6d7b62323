//! Mock transport for testing

use std::collections::VecDeque;

use super::{Frame, Transport, TransportError};
use crate::vpw::{mode, Header, Message};

/// Scripted transport that records everything it is asked to send
///
/// Replies are chosen in this order: one-shot queued replies, exact payload
/// matches, payload prefix matches, then a bare positive echo
/// (`mode + 0x40 ‖ request`) from the addressed node.
#[derive(Debug)]
pub struct MockTransport {
    connected: bool,
    header: Option<Header>,
    queued: VecDeque<Result<Vec<Frame>, TransportError>>,
    /// Predefined responses (request payload -> frames)
    responses: Vec<(Vec<u8>, Vec<Frame>)>,
    sent: Vec<Message>,
    header_changes: Vec<Header>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            connected: true,
            header: None,
            queued: VecDeque::new(),
            responses: Vec::new(),
            sent: Vec::new(),
            header_changes: Vec::new(),
        }
    }

    /// Reply with `frames` whenever the payload starts with `request`
    pub fn add_response(&mut self, request: Vec<u8>, frames: Vec<Frame>) {
        self.responses.push((request, frames));
    }

    /// Reply to the next exchange with `frames`, whatever was sent
    pub fn queue_frames(&mut self, frames: Vec<Frame>) {
        self.queued.push_back(Ok(frames));
    }

    /// Fail the next exchange with `error`
    pub fn queue_error(&mut self, error: TransportError) {
        self.queued.push_back(Err(error));
    }

    /// Set connection state
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Messages sent so far, in order
    pub fn sent(&self) -> &[Message] {
        &self.sent
    }

    /// Every header switch performed before a transmission
    pub fn header_changes(&self) -> &[Header] {
        &self.header_changes
    }

    /// Positive reply frame from the node `request` addressed
    pub fn positive_frame(request: &Message, data: &[u8]) -> Frame {
        let mut frame = request.header().reply().to_bytes().to_vec();
        frame.push(request.positive_response_mode());
        frame.extend_from_slice(request.request());
        frame.extend_from_slice(data);
        frame
    }

    /// Negative reply frame (`7F ‖ request payload ‖ nrc`) for `request`
    pub fn negative_frame(request: &Message, nrc: u8) -> Frame {
        let mut frame = request.header().reply().to_bytes().to_vec();
        frame.push(mode::NEGATIVE_RESPONSE);
        frame.extend(request.encode());
        frame.push(nrc);
        frame
    }

    fn find_response(&self, message: &Message) -> Vec<Frame> {
        let payload = message.encode();

        // First try exact match
        if let Some((_, frames)) = self.responses.iter().find(|(req, _)| *req == payload) {
            return frames.clone();
        }

        // Then try prefix match for variable-length requests
        if let Some((_, frames)) = self
            .responses
            .iter()
            .find(|(req, _)| payload.starts_with(req))
        {
            return frames.clone();
        }

        vec![Self::positive_frame(message, &[])]
    }
}

impl Transport for MockTransport {
    fn send(&mut self, message: &Message) -> Result<Vec<Frame>, TransportError> {
        if !self.connected {
            return Err(TransportError::ConnectionClosed);
        }

        if self.header != Some(message.header()) {
            self.header = Some(message.header());
            self.header_changes.push(message.header());
        }

        self.sent.push(message.clone());
        tracing::debug!(message = %message, "Mock transport: sent message");

        match self.queued.pop_front() {
            Some(reply) => reply,
            None => Ok(self.find_response(message)),
        }
    }

    fn current_header(&self) -> Option<Header> {
        self.header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn read_block() -> Message {
        Message::new(0x6C, 0x10, 0xF0, 0x3C, &[0x0A], &[]).unwrap()
    }

    #[test]
    fn test_default_reply_echoes_request() {
        let mut transport = MockTransport::new();
        let frames = transport.send(&read_block()).unwrap();
        assert_eq!(frames, vec![vec![0x6C, 0xF0, 0x10, 0x7C, 0x0A]]);
    }

    #[test]
    fn test_scripted_and_queued_replies() {
        let mut transport = MockTransport::new();
        transport.add_response(vec![0x3C, 0x0A], vec![vec![0x6C, 0xF0, 0x10, 0x7C, 0x0A, 0x01]]);
        transport.queue_error(TransportError::NoData);

        assert_eq!(transport.send(&read_block()).unwrap_err(), TransportError::NoData);
        assert_eq!(
            transport.send(&read_block()).unwrap(),
            vec![vec![0x6C, 0xF0, 0x10, 0x7C, 0x0A, 0x01]]
        );
    }

    #[test]
    fn test_header_changes_recorded_once() {
        let mut transport = MockTransport::new();
        transport.send(&read_block()).unwrap();
        transport.send(&read_block()).unwrap();
        let functional = Message::new(0x68, 0x6A, 0xF0, 0x01, &[0x0C], &[]).unwrap();
        transport.send(&functional).unwrap();

        assert_eq!(transport.sent().len(), 3);
        assert_eq!(
            transport.header_changes(),
            &[Header::new(0x6C, 0x10, 0xF0), Header::new(0x68, 0x6A, 0xF0)]
        );
        assert_eq!(transport.current_header(), Some(Header::new(0x68, 0x6A, 0xF0)));
    }

    #[test]
    fn test_disconnected() {
        let mut transport = MockTransport::new();
        transport.set_connected(false);
        assert_eq!(
            transport.send(&read_block()).unwrap_err(),
            TransportError::ConnectionClosed
        );
    }

    #[test]
    fn test_negative_frame_layout() {
        let frame = MockTransport::negative_frame(&read_block(), 0x31);
        assert_eq!(frame, vec![0x6C, 0xF0, 0x10, 0x7F, 0x3C, 0x0A, 0x31]);
    }
}
