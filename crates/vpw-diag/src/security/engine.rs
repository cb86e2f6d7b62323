//! Mode $27 unlock handshake

use tracing::{debug, info, warn};

use super::{ControllerVariant, SeedKeyAlgorithm};
use crate::error::VpwError;
use crate::events::{Event, EventSink};
use crate::transport::Transport;
use crate::vpw::{mode, security_access, Message, ProtocolError, SecurityError, VpwClient};

/// Where the handshake currently stands
///
/// Only `Locked` and `Unlocked` persist between calls; the intermediate
/// states are visible through `UnlockStateChanged` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnlockState {
    #[default]
    Locked,
    SeedRequested,
    SeedReceived,
    KeySent,
    Unlocked,
}

/// Reply to a seed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedResponse {
    Seed([u8; 2]),
    AlreadyUnlocked,
}

/// How a successful [`UnlockEngine::unlock`] got there
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockOutcome {
    AlreadyUnlocked,
    KeyAccepted,
}

/// Interpret the positive reply to a seed request.
///
/// A lone 0x37 means the controller is already unlocked; otherwise the first
/// two data bytes are the seed.
pub fn parse_seed(response: &Message) -> Result<SeedResponse, ProtocolError> {
    match *response.data() {
        [security_access::ALREADY_UNLOCKED] => Ok(SeedResponse::AlreadyUnlocked),
        [high, low, ..] => Ok(SeedResponse::Seed([high, low])),
        _ => Err(ProtocolError::ShortPayload {
            expected: 2,
            actual: response.data().len(),
        }),
    }
}

/// Map the key step reply code to an outcome
///
/// 0x37 here is a failure, unlike on the seed step.
pub fn key_outcome(code: u8) -> Result<(), SecurityError> {
    match code {
        security_access::KEY_ACCEPTED => Ok(()),
        0x33 => Err(SecurityError::AccessDenied),
        0x35 => Err(SecurityError::InvalidKey),
        0x36 => Err(SecurityError::ExceededAttempts),
        0x37 => Err(SecurityError::TimeDelayNotExpired),
        other => Err(SecurityError::UnknownResponse(other)),
    }
}

/// Drives the seed/key handshake over a [`VpwClient`]
#[derive(Debug, Clone)]
pub struct UnlockEngine {
    algorithm: SeedKeyAlgorithm,
    state: UnlockState,
    pending_seed: Option<[u8; 2]>,
}

impl UnlockEngine {
    pub fn new(algorithm: SeedKeyAlgorithm) -> Self {
        Self {
            algorithm,
            state: UnlockState::Locked,
            pending_seed: None,
        }
    }

    pub fn for_variant(variant: ControllerVariant) -> Self {
        Self::new(variant.algorithm())
    }

    pub fn state(&self) -> UnlockState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == UnlockState::Unlocked
    }

    /// Seed received by the last [`request_seed`](Self::request_seed), not yet answered
    pub fn pending_seed(&self) -> Option<[u8; 2]> {
        self.pending_seed
    }

    pub fn algorithm(&self) -> &SeedKeyAlgorithm {
        &self.algorithm
    }

    /// Ask the controller for a seed (mode $27 sub-function $01)
    pub fn request_seed<T: Transport>(
        &mut self,
        client: &mut VpwClient<T>,
    ) -> Result<SeedResponse, VpwError> {
        let request = client.message(
            mode::SECURITY_ACCESS,
            &[security_access::REQUEST_SEED],
            &[],
        )?;
        self.pending_seed = None;
        self.transition(UnlockState::SeedRequested, client.events().as_ref());

        let result = match client.exchange(&request) {
            Ok(response) => parse_seed(&response).map_err(VpwError::from),
            // Negative reply 0x37 on this step carries the same meaning
            Err(VpwError::Security(SecurityError::TimeDelayNotExpired)) => {
                Ok(SeedResponse::AlreadyUnlocked)
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(SeedResponse::AlreadyUnlocked) => {
                debug!("Security already unlocked");
                self.transition(UnlockState::Unlocked, client.events().as_ref());
            }
            Ok(SeedResponse::Seed(seed)) => {
                debug!(seed = format!("0x{}", hex::encode_upper(seed)), "Seed received");
                self.pending_seed = Some(seed);
                self.transition(UnlockState::SeedReceived, client.events().as_ref());
            }
            Err(ref e) => {
                warn!(error = %e, "Seed request failed");
                self.transition(UnlockState::Locked, client.events().as_ref());
            }
        }
        result
    }

    /// Send a key (mode $27 sub-function $02)
    pub fn send_key<T: Transport>(
        &mut self,
        client: &mut VpwClient<T>,
        key: [u8; 2],
    ) -> Result<(), VpwError> {
        let request = client.message(mode::SECURITY_ACCESS, &[security_access::SEND_KEY], &key)?;
        self.pending_seed = None;
        self.transition(UnlockState::KeySent, client.events().as_ref());

        let result = client.exchange(&request).and_then(|response| {
            let code = response.data().first().copied().ok_or(ProtocolError::ShortPayload {
                expected: 1,
                actual: 0,
            })?;
            Ok(key_outcome(code)?)
        });

        match result {
            Ok(()) => {
                info!("Security access granted");
                self.transition(UnlockState::Unlocked, client.events().as_ref());
            }
            Err(ref e) => {
                warn!(error = %e, "Key rejected");
                self.transition(UnlockState::Locked, client.events().as_ref());
            }
        }
        result
    }

    /// Full handshake; succeeds without sending a key when already unlocked
    pub fn unlock<T: Transport>(
        &mut self,
        client: &mut VpwClient<T>,
    ) -> Result<UnlockOutcome, VpwError> {
        match self.request_seed(client)? {
            SeedResponse::AlreadyUnlocked => Ok(UnlockOutcome::AlreadyUnlocked),
            SeedResponse::Seed(seed) => {
                let key = self.algorithm.key(seed);
                self.send_key(client, key)?;
                Ok(UnlockOutcome::KeyAccepted)
            }
        }
    }

    fn transition(&mut self, to: UnlockState, events: &dyn EventSink) {
        if self.state == to {
            return;
        }
        let from = std::mem::replace(&mut self.state, to);
        events.emit(Event::UnlockStateChanged { from, to });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use crate::transport::MockTransport;
    use crate::vpw::Codec;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const SEED_REQUEST: [u8; 2] = [0x27, 0x01];

    fn client(transport: MockTransport) -> (VpwClient<MockTransport>, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let client = VpwClient::with_codec(transport, Codec::new(sink.clone()));
        (client, sink)
    }

    fn states(sink: &RecordingSink) -> Vec<UnlockState> {
        sink.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::UnlockStateChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_parse_seed() {
        let reply = |data: &[u8]| Message::new(0x6C, 0xF0, 0x10, 0x67, &[0x01], data).unwrap();
        assert_eq!(parse_seed(&reply(&[0x37])), Ok(SeedResponse::AlreadyUnlocked));
        assert_eq!(parse_seed(&reply(&[0x12, 0x34])), Ok(SeedResponse::Seed([0x12, 0x34])));
        assert!(parse_seed(&reply(&[])).is_err());
    }

    #[test]
    fn test_key_outcome_codes() {
        assert_eq!(key_outcome(0x34), Ok(()));
        assert_eq!(key_outcome(0x33), Err(SecurityError::AccessDenied));
        assert_eq!(key_outcome(0x35), Err(SecurityError::InvalidKey));
        assert_eq!(key_outcome(0x36), Err(SecurityError::ExceededAttempts));
        assert_eq!(key_outcome(0x37), Err(SecurityError::TimeDelayNotExpired));
        assert_eq!(key_outcome(0x99), Err(SecurityError::UnknownResponse(0x99)));
    }

    #[test]
    fn test_unlock_with_key() {
        let mut transport = MockTransport::new();
        transport.add_response(SEED_REQUEST.to_vec(), vec![vec![0x6C, 0xF0, 0x10, 0x67, 0x01, 0x12, 0x34]]);
        transport.add_response(
            vec![0x27, 0x02, 0x5F, 0x3B],
            vec![vec![0x6C, 0xF0, 0x10, 0x67, 0x02, 0x34]],
        );
        let (mut client, sink) = client(transport);

        let mut engine = UnlockEngine::for_variant(ControllerVariant::P01);
        assert_eq!(engine.unlock(&mut client).unwrap(), UnlockOutcome::KeyAccepted);
        assert!(engine.is_unlocked());
        assert_eq!(
            states(&sink),
            vec![
                UnlockState::SeedRequested,
                UnlockState::SeedReceived,
                UnlockState::KeySent,
                UnlockState::Unlocked,
            ]
        );

        let sent = client.transport().sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].encode(), vec![0x27, 0x02, 0x5F, 0x3B]);
    }

    #[test]
    fn test_seed_step_sentinel_means_unlocked() {
        let mut transport = MockTransport::new();
        transport.add_response(SEED_REQUEST.to_vec(), vec![vec![0x6C, 0xF0, 0x10, 0x67, 0x01, 0x37]]);
        let (mut client, _) = client(transport);

        let mut engine = UnlockEngine::for_variant(ControllerVariant::P04);
        assert_eq!(engine.unlock(&mut client).unwrap(), UnlockOutcome::AlreadyUnlocked);
        assert_eq!(engine.state(), UnlockState::Unlocked);
        assert_eq!(client.transport().sent().len(), 1);
    }

    #[test]
    fn test_seed_step_negative_0x37_means_unlocked() {
        let mut transport = MockTransport::new();
        transport.add_response(
            SEED_REQUEST.to_vec(),
            vec![vec![0x6C, 0xF0, 0x10, 0x7F, 0x27, 0x01, 0x37]],
        );
        let (mut client, _) = client(transport);

        let mut engine = UnlockEngine::for_variant(ControllerVariant::P01);
        assert_eq!(
            engine.request_seed(&mut client).unwrap(),
            SeedResponse::AlreadyUnlocked
        );
        assert!(engine.is_unlocked());
    }

    #[test]
    fn test_key_step_0x37_is_failure() {
        let mut transport = MockTransport::new();
        transport.add_response(SEED_REQUEST.to_vec(), vec![vec![0x6C, 0xF0, 0x10, 0x67, 0x01, 0x12, 0x34]]);
        transport.add_response(vec![0x27, 0x02], vec![vec![0x6C, 0xF0, 0x10, 0x67, 0x02, 0x37]]);
        let (mut client, sink) = client(transport);

        let mut engine = UnlockEngine::for_variant(ControllerVariant::P01);
        let err = engine.unlock(&mut client).unwrap_err();
        assert!(matches!(
            err,
            VpwError::Security(SecurityError::TimeDelayNotExpired)
        ));
        assert!(err.requires_delay());
        assert_eq!(engine.state(), UnlockState::Locked);
        assert_eq!(states(&sink).last(), Some(&UnlockState::Locked));
    }

    #[test]
    fn test_key_step_negative_response() {
        let mut transport = MockTransport::new();
        transport.add_response(
            vec![0x27, 0x02],
            vec![vec![0x6C, 0xF0, 0x10, 0x7F, 0x27, 0x02, 0x35]],
        );
        let (mut client, _) = client(transport);

        let mut engine = UnlockEngine::for_variant(ControllerVariant::P01);
        assert!(matches!(
            engine.send_key(&mut client, [0x00, 0x00]).unwrap_err(),
            VpwError::Security(SecurityError::InvalidKey)
        ));
        assert_eq!(engine.state(), UnlockState::Locked);
    }

    #[test]
    fn test_seed_step_denied() {
        let mut transport = MockTransport::new();
        transport.add_response(
            SEED_REQUEST.to_vec(),
            vec![vec![0x6C, 0xF0, 0x10, 0x7F, 0x27, 0x01, 0x33]],
        );
        let (mut client, _) = client(transport);

        let mut engine = UnlockEngine::for_variant(ControllerVariant::P01);
        assert!(matches!(
            engine.unlock(&mut client).unwrap_err(),
            VpwError::Security(SecurityError::AccessDenied)
        ));
        assert_eq!(engine.pending_seed(), None);
        assert_eq!(engine.state(), UnlockState::Locked);
    }
}
