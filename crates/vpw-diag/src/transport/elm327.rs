//! ELM327 adapter
//!
//! Talks to an ELM327 compatible scan tool over any byte stream (serial
//! port, TCP socket, Bluetooth RFCOMM). Commands are ASCII lines terminated
//! with `\r`; the adapter answers with `\r` separated lines and a `>` prompt.
//!
//! Frames are reported with headers on (`ATH1`) and spaces off (`ATS0`), so
//! each line is `header ‖ payload ‖ crc` in hex. The trailing SAE J1850 CRC
//! is checked and removed before frames reach the protocol core.

use std::io::{Read, Write};
use std::sync::Arc;

use crc::{Crc, CRC_8_SAE_J1850};
use tracing::{debug, info, warn};

use super::{Frame, Transport, TransportError};
use crate::config::ElmConfig;
use crate::events::{Event, EventSink, TracingSink};
use crate::vpw::{Header, Message, ProtocolError};

const PROMPT: u8 = b'>';
/// `ATSP` numbers that can carry VPW: automatic search and SAE J1850 VPW
const VPW_PROTOCOLS: [u8; 2] = [0, 2];
const J1850_CRC: Crc<u8> = Crc::<u8>::new(&CRC_8_SAE_J1850);

/// ELM327 scan tool on a byte stream
pub struct Elm327<P> {
    port: P,
    config: ElmConfig,
    header: Option<Header>,
    events: Arc<dyn EventSink>,
}

impl<P: Read + Write + Send> Elm327<P> {
    /// Reset and configure the adapter for VPW
    pub fn new(port: P, config: ElmConfig) -> Result<Self, TransportError> {
        Self::with_events(port, config, Arc::new(TracingSink))
    }

    pub fn with_events(
        port: P,
        config: ElmConfig,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, TransportError> {
        if !VPW_PROTOCOLS.contains(&config.protocol) {
            return Err(TransportError::InvalidConfig(format!(
                "ATSP{} is not a J1850 VPW protocol",
                config.protocol
            )));
        }

        let mut elm = Self {
            port,
            config,
            header: None,
            events,
        };
        elm.initialize()?;
        Ok(elm)
    }

    fn initialize(&mut self) -> Result<(), TransportError> {
        let version = self.command("ATZ")?;
        info!(version = ?version, "ELM327 reset");

        self.expect_ok("ATE0")?;
        self.expect_ok("ATS0")?;
        self.expect_ok("ATH1")?;
        if self.config.allow_long {
            self.expect_ok("ATAL")?;
        }
        self.expect_ok(&format!("ATSP{}", self.config.protocol))?;
        self.header = None;
        Ok(())
    }

    /// Send one command line and collect the reply lines up to the prompt
    pub fn command(&mut self, command: &str) -> Result<Vec<String>, TransportError> {
        debug!(command, "ELM327 TX");
        self.port
            .write_all(format!("{}\r", command).as_bytes())
            .and_then(|()| self.port.flush())
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;

        let raw = self.read_until_prompt()?;
        debug!(reply = %raw.escape_debug(), "ELM327 RX");

        let lines: Vec<String> = raw
            .split(['\r', '\n'])
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        if lines.iter().any(|line| line == "?") {
            return Err(TransportError::Rejected(command.to_string()));
        }
        Ok(lines)
    }

    fn expect_ok(&mut self, command: &str) -> Result<(), TransportError> {
        let lines = self.command(command)?;
        if !lines.iter().any(|line| line == "OK") {
            return Err(TransportError::Rejected(format!(
                "{}: {}",
                command,
                lines.join(" ")
            )));
        }
        Ok(())
    }

    fn read_until_prompt(&mut self) -> Result<String, TransportError> {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 64];

        let prompt_seen = loop {
            let n = self.port.read(&mut chunk)?;
            if n == 0 {
                break false;
            }
            buffer.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buffer.iter().position(|&b| b == PROMPT) {
                buffer.truncate(pos);
                break true;
            }
        };

        if !prompt_seen {
            if buffer.is_empty() {
                return Err(TransportError::Timeout("no reply from adapter".to_string()));
            }
            warn!("ELM327 prompt missing");
        }
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Switch the transmit header (`ATSH`) if it differs from the current one
    pub fn set_header(&mut self, header: Header) -> Result<(), TransportError> {
        if self.header == Some(header) {
            return Ok(());
        }

        let lines = self.command(&format!("ATSH {}", header))?;
        if !lines.iter().any(|line| line == "OK") {
            return Err(TransportError::HeaderChange(format!(
                "{}: {}",
                header,
                lines.join(" ")
            )));
        }
        self.header = Some(header);
        Ok(())
    }

    /// Turn reply lines into frames, skipping anything that is not a valid frame
    fn parse_frames(&self, lines: &[String]) -> Vec<Frame> {
        let mut frames = Vec::with_capacity(lines.len());

        for line in lines {
            let digits: String = line.chars().filter(|c| !c.is_whitespace()).collect();
            let mut frame = match hex::decode(&digits) {
                Ok(bytes) => bytes,
                Err(e) => {
                    self.skip(line, ProtocolError::NonHex(e.to_string()).to_string());
                    continue;
                }
            };

            if self.config.checksum {
                let Some(&received) = frame.last() else {
                    self.skip(line, "empty frame".to_string());
                    continue;
                };
                let body = &frame[..frame.len() - 1];
                let expected = J1850_CRC.checksum(body);
                if received != expected {
                    self.skip(
                        line,
                        format!("checksum 0x{:02X}, expected 0x{:02X}", received, expected),
                    );
                    continue;
                }
                frame.pop();
            }
            frames.push(frame);
        }
        frames
    }

    fn skip(&self, line: &str, reason: String) {
        self.events.emit(Event::FrameSkipped {
            frame: line.to_string(),
            reason,
        });
    }

    pub fn config(&self) -> &ElmConfig {
        &self.config
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn into_inner(self) -> P {
        self.port
    }
}

impl<P: Read + Write + Send> Transport for Elm327<P> {
    fn send(&mut self, message: &Message) -> Result<Vec<Frame>, TransportError> {
        self.set_header(message.header())?;

        let lines = self.command(&message.to_hex())?;
        if lines.iter().any(|line| line == "NO DATA") {
            return Err(TransportError::NoData);
        }

        let frames = self.parse_frames(&lines);
        if frames.is_empty() && !lines.is_empty() {
            warn!(lines = lines.len(), "No usable frames in reply");
        }
        Ok(frames)
    }

    fn current_header(&self) -> Option<Header> {
        self.header
    }
}
