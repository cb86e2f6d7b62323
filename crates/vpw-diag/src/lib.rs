//! vpw-diag - SAE J1850 VPW diagnostic engine for GM powertrain controllers
//!
//! Builds and validates VPW request/response messages, defines and polls
//! diagnostic data packets (DPIDs), and runs the mode $27 seed/key unlock.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        VpwClient                            │
//! │  exchange / parameters / DPIDs / blocks / VIN               │
//! │                                                             │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐ │
//! │  │ Parameter   │  │ Dpid        │  │ UnlockEngine        │ │
//! │  │ (decoders)  │  │ (registry)  │  │ (seed/key cipher)   │ │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘ │
//! │                          │                                  │
//! │                    ┌─────┴─────┐                            │
//! │                    │  Codec    │──── EventSink              │
//! │                    │(validate) │                            │
//! │                    └─────┬─────┘                            │
//! │                          │                                  │
//! │                 ┌────────┴────────┐                         │
//! │                 │   Transport     │                         │
//! │                 │ (ELM327/mock)   │                         │
//! │                 └─────────────────┘                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod params;
pub mod security;
pub mod transport;
pub mod vpw;

pub use config::{ConfigError, RequestDefaults, VpwConfig};
pub use error::{VpwError, VpwResult};
pub use events::{Event, EventSink, RecordingSink, TracingSink};
pub use params::{plan_dpids, Dpid, DpidRegistry, PacketError, Parameter, ParameterId};
pub use security::{
    compute_key, ControllerVariant, SeedKeyAlgorithm, UnlockEngine, UnlockOutcome, UnlockState,
};
pub use transport::{Elm327, MockTransport, SharedTransport, Transport, TransportError};
pub use vpw::{
    AssemblyError, Codec, Header, Message, NegativeResponseCode, ProtocolError, SecurityError,
    VpwClient,
};
