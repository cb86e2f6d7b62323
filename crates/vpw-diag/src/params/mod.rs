//! Parameters, data packets and decoders

pub mod decoders;
mod dpid;
mod parameter;
mod registry;

pub use dpid::{plan_dpids, Dpid, PacketError, MAX_FIELD};
pub use parameter::{DecodeFn, Parameter, ParameterId};
pub use registry::DpidRegistry;
