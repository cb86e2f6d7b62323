//! Security access: seed/key cipher and unlock handshake

mod engine;
mod seedkey;

pub use engine::{key_outcome, parse_seed, SeedResponse, UnlockEngine, UnlockOutcome, UnlockState};
pub use seedkey::{compute_key, ControllerVariant, Opcode, SeedKeyAlgorithm, ALGORITHM_LEN};
