//! Seed/key cipher
//!
//! The controller answers a seed request with a 16 bit seed. The key is
//! derived by running the seed through four steps of a per-controller
//! algorithm table. Each step is an opcode followed by two operand bytes
//! (`high`, `low`) found at table indices 1, 4, 7 and 10.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Entries in a seed/key algorithm table
pub const ALGORITHM_LEN: usize = 13;

const STEP_INDICES: [usize; 4] = [1, 4, 7, 10];

/// Cipher step operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// 0x14: add `high:low`
    Add,
    /// 0x2A: bitwise NOT when `high > low`, two's complement otherwise
    Complement,
    /// 0x4C: rotate left by `high` bits
    RotateLeft,
    /// 0x6B: rotate right by `low` bits
    RotateRight,
    /// 0x7E: swap bytes, then add the operands ordered larger byte first
    SwapAdd,
    /// 0x98: subtract `high:low`
    Subtract,
    /// Anything else leaves the accumulator untouched
    Unknown(u8),
}

impl From<u8> for Opcode {
    fn from(value: u8) -> Self {
        match value {
            0x14 => Opcode::Add,
            0x2A => Opcode::Complement,
            0x4C => Opcode::RotateLeft,
            0x6B => Opcode::RotateRight,
            0x7E => Opcode::SwapAdd,
            0x98 => Opcode::Subtract,
            other => Opcode::Unknown(other),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> Self {
        match op {
            Opcode::Add => 0x14,
            Opcode::Complement => 0x2A,
            Opcode::RotateLeft => 0x4C,
            Opcode::RotateRight => 0x6B,
            Opcode::SwapAdd => 0x7E,
            Opcode::Subtract => 0x98,
            Opcode::Unknown(v) => v,
        }
    }
}

impl Opcode {
    fn apply(self, acc: u16, high: u8, low: u8) -> u16 {
        let operand = u16::from_be_bytes([high, low]);
        match self {
            Opcode::Add => acc.wrapping_add(operand),
            Opcode::Complement if high > low => !acc,
            Opcode::Complement => acc.wrapping_neg(),
            Opcode::RotateLeft => acc.rotate_left(u32::from(high)),
            Opcode::RotateRight => acc.rotate_right(u32::from(low)),
            Opcode::SwapAdd => {
                let addend = if low > high {
                    u16::from_be_bytes([low, high])
                } else {
                    operand
                };
                acc.swap_bytes().wrapping_add(addend)
            }
            Opcode::Subtract => acc.wrapping_sub(operand),
            Opcode::Unknown(_) => acc,
        }
    }
}

/// A 13 entry seed/key algorithm table
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeedKeyAlgorithm([u8; ALGORITHM_LEN]);

impl SeedKeyAlgorithm {
    pub const fn new(table: [u8; ALGORITHM_LEN]) -> Self {
        Self(table)
    }

    pub fn as_bytes(&self) -> &[u8; ALGORITHM_LEN] {
        &self.0
    }

    /// The four `(opcode, high, low)` steps, in execution order
    pub fn steps(&self) -> impl Iterator<Item = (Opcode, u8, u8)> + '_ {
        STEP_INDICES
            .iter()
            .map(move |&i| (Opcode::from(self.0[i]), self.0[i + 1], self.0[i + 2]))
    }

    pub fn key(&self, seed: [u8; 2]) -> [u8; 2] {
        compute_key(seed, self)
    }
}

impl fmt::Debug for SeedKeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeedKeyAlgorithm({})", hex::encode_upper(self.0))
    }
}

/// Derive the 2 byte key for `seed` (both big-endian)
pub fn compute_key(seed: [u8; 2], algorithm: &SeedKeyAlgorithm) -> [u8; 2] {
    algorithm
        .steps()
        .fold(u16::from_be_bytes(seed), |acc, (op, high, low)| {
            op.apply(acc, high, low)
        })
        .to_be_bytes()
}

/// Controller families with a known algorithm table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerVariant {
    P01,
    P04,
    P04Early,
}

impl ControllerVariant {
    pub fn algorithm(self) -> SeedKeyAlgorithm {
        match self {
            ControllerVariant::P01 => SeedKeyAlgorithm::new([
                0x24, 0x14, 0x52, 0x01, 0x7E, 0x38, 0x97, 0x2A, 0xBE, 0x38, 0x98, 0xD4, 0x28,
            ]),
            ControllerVariant::P04 => SeedKeyAlgorithm::new([
                0x04, 0x6B, 0x50, 0x02, 0x7E, 0x50, 0xD2, 0x4C, 0x05, 0xFD, 0x98, 0x18, 0xCB,
            ]),
            ControllerVariant::P04Early => SeedKeyAlgorithm::new([
                0xA0, 0x2A, 0xA9, 0x3A, 0x14, 0x01, 0xBF, 0x6B, 0xED, 0x0B, 0x4C, 0x05, 0xCD,
            ]),
        }
    }
}

impl fmt::Display for ControllerVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerVariant::P01 => write!(f, "p01"),
            ControllerVariant::P04 => write!(f, "p04"),
            ControllerVariant::P04Early => write!(f, "p04_early"),
        }
    }
}

impl std::str::FromStr for ControllerVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "p01" => Ok(ControllerVariant::P01),
            "p04" => Ok(ControllerVariant::P04),
            "p04_early" | "p04-early" => Ok(ControllerVariant::P04Early),
            _ => Err(format!("Invalid controller variant: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn table(steps: [(u8, u8, u8); 4]) -> SeedKeyAlgorithm {
        let mut bytes = [0u8; ALGORITHM_LEN];
        for (n, (op, high, low)) in steps.into_iter().enumerate() {
            let i = STEP_INDICES[n];
            bytes[i] = op;
            bytes[i + 1] = high;
            bytes[i + 2] = low;
        }
        SeedKeyAlgorithm::new(bytes)
    }

    #[rstest]
    #[case(ControllerVariant::P01, 0x1234, 0x5F3B)]
    #[case(ControllerVariant::P01, 0xABCD, 0xC5A2)]
    #[case(ControllerVariant::P01, 0x0000, 0x934D)]
    #[case(ControllerVariant::P04, 0x1234, 0xD1C0)]
    #[case(ControllerVariant::P04, 0xABCD, 0x9E8D)]
    #[case(ControllerVariant::P04, 0x0000, 0x314F)]
    #[case(ControllerVariant::P04Early, 0x1234, 0x2BBE)]
    #[case(ControllerVariant::P04Early, 0xABCD, 0xC557)]
    #[case(ControllerVariant::P04Early, 0x0000, 0xF806)]
    fn test_variant_keys(
        #[case] variant: ControllerVariant,
        #[case] seed: u16,
        #[case] expected: u16,
    ) {
        let key = compute_key(seed.to_be_bytes(), &variant.algorithm());
        assert_eq!(u16::from_be_bytes(key), expected);
    }

    #[test]
    fn test_p01_table_values() {
        assert_eq!(
            ControllerVariant::P01.algorithm().as_bytes(),
            &[36, 20, 82, 1, 126, 56, 151, 42, 190, 56, 152, 212, 40]
        );
    }

    #[rstest]
    #[case::not_when_high_greater(table([(0x2A, 2, 1), (0, 0, 0), (0, 0, 0), (0, 0, 0)]), 0xEDCB)]
    #[case::negate_otherwise(table([(0x2A, 1, 2), (0, 0, 0), (0, 0, 0), (0, 0, 0)]), 0xEDCC)]
    #[case::swap_add_low_first(table([(0x7E, 1, 2), (0, 0, 0), (0, 0, 0), (0, 0, 0)]), 0x3613)]
    #[case::rotations(table([(0x4C, 4, 0), (0x6B, 0, 8), (0, 0, 0), (0, 0, 0)]), 0x4123)]
    #[case::wrapping_add_sub(table([(0x14, 0xFF, 0xFF), (0x98, 0, 1), (0x55, 0, 0), (0, 0, 0)]), 0x1232)]
    fn test_opcodes(#[case] algorithm: SeedKeyAlgorithm, #[case] expected: u16) {
        assert_eq!(u16::from_be_bytes(algorithm.key([0x12, 0x34])), expected);
    }

    #[test]
    fn test_rotation_wraps_at_sixteen_bits() {
        let full_turn = table([(0x4C, 16, 0), (0x6B, 0, 32), (0, 0, 0), (0, 0, 0)]);
        assert_eq!(full_turn.key([0xBE, 0xEF]), [0xBE, 0xEF]);
    }

    #[test]
    fn test_unknown_opcodes_are_noops() {
        let noop = table([(0x00, 1, 2), (0xFF, 3, 4), (0x15, 5, 6), (0x99, 7, 8)]);
        assert_eq!(noop.key([0xAB, 0xCD]), [0xAB, 0xCD]);
        assert!(noop.steps().all(|(op, _, _)| matches!(op, Opcode::Unknown(_))));
    }

    #[test]
    fn test_opcode_byte_mapping() {
        for byte in [0x14, 0x2A, 0x4C, 0x6B, 0x7E, 0x98, 0x00, 0xFF] {
            assert_eq!(u8::from(Opcode::from(byte)), byte);
        }
    }

    #[test]
    fn test_variant_names() {
        assert_eq!("p01".parse::<ControllerVariant>(), Ok(ControllerVariant::P01));
        assert_eq!("P04".parse::<ControllerVariant>(), Ok(ControllerVariant::P04));
        assert_eq!(
            "p04_early".parse::<ControllerVariant>(),
            Ok(ControllerVariant::P04Early)
        );
        assert!("p10".parse::<ControllerVariant>().is_err());
        assert_eq!(ControllerVariant::P04Early.to_string(), "p04_early");
    }
}
