//! Stock parameter decoders
//!
//! Each decoder reads the response bytes of one parameter and returns a JSON
//! value. Multi-byte raw values are big-endian. An empty slice decodes to
//! `null`.

use serde_json::{json, Value};

/// Big-endian unsigned integer of up to 8 bytes
fn raw_value(raw: &[u8]) -> Option<u64> {
    if raw.is_empty() || raw.len() > 8 {
        return None;
    }
    Some(raw.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}

fn first(raw: &[u8]) -> Option<u8> {
    raw.first().copied()
}

/// physical = raw * scale + offset
pub fn linear(scale: f64, offset: f64) -> impl Fn(&[u8]) -> Value + Send + Sync + 'static {
    move |raw| match raw_value(raw) {
        Some(n) => json!(n as f64 * scale + offset),
        None => Value::Null,
    }
}

/// Engine speed, PID $000C (rpm)
pub fn rpm(raw: &[u8]) -> Value {
    first(raw).map_or(Value::Null, |n| json!(f64::from(n) * 0.25))
}

/// Coolant temperature, PID $0005 (°C)
pub fn coolant_celsius(raw: &[u8]) -> Value {
    first(raw).map_or(Value::Null, |n| json!(i32::from(n) - 40))
}

/// Spark advance, PID $000E (degrees)
pub fn timing_degrees(raw: &[u8]) -> Value {
    first(raw).map_or(Value::Null, |n| json!(f64::from(n) / 2.0 - 64.0))
}

/// Manifold absolute pressure, PID $000B (kPa)
pub fn map_kpa(raw: &[u8]) -> Value {
    first(raw).map_or(Value::Null, |n| json!(n))
}

/// Mass air flow sensor frequency, PID $1250 (Hz)
pub fn maf_hz(raw: &[u8]) -> Value {
    first(raw).map_or(Value::Null, |n| json!(f64::from(n) * 2.048))
}

/// AEM 30-0300 wideband air/fuel ratio wired to the EGR input, PID $114B
pub fn aem_wideband_afr(raw: &[u8]) -> Value {
    first(raw).map_or(Value::Null, |n| {
        let volts = f64::from(n) * 255.0 / 5.0;
        json!(2.375 * volts + 7.3125)
    })
}

/// Lowercase hex string of the raw bytes
pub fn hex(raw: &[u8]) -> Value {
    Value::String(hex::encode(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(&[0x2A], json!(10.5))]
    #[case(&[0x00], json!(0.0))]
    #[case(&[0xFF], json!(63.75))]
    fn test_rpm(#[case] raw: &[u8], #[case] expected: Value) {
        assert_eq!(rpm(raw), expected);
    }

    #[rstest]
    #[case(&[0x00], json!(-40))]
    #[case(&[0x82], json!(90))]
    fn test_coolant(#[case] raw: &[u8], #[case] expected: Value) {
        assert_eq!(coolant_celsius(raw), expected);
    }

    #[test]
    fn test_single_byte_sensors() {
        assert_eq!(timing_degrees(&[0x90]), json!(8.0));
        assert_eq!(timing_degrees(&[0x00]), json!(-64.0));
        assert_eq!(map_kpa(&[0x64]), json!(100));
        assert_eq!(maf_hz(&[0x7D]), json!(256.0));
        assert_eq!(aem_wideband_afr(&[0x00]), json!(7.3125));
        assert_eq!(aem_wideband_afr(&[0x02]), json!(249.5625));
    }

    #[test]
    fn test_linear_multi_byte() {
        let decode = linear(0.5, -10.0);
        assert_eq!(decode(&[0x01, 0x00]), json!(118.0));
        assert_eq!(decode(&[0x14]), json!(0.0));
        assert_eq!(decode(&[]), Value::Null);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(rpm(&[]), Value::Null);
        assert_eq!(coolant_celsius(&[]), Value::Null);
        assert_eq!(hex(&[]), json!(""));
        assert_eq!(hex(&[0xDE, 0xAD]), json!("dead"));
    }
}
