//! Hex and integer codec primitives
//!
//! Byte-strings travel through blueprints and forms as hex text. These helpers
//! keep the parity/charset rules in one place so the structural validator, the
//! value validator and the descriptor builder agree on what "bytes" means.

use num_bigint::BigInt;
use serde::Serialize;
use serde_json::Number;

/// Strict hex check: even length, `[0-9a-fA-F]` only, no prefix
pub fn is_hex(s: &str) -> bool {
    s.len() % 2 == 0 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Remove a leading `0x` / `0X`
pub fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Lowercased hex without prefix, if `s` is hex once the prefix is removed
pub fn normalize_hex(s: &str) -> Option<String> {
    let body = strip_hex_prefix(s.trim());
    is_hex(body).then(|| body.to_ascii_lowercase())
}

/// Encode UTF-8 text as lowercase hex
pub fn text_to_hex(s: &str) -> String {
    hex::encode(s.as_bytes())
}

/// Decode a strict hex string into bytes
pub fn hex_to_bytes(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(s)
}

/// Encode bytes as lowercase hex
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Number of bytes carried by a strict hex string
pub fn byte_len(hex: &str) -> usize {
    hex.len() / 2
}

/// Parse a decimal integer string (optional sign, surrounding whitespace
/// ignored) into an arbitrary-precision integer
pub fn parse_integer(s: &str) -> Option<BigInt> {
    let trimmed = s.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if digits.is_empty() {
        return None;
    }
    digits.parse::<BigInt>().ok()
}

/// Exact integer value of a JSON number.
///
/// Numbers keep their source text (`arbitrary_precision`), so integers wider
/// than 64 bits survive. Integral floats such as `1.0` or `2e3` are accepted as
/// long as they fit in an `i128`.
pub fn number_to_integer(n: &Number) -> Option<BigInt> {
    if let Some(i) = n.as_i64() {
        return Some(BigInt::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(BigInt::from(u));
    }
    if let Ok(big) = n.to_string().parse::<BigInt>() {
        return Some(big);
    }
    let f = n.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1.0e38 {
        return Some(BigInt::from(f as i128));
    }
    None
}

/// Canonical text of a serializable value: compact JSON with sorted keys.
///
/// Used for structural comparison only (parameter sets across purposes).
pub fn canonical_key<T: Serialize>(value: &T) -> String {
    // `serde_json::Map` is ordered, so going through `Value` sorts every object
    serde_json::to_value(value)
        .map(|v| v.to_string())
        .unwrap_or_default()
}
