//! Lowercase hex encoding for keys, handles, and signatures.
//!
//! Kept in-tree so every crate renders byte strings the same way.

use crate::error::ValidationError;

/// Encode bytes as lowercase hex.
pub fn encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// First four bytes as hex, for log fields.
pub fn prefix(bytes: &[u8]) -> String {
    encode(&bytes[..bytes.len().min(4)])
}

/// Decode a hex string of any even length.
pub fn decode(hex: &str) -> Result<Vec<u8>, ValidationError> {
    if !hex.is_ascii() {
        return Err(ValidationError::InvalidHex {
            reason: "non-ASCII character".to_string(),
        });
    }
    if hex.len() % 2 != 0 {
        return Err(ValidationError::InvalidHex {
            reason: "hex string must have even length".to_string(),
        });
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| ValidationError::InvalidHex {
                reason: format!("invalid hex at position {i}: {e}"),
            })
        })
        .collect()
}

/// Decode a hex string into exactly `N` bytes.
pub fn decode_fixed<const N: usize>(hex: &str) -> Result<[u8; N], ValidationError> {
    let bytes = decode(hex)?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| ValidationError::InvalidHex {
        reason: format!("expected {N} bytes, got {len}"),
    })
}
