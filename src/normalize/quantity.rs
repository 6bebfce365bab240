//! Hex quantity decoding for the `0x`-prefixed integers carried by both
//! payload shapes.

use crate::normalize::block::NormalizeError;

/// Decodes a hex-encoded integer (optional `0x`/`0X` prefix) into a `u64`.
pub fn hex_quantity(field: &'static str, raw: &str) -> Result<u64, NormalizeError> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() {
        return Err(NormalizeError::InvalidQuantity {
            field,
            value: raw.to_owned(),
        });
    }

    u64::from_str_radix(digits, 16).map_err(|_| NormalizeError::InvalidQuantity {
        field,
        value: raw.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_prefixed_and_bare_hex() {
        assert_eq!(hex_quantity("number", "0x64").unwrap(), 100);
        assert_eq!(hex_quantity("number", "0X64").unwrap(), 100);
        assert_eq!(hex_quantity("number", "64").unwrap(), 100);
        assert_eq!(hex_quantity("timestamp", "0x66aabbcc").unwrap(), 0x66aa_bbcc);
    }

    #[test]
    fn rejects_empty_and_malformed_values() {
        assert!(hex_quantity("number", "").is_err());
        assert!(hex_quantity("number", "0x").is_err());
        assert!(hex_quantity("number", "0xzz").is_err());

        let err = hex_quantity("number", "not-hex").unwrap_err();
        assert!(format!("{err}").contains("number"));
    }
}
