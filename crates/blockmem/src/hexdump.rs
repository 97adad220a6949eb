//! Byte buffer <-> hex string helpers used at the persistence boundary.

use crate::error::{BlockMemoryError, Result};

/// Render `bytes` as two lowercase hex characters per byte.
pub fn buffer_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode `hex` into the front of `dst`.
///
/// `dst` must already be large enough to hold `hex.len() / 2` bytes. The
/// input must have an even number of characters, all of them hex digits.
/// On any error nothing is written into `dst`.
pub fn hex_to_buffer(dst: &mut [u8], hex: impl AsRef<[u8]>) -> Result<()> {
    let hex = hex.as_ref();
    if hex.len() % 2 != 0 {
        return Err(BlockMemoryError::invalid_hex(format!(
            "odd number of characters ({})",
            hex.len()
        )));
    }
    let byte_len = hex.len() / 2;
    if dst.len() < byte_len {
        return Err(BlockMemoryError::invalid_hex(format!(
            "{byte_len} decoded bytes do not fit a {} byte buffer",
            dst.len()
        )));
    }
    // `decode_to_slice` may write a prefix before it reaches a bad digit.
    if let Some(pos) = hex.iter().position(|c| !c.is_ascii_hexdigit()) {
        return Err(BlockMemoryError::invalid_hex(format!(
            "non-hex character at position {pos}"
        )));
    }
    hex::decode_to_slice(hex, &mut dst[..byte_len])
        .map_err(|e| BlockMemoryError::invalid_hex(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_lowercase_pairs() {
        assert_eq!(buffer_to_hex(&[0x00, 0x0f, 0xab, 0xff]), "000fabff");
        assert_eq!(buffer_to_hex(&[]), "");
    }

    #[test]
    fn decodes_into_prefix_of_larger_buffer() {
        let mut dst = [0xEEu8; 4];
        hex_to_buffer(&mut dst, "0aFF").unwrap();
        assert_eq!(dst, [0x0a, 0xff, 0xEE, 0xEE]);
    }

    #[test]
    fn odd_length_writes_nothing() {
        let mut dst = [7u8; 2];
        let err = hex_to_buffer(&mut dst, "abc").unwrap_err();
        assert!(matches!(err, BlockMemoryError::InvalidHex { .. }));
        assert_eq!(dst, [7, 7]);
    }

    #[test]
    fn bad_digit_writes_nothing() {
        let mut dst = [7u8; 3];
        assert!(hex_to_buffer(&mut dst, "0102zz").is_err());
        assert_eq!(dst, [7, 7, 7]);
    }

    #[test]
    fn too_small_destination_is_rejected() {
        let mut dst = [0u8; 1];
        assert!(hex_to_buffer(&mut dst, "0102").is_err());
        assert_eq!(dst, [0]);
    }
}
