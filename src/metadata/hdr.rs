//! GameCube disc header (`ISO.hdr`, the `boot.bin` of the disc)

use super::{fixed_str, read_fixed};
use crate::error::{AlxError, Result};
use std::path::Path;

/// Size of the disc header
pub const HDR_SIZE: usize = 0x440;

/// Disc header identity fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HdrFile {
    /// Four-character game code, e.g. `GEAE`
    pub product_id: String,
    /// Last character of the game code, e.g. `E`
    pub region_id: String,
    /// Two-character maker code, e.g. `8P`
    pub maker_id: String,
    pub product_name: String,
}

impl HdrFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = read_fixed(path.as_ref(), HDR_SIZE)?;
        Self::from_bytes(&bytes)
    }

    /// Parse a header of at least [`HDR_SIZE`] bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HDR_SIZE {
            return Err(AlxError::InputIntegrity(format!(
                "disc header is {} bytes, expected {}",
                bytes.len(),
                HDR_SIZE
            )));
        }

        let product_id = fixed_str(bytes, 0x00, 4)?;
        let region_id = product_id.chars().nth(3).map(String::from).unwrap_or_default();

        Ok(HdrFile {
            product_id,
            region_id,
            maker_id: fixed_str(bytes, 0x04, 2)?,
            product_name: fixed_str(bytes, 0x20, 0x3E0)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        let mut bytes = vec![0u8; HDR_SIZE];
        bytes[..6].copy_from_slice(b"GEAP8P");
        bytes[0x20..0x38].copy_from_slice(b"Skies of Arcadia Legends");

        let hdr = HdrFile::from_bytes(&bytes).unwrap();
        assert_eq!(hdr.product_id, "GEAP");
        assert_eq!(hdr.region_id, "P");
        assert_eq!(hdr.maker_id, "8P");
        assert_eq!(hdr.product_name, "Skies of Arcadia Legends");
    }

    #[test]
    fn test_short_header() {
        assert!(matches!(
            HdrFile::from_bytes(b"GEAE8P"),
            Err(AlxError::InputIntegrity(_))
        ));
    }
}
