//! Dreamcast boot sector (`IP.BIN`)

use super::{fixed_str, read_fixed};
use crate::error::{AlxError, Result};
use std::path::Path;

/// Size of the meta information block
pub const IP_META_SIZE: usize = 0x100;

/// Boot sector identity fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpFile {
    pub maker_id: String,
    pub region_id: String,
    pub product_id: String,
    pub product_version: String,
    pub product_date: String,
    pub maker_name: String,
    pub product_name: String,
    pub description: String,
}

impl IpFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = read_fixed(path.as_ref(), IP_META_SIZE)?;
        Self::from_bytes(&bytes)
    }

    /// Parse the meta block of at least [`IP_META_SIZE`] bytes. The boot
    /// sector has no description field.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < IP_META_SIZE {
            return Err(AlxError::InputIntegrity(format!(
                "boot sector is {} bytes, expected {}",
                bytes.len(),
                IP_META_SIZE
            )));
        }

        Ok(IpFile {
            maker_id: fixed_str(bytes, 0x10, 0x10)?,
            region_id: fixed_str(bytes, 0x30, 0x08)?,
            product_id: fixed_str(bytes, 0x40, 0x0A)?,
            product_version: fixed_str(bytes, 0x4A, 0x06)?,
            product_date: fixed_str(bytes, 0x50, 0x10)?,
            maker_name: fixed_str(bytes, 0x70, 0x10)?,
            product_name: fixed_str(bytes, 0x80, 0x80)?,
            description: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_boot_sector() {
        let mut bytes = vec![b' '; IP_META_SIZE];
        let mut put = |offset: usize, text: &str| {
            bytes[offset..offset + text.len()].copy_from_slice(text.as_bytes());
        };
        put(0x00, "SEGA SEGAKATANA ");
        put(0x10, "SEGA ENTERPRISES");
        put(0x30, "J       ");
        put(0x40, "HDR-0119  ");
        put(0x4A, "V1.001");
        put(0x50, "20001005        ");
        put(0x70, "OVERWORKS");
        put(0x80, "ETERNAL ARCADIA");

        let ip = IpFile::from_bytes(&bytes).unwrap();
        assert_eq!(ip.maker_id, "SEGA ENTERPRISES");
        assert_eq!(ip.region_id, "J");
        assert_eq!(ip.product_id, "HDR-0119");
        assert_eq!(ip.product_version, "V1.001");
        assert_eq!(ip.product_date, "20001005");
        assert_eq!(ip.maker_name, "OVERWORKS");
        assert_eq!(ip.product_name, "ETERNAL ARCADIA");
        assert!(ip.description.is_empty());
    }

    #[test]
    fn test_short_boot_sector() {
        assert!(matches!(
            IpFile::from_bytes(&[b' '; 0x40]),
            Err(AlxError::InputIntegrity(_))
        ));
    }
}
