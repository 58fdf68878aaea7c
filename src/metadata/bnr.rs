//! GameCube banner (`opening.bnr`)

use super::{fixed_str, read_fixed};
use crate::error::{AlxError, Result};
use std::path::Path;

/// Offset of the first description block
pub const INFO_OFFSET: usize = 0x1820;
/// Size of a BNR1 banner
pub const BNR1_SIZE: usize = 0x1960;

/// Banner identity fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BnrFile {
    pub product_name: String,
    pub maker_name: String,
    pub description: String,
}

impl BnrFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = read_fixed(path.as_ref(), BNR1_SIZE)?;
        Self::from_bytes(&bytes)
    }

    /// Parse the first description block. The long names win over the
    /// short ones when present.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < BNR1_SIZE || !(bytes.starts_with(b"BNR1") || bytes.starts_with(b"BNR2")) {
            return Err(AlxError::InputIntegrity("banner magic not found".to_string()));
        }

        let info = INFO_OFFSET;
        let short_name = fixed_str(bytes, info, 0x20)?;
        let short_maker = fixed_str(bytes, info + 0x20, 0x20)?;
        let long_name = fixed_str(bytes, info + 0x40, 0x40)?;
        let long_maker = fixed_str(bytes, info + 0x80, 0x40)?;
        let description = fixed_str(bytes, info + 0xC0, 0x80)?;

        Ok(BnrFile {
            product_name: if long_name.is_empty() { short_name } else { long_name },
            maker_name: if long_maker.is_empty() { short_maker } else { long_maker },
            description,
        })
    }
}
