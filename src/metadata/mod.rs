//! Platform metadata files
//!
//! Small fixed-layout files that carry the product, region and maker
//! identity of an installation:
//! - [`bnr`] - GameCube banner (product name, maker name, description)
//! - [`hdr`] - GameCube disc header (product, region and maker IDs)
//! - [`ip`] - Dreamcast `IP.BIN` boot sector

pub mod bnr;
pub mod hdr;
pub mod ip;

pub use bnr::BnrFile;
pub use hdr::HdrFile;
pub use ip::IpFile;

use crate::error::{AlxError, Result};
use std::path::Path;

/// Read a whole metadata file, failing with `InputIntegrity` when it is
/// shorter than `min_len`.
pub(crate) fn read_fixed(path: &Path, min_len: usize) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(AlxError::FileMissing(path.to_path_buf()));
    }

    let bytes = std::fs::read(path)?;
    if bytes.len() < min_len {
        return Err(AlxError::InputIntegrity(format!(
            "{} is {} bytes, expected at least {}",
            path.display(),
            bytes.len(),
            min_len
        )));
    }
    Ok(bytes)
}

/// Fixed-length text field, cut at the first NUL and trimmed. Fails with
/// `InputIntegrity` when the field runs past the end of `bytes`.
pub(crate) fn fixed_str(bytes: &[u8], offset: usize, len: usize) -> Result<String> {
    let field = offset
        .checked_add(len)
        .and_then(|end| bytes.get(offset..end))
        .ok_or_else(|| {
            AlxError::InputIntegrity(format!(
                "field {:#x}+{:#x} past end of {} bytes",
                offset,
                len,
                bytes.len()
            ))
        })?;
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    Ok(String::from_utf8_lossy(&field[..end]).trim().to_string())
}
