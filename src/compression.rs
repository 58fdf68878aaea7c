//! Compressed asset containers
//!
//! Each platform names its container codec in `CFG.platform_compressions`.
//!
//! **Formats**:
//! - `raw`: data stored as is
//! - `aklz`: 12-byte signature, decompressed size (u32, big-endian), then
//!   LZSS flag groups over a 4 KiB ring buffer
//! - `lz4`: LZ4 block with prepended size
//! - `zstd`: Zstandard frame

use crate::error::{AlxError, Result};
use std::fmt;

/// AKLZ container signature
pub const AKLZ_MAGIC: [u8; 12] = *b"AKLZ~?Qd=\xCC\xCC\xCD";

const AKLZ_HEADER_SIZE: usize = 16;
const RING_SIZE: usize = 0x1000;
const RING_START: usize = 0xFEE;
const MIN_MATCH: usize = 3;
const MAX_MATCH: usize = 0x12;

/// Decompressed size upper bound for every container
const MAX_DECOMPRESSED: usize = 64 * 1024 * 1024;

/// Compression codec for a container
pub trait CompressionCodec: Send + Sync {
    fn name(&self) -> &'static str;

    /// True when `data` carries this codec's container format
    fn detect(&self, data: &[u8]) -> bool;

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Codec selector as written in the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Raw,
    Aklz,
    Lz4,
    Zstd,
}

impl CompressionMethod {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "raw" | "none" => Ok(CompressionMethod::Raw),
            "aklz" => Ok(CompressionMethod::Aklz),
            "lz4" => Ok(CompressionMethod::Lz4),
            "zstd" => Ok(CompressionMethod::Zstd),
            other => Err(AlxError::CodecFailure(format!(
                "unknown compression '{}' (valid: raw, aklz, lz4, zstd)",
                other
            ))),
        }
    }

    pub fn codec(self) -> Box<dyn CompressionCodec> {
        match self {
            CompressionMethod::Raw => Box::new(Raw),
            CompressionMethod::Aklz => Box::new(Aklz),
            CompressionMethod::Lz4 => Box::new(Lz4),
            CompressionMethod::Zstd => Box::new(Zstd),
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.codec().name())
    }
}

/// Uncompressed container
pub struct Raw;

impl CompressionCodec for Raw {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn detect(&self, _data: &[u8]) -> bool {
        false
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}

/// AKLZ (LZSS) container
pub struct Aklz;

impl CompressionCodec for Aklz {
    fn name(&self) -> &'static str {
        "aklz"
    }

    fn detect(&self, data: &[u8]) -> bool {
        data.starts_with(&AKLZ_MAGIC)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < AKLZ_HEADER_SIZE || !self.detect(data) {
            return Err(AlxError::CodecFailure("AKLZ signature not found".to_string()));
        }

        let size = u32::from_be_bytes([data[12], data[13], data[14], data[15]]) as usize;
        if size > MAX_DECOMPRESSED {
            return Err(AlxError::CodecFailure(format!(
                "AKLZ declares {} bytes, limit is {}",
                size, MAX_DECOMPRESSED
            )));
        }
        // no input byte expands past MAX_MATCH output bytes
        let bound = (data.len() - AKLZ_HEADER_SIZE).saturating_mul(MAX_MATCH);
        let mut out = Vec::with_capacity(size.min(bound));
        let mut ring = [0u8; RING_SIZE];
        let mut r = RING_START;
        let mut pos = AKLZ_HEADER_SIZE;

        while out.len() < size {
            let flags = *data.get(pos).ok_or_else(truncated)?;
            pos += 1;

            for bit in 0..8 {
                if out.len() >= size {
                    break;
                }

                if flags & (1 << bit) != 0 {
                    let byte = *data.get(pos).ok_or_else(truncated)?;
                    pos += 1;
                    out.push(byte);
                    ring[r] = byte;
                    r = (r + 1) & (RING_SIZE - 1);
                } else {
                    let lo = *data.get(pos).ok_or_else(truncated)? as usize;
                    let hi = *data.get(pos + 1).ok_or_else(truncated)? as usize;
                    pos += 2;

                    let offset = lo | ((hi & 0xF0) << 4);
                    let length = (hi & 0x0F) + MIN_MATCH;
                    for k in 0..length {
                        if out.len() >= size {
                            break;
                        }
                        let byte = ring[(offset + k) & (RING_SIZE - 1)];
                        out.push(byte);
                        ring[r] = byte;
                        r = (r + 1) & (RING_SIZE - 1);
                    }
                }
            }
        }

        Ok(out)
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let size = u32::try_from(data.len())
            .map_err(|_| AlxError::CodecFailure("AKLZ input exceeds 4 GiB".to_string()))?;

        let mut out = Vec::with_capacity(AKLZ_HEADER_SIZE + data.len() + data.len() / 8 + 1);
        out.extend_from_slice(&AKLZ_MAGIC);
        out.extend_from_slice(&size.to_be_bytes());

        let window = RING_SIZE - MAX_MATCH;
        let mut pos = 0;
        while pos < data.len() {
            let flag_at = out.len();
            out.push(0);

            for bit in 0..8 {
                if pos >= data.len() {
                    break;
                }

                let (src, length) = longest_match(data, pos, window);
                if length >= MIN_MATCH {
                    let offset = (RING_START + src) & (RING_SIZE - 1);
                    out.push((offset & 0xFF) as u8);
                    out.push((((offset >> 4) & 0xF0) | (length - MIN_MATCH)) as u8);
                    pos += length;
                } else {
                    out[flag_at] |= 1 << bit;
                    out.push(data[pos]);
                    pos += 1;
                }
            }
        }

        Ok(out)
    }
}

/// Greedy search for the longest earlier occurrence of `data[pos..]`
fn longest_match(data: &[u8], pos: usize, window: usize) -> (usize, usize) {
    let start = pos.saturating_sub(window);
    let limit = MAX_MATCH.min(data.len() - pos);
    let mut best = (0, 0);

    for src in start..pos {
        let mut length = 0;
        while length < limit && data[src + length] == data[pos + length] {
            length += 1;
        }
        if length > best.1 {
            best = (src, length);
            if length == limit {
                break;
            }
        }
    }

    best
}

fn truncated() -> AlxError {
    AlxError::CodecFailure("AKLZ stream truncated".to_string())
}

/// LZ4 block container
pub struct Lz4;

impl CompressionCodec for Lz4 {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn detect(&self, data: &[u8]) -> bool {
        data.len() >= 4
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        if let Some(prefix) = data.get(..4) {
            let size = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
            if size > MAX_DECOMPRESSED {
                return Err(AlxError::CodecFailure(format!(
                    "LZ4 declares {} bytes, limit is {}",
                    size, MAX_DECOMPRESSED
                )));
            }
        }
        lz4_flex::decompress_size_prepended(data)
            .map_err(|e| AlxError::CodecFailure(format!("LZ4 decompression failed: {}", e)))
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(lz4_flex::compress_prepend_size(data))
    }
}

/// Zstandard frame container
pub struct Zstd;

impl CompressionCodec for Zstd {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn detect(&self, data: &[u8]) -> bool {
        data.starts_with(&[0x28, 0xB5, 0x2F, 0xFD])
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        zstd::bulk::decompress(data, MAX_DECOMPRESSED)
            .map_err(|e| AlxError::CodecFailure(format!("Zstd decompression failed: {}", e)))
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        zstd::bulk::compress(data, 3)
            .map_err(|e| AlxError::CodecFailure(format!("Zstd compression failed: {}", e)))
    }
}
