//! Fixed-width record I/O
//!
//! Records are read from and written to in-memory buffers in the byte order
//! and text encoding of the platform.

use crate::error::{AlxError, Result};
use crate::text::TextEncoding;
use std::fmt;

/// Byte order of a platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    #[default]
    Big,
    Little,
}

impl Endianness {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "be" | "big" => Ok(Endianness::Big),
            "le" | "little" => Ok(Endianness::Little),
            other => Err(AlxError::TypeMismatch(format!(
                "'{}' is not an endianness (valid: be, le)",
                other
            ))),
        }
    }
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endianness::Big => f.write_str("be"),
            Endianness::Little => f.write_str("le"),
        }
    }
}

/// Cursor over a record buffer
pub struct RecordReader<'a> {
    data: &'a [u8],
    pos: usize,
    endianness: Endianness,
    text: TextEncoding,
}

impl<'a> RecordReader<'a> {
    pub fn new(data: &'a [u8], endianness: Endianness) -> Self {
        RecordReader {
            data,
            pos: 0,
            endianness,
            text: TextEncoding::default(),
        }
    }

    pub fn with_text(self, text: TextEncoding) -> Self {
        RecordReader { text, ..self }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Take the next `len` bytes
    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos + len;
        if end > self.data.len() {
            return Err(AlxError::InputIntegrity(format!(
                "record read of {} bytes at {:#x} exceeds buffer of {:#x}",
                len,
                self.pos,
                self.data.len()
            )));
        }

        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Read an unsigned integer of `width` bytes (1, 2 or 4)
    pub fn uint(&mut self, width: usize) -> Result<u32> {
        let endianness = self.endianness;
        let bytes = self.bytes(width)?;
        let value = match (width, endianness) {
            (1, _) => bytes[0] as u32,
            (2, Endianness::Big) => u16::from_be_bytes([bytes[0], bytes[1]]) as u32,
            (2, Endianness::Little) => u16::from_le_bytes([bytes[0], bytes[1]]) as u32,
            (4, Endianness::Big) => u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            (4, Endianness::Little) => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            _ => {
                return Err(AlxError::TypeMismatch(format!(
                    "unsupported integer width {}",
                    width
                )))
            }
        };
        Ok(value)
    }

    /// Read a signed integer of `width` bytes (1, 2 or 4)
    pub fn int(&mut self, width: usize) -> Result<i32> {
        let value = self.uint(width)?;
        Ok(match width {
            1 => value as u8 as i8 as i32,
            2 => value as u16 as i16 as i32,
            _ => value as i32,
        })
    }

    /// Read NUL-padded text of `len` bytes
    pub fn text(&mut self, len: usize) -> Result<String> {
        let text = self.text;
        let bytes = self.bytes(len)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(len);
        Ok(text.decode(&bytes[..end]))
    }
}

/// Growable record buffer
pub struct RecordWriter {
    data: Vec<u8>,
    endianness: Endianness,
    text: TextEncoding,
}

impl RecordWriter {
    pub fn new(endianness: Endianness) -> Self {
        RecordWriter {
            data: Vec::new(),
            endianness,
            text: TextEncoding::default(),
        }
    }

    pub fn with_text(self, text: TextEncoding) -> Self {
        RecordWriter { text, ..self }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Write the low `width` bytes of `value` (1, 2 or 4)
    pub fn uint(&mut self, width: usize, value: u32) -> Result<()> {
        match (width, self.endianness) {
            (1, _) => self.data.push(value as u8),
            (2, Endianness::Big) => self.data.extend_from_slice(&(value as u16).to_be_bytes()),
            (2, Endianness::Little) => self.data.extend_from_slice(&(value as u16).to_le_bytes()),
            (4, Endianness::Big) => self.data.extend_from_slice(&value.to_be_bytes()),
            (4, Endianness::Little) => self.data.extend_from_slice(&value.to_le_bytes()),
            _ => {
                return Err(AlxError::TypeMismatch(format!(
                    "unsupported integer width {}",
                    width
                )))
            }
        }
        Ok(())
    }

    /// Write `value` as text padded with NULs to `len` bytes. Fails with
    /// `InputIntegrity` when the encoded text is longer than `len`.
    pub fn text(&mut self, value: &str, len: usize) -> Result<()> {
        let bytes = self.text.encode(value)?;
        if bytes.len() > len {
            return Err(AlxError::InputIntegrity(format!(
                "{:?} is {} bytes in {}, field holds {}",
                value,
                bytes.len(),
                self.text,
                len
            )));
        }
        self.data.extend_from_slice(&bytes);
        self.data.resize(self.data.len() + len - bytes.len(), 0);
        Ok(())
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}
