//! In-game text encodings
//!
//! Text fields are stored in the legacy encoding of the release (Shift_JIS
//! for Japanese discs, windows-1252 elsewhere). Decoding is lossless: any
//! byte that does not form a character of the encoding is written as
//! `\xNN`, and a literal backslash as `\\`, so that an unedited export
//! encodes back to the original bytes.

use crate::error::{AlxError, Result};
use encoding_rs::{Encoding, UTF_8};
use std::fmt;
use std::fmt::Write as _;

/// Longest byte sequence of one character in a supported encoding
const MAX_CHAR_LEN: usize = 4;

/// Text encoding of a platform
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TextEncoding(&'static Encoding);

impl TextEncoding {
    pub fn utf8() -> Self {
        TextEncoding(UTF_8)
    }

    /// Look up a WHATWG label such as `shift_jis` or `windows-1252`. Only
    /// stateless ASCII-compatible encodings are accepted.
    pub fn from_label(label: &str) -> Result<Self> {
        let encoding = Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
            AlxError::TypeMismatch(format!("'{}' is not a text encoding", label))
        })?;

        if !encoding.is_ascii_compatible() || encoding.output_encoding() != encoding {
            return Err(AlxError::TypeMismatch(format!(
                "{} cannot encode fixed-width text",
                encoding.name()
            )));
        }
        Ok(TextEncoding(encoding))
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Decode `bytes`, escaping whatever has no character in the encoding
    pub fn decode(&self, bytes: &[u8]) -> String {
        let mut out = String::with_capacity(bytes.len());
        let mut pos = 0;

        while pos < bytes.len() {
            match self.char_at(&bytes[pos..]) {
                Some((text, len)) => {
                    for c in text.chars() {
                        if c == '\\' {
                            out.push_str("\\\\");
                        } else {
                            out.push(c);
                        }
                    }
                    pos += len;
                }
                None => {
                    let _ = write!(out, "\\x{:02X}", bytes[pos]);
                    pos += 1;
                }
            }
        }
        out
    }

    /// Encode `text`, turning `\xNN` back into raw bytes and `\\` into a
    /// backslash. Fails with `TypeMismatch` on a character the encoding
    /// lacks.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(text.len());
        let mut plain = String::new();
        let mut rest = text;

        while let Some(at) = rest.find('\\') {
            plain.push_str(&rest[..at]);
            rest = &rest[at..];

            if let Some(tail) = rest.strip_prefix("\\\\") {
                plain.push('\\');
                rest = tail;
            } else if let Some(byte) = escaped_byte(rest) {
                self.flush(&mut plain, &mut out)?;
                out.push(byte);
                rest = &rest[4..];
            } else {
                plain.push('\\');
                rest = &rest[1..];
            }
        }
        plain.push_str(rest);
        self.flush(&mut plain, &mut out)?;

        Ok(out)
    }

    /// Shortest prefix of `bytes` that decodes to text encoding back to
    /// the same bytes
    fn char_at(&self, bytes: &[u8]) -> Option<(String, usize)> {
        (1..=bytes.len().min(MAX_CHAR_LEN)).find_map(|len| {
            let chunk = &bytes[..len];
            let text = self
                .0
                .decode_without_bom_handling_and_without_replacement(chunk)?
                .into_owned();
            let exact = {
                let (back, _, unmappable) = self.0.encode(&text);
                !unmappable && &*back == chunk
            };
            exact.then_some((text, len))
        })
    }

    fn flush(&self, plain: &mut String, out: &mut Vec<u8>) -> Result<()> {
        if plain.is_empty() {
            return Ok(());
        }

        {
            let (bytes, _, unmappable) = self.0.encode(plain.as_str());
            if unmappable {
                return Err(AlxError::TypeMismatch(format!(
                    "{:?} has characters outside of {}",
                    plain,
                    self.name()
                )));
            }
            out.extend_from_slice(&bytes);
        }
        plain.clear();
        Ok(())
    }
}

impl Default for TextEncoding {
    fn default() -> Self {
        TextEncoding::utf8()
    }
}

impl fmt::Debug for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextEncoding({})", self.name())
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Byte of a `\xNN` escape at the start of `text`
fn escaped_byte(text: &str) -> Option<u8> {
    let hex = text.strip_prefix("\\x")?.get(..2)?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(hex, 16).ok()
}
