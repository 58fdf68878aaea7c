//! Message files
//!
//! Names and descriptions of some kinds live outside of the records, in
//! message files resolved from `<kind>_name_files` and `<kind>_dscr_files`.
//! A message region holds one NUL-terminated string per ID of the range, in
//! ID order and without gaps:
//!
//! ```text
//! offset
//!   |
//!   v
//!   Cutlass\0Sword of Valua\0\0Harpoon\0 ...
//!   |-- 0 --||------ 1 ------|| 2||-- 3 --|
//! ```
//!
//! Saving rewrites the region in sequence. It never grows: edited text must
//! fit the bytes the region held when it was read, and a shorter region is
//! padded with NULs.

use crate::error::{AlxError, Result};
use crate::text::TextEncoding;
use std::fmt;

/// Which message file a text comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MessageKind {
    Name,
    Description,
}

impl MessageKind {
    pub const ALL: [MessageKind; 2] = [MessageKind::Name, MessageKind::Description];

    /// Infix of the descriptor attribute, `name` or `dscr`
    pub fn infix(self) -> &'static str {
        match self {
            MessageKind::Name => "name",
            MessageKind::Description => "dscr",
        }
    }

    /// Header of the CSV column
    pub fn header(self) -> &'static str {
        match self {
            MessageKind::Name => "Message Name",
            MessageKind::Description => "Message Description",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.infix())
    }
}

/// One string of a message region
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Position inside the decompressed file, zero when read from CSV
    pub pos: usize,
    /// Bytes taken in the file including the terminator
    pub size: usize,
    pub value: String,
}

impl Message {
    /// Message without a file position
    pub fn text(value: impl Into<String>) -> Self {
        Message {
            value: value.into(),
            ..Message::default()
        }
    }
}

/// The messages of one region in ID order
#[derive(Debug, Clone, Default)]
pub struct MessageTable {
    offset: usize,
    messages: Vec<Message>,
}

impl MessageTable {
    /// Read `count` strings starting at `offset`
    pub fn read(data: &[u8], offset: usize, count: usize, text: TextEncoding) -> Result<Self> {
        let mut messages = Vec::with_capacity(count);
        let mut pos = offset;

        for index in 0..count {
            let rest = data.get(pos..).unwrap_or_default();
            let len = rest.iter().position(|&b| b == 0).ok_or_else(|| {
                AlxError::InputIntegrity(format!(
                    "message {} of {} at {:#x} has no terminator",
                    index, count, pos
                ))
            })?;

            messages.push(Message {
                pos,
                size: len + 1,
                value: text.decode(&rest[..len]),
            });
            pos += len + 1;
        }

        Ok(MessageTable { offset, messages })
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Bytes of the region as read
    pub fn capacity(&self) -> usize {
        self.messages.iter().map(|m| m.size).sum()
    }

    /// Rewrite the region in `data`. `values[i]` replaces message `i`;
    /// `None` keeps the stored text. Fails with `InputIntegrity` when the
    /// encoded region outgrows [`capacity`](Self::capacity).
    pub fn patch(&self, data: &mut [u8], values: &[Option<&str>], text: TextEncoding) -> Result<()> {
        let capacity = self.capacity();
        let mut region = Vec::with_capacity(capacity);

        for (index, message) in self.messages.iter().enumerate() {
            match values.get(index).copied().flatten() {
                Some(value) => region.extend_from_slice(&text.encode(value)?),
                None => region.extend_from_slice(&data[message.pos..message.pos + message.size - 1]),
            }
            region.push(0);
        }

        if region.len() > capacity {
            return Err(AlxError::InputIntegrity(format!(
                "messages take {} bytes, region at {:#x} holds {}",
                region.len(),
                self.offset,
                capacity
            )));
        }
        region.resize(capacity, 0);

        let end = self.offset + capacity;
        let target = data.get_mut(self.offset..end).ok_or_else(|| {
            AlxError::InputIntegrity(format!("message region {:#x}..{:#x} past end of file", self.offset, end))
        })?;
        target.copy_from_slice(&region);
        Ok(())
    }
}
