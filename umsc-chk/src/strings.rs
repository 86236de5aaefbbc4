use std::collections::HashMap;

use umsc_types::StringId;

use crate::chunk::RawChunk;
use crate::error::{ChkError, Result};

/// The `STR ` chunk: a deduplicated table of null-terminated strings,
/// addressed everywhere else in the archive by a 1-based offset-table
/// index.
///
/// Every other chunk that needs to carry text (trigger message actions,
/// leaderboard captions, location names used only for debugging, ...)
/// stores a [`StringId`] into this table rather than inlining the bytes, so
/// the compiler interns every string it emits exactly once.
#[derive(Debug, Clone, Default)]
pub struct StringsChunk {
    strings: Vec<String>,
    index: HashMap<String, StringId>,
}

impl StringsChunk {
    /// Creates an empty table. Index 0 is reserved (strings are 1-indexed,
    /// matching the offset table's own layout where slot 0 of the pointer
    /// array is never dereferenced).
    pub fn new() -> Self {
        Self { strings: vec![String::new()], index: HashMap::new() }
    }

    /// Interns `text`, returning its existing id if already present.
    pub fn intern(&mut self, text: &str) -> StringId {
        if let Some(&id) = self.index.get(text) {
            return id;
        }

        let id = self.strings.len() as StringId;
        self.strings.push(text.to_owned());
        self.index.insert(text.to_owned(), id);
        id
    }

    /// Looks up a previously interned string's bytes.
    pub fn get(&self, id: StringId) -> Option<&str> {
        self.strings.get(id as usize).map(String::as_str)
    }

    /// Finds the id of a string already in the table, without interning it.
    pub fn find(&self, text: &str) -> Option<StringId> {
        self.index.get(text).copied()
    }

    /// Encodes the table as an `STR ` chunk payload: a `u16` string count,
    /// followed by that many little-endian `u16` byte-offsets (relative to
    /// the start of the chunk), followed by the null-terminated string data
    /// in table order.
    pub fn to_raw_chunk(&self) -> RawChunk {
        let count = self.strings.len();
        let header_len = 2 + count * 2;

        let mut data = Vec::new();
        let mut offsets = Vec::with_capacity(count);

        for s in &self.strings {
            offsets.push(header_len + data.len());
            data.extend_from_slice(s.as_bytes());
            data.push(0);
        }

        let mut out = Vec::with_capacity(header_len + data.len());
        out.extend_from_slice(&(count as u16).to_le_bytes());
        for offset in offsets {
            out.extend_from_slice(&(offset as u16).to_le_bytes());
        }
        out.extend_from_slice(&data);

        RawChunk::new("STR ", out)
    }

    /// Decodes an `STR ` chunk payload back into a string table.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 2 {
            return Err(ChkError::TruncatedChunk {
                tag: "STR ".into(),
                declared: 2,
                available: bytes.len(),
            });
        }

        let count = u16::from_le_bytes([bytes[0], bytes[1]]) as usize;
        let mut strings = Vec::with_capacity(count);
        let mut index = HashMap::new();

        for i in 0..count {
            let offset_pos = 2 + i * 2;
            let offset = u16::from_le_bytes([
                *bytes.get(offset_pos).ok_or_else(truncated)?,
                *bytes.get(offset_pos + 1).ok_or_else(truncated)?,
            ]) as usize;

            let end = bytes[offset..].iter().position(|&b| b == 0).map(|p| offset + p).unwrap_or(bytes.len());
            let s = String::from_utf8_lossy(&bytes[offset..end]).into_owned();
            if i > 0 {
                index.insert(s.clone(), i as StringId);
            }
            strings.push(s);
        }

        Ok(Self { strings, index })
    }
}

fn truncated() -> ChkError {
    ChkError::TruncatedChunk { tag: "STR ".into(), declared: 0, available: 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_zero_is_reserved_and_empty() {
        let chunk = StringsChunk::new();
        assert_eq!(chunk.get(0), Some(""));
    }

    #[test]
    fn interning_the_same_text_twice_returns_the_same_id() {
        let mut chunk = StringsChunk::new();
        let a = chunk.intern("victory");
        let b = chunk.intern("victory");
        assert_eq!(a, b);
        assert_eq!(chunk.intern("other"), a + 1);
    }

    #[test]
    fn find_does_not_intern() {
        let mut chunk = StringsChunk::new();
        assert_eq!(chunk.find("nope"), None);
        let id = chunk.intern("nope");
        assert_eq!(chunk.find("nope"), Some(id));
    }

    #[test]
    fn to_raw_chunk_then_from_bytes_round_trips() {
        let mut chunk = StringsChunk::new();
        chunk.intern("Lost Temple");
        chunk.intern("Main Base");

        let raw = chunk.to_raw_chunk();
        assert_eq!(raw.tag_str(), "STR ");

        let decoded = StringsChunk::from_bytes(&raw.bytes).unwrap();
        assert_eq!(decoded.get(1), Some("Lost Temple"));
        assert_eq!(decoded.get(2), Some("Main Base"));
        assert_eq!(decoded.find("Main Base"), Some(2));
    }
}
