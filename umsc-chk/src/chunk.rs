use std::collections::BTreeMap;

use crate::error::{ChkError, Result};

/// One tagged, length-prefixed record inside a `.chk` stream: a 4-byte ASCII
/// tag, a little-endian `u32` payload length, then the payload itself.
///
/// Mirrors the structure StarCraft's own map format uses for every chunk
/// (`STR `, `TRIG`, `MRGN`, ...); we reuse the same framing for every chunk
/// this crate knows how to produce instead of inventing a container format
/// of our own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    /// Four-character tag, space-padded (e.g. `b"STR \0"`-style `"STR "`).
    pub tag: [u8; 4],
    /// Raw, already-encoded payload bytes.
    pub bytes: Vec<u8>,
}

impl RawChunk {
    /// Builds a raw chunk from a tag string and payload.
    pub fn new(tag: &str, bytes: Vec<u8>) -> Self {
        let mut t = [b' '; 4];
        for (slot, byte) in t.iter_mut().zip(tag.as_bytes()) {
            *slot = *byte;
        }
        Self { tag: t, bytes }
    }

    /// The chunk's tag as a display string.
    pub fn tag_str(&self) -> String {
        String::from_utf8_lossy(&self.tag).into_owned()
    }
}

/// An ordered collection of [`RawChunk`]s, keyed by tag the same way the
/// original format allows: a map may carry more than one chunk under the
/// same tag (later chunks override earlier ones when the reader resolves a
/// tag to its "current" value), so chunks of the same tag are kept in
/// append order and the accessor returns the last one.
#[derive(Debug, Clone, Default)]
pub struct ChunkTable {
    chunks: BTreeMap<[u8; 4], Vec<RawChunk>>,
    order: Vec<[u8; 4]>,
}

impl ChunkTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a flat `.chk` byte stream into its constituent chunks.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut table = Self::new();
        let mut offset = 0usize;

        while offset + 8 <= data.len() {
            let mut tag = [0u8; 4];
            tag.copy_from_slice(&data[offset..offset + 4]);
            let len = u32::from_le_bytes(data[offset + 4..offset + 8].try_into().unwrap());
            offset += 8;

            let end = offset + len as usize;
            if end > data.len() {
                return Err(ChkError::TruncatedChunk {
                    tag: String::from_utf8_lossy(&tag).into_owned(),
                    declared: len,
                    available: data.len() - offset,
                });
            }

            table.push(RawChunk { tag, bytes: data[offset..end].to_vec() });
            offset = end;
        }

        Ok(table)
    }

    /// Appends a chunk, preserving insertion order for same-tag chunks.
    pub fn push(&mut self, chunk: RawChunk) {
        if !self.chunks.contains_key(&chunk.tag) {
            self.order.push(chunk.tag);
        }
        self.chunks.entry(chunk.tag).or_default().push(chunk);
    }

    /// Returns the most recently inserted chunk under `tag`, if any.
    pub fn last(&self, tag: &str) -> Option<&RawChunk> {
        let key = Self::tag_key(tag);
        self.chunks.get(&key).and_then(|v| v.last())
    }

    /// True if at least one chunk was stored under `tag`.
    pub fn has(&self, tag: &str) -> bool {
        self.chunks.contains_key(&Self::tag_key(tag))
    }

    /// Every distinct tag in the table, in first-insertion order.
    pub fn tags(&self) -> Vec<String> {
        self.order.iter().map(|t| String::from_utf8_lossy(t).into_owned()).collect()
    }

    /// Every chunk stored under `tag`, in insertion order.
    pub fn all(&self, tag: &str) -> &[RawChunk] {
        self.chunks.get(&Self::tag_key(tag)).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total size in bytes the serialized archive will occupy.
    pub fn encoded_size(&self) -> usize {
        self.order
            .iter()
            .flat_map(|tag| self.chunks.get(tag).into_iter().flatten())
            .map(|c| 8 + c.bytes.len())
            .sum()
    }

    /// Serializes every chunk, in insertion order, to a flat byte stream.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_size());
        for tag in &self.order {
            for chunk in self.chunks.get(tag).into_iter().flatten() {
                out.extend_from_slice(&chunk.tag);
                out.extend_from_slice(&(chunk.bytes.len() as u32).to_le_bytes());
                out.extend_from_slice(&chunk.bytes);
            }
        }
        out
    }

    fn tag_key(tag: &str) -> [u8; 4] {
        let mut t = [b' '; 4];
        for (slot, byte) in t.iter_mut().zip(tag.as_bytes()) {
            *slot = *byte;
        }
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_then_serialize_round_trips() {
        let mut table = ChunkTable::new();
        table.push(RawChunk::new("STR ", vec![1, 2, 3]));
        table.push(RawChunk::new("MRGN", vec![4, 5]));

        let bytes = table.serialize();
        let parsed = ChunkTable::parse(&bytes).unwrap();

        assert_eq!(parsed.last("STR ").unwrap().bytes, vec![1, 2, 3]);
        assert_eq!(parsed.last("MRGN").unwrap().bytes, vec![4, 5]);
        assert_eq!(parsed.serialize(), bytes);
    }

    #[test]
    fn later_chunk_under_the_same_tag_wins() {
        let mut table = ChunkTable::new();
        table.push(RawChunk::new("TRIG", vec![1]));
        table.push(RawChunk::new("TRIG", vec![2]));

        assert_eq!(table.last("TRIG").unwrap().bytes, vec![2]);
        assert_eq!(table.all("TRIG").len(), 2);
        assert_eq!(table.tags(), vec!["TRIG".to_string()]);
    }

    #[test]
    fn truncated_chunk_is_an_error_not_a_panic() {
        let mut bytes = b"STR ".to_vec();
        bytes.extend_from_slice(&10u32.to_le_bytes());
        bytes.extend_from_slice(&[1, 2, 3]);

        let err = ChunkTable::parse(&bytes).unwrap_err();
        assert!(matches!(err, ChkError::TruncatedChunk { .. }));
    }

    #[test]
    fn unknown_tag_reports_absent() {
        let table = ChunkTable::new();
        assert!(!table.has("STR "));
        assert!(table.last("STR ").is_none());
    }
}
