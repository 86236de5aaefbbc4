use umsc_types::{StringId, WAV_SLOT_COUNT};

use crate::chunk::RawChunk;
use crate::error::{ChkError, Result};

/// The `WAV ` chunk: 512 string-table slots naming the WAV files a
/// `play_sound`/`transmission` action can reference. A slot value of 0
/// means "unused".
#[derive(Debug, Clone, Copy)]
pub struct WavChunk {
    slots: [StringId; WAV_SLOT_COUNT],
}

impl Default for WavChunk {
    fn default() -> Self {
        Self { slots: [0; WAV_SLOT_COUNT] }
    }
}

impl WavChunk {
    /// Creates an all-empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the first free slot for `path` and returns its index.
    pub fn insert(&mut self, path: StringId) -> Result<u32> {
        let index = self.find_free()?;
        self.slots[index as usize] = path;
        Ok(index)
    }

    /// Finds, without claiming, the first free slot.
    pub fn find_free(&self) -> Result<u32> {
        self.slots
            .iter()
            .position(|&s| s == 0)
            .map(|i| i as u32)
            .ok_or(ChkError::TableFull { resource: "wav", capacity: WAV_SLOT_COUNT })
    }

    /// Reads a slot's string id back.
    pub fn get(&self, index: u32) -> Option<StringId> {
        self.slots.get(index as usize).copied()
    }

    /// Encodes the table as a `WAV ` chunk payload.
    pub fn to_raw_chunk(&self) -> RawChunk {
        let mut out = Vec::with_capacity(WAV_SLOT_COUNT * 4);
        for &slot in &self.slots {
            out.extend_from_slice(&slot.to_le_bytes());
        }
        RawChunk::new("WAV ", out)
    }

    /// Decodes a `WAV ` chunk payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut chunk = Self::default();
        for (i, record) in bytes.chunks(4).enumerate().take(WAV_SLOT_COUNT) {
            if record.len() < 4 {
                break;
            }
            chunk.slots[i] = u32::from_le_bytes(record.try_into().unwrap());
        }
        Ok(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_claims_the_first_free_slot() {
        let mut chunk = WavChunk::new();
        assert_eq!(chunk.insert(7).unwrap(), 0);
        assert_eq!(chunk.insert(9).unwrap(), 1);
        assert_eq!(chunk.get(0), Some(7));
        assert_eq!(chunk.get(1), Some(9));
    }

    #[test]
    fn find_free_does_not_claim() {
        let chunk = WavChunk::new();
        assert_eq!(chunk.find_free().unwrap(), 0);
        assert_eq!(chunk.find_free().unwrap(), 0);
    }

    #[test]
    fn insert_errors_once_every_slot_is_taken() {
        let mut chunk = WavChunk::new();
        for i in 0..WAV_SLOT_COUNT {
            chunk.insert(i as StringId + 1).unwrap();
        }
        let err = chunk.insert(1).unwrap_err();
        assert!(matches!(err, ChkError::TableFull { resource: "wav", .. }));
    }

    #[test]
    fn to_raw_chunk_then_from_bytes_round_trips() {
        let mut chunk = WavChunk::new();
        chunk.insert(3).unwrap();

        let raw = chunk.to_raw_chunk();
        let decoded = WavChunk::from_bytes(&raw.bytes).unwrap();
        assert_eq!(decoded.get(0), Some(3));
        assert_eq!(decoded.get(1), Some(0));
    }
}
