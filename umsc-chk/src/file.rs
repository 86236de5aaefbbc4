use crate::chunk::ChunkTable;
use crate::cuwp::{CuwpChunk, CuwpUsedChunk};
use crate::error::{ChkError, Result};
use crate::locations::LocationsChunk;
use crate::strings::StringsChunk;
use crate::triggers::TriggersChunk;

/// The `.chk` scenario file: every chunk the trigger assembler reads from
/// or writes to, held in one place the way `CHK::File` aggregates them in
/// the original implementation.
///
/// Chunks this crate does not model (`ERA `, `DIM `, `OWNR`, `IOWN`, `VER `,
/// ...) round-trip through `other` untouched, so compiling a map never
/// drops data the trigger compiler has no business touching.
#[derive(Debug, Clone)]
pub struct ChkFile {
    pub strings: StringsChunk,
    pub triggers: TriggersChunk,
    pub locations: LocationsChunk,
    pub cuwp: CuwpChunk,
    pub cuwp_used: CuwpUsedChunk,
    pub wav: crate::wav::WavChunk,
    other: ChunkTable,
}

const KNOWN_TAGS: &[&str] = &["STR ", "TRIG", "MRGN", "UPRP", "UPUS", "WAV "];

impl ChkFile {
    /// Parses a flat `.chk` byte stream (already extracted from its MPQ
    /// container) into its constituent chunks.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let table = ChunkTable::parse(data)?;

        let strings = match table.last("STR ") {
            Some(c) => StringsChunk::from_bytes(&c.bytes)?,
            None => StringsChunk::new(),
        };
        let triggers = match table.last("TRIG") {
            Some(c) => TriggersChunk::from_bytes(&c.bytes)?,
            None => TriggersChunk::new(),
        };
        let locations = match table.last("MRGN") {
            Some(c) => LocationsChunk::from_bytes(&c.bytes)?,
            None => return Err(ChkError::MissingChunk("MRGN")),
        };
        let cuwp = match table.last("UPRP") {
            Some(c) => CuwpChunk::from_bytes(&c.bytes)?,
            None => CuwpChunk::new(),
        };
        let cuwp_used = match table.last("UPUS") {
            Some(c) => CuwpUsedChunk::from_bytes(&c.bytes)?,
            None => CuwpUsedChunk::new(),
        };
        let wav = match table.last("WAV ") {
            Some(c) => crate::wav::WavChunk::from_bytes(&c.bytes)?,
            None => crate::wav::WavChunk::new(),
        };

        let mut other = ChunkTable::new();
        for tag in table.tags() {
            if KNOWN_TAGS.contains(&tag.as_str()) {
                continue;
            }
            for chunk in table.all(&tag) {
                other.push(chunk.clone());
            }
        }

        Ok(Self { strings, triggers, locations, cuwp, cuwp_used, wav, other })
    }

    /// Serializes this container back to a flat `.chk` byte stream,
    /// re-encoding every chunk this crate understands and passing every
    /// other chunk through byte-for-byte.
    pub fn serialize(&self) -> Vec<u8> {
        let mut table = ChunkTable::new();
        table.push(self.strings.to_raw_chunk());
        table.push(self.triggers.to_raw_chunk());
        table.push(self.locations.to_raw_chunk());
        table.push(self.cuwp.to_raw_chunk());
        table.push(self.cuwp_used.to_raw_chunk());
        table.push(self.wav.to_raw_chunk());
        for tag in self.other.tags() {
            for chunk in self.other.all(&tag) {
                table.push(chunk.clone());
            }
        }
        table.serialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_chk() -> Vec<u8> {
        let mut table = ChunkTable::new();
        table.push(LocationsChunk::new(0).to_raw_chunk());
        table.push(crate::chunk::RawChunk::new("DIM ", vec![64, 0, 64, 0]));
        table.serialize()
    }

    #[test]
    fn parse_requires_an_mrgn_chunk() {
        let table = ChunkTable::new();
        let err = ChkFile::parse(&table.serialize()).unwrap_err();
        assert!(matches!(err, ChkError::MissingChunk("MRGN")));
    }

    #[test]
    fn parse_fills_in_defaults_for_every_other_missing_known_chunk() {
        let chk = ChkFile::parse(&minimal_chk()).unwrap();
        assert_eq!(chk.triggers.triggers.len(), 0);
        assert_eq!(chk.strings.get(0), Some(""));
    }

    #[test]
    fn unknown_chunks_round_trip_byte_for_byte() {
        let chk = ChkFile::parse(&minimal_chk()).unwrap();
        let reserialized = chk.serialize();
        let reparsed = ChunkTable::parse(&reserialized).unwrap();
        assert_eq!(reparsed.last("DIM ").unwrap().bytes, vec![64, 0, 64, 0]);
    }

    #[test]
    fn mutating_a_known_chunk_survives_a_round_trip() {
        let mut chk = ChkFile::parse(&minimal_chk()).unwrap();
        let id = chk.strings.intern("Lost Temple");

        let reparsed = ChkFile::parse(&chk.serialize()).unwrap();
        assert_eq!(reparsed.strings.get(id), Some("Lost Temple"));
    }
}
