use umsc_types::{LocationId, StringId, ANYWHERE_LOCATION, LOCATION_SLOT_COUNT};

use crate::chunk::RawChunk;
use crate::error::{ChkError, Result};

/// One rectangular location record, in the fixed-point map-coordinate
/// system used throughout the map format (units of 1/256th of a tile would
/// be a different chunk; locations store plain pixel bounds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    /// Name of this location, as a [`StringId`] into the archive's string
    /// table.
    pub name: StringId,
    /// Elevation-level bitmask; triggers that gate on "high ground" rely
    /// on this rather than any separate field.
    pub elevation_flags: u16,
}

const RECORD_LEN: usize = 4 * 4 + 2 + 2;

/// The `MRGN` chunk: a fixed 255-slot table of named locations. Slot
/// [`ANYWHERE_LOCATION`] is always the built-in "Anywhere" pseudo-location
/// and can never be reassigned.
#[derive(Debug, Clone)]
pub struct LocationsChunk {
    slots: [Option<Location>; LOCATION_SLOT_COUNT],
}

impl Default for LocationsChunk {
    fn default() -> Self {
        Self { slots: [None; LOCATION_SLOT_COUNT] }
    }
}

impl LocationsChunk {
    /// Creates a table with every slot empty except the reserved
    /// "Anywhere" location.
    pub fn new(anywhere_name: StringId) -> Self {
        let mut chunk = Self::default();
        chunk.slots[ANYWHERE_LOCATION as usize] = Some(Location {
            left: 0,
            top: 0,
            right: 0,
            bottom: 0,
            name: anywhere_name,
            elevation_flags: 0xFFFF,
        });
        chunk
    }

    /// Finds the first free slot and installs `location` there, returning
    /// its id.
    pub fn insert(&mut self, location: Location) -> Result<LocationId> {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if i == ANYWHERE_LOCATION as usize {
                continue;
            }
            if slot.is_none() {
                *slot = Some(location);
                return Ok(i as LocationId);
            }
        }

        Err(ChkError::TableFull { resource: "locations", capacity: LOCATION_SLOT_COUNT - 1 })
    }

    /// Looks up a location by slot id.
    pub fn get(&self, id: LocationId) -> Option<&Location> {
        self.slots.get(id as usize).and_then(Option::as_ref)
    }

    /// Encodes this table as an `MRGN` chunk payload: 255 fixed-length
    /// records back to back.
    pub fn to_raw_chunk(&self) -> RawChunk {
        let mut out = Vec::with_capacity(LOCATION_SLOT_COUNT * RECORD_LEN);
        for slot in &self.slots {
            let loc = slot.unwrap_or(Location { left: 0, top: 0, right: 0, bottom: 0, name: 0, elevation_flags: 0 });
            out.extend_from_slice(&loc.left.to_le_bytes());
            out.extend_from_slice(&loc.top.to_le_bytes());
            out.extend_from_slice(&loc.right.to_le_bytes());
            out.extend_from_slice(&loc.bottom.to_le_bytes());
            out.extend_from_slice(&(loc.name as u16).to_le_bytes());
            out.extend_from_slice(&loc.elevation_flags.to_le_bytes());
        }
        RawChunk::new("MRGN", out)
    }

    /// Decodes an `MRGN` chunk payload. A record whose name id is 0 is
    /// treated as an empty slot.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut chunk = Self::default();
        for (i, record) in bytes.chunks(RECORD_LEN).enumerate().take(LOCATION_SLOT_COUNT) {
            if record.len() < RECORD_LEN {
                break;
            }
            let name = u16::from_le_bytes([record[16], record[17]]) as StringId;
            if name == 0 {
                continue;
            }
            chunk.slots[i] = Some(Location {
                left: i32::from_le_bytes(record[0..4].try_into().unwrap()),
                top: i32::from_le_bytes(record[4..8].try_into().unwrap()),
                right: i32::from_le_bytes(record[8..12].try_into().unwrap()),
                bottom: i32::from_le_bytes(record[12..16].try_into().unwrap()),
                name,
                elevation_flags: u16::from_le_bytes([record[18], record[19]]),
            });
        }
        Ok(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: StringId) -> Location {
        Location { left: 0, top: 0, right: 320, bottom: 320, name, elevation_flags: 0 }
    }

    #[test]
    fn new_reserves_the_anywhere_slot() {
        let chunk = LocationsChunk::new(1);
        let anywhere = chunk.get(ANYWHERE_LOCATION).unwrap();
        assert_eq!(anywhere.name, 1);
        assert_eq!(anywhere.elevation_flags, 0xFFFF);
    }

    #[test]
    fn insert_skips_the_anywhere_slot_and_is_retrievable() {
        let mut chunk = LocationsChunk::new(1);
        let id = chunk.insert(sample(2)).unwrap();
        assert_ne!(id, ANYWHERE_LOCATION);
        assert_eq!(chunk.get(id).unwrap().name, 2);
    }

    #[test]
    fn insert_errors_once_every_non_anywhere_slot_is_used() {
        let mut chunk = LocationsChunk::new(1);
        for _ in 0..(LOCATION_SLOT_COUNT - 1) {
            chunk.insert(sample(2)).unwrap();
        }
        let err = chunk.insert(sample(2)).unwrap_err();
        assert!(matches!(err, ChkError::TableFull { resource: "locations", .. }));
    }

    #[test]
    fn to_raw_chunk_then_from_bytes_round_trips() {
        let mut chunk = LocationsChunk::new(1);
        let id = chunk.insert(sample(2)).unwrap();

        let raw = chunk.to_raw_chunk();
        let decoded = LocationsChunk::from_bytes(&raw.bytes).unwrap();

        assert_eq!(decoded.get(id), chunk.get(id));
        assert_eq!(decoded.get(ANYWHERE_LOCATION), chunk.get(ANYWHERE_LOCATION));
    }
}
