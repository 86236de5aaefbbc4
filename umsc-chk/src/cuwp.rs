use umsc_types::CUWP_SLOT_COUNT;

use crate::chunk::RawChunk;
use crate::error::{ChkError, Result};

/// One "custom unit with properties" template: the exact hit
/// points/shields/energy/hangar/cloak/burrow/invincibility overrides a
/// `spawn` call can stamp onto the units it creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CuwpSlot {
    pub hp_percent: u8,
    pub shields_percent: u8,
    pub energy_percent: u8,
    pub resource_amount: u16,
    pub hangar_count: u16,
    pub flags: u16,
    pub player_mask: u16,
}

const RECORD_LEN: usize = 1 + 1 + 1 + 1 /* pad */ + 2 + 2 + 2 + 2;

/// The `UPRP` chunk: 64 fixed template slots referenced by `spawn`'s
/// optional properties block.
#[derive(Debug, Clone)]
pub struct CuwpChunk {
    slots: [CuwpSlot; CUWP_SLOT_COUNT],
}

impl Default for CuwpChunk {
    fn default() -> Self {
        Self { slots: [CuwpSlot::default(); CUWP_SLOT_COUNT] }
    }
}

impl CuwpChunk {
    /// Creates an all-default template table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites a fixed slot with a template.
    pub fn set(&mut self, slot: u8, value: CuwpSlot) -> Result<()> {
        self.slots
            .get_mut(slot as usize)
            .map(|s| *s = value)
            .ok_or(ChkError::TableFull { resource: "cuwp", capacity: CUWP_SLOT_COUNT })
    }

    /// Reads a slot back.
    pub fn get(&self, slot: u8) -> Option<&CuwpSlot> {
        self.slots.get(slot as usize)
    }

    /// Encodes the table as a `UPRP` chunk payload.
    pub fn to_raw_chunk(&self) -> RawChunk {
        let mut out = Vec::with_capacity(CUWP_SLOT_COUNT * RECORD_LEN);
        for slot in &self.slots {
            out.push(slot.hp_percent);
            out.push(slot.shields_percent);
            out.push(slot.energy_percent);
            out.push(0); // alignment pad
            out.extend_from_slice(&slot.resource_amount.to_le_bytes());
            out.extend_from_slice(&slot.hangar_count.to_le_bytes());
            out.extend_from_slice(&slot.flags.to_le_bytes());
            out.extend_from_slice(&slot.player_mask.to_le_bytes());
        }
        RawChunk::new("UPRP", out)
    }

    /// Decodes a `UPRP` chunk payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut chunk = Self::default();
        for (i, record) in bytes.chunks(RECORD_LEN).enumerate().take(CUWP_SLOT_COUNT) {
            if record.len() < RECORD_LEN {
                break;
            }
            chunk.slots[i] = CuwpSlot {
                hp_percent: record[0],
                shields_percent: record[1],
                energy_percent: record[2],
                resource_amount: u16::from_le_bytes([record[4], record[5]]),
                hangar_count: u16::from_le_bytes([record[6], record[7]]),
                flags: u16::from_le_bytes([record[8], record[9]]),
                player_mask: u16::from_le_bytes([record[10], record[11]]),
            };
        }
        Ok(chunk)
    }
}

/// The `UPUS` chunk: a used-mask, one byte per [`CuwpChunk`] slot, tracking
/// which templates have actually been assigned so the assembler can find a
/// free one without scanning for all-zero records (an all-zero template is
/// a legitimate, used template).
#[derive(Debug, Clone, Copy, Default)]
pub struct CuwpUsedChunk {
    used: [bool; CUWP_SLOT_COUNT],
}

impl CuwpUsedChunk {
    /// Creates an all-unused mask.
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds and claims the first unused slot.
    pub fn find_free(&mut self) -> Result<u8> {
        for (i, used) in self.used.iter_mut().enumerate() {
            if !*used {
                *used = true;
                return Ok(i as u8);
            }
        }
        Err(ChkError::TableFull { resource: "cuwp", capacity: CUWP_SLOT_COUNT })
    }

    /// True if `slot` is marked used.
    pub fn is_used(&self, slot: u8) -> bool {
        self.used.get(slot as usize).copied().unwrap_or(false)
    }

    /// Encodes the mask as a `UPUS` chunk payload: one byte per slot,
    /// matching the original format's layout (it does not bit-pack).
    pub fn to_raw_chunk(&self) -> RawChunk {
        let bytes = self.used.iter().map(|&b| b as u8).collect();
        RawChunk::new("UPUS", bytes)
    }

    /// Decodes a `UPUS` chunk payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut chunk = Self::default();
        for (i, &b) in bytes.iter().enumerate().take(CUWP_SLOT_COUNT) {
            chunk.used[i] = b != 0;
        }
        Ok(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_a_slot() {
        let mut chunk = CuwpChunk::new();
        let template = CuwpSlot { hp_percent: 50, shields_percent: 25, ..Default::default() };
        chunk.set(3, template).unwrap();
        assert_eq!(*chunk.get(3).unwrap(), template);
    }

    #[test]
    fn set_out_of_range_slot_errors() {
        let mut chunk = CuwpChunk::new();
        let err = chunk.set(CUWP_SLOT_COUNT as u8, CuwpSlot::default()).unwrap_err();
        assert!(matches!(err, ChkError::TableFull { resource: "cuwp", .. }));
    }

    #[test]
    fn to_raw_chunk_then_from_bytes_round_trips() {
        let mut chunk = CuwpChunk::new();
        chunk.set(0, CuwpSlot { hangar_count: 5, flags: 0b11, ..Default::default() }).unwrap();

        let raw = chunk.to_raw_chunk();
        let decoded = CuwpChunk::from_bytes(&raw.bytes).unwrap();
        assert_eq!(decoded.get(0), chunk.get(0));
    }

    #[test]
    fn find_free_claims_slots_in_order_and_exhausts() {
        let mut used = CuwpUsedChunk::new();
        assert_eq!(used.find_free().unwrap(), 0);
        assert_eq!(used.find_free().unwrap(), 1);
        assert!(used.is_used(0));
        assert!(!used.is_used(2));

        for _ in 2..CUWP_SLOT_COUNT {
            used.find_free().unwrap();
        }
        let err = used.find_free().unwrap_err();
        assert!(matches!(err, ChkError::TableFull { resource: "cuwp", .. }));
    }

    #[test]
    fn used_mask_round_trips() {
        let mut used = CuwpUsedChunk::new();
        used.find_free().unwrap();
        used.find_free().unwrap();

        let raw = used.to_raw_chunk();
        let decoded = CuwpUsedChunk::from_bytes(&raw.bytes).unwrap();
        assert!(decoded.is_used(0));
        assert!(decoded.is_used(1));
        assert!(!decoded.is_used(2));
    }
}
