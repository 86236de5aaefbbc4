use core::fmt;

/// A physical register slot. The register file is flat: ids below
/// [`crate::ReservedRegister::ReservedEnd`] name a fixed-purpose register,
/// everything at or above it is available to the alias allocator.
pub type RegisterId = u32;

/// A switch slot, analogous to [`RegisterId`] but for the boolean switch
/// bank instead of the 32-bit register bank.
pub type SwitchId = u32;

/// A value held in a register: StarCraft triggers only ever move 32-bit
/// unsigned quantities around (death counts, unit counts, ...).
pub type Word = u32;

/// Index of one of the eight human/computer player slots, 0-based.
pub type PlayerId = u8;

/// Index into the deduplicated string table of a compiled map.
pub type StringId = u32;

/// Index into the fixed 255-slot location table.
pub type LocationId = u8;

/// Number of addressable location slots in a `MRGN` chunk.
pub const LOCATION_SLOT_COUNT: usize = 255;

/// Number of "custom unit with properties" slots in a `UPRP`/`UPUS` chunk
/// pair.
pub const CUWP_SLOT_COUNT: usize = 64;

/// Number of WAV string-table slots in a `WAV ` chunk.
pub const WAV_SLOT_COUNT: usize = 512;

/// Ceiling on the number of registers the alias allocator can hand out,
/// above [`crate::ReservedRegister::ReservedEnd`]. The original compiler
/// packs named storage into the same death-counter address space the
/// reserved registers occupy; this bound keeps a pathological program
/// from being handed an id the trigger format cannot address.
pub const MAX_ADDRESSABLE_REGISTERS: RegisterId = 2000;

/// Zero-cost wrapper giving [`fmt::Display`] to an id for diagnostics, e.g.
/// `format!("{}", Reg(3))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reg(pub RegisterId);

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reg{}", self.0)
    }
}
