#![warn(missing_docs)]
//! Binary codec for the StarCraft `.chk` scenario format and the MPQ
//! archive it ships inside. This crate turns the pieces the trigger
//! assembler touches (strings, locations, unit templates, WAV names,
//! trigger records) into the fixed binary layouts the game engine expects,
//! and back.

mod chunk;
mod cuwp;
mod error;
mod file;
mod locations;
pub mod mpq;
mod strings;
mod triggers;
mod wav;

pub use chunk::{ChunkTable, RawChunk};
pub use cuwp::{CuwpChunk, CuwpSlot, CuwpUsedChunk};
pub use error::{ChkError, Result};
pub use file::ChkFile;
pub use locations::{Location, LocationsChunk};
pub use strings::StringsChunk;
pub use triggers::{
    ActionFlags,
    ConditionFlags,
    Trigger,
    TriggerAction,
    TriggerActionType,
    TriggerCondition,
    TriggerConditionType,
    TriggersChunk,
};
pub use wav::WavChunk;
