//! Front end, intermediate representation and trigger assembler for the
//! UMSC trigger-scripting language.
//!
//! [`Compiler::compile`] is the single entry point: it takes a parsed
//! [`ast::Ast`] and a base map already packaged as an MPQ archive, and
//! patches that archive's scenario chunk in place with the compiled
//! trigger data. The source language has no syntax of its own for map
//! geography (unit placement, location bounds, terrain), so every compile
//! is necessarily a patch against a base map rather than a build from
//! nothing.

#![warn(missing_docs)]

pub mod assembler;
pub mod ast;
mod error;
pub mod ir;

pub use error::{CompileError, Result};

use tracing::{debug, instrument};
use umsc_chk::{ChkFile, Location, TriggerActionType, TriggerConditionType};
use umsc_types::{LocationId, StringId, ANYWHERE_LOCATION, LOCATION_SLOT_COUNT};

use ast::Ast;

/// Compiles programs against a base map's chunk data.
///
/// Holds no state of its own between calls; it exists as a type, rather
/// than a bare function, so a caller can name it in a signature the way
/// the rest of this crate's passes are named (`Lowerer`, `Assembler`).
#[derive(Debug, Default)]
pub struct Compiler;

impl Compiler {
    /// Creates a compiler.
    pub fn new() -> Self {
        Self
    }

    /// Compiles `ast` and writes the result into `base_archive`'s scenario
    /// chunk.
    ///
    /// `base_archive` must be a complete MPQ-packaged `.scx`/`.scm` file
    /// whose scenario chunk already declares an `MRGN` (location) table;
    /// everything this crate emits, named locations, CUWP templates and
    /// interned strings, is merged into the base map's own tables rather
    /// than replacing them, so triggers the map already carries (if any)
    /// and its terrain/placement data survive untouched.
    #[instrument(skip_all)]
    pub fn compile(&self, ast: &Ast, base_archive: &mut [u8]) -> Result<()> {
        let chk_bytes = umsc_chk::mpq::extract_scenario_chk(base_archive)?;
        let mut chk = ChkFile::parse(&chk_bytes)?;

        let folded: Vec<_> = ast.declarations.iter().cloned().map(ir::fold).collect();
        let folded_ast = Ast::new(folded);

        let lowered = ir::Lowerer::new(&folded_ast).lower()?;
        let instructions = ir::optimize(lowered.instructions);
        debug!(instructions = instructions.len(), "lowered and peephole-optimized");
        let program = ir::LoweredProgram { instructions, ..lowered };

        let mut triggers = assembler::assemble(&program)?;
        debug!(triggers = triggers.triggers.len(), "assembled trigger records");

        let string_ids: Vec<StringId> =
            program.strings.iter().map(|s| chk.strings.intern(s)).collect();
        let location_ids: Vec<LocationId> = program
            .locations
            .iter()
            .map(|name| resolve_location(&mut chk, name))
            .collect::<Result<_>>()?;
        let cuwp_ids: Vec<u8> = program
            .cuwp_templates
            .iter()
            .map(|props| install_cuwp(&mut chk, props))
            .collect::<Result<_>>()?;

        remap(&mut triggers, &string_ids, &location_ids, &cuwp_ids);
        chk.triggers = triggers;

        umsc_chk::mpq::replace_scenario_chk(base_archive, &chk.serialize())?;
        Ok(())
    }
}

/// Resolves a source-level location name against the base map's own
/// `MRGN` table, reusing a location already declared under that name and
/// only allocating a fresh zero-bounds slot when none exists. The source
/// language has no way to specify a location's geometry itself; a newly
/// allocated location is a placeholder the map author is expected to
/// reshape in the editor afterwards.
fn resolve_location(chk: &mut ChkFile, name: &str) -> Result<LocationId> {
    if let Some(existing) = chk.strings.find(name) {
        for slot in 0..LOCATION_SLOT_COUNT as LocationId {
            if chk.locations.get(slot).map(|l| l.name) == Some(existing) {
                return Ok(slot);
            }
        }
    }

    let name_id = chk.strings.intern(name);
    let location = Location { left: 0, top: 0, right: 0, bottom: 0, name: name_id, elevation_flags: 0 };
    Ok(chk.locations.insert(location)?)
}

/// Installs one `unit { ... }` template into the base map's `UPRP` table
/// and marks its `UPUS` slot used, returning the slot it landed in.
fn install_cuwp(chk: &mut ChkFile, props: &[(umsc_types::UnitPropType, u32)]) -> Result<u8> {
    let slot = chk.cuwp_used.find_free()?;
    chk.cuwp.set(slot, cuwp_slot(props))?;
    Ok(slot)
}

/// Packs a lowered unit-properties template into the fixed-width record
/// the `UPRP` chunk stores. `UnitPropType` has five percent/count-style
/// properties and five boolean toggles; `CuwpSlot` gives the toggles one
/// shared bitmask field since the container has no room for five more.
fn cuwp_slot(props: &[(umsc_types::UnitPropType, u32)]) -> umsc_chk::CuwpSlot {
    use umsc_types::UnitPropType::*;

    const CLOAKED: u16 = 1 << 0;
    const BURROWED: u16 = 1 << 1;
    const IN_TRANSIT: u16 = 1 << 2;
    const HALLUCINATED: u16 = 1 << 3;
    const INVINCIBLE: u16 = 1 << 4;

    let mut slot = umsc_chk::CuwpSlot::default();
    for &(prop, value) in props {
        match prop {
            HitPoints => slot.hp_percent = value.min(255) as u8,
            ShieldPoints => slot.shields_percent = value.min(255) as u8,
            Energy => slot.energy_percent = value.min(255) as u8,
            ResourceAmount => slot.resource_amount = value.min(u16::MAX as u32) as u16,
            HangarCount => slot.hangar_count = value.min(u16::MAX as u32) as u16,
            Cloaked => slot.flags |= CLOAKED,
            Burrowed => slot.flags |= BURROWED,
            InTransit => slot.flags |= IN_TRANSIT,
            Hallucinated => slot.flags |= HALLUCINATED,
            Invincible => slot.flags |= INVINCIBLE,
        }
    }
    slot
}

/// Rewrites every locally-numbered string, location and CUWP reference the
/// assembler baked into `chunk` into the id that reference actually
/// resolved to in the base map's own tables.
///
/// The assembler has no visibility into the base map while it runs, it
/// only knows the lowerer's own zero-based numbering for each table, so
/// this has to happen as a pass over the finished trigger records rather
/// than threading the real ids through assembly itself.
fn remap(
    chunk: &mut umsc_chk::TriggersChunk,
    string_ids: &[StringId],
    location_ids: &[LocationId],
    cuwp_ids: &[u8],
) {
    let resolve_loc = |encoded: u32| -> u32 {
        if encoded == 0 {
            return 0;
        }
        let raw = encoded - 1;
        if raw as LocationId == ANYWHERE_LOCATION {
            return encoded;
        }
        location_ids[raw as usize] as u32 + 1
    };

    for trigger in &mut chunk.triggers {
        for condition in &mut trigger.conditions {
            if condition.condition_type == TriggerConditionType::Bring as u8 {
                condition.location = resolve_loc(condition.location);
            }
        }

        for action in &mut trigger.actions {
            action.source = resolve_loc(action.source);
            if action.trigger_text != 0 {
                action.trigger_text = string_ids[action.trigger_text as usize];
            }
            if action.wav_string_index != 0 {
                action.wav_string_index = string_ids[action.wav_string_index as usize];
            }

            let moves_to_location = action.action_type == TriggerActionType::MoveUnit as u8
                || action.action_type == TriggerActionType::MoveLocation as u8;
            if moves_to_location {
                action.arg0 = resolve_loc(action.arg0);
            }
            if action.action_type == TriggerActionType::CreateUnitWithProperties as u8 {
                action.arg0 = cuwp_ids[action.arg0 as usize] as u32;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::Node;
    use umsc_chk::{ChunkTable, LocationsChunk};

    // Reimplements the MPQ archive's crypt table/hash/encrypt routines so
    // this crate's own tests can build a throwaway archive fixture without
    // depending on umsc-chk's private test helpers; see umsc_chk::mpq for
    // the reader/writer this mirrors.
    fn crypt_table() -> [u32; 0x500] {
        let mut table = [0u32; 0x500];
        let mut seed: u32 = 0x0010_0001;
        for i in 0..0x100usize {
            let mut index = i;
            for _ in 0..5 {
                seed = (seed.wrapping_mul(125) + 3) % 0x002A_AAAB;
                let temp1 = (seed & 0xFFFF) << 16;
                seed = (seed.wrapping_mul(125) + 3) % 0x002A_AAAB;
                let temp2 = seed & 0xFFFF;
                table[index] = temp1 | temp2;
                index += 0x100;
            }
        }
        table
    }

    fn hash_string(table: &[u32; 0x500], s: &str, hash_type: u32) -> u32 {
        let mut seed1: u32 = 0x7FED_7FED;
        let mut seed2: u32 = 0xEEEE_EEEE;
        for byte in s.to_ascii_uppercase().bytes() {
            let index = (hash_type.wrapping_mul(0x100)).wrapping_add(byte as u32) as usize;
            seed1 = table[index] ^ seed1.wrapping_add(seed2);
            seed2 = (byte as u32).wrapping_add(seed1).wrapping_add(seed2).wrapping_add(seed2 << 5).wrapping_add(3);
        }
        seed1
    }

    fn encrypt(table: &[u32; 0x500], data: &mut [u8], mut key: u32) {
        let mut seed2: u32 = 0xEEEE_EEEE;
        for chunk in data.chunks_exact_mut(4) {
            seed2 = seed2.wrapping_add(table[(0x400 + (key & 0xFF)) as usize]);
            let value = u32::from_le_bytes(chunk.try_into().unwrap());
            let encrypted = value ^ key.wrapping_add(seed2);
            seed2 = value.wrapping_add(seed2).wrapping_add(seed2 << 5).wrapping_add(3);
            key = ((!key) << 0x15).wrapping_add(0x1111_1111) | (key >> 0x0B);
            chunk.copy_from_slice(&encrypted.to_le_bytes());
        }
    }

    const SCENARIO_PATH: &str = "staredit\\scenario.chk";
    const HASH_NAME_A: u32 = 1;
    const HASH_NAME_B: u32 = 2;
    const HASH_KEY: u32 = 3;
    const BLOCK_EXISTS: u32 = 0x8000_0000;

    fn build_archive(chk_bytes: &[u8], reserved_size: usize) -> Vec<u8> {
        let table = crypt_table();

        let file_pos = 32usize;
        let hash_table_offset = file_pos + reserved_size;
        let block_table_offset = hash_table_offset + 16;

        let mut archive = vec![0u8; block_table_offset + 16];
        archive[0..4].copy_from_slice(&0x1A51_504Du32.to_le_bytes());
        archive[16..20].copy_from_slice(&(hash_table_offset as u32).to_le_bytes());
        archive[20..24].copy_from_slice(&(block_table_offset as u32).to_le_bytes());
        archive[28..32].copy_from_slice(&1u32.to_le_bytes());

        archive[file_pos..file_pos + chk_bytes.len()].copy_from_slice(chk_bytes);

        let mut hash_entry = [0u8; 16];
        hash_entry[0..4].copy_from_slice(&hash_string(&table, SCENARIO_PATH, HASH_NAME_A).to_le_bytes());
        hash_entry[4..8].copy_from_slice(&hash_string(&table, SCENARIO_PATH, HASH_NAME_B).to_le_bytes());
        encrypt(&table, &mut hash_entry, hash_string(&table, "(hash table)", HASH_KEY));
        archive[hash_table_offset..hash_table_offset + 16].copy_from_slice(&hash_entry);

        let mut block_entry = [0u8; 16];
        block_entry[0..4].copy_from_slice(&(file_pos as u32).to_le_bytes());
        block_entry[4..8].copy_from_slice(&(reserved_size as u32).to_le_bytes());
        block_entry[8..12].copy_from_slice(&(chk_bytes.len() as u32).to_le_bytes());
        block_entry[12..16].copy_from_slice(&BLOCK_EXISTS.to_le_bytes());
        encrypt(&table, &mut block_entry, hash_string(&table, "(block table)", HASH_KEY));
        archive[block_table_offset..block_table_offset + 16].copy_from_slice(&block_entry);

        archive
    }

    fn minimal_base_map() -> Vec<u8> {
        let mut table = ChunkTable::new();
        table.push(LocationsChunk::new(0).to_raw_chunk());
        build_archive(&table.serialize(), 65536)
    }

    #[test]
    fn compiling_a_display_message_patches_the_archive_with_one_trigger() {
        let ast = Ast::new(vec![
            Node::EventDeclaration {
                conditions: vec![],
                actions: vec![Node::call("print", vec![Node::Str("hello, newkirk station".into())])],
            },
            Node::FunctionDeclaration {
                name: "main".into(),
                params: vec![],
                body: vec![Node::call("poll_events", vec![])],
            },
        ]);

        let mut archive = minimal_base_map();
        Compiler::new().compile(&ast, &mut archive).unwrap();

        let chk_bytes = umsc_chk::mpq::extract_scenario_chk(&archive).unwrap();
        let chk = ChkFile::parse(&chk_bytes).unwrap();

        assert!(chk.triggers.triggers.len() >= 2, "an event marker trigger plus the display action");
        let has_display = chk.triggers.triggers.iter().any(|t| {
            t.actions.iter().any(|a| a.action_type == TriggerActionType::DisplayTextMessage as u8)
        });
        assert!(has_display);

        let text_id = chk
            .triggers
            .triggers
            .iter()
            .flat_map(|t| t.actions.iter())
            .find(|a| a.action_type == TriggerActionType::DisplayTextMessage as u8)
            .map(|a| a.trigger_text)
            .unwrap();
        assert_eq!(chk.strings.get(text_id), Some("hello, newkirk station"));
    }

    #[test]
    fn compiling_a_named_location_allocates_it_in_the_base_map_s_mrgn_table() {
        let ast = Ast::new(vec![
            Node::EventDeclaration {
                conditions: vec![Node::EventCondition {
                    name: "bring".into(),
                    args: vec![
                        Node::Number(0),
                        Node::Number(0),
                        Node::Str("Landing Zone".into()),
                        Node::Str("at_least".into()),
                        Node::Number(1),
                    ],
                }],
                actions: vec![Node::call("end", vec![Node::Number(0), Node::Str("victory".into())])],
            },
            Node::FunctionDeclaration {
                name: "main".into(),
                params: vec![],
                body: vec![Node::call("poll_events", vec![])],
            },
        ]);

        let mut archive = minimal_base_map();
        Compiler::new().compile(&ast, &mut archive).unwrap();

        let chk_bytes = umsc_chk::mpq::extract_scenario_chk(&archive).unwrap();
        let chk = ChkFile::parse(&chk_bytes).unwrap();

        let name_id = chk.strings.find("Landing Zone").expect("location name interned");
        assert!((0..umsc_types::LOCATION_SLOT_COUNT as u32).any(|slot| {
            chk.locations.get(slot).map(|l| l.name) == Some(name_id)
        }));
    }

    #[test]
    fn compiling_into_an_archive_with_too_little_reserved_space_fails_cleanly() {
        let mut table = ChunkTable::new();
        table.push(LocationsChunk::new(0).to_raw_chunk());
        let original = table.serialize();
        // Room for the base map's own MRGN chunk, but not for the STR/TRIG
        // chunks compiling this program would add on top of it.
        let mut archive = build_archive(&original, original.len() + 64);

        let ast = Ast::new(vec![
            Node::EventDeclaration {
                conditions: vec![],
                actions: vec![Node::call("print", vec![Node::Str("too long to fit in sixty-four spare bytes".into())])],
            },
            Node::FunctionDeclaration {
                name: "main".into(),
                params: vec![],
                body: vec![Node::call("poll_events", vec![])],
            },
        ]);

        let err = Compiler::new().compile(&ast, &mut archive);
        assert!(err.is_err());
    }
}
