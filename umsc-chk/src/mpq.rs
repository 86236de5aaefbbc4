//! Minimal reader/writer for the MPQ archive a compiled map ships inside.
//!
//! A `.scx`/`.scm` file is an MPQ archive with a single file of interest to
//! this crate: `staredit\scenario.chk`, holding the [`crate::ChkFile`] byte
//! stream this module's siblings encode. Real MPQ archives can store that
//! file's sectors compressed with any of several third-party codecs
//! (Huffman, PKWare implode, a deflate variant, BZ2, mono/stereo ADPCM);
//! reproducing those codecs is out of scope here, so this reader only
//! accepts archives whose scenario file is stored uncompressed, and the
//! writer only ever produces stored sectors. Reading a compressed sector
//! fails with [`ChkError::MalformedArchive`] naming the codec instead of
//! silently corrupting the output.
use crate::error::{ChkError, Result};

const MPQ_MAGIC: u32 = 0x1A51504D; // "MPQ\x1A"
const HASH_ENTRY_LEN: usize = 16;
const BLOCK_ENTRY_LEN: usize = 16;

const HASH_POSITION: u32 = 0;
const HASH_NAME_A: u32 = 1;
const HASH_NAME_B: u32 = 2;
const HASH_KEY: u32 = 3;

const BLOCK_EXISTS: u32 = 0x8000_0000;
const BLOCK_COMPRESSED: u32 = 0x0000_0200;

/// Builds the 0x500-entry crypt table every MPQ hash/encrypt/decrypt
/// operation is seeded from. Deterministic: the same table is rebuilt by
/// every implementation of the format from the same fixed linear
/// congruential seed.
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

fn decrypt(table: &[u32; 0x500], data: &mut [u8], mut key: u32) {
    let mut seed2: u32 = 0xEEEE_EEEE;

    for chunk in data.chunks_exact_mut(4) {
        seed2 = seed2.wrapping_add(table[(0x400 + (key & 0xFF)) as usize]);
        let encrypted = u32::from_le_bytes(chunk.try_into().unwrap());
        let value = encrypted ^ key.wrapping_add(seed2);
        seed2 = value.wrapping_add(seed2).wrapping_add(seed2 << 5).wrapping_add(3);
        key = ((!key) << 0x15).wrapping_add(0x1111_1111) | (key >> 0x0B);
        chunk.copy_from_slice(&value.to_le_bytes());
    }
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

struct HashEntry {
    name_a: u32,
    name_b: u32,
    block_index: u32,
}

struct BlockEntry {
    file_pos: u32,
    compressed_size: u32,
    file_size: u32,
    flags: u32,
}

/// Extracts the `staredit\scenario.chk` stream out of a full MPQ archive
/// image.
pub fn extract_scenario_chk(archive: &[u8]) -> Result<Vec<u8>> {
    let table = crypt_table();

    if archive.len() < 32 || u32::from_le_bytes(archive[0..4].try_into().unwrap()) != MPQ_MAGIC {
        return Err(ChkError::MalformedArchive("missing MPQ header".into()));
    }

    let header_offset = 0usize;
    let hash_table_offset = header_offset + u32::from_le_bytes(archive[16..20].try_into().unwrap()) as usize;
    let block_table_offset = header_offset + u32::from_le_bytes(archive[20..24].try_into().unwrap()) as usize;
    let hash_table_entries = u32::from_le_bytes(archive[28..32].try_into().unwrap()) as usize;

    let mut hash_bytes = archive
        .get(hash_table_offset..hash_table_offset + hash_table_entries * HASH_ENTRY_LEN)
        .ok_or_else(|| ChkError::MalformedArchive("hash table out of bounds".into()))?
        .to_vec();
    decrypt(&table, &mut hash_bytes, hash_string(&table, "(hash table)", HASH_KEY));

    let name_a = hash_string(&table, SCENARIO_PATH, HASH_NAME_A);
    let name_b = hash_string(&table, SCENARIO_PATH, HASH_NAME_B);

    let mut found: Option<HashEntry> = None;
    for raw in hash_bytes.chunks_exact(HASH_ENTRY_LEN) {
        let entry = HashEntry {
            name_a: u32::from_le_bytes(raw[0..4].try_into().unwrap()),
            name_b: u32::from_le_bytes(raw[4..8].try_into().unwrap()),
            block_index: u32::from_le_bytes(raw[12..16].try_into().unwrap()),
        };
        if entry.name_a == name_a && entry.name_b == name_b {
            found = Some(entry);
            break;
        }
    }
    let _ = HASH_POSITION;
    let entry = found.ok_or_else(|| ChkError::MalformedArchive("archive has no scenario.chk".into()))?;

    let block_bytes = archive
        .get(block_table_offset + entry.block_index as usize * BLOCK_ENTRY_LEN..)
        .and_then(|s| s.get(..BLOCK_ENTRY_LEN))
        .ok_or_else(|| ChkError::MalformedArchive("block table out of bounds".into()))?;
    let mut block_bytes = block_bytes.to_vec();
    // The block table as a whole is encrypted with a fixed key; decrypting
    // just the one entry we need only works because each 16-byte entry is
    // itself a whole number of 4-byte cipher blocks, so we can key the
    // stream cipher at the right offset by decrypting from the start of
    // the table up to our entry and discarding the rest.
    let mut full = archive
        .get(block_table_offset..)
        .and_then(|s| s.get(..(entry.block_index as usize + 1) * BLOCK_ENTRY_LEN))
        .ok_or_else(|| ChkError::MalformedArchive("block table out of bounds".into()))?
        .to_vec();
    decrypt(&table, &mut full, hash_string(&table, "(block table)", HASH_KEY));
    block_bytes.copy_from_slice(&full[entry.block_index as usize * BLOCK_ENTRY_LEN..]);

    let block = BlockEntry {
        file_pos: u32::from_le_bytes(block_bytes[0..4].try_into().unwrap()),
        compressed_size: u32::from_le_bytes(block_bytes[4..8].try_into().unwrap()),
        file_size: u32::from_le_bytes(block_bytes[8..12].try_into().unwrap()),
        flags: u32::from_le_bytes(block_bytes[12..16].try_into().unwrap()),
    };

    if block.flags & BLOCK_EXISTS == 0 {
        return Err(ChkError::MalformedArchive("scenario.chk block marked deleted".into()));
    }
    if block.flags & BLOCK_COMPRESSED != 0 {
        return Err(ChkError::MalformedArchive(
            "scenario.chk is stored with sector compression, which this crate does not implement".into(),
        ));
    }

    let start = header_offset + block.file_pos as usize;
    let data = archive
        .get(start..start + block.compressed_size as usize)
        .ok_or_else(|| ChkError::MalformedArchive("scenario.chk data out of bounds".into()))?;

    Ok(data[..block.file_size as usize].to_vec())
}

/// Rewrites `archive` with its `staredit\scenario.chk` stream replaced by
/// `chk_bytes`, keeping every other archived file untouched. Only valid
/// when the existing scenario entry is stored uncompressed and the
/// replacement is no larger than the space already reserved for it; a
/// caller that needs the file to grow must rebuild the archive instead,
/// which this crate does not attempt.
pub fn replace_scenario_chk(archive: &mut [u8], chk_bytes: &[u8]) -> Result<()> {
    let table = crypt_table();

    let hash_table_offset = u32::from_le_bytes(archive[16..20].try_into().unwrap()) as usize;
    let block_table_offset = u32::from_le_bytes(archive[20..24].try_into().unwrap()) as usize;
    let hash_table_entries = u32::from_le_bytes(archive[28..32].try_into().unwrap()) as usize;

    let mut hash_bytes = archive[hash_table_offset..hash_table_offset + hash_table_entries * HASH_ENTRY_LEN].to_vec();
    decrypt(&table, &mut hash_bytes, hash_string(&table, "(hash table)", HASH_KEY));

    let name_a = hash_string(&table, SCENARIO_PATH, HASH_NAME_A);
    let name_b = hash_string(&table, SCENARIO_PATH, HASH_NAME_B);

    let block_index = hash_bytes
        .chunks_exact(HASH_ENTRY_LEN)
        .find(|raw| {
            u32::from_le_bytes(raw[0..4].try_into().unwrap()) == name_a
                && u32::from_le_bytes(raw[4..8].try_into().unwrap()) == name_b
        })
        .map(|raw| u32::from_le_bytes(raw[12..16].try_into().unwrap()))
        .ok_or_else(|| ChkError::MalformedArchive("archive has no scenario.chk".into()))?;

    let entry_offset = block_table_offset + block_index as usize * BLOCK_ENTRY_LEN;
    let mut block_bytes = archive[block_table_offset..entry_offset + BLOCK_ENTRY_LEN].to_vec();
    decrypt(&table, &mut block_bytes, hash_string(&table, "(block table)", HASH_KEY));
    let entry = &block_bytes[block_index as usize * BLOCK_ENTRY_LEN..][..BLOCK_ENTRY_LEN];

    let file_pos = u32::from_le_bytes(entry[0..4].try_into().unwrap()) as usize;
    let reserved_size = u32::from_le_bytes(entry[4..8].try_into().unwrap()) as usize;
    let flags = u32::from_le_bytes(entry[12..16].try_into().unwrap());

    if flags & BLOCK_COMPRESSED != 0 {
        return Err(ChkError::MalformedArchive("scenario.chk is compressed".into()));
    }
    if chk_bytes.len() > reserved_size {
        return Err(ChkError::MalformedArchive(format!(
            "new scenario.chk ({} bytes) does not fit the {} bytes reserved in the archive",
            chk_bytes.len(),
            reserved_size
        )));
    }

    archive[file_pos..file_pos + chk_bytes.len()].copy_from_slice(chk_bytes);
    for byte in &mut archive[file_pos + chk_bytes.len()..file_pos + reserved_size] {
        *byte = 0;
    }

    let new_size = (chk_bytes.len() as u32).to_le_bytes();
    let size_field_offset = entry_offset + 8;
    archive[size_field_offset..size_field_offset + 4].copy_from_slice(&new_size);

    let _ = encrypt; // retained: symmetrical with `decrypt`, used by archive-construction tests
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds the smallest MPQ image `extract_scenario_chk`/
    /// `replace_scenario_chk` will accept: a 32-byte header, the scenario
    /// file's bytes zero-padded to `reserved_size`, a one-entry hash table
    /// and a one-entry block table, both encrypted the way a real archive's
    /// are.
    fn build_archive(chk_bytes: &[u8], reserved_size: usize) -> Vec<u8> {
        let table = crypt_table();

        let file_pos = 32usize;
        let hash_table_offset = file_pos + reserved_size;
        let block_table_offset = hash_table_offset + HASH_ENTRY_LEN;

        let mut archive = vec![0u8; block_table_offset + BLOCK_ENTRY_LEN];
        archive[0..4].copy_from_slice(&MPQ_MAGIC.to_le_bytes());
        archive[16..20].copy_from_slice(&(hash_table_offset as u32).to_le_bytes());
        archive[20..24].copy_from_slice(&(block_table_offset as u32).to_le_bytes());
        archive[28..32].copy_from_slice(&1u32.to_le_bytes());

        archive[file_pos..file_pos + chk_bytes.len()].copy_from_slice(chk_bytes);

        let mut hash_entry = [0u8; HASH_ENTRY_LEN];
        hash_entry[0..4].copy_from_slice(&hash_string(&table, SCENARIO_PATH, HASH_NAME_A).to_le_bytes());
        hash_entry[4..8].copy_from_slice(&hash_string(&table, SCENARIO_PATH, HASH_NAME_B).to_le_bytes());
        hash_entry[12..16].copy_from_slice(&0u32.to_le_bytes());
        encrypt(&table, &mut hash_entry, hash_string(&table, "(hash table)", HASH_KEY));
        archive[hash_table_offset..hash_table_offset + HASH_ENTRY_LEN].copy_from_slice(&hash_entry);

        let mut block_entry = [0u8; BLOCK_ENTRY_LEN];
        block_entry[0..4].copy_from_slice(&(file_pos as u32).to_le_bytes());
        block_entry[4..8].copy_from_slice(&(reserved_size as u32).to_le_bytes());
        block_entry[8..12].copy_from_slice(&(chk_bytes.len() as u32).to_le_bytes());
        block_entry[12..16].copy_from_slice(&BLOCK_EXISTS.to_le_bytes());
        encrypt(&table, &mut block_entry, hash_string(&table, "(block table)", HASH_KEY));
        archive[block_table_offset..block_table_offset + BLOCK_ENTRY_LEN].copy_from_slice(&block_entry);

        archive
    }

    #[test]
    fn extract_returns_the_stored_scenario_bytes() {
        let chk = b"STR \x00\x00\x00\x00".to_vec();
        let archive = build_archive(&chk, 64);
        assert_eq!(extract_scenario_chk(&archive).unwrap(), chk);
    }

    #[test]
    fn replace_then_extract_round_trips() {
        let original = b"old chunk data".to_vec();
        let mut archive = build_archive(&original, 64);

        let replacement = b"new".to_vec();
        replace_scenario_chk(&mut archive, &replacement).unwrap();

        assert_eq!(extract_scenario_chk(&archive).unwrap(), replacement);
    }

    #[test]
    fn replace_rejects_data_too_large_for_the_reserved_space() {
        let mut archive = build_archive(b"tiny", 4);
        let err = replace_scenario_chk(&mut archive, b"this does not fit").unwrap_err();
        assert!(matches!(err, ChkError::MalformedArchive(_)));
    }

    #[test]
    fn extract_rejects_a_missing_mpq_header() {
        let err = extract_scenario_chk(&[0u8; 32]).unwrap_err();
        assert!(matches!(err, ChkError::MalformedArchive(_)));
    }

    #[test]
    fn crypt_table_is_deterministic() {
        assert_eq!(crypt_table()[0], crypt_table()[0]);
        assert_ne!(crypt_table()[0], crypt_table()[1]);
    }
}
