//! Reads .slim files into a model export.

use std::io::Read;
use std::path::Path;

use crate::types::error::{SlimError, SlimResult};
use crate::types::header::{FileHeader, HEADER_SIZE};

use super::compression::decompress_names;
use super::writer::{COEFFICIENT_RECORD_SIZE, INTERACTION_RECORD_SIZE};
use super::{CoefficientRecord, InteractionRecord, ModelExport};

/// Reader for .slim binary files.
pub struct SlimReader;

impl SlimReader {
    /// Read a .slim file.
    pub fn read_from_file(path: &Path) -> SlimResult<ModelExport> {
        let data = std::fs::read(path)?;
        let export = Self::read_from(&mut std::io::Cursor::new(data))?;
        log::info!(
            "Read {} coefficients and {} interactions from {}",
            export.coefficients.len(),
            export.interactions.len(),
            path.display()
        );
        Ok(export)
    }

    /// Read from any reader.
    pub fn read_from(reader: &mut impl Read) -> SlimResult<ModelExport> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        if (data.len() as u64) < HEADER_SIZE {
            return Err(SlimError::Truncated);
        }
        let header = FileHeader::read_from(&mut std::io::Cursor::new(&data[..64]))?;

        let item_count = to_usize(header.item_count)?;
        let user_count = to_usize(header.user_count)?;
        let coefficient_count = to_usize(header.coefficient_count)?;
        let interaction_count = to_usize(header.interaction_count)?;

        // Id block
        let id_start = to_usize(header.id_block_offset)?;
        let block_len = to_usize(u64::from_le_bytes(take::<8>(&data, id_start)?))?;
        let block_start = id_start.saturating_add(8);
        let block = data
            .get(block_start..block_start.saturating_add(block_len))
            .ok_or(SlimError::Truncated)?;
        let id_count = item_count
            .checked_add(user_count)
            .ok_or(SlimError::Corrupt(8))?;
        let mut names = decompress_names(block, id_count)?;
        let users = names.split_off(item_count);
        let items = names;

        let name_of = |table: &[String], idx: u32, at: usize| -> SlimResult<String> {
            table
                .get(idx as usize)
                .cloned()
                .ok_or(SlimError::Corrupt(at as u64))
        };

        // Coefficient table
        let coefficient_start = to_usize(header.coefficient_table_offset)?;
        let mut coefficients = Vec::with_capacity(coefficient_count.min(data.len()));
        for i in 0..coefficient_count {
            let at = coefficient_start.saturating_add(i * COEFFICIENT_RECORD_SIZE as usize);
            let row = u32::from_le_bytes(take::<4>(&data, at)?);
            let col = u32::from_le_bytes(take::<4>(&data, at.saturating_add(4))?);
            let value = f32::from_le_bytes(take::<4>(&data, at.saturating_add(8))?);
            coefficients.push(CoefficientRecord {
                row: name_of(&items, row, at)?,
                col: name_of(&items, col, at)?,
                value,
            });
        }

        // Interaction table
        let interaction_start = to_usize(header.interaction_table_offset)?;
        let mut interactions = Vec::with_capacity(interaction_count.min(data.len()));
        for i in 0..interaction_count {
            let at = interaction_start.saturating_add(i * INTERACTION_RECORD_SIZE as usize);
            let user = u32::from_le_bytes(take::<4>(&data, at)?);
            let item = u32::from_le_bytes(take::<4>(&data, at.saturating_add(4))?);
            let weight = f32::from_le_bytes(take::<4>(&data, at.saturating_add(8))?);
            let timestamp = u64::from_le_bytes(take::<8>(&data, at.saturating_add(12))?);
            interactions.push(InteractionRecord {
                user: name_of(&users, user, at)?,
                item: name_of(&items, item, at)?,
                weight,
                timestamp,
            });
        }

        Ok(ModelExport {
            items,
            users,
            coefficients,
            interactions,
        })
    }
}

/// Copy `N` bytes at `at`, failing on a short buffer.
fn take<const N: usize>(data: &[u8], at: usize) -> SlimResult<[u8; N]> {
    let mut bytes = [0u8; N];
    let slice = data
        .get(at..at.saturating_add(N))
        .ok_or(SlimError::Truncated)?;
    bytes.copy_from_slice(slice);
    Ok(bytes)
}

fn to_usize(value: u64) -> SlimResult<usize> {
    usize::try_from(value).map_err(|_| SlimError::Corrupt(value))
}
