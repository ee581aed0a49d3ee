//! Writes .slim files from a model export.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use crate::types::error::{SlimError, SlimResult};
use crate::types::header::{FileHeader, HEADER_SIZE};
use crate::types::{FORMAT_VERSION, SLIM_MAGIC};

use super::compression::compress_names;
use super::ModelExport;

/// Size of a single coefficient record on disk: 12 bytes.
pub(crate) const COEFFICIENT_RECORD_SIZE: u64 = 12;

/// Size of a single interaction record on disk: 20 bytes.
pub(crate) const INTERACTION_RECORD_SIZE: u64 = 20;

/// Writer for .slim binary files.
pub struct SlimWriter;

impl SlimWriter {
    /// Write an export to a .slim file.
    pub fn write_to_file(export: &ModelExport, path: &Path) -> SlimResult<()> {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        Self::write_to(export, &mut writer)?;
        log::info!(
            "Wrote {} coefficients and {} interactions to {}",
            export.coefficients.len(),
            export.interactions.len(),
            path.display()
        );
        Ok(())
    }

    /// Write an export to any writer.
    ///
    /// Layout: header, id block (`u64` length + LZ4 block of item ids then
    /// user ids), coefficient table, interaction table.
    pub fn write_to(export: &ModelExport, writer: &mut impl Write) -> SlimResult<()> {
        let items = positions(&export.items);
        let users = positions(&export.users);

        // Resolve every record before writing anything
        let mut coefficients = Vec::with_capacity(export.coefficients.len());
        for record in &export.coefficients {
            coefficients.push((
                lookup(&items, &record.row, SlimError::UnknownItem)?,
                lookup(&items, &record.col, SlimError::UnknownItem)?,
                record.value,
            ));
        }
        let mut interactions = Vec::with_capacity(export.interactions.len());
        for record in &export.interactions {
            interactions.push((
                lookup(&users, &record.user, SlimError::UnknownUser)?,
                lookup(&items, &record.item, SlimError::UnknownItem)?,
                record.weight,
                record.timestamp,
            ));
        }

        let id_block = compress_names(
            export
                .items
                .iter()
                .chain(export.users.iter())
                .map(String::as_str),
        )?;

        let id_block_offset = HEADER_SIZE;
        let coefficient_table_offset = id_block_offset + 8 + id_block.len() as u64;
        let interaction_table_offset =
            coefficient_table_offset + coefficients.len() as u64 * COEFFICIENT_RECORD_SIZE;

        let header = FileHeader {
            magic: SLIM_MAGIC,
            version: FORMAT_VERSION,
            item_count: export.items.len() as u64,
            user_count: export.users.len() as u64,
            coefficient_count: coefficients.len() as u64,
            interaction_count: interactions.len() as u64,
            id_block_offset,
            coefficient_table_offset,
            interaction_table_offset,
        };
        header.write_to(writer)?;

        writer.write_all(&(id_block.len() as u64).to_le_bytes())?;
        writer.write_all(&id_block)?;

        for (row, col, value) in coefficients {
            writer.write_all(&row.to_le_bytes())?;
            writer.write_all(&col.to_le_bytes())?;
            writer.write_all(&value.to_le_bytes())?;
        }

        for (user, item, weight, timestamp) in interactions {
            writer.write_all(&user.to_le_bytes())?;
            writer.write_all(&item.to_le_bytes())?;
            writer.write_all(&weight.to_le_bytes())?;
            writer.write_all(&timestamp.to_le_bytes())?;
        }

        writer.flush()?;
        Ok(())
    }
}

fn positions(names: &[String]) -> HashMap<&str, u32> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i as u32))
        .collect()
}

fn lookup(
    table: &HashMap<&str, u32>,
    id: &str,
    missing: fn(String) -> SlimError,
) -> SlimResult<u32> {
    table.get(id).copied().ok_or_else(|| missing(id.to_string()))
}
