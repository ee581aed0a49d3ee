//! File header for .slim model files.

use std::io::{Read, Write};

use crate::types::error::{SlimError, SlimResult};
use crate::types::{FORMAT_VERSION, SLIM_MAGIC};

/// Header of a .slim file. Fixed size: 64 bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileHeader {
    /// Magic bytes: [0x53, 0x4C, 0x49, 0x4D] ("SLIM").
    pub magic: [u8; 4],
    /// Format version (currently 1).
    pub version: u32,
    /// Number of interned items.
    pub item_count: u64,
    /// Number of interned users.
    pub user_count: u64,
    /// Number of stored (nonzero) coefficients.
    pub coefficient_count: u64,
    /// Number of aggregated interaction entries.
    pub interaction_count: u64,
    /// Byte offset of the compressed identifier block.
    pub id_block_offset: u64,
    /// Byte offset of the coefficient table.
    pub coefficient_table_offset: u64,
    /// Byte offset of the interaction table.
    pub interaction_table_offset: u64,
}

/// The fixed size of a FileHeader on disk: 64 bytes.
pub const HEADER_SIZE: u64 = 64;

impl FileHeader {
    /// Create an empty-model header with default magic and version.
    pub fn new() -> Self {
        Self {
            magic: SLIM_MAGIC,
            version: FORMAT_VERSION,
            item_count: 0,
            user_count: 0,
            coefficient_count: 0,
            interaction_count: 0,
            id_block_offset: HEADER_SIZE,
            coefficient_table_offset: HEADER_SIZE,
            interaction_table_offset: HEADER_SIZE,
        }
    }

    /// Write this header to the given writer. Writes exactly 64 bytes.
    ///
    /// Layout (all little-endian):
    /// - 0x00..0x04: magic (4 bytes)
    /// - 0x04..0x08: version (u32)
    /// - 0x08..0x10: item_count (u64)
    /// - 0x10..0x18: user_count (u64)
    /// - 0x18..0x20: coefficient_count (u64)
    /// - 0x20..0x28: interaction_count (u64)
    /// - 0x28..0x30: id_block_offset (u64)
    /// - 0x30..0x38: coefficient_table_offset (u64)
    /// - 0x38..0x40: interaction_table_offset (u64)
    pub fn write_to(&self, writer: &mut impl Write) -> SlimResult<()> {
        writer.write_all(&self.magic)?;
        writer.write_all(&self.version.to_le_bytes())?;
        writer.write_all(&self.item_count.to_le_bytes())?;
        writer.write_all(&self.user_count.to_le_bytes())?;
        writer.write_all(&self.coefficient_count.to_le_bytes())?;
        writer.write_all(&self.interaction_count.to_le_bytes())?;
        writer.write_all(&self.id_block_offset.to_le_bytes())?;
        writer.write_all(&self.coefficient_table_offset.to_le_bytes())?;
        writer.write_all(&self.interaction_table_offset.to_le_bytes())?;
        Ok(())
    }

    /// Read a header from the given reader. Reads exactly 64 bytes.
    pub fn read_from(reader: &mut impl Read) -> SlimResult<Self> {
        let mut buf = [0u8; 64];
        reader.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                SlimError::Truncated
            } else {
                SlimError::Io(e)
            }
        })?;

        let magic = [buf[0], buf[1], buf[2], buf[3]];
        if magic != SLIM_MAGIC {
            return Err(SlimError::InvalidMagic);
        }

        let version = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        if version != FORMAT_VERSION {
            return Err(SlimError::UnsupportedVersion(version));
        }

        Ok(Self {
            magic,
            version,
            item_count: read_u64(&buf, 8),
            user_count: read_u64(&buf, 16),
            coefficient_count: read_u64(&buf, 24),
            interaction_count: read_u64(&buf, 32),
            id_block_offset: read_u64(&buf, 40),
            coefficient_table_offset: read_u64(&buf, 48),
            interaction_table_offset: read_u64(&buf, 56),
        })
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new()
    }
}

fn read_u64(buf: &[u8; 64], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}
