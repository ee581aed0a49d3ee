//! LZ4 compression of identifier blocks.

use crate::types::error::{SlimError, SlimResult};

/// Compress a list of ids as one LZ4 block (size prepended).
///
/// Each id is stored as a little-endian `u32` byte length followed by its
/// UTF-8 bytes.
pub fn compress_names<'a>(names: impl IntoIterator<Item = &'a str>) -> SlimResult<Vec<u8>> {
    let mut raw = Vec::new();
    for name in names {
        let len = u32::try_from(name.len())
            .map_err(|_| SlimError::Compression(format!("id too long: {} bytes", name.len())))?;
        raw.extend_from_slice(&len.to_le_bytes());
        raw.extend_from_slice(name.as_bytes());
    }
    Ok(lz4_flex::compress_prepend_size(&raw))
}

/// Decompress a block written by [`compress_names`], expecting exactly
/// `count` ids.
pub fn decompress_names(data: &[u8], count: usize) -> SlimResult<Vec<String>> {
    let raw = lz4_flex::decompress_size_prepended(data)
        .map_err(|e| SlimError::Compression(e.to_string()))?;

    // Every id takes at least its 4-byte length prefix.
    if count > raw.len() / 4 {
        return Err(SlimError::Corrupt(count as u64));
    }
    let mut names = Vec::with_capacity(count);
    let mut pos = 0usize;
    for _ in 0..count {
        let len_bytes = raw.get(pos..pos + 4).ok_or(SlimError::Truncated)?;
        let len = u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]])
            as usize;
        pos += 4;
        let bytes = raw.get(pos..pos + len).ok_or(SlimError::Truncated)?;
        let name = std::str::from_utf8(bytes)
            .map_err(|e| SlimError::Compression(e.to_string()))?;
        names.push(name.to_string());
        pos += len;
    }
    if pos != raw.len() {
        return Err(SlimError::Corrupt(pos as u64));
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_survive_compression() {
        let names = ["i1", "", "ümlaut", "a much longer item identifier"];
        let block = compress_names(names.iter().copied()).unwrap();
        let back = decompress_names(&block, names.len()).unwrap();
        assert_eq!(back, names);
    }

    #[test]
    fn count_mismatch_is_detected() {
        let block = compress_names(["a", "b"]).unwrap();
        assert!(matches!(
            decompress_names(&block, 3),
            Err(SlimError::Truncated)
        ));
        assert!(matches!(
            decompress_names(&block, 1),
            Err(SlimError::Corrupt(_))
        ));
    }

    #[test]
    fn impossible_count_is_rejected_before_allocating() {
        let block = compress_names(["a", "b"]).unwrap();
        assert!(matches!(
            decompress_names(&block, usize::MAX / 2),
            Err(SlimError::Corrupt(_))
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decompress_names(&[10, 0, 0, 0, 0xFF], 1).is_err());
    }
}
