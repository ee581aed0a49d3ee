//! Sorted sparse row of (column, value) pairs.

/// A sparse row keyed by dense column index.
///
/// Entries are kept sorted by column so lookups are a binary search and
/// iteration is in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseRow<V> {
    entries: Vec<(u32, V)>,
}

impl<V: Copy> SparseRow<V> {
    /// Create a new, empty row.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build from entries in any order. Later duplicates win.
    pub fn from_entries(mut entries: Vec<(u32, V)>) -> Self {
        entries.sort_by_key(|(col, _)| *col);
        let mut out: Vec<(u32, V)> = Vec::with_capacity(entries.len());
        for (col, value) in entries {
            match out.last_mut() {
                Some(last) if last.0 == col => last.1 = value,
                _ => out.push((col, value)),
            }
        }
        Self { entries: out }
    }

    /// Value at a column, if stored.
    pub fn get(&self, col: u32) -> Option<V> {
        self.entries
            .binary_search_by_key(&col, |(c, _)| *c)
            .ok()
            .map(|pos| self.entries[pos].1)
    }

    /// Insert or overwrite. Returns true when the column was new.
    pub fn upsert(&mut self, col: u32, value: V) -> bool {
        match self.entries.binary_search_by_key(&col, |(c, _)| *c) {
            Ok(pos) => {
                self.entries[pos].1 = value;
                false
            }
            Err(pos) => {
                self.entries.insert(pos, (col, value));
                true
            }
        }
    }

    /// Remove a column, returning its value.
    pub fn remove(&mut self, col: u32) -> Option<V> {
        self.entries
            .binary_search_by_key(&col, |(c, _)| *c)
            .ok()
            .map(|pos| self.entries.remove(pos).1)
    }

    /// All entries in column order.
    pub fn entries(&self) -> &[(u32, V)] {
        &self.entries
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the row is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Copy> Default for SparseRow<V> {
    fn default() -> Self {
        Self::new()
    }
}
