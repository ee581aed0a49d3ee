//! Sparse item–item coefficient matrix with a zero diagonal.

use std::sync::Arc;

use crate::index::SparseRow;
use crate::types::{ItemIdx, SlimError, SlimResult};

/// Row-major sparse matrix `W[row][col]`.
///
/// Only nonzero coefficients are stored; setting an entry to exactly zero
/// removes it. Diagonal entries can never be stored. Rows are `Arc`-shared
/// so snapshots are cheap and writers copy only the rows they modify.
#[derive(Debug, Clone, Default)]
pub struct CoefficientMatrix {
    rows: Arc<Vec<Arc<SparseRow<f32>>>>,
    nnz: usize,
}

impl CoefficientMatrix {
    /// Create an empty matrix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from (row, col, value) triples (used by import).
    pub fn from_triples(
        triples: impl IntoIterator<Item = (ItemIdx, ItemIdx, f32)>,
    ) -> SlimResult<Self> {
        let mut matrix = Self::new();
        for (row, col, value) in triples {
            matrix.set(row, col, value)?;
        }
        Ok(matrix)
    }

    /// `W[row][col]`, zero when not stored.
    pub fn get(&self, row: ItemIdx, col: ItemIdx) -> f32 {
        self.rows
            .get(row as usize)
            .and_then(|r| r.get(col))
            .unwrap_or(0.0)
    }

    /// Store `W[row][col] = value`, removing the entry when `value == 0`.
    pub fn set(&mut self, row: ItemIdx, col: ItemIdx, value: f32) -> SlimResult<()> {
        if row == col {
            return Err(SlimError::SelfCoefficient(row));
        }
        if !value.is_finite() {
            return Err(SlimError::NumericInstability { row, col, value });
        }

        if value == 0.0 {
            self.remove(row, col);
            return Ok(());
        }

        let needed = row as usize + 1;
        let rows = Arc::make_mut(&mut self.rows);
        if rows.len() < needed {
            rows.resize_with(needed, Default::default);
        }
        if Arc::make_mut(&mut rows[row as usize]).upsert(col, value) {
            self.nnz += 1;
        }
        Ok(())
    }

    /// Remove `W[row][col]`, returning the old value.
    pub fn remove(&mut self, row: ItemIdx, col: ItemIdx) -> Option<f32> {
        let stored = self.rows.get(row as usize)?.get(col)?;
        let rows = Arc::make_mut(&mut self.rows);
        Arc::make_mut(&mut rows[row as usize]).remove(col);
        self.nnz -= 1;
        Some(stored)
    }

    /// Nonzero entries of a row, in column order.
    pub fn row(&self, row: ItemIdx) -> &[(ItemIdx, f32)] {
        self.rows
            .get(row as usize)
            .map(|r| r.entries())
            .unwrap_or(&[])
    }

    /// Nonzero entries of a column as `(row, value)`, in row order.
    ///
    /// Rows are swept one binary search each.
    pub fn column(&self, col: ItemIdx) -> Vec<(ItemIdx, f32)> {
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(row, r)| r.get(col).map(|value| (row as ItemIdx, value)))
            .collect()
    }

    /// Number of stored (nonzero) coefficients.
    pub fn nnz(&self) -> usize {
        self.nnz
    }

    /// Number of allocated rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// All stored coefficients, row-major.
    pub fn triples(&self) -> impl Iterator<Item = (ItemIdx, ItemIdx, f32)> + '_ {
        self.rows.iter().enumerate().flat_map(|(row, r)| {
            r.entries()
                .iter()
                .map(move |(col, value)| (row as ItemIdx, *col, *value))
        })
    }

    /// Largest stored magnitude (0 for an empty matrix).
    pub fn max_abs(&self) -> f32 {
        self.triples().map(|(_, _, v)| v.abs()).fold(0.0, f32::max)
    }
}
