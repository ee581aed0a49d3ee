//! Index structures for fast lookup. Each index is independent and incrementally updateable.

pub mod id_table;
pub mod interactions;
pub mod sparse_row;

pub use id_table::IdTable;
pub use interactions::{InteractionEntry, InteractionStore, RecordOutcome};
pub use sparse_row::SparseRow;
