//! Model export and binary file I/O for .slim files.

pub mod compression;
pub mod export;
pub mod reader;
pub mod writer;

pub use export::{CoefficientRecord, InteractionRecord, ModelExport};
pub use reader::SlimReader;
pub use writer::SlimWriter;
