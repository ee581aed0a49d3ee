//! Error types for the slim-stream library.

use thiserror::Error;

/// All errors that can occur in the slim-stream library.
#[derive(Error, Debug)]
pub enum SlimError {
    /// User or item identifier is empty, too long, or contains control characters.
    #[error("Invalid {kind} identifier: {reason}")]
    InvalidIdentifier { kind: &'static str, reason: String },

    /// Interaction weight is negative or not finite.
    #[error("Invalid interaction weight: {0}")]
    InvalidWeight(f32),

    /// Decay was asked for a negative event age.
    #[error("Negative event age: {0} micros")]
    NegativeAge(i64),

    /// Event is older than the stored entry by more than the skew tolerance.
    #[error("Out-of-order event for ({user}, {item}): timestamp {timestamp} < stored {stored} beyond tolerance")]
    OutOfOrder {
        user: String,
        item: String,
        timestamp: u64,
        stored: u64,
    },

    /// Attempt to store a diagonal coefficient.
    #[error("Self-coefficient not allowed on item {0}")]
    SelfCoefficient(u32),

    /// User id not known to the model.
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    /// Item id not known to the model.
    #[error("Unknown item: {0}")]
    UnknownItem(String),

    /// Configuration rejected at startup.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A coefficient update produced a non-finite or out-of-range value.
    #[error("Numeric instability updating W[{row}][{col}]: {value}")]
    NumericInstability { row: u32, col: u32, value: f32 },

    /// The writer lock was poisoned by a panic in another thread.
    #[error("Model writer lock poisoned")]
    WriterPoisoned,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Compression error.
    #[error("Compression error: {0}")]
    Compression(String),

    /// JSON or TOML (de)serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid magic bytes in file header.
    #[error("Invalid magic bytes in file header")]
    InvalidMagic,

    /// Unsupported format version.
    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u32),

    /// File is empty or truncated.
    #[error("File is empty or truncated")]
    Truncated,

    /// Corrupt data at a given offset.
    #[error("Corrupt data at offset {0}")]
    Corrupt(u64),
}

impl From<serde_json::Error> for SlimError {
    fn from(e: serde_json::Error) -> Self {
        SlimError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for SlimError {
    fn from(e: toml::de::Error) -> Self {
        SlimError::Serialization(e.to_string())
    }
}

impl From<toml::ser::Error> for SlimError {
    fn from(e: toml::ser::Error) -> Self {
        SlimError::Serialization(e.to_string())
    }
}

/// Convenience result type for slim-stream operations.
pub type SlimResult<T> = Result<T, SlimError>;
