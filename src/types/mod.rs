//! All data types for the slim-stream library.

pub mod error;
pub mod event;
pub mod header;

pub use error::{SlimError, SlimResult};
pub use event::{validate_identifier, InteractionEvent, InteractionEventBuilder};
pub use header::{FileHeader, HEADER_SIZE};

/// Dense interned index of an item.
pub type ItemIdx = u32;

/// Dense interned index of a user.
pub type UserIdx = u32;

/// Magic bytes at the start of every .slim file.
pub const SLIM_MAGIC: [u8; 4] = [0x53, 0x4C, 0x49, 0x4D]; // "SLIM"

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

/// Maximum byte length of an external user or item identifier.
pub const MAX_ID_LEN: usize = 256;

/// Microseconds per second, the unit conversion for decay rates.
pub const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Returns the current time as Unix epoch microseconds.
pub fn now_micros() -> u64 {
    chrono::Utc::now().timestamp_micros() as u64
}
