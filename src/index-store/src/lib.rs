mod error;
mod format;
mod store;

pub use error::IndexError;
pub use format::{Metadata, ENDIAN_MARKER, MAX_BODY_BYTES, VERSION};
pub use store::{BuildStats, IndexStore};
