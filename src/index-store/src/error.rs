use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    // ---- Format errors
    #[error("Endianness of the file does not match your hardware")]
    EndianMismatch,

    #[error("File is version {found}, expected version {expected}. Please regenerate the index")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Index file ended before {expected} sequences could be read")]
    Truncated { expected: u64 },

    #[error("Malformed record at {}:{line}. Expected 'chr,start,seq,pam_right,species_id'", path.display())]
    MalformedRecord { path: PathBuf, line: usize },

    #[error("pam_right field must be 1 or 0 (at {}:{line})", path.display())]
    InvalidPamRight { path: PathBuf, line: usize },

    #[error("Different seq lengths in file. Expected {expected} bases, got {got} (at {}:{line})", path.display())]
    MixedSeqLength { expected: u64, got: u64, path: PathBuf, line: usize },

    // ---- Range errors
    #[error("CRISPRs must be loaded before querying the store")]
    EmptyStore,

    #[error("Id {id} is out of range. Wrong species?")]
    IdOutOfRange { id: u64 },

    // ---- Input errors
    #[error("'{0}' does not fit the {1} byte metadata field")]
    NameTooLong(String, usize),

    // ---- Resource errors
    #[error("More than 3GiB of memory required ({required} bytes), aborting")]
    MemoryCeiling { required: u64 },
}
