use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Query sequence contains invalid characters")]
    InvalidQuery,

    #[error("Sequence must be {expected} bases long (got {got})")]
    SequenceLength { expected: u64, got: u64 },

    #[error("pam_right must be 0, 1 or 2 (got {0})")]
    InvalidPamMode(u8),

    #[error("CRISPRs must be loaded before scanning")]
    EmptyStore,
}
