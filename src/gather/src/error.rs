use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatherError {
    #[error("Failed to open genome file")]
    OpenInput(#[source] std::io::Error),

    #[error("Failed to open output file")]
    CreateOutput(#[source] std::io::Error),

    #[error("PAM must be a non-empty ACGT string (e.g. 'GGG')")]
    InvalidPam,
}
