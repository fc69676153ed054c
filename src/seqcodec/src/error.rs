use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Sequence contains non ACGT character: '{0}'")]
    InvalidBase(char),
}
