use std::{fmt::Display, panic::Location};

use anyhow::{Context, Result};

/// Public prelude for LocatedError.
///
/// Note that this re-exports anyhow and thiserror
pub mod prelude {
    extern crate anyhow;
    pub use anyhow::{anyhow, bail, Context, Result};

    extern crate thiserror;
    pub use thiserror::Error;

    pub use super::LocatedError;
}

/// Trait extending [`anyhow::Result<T>`] with the location of the error (file, line and column)
///
/// # Example
/// ```should_panic
/// use anyhow::Result;
/// use located_error::LocatedError;
///
/// fn open_index(path: &str) -> Result<std::fs::File> {
///     std::fs::File::open(path)
///         .with_loc(|| format!("Failed to open index file {path}"))
/// }
///
/// fn main() -> Result<()> {
///     let index = open_index("/missing-index.bin").loc("While starting up")?;
///     Ok(())
/// }
/// ```
/// ## This should output the following lines
/// ```Text
/// > Error: [src/lib.rs:10:26] While starting up
/// >
/// > Caused by:
/// >     0: [src/lib.rs:6:10] Failed to open index file /missing-index.bin
/// >     1: No such file or directory (os error 2)
/// ```
pub trait LocatedError<T, E> {
    /// Wrap the error value with additional context + the location at which it was called.
    fn loc<C>(self, context: C) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static;

    /// Wrap the error value with additional context that is evaluated lazily
    /// only once an error does occur + the location at which it was called.
    fn with_loc<C, F>(self, f: F) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> LocatedError<T, E> for Result<T, E>
where
    E: Display + Send + Sync + 'static,
    Result<T, E>: Context<T, E>,
{
    /// Note that [`LocatedError::loc()`] is eagerly evaluated.
    /// For a lazy implementation, see [`LocatedError::with_loc()`]
    #[track_caller]
    fn loc<C>(self, context: C) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static,
    {
        match self {
            Ok(ok) => Ok(ok),
            Err(_) => {
                let caller = Location::caller();
                let loc = format!("[{}:{}:{}]", caller.file(), caller.line(), caller.column());
                self.context(format!("{loc} {context}"))
            }
        }
    }

    /// Note that [`LocatedError::with_loc()`] is lazily evaluated.
    /// For an eager implementation, see [`LocatedError::loc()`]
    #[track_caller]
    fn with_loc<C, F>(self, f: F) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        match self {
            Ok(ok) => Ok(ok),
            Err(_) => {
                let caller = Location::caller();
                let loc = format!("[{}:{}:{}]", caller.file(), caller.line(), caller.column());
                self.with_context(|| format!("{loc} {}", f()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("the underlying operation failed")]
    struct DummyError;

    #[test]
    fn loc_keeps_ok_values() {
        let ok: Result<u64, DummyError> = Ok(42);
        assert_eq!(ok.loc("unused context").unwrap(), 42);
    }

    #[test]
    fn loc_prepends_location_and_context() {
        let err: Result<(), DummyError> = Err(DummyError);
        let msg = format!("{}", err.loc("While testing").unwrap_err());
        assert!(msg.contains("While testing"));
        assert!(msg.contains("lib.rs"));
    }

    #[test]
    fn with_loc_is_lazy() {
        let ok: Result<u64, DummyError> = Ok(1);
        let out = ok.with_loc(|| -> &'static str { panic!("closure must not run on Ok") });
        assert_eq!(out.unwrap(), 1);
    }

    #[test]
    fn with_loc_preserves_source() {
        let err: Result<(), DummyError> = Err(DummyError);
        let chained = err.with_loc(|| "While testing").unwrap_err();
        assert!(chained.downcast_ref::<DummyError>().is_some());
    }
}
