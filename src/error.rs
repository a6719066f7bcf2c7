use std::fmt::{Display, Formatter};
use std::sync::PoisonError;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the page cache. Lookup misses and pool exhaustion are
/// not errors, they are encoded in the return values of the operations that
/// produce them; Error is reserved for infrastructure failures such as disk
/// I/O and poisoned locks.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    Internal(String),
}

impl Error {
    pub fn internal<E: ToString>(msg: E) -> Error {
        Error::Internal(msg.to_string())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Internal(s) => write!(f, "{}", s),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::internal(err)
    }
}

impl From<std::array::TryFromSliceError> for Error {
    fn from(err: std::array::TryFromSliceError) -> Self {
        Error::internal(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::internal(err)
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(err: PoisonError<T>) -> Self {
        Error::internal(err)
    }
}
