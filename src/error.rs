use std::error;
use std::io;

use thiserror::Error;

use crate::handle::Handle;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("{0} is already registered")]
    AlreadyRegistered(Handle),
    #[error("{0} is not registered")]
    NotRegistered(Handle),
    /// Readiness was injected into a selector that reports its wrapped
    /// selector's readiness instead.
    #[error("{0}: readiness comes from the wrapped selector")]
    Wrapping(Handle),
    /// Reported by a wrapped selector backed by the OS.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Anything else a wrapped selector fails with.
    #[error("{0}")]
    Delegate(Box<dyn error::Error + Send + Sync>),
}

impl Error {
    /// Wraps an arbitrary failure of a wrapped selector.
    pub fn delegate<E>(err: E) -> Error
        where E: Into<Box<dyn error::Error + Send + Sync>>
    {
        Error::Delegate(err.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
