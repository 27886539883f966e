//! Error type for notifier operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for flag encoding and notifier operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A symbol is not in the flag table, or is not valid where it was used.
    #[error("unknown flag :{0}")]
    InvalidFlag(String),

    /// A system call on the inotify descriptor failed.
    #[error("{op} failed: {source}")]
    SystemCall {
        /// Name of the failing call.
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// The notifier has already been closed.
    #[error("notifier is closed")]
    InvalidState,

    /// The path cannot be passed to the kernel.
    #[error("path contains a NUL byte: {}", .0.display())]
    InvalidPath(PathBuf),
}

impl Error {
    /// Build a [`Error::SystemCall`] from the current `errno`.
    pub(crate) fn last_os_error(op: &'static str) -> Self {
        Self::SystemCall {
            op,
            source: io::Error::last_os_error(),
        }
    }

    /// Whether this is a read on a non-blocking notifier with nothing queued.
    #[must_use]
    pub fn is_would_block(&self) -> bool {
        matches!(self, Self::SystemCall { source, .. } if source.kind() == io::ErrorKind::WouldBlock)
    }

    /// Whether the kernel reported that the path does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SystemCall { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }

    /// The OS error code, if this error came from a system call.
    #[must_use]
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::SystemCall { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::SystemCall { source, .. } => source,
            Error::InvalidFlag(_) | Error::InvalidPath(_) => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            Error::InvalidState => io::Error::other(err),
        }
    }
}
