use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for the dispatch layer.
#[derive(Debug, Error)]
pub enum WatchError {
    /// Error from the underlying notifier.
    #[error(transparent)]
    Notifier(#[from] inotifier::Error),

    /// IO error while walking a directory tree or reading a kernel limit.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// No watch is registered for the path.
    #[error("no watcher for path {}", .0.display())]
    NotWatched(PathBuf),

    /// A recursive watch would exceed the per-user watch limit.
    #[error("directory tree has {count} entries, more than max_user_watches ({limit})")]
    TooManyWatches { count: usize, limit: u64 },

    /// A kernel limit file did not hold a number.
    #[error("invalid value in {path}: {value:?}")]
    InvalidLimit { path: &'static str, value: String },

    /// A watch callback failed.
    #[error("callback failed: {0}")]
    Callback(String),
}

impl WatchError {
    /// Whether this is a read on a non-blocking notifier with nothing queued.
    #[must_use]
    pub fn is_would_block(&self) -> bool {
        match self {
            Self::Notifier(err) => err.is_would_block(),
            Self::Io(err) => err.kind() == io::ErrorKind::WouldBlock,
            _ => false,
        }
    }

    /// Whether the error means a path vanished.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Notifier(err) => err.is_not_found(),
            Self::Io(err) => err.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Build a callback error from any displayable value.
    pub fn callback(err: impl std::fmt::Display) -> Self {
        Self::Callback(err.to_string())
    }
}
