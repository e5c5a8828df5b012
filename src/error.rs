use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentsError {
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("failed to fetch {url}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not a valid gzip stream", path.display())]
    Decompress {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("background task failed")]
    Task(#[source] tokio::task::JoinError),

    #[error("line {line} of {} has no package field", path.display())]
    MalformedLine { path: PathBuf, line: usize },

    #[error("only {found} distinct packages found, {wanted} requested")]
    InsufficientPackages { found: usize, wanted: usize },
}

impl ContentsError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| ContentsError::Io { path, source }
    }
}

pub type Result<T, E = ContentsError> = std::result::Result<T, E>;
