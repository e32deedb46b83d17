//! Errors raised while setting up logging, before any version-control state
//! exists.

use std::fmt;
use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The log file or its directory could not be opened.
    LogFile,
    /// A global subscriber was already installed.
    Subscriber,
}

/// Error from the ambient helpers, carrying the path involved when there is
/// one.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    path: Option<PathBuf>,
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn log_file(path: &Path, source: std::io::Error) -> Self {
        Self {
            kind: ErrorKind::LogFile,
            path: Some(path.to_path_buf()),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    pub fn subscriber(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Subscriber,
            path: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path.display(), self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}
