use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the individual collectors.
///
/// None of these are fatal to a report: the assembler turns each one into an
/// absent attribute, an unavailable section, or a failed probe attempt.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unable to read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to write {}: {source}", path.display())]
    Unwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to parse {}: {reason}", path.display())]
    Unparseable { path: PathBuf, reason: String },
    #[error("{tool}: not found")]
    ToolUnavailable { tool: String },
    #[error("{}: {source}", tty.display())]
    Serial {
        tty: PathBuf,
        #[source]
        source: serialport::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Unreadable,
    Unwritable,
    Unparseable,
    ToolUnavailable,
    Serial,
    Io,
    Json,
}

impl Error {
    pub(crate) fn unreadable(source: io::Error, path: impl AsRef<Path>) -> Self {
        Self::Unreadable {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn unwritable(source: io::Error, path: impl AsRef<Path>) -> Self {
        Self::Unwritable {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn unparseable(reason: impl fmt::Display, path: impl AsRef<Path>) -> Self {
        Self::Unparseable {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn tool_unavailable(tool: &str) -> Self {
        Self::ToolUnavailable {
            tool: tool.to_string(),
        }
    }

    pub(crate) fn serial(source: serialport::Error, tty: impl AsRef<Path>) -> Self {
        Self::Serial {
            tty: tty.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unreadable { .. } => ErrorKind::Unreadable,
            Self::Unwritable { .. } => ErrorKind::Unwritable,
            Self::Unparseable { .. } => ErrorKind::Unparseable,
            Self::ToolUnavailable { .. } => ErrorKind::ToolUnavailable,
            Self::Serial { .. } => ErrorKind::Serial,
            Self::Io(_) => ErrorKind::Io,
            Self::Json(_) => ErrorKind::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_failures_keep_the_device() {
        let err = Error::unwritable(io::Error::from(io::ErrorKind::BrokenPipe), "/dev/ttyUSB0");
        assert_eq!(err.kind(), ErrorKind::Unwritable);
        assert!(err.to_string().starts_with("unable to write /dev/ttyUSB0: "));
    }
}
