use std::io;
use thiserror::Error;

use russh_sftp::{client::error::Error as SftpError, protocol::StatusCode};

pub type FsResult<T> = Result<T, Error>;

/// Enum for remote filesystem faults observed by this crate
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Target path is absent on the remote side
    #[error("No such file: {0}")]
    NotFound(String),
    /// Access to the target was denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// Transient or ambiguous failure reported by the remote client
    #[error("Remote: {0}")]
    Remote(String),
    /// Any errors related to local I/O
    #[error("I/O: {0}")]
    IO(String),
    /// Time limit for receiving a response exceeded
    #[error("Timeout")]
    Timeout,
    /// The remote side does not provide the requested capability
    #[error("Unsupported: {0}")]
    Unsupported(String),
    /// The caller supplied an argument that cannot be acted on
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            io::ErrorKind::TimedOut => Self::Timeout,
            _ => Self::IO(err.to_string()),
        }
    }
}

impl From<SftpError> for Error {
    fn from(err: SftpError) -> Self {
        match err {
            SftpError::Status(status) => match status.status_code {
                StatusCode::NoSuchFile => Self::NotFound(status.error_message),
                StatusCode::PermissionDenied => Self::PermissionDenied(status.error_message),
                _ => Self::Remote(format!("{}: {}", status.status_code, status.error_message)),
            },
            SftpError::Timeout => Self::Timeout,
            other => Self::Remote(other.to_string()),
        }
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        let msg = err.to_string();
        match err.into_io_error() {
            Some(io) => io.into(),
            None => Self::IO(msg),
        }
    }
}
