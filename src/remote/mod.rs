//! Remote filesystem port.
//!
//! [`RemoteFs`] is the primitive surface every backend exposes. Each call may
//! fail at any time; deciding what a failure means is left to
//! [`Facade`](crate::facade::Facade).

mod sftp;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{fmt, path::Path, str::FromStr};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{Error, FsResult};

pub use sftp::SftpFs;

/// Byte stream over an open remote file
pub trait RemoteStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> RemoteStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

pub type RemoteFile = Box<dyn RemoteStream>;

/// Mode a remote file is opened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    /// Create or truncate
    Write,
    /// Create or append
    Append,
}

impl FromStr for OpenMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rb" | "r" => Ok(Self::Read),
            "wb" | "w" => Ok(Self::Write),
            "ab" | "a" => Ok(Self::Append),
            other => Err(Error::InvalidInput(format!(
                "open mode must be one of rb, wb, ab: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    #[default]
    File,
    Directory,
    Symlink,
    Other,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
            Self::Other => "other",
        };
        f.write_str(kind)
    }
}

/// Stat result for a single remote entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    /// Absolute remote path
    pub path: String,
    /// Last path component
    pub name: String,
    pub kind: FileKind,
    pub size: u64,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub permissions: Option<u32>,
    pub modified: Option<DateTime<Utc>>,
}

impl FileInfo {
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }
}

/// Primitive operations of a remote filesystem client.
///
/// Byte counts are returned raw; scaling happens in [`crate::size`].
#[async_trait]
pub trait RemoteFs: Send + Sync {
    /// Returns `false` when the path is absent.
    async fn exists(&self, path: &str) -> FsResult<bool>;

    /// Reads the whole file.
    async fn cat(&self, path: &str) -> FsResult<bytes::Bytes>;

    /// Removes a file or directory, descending into children if `recursive`.
    async fn delete(&self, path: &str, recursive: bool) -> FsResult<()>;

    async fn chmod(&self, path: &str, mode: u32) -> FsResult<()>;

    /// `None` leaves the respective id untouched.
    async fn chown(&self, path: &str, owner: Option<&str>, group: Option<&str>) -> FsResult<()>;

    async fn info(&self, path: &str) -> FsResult<FileInfo>;

    /// Entries directly under `path`, without `.` and `..`.
    async fn ls(&self, path: &str) -> FsResult<Vec<FileInfo>>;

    /// Creates the directory including any missing parents.
    async fn mkdir(&self, path: &str) -> FsResult<()>;

    async fn open(&self, path: &str, mode: OpenMode) -> FsResult<RemoteFile>;

    async fn rename(&self, from: &str, to: &str) -> FsResult<()>;

    /// Copies a remote file to `local`, returning the bytes transferred.
    async fn download(&self, path: &str, local: &Path) -> FsResult<u64>;

    /// Copies `local` to a remote file, creating intermediate directories.
    async fn upload(&self, local: &Path, path: &str) -> FsResult<u64>;

    /// Free space in bytes.
    async fn df(&self) -> FsResult<u64>;

    /// Bytes used by everything under `path`.
    async fn disk_usage(&self, path: &str) -> FsResult<u64>;

    async fn get_capacity(&self) -> FsResult<u64>;

    async fn get_space_used(&self) -> FsResult<u64>;
}
