//! Fault-containing front end over a [`RemoteFs`].
//!
//! Calls fall into four groups:
//!
//! - queries (`exists`, `cat`, `info`, `ls`) log a fault and return a sentinel;
//! - ambiguous mutations (`delete`, `rm`, `mkdir`) log a fault and then check
//!   the target once to learn whether the mutation actually took effect;
//! - well-defined mutations (`chmod`, `chown`, `rename`, `open`) propagate;
//! - transfers (`download`, `upload`, `put`, `get`) log and report failure.
//!
//! Size queries propagate as well, since no byte count is a safe stand-in.

mod head;
mod outcome;
mod transfer;

use bytes::Bytes;
use std::{path::Path, sync::Arc};

pub use head::{HeadOptions, HeaderRecord, TextEncoding};
pub use outcome::Outcome;
pub use transfer::{PathMapping, TransferReport};

use crate::{
    config::FacadeConfig,
    error::{Error, FsResult},
    remote::{FileInfo, OpenMode, RemoteFile, RemoteFs},
    size::{self, SizeValue},
};

/// Wraps a shared remote filesystem handle.
///
/// The handle is constructed once by the caller and injected here; the facade
/// itself keeps no state between calls.
pub struct Facade<F> {
    fs: Arc<F>,
    config: FacadeConfig,
}

impl<F> Clone for Facade<F> {
    fn clone(&self) -> Self {
        Self {
            fs: self.fs.clone(),
            config: self.config.clone(),
        }
    }
}

fn contain<T>(op: &str, path: &str, result: FsResult<T>, sentinel: T) -> Outcome<T> {
    match result {
        Ok(value) => Outcome::ok(value),
        Err(err) => {
            warn!("{op} {path}: {err}");
            Outcome::failed(sentinel, err)
        }
    }
}

/// Resolves an ambiguous mutation from the result of its single follow-up
/// check: `Ok(true)` means the intended effect is in place.
fn settle(op: &str, path: &str, err: Error, check: FsResult<bool>) -> Outcome<()> {
    match check {
        Ok(true) => {
            debug!("{op} {path}: took effect despite fault");
            Outcome::verified((), err)
        }
        Ok(false) => Outcome::failed((), err),
        Err(check) => {
            warn!("{op} {path}: verification failed: {check}");
            Outcome::failed((), err)
        }
    }
}

impl<F: RemoteFs> Facade<F> {
    pub fn new(fs: Arc<F>) -> Self {
        Self::with_config(fs, FacadeConfig::default())
    }

    pub fn with_config(fs: Arc<F>, config: FacadeConfig) -> Self {
        Self { fs, config }
    }

    /// The underlying port
    pub fn port(&self) -> &F {
        &self.fs
    }

    pub fn config(&self) -> &FacadeConfig {
        &self.config
    }

    /// Whether the path is known to the remote side. `false` also covers
    /// faults, so it only means "could not confirm".
    pub async fn exists(&self, path: &str) -> Outcome<bool> {
        contain("exists", path, self.fs.exists(path).await, false)
    }

    /// Contents of the file, empty on failure.
    pub async fn cat(&self, path: &str) -> Outcome<Bytes> {
        contain("cat", path, self.fs.cat(path).await, Bytes::new())
    }

    pub async fn info(&self, path: &str) -> Outcome<Option<FileInfo>> {
        contain("info", path, self.fs.info(path).await.map(Some), None)
    }

    /// Paths of the entries directly under `path`.
    pub async fn ls(&self, path: &str) -> Outcome<Vec<String>> {
        let result = self
            .fs
            .ls(path)
            .await
            .map(|entries| entries.into_iter().map(|e| e.path).collect());
        contain("ls", path, result, vec![])
    }

    /// Entries directly under `path` together with their metadata.
    pub async fn ls_detail(&self, path: &str) -> Outcome<Vec<FileInfo>> {
        contain("ls", path, self.fs.ls(path).await, vec![])
    }

    /// Deletes the target. A fault is forgiven when the target is gone afterwards.
    pub async fn delete(&self, path: &str, recursive: bool) -> Outcome<()> {
        match self.fs.delete(path, recursive).await {
            Ok(()) => Outcome::ok(()),
            Err(err) => {
                warn!("delete {path}: {err}");
                let gone = self.fs.exists(path).await.map(|present| !present);
                settle("delete", path, err, gone)
            }
        }
    }

    /// Alias for [`Facade::delete`]
    pub async fn rm(&self, path: &str, recursive: bool) -> Outcome<()> {
        self.delete(path, recursive).await
    }

    /// Creates the directory and its parents. A fault is forgiven when a
    /// directory (not just any entry) sits at `path` afterwards.
    pub async fn mkdir(&self, path: &str) -> Outcome<()> {
        match self.fs.mkdir(path).await {
            Ok(()) => Outcome::ok(()),
            Err(err) => {
                warn!("mkdir {path}: {err}");
                let created = match self.fs.info(path).await {
                    Ok(info) => Ok(info.is_dir()),
                    Err(check) if check.is_not_found() => Ok(false),
                    Err(check) => Err(check),
                };
                settle("mkdir", path, err, created)
            }
        }
    }

    pub async fn chmod(&self, path: &str, mode: u32) -> FsResult<()> {
        self.fs.chmod(path, mode).await
    }

    pub async fn chown(&self, path: &str, owner: Option<&str>, group: Option<&str>) -> FsResult<()> {
        self.fs.chown(path, owner, group).await
    }

    pub async fn rename(&self, from: &str, to: &str) -> FsResult<()> {
        self.fs.rename(from, to).await
    }

    pub async fn open(&self, path: &str, mode: OpenMode) -> FsResult<RemoteFile> {
        self.fs.open(path, mode).await
    }

    /// Copies one remote file to `local`; the value is the byte count.
    pub async fn download<P: AsRef<Path>>(&self, path: &str, local: P) -> Outcome<u64> {
        contain("download", path, self.fs.download(path, local.as_ref()).await, 0)
    }

    /// Copies one local file to `path`; the value is the byte count.
    pub async fn upload<P: AsRef<Path>>(&self, local: P, path: &str) -> Outcome<u64> {
        contain("upload", path, self.fs.upload(local.as_ref(), path).await, 0)
    }

    /// Free space. `unit` is one of `K`, `M`, `G`, `T`; anything else yields raw bytes.
    pub async fn df(&self, unit: Option<&str>) -> FsResult<SizeValue> {
        self.df_with_decimals(unit, self.config.size_decimals).await
    }

    pub async fn df_with_decimals(&self, unit: Option<&str>, decimals: usize) -> FsResult<SizeValue> {
        let raw = self.fs.df().await?;
        Ok(self.present("df", raw, unit, decimals))
    }

    /// Bytes used by everything under `path`.
    pub async fn disk_usage(&self, path: &str, unit: Option<&str>) -> FsResult<SizeValue> {
        self.disk_usage_with_decimals(path, unit, self.config.size_decimals)
            .await
    }

    pub async fn disk_usage_with_decimals(
        &self,
        path: &str,
        unit: Option<&str>,
        decimals: usize,
    ) -> FsResult<SizeValue> {
        let raw = self.fs.disk_usage(path).await?;
        Ok(self.present("disk_usage", raw, unit, decimals))
    }

    pub async fn get_capacity(&self, unit: Option<&str>) -> FsResult<SizeValue> {
        self.get_capacity_with_decimals(unit, self.config.size_decimals)
            .await
    }

    pub async fn get_capacity_with_decimals(
        &self,
        unit: Option<&str>,
        decimals: usize,
    ) -> FsResult<SizeValue> {
        let raw = self.fs.get_capacity().await?;
        Ok(self.present("capacity", raw, unit, decimals))
    }

    pub async fn get_space_used(&self, unit: Option<&str>) -> FsResult<SizeValue> {
        self.get_space_used_with_decimals(unit, self.config.size_decimals)
            .await
    }

    pub async fn get_space_used_with_decimals(
        &self,
        unit: Option<&str>,
        decimals: usize,
    ) -> FsResult<SizeValue> {
        let raw = self.fs.get_space_used().await?;
        Ok(self.present("space_used", raw, unit, decimals))
    }

    fn present(&self, label: &str, raw: u64, unit: Option<&str>, decimals: usize) -> SizeValue {
        let size = size::scale(raw, unit, decimals);
        if self.config.echo_sizes {
            info!("{label}: {size}");
        }
        size
    }
}
