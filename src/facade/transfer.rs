//! Recursive `put` and `get`.
//!
//! Every mapping is computed before the first transfer starts, then each one
//! is attempted in order regardless of how the previous ones went.
//!
//! A source written with a trailing separator (`root/`) has its contents
//! placed under the destination; without one (`root`) the directory itself
//! lands there, so `root/a.txt` goes to `<dest>/root/a.txt`.

use std::path::{Path, PathBuf};
use tokio::{fs, task};
use walkdir::WalkDir;

use super::{Facade, Outcome};
use crate::{
    error::{Error, FsResult},
    remote::RemoteFs,
    utils,
};

/// A local file paired with its remote counterpart
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathMapping {
    pub local: PathBuf,
    pub remote: String,
}

impl PathMapping {
    pub fn new<P: Into<PathBuf>, R: Into<String>>(local: P, remote: R) -> Self {
        Self {
            local: local.into(),
            remote: remote.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransferReport {
    pub succeeded: Vec<PathMapping>,
    pub failed: Vec<(PathMapping, Error)>,
}

impl TransferReport {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    /// No file failed
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, mapping: PathMapping, result: FsResult<u64>) {
        match result {
            Ok(_) => self.succeeded.push(mapping),
            Err(err) => self.failed.push((mapping, err)),
        }
    }

    fn into_outcome(self) -> Outcome<Self> {
        if self.is_complete() {
            return Outcome::ok(self);
        }

        let error = Error::Remote(format!(
            "{} of {} transfers failed",
            self.failure_count(),
            self.attempted()
        ));
        Outcome::failed(self, error)
    }
}

/// Directory whose path prefix is replaced by the destination root.
fn local_base(source: &Path) -> PathBuf {
    if utils::has_trailing_separator(&source.to_string_lossy()) {
        return source.to_path_buf();
    }

    source
        .parent()
        .map_or_else(|| source.to_path_buf(), Path::to_path_buf)
}

fn remote_base(source: &str) -> String {
    if utils::has_trailing_separator(source) {
        return source.trim_end_matches('/').to_owned();
    }

    utils::remote_parent(source).unwrap_or_default()
}

fn upload_mapping(base: &Path, file: &Path, dest: &str) -> PathMapping {
    let rel = file.strip_prefix(base).unwrap_or(file);
    PathMapping::new(file, utils::join_remote(dest, &utils::to_remote_relative(rel)))
}

fn download_target(root: &Path, rel: &str) -> PathBuf {
    rel.split('/')
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .fold(root.to_path_buf(), |path, part| path.join(part))
}

/// Walks `source` and maps every file under it below `dest`.
///
/// Entries that cannot be read are returned separately so they count as failures.
pub(crate) fn plan_upload(
    source: &Path,
    dest: &str,
) -> (Vec<PathMapping>, Vec<(PathMapping, Error)>) {
    let base = local_base(source);
    let mut mappings = vec![];
    let mut unreadable = vec![];

    for entry in WalkDir::new(source).sort_by_file_name() {
        match entry {
            Ok(entry) if entry.path().is_file() => {
                mappings.push(upload_mapping(&base, entry.path(), dest));
            }
            Ok(_) => (),
            Err(err) => {
                let path = err.path().unwrap_or(source).to_path_buf();
                warn!("put {}: {err}", path.display());
                unreadable.push((upload_mapping(&base, &path, dest), err.into()));
            }
        }
    }

    (mappings, unreadable)
}

impl<F: RemoteFs> Facade<F> {
    /// Uploads a file, or every file below a directory, to `remote`.
    ///
    /// A local path that is neither a file nor a directory fails without
    /// contacting the remote side.
    pub async fn put<P: AsRef<Path>>(&self, local: P, remote: &str) -> Outcome<TransferReport> {
        let local = local.as_ref();
        let mut report = TransferReport::default();

        let metadata = match fs::metadata(local).await {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!("put {}: {err}", local.display());
                return Outcome::failed(report, not_transferable(local));
            }
        };

        if metadata.is_file() {
            let result = self.upload(local, remote).await.into_result();
            report.record(PathMapping::new(local, remote), result);
            return report.into_outcome();
        }

        if !metadata.is_dir() {
            return Outcome::failed(report, not_transferable(local));
        }

        let (source, dest) = (local.to_path_buf(), remote.to_owned());
        let plan = task::spawn_blocking(move || plan_upload(&source, &dest)).await;
        let (mappings, unreadable) = match plan {
            Ok(plan) => plan,
            Err(err) => return Outcome::failed(report, Error::IO(err.to_string())),
        };

        debug!("put {}: {} files", local.display(), mappings.len());
        report.failed = unreadable;

        for mapping in mappings {
            let result = self.upload(&mapping.local, &mapping.remote).await.into_result();
            report.record(mapping, result);
        }

        report.into_outcome()
    }

    /// Downloads a remote file, or every file below a remote directory, into `local`.
    pub async fn get<P: AsRef<Path>>(&self, remote: &str, local: P) -> Outcome<TransferReport> {
        let local = local.as_ref();
        let mut report = TransferReport::default();

        let root = match self.fs.info(remote).await {
            Ok(info) => info,
            Err(err) => {
                warn!("get {remote}: {err}");
                return Outcome::failed(report, err);
            }
        };

        if !root.is_dir() {
            let result = self.download(remote, local).await.into_result();
            report.record(PathMapping::new(local, remote), result);
            return report.into_outcome();
        }

        let base = remote_base(remote);
        let mut mappings = vec![];
        let mut pending = vec![root.path];

        while let Some(dir) = pending.pop() {
            let mut entries = match self.fs.ls(&dir).await {
                Ok(entries) => entries,
                Err(err) => {
                    warn!("get {dir}: {err}");
                    let rel = dir.strip_prefix(&base).unwrap_or(&dir);
                    report
                        .failed
                        .push((PathMapping::new(download_target(local, rel), dir.as_str()), err));
                    continue;
                }
            };

            entries.sort_by(|a, b| a.name.cmp(&b.name));
            let mut subdirs = vec![];

            for entry in entries {
                if entry.is_dir() {
                    subdirs.push(entry.path);
                    continue;
                }

                let rel = entry.path.strip_prefix(&base).unwrap_or(&entry.path);
                let target = download_target(local, rel);
                mappings.push(PathMapping::new(target, entry.path.as_str()));
            }

            pending.extend(subdirs.into_iter().rev());
        }

        debug!("get {remote}: {} files", mappings.len());

        for mapping in mappings {
            let result = self.download(&mapping.remote, &mapping.local).await.into_result();
            report.record(mapping, result);
        }

        report.into_outcome()
    }
}

fn not_transferable(local: &Path) -> Error {
    Error::InvalidInput(format!(
        "{} is neither a file nor a directory",
        local.display()
    ))
}
