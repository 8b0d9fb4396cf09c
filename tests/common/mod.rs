#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use rfs_facade::{
    remote::{FileInfo, FileKind, OpenMode, RemoteFile, RemoteFs},
    Error, Facade, FsResult,
};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fs,
    io::{self, Cursor},
    path::{Path, PathBuf},
    pin::Pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    task::{Context, Poll},
};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn facade(fs: MockFs) -> (Arc<MockFs>, Facade<MockFs>) {
    init_logging();
    let fs = Arc::new(fs);
    (fs.clone(), Facade::new(fs))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Exists,
    Cat,
    Delete,
    Chmod,
    Chown,
    Info,
    Ls,
    Mkdir,
    Open,
    Rename,
    Download,
    Upload,
    Df,
    DiskUsage,
    Capacity,
    SpaceUsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Fails without touching anything
    Hard,
    /// Performs the operation, then reports failure anyway. For `Open` the
    /// handle is returned but every read fails.
    Spurious,
}

#[derive(Default)]
struct State {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
    modes: HashMap<String, u32>,
    faults: HashMap<(Op, String), Fault>,
    calls: Vec<(Op, String)>,
    capacity: u64,
    free: u64,
}

/// In-memory [`RemoteFs`] with fault injection and call recording.
/// Streams opened for writing discard what is written.
#[derive(Default)]
pub struct MockFs {
    state: Mutex<State>,
    open_handles: Arc<AtomicUsize>,
    bytes_read: Arc<AtomicUsize>,
}

fn parent(path: &str) -> String {
    match path.trim_end_matches('/').rfind('/') {
        Some(0) | None => "/".to_owned(),
        Some(idx) => path[..idx].to_owned(),
    }
}

fn name(path: &str) -> String {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_owned()
}

fn injected(op: Op, path: &str) -> Error {
    Error::Remote(format!("injected {op:?} fault on {path}"))
}

impl State {
    fn add_dirs(&mut self, path: &str) {
        let mut current = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            current.push('/');
            current.push_str(part);
            self.dirs.insert(current.clone());
        }
        self.dirs.insert("/".to_owned());
    }

    fn fault(&mut self, op: Op, path: &str) -> Option<Fault> {
        self.calls.push((op, path.to_owned()));
        self.faults
            .get(&(op, path.to_owned()))
            .or_else(|| self.faults.get(&(op, "*".to_owned())))
            .copied()
    }

    fn info(&self, path: &str) -> Option<FileInfo> {
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        let kind = if self.files.contains_key(path) {
            FileKind::File
        } else if self.dirs.contains(path) {
            FileKind::Directory
        } else {
            return None;
        };

        Some(FileInfo {
            path: path.to_owned(),
            name: name(path),
            kind,
            size: self.files.get(path).map_or(0, |d| d.len() as u64),
            permissions: self.modes.get(path).copied(),
            ..Default::default()
        })
    }

    fn under(&self, path: &str) -> Vec<String> {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        self.files
            .keys()
            .chain(self.dirs.iter())
            .filter(|p| p.len() > prefix.len() && p.starts_with(&prefix))
            .cloned()
            .collect()
    }
}

impl MockFs {
    pub fn new() -> Self {
        let fs = Self::default();
        fs.state.lock().unwrap().dirs.insert("/".to_owned());
        fs
    }

    pub fn with_file(self, path: &str, contents: &[u8]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.add_dirs(&parent(path));
            state.files.insert(path.to_owned(), contents.to_vec());
        }
        self
    }

    pub fn with_dir(self, path: &str) -> Self {
        self.state.lock().unwrap().add_dirs(path);
        self
    }

    pub fn with_space(self, capacity: u64, free: u64) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.capacity = capacity;
            state.free = free;
        }
        self
    }

    /// `"*"` matches every path
    pub fn fail(self, op: Op, path: &str) -> Self {
        self.inject(op, path, Fault::Hard)
    }

    pub fn spurious(self, op: Op, path: &str) -> Self {
        self.inject(op, path, Fault::Spurious)
    }

    fn inject(self, op: Op, path: &str, fault: Fault) -> Self {
        self.state
            .lock()
            .unwrap()
            .faults
            .insert((op, path.to_owned()), fault);
        self
    }

    pub fn calls(&self, op: Op) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(o, _)| *o == op)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().files.get(path).cloned()
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.state.lock().unwrap().dirs.contains(path)
    }

    pub fn mode(&self, path: &str) -> Option<u32> {
        self.state.lock().unwrap().modes.get(path).copied()
    }

    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    pub fn bytes_read(&self) -> usize {
        self.bytes_read.load(Ordering::SeqCst)
    }

    fn stream(&self, data: Vec<u8>, broken: bool) -> RemoteFile {
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        Box::new(MockStream {
            data: Cursor::new(data),
            broken,
            open_handles: self.open_handles.clone(),
            bytes_read: self.bytes_read.clone(),
        })
    }
}

#[async_trait]
impl RemoteFs for MockFs {
    async fn exists(&self, path: &str) -> FsResult<bool> {
        let mut state = self.state.lock().unwrap();
        if state.fault(Op::Exists, path).is_some() {
            return Err(injected(Op::Exists, path));
        }
        Ok(state.info(path).is_some())
    }

    async fn cat(&self, path: &str) -> FsResult<Bytes> {
        let mut state = self.state.lock().unwrap();
        if state.fault(Op::Cat, path).is_some() {
            return Err(injected(Op::Cat, path));
        }
        state
            .files
            .get(path)
            .map(|d| Bytes::from(d.clone()))
            .ok_or_else(|| Error::NotFound(path.to_owned()))
    }

    async fn delete(&self, path: &str, recursive: bool) -> FsResult<()> {
        let mut state = self.state.lock().unwrap();
        let fault = state.fault(Op::Delete, path);
        if fault == Some(Fault::Hard) {
            return Err(injected(Op::Delete, path));
        }

        if state.files.remove(path).is_none() {
            if !state.dirs.contains(path) {
                return Err(Error::NotFound(path.to_owned()));
            }

            let children = state.under(path);
            if !children.is_empty() && !recursive {
                return Err(Error::Remote(format!("{path}: directory not empty")));
            }
            for child in children {
                state.files.remove(&child);
                state.dirs.remove(&child);
            }
            state.dirs.remove(path);
        }

        match fault {
            Some(_) => Err(injected(Op::Delete, path)),
            None => Ok(()),
        }
    }

    async fn chmod(&self, path: &str, mode: u32) -> FsResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fault(Op::Chmod, path).is_some() {
            return Err(Error::PermissionDenied(path.to_owned()));
        }
        if state.info(path).is_none() {
            return Err(Error::NotFound(path.to_owned()));
        }
        state.modes.insert(path.to_owned(), mode);
        Ok(())
    }

    async fn chown(&self, path: &str, _owner: Option<&str>, _group: Option<&str>) -> FsResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fault(Op::Chown, path).is_some() {
            return Err(Error::PermissionDenied(path.to_owned()));
        }
        match state.info(path) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(path.to_owned())),
        }
    }

    async fn info(&self, path: &str) -> FsResult<FileInfo> {
        let mut state = self.state.lock().unwrap();
        if state.fault(Op::Info, path).is_some() {
            return Err(injected(Op::Info, path));
        }
        state
            .info(path)
            .ok_or_else(|| Error::NotFound(path.to_owned()))
    }

    async fn ls(&self, path: &str) -> FsResult<Vec<FileInfo>> {
        let mut state = self.state.lock().unwrap();
        if state.fault(Op::Ls, path).is_some() {
            return Err(injected(Op::Ls, path));
        }
        let dir = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        if !state.dirs.contains(dir) {
            return Err(Error::NotFound(path.to_owned()));
        }

        let children: Vec<String> = state
            .under(path)
            .into_iter()
            .filter(|child| parent(child) == dir)
            .collect();

        Ok(children.iter().filter_map(|c| state.info(c)).collect())
    }

    async fn mkdir(&self, path: &str) -> FsResult<()> {
        let mut state = self.state.lock().unwrap();
        let fault = state.fault(Op::Mkdir, path);
        if fault == Some(Fault::Hard) {
            return Err(injected(Op::Mkdir, path));
        }
        state.add_dirs(path);
        match fault {
            Some(_) => Err(injected(Op::Mkdir, path)),
            None => Ok(()),
        }
    }

    async fn open(&self, path: &str, mode: OpenMode) -> FsResult<RemoteFile> {
        let (data, broken) = {
            let mut state = self.state.lock().unwrap();
            let fault = state.fault(Op::Open, path);
            if fault == Some(Fault::Hard) {
                return Err(injected(Op::Open, path));
            }

            let data = match mode {
                OpenMode::Read => state
                    .files
                    .get(path)
                    .cloned()
                    .ok_or_else(|| Error::NotFound(path.to_owned()))?,
                OpenMode::Write | OpenMode::Append => Vec::new(),
            };
            (data, fault.is_some())
        };

        Ok(self.stream(data, broken))
    }

    async fn rename(&self, from: &str, to: &str) -> FsResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fault(Op::Rename, from).is_some() {
            return Err(injected(Op::Rename, from));
        }
        let data = state
            .files
            .remove(from)
            .ok_or_else(|| Error::NotFound(from.to_owned()))?;
        state.files.insert(to.to_owned(), data);
        Ok(())
    }

    async fn download(&self, path: &str, local: &Path) -> FsResult<u64> {
        let data = {
            let mut state = self.state.lock().unwrap();
            if state.fault(Op::Download, path).is_some() {
                return Err(injected(Op::Download, path));
            }
            state
                .files
                .get(path)
                .cloned()
                .ok_or_else(|| Error::NotFound(path.to_owned()))?
        };

        if let Some(parent) = local.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(local, &data)?;
        Ok(data.len() as u64)
    }

    async fn upload(&self, local: &Path, path: &str) -> FsResult<u64> {
        let data = fs::read(local)?;
        let mut state = self.state.lock().unwrap();
        if state.fault(Op::Upload, path).is_some() {
            return Err(injected(Op::Upload, path));
        }
        state.add_dirs(&parent(path));
        state.files.insert(path.to_owned(), data.clone());
        Ok(data.len() as u64)
    }

    async fn df(&self) -> FsResult<u64> {
        let mut state = self.state.lock().unwrap();
        if state.fault(Op::Df, "").is_some() {
            return Err(injected(Op::Df, ""));
        }
        Ok(state.free)
    }

    async fn disk_usage(&self, path: &str) -> FsResult<u64> {
        let mut state = self.state.lock().unwrap();
        if state.fault(Op::DiskUsage, path).is_some() {
            return Err(injected(Op::DiskUsage, path));
        }
        if let Some(data) = state.files.get(path) {
            return Ok(data.len() as u64);
        }
        Ok(state
            .under(path)
            .iter()
            .filter_map(|p| state.files.get(p))
            .map(|d| d.len() as u64)
            .sum())
    }

    async fn get_capacity(&self) -> FsResult<u64> {
        let mut state = self.state.lock().unwrap();
        if state.fault(Op::Capacity, "").is_some() {
            return Err(injected(Op::Capacity, ""));
        }
        Ok(state.capacity)
    }

    async fn get_space_used(&self) -> FsResult<u64> {
        let mut state = self.state.lock().unwrap();
        if state.fault(Op::SpaceUsed, "").is_some() {
            return Err(injected(Op::SpaceUsed, ""));
        }
        Ok(state.capacity - state.free)
    }
}

pub struct MockStream {
    data: Cursor<Vec<u8>>,
    broken: bool,
    open_handles: Arc<AtomicUsize>,
    bytes_read: Arc<AtomicUsize>,
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.broken {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "connection reset")));
        }

        let before = buf.filled().len();
        let poll = Pin::new(&mut this.data).poll_read(cx, buf);
        this.bytes_read
            .fetch_add(buf.filled().len() - before, Ordering::SeqCst);
        poll
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().data).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().data).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().data).poll_shutdown(cx)
    }
}

pub fn local_tree(root: &Path, files: &[(&str, &str)]) -> PathBuf {
    for (rel, contents) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
    root.to_path_buf()
}
