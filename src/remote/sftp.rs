use bytes::Bytes;
use russh_sftp::{
    client::{fs::Metadata, SftpSession},
    protocol::OpenFlags,
};
use std::path::Path;
use tokio::{
    fs,
    io::{self, AsyncRead, AsyncWrite, AsyncWriteExt},
};

use super::{FileInfo, FileKind, OpenMode, RemoteFile, RemoteFs};
use crate::{
    error::{Error, FsResult},
    utils,
};

const S_IFMT: u32 = 0o170_000;
const S_IFDIR: u32 = 0o040_000;
const S_IFREG: u32 = 0o100_000;
const S_IFLNK: u32 = 0o120_000;

/// Filesystem totals in bytes
#[derive(Debug, PartialEq)]
struct Blocks {
    total: u64,
    free: u64,
    avail: u64,
}

impl Blocks {
    /// Converts block counts to bytes, saturating on servers that report
    /// absurd geometry.
    fn from_counts(fragment_size: u64, total: u64, free: u64, avail: u64) -> Self {
        Self {
            total: total.saturating_mul(fragment_size),
            free: free.saturating_mul(fragment_size),
            avail: avail.saturating_mul(fragment_size),
        }
    }
}

/// [`RemoteFs`] backed by an SFTP session.
///
/// Free-space queries need the `statvfs@openssh.com` extension on the server.
pub struct SftpFs {
    session: SftpSession,
}

impl SftpFs {
    /// Initializes the SFTP protocol over an already authenticated channel stream
    pub async fn new<S>(stream: S) -> FsResult<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        Ok(Self::from_session(SftpSession::new(stream).await?))
    }

    pub fn from_session(session: SftpSession) -> Self {
        Self { session }
    }

    /// Closes the inner channel stream.
    pub async fn close(&self) -> FsResult<()> {
        Ok(self.session.close().await?)
    }

    async fn blocks(&self) -> FsResult<Blocks> {
        let stat = self
            .session
            .fs_info("/")
            .await?
            .ok_or_else(|| Error::Unsupported("statvfs@openssh.com".to_owned()))?;

        Ok(Blocks::from_counts(
            stat.fragment_size,
            stat.blocks,
            stat.blocks_free,
            stat.blocks_avail,
        ))
    }

    /// Attributes with nothing set except what the caller fills in.
    async fn blank_attrs(&self, path: &str) -> FsResult<Metadata> {
        let mut attrs = self.session.metadata(path).await?;
        attrs.size = None;
        attrs.atime = None;
        attrs.mtime = None;
        attrs.permissions = None;
        Ok(attrs)
    }
}

fn kind_of(attrs: &Metadata) -> FileKind {
    match attrs.permissions.map(|p| p & S_IFMT) {
        Some(S_IFDIR) => FileKind::Directory,
        Some(S_IFREG) => FileKind::File,
        Some(S_IFLNK) => FileKind::Symlink,
        _ => FileKind::Other,
    }
}

fn file_info(path: String, attrs: &Metadata) -> FileInfo {
    FileInfo {
        name: utils::remote_name(&path).to_owned(),
        kind: kind_of(attrs),
        size: attrs.size.unwrap_or(0),
        owner: attrs
            .user
            .clone()
            .or_else(|| attrs.uid.map(|uid| uid.to_string())),
        group: attrs
            .group
            .clone()
            .or_else(|| attrs.gid.map(|gid| gid.to_string())),
        permissions: attrs.permissions.map(|p| p & !S_IFMT),
        modified: attrs.mtime.and_then(utils::from_unix),
        path,
    }
}

/// Streams `reader` into a fresh local file, creating its parents.
///
/// A partially written file is removed when the copy does not complete.
async fn copy_to_local<R>(reader: &mut R, local: &Path) -> FsResult<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    if let Some(parent) = local.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let mut file = fs::File::create(local).await?;
    let copied = match io::copy(reader, &mut file).await {
        Ok(copied) => file.flush().await.map(|()| copied),
        Err(err) => Err(err),
    };
    drop(file);

    match copied {
        Ok(copied) => Ok(copied),
        Err(err) => {
            if let Err(cleanup) = fs::remove_file(local).await {
                debug!("remove partial {}: {cleanup}", local.display());
            }
            Err(err.into())
        }
    }
}

fn parse_id(name: Option<&str>, what: &str) -> FsResult<Option<u32>> {
    name.map(|n| {
        n.parse::<u32>()
            .map_err(|_| Error::InvalidInput(format!("sftp needs a numeric {what} id: {n}")))
    })
    .transpose()
}

#[async_trait]
impl RemoteFs for SftpFs {
    async fn exists(&self, path: &str) -> FsResult<bool> {
        Ok(self.session.try_exists(path).await?)
    }

    async fn cat(&self, path: &str) -> FsResult<Bytes> {
        Ok(Bytes::from(self.session.read(path).await?))
    }

    async fn delete(&self, path: &str, recursive: bool) -> FsResult<()> {
        let attrs = self.session.symlink_metadata(path).await?;

        if kind_of(&attrs) != FileKind::Directory {
            return Ok(self.session.remove_file(path).await?);
        }

        if recursive {
            for entry in self.session.read_dir(path).await? {
                let child = utils::join_remote(path, &entry.file_name());
                self.delete(&child, true).await?;
            }
        }

        Ok(self.session.remove_dir(path).await?)
    }

    async fn chmod(&self, path: &str, mode: u32) -> FsResult<()> {
        let mut attrs = self.blank_attrs(path).await?;
        attrs.uid = None;
        attrs.gid = None;
        attrs.permissions = Some(mode & !S_IFMT);
        Ok(self.session.set_metadata(path, attrs).await?)
    }

    async fn chown(&self, path: &str, owner: Option<&str>, group: Option<&str>) -> FsResult<()> {
        let uid = parse_id(owner, "user")?;
        let gid = parse_id(group, "group")?;

        if uid.is_none() && gid.is_none() {
            return Ok(());
        }

        // SFTPv3 always carries both ids, so the untouched one is resent as is
        let mut attrs = self.blank_attrs(path).await?;
        attrs.uid = uid.or(attrs.uid);
        attrs.gid = gid.or(attrs.gid);
        Ok(self.session.set_metadata(path, attrs).await?)
    }

    async fn info(&self, path: &str) -> FsResult<FileInfo> {
        let attrs = self.session.metadata(path).await?;
        Ok(file_info(path.to_owned(), &attrs))
    }

    async fn ls(&self, path: &str) -> FsResult<Vec<FileInfo>> {
        Ok(self
            .session
            .read_dir(path)
            .await?
            .map(|entry| file_info(utils::join_remote(path, &entry.file_name()), &entry.metadata()))
            .collect())
    }

    async fn mkdir(&self, path: &str) -> FsResult<()> {
        for dir in utils::remote_ancestors(path) {
            if !self.exists(&dir).await? {
                self.session.create_dir(dir).await?;
            }
        }

        Ok(())
    }

    async fn open(&self, path: &str, mode: OpenMode) -> FsResult<RemoteFile> {
        let flags = match mode {
            OpenMode::Read => OpenFlags::READ,
            OpenMode::Write => OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE,
            OpenMode::Append => OpenFlags::CREATE | OpenFlags::APPEND | OpenFlags::WRITE,
        };

        let file = self.session.open_with_flags(path, flags).await?;
        Ok(Box::new(file))
    }

    async fn rename(&self, from: &str, to: &str) -> FsResult<()> {
        Ok(self.session.rename(from, to).await?)
    }

    async fn download(&self, path: &str, local: &Path) -> FsResult<u64> {
        let mut remote = self.session.open(path).await?;
        let copied = copy_to_local(&mut remote, local).await?;
        remote.shutdown().await?;

        Ok(copied)
    }

    async fn upload(&self, local: &Path, path: &str) -> FsResult<u64> {
        let mut file = fs::File::open(local).await?;

        if let Some(parent) = utils::remote_parent(path) {
            self.mkdir(&parent).await?;
        }

        let mut remote = self.session.create(path).await?;
        let copied = io::copy(&mut file, &mut remote).await?;
        remote.shutdown().await?;

        Ok(copied)
    }

    async fn df(&self) -> FsResult<u64> {
        Ok(self.blocks().await?.avail)
    }

    async fn disk_usage(&self, path: &str) -> FsResult<u64> {
        let root = self.info(path).await?;
        if !root.is_dir() {
            return Ok(root.size);
        }

        let mut total = 0;
        let mut pending = vec![root.path];

        while let Some(dir) = pending.pop() {
            for entry in self.ls(&dir).await? {
                match entry.kind {
                    FileKind::Directory => pending.push(entry.path),
                    FileKind::File => total += entry.size,
                    _ => (),
                }
            }
        }

        Ok(total)
    }

    async fn get_capacity(&self) -> FsResult<u64> {
        Ok(self.blocks().await?.total)
    }

    async fn get_space_used(&self) -> FsResult<u64> {
        let blocks = self.blocks().await?;
        Ok(blocks.total.saturating_sub(blocks.free))
    }
}
