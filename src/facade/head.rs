//! First-line extraction for every file in a remote directory.

use encoding_rs::{CoderResult, Decoder, Encoding, UTF_8};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{collections::BTreeMap, fmt, str::FromStr};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use super::Facade;
use crate::{
    config::FacadeConfig,
    error::{Error, FsResult},
    remote::{OpenMode, RemoteFs},
};

/// File name to first line
pub type HeaderRecord = BTreeMap<String, String>;

/// Character set used to decode headers, named by any WHATWG label
/// (`utf-8`, `latin1`, `utf-16le`, `shift_jis`, ...).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TextEncoding(&'static Encoding);

impl TextEncoding {
    pub fn for_label(label: &str) -> FsResult<Self> {
        Encoding::for_label(label.trim().as_bytes())
            .map(Self)
            .ok_or_else(|| Error::InvalidInput(format!("unknown encoding: {label}")))
    }

    /// Canonical name, e.g. `windows-1252` for the `latin1` label
    pub fn name(self) -> &'static str {
        self.0.name()
    }

    pub fn encoding(self) -> &'static Encoding {
        self.0
    }

    fn decoder(self) -> Decoder {
        self.0.new_decoder_with_bom_removal()
    }
}

impl Default for TextEncoding {
    fn default() -> Self {
        Self(UTF_8)
    }
}

impl fmt::Debug for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextEncoding({})", self.name())
    }
}

impl FromStr for TextEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::for_label(s)
    }
}

impl Serialize for TextEncoding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for TextEncoding {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Self::for_label(&label).map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadOptions {
    /// Bytes requested per read
    pub chunk_size: usize,
    pub encoding: TextEncoding,
}

impl Default for HeadOptions {
    fn default() -> Self {
        Self::from(&FacadeConfig::default())
    }
}

impl From<&FacadeConfig> for HeadOptions {
    fn from(config: &FacadeConfig) -> Self {
        Self {
            chunk_size: config.head_chunk_size,
            encoding: config.head_encoding,
        }
    }
}

/// Decodes `src` onto `text`; returns whether anything was replaced.
fn feed(decoder: &mut Decoder, mut src: &[u8], text: &mut String, last: bool) -> bool {
    let mut replaced = false;

    loop {
        let room = decoder
            .max_utf8_buffer_length(src.len())
            .unwrap_or(src.len() * 3 + 4);
        text.reserve(room);

        let (result, read, had_replacements) = decoder.decode_to_string(src, text, last);
        replaced |= had_replacements;
        src = &src[read..];

        if matches!(result, CoderResult::InputEmpty) {
            return replaced;
        }
    }
}

/// Reads chunks until the decoded text holds a `\n` or the stream ends, and
/// returns the text before the first `\n`.
///
/// Malformed input before the line end fails the read; anything after it is
/// never looked at.
async fn read_first_line<R>(
    reader: &mut R,
    chunk_size: usize,
    encoding: TextEncoding,
) -> FsResult<String>
where
    R: AsyncRead + Unpin,
{
    let mut decoder = encoding.decoder();
    let mut text = String::new();
    let mut chunk = vec![0; chunk_size.max(1)];
    let mut replaced = false;

    loop {
        let len = reader.read(&mut chunk).await?;
        let last = len == 0;
        replaced |= feed(&mut decoder, &chunk[..len], &mut text, last);

        if last || text.contains('\n') {
            break;
        }
    }

    if let Some(pos) = text.find('\n') {
        text.truncate(pos);
    }

    if replaced && text.contains(char::REPLACEMENT_CHARACTER) {
        return Err(Error::InvalidInput(format!(
            "malformed {} in first line",
            encoding.name()
        )));
    }

    Ok(text)
}

impl<F: RemoteFs> Facade<F> {
    /// First line of every file directly under `dir`, keyed by file name.
    pub async fn get_head(&self, dir: &str) -> HeaderRecord {
        self.get_head_with(dir, HeadOptions::from(&self.config))
            .await
    }

    /// Like [`Facade::get_head`] with explicit chunking and decoding.
    ///
    /// A missing directory yields an empty record without listing it. Files
    /// that cannot be opened, read or decoded are left out.
    pub async fn get_head_with(&self, dir: &str, options: HeadOptions) -> HeaderRecord {
        let mut headers = HeaderRecord::new();

        if !self.exists(dir).await.into_value() {
            debug!("get_head {dir}: no such directory");
            return headers;
        }

        for entry in self.ls_detail(dir).await.into_value() {
            if entry.is_dir() {
                continue;
            }

            match self.first_line(&entry.path, options).await {
                Ok(line) => {
                    let _ = headers.insert(entry.name, line);
                }
                Err(err) => warn!("get_head {}: {err}", entry.path),
            }
        }

        headers
    }

    async fn first_line(&self, path: &str, options: HeadOptions) -> FsResult<String> {
        let mut file = self.fs.open(path, OpenMode::Read).await?;
        let line = read_first_line(&mut file, options.chunk_size, options.encoding).await;

        if let Err(err) = file.shutdown().await {
            debug!("get_head {path}: close: {err}");
        }

        Ok(line?.trim_end().to_owned())
    }
}
