use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{LogStep, LogStore, LogStoreError};
use crate::keyed_lock::KeyedLocks;

const ACTIVE_EXTENSION: &str = ".log";
const ARCHIVE_EXTENSION: &str = ".gz.b64";

/// Directory of `{id}.log` active logs and `{archiveId}.gz.b64` archives.
///
/// Appends and rotations of the same log id are serialised, so a line written
/// while a rotation is in progress lands after the truncate instead of being
/// lost by it.
#[derive(Debug)]
pub struct FileLogStore {
    dir: PathBuf,
    locks: KeyedLocks,
}

impl FileLogStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), locks: KeyedLocks::default() }
    }

    /// Create the log directory if needed
    pub async fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let store = Self::new(dir);
        fs::create_dir_all(&store.dir).await?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn active_path(&self, log_id: &str) -> Result<PathBuf, LogStoreError> {
        validate_id(log_id)?;
        Ok(self.dir.join(format!("{log_id}{ACTIVE_EXTENSION}")))
    }

    fn archive_path(&self, archive_id: &str) -> Result<PathBuf, LogStoreError> {
        validate_id(archive_id)?;
        Ok(self.dir.join(format!("{archive_id}{ARCHIVE_EXTENSION}")))
    }

    async fn compress_unlocked(&self, log_id: &str, archive_id: &str) -> Result<(), LogStoreError> {
        let source = self.active_path(log_id)?;
        let dest = self.archive_path(archive_id)?;

        let contents = fs::read(&source).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => LogStoreError::NotFound(log_id.to_string()),
            _ => io_error(LogStep::Read, log_id, e),
        })?;

        let encoded = tokio::task::spawn_blocking(move || gzip_base64(&contents))
            .await
            .map_err(|e| io_error(LogStep::Compress, log_id, std::io::Error::other(e)))?
            .map_err(|e| io_error(LogStep::Compress, log_id, e))?;

        let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&dest).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(LogStoreError::ArchiveExists(archive_id.to_string()));
            }
            Err(e) => return Err(io_error(LogStep::Compress, archive_id, e)),
        };

        file.write_all(encoded.as_bytes())
            .await
            .map_err(|e| io_error(LogStep::Compress, archive_id, e))?;
        file.sync_all().await.map_err(|e| io_error(LogStep::Compress, archive_id, e))?;

        debug!(log_id, archive_id, "Log compressed");
        Ok(())
    }

    async fn truncate_unlocked(&self, log_id: &str) -> Result<(), LogStoreError> {
        let path = self.active_path(log_id)?;
        let file = fs::OpenOptions::new().write(true).open(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => LogStoreError::NotFound(log_id.to_string()),
            _ => io_error(LogStep::Truncate, log_id, e),
        })?;

        file.set_len(0).await.map_err(|e| io_error(LogStep::Truncate, log_id, e))?;
        file.sync_all().await.map_err(|e| io_error(LogStep::Truncate, log_id, e))?;
        Ok(())
    }
}

fn validate_id(id: &str) -> Result<(), LogStoreError> {
    if id.is_empty() || id.starts_with('.') || id.contains(['/', '\\']) {
        return Err(LogStoreError::InvalidId(id.to_string()));
    }
    Ok(())
}

fn io_error(step: LogStep, id: &str, source: std::io::Error) -> LogStoreError {
    LogStoreError::Io { step, id: id.to_string(), source }
}

fn gzip_base64(contents: &[u8]) -> std::io::Result<String> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(contents)?;
    let compressed = encoder.finish()?;
    Ok(STANDARD.encode(compressed))
}

fn gunzip(compressed: &[u8]) -> std::io::Result<String> {
    let mut text = String::new();
    GzDecoder::new(compressed).read_to_string(&mut text)?;
    Ok(text)
}

#[async_trait]
impl LogStore for FileLogStore {
    async fn append(&self, log_id: &str, line: &str) -> Result<(), LogStoreError> {
        let path = self.active_path(log_id)?;
        let _guard = self.locks.lock(log_id).await;

        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');

        let mut file = fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .await
            .map_err(|e| io_error(LogStep::Append, log_id, e))?;

        // Single write on an O_APPEND descriptor keeps each line contiguous.
        file.write_all(&buf).await.map_err(|e| io_error(LogStep::Append, log_id, e))?;
        file.sync_data().await.map_err(|e| io_error(LogStep::Append, log_id, e))?;
        Ok(())
    }

    async fn list(&self, include_archived: bool) -> Result<Vec<String>, LogStoreError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(LogStep::Read, &self.dir.to_string_lossy(), e)),
        };

        let mut ids = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => return Err(io_error(LogStep::Read, &self.dir.to_string_lossy(), e)),
            };
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };

            if let Some(id) = name.strip_suffix(ACTIVE_EXTENSION) {
                ids.push(id.to_string());
            } else if include_archived {
                if let Some(id) = name.strip_suffix(ARCHIVE_EXTENSION) {
                    ids.push(id.to_string());
                }
            }
        }

        ids.sort();
        Ok(ids)
    }

    async fn read(&self, log_id: &str) -> Result<Vec<u8>, LogStoreError> {
        let path = self.active_path(log_id)?;
        fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => LogStoreError::NotFound(log_id.to_string()),
            _ => io_error(LogStep::Read, log_id, e),
        })
    }

    async fn compress(&self, log_id: &str, archive_id: &str) -> Result<(), LogStoreError> {
        let _guard = self.locks.lock(log_id).await;
        self.compress_unlocked(log_id, archive_id).await
    }

    async fn decompress(&self, archive_id: &str) -> Result<String, LogStoreError> {
        let path = self.archive_path(archive_id)?;
        let encoded = fs::read_to_string(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => LogStoreError::NotFound(archive_id.to_string()),
            _ => io_error(LogStep::Decompress, archive_id, e),
        })?;

        let compressed = STANDARD
            .decode(encoded.trim())
            .map_err(|source| LogStoreError::Decode { archive_id: archive_id.to_string(), source })?;

        tokio::task::spawn_blocking(move || gunzip(&compressed))
            .await
            .map_err(|e| io_error(LogStep::Decompress, archive_id, std::io::Error::other(e)))?
            .map_err(|e| io_error(LogStep::Decompress, archive_id, e))
    }

    async fn truncate(&self, log_id: &str) -> Result<(), LogStoreError> {
        let _guard = self.locks.lock(log_id).await;
        self.truncate_unlocked(log_id).await
    }

    async fn rotate(&self, log_id: &str, archive_id: &str) -> Result<(), LogStoreError> {
        let _guard = self.locks.lock(log_id).await;
        self.compress_unlocked(log_id, archive_id).await?;
        self.truncate_unlocked(log_id).await
    }
}
