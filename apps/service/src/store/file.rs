use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use super::{RecordStore, StoreError};
use crate::keyed_lock::KeyedLocks;

const RECORD_EXTENSION: &str = ".json";

/// JSON-file record store: one `{base_dir}/{category}/{id}.json` file per record.
///
/// Writes to the same record are serialised, so an update never brings back a
/// record that a concurrent delete removed.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    base_dir: PathBuf,
    locks: Arc<KeyedLocks>,
}

impl FileRecordStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into(), locks: Arc::new(KeyedLocks::default()) }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn category_dir(&self, category: &str) -> Result<PathBuf, StoreError> {
        validate_key(category)?;
        Ok(self.base_dir.join(category))
    }

    fn record_path(&self, category: &str, id: &str) -> Result<PathBuf, StoreError> {
        validate_key(id)?;
        Ok(self.category_dir(category)?.join(format!("{id}{RECORD_EXTENSION}")))
    }

    fn lock_key(category: &str, id: &str) -> String {
        format!("{category}/{id}")
    }

    fn not_found(category: &str, id: &str) -> StoreError {
        StoreError::NotFound { category: category.to_string(), id: id.to_string() }
    }
}

/// Keys become file names, so path separators and dot-files are refused
fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key.starts_with('.') || key.contains(['/', '\\']) {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn list(&self, category: &str) -> Result<Vec<String>, StoreError> {
        let dir = self.category_dir(category)?;
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with('.') {
                continue;
            }
            if let Some(id) = name.strip_suffix(RECORD_EXTENSION) {
                ids.push(id.to_string());
            }
        }

        ids.sort();
        Ok(ids)
    }

    async fn read(&self, category: &str, id: &str) -> Result<Value, StoreError> {
        let path = self.record_path(category, id)?;
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(Self::not_found(category, id)),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
            category: category.to_string(),
            id: id.to_string(),
            source,
        })
    }

    async fn update(&self, category: &str, id: &str, record: &Value) -> Result<(), StoreError> {
        let path = self.record_path(category, id)?;
        let data = serde_json::to_vec(record)?;
        let _guard = self.locks.lock(&Self::lock_key(category, id)).await;

        if !fs::try_exists(&path).await? {
            return Err(Self::not_found(category, id));
        }

        // Write a sibling temp file and rename it over the record so readers
        // never observe a half-written record.
        let tmp_path = path.with_file_name(format!(".{id}.{}.tmp", Uuid::new_v4()));
        let mut file = fs::File::create(&tmp_path).await?;
        let written = async {
            file.write_all(&data).await?;
            file.sync_all().await
        }
        .await;
        drop(file);

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        // The record may have been removed behind the store's back meanwhile.
        if !fs::try_exists(&path).await? {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(Self::not_found(category, id));
        }
        if let Err(e) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        debug!(category, id, "Record updated");
        Ok(())
    }

    async fn create(&self, category: &str, id: &str, record: &Value) -> Result<(), StoreError> {
        let path = self.record_path(category, id)?;
        fs::create_dir_all(self.category_dir(category)?).await?;
        let _guard = self.locks.lock(&Self::lock_key(category, id)).await;

        let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists {
                    category: category.to_string(),
                    id: id.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        file.write_all(&serde_json::to_vec(record)?).await?;
        file.sync_all().await?;
        Ok(())
    }

    async fn delete(&self, category: &str, id: &str) -> Result<(), StoreError> {
        let path = self.record_path(category, id)?;
        let _guard = self.locks.lock(&Self::lock_key(category, id)).await;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Self::not_found(category, id)),
            Err(e) => Err(e.into()),
        }
    }
}
