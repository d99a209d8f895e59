/// Record store abstraction
///
/// Check records live in a key-value store partitioned by category and keyed
/// by record id. The monitoring engine only lists, reads and updates them;
/// creation and deletion belong to the CRUD layer but are exposed here too.
pub mod file;

pub use file::FileRecordStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record {category}/{id} not found")]
    NotFound { category: String, id: String },

    #[error("record {category}/{id} already exists")]
    AlreadyExists { category: String, id: String },

    #[error("invalid record key: {0}")]
    InvalidKey(String),

    #[error("record {category}/{id} is not valid JSON: {source}")]
    Corrupt {
        category: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Ids of every record in `category`
    async fn list(&self, category: &str) -> Result<Vec<String>, StoreError>;

    /// Raw record, unvalidated
    async fn read(&self, category: &str, id: &str) -> Result<Value, StoreError>;

    /// Replace an existing record
    async fn update(&self, category: &str, id: &str, record: &Value) -> Result<(), StoreError>;

    /// Store a new record, failing if one already exists under `id`
    async fn create(&self, category: &str, id: &str, record: &Value) -> Result<(), StoreError>;

    async fn delete(&self, category: &str, id: &str) -> Result<(), StoreError>;
}
