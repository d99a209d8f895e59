use std::sync::Arc;

use tracing::debug;

use super::{LogStore, LogStoreError};
use crate::monitoring::types::LogRecord;

/// Serialises evaluation records into their check's active log
#[derive(Clone)]
pub struct LogWriter {
    store: Arc<dyn LogStore>,
}

impl LogWriter {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    /// Append one JSON line for `record` to the log named after its check id
    pub async fn write(&self, record: &LogRecord) -> Result<(), LogStoreError> {
        let line = serde_json::to_string(record)?;
        self.store.append(&record.check.id, &line).await?;
        debug!(check_id = %record.check.id, "Evaluation logged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::FileLogStore;
    use crate::monitoring::types::{Check, CheckOutcome, CheckState, HttpMethod, OwnerKey, Protocol};
    use serde_json::Map;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_records_are_written_one_per_line() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileLogStore::open(dir.path()).await.unwrap());
        let writer = LogWriter::new(store.clone());

        let check = Check {
            id: "abcdefghij0123456789".into(),
            owner_id: "5551234567".into(),
            owner_key: OwnerKey::UserPhone,
            protocol: Protocol::Http,
            url: "example.com".into(),
            method: HttpMethod::Get,
            success_codes: vec![200],
            timeout_seconds: 1,
            state: CheckState::Down,
            last_checked: None,
            extra: Map::new(),
        };
        let first = LogRecord {
            check: check.clone(),
            outcome: CheckOutcome::response(200),
            state: CheckState::Up,
            alert_triggered: false,
            timestamp: 1,
        };
        let second = LogRecord { outcome: CheckOutcome::timeout(), state: CheckState::Down, timestamp: 2, ..first.clone() };

        writer.write(&first).await.unwrap();
        writer.write(&second).await.unwrap();

        let contents = String::from_utf8(store.read(&check.id).await.unwrap()).unwrap();
        let records: Vec<LogRecord> = contents.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(records, vec![first, second]);
    }
}
