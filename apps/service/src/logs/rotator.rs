use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, error, info, warn};

use super::{LogStore, archive_id};

/// Rotations running at once during a pass
const ROTATION_CONCURRENCY: usize = 8;

/// One successfully rotated log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatedLog {
    pub log_id: String,
    pub archive_id: String,
}

/// Summary of one rotation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationReport {
    pub rotated: Vec<RotatedLog>,
    /// `(log_id, error)` for every log whose rotation failed
    pub failed: Vec<(String, String)>,
}

/// Compresses every active log into a timestamped archive and truncates it.
///
/// Archives are never deleted here.
pub struct LogRotator {
    store: Arc<dyn LogStore>,
}

impl LogRotator {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    /// Rotate all active logs. A failure on one log never stops the others.
    pub async fn rotate_all(&self) -> RotationReport {
        let log_ids = match self.store.list(false).await {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "Could not list logs for rotation");
                return RotationReport::default();
            }
        };

        if log_ids.is_empty() {
            debug!("No logs to rotate");
            return RotationReport::default();
        }

        let results: Vec<_> = futures::stream::iter(log_ids)
            .map(|log_id| async move {
                let archive = archive_id(&log_id, chrono::Utc::now().timestamp_millis());
                let result = self.store.rotate(&log_id, &archive).await;
                (log_id, archive, result)
            })
            .buffer_unordered(ROTATION_CONCURRENCY)
            .collect()
            .await;

        let mut report = RotationReport::default();
        for (log_id, archive_id, result) in results {
            match result {
                Ok(()) => {
                    debug!(log_id = %log_id, archive_id = %archive_id, "Log rotated");
                    report.rotated.push(RotatedLog { log_id, archive_id });
                }
                Err(e) => {
                    warn!(log_id = %log_id, step = ?e.step(), error = %e, "Log rotation failed");
                    report.failed.push((log_id, e.to_string()));
                }
            }
        }

        report.rotated.sort_by(|a, b| a.log_id.cmp(&b.log_id));
        info!(rotated = report.rotated.len(), failed = report.failed.len(), "Log rotation finished");
        report
    }
}
