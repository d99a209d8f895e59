use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::state::transition;
use super::types::{CHECKS_CATEGORY, Check, CheckOutcome, CheckState, LogRecord};
use crate::alerts::{AlertDispatcher, state_change_message};
use crate::logs::{LogStoreError, LogWriter};
use crate::store::{RecordStore, StoreError};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("could not log evaluation: {0}")]
    Log(#[from] LogStoreError),

    #[error("could not serialize check: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("could not persist check: {0}")]
    Persist(#[from] StoreError),
}

/// Result of processing one outcome
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// The check as persisted after this evaluation
    pub check: Check,
    pub outcome: CheckOutcome,
    pub previous_state: CheckState,
    pub alert_triggered: bool,
    /// Whether the alert dispatcher accepted the alert
    pub alert_delivered: bool,
}

/// Applies an outcome to a check: log, persist, then alert on a transition
pub struct OutcomeProcessor {
    records: Arc<dyn RecordStore>,
    log_writer: LogWriter,
    alerts: Arc<dyn AlertDispatcher>,
}

impl OutcomeProcessor {
    pub fn new(records: Arc<dyn RecordStore>, log_writer: LogWriter, alerts: Arc<dyn AlertDispatcher>) -> Self {
        Self { records, log_writer, alerts }
    }

    /// Process an outcome observed at `now_millis`.
    ///
    /// A log or persistence failure aborts the remaining steps; an alert is
    /// only sent once the new state has been persisted. Alert delivery
    /// failures are reported and otherwise ignored.
    pub async fn process(
        &self,
        check: Check,
        outcome: CheckOutcome,
        now_millis: i64,
    ) -> Result<Evaluation, ProcessError> {
        let decision = transition(&check, &outcome);

        let record = LogRecord {
            check: check.clone(),
            outcome: outcome.clone(),
            state: decision.current,
            alert_triggered: decision.alert_warranted,
            timestamp: now_millis,
        };
        if let Err(e) = self.log_writer.write(&record).await {
            warn!(check_id = %check.id, error = %e, "Logging evaluation failed");
            return Err(e.into());
        }

        let mut updated = check;
        updated.state = decision.current;
        // lastChecked never moves backwards, even if the wall clock does
        updated.last_checked = Some(updated.last_checked.map_or(now_millis, |prev| prev.max(now_millis)));

        let value = serde_json::to_value(&updated)?;
        if let Err(e) = self.records.update(CHECKS_CATEGORY, &updated.id, &value).await {
            warn!(check_id = %updated.id, error = %e, "Persisting check failed, alert suppressed");
            return Err(e.into());
        }

        let mut alert_delivered = false;
        if decision.alert_warranted {
            let message = state_change_message(&updated);
            match self.alerts.notify(&updated.owner_id, &message).await {
                Ok(()) => {
                    info!(check_id = %updated.id, state = %updated.state, "User alerted to status change");
                    alert_delivered = true;
                }
                Err(e) => {
                    warn!(check_id = %updated.id, error = %e, "Could not deliver status change alert");
                }
            }
        } else {
            debug!(check_id = %updated.id, state = %updated.state, "Check outcome has not changed, no alert needed");
        }

        Ok(Evaluation {
            check: updated,
            outcome,
            previous_state: decision.previous,
            alert_triggered: decision.alert_warranted,
            alert_delivered,
        })
    }
}
