use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::executor::CheckExecutor;
use super::processor::{Evaluation, OutcomeProcessor};
use super::types::{CHECKS_CATEGORY, CheckState, ErrorKind};
use super::validation::validate_check;
use crate::store::RecordStore;

/// How one check fared during a tick
#[derive(Debug)]
pub enum CheckRun {
    Evaluated(Box<Evaluation>),
    /// Previous evaluation of the same check is still running
    SkippedInFlight,
    ReadFailed,
    Invalid,
    ProcessFailed,
}

/// Summary of one gather tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub listed: usize,
    pub evaluated: usize,
    pub up: usize,
    pub timed_out: usize,
    pub alerts: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl TickReport {
    fn record(&mut self, run: &CheckRun) {
        match run {
            CheckRun::Evaluated(eval) => {
                self.evaluated += 1;
                if eval.check.state == CheckState::Up {
                    self.up += 1;
                }
                if eval.outcome.error_kind == ErrorKind::Timeout {
                    self.timed_out += 1;
                }
                if eval.alert_triggered {
                    self.alerts += 1;
                }
            }
            CheckRun::SkippedInFlight | CheckRun::Invalid => self.skipped += 1,
            CheckRun::ReadFailed | CheckRun::ProcessFailed => self.failed += 1,
        }
    }
}

/// Check ids with an evaluation in progress
#[derive(Debug, Default)]
struct InFlight {
    ids: Mutex<HashSet<String>>,
}

impl InFlight {
    fn try_claim(self: &Arc<Self>, id: &str) -> Option<InFlightGuard> {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        ids.insert(id.to_string()).then(|| InFlightGuard { owner: self.clone(), id: id.to_string() })
    }
}

/// Releases the claim on a check id when the evaluation ends, however it ends
struct InFlightGuard {
    owner: Arc<InFlight>,
    id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.owner.ids.lock().unwrap_or_else(PoisonError::into_inner).remove(&self.id);
    }
}

/// Check scheduler - fans every check out to the probe pipeline once per tick
pub struct CheckScheduler {
    records: Arc<dyn RecordStore>,
    executor: CheckExecutor,
    processor: OutcomeProcessor,
    permits: Arc<Semaphore>,
    in_flight: Arc<InFlight>,
}

impl CheckScheduler {
    pub fn new(
        records: Arc<dyn RecordStore>,
        executor: CheckExecutor,
        processor: OutcomeProcessor,
        max_concurrent_checks: usize,
    ) -> Self {
        Self {
            records,
            executor,
            processor,
            permits: Arc::new(Semaphore::new(max_concurrent_checks.max(1))),
            in_flight: Arc::new(InFlight::default()),
        }
    }

    /// Run one gather tick: list every check and evaluate each independently.
    ///
    /// Returns once every evaluation launched by this tick has finished.
    pub async fn tick(self: &Arc<Self>) -> TickReport {
        let mut report = TickReport::default();

        let ids = match self.records.list(CHECKS_CATEGORY).await {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "Could not list checks");
                return report;
            }
        };
        report.listed = ids.len();
        if ids.is_empty() {
            debug!("Could not find any checks to process");
            return report;
        }

        let mut tasks = JoinSet::new();
        for id in ids {
            let scheduler = self.clone();
            tasks.spawn(async move { scheduler.run_check(id).await });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(run) => report.record(&run),
                Err(e) => {
                    error!(error = %e, "Check evaluation task failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            listed = report.listed,
            evaluated = report.evaluated,
            up = report.up,
            alerts = report.alerts,
            skipped = report.skipped,
            failed = report.failed,
            "Gather tick finished"
        );
        report
    }

    /// Read, validate, probe and process a single check
    pub async fn run_check(&self, id: String) -> CheckRun {
        let Some(_claim) = self.in_flight.try_claim(&id) else {
            warn!(check_id = %id, "Previous evaluation still running, skipping check this tick");
            return CheckRun::SkippedInFlight;
        };

        let Ok(_permit) = self.permits.acquire().await else {
            return CheckRun::ProcessFailed;
        };

        let raw = match self.records.read(CHECKS_CATEGORY, &id).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(check_id = %id, error = %e, "Error reading check data");
                return CheckRun::ReadFailed;
            }
        };

        let check = match validate_check(&raw) {
            Ok(check) => check,
            Err(e) => {
                warn!(check_id = %id, error = %e, "Check is not properly formatted, skipping it");
                return CheckRun::Invalid;
            }
        };
        // Persisting under a mismatched id would overwrite a different check.
        if check.id != id {
            warn!(check_id = %id, record_id = %check.id, "Check record id does not match its key, skipping it");
            return CheckRun::Invalid;
        }

        let outcome = self.executor.execute(&check).await;
        let now = chrono::Utc::now().timestamp_millis();

        match self.processor.process(check, outcome, now).await {
            Ok(evaluation) => CheckRun::Evaluated(Box::new(evaluation)),
            Err(e) => {
                warn!(check_id = %id, error = %e, "Processing check outcome failed");
                CheckRun::ProcessFailed
            }
        }
    }
}
