//! checkwatch: periodic health checks for user-defined HTTP endpoints.
//!
//! The engine lists every check in the record store once per gather tick,
//! probes each one concurrently, persists the resulting up/down state, appends
//! an audit line per evaluation and alerts the owner on state transitions. A
//! second loop compresses and truncates the audit logs.

pub mod alerts;
pub mod config;
mod keyed_lock;
pub mod logs;
pub mod monitoring;
pub mod store;

use std::sync::Arc;

use alerts::{AlertDispatcher, AlertError, LogDispatcher, TwilioSms};
use config::Config;
use logs::{FileLogStore, LogRotator, LogWriter};
use monitoring::checker::ProbeError;
use monitoring::{CheckExecutor, CheckScheduler, MonitoringService, OutcomeProcessor};
use store::FileRecordStore;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("could not prepare log directory: {0}")]
    Logs(#[from] std::io::Error),

    #[error("could not create HTTP prober: {0}")]
    Prober(#[from] ProbeError),

    #[error("could not create alert dispatcher: {0}")]
    Alerts(#[from] AlertError),
}

/// Fully wired engine built from configuration
pub struct Engine {
    pub scheduler: Arc<CheckScheduler>,
    pub rotator: Arc<LogRotator>,
    pub service: MonitoringService,
}

impl Engine {
    /// Wire file-backed stores, the HTTP prober and the configured alert provider
    pub async fn from_config(config: &Config) -> Result<Self, BuildError> {
        let records = Arc::new(FileRecordStore::new(&config.storage.data_dir));
        let logs = Arc::new(FileLogStore::open(&config.storage.logs_dir).await?);

        let alerts: Arc<dyn AlertDispatcher> = match config.sms_alerts() {
            Some(twilio) => {
                info!("Sending alerts as SMS through Twilio");
                Arc::new(TwilioSms::new(twilio.clone())?)
            }
            None => {
                info!("SMS alerts not configured, alerts go to the process log");
                Arc::new(LogDispatcher)
            }
        };

        let processor = OutcomeProcessor::new(records.clone(), LogWriter::new(logs.clone()), alerts);
        let scheduler = Arc::new(CheckScheduler::new(
            records,
            CheckExecutor::http()?,
            processor,
            config.monitoring.max_concurrent_checks,
        ));
        let rotator = Arc::new(LogRotator::new(logs));
        let service = MonitoringService::new(scheduler.clone(), rotator.clone(), &config.monitoring);

        Ok(Self { scheduler, rotator, service })
    }
}
