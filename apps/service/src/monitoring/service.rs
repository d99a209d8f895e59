use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::scheduler::CheckScheduler;
use super::ticker::spawn_periodic;
use crate::config::MonitoringConfig;
use crate::logs::LogRotator;

/// The monitoring engine: a gather loop and an independent log rotation loop
pub struct MonitoringService {
    scheduler: Arc<CheckScheduler>,
    rotator: Arc<LogRotator>,
    check_interval: Duration,
    rotation_interval: Duration,
    run_on_start: bool,
}

impl MonitoringService {
    pub fn new(scheduler: Arc<CheckScheduler>, rotator: Arc<LogRotator>, config: &MonitoringConfig) -> Self {
        Self {
            scheduler,
            rotator,
            check_interval: config.check_interval(),
            rotation_interval: config.rotation_interval(),
            run_on_start: config.run_on_start,
        }
    }

    /// Start both periodic loops
    pub fn start(self) -> MonitoringHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            check_interval_secs = self.check_interval.as_secs(),
            rotation_interval_secs = self.rotation_interval.as_secs(),
            "Background workers are running"
        );

        let scheduler = self.scheduler;
        let gather = spawn_periodic(
            "gather",
            self.check_interval,
            self.run_on_start,
            shutdown_rx.clone(),
            move || {
                let scheduler = scheduler.clone();
                async move {
                    scheduler.tick().await;
                }
            },
        );

        let rotator = self.rotator;
        let rotation = spawn_periodic(
            "log-rotation",
            self.rotation_interval,
            self.run_on_start,
            shutdown_rx,
            move || {
                let rotator = rotator.clone();
                async move {
                    rotator.rotate_all().await;
                }
            },
        );

        MonitoringHandle { shutdown: shutdown_tx, tasks: vec![gather, rotation] }
    }
}

/// Handle to a running [`MonitoringService`]
pub struct MonitoringHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl MonitoringHandle {
    /// Signal both loops to stop and wait for them. A tick in progress completes first.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Monitoring task ended abnormally");
            }
        }
        info!("Background workers stopped");
    }
}
