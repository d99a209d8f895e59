/// Monitoring engine module - periodic evaluation of user-defined checks
///
/// This module is responsible for:
/// - Validating check records read from the record store
/// - Executing HTTP/HTTPS probes within each check's timeout
/// - Classifying outcomes and deciding on state-change alerts
/// - Scheduling gather ticks and log rotation
pub mod checker;
pub mod executor;
pub mod processor;
pub mod scheduler;
pub mod service;
pub mod state;
pub mod ticker;
pub mod types;
pub mod validation;

pub use executor::CheckExecutor;
pub use processor::{Evaluation, OutcomeProcessor, ProcessError};
pub use scheduler::{CheckRun, CheckScheduler, TickReport};
pub use service::{MonitoringHandle, MonitoringService};
pub use types::{Check, CheckOutcome, CheckState, ErrorKind, LogRecord};
