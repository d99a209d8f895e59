//! Alert delivery for check state transitions.

pub mod log;
pub mod twilio;

pub use log::LogDispatcher;
pub use twilio::{TwilioConfig, TwilioSms};

use async_trait::async_trait;
use thiserror::Error;

use crate::monitoring::types::Check;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("invalid alert: {0}")]
    Invalid(&'static str),

    #[error("alert request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("alert rejected with status {0}")]
    Rejected(u16),
}

/// Delivers a human-readable notification to a recipient
#[async_trait]
pub trait AlertDispatcher: Send + Sync {
    async fn notify(&self, recipient: &str, message: &str) -> Result<(), AlertError>;
}

/// Message sent when `check` changed state; `check.state` is the new state
pub fn state_change_message(check: &Check) -> String {
    format!(
        "Alert: Your check for {} {} is currently {}",
        check.method.as_upper(),
        check.target(),
        check.state
    )
}
