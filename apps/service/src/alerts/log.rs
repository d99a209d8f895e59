use async_trait::async_trait;
use tracing::info;

use super::{AlertDispatcher, AlertError};

/// Dispatcher that only records alerts in the process log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDispatcher;

#[async_trait]
impl AlertDispatcher for LogDispatcher {
    async fn notify(&self, recipient: &str, message: &str) -> Result<(), AlertError> {
        info!(recipient, message, "Alert raised");
        Ok(())
    }
}
