use std::sync::Arc;

use tracing::{debug, warn};

use super::checker::{HttpProber, ProbeError, ProbeRequest, Prober};
use super::types::{Check, CheckOutcome};

/// Check executor - runs exactly one probe per call and always produces an outcome
pub struct CheckExecutor {
    prober: Arc<dyn Prober>,
}

impl CheckExecutor {
    pub fn new(prober: Arc<dyn Prober>) -> Self {
        Self { prober }
    }

    /// Executor using the real HTTP prober
    pub fn http() -> Result<Self, ProbeError> {
        Ok(Self::new(Arc::new(HttpProber::new()?)))
    }

    /// Probe `check`, racing the response against the check's timeout.
    ///
    /// Failures never escape; they are folded into the outcome.
    pub async fn execute(&self, check: &Check) -> CheckOutcome {
        let request = match ProbeRequest::for_check(check) {
            Ok(request) => request,
            Err(e) => {
                warn!(check_id = %check.id, error = %e, "Could not build probe request");
                return CheckOutcome::network_error(e.to_string());
            }
        };

        // Exactly one branch completes; dropping the other closes any
        // in-flight connection.
        let outcome = tokio::select! {
            result = self.prober.probe(&request) => match result {
                Ok(status_code) => CheckOutcome::response(status_code),
                Err(ProbeError::TimedOut) => CheckOutcome::timeout(),
                Err(e) => CheckOutcome::network_error(e.to_string()),
            },
            _ = tokio::time::sleep(request.timeout) => CheckOutcome::timeout(),
        };

        debug!(
            check_id = %check.id,
            target = %request.url,
            response_code = ?outcome.response_code,
            error_kind = ?outcome.error_kind,
            "Probe finished"
        );
        outcome
    }
}
