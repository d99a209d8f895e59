use super::types::{Check, CheckOutcome, CheckState, ErrorKind};

/// What an outcome means for a check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub previous: CheckState,
    pub current: CheckState,
    pub alert_warranted: bool,
}

/// Classify an outcome against the check's success criteria
pub fn classify(check: &Check, outcome: &CheckOutcome) -> CheckState {
    match (outcome.error_kind, outcome.response_code) {
        (ErrorKind::None, Some(code)) if check.success_codes.contains(&code) => CheckState::Up,
        _ => CheckState::Down,
    }
}

/// Decide the next state and whether the change is worth an alert.
///
/// A check's first evaluation never alerts.
pub fn transition(check: &Check, outcome: &CheckOutcome) -> Transition {
    let current = classify(check, outcome);
    Transition {
        previous: check.state,
        current,
        alert_warranted: check.has_been_checked() && current != check.state,
    }
}
