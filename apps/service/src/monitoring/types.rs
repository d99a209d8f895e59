use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Record store category holding check records
pub const CHECKS_CATEGORY: &str = "checks";

/// State of a monitored check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Up,
    #[default]
    Down,
}

impl std::fmt::Display for CheckState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckState::Up => write!(f, "up"),
            CheckState::Down => write!(f, "down"),
        }
    }
}

/// Scheme used to reach a check target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "http" => Some(Protocol::Http),
            "https" => Some(Protocol::Https),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP method a probe is sent with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "delete" => Some(HttpMethod::Delete),
            _ => None,
        }
    }

    /// Upper-cased name as sent on the wire
    pub fn as_upper(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// Record field the owner's phone number is stored under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OwnerKey {
    #[default]
    UserPhone,
    OwnerId,
}

impl OwnerKey {
    pub fn as_str(self) -> &'static str {
        match self {
            OwnerKey::UserPhone => "userPhone",
            OwnerKey::OwnerId => "ownerId",
        }
    }
}

/// A validated check record.
///
/// Fields the engine does not own (written by the CRUD layer) are kept in
/// `extra` so that persisting the record never drops them. The owner is
/// written back under the key it was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "CheckRecord", try_from = "CheckRecord")]
pub struct Check {
    pub id: String,

    /// Owner of the check; the phone number alerts are sent to
    pub owner_id: String,
    pub owner_key: OwnerKey,

    pub protocol: Protocol,

    /// Host and path without scheme prefix
    pub url: String,

    pub method: HttpMethod,

    pub success_codes: Vec<u16>,

    pub timeout_seconds: u64,

    pub state: CheckState,

    /// Epoch millis of the last completed evaluation
    pub last_checked: Option<i64>,

    pub extra: Map<String, Value>,
}

/// On-disk layout of a check record
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckRecord {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner_id: Option<String>,
    protocol: Protocol,
    url: String,
    method: HttpMethod,
    success_codes: Vec<u16>,
    timeout_seconds: u64,
    #[serde(default)]
    state: CheckState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_checked: Option<i64>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<Check> for CheckRecord {
    fn from(check: Check) -> Self {
        let (user_phone, owner_id) = match check.owner_key {
            OwnerKey::UserPhone => (Some(check.owner_id), None),
            OwnerKey::OwnerId => (None, Some(check.owner_id)),
        };
        let mut extra = check.extra;
        extra.remove(check.owner_key.as_str());

        Self {
            id: check.id,
            user_phone,
            owner_id,
            protocol: check.protocol,
            url: check.url,
            method: check.method,
            success_codes: check.success_codes,
            timeout_seconds: check.timeout_seconds,
            state: check.state,
            last_checked: check.last_checked,
            extra,
        }
    }
}

impl TryFrom<CheckRecord> for Check {
    type Error = &'static str;

    fn try_from(record: CheckRecord) -> Result<Self, Self::Error> {
        let mut extra = record.extra;
        let (owner_id, owner_key) = match (record.user_phone, record.owner_id) {
            (Some(phone), other) => {
                if let Some(other) = other {
                    extra.insert(OwnerKey::OwnerId.as_str().to_string(), Value::String(other));
                }
                (phone, OwnerKey::UserPhone)
            }
            (None, Some(owner)) => (owner, OwnerKey::OwnerId),
            (None, None) => return Err("missing field `userPhone`"),
        };

        Ok(Self {
            id: record.id,
            owner_id,
            owner_key,
            protocol: record.protocol,
            url: record.url,
            method: record.method,
            success_codes: record.success_codes,
            timeout_seconds: record.timeout_seconds,
            state: record.state,
            last_checked: record.last_checked,
            extra,
        })
    }
}

impl Check {
    /// Whether the check has completed at least one evaluation
    pub fn has_been_checked(&self) -> bool {
        self.last_checked.is_some()
    }

    /// Full target as configured, e.g. `https://example.com/health`
    pub fn target(&self) -> String {
        format!("{}://{}", self.protocol, self.url)
    }
}

/// Why a probe did not produce a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    #[default]
    None,
    NetworkError,
    Timeout,
}

/// Result of executing a single probe
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    pub response_code: Option<u16>,

    pub error_kind: ErrorKind,

    /// Transport error text, kept for diagnostics only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl CheckOutcome {
    pub fn response(status_code: u16) -> Self {
        Self { response_code: Some(status_code), error_kind: ErrorKind::None, error_detail: None }
    }

    pub fn network_error(detail: impl Into<String>) -> Self {
        Self { response_code: None, error_kind: ErrorKind::NetworkError, error_detail: Some(detail.into()) }
    }

    pub fn timeout() -> Self {
        Self { response_code: None, error_kind: ErrorKind::Timeout, error_detail: None }
    }
}

/// One line of a check's audit log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Snapshot of the check as it was before this evaluation
    pub check: Check,
    pub outcome: CheckOutcome,
    pub state: CheckState,
    pub alert_triggered: bool,
    /// Epoch millis of the evaluation
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_check() -> Check {
        Check {
            id: "abcdefghij0123456789".to_string(),
            owner_id: "5551234567".to_string(),
            owner_key: OwnerKey::UserPhone,
            protocol: Protocol::Https,
            url: "example.com/health?full=1".to_string(),
            method: HttpMethod::Get,
            success_codes: vec![200, 201],
            timeout_seconds: 3,
            state: CheckState::Down,
            last_checked: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn test_check_serializes_with_store_field_names() {
        let value = serde_json::to_value(sample_check()).unwrap();

        assert_eq!(value["userPhone"], "5551234567");
        assert_eq!(value["successCodes"], json!([200, 201]));
        assert_eq!(value["timeoutSeconds"], 3);
        assert_eq!(value["state"], "down");
        assert!(value.get("lastChecked").is_none());
    }

    #[test]
    fn test_unknown_fields_survive_persistence() {
        let mut raw = serde_json::to_value(sample_check()).unwrap();
        raw["createdBy"] = json!("dashboard");

        let check: Check = serde_json::from_value(raw).unwrap();
        assert_eq!(check.extra.get("createdBy"), Some(&json!("dashboard")));

        let back = serde_json::to_value(&check).unwrap();
        assert_eq!(back["createdBy"], "dashboard");
    }

    #[test]
    fn test_owner_keeps_its_field_name() {
        let mut check = sample_check();
        check.owner_key = OwnerKey::OwnerId;

        let value = serde_json::to_value(&check).unwrap();
        assert_eq!(value["ownerId"], "5551234567");
        assert!(value.get("userPhone").is_none());

        let back: Check = serde_json::from_value(value).unwrap();
        assert_eq!(back, check);
    }

    #[test]
    fn test_both_owner_fields_are_kept() {
        let mut raw = serde_json::to_value(sample_check()).unwrap();
        raw["ownerId"] = json!("account-7");

        let check: Check = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(check.owner_key, OwnerKey::UserPhone);
        assert_eq!(serde_json::to_value(&check).unwrap(), raw);
    }

    #[test]
    fn test_outcome_error_kind_names() {
        let value = serde_json::to_value(CheckOutcome::timeout()).unwrap();
        assert_eq!(value["errorKind"], "timeout");
        assert_eq!(value["responseCode"], Value::Null);

        let value = serde_json::to_value(CheckOutcome::network_error("refused")).unwrap();
        assert_eq!(value["errorKind"], "network-error");
        assert_eq!(value["errorDetail"], "refused");
    }

    #[test]
    fn test_target_joins_protocol_and_url() {
        assert_eq!(sample_check().target(), "https://example.com/health?full=1");
        assert_eq!(HttpMethod::Delete.as_upper(), "DELETE");
    }
}
