//! Validation of raw check records read from the record store.
//!
//! A record is only handed to the probe pipeline when every required field is
//! well formed. `state` and `lastChecked` are the two fields a brand-new check
//! legitimately lacks, so they are defaulted instead of required.

use serde_json::{Map, Value};
use thiserror::Error;

use super::types::{Check, CheckState, HttpMethod, OwnerKey, Protocol};

/// Length of a check identifier
pub const CHECK_ID_LEN: usize = 20;
/// Length of an owner phone number
pub const OWNER_ID_LEN: usize = 10;
pub const MIN_TIMEOUT_SECONDS: u64 = 1;
pub const MAX_TIMEOUT_SECONDS: u64 = 5;

/// Fields mapped onto [`Check`]; the owner field is handled separately
const KNOWN_FIELDS: &[&str] = &[
    "id",
    "protocol",
    "url",
    "method",
    "successCodes",
    "timeoutSeconds",
    "state",
    "lastChecked",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("check record is not a JSON object")]
    NotAnObject,

    #[error("check record has invalid fields: {}", .0.join(", "))]
    InvalidFields(Vec<&'static str>),
}

/// Validate a raw record and turn it into a [`Check`]
pub fn validate_check(raw: &Value) -> Result<Check, ValidationError> {
    let object = raw.as_object().ok_or(ValidationError::NotAnObject)?;
    let mut invalid = Vec::new();

    let id = fixed_length_string(object.get("id"), CHECK_ID_LEN);
    if id.is_none() {
        invalid.push("id");
    }

    let owner_key = if !object.contains_key("userPhone") && object.contains_key("ownerId") {
        OwnerKey::OwnerId
    } else {
        OwnerKey::UserPhone
    };
    let owner_id = fixed_length_string(object.get(owner_key.as_str()), OWNER_ID_LEN);
    if owner_id.is_none() {
        invalid.push(owner_key.as_str());
    }

    let protocol = object.get("protocol").and_then(Value::as_str).and_then(Protocol::parse);
    if protocol.is_none() {
        invalid.push("protocol");
    }

    let url = object
        .get("url")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string);
    if url.is_none() {
        invalid.push("url");
    }

    let method = object.get("method").and_then(Value::as_str).and_then(HttpMethod::parse);
    if method.is_none() {
        invalid.push("method");
    }

    let success_codes = success_codes(object.get("successCodes"));
    if success_codes.is_none() {
        invalid.push("successCodes");
    }

    let timeout_seconds = object
        .get("timeoutSeconds")
        .and_then(whole_number)
        .filter(|secs| (MIN_TIMEOUT_SECONDS..=MAX_TIMEOUT_SECONDS).contains(secs));
    if timeout_seconds.is_none() {
        invalid.push("timeoutSeconds");
    }

    let (
        Some(id),
        Some(owner_id),
        Some(protocol),
        Some(url),
        Some(method),
        Some(success_codes),
        Some(timeout_seconds),
    ) = (id, owner_id, protocol, url, method, success_codes, timeout_seconds)
    else {
        return Err(ValidationError::InvalidFields(invalid));
    };

    Ok(Check {
        id,
        owner_id,
        owner_key,
        protocol,
        url,
        method,
        success_codes,
        timeout_seconds,
        state: default_state(object.get("state")),
        last_checked: last_checked(object.get("lastChecked")),
        extra: extra_fields(object, owner_key),
    })
}

fn fixed_length_string(value: Option<&Value>, len: usize) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| s.chars().count() == len)
        .map(str::to_string)
}

/// Non-empty array of status codes; every element must be a valid status code
fn success_codes(value: Option<&Value>) -> Option<Vec<u16>> {
    let codes = value?
        .as_array()?
        .iter()
        .map(|code| whole_number(code).and_then(|c| u16::try_from(c).ok()))
        .collect::<Option<Vec<u16>>>()?;

    (!codes.is_empty()).then_some(codes)
}

/// Non-negative integer, also accepting floats with no fractional part (`3.0`)
fn whole_number(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    (f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
}

fn default_state(value: Option<&Value>) -> CheckState {
    match value.and_then(Value::as_str) {
        Some("up") => CheckState::Up,
        _ => CheckState::Down,
    }
}

/// Epoch millis of the previous evaluation, `None` when never checked
fn last_checked(value: Option<&Value>) -> Option<i64> {
    value.and_then(Value::as_i64).filter(|millis| *millis > 0)
}

fn extra_fields(object: &Map<String, Value>, owner_key: OwnerKey) -> Map<String, Value> {
    object
        .iter()
        .filter(|(key, _)| key.as_str() != owner_key.as_str() && !KNOWN_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_check() -> Value {
        json!({
            "id": "abcdefghij0123456789",
            "userPhone": "5551234567",
            "protocol": "http",
            "url": " example.com/status ",
            "method": "get",
            "successCodes": [200, 204],
            "timeoutSeconds": 3
        })
    }

    #[test]
    fn test_valid_new_check_gets_defaults() {
        let check = validate_check(&raw_check()).unwrap();

        assert_eq!(check.url, "example.com/status");
        assert_eq!(check.state, CheckState::Down);
        assert_eq!(check.last_checked, None);
        assert_eq!(check.success_codes, vec![200, 204]);
        assert!(check.extra.is_empty());
    }

    #[test]
    fn test_previous_state_is_kept() {
        let mut raw = raw_check();
        raw["state"] = json!("up");
        raw["lastChecked"] = json!(1_700_000_000_000i64);

        let check = validate_check(&raw).unwrap();
        assert_eq!(check.state, CheckState::Up);
        assert_eq!(check.last_checked, Some(1_700_000_000_000));
    }

    #[test]
    fn test_garbage_state_and_last_checked_are_defaulted() {
        let mut raw = raw_check();
        raw["state"] = json!("sideways");
        raw["lastChecked"] = json!(false);

        let check = validate_check(&raw).unwrap();
        assert_eq!(check.state, CheckState::Down);
        assert_eq!(check.last_checked, None);

        raw["lastChecked"] = json!(0);
        assert_eq!(validate_check(&raw).unwrap().last_checked, None);
    }

    #[test]
    fn test_owner_id_alias_is_accepted() {
        let mut raw = raw_check();
        let phone = raw.as_object_mut().unwrap().remove("userPhone").unwrap();
        raw["ownerId"] = phone;

        let check = validate_check(&raw).unwrap();
        assert_eq!(check.owner_id, "5551234567");
        assert_eq!(check.owner_key, OwnerKey::OwnerId);
        assert!(check.extra.is_empty());
    }

    #[test]
    fn test_other_owner_field_is_carried() {
        let mut raw = raw_check();
        raw["ownerId"] = json!("account-7");

        let check = validate_check(&raw).unwrap();
        assert_eq!(check.owner_key, OwnerKey::UserPhone);
        assert_eq!(check.extra.get("ownerId"), Some(&json!("account-7")));
    }

    #[test]
    fn test_whole_number_floats_are_accepted() {
        let mut raw = raw_check();
        raw["timeoutSeconds"] = json!(3.0);
        raw["successCodes"] = json!([200.0, 301]);

        let check = validate_check(&raw).unwrap();
        assert_eq!(check.timeout_seconds, 3);
        assert_eq!(check.success_codes, vec![200, 301]);

        raw["successCodes"] = json!([200.5]);
        assert!(validate_check(&raw).is_err());
    }

    #[test]
    fn test_invalid_fields_are_all_listed() {
        let mut raw = raw_check();
        raw["id"] = json!("short");
        raw["method"] = json!("patch");
        raw["timeoutSeconds"] = json!(9);

        let err = validate_check(&raw).unwrap_err();
        assert_eq!(err, ValidationError::InvalidFields(vec!["id", "method", "timeoutSeconds"]));
    }

    #[test]
    fn test_timeout_bounds() {
        for (timeout, ok) in [(json!(0), false), (json!(1), true), (json!(5), true), (json!(2.5), false), (json!(-1.0), false)] {
            let mut raw = raw_check();
            raw["timeoutSeconds"] = timeout;
            assert_eq!(validate_check(&raw).is_ok(), ok);
        }
    }

    #[test]
    fn test_success_codes_must_be_non_empty_codes() {
        let mut raw = raw_check();
        raw["successCodes"] = json!([]);
        assert!(validate_check(&raw).is_err());

        raw["successCodes"] = json!(["200"]);
        assert!(validate_check(&raw).is_err());

        raw["successCodes"] = json!(200);
        assert!(validate_check(&raw).is_err());
    }

    #[test]
    fn test_unknown_fields_are_carried() {
        let mut raw = raw_check();
        raw["label"] = json!("homepage");

        let check = validate_check(&raw).unwrap();
        assert_eq!(check.extra.get("label"), Some(&json!("homepage")));
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert_eq!(validate_check(&json!([1, 2])), Err(ValidationError::NotAnObject));
    }
}
