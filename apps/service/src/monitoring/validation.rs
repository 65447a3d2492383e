//! Sanity-checking of raw check records.
//!
//! Records arrive from the shared store as untyped JSON written by the API
//! layer. A record failing any hard-required rule is rejected and skipped
//! for the sweep; `state` and `lastChecked` are soft fields that coerce
//! instead of rejecting.

use serde_json::Value;
use thiserror::Error;

use super::types::{CheckRecord, CheckState, Method, Protocol};

/// Check IDs are opaque fixed-length strings minted by the API layer.
pub const CHECK_ID_LEN: usize = 20;

/// Owner identifiers are ten-digit phone numbers.
pub const OWNER_PHONE_LEN: usize = 10;

/// Timeouts must be strictly inside (0, MAX_TIMEOUT_SECONDS).
pub const MAX_TIMEOUT_SECONDS: f64 = 5.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing or malformed field: {0}")]
    Field(&'static str),
}

/// Validate and normalize a raw stored record into a well-formed
/// [`CheckRecord`], or reject it naming the first offending field.
pub fn validate_check(raw: &Value) -> Result<CheckRecord, ValidationError> {
    let id = trimmed_string(raw, "id")
        .filter(|id| id.len() == CHECK_ID_LEN)
        .ok_or(ValidationError::Field("id"))?;

    let owner_phone = trimmed_string(raw, "ownerPhone")
        .filter(|phone| is_valid_phone(phone))
        .ok_or(ValidationError::Field("ownerPhone"))?;

    let protocol = trimmed_string(raw, "protocol")
        .and_then(|value| Protocol::parse(&value))
        .ok_or(ValidationError::Field("protocol"))?;

    let url = trimmed_string(raw, "url").ok_or(ValidationError::Field("url"))?;

    let method = trimmed_string(raw, "method")
        .and_then(|value| Method::parse(&value))
        .ok_or(ValidationError::Field("method"))?;

    let success_codes = valid_success_codes(raw).ok_or(ValidationError::Field("successCodes"))?;

    let timeout_seconds =
        valid_timeout_seconds(raw).ok_or(ValidationError::Field("timeoutSeconds"))?;

    // Soft fields: garbage coerces rather than rejecting, so records the
    // engine has never touched (or that an older writer mangled) still probe.
    let state = coerced_state(raw);
    let last_checked = valid_last_checked(raw);

    Ok(CheckRecord {
        id,
        owner_phone,
        protocol,
        url,
        method,
        success_codes,
        timeout_seconds,
        state,
        last_checked,
    })
}

/// The owner-identifier predicate, shared with the alert dispatcher.
pub fn is_valid_phone(value: &str) -> bool {
    value.len() == OWNER_PHONE_LEN && value.chars().all(|c| c.is_ascii_digit())
}

fn trimmed_string(raw: &Value, key: &str) -> Option<String> {
    let trimmed = raw.get(key)?.as_str()?.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

fn valid_success_codes(raw: &Value) -> Option<Vec<u16>> {
    let entries = raw.get("successCodes")?.as_array()?;
    if entries.is_empty() {
        return None;
    }
    entries
        .iter()
        .map(|entry| entry.as_u64().and_then(|code| u16::try_from(code).ok()))
        .collect()
}

fn valid_timeout_seconds(raw: &Value) -> Option<u64> {
    let timeout = raw.get("timeoutSeconds")?.as_f64()?;
    // Strictly exclusive on both ends; fractional values truncate.
    if timeout > 0.0 && timeout < MAX_TIMEOUT_SECONDS { Some(timeout as u64) } else { None }
}

fn coerced_state(raw: &Value) -> CheckState {
    match raw.get("state").and_then(Value::as_str) {
        Some("up") => CheckState::Up,
        _ => CheckState::Down,
    }
}

fn valid_last_checked(raw: &Value) -> Option<i64> {
    raw.get("lastChecked").and_then(Value::as_i64).filter(|&ms| ms > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_check() -> Value {
        json!({
            "id": "abcdefghij0123456789",
            "ownerPhone": "5551234567",
            "protocol": "https",
            "url": "example.com/health",
            "method": "get",
            "successCodes": [200, 201],
            "timeoutSeconds": 3,
            "state": "up",
            "lastChecked": 1_700_000_000_000i64,
        })
    }

    #[test]
    fn test_valid_record_passes() {
        let check = validate_check(&raw_check()).unwrap();
        assert_eq!(check.id, "abcdefghij0123456789");
        assert_eq!(check.protocol, Protocol::Https);
        assert_eq!(check.method, Method::Get);
        assert_eq!(check.success_codes, vec![200, 201]);
        assert_eq!(check.timeout_seconds, 3);
        assert_eq!(check.state, CheckState::Up);
        assert_eq!(check.last_checked, Some(1_700_000_000_000));
    }

    #[test]
    fn test_hard_required_fields_reject() {
        for field in
            ["id", "ownerPhone", "protocol", "url", "method", "successCodes", "timeoutSeconds"]
        {
            let mut raw = raw_check();
            raw.as_object_mut().unwrap().remove(field);
            assert_eq!(validate_check(&raw), Err(ValidationError::Field(field)), "field {field}");
        }
    }

    #[test]
    fn test_id_must_be_exact_length() {
        let mut raw = raw_check();
        raw["id"] = json!("too-short");
        assert_eq!(validate_check(&raw), Err(ValidationError::Field("id")));
    }

    #[test]
    fn test_phone_must_be_ten_digits() {
        let mut raw = raw_check();
        raw["ownerPhone"] = json!("555123456a");
        assert_eq!(validate_check(&raw), Err(ValidationError::Field("ownerPhone")));
    }

    #[test]
    fn test_unknown_protocol_or_method_rejects() {
        let mut raw = raw_check();
        raw["protocol"] = json!("ftp");
        assert_eq!(validate_check(&raw), Err(ValidationError::Field("protocol")));

        let mut raw = raw_check();
        raw["method"] = json!("patch");
        assert_eq!(validate_check(&raw), Err(ValidationError::Field("method")));
    }

    #[test]
    fn test_blank_url_rejects() {
        let mut raw = raw_check();
        raw["url"] = json!("   ");
        assert_eq!(validate_check(&raw), Err(ValidationError::Field("url")));
    }

    #[test]
    fn test_empty_success_codes_reject() {
        let mut raw = raw_check();
        raw["successCodes"] = json!([]);
        assert_eq!(validate_check(&raw), Err(ValidationError::Field("successCodes")));

        let mut raw = raw_check();
        raw["successCodes"] = json!(["ok"]);
        assert_eq!(validate_check(&raw), Err(ValidationError::Field("successCodes")));
    }

    #[test]
    fn test_timeout_bounds_are_exclusive() {
        for bad in [0, 5, 6] {
            let mut raw = raw_check();
            raw["timeoutSeconds"] = json!(bad);
            assert_eq!(
                validate_check(&raw),
                Err(ValidationError::Field("timeoutSeconds")),
                "timeout {bad}"
            );
        }
    }

    #[test]
    fn test_fractional_timeout_truncates() {
        let mut raw = raw_check();
        raw["timeoutSeconds"] = json!(4.7);
        assert_eq!(validate_check(&raw).unwrap().timeout_seconds, 4);
    }

    #[test]
    fn test_garbage_state_coerces_to_down() {
        let mut raw = raw_check();
        raw["state"] = json!("flaky");
        assert_eq!(validate_check(&raw).unwrap().state, CheckState::Down);

        let mut raw = raw_check();
        raw.as_object_mut().unwrap().remove("state");
        assert_eq!(validate_check(&raw).unwrap().state, CheckState::Down);
    }

    #[test]
    fn test_invalid_last_checked_is_dropped() {
        for bad in [json!(-5), json!(0), json!("yesterday")] {
            let mut raw = raw_check();
            raw["lastChecked"] = bad;
            assert_eq!(validate_check(&raw).unwrap().last_checked, None);
        }
    }
}
