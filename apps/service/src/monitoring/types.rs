use serde::{Deserialize, Serialize};

/// Reachability state of a check.
///
/// There is no "unknown" variant: a record that has never been probed
/// carries no `lastChecked`, and its first observation writes a concrete
/// state without raising an alert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "http" => Some(Protocol::Http),
            "https" => Some(Protocol::Https),
            _ => None,
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP verb a check probes with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Put => "put",
            Method::Post => "post",
            Method::Delete => "delete",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "get" => Some(Method::Get),
            "put" => Some(Method::Put),
            "post" => Some(Method::Post),
            "delete" => Some(Method::Delete),
            _ => None,
        }
    }
}

/// One monitored endpoint, as stored in the record store.
///
/// The engine reads these, mutates `state`/`last_checked` and writes them
/// back; creation and deletion belong to the API layer that shares the
/// store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRecord {
    pub id: String,
    pub owner_phone: String,
    pub protocol: Protocol,
    pub url: String,
    pub method: Method,
    pub success_codes: Vec<u16>,
    pub timeout_seconds: u64,
    #[serde(default)]
    pub state: CheckState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<i64>,
}

impl CheckRecord {
    /// Full request target, e.g. `https://example.com/path?q=1`.
    pub fn target(&self) -> String {
        format!("{}://{}", self.protocol, self.url)
    }
}

/// Outcome of a single probe attempt. Created fresh per attempt and
/// discarded once folded into a record update and a log entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_code: Option<u16>,
}

impl ProbeOutcome {
    /// A response was received; its status code decides up vs down.
    pub fn response(code: u16) -> Self {
        Self { error: None, response_code: Some(code) }
    }

    /// The attempt failed before a response arrived (connect error, timeout).
    pub fn failure(cause: impl Into<String>) -> Self {
        Self { error: Some(cause.into()), response_code: None }
    }
}

/// One audit line per probe, immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// The record snapshot the probe ran against (pre-update).
    pub check: CheckRecord,
    pub outcome: ProbeOutcome,
    /// State computed from the outcome.
    pub state: CheckState,
    /// Whether this evaluation warranted an alert.
    pub alert: bool,
    /// Wall-clock time of evaluation, unix milliseconds.
    pub time: i64,
}
