//! Probe execution: one outbound request per check per cycle.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::time::timeout;
use url::Url;

use super::types::{CheckRecord, Method, ProbeOutcome};

/// Transport seam for issuing a single HTTP/HTTPS request.
///
/// Implementations resolve to the response status code, or to an error for
/// anything that prevented a response. Deadlines are owned by the caller.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, method: Method, target: &Url) -> Result<u16>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        // No client-level total timeout: the executor enforces the
        // per-check deadline around the whole attempt.
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, method: Method, target: &Url) -> Result<u16> {
        let method = match method {
            Method::Get => reqwest::Method::GET,
            Method::Put => reqwest::Method::PUT,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        };

        let response = self
            .client
            .request(method, target.clone())
            .send()
            .await
            .map_err(|e| anyhow!("request failed: {e}"))?;

        Ok(response.status().as_u16())
    }
}

/// Executes probes with a hard per-attempt deadline.
pub struct ProbeExecutor {
    transport: Arc<dyn Transport>,
}

impl ProbeExecutor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Perform exactly one attempt for `check` and deliver exactly one
    /// outcome.
    ///
    /// Of the three terminal events (response, transport error, deadline)
    /// only the first to occur is observed: the single await resolves once
    /// and `tokio::time::timeout` cancels the in-flight request by dropping
    /// it when the deadline fires, so a late response can never produce a
    /// second outcome for the same attempt.
    pub async fn probe(&self, check: &CheckRecord) -> ProbeOutcome {
        let target = match Url::parse(&check.target()) {
            Ok(target) => target,
            Err(e) => return ProbeOutcome::failure(format!("invalid target: {e}")),
        };

        let deadline = Duration::from_secs(check.timeout_seconds);
        match timeout(deadline, self.transport.fetch(check.method, &target)).await {
            Ok(Ok(code)) => ProbeOutcome::response(code),
            Ok(Err(e)) => ProbeOutcome::failure(e.to_string()),
            Err(_) => ProbeOutcome::failure("timeout"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::monitoring::types::{CheckState, Protocol};

    fn sample_check(timeout_seconds: u64) -> CheckRecord {
        CheckRecord {
            id: "abcdefghij0123456789".to_string(),
            owner_phone: "5551234567".to_string(),
            protocol: Protocol::Http,
            url: "example.com/health?probe=1".to_string(),
            method: Method::Get,
            success_codes: vec![200],
            timeout_seconds,
            state: CheckState::Down,
            last_checked: None,
        }
    }

    /// Resolves after `delay` with `result`, counting completions so tests
    /// can observe whether a cancelled attempt ever finished.
    struct SlowTransport {
        delay: Duration,
        result: std::result::Result<u16, String>,
        completions: AtomicUsize,
    }

    impl SlowTransport {
        fn new(delay: Duration, result: std::result::Result<u16, String>) -> Self {
            Self { delay, result, completions: AtomicUsize::new(0) }
        }
    }

    #[async_trait::async_trait]
    impl Transport for SlowTransport {
        async fn fetch(&self, _method: Method, _target: &Url) -> Result<u16> {
            tokio::time::sleep(self.delay).await;
            self.completions.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map_err(|e| anyhow!(e))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_produces_response_code() {
        let transport = Arc::new(SlowTransport::new(Duration::from_millis(10), Ok(200)));
        let executor = ProbeExecutor::new(transport);

        let outcome = executor.probe(&sample_check(2)).await;
        assert_eq!(outcome, ProbeOutcome::response(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_produces_error_outcome() {
        let transport = Arc::new(SlowTransport::new(
            Duration::from_millis(10),
            Err("connection refused".to_string()),
        ));
        let executor = ProbeExecutor::new(transport);

        let outcome = executor.probe(&sample_check(2)).await;
        assert_eq!(outcome.error.as_deref(), Some("connection refused"));
        assert_eq!(outcome.response_code, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_produces_timeout_outcome() {
        // Transport never responds within the 2s deadline.
        let transport = Arc::new(SlowTransport::new(Duration::from_secs(3600), Ok(200)));
        let executor = ProbeExecutor::new(transport);

        let outcome = executor.probe(&sample_check(2)).await;
        assert_eq!(outcome, ProbeOutcome::failure("timeout"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_race_delivers_exactly_one_outcome() {
        // A response is on its way but the deadline fires first; only the
        // timeout outcome may be delivered, and the cancelled attempt must
        // never complete behind our back.
        let transport = Arc::new(SlowTransport::new(Duration::from_secs(3), Ok(200)));
        let executor = ProbeExecutor::new(Arc::clone(&transport) as Arc<dyn Transport>);

        let outcome = executor.probe(&sample_check(1)).await;
        assert_eq!(outcome, ProbeOutcome::failure("timeout"));

        // Give the (dropped) attempt time to have fired were it still alive.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(transport.completions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unparseable_target_fails_the_probe() {
        let transport = Arc::new(SlowTransport::new(Duration::from_millis(1), Ok(200)));
        let executor = ProbeExecutor::new(transport);

        let mut check = sample_check(2);
        check.url = "exa mple com".to_string();
        let outcome = executor.probe(&check).await;
        assert!(outcome.error.unwrap().starts_with("invalid target:"));
    }
}
