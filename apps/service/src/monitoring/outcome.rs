//! The up/down state machine and its side effects.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::types::{CheckRecord, CheckState, LogEntry, ProbeOutcome};
use crate::alert::AlertDispatcher;
use crate::audit::AuditLog;
use crate::store::RecordStore;

pub struct OutcomeProcessor {
    store: Arc<dyn RecordStore>,
    audit: Arc<AuditLog>,
    dispatcher: Arc<dyn AlertDispatcher>,
}

impl OutcomeProcessor {
    pub fn new(
        store: Arc<dyn RecordStore>,
        audit: Arc<AuditLog>,
        dispatcher: Arc<dyn AlertDispatcher>,
    ) -> Self {
        Self { store, audit, dispatcher }
    }

    /// Fold one probe outcome into the check record.
    ///
    /// The transition and the alert decision are computed synchronously
    /// before any I/O. The store write and the audit append both run (in
    /// either order); every side effect here is best-effort: a failure is
    /// reported and abandoned until the next cycle picks the check up
    /// again.
    pub async fn process(&self, check: CheckRecord, outcome: ProbeOutcome) {
        let next = next_state(&check, &outcome);

        // A record probed for the first time never raises an alert.
        let alert_warranted = check.last_checked.is_some() && next != check.state;

        let now = Utc::now().timestamp_millis();
        let mut updated = check.clone();
        updated.state = next;
        updated.last_checked = Some(now);

        let entry = LogEntry {
            check: check.clone(),
            outcome,
            state: next,
            alert: alert_warranted,
            time: now,
        };

        let persist = async {
            match serde_json::to_value(&updated) {
                Ok(value) => {
                    if let Err(e) = self.store.update("checks", &check.id, &value).await {
                        warn!(check = %check.id, "failed to save check update: {e:#}");
                    }
                }
                Err(e) => warn!(check = %check.id, "failed to serialize check update: {e}"),
            }
        };
        let record = async {
            if let Err(e) = self.audit.append(&check.id, &entry).await {
                warn!(check = %check.id, "failed to append audit entry: {e:#}");
            }
        };
        tokio::join!(persist, record);

        if alert_warranted {
            self.alert_owner(&updated).await;
        } else {
            debug!(check = %check.id, "check outcome has not changed, no alert needed");
        }
    }

    async fn alert_owner(&self, check: &CheckRecord) {
        let message = format!(
            "Alert: your check for {} {}://{} is currently {}",
            check.method.as_str().to_uppercase(),
            check.protocol,
            check.url,
            check.state,
        );

        match self.dispatcher.send(&check.owner_phone, &message).await {
            Ok(()) => info!(check = %check.id, "alerted owner to state change: {message}"),
            Err(e) => warn!(check = %check.id, "could not send alert to owner: {e:#}"),
        }
    }
}

fn next_state(check: &CheckRecord, outcome: &ProbeOutcome) -> CheckState {
    let acceptable = outcome.error.is_none()
        && outcome.response_code.is_some_and(|code| check.success_codes.contains(&code));
    if acceptable { CheckState::Up } else { CheckState::Down }
}
