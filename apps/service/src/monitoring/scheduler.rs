//! The two periodic cycles driving the engine.
//!
//! The probe cycle sweeps every stored check on a fixed interval, spawning
//! one detached task per check so no probe can delay another; a sweep that
//! outlives the interval simply overlaps the next one. The rotation cycle
//! independently archives the audit logs on a much longer interval. Both
//! run for the life of the process and contain every per-check or per-file
//! failure.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, warn};

use super::outcome::OutcomeProcessor;
use super::probe::ProbeExecutor;
use super::validation::validate_check;
use crate::audit::AuditLog;
use crate::store::RecordStore;

/// Scheduling parameters, fixed at construction.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub probe_interval: Duration,
    pub rotation_interval: Duration,
    /// Serialize read->probe->persist per check ID. Off by default:
    /// overlapping sweeps may race on a record with last-write-wins.
    pub serialize_checks: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_secs(60),
            rotation_interval: Duration::from_secs(24 * 3600),
            serialize_checks: false,
        }
    }
}

/// Drives validation, probing, outcome processing and log rotation.
/// Cheap to clone; clones share the same parts and per-check locks.
#[derive(Clone)]
pub struct Scheduler {
    store: Arc<dyn RecordStore>,
    executor: Arc<ProbeExecutor>,
    processor: Arc<OutcomeProcessor>,
    audit: Arc<AuditLog>,
    config: SchedulerConfig,
    check_locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn RecordStore>,
        executor: Arc<ProbeExecutor>,
        processor: Arc<OutcomeProcessor>,
        audit: Arc<AuditLog>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            executor,
            processor,
            audit,
            config,
            check_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Arm both cycles. Each runs its first pass immediately.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        vec![self.clone().spawn_probe_cycle(), self.clone().spawn_rotation_cycle()]
    }

    fn spawn_probe_cycle(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut timer = interval(self.config.probe_interval);
            loop {
                timer.tick().await;
                self.sweep().await;
            }
        })
    }

    fn spawn_rotation_cycle(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut timer = interval(self.config.rotation_interval);
            loop {
                timer.tick().await;
                match self.audit.rotate_all().await {
                    Ok(rotated) => debug!("log rotation archived {rotated} files"),
                    Err(e) => warn!("log rotation failed: {e:#}"),
                }
            }
        })
    }

    /// One pass over every stored check. Only spawns: probing happens in
    /// detached per-check tasks, so the sweep itself returns immediately
    /// and a slow check never blocks the rest.
    pub async fn sweep(&self) {
        let ids = match self.store.list("checks").await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("could not list checks to process: {e:#}");
                return;
            }
        };
        if ids.is_empty() {
            debug!("no checks to process");
            return;
        }

        debug!("sweeping {} checks", ids.len());
        for id in ids {
            let scheduler = self.clone();
            tokio::spawn(async move {
                scheduler.run_check(&id).await;
            });
        }
    }

    /// Probe a single check end to end: read, validate, probe, process.
    /// Every failure is contained here; a malformed or unreadable record
    /// is skipped for this sweep with no side effects.
    pub async fn run_check(&self, id: &str) {
        let _guard = if self.config.serialize_checks {
            Some(self.lock_for(id).await)
        } else {
            None
        };

        let raw = match self.store.read("checks", id).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(check = %id, "error reading check record: {e:#}");
                return;
            }
        };

        let check = match validate_check(&raw) {
            Ok(check) => check,
            Err(e) => {
                warn!(check = %id, "check record is not properly formatted, skipping: {e}");
                return;
            }
        };

        let outcome = self.executor.probe(&check).await;
        self.processor.process(check, outcome).await;
    }

    async fn lock_for(&self, id: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let slot = {
            let mut locks = match self.check_locks.lock() {
                Ok(locks) => locks,
                Err(poisoned) => poisoned.into_inner(),
            };
            Arc::clone(
                locks
                    .entry(id.to_string())
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
            )
        };
        slot.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_reference_intervals() {
        let config = SchedulerConfig::default();
        assert_eq!(config.probe_interval, Duration::from_secs(60));
        assert_eq!(config.rotation_interval, Duration::from_secs(86_400));
        assert!(!config.serialize_checks);
    }
}
