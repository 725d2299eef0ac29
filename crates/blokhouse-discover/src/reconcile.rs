//! Discovery reconciliation: merge one network scan into the asset directory.
//!
//! A cycle moves `Idle -> Scanning -> Reconciling -> Idle`, or
//! `Scanning -> Failed -> Idle` when the scan errors or times out. The scan
//! runs without touching the directory; only the per-host upserts do, and
//! each of those is atomic on its own.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, watch, Mutex};
use uuid::Uuid;

use blokhouse_core::events::{DirectoryEvent, EventPayload};
use blokhouse_core::{AssetId, DiscoveredHost};
use blokhouse_directory::{AssetStore, Upsert};

use crate::error::{DiscoverError, Result};
use crate::scanner::{NetworkScanner, ScanOptions};

const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Where the reconciler is in its current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleState {
    Idle,
    Scanning,
    Reconciling,
    Failed,
}

/// A discovered host the cycle could not merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedHost {
    pub ip: String,
    pub mac: Option<String>,
    pub reason: String,
}

/// What one discovery cycle did to the directory.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub scan_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub hosts_seen: usize,
    pub created: Vec<AssetId>,
    pub updated: Vec<AssetId>,
    pub unchanged: Vec<AssetId>,
    pub skipped: Vec<SkippedHost>,
}

/// Runs discovery cycles against a shared asset store.
///
/// Cycles on one reconciler are serialised: a second `run_cycle` waits for
/// the first to finish and then scans again. Concurrent reconcilers over the
/// same store stay duplicate-free because every host goes through the
/// store's atomic [`AssetStore::upsert_discovered`].
pub struct DiscoveryReconciler {
    store: Arc<dyn AssetStore>,
    scanner: Arc<dyn NetworkScanner>,
    options: ScanOptions,
    scan_timeout: Duration,
    cycle_lock: Mutex<()>,
    state: watch::Sender<CycleState>,
    events: broadcast::Sender<DirectoryEvent>,
}

impl DiscoveryReconciler {
    pub fn new(store: Arc<dyn AssetStore>, scanner: Arc<dyn NetworkScanner>) -> Self {
        let (state, _) = watch::channel(CycleState::Idle);
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Self {
            store,
            scanner,
            options: ScanOptions::default(),
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            cycle_lock: Mutex::new(()),
            state,
            events,
        }
    }

    /// Bound each scan; a scan still running at the deadline fails the cycle.
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Options handed to the scanner on every cycle.
    pub fn with_scan_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    /// Resize the event buffer. Existing subscribers are disconnected.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        self.events = events;
        self
    }

    /// Receive events for every cycle started after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<DirectoryEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> CycleState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<CycleState> {
        self.state.subscribe()
    }

    /// Run one discovery cycle: scan, then upsert every host by MAC.
    ///
    /// A failed or timed-out scan returns [`DiscoverError::ScanFailed`] with
    /// the directory untouched. Per-host failures do not abort the cycle;
    /// they are listed in [`CycleReport::skipped`]. Dropping the future
    /// mid-scan leaves the directory untouched as well.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let _cycle = self.cycle_lock.lock().await;
        let _idle = IdleOnDrop(&self.state);

        let scan_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();

        self.state.send_replace(CycleState::Scanning);
        self.publish(EventPayload::ScanStarted { scan_id });

        let hosts = match tokio::time::timeout(self.scan_timeout, self.scanner.scan(self.options))
            .await
        {
            Ok(Ok(hosts)) => hosts,
            Ok(Err(e)) => return Err(self.fail(scan_id, e.to_string())),
            Err(_) => {
                return Err(self.fail(
                    scan_id,
                    format!("scan timed out after {:?}", self.scan_timeout),
                ))
            }
        };

        self.state.send_replace(CycleState::Reconciling);

        let mut report = CycleReport {
            scan_id,
            started_at,
            finished_at: started_at,
            hosts_seen: hosts.len(),
            created: Vec::new(),
            updated: Vec::new(),
            unchanged: Vec::new(),
            skipped: Vec::new(),
        };

        for host in &hosts {
            self.reconcile_host(host, &mut report);
        }

        report.finished_at = Utc::now();
        let duration_ms = start.elapsed().as_millis() as u64;

        self.publish(EventPayload::ScanCompleted {
            scan_id,
            hosts_seen: report.hosts_seen as u32,
            created: report.created.len() as u32,
            updated: report.updated.len() as u32,
            skipped: report.skipped.len() as u32,
            duration_ms,
        });

        tracing::info!(
            scan_id = %scan_id,
            hosts_seen = report.hosts_seen,
            created = report.created.len(),
            updated = report.updated.len(),
            unchanged = report.unchanged.len(),
            skipped = report.skipped.len(),
            duration_ms,
            "Discovery cycle complete"
        );

        Ok(report)
    }

    fn reconcile_host(&self, host: &DiscoveredHost, report: &mut CycleReport) {
        if host.normalized_mac().is_none() {
            let reason = match host.mac.as_deref().map(str::trim) {
                None | Some("") => "missing MAC address",
                Some(_) => "invalid MAC address",
            };
            tracing::debug!(ip = %host.ip, mac = ?host.mac, reason, "Skipping host");
            report.skipped.push(SkippedHost {
                ip: host.ip.clone(),
                mac: host.mac.clone().filter(|m| !m.trim().is_empty()),
                reason: reason.to_string(),
            });
            return;
        }

        match self.store.upsert_discovered(host) {
            Ok(Upsert::Created(record)) => {
                tracing::info!(
                    asset_id = %record.id,
                    ip = %record.ip,
                    mac = %record.asset_type.label,
                    "New asset discovered"
                );
                self.publish(EventPayload::AssetDiscovered {
                    asset_id: record.id,
                    name: record.name.clone(),
                    ip: record.ip.clone(),
                    mac: record.asset_type.label.clone(),
                });
                report.created.push(record.id);
            }
            Ok(Upsert::Updated {
                record,
                changed_fields,
            }) => {
                tracing::info!(
                    asset_id = %record.id,
                    changed = ?changed_fields,
                    "Asset refreshed from scan"
                );
                report.updated.push(record.id);
                self.publish(EventPayload::AssetUpdated {
                    asset_id: record.id,
                    changed_fields,
                });
            }
            Ok(Upsert::Unchanged(record)) => report.unchanged.push(record.id),
            Err(e) => {
                tracing::warn!(ip = %host.ip, error = %e, "Failed to merge discovered host");
                report.skipped.push(SkippedHost {
                    ip: host.ip.clone(),
                    mac: host.mac.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    fn fail(&self, scan_id: Uuid, reason: String) -> DiscoverError {
        self.state.send_replace(CycleState::Failed);
        self.publish(EventPayload::ScanFailed {
            scan_id,
            reason: reason.clone(),
        });
        tracing::warn!(scan_id = %scan_id, reason = %reason, "Discovery scan failed");
        DiscoverError::ScanFailed { reason }
    }

    fn publish(&self, payload: EventPayload) {
        // No subscribers is the normal case.
        let _ = self.events.send(DirectoryEvent::new(payload));
    }
}

/// Returns the reconciler to `Idle` however the cycle ends, including when
/// the `run_cycle` future is dropped mid-scan.
struct IdleOnDrop<'a>(&'a watch::Sender<CycleState>);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.0.send_replace(CycleState::Idle);
    }
}
