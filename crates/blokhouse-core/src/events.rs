//! Event types emitted while the directory is being reconciled.
//!
//! Events are informational. Nothing in the directory depends on whether
//! anyone is listening.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::AssetId;

/// Unique identifier for an event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

/// An event describing a change to, or a scan against, the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryEvent {
    pub id: EventId,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl DirectoryEvent {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            id: EventId::new(),
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// The event payload, tagged by type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event_type")]
pub enum EventPayload {
    // ── Asset events ──────────────────────────────────────────
    /// A host with a previously unknown MAC was added to the directory.
    AssetDiscovered {
        asset_id: AssetId,
        name: String,
        ip: String,
        mac: String,
    },
    /// A known host was seen with a new IP or hostname.
    AssetUpdated {
        asset_id: AssetId,
        changed_fields: Vec<String>,
    },

    // ── Scan lifecycle events ─────────────────────────────────
    /// A discovery cycle started scanning.
    ScanStarted { scan_id: Uuid },
    /// A discovery cycle finished reconciling.
    ScanCompleted {
        scan_id: Uuid,
        hosts_seen: u32,
        created: u32,
        updated: u32,
        skipped: u32,
        duration_ms: u64,
    },
    /// A discovery cycle aborted before touching the directory.
    ScanFailed { scan_id: Uuid, reason: String },
}
