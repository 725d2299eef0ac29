//! Core domain types for the Blokhouse asset directory.
//!
//! `AssetRecord` is the only stored entity. `DiscoveredHost` is the transient
//! shape a network scan produces; it is merged into the directory and then
//! dropped.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DirectoryError;

// ── Identifiers ───────────────────────────────────────────────────

/// Unique identifier for an asset record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub Uuid);

impl AssetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AssetId {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| DirectoryError::InvalidInput(format!("asset id {s:?}: {e}")))
    }
}

// ── Asset Types ───────────────────────────────────────────────────

/// Classification tag attached to every asset.
///
/// For discovery-originated records `label` holds the MAC address and `id`
/// is [`AssetType::DISCOVERED`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetType {
    pub id: i64,
    pub label: String,
}

impl AssetType {
    /// Records created by hand with no classification.
    pub const UNCLASSIFIED: i64 = 0;
    /// Records created by the discovery reconciler.
    pub const DISCOVERED: i64 = 6;

    pub fn discovered(mac: impl Into<String>) -> Self {
        Self {
            id: Self::DISCOVERED,
            label: mac.into(),
        }
    }

    pub fn is_discovered(&self) -> bool {
        self.id == Self::DISCOVERED
    }

    /// Human-readable type name for configuration-management exports.
    /// Unclassified records have none.
    pub fn display_name(&self) -> Option<String> {
        match self.id {
            Self::UNCLASSIFIED => None,
            Self::DISCOVERED => Some("Discovered".to_string()),
            _ if !self.label.is_empty() => Some(self.label.clone()),
            other => Some(format!("Type {other}")),
        }
    }

    /// Inventory group this type belongs to.
    pub fn group_name(&self) -> String {
        match self.id {
            Self::UNCLASSIFIED => "ungrouped".to_string(),
            Self::DISCOVERED => "discovered".to_string(),
            other => format!("type_{other}"),
        }
    }
}

// ── Asset Records ─────────────────────────────────────────────────

/// A tracked network-attached asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetRecord {
    pub id: AssetId,
    pub name: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub asset_type: AssetType,
}

impl AssetRecord {
    /// A manually created, unclassified record with a fresh id.
    pub fn new(name: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            id: AssetId::new(),
            name: name.into(),
            ip: ip.into(),
            asset_type: AssetType::default(),
        }
    }

    /// Build a fresh record for a host seen on the network.
    ///
    /// Returns `None` when the host has no usable MAC, since such a record
    /// could never be matched again on rediscovery. The stored label is the
    /// canonical MAC form.
    pub fn from_discovered(host: &DiscoveredHost) -> Option<Self> {
        let mac = host.normalized_mac()?;
        Some(Self {
            id: AssetId::new(),
            name: host.hostname.clone(),
            ip: host.ip.clone(),
            asset_type: AssetType::discovered(mac),
        })
    }

    /// The MAC address, for discovery-originated records.
    pub fn mac(&self) -> Option<&str> {
        if self.asset_type.is_discovered() && !self.asset_type.label.is_empty() {
            Some(&self.asset_type.label)
        } else {
            None
        }
    }

    /// Whether this record's type label names the given MAC.
    ///
    /// Both sides are compared in canonical form. A MAC that does not
    /// normalise (empty included) never matches, so unlabelled manual
    /// records are never claimed by discovery.
    pub fn matches_mac(&self, mac: &str) -> bool {
        match (normalize_mac(mac), normalize_mac(&self.asset_type.label)) {
            (Some(wanted), Some(label)) => wanted == label,
            _ => false,
        }
    }
}

// ── Discovery ─────────────────────────────────────────────────────

/// A live host reported by a network scan. Never stored directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredHost {
    pub hostname: String,
    pub ip: String,
    pub mac: Option<String>,
}

impl DiscoveredHost {
    /// Normalises the MAC and falls back to the IP when no hostname resolved.
    pub fn new(hostname: Option<&str>, ip: impl Into<String>, mac: Option<&str>) -> Self {
        let ip = ip.into();
        let hostname = match hostname.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => ip.clone(),
        };
        Self {
            hostname,
            ip,
            mac: mac.and_then(normalize_mac),
        }
    }

    /// The MAC in canonical form, or `None` when it is absent or malformed.
    ///
    /// Fields are public, so a scanner may hand over a MAC that never went
    /// through [`DiscoveredHost::new`].
    pub fn normalized_mac(&self) -> Option<String> {
        self.mac.as_deref().and_then(normalize_mac)
    }
}

/// Canonical MAC form: six upper-case hex octets joined by `:`.
///
/// Accepts `:` or `-` separators. Anything else yields `None`.
pub fn normalize_mac(raw: &str) -> Option<String> {
    let octets: Vec<&str> = raw.trim().split([':', '-']).collect();
    let valid = octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()));
    valid.then(|| octets.join(":").to_ascii_uppercase())
}
