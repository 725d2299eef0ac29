//! Configuration for blokhouse discovery.

use std::net::IpAddr;
use std::time::Duration;

use ipnet::IpNet;
use serde::Deserialize;

use crate::error::{DiscoverError, Result};
use crate::scanner::ScanOptions;

/// Top-level discover configuration.
///
/// Loaded from `blokhouse.toml` `[discover]` section or
/// `BLOKHOUSE_DISCOVER__` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverConfig {
    /// Path to the nmap binary (default: "nmap").
    #[serde(default = "default_nmap_path")]
    pub nmap_path: String,

    /// Networks to sweep, as CIDRs ("10.0.1.0/24") or single addresses.
    #[serde(default)]
    pub targets: Vec<String>,

    /// Seconds between scheduled discovery cycles.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Upper bound on a single scan before it is abandoned.
    #[serde(default = "default_scan_timeout")]
    pub scan_timeout_secs: u64,

    /// JSON file backing the directory. In-memory only when unset.
    #[serde(default)]
    pub store_path: Option<String>,

    /// Buffered events per subscriber before the slowest one starts lagging.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Reverse-resolve hostnames during the sweep.
    #[serde(default = "default_true")]
    pub resolve_hostnames: bool,

    /// Report MAC addresses. Hosts without one are never stored.
    #[serde(default = "default_true")]
    pub resolve_macs: bool,
}

impl DiscoverConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            resolve_hostnames: self.resolve_hostnames,
            resolve_macs: self.resolve_macs,
        }
    }

    /// Parse every configured target.
    pub fn parsed_targets(&self) -> Result<Vec<IpNet>> {
        self.targets.iter().map(|t| parse_target(t)).collect()
    }

    /// Reject settings that would make discovery misbehave at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.nmap_path.trim().is_empty() {
            return Err(DiscoverError::Config("nmap_path must not be empty".into()));
        }
        if self.interval_secs == 0 {
            return Err(DiscoverError::Config("interval_secs must be positive".into()));
        }
        if self.scan_timeout_secs == 0 {
            return Err(DiscoverError::Config(
                "scan_timeout_secs must be positive".into(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(DiscoverError::Config("event_capacity must be positive".into()));
        }
        self.parsed_targets().map(|_| ())
    }
}

/// Parse a scan target: a CIDR block or a bare address (treated as a /32 or /128).
pub fn parse_target(raw: &str) -> Result<IpNet> {
    let raw = raw.trim();
    if let Ok(net) = raw.parse::<IpNet>() {
        return Ok(net);
    }
    raw.parse::<IpAddr>()
        .map(IpNet::from)
        .map_err(|_| DiscoverError::Config(format!("invalid scan target: {raw:?}")))
}

fn default_nmap_path() -> String {
    "nmap".to_string()
}

fn default_interval() -> u64 {
    3600
}

fn default_scan_timeout() -> u64 {
    120
}

fn default_event_capacity() -> usize {
    256
}

fn default_true() -> bool {
    true
}

impl Default for DiscoverConfig {
    fn default() -> Self {
        Self {
            nmap_path: default_nmap_path(),
            targets: Vec::new(),
            interval_secs: default_interval(),
            scan_timeout_secs: default_scan_timeout(),
            store_path: None,
            event_capacity: default_event_capacity(),
            resolve_hostnames: true,
            resolve_macs: true,
        }
    }
}
