//! Network scanning: the collaborator contract the reconciler consumes and
//! the nmap ping-sweep implementation of it.
//!
//! Nmap runs as a child process via `tokio::process::Command`; its XML
//! output is parsed into [`DiscoveredHost`]s.

use std::time::Instant;

use async_trait::async_trait;
use ipnet::IpNet;
use tokio::process::Command;

use blokhouse_core::DiscoveredHost;

use crate::error::{DiscoverError, Result};
use crate::nmap_xml::{self, NmapRun};

/// What the scanner should try to resolve for each live host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub resolve_hostnames: bool,
    pub resolve_macs: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            resolve_hostnames: true,
            resolve_macs: true,
        }
    }
}

/// A source of live hosts on the network.
///
/// Implementations may be slow and may fail; callers bound them with a
/// timeout and never hold a directory lock across a call.
#[async_trait]
pub trait NetworkScanner: Send + Sync {
    async fn scan(&self, options: ScanOptions) -> Result<Vec<DiscoveredHost>>;
}

/// Wrapper around the nmap binary running a ping sweep (`-sn`).
pub struct NmapScanner {
    nmap_path: String,
    targets: Vec<IpNet>,
}

impl NmapScanner {
    pub fn new(nmap_path: &str, targets: Vec<IpNet>) -> Self {
        Self {
            nmap_path: nmap_path.to_string(),
            targets,
        }
    }

    /// Verify nmap is installed and accessible.
    pub async fn verify_installation(&self) -> Result<String> {
        let output = Command::new(&self.nmap_path)
            .arg("--version")
            .output()
            .await
            .map_err(|_| DiscoverError::NmapNotFound {
                path: self.nmap_path.clone(),
            })?;

        String::from_utf8(output.stdout).map_err(|e| DiscoverError::XmlParse(e.to_string()))
    }

    /// Command-line arguments for one sweep over every target.
    pub fn sweep_args(&self, options: ScanOptions) -> Vec<String> {
        let mut args = vec!["-sn".to_string()];
        if !options.resolve_hostnames {
            args.push("-n".to_string());
        }
        args.extend(["-oX", "-", "--noninteractive"].map(String::from));
        args.extend(self.targets.iter().map(|t| t.to_string()));
        args
    }
}

#[async_trait]
impl NetworkScanner for NmapScanner {
    /// Nmap writes XML to stdout. The child is killed if this future is
    /// dropped, so a timed-out or cancelled cycle does not leave it running.
    async fn scan(&self, options: ScanOptions) -> Result<Vec<DiscoveredHost>> {
        if self.targets.is_empty() {
            return Err(DiscoverError::Config("no scan targets configured".into()));
        }

        let start = Instant::now();
        let args = self.sweep_args(options);

        tracing::info!(
            targets = ?self.targets,
            resolve_hostnames = options.resolve_hostnames,
            resolve_macs = options.resolve_macs,
            "Starting nmap ping sweep"
        );

        let output = Command::new(&self.nmap_path)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| DiscoverError::NmapNotFound {
                path: format!("{}: {e}", self.nmap_path),
            })?;

        let duration = start.elapsed();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(DiscoverError::NmapFailed {
                code: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        let nmap_run = nmap_xml::parse_nmap_xml(&output.stdout)?;
        let hosts = discovered_hosts(&nmap_run, options);

        tracing::info!(
            hosts_up = hosts.len(),
            duration_ms = duration.as_millis(),
            "Nmap ping sweep complete"
        );

        Ok(hosts)
    }
}

/// Convert raw nmap output into discovered hosts, in nmap's order.
///
/// Down hosts and hosts without an address are dropped. MACs are discarded
/// when `resolve_macs` is off so callers get what they asked for regardless
/// of nmap's privileges.
pub fn discovered_hosts(nmap_run: &NmapRun, options: ScanOptions) -> Vec<DiscoveredHost> {
    nmap_run
        .hosts
        .iter()
        .filter(|h| h.is_up())
        .filter_map(|h| {
            let ip = h.ip()?;
            let hostname = h.hostname().filter(|_| options.resolve_hostnames);
            let mac = h.mac().filter(|_| options.resolve_macs);
            Some(DiscoveredHost::new(hostname, ip, mac))
        })
        .collect()
}
