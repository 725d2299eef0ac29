//! blokhouse-discover: Network discovery for the Blokhouse asset directory.
//!
//! Wraps an nmap ping sweep, merges each live host into the directory by MAC
//! address, and schedules those discovery cycles.

pub mod config;
pub mod error;
pub mod nmap_xml;
pub mod reconcile;
pub mod scanner;
pub mod scheduler;

pub use error::DiscoverError;
pub use reconcile::{CycleReport, CycleState, DiscoveryReconciler};
pub use scanner::{NetworkScanner, NmapScanner, ScanOptions};
