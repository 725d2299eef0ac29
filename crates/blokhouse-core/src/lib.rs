//! blokhouse-core: Shared types, errors, and events for the Blokhouse asset directory.
//!
//! This crate provides the foundational types used across all Blokhouse components:
//! - Asset records and their classification tags
//! - The transient host shape produced by network scans
//! - Event types describing discovery cycles
//! - The directory error taxonomy

pub mod error;
pub mod events;
pub mod types;

pub use error::DirectoryError;
pub use types::{normalize_mac, AssetId, AssetRecord, AssetType, DiscoveredHost};
