//! blokhouse-directory: the asset directory, sole source of truth for asset records.
//!
//! [`AssetStore`] is the capability every backend implements. The
//! in-memory [`AssetDirectory`] is the reference backend; [`FileDirectory`]
//! keeps the same contract and persists every mutation to a JSON file.
//! Both guard their record set with a single lock and expose an atomic
//! find-or-create-by-MAC for discovery.
//!
//! Snapshots of the directory can be exported for Ansible ([`inventory`]),
//! Puppet ([`puppet`]) and Chef ([`chef`]).

pub mod chef;
pub mod file;
pub mod inventory;
pub mod memory;
pub mod puppet;
pub mod store;

pub use file::FileDirectory;
pub use memory::AssetDirectory;
pub use store::{AssetStore, Upsert};
