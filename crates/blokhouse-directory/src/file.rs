//! File-backed asset directory.
//!
//! The whole directory is kept as one JSON document:
//! ```text
//! {
//!   "assets":  [ { "id": ..., "name": ..., "ip": ..., "asset_type": {...} } ],
//!   "retired": [ "<id>", ... ]
//! }
//! ```
//! Writes go to `<path>.tmp` and are renamed into place, so a crash mid-write
//! never leaves a truncated document behind.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use blokhouse_core::error::Result;
use blokhouse_core::{AssetId, AssetRecord, DiscoveredHost};

use crate::store::{AssetStore, Records, Upsert};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    assets: Vec<AssetRecord>,
    #[serde(default)]
    retired: Vec<AssetId>,
}

/// Durable asset directory persisted to a single JSON file.
///
/// Every mutation is applied to a copy of the record set, written to disk,
/// and only then made visible. If the write fails, neither the file nor
/// the in-memory state changes.
#[derive(Debug)]
pub struct FileDirectory {
    path: PathBuf,
    records: RwLock<Records>,
}

impl FileDirectory {
    /// Open the directory at `path`, loading existing records if the file exists.
    /// Creates parent directories as needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let records = if path.exists() {
            let json = fs::read_to_string(&path)?;
            let doc: StoreDocument = serde_json::from_str(&json)?;
            Records::from_parts(doc.assets, doc.retired)
        } else {
            Records::default()
        };

        tracing::debug!(
            path = %path.display(),
            assets = records.len(),
            "Asset directory loaded"
        );

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn commit<T>(&self, op: impl FnOnce(&mut Records) -> Result<T>) -> Result<T> {
        let mut guard = self.records.write();
        let mut next = guard.clone();
        let out = op(&mut next)?;
        self.persist(&next)?;
        *guard = next;
        Ok(out)
    }

    fn persist(&self, records: &Records) -> Result<()> {
        let mut retired: Vec<AssetId> = records.retired().copied().collect();
        retired.sort();
        let mut assets = records.list();
        assets.sort_by_key(|r| r.id);

        let json = serde_json::to_vec_pretty(&StoreDocument { assets, retired })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(
            path = %self.path.display(),
            assets = records.len(),
            "Asset directory saved"
        );
        Ok(())
    }
}

impl AssetStore for FileDirectory {
    fn create(&self, record: AssetRecord) -> Result<()> {
        self.commit(|records| records.create(record))
    }

    fn get(&self, id: AssetId) -> Result<AssetRecord> {
        self.records.read().get(id)
    }

    fn list(&self) -> Vec<AssetRecord> {
        self.records.read().list()
    }

    fn update(&self, record: AssetRecord) -> Result<()> {
        self.commit(|records| records.update(record))
    }

    fn delete(&self, id: AssetId) -> Result<()> {
        self.commit(|records| records.delete(id).map(|_| ()))
    }

    fn find_by_mac(&self, mac: &str) -> Option<AssetRecord> {
        self.records.read().find_by_mac(mac).cloned()
    }

    fn upsert_discovered(&self, host: &DiscoveredHost) -> Result<Upsert> {
        // Skip the write when the scan confirms what is already stored.
        let unchanged = {
            let records = self.records.read();
            host.normalized_mac()
                .and_then(|mac| records.find_by_mac(&mac))
                .filter(|r| r.ip == host.ip && r.name == host.hostname)
                .cloned()
        };
        if let Some(record) = unchanged {
            return Ok(Upsert::Unchanged(record));
        }
        self.commit(|records| records.upsert_discovered(host))
    }

    fn len(&self) -> usize {
        self.records.read().len()
    }
}
