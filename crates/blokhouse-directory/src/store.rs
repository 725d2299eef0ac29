//! Asset storage: the capability trait every backend implements, plus the
//! record set the backends share.
//!
//! All decisions about ids, MAC matching and upserts live on [`Records`].
//! A backend only decides how the record set is guarded and where it is kept.

use std::collections::{HashMap, HashSet};

use blokhouse_core::error::{DirectoryError, Result};
use blokhouse_core::{normalize_mac, AssetId, AssetRecord, DiscoveredHost};

/// Trait for asset directory backends.
///
/// Every method is atomic with respect to every other method on the same
/// instance. None of them performs network I/O.
pub trait AssetStore: Send + Sync {
    /// Insert a record. Fails with `DuplicateId` if the id is in use or was
    /// used by a record that has since been deleted.
    fn create(&self, record: AssetRecord) -> Result<()>;

    /// Fetch a record by id.
    fn get(&self, id: AssetId) -> Result<AssetRecord>;

    /// Snapshot of every record, in no particular order.
    fn list(&self) -> Vec<AssetRecord>;

    /// Replace the mutable fields of an existing record.
    fn update(&self, record: AssetRecord) -> Result<()>;

    /// Remove a record. Deleting an absent id is `NotFound`.
    fn delete(&self, id: AssetId) -> Result<()>;

    /// The record whose type label names this MAC, if any.
    fn find_by_mac(&self, mac: &str) -> Option<AssetRecord>;

    /// Find-or-create by MAC as a single atomic step.
    fn upsert_discovered(&self, host: &DiscoveredHost) -> Result<Upsert>;

    fn len(&self) -> usize {
        self.list().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome of merging one discovered host into the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upsert {
    /// No record had this MAC; a new one was created.
    Created(AssetRecord),
    /// The existing record's IP or name was refreshed.
    Updated {
        record: AssetRecord,
        changed_fields: Vec<String>,
    },
    /// The existing record already matched the scan.
    Unchanged(AssetRecord),
}

impl Upsert {
    pub fn record(&self) -> &AssetRecord {
        match self {
            Self::Created(record) | Self::Unchanged(record) => record,
            Self::Updated { record, .. } => record,
        }
    }
}

/// The live record set plus every id ever deleted from it.
#[derive(Debug, Clone, Default)]
pub(crate) struct Records {
    assets: HashMap<AssetId, AssetRecord>,
    retired: HashSet<AssetId>,
}

impl Records {
    pub(crate) fn from_parts(
        assets: impl IntoIterator<Item = AssetRecord>,
        retired: impl IntoIterator<Item = AssetId>,
    ) -> Self {
        Self {
            assets: assets.into_iter().map(|r| (r.id, r)).collect(),
            retired: retired.into_iter().collect(),
        }
    }

    pub(crate) fn retired(&self) -> impl Iterator<Item = &AssetId> {
        self.retired.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.assets.len()
    }

    pub(crate) fn create(&mut self, record: AssetRecord) -> Result<()> {
        if self.assets.contains_key(&record.id) || self.retired.contains(&record.id) {
            return Err(DirectoryError::DuplicateId(record.id));
        }
        self.assets.insert(record.id, record);
        Ok(())
    }

    pub(crate) fn get(&self, id: AssetId) -> Result<AssetRecord> {
        self.assets
            .get(&id)
            .cloned()
            .ok_or(DirectoryError::NotFound(id))
    }

    pub(crate) fn list(&self) -> Vec<AssetRecord> {
        self.assets.values().cloned().collect()
    }

    pub(crate) fn update(&mut self, record: AssetRecord) -> Result<()> {
        let existing = self
            .assets
            .get_mut(&record.id)
            .ok_or(DirectoryError::NotFound(record.id))?;
        *existing = record;
        Ok(())
    }

    pub(crate) fn delete(&mut self, id: AssetId) -> Result<AssetRecord> {
        let removed = self.assets.remove(&id).ok_or(DirectoryError::NotFound(id))?;
        self.retired.insert(id);
        Ok(removed)
    }

    /// Lowest id wins when more than one record carries the MAC, so the
    /// answer does not depend on map iteration order. A MAC that does not
    /// normalise matches nothing.
    pub(crate) fn find_by_mac(&self, mac: &str) -> Option<&AssetRecord> {
        let mac = normalize_mac(mac)?;
        self.assets
            .values()
            .filter(|r| r.matches_mac(&mac))
            .min_by_key(|r| r.id)
    }

    pub(crate) fn upsert_discovered(&mut self, host: &DiscoveredHost) -> Result<Upsert> {
        let mac = host.normalized_mac().ok_or_else(|| {
            DirectoryError::InvalidInput(format!("host {} has no usable MAC address", host.ip))
        })?;

        let Some(existing_id) = self.find_by_mac(&mac).map(|r| r.id) else {
            let mut record = AssetRecord::from_discovered(host).ok_or_else(|| {
                DirectoryError::InvalidInput(format!("host {} has no usable MAC address", host.ip))
            })?;
            while self.assets.contains_key(&record.id) || self.retired.contains(&record.id) {
                record.id = AssetId::new();
            }
            self.assets.insert(record.id, record.clone());
            return Ok(Upsert::Created(record));
        };

        let record = self
            .assets
            .get_mut(&existing_id)
            .ok_or(DirectoryError::NotFound(existing_id))?;

        let mut changed_fields = Vec::new();
        if record.ip != host.ip {
            record.ip = host.ip.clone();
            changed_fields.push("ip".to_string());
        }
        if record.name != host.hostname {
            record.name = host.hostname.clone();
            changed_fields.push("name".to_string());
        }

        if changed_fields.is_empty() {
            Ok(Upsert::Unchanged(record.clone()))
        } else {
            Ok(Upsert::Updated {
                record: record.clone(),
                changed_fields,
            })
        }
    }
}
