//! In-memory asset directory, the reference backend.

use parking_lot::RwLock;

use blokhouse_core::error::Result;
use blokhouse_core::{AssetId, AssetRecord, DiscoveredHost};

use crate::store::{AssetStore, Records, Upsert};

/// In-memory asset directory.
///
/// One `RwLock` guards the whole record set. Readers share it, every
/// mutation (including the MAC upsert) takes it exclusively.
#[derive(Debug, Default)]
pub struct AssetDirectory {
    records: RwLock<Records>,
}

impl AssetDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AssetStore for AssetDirectory {
    fn create(&self, record: AssetRecord) -> Result<()> {
        self.records.write().create(record)
    }

    fn get(&self, id: AssetId) -> Result<AssetRecord> {
        self.records.read().get(id)
    }

    fn list(&self) -> Vec<AssetRecord> {
        self.records.read().list()
    }

    fn update(&self, record: AssetRecord) -> Result<()> {
        self.records.write().update(record)
    }

    fn delete(&self, id: AssetId) -> Result<()> {
        self.records.write().delete(id).map(|_| ())
    }

    fn find_by_mac(&self, mac: &str) -> Option<AssetRecord> {
        self.records.read().find_by_mac(mac).cloned()
    }

    fn upsert_discovered(&self, host: &DiscoveredHost) -> Result<Upsert> {
        self.records.write().upsert_discovered(host)
    }

    fn len(&self) -> usize {
        self.records.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blokhouse_core::{AssetType, DirectoryError};

    #[test]
    fn create_then_get_returns_equal_record() {
        let dir = AssetDirectory::new();
        let record = AssetRecord::new("test1", "10.0.0.1");
        dir.create(record.clone()).unwrap();
        assert_eq!(dir.get(record.id).unwrap(), record);
    }

    #[test]
    fn missing_id_is_not_found() {
        let dir = AssetDirectory::new();
        let id = AssetId::new();
        assert!(matches!(dir.get(id), Err(DirectoryError::NotFound(_))));
        assert!(matches!(dir.delete(id), Err(DirectoryError::NotFound(_))));
    }

    #[test]
    fn duplicate_create_leaves_original() {
        let dir = AssetDirectory::new();
        let original = AssetRecord::new("first", "10.0.0.1");
        dir.create(original.clone()).unwrap();

        let mut clash = AssetRecord::new("second", "10.0.0.2");
        clash.id = original.id;
        let err = dir.create(clash).unwrap_err();

        assert!(matches!(err, DirectoryError::DuplicateId(id) if id == original.id));
        assert_eq!(dir.get(original.id).unwrap(), original);
    }

    #[test]
    fn delete_removes_from_get_and_list() {
        let dir = AssetDirectory::new();
        let keep = AssetRecord::new("keep", "");
        let drop = AssetRecord::new("drop", "");
        dir.create(keep.clone()).unwrap();
        dir.create(drop.clone()).unwrap();

        dir.delete(drop.id).unwrap();

        assert!(matches!(dir.get(drop.id), Err(DirectoryError::NotFound(_))));
        let ids: Vec<_> = dir.list().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![keep.id]);
    }

    #[test]
    fn second_delete_is_an_error() {
        let dir = AssetDirectory::new();
        let record = AssetRecord::new("once", "");
        dir.create(record.clone()).unwrap();

        dir.delete(record.id).unwrap();
        assert!(matches!(
            dir.delete(record.id),
            Err(DirectoryError::NotFound(_))
        ));
    }

    #[test]
    fn list_is_a_detached_snapshot() {
        let dir = AssetDirectory::new();
        let record = AssetRecord::new("a", "10.0.0.1");
        dir.create(record.clone()).unwrap();

        let snapshot = dir.list();
        dir.delete(record.id).unwrap();
        dir.create(AssetRecord::new("b", "10.0.0.2")).unwrap();

        assert_eq!(snapshot, vec![record]);
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn update_requires_existing_record() {
        let dir = AssetDirectory::new();
        let mut record = AssetRecord::new("switch", "10.0.0.3");
        assert!(matches!(
            dir.update(record.clone()),
            Err(DirectoryError::NotFound(_))
        ));

        dir.create(record.clone()).unwrap();
        record.asset_type = AssetType {
            id: 3,
            label: "switch".to_string(),
        };
        dir.update(record.clone()).unwrap();
        assert_eq!(dir.get(record.id).unwrap(), record);
    }

    #[test]
    fn find_by_mac_ignores_case() {
        let dir = AssetDirectory::new();
        let host = DiscoveredHost::new(Some("nas1"), "10.0.0.5", Some("AA:BB:CC:DD:EE:FF"));
        let created = dir.upsert_discovered(&host).unwrap();

        let found = dir.find_by_mac("aa:bb:cc:dd:ee:ff").unwrap();
        assert_eq!(&found, created.record());
        assert!(dir.find_by_mac("00:11:22:33:44:55").is_none());
    }
}
