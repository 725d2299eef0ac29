//! Ansible dynamic inventory export.
//!
//! Produces the JSON document Ansible expects from an inventory script:
//! ```text
//! {
//!   "all":        { "hosts": [...], "vars": {} },
//!   "<group>":    { "hosts": [...], "vars": {} },
//!   "_meta":      { "hostvars": { "<name>": { "ansible_host": ..., "mac": ... } } }
//! }
//! ```
//! Only assets with an IP are included. Groups come from the asset type.
//!
//! Also holds the node lookup and identifier rules the Puppet and Chef
//! exports share.

use serde_json::{json, Map, Value};

use blokhouse_core::AssetRecord;

use crate::store::AssetStore;

/// Build an inventory document from a set of records.
pub fn build_ansible_inventory(records: &[AssetRecord]) -> Value {
    let mut addressable: Vec<&AssetRecord> = records.iter().filter(|r| !r.ip.is_empty()).collect();
    addressable.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

    let mut groups: Map<String, Value> = Map::new();
    let mut hostvars: Map<String, Value> = Map::new();
    let mut all_hosts = Vec::with_capacity(addressable.len());

    for record in addressable {
        all_hosts.push(Value::String(record.name.clone()));

        let mut vars = Map::new();
        vars.insert("ansible_host".to_string(), json!(record.ip));
        if let Some(mac) = record.mac() {
            vars.insert("mac".to_string(), json!(mac));
        }
        hostvars.insert(record.name.clone(), Value::Object(vars));

        let group = groups
            .entry(record.asset_type.group_name())
            .or_insert_with(|| json!({ "hosts": [], "vars": {} }));
        if let Some(hosts) = group.get_mut("hosts").and_then(Value::as_array_mut) {
            hosts.push(Value::String(record.name.clone()));
        }
    }

    let mut inventory = Map::new();
    inventory.insert("all".to_string(), json!({ "hosts": all_hosts, "vars": {} }));
    inventory.extend(groups);
    inventory.insert("_meta".to_string(), json!({ "hostvars": hostvars }));
    Value::Object(inventory)
}

/// Look a node up the way configuration-management tools name it: by
/// asset name or by IP. Ties go to the lowest id.
pub fn find_node<'a>(records: &'a [AssetRecord], node: &str) -> Option<&'a AssetRecord> {
    records
        .iter()
        .filter(|r| r.name == node || (!r.ip.is_empty() && r.ip == node))
        .min_by_key(|r| r.id)
}

/// Lower-case identifier safe for Puppet classes and environments and
/// Chef roles: every run of other characters becomes one `_`, with none
/// at either end.
pub fn to_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut separator = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if separator && !out.is_empty() {
                out.push('_');
            }
            separator = false;
            out.push(c);
        } else {
            separator = true;
        }
    }
    out
}

/// Build an inventory document from the current contents of a store.
pub fn export_ansible_inventory(store: &dyn AssetStore) -> Value {
    build_ansible_inventory(&store.list())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blokhouse_core::AssetType;

    fn record(name: &str, ip: &str, asset_type: AssetType) -> AssetRecord {
        AssetRecord {
            asset_type,
            ..AssetRecord::new(name, ip)
        }
    }

    #[test]
    fn hosts_without_ip_are_left_out() {
        let records = vec![
            record("web", "10.0.0.2", AssetType::default()),
            record("offline", "", AssetType::default()),
        ];
        let inv = build_ansible_inventory(&records);

        assert_eq!(inv["all"]["hosts"], json!(["web"]));
        assert!(inv["_meta"]["hostvars"].get("offline").is_none());
    }

    #[test]
    fn groups_follow_asset_type() {
        let records = vec![
            record("nas1", "10.0.0.5", AssetType::discovered("AA:BB:CC:DD:EE:FF")),
            record("web", "10.0.0.2", AssetType::default()),
            record("core-sw", "10.0.0.1", AssetType { id: 3, label: "switch".into() }),
        ];
        let inv = build_ansible_inventory(&records);

        assert_eq!(inv["all"]["hosts"], json!(["core-sw", "nas1", "web"]));
        assert_eq!(inv["discovered"]["hosts"], json!(["nas1"]));
        assert_eq!(inv["ungrouped"]["hosts"], json!(["web"]));
        assert_eq!(inv["type_3"]["hosts"], json!(["core-sw"]));
        assert_eq!(inv["type_3"]["vars"], json!({}));
    }

    #[test]
    fn hostvars_carry_address_and_mac() {
        let records = vec![
            record("nas1", "10.0.0.5", AssetType::discovered("AA:BB:CC:DD:EE:FF")),
            record("web", "10.0.0.2", AssetType::default()),
        ];
        let inv = build_ansible_inventory(&records);

        assert_eq!(
            inv["_meta"]["hostvars"]["nas1"],
            json!({ "ansible_host": "10.0.0.5", "mac": "AA:BB:CC:DD:EE:FF" })
        );
        assert_eq!(
            inv["_meta"]["hostvars"]["web"],
            json!({ "ansible_host": "10.0.0.2" })
        );
    }

    #[test]
    fn empty_directory_still_has_all_and_meta() {
        let inv = build_ansible_inventory(&[]);
        assert_eq!(inv["all"], json!({ "hosts": [], "vars": {} }));
        assert_eq!(inv["_meta"], json!({ "hostvars": {} }));
    }

    #[test]
    fn identifiers() {
        assert_eq!(to_identifier("WebServer"), "webserver");
        assert_eq!(to_identifier("web server"), "web_server");
        assert_eq!(to_identifier("DB-01 (primary)"), "db_01_primary");
        assert_eq!(to_identifier(" web "), "web");
        assert_eq!(to_identifier("a--b  c"), "a_b_c");
        assert_eq!(to_identifier("database"), "database");
    }

    #[test]
    fn find_node_by_name_or_ip() {
        let records = vec![
            record("web-01", "10.0.0.2", AssetType::default()),
            record("offline", "", AssetType::default()),
        ];

        assert_eq!(find_node(&records, "web-01").unwrap().ip, "10.0.0.2");
        assert_eq!(find_node(&records, "10.0.0.2").unwrap().name, "web-01");
        assert_eq!(find_node(&records, "offline").unwrap().name, "offline");
        assert!(find_node(&records, "").is_none());
        assert!(find_node(&records, "db-01").is_none());
    }
}
