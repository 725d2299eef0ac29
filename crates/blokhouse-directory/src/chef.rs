//! Chef Infra export: `Chef::Node` objects and the `blokhouse` data bag.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use blokhouse_core::{AssetId, AssetRecord};

use crate::inventory::to_identifier;
use crate::store::AssetStore;

const DATA_BAG: &str = "blokhouse";

/// A `Chef::Node` as accepted by `knife node from file`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChefNode {
    pub name: String,
    pub chef_type: &'static str,
    pub json_class: &'static str,
    pub chef_environment: String,
    pub run_list: Vec<String>,
    pub automatic: AutomaticAttributes,
    pub normal: NormalAttributes,
    pub default: Map<String, Value>,
    #[serde(rename = "override")]
    pub override_attributes: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutomaticAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipaddress: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macaddress: Option<String>,
    pub hostname: String,
    pub fqdn: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalAttributes {
    pub blokhouse: BlokhouseAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlokhouseAttributes {
    pub id: AssetId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    pub managed: bool,
}

/// One item of the `blokhouse` data bag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataBagItem {
    pub id: String,
    pub blokhouse_id: AssetId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    pub chef_type: &'static str,
    pub data_bag: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataBag {
    pub name: &'static str,
    pub chef_type: &'static str,
    pub json_class: &'static str,
    pub items: Vec<DataBagItem>,
}

/// Every node, plus node names grouped by Chef environment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChefNodeList {
    pub total: usize,
    pub environments: BTreeMap<String, Vec<String>>,
    pub nodes: Vec<ChefNode>,
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Build the node object for one asset. The asset type, when set, names
/// both the environment and the single role in the run list.
pub fn build_chef_node(record: &AssetRecord) -> ChefNode {
    let type_name = record.asset_type.display_name();
    let (environment, role) = match type_name.as_deref().map(to_identifier) {
        Some(id) => (id.clone(), format!("role[{id}]")),
        None => ("_default".to_string(), "role[base]".to_string()),
    };

    ChefNode {
        name: record.name.clone(),
        chef_type: "node",
        json_class: "Chef::Node",
        chef_environment: environment,
        run_list: vec![role],
        automatic: AutomaticAttributes {
            ipaddress: non_empty(&record.ip),
            macaddress: record.mac().map(str::to_string),
            hostname: record.name.clone(),
            fqdn: record.name.clone(),
        },
        normal: NormalAttributes {
            blokhouse: BlokhouseAttributes {
                id: record.id,
                name: record.name.clone(),
                item_type: type_name,
                managed: true,
            },
        },
        default: Map::new(),
        override_attributes: Map::new(),
    }
}

/// Data bag item ids allow `[a-z0-9_-]`; every other run becomes one `-`
/// and leading or trailing dashes are dropped.
pub fn data_bag_item_id(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-' {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('-');
            in_run = true;
        }
    }
    out.trim_matches('-').to_string()
}

pub fn build_data_bag_item(record: &AssetRecord) -> DataBagItem {
    DataBagItem {
        id: data_bag_item_id(&record.name),
        blokhouse_id: record.id,
        name: record.name.clone(),
        ip_address: non_empty(&record.ip),
        mac_address: record.mac().map(str::to_string),
        item_type: record.asset_type.display_name(),
        chef_type: "data_bag_item",
        data_bag: DATA_BAG,
    }
}

fn sorted(mut records: Vec<AssetRecord>) -> Vec<AssetRecord> {
    records.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    records
}

pub fn build_data_bag(records: &[AssetRecord]) -> DataBag {
    DataBag {
        name: DATA_BAG,
        chef_type: "data_bag",
        json_class: "Chef::DataBag",
        items: sorted(records.to_vec()).iter().map(build_data_bag_item).collect(),
    }
}

pub fn build_chef_nodes(records: &[AssetRecord]) -> ChefNodeList {
    let nodes: Vec<ChefNode> = sorted(records.to_vec()).iter().map(build_chef_node).collect();

    let mut environments: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for node in &nodes {
        environments
            .entry(node.chef_environment.clone())
            .or_default()
            .push(node.name.clone());
    }

    ChefNodeList {
        total: nodes.len(),
        environments,
        nodes,
    }
}

pub fn export_chef_nodes(store: &dyn AssetStore) -> ChefNodeList {
    build_chef_nodes(&store.list())
}

pub fn export_data_bag(store: &dyn AssetStore) -> DataBag {
    build_data_bag(&store.list())
}
