//! Puppet external node classifier (ENC) export.
//!
//! Puppet runs the classifier with a node name and reads back a YAML
//! document:
//! ```text
//! ---
//! classes:
//!   <class>: null
//! parameters:
//!   blokhouse_id: ...
//! environment: <env>
//! ```
//! Nodes unknown to the directory get a minimal `base` classification.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use blokhouse_core::AssetRecord;

use crate::inventory::{find_node, to_identifier};
use crate::store::AssetStore;

const BASE_CLASS: &str = "base";
const DEFAULT_ENVIRONMENT: &str = "production";

/// One ENC document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PuppetNode {
    pub classes: BTreeMap<String, ()>,
    pub parameters: Mapping,
    pub environment: String,
}

impl PuppetNode {
    /// Render as the YAML Puppet expects on the classifier's stdout.
    pub fn to_yaml(&self) -> serde_yaml::Result<String> {
        Ok(format!("---\n{}", serde_yaml::to_string(self)?))
    }
}

/// Classify a known asset. The asset type, when set, names both the class
/// and the environment.
pub fn build_enc(record: &AssetRecord) -> PuppetNode {
    let type_name = record.asset_type.display_name();
    let class = type_name
        .as_deref()
        .map(to_identifier)
        .unwrap_or_else(|| BASE_CLASS.to_string());
    let environment = type_name
        .as_deref()
        .map(to_identifier)
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

    let mut parameters = Mapping::new();
    parameters.insert("blokhouse_id".into(), record.id.to_string().into());
    parameters.insert("blokhouse_name".into(), record.name.clone().into());
    if !record.ip.is_empty() {
        parameters.insert("ip_address".into(), record.ip.clone().into());
    }
    if let Some(mac) = record.mac() {
        parameters.insert("mac_address".into(), mac.into());
    }
    if let Some(name) = type_name {
        parameters.insert("item_type".into(), name.into());
    }
    parameters.insert("managed_by".into(), "blokhouse".into());

    PuppetNode {
        classes: BTreeMap::from([(class, ())]),
        parameters,
        environment,
    }
}

/// Classification for a node the directory does not know.
pub fn default_enc() -> PuppetNode {
    let mut parameters = Mapping::new();
    parameters.insert("blokhouse_managed".into(), Value::Bool(false));

    PuppetNode {
        classes: BTreeMap::from([(BASE_CLASS.to_string(), ())]),
        parameters,
        environment: DEFAULT_ENVIRONMENT.to_string(),
    }
}

/// ENC for `node` (an asset name or IP) against the current store contents.
pub fn export_puppet_enc(store: &dyn AssetStore, node: &str) -> PuppetNode {
    let records = store.list();
    match find_node(&records, node) {
        Some(record) => build_enc(record),
        None => {
            tracing::debug!(node, "Unknown Puppet node, using default classification");
            default_enc()
        }
    }
}
