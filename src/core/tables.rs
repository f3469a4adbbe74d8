//! Junos table/view definitions.
//!
//! A table names the RPC to run, the repeated element that forms one item
//! and the view: a mapping from field name to an element path relative to
//! the item. Paths may list alternatives separated by `|`; the first one
//! present in the reply wins.

use crate::parsers::xml::XmlNode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

const CUSTOM_BGP: &str = include_str!("junos_tables/custom/bgp.toml");
const STOCK_BGP: &str = include_str!("junos_tables/stock/bgp.toml");
const STOCK_LLDP: &str = include_str!("junos_tables/stock/lldp.toml");

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Module {module} not found in custom nor stock tables")]
    ModuleNotFound { module: String },

    #[error("Table {table} for module {module} not found in custom nor stock tables")]
    TableNotFound { module: String, table: String },

    #[error("failed to import table module '{module}': {reason}")]
    Import { module: String, reason: String },

    #[error("failed to read table directory: {0}")]
    Io(#[from] std::io::Error),
}

/// RPC 參數：布林旗標為空元素，其餘為文字內容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcArg {
    Flag(bool),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    pub rpc: String,
    #[serde(default)]
    pub args: BTreeMap<String, RpcArg>,
    pub item: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub view: BTreeMap<String, String>,
}

/// One extracted table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableItem {
    pub key: Option<String>,
    pub fields: BTreeMap<String, Option<String>>,
}

impl TableItem {
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert(
            "key".to_string(),
            self.key.clone().map(Value::String).unwrap_or(Value::Null),
        );
        for (name, value) in &self.fields {
            map.insert(
                name.clone(),
                value.clone().map(Value::String).unwrap_or(Value::Null),
            );
        }
        Value::Object(map)
    }
}

fn first_text<'a>(node: &'a XmlNode, paths: &str) -> Option<&'a str> {
    paths
        .split('|')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .find_map(|path| node.text_at(path))
}

impl TableDef {
    /// `<rpc>` 內部的 XML 請求
    pub fn rpc_request(&self) -> String {
        if self.args.is_empty() {
            return format!("<{}/>", self.rpc);
        }

        let mut body = String::new();
        for (name, arg) in &self.args {
            match arg {
                RpcArg::Flag(true) => body.push_str(&format!("<{}/>", name)),
                RpcArg::Flag(false) => {}
                RpcArg::Text(text) => body.push_str(&format!(
                    "<{name}>{}</{name}>",
                    quick_xml::escape::escape(text.as_str())
                )),
            }
        }
        format!("<{rpc}>{body}</{rpc}>", rpc = self.rpc)
    }

    /// Extracts the table items from an RPC reply.
    ///
    /// The item path is resolved from the reply document, i.e. the first
    /// element inside `<rpc-reply>` when the reply is still wrapped.
    pub fn evaluate(&self, reply: &XmlNode) -> Vec<TableItem> {
        let document = if reply.name == "rpc-reply" {
            match reply.children.first() {
                Some(doc) => doc,
                None => return Vec::new(),
            }
        } else {
            reply
        };

        // item 可能直接是文件根元素本身
        let items = match self.item.split_once('/') {
            None if document.name == self.item => vec![document],
            _ => document.find_all(&self.item),
        };

        items
            .into_iter()
            .map(|item| TableItem {
                key: self
                    .key
                    .as_deref()
                    .and_then(|key| first_text(item, key))
                    .map(str::to_string),
                fields: self
                    .view
                    .iter()
                    .map(|(name, path)| (name.clone(), first_text(item, path).map(str::to_string)))
                    .collect(),
            })
            .collect()
    }
}

/// `<module> -> <table name> -> definition`
#[derive(Debug, Clone, Default)]
pub struct TableSet {
    modules: HashMap<String, HashMap<String, TableDef>>,
}

impl TableSet {
    pub fn add_module(&mut self, module: &str, source: &str) -> Result<(), TableError> {
        let tables: HashMap<String, TableDef> =
            toml::from_str(source).map_err(|e| TableError::Import {
                module: module.to_string(),
                reason: e.to_string(),
            })?;
        self.modules
            .entry(module.to_string())
            .or_default()
            .extend(tables);
        Ok(())
    }

    pub fn module(&self, module: &str) -> Option<&HashMap<String, TableDef>> {
        self.modules.get(module)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// 自訂 tables 優先，找不到再查內建的 stock tables
#[derive(Debug, Clone)]
pub struct TableRegistry {
    custom: TableSet,
    stock: TableSet,
}

impl TableRegistry {
    pub fn builtin() -> Result<Self, TableError> {
        let mut custom = TableSet::default();
        custom.add_module("bgp", CUSTOM_BGP)?;

        let mut stock = TableSet::default();
        stock.add_module("bgp", STOCK_BGP)?;
        stock.add_module("lldp", STOCK_LLDP)?;

        Ok(Self { custom, stock })
    }

    /// Adds every `<module>.toml` file of `dir` to the custom set.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize, TableError> {
        let mut loaded = 0;
        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            let Some(module) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let source = std::fs::read_to_string(&path)?;
            self.custom.add_module(module, &source)?;
            tracing::debug!("Loaded custom table module '{}' from {}", module, path.display());
            loaded += 1;
        }
        Ok(loaded)
    }

    pub fn lookup(&self, module: &str, table: &str) -> Result<&TableDef, TableError> {
        if let Some(def) = self.custom.module(module).and_then(|m| m.get(table)) {
            return Ok(def);
        }

        let stock = self
            .stock
            .module(module)
            .or_else(|| self.custom.module(module))
            .ok_or_else(|| TableError::ModuleNotFound {
                module: module.to_string(),
            })?;

        stock.get(table).ok_or_else(|| TableError::TableNotFound {
            module: module.to_string(),
            table: table.to_string(),
        })
    }
}

/// collector 名稱第一個 `_` 之前的部分，例如 `bgp_session` -> `bgp`
pub fn table_module(collector: &str) -> &str {
    collector.split('_').next().unwrap_or(collector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BGP_REPLY: &str = r#"<rpc-reply>
  <bgp-information>
    <bgp-peer>
      <peer-address>10.0.0.2+179</peer-address>
      <local-address>10.0.0.1+54321</local-address>
      <peer-as>65002</peer-as>
      <local-as>65001</local-as>
      <peer-type>External</peer-type>
      <peer-state>Established</peer-state>
      <peer-id>10.255.0.2</peer-id>
      <local-id>10.255.0.1</local-id>
      <bgp-rib>
        <name>inet.0</name>
        <active-prefix-count>5</active-prefix-count>
        <received-prefix-count>12</received-prefix-count>
        <accepted-prefix-count>10</accepted-prefix-count>
        <suppressed-prefix-count>0</suppressed-prefix-count>
        <advertised-prefix-count>3</advertised-prefix-count>
      </bgp-rib>
    </bgp-peer>
    <bgp-peer>
      <peer-address>10.0.0.3</peer-address>
      <peer-as>65003</peer-as>
      <peer-state>Active</peer-state>
    </bgp-peer>
  </bgp-information>
</rpc-reply>"#;

    #[test]
    fn test_lookup_prefers_custom_tables() {
        let registry = TableRegistry::builtin().unwrap();
        let table = registry.lookup("bgp", "NtcBgpTable").unwrap();
        assert_eq!(table.rpc, "get-bgp-neighbor-information");
        assert!(table.view.contains_key("prefixes_accepted"));

        let stock = registry.lookup("bgp", "BgpNeighborTable").unwrap();
        assert!(!stock.view.contains_key("prefixes_accepted"));

        let lldp = registry.lookup("lldp", "LLDPNeighborTable").unwrap();
        assert_eq!(lldp.item, "lldp-neighbor-information");
    }

    #[test]
    fn test_lookup_errors() {
        let registry = TableRegistry::builtin().unwrap();

        let err = registry.lookup("vpn", "VpnTable").unwrap_err();
        assert_eq!(err.to_string(), "Module vpn not found in custom nor stock tables");

        let err = registry.lookup("lldp", "MissingTable").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Table MissingTable for module lldp not found in custom nor stock tables"
        );
    }

    #[test]
    fn test_evaluate_bgp_table() {
        let registry = TableRegistry::builtin().unwrap();
        let table = registry.lookup("bgp", "NtcBgpTable").unwrap();
        let reply = XmlNode::parse(BGP_REPLY).unwrap();

        let items = table.evaluate(&reply);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].key.as_deref(), Some("10.0.0.2+179"));
        assert_eq!(items[0].fields["prefixes_accepted"].as_deref(), Some("10"));
        assert_eq!(items[0].fields["peer_type"].as_deref(), Some("External"));
        assert_eq!(items[1].fields["local_address"], None);

        let json = items[1].to_json();
        assert_eq!(json["peer_state"], "Active");
        assert!(json["prefixes_received"].is_null());
    }

    #[test]
    fn test_alternative_paths() {
        let registry = TableRegistry::builtin().unwrap();
        let table = registry.lookup("lldp", "LLDPNeighborTable").unwrap();
        let reply = XmlNode::parse(
            "<rpc-reply><lldp-neighbors-information>\
             <lldp-neighbor-information>\
             <lldp-local-port-id>ge-0/0/1</lldp-local-port-id>\
             <lldp-remote-system-name>sw1</lldp-remote-system-name>\
             </lldp-neighbor-information>\
             </lldp-neighbors-information></rpc-reply>",
        )
        .unwrap();

        let items = table.evaluate(&reply);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].fields["local_int"].as_deref(), Some("ge-0/0/1"));
        assert_eq!(items[0].key.as_deref(), Some("ge-0/0/1"));
    }

    #[test]
    fn test_rpc_request_with_args() {
        let mut table = TableRegistry::builtin()
            .unwrap()
            .lookup("bgp", "NtcBgpTable")
            .unwrap()
            .clone();
        assert_eq!(table.rpc_request(), "<get-bgp-neighbor-information/>");

        table.args.insert("instance".to_string(), RpcArg::Text("A&B".to_string()));
        table.args.insert("detail".to_string(), RpcArg::Flag(true));
        assert_eq!(
            table.rpc_request(),
            "<get-bgp-neighbor-information><detail/><instance>A&amp;B</instance></get-bgp-neighbor-information>"
        );
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("ospf.toml")).unwrap();
        writeln!(
            file,
            "[OspfNeighborTable]\nrpc = \"get-ospf-neighbor-information\"\nitem = \"ospf-neighbor\"\n\n[OspfNeighborTable.view]\nneighbor_id = \"neighbor-id\""
        )
        .unwrap();
        std::fs::write(dir.path().join("README.md"), "ignored").unwrap();

        let mut registry = TableRegistry::builtin().unwrap();
        assert_eq!(registry.load_dir(dir.path()).unwrap(), 1);
        assert!(registry.lookup("ospf", "OspfNeighborTable").is_ok());
    }

    #[test]
    fn test_invalid_module_is_import_error() {
        let mut set = TableSet::default();
        let err = set.add_module("broken", "[Table]\nitem = 1").unwrap_err();
        assert!(err.to_string().contains("'broken'"));
    }

    #[test]
    fn test_table_module() {
        assert_eq!(table_module("bgp_session"), "bgp");
        assert_eq!(table_module("lldp_neighbors"), "lldp");
        assert_eq!(table_module("interface"), "interface");
    }
}
