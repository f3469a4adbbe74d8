//! Command planning: which driver and which commands serve a collector on a
//! given device type.

use crate::domain::model::{Command, CommandParams, Directive, Executor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommanderError {
    #[error("Unable to determine executor for: device_type='{device_type}', collector='{collector}'")]
    UnknownDirective {
        device_type: String,
        collector: String,
    },
}

/// `(device_type, collector)` 對應到執行方式
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutorMap {
    directives: HashMap<(String, String), Directive>,
}

impl ExecutorMap {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, device_type: &str, collector: &str, directive: Directive) {
        self.directives
            .insert((device_type.to_string(), collector.to_string()), directive);
    }

    pub fn get(&self, device_type: &str, collector: &str) -> Option<&Directive> {
        self.directives
            .get(&(device_type.to_string(), collector.to_string()))
    }

    /// 套用設定檔中的覆寫項目，同 key 直接取代
    pub fn extend(&mut self, overrides: impl IntoIterator<Item = DirectiveEntry>) {
        for entry in overrides {
            self.insert(
                &entry.device_type,
                &entry.collector,
                Directive {
                    executor: entry.executor,
                    commands: entry.commands,
                    params: entry.params,
                },
            );
        }
    }

    /// 某設備類型支援的 collectors，已排序
    pub fn collectors_for(&self, device_type: &str) -> Vec<&str> {
        let mut collectors: Vec<&str> = self
            .directives
            .keys()
            .filter(|(dt, _)| dt == device_type)
            .map(|(_, c)| c.as_str())
            .collect();
        collectors.sort_unstable();
        collectors
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}

fn cli(command: &str, params: CommandParams) -> Directive {
    Directive {
        executor: Executor::Cli,
        commands: vec![command.to_string()],
        params,
    }
}

fn netconf(rpc: &str, table: &str) -> Directive {
    Directive {
        executor: Executor::Netconf,
        commands: vec![rpc.to_string()],
        params: CommandParams::table(table),
    }
}

/// 預設的執行對照表
pub fn default_executor_map() -> ExecutorMap {
    let mut map = ExecutorMap::empty();
    map.insert(
        "cisco_asa",
        "vpn_session",
        cli("show vpn-sessiondb", CommandParams::tabular()),
    );
    map.insert(
        "cisco_ios",
        "bgp_session",
        cli("show bgp all neighbor", CommandParams::structured()),
    );
    map.insert(
        "cisco_ios",
        "lldp_neighbors",
        cli("show lldp neighbors", CommandParams::tabular()),
    );
    map.insert(
        "cisco_ios",
        "interface",
        cli("show interfaces", CommandParams::structured()),
    );
    map.insert(
        "cisco_xe",
        "bgp_session",
        cli("show ip bgp neighbors", CommandParams::structured()),
    );
    map.insert(
        "cisco_xe",
        "interface",
        cli("show interfaces", CommandParams::structured()),
    );
    map.insert(
        "juniper_junos",
        "bgp_session",
        netconf("get-bgp-neighbor-information", "NtcBgpTable"),
    );
    map.insert(
        "juniper_junos",
        "lldp_neighbors",
        netconf("get-lldp-neighbors-information", "LLDPNeighborTable"),
    );
    map
}

/// 設定檔中的 `[[directives]]` 項目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectiveEntry {
    pub device_type: String,
    pub collector: String,
    pub executor: Executor,
    pub commands: Vec<String>,
    #[serde(default)]
    pub params: CommandParams,
}

/// Builds the commands to run for `collectors` on a `device_type`.
///
/// Commands keep the collector order, then the directive's command order.
pub fn create_commands(
    device_type: &str,
    collectors: &[String],
    executor_map: &ExecutorMap,
) -> Result<Vec<Command>, CommanderError> {
    let mut commands = Vec::new();

    for collector in collectors {
        let directive = executor_map.get(device_type, collector).ok_or_else(|| {
            CommanderError::UnknownDirective {
                device_type: device_type.to_string(),
                collector: collector.to_string(),
            }
        })?;

        commands.extend(directive.commands.iter().map(|command| Command {
            executor: directive.executor,
            collector: collector.clone(),
            command: command.clone(),
            params: directive.params.clone(),
            result: None,
        }));
    }

    Ok(commands)
}
