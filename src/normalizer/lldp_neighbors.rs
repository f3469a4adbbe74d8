//! LLDP neighbor model.

use crate::core::connector::ConnectParams;
use crate::domain::model::{Command, ParseMode};
use crate::normalizer::base::{first_with_result, opt_string, ResourceModel};
use crate::normalizer::influx::InfluxMetric;
use crate::normalizer::NormalizeError;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LldpNeighbor {
    pub interface: String,
    pub local_parent_interface: Option<String>,
    pub remote_type: Option<String>,
    pub remote_chassis_id: Option<String>,
    pub remote_port_desc: Option<String>,
    pub remote_interface: Option<String>,
    pub remote_system_name: Option<String>,
}

impl ResourceModel for LldpNeighbor {
    // remote_interface 作為唯一的 field，確保 field set 不為空
    fn influx_metric(&self) -> InfluxMetric {
        InfluxMetric::new("lldp_neighbors")
            .tag("interface", Some(self.interface.as_str()))
            .tag("local_parent_interface", self.local_parent_interface.as_deref())
            .tag("remote_type", self.remote_type.as_deref())
            .tag("remote_chassis_id", self.remote_chassis_id.as_deref())
            .tag("remote_port_desc", self.remote_port_desc.as_deref())
            .tag("remote_system_name", self.remote_system_name.as_deref())
            .field(
                "remote_interface",
                Some(self.remote_interface.as_deref().unwrap_or_default()),
            )
    }
}

fn lldp_error(message: String) -> NormalizeError {
    NormalizeError::LldpNeighbor(message)
}

fn rows(command: &Command) -> Result<&Vec<Value>, NormalizeError> {
    command
        .result
        .as_ref()
        .and_then(Value::as_array)
        .ok_or_else(|| lldp_error("expected a list of neighbors".to_string()))
}

fn required(item: &Value, key: &str) -> Result<String, NormalizeError> {
    opt_string(item.get(key)).ok_or_else(|| lldp_error(format!("missing {} in neighbor entry", key)))
}

pub fn cli_processor(
    commands: &[Command],
    connector: &ConnectParams,
) -> Result<Vec<LldpNeighbor>, NormalizeError> {
    let command = first_with_result(commands, NormalizeError::LldpNeighbor)?;

    match connector.device_type.as_str() {
        "cisco_ios" | "cisco_xe" if command.params.parse == ParseMode::Tabular => rows(command)?
            .iter()
            .map(|item| -> Result<LldpNeighbor, NormalizeError> {
                Ok(LldpNeighbor {
                    interface: required(item, "local_interface")?,
                    remote_system_name: opt_string(item.get("neighbor")),
                    remote_interface: opt_string(item.get("neighbor_interface")),
                    ..LldpNeighbor::default()
                })
            })
            .collect(),
        "cisco_ios" | "cisco_xe" => Err(NormalizeError::NotImplemented(
            "CLI parser not implemented".to_string(),
        )),
        _ => Err(NormalizeError::NotImplemented(
            "Not yet for other device types".to_string(),
        )),
    }
}

/// Builds neighbors from `LLDPNeighborTable` items.
pub fn netconf_processor(
    commands: &[Command],
    _connector: &ConnectParams,
) -> Result<Vec<LldpNeighbor>, NormalizeError> {
    let command = first_with_result(commands, NormalizeError::LldpNeighbor)?;
    if command.params.table.is_none() {
        return Err(NormalizeError::NotImplemented(
            "NETCONF parser not implemented".to_string(),
        ));
    }

    rows(command)?
        .iter()
        .map(|item| -> Result<LldpNeighbor, NormalizeError> {
            Ok(LldpNeighbor {
                interface: required(item, "local_int")?,
                local_parent_interface: opt_string(item.get("local_parent")),
                remote_type: opt_string(item.get("remote_type")),
                remote_chassis_id: opt_string(item.get("remote_chassis_id")),
                remote_port_desc: opt_string(item.get("remote_port_desc")),
                remote_interface: opt_string(item.get("remote_port_id")),
                remote_system_name: opt_string(item.get("remote_sysname")),
            })
        })
        .collect()
}
