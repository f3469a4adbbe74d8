//! Built-in parsers turning raw CLI output into JSON documents.
//!
//! `Tabular` output is a list of flat records, one per row of the device
//! table. `Structured` output is a nested document keyed by object identity
//! (interface name, VRF, neighbor address).

pub mod cisco_asa;
pub mod cisco_ios;
pub mod xml;

use crate::domain::model::ParseMode;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("no {mode:?} parser for '{command}' on {device_type}")]
    UnsupportedCommand {
        device_type: String,
        command: String,
        mode: ParseMode,
    },

    #[error("unexpected output for '{command}': {reason}")]
    Malformed { command: String, reason: String },

    #[error("invalid XML: {0}")]
    Xml(String),
}

fn normalize_command(command: &str) -> String {
    command.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// 依設備類型、指令與解析模式選擇 parser
pub fn parse_output(
    device_type: &str,
    command: &str,
    mode: ParseMode,
    output: &str,
) -> Result<Value, ParseError> {
    if mode == ParseMode::Raw {
        return Ok(Value::String(output.to_string()));
    }

    let normalized = normalize_command(command);
    let unsupported = || ParseError::UnsupportedCommand {
        device_type: device_type.to_string(),
        command: command.to_string(),
        mode,
    };

    match (device_type, normalized.as_str(), mode) {
        ("cisco_ios" | "cisco_xe", "show lldp neighbors", ParseMode::Tabular) => {
            Ok(cisco_ios::parse_lldp_neighbors(output))
        }
        (
            "cisco_ios" | "cisco_xe",
            "show bgp all neighbor" | "show bgp all neighbors" | "show ip bgp neighbors",
            _,
        ) => {
            let neighbors = cisco_ios::parse_bgp_neighbors(output);
            Ok(match mode {
                ParseMode::Tabular => cisco_ios::bgp_neighbors_tabular(&neighbors),
                _ => cisco_ios::bgp_neighbors_structured(&neighbors),
            })
        }
        ("cisco_ios" | "cisco_xe", "show interfaces", ParseMode::Structured) => {
            Ok(cisco_ios::parse_interfaces(output))
        }
        ("cisco_asa", "show vpn-sessiondb", ParseMode::Tabular) => {
            cisco_asa::parse_vpn_sessiondb(output).map_err(|reason| ParseError::Malformed {
                command: command.to_string(),
                reason,
            })
        }
        _ => Err(unsupported()),
    }
}
