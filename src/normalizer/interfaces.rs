//! Interface model built from structured `show interfaces` output.

use crate::core::connector::ConnectParams;
use crate::domain::model::{Command, ParseMode};
use crate::normalizer::base::{first_with_result, opt_int, opt_string, ResourceModel};
use crate::normalizer::influx::InfluxMetric;
use crate::normalizer::NormalizeError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::net::IpAddr;

fn intf_error(message: String) -> NormalizeError {
    NormalizeError::Interfaces(message)
}

/// Converts a MAC address to lower-case colon notation.
///
/// Accepts `0x`-prefixed integers, `aabb.ccdd.eeff`, `aa-bb-cc-dd-ee-ff`,
/// `aa:bb:cc:dd:ee:ff` and bare `aabbccddeeff`.
pub fn mac_converter(address: &str) -> Result<String, NormalizeError> {
    let invalid = || intf_error(format!("invalid MAC address '{}'", address));
    let trimmed = address.trim();

    let value = if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).map_err(|_| invalid())?
    } else {
        let groups: Vec<&str> = trimmed.split(['.', ':', '-']).collect();
        let valid_layout = match groups.len() {
            1 => groups[0].len() == 12,
            3 => groups.iter().all(|g| g.len() == 4),
            6 => groups.iter().all(|g| (1..=2).contains(&g.len())),
            _ => false,
        };
        if !valid_layout {
            return Err(invalid());
        }
        let hex: String = if groups.len() == 6 {
            groups.iter().map(|g| format!("{:0>2}", g)).collect()
        } else {
            groups.concat()
        };
        u64::from_str_radix(&hex, 16).map_err(|_| invalid())?
    };

    if value > 0xffff_ffff_ffff {
        return Err(invalid());
    }

    let bytes = value.to_be_bytes();
    Ok(bytes[2..]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortChannel {
    pub port_channel_member: bool,
    /// 其他未建模的屬性，例如成員介面
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IpRole {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceIP {
    pub address: IpAddr,
    pub prefix_length: u8,
    pub role: Option<IpRole>,
}

impl InterfaceIP {
    /// 解析 `address/prefix` 形式的位址
    pub fn parse(raw: &str, role: Option<IpRole>) -> Result<Self, NormalizeError> {
        let invalid = || intf_error(format!("invalid interface address '{}'", raw));
        let (address, prefix) = raw.split_once('/').ok_or_else(invalid)?;
        let address: IpAddr = address.parse().map_err(|_| invalid())?;
        let prefix_length: u8 = prefix.parse().map_err(|_| invalid())?;
        let max = if address.is_ipv4() { 32 } else { 128 };
        if prefix_length > max {
            return Err(invalid());
        }
        Ok(Self {
            address,
            prefix_length,
            role,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InterfaceCounters {
    pub in_pkts: Option<i64>,
    pub in_octets: Option<i64>,
    pub in_multicast_pkts: Option<i64>,
    pub in_broadcast_pkts: Option<i64>,
    pub in_runts: Option<i64>,
    pub in_giants: Option<i64>,
    pub in_throttles: Option<i64>,
    pub in_errors: Option<i64>,
    pub in_crc_errors: Option<i64>,
    pub out_pkts: Option<i64>,
    pub out_octets: Option<i64>,
    pub out_multicast_pkts: Option<i64>,
    pub out_broadcast_pkts: Option<i64>,
    pub out_errors: Option<i64>,
    pub out_collision: Option<i64>,
    pub out_unknown_protocl_drops: Option<i64>,
    pub out_late_collision: Option<i64>,
    pub out_deferred: Option<i64>,
    pub out_lost_carrier: Option<i64>,
    pub out_no_carrier: Option<i64>,
}

impl InterfaceCounters {
    fn from_value(counters: &Value) -> Result<Self, NormalizeError> {
        let get = |key: &str| opt_int(counters.get(key), key).map_err(intf_error);
        Ok(Self {
            in_pkts: get("in_pkts")?,
            in_octets: get("in_octets")?,
            in_multicast_pkts: get("in_multicast_pkts")?,
            in_broadcast_pkts: get("in_broadcast_pkts")?,
            in_runts: get("in_runts")?,
            in_giants: get("in_giants")?,
            in_throttles: get("in_throttles")?,
            in_errors: get("in_errors")?,
            in_crc_errors: get("in_crc_errors")?,
            out_pkts: get("out_pkts")?,
            out_octets: get("out_octets")?,
            out_multicast_pkts: get("out_multicast_pkts")?,
            out_broadcast_pkts: get("out_broadcast_pkts")?,
            out_errors: get("out_errors")?,
            out_collision: get("out_collision")?,
            out_unknown_protocl_drops: get("out_unknown_protocl_drops")?,
            out_late_collision: get("out_late_collision")?,
            out_deferred: get("out_deferred")?,
            out_lost_carrier: get("out_lost_carrier")?,
            out_no_carrier: get("out_no_carrier")?,
        })
    }

    fn as_fields(&self) -> [(&'static str, Option<i64>); 20] {
        [
            ("in_pkts", self.in_pkts),
            ("in_octets", self.in_octets),
            ("in_multicast_pkts", self.in_multicast_pkts),
            ("in_broadcast_pkts", self.in_broadcast_pkts),
            ("in_runts", self.in_runts),
            ("in_giants", self.in_giants),
            ("in_throttles", self.in_throttles),
            ("in_errors", self.in_errors),
            ("in_crc_errors", self.in_crc_errors),
            ("out_pkts", self.out_pkts),
            ("out_octets", self.out_octets),
            ("out_multicast_pkts", self.out_multicast_pkts),
            ("out_broadcast_pkts", self.out_broadcast_pkts),
            ("out_errors", self.out_errors),
            ("out_collision", self.out_collision),
            ("out_unknown_protocl_drops", self.out_unknown_protocl_drops),
            ("out_late_collision", self.out_late_collision),
            ("out_deferred", self.out_deferred),
            ("out_lost_carrier", self.out_lost_carrier),
            ("out_no_carrier", self.out_no_carrier),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Up,
    Down,
}

impl LinkStatus {
    fn parse(raw: &str, field: &str) -> Result<Self, NormalizeError> {
        match raw.to_lowercase().as_str() {
            "up" => Ok(LinkStatus::Up),
            "down" => Ok(LinkStatus::Down),
            other => Err(intf_error(format!("{} must be up or down, got '{}'", field, other))),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            LinkStatus::Up => 1,
            LinkStatus::Down => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interface {
    pub name: String,
    pub enabled: bool,
    pub oper_status: LinkStatus,
    pub description: Option<String>,
    pub line_protocol: Option<LinkStatus>,
    pub port_channel: Option<PortChannel>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub mac_address: Option<String>,
    pub ipv4: Vec<InterfaceIP>,
    pub ipv6: Vec<InterfaceIP>,
    pub delay: Option<i64>,
    pub mtu: Option<i64>,
    pub bandwidth: Option<i64>,
    pub duplex_mode: Option<String>,
    pub port_speed: Option<String>,
    pub counters: Option<InterfaceCounters>,
}

impl ResourceModel for Interface {
    fn influx_metric(&self) -> InfluxMetric {
        let mut metric = InfluxMetric::new("interface")
            .tag("name", Some(self.name.as_str()))
            .tag("description", self.description.as_deref())
            .tag("type", self.kind.as_deref())
            .tag("mac_address", self.mac_address.as_deref())
            .field("enabled", Some(self.enabled))
            .field("oper_status", Some(self.oper_status.code()))
            .field("line_protocol", self.line_protocol.map(|s| s.code()))
            .field("mtu", self.mtu)
            .field("bandwidth", self.bandwidth)
            .field("delay", self.delay);

        if let Some(counters) = &self.counters {
            for (key, value) in counters.as_fields() {
                metric = metric.field(key, value);
            }
        }
        metric
    }
}

fn addresses(params: &Value, family: &str) -> Result<Vec<InterfaceIP>, NormalizeError> {
    let Some(entries) = params.get(family).and_then(Value::as_object) else {
        return Ok(Vec::new());
    };
    entries
        .iter()
        .map(|(address, details)| {
            let role = match details.get("role").and_then(Value::as_str) {
                Some("primary") => Some(IpRole::Primary),
                Some("secondary") => Some(IpRole::Secondary),
                _ => None,
            };
            InterfaceIP::parse(address, role)
        })
        .collect()
}

fn interface_from(name: &str, params: &Value) -> Result<Interface, NormalizeError> {
    let int = |key: &str| opt_int(params.get(key), key).map_err(intf_error);

    let enabled = params
        .get("enabled")
        .and_then(Value::as_bool)
        .ok_or_else(|| intf_error(format!("missing enabled for {}", name)))?;
    let oper_status = params
        .get("oper_status")
        .and_then(Value::as_str)
        .ok_or_else(|| intf_error(format!("missing oper_status for {}", name)))?;
    let line_protocol = params
        .get("line_protocol")
        .and_then(Value::as_str)
        .map(|raw| LinkStatus::parse(raw, "line_protocol"))
        .transpose()?;

    let port_channel = match params.get("port_channel").and_then(Value::as_object) {
        Some(pc) if !pc.is_empty() => {
            let mut extra = pc.clone();
            let member = extra
                .remove("port_channel_member")
                .and_then(|v| v.as_bool())
                .ok_or_else(|| intf_error(format!("missing port_channel_member for {}", name)))?;
            Some(PortChannel {
                port_channel_member: member,
                extra,
            })
        }
        _ => None,
    };

    let counters = match params.get("counters") {
        Some(c) if c.as_object().is_some_and(|m| !m.is_empty()) => {
            Some(InterfaceCounters::from_value(c)?)
        }
        _ => None,
    };

    let mac_address = opt_string(params.get("mac_address"))
        .map(|raw| mac_converter(&raw))
        .transpose()?;

    Ok(Interface {
        name: name.to_string(),
        enabled,
        oper_status: LinkStatus::parse(oper_status, "oper_status")?,
        description: opt_string(params.get("description")),
        line_protocol,
        port_channel,
        kind: opt_string(params.get("type")),
        mac_address,
        ipv4: addresses(params, "ipv4")?,
        ipv6: addresses(params, "ipv6")?,
        delay: int("delay")?,
        mtu: int("mtu")?,
        bandwidth: int("bandwidth")?,
        duplex_mode: opt_string(params.get("duplex_mode")),
        port_speed: opt_string(params.get("port_speed")),
        counters,
    })
}

/// Builds interfaces from structured `show interfaces` output.
pub fn cli_processor(
    commands: &[Command],
    _connector: &ConnectParams,
) -> Result<Vec<Interface>, NormalizeError> {
    let command = first_with_result(commands, NormalizeError::Interfaces)?;
    if command.params.parse != ParseMode::Structured {
        return Err(NormalizeError::NotImplemented(
            "Not yet implemented for other methods".to_string(),
        ));
    }

    let interfaces = command
        .result
        .as_ref()
        .and_then(Value::as_object)
        .ok_or_else(|| intf_error("expected interfaces keyed by name".to_string()))?;

    interfaces
        .iter()
        .map(|(name, params)| interface_from(name, params))
        .collect()
}
