//! BGP session model and its processors.

use crate::core::connector::ConnectParams;
use crate::domain::model::{Command, ParseMode};
use crate::normalizer::base::{first_with_result, opt_int, opt_string, ResourceModel};
use crate::normalizer::influx::InfluxMetric;
use crate::normalizer::NormalizeError;
use serde::Serialize;
use serde_json::Value;
use std::net::IpAddr;

/// BGP 狀態對應的數值
pub const SESSION_STATE_MAP: [(&str, i64); 6] = [
    ("idle", 1),
    ("connect", 2),
    ("active", 3),
    ("opensent", 4),
    ("openconfirm", 5),
    ("established", 6),
];

pub fn session_state_code(state: &str) -> Option<i64> {
    SESSION_STATE_MAP
        .iter()
        .find(|(name, _)| *name == state)
        .map(|(_, code)| *code)
}

/// Normalizes a neighbor type to `EXTERNAL` or `INTERNAL`.
///
/// ```
/// use netcollector::normalizer::bgp_sessions::bgp_type;
/// assert_eq!(bgp_type("external peer"), "EXTERNAL");
/// assert_eq!(bgp_type("iBGP"), "INTERNAL");
/// assert_eq!(bgp_type("confed"), "confed");
/// ```
pub fn bgp_type(raw_type: &str) -> String {
    let lowered = raw_type.to_lowercase();
    if lowered.contains("external") || lowered.contains("ebgp") {
        "EXTERNAL".to_string()
    } else if lowered.contains("internal") || lowered.contains("ibgp") {
        "INTERNAL".to_string()
    } else {
        raw_type.to_string()
    }
}

/// 去除 Junos 位址後面的 `+port`
pub fn strip_ip_address(raw_address: &str) -> &str {
    raw_address
        .split_once('+')
        .map(|(address, _)| address)
        .unwrap_or(raw_address)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BgpSession {
    pub local_address: Option<IpAddr>,
    pub neighbor_address: Option<IpAddr>,
    pub local_as: Option<i64>,
    pub peer_as: Option<i64>,
    pub peer_router_id: Option<IpAddr>,
    pub router_id: Option<IpAddr>,
    pub peer_type: Option<String>,
    pub routing_instance: String,
    pub peer_group: Option<String>,
    pub prefixes_denied: Option<i64>,
    pub prefixes_suppressed: Option<i64>,
    pub prefixes_received: Option<i64>,
    pub prefixes_received_pre_policy: Option<i64>,
    pub prefixes_sent: Option<i64>,
    pub prefixes_installed: Option<i64>,
    pub session_state: Option<String>,
    pub session_state_code: Option<i64>,
}

impl Default for BgpSession {
    fn default() -> Self {
        Self {
            local_address: None,
            neighbor_address: None,
            local_as: None,
            peer_as: None,
            peer_router_id: None,
            router_id: None,
            peer_type: None,
            routing_instance: "default".to_string(),
            peer_group: None,
            prefixes_denied: None,
            prefixes_suppressed: None,
            prefixes_received: None,
            prefixes_received_pre_policy: None,
            prefixes_sent: None,
            prefixes_installed: None,
            session_state: None,
            session_state_code: None,
        }
    }
}

impl BgpSession {
    fn with_state(mut self, raw_state: &str) -> Self {
        let state = raw_state.to_lowercase();
        self.session_state_code = session_state_code(&state);
        self.session_state = Some(state);
        self
    }
}

impl ResourceModel for BgpSession {
    fn influx_metric(&self) -> InfluxMetric {
        InfluxMetric::new("bgp")
            .tag("local_address", self.local_address)
            .tag("neighbor_address", self.neighbor_address)
            .tag("local_as", self.local_as)
            .tag("peer_as", self.peer_as)
            .tag("peer_router_id", self.peer_router_id)
            .tag("router_id", self.router_id)
            .tag("peer_type", self.peer_type.as_deref())
            .tag("routing_instance", Some(self.routing_instance.as_str()))
            .tag("peer_group", self.peer_group.as_deref())
            .field("prefixes_received", self.prefixes_received)
            .field("prefixes_received_pre_policy", self.prefixes_received_pre_policy)
            .field("prefixes_sent", self.prefixes_sent)
            .field("prefixes_installed", self.prefixes_installed)
            .field("session_state", self.session_state_code)
    }
}

fn bgp_error(message: String) -> NormalizeError {
    NormalizeError::BgpSession(message)
}

fn ip(raw: Option<&str>) -> Result<Option<IpAddr>, NormalizeError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(address) => strip_ip_address(address)
            .parse::<IpAddr>()
            .map(Some)
            .map_err(|_| bgp_error(format!("invalid IP address '{}'", address))),
    }
}

fn int(value: Option<&Value>, field: &str) -> Result<Option<i64>, NormalizeError> {
    opt_int(value, field).map_err(bgp_error)
}

fn from_tabular(result: &Value) -> Result<Vec<BgpSession>, NormalizeError> {
    let rows = result
        .as_array()
        .ok_or_else(|| bgp_error("expected a list of neighbors".to_string()))?;

    rows.iter()
        .map(|item| -> Result<BgpSession, NormalizeError> {
            let state = opt_string(item.get("bgp_state")).unwrap_or_default();
            Ok(BgpSession {
                local_address: ip(item.get("localhost_ip").and_then(Value::as_str))?,
                neighbor_address: ip(item.get("remote_ip").and_then(Value::as_str))?,
                peer_as: int(item.get("remote_as"), "remote_as")?,
                peer_router_id: ip(item.get("remote_router_id").and_then(Value::as_str))?,
                peer_group: opt_string(item.get("peer_group")),
                ..BgpSession::default()
            }
            .with_state(&state))
        })
        .collect()
}

fn from_structured(result: &Value) -> Result<Vec<BgpSession>, NormalizeError> {
    let mut sessions = Vec::new();
    let Some(vrfs) = result.get("vrf").and_then(Value::as_object) else {
        return Ok(sessions);
    };

    for (vrf_name, vrf) in vrfs {
        let Some(neighbors) = vrf.get("neighbor").and_then(Value::as_object) else {
            continue;
        };
        for (neighbor_ip, data) in neighbors {
            let state = data
                .get("session_state")
                .and_then(Value::as_str)
                .ok_or_else(|| bgp_error(format!("missing session_state for {}", neighbor_ip)))?;
            let counters = data.pointer("/address_family/ipv4 unicast/prefix_activity_counters");
            let counter = |path: &str| counters.and_then(|c| c.pointer(path));

            sessions.push(
                BgpSession {
                    local_address: ip(data
                        .pointer("/bgp_session_transport/transport/local_host")
                        .and_then(Value::as_str))?,
                    neighbor_address: ip(Some(neighbor_ip.as_str()))?,
                    peer_as: int(data.get("remote_as"), "remote_as")?,
                    peer_router_id: ip(data.get("remote_router_id").and_then(Value::as_str))?,
                    peer_group: opt_string(data.get("peer_group")),
                    routing_instance: vrf_name.clone(),
                    prefixes_received: int(counter("/received/prefixes_current"), "prefixes_received")?,
                    prefixes_sent: int(counter("/sent/prefixes_current"), "prefixes_sent")?,
                    prefixes_installed: int(counter("/received/used_as_bestpath"), "prefixes_installed")?,
                    ..BgpSession::default()
                }
                .with_state(state),
            );
        }
    }

    Ok(sessions)
}

/// Builds BGP sessions from parsed CLI output.
pub fn cli_processor(
    commands: &[Command],
    connector: &ConnectParams,
) -> Result<Vec<BgpSession>, NormalizeError> {
    let command = first_with_result(commands, NormalizeError::BgpSession)?;
    let result = command.result.as_ref().unwrap_or(&Value::Null);

    match connector.device_type.as_str() {
        "cisco_ios" | "cisco_xe" => match command.params.parse {
            ParseMode::Tabular => from_tabular(result),
            ParseMode::Structured => from_structured(result),
            ParseMode::Raw => Err(NormalizeError::NotImplemented(
                "CLI parser not implemented".to_string(),
            )),
        },
        _ => Err(NormalizeError::NotImplemented(
            "Not yet for other device types".to_string(),
        )),
    }
}

/// Builds BGP sessions from `NtcBgpTable` items.
pub fn netconf_processor(
    commands: &[Command],
    _connector: &ConnectParams,
) -> Result<Vec<BgpSession>, NormalizeError> {
    let command = first_with_result(commands, NormalizeError::BgpSession)?;
    if command.params.table.is_none() {
        return Err(NormalizeError::NotImplemented(
            "NETCONF parser not implemented".to_string(),
        ));
    }

    let items = command
        .result
        .as_ref()
        .and_then(Value::as_array)
        .ok_or_else(|| bgp_error("expected a list of table items".to_string()))?;

    items
        .iter()
        .map(|item| -> Result<BgpSession, NormalizeError> {
            let text = |key: &str| item.get(key).and_then(Value::as_str);

            let prefixes_received = int(item.get("prefixes_accepted"), "prefixes_accepted")?.unwrap_or(0);
            let prefixes_received_pre_policy =
                int(item.get("prefixes_received"), "prefixes_received")?.unwrap_or(0);

            Ok(BgpSession {
                local_address: ip(text("local_address"))?,
                neighbor_address: ip(text("peer_address"))?,
                local_as: int(item.get("local_as"), "local_as")?,
                peer_as: int(item.get("peer_as"), "peer_as")?,
                peer_router_id: ip(text("peer_id"))?,
                router_id: ip(text("local_id"))?,
                peer_type: text("peer_type").map(bgp_type),
                peer_group: opt_string(item.get("peer_group")),
                prefixes_received_pre_policy: Some(prefixes_received_pre_policy),
                prefixes_received: Some(prefixes_received),
                prefixes_denied: prefixes_received_pre_policy.checked_sub(prefixes_received),
                prefixes_installed: Some(int(item.get("prefixes_active"), "prefixes_active")?.unwrap_or(0)),
                prefixes_suppressed: Some(
                    int(item.get("prefixes_suppressed"), "prefixes_suppressed")?.unwrap_or(0),
                ),
                prefixes_sent: Some(int(item.get("prefixes_advertised"), "prefixes_advertised")?.unwrap_or(0)),
                ..BgpSession::default()
            }
            .with_state(text("peer_state").unwrap_or_default()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::connector::create_connector_with_env;
    use crate::domain::model::{CommandParams, Executor};
    use serde_json::json;

    fn connector(device_type: &str) -> ConnectParams {
        let env = |_: &str| -> Option<String> { None };
        create_connector_with_env("10.0.0.1", device_type, false, Some("admin"), Some("pw"), &env)
            .unwrap()
    }

    fn command(executor: Executor, params: CommandParams, result: Value) -> Command {
        Command {
            executor,
            collector: "bgp_session".to_string(),
            command: "show bgp all neighbor".to_string(),
            params,
            result: Some(result),
        }
    }

    #[test]
    fn test_helpers() {
        assert_eq!(strip_ip_address("192.168.7.7+179"), "192.168.7.7");
        assert_eq!(strip_ip_address("192.168.4.4"), "192.168.4.4");
        assert_eq!(bgp_type("External"), "EXTERNAL");
        assert_eq!(bgp_type("Internal"), "INTERNAL");
        assert_eq!(session_state_code("established"), Some(6));
        assert_eq!(session_state_code("Established"), None);
    }

    #[test]
    fn test_cli_tabular() {
        let result = json!([{
            "remote_ip": "10.0.0.2",
            "remote_as": "65002",
            "remote_router_id": "10.255.0.2",
            "localhost_ip": "10.0.0.1",
            "bgp_state": "Established",
            "peer_group": "",
            "vrf": "default",
        }]);
        let sessions = cli_processor(
            &[command(Executor::Cli, CommandParams::tabular(), result)],
            &connector("cisco_ios"),
        )
        .unwrap();

        assert_eq!(sessions.len(), 1);
        let session = &sessions[0];
        assert_eq!(session.peer_as, Some(65002));
        assert_eq!(session.peer_router_id, Some("10.255.0.2".parse().unwrap()));
        assert_eq!(session.session_state.as_deref(), Some("established"));
        assert_eq!(session.session_state_code, Some(6));
        assert_eq!(session.peer_group, None);
        assert_eq!(session.routing_instance, "default");
    }

    #[test]
    fn test_cli_structured() {
        let result = json!({"vrf": {"CUST-A": {"neighbor": {"10.1.0.2": {
            "remote_as": 65010,
            "remote_router_id": "10.255.1.2",
            "session_state": "Idle",
            "bgp_session_transport": {"transport": {"local_host": "10.1.0.1"}},
            "address_family": {"ipv4 unicast": {"prefix_activity_counters": {
                "sent": {"prefixes_current": 4},
                "received": {"prefixes_current": 7, "used_as_bestpath": 5}
            }}}
        }}}}});
        let sessions = cli_processor(
            &[command(Executor::Cli, CommandParams::structured(), result)],
            &connector("cisco_xe"),
        )
        .unwrap();

        let session = &sessions[0];
        assert_eq!(session.routing_instance, "CUST-A");
        assert_eq!(session.neighbor_address, Some("10.1.0.2".parse().unwrap()));
        assert_eq!(session.local_address, Some("10.1.0.1".parse().unwrap()));
        assert_eq!(session.prefixes_received, Some(7));
        assert_eq!(session.prefixes_sent, Some(4));
        assert_eq!(session.prefixes_installed, Some(5));
        assert_eq!(session.session_state_code, Some(1));
    }

    #[test]
    fn test_cli_other_device_type() {
        let err = cli_processor(
            &[command(Executor::Cli, CommandParams::tabular(), json!([{"remote_ip": "1.1.1.1"}]))],
            &connector("cisco_asa"),
        )
        .unwrap_err();
        assert!(matches!(err, NormalizeError::NotImplemented(_)));
    }

    #[test]
    fn test_netconf_table_items() {
        let result = json!([{
            "key": "10.0.0.2+179",
            "local_address": "10.0.0.1+54321",
            "peer_address": "10.0.0.2+179",
            "local_as": "65001",
            "peer_as": "65002",
            "peer_id": "10.255.0.2",
            "local_id": "10.255.0.1",
            "peer_type": "External",
            "peer_state": "Established",
            "prefixes_received": "12",
            "prefixes_accepted": "10",
            "prefixes_active": "5",
            "prefixes_suppressed": null,
            "prefixes_advertised": "3"
        }]);
        let sessions = netconf_processor(
            &[command(Executor::Netconf, CommandParams::table("NtcBgpTable"), result)],
            &connector("juniper_junos"),
        )
        .unwrap();

        let session = &sessions[0];
        assert_eq!(session.local_address, Some("10.0.0.1".parse().unwrap()));
        assert_eq!(session.neighbor_address, Some("10.0.0.2".parse().unwrap()));
        assert_eq!(session.peer_type.as_deref(), Some("EXTERNAL"));
        assert_eq!(session.prefixes_received, Some(10));
        assert_eq!(session.prefixes_received_pre_policy, Some(12));
        assert_eq!(session.prefixes_denied, Some(2));
        assert_eq!(session.prefixes_suppressed, Some(0));
        assert_eq!(session.prefixes_sent, Some(3));

        assert_eq!(
            session.influx_metric().to_line_protocol(),
            "bgp,local_address=10.0.0.1,neighbor_address=10.0.0.2,local_as=65001,peer_as=65002,\
             peer_router_id=10.255.0.2,router_id=10.255.0.1,peer_type=EXTERNAL,routing_instance=default \
             prefixes_received=10i,prefixes_received_pre_policy=12i,prefixes_sent=3i,prefixes_installed=5i,session_state=6i"
        );
    }

    #[test]
    fn test_netconf_denied_overflow_is_none() {
        let result = json!([{
            "peer_address": "10.0.0.2+179",
            "peer_state": "Established",
            "prefixes_received": "1",
            "prefixes_accepted": "-9223372036854775808"
        }]);
        let sessions = netconf_processor(
            &[command(Executor::Netconf, CommandParams::table("NtcBgpTable"), result)],
            &connector("juniper_junos"),
        )
        .unwrap();

        assert_eq!(sessions[0].prefixes_received_pre_policy, Some(1));
        assert_eq!(sessions[0].prefixes_denied, None);
    }

    #[test]
    fn test_netconf_requires_table() {
        let err = netconf_processor(
            &[command(Executor::Netconf, CommandParams::default(), json!("<rpc-reply/>"))],
            &connector("juniper_junos"),
        )
        .unwrap_err();
        assert_eq!(
            err,
            NormalizeError::NotImplemented("NETCONF parser not implemented".to_string())
        );
    }

    #[test]
    fn test_invalid_address() {
        let result = json!([{"remote_ip": "not-an-ip", "bgp_state": "Idle"}]);
        let err = cli_processor(
            &[command(Executor::Cli, CommandParams::tabular(), result)],
            &connector("cisco_ios"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("not-an-ip"));
    }
}
