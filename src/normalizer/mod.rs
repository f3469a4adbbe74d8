//! Turns parsed command results into typed resource models.

pub mod base;
pub mod bgp_sessions;
pub mod influx;
pub mod interfaces;
pub mod lldp_neighbors;
pub mod vpn_sessions;

use crate::core::connector::ConnectParams;
use crate::domain::model::{Command, Executor};
use base::ResourceModel;
use influx::InfluxMetric;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("BGP session error: {0}")]
    BgpSession(String),

    #[error("LLDP neighbor error: {0}")]
    LldpNeighbor(String),

    #[error("Interfaces error: {0}")]
    Interfaces(String),

    #[error("VPN sessions error: {0}")]
    VpnSessions(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("No normalizer for collector '{collector}' with executor '{executor}'")]
    UnknownCollector { collector: String, executor: Executor },

    #[error("Invalid line protocol: {0}")]
    LineProtocol(String),
}

/// 正規化後的單筆資源紀錄
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "model", content = "data", rename_all = "snake_case")]
pub enum Record {
    BgpSession(bgp_sessions::BgpSession),
    LldpNeighbor(lldp_neighbors::LldpNeighbor),
    Interface(interfaces::Interface),
    VpnSession(vpn_sessions::AsaVpnStats),
    VpnTunnel(vpn_sessions::AsaTunnelStats),
    AsaVpn(vpn_sessions::AsaGlobalStats),
}

impl Record {
    pub fn influx_metric(&self) -> InfluxMetric {
        match self {
            Record::BgpSession(m) => m.influx_metric(),
            Record::LldpNeighbor(m) => m.influx_metric(),
            Record::Interface(m) => m.influx_metric(),
            Record::VpnSession(m) => m.influx_metric(),
            Record::VpnTunnel(m) => m.influx_metric(),
            Record::AsaVpn(m) => m.influx_metric(),
        }
    }

    pub fn measurement(&self) -> &'static str {
        match self {
            Record::BgpSession(_) => "bgp",
            Record::LldpNeighbor(_) => "lldp_neighbors",
            Record::Interface(_) => "interface",
            Record::VpnSession(_) => "vpn_session",
            Record::VpnTunnel(_) => "vpn_tunnel",
            Record::AsaVpn(_) => "asa_vpn",
        }
    }
}

impl From<vpn_sessions::VpnStat> for Record {
    fn from(stat: vpn_sessions::VpnStat) -> Self {
        match stat {
            vpn_sessions::VpnStat::Session(s) => Record::VpnSession(s),
            vpn_sessions::VpnStat::Tunnel(t) => Record::VpnTunnel(t),
            vpn_sessions::VpnStat::Global(g) => Record::AsaVpn(g),
        }
    }
}

fn wrap<T>(items: Vec<T>, f: fn(T) -> Record) -> Vec<Record> {
    items.into_iter().map(f).collect()
}

/// Normalizes the commands of one collector.
///
/// All commands are expected to share the collector and executor of the
/// first one; processors only read the first command's result.
pub fn normalize_data(
    commands: &[Command],
    connector: &ConnectParams,
) -> Result<Vec<Record>, NormalizeError> {
    let Some(first) = commands.first() else {
        return Err(NormalizeError::NotImplemented("No command found".to_string()));
    };

    match (first.collector.as_str(), first.executor) {
        ("bgp_session", Executor::Cli) => Ok(wrap(
            bgp_sessions::cli_processor(commands, connector)?,
            Record::BgpSession,
        )),
        ("bgp_session", Executor::Netconf) => Ok(wrap(
            bgp_sessions::netconf_processor(commands, connector)?,
            Record::BgpSession,
        )),
        ("lldp_neighbors", Executor::Cli) => Ok(wrap(
            lldp_neighbors::cli_processor(commands, connector)?,
            Record::LldpNeighbor,
        )),
        ("lldp_neighbors", Executor::Netconf) => Ok(wrap(
            lldp_neighbors::netconf_processor(commands, connector)?,
            Record::LldpNeighbor,
        )),
        ("interface", Executor::Cli) => Ok(wrap(
            interfaces::cli_processor(commands, connector)?,
            Record::Interface,
        )),
        ("vpn_session", Executor::Cli) => Ok(vpn_sessions::cli_processor(commands, connector)?
            .into_iter()
            .map(Record::from)
            .collect()),
        (collector, executor) => Err(NormalizeError::UnknownCollector {
            collector: collector.to_string(),
            executor,
        }),
    }
}
