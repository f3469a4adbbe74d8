//! Cisco ASA VPN statistics.

use crate::core::connector::ConnectParams;
use crate::domain::model::Command;
use crate::normalizer::base::{first_with_result, ResourceModel};
use crate::normalizer::influx::InfluxMetric;
use crate::normalizer::NormalizeError;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;

static SLUG_DROP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\-\.\w\s]").unwrap());
static SLUG_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\-\.\s]+").unwrap());

pub const SLUG_LENGTH: usize = 50;

/// 可轉成整數就轉，否則為 None
pub fn isinty(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Turns a row label into a tag-safe slug.
///
/// ```
/// use netcollector::normalizer::vpn_sessions::slugify;
/// assert_eq!(slugify("AnyConnect Client", 50), "anyconnect-client");
/// assert_eq!(slugify("  SSL/TLS/DTLS ", 50), "ssltlsdtls");
/// assert_eq!(slugify("IKEv2 IPsec", 4), "ikev");
/// ```
pub fn slugify(value: &str, length: usize) -> String {
    let kept = SLUG_DROP.replace_all(value, "");
    let lowered = kept.trim().to_lowercase();
    let collapsed = SLUG_SEPARATORS.replace_all(&lowered, "-");
    collapsed
        .chars()
        .filter(char::is_ascii)
        .take(length)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AsaVpnStats {
    pub active: Option<i64>,
    pub cumulative: Option<i64>,
    pub peak_concurrent: Option<i64>,
    pub inactive: Option<i64>,
    pub name: Option<String>,
}

impl ResourceModel for AsaVpnStats {
    fn influx_metric(&self) -> InfluxMetric {
        InfluxMetric::new("vpn_session")
            .tag("name", self.name.as_deref())
            .field("active", self.active)
            .field("cumulative", self.cumulative)
            .field("peak_concurrent", self.peak_concurrent)
            .field("inactive", self.inactive)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AsaTunnelStats {
    pub active: Option<i64>,
    pub cumulative: Option<i64>,
    pub peak_concurrent: Option<i64>,
    pub name: Option<String>,
}

impl ResourceModel for AsaTunnelStats {
    fn influx_metric(&self) -> InfluxMetric {
        InfluxMetric::new("vpn_tunnel")
            .tag("name", self.name.as_deref())
            .field("active", self.active)
            .field("cumulative", self.cumulative)
            .field("peak_concurrent", self.peak_concurrent)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AsaGlobalStats {
    pub total_active_and_inactive: Option<i64>,
    pub total_cumulative: Option<i64>,
    pub device_total_vpn_capacity: Option<i64>,
    pub device_load_percent: Option<i64>,
    pub totals_active: Option<i64>,
    pub totals_cumulative: Option<i64>,
}

impl ResourceModel for AsaGlobalStats {
    fn influx_metric(&self) -> InfluxMetric {
        InfluxMetric::new("asa_vpn")
            .field("total_active_and_inactive", self.total_active_and_inactive)
            .field("total_cumulative", self.total_cumulative)
            .field("device_total_vpn_capacity", self.device_total_vpn_capacity)
            .field("device_load_percent", self.device_load_percent)
            .field("totals_active", self.totals_active)
            .field("totals_cumulative", self.totals_cumulative)
    }
}

/// VPN 統計的三種紀錄
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum VpnStat {
    Session(AsaVpnStats),
    Tunnel(AsaTunnelStats),
    Global(AsaGlobalStats),
}

/// 取平行陣列的第 `index` 筆；缺 key 或長度不足時回傳 None
fn column<'a>(record: &'a Value, key: &str, index: usize) -> Option<&'a Value> {
    record.get(key)?.as_array()?.get(index)
}

fn names(record: &Value, key: &str) -> Option<usize> {
    record.get(key).and_then(Value::as_array).map(Vec::len)
}

fn session_rows(record: &Value) -> Option<Vec<AsaVpnStats>> {
    (0..names(record, "vpn_session_name")?)
        .map(|i| -> Option<AsaVpnStats> {
            Some(AsaVpnStats {
                active: isinty(Some(column(record, "vpn_session_active", i)?)),
                cumulative: isinty(Some(column(record, "vpn_session_cumulative", i)?)),
                peak_concurrent: isinty(Some(column(record, "vpn_session_peak_concurrent", i)?)),
                inactive: isinty(Some(column(record, "vpn_session_inactive", i)?)),
                name: Some(slugify(column(record, "vpn_session_name", i)?.as_str()?, SLUG_LENGTH)),
            })
        })
        .collect()
}

fn tunnel_rows(record: &Value) -> Option<Vec<AsaTunnelStats>> {
    (0..names(record, "tunnels_summary_name")?)
        .map(|i| -> Option<AsaTunnelStats> {
            Some(AsaTunnelStats {
                active: isinty(Some(column(record, "tunnels_summary_active", i)?)),
                cumulative: isinty(Some(column(record, "tunnels_summary_cumulative", i)?)),
                peak_concurrent: isinty(Some(column(record, "tunnels_summary_peak_concurrent", i)?)),
                name: Some(slugify(column(record, "tunnels_summary_name", i)?.as_str()?, SLUG_LENGTH)),
            })
        })
        .collect()
}

/// Builds per-type session, per-protocol tunnel and global statistics.
pub fn cli_processor(
    commands: &[Command],
    connector: &ConnectParams,
) -> Result<Vec<VpnStat>, NormalizeError> {
    let command = first_with_result(commands, NormalizeError::VpnSessions)?;
    if connector.device_type != "cisco_asa" {
        return Err(NormalizeError::NotImplemented(
            "Not yet for other device types".to_string(),
        ));
    }

    let record = command
        .result
        .as_ref()
        .and_then(|r| r.get(0))
        .ok_or_else(|| {
            NormalizeError::VpnSessions("Unable to parse output correctly (vpn_session)".to_string())
        })?;

    let sessions = session_rows(record).ok_or_else(|| {
        NormalizeError::VpnSessions("Unable to parse output correctly (vpn_session)".to_string())
    })?;
    let tunnels = tunnel_rows(record).ok_or_else(|| {
        NormalizeError::VpnSessions("Unable to parse output correctly (tunnels)".to_string())
    })?;

    let global = AsaGlobalStats {
        total_active_and_inactive: isinty(record.get("total_active_and_inactive")),
        total_cumulative: isinty(record.get("total_cumulative")),
        device_total_vpn_capacity: isinty(record.get("device_total_vpn_capacity")),
        device_load_percent: isinty(record.get("device_load_percent")),
        totals_active: isinty(record.get("totals_active")),
        totals_cumulative: isinty(record.get("totals_cumulative")),
    };

    let mut stats: Vec<VpnStat> = sessions.into_iter().map(VpnStat::Session).collect();
    stats.extend(tunnels.into_iter().map(VpnStat::Tunnel));
    stats.push(VpnStat::Global(global));
    Ok(stats)
}
