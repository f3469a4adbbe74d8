//! Parser for Cisco ASA `show vpn-sessiondb` summary output.

use regex::Regex;
use serde_json::{json, Value};
use std::sync::LazyLock;

static SUMMARY_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S.*?)\s*:\s*(\d+)\s*:\s*(\d+)\s*:\s*(\d+)(?:\s*:\s*(\d+))?\s*$").unwrap()
});
static TOTAL_ACTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Total Active and Inactive\s*:\s*(\d+)(?:\s+Total Cumulative\s*:\s*(\d+))?").unwrap()
});
static CAPACITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Device Total VPN Capacity\s*:\s*(\d+)").unwrap());
static LOAD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^Device Load\s*:\s*(\d+)%").unwrap());
static TOTALS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Totals\s*:\s*(\d+)\s*:\s*(\d+)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Sessions,
    Tunnels,
}

#[derive(Default)]
struct Columns {
    name: Vec<String>,
    active: Vec<String>,
    cumulative: Vec<String>,
    peak_concurrent: Vec<String>,
    inactive: Vec<String>,
}

/// 回傳單筆紀錄的陣列，欄位值皆為字串（與表格型 parser 一致）
pub fn parse_vpn_sessiondb(output: &str) -> Result<Value, String> {
    let mut section = Section::None;
    let mut sessions = Columns::default();
    let mut tunnels = Columns::default();
    let mut total_active_and_inactive = String::new();
    let mut total_cumulative = String::new();
    let mut capacity = String::new();
    let mut load = String::new();
    let mut totals_active = String::new();
    let mut totals_cumulative = String::new();

    for line in output.lines() {
        let trimmed = line.trim();

        if trimmed.eq_ignore_ascii_case("VPN Session Summary") {
            section = Section::Sessions;
            continue;
        }
        if trimmed.eq_ignore_ascii_case("Tunnels Summary") {
            section = Section::Tunnels;
            continue;
        }

        if let Some(caps) = TOTAL_ACTIVE.captures(trimmed) {
            total_active_and_inactive = caps[1].to_string();
            if let Some(cumulative) = caps.get(2) {
                total_cumulative = cumulative.as_str().to_string();
            }
            continue;
        }
        if let Some(caps) = CAPACITY.captures(trimmed) {
            capacity = caps[1].to_string();
            continue;
        }
        if let Some(caps) = LOAD.captures(trimmed) {
            load = caps[1].to_string();
            continue;
        }
        if let Some(caps) = TOTALS.captures(trimmed) {
            totals_active = caps[1].to_string();
            totals_cumulative = caps[2].to_string();
            continue;
        }

        let Some(caps) = SUMMARY_ROW.captures(trimmed) else {
            continue;
        };
        let target = match section {
            Section::Sessions => &mut sessions,
            Section::Tunnels => &mut tunnels,
            Section::None => continue,
        };
        target.name.push(caps[1].trim().to_string());
        target.active.push(caps[2].to_string());
        target.cumulative.push(caps[3].to_string());
        target.peak_concurrent.push(caps[4].to_string());
        target
            .inactive
            .push(caps.get(5).map(|m| m.as_str().to_string()).unwrap_or_default());
    }

    if section == Section::None {
        return Err("no 'VPN Session Summary' section found".to_string());
    }

    Ok(json!([{
        "vpn_session_name": sessions.name,
        "vpn_session_active": sessions.active,
        "vpn_session_cumulative": sessions.cumulative,
        "vpn_session_peak_concurrent": sessions.peak_concurrent,
        "vpn_session_inactive": sessions.inactive,
        "tunnels_summary_name": tunnels.name,
        "tunnels_summary_active": tunnels.active,
        "tunnels_summary_cumulative": tunnels.cumulative,
        "tunnels_summary_peak_concurrent": tunnels.peak_concurrent,
        "total_active_and_inactive": total_active_and_inactive,
        "total_cumulative": total_cumulative,
        "device_total_vpn_capacity": capacity,
        "device_load_percent": load,
        "totals_active": totals_active,
        "totals_cumulative": totals_cumulative,
    }]))
}
