//! Parsers for Cisco IOS / IOS-XE `show` output.

use regex::Regex;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::LazyLock;

// ============================================================================
// show lldp neighbors
// ============================================================================

const LLDP_COLUMNS: [&str; 4] = ["Local Intf", "Hold-time", "Capability", "Port ID"];

fn column(line: &str, start: usize, end: Option<usize>) -> &str {
    let len = line.len();
    let start = start.min(len);
    let end = end.unwrap_or(len).min(len);
    line.get(start..end).unwrap_or("").trim()
}

/// `show lldp neighbors` 的表格輸出。
///
/// 過長的 Device ID 會自成一行，與下一行合併。
pub fn parse_lldp_neighbors(output: &str) -> Value {
    let mut rows = Vec::new();
    let mut offsets: Option<[usize; 4]> = None;
    let mut pending_neighbor: Option<String> = None;

    for line in output.lines() {
        let trimmed = line.trim();

        let Some(cols) = offsets else {
            if trimmed.starts_with("Device ID") {
                let found: Vec<usize> = LLDP_COLUMNS
                    .iter()
                    .filter_map(|name| line.find(name))
                    .collect();
                if let [local, hold, cap, port] = found[..] {
                    offsets = Some([local, hold, cap, port]);
                }
            }
            continue;
        };

        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with("Total entries") {
            break;
        }

        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        if tokens.len() == 1 && !line.starts_with(char::is_whitespace) {
            pending_neighbor = Some(tokens[0].to_string());
            continue;
        }

        let (neighbor, local, capabilities, port) = if line.is_ascii() {
            let [local, hold, cap, port] = cols;
            let head = column(line, 0, Some(local));
            let neighbor = if head.is_empty() {
                pending_neighbor.take().unwrap_or_default()
            } else {
                pending_neighbor = None;
                head.to_string()
            };
            (
                neighbor,
                column(line, local, Some(hold)).to_string(),
                column(line, cap, Some(port)).to_string(),
                column(line, port, None).to_string(),
            )
        } else {
            // 非 ASCII 無法依欄位切割，改用空白分隔
            let (neighbor, rest) = if line.starts_with(char::is_whitespace) {
                (pending_neighbor.take().unwrap_or_default(), &tokens[..])
            } else {
                (tokens[0].to_string(), &tokens[1..])
            };
            if rest.len() < 3 {
                continue;
            }
            (
                neighbor,
                rest[0].to_string(),
                rest[2..rest.len() - 1].join(" "),
                rest[rest.len() - 1].to_string(),
            )
        };

        if neighbor.is_empty() || local.is_empty() {
            continue;
        }

        rows.push(json!({
            "neighbor": neighbor,
            "local_interface": local,
            "capabilities": capabilities,
            "neighbor_interface": port,
        }));
    }

    Value::Array(rows)
}

// ============================================================================
// show bgp all neighbor / show ip bgp neighbors
// ============================================================================

static BGP_NEIGHBOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^BGP neighbor is (\S+?),\s+(?:vrf (\S+?),\s+)?remote AS (\d+(?:\.\d+)?),?\s*(?:(external|internal)\s+link)?",
    )
    .unwrap()
});
static BGP_ROUTER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"remote router ID (\S+)").unwrap());
static BGP_STATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"BGP state = (\w+)").unwrap());
static BGP_PEER_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Member of peer-group (\S+)").unwrap());
static BGP_ADDRESS_FAMILY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^For address family: (.+)$").unwrap());
static BGP_PREFIXES_CURRENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Prefixes Current:\s+(\d+)\s+(\d+)").unwrap());
static BGP_BESTPATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Used as bestpath:\s+(\S+)\s+(\d+)").unwrap());
static BGP_LOCAL_HOST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Local host: ([^,\s]+), Local port: (\d+)").unwrap());
static BGP_FOREIGN_HOST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Foreign host: ([^,\s]+), Foreign port: (\d+)").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressFamilyCounters {
    pub sent_prefixes_current: Option<u64>,
    pub received_prefixes_current: Option<u64>,
    pub used_as_bestpath: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BgpNeighborBlock {
    pub address: String,
    pub vrf: String,
    pub remote_as: Option<u64>,
    pub link: Option<String>,
    pub remote_router_id: Option<String>,
    pub state: Option<String>,
    pub peer_group: Option<String>,
    pub local_host: Option<String>,
    pub local_port: Option<u64>,
    pub foreign_port: Option<u64>,
    pub address_families: BTreeMap<String, AddressFamilyCounters>,
}

/// ASN 可能為 asdot（`65000.10`），轉為 asplain
pub fn parse_asn(raw: &str) -> Option<u64> {
    match raw.split_once('.') {
        Some((high, low)) => {
            let high: u64 = high.parse().ok()?;
            let low: u64 = low.parse().ok()?;
            high.checked_mul(65536)?.checked_add(low)
        }
        None => raw.parse().ok(),
    }
}

pub fn parse_bgp_neighbors(output: &str) -> Vec<BgpNeighborBlock> {
    let mut neighbors: Vec<BgpNeighborBlock> = Vec::new();
    let mut family: Option<String> = None;

    for line in output.lines() {
        let trimmed = line.trim();

        if let Some(caps) = BGP_NEIGHBOR.captures(trimmed) {
            neighbors.push(BgpNeighborBlock {
                address: caps[1].to_string(),
                vrf: caps
                    .get(2)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| "default".to_string()),
                remote_as: parse_asn(&caps[3]),
                link: caps.get(4).map(|m| m.as_str().to_string()),
                ..BgpNeighborBlock::default()
            });
            family = None;
            continue;
        }

        let Some(current) = neighbors.last_mut() else {
            continue;
        };

        if let Some(caps) = BGP_ROUTER_ID.captures(trimmed) {
            current.remote_router_id = Some(caps[1].to_string());
        }
        if let Some(caps) = BGP_STATE.captures(trimmed) {
            current.state = Some(caps[1].to_string());
        }
        if let Some(caps) = BGP_PEER_GROUP.captures(trimmed) {
            current.peer_group = Some(caps[1].trim_end_matches(',').to_string());
        }
        if let Some(caps) = BGP_ADDRESS_FAMILY.captures(trimmed) {
            let name = caps[1].trim().to_lowercase();
            current.address_families.entry(name.clone()).or_default();
            family = Some(name);
            continue;
        }
        if let Some(caps) = BGP_LOCAL_HOST.captures(trimmed) {
            current.local_host = Some(caps[1].to_string());
            current.local_port = caps[2].parse().ok();
            continue;
        }
        if let Some(caps) = BGP_FOREIGN_HOST.captures(trimmed) {
            current.foreign_port = caps[2].parse().ok();
            continue;
        }

        let Some(name) = family.as_ref() else {
            continue;
        };
        let counters = current.address_families.entry(name.clone()).or_default();
        if let Some(caps) = BGP_PREFIXES_CURRENT.captures(trimmed) {
            counters.sent_prefixes_current = caps[1].parse().ok();
            counters.received_prefixes_current = caps[2].parse().ok();
        } else if let Some(caps) = BGP_BESTPATH.captures(trimmed) {
            counters.used_as_bestpath = caps[2].parse().ok();
        }
    }

    neighbors
}

fn insert_opt<T: Into<Value>>(map: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value.into());
    }
}

/// 巢狀輸出：`vrf -> <vrf> -> neighbor -> <address>`
pub fn bgp_neighbors_structured(neighbors: &[BgpNeighborBlock]) -> Value {
    let mut vrfs = Map::new();

    for block in neighbors {
        let mut entry = Map::new();
        insert_opt(&mut entry, "remote_as", block.remote_as);
        insert_opt(&mut entry, "remote_router_id", block.remote_router_id.clone());
        insert_opt(&mut entry, "session_state", block.state.clone());
        insert_opt(&mut entry, "link", block.link.clone());
        insert_opt(&mut entry, "peer_group", block.peer_group.clone());

        let mut transport = Map::new();
        insert_opt(&mut transport, "local_host", block.local_host.clone());
        insert_opt(&mut transport, "local_port", block.local_port);
        insert_opt(&mut transport, "foreign_port", block.foreign_port);
        entry.insert(
            "bgp_session_transport".to_string(),
            json!({ "transport": Value::Object(transport) }),
        );

        let mut families = Map::new();
        for (name, counters) in &block.address_families {
            let mut sent = Map::new();
            insert_opt(&mut sent, "prefixes_current", counters.sent_prefixes_current);
            let mut received = Map::new();
            insert_opt(&mut received, "prefixes_current", counters.received_prefixes_current);
            insert_opt(&mut received, "used_as_bestpath", counters.used_as_bestpath);
            families.insert(
                name.clone(),
                json!({
                    "prefix_activity_counters": {
                        "sent": Value::Object(sent),
                        "received": Value::Object(received),
                    }
                }),
            );
        }
        entry.insert("address_family".to_string(), Value::Object(families));

        let vrf = vrfs
            .entry(block.vrf.clone())
            .or_insert_with(|| json!({ "neighbor": {} }));
        if let Some(Value::Object(by_address)) = vrf.get_mut("neighbor") {
            by_address.insert(block.address.clone(), Value::Object(entry));
        }
    }

    json!({ "vrf": Value::Object(vrfs) })
}

/// 表格輸出：每個 neighbor 一筆字串紀錄
pub fn bgp_neighbors_tabular(neighbors: &[BgpNeighborBlock]) -> Value {
    Value::Array(
        neighbors
            .iter()
            .map(|block| {
                json!({
                    "remote_ip": block.address,
                    "remote_as": block.remote_as.map(|asn| asn.to_string()).unwrap_or_default(),
                    "remote_router_id": block.remote_router_id.clone().unwrap_or_default(),
                    "localhost_ip": block.local_host.clone().unwrap_or_default(),
                    "bgp_state": block.state.clone().unwrap_or_default(),
                    "peer_group": block.peer_group.clone().unwrap_or_default(),
                    "vrf": block.vrf,
                })
            })
            .collect(),
    )
}

// ============================================================================
// show interfaces
// ============================================================================

static INTF_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+) is (administratively down|up|down|deleted)(?:\s*\([^)]*\))?, line protocol is (up|down)")
        .unwrap()
});
static INTF_HARDWARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Hardware is (.+?)(?:, address is ([0-9A-Fa-f.:\-]+)(?: \(bia [0-9A-Fa-f.:\-]+\))?)?$")
        .unwrap()
});
static INTF_DESCRIPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Description: (.*)$").unwrap());
static INTF_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(Internet|Secondary) address is (\S+)").unwrap());
static INTF_MTU: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^MTU (\d+) bytes, BW (\d+) Kbit(?:/sec)?, DLY (\d+) usec").unwrap()
});
static INTF_DUPLEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(full|half|auto)[- ]duplex, ([^,]+)").unwrap()
});
static INTF_MEMBERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Members in this channel: (.+)$").unwrap());

struct CounterPattern {
    regex: Regex,
    keys: &'static [&'static str],
}

static INTF_COUNTERS: LazyLock<Vec<CounterPattern>> = LazyLock::new(|| {
    let patterns: [(&str, &'static [&'static str]); 9] = [
        (r"^(\d+) packets input, (\d+) bytes", &["in_pkts", "in_octets"]),
        (
            r"^Received (\d+) broadcasts \((\d+) (?:IP )?multicasts?\)",
            &["in_broadcast_pkts", "in_multicast_pkts"],
        ),
        (
            r"^(\d+) runts, (\d+) giants, (\d+) throttles",
            &["in_runts", "in_giants", "in_throttles"],
        ),
        (r"^(\d+) input errors, (\d+) CRC", &["in_errors", "in_crc_errors"]),
        (r"^(\d+) packets output, (\d+) bytes", &["out_pkts", "out_octets"]),
        (
            r"^(\d+) output errors, (\d+) collisions",
            &["out_errors", "out_collision"],
        ),
        (r"^(\d+) unknown protocol drops", &["out_unknown_protocl_drops"]),
        (
            r"^\d+ babbles, (\d+) late collision, (\d+) deferred",
            &["out_late_collision", "out_deferred"],
        ),
        (
            r"^(\d+) lost carrier, (\d+) no carrier",
            &["out_lost_carrier", "out_no_carrier"],
        ),
    ];
    patterns
        .into_iter()
        .map(|(pattern, keys)| CounterPattern {
            regex: Regex::new(pattern).unwrap(),
            keys,
        })
        .collect()
});

fn parse_number(raw: &str) -> Value {
    raw.parse::<u64>().map(Value::from).unwrap_or(Value::Null)
}

/// `show interfaces` 巢狀輸出，以介面名稱為 key
pub fn parse_interfaces(output: &str) -> Value {
    let mut interfaces = Map::new();
    let mut current: Option<(String, Map<String, Value>)> = None;

    let flush = |current: &mut Option<(String, Map<String, Value>)>,
                     interfaces: &mut Map<String, Value>| {
        if let Some((name, entry)) = current.take() {
            interfaces.insert(name, Value::Object(entry));
        }
    };

    for line in output.lines() {
        let trimmed = line.trim();

        if let Some(caps) = INTF_HEADER.captures(trimmed) {
            flush(&mut current, &mut interfaces);
            let status = &caps[2];
            let mut entry = Map::new();
            entry.insert(
                "enabled".to_string(),
                Value::Bool(status != "administratively down"),
            );
            let oper = if status == "up" { "up" } else { "down" };
            entry.insert("oper_status".to_string(), json!(oper));
            entry.insert("line_protocol".to_string(), json!(&caps[3]));
            entry.insert("ipv4".to_string(), json!({}));
            current = Some((caps[1].to_string(), entry));
            continue;
        }

        let Some((_, entry)) = current.as_mut() else {
            continue;
        };

        if let Some(caps) = INTF_HARDWARE.captures(trimmed) {
            entry.insert("type".to_string(), json!(caps[1].trim()));
            if let Some(mac) = caps.get(2) {
                entry.insert("mac_address".to_string(), json!(mac.as_str()));
            }
        } else if let Some(caps) = INTF_DESCRIPTION.captures(trimmed) {
            entry.insert("description".to_string(), json!(caps[1].trim()));
        } else if let Some(caps) = INTF_ADDRESS.captures(trimmed) {
            let address = caps[2].to_string();
            let (ip, prefix_length) = address.split_once('/').unwrap_or((address.as_str(), ""));
            let role = if &caps[1] == "Secondary" {
                "secondary"
            } else {
                "primary"
            };
            let details = json!({
                "ip": ip,
                "prefix_length": prefix_length,
                "role": role,
            });
            if let Some(Value::Object(ipv4)) = entry.get_mut("ipv4") {
                ipv4.insert(address, details);
            }
        } else if let Some(caps) = INTF_MTU.captures(trimmed) {
            entry.insert("mtu".to_string(), parse_number(&caps[1]));
            entry.insert("bandwidth".to_string(), parse_number(&caps[2]));
            entry.insert("delay".to_string(), parse_number(&caps[3]));
        } else if let Some(caps) = INTF_DUPLEX.captures(trimmed) {
            entry.insert("duplex_mode".to_string(), json!(caps[1].to_lowercase()));
            entry.insert("port_speed".to_string(), json!(caps[2].trim().to_lowercase()));
        } else if let Some(caps) = INTF_MEMBERS.captures(trimmed) {
            let members: Vec<&str> = caps[1].split_whitespace().collect();
            entry.insert(
                "port_channel".to_string(),
                json!({
                    "port_channel_member": true,
                    "port_channel_member_intfs": members,
                }),
            );
        } else {
            for pattern in INTF_COUNTERS.iter() {
                if let Some(caps) = pattern.regex.captures(trimmed) {
                    let counters = entry
                        .entry("counters".to_string())
                        .or_insert_with(|| json!({}));
                    if let Value::Object(counters) = counters {
                        for (index, key) in pattern.keys.iter().enumerate() {
                            if let Some(value) = caps.get(index + 1) {
                                counters.insert(key.to_string(), parse_number(value.as_str()));
                            }
                        }
                    }
                    break;
                }
            }
        }
    }

    flush(&mut current, &mut interfaces);
    Value::Object(interfaces)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LLDP_OUTPUT: &str = "\
Capability codes:
    (R) Router, (B) Bridge, (T) Telephone, (C) DOCSIS Cable Device
    (W) WLAN Access Point, (P) Repeater, (S) Station, (O) Other

Device ID           Local Intf     Hold-time  Capability      Port ID
R2.lab              Gi0/1          120        R               Gi0/0
sw-access-01.campus.example.net
                    Gi0/2          120        B,R             Gi1/0/24
SEP001122334455     Gi0/3          180        T               001122334455:P1

Total entries displayed: 3
";

    #[test]
    fn test_parse_lldp_neighbors() {
        let rows = parse_lldp_neighbors(LLDP_OUTPUT);
        let rows = rows.as_array().unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["neighbor"], "R2.lab");
        assert_eq!(rows[0]["local_interface"], "Gi0/1");
        assert_eq!(rows[0]["neighbor_interface"], "Gi0/0");
        assert_eq!(rows[1]["neighbor"], "sw-access-01.campus.example.net");
        assert_eq!(rows[1]["capabilities"], "B,R");
        assert_eq!(rows[1]["neighbor_interface"], "Gi1/0/24");
        assert_eq!(rows[2]["neighbor_interface"], "001122334455:P1");
    }

    const BGP_OUTPUT: &str = "\
BGP neighbor is 10.0.0.2,  remote AS 65002, external link
  BGP version 4, remote router ID 2.2.2.2
  BGP state = Established, up for 01:02:03
  Last read 00:00:10, last write 00:00:12, hold time is 180, keepalive interval is 60 seconds
 For address family: IPv4 Unicast
  Session: 10.0.0.2
  BGP table version 12, neighbor version 12/0
                                 Sent       Rcvd
  Prefix activity:               ----       ----
    Prefixes Current:               3          5 (Consumes 400 bytes)
    Prefixes Total:                 3          5
    Used as bestpath:             n/a          4
    Used as multipath:            n/a          0
Local host: 10.0.0.1, Local port: 179
Foreign host: 10.0.0.2, Foreign port: 34567

BGP neighbor is 172.16.0.9,  vrf CUST-A,  remote AS 65000.10, internal link
  Member of peer-group RR-CLIENTS for session parameters
  BGP version 4, remote router ID 0.0.0.0
  BGP state = Idle
";

    #[test]
    fn test_parse_bgp_neighbors_blocks() {
        let blocks = parse_bgp_neighbors(BGP_OUTPUT);
        assert_eq!(blocks.len(), 2);

        let first = &blocks[0];
        assert_eq!(first.address, "10.0.0.2");
        assert_eq!(first.vrf, "default");
        assert_eq!(first.remote_as, Some(65002));
        assert_eq!(first.link.as_deref(), Some("external"));
        assert_eq!(first.state.as_deref(), Some("Established"));
        assert_eq!(first.local_host.as_deref(), Some("10.0.0.1"));
        let af = &first.address_families["ipv4 unicast"];
        assert_eq!(af.sent_prefixes_current, Some(3));
        assert_eq!(af.received_prefixes_current, Some(5));
        assert_eq!(af.used_as_bestpath, Some(4));

        let second = &blocks[1];
        assert_eq!(second.vrf, "CUST-A");
        assert_eq!(second.remote_as, Some(65000 * 65536 + 10));
        assert_eq!(second.peer_group.as_deref(), Some("RR-CLIENTS"));
        assert_eq!(second.state.as_deref(), Some("Idle"));
    }

    #[test]
    fn test_bgp_structured_shape() {
        let doc = bgp_neighbors_structured(&parse_bgp_neighbors(BGP_OUTPUT));
        let neighbor = &doc["vrf"]["default"]["neighbor"]["10.0.0.2"];

        assert_eq!(neighbor["session_state"], "Established");
        assert_eq!(
            neighbor["bgp_session_transport"]["transport"]["local_host"],
            "10.0.0.1"
        );
        assert_eq!(
            neighbor["address_family"]["ipv4 unicast"]["prefix_activity_counters"]["received"]
                ["used_as_bestpath"],
            4
        );
        assert!(doc["vrf"]["CUST-A"]["neighbor"]["172.16.0.9"].is_object());
    }

    #[test]
    fn test_bgp_tabular_shape() {
        let rows = bgp_neighbors_tabular(&parse_bgp_neighbors(BGP_OUTPUT));
        let rows = rows.as_array().unwrap();
        assert_eq!(rows[0]["remote_ip"], "10.0.0.2");
        assert_eq!(rows[0]["remote_as"], "65002");
        assert_eq!(rows[0]["localhost_ip"], "10.0.0.1");
        assert_eq!(rows[0]["peer_group"], "");
        assert_eq!(rows[1]["localhost_ip"], "");
    }

    const INTERFACES_OUTPUT: &str = "\
GigabitEthernet0/0 is up, line protocol is up
  Hardware is iGbE, address is 5254.0012.3456 (bia 5254.0012.3456)
  Description: uplink to core
  Internet address is 10.0.0.1/24
  MTU 1500 bytes, BW 1000000 Kbit/sec, DLY 10 usec,
     reliability 255/255, txload 1/255, rxload 1/255
  Full Duplex, 1000Mbps, link type is auto, media type is RJ45
     1234 packets input, 567890 bytes, 0 no buffer
     Received 10 broadcasts (5 IP multicasts)
     0 runts, 0 giants, 0 throttles
     2 input errors, 1 CRC, 0 frame, 0 overrun, 0 ignored
     4321 packets output, 98765 bytes, 0 underruns
     0 output errors, 0 collisions, 1 interface resets
     7 unknown protocol drops
     0 babbles, 0 late collision, 0 deferred
     0 lost carrier, 0 no carrier
GigabitEthernet0/1 is administratively down, line protocol is down
  Hardware is iGbE, address is 5254.0012.3457 (bia 5254.0012.3457)
  MTU 1500 bytes, BW 1000000 Kbit/sec, DLY 10 usec,
";

    #[test]
    fn test_parse_interfaces() {
        let doc = parse_interfaces(INTERFACES_OUTPUT);
        let gi0 = &doc["GigabitEthernet0/0"];

        assert_eq!(gi0["enabled"], true);
        assert_eq!(gi0["oper_status"], "up");
        assert_eq!(gi0["type"], "iGbE");
        assert_eq!(gi0["mac_address"], "5254.0012.3456");
        assert_eq!(gi0["description"], "uplink to core");
        assert_eq!(gi0["ipv4"]["10.0.0.1/24"]["prefix_length"], "24");
        assert_eq!(gi0["mtu"], 1500);
        assert_eq!(gi0["bandwidth"], 1000000);
        assert_eq!(gi0["duplex_mode"], "full");
        assert_eq!(gi0["port_speed"], "1000mbps");
        assert_eq!(gi0["counters"]["in_pkts"], 1234);
        assert_eq!(gi0["counters"]["in_multicast_pkts"], 5);
        assert_eq!(gi0["counters"]["in_crc_errors"], 1);
        assert_eq!(gi0["counters"]["out_octets"], 98765);
        assert_eq!(gi0["counters"]["out_unknown_protocl_drops"], 7);

        let gi1 = &doc["GigabitEthernet0/1"];
        assert_eq!(gi1["enabled"], false);
        assert_eq!(gi1["oper_status"], "down");
        assert!(gi1.get("counters").is_none());
    }

    #[test]
    fn test_parse_asn() {
        assert_eq!(parse_asn("65001"), Some(65001));
        assert_eq!(parse_asn("1.1"), Some(65537));
        assert_eq!(parse_asn("x"), None);
        assert_eq!(parse_asn("18446744073709551615.1"), None);
    }
}
