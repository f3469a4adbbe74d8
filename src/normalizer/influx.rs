//! InfluxDB line protocol formatting and parsing.

use crate::normalizer::NormalizeError;
use std::fmt;

/// 欄位值型別
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl FieldValue {
    /// NaN 與 inf 無法寫成 line protocol
    pub fn is_writable(&self) -> bool {
        match self {
            FieldValue::Float(v) => v.is_finite(),
            _ => true,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::UInt(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}i", v),
            FieldValue::UInt(v) => write!(f, "{}u", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => write!(f, "{}", v),
            FieldValue::Str(v) => {
                write!(f, "\"{}\"", v.replace('"', "\\\"").replace(' ', "\\ "))
            }
        }
    }
}

fn escape_key(raw: &str) -> String {
    raw.replace(',', "\\,").replace('=', "\\=").replace(' ', "\\ ")
}

/// Formats one line of line protocol.
///
/// Tags with an empty value and non-finite float fields are skipped. The
/// field set is written in the given order and the timestamp, when present,
/// is appended in nanoseconds.
pub fn format_influx_metrics(
    series: &str,
    fields: &[(String, FieldValue)],
    tags: &[(String, String)],
    timestamp: Option<i64>,
) -> String {
    let mut line = series.replace(',', "\\,").replace(' ', "\\ ");

    for (key, value) in tags {
        if value.is_empty() {
            continue;
        }
        line.push(',');
        line.push_str(&escape_key(key));
        line.push('=');
        line.push_str(&escape_key(value));
    }

    let fields: Vec<String> = fields
        .iter()
        .filter(|(_, value)| value.is_writable())
        .map(|(key, value)| format!("{}={}", escape_key(key), value))
        .collect();
    line.push(' ');
    line.push_str(&fields.join(","));

    if let Some(ts) = timestamp {
        line.push(' ');
        line.push_str(&ts.to_string());
    }

    line
}

/// 一筆 line protocol 資料
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InfluxMetric {
    pub name: String,
    pub tags: Vec<(String, String)>,
    pub influx_fields: Vec<(String, FieldValue)>,
    pub timestamp: Option<i64>,
}

impl InfluxMetric {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// 值為 None 時不加入
    pub fn tag<T: ToString>(mut self, key: &str, value: Option<T>) -> Self {
        if let Some(value) = value {
            self.tags.push((key.to_string(), value.to_string()));
        }
        self
    }

    /// 值為 None 或非有限浮點數時不加入
    pub fn field<T: Into<FieldValue>>(mut self, key: &str, value: Option<T>) -> Self {
        if let Some(value) = value.map(Into::<FieldValue>::into).filter(FieldValue::is_writable) {
            self.influx_fields.push((key.to_string(), value));
        }
        self
    }

    /// 至少有一個可寫出的欄位
    pub fn has_fields(&self) -> bool {
        self.influx_fields.iter().any(|(_, value)| value.is_writable())
    }

    pub fn with_timestamp(mut self, timestamp: Option<i64>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn field_value(&self, key: &str) -> Option<&FieldValue> {
        self.influx_fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn to_line_protocol(&self) -> String {
        format_influx_metrics(&self.name, &self.influx_fields, &self.tags, self.timestamp)
    }
}

/// 以未跳脫的分隔字元切開；`quoted` 時雙引號內的分隔字元不算
fn split_unescaped(input: &str, separator: char, quoted: bool) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    let mut in_quotes = false;

    for (idx, ch) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' if quoted => in_quotes = !in_quotes,
            c if c == separator && !in_quotes => {
                parts.push(&input[start..idx]);
                start = idx + ch.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn split_pair(pair: &str) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (idx, ch) in pair.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '=' => return Some((&pair[..idx], &pair[idx + 1..])),
            _ => {}
        }
    }
    None
}

fn unescape(raw: &str, escapable: &[char]) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(&next) = chars.peek() {
                if escapable.contains(&next) {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(ch);
    }
    out
}

const KEY_ESCAPES: &[char] = &[',', '=', ' ', '\\'];

fn parse_field_value(raw: &str) -> Result<FieldValue, String> {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return Ok(FieldValue::Str(unescape(&raw[1..raw.len() - 1], &['"', '\\'])));
    }
    match raw {
        "t" | "T" | "true" | "True" | "TRUE" => return Ok(FieldValue::Bool(true)),
        "f" | "F" | "false" | "False" | "FALSE" => return Ok(FieldValue::Bool(false)),
        _ => {}
    }
    if let Some(int) = raw.strip_suffix('i') {
        return int
            .parse::<i64>()
            .map(FieldValue::Int)
            .map_err(|_| format!("invalid integer '{}'", raw));
    }
    if let Some(uint) = raw.strip_suffix('u') {
        return uint
            .parse::<u64>()
            .map(FieldValue::UInt)
            .map_err(|_| format!("invalid unsigned integer '{}'", raw));
    }
    raw.parse::<f64>()
        .map(FieldValue::Float)
        .map_err(|_| format!("invalid field value '{}'", raw))
}

/// Parses one line of line protocol into an [`InfluxMetric`].
pub fn parse_influx_metrics(line: &str) -> Result<InfluxMetric, NormalizeError> {
    let invalid = |reason: String| NormalizeError::LineProtocol(reason);
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Err(invalid("empty line".to_string()));
    }

    let sections = split_unescaped(line, ' ', true);
    let sections: Vec<&str> = sections.into_iter().filter(|s| !s.is_empty()).collect();
    let (series, field_set, timestamp) = match sections.as_slice() {
        [series, fields] => (*series, *fields, None),
        [series, fields, ts] => (*series, *fields, Some(*ts)),
        _ => return Err(invalid(format!("expected 2 or 3 sections in '{}'", line))),
    };

    let mut series_parts = split_unescaped(series, ',', false).into_iter();
    let name = series_parts
        .next()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| invalid("missing measurement".to_string()))?;

    let mut metric = InfluxMetric::new(&unescape(name, &[',', ' ', '\\']));
    for tag in series_parts {
        let (key, value) =
            split_pair(tag).ok_or_else(|| invalid(format!("invalid tag '{}'", tag)))?;
        metric
            .tags
            .push((unescape(key, KEY_ESCAPES), unescape(value, KEY_ESCAPES)));
    }

    for field in split_unescaped(field_set, ',', true) {
        let (key, value) =
            split_pair(field).ok_or_else(|| invalid(format!("invalid field '{}'", field)))?;
        let value = parse_field_value(value).map_err(invalid)?;
        metric.influx_fields.push((unescape(key, KEY_ESCAPES), value));
    }

    if let Some(ts) = timestamp {
        metric.timestamp = Some(
            ts.parse::<i64>()
                .map_err(|_| invalid(format!("invalid timestamp '{}'", ts)))?,
        );
    }

    Ok(metric)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_format_field_types() {
        let fields = vec![
            ("count".to_string(), FieldValue::Int(10)),
            ("ratio".to_string(), FieldValue::Float(0.5)),
            ("up".to_string(), FieldValue::Bool(true)),
            ("name".to_string(), FieldValue::Str("Gi0/1 uplink".to_string())),
        ];
        let line = format_influx_metrics("interface", &fields, &tags(&[("host", "r1")]), None);
        assert_eq!(
            line,
            r#"interface,host=r1 count=10i,ratio=0.5,up=true,name="Gi0/1\ uplink""#
        );
    }

    #[test]
    fn test_format_escapes_tags_and_skips_empty() {
        let fields = vec![("value".to_string(), FieldValue::Int(1))];
        let line = format_influx_metrics(
            "bgp",
            &fields,
            &tags(&[("description", "to core"), ("peer_group", "")]),
            Some(1_700_000_000_000_000_000),
        );
        assert_eq!(line, r"bgp,description=to\ core value=1i 1700000000000000000");
    }

    #[test]
    fn test_builder_skips_none() {
        let metric = InfluxMetric::new("bgp")
            .tag("peer_as", Some(65001))
            .tag::<String>("peer_group", None)
            .field("prefixes_received", Some(10i64))
            .field::<i64>("prefixes_sent", None);

        assert_eq!(metric.to_line_protocol(), "bgp,peer_as=65001 prefixes_received=10i");
    }

    #[test]
    fn test_non_finite_floats_are_dropped() {
        let fields = vec![
            ("load".to_string(), FieldValue::Float(f64::NAN)),
            ("ratio".to_string(), FieldValue::Float(0.25)),
            ("peak".to_string(), FieldValue::Float(f64::INFINITY)),
        ];
        let line = format_influx_metrics("cpu", &fields, &[], None);
        assert_eq!(line, "cpu ratio=0.25");
        assert!(parse_influx_metrics(&line).is_ok());

        let metric = InfluxMetric::new("cpu").field("load", Some(f64::NEG_INFINITY));
        assert!(metric.influx_fields.is_empty());
        assert!(!metric.has_fields());
    }

    #[test]
    fn test_parse_line_protocol() {
        let metric = parse_influx_metrics(
            r#"weather,location=us\ midwest,season=summer temperature=82.5,humidity=71i,raining=f,note="hot, dry" 1465839830100400200"#,
        )
        .unwrap();

        assert_eq!(metric.name, "weather");
        assert_eq!(metric.tag_value("location"), Some("us midwest"));
        assert_eq!(metric.tag_value("season"), Some("summer"));
        assert_eq!(metric.field_value("temperature"), Some(&FieldValue::Float(82.5)));
        assert_eq!(metric.field_value("humidity"), Some(&FieldValue::Int(71)));
        assert_eq!(metric.field_value("raining"), Some(&FieldValue::Bool(false)));
        assert_eq!(
            metric.field_value("note"),
            Some(&FieldValue::Str("hot, dry".to_string()))
        );
        assert_eq!(metric.timestamp, Some(1465839830100400200));
    }

    #[test]
    fn test_parse_formatted_metric() {
        let original = InfluxMetric::new("vpn_session")
            .tag("name", Some("anyconnect-client"))
            .field("active", Some(10i64))
            .field("cumulative", Some(1234u64))
            .with_timestamp(Some(42));

        let parsed = parse_influx_metrics(&original.to_line_protocol()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_parse_rejects_invalid_lines() {
        assert!(parse_influx_metrics("").is_err());
        assert!(parse_influx_metrics("only_measurement").is_err());
        assert!(parse_influx_metrics("m value=abc").is_err());
        assert!(parse_influx_metrics("m value=1i notatime").is_err());
        assert!(parse_influx_metrics("m,tag value=1i").is_err());
    }
}
