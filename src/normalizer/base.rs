//! Shared pieces of the resource models.

use crate::domain::model::Command;
use crate::normalizer::influx::InfluxMetric;
use crate::normalizer::NormalizeError;
use serde_json::Value;

/// 所有資源模型共用的輸出介面
pub trait ResourceModel {
    fn influx_metric(&self) -> InfluxMetric;
}

/// Returns the first command of a processor batch, checking it has a result.
pub fn first_with_result(
    commands: &[Command],
    error: fn(String) -> NormalizeError,
) -> Result<&Command, NormalizeError> {
    let command = commands
        .first()
        .ok_or_else(|| error("No command found".to_string()))?;
    if !command.has_result() {
        return Err(error("No result returned in Command".to_string()));
    }
    Ok(command)
}

/// 字串欄位；空字串視為沒有值
pub fn opt_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// 整數欄位，接受數字或數字字串
pub fn opt_int(value: Option<&Value>, field: &str) -> Result<Option<i64>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| format!("{} is not an integer: {}", field, n)),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| format!("{} is not an integer: '{}'", field, s)),
        Some(other) => Err(format!("{} is not an integer: {}", field, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{CommandParams, Executor};
    use serde_json::json;

    #[test]
    fn test_first_with_result() {
        let err = first_with_result(&[], NormalizeError::BgpSession).unwrap_err();
        assert_eq!(err, NormalizeError::BgpSession("No command found".to_string()));

        let command = Command {
            executor: Executor::Cli,
            collector: "bgp_session".to_string(),
            command: "show bgp all neighbor".to_string(),
            params: CommandParams::structured(),
            result: Some(json!({})),
        };
        let err = first_with_result(&[command], NormalizeError::BgpSession).unwrap_err();
        assert_eq!(
            err,
            NormalizeError::BgpSession("No result returned in Command".to_string())
        );
    }

    #[test]
    fn test_opt_int() {
        assert_eq!(opt_int(Some(&json!(65001)), "peer_as"), Ok(Some(65001)));
        assert_eq!(opt_int(Some(&json!("42")), "mtu"), Ok(Some(42)));
        assert_eq!(opt_int(Some(&json!("")), "mtu"), Ok(None));
        assert_eq!(opt_int(None, "mtu"), Ok(None));
        assert!(opt_int(Some(&json!("abc")), "mtu").is_err());
    }

    #[test]
    fn test_opt_string() {
        assert_eq!(opt_string(Some(&json!("R2"))), Some("R2".to_string()));
        assert_eq!(opt_string(Some(&json!(""))), None);
        assert_eq!(opt_string(Some(&json!(1500))), Some("1500".to_string()));
        assert_eq!(opt_string(Some(&json!(null))), None);
    }
}
