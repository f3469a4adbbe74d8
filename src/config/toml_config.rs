use crate::core::commander::{default_executor_map, DirectiveEntry, ExecutorMap};
use crate::core::connector::{create_connector_with_env, DeviceTarget, EnvSource};
use crate::core::ConfigProvider;
use crate::domain::model::OutputFormat;
use crate::utils::error::{CollectorError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static ENV_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
    #[serde(default)]
    pub directives: Vec<DirectiveEntry>,
    pub tables_dir: Option<String>,
    pub concurrency: Option<usize>,
    /// 秒，未設定時只跑一輪
    pub interval: Option<u64>,
}

/// 所有設備共用的連線預設值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub persist: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Option<u64>,
    pub keepalive: Option<u64>,
    pub ssh_port: Option<u16>,
    pub netconf_port: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// 輸出目錄，未設定時寫到 stdout
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub host: String,
    pub device_type: String,
    pub collectors: Vec<String>,
    pub persist: Option<bool>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let process_env = |key: &str| std::env::var(key).ok();
        Self::from_toml_str_with_env(content, &process_env)
    }

    pub fn from_toml_str_with_env(content: &str, env: &dyn EnvSource) -> Result<Self> {
        let processed = substitute_env_vars(content, env)?;

        toml::from_str(&processed).map_err(|e| CollectorError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    fn device_target(&self, device: &DeviceConfig, env: &dyn EnvSource) -> Result<DeviceTarget> {
        let defaults = &self.connection;
        let mut connector = create_connector_with_env(
            &device.host,
            &device.device_type,
            device.persist.unwrap_or(defaults.persist),
            device.username.as_deref().or(defaults.username.as_deref()),
            device.password.as_deref().or(defaults.password.as_deref()),
            env,
        )?;

        if let Some(timeout) = defaults.timeout {
            connector.timeout = timeout;
        }
        if let Some(keepalive) = defaults.keepalive {
            connector.keepalive = keepalive;
        }
        if let Some(port) = defaults.ssh_port {
            connector.ssh_port = port;
        }
        if let Some(port) = defaults.netconf_port {
            connector.netconf_port = port;
        }

        Ok(DeviceTarget {
            connector,
            collectors: device.collectors.clone(),
        })
    }

    pub fn devices_with_env(&self, env: &dyn EnvSource) -> Result<Vec<DeviceTarget>> {
        self.devices
            .iter()
            .map(|device| self.device_target(device, env))
            .collect()
    }
}

/// 替換 `${VAR}`，未設定的變數視為設定錯誤
fn substitute_env_vars(content: &str, env: &dyn EnvSource) -> Result<String> {
    let mut missing = Vec::new();
    let result = ENV_PLACEHOLDER.replace_all(content, |caps: &regex::Captures| {
        let name = &caps[1];
        env.var(name).unwrap_or_else(|| {
            missing.push(name.to_string());
            String::new()
        })
    });

    if let Some(name) = missing.into_iter().next() {
        return Err(CollectorError::MissingConfigError {
            field: format!("environment variable {}", name),
        });
    }
    Ok(result.into_owned())
}

impl ConfigProvider for TomlConfig {
    fn devices(&self) -> Result<Vec<DeviceTarget>> {
        let process_env = |key: &str| std::env::var(key).ok();
        self.devices_with_env(&process_env)
    }

    fn output_format(&self) -> OutputFormat {
        self.output.format
    }

    fn output_path(&self) -> Option<&str> {
        self.output.path.as_deref()
    }

    fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or(4)
    }

    fn interval_seconds(&self) -> Option<u64> {
        self.interval
    }

    fn tables_dir(&self) -> Option<&str> {
        self.tables_dir.as_deref()
    }

    fn executor_map(&self) -> Result<ExecutorMap> {
        let mut map = default_executor_map();
        map.extend(self.directives.iter().cloned());
        Ok(map)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        if self.devices.is_empty() {
            return Err(CollectorError::MissingConfigError {
                field: "devices".to_string(),
            });
        }

        for (i, device) in self.devices.iter().enumerate() {
            validation::validate_host(&format!("devices[{}].host", i), &device.host)?;
            validation::validate_non_empty_string(
                &format!("devices[{}].device_type", i),
                &device.device_type,
            )?;
            if device.collectors.is_empty() {
                return Err(CollectorError::ConfigValidationError {
                    field: format!("devices[{}].collectors", i),
                    message: "At least one collector is required".to_string(),
                });
            }
        }

        if let Some(path) = &self.output.path {
            validation::validate_path("output.path", path)?;
        }
        if let Some(dir) = &self.tables_dir {
            validation::validate_path("tables_dir", dir)?;
        }
        if let Some(concurrency) = self.concurrency {
            validation::validate_range("concurrency", concurrency, 1, 256)?;
        }
        if let Some(interval) = self.interval {
            validation::validate_positive_number("interval", interval, 1)?;
        }
        for entry in &self.directives {
            if entry.commands.is_empty() {
                return Err(CollectorError::ConfigValidationError {
                    field: format!("directives.{}.{}", entry.device_type, entry.collector),
                    message: "A directive needs at least one command".to_string(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Executor;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const INVENTORY: &str = r#"
concurrency = 2
interval = 60

[connection]
username = "netops"
password = "${NET_PASSWORD}"
timeout = 20

[output]
format = "json"
path = "./metrics"

[[devices]]
host = "core-rtr-01"
device_type = "cisco_ios"
collectors = ["bgp_session", "lldp_neighbors"]

[[devices]]
host = "10.0.0.9"
device_type = "juniper_junos"
collectors = ["bgp_session"]
persist = true
username = "juniper"

[[directives]]
device_type = "cisco_ios"
collector = "lldp_neighbors"
executor = "cli"
commands = ["show lldp neighbors detail"]
params = { parse = "tabular" }
"#;

    #[test]
    fn test_parse_inventory() {
        let env = env_of(&[("NET_PASSWORD", "s3cret")]);
        let config = TomlConfig::from_toml_str_with_env(INVENTORY, &env).unwrap();
        config.validate().unwrap();

        assert_eq!(config.concurrency(), 2);
        assert_eq!(config.interval_seconds(), Some(60));
        assert_eq!(config.output_format(), OutputFormat::Json);
        assert_eq!(config.output_path(), Some("./metrics"));

        let devices = config.devices_with_env(&env).unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].connector.username, "netops");
        assert_eq!(devices[0].connector.password.expose(), "s3cret");
        assert_eq!(devices[0].connector.timeout, 20);
        assert!(!devices[0].connector.persist);
        assert_eq!(devices[1].connector.username, "juniper");
        assert!(devices[1].connector.persist);
    }

    #[test]
    fn test_directive_overrides() {
        let env = env_of(&[("NET_PASSWORD", "x")]);
        let config = TomlConfig::from_toml_str_with_env(INVENTORY, &env).unwrap();
        let map = config.executor_map().unwrap();

        let lldp = map.get("cisco_ios", "lldp_neighbors").unwrap();
        assert_eq!(lldp.executor, Executor::Cli);
        assert_eq!(lldp.commands, vec!["show lldp neighbors detail".to_string()]);
        // 其餘預設項目保留
        assert!(map.get("juniper_junos", "bgp_session").is_some());
    }

    #[test]
    fn test_missing_env_var_is_config_error() {
        let env = env_of(&[]);
        let err = TomlConfig::from_toml_str_with_env(INVENTORY, &env).unwrap_err();
        assert!(err.to_string().contains("NET_PASSWORD"));
    }

    #[test]
    fn test_empty_inventory_fails_validation() {
        let env = env_of(&[]);
        let config = TomlConfig::from_toml_str_with_env("concurrency = 1\n", &env).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(
                br#"
[[devices]]
host = "asa-fw-01"
device_type = "cisco_asa"
collectors = ["vpn_session"]
"#,
            )
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.devices[0].host, "asa-fw-01");
        assert_eq!(config.output_format(), OutputFormat::Influx);
        assert_eq!(config.output_path(), None);
    }
}
