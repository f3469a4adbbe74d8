pub mod toml_config;

use crate::core::commander::{default_executor_map, ExecutorMap};
use crate::core::connector::{create_connector, DeviceTarget};
use crate::core::ConfigProvider;
use crate::domain::model::OutputFormat;
use crate::utils::error::{CollectorError, Result};
use crate::utils::validation::{self, Validate};
use clap::Parser;
pub use toml_config::TomlConfig;

#[derive(Debug, Clone, Parser)]
#[command(name = "netcollector")]
#[command(about = "Collect BGP, LLDP, interface and VPN state from network devices")]
pub struct CliConfig {
    /// Device hostname or IP address
    #[arg(long)]
    pub host: Option<String>,

    /// Device type, e.g. cisco_ios, cisco_xe, cisco_asa, juniper_junos
    #[arg(long)]
    pub device_type: Option<String>,

    #[arg(long, value_delimiter = ',')]
    pub collectors: Vec<String>,

    /// Keep sessions open between collection rounds
    #[arg(long)]
    pub persist: bool,

    #[arg(long, env = "COLLECTOR_USER")]
    pub username: Option<String>,

    #[arg(long, env = "COLLECTOR_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// TOML inventory; replaces --host/--device-type/--collectors
    #[arg(long)]
    pub config: Option<String>,

    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Output directory; metrics go to stdout when omitted
    #[arg(long)]
    pub output: Option<String>,

    /// Repeat collection every N seconds until Ctrl-C
    #[arg(long)]
    pub interval: Option<u64>,

    /// Directory of extra Junos table definitions (<module>.toml)
    #[arg(long)]
    pub tables_dir: Option<String>,

    #[arg(long, default_value = "4")]
    pub concurrency: usize,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[arg(long, help = "Print the planned commands and exit")]
    pub dry_run: bool,
}

impl CliConfig {
    /// 有 `--config` 時以 TOML 為主，命令列參數覆寫輸出相關設定
    pub fn provider(&self) -> Result<Box<dyn ConfigProvider>> {
        let Some(path) = &self.config else {
            return Ok(Box::new(self.clone()));
        };

        let mut toml = TomlConfig::from_file(path)?;
        if let Some(format) = self.format {
            toml.output.format = format;
        }
        if self.output.is_some() {
            toml.output.path = self.output.clone();
        }
        if self.interval.is_some() {
            toml.interval = self.interval;
        }
        if self.tables_dir.is_some() {
            toml.tables_dir = self.tables_dir.clone();
        }
        toml.validate()?;
        Ok(Box::new(toml))
    }
}

impl ConfigProvider for CliConfig {
    fn devices(&self) -> Result<Vec<DeviceTarget>> {
        let host = validation::validate_required_field("host", &self.host)?;
        let device_type = validation::validate_required_field("device_type", &self.device_type)?;
        let connector = create_connector(
            host,
            device_type,
            self.persist,
            self.username.as_deref(),
            self.password.as_deref(),
        )?;
        Ok(vec![DeviceTarget {
            connector,
            collectors: self.collectors.clone(),
        }])
    }

    fn output_format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }

    fn output_path(&self) -> Option<&str> {
        self.output.as_deref()
    }

    fn concurrency(&self) -> usize {
        self.concurrency
    }

    fn interval_seconds(&self) -> Option<u64> {
        self.interval
    }

    fn tables_dir(&self) -> Option<&str> {
        self.tables_dir.as_deref()
    }

    fn executor_map(&self) -> Result<ExecutorMap> {
        Ok(default_executor_map())
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(path) = &self.config {
            return validation::validate_path("config", path);
        }

        let host = validation::validate_required_field("host", &self.host)?;
        validation::validate_host("host", host)?;
        let device_type = validation::validate_required_field("device_type", &self.device_type)?;
        validation::validate_non_empty_string("device_type", device_type)?;

        if self.collectors.is_empty() {
            return Err(CollectorError::MissingConfigError {
                field: "collectors".to_string(),
            });
        }
        if let Some(path) = &self.output {
            validation::validate_path("output", path)?;
        }
        if let Some(interval) = self.interval {
            validation::validate_positive_number("interval", interval, 1)?;
        }
        validation::validate_positive_number("concurrency", self.concurrency as u64, 1)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> CliConfig {
        let mut argv = vec!["netcollector"];
        argv.extend_from_slice(args);
        CliConfig::parse_from(argv)
    }

    #[test]
    fn test_single_device_flags() {
        let config = parse(&[
            "--host",
            "10.1.1.1",
            "--device-type",
            "cisco_ios",
            "--collectors",
            "bgp_session,lldp_neighbors",
            "--username",
            "admin",
            "--password",
            "pw",
            "--format",
            "json",
        ]);
        config.validate().unwrap();

        assert_eq!(config.collectors, vec!["bgp_session", "lldp_neighbors"]);
        assert_eq!(config.output_format(), OutputFormat::Json);
        assert_eq!(config.output_path(), None);

        let devices = config.devices().unwrap();
        assert_eq!(devices[0].connector.host, "10.1.1.1");
        assert_eq!(devices[0].connector.username, "admin");
    }

    #[test]
    fn test_missing_host_fails_validation() {
        let config = parse(&["--device-type", "cisco_ios", "--collectors", "bgp_session"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_with_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"
[output]
format = "json"

[[devices]]
host = "r1"
device_type = "cisco_ios"
collectors = ["interface"]
username = "u"
password = "p"
"#,
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = parse(&["--config", &path, "--format", "influx", "--output", "/tmp/m"]);
        config.validate().unwrap();

        let provider = config.provider().unwrap();
        assert_eq!(provider.output_format(), OutputFormat::Influx);
        assert_eq!(provider.output_path(), Some("/tmp/m"));
        assert_eq!(provider.devices().unwrap()[0].collectors, vec!["interface"]);
    }
}
