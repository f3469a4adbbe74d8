//! Connection parameters for the device drivers.

use crate::utils::error::{CollectorError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_TIMEOUT: u64 = 60;
pub const DEFAULT_KEEPALIVE: u64 = 10;
pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_NETCONF_PORT: u16 = 830;

/// 不會被 Debug/Display 印出的敏感字串
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "Secret(\"\")")
        } else {
            write!(f, "Secret(\"**********\")")
        }
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            Ok(())
        } else {
            write!(f, "**********")
        }
    }
}

/// Connection and device parameters handed to every driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectParams {
    pub host: String,
    pub device_type: String,
    pub persist: bool,
    pub username: String,
    pub password: Secret,
    #[serde(default)]
    pub secret: Option<Secret>,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_keepalive")]
    pub keepalive: u64,
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,
    #[serde(default = "default_netconf_port")]
    pub netconf_port: u16,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT
}

fn default_keepalive() -> u64 {
    DEFAULT_KEEPALIVE
}

fn default_ssh_port() -> u16 {
    DEFAULT_SSH_PORT
}

fn default_netconf_port() -> u16 {
    DEFAULT_NETCONF_PORT
}

impl Validate for ConnectParams {
    fn validate(&self) -> Result<()> {
        validation::validate_host("host", &self.host)?;
        validation::validate_non_empty_string("device_type", &self.device_type)?;
        validation::validate_positive_number("timeout", self.timeout, 1)?;
        validation::validate_positive_number("ssh_port", u64::from(self.ssh_port), 1)?;
        validation::validate_positive_number("netconf_port", u64::from(self.netconf_port), 1)?;
        Ok(())
    }
}

/// 一台設備及要在其上執行的 collectors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTarget {
    pub connector: ConnectParams,
    pub collectors: Vec<String>,
}

/// 環境變數來源，方便測試時注入
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

impl<F> EnvSource for F
where
    F: Fn(&str) -> Option<String>,
{
    fn var(&self, key: &str) -> Option<String> {
        self(key)
    }
}

fn env_number<T: std::str::FromStr>(env: &dyn EnvSource, key: &str, default: T) -> Result<T> {
    match env.var(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| CollectorError::InvalidConfigValueError {
                field: key.to_string(),
                value: raw.clone(),
                reason: "Expected a positive integer".to_string(),
            }),
    }
}

/// Creates the connection parameters used to reach a device.
///
/// `username` and `password` fall back to `COLLECTOR_USER` and
/// `COLLECTOR_PASSWORD`. The enable secret comes from `COLLECTOR_SECRET`
/// and defaults to the resolved password. Timeouts and ports come from
/// `COLLECTOR_TIMEOUT`, `COLLECTOR_KEEPALIVE`, `COLLECTOR_SSH_PORT` and
/// `COLLECTOR_NETCONF_PORT`.
pub fn create_connector(
    host: &str,
    device_type: &str,
    persist: bool,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<ConnectParams> {
    let process_env = |key: &str| std::env::var(key).ok();
    create_connector_with_env(host, device_type, persist, username, password, &process_env)
}

pub fn create_connector_with_env(
    host: &str,
    device_type: &str,
    persist: bool,
    username: Option<&str>,
    password: Option<&str>,
    env: &dyn EnvSource,
) -> Result<ConnectParams> {
    let password = match password {
        Some(p) => p.to_string(),
        None => env.var("COLLECTOR_PASSWORD").unwrap_or_default(),
    };
    let username = match username {
        Some(u) => u.to_string(),
        None => env.var("COLLECTOR_USER").unwrap_or_default(),
    };
    let secret = env.var("COLLECTOR_SECRET").unwrap_or_else(|| password.clone());

    Ok(ConnectParams {
        host: host.to_string(),
        device_type: device_type.to_string(),
        persist,
        username,
        password: Secret::new(password),
        secret: Some(Secret::new(secret)),
        timeout: env_number(env, "COLLECTOR_TIMEOUT", DEFAULT_TIMEOUT)?,
        keepalive: env_number(env, "COLLECTOR_KEEPALIVE", DEFAULT_KEEPALIVE)?,
        ssh_port: env_number(env, "COLLECTOR_SSH_PORT", DEFAULT_SSH_PORT)?,
        netconf_port: env_number(env, "COLLECTOR_NETCONF_PORT", DEFAULT_NETCONF_PORT)?,
    })
}
