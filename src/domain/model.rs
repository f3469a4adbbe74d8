use serde::{Deserialize, Serialize};
use std::fmt;

/// 執行指令所使用的驅動類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Executor {
    /// 透過 SSH 互動式 CLI 執行 show 指令
    Cli,
    /// 透過 NETCONF 執行 RPC
    Netconf,
}

impl fmt::Display for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Executor::Cli => write!(f, "cli"),
            Executor::Netconf => write!(f, "netconf"),
        }
    }
}

/// CLI 輸出的解析方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// 不解析，保留原始文字
    #[default]
    Raw,
    /// 每列一筆扁平紀錄
    Tabular,
    /// 以物件名稱為 key 的巢狀文件
    Structured,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandParams {
    #[serde(default)]
    pub parse: ParseMode,
    /// Junos table 名稱，例如 `NtcBgpTable`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
}

impl CommandParams {
    pub fn tabular() -> Self {
        Self {
            parse: ParseMode::Tabular,
            table: None,
        }
    }

    pub fn structured() -> Self {
        Self {
            parse: ParseMode::Structured,
            table: None,
        }
    }

    pub fn table(name: &str) -> Self {
        Self {
            parse: ParseMode::Raw,
            table: Some(name.to_string()),
        }
    }
}

/// 要在設備上執行的單一指令及其結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub executor: Executor,
    pub collector: String,
    pub command: String,
    #[serde(default)]
    pub params: CommandParams,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

impl Command {
    /// 結果是否為空（None、空字串、空陣列或空物件）
    pub fn has_result(&self) -> bool {
        match &self.result {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::String(s)) => !s.is_empty(),
            Some(serde_json::Value::Array(a)) => !a.is_empty(),
            Some(serde_json::Value::Object(o)) => !o.is_empty(),
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::Number(_)) => true,
        }
    }
}

/// 某 (device_type, collector) 組合要執行的指令
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    pub executor: Executor,
    pub commands: Vec<String>,
    #[serde(default)]
    pub params: CommandParams,
}

/// metrics 輸出格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Influx,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Influx => "lp",
            OutputFormat::Json => "json",
        }
    }
}
