use crate::core::commander::ExecutorMap;
use crate::core::connector::{ConnectParams, DeviceTarget};
use crate::domain::model::{Command, OutputFormat};
use crate::normalizer::Record;
use crate::parsers::xml::XmlNode;
use crate::utils::error::Result;
use async_trait::async_trait;
use thiserror::Error;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn devices(&self) -> Result<Vec<DeviceTarget>>;
    fn output_format(&self) -> OutputFormat;
    fn output_path(&self) -> Option<&str>;
    fn concurrency(&self) -> usize;
    fn interval_seconds(&self) -> Option<u64>;
    fn tables_dir(&self) -> Option<&str>;
    fn executor_map(&self) -> Result<ExecutorMap>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    /// 在設備上執行指令並取得解析後結果
    async fn extract(&self) -> Result<Vec<Command>>;
    /// 將指令結果正規化為資源模型
    async fn transform(&self, commands: Vec<Command>) -> Result<Vec<Record>>;
    /// 輸出 metrics，回傳輸出位置
    async fn load(&self, records: Vec<Record>) -> Result<String>;
}

/// 傳輸層（SSH / NETCONF session）錯誤
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to start transport process: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("timed out after {seconds}s waiting for {waiting_for}")]
    Timeout { seconds: u64, waiting_for: String },

    #[error("session closed by remote end")]
    Closed,

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("rpc error: {0}")]
    Rpc(String),
}

/// 互動式 CLI session
#[async_trait]
pub trait CliSession: Send {
    async fn send_command(&mut self, command: &str) -> std::result::Result<String, TransportError>;
    async fn disconnect(&mut self) -> std::result::Result<(), TransportError>;
}

#[async_trait]
pub trait CliConnector: Send + Sync {
    async fn connect(
        &self,
        params: &ConnectParams,
    ) -> std::result::Result<Box<dyn CliSession>, TransportError>;
}

/// NETCONF session，`request` 為 `<rpc>` 內部的 XML 內容
#[async_trait]
pub trait NetconfSession: Send {
    async fn rpc(&mut self, request: &str) -> std::result::Result<XmlNode, TransportError>;
    async fn close(&mut self) -> std::result::Result<(), TransportError>;
}

#[async_trait]
pub trait NetconfConnector: Send + Sync {
    async fn connect(
        &self,
        params: &ConnectParams,
    ) -> std::result::Result<Box<dyn NetconfSession>, TransportError>;
}
