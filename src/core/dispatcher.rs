//! Device drivers: run commands on a device and fill in their results.

use crate::core::connector::ConnectParams;
use crate::core::tables::{table_module, TableError, TableRegistry};
use crate::domain::model::{Command, Executor};
use crate::domain::ports::{CliConnector, CliSession, NetconfConnector, NetconfSession};
use crate::parsers;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Driver failed execution: {0}")]
    Cli(String),

    #[error("Driver failed execution: {0}")]
    Netconf(String),

    #[error("Driver execution failed: {0}")]
    Table(#[from] TableError),
}

#[async_trait]
pub trait Driver: Send + Sync {
    /// 依序執行指令並把結果寫回 `Command.result`
    async fn execute(
        &self,
        commands: &mut [Command],
        connector: &ConnectParams,
    ) -> Result<(), DriverError>;

    /// 關閉保留中的 session
    async fn close(&self) -> Result<(), DriverError> {
        Ok(())
    }
}

/// SSH CLI driver.
///
/// With `persist` the session stays open between `execute` calls.
pub struct CliAdapter {
    connector: Arc<dyn CliConnector>,
    session: Mutex<Option<Box<dyn CliSession>>>,
}

impl CliAdapter {
    pub fn new(connector: Arc<dyn CliConnector>) -> Self {
        Self {
            connector,
            session: Mutex::new(None),
        }
    }

    async fn run(
        session: &mut dyn CliSession,
        commands: &mut [Command],
        connector: &ConnectParams,
    ) -> Result<(), String> {
        for command in commands.iter_mut() {
            tracing::debug!("[{}] sending '{}'", connector.host, command.command);
            let output = session
                .send_command(&command.command)
                .await
                .map_err(|e| e.to_string())?;

            let parsed = parsers::parse_output(
                &connector.device_type,
                &command.command,
                command.params.parse,
                &output,
            )
            .map_err(|e| e.to_string())?;
            command.result = Some(parsed);
        }
        Ok(())
    }
}

#[async_trait]
impl Driver for CliAdapter {
    async fn execute(
        &self,
        commands: &mut [Command],
        connector: &ConnectParams,
    ) -> Result<(), DriverError> {
        let mut guard = self.session.lock().await;

        if guard.is_none() {
            tracing::debug!(
                "Opening CLI session to {}:{}",
                connector.host,
                connector.ssh_port
            );
            let session = self
                .connector
                .connect(connector)
                .await
                .map_err(|e| DriverError::Cli(e.to_string()))?;
            *guard = Some(session);
        }

        let outcome = match guard.as_mut() {
            Some(session) => Self::run(session.as_mut(), commands, connector).await,
            None => Err("session not available".to_string()),
        };

        // 失敗或不需保留時關閉 session
        if outcome.is_err() || !connector.persist {
            if let Some(mut session) = guard.take() {
                if let Err(e) = session.disconnect().await {
                    tracing::warn!("[{}] disconnect failed: {}", connector.host, e);
                }
            }
        }

        outcome.map_err(DriverError::Cli)
    }

    async fn close(&self) -> Result<(), DriverError> {
        if let Some(mut session) = self.session.lock().await.take() {
            session
                .disconnect()
                .await
                .map_err(|e| DriverError::Cli(e.to_string()))?;
        }
        Ok(())
    }
}

/// NETCONF driver with Junos table support.
pub struct NetconfAdapter {
    connector: Arc<dyn NetconfConnector>,
    tables: Arc<TableRegistry>,
    session: Mutex<Option<Box<dyn NetconfSession>>>,
}

impl NetconfAdapter {
    pub fn new(connector: Arc<dyn NetconfConnector>, tables: Arc<TableRegistry>) -> Self {
        Self {
            connector,
            tables,
            session: Mutex::new(None),
        }
    }

    /// 指令若已是 XML 則原樣送出，否則視為 RPC 名稱
    fn rpc_request(command: &str) -> String {
        let trimmed = command.trim();
        if trimmed.starts_with('<') {
            trimmed.to_string()
        } else {
            format!("<{}/>", trimmed)
        }
    }

    async fn run(
        &self,
        session: &mut dyn NetconfSession,
        commands: &mut [Command],
        connector: &ConnectParams,
    ) -> Result<(), DriverError> {
        for command in commands.iter_mut() {
            match command.params.table.as_deref() {
                Some(table) => {
                    let module = table_module(&command.collector);
                    let definition = self.tables.lookup(module, table)?;
                    tracing::debug!(
                        "[{}] running table {} ({})",
                        connector.host,
                        table,
                        definition.rpc
                    );

                    let reply = session
                        .rpc(&definition.rpc_request())
                        .await
                        .map_err(|e| DriverError::Netconf(e.to_string()))?;
                    let items = definition.evaluate(&reply);
                    command.result = Some(Value::Array(items.iter().map(|i| i.to_json()).collect()));
                }
                None => {
                    tracing::debug!("[{}] running rpc {}", connector.host, command.command);
                    let reply = session
                        .rpc(&Self::rpc_request(&command.command))
                        .await
                        .map_err(|e| DriverError::Netconf(e.to_string()))?;
                    command.result = Some(reply.to_json());
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Driver for NetconfAdapter {
    async fn execute(
        &self,
        commands: &mut [Command],
        connector: &ConnectParams,
    ) -> Result<(), DriverError> {
        let mut guard = self.session.lock().await;

        if guard.is_none() {
            tracing::debug!(
                "Opening NETCONF session to {}:{}",
                connector.host,
                connector.netconf_port
            );
            let session = self
                .connector
                .connect(connector)
                .await
                .map_err(|e| DriverError::Netconf(e.to_string()))?;
            *guard = Some(session);
        }

        let outcome = match guard.as_mut() {
            Some(session) => self.run(session.as_mut(), commands, connector).await,
            None => Err(DriverError::Netconf("session not available".to_string())),
        };

        if outcome.is_err() || !connector.persist {
            if let Some(mut session) = guard.take() {
                if let Err(e) = session.close().await {
                    tracing::warn!("[{}] close-session failed: {}", connector.host, e);
                }
            }
        }

        outcome
    }

    async fn close(&self) -> Result<(), DriverError> {
        if let Some(mut session) = self.session.lock().await.take() {
            session
                .close()
                .await
                .map_err(|e| DriverError::Netconf(e.to_string()))?;
        }
        Ok(())
    }
}

/// Routes commands to the driver of their executor.
pub struct Dispatcher {
    cli: CliAdapter,
    netconf: NetconfAdapter,
}

impl Dispatcher {
    pub fn new(cli: CliAdapter, netconf: NetconfAdapter) -> Self {
        Self { cli, netconf }
    }

    fn driver(&self, executor: Executor) -> &dyn Driver {
        match executor {
            Executor::Cli => &self.cli,
            Executor::Netconf => &self.netconf,
        }
    }

    /// Runs every command and returns them with results, in input order.
    ///
    /// Commands are grouped by executor; each group keeps its relative order.
    pub async fn dispatch(
        &self,
        commands: Vec<Command>,
        connector: &ConnectParams,
    ) -> Result<Vec<Command>, DriverError> {
        let mut executors: Vec<Executor> = Vec::new();
        for command in &commands {
            if !executors.contains(&command.executor) {
                executors.push(command.executor);
            }
        }

        let mut slots: Vec<Option<Command>> = commands.into_iter().map(Some).collect();
        for executor in executors {
            let positions: Vec<usize> = slots
                .iter()
                .enumerate()
                .filter(|(_, slot)| slot.as_ref().is_some_and(|c| c.executor == executor))
                .map(|(i, _)| i)
                .collect();
            let mut group: Vec<Command> = positions.iter().filter_map(|&i| slots[i].take()).collect();

            tracing::debug!(
                "[{}] dispatching {} command(s) to {} driver",
                connector.host,
                group.len(),
                executor
            );
            self.driver(executor).execute(&mut group, connector).await?;

            for (i, command) in positions.into_iter().zip(group) {
                slots[i] = Some(command);
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }

    pub async fn close(&self) -> Result<(), DriverError> {
        self.cli.close().await?;
        self.netconf.close().await
    }
}
