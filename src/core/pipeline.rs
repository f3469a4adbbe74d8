use crate::core::commander::{create_commands, ExecutorMap};
use crate::core::connector::DeviceTarget;
use crate::core::dispatcher::Dispatcher;
use crate::domain::model::{Command, OutputFormat};
use crate::domain::ports::{Pipeline, Storage};
use crate::normalizer::{normalize_data, Record};
use crate::utils::error::{CollectorError, Result};
use serde_json::json;
use std::sync::Arc;

/// 單一設備的 extract / transform / load 流程
pub struct DevicePipeline<S: Storage> {
    target: DeviceTarget,
    executor_map: Arc<ExecutorMap>,
    dispatcher: Dispatcher,
    storage: S,
    format: OutputFormat,
}

impl<S: Storage> DevicePipeline<S> {
    pub fn new(
        target: DeviceTarget,
        executor_map: Arc<ExecutorMap>,
        dispatcher: Dispatcher,
        storage: S,
        format: OutputFormat,
    ) -> Self {
        Self {
            target,
            executor_map,
            dispatcher,
            storage,
            format,
        }
    }

    pub fn host(&self) -> &str {
        &self.target.connector.host
    }

    /// 關閉保留中的 session（persist 模式）
    pub async fn close(&self) -> Result<()> {
        self.dispatcher.close().await?;
        Ok(())
    }

    pub fn output_name(&self) -> String {
        format!("{}.{}", self.host(), self.format.extension())
    }

    /// Renders records in the configured format, one timestamp per batch.
    ///
    /// Line protocol needs at least one field, so records without any field
    /// value are left out of the influx output.
    pub fn render(&self, records: &[Record], timestamp: chrono::DateTime<chrono::Utc>) -> Result<String> {
        match self.format {
            OutputFormat::Influx => {
                let nanos = timestamp.timestamp_nanos_opt();
                let mut out = String::new();
                for record in records {
                    let mut metric = record.influx_metric().with_timestamp(nanos);
                    if !metric.has_fields() {
                        tracing::warn!(
                            "[{}] skipping {} record without fields",
                            self.host(),
                            record.measurement()
                        );
                        continue;
                    }
                    metric.tags.insert(0, ("device".to_string(), self.host().to_string()));
                    out.push_str(&metric.to_line_protocol());
                    out.push('\n');
                }
                Ok(out)
            }
            OutputFormat::Json => {
                let document = json!({
                    "device": self.host(),
                    "device_type": self.target.connector.device_type,
                    "timestamp": timestamp.to_rfc3339(),
                    "records": records,
                });
                let mut out = serde_json::to_string_pretty(&document)?;
                out.push('\n');
                Ok(out)
            }
        }
    }
}

/// 依 collector 分組，保留第一次出現的順序
fn group_by_collector(commands: Vec<Command>) -> Vec<(String, Vec<Command>)> {
    let mut groups: Vec<(String, Vec<Command>)> = Vec::new();
    for command in commands {
        match groups.iter_mut().find(|(name, _)| *name == command.collector) {
            Some((_, group)) => group.push(command),
            None => groups.push((command.collector.clone(), vec![command])),
        }
    }
    groups
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for DevicePipeline<S> {
    async fn extract(&self) -> Result<Vec<Command>> {
        let connector = &self.target.connector;
        let commands = create_commands(
            &connector.device_type,
            &self.target.collectors,
            &self.executor_map,
        )?;
        tracing::debug!(
            "[{}] planned {} command(s) for {:?}",
            connector.host,
            commands.len(),
            self.target.collectors
        );

        let commands = self.dispatcher.dispatch(commands, connector).await?;
        Ok(commands)
    }

    async fn transform(&self, commands: Vec<Command>) -> Result<Vec<Record>> {
        let connector = &self.target.connector;
        let mut records = Vec::new();
        let mut failures = Vec::new();

        for (collector, group) in group_by_collector(commands) {
            match normalize_data(&group, connector) {
                Ok(mut normalized) => {
                    tracing::debug!(
                        "[{}] {} produced {} record(s)",
                        connector.host,
                        collector,
                        normalized.len()
                    );
                    records.append(&mut normalized);
                }
                Err(e) => {
                    tracing::error!("[{}] {} failed: {}", connector.host, collector, e);
                    failures.push(e);
                }
            }
        }

        // 全部 collector 都失敗時才回傳錯誤
        if records.is_empty() {
            if let Some(first) = failures.into_iter().next() {
                return Err(CollectorError::NormalizeError(first));
            }
        }
        Ok(records)
    }

    async fn load(&self, records: Vec<Record>) -> Result<String> {
        let output = self.render(&records, chrono::Utc::now())?;
        let name = self.output_name();
        self.storage.write_file(&name, output.as_bytes()).await?;
        Ok(name)
    }
}
