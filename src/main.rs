use anyhow::Context;
use clap::Parser;
use netcollector::core::commander::{create_commands, ExecutorMap};
use netcollector::core::connector::DeviceTarget;
use netcollector::core::dispatcher::{CliAdapter, Dispatcher, NetconfAdapter};
use netcollector::core::etl::run_concurrently;
use netcollector::core::tables::TableRegistry;
use netcollector::core::{ConfigProvider, Storage};
use netcollector::domain::model::OutputFormat;
use netcollector::utils::error::{CollectorError, ErrorSeverity};
use netcollector::utils::{logger, validation::Validate};
use netcollector::{
    CliConfig, CollectorEngine, DevicePipeline, LocalStorage, SshNetconfConnector, StdoutStorage,
    SystemSshConnector,
};
use std::sync::Arc;
use std::time::Duration;

fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low => 0,      // 警告，但成功
        ErrorSeverity::Medium => 2,   // 連線錯誤，可重試
        ErrorSeverity::High => 1,     // 設定或處理錯誤
        ErrorSeverity::Critical => 3, // 系統錯誤
    }
}

fn report(context: &str, e: &CollectorError) {
    tracing::error!(
        "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
        context,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
}

fn fail(context: &str, e: CollectorError) -> ! {
    report(context, &e);
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(exit_code(e.severity()).max(1));
}

fn print_plan(devices: &[DeviceTarget], executor_map: &ExecutorMap) -> Result<(), CollectorError> {
    for device in devices {
        let connector = &device.connector;
        let commands = create_commands(&connector.device_type, &device.collectors, executor_map)?;
        for command in commands {
            let table = command.params.table.as_deref().unwrap_or("-");
            println!(
                "{}\t{}\t{}\t{}\t{}",
                connector.host, command.collector, command.executor, command.command, table
            );
        }
    }
    Ok(())
}

fn system_dispatcher(tables: &Arc<TableRegistry>) -> Dispatcher {
    Dispatcher::new(
        CliAdapter::new(Arc::new(SystemSshConnector::default())),
        NetconfAdapter::new(Arc::new(SshNetconfConnector::default()), Arc::clone(tables)),
    )
}

/// 依設定的間隔重複收集，回傳最後一輪最嚴重的錯誤
async fn collect<S>(
    devices: Vec<DeviceTarget>,
    storage: S,
    format: OutputFormat,
    executor_map: Arc<ExecutorMap>,
    tables: Arc<TableRegistry>,
    concurrency: usize,
    interval: Option<u64>,
) -> Option<CollectorError>
where
    S: Storage + Clone + 'static,
{
    let engines: Vec<Arc<CollectorEngine<DevicePipeline<S>>>> = devices
        .into_iter()
        .map(|device| {
            let host = device.connector.host.clone();
            let pipeline = DevicePipeline::new(
                device,
                Arc::clone(&executor_map),
                system_dispatcher(&tables),
                storage.clone(),
                format,
            );
            Arc::new(CollectorEngine::new(host, pipeline))
        })
        .collect();

    let mut round: u64 = 0;
    let worst = loop {
        round += 1;
        tracing::info!("Collection round {} for {} device(s)", round, engines.len());

        let mut worst: Option<CollectorError> = None;
        let results = run_concurrently(&engines, concurrency).await;
        for (engine, result) in engines.iter().zip(results) {
            if let Err(e) = result {
                report(engine.name(), &e);
                if worst.as_ref().is_none_or(|w| e.severity() > w.severity()) {
                    worst = Some(e);
                }
            }
        }

        let Some(seconds) = interval else { break worst };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping collection");
                break worst;
            }
            _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
        }
    };

    for engine in &engines {
        if let Err(e) = engine.pipeline().close().await {
            tracing::warn!("[{}] closing sessions: {}", engine.name(), e);
        }
    }
    worst
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    if config.log_json {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting netcollector");
    tracing::debug!("CLI config: {:?}", config);

    if let Err(e) = config.validate() {
        fail("Configuration validation", e);
    }

    let provider = config
        .provider()
        .unwrap_or_else(|e| fail("Loading configuration", e));
    let devices = provider
        .devices()
        .unwrap_or_else(|e| fail("Building device targets", e));
    let executor_map = Arc::new(
        provider
            .executor_map()
            .unwrap_or_else(|e| fail("Building executor map", e)),
    );

    if config.dry_run {
        if let Err(e) = print_plan(&devices, &executor_map) {
            fail("Planning commands", e);
        }
        return Ok(());
    }

    let mut tables = TableRegistry::builtin().context("loading built-in Junos tables")?;
    if let Some(dir) = provider.tables_dir() {
        let loaded = tables
            .load_dir(dir)
            .with_context(|| format!("loading Junos tables from {}", dir))?;
        tracing::info!("Loaded {} custom table module(s) from {}", loaded, dir);
    }
    let tables = Arc::new(tables);

    let format = provider.output_format();
    let concurrency = provider.concurrency();
    let interval = provider.interval_seconds();

    let worst = match provider.output_path() {
        Some(path) => {
            let storage = LocalStorage::new(path);
            collect(devices, storage, format, executor_map, tables, concurrency, interval).await
        }
        None => {
            collect(devices, StdoutStorage, format, executor_map, tables, concurrency, interval)
                .await
        }
    };

    if let Some(e) = worst {
        eprintln!("❌ {}", e.user_friendly_message());
        let code = exit_code(e.severity());
        if code > 0 {
            std::process::exit(code);
        }
    }

    Ok(())
}
