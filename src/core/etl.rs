use crate::core::Pipeline;
use crate::utils::error::{CollectorError, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub struct CollectorEngine<P: Pipeline> {
    name: String,
    pipeline: P,
}

impl<P: Pipeline> CollectorEngine<P> {
    pub fn new(name: impl Into<String>, pipeline: P) -> Self {
        Self {
            name: name.into(),
            pipeline,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// 跑一輪 extract → transform → load，回傳輸出位置
    pub async fn run(&self) -> Result<String> {
        let started = std::time::Instant::now();
        tracing::info!("[{}] starting collection", self.name);

        let commands = self.pipeline.extract().await?;
        tracing::info!("[{}] extracted {} command result(s)", self.name, commands.len());

        let records = self.pipeline.transform(commands).await?;
        tracing::info!("[{}] normalized {} record(s)", self.name, records.len());

        let location = self.pipeline.load(records).await?;
        tracing::info!(
            "[{}] wrote {} in {:.2}s",
            self.name,
            location,
            started.elapsed().as_secs_f64()
        );

        Ok(location)
    }
}

/// Runs every engine once, at most `concurrency` at a time.
///
/// Results come back in the order of `engines`.
pub async fn run_concurrently<P>(
    engines: &[Arc<CollectorEngine<P>>],
    concurrency: usize,
) -> Vec<Result<String>>
where
    P: Pipeline + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (index, engine) in engines.iter().enumerate() {
        let engine = Arc::clone(engine);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            (index, engine.run().await)
        });
    }

    let mut results: Vec<Option<Result<String>>> = engines.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = Some(result),
            Err(e) => tracing::error!("collection task panicked: {}", e),
        }
    }

    results
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| {
                Err(CollectorError::ProcessingError {
                    message: "collection task did not complete".to_string(),
                })
            })
        })
        .collect()
}
