//! Concurrent batch loader.
//!
//! A fixed number of workers drain a queue holding the whole batch and write
//! each record to the shared store. Failed writes go to an error channel sized
//! to the batch; a coordinator task closes it once every worker has exited and
//! the caller drains it. Workers are never cancelled, so every record is
//! attempted even after a failure, and nothing already written is rolled back.

use crate::core::config::{FailurePolicy, LoaderConfig};
use crate::core::error::{LoadError, StoreError};
use crate::core::record::Record;
use crate::core::store::Store;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct RecordFailure {
    pub key: String,
    pub error: StoreError,
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub attempted: usize,
    pub written: usize,
    pub failures: Vec<RecordFailure>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub async fn load<R: Record>(
    records: Vec<R>,
    store: Arc<dyn Store>,
    config: &LoaderConfig,
) -> Result<LoadReport, LoadError> {
    let total = records.len();
    if total == 0 {
        debug!("Nothing to load");
        return Ok(LoadReport::default());
    }
    let workers = config.workers.clamp(1, total);
    debug!(total, workers, "Loading batch");

    let (work_tx, work_rx) = mpsc::channel(total);
    for record in records {
        work_tx
            .send(record)
            .await
            .map_err(|_| LoadError::Worker("work queue closed early".to_string()))?;
    }
    drop(work_tx);

    let queue = Arc::new(Mutex::new(work_rx));
    let written = Arc::new(AtomicUsize::new(0));
    let (err_tx, mut err_rx) = mpsc::channel::<RecordFailure>(total);

    let mut pool = JoinSet::new();
    for worker in 0..workers {
        let queue = Arc::clone(&queue);
        let store = Arc::clone(&store);
        let written = Arc::clone(&written);
        let err_tx = err_tx.clone();

        pool.spawn(async move {
            loop {
                let next = queue.lock().await.recv().await;
                let Some(record) = next else {
                    break;
                };

                match record.write_to(store.as_ref()).await {
                    Ok(()) => {
                        written.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(error) => {
                        let key = record.key();
                        debug!(worker, %key, "Write failed: {error}");
                        // Capacity equals the batch size, so this never blocks
                        let _ = err_tx.send(RecordFailure { key, error }).await;
                    }
                }
            }
        });
    }

    let coordinator = tokio::spawn(async move {
        let mut crashed = Vec::new();
        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                crashed.push(e.to_string());
            }
        }
        drop(err_tx);
        crashed
    });

    let mut failures = Vec::new();
    while let Some(failure) = err_rx.recv().await {
        failures.push(failure);
    }

    let crashed = coordinator
        .await
        .map_err(|e| LoadError::Worker(e.to_string()))?;
    if let Some(reason) = crashed.into_iter().next() {
        return Err(LoadError::Worker(reason));
    }

    let mut report = LoadReport {
        attempted: total,
        written: written.load(Ordering::Relaxed),
        failures,
    };
    info!(
        attempted = report.attempted,
        written = report.written,
        failed = report.failures.len(),
        "Batch load finished"
    );

    match config.policy {
        FailurePolicy::FailFast if !report.is_clean() => {
            let first = report.failures.swap_remove(0);
            Err(LoadError::Write {
                key: first.key,
                source: first.error,
            })
        }
        FailurePolicy::FailFast => Ok(report),
        FailurePolicy::BestEffort => {
            for failure in &report.failures {
                warn!(key = %failure.key, "Record was not written: {}", failure.error);
            }
            Ok(report)
        }
    }
}
