//! Fetch, decode and load, parameterized over the source and the store.

use crate::core::config::LoaderConfig;
use crate::core::error::{LoadError, SyncError};
use crate::core::record::Record;
use crate::core::source::{Batch, Skipped, Source};
use crate::core::store::Store;
use crate::loader::{self, LoadReport};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug)]
pub struct SyncOutcome {
    pub decoded: usize,
    pub skipped: Vec<Skipped>,
    pub report: LoadReport,
}

pub struct Pipeline {
    store: Arc<dyn Store>,
    loader: LoaderConfig,
}

impl Pipeline {
    pub fn new(store: Arc<dyn Store>, loader: LoaderConfig) -> Self {
        Pipeline { store, loader }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub async fn fetch_and_decode<S: Source>(
        &self,
        source: &S,
    ) -> Result<Batch<S::Record>, SyncError> {
        let raw = source.fetch().await?;
        debug!("Fetched {} bytes from {}", raw.len(), source.name());

        let batch = source.decode(&raw)?;
        info!(
            source = source.name(),
            decoded = batch.records.len(),
            skipped = batch.skipped.len(),
            "Decoded batch"
        );
        Ok(batch)
    }

    pub async fn load<R: Record>(&self, records: Vec<R>) -> Result<LoadReport, LoadError> {
        loader::load(records, Arc::clone(&self.store), &self.loader).await
    }

    pub async fn run<S: Source>(&self, source: &S) -> Result<SyncOutcome, SyncError> {
        let batch = self.fetch_and_decode(source).await?;
        let decoded = batch.records.len();
        let report = self.load(batch.records).await?;

        Ok(SyncOutcome {
            decoded,
            skipped: batch.skipped,
            report,
        })
    }
}
