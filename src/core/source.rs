//! Input source abstraction for the sync pipeline

use crate::core::error::{DecodeError, FetchError};
use crate::core::record::Record;
use async_trait::async_trait;

/// An input entry the decoder dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Skipped {
    /// 1-based position of the entry in the input.
    pub position: usize,
    pub reason: String,
}

/// The records produced by one decode pass.
#[derive(Debug)]
pub struct Batch<R> {
    pub records: Vec<R>,
    pub skipped: Vec<Skipped>,
}

impl<R> Batch<R> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn skip(&mut self, position: usize, reason: impl Into<String>) {
        self.skipped.push(Skipped {
            position,
            reason: reason.into(),
        });
    }
}

impl<R> Default for Batch<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
pub trait Source: Send + Sync {
    type Record: Record;

    /// Human readable name used in log lines.
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<u8>, FetchError>;

    /// Decodes raw input. Malformed entries are skipped and listed in the
    /// batch; only batch-level problems are returned as errors.
    fn decode(&self, raw: &[u8]) -> Result<Batch<Self::Record>, DecodeError>;
}
