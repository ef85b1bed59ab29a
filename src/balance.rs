//! Converted balance recomputation

use crate::core::config::{ConversionConfig, ConversionStrategy};
use crate::core::error::StoreError;
use crate::core::record::RateTable;
use crate::core::store::Store;
use futures::future::join_all;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSummary {
    pub strategy: ConversionStrategy,
    pub rows_updated: u64,
}

/// Recomputes `converted_balance = balance * rate` for every stored user.
///
/// The base currency converts with rate 1. Users whose currency has no stored
/// rate keep their current converted balance.
pub async fn recompute(
    store: &dyn Store,
    config: &ConversionConfig,
) -> Result<ConversionSummary, StoreError> {
    let rows_updated = match config.strategy {
        ConversionStrategy::PerCurrency => {
            // Rates come oldest first, so the newest rate per currency wins
            let mut table = RateTable::from_rates(&store.rates().await?);
            table.insert(&config.base_currency, 1.0);
            debug!(currencies = table.len(), "Applying rates per currency");

            let updates = table
                .iter()
                .map(|(currency, rate)| store.apply_rate(currency, rate));

            let mut rows = 0;
            for result in join_all(updates).await {
                rows += result?;
            }
            rows
        }
        ConversionStrategy::SingleStatement => {
            store.convert_balances(&config.base_currency).await?
        }
    };

    info!(
        strategy = ?config.strategy,
        rows_updated,
        "Recomputed converted balances"
    );
    Ok(ConversionSummary {
        strategy: config.strategy,
        rows_updated,
    })
}
