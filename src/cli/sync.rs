use super::ui;
use crate::balance;
use crate::core::config::{AppConfig, ConversionStrategy};
use crate::core::source::Skipped;
use crate::core::store::Store;
use crate::export;
use crate::loader::LoadReport;
use crate::pipeline::Pipeline;
use crate::providers::{RatesFeed, UsersCsv};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

fn print_summary(kind: &str, decoded: usize, skipped: &[Skipped], report: &LoadReport) {
    println!(
        "{}",
        ui::style_text(&format!("Loaded {kind}"), ui::StyleType::Title)
    );
    println!(
        "  {} of {} written",
        ui::style_text(&report.written.to_string(), ui::StyleType::Success),
        decoded
    );

    if !skipped.is_empty() {
        println!(
            "  {}",
            ui::style_text(
                &format!("{} entries skipped while decoding", skipped.len()),
                ui::StyleType::Warning
            )
        );
        for entry in skipped {
            println!(
                "    {}",
                ui::style_text(
                    &format!("#{}: {}", entry.position, entry.reason),
                    ui::StyleType::Subtle
                )
            );
        }
    }

    for failure in &report.failures {
        println!(
            "  {}",
            ui::style_text(
                &format!("{} not written: {}", failure.key, failure.error),
                ui::StyleType::Error
            )
        );
    }
}

/// Creates the tables used by the other commands.
pub async fn init(store: &dyn Store) -> Result<()> {
    store
        .ensure_schema()
        .await
        .context("Failed to create tables")?;
    println!("{}", ui::style_text("Tables are ready", ui::StyleType::Success));
    Ok(())
}

/// Fetches the rates feed, loads it and optionally exports a workbook.
pub async fn rates(
    config: &AppConfig,
    store: Arc<dyn Store>,
    export: Option<PathBuf>,
) -> Result<()> {
    let pipeline = Pipeline::new(store, config.loader.clone());
    let feed = RatesFeed::new(&config.rates);

    let spinner = ui::new_spinner("Fetching exchange rates");
    let batch = pipeline.fetch_and_decode(&feed).await;
    spinner.finish_and_clear();
    let batch = batch.context("Failed to fetch exchange rates")?;

    let export_path = export.or_else(|| config.export.path.clone());
    let snapshot = export_path.as_ref().map(|_| batch.records.clone());
    let decoded = batch.len();

    let spinner = ui::new_spinner("Loading exchange rates");
    let report = pipeline.load(batch.records).await;
    spinner.finish_and_clear();
    let report = report.context("Failed to load exchange rates")?;

    print_summary("exchange rates", decoded, &batch.skipped, &report);

    if let (Some(path), Some(rates)) = (export_path, snapshot) {
        let sheets = export::export_rates(&rates, &path, config.export.layout)
            .context("Failed to export exchange rates")?;
        println!(
            "  Exported {} sheet(s) to {}",
            sheets,
            ui::style_text(&path.display().to_string(), ui::StyleType::Subtle)
        );
    }
    Ok(())
}

/// Loads users from the CSV file given on the command line or in the config.
pub async fn users(
    config: &AppConfig,
    store: Arc<dyn Store>,
    file: Option<PathBuf>,
) -> Result<()> {
    let path = file
        .or_else(|| config.users.csv_path.clone())
        .context("No users CSV configured; pass --file or set users.csv_path")?;

    let pipeline = Pipeline::new(store, config.loader.clone());
    let source = UsersCsv::new(&path);

    let spinner = ui::new_spinner("Loading users");
    let outcome = pipeline.run(&source).await;
    spinner.finish_and_clear();
    let outcome =
        outcome.with_context(|| format!("Failed to load users from {}", path.display()))?;

    print_summary("users", outcome.decoded, &outcome.skipped, &outcome.report);
    Ok(())
}

/// Recomputes converted balances from the stored rates.
pub async fn convert(
    config: &AppConfig,
    store: &dyn Store,
    strategy: Option<ConversionStrategy>,
) -> Result<()> {
    let mut conversion = config.conversion.clone();
    if let Some(strategy) = strategy {
        conversion.strategy = strategy;
    }

    let summary = balance::recompute(store, &conversion)
        .await
        .context("Failed to recompute converted balances")?;

    println!(
        "Updated {} user balance(s) to {}",
        ui::style_text(&summary.rows_updated.to_string(), ui::StyleType::Success),
        conversion.base_currency
    );
    Ok(())
}
