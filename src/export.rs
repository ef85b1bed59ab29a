//! Spreadsheet export of decoded exchange rates

use crate::core::config::SheetLayout;
use crate::core::record::{ExchangeRate, FEED_DATE_FORMAT};
use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub const HEADER: [&str; 6] = ["ID", "Code", "Currency", "Nominal", "Rate", "Date"];

const FLAT_SHEET: &str = "Rates";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write workbook {path}")]
    Workbook {
        path: String,
        #[source]
        source: XlsxError,
    },
}

/// Groups rates into named sheets. Per-date sheets are ordered by date and
/// named after it in feed format.
fn sheets(rates: &[ExchangeRate], layout: SheetLayout) -> Vec<(String, Vec<&ExchangeRate>)> {
    match layout {
        SheetLayout::Flat => vec![(FLAT_SHEET.to_string(), rates.iter().collect())],
        SheetLayout::PerDate => {
            let mut by_date: BTreeMap<NaiveDate, Vec<&ExchangeRate>> = BTreeMap::new();
            for rate in rates {
                by_date.entry(rate.date).or_default().push(rate);
            }
            by_date
                .into_iter()
                .map(|(date, rows)| (date.format(FEED_DATE_FORMAT).to_string(), rows))
                .collect()
        }
    }
}

/// One worksheet cell value.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Number(f64),
    Text(String),
}

/// Cells for one rate, in `HEADER` order.
fn row_cells(rate: &ExchangeRate) -> [Cell; 6] {
    [
        Cell::Number(rate.id as f64),
        Cell::Text(rate.code.clone()),
        Cell::Text(rate.currency.clone()),
        Cell::Text(rate.nominal.clone()),
        Cell::Number(rate.rate),
        Cell::Text(rate.date.format(FEED_DATE_FORMAT).to_string()),
    ]
}

fn write_sheet(
    worksheet: &mut Worksheet,
    name: &str,
    rows: &[&ExchangeRate],
    header_format: &Format,
) -> Result<(), XlsxError> {
    worksheet.set_name(name)?;
    for (col, title) in HEADER.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, header_format)?;
    }

    for (index, rate) in rows.iter().enumerate() {
        let row = index as u32 + 1;
        for (col, cell) in row_cells(rate).iter().enumerate() {
            match cell {
                Cell::Number(value) => worksheet.write_number(row, col as u16, *value)?,
                Cell::Text(value) => worksheet.write_string(row, col as u16, value)?,
            };
        }
    }
    Ok(())
}

/// Writes `rates` to an `.xlsx` workbook at `path` and returns the number of
/// sheets written.
pub fn export_rates(
    rates: &[ExchangeRate],
    path: &Path,
    layout: SheetLayout,
) -> Result<usize, ExportError> {
    let wrap = |source| ExportError::Workbook {
        path: path.display().to_string(),
        source,
    };

    let mut sheets = sheets(rates, layout);
    if sheets.is_empty() {
        sheets.push((FLAT_SHEET.to_string(), Vec::new()));
    }

    let header_format = Format::new().set_bold();
    let mut workbook = Workbook::new();
    for (name, rows) in &sheets {
        let worksheet = workbook.add_worksheet();
        write_sheet(worksheet, name, rows, &header_format).map_err(wrap)?;
    }
    workbook.save(path).map_err(wrap)?;

    info!(
        sheets = sheets.len(),
        rows = rates.len(),
        "Exported rates to {}",
        path.display()
    );
    Ok(sheets.len())
}
