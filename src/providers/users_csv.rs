use crate::core::error::{DecodeError, FetchError};
use crate::core::record::User;
use crate::core::source::{Batch, Source};
use async_trait::async_trait;
use csv::StringRecord;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const COLUMNS: usize = 6;

/// User list stored as CSV with columns
/// `id, first_name, last_name, email, currency, balance`.
///
/// The id column is ignored and a fresh UUID is generated for every row. There
/// is no header handling: a header row fails the balance parse and is skipped
/// like any other malformed row.
pub struct UsersCsv {
    path: PathBuf,
}

impl UsersCsv {
    pub fn new(path: impl AsRef<Path>) -> Self {
        UsersCsv {
            path: path.as_ref().to_path_buf(),
        }
    }
}

fn parse_row(row: &StringRecord) -> Result<User, String> {
    if row.len() < COLUMNS {
        return Err(format!("expected {COLUMNS} columns, found {}", row.len()));
    }

    let balance = row[5].trim();
    let balance = match balance.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => return Err(format!("invalid balance '{balance}'")),
    };

    Ok(User::new(
        row[1].trim(),
        row[2].trim(),
        row[3].trim(),
        row[4].trim(),
        balance,
    ))
}

#[async_trait]
impl Source for UsersCsv {
    type Record = User;

    fn name(&self) -> &str {
        "users csv"
    }

    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        debug!("Reading users from {}", self.path.display());
        tokio::fs::read(&self.path)
            .await
            .map_err(|source| FetchError::Io {
                path: self.path.clone(),
                source,
            })
    }

    fn decode(&self, raw: &[u8]) -> Result<Batch<User>, DecodeError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(raw);

        let mut batch = Batch::new();
        for (index, result) in reader.byte_records().enumerate() {
            let line = index + 1;
            let row = match StringRecord::from_byte_record(result?) {
                Ok(row) => row,
                Err(e) => {
                    warn!(line, "Skipping user row that is not valid UTF-8: {e}");
                    batch.skip(line, format!("invalid UTF-8: {e}"));
                    continue;
                }
            };

            match parse_row(&row) {
                Ok(user) => batch.records.push(user),
                Err(reason) => {
                    warn!(line, "Skipping user row: {reason}");
                    batch.skip(line, reason);
                }
            }
        }

        debug!(
            decoded = batch.records.len(),
            skipped = batch.skipped.len(),
            "Decoded users csv"
        );
        Ok(batch)
    }
}
