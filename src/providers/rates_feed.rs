use crate::core::config::RatesConfig;
use crate::core::error::{DecodeError, FetchError};
use crate::core::record::{ExchangeRate, parse_feed_date};
use crate::core::source::{Batch, Source};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

/// Exchange-rate feed served as a JSON array over HTTP.
pub struct RatesFeed {
    url: String,
    timeout: Duration,
    strict_dates: bool,
}

impl RatesFeed {
    pub fn new(config: &RatesConfig) -> Self {
        RatesFeed {
            url: config.url.clone(),
            timeout: config.timeout(),
            strict_dates: config.strict_dates,
        }
    }
}

/// One feed entry. Every value arrives as a string; field names are accepted
/// in both the lower and capitalized spellings the feed has used.
#[derive(Debug, Deserialize)]
struct FeedEntry {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default, alias = "Code")]
    code: String,
    #[serde(alias = "Ccy")]
    ccy: String,
    #[serde(default, rename = "ccyNm_RU", alias = "CcyNm_RU")]
    name_ru: String,
    #[serde(default, rename = "ccyNm_UZ", alias = "CcyNm_UZ")]
    name_uz: String,
    #[serde(default, rename = "ccyNm_UZC", alias = "CcyNm_UZC")]
    name_uzc: String,
    #[serde(default, rename = "ccyNm_EN", alias = "CcyNm_EN")]
    name_en: String,
    #[serde(default, alias = "Nominal")]
    nominal: String,
    #[serde(alias = "Rate")]
    rate: String,
    #[serde(default, alias = "Diff")]
    diff: String,
    #[serde(rename = "Date", alias = "date")]
    date: String,
}

#[async_trait]
impl Source for RatesFeed {
    type Record = ExchangeRate;

    fn name(&self) -> &str {
        "rates feed"
    }

    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        debug!("Requesting exchange rates from {}", self.url);
        let transport = |source| FetchError::Transport {
            url: self.url.clone(),
            source,
        };

        let client = reqwest::Client::builder()
            .user_agent(concat!("ratesync/", env!("CARGO_PKG_VERSION")))
            .timeout(self.timeout)
            .build()
            .map_err(transport)?;
        let response = client.get(&self.url).send().await.map_err(transport)?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: self.url.clone(),
                status: response.status(),
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        debug!("Received {} bytes from {}", body.len(), self.url);
        Ok(body.to_vec())
    }

    fn decode(&self, raw: &[u8]) -> Result<Batch<ExchangeRate>, DecodeError> {
        let values: Vec<serde_json::Value> = serde_json::from_slice(raw)?;
        let entries: Vec<Result<FeedEntry, serde_json::Error>> =
            values.into_iter().map(serde_json::from_value).collect();

        // Entries without an id get the smallest id no other entry claims
        let explicit_ids: HashSet<i64> = entries
            .iter()
            .filter_map(|entry| entry.as_ref().ok().and_then(|e| e.id))
            .collect();
        let mut last_generated = 0;
        let mut generate_id = || loop {
            last_generated += 1;
            if !explicit_ids.contains(&last_generated) {
                break last_generated;
            }
        };

        let mut batch = Batch::new();
        let mut seen_ids = HashSet::new();

        for (index, entry) in entries.into_iter().enumerate() {
            let position = index + 1;

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(position, "Skipping malformed rate entry: {e}");
                    batch.skip(position, format!("malformed entry: {e}"));
                    continue;
                }
            };
            let id = entry.id.unwrap_or_else(&mut generate_id);

            let date = match parse_feed_date(&entry.date) {
                Ok(date) => date,
                Err(source) if self.strict_dates => {
                    return Err(DecodeError::InvalidDate {
                        id,
                        value: entry.date,
                        source,
                    });
                }
                Err(e) => {
                    warn!(position, id, "Skipping rate entry with invalid date '{}': {e}", entry.date);
                    batch.skip(position, format!("invalid date '{}'", entry.date));
                    continue;
                }
            };

            let rate = match entry.rate.trim().parse::<f64>() {
                Ok(rate) if rate.is_finite() => rate,
                _ => {
                    warn!(position, id, "Skipping rate entry with invalid rate '{}'", entry.rate);
                    batch.skip(position, format!("invalid rate '{}'", entry.rate));
                    continue;
                }
            };

            // Only accepted entries claim their id
            if !seen_ids.insert(id) {
                warn!(position, id, "Skipping rate entry with duplicate id");
                batch.skip(position, format!("duplicate id {id}"));
                continue;
            }

            batch.records.push(ExchangeRate {
                id,
                code: entry.code,
                currency: entry.ccy,
                name_ru: entry.name_ru,
                name_uz: entry.name_uz,
                name_uzc: entry.name_uzc,
                name_en: entry.name_en,
                nominal: entry.nominal,
                rate,
                diff: entry.diff,
                date,
            });
        }

        debug!(
            decoded = batch.records.len(),
            skipped = batch.skipped.len(),
            "Decoded rates feed"
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = r#"[
        {"id": 69, "Code": "840", "Ccy": "USD", "CcyNm_RU": "Доллар США", "CcyNm_UZ": "AQSH dollari",
         "CcyNm_UZC": "АҚШ доллари", "CcyNm_EN": "US Dollar", "Nominal": "1", "Rate": "12300.50",
         "Diff": "-12.3", "Date": "01.01.2024"},
        {"id": 21, "Code": "978", "Ccy": "EUR", "CcyNm_EN": "Euro", "Nominal": "1", "Rate": "13400.10",
         "Diff": "5.2", "Date": "01.01.2024"}
    ]"#;

    fn feed(url: &str, strict_dates: bool) -> RatesFeed {
        RatesFeed::new(&RatesConfig {
            url: url.to_string(),
            timeout_secs: 5,
            strict_dates,
        })
    }

    async fn create_feed_mock_server(body: &str, status_code: u16) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/"))
            .respond_with(ResponseTemplate::new(status_code).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    #[tokio::test]
    async fn test_fetch_and_decode_feed() {
        let mock_server = create_feed_mock_server(FEED, 200).await;
        let source = feed(&format!("{}/json/", mock_server.uri()), true);

        let raw = source.fetch().await.unwrap();
        let batch = source.decode(&raw).unwrap();

        assert_eq!(batch.len(), 2);
        assert!(batch.skipped.is_empty());

        let usd = &batch.records[0];
        assert_eq!(usd.id, 69);
        assert_eq!(usd.code, "840");
        assert_eq!(usd.currency, "USD");
        assert_eq!(usd.name_ru, "Доллар США");
        assert_eq!(usd.name_en, "US Dollar");
        assert_eq!(usd.rate, 12300.5);
        assert_eq!(usd.diff, "-12.3");
        assert_eq!(usd.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

        let eur = &batch.records[1];
        assert_eq!(eur.currency, "EUR");
        assert_eq!(eur.name_uz, "");
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let mock_server = create_feed_mock_server("Server Error", 500).await;
        let source = feed(&format!("{}/json/", mock_server.uri()), true);

        let err = source.fetch().await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::Status { status, .. } if status.as_u16() == 500
        ));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(FEED)
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let source = RatesFeed {
            url: format!("{}/json/", mock_server.uri()),
            timeout: Duration::from_millis(200),
            strict_dates: true,
        };
        let err = source.fetch().await.unwrap_err();
        match err {
            FetchError::Transport { source, .. } => assert!(source.is_timeout()),
            other => panic!("Expected a transport error, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_lowercase_example_without_id() {
        let raw = br#"[{"code":"001", "ccy":"USD", "rate":"12300.50", "Date":"01.01.2024"}]"#;
        let batch = feed("http://unused", true).decode(raw).unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(batch.records[0].id, 1);
        assert_eq!(batch.records[0].code, "001");
        assert_eq!(batch.records[0].rate, 12300.5);
    }

    #[test]
    fn test_decode_rejects_non_array_body() {
        let err = feed("http://unused", true)
            .decode(br#"{"error": "maintenance"}"#)
            .unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn test_decode_skips_invalid_rate_and_duplicates() {
        let raw = br#"[
            {"id": 1, "Ccy": "USD", "Rate": "12300.50", "Date": "01.01.2024"},
            {"id": 2, "Ccy": "EUR", "Rate": "n/a", "Date": "01.01.2024"},
            {"id": 1, "Ccy": "RUB", "Rate": "140.20", "Date": "01.01.2024"},
            {"id": 3, "Ccy": "GBP", "Date": "01.01.2024"},
            {"id": 4, "Ccy": "JPY", "Rate": "85.1", "Date": "01.01.2024"}
        ]"#;
        let batch = feed("http://unused", true).decode(raw).unwrap();

        let currencies: Vec<_> = batch.records.iter().map(|r| r.currency.as_str()).collect();
        assert_eq!(currencies, vec!["USD", "JPY"]);

        let positions: Vec<_> = batch.skipped.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![2, 3, 4]);
        assert_eq!(batch.skipped[0].reason, "invalid rate 'n/a'");
        assert_eq!(batch.skipped[1].reason, "duplicate id 1");
    }

    #[test]
    fn test_decode_bad_date_aborts_batch_when_strict() {
        let raw = br#"[
            {"id": 1, "Ccy": "USD", "Rate": "12300.50", "Date": "01.01.2024"},
            {"id": 2, "Ccy": "EUR", "Rate": "13400.10", "Date": "2024-01-01"}
        ]"#;
        let err = feed("http://unused", true).decode(raw).unwrap_err();

        match err {
            DecodeError::InvalidDate { id, value, .. } => {
                assert_eq!(id, 2);
                assert_eq!(value, "2024-01-01");
            }
            other => panic!("Expected an invalid date error, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_bad_date_skipped_when_lenient() {
        let raw = br#"[
            {"id": 1, "Ccy": "USD", "Rate": "12300.50", "Date": "01.01.2024"},
            {"id": 2, "Ccy": "EUR", "Rate": "13400.10", "Date": "2024-01-01"}
        ]"#;
        let batch = feed("http://unused", false).decode(raw).unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.skipped[0].position, 2);
    }

    #[test]
    fn test_decode_bad_date_wins_over_other_entry_errors_when_strict() {
        let bad_rate = br#"[
            {"id": 1, "Ccy": "USD", "Rate": "12300.50", "Date": "01.01.2024"},
            {"id": 2, "Ccy": "EUR", "Rate": "n/a", "Date": "garbage"}
        ]"#;
        let err = feed("http://unused", true).decode(bad_rate).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidDate { id: 2, .. }));

        let reused_id = br#"[
            {"id": 1, "Ccy": "USD", "Rate": "12300.50", "Date": "01.01.2024"},
            {"id": 1, "Ccy": "EUR", "Rate": "13400.10", "Date": "also-garbage"}
        ]"#;
        let err = feed("http://unused", true).decode(reused_id).unwrap_err();
        match err {
            DecodeError::InvalidDate { id, value, .. } => {
                assert_eq!(id, 1);
                assert_eq!(value, "also-garbage");
            }
            other => panic!("Expected an invalid date error, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_generated_ids_avoid_explicit_ids() {
        let raw = br#"[
            {"Ccy": "USD", "Rate": "12300.50", "Date": "01.01.2024"},
            {"id": 1, "Ccy": "EUR", "Rate": "13400.10", "Date": "01.01.2024"},
            {"Ccy": "RUB", "Rate": "140.20", "Date": "01.01.2024"}
        ]"#;
        let batch = feed("http://unused", true).decode(raw).unwrap();

        assert!(batch.skipped.is_empty());
        let ids: Vec<_> = batch
            .records
            .iter()
            .map(|r| (r.currency.as_str(), r.id))
            .collect();
        assert_eq!(ids, vec![("USD", 2), ("EUR", 1), ("RUB", 3)]);
    }

    #[test]
    fn test_decode_skipped_entry_does_not_claim_its_id() {
        let raw = br#"[
            {"id": 5, "Ccy": "EUR", "Rate": "n/a", "Date": "01.01.2024"},
            {"id": 5, "Ccy": "USD", "Rate": "12300.50", "Date": "01.01.2024"}
        ]"#;
        let batch = feed("http://unused", true).decode(raw).unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(batch.records[0].id, 5);
        assert_eq!(batch.records[0].currency, "USD");
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.skipped[0].position, 1);
        assert_eq!(batch.skipped[0].reason, "invalid rate 'n/a'");
    }
}
