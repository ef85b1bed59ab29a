//! Decoded record types and the rate lookup table

use crate::core::error::StoreError;
use crate::core::store::Store;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use uuid::Uuid;

/// Date format used by the rates feed, e.g. `01.01.2024`.
pub const FEED_DATE_FORMAT: &str = "%d.%m.%Y";

/// Date format used when persisting dates as text.
pub const STORE_DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_feed_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value.trim(), FEED_DATE_FORMAT)
}

/// A decoded unit of input that the loader can persist.
#[async_trait]
pub trait Record: Send + Sync + 'static {
    /// Identifier used when reporting a failed write.
    fn key(&self) -> String;

    async fn write_to(&self, store: &dyn Store) -> Result<(), StoreError>;
}

/// One entry of the exchange-rate feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRate {
    pub id: i64,
    pub code: String,
    pub currency: String,
    pub name_ru: String,
    pub name_uz: String,
    pub name_uzc: String,
    pub name_en: String,
    pub nominal: String,
    pub rate: f64,
    pub diff: String,
    pub date: NaiveDate,
}

#[async_trait]
impl Record for ExchangeRate {
    fn key(&self) -> String {
        format!("{}#{}", self.currency, self.id)
    }

    async fn write_to(&self, store: &dyn Store) -> Result<(), StoreError> {
        store.insert_rate(self).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub currency: String,
    pub balance: f64,
    pub converted_balance: Option<f64>,
}

impl User {
    /// Creates a user with a freshly generated id and no converted balance.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        currency: impl Into<String>,
        balance: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            currency: currency.into(),
            balance,
            converted_balance: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[async_trait]
impl Record for User {
    fn key(&self) -> String {
        self.id.to_string()
    }

    async fn write_to(&self, store: &dyn Store) -> Result<(), StoreError> {
        store.insert_user(self).await
    }
}

/// Currency code to rate lookup. Currency codes are not unique across a feed,
/// so the last inserted rate for a code wins.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: HashMap<String, f64>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rates<'a>(rates: impl IntoIterator<Item = &'a ExchangeRate>) -> Self {
        let mut table = Self::new();
        for rate in rates {
            table.insert(&rate.currency, rate.rate);
        }
        table
    }

    pub fn insert(&mut self, currency: &str, rate: f64) {
        self.rates.insert(currency.to_string(), rate);
    }

    pub fn get(&self, currency: &str) -> Option<f64> {
        self.rates.get(currency).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.rates.iter().map(|(ccy, rate)| (ccy.as_str(), *rate))
    }
}
