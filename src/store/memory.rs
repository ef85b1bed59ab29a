//! In-memory store for dry runs and tests

use crate::core::error::StoreError;
use crate::core::record::{ExchangeRate, RateTable, Record, User};
use crate::core::store::Store;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

type RejectFn = dyn Fn(&str) -> Option<String> + Send + Sync;

/// In-process `Store` with the same semantics as the SQL tables. Used for dry
/// runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    rates: RwLock<Vec<ExchangeRate>>,
    users: RwLock<Vec<User>>,
    reject: Option<Arc<RejectFn>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that refuses writes for which `reject` returns a reason.
    /// The predicate receives the record key.
    pub fn rejecting<F>(reject: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            reject: Some(Arc::new(reject)),
            ..Self::default()
        }
    }

    fn check(&self, key: String) -> Result<(), StoreError> {
        match self.reject.as_ref().and_then(|reject| reject(&key)) {
            Some(reason) => {
                debug!("MemoryStore rejecting write for {key}: {reason}");
                Err(StoreError::Rejected { key, reason })
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_rate(&self, rate: &ExchangeRate) -> Result<(), StoreError> {
        self.check(rate.key())?;
        self.rates.write().await.push(rate.clone());
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let key = user.key();
        self.check(key.clone())?;

        let mut users = self.users.write().await;
        if users.iter().any(|u| u.id == user.id) {
            return Err(StoreError::Rejected {
                key,
                reason: "duplicate id".to_string(),
            });
        }
        users.push(user.clone());
        Ok(())
    }

    async fn rates(&self) -> Result<Vec<ExchangeRate>, StoreError> {
        let mut rates = self.rates.read().await.clone();
        rates.sort_by_key(|r| (r.date, r.id));
        Ok(rates)
    }

    async fn users(&self) -> Result<Vec<User>, StoreError> {
        let mut users = self.users.read().await.clone();
        users.sort_by(|a, b| {
            (&a.last_name, &a.first_name, a.id).cmp(&(&b.last_name, &b.first_name, b.id))
        });
        Ok(users)
    }

    async fn apply_rate(&self, currency: &str, rate: f64) -> Result<u64, StoreError> {
        let mut updated = 0;
        for user in self.users.write().await.iter_mut() {
            if user.currency == currency {
                user.converted_balance = Some(user.balance * rate);
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn convert_balances(&self, base_currency: &str) -> Result<u64, StoreError> {
        let mut table = RateTable::from_rates(&self.rates().await?);
        table.insert(base_currency, 1.0);

        let mut updated = 0;
        for user in self.users.write().await.iter_mut() {
            if let Some(rate) = table.get(&user.currency) {
                user.converted_balance = Some(user.balance * rate);
                updated += 1;
            }
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::fixtures::rate;

    #[tokio::test]
    async fn test_insert_and_list() {
        let store = MemoryStore::new();
        let usd = rate(1, "USD", 12300.5, "01.01.2024");
        let user = User::new("Ada", "Lovelace", "ada@example.com", "USD", 10.0);

        store.insert_rate(&usd).await.unwrap();
        store.insert_user(&user).await.unwrap();

        assert_eq!(store.rates().await.unwrap(), vec![usd]);
        assert_eq!(store.users().await.unwrap(), vec![user]);
    }

    #[tokio::test]
    async fn test_rejecting_store() {
        let store = MemoryStore::rejecting(|key| {
            key.starts_with("EUR").then(|| "EUR is frozen".to_string())
        });

        store
            .insert_rate(&rate(1, "USD", 1.0, "01.01.2024"))
            .await
            .unwrap();
        let err = store
            .insert_rate(&rate(2, "EUR", 1.0, "01.01.2024"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "write rejected for EUR#2: EUR is frozen");
        assert_eq!(store.rates().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_user_is_rejected() {
        let store = MemoryStore::new();
        let user = User::new("Ada", "Lovelace", "ada@example.com", "USD", 10.0);

        store.insert_user(&user).await.unwrap();
        assert!(store.insert_user(&user).await.is_err());
        assert_eq!(store.users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_convert_balances_leaves_unknown_currency_untouched() {
        let store = MemoryStore::new();
        store
            .insert_rate(&rate(1, "USD", 12000.0, "01.01.2024"))
            .await
            .unwrap();
        store
            .insert_rate(&rate(2, "USD", 12300.5, "02.01.2024"))
            .await
            .unwrap();

        let mut gbp = User::new("Alan", "Turing", "alan@example.com", "GBP", 7.0);
        gbp.converted_balance = Some(42.0);
        store.insert_user(&gbp).await.unwrap();
        store
            .insert_user(&User::new("Ada", "Lovelace", "ada@example.com", "USD", 10.0))
            .await
            .unwrap();
        store
            .insert_user(&User::new("Bobur", "Mirzo", "bobur@example.com", "UZS", 250.0))
            .await
            .unwrap();

        assert_eq!(store.convert_balances("UZS").await.unwrap(), 2);

        let users = store.users().await.unwrap();
        let by_currency = |ccy: &str| users.iter().find(|u| u.currency == ccy).unwrap();
        assert_eq!(by_currency("USD").converted_balance, Some(123005.0));
        assert_eq!(by_currency("UZS").converted_balance, Some(250.0));
        assert_eq!(by_currency("GBP").converted_balance, Some(42.0));
    }
}
