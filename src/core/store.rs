use crate::core::error::StoreError;
use crate::core::record::{ExchangeRate, User};
use async_trait::async_trait;

/// Relational sink for rates and users. Implementations must tolerate
/// concurrent use from every loader worker.
#[async_trait]
pub trait Store: Send + Sync {
    /// Creates the `rates` and `users` tables if they are missing.
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    async fn insert_rate(&self, rate: &ExchangeRate) -> Result<(), StoreError>;

    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    /// All stored rates, oldest date first.
    async fn rates(&self) -> Result<Vec<ExchangeRate>, StoreError>;

    async fn users(&self) -> Result<Vec<User>, StoreError>;

    /// Sets `converted_balance = balance * rate` for every user holding
    /// `currency`. Returns the number of rows updated.
    async fn apply_rate(&self, currency: &str, rate: f64) -> Result<u64, StoreError>;

    /// Recomputes every converted balance in one pass using the newest stored
    /// rate per currency and an identity rate for `base_currency`. Users whose
    /// currency has no rate are left untouched.
    async fn convert_balances(&self, base_currency: &str) -> Result<u64, StoreError>;
}
