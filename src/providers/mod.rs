pub mod rates_feed;
pub mod users_csv;

pub use rates_feed::RatesFeed;
pub use users_csv::UsersCsv;
