//! PostgreSQL 저장소 구현.

pub mod accounts;
pub mod database;
pub mod ohlcv;
pub mod trades;

pub use accounts::PgAccountStore;
pub use database::{Database, DatabaseConfig};
pub use ohlcv::{OhlcvRecord, PgBarStore};
pub use trades::{PgTradeLog, TradeRecord};
