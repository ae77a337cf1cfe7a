//! 과거 캔들 저장소 및 데이터 무결성 검증.
//!
//! 리플레이 엔진이 소비하는 외부 협력자 인터페이스와 그 구현을 제공합니다:
//! - `BarStore`: OHLCV 캔들 조회 (읽기 전용)
//! - `TradeLog`: 모의 체결 기록 (추가 전용)
//! - `AccountStore`: 세션별 초기 잔고 조회
//!
//! 구현체는 메모리 기반(`store::memory`)과 PostgreSQL 기반(`storage`)이 있습니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use trader_data::{DataIntegrityValidator, InMemoryBarStore, ValidatorConfig};
//!
//! let store = Arc::new(InMemoryBarStore::new());
//! let validator = DataIntegrityValidator::new(store, ValidatorConfig::default());
//! let report = validator.validate("AAPL", Timeframe::minutes(1), start, end).await?;
//! ```

pub mod error;
pub mod storage;
pub mod store;
pub mod validation;

pub use error::{DataError, Result};
pub use storage::{Database, DatabaseConfig, PgAccountStore, PgBarStore, PgTradeLog};
pub use store::{
    AccountStore, BarStore, InMemoryAccountStore, InMemoryBarStore, InMemoryTradeLog, TradeLog,
};
pub use validation::{
    DataIntegrityValidator, TradingHours, ValidatorConfig, DEFAULT_GAP_TOLERANCE,
};
