//! 리플레이 엔진이 소비하는 저장소 인터페이스.
//!
//! # 아키텍처
//!
//! ```text
//! ReplayController ──> BarStore      (get_bars / get_bar_near, 읽기 전용)
//!                  ──> TradeLog      (append, 추가 전용)
//!                  ──> AccountStore  (get_balance)
//! ```
//!
//! 엔진 입장에서 캔들 저장소는 읽기 전용입니다.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use trader_core::{Bar, SimulatedTrade, Timeframe};
use uuid::Uuid;

use crate::error::Result;

pub use memory::{InMemoryAccountStore, InMemoryBarStore, InMemoryTradeLog};

/// OHLCV 캔들 저장소 (읽기 전용).
#[async_trait]
pub trait BarStore: Send + Sync {
    /// 구간 `[start, end]`의 캔들을 시간순으로 조회.
    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>>;

    /// `timestamp`와 같은 날짜(UTC)의 캔들 중 시간 차이가 가장 작은 캔들.
    ///
    /// 차이가 같으면 더 이른 캔들을 반환합니다. 해당 날짜에 캔들이 없으면 `None`.
    async fn get_bar_near(&self, symbol: &str, timestamp: DateTime<Utc>) -> Result<Option<Bar>>;
}

/// 모의 체결 기록 저장소 (추가 전용).
#[async_trait]
pub trait TradeLog: Send + Sync {
    /// 체결 기록 추가.
    async fn append(&self, trade: &SimulatedTrade) -> Result<()>;

    /// 세션의 체결 기록을 체결 시각순으로 조회.
    async fn trades(&self, session_id: Uuid) -> Result<Vec<SimulatedTrade>>;
}

/// 세션 계좌 잔고 저장소.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// 세션 시작 잔고 조회.
    async fn get_balance(&self, session_id: Uuid) -> Result<Decimal>;
}
