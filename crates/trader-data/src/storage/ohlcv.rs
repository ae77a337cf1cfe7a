//! OHLCV 캔들 캐시 테이블 조회.
//!
//! 리플레이 엔진은 `ohlcv` 테이블을 읽기만 합니다.
//! 수집/갱신은 별도 수집기의 책임입니다.
//!
//! # 테이블 구조
//!
//! `(symbol, timeframe, open_time)`을 키로 OHLCV 값과 출처 정보
//! (`source`, `fetched_at`, `is_realtime`)를 보관합니다.
//! 스키마는 `migrations/0001_replay.sql`을 참고하세요.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use tracing::{debug, instrument};
use trader_core::{Bar, Timeframe};

use crate::error::{DataError, Result};
use crate::store::BarStore;

/// OHLCV 캔들 데이터베이스 레코드.
#[derive(Debug, Clone, FromRow)]
pub struct OhlcvRecord {
    pub symbol: String,
    pub timeframe: String,
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub source: Option<String>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub is_realtime: bool,
}

impl OhlcvRecord {
    /// Bar 도메인 객체로 변환.
    ///
    /// 타임프레임 문자열을 해석할 수 없으면 에러를 반환합니다.
    pub fn to_bar(&self) -> Result<Bar> {
        let timeframe: Timeframe = self.timeframe.parse().map_err(|e| {
            DataError::InvalidRecord(format!(
                "{} @ {}: {}",
                self.symbol, self.open_time, e
            ))
        })?;

        Ok(Bar::new(
            self.symbol.clone(),
            timeframe,
            self.open_time,
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
        ))
    }
}

/// PostgreSQL 기반 캔들 저장소.
#[derive(Clone)]
pub struct PgBarStore {
    pool: PgPool,
}

impl PgBarStore {
    /// 새 저장소 생성.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BarStore for PgBarStore {
    #[instrument(skip(self))]
    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>> {
        let tf_str = timeframe.to_string();

        let records: Vec<OhlcvRecord> = sqlx::query_as(
            r#"
            SELECT symbol, timeframe, open_time, open, high, low, close, volume,
                   source, fetched_at, is_realtime
            FROM ohlcv
            WHERE symbol = $1 AND timeframe = $2 AND open_time >= $3 AND open_time <= $4
            ORDER BY open_time ASC
            "#,
        )
        .bind(symbol)
        .bind(&tf_str)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DataError::QueryError(e.to_string()))?;

        let bars = records
            .iter()
            .map(OhlcvRecord::to_bar)
            .collect::<Result<Vec<_>>>()?;

        debug!(
            symbol = symbol,
            timeframe = %tf_str,
            count = bars.len(),
            "구간 캔들 조회"
        );

        Ok(bars)
    }

    #[instrument(skip(self))]
    async fn get_bar_near(&self, symbol: &str, timestamp: DateTime<Utc>) -> Result<Option<Bar>> {
        let day_start = timestamp
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or(timestamp);
        let day_end = day_start + Duration::days(1);

        let record: Option<OhlcvRecord> = sqlx::query_as(
            r#"
            SELECT symbol, timeframe, open_time, open, high, low, close, volume,
                   source, fetched_at, is_realtime
            FROM ohlcv
            WHERE symbol = $1 AND open_time >= $2 AND open_time < $3
            ORDER BY ABS(EXTRACT(EPOCH FROM (open_time - $4))) ASC, open_time ASC
            LIMIT 1
            "#,
        )
        .bind(symbol)
        .bind(day_start)
        .bind(day_end)
        .bind(timestamp)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DataError::QueryError(e.to_string()))?;

        record.as_ref().map(OhlcvRecord::to_bar).transpose()
    }
}
