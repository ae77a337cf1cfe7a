//! 모의 체결 기록 테이블.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use tracing::{debug, instrument};
use trader_core::{Side, SimulatedTrade};
use uuid::Uuid;

use crate::error::{DataError, Result};
use crate::store::TradeLog;

/// `simulated_trades` 레코드.
#[derive(Debug, Clone, FromRow)]
pub struct TradeRecord {
    pub session_id: Uuid,
    pub symbol: String,
    pub side: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub commission: Decimal,
    pub executed_at: DateTime<Utc>,
}

impl TradeRecord {
    /// 도메인 객체로 변환.
    pub fn to_trade(&self) -> Result<SimulatedTrade> {
        let side: Side = self.side.parse().map_err(DataError::InvalidRecord)?;
        Ok(SimulatedTrade {
            session_id: self.session_id,
            symbol: self.symbol.clone(),
            side,
            quantity: self.quantity,
            price: self.price,
            commission: self.commission,
            executed_at: self.executed_at,
        })
    }
}

/// PostgreSQL 기반 체결 기록.
#[derive(Clone)]
pub struct PgTradeLog {
    pool: PgPool,
}

impl PgTradeLog {
    /// 새 체결 기록 저장소 생성.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TradeLog for PgTradeLog {
    #[instrument(skip(self, trade), fields(session_id = %trade.session_id, symbol = %trade.symbol))]
    async fn append(&self, trade: &SimulatedTrade) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO simulated_trades
                (session_id, symbol, side, quantity, price, commission, executed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(trade.session_id)
        .bind(&trade.symbol)
        .bind(trade.side.to_string())
        .bind(trade.quantity)
        .bind(trade.price)
        .bind(trade.commission)
        .bind(trade.executed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DataError::InsertError(e.to_string()))?;

        debug!("체결 기록 저장");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn trades(&self, session_id: Uuid) -> Result<Vec<SimulatedTrade>> {
        let records: Vec<TradeRecord> = sqlx::query_as(
            r#"
            SELECT session_id, symbol, side, quantity, price, commission, executed_at
            FROM simulated_trades
            WHERE session_id = $1
            ORDER BY executed_at ASC, id ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DataError::QueryError(e.to_string()))?;

        records.iter().map(TradeRecord::to_trade).collect()
    }
}
