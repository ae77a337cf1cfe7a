//! 세션 계좌 잔고 테이블.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{DataError, Result};
use crate::store::AccountStore;

/// PostgreSQL 기반 계좌 잔고 저장소.
///
/// `replay_accounts`에 세션 행이 없으면 기본 잔고를 사용합니다.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
    default_balance: Decimal,
}

impl PgAccountStore {
    /// 새 저장소 생성.
    pub fn new(pool: PgPool, default_balance: Decimal) -> Self {
        Self {
            pool,
            default_balance,
        }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    #[instrument(skip(self))]
    async fn get_balance(&self, session_id: Uuid) -> Result<Decimal> {
        let balance: Option<Decimal> =
            sqlx::query_scalar("SELECT balance FROM replay_accounts WHERE session_id = $1")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DataError::QueryError(e.to_string()))?;

        if balance.is_none() {
            debug!(default = %self.default_balance, "세션 잔고 없음, 기본값 사용");
        }

        Ok(balance.unwrap_or(self.default_balance))
    }
}
