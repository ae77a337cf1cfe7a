//! 데이터베이스 연결 풀 설정.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::error::{DataError, Result};

/// 연결 풀 설정.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// 데이터베이스 URL
    pub url: String,
    /// 최대 연결 수
    pub max_connections: u32,
    /// 연결 획득 타임아웃
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    /// 리플레이 실행용 기본 설정.
    ///
    /// 틱 루프와 체결 기록이 동시에 연결을 사용하므로 소규모 풀이면 충분합니다.
    pub fn for_replay(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// 데이터베이스 연결.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 설정으로 연결 풀 생성.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "데이터베이스 연결 풀 생성"
        );

        Ok(Self { pool })
    }

    /// 연결 풀.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
