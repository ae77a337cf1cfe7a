//! 데이터 계층 에러 타입.

use thiserror::Error;
use trader_core::ErrorKind;

/// 데이터 계층 에러
#[derive(Debug, Clone, Error)]
pub enum DataError {
    #[error("저장소 연결 실패: {0}")]
    ConnectionError(String),
    #[error("조회 실패: {0}")]
    QueryError(String),
    #[error("저장 실패: {0}")]
    InsertError(String),
    #[error("잘못된 레코드: {0}")]
    InvalidRecord(String),
}

impl DataError {
    /// 공통 에러 분류.
    ///
    /// 데이터 계층의 모든 실패는 저장소 사용 불가로 취급됩니다.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::StoreUnavailable
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::ConnectionError(err.to_string())
            }
            other => Self::QueryError(other.to_string()),
        }
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, DataError>;
