//! 리플레이 에러 타입.

use thiserror::Error;
use trader_core::ErrorKind;
use trader_data::DataError;
use trader_execution::ExecutionError;
use uuid::Uuid;

/// 리플레이 에러
#[derive(Debug, Clone, Error)]
pub enum ReplayError {
    #[error("이미 실행 중인 리플레이가 있음: {session_id}")]
    AlreadyActive { session_id: Uuid },
    #[error("과거 데이터 부족: {}", symbols.join(", "))]
    InsufficientHistory { symbols: Vec<String> },
    #[error("활성 리플레이 세션 없음")]
    NotActive,
    #[error("잘못된 요청: {0}")]
    InvalidRequest(String),
    #[error("설정 오류: {0}")]
    Config(String),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl ReplayError {
    /// 공통 에러 분류.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyActive { .. } => ErrorKind::AlreadyActive,
            Self::InsufficientHistory { .. } => ErrorKind::InsufficientHistory,
            Self::NotActive | Self::InvalidRequest(_) | Self::Config(_) => {
                ErrorKind::InvalidRequest
            }
            Self::Data(e) => e.kind(),
            Self::Execution(e) => e.kind(),
        }
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, ReplayError>;
