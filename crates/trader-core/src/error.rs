//! 공통 에러 분류.
//!
//! 각 crate의 에러 타입은 `kind()`로 이 분류에 매핑됩니다.
//! UI/컨트롤러 계층은 메시지 대신 분류로 분기합니다.

use serde::{Deserialize, Serialize};

/// 에러 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// 체결에 사용할 시세가 없음
    NoMarketData,
    /// 잔고 부족
    InsufficientFunds,
    /// 이미 실행/일시정지 중인 리플레이가 있음
    AlreadyActive,
    /// 요청 심볼의 과거 데이터가 없거나 부족함
    InsufficientHistory,
    /// 저장소 I/O 실패
    StoreUnavailable,
    /// 잘못된 요청 인자
    InvalidRequest,
}
