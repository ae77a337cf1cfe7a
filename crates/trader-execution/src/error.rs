//! 체결 에러 타입.

use rust_decimal::Decimal;
use thiserror::Error;
use trader_core::ErrorKind;

/// 체결 에러
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    #[error("시세 없음: {symbol}")]
    NoMarketData { symbol: String },
    #[error("자금 부족: 필요 {required}, 보유 {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },
    #[error("유효하지 않은 수량: {quantity}")]
    InvalidQuantity { quantity: Decimal },
    #[error("지정가 주문에 지정가가 없음")]
    MissingLimitPrice,
    #[error("유효하지 않은 가격: {price}")]
    InvalidPrice { price: Decimal },
    #[error("체결 금액 계산 범위 초과: {symbol} 수량 {quantity}")]
    AmountOverflow { symbol: String, quantity: Decimal },
}

impl ExecutionError {
    /// 공통 에러 분류.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoMarketData { .. } => ErrorKind::NoMarketData,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::InvalidQuantity { .. }
            | Self::MissingLimitPrice
            | Self::InvalidPrice { .. }
            | Self::AmountOverflow { .. } => ErrorKind::InvalidRequest,
        }
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, ExecutionError>;
