//! 모의 체결 기록.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 매매 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// 반대 방향.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// 포지션 증감 부호 (Buy = +1, Sell = -1).
    pub fn sign(&self) -> Decimal {
        match self {
            Self::Buy => Decimal::ONE,
            Self::Sell => Decimal::NEGATIVE_ONE,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => f.write_str("Buy"),
            Self::Sell => f.write_str("Sell"),
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buy" | "bid" => Ok(Self::Buy),
            "sell" | "ask" => Ok(Self::Sell),
            other => Err(format!("알 수 없는 매매 방향: {}", other)),
        }
    }
}

/// 주문 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// 시장가
    Market,
    /// 지정가
    Limit,
}

/// 모의 체결 기록.
///
/// 체결 엔진이 생성하며 추가만 가능합니다(append-only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedTrade {
    /// 리플레이 세션 ID
    pub session_id: Uuid,
    /// 심볼
    pub symbol: String,
    /// 방향
    pub side: Side,
    /// 수량
    pub quantity: Decimal,
    /// 체결가 (슬리피지/지정가 반영)
    pub price: Decimal,
    /// 수수료
    pub commission: Decimal,
    /// 체결 시각 (가상 시각)
    pub executed_at: DateTime<Utc>,
}

impl SimulatedTrade {
    /// 체결 금액 (price × quantity).
    pub fn notional(&self) -> Decimal {
        self.price * self.quantity
    }
}
