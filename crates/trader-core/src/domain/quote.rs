//! 가상 시각 기준 시세.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 시세 출처.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSource {
    /// 저장된 과거 캔들에서 산출
    Historical,
    /// 데이터 공백을 메우기 위해 합성
    Synthetic,
}

/// 가상 시각 기준으로 투영된 시세.
///
/// 틱마다 다시 계산되며 저장되지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedQuote {
    /// 심볼
    pub symbol: String,
    /// 가격
    pub price: Decimal,
    /// 거래량
    pub volume: Decimal,
    /// 기준 가상 시각
    pub as_of: DateTime<Utc>,
    /// 출처
    pub source: QuoteSource,
}

impl ProjectedQuote {
    /// 과거 캔들 기반 시세 생성.
    pub fn historical(
        symbol: impl Into<String>,
        price: Decimal,
        volume: Decimal,
        as_of: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            volume,
            as_of,
            source: QuoteSource::Historical,
        }
    }

    /// 합성 시세 생성.
    pub fn synthetic(
        symbol: impl Into<String>,
        price: Decimal,
        volume: Decimal,
        as_of: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            volume,
            as_of,
            source: QuoteSource::Synthetic,
        }
    }

    /// 합성 시세 여부.
    pub fn is_synthetic(&self) -> bool {
        self.source == QuoteSource::Synthetic
    }
}
