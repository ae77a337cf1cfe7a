//! OHLCV 캔들과 타임프레임.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::validation::OhlcIssue;

// =============================================================================
// 타임프레임
// =============================================================================

/// 타임프레임 단위.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeframeUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl TimeframeUnit {
    /// DB 저장용 접미사 ("m", "h", "d", "wk", "mo").
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Minute => "m",
            Self::Hour => "h",
            Self::Day => "d",
            Self::Week => "wk",
            Self::Month => "mo",
        }
    }
}

/// 캔들 타임프레임 (단위 + 배수).
///
/// `"minute":5` 형태의 (유형, 값) 쌍을 표현합니다.
/// 문자열 표현은 `"5m"`, `"1h"`, `"1d"`, `"1wk"`, `"1mo"` 입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timeframe {
    /// 단위
    pub unit: TimeframeUnit,
    /// 배수 (1 이상)
    pub value: u32,
}

/// 타임프레임 파싱 에러
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TimeframeParseError {
    #[error("지원하지 않는 타임프레임 단위: {0}")]
    UnknownUnit(String),
    #[error("유효하지 않은 타임프레임 값: {0}")]
    InvalidValue(String),
}

impl Timeframe {
    /// 새 타임프레임 생성.
    pub const fn new(unit: TimeframeUnit, value: u32) -> Self {
        Self { unit, value }
    }

    /// 분봉.
    pub const fn minutes(value: u32) -> Self {
        Self::new(TimeframeUnit::Minute, value)
    }

    /// 시간봉.
    pub const fn hours(value: u32) -> Self {
        Self::new(TimeframeUnit::Hour, value)
    }

    /// 일봉.
    pub const fn days(value: u32) -> Self {
        Self::new(TimeframeUnit::Day, value)
    }

    /// 캔들 간 기대 간격.
    ///
    /// 월봉은 30일로 근사합니다.
    pub fn duration(&self) -> Duration {
        let value = i64::from(self.value.max(1));
        match self.unit {
            TimeframeUnit::Minute => Duration::minutes(value),
            TimeframeUnit::Hour => Duration::hours(value),
            TimeframeUnit::Day => Duration::days(value),
            TimeframeUnit::Week => Duration::weeks(value),
            TimeframeUnit::Month => Duration::days(30 * value),
        }
    }

    /// 분봉/시간봉인지 확인.
    pub fn is_intraday(&self) -> bool {
        matches!(self.unit, TimeframeUnit::Minute | TimeframeUnit::Hour)
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Self::minutes(1)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

impl FromStr for Timeframe {
    type Err = TimeframeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| TimeframeParseError::UnknownUnit(s.clone()))?;
        let (digits, suffix) = s.split_at(split);

        let value = if digits.is_empty() {
            1
        } else {
            digits
                .parse::<u32>()
                .map_err(|_| TimeframeParseError::InvalidValue(s.clone()))?
        };
        if value == 0 {
            return Err(TimeframeParseError::InvalidValue(s.clone()));
        }

        let unit = match suffix {
            "m" | "min" | "minute" => TimeframeUnit::Minute,
            "h" | "hour" => TimeframeUnit::Hour,
            "d" | "day" => TimeframeUnit::Day,
            "w" | "wk" | "week" => TimeframeUnit::Week,
            "mo" | "mon" | "month" => TimeframeUnit::Month,
            other => return Err(TimeframeParseError::UnknownUnit(other.to_string())),
        };

        Ok(Self::new(unit, value))
    }
}

// =============================================================================
// 캔들 (Bar)
// =============================================================================

/// 단일 OHLCV 캔들.
///
/// 저장된 이후에는 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// 심볼
    pub symbol: String,
    /// 타임프레임
    pub timeframe: Timeframe,
    /// 캔들 시작 시각
    pub timestamp: DateTime<Utc>,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량
    pub volume: Decimal,
}

impl Bar {
    /// 새 캔들 생성.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// OHLC 불변식 위반 목록.
    ///
    /// 음수 가격, high < low, 시가/종가의 [low, high] 이탈, 음수 거래량을 검사합니다.
    pub fn ohlc_issues(&self) -> Vec<OhlcIssue> {
        let mut issues = Vec::new();

        if [self.open, self.high, self.low, self.close]
            .iter()
            .any(|p| p.is_sign_negative() && !p.is_zero())
        {
            issues.push(OhlcIssue::NegativePrice);
        }
        if self.high < self.low {
            issues.push(OhlcIssue::HighBelowLow);
        }
        if self.open < self.low || self.open > self.high {
            issues.push(OhlcIssue::OpenOutOfRange);
        }
        if self.close < self.low || self.close > self.high {
            issues.push(OhlcIssue::CloseOutOfRange);
        }
        if self.volume.is_sign_negative() && !self.volume.is_zero() {
            issues.push(OhlcIssue::NegativeVolume);
        }

        issues
    }

    /// OHLC 불변식 충족 여부.
    pub fn is_consistent(&self) -> bool {
        self.ohlc_issues().is_empty()
    }
}
