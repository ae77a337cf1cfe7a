//! 데이터 무결성 검증 결과 타입.
//!
//! 검증 결과는 진단용 참고 정보이며, 원본 데이터를 변경하지 않습니다.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::bar::Timeframe;

/// OHLC 불변식 위반 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OhlcIssue {
    /// 음수 가격
    NegativePrice,
    /// 고가 < 저가
    HighBelowLow,
    /// 시가가 [저가, 고가] 범위를 벗어남
    OpenOutOfRange,
    /// 종가가 [저가, 고가] 범위를 벗어남
    CloseOutOfRange,
    /// 음수 거래량
    NegativeVolume,
}

impl fmt::Display for OhlcIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NegativePrice => "negative_price",
            Self::HighBelowLow => "high_below_low",
            Self::OpenOutOfRange => "open_out_of_range",
            Self::CloseOutOfRange => "close_out_of_range",
            Self::NegativeVolume => "negative_volume",
        };
        f.write_str(text)
    }
}

/// 캔들 사이의 시간 공백.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataGap {
    /// 공백 시작 (직전 캔들 시각)
    pub start: DateTime<Utc>,
    /// 공백 종료 (다음 캔들 시각)
    pub end: DateTime<Utc>,
    /// 공백 길이 (초)
    pub duration_secs: i64,
    /// 사유
    pub reason: String,
}

impl DataGap {
    /// 새 공백 생성.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, reason: impl Into<String>) -> Self {
        Self {
            start,
            end,
            duration_secs: (end - start).num_seconds(),
            reason: reason.into(),
        }
    }

    /// 공백 길이.
    pub fn duration(&self) -> Duration {
        Duration::seconds(self.duration_secs)
    }
}

/// OHLC 불일치가 발견된 캔들.
///
/// 한 캔들에서 발견된 모든 위반 유형을 함께 담습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataInconsistency {
    /// 캔들 시각
    pub timestamp: DateTime<Utc>,
    /// 위반 유형 목록
    pub issues: Vec<OhlcIssue>,
    /// 상세 설명 (OHLCV 값 포함)
    pub details: String,
}

/// 데이터 무결성 검증 리포트.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// 심볼
    pub symbol: String,
    /// 타임프레임
    pub timeframe: Timeframe,
    /// 요청 구간 시작
    pub requested_start: DateTime<Utc>,
    /// 요청 구간 종료
    pub requested_end: DateTime<Utc>,
    /// 공백/불일치가 하나도 없으면 true
    pub is_valid: bool,
    /// 조회된 캔들 수
    pub total_records: usize,
    /// 첫 캔들 ~ 마지막 캔들 구간 (초)
    pub covered_span_secs: i64,
    /// 발견된 공백
    pub gaps: Vec<DataGap>,
    /// 발견된 OHLC 불일치
    pub inconsistencies: Vec<DataInconsistency>,
}

impl ValidationReport {
    /// 데이터가 한 건이라도 존재하는지 여부.
    pub fn has_data(&self) -> bool {
        self.total_records > 0
    }

    /// 캔들이 덮는 구간.
    pub fn covered_span(&self) -> Duration {
        Duration::seconds(self.covered_span_secs)
    }

    /// 요청 구간 전체가 하나의 공백인지 여부 (데이터 전무).
    pub fn is_full_range_gap(&self) -> bool {
        self.gaps.iter().any(|g| {
            g.start <= self.requested_start && g.end >= self.requested_end
        })
    }
}
