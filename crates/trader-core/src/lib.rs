//! 히스토리컬 리플레이 및 모의 거래를 위한 핵심 도메인 타입.
//!
//! 이 crate는 다음을 제공합니다:
//! - OHLCV 캔들(`Bar`)과 타임프레임(`Timeframe`)
//! - 가상 시각 기준 시세(`ProjectedQuote`)와 출처 플래그(`QuoteSource`)
//! - 모의 체결 기록(`SimulatedTrade`)과 계좌 상태(`AccountState`)
//! - 데이터 무결성 검증 결과(`ValidationReport`, `DataGap`, `DataInconsistency`)
//! - 리플레이 상태 머신(`ReplayState`)과 공통 에러 분류(`ErrorKind`)
//!
//! # 예제
//!
//! ```rust,ignore
//! use trader_core::{Bar, Timeframe};
//!
//! let tf: Timeframe = "5m".parse()?;
//! assert_eq!(tf.duration(), chrono::Duration::minutes(5));
//! ```

pub mod domain;
pub mod error;

// 주요 타입 재내보내기
pub use domain::{
    AccountState, Bar, DataGap, DataInconsistency, OhlcIssue, OrderType, ProjectedQuote,
    QuoteSource, ReplayState, Side, SimulatedTrade, Timeframe, TimeframeParseError,
    TimeframeUnit, ValidationReport,
};
pub use error::ErrorKind;
