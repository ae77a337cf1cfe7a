//! 모의 체결 엔진.
//!
//! 이 crate는 다음을 제공합니다:
//! - 투영된 시세에 대한 슬리피지 적용과 지정가 경계 처리
//! - 수수료 정책 (무료 / 건당 고정 / 비율)
//! - 매수 자금 검증과 계좌 잔고/포지션 반영
//!
//! # 예제
//!
//! ```rust,ignore
//! use trader_execution::{ExecutionConfig, TradeExecutionEngine, TradeRequest};
//!
//! let engine = TradeExecutionEngine::new(ExecutionConfig::default());
//! let request = TradeRequest::market("AAPL", Side::Buy, dec!(10));
//! let result = engine.execute(session_id, &mut account, Some(&quote), &request, virtual_time)?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod pricing;

// 주요 타입 재내보내기
pub use config::{CommissionPolicy, ExecutionConfig};
pub use engine::{TradeExecutionEngine, TradeRequest, TradeResult};
pub use error::{ExecutionError, Result};
pub use pricing::{apply_slippage, clamp_to_limit, validate_funds};
