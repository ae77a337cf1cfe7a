//! 히스토리컬 마켓 리플레이 엔진.
//!
//! 저장된 캔들 시계열을 가상 시계로 재생하고, 재생 중인 시세에 대해
//! 모의 체결을 수행합니다.
//!
//! # 아키텍처
//!
//! ```text
//! ReplayScheduler ──tick──> ReplayController ──project──> MarketStateProjector ──> BarStore
//!                                 │
//!                                 ├── execute_trade ──> TradeExecutionEngine ──> TradeLog
//!                                 ├── get_metrics ──> PerformanceTracker
//!                                 └── EventHub (broadcast) ──> 구독자 (UI, 로거)
//! ```
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! let controller = ReplayController::new(config, bar_store, trade_log, account_store);
//! let mut events = controller.subscribe();
//!
//! controller.start(ReplayRequest::new(vec!["AAPL".into()], start, end)).await?;
//! controller.execute_trade(TradeRequest::market("AAPL", Side::Buy, dec!(10))).await?;
//! let metrics = controller.get_metrics().await;
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod performance;
pub mod projector;
pub mod scheduler;

// 주요 타입 재내보내기
pub use config::ReplayConfig;
pub use controller::{ReplayController, ReplayMetrics, ReplayRequest, ReplayStatus};
pub use error::{ReplayError, Result};
pub use events::{EventHub, ReplayEvent};
pub use performance::{PerformanceSummary, PerformanceTracker};
pub use projector::{MarketStateProjector, SyntheticQuoteConfig};
pub use scheduler::{ReplayScheduler, TickOutcome};
