//! 리플레이 이벤트 브로드캐스트.
//!
//! 구독자(UI, 로거 등)마다 모든 이벤트를 받습니다.
//! 느린 구독자는 버퍼를 넘기면 `RecvError::Lagged`를 받습니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;
use trader_core::{ProjectedQuote, ReplayState, SimulatedTrade};
use trader_execution::TradeResult;
use uuid::Uuid;

/// 리플레이 이벤트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayEvent {
    /// 틱마다 갱신된 시세
    MarketUpdate {
        session_id: Uuid,
        quotes: Vec<ProjectedQuote>,
        virtual_time: DateTime<Utc>,
        progress: f64,
    },
    /// 모의 체결
    TradeExecuted {
        session_id: Uuid,
        trade: SimulatedTrade,
        result: TradeResult,
    },
    /// 상태 전이
    StatusChanged {
        session_id: Uuid,
        is_active: bool,
        state: ReplayState,
        virtual_time: DateTime<Utc>,
    },
    /// 리플레이를 멈추지 않는 경고 (저장소 오류, 데이터 검증 결과 등)
    Warning {
        session_id: Option<Uuid>,
        message: String,
        virtual_time: Option<DateTime<Utc>>,
    },
}

impl ReplayEvent {
    /// 이벤트 유형 이름 (로그용).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MarketUpdate { .. } => "market_update",
            Self::TradeExecuted { .. } => "trade_executed",
            Self::StatusChanged { .. } => "status_changed",
            Self::Warning { .. } => "warning",
        }
    }
}

/// 이벤트 허브.
#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<ReplayEvent>,
}

impl EventHub {
    /// 버퍼 크기로 허브 생성.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// 구독.
    pub fn subscribe(&self) -> broadcast::Receiver<ReplayEvent> {
        self.tx.subscribe()
    }

    /// 이벤트 발행.
    ///
    /// 구독자가 없으면 버립니다.
    pub fn publish(&self, event: ReplayEvent) {
        let kind = event.kind();
        match self.tx.send(event) {
            Ok(receivers) => trace!(kind, receivers, "이벤트 발행"),
            Err(_) => trace!(kind, "구독자 없음, 이벤트 폐기"),
        }
    }

    /// 현재 구독자 수.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
