//! 리플레이 통합 테스트 공용 픽스처.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::{broadcast, Notify};
use tokio::time::Instant;
use trader_core::{Bar, SimulatedTrade, Timeframe};
use trader_data::{
    BarStore, DataError, InMemoryAccountStore, InMemoryBarStore, InMemoryTradeLog, TradeLog,
};
use trader_replay::{ReplayConfig, ReplayController, ReplayEvent, ReplayRequest};
use uuid::Uuid;

/// 테스트 틱 간격.
pub const TICK: Duration = Duration::from_millis(10);

pub fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, h, m, 0).unwrap()
}

/// 09:30 ~ 10:00 분봉 (종가 = base + 분).
pub fn session_bars(symbol: &str, base: Decimal) -> Vec<Bar> {
    (0..=30)
        .map(|i| {
            let close = base + Decimal::from(i);
            Bar::new(
                symbol,
                Timeframe::minutes(1),
                at(9, 30) + chrono::Duration::minutes(i),
                close,
                close + dec!(0.5),
                close - dec!(0.5),
                close,
                dec!(1000),
            )
        })
        .collect()
}

/// 시세 조회 실패를 켜고 끌 수 있는 저장소.
pub struct FlakyBarStore {
    inner: InMemoryBarStore,
    fail_near: AtomicBool,
}

impl FlakyBarStore {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self {
            inner: InMemoryBarStore::with_bars(bars),
            fail_near: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_near.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl BarStore for FlakyBarStore {
    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> trader_data::Result<Vec<Bar>> {
        self.inner.get_bars(symbol, timeframe, start, end).await
    }

    async fn get_bar_near(
        &self,
        symbol: &str,
        timestamp: DateTime<Utc>,
    ) -> trader_data::Result<Option<Bar>> {
        if self.fail_near.load(Ordering::SeqCst) {
            return Err(DataError::ConnectionError("connection reset".to_string()));
        }
        self.inner.get_bar_near(symbol, timestamp).await
    }
}

/// 시세 조회를 중간에 붙잡아 둘 수 있는 저장소.
///
/// `hold()` 이후의 `get_bar_near` 호출은 `entered`를 알리고 `release()`까지 대기합니다.
pub struct GatedBarStore {
    inner: InMemoryBarStore,
    holding: AtomicBool,
    entered: Notify,
    gate: Notify,
}

impl GatedBarStore {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self {
            inner: InMemoryBarStore::with_bars(bars),
            holding: AtomicBool::new(false),
            entered: Notify::new(),
            gate: Notify::new(),
        }
    }

    pub fn hold(&self) {
        self.holding.store(true, Ordering::SeqCst);
    }

    /// 조회가 붙잡힐 때까지 대기.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.holding.store(false, Ordering::SeqCst);
        self.gate.notify_one();
    }
}

#[async_trait]
impl BarStore for GatedBarStore {
    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> trader_data::Result<Vec<Bar>> {
        self.inner.get_bars(symbol, timeframe, start, end).await
    }

    async fn get_bar_near(
        &self,
        symbol: &str,
        timestamp: DateTime<Utc>,
    ) -> trader_data::Result<Option<Bar>> {
        if self.holding.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.gate.notified().await;
        }
        self.inner.get_bar_near(symbol, timestamp).await
    }
}

/// 항상 저장에 실패하는 체결 기록.
pub struct FailingTradeLog;

#[async_trait]
impl TradeLog for FailingTradeLog {
    async fn append(&self, _trade: &SimulatedTrade) -> trader_data::Result<()> {
        Err(DataError::InsertError("disk full".to_string()))
    }

    async fn trades(&self, _session_id: Uuid) -> trader_data::Result<Vec<SimulatedTrade>> {
        Ok(Vec::new())
    }
}

pub fn test_config() -> ReplayConfig {
    let mut config = ReplayConfig::default();
    config.synthetic.seed = Some(7);
    config.default_speed_ms = TICK.as_millis() as u64;
    config
}

pub struct Harness {
    pub controller: ReplayController,
    pub trade_log: Arc<InMemoryTradeLog>,
    pub accounts: Arc<InMemoryAccountStore>,
}

pub fn harness_with_store(store: Arc<dyn BarStore>) -> Harness {
    let config = test_config();
    let trade_log = Arc::new(InMemoryTradeLog::new());
    let accounts = Arc::new(InMemoryAccountStore::new(config.initial_balance));
    let controller = ReplayController::new(config, store, trade_log.clone(), accounts.clone());
    Harness {
        controller,
        trade_log,
        accounts,
    }
}

pub fn harness(bars: Vec<Bar>) -> Harness {
    harness_with_store(Arc::new(InMemoryBarStore::with_bars(bars)))
}

pub fn aapl_request() -> ReplayRequest {
    ReplayRequest::new(vec!["AAPL".to_string()], at(9, 30), at(10, 0)).with_speed(TICK)
}

/// 틱 시각 기준점.
///
/// 스케줄러가 간격을 새로 시작한 시점(시작, 재개, 속도 변경)을 기준으로
/// n번째 틱 직후(반 틱 뒤)까지 대기합니다. 틱 시각과 겹치지 않게 하기 위함입니다.
pub struct TickClock {
    base: Instant,
}

impl TickClock {
    pub fn now() -> Self {
        Self {
            base: Instant::now(),
        }
    }

    pub async fn after_ticks(&self, n: u32) {
        tokio::time::sleep_until(self.base + TICK * n + TICK / 2).await;
    }
}

/// 수신 대기 중인 이벤트 모두 꺼내기.
pub fn drain(rx: &mut broadcast::Receiver<ReplayEvent>) -> Vec<ReplayEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
