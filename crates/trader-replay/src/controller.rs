//! 리플레이 컨트롤러.
//!
//! 가상 시계를 소유하고 상태 머신을 구동합니다.
//!
//! ```text
//! Stopped ──start──> Running ──pause──> Paused
//!                       ▲                  │
//!                       └─────resume───────┘
//! Running ──(end 도달)──> Completed
//! (모든 상태) ──stop──> Stopped
//! ```
//!
//! 세션 상태(가상 시각, 시세, 계좌, 체결 기록)는 하나의 `RwLock`으로 보호합니다.
//! 저장소 I/O 중에는 락을 잡지 않습니다: 필요한 값을 복사하고, 락을 풀고,
//! I/O를 수행한 뒤 다시 짧게 잡아서 결과를 반영합니다.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};
use trader_core::{
    AccountState, ProjectedQuote, ReplayState, SimulatedTrade, Timeframe, ValidationReport,
};
use trader_data::{AccountStore, BarStore, DataIntegrityValidator, TradeLog};
use trader_execution::{TradeExecutionEngine, TradeRequest, TradeResult};
use uuid::Uuid;

use crate::config::ReplayConfig;
use crate::error::{ReplayError, Result};
use crate::events::{EventHub, ReplayEvent};
use crate::performance::PerformanceTracker;
use crate::projector::MarketStateProjector;
use crate::scheduler::{ReplayScheduler, TickOutcome};

/// 틱당 가상 시간 증가량 (1분).
fn tick_step() -> chrono::Duration {
    chrono::Duration::minutes(1)
}

// ==================== 요청 / 응답 ====================

/// 리플레이 시작 요청.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayRequest {
    /// 세션 ID
    pub session_id: Uuid,
    /// 심볼 목록
    pub symbols: Vec<String>,
    /// 가상 시작 시각
    pub start: DateTime<Utc>,
    /// 가상 종료 시각
    pub end: DateTime<Utc>,
    /// 가상 1분당 실제 대기 시간 (없으면 설정 기본값)
    pub speed: Option<Duration>,
    /// 검증 타임프레임 (없으면 설정 기본값)
    pub timeframe: Option<Timeframe>,
}

impl ReplayRequest {
    /// 새 세션 ID로 요청 생성.
    pub fn new(symbols: Vec<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            symbols,
            start,
            end,
            speed: None,
            timeframe: None,
        }
    }

    /// 세션 ID 지정.
    pub fn with_session_id(mut self, session_id: Uuid) -> Self {
        self.session_id = session_id;
        self
    }

    /// 틱 간격 지정.
    pub fn with_speed(mut self, speed: Duration) -> Self {
        self.speed = Some(speed);
        self
    }

    /// 타임프레임 지정.
    pub fn with_timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = Some(timeframe);
        self
    }
}

/// 성과 지표 스냅샷.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayMetrics {
    /// 진행률 (0.0 ~ 1.0)
    pub progress: f64,
    /// 현재 잔고
    pub current_balance: Decimal,
    /// 총 손익 (평가 자산 - 초기 잔고)
    pub total_profit: Decimal,
    /// 총 체결 수
    pub total_trades: usize,
    /// 승률 (0.0 ~ 1.0)
    pub win_rate: f64,
    /// 실현 손익
    pub realized_pnl: Decimal,
    /// 미실현 손익
    pub unrealized_pnl: Decimal,
    /// 평가 자산
    pub equity: Decimal,
}

/// 세션 상태 스냅샷.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayStatus {
    pub session_id: Uuid,
    pub state: ReplayState,
    pub symbols: Vec<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub virtual_time: DateTime<Utc>,
    /// 틱 간격 (밀리초)
    pub speed_ms: u64,
    pub progress: f64,
    /// 반영된 틱 수 (실패 틱 포함)
    pub ticks_processed: u64,
    /// 저장소 오류로 시세를 갱신하지 못한 틱 수
    pub failed_ticks: u64,
    pub last_error: Option<String>,
}

// ==================== 세션 ====================

struct Session {
    id: Uuid,
    symbols: Vec<String>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    current: DateTime<Utc>,
    speed: Duration,
    state: ReplayState,
    quotes: HashMap<String, ProjectedQuote>,
    account: AccountState,
    initial_balance: Decimal,
    trades: Vec<SimulatedTrade>,
    validation_reports: Vec<ValidationReport>,
    ticks_processed: u64,
    failed_ticks: u64,
    last_error: Option<String>,
}

impl Session {
    fn progress(&self) -> f64 {
        progress(self.start, self.end, self.current)
    }

    /// 심볼 순서대로 정렬된 시세 스냅샷.
    fn quote_snapshot(&self) -> Vec<ProjectedQuote> {
        self.symbols
            .iter()
            .filter_map(|s| self.quotes.get(s).cloned())
            .collect()
    }

    fn status(&self) -> ReplayStatus {
        ReplayStatus {
            session_id: self.id,
            state: self.state,
            symbols: self.symbols.clone(),
            start: self.start,
            end: self.end,
            virtual_time: self.current,
            speed_ms: self.speed.as_millis() as u64,
            progress: self.progress(),
            ticks_processed: self.ticks_processed,
            failed_ticks: self.failed_ticks,
            last_error: self.last_error.clone(),
        }
    }

    fn status_event(&self) -> ReplayEvent {
        ReplayEvent::StatusChanged {
            session_id: self.id,
            is_active: self.state.is_active(),
            state: self.state,
            virtual_time: self.current,
        }
    }

    fn market_event(&self) -> ReplayEvent {
        ReplayEvent::MarketUpdate {
            session_id: self.id,
            quotes: self.quote_snapshot(),
            virtual_time: self.current,
            progress: self.progress(),
        }
    }
}

/// 진행률 = (현재 - 시작) / (종료 - 시작), [0, 1]로 제한. 시작 == 종료이면 0.
pub fn progress(start: DateTime<Utc>, end: DateTime<Utc>, current: DateTime<Utc>) -> f64 {
    let total = (end - start).num_milliseconds();
    if total <= 0 {
        return 0.0;
    }
    let elapsed = (current - start).num_milliseconds();
    (elapsed as f64 / total as f64).clamp(0.0, 1.0)
}

/// 심볼 목록 정규화 (공백 제거, 중복 제거, 순서 유지).
fn normalize_symbols(symbols: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let symbol = symbol.trim();
        if !symbol.is_empty() && !out.iter().any(|s| s == symbol) {
            out.push(symbol.to_string());
        }
    }
    out
}

// ==================== 컨트롤러 ====================

struct Inner {
    config: ReplayConfig,
    trade_log: Arc<dyn TradeLog>,
    account_store: Arc<dyn AccountStore>,
    projector: MarketStateProjector,
    validator: DataIntegrityValidator,
    engine: TradeExecutionEngine,
    events: EventHub,
    session: RwLock<Option<Session>>,
    /// start/stop/pause/resume/set_speed 직렬화 및 스케줄러 보관
    control: Mutex<Option<ReplayScheduler>>,
}

/// 리플레이 컨트롤러.
///
/// 인스턴스당 하나의 활성 세션만 허용합니다. 드롭되면 스케줄링이 취소됩니다.
pub struct ReplayController {
    inner: Arc<Inner>,
}

impl ReplayController {
    /// 새 컨트롤러 생성.
    pub fn new(
        config: ReplayConfig,
        bar_store: Arc<dyn BarStore>,
        trade_log: Arc<dyn TradeLog>,
        account_store: Arc<dyn AccountStore>,
    ) -> Self {
        let projector = MarketStateProjector::new(bar_store.clone(), config.synthetic.clone());
        let validator = DataIntegrityValidator::new(bar_store, config.validator_config());
        let engine = TradeExecutionEngine::new(config.execution.clone());
        let events = EventHub::new(config.event_capacity);

        Self {
            inner: Arc::new(Inner {
                config,
                trade_log,
                account_store,
                projector,
                validator,
                engine,
                events,
                session: RwLock::new(None),
                control: Mutex::new(None),
            }),
        }
    }

    /// 설정 조회.
    pub fn config(&self) -> &ReplayConfig {
        &self.inner.config
    }

    /// 이벤트 구독.
    pub fn subscribe(&self) -> broadcast::Receiver<ReplayEvent> {
        self.inner.events.subscribe()
    }

    // ==================== 제어 ====================

    /// 리플레이 시작.
    ///
    /// 모든 심볼에 요청 구간 데이터가 있어야 합니다. 검증에서 발견된 공백/불일치는
    /// 경고 이벤트로만 알립니다.
    pub async fn start(&self, request: ReplayRequest) -> Result<ReplayStatus> {
        let inner = &self.inner;
        let mut control = inner.control.lock().await;

        if let Some(session) = inner.session.read().await.as_ref() {
            if session.state.is_active() {
                return Err(ReplayError::AlreadyActive {
                    session_id: session.id,
                });
            }
        }

        let symbols = normalize_symbols(&request.symbols);
        if symbols.is_empty() {
            return Err(ReplayError::InvalidRequest("심볼 목록이 비어 있음".to_string()));
        }
        if request.start > request.end {
            return Err(ReplayError::InvalidRequest(format!(
                "시작 시각({})이 종료 시각({})보다 늦음",
                request.start, request.end
            )));
        }
        let speed = request.speed.unwrap_or_else(|| inner.config.default_speed());
        if speed.is_zero() {
            return Err(ReplayError::InvalidRequest("틱 간격은 0보다 커야 함".to_string()));
        }
        let timeframe = request.timeframe.unwrap_or(inner.config.timeframe);
        let session_id = request.session_id;

        info!(
            session_id = %session_id,
            symbols = ?symbols,
            start = %request.start,
            end = %request.end,
            speed_ms = speed.as_millis() as u64,
            "리플레이 시작 요청"
        );

        // 데이터 가용성 검증 (락 없이)
        let mut reports = Vec::with_capacity(symbols.len());
        let mut missing = Vec::new();
        for symbol in &symbols {
            let report = inner
                .validator
                .validate(symbol, timeframe, request.start, request.end)
                .await?;
            if !report.has_data() || report.is_full_range_gap() {
                missing.push(symbol.clone());
            } else if !report.is_valid {
                let message = format!(
                    "{} 데이터 검증 경고: 공백 {}건, OHLC 불일치 {}건",
                    symbol,
                    report.gaps.len(),
                    report.inconsistencies.len()
                );
                warn!(session_id = %session_id, "{}", message);
                inner.events.publish(ReplayEvent::Warning {
                    session_id: Some(session_id),
                    message,
                    virtual_time: Some(request.start),
                });
            }
            reports.push(report);
        }
        if !missing.is_empty() {
            warn!(session_id = %session_id, missing = ?missing, "과거 데이터 부족으로 시작 중단");
            return Err(ReplayError::InsufficientHistory { symbols: missing });
        }

        let initial_balance = inner.account_store.get_balance(session_id).await?;
        let quotes = inner.projector.project(&symbols, request.start).await?;

        let status = {
            let mut guard = inner.session.write().await;
            let session = Session {
                id: session_id,
                symbols,
                start: request.start,
                end: request.end,
                current: request.start,
                speed,
                state: ReplayState::Running,
                quotes: quotes.into_iter().map(|q| (q.symbol.clone(), q)).collect(),
                account: AccountState::new(initial_balance),
                initial_balance,
                trades: Vec::new(),
                validation_reports: reports,
                ticks_processed: 0,
                failed_ticks: 0,
                last_error: None,
            };
            inner.events.publish(session.status_event());
            inner.events.publish(session.market_event());
            let status = session.status();
            *guard = Some(session);
            status
        };

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        *control = Some(ReplayScheduler::spawn(speed, move || {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(inner) => inner.tick(session_id).await,
                    None => TickOutcome::Finished,
                }
            }
        }));

        info!(session_id = %session_id, balance = %initial_balance, "리플레이 시작");
        Ok(status)
    }

    /// 리플레이 중지.
    ///
    /// 반환 이후 틱은 세션 상태를 변경하지 않습니다. 마지막 틱과 체결 기록은 유지됩니다.
    pub async fn stop(&self) -> Result<()> {
        let inner = &self.inner;
        let mut control = inner.control.lock().await;

        if let Some(scheduler) = control.take() {
            scheduler.shutdown();
        }

        let mut guard = inner.session.write().await;
        if let Some(session) = guard.as_mut() {
            if session.state != ReplayState::Stopped {
                let previous = session.state;
                session.state = ReplayState::Stopped;
                inner.events.publish(session.status_event());
                info!(
                    session_id = %session.id,
                    from = ?previous,
                    virtual_time = %session.current,
                    "리플레이 중지"
                );
            }
        }
        Ok(())
    }

    /// 일시정지 (Running → Paused).
    pub async fn pause(&self) -> Result<ReplayState> {
        let inner = &self.inner;
        let control = inner.control.lock().await;
        let mut guard = inner.session.write().await;
        let session = guard.as_mut().ok_or(ReplayError::NotActive)?;

        match session.state {
            ReplayState::Running => {
                session.state = ReplayState::Paused;
                if let Some(scheduler) = control.as_ref() {
                    scheduler.set_paused(true);
                }
                inner.events.publish(session.status_event());
                info!(session_id = %session.id, virtual_time = %session.current, "리플레이 일시정지");
                Ok(session.state)
            }
            ReplayState::Paused => Ok(session.state),
            ReplayState::Stopped | ReplayState::Completed => Err(ReplayError::NotActive),
        }
    }

    /// 재개 (Paused → Running).
    pub async fn resume(&self) -> Result<ReplayState> {
        let inner = &self.inner;
        let control = inner.control.lock().await;
        let mut guard = inner.session.write().await;
        let session = guard.as_mut().ok_or(ReplayError::NotActive)?;

        match session.state {
            ReplayState::Paused => {
                session.state = ReplayState::Running;
                if let Some(scheduler) = control.as_ref() {
                    scheduler.set_paused(false);
                }
                inner.events.publish(session.status_event());
                info!(session_id = %session.id, virtual_time = %session.current, "리플레이 재개");
                Ok(session.state)
            }
            ReplayState::Running => Ok(session.state),
            ReplayState::Stopped | ReplayState::Completed => Err(ReplayError::NotActive),
        }
    }

    /// 틱 간격 변경 (일시정지 중에도 즉시 적용).
    pub async fn set_speed(&self, speed: Duration) -> Result<()> {
        if speed.is_zero() {
            return Err(ReplayError::InvalidRequest("틱 간격은 0보다 커야 함".to_string()));
        }

        let inner = &self.inner;
        let control = inner.control.lock().await;
        let mut guard = inner.session.write().await;
        let session = guard
            .as_mut()
            .filter(|s| s.state.is_active())
            .ok_or(ReplayError::NotActive)?;

        session.speed = speed;
        if let Some(scheduler) = control.as_ref() {
            scheduler.set_interval(speed);
        }
        info!(session_id = %session.id, speed_ms = speed.as_millis() as u64, "틱 간격 변경");
        Ok(())
    }

    /// 심볼 목록 교체.
    ///
    /// 진행 중인 틱은 여전히 설정된 심볼의 시세만 반영합니다.
    /// 새 심볼의 시세는 다음 틱부터 생깁니다.
    pub async fn update_symbols(&self, symbols: Vec<String>) -> Result<()> {
        let symbols = normalize_symbols(&symbols);
        if symbols.is_empty() {
            return Err(ReplayError::InvalidRequest("심볼 목록이 비어 있음".to_string()));
        }

        let mut guard = self.inner.session.write().await;
        let session = guard
            .as_mut()
            .filter(|s| s.state.is_active())
            .ok_or(ReplayError::NotActive)?;

        session.quotes.retain(|symbol, _| symbols.contains(symbol));
        info!(session_id = %session.id, symbols = ?symbols, "심볼 목록 변경");
        session.symbols = symbols;
        Ok(())
    }

    /// 모의 체결.
    ///
    /// 현재 가상 시각의 시세로 체결합니다. 체결 기록 저장 실패는 경고로만 알립니다.
    pub async fn execute_trade(&self, request: TradeRequest) -> Result<TradeResult> {
        let inner = &self.inner;

        let result = {
            let mut guard = inner.session.write().await;
            let session = guard
                .as_mut()
                .filter(|s| s.state.is_active())
                .ok_or(ReplayError::NotActive)?;

            let quote = session.quotes.get(&request.symbol);
            let result = match inner.engine.execute(
                session.id,
                &mut session.account,
                quote,
                &request,
                session.current,
            ) {
                Ok(result) => result,
                Err(e) => {
                    warn!(
                        session_id = %session.id,
                        symbol = %request.symbol,
                        error = %e,
                        "모의 체결 거부"
                    );
                    return Err(e.into());
                }
            };

            session.trades.push(result.trade.clone());
            inner.events.publish(ReplayEvent::TradeExecuted {
                session_id: session.id,
                trade: result.trade.clone(),
                result: result.clone(),
            });
            result
        };

        if let Err(e) = inner.trade_log.append(&result.trade).await {
            let message = format!("체결 기록 저장 실패: {}", e);
            warn!(session_id = %result.trade.session_id, error = %e, "체결 기록 저장 실패");
            inner.events.publish(ReplayEvent::Warning {
                session_id: Some(result.trade.session_id),
                message,
                virtual_time: Some(result.trade.executed_at),
            });
        }

        Ok(result)
    }

    // ==================== 조회 ====================

    /// 성과 지표 스냅샷.
    pub async fn get_metrics(&self) -> ReplayMetrics {
        let guard = self.inner.session.read().await;
        let Some(session) = guard.as_ref() else {
            return ReplayMetrics {
                current_balance: self.inner.config.initial_balance,
                equity: self.inner.config.initial_balance,
                ..ReplayMetrics::default()
            };
        };

        let tracker = PerformanceTracker::from_trades(&session.trades);
        let summary = tracker.summarize(session.initial_balance, &session.account, |symbol| {
            session.quotes.get(symbol).map(|q| q.price)
        });

        ReplayMetrics {
            progress: session.progress(),
            current_balance: session.account.balance,
            total_profit: summary.total_profit,
            total_trades: summary.total_trades,
            win_rate: summary.win_rate,
            realized_pnl: summary.realized_pnl,
            unrealized_pnl: summary.unrealized_pnl,
            equity: summary.equity,
        }
    }

    /// 현재 시세 스냅샷.
    pub async fn get_current_market_state(&self) -> Vec<ProjectedQuote> {
        self.inner
            .session
            .read()
            .await
            .as_ref()
            .map(Session::quote_snapshot)
            .unwrap_or_default()
    }

    /// 세션 상태 스냅샷 (세션이 없으면 `None`).
    pub async fn status(&self) -> Option<ReplayStatus> {
        self.inner.session.read().await.as_ref().map(Session::status)
    }

    /// 실행 또는 일시정지 중인지 여부.
    pub async fn is_active(&self) -> bool {
        self.inner
            .session
            .read()
            .await
            .as_ref()
            .is_some_and(|s| s.state.is_active())
    }

    /// 세션 체결 기록.
    pub async fn trades(&self) -> Vec<SimulatedTrade> {
        self.inner
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.trades.clone())
            .unwrap_or_default()
    }

    /// 세션 계좌 스냅샷.
    pub async fn account(&self) -> Option<AccountState> {
        self.inner
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.account.clone())
    }

    /// 시작 시 수행한 데이터 검증 리포트.
    pub async fn validation_reports(&self) -> Vec<ValidationReport> {
        self.inner
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.validation_reports.clone())
            .unwrap_or_default()
    }
}

impl Inner {
    /// 한 틱 처리.
    async fn tick(&self, session_id: Uuid) -> TickOutcome {
        // 1. 락 안에서 다음 가상 시각 계산
        let (symbols, next) = {
            let mut guard = self.session.write().await;
            let Some(session) = guard.as_mut().filter(|s| s.id == session_id) else {
                return TickOutcome::Finished;
            };
            match session.state {
                ReplayState::Running => {}
                ReplayState::Paused => return TickOutcome::Continue,
                ReplayState::Stopped | ReplayState::Completed => return TickOutcome::Finished,
            }
            if session.current >= session.end {
                self.complete(session);
                return TickOutcome::Finished;
            }
            let next = (session.current + tick_step()).min(session.end);
            (session.symbols.clone(), next)
        };

        // 2. 락 없이 시세 투영
        let projected = self.projector.project(&symbols, next).await;

        // 3. 다시 락을 잡고 반영
        let mut guard = self.session.write().await;
        let Some(session) = guard.as_mut().filter(|s| s.id == session_id) else {
            return TickOutcome::Finished;
        };
        if !session.state.is_active() {
            debug!(session_id = %session_id, "중지된 세션, 틱 결과 폐기");
            return TickOutcome::Finished;
        }

        session.current = next;
        session.ticks_processed += 1;

        match projected {
            Ok(quotes) => {
                for quote in quotes {
                    if session.symbols.contains(&quote.symbol) {
                        session.quotes.insert(quote.symbol.clone(), quote);
                    }
                }
                debug!(
                    session_id = %session_id,
                    virtual_time = %next,
                    progress = session.progress(),
                    "틱 처리"
                );
                self.events.publish(session.market_event());
            }
            Err(e) => {
                session.failed_ticks += 1;
                session.last_error = Some(e.to_string());
                warn!(
                    session_id = %session_id,
                    virtual_time = %next,
                    error = %e,
                    "시세 조회 실패, 이전 시세 유지"
                );
                self.events.publish(ReplayEvent::Warning {
                    session_id: Some(session_id),
                    message: format!("시세 조회 실패: {}", e),
                    virtual_time: Some(next),
                });
            }
        }

        if session.current >= session.end {
            self.complete(session);
            return TickOutcome::Finished;
        }
        TickOutcome::Continue
    }

    fn complete(&self, session: &mut Session) {
        session.state = ReplayState::Completed;
        self.events.publish(session.status_event());
        info!(
            session_id = %session.id,
            virtual_time = %session.current,
            ticks = session.ticks_processed,
            failed_ticks = session.failed_ticks,
            trades = session.trades.len(),
            "리플레이 완료"
        );
    }
}
