//! 리플레이 실행 명령어.
//!
//! 세션을 시작하고 종료(완료 또는 Ctrl+C)까지 이벤트를 로그로 출력한 뒤,
//! 최종 성과 지표를 JSON으로 출력합니다.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use trader_core::Timeframe;
use trader_data::{PgAccountStore, PgTradeLog};
use trader_replay::{ReplayConfig, ReplayController, ReplayEvent, ReplayRequest};
use uuid::Uuid;

/// `replay run` 인자.
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub symbols: Vec<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub speed_ms: Option<u64>,
    pub timeframe: Option<Timeframe>,
    pub session_id: Option<Uuid>,
}

impl RunArgs {
    fn into_request(self) -> ReplayRequest {
        let mut request = ReplayRequest::new(self.symbols, self.start, self.end);
        if let Some(id) = self.session_id {
            request = request.with_session_id(id);
        }
        if let Some(ms) = self.speed_ms {
            request = request.with_speed(Duration::from_millis(ms));
        }
        if let Some(tf) = self.timeframe {
            request = request.with_timeframe(tf);
        }
        request
    }
}

/// 리플레이 실행.
pub async fn run_replay(
    database_url: &str,
    config: ReplayConfig,
    args: RunArgs,
) -> anyhow::Result<()> {
    let (db, bars) = super::connect(database_url).await?;
    let pool = db.pool().clone();
    let initial_balance = config.initial_balance;

    let controller = ReplayController::new(
        config,
        bars,
        Arc::new(PgTradeLog::new(pool.clone())),
        Arc::new(PgAccountStore::new(pool, initial_balance)),
    );

    // 시작 전에 구독해야 초기 이벤트를 놓치지 않음
    let mut events = controller.subscribe();
    let status = controller.start(args.into_request()).await?;

    info!(
        session_id = %status.session_id,
        symbols = ?status.symbols,
        start = %status.start,
        end = %status.end,
        speed_ms = status.speed_ms,
        "리플레이 시작"
    );

    follow_events(&controller, &mut events, tokio::signal::ctrl_c()).await?;

    let metrics = controller.get_metrics().await;
    println!("{}", serde_json::to_string_pretty(&metrics)?);

    Ok(())
}

/// 세션이 끝나거나 `shutdown`이 완료될 때까지 이벤트 출력.
///
/// `shutdown`이 먼저 끝나면 리플레이를 중지합니다.
pub(crate) async fn follow_events<S>(
    controller: &ReplayController,
    events: &mut broadcast::Receiver<ReplayEvent>,
    shutdown: S,
) -> anyhow::Result<()>
where
    S: Future,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("중단 신호 수신, 리플레이 정지");
                controller.stop().await?;
                break;
            }
            received = events.recv() => match received {
                Ok(event) => {
                    if log_event(&event) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "이벤트 소비 지연, 일부 이벤트 누락");
                    // 누락된 이벤트에 종료 상태가 있었을 수 있음
                    if !controller.is_active().await {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    Ok(())
}

/// 이벤트 로그 출력. 세션이 비활성화되면 `true`.
fn log_event(event: &ReplayEvent) -> bool {
    match event {
        ReplayEvent::MarketUpdate {
            quotes,
            virtual_time,
            progress,
            ..
        } => {
            for quote in quotes {
                tracing::debug!(
                    symbol = %quote.symbol,
                    price = %quote.price,
                    source = ?quote.source,
                    "시세"
                );
            }
            info!(
                virtual_time = %virtual_time,
                progress = %format!("{:.1}%", progress * 100.0),
                "틱"
            );
            false
        }
        ReplayEvent::TradeExecuted { trade, .. } => {
            info!(
                symbol = %trade.symbol,
                side = ?trade.side,
                quantity = %trade.quantity,
                price = %trade.price,
                "체결"
            );
            false
        }
        ReplayEvent::StatusChanged {
            is_active,
            state,
            virtual_time,
            ..
        } => {
            info!(state = ?state, virtual_time = %virtual_time, "상태 변경");
            !is_active
        }
        ReplayEvent::Warning { message, .. } => {
            warn!(message = %message, "리플레이 경고");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use trader_core::{Bar, ReplayState};
    use trader_data::{InMemoryAccountStore, InMemoryBarStore, InMemoryTradeLog};

    #[test]
    fn test_into_request_applies_overrides() {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();
        let id = Uuid::new_v4();
        let request = RunArgs {
            symbols: vec!["AAPL".to_string()],
            start,
            end,
            speed_ms: Some(250),
            timeframe: Some(Timeframe::minutes(5)),
            session_id: Some(id),
        }
        .into_request();

        assert_eq!(request.session_id, id);
        assert_eq!(request.speed, Some(Duration::from_millis(250)));
        assert_eq!(request.timeframe, Some(Timeframe::minutes(5)));
    }

    fn bars() -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
        (0..=30)
            .map(|i| {
                let close = Decimal::from(100 + i);
                Bar::new(
                    "AAPL",
                    Timeframe::minutes(1),
                    start + chrono::Duration::minutes(i),
                    close,
                    close,
                    close,
                    close,
                    Decimal::from(1000),
                )
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_events_returns_after_lagged_completion() {
        let mut config = ReplayConfig::default();
        config.event_capacity = 1;
        let controller = ReplayController::new(
            config,
            Arc::new(InMemoryBarStore::with_bars(bars())),
            Arc::new(InMemoryTradeLog::new()),
            Arc::new(InMemoryAccountStore::new(Decimal::from(100_000))),
        );
        let mut events = controller.subscribe();
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
        controller
            .start(
                ReplayRequest::new(vec!["AAPL".to_string()], start, start + chrono::Duration::minutes(30))
                    .with_speed(Duration::from_millis(10)),
            )
            .await
            .unwrap();

        // 구독자가 읽지 않는 동안 리플레이 완료
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!controller.is_active().await);

        tokio::time::timeout(
            Duration::from_secs(5),
            follow_events(&controller, &mut events, std::future::pending::<()>()),
        )
        .await
        .expect("완료된 세션에서 대기하면 안 됨")
        .unwrap();
        assert_eq!(controller.status().await.unwrap().state, ReplayState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_events_stops_on_shutdown() {
        let controller = ReplayController::new(
            ReplayConfig::default(),
            Arc::new(InMemoryBarStore::with_bars(bars())),
            Arc::new(InMemoryTradeLog::new()),
            Arc::new(InMemoryAccountStore::new(Decimal::from(100_000))),
        );
        let mut events = controller.subscribe();
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
        controller
            .start(ReplayRequest::new(
                vec!["AAPL".to_string()],
                start,
                start + chrono::Duration::minutes(30),
            ))
            .await
            .unwrap();

        follow_events(&controller, &mut events, tokio::time::sleep(Duration::from_millis(1500)))
            .await
            .unwrap();
        assert_eq!(controller.status().await.unwrap().state, ReplayState::Stopped);
    }

    #[test]
    fn test_log_event_stops_on_inactive_status() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();
        let completed = ReplayEvent::StatusChanged {
            session_id: Uuid::new_v4(),
            is_active: false,
            state: ReplayState::Completed,
            virtual_time: at,
        };
        let paused = ReplayEvent::StatusChanged {
            session_id: Uuid::new_v4(),
            is_active: true,
            state: ReplayState::Paused,
            virtual_time: at,
        };
        assert!(log_event(&completed));
        assert!(!log_event(&paused));
    }
}
