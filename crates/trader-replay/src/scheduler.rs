//! 가변 간격 틱 스케줄러.
//!
//! 백그라운드 태스크에서 틱 콜백을 순차적으로 호출합니다.
//! 간격 변경은 즉시 적용되고(대기 중인 간격을 새로 시작), 일시정지 중에는 틱을 건너뜁니다.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// 틱 처리 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// 다음 틱 예약
    Continue,
    /// 스케줄링 종료
    Finished,
}

/// 틱 스케줄러 핸들.
///
/// 드롭되면 스케줄링이 취소됩니다.
pub struct ReplayScheduler {
    cancel: CancellationToken,
    interval: watch::Sender<Duration>,
    paused: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ReplayScheduler {
    /// 스케줄러 시작.
    ///
    /// 틱은 겹치지 않습니다. 콜백이 `Finished`를 반환하면 루프를 종료합니다.
    pub fn spawn<F, Fut>(interval: Duration, tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = TickOutcome> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let (interval_tx, interval_rx) = watch::channel(interval);
        let (paused_tx, paused_rx) = watch::channel(false);

        let handle = tokio::spawn(run_loop(tick, cancel.clone(), interval_rx, paused_rx));

        Self {
            cancel,
            interval: interval_tx,
            paused: paused_tx,
            handle,
        }
    }

    /// 틱 간격 변경.
    pub fn set_interval(&self, interval: Duration) {
        self.interval.send_replace(interval);
    }

    /// 현재 틱 간격.
    pub fn interval(&self) -> Duration {
        *self.interval.borrow()
    }

    /// 일시정지/재개.
    pub fn set_paused(&self, paused: bool) {
        self.paused.send_replace(paused);
    }

    /// 일시정지 여부.
    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    /// 루프 종료 여부.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// 스케줄링 취소.
    ///
    /// 반환 이후 새로운 틱은 시작되지 않습니다.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

impl Drop for ReplayScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_loop<F, Fut>(
    mut tick: F,
    cancel: CancellationToken,
    mut interval_rx: watch::Receiver<Duration>,
    mut paused_rx: watch::Receiver<bool>,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = TickOutcome>,
{
    debug!("틱 스케줄러 시작");

    loop {
        if *paused_rx.borrow_and_update() {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = paused_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }
        }

        let period = *interval_rx.borrow_and_update();
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = interval_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                debug!(interval_ms = interval_rx.borrow().as_millis() as u64, "틱 간격 변경");
                continue;
            }
            changed = paused_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            _ = tokio::time::sleep(period) => {}
        }

        if cancel.is_cancelled() {
            break;
        }
        if tick().await == TickOutcome::Finished {
            break;
        }
    }

    debug!("틱 스케줄러 종료");
}
