//! 메모리 기반 저장소 구현.
//!
//! 테스트와 데모 실행에서 DB 없이 리플레이를 구동할 때 사용합니다.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use trader_core::{Bar, SimulatedTrade, Timeframe};
use uuid::Uuid;

use super::{AccountStore, BarStore, TradeLog};
use crate::error::Result;

// ==================== InMemoryBarStore ====================

/// 메모리 기반 캔들 저장소.
///
/// 심볼별 캔들을 시간순으로 유지합니다.
#[derive(Debug, Default)]
pub struct InMemoryBarStore {
    bars: RwLock<HashMap<String, Vec<Bar>>>,
}

impl InMemoryBarStore {
    /// 빈 저장소 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 캔들 목록으로 저장소 생성.
    pub fn with_bars(bars: impl IntoIterator<Item = Bar>) -> Self {
        let mut map: HashMap<String, Vec<Bar>> = HashMap::new();
        for bar in bars {
            map.entry(bar.symbol.clone()).or_default().push(bar);
        }
        for series in map.values_mut() {
            series.sort_by_key(|b| b.timestamp);
        }
        Self {
            bars: RwLock::new(map),
        }
    }

    /// 캔들 추가 (같은 심볼/타임프레임/시각이면 교체).
    pub async fn insert(&self, bar: Bar) {
        let mut guard = self.bars.write().await;
        let series = guard.entry(bar.symbol.clone()).or_default();
        match series.binary_search_by_key(&bar.timestamp, |b| b.timestamp) {
            Ok(idx) if series[idx].timeframe == bar.timeframe => series[idx] = bar,
            Ok(idx) | Err(idx) => series.insert(idx, bar),
        }
    }

    /// 저장된 캔들 수.
    pub async fn len(&self) -> usize {
        self.bars.read().await.values().map(Vec::len).sum()
    }

    /// 비어 있는지 여부.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl BarStore for InMemoryBarStore {
    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>> {
        let guard = self.bars.read().await;
        Ok(guard
            .get(symbol)
            .map(|series| {
                series
                    .iter()
                    .filter(|b| b.timeframe == timeframe)
                    .filter(|b| b.timestamp >= start && b.timestamp <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_bar_near(&self, symbol: &str, timestamp: DateTime<Utc>) -> Result<Option<Bar>> {
        let guard = self.bars.read().await;
        let Some(series) = guard.get(symbol) else {
            return Ok(None);
        };

        let day_start = timestamp
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or(timestamp);
        let day_end = day_start + Duration::days(1);

        // 시간순 정렬이므로 차이가 같으면 먼저 나온(더 이른) 캔들이 남는다
        let nearest = series
            .iter()
            .filter(|b| b.timestamp >= day_start && b.timestamp < day_end)
            .min_by_key(|b| (b.timestamp - timestamp).num_milliseconds().abs())
            .cloned();

        Ok(nearest)
    }
}

// ==================== InMemoryTradeLog ====================

/// 메모리 기반 체결 기록.
#[derive(Debug, Default)]
pub struct InMemoryTradeLog {
    trades: RwLock<Vec<SimulatedTrade>>,
}

impl InMemoryTradeLog {
    /// 빈 기록 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 전체 기록 수.
    pub async fn len(&self) -> usize {
        self.trades.read().await.len()
    }

    /// 비어 있는지 여부.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TradeLog for InMemoryTradeLog {
    async fn append(&self, trade: &SimulatedTrade) -> Result<()> {
        self.trades.write().await.push(trade.clone());
        Ok(())
    }

    async fn trades(&self, session_id: Uuid) -> Result<Vec<SimulatedTrade>> {
        let mut trades: Vec<SimulatedTrade> = self
            .trades
            .read()
            .await
            .iter()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect();
        trades.sort_by_key(|t| t.executed_at);
        Ok(trades)
    }
}

// ==================== InMemoryAccountStore ====================

/// 메모리 기반 계좌 잔고 저장소.
///
/// 등록되지 않은 세션은 기본 잔고를 반환합니다.
#[derive(Debug)]
pub struct InMemoryAccountStore {
    default_balance: Decimal,
    balances: RwLock<HashMap<Uuid, Decimal>>,
}

impl InMemoryAccountStore {
    /// 기본 잔고로 저장소 생성.
    pub fn new(default_balance: Decimal) -> Self {
        Self {
            default_balance,
            balances: RwLock::new(HashMap::new()),
        }
    }

    /// 세션 잔고 설정.
    pub async fn set_balance(&self, session_id: Uuid, balance: Decimal) {
        self.balances.write().await.insert(session_id, balance);
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn get_balance(&self, session_id: Uuid) -> Result<Decimal> {
        Ok(self
            .balances
            .read()
            .await
            .get(&session_id)
            .copied()
            .unwrap_or(self.default_balance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use trader_core::Side;

    fn bar_at(symbol: &str, h: u32, m: u32, close: Decimal) -> Bar {
        Bar::new(
            symbol,
            Timeframe::minutes(1),
            Utc.with_ymd_and_hms(2024, 1, 2, h, m, 0).unwrap(),
            close,
            close,
            close,
            close,
            dec!(100),
        )
    }

    #[tokio::test]
    async fn test_get_bars_filters_range_and_timeframe() {
        let mut daily = bar_at("AAPL", 0, 0, dec!(1));
        daily.timeframe = Timeframe::days(1);
        let store = InMemoryBarStore::with_bars(vec![
            bar_at("AAPL", 9, 32, dec!(3)),
            bar_at("AAPL", 9, 30, dec!(1)),
            bar_at("AAPL", 9, 31, dec!(2)),
            bar_at("MSFT", 9, 31, dec!(9)),
            daily,
        ]);

        let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 2, 9, 31, 0).unwrap();
        let bars = store
            .get_bars("AAPL", Timeframe::minutes(1), start, end)
            .await
            .unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, dec!(1));
        assert_eq!(bars[1].close, dec!(2));
    }

    #[tokio::test]
    async fn test_get_bar_near_same_day_and_tie_break() {
        let store = InMemoryBarStore::with_bars(vec![
            bar_at("AAPL", 9, 30, dec!(1)),
            bar_at("AAPL", 9, 40, dec!(2)),
        ]);

        // 정확히 중간이면 더 이른 캔들
        let mid = Utc.with_ymd_and_hms(2024, 1, 2, 9, 35, 0).unwrap();
        let bar = store.get_bar_near("AAPL", mid).await.unwrap().unwrap();
        assert_eq!(bar.close, dec!(1));

        let later = Utc.with_ymd_and_hms(2024, 1, 2, 9, 39, 0).unwrap();
        let bar = store.get_bar_near("AAPL", later).await.unwrap().unwrap();
        assert_eq!(bar.close, dec!(2));

        // 다른 날짜의 캔들은 사용하지 않음
        let next_day = Utc.with_ymd_and_hms(2024, 1, 3, 9, 30, 0).unwrap();
        assert!(store.get_bar_near("AAPL", next_day).await.unwrap().is_none());
        assert!(store.get_bar_near("TSLA", mid).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_replaces_same_timestamp() {
        let store = InMemoryBarStore::new();
        store.insert(bar_at("AAPL", 9, 30, dec!(1))).await;
        store.insert(bar_at("AAPL", 9, 30, dec!(5))).await;
        assert_eq!(store.len().await, 1);

        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
        let bar = store.get_bar_near("AAPL", ts).await.unwrap().unwrap();
        assert_eq!(bar.close, dec!(5));
    }

    #[tokio::test]
    async fn test_trade_log_filters_by_session() {
        let log = InMemoryTradeLog::new();
        let session = Uuid::new_v4();
        let other = Uuid::new_v4();
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();

        for (sid, qty) in [(session, dec!(1)), (other, dec!(2)), (session, dec!(3))] {
            log.append(&SimulatedTrade {
                session_id: sid,
                symbol: "AAPL".to_string(),
                side: Side::Buy,
                quantity: qty,
                price: dec!(100),
                commission: Decimal::ZERO,
                executed_at: ts,
            })
            .await
            .unwrap();
        }

        let trades = log.trades(session).await.unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(log.len().await, 3);
    }

    #[tokio::test]
    async fn test_account_store_default_balance() {
        let store = InMemoryAccountStore::new(dec!(100_000));
        let session = Uuid::new_v4();
        assert_eq!(store.get_balance(session).await.unwrap(), dec!(100_000));

        store.set_balance(session, dec!(1_000)).await;
        assert_eq!(store.get_balance(session).await.unwrap(), dec!(1_000));
    }
}
