//! 세션 성과 계산.
//!
//! 체결 기록을 FIFO 로트 매칭으로 재생하여 실현/미실현 손익과 승률을 계산합니다.
//!
//! - 매수는 숏 로트를 먼저 청산한 뒤 남은 수량으로 롱 로트를 엽니다.
//! - 매도는 롱 로트를 먼저 청산한 뒤 남은 수량으로 숏 로트를 엽니다.
//! - 로트를 하나라도 청산한 체결이 청산 거래이며, 순실현손익 > 0 이면 승리입니다.
//! - 수수료는 체결 수량 비례로 청산분과 신규 로트에 나눠 배분합니다.

use std::collections::{HashMap, VecDeque};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use trader_core::{AccountState, SimulatedTrade};

/// 성과 요약.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// 실현 손익 (수수료 차감)
    pub realized_pnl: Decimal,
    /// 미실현 손익 (보유 로트 평가)
    pub unrealized_pnl: Decimal,
    /// 총 손익 (평가 자산 - 초기 잔고)
    pub total_profit: Decimal,
    /// 평가 자산 (잔고 + 포지션 평가액)
    pub equity: Decimal,
    /// 총 체결 수
    pub total_trades: usize,
    /// 청산 거래 수
    pub closing_trades: usize,
    /// 이익 청산 거래 수
    pub winning_trades: usize,
    /// 승률 (0.0 ~ 1.0)
    pub win_rate: f64,
    /// 총 수수료
    pub total_commission: Decimal,
}

/// 보유 로트.
#[derive(Debug, Clone)]
struct Lot {
    /// +1 롱, -1 숏
    direction: Decimal,
    quantity: Decimal,
    price: Decimal,
    commission_per_unit: Decimal,
}

/// 성과 추적기.
#[derive(Debug, Default)]
pub struct PerformanceTracker {
    lots: HashMap<String, VecDeque<Lot>>,
    last_prices: HashMap<String, Decimal>,
    realized_pnl: Decimal,
    total_trades: usize,
    closing_trades: usize,
    winning_trades: usize,
    total_commission: Decimal,
}

impl PerformanceTracker {
    /// 빈 추적기 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 체결 기록 목록으로 추적기 구성.
    pub fn from_trades<'a>(trades: impl IntoIterator<Item = &'a SimulatedTrade>) -> Self {
        let mut tracker = Self::new();
        for trade in trades {
            tracker.record(trade);
        }
        tracker
    }

    /// 체결 반영.
    pub fn record(&mut self, trade: &SimulatedTrade) {
        self.total_trades += 1;
        self.total_commission += trade.commission;
        self.last_prices.insert(trade.symbol.clone(), trade.price);

        if trade.quantity <= Decimal::ZERO {
            return;
        }

        let direction = trade.side.sign();
        let commission_per_unit = trade.commission / trade.quantity;
        let lots = self.lots.entry(trade.symbol.clone()).or_default();

        let mut remaining = trade.quantity;
        let mut closed_quantity = Decimal::ZERO;
        let mut pnl = Decimal::ZERO;

        while remaining > Decimal::ZERO {
            let Some(lot) = lots.front_mut() else { break };
            if lot.direction == direction {
                break;
            }

            let matched = remaining.min(lot.quantity);
            pnl += (trade.price - lot.price) * matched * lot.direction;
            pnl -= lot.commission_per_unit * matched;

            lot.quantity -= matched;
            remaining -= matched;
            closed_quantity += matched;

            if lot.quantity.is_zero() {
                lots.pop_front();
            }
        }

        if closed_quantity > Decimal::ZERO {
            pnl -= commission_per_unit * closed_quantity;
            self.realized_pnl += pnl;
            self.closing_trades += 1;
            if pnl > Decimal::ZERO {
                self.winning_trades += 1;
            }
        }

        if remaining > Decimal::ZERO {
            lots.push_back(Lot {
                direction,
                quantity: remaining,
                price: trade.price,
                commission_per_unit,
            });
        }
    }

    /// 실현 손익.
    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    /// 승률 (청산 거래가 없으면 0).
    pub fn win_rate(&self) -> f64 {
        if self.closing_trades == 0 {
            return 0.0;
        }
        self.winning_trades as f64 / self.closing_trades as f64
    }

    /// 심볼의 평가 가격 (시세 → 마지막 체결가).
    fn mark<F>(&self, symbol: &str, mark_price: &mut F) -> Option<Decimal>
    where
        F: FnMut(&str) -> Option<Decimal>,
    {
        mark_price(symbol).or_else(|| self.last_prices.get(symbol).copied())
    }

    /// 미실현 손익.
    pub fn unrealized_pnl<F>(&self, mut mark_price: F) -> Decimal
    where
        F: FnMut(&str) -> Option<Decimal>,
    {
        let mut total = Decimal::ZERO;
        for (symbol, lots) in &self.lots {
            let Some(mark) = self.mark(symbol, &mut mark_price) else {
                continue;
            };
            total += lots
                .iter()
                .map(|lot| (mark - lot.price) * lot.quantity * lot.direction)
                .sum::<Decimal>();
        }
        total
    }

    /// 성과 요약.
    pub fn summarize<F>(
        &self,
        initial_balance: Decimal,
        account: &AccountState,
        mut mark_price: F,
    ) -> PerformanceSummary
    where
        F: FnMut(&str) -> Option<Decimal>,
    {
        let unrealized_pnl = self.unrealized_pnl(&mut mark_price);
        let equity =
            account.balance + account.position_value(|s| self.mark(s, &mut mark_price));

        PerformanceSummary {
            realized_pnl: self.realized_pnl,
            unrealized_pnl,
            total_profit: equity - initial_balance,
            equity,
            total_trades: self.total_trades,
            closing_trades: self.closing_trades,
            winning_trades: self.winning_trades,
            win_rate: self.win_rate(),
            total_commission: self.total_commission,
        }
    }
}
