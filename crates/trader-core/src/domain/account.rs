//! 모의 계좌 상태.
//!
//! 리플레이 세션이 단독으로 소유하며, 체결을 통해서만 변경됩니다.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::trade::Side;

/// 모의 계좌 상태.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    /// 현금 잔고
    pub balance: Decimal,
    /// 심볼별 보유 수량 (음수는 숏 포지션)
    pub positions: HashMap<String, Decimal>,
}

impl AccountState {
    /// 초기 잔고로 계좌 생성.
    pub fn new(balance: Decimal) -> Self {
        Self {
            balance,
            positions: HashMap::new(),
        }
    }

    /// 심볼 보유 수량 (없으면 0).
    pub fn position(&self, symbol: &str) -> Decimal {
        self.positions.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }

    /// 체결을 포지션에 반영.
    ///
    /// 수량이 0이 되면 항목을 제거합니다.
    pub fn apply_fill(&mut self, symbol: &str, side: Side, quantity: Decimal) {
        let next = self.position(symbol) + side.sign() * quantity;
        if next.is_zero() {
            self.positions.remove(symbol);
        } else {
            self.positions.insert(symbol.to_string(), next);
        }
    }

    /// 포지션 평가액 합계.
    ///
    /// `price_of`가 `None`을 반환하는 심볼은 합계에서 제외됩니다.
    pub fn position_value<F>(&self, mut price_of: F) -> Decimal
    where
        F: FnMut(&str) -> Option<Decimal>,
    {
        self.positions
            .iter()
            .filter_map(|(symbol, qty)| price_of(symbol).map(|price| price * *qty))
            .sum()
    }
}

impl Default for AccountState {
    fn default() -> Self {
        Self::new(Decimal::ZERO)
    }
}
