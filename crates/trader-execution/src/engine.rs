//! 모의 체결 엔진.
//!
//! 현재 가상 시각에 투영된 시세를 기준으로 주문을 체결하고
//! 계좌 잔고와 포지션을 갱신합니다. 체결 기록 저장은 호출자(리플레이 컨트롤러)의 몫입니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use trader_core::{AccountState, OrderType, ProjectedQuote, Side, SimulatedTrade};
use uuid::Uuid;

use crate::config::ExecutionConfig;
use crate::error::{ExecutionError, Result};
use crate::pricing::{apply_slippage, clamp_to_limit, validate_funds};

/// 체결 요청.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRequest {
    /// 심볼
    pub symbol: String,
    /// 방향
    pub side: Side,
    /// 수량
    pub quantity: Decimal,
    /// 주문 유형
    pub order_type: OrderType,
    /// 지정가 (지정가 주문일 때 필수)
    pub limit_price: Option<Decimal>,
}

impl TradeRequest {
    /// 시장가 주문.
    pub fn market(symbol: impl Into<String>, side: Side, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            order_type: OrderType::Market,
            limit_price: None,
        }
    }

    /// 지정가 주문.
    pub fn limit(symbol: impl Into<String>, side: Side, quantity: Decimal, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            order_type: OrderType::Limit,
            limit_price: Some(price),
        }
    }
}

/// 체결 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeResult {
    /// 체결 성공 여부
    pub success: bool,
    /// 체결가
    pub execution_price: Decimal,
    /// 수수료
    pub commission: Decimal,
    /// 체결 금액 (체결가 × 수량)
    pub total_cost: Decimal,
    /// 체결 후 잔고
    pub new_balance: Decimal,
    /// 체결 기록
    pub trade: SimulatedTrade,
}

/// 모의 체결 엔진.
#[derive(Debug, Clone, Default)]
pub struct TradeExecutionEngine {
    config: ExecutionConfig,
}

impl TradeExecutionEngine {
    /// 새 체결 엔진 생성.
    pub fn new(config: ExecutionConfig) -> Self {
        Self { config }
    }

    /// 설정 조회.
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// 주문 체결.
    ///
    /// 실패 시 계좌는 변경되지 않습니다. 매도는 보유 수량을 확인하지 않으므로
    /// 포지션이 음수(숏)가 될 수 있습니다. 체결 시각은 가상 시각입니다.
    pub fn execute(
        &self,
        session_id: Uuid,
        account: &mut AccountState,
        quote: Option<&ProjectedQuote>,
        request: &TradeRequest,
        virtual_time: DateTime<Utc>,
    ) -> Result<TradeResult> {
        if request.quantity <= Decimal::ZERO {
            return Err(ExecutionError::InvalidQuantity {
                quantity: request.quantity,
            });
        }

        let limit = match request.order_type {
            OrderType::Market => None,
            OrderType::Limit => {
                let limit = request.limit_price.ok_or(ExecutionError::MissingLimitPrice)?;
                if limit <= Decimal::ZERO {
                    return Err(ExecutionError::InvalidPrice { price: limit });
                }
                Some(limit)
            }
        };

        let quote = quote
            .filter(|q| q.symbol == request.symbol)
            .ok_or_else(|| ExecutionError::NoMarketData {
                symbol: request.symbol.clone(),
            })?;
        if quote.price <= Decimal::ZERO {
            return Err(ExecutionError::InvalidPrice { price: quote.price });
        }

        let overflow = || ExecutionError::AmountOverflow {
            symbol: request.symbol.clone(),
            quantity: request.quantity,
        };

        let slipped = apply_slippage(
            quote.price,
            self.config.effective_slippage_rate(),
            request.side,
        )
        .ok_or_else(overflow)?;
        let execution_price = match limit {
            Some(limit) => clamp_to_limit(slipped, limit, request.side),
            None => slipped,
        };

        // 매수 금액이 계산 범위를 넘으면 어떤 잔고로도 감당할 수 없음
        let total_cost = match execution_price.checked_mul(request.quantity) {
            Some(total) => total,
            None if request.side == Side::Buy => {
                return Err(ExecutionError::InsufficientFunds {
                    required: Decimal::MAX,
                    available: account.balance,
                })
            }
            None => return Err(overflow()),
        };
        let commission = self
            .config
            .commission
            .commission(total_cost)
            .ok_or_else(overflow)?;

        // 계좌를 건드리기 전에 새 잔고와 포지션을 모두 계산
        let new_balance = match request.side {
            Side::Buy => {
                let required = validate_funds(total_cost, commission, account.balance)?;
                account.balance - required
            }
            Side::Sell => total_cost
                .checked_sub(commission)
                .and_then(|net| account.balance.checked_add(net))
                .ok_or_else(overflow)?,
        };
        account
            .position(&request.symbol)
            .checked_add(request.side.sign() * request.quantity)
            .ok_or_else(overflow)?;

        account.balance = new_balance;
        account.apply_fill(&request.symbol, request.side, request.quantity);

        debug!(
            symbol = %request.symbol,
            quote = %quote.price,
            slipped = %slipped,
            execution_price = %execution_price,
            "체결가 산출"
        );
        info!(
            session_id = %session_id,
            symbol = %request.symbol,
            side = %request.side,
            quantity = %request.quantity,
            price = %execution_price,
            commission = %commission,
            balance = %account.balance,
            "모의 체결"
        );

        let trade = SimulatedTrade {
            session_id,
            symbol: request.symbol.clone(),
            side: request.side,
            quantity: request.quantity,
            price: execution_price,
            commission,
            executed_at: virtual_time,
        };

        Ok(TradeResult {
            success: true,
            execution_price,
            commission,
            total_cost,
            new_balance: account.balance,
            trade,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommissionPolicy;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 9, 45, 0).unwrap()
    }

    fn quote(price: Decimal) -> ProjectedQuote {
        ProjectedQuote::historical("AAPL", price, dec!(1000), at())
    }

    fn engine(commission: CommissionPolicy) -> TradeExecutionEngine {
        TradeExecutionEngine::new(ExecutionConfig {
            commission,
            ..ExecutionConfig::default()
        })
    }

    #[test]
    fn test_buy_applies_slippage_and_debits_balance() {
        let engine = engine(CommissionPolicy::Free);
        let mut account = AccountState::new(dec!(10_000));
        let request = TradeRequest::market("AAPL", Side::Buy, dec!(10));

        let result = engine
            .execute(Uuid::new_v4(), &mut account, Some(&quote(dec!(100))), &request, at())
            .unwrap();

        assert!(result.success);
        assert_eq!(result.execution_price, dec!(100.1));
        assert_eq!(result.total_cost, dec!(1001));
        assert_eq!(result.new_balance, dec!(8999));
        assert_eq!(account.position("AAPL"), dec!(10));
        assert_eq!(result.trade.executed_at, at());
    }

    #[test]
    fn test_sell_credits_balance_net_of_commission() {
        let engine = engine(CommissionPolicy::Flat(dec!(1)));
        let mut account = AccountState::new(dec!(0));
        let request = TradeRequest::market("AAPL", Side::Sell, dec!(10));

        let result = engine
            .execute(Uuid::new_v4(), &mut account, Some(&quote(dec!(100))), &request, at())
            .unwrap();

        assert_eq!(result.execution_price, dec!(99.9));
        assert_eq!(result.commission, dec!(1));
        assert_eq!(result.new_balance, dec!(998));
        // 보유 수량 확인 없이 숏 포지션
        assert_eq!(account.position("AAPL"), dec!(-10));
    }

    #[test]
    fn test_insufficient_funds_leaves_account_unchanged() {
        let engine = TradeExecutionEngine::new(ExecutionConfig {
            slippage_enabled: false,
            ..ExecutionConfig::default()
        });
        let mut account = AccountState::new(dec!(1000));
        let before = account.clone();
        let request = TradeRequest::market("AAPL", Side::Buy, dec!(100));

        let err = engine
            .execute(Uuid::new_v4(), &mut account, Some(&quote(dec!(50))), &request, at())
            .unwrap_err();

        assert_eq!(
            err,
            ExecutionError::InsufficientFunds {
                required: dec!(5000),
                available: dec!(1000)
            }
        );
        assert_eq!(err.kind(), trader_core::ErrorKind::InsufficientFunds);
        assert_eq!(account, before);
    }

    #[test]
    fn test_no_market_data() {
        let engine = TradeExecutionEngine::default();
        let mut account = AccountState::new(dec!(1000));
        let request = TradeRequest::market("MSFT", Side::Buy, dec!(1));

        let err = engine
            .execute(Uuid::new_v4(), &mut account, None, &request, at())
            .unwrap_err();
        assert_eq!(err.kind(), trader_core::ErrorKind::NoMarketData);

        // 다른 심볼의 시세는 사용하지 않음
        let err = engine
            .execute(Uuid::new_v4(), &mut account, Some(&quote(dec!(100))), &request, at())
            .unwrap_err();
        assert!(matches!(err, ExecutionError::NoMarketData { .. }));
    }

    #[test]
    fn test_limit_order_clamps_price() {
        let engine = TradeExecutionEngine::default();
        let mut account = AccountState::new(dec!(10_000));

        let buy = TradeRequest::limit("AAPL", Side::Buy, dec!(1), dec!(100.05));
        let result = engine
            .execute(Uuid::new_v4(), &mut account, Some(&quote(dec!(100))), &buy, at())
            .unwrap();
        assert_eq!(result.execution_price, dec!(100.05));

        let sell = TradeRequest::limit("AAPL", Side::Sell, dec!(1), dec!(99.95));
        let result = engine
            .execute(Uuid::new_v4(), &mut account, Some(&quote(dec!(100))), &sell, at())
            .unwrap();
        assert_eq!(result.execution_price, dec!(99.95));
    }

    #[test]
    fn test_invalid_requests() {
        let engine = TradeExecutionEngine::default();
        let mut account = AccountState::new(dec!(10_000));
        let q = quote(dec!(100));

        let zero = TradeRequest::market("AAPL", Side::Buy, dec!(0));
        assert!(matches!(
            engine.execute(Uuid::new_v4(), &mut account, Some(&q), &zero, at()),
            Err(ExecutionError::InvalidQuantity { .. })
        ));

        let mut no_limit = TradeRequest::limit("AAPL", Side::Buy, dec!(1), dec!(100));
        no_limit.limit_price = None;
        let err = engine
            .execute(Uuid::new_v4(), &mut account, Some(&q), &no_limit, at())
            .unwrap_err();
        assert_eq!(err, ExecutionError::MissingLimitPrice);
        assert_eq!(err.kind(), trader_core::ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_rate_commission() {
        let engine = TradeExecutionEngine::new(ExecutionConfig {
            slippage_enabled: false,
            commission: CommissionPolicy::Rate(dec!(0.001)),
            ..ExecutionConfig::default()
        });
        let mut account = AccountState::new(dec!(10_000));
        let request = TradeRequest::market("AAPL", Side::Buy, dec!(10));

        let result = engine
            .execute(Uuid::new_v4(), &mut account, Some(&quote(dec!(100))), &request, at())
            .unwrap();
        assert_eq!(result.commission, dec!(1));
        assert_eq!(result.new_balance, dec!(8999));
    }

    #[test]
    fn test_huge_quantity_is_rejected_without_panic() {
        let engine = TradeExecutionEngine::default();
        let mut account = AccountState::new(dec!(10_000));
        let before = account.clone();

        let buy = TradeRequest::market("AAPL", Side::Buy, Decimal::MAX);
        let err = engine
            .execute(Uuid::new_v4(), &mut account, Some(&quote(dec!(100))), &buy, at())
            .unwrap_err();
        assert_eq!(
            err,
            ExecutionError::InsufficientFunds {
                required: Decimal::MAX,
                available: dec!(10_000)
            }
        );

        let sell = TradeRequest::market("AAPL", Side::Sell, Decimal::MAX);
        let err = engine
            .execute(Uuid::new_v4(), &mut account, Some(&quote(dec!(100))), &sell, at())
            .unwrap_err();
        assert!(matches!(err, ExecutionError::AmountOverflow { .. }));
        assert_eq!(err.kind(), trader_core::ErrorKind::InvalidRequest);
        assert_eq!(account, before);
    }
}
