//! 슬리피지 경계 통합 테스트.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use trader_core::{AccountState, ProjectedQuote, Side};
use trader_execution::{ExecutionConfig, TradeExecutionEngine, TradeRequest};
use uuid::Uuid;

fn execute(side: Side, price: Decimal, rate: Decimal) -> Decimal {
    let engine = TradeExecutionEngine::new(ExecutionConfig {
        slippage_rate: rate,
        ..ExecutionConfig::default()
    });
    let at = Utc.with_ymd_and_hms(2024, 1, 2, 9, 45, 0).unwrap();
    let quote = ProjectedQuote::historical("AAPL", price, dec!(1000), at);
    let mut account = AccountState::new(dec!(1_000_000_000));

    engine
        .execute(
            Uuid::new_v4(),
            &mut account,
            Some(&quote),
            &TradeRequest::market("AAPL", side, dec!(1)),
            at,
        )
        .unwrap()
        .execution_price
}

#[test]
fn test_slippage_bound_at_one_tenth_percent() {
    let buy = execute(Side::Buy, dec!(100), dec!(0.001));
    assert!(buy >= dec!(100.00) && buy <= dec!(100.10));

    let sell = execute(Side::Sell, dec!(100), dec!(0.001));
    assert!(sell >= dec!(99.90) && sell <= dec!(100.00));
}

#[test]
fn test_slippage_disabled_fills_at_quote() {
    let engine = TradeExecutionEngine::new(ExecutionConfig {
        slippage_enabled: false,
        ..ExecutionConfig::default()
    });
    let at = Utc.with_ymd_and_hms(2024, 1, 2, 9, 45, 0).unwrap();
    let quote = ProjectedQuote::synthetic("AAPL", dec!(100), dec!(0), at);
    let mut account = AccountState::new(dec!(1000));

    let result = engine
        .execute(
            Uuid::new_v4(),
            &mut account,
            Some(&quote),
            &TradeRequest::market("AAPL", Side::Buy, dec!(1)),
            at,
        )
        .unwrap();
    assert_eq!(result.execution_price, dec!(100));
}

proptest! {
    #[test]
    fn prop_execution_price_within_slippage_band(
        cents in 1i64..1_000_000,
        bps in 0i64..=50,
    ) {
        let price = Decimal::new(cents, 2);
        let rate = Decimal::new(bps, 4);

        let buy = execute(Side::Buy, price, rate);
        prop_assert!(buy >= price);
        prop_assert!(buy <= price * (Decimal::ONE + rate));

        let sell = execute(Side::Sell, price, rate);
        prop_assert!(sell <= price);
        prop_assert!(sell >= price * (Decimal::ONE - rate));
    }
}
