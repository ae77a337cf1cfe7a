//! 체결가 계산 헬퍼.

use rust_decimal::Decimal;
use trader_core::Side;

use crate::error::{ExecutionError, Result};

/// 슬리피지 적용 가격 계산.
///
/// 항상 거래자에게 불리한 방향으로 적용됩니다. 계산 범위를 넘으면 `None`.
pub fn apply_slippage(price: Decimal, slippage_rate: Decimal, side: Side) -> Option<Decimal> {
    let slippage = price.checked_mul(slippage_rate)?;
    match side {
        Side::Buy => price.checked_add(slippage),  // 매수는 높은 가격
        Side::Sell => price.checked_sub(slippage), // 매도는 낮은 가격
    }
}

/// 지정가 경계 적용.
///
/// 매수는 지정가를 넘을 수 없고, 매도는 지정가 아래로 내려갈 수 없습니다.
pub fn clamp_to_limit(price: Decimal, limit: Decimal, side: Side) -> Decimal {
    match side {
        Side::Buy => price.min(limit),
        Side::Sell => price.max(limit),
    }
}

/// 자금 검증.
///
/// 체결 금액 + 수수료가 잔고를 초과하면 에러를 반환하고, 아니면 필요 금액을 반환합니다.
/// 합계가 계산 범위를 넘으면 필요 금액을 `Decimal::MAX`로 보고합니다.
pub fn validate_funds(total_cost: Decimal, commission: Decimal, balance: Decimal) -> Result<Decimal> {
    let required = total_cost.checked_add(commission).unwrap_or(Decimal::MAX);
    if required > balance {
        return Err(ExecutionError::InsufficientFunds {
            required,
            available: balance,
        });
    }
    Ok(required)
}
