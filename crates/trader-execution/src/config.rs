//! 체결 설정.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 수수료 정책.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CommissionPolicy {
    /// 수수료 없음
    Free,
    /// 건당 고정 금액
    Flat(Decimal),
    /// 체결 금액 대비 비율 (예: 0.001 = 0.1%)
    Rate(Decimal),
}

impl CommissionPolicy {
    /// 체결 금액에 대한 수수료.
    ///
    /// 계산 범위를 넘으면 `None`.
    pub fn commission(&self, notional: Decimal) -> Option<Decimal> {
        match self {
            Self::Free => Some(Decimal::ZERO),
            Self::Flat(amount) => Some(*amount),
            Self::Rate(rate) => notional.checked_mul(*rate),
        }
    }
}

impl Default for CommissionPolicy {
    fn default() -> Self {
        Self::Free
    }
}

/// 체결 설정.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// 슬리피지 적용 여부
    #[serde(default = "default_slippage_enabled")]
    pub slippage_enabled: bool,
    /// 슬리피지율 (예: 0.001 = 0.1%)
    #[serde(default = "default_slippage_rate")]
    pub slippage_rate: Decimal,
    /// 수수료 정책
    #[serde(default)]
    pub commission: CommissionPolicy,
}

fn default_slippage_enabled() -> bool {
    true
}

fn default_slippage_rate() -> Decimal {
    Decimal::new(1, 3) // 0.1%
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            slippage_enabled: default_slippage_enabled(),
            slippage_rate: default_slippage_rate(),
            commission: CommissionPolicy::Free,
        }
    }
}

impl ExecutionConfig {
    /// 실제 적용될 슬리피지율 (비활성화 시 0).
    pub fn effective_slippage_rate(&self) -> Decimal {
        if self.slippage_enabled {
            self.slippage_rate
        } else {
            Decimal::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_execution_config_default() {
        let config = ExecutionConfig::default();
        assert!(config.slippage_enabled);
        assert_eq!(config.slippage_rate, dec!(0.001));
        assert_eq!(config.commission, CommissionPolicy::Free);
    }

    #[test]
    fn test_commission_policy() {
        assert_eq!(CommissionPolicy::Free.commission(dec!(5000)), Some(dec!(0)));
        assert_eq!(CommissionPolicy::Flat(dec!(1.5)).commission(dec!(5000)), Some(dec!(1.5)));
        assert_eq!(CommissionPolicy::Rate(dec!(0.001)).commission(dec!(5000)), Some(dec!(5)));
        assert_eq!(CommissionPolicy::Rate(dec!(2)).commission(Decimal::MAX), None);
    }

    #[test]
    fn test_config_deserialize_with_defaults() {
        let config: ExecutionConfig =
            serde_json::from_str(r#"{"commission":{"type":"flat","value":"2"}}"#).unwrap();
        assert!(config.slippage_enabled);
        assert_eq!(config.commission, CommissionPolicy::Flat(dec!(2)));
    }
}
