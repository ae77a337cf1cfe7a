//! 환경변수 기반 리플레이 설정.

use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use trader_core::Timeframe;
use trader_data::{TradingHours, ValidatorConfig, DEFAULT_GAP_TOLERANCE};
use trader_execution::{CommissionPolicy, ExecutionConfig};

use crate::error::{ReplayError, Result};
use crate::projector::SyntheticQuoteConfig;

/// 리플레이 전체 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// 계좌 저장소에 세션 잔고가 없을 때 사용할 초기 잔고
    pub initial_balance: Decimal,
    /// 체결 설정 (슬리피지, 수수료)
    pub execution: ExecutionConfig,
    /// 기본 틱 간격 (밀리초, 가상 1분당 실제 시간)
    pub default_speed_ms: u64,
    /// 재생 타임프레임
    pub timeframe: Timeframe,
    /// 공백 허용 배수
    pub gap_tolerance: f64,
    /// 합성 시세 설정
    pub synthetic: SyntheticQuoteConfig,
    /// 이벤트 채널 버퍼 크기
    pub event_capacity: usize,
    /// 휴장 필터용 시장 코드 (US, KR)
    pub market: Option<String>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            initial_balance: Decimal::new(100_000, 0),
            execution: ExecutionConfig::default(),
            default_speed_ms: 1000,
            timeframe: Timeframe::minutes(1),
            gap_tolerance: DEFAULT_GAP_TOLERANCE,
            synthetic: SyntheticQuoteConfig::default(),
            event_capacity: 1024,
            market: None,
        }
    }
}

impl ReplayConfig {
    /// 환경변수에서 설정 로드.
    ///
    /// `.env` 파일이 있으면 먼저 읽습니다.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 키 조회 함수로 설정 구성.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parse = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let commission = match (
            parse_opt::<Decimal>("REPLAY_COMMISSION_RATE", parse("REPLAY_COMMISSION_RATE"))?,
            parse_or("REPLAY_COMMISSION_FLAT", parse("REPLAY_COMMISSION_FLAT"), Decimal::ZERO)?,
        ) {
            (Some(rate), _) if rate > Decimal::ZERO => CommissionPolicy::Rate(rate),
            (_, flat) if flat > Decimal::ZERO => CommissionPolicy::Flat(flat),
            _ => CommissionPolicy::Free,
        };

        let timeframe = match parse("REPLAY_TIMEFRAME") {
            Some(raw) => raw
                .parse::<Timeframe>()
                .map_err(|e| ReplayError::Config(format!("REPLAY_TIMEFRAME: {}", e)))?,
            None => defaults.timeframe,
        };

        let market = parse("REPLAY_MARKET").map(|m| m.to_uppercase());
        if let Some(code) = &market {
            if TradingHours::for_market(code).is_none() {
                return Err(ReplayError::Config(format!(
                    "REPLAY_MARKET: 지원하지 않는 시장 코드 {}",
                    code
                )));
            }
        }

        let config = Self {
            initial_balance: parse_or(
                "REPLAY_INITIAL_BALANCE",
                parse("REPLAY_INITIAL_BALANCE"),
                defaults.initial_balance,
            )?,
            execution: ExecutionConfig {
                slippage_enabled: parse_bool(
                    "REPLAY_SLIPPAGE_ENABLED",
                    parse("REPLAY_SLIPPAGE_ENABLED"),
                    defaults.execution.slippage_enabled,
                )?,
                slippage_rate: parse_or(
                    "REPLAY_SLIPPAGE_RATE",
                    parse("REPLAY_SLIPPAGE_RATE"),
                    defaults.execution.slippage_rate,
                )?,
                commission,
            },
            default_speed_ms: parse_or(
                "REPLAY_DEFAULT_SPEED_MS",
                parse("REPLAY_DEFAULT_SPEED_MS"),
                defaults.default_speed_ms,
            )?,
            timeframe,
            gap_tolerance: parse_or(
                "REPLAY_GAP_TOLERANCE",
                parse("REPLAY_GAP_TOLERANCE"),
                defaults.gap_tolerance,
            )?,
            synthetic: SyntheticQuoteConfig {
                seed: parse_opt("REPLAY_SYNTHETIC_SEED", parse("REPLAY_SYNTHETIC_SEED"))?,
                max_deviation: parse_or(
                    "REPLAY_SYNTHETIC_MAX_DEVIATION",
                    parse("REPLAY_SYNTHETIC_MAX_DEVIATION"),
                    defaults.synthetic.max_deviation,
                )?,
                ..defaults.synthetic
            },
            event_capacity: parse_or(
                "REPLAY_EVENT_CAPACITY",
                parse("REPLAY_EVENT_CAPACITY"),
                defaults.event_capacity,
            )?,
            market,
        };
        config.validate()?;
        Ok(config)
    }

    /// 값 범위 검증.
    pub fn validate(&self) -> Result<()> {
        if self.default_speed_ms == 0 {
            return Err(ReplayError::Config(
                "REPLAY_DEFAULT_SPEED_MS는 0보다 커야 합니다".to_string(),
            ));
        }
        if !(self.gap_tolerance.is_finite() && self.gap_tolerance >= 1.0) {
            return Err(ReplayError::Config(
                "REPLAY_GAP_TOLERANCE는 1.0 이상이어야 합니다".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(ReplayError::Config(
                "REPLAY_EVENT_CAPACITY는 0보다 커야 합니다".to_string(),
            ));
        }
        // 1 이상이면 매도 체결가가 0 이하가 됨
        if self.execution.slippage_rate < Decimal::ZERO
            || self.execution.slippage_rate >= Decimal::ONE
        {
            return Err(ReplayError::Config(
                "REPLAY_SLIPPAGE_RATE는 0 이상 1 미만이어야 합니다".to_string(),
            ));
        }
        Ok(())
    }

    /// 기본 틱 간격.
    pub fn default_speed(&self) -> Duration {
        Duration::from_millis(self.default_speed_ms)
    }

    /// 검증기 설정.
    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            gap_tolerance: self.gap_tolerance,
            trading_hours: self.market.as_deref().and_then(TradingHours::for_market),
        }
    }
}

/// 값 파싱 (없으면 기본값, 형식 오류는 에러)
fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    Ok(parse_opt(key, raw)?.unwrap_or(default))
}

/// 선택 값 파싱
fn parse_opt<T: FromStr>(key: &str, raw: Option<String>) -> Result<Option<T>> {
    raw.map(|v| {
        v.parse()
            .map_err(|_| ReplayError::Config(format!("{}: 잘못된 값 {}", key, v)))
    })
    .transpose()
}

/// bool 값 파싱
fn parse_bool(key: &str, raw: Option<String>, default: bool) -> Result<bool> {
    match raw.as_deref().map(str::to_lowercase).as_deref() {
        None => Ok(default),
        Some("true" | "1") => Ok(true),
        Some("false" | "0") => Ok(false),
        Some(other) => Err(ReplayError::Config(format!("{}: 잘못된 값 {}", key, other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> Result<ReplayConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ReplayConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_map(&[]).unwrap();
        assert_eq!(config.initial_balance, dec!(100000));
        assert!(config.execution.slippage_enabled);
        assert_eq!(config.execution.slippage_rate, dec!(0.001));
        assert_eq!(config.execution.commission, CommissionPolicy::Free);
        assert_eq!(config.default_speed(), Duration::from_secs(1));
        assert_eq!(config.timeframe, Timeframe::minutes(1));
        assert_eq!(config.gap_tolerance, 1.5);
        assert_eq!(config.event_capacity, 1024);
        assert!(config.synthetic.seed.is_none());
        assert!(config.validator_config().trading_hours.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = from_map(&[
            ("REPLAY_INITIAL_BALANCE", "5000"),
            ("REPLAY_SLIPPAGE_ENABLED", "false"),
            ("REPLAY_COMMISSION_FLAT", "1.5"),
            ("REPLAY_DEFAULT_SPEED_MS", "250"),
            ("REPLAY_TIMEFRAME", "5m"),
            ("REPLAY_SYNTHETIC_SEED", "42"),
            ("REPLAY_MARKET", "kr"),
        ])
        .unwrap();

        assert_eq!(config.initial_balance, dec!(5000));
        assert!(!config.execution.slippage_enabled);
        assert_eq!(config.execution.commission, CommissionPolicy::Flat(dec!(1.5)));
        assert_eq!(config.default_speed(), Duration::from_millis(250));
        assert_eq!(config.timeframe, Timeframe::minutes(5));
        assert_eq!(config.synthetic.seed, Some(42));
        assert_eq!(config.market.as_deref(), Some("KR"));
        assert!(config.validator_config().trading_hours.is_some());
    }

    #[test]
    fn test_rate_commission_wins_over_flat() {
        let config = from_map(&[
            ("REPLAY_COMMISSION_FLAT", "1"),
            ("REPLAY_COMMISSION_RATE", "0.00015"),
        ])
        .unwrap();
        assert_eq!(
            config.execution.commission,
            CommissionPolicy::Rate(dec!(0.00015))
        );
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            from_map(&[("REPLAY_TIMEFRAME", "7x")]),
            Err(ReplayError::Config(_))
        ));
        assert!(matches!(
            from_map(&[("REPLAY_MARKET", "JP")]),
            Err(ReplayError::Config(_))
        ));
        assert!(matches!(
            from_map(&[("REPLAY_DEFAULT_SPEED_MS", "0")]),
            Err(ReplayError::Config(_))
        ));
    }

    #[test]
    fn test_malformed_numbers_are_rejected() {
        for (key, value) in [
            ("REPLAY_INITIAL_BALANCE", "abc"),
            ("REPLAY_SLIPPAGE_RATE", "0.1%"),
            ("REPLAY_DEFAULT_SPEED_MS", "-5"),
            ("REPLAY_SYNTHETIC_SEED", "seven"),
            ("REPLAY_COMMISSION_RATE", "x"),
            ("REPLAY_SLIPPAGE_ENABLED", "maybe"),
        ] {
            let err = from_map(&[(key, value)]).unwrap_err();
            assert!(
                matches!(&err, ReplayError::Config(msg) if msg.contains(key)),
                "{} = {} -> {:?}",
                key,
                value,
                err
            );
        }
    }

    #[test]
    fn test_slippage_rate_must_be_below_one() {
        assert!(matches!(
            from_map(&[("REPLAY_SLIPPAGE_RATE", "1")]),
            Err(ReplayError::Config(_))
        ));
        assert!(matches!(
            from_map(&[("REPLAY_SLIPPAGE_RATE", "-0.01")]),
            Err(ReplayError::Config(_))
        ));
        let config = from_map(&[("REPLAY_SLIPPAGE_RATE", "0.999")]).unwrap();
        assert_eq!(config.execution.slippage_rate, dec!(0.999));
    }
}
