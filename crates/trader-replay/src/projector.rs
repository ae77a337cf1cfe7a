//! 가상 시각 기준 시세 투영.
//!
//! 심볼마다 같은 날짜에서 가장 가까운 캔들을 시세로 사용하고,
//! 캔들이 없으면 기준가 주변의 합성 시세를 만듭니다.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use trader_core::ProjectedQuote;
use trader_data::{BarStore, Result};

/// 합성 시세 설정.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticQuoteConfig {
    /// 난수 시드 (테스트 재현용)
    pub seed: Option<u64>,
    /// 기준가 대비 최대 편차 비율 (0.02 = ±2%)
    pub max_deviation: f64,
    /// 심볼별 기준가
    pub baselines: HashMap<String, Decimal>,
    /// 기준가가 없는 심볼의 기본값
    pub default_baseline: Decimal,
}

impl Default for SyntheticQuoteConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_deviation: 0.02,
            baselines: HashMap::new(),
            default_baseline: Decimal::new(100, 0),
        }
    }
}

struct SyntheticState {
    rng: StdRng,
    /// 마지막으로 관측된 과거 캔들 가격
    last_prices: HashMap<String, Decimal>,
}

/// 시세 투영기.
///
/// 틱 루프와 상태 조회에서 동시에 호출될 수 있습니다.
pub struct MarketStateProjector {
    store: Arc<dyn BarStore>,
    config: SyntheticQuoteConfig,
    state: Mutex<SyntheticState>,
}

impl MarketStateProjector {
    /// 새 투영기 생성.
    pub fn new(store: Arc<dyn BarStore>, config: SyntheticQuoteConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            store,
            config,
            state: Mutex::new(SyntheticState {
                rng,
                last_prices: HashMap::new(),
            }),
        }
    }

    /// 심볼 목록의 가상 시각 기준 시세.
    ///
    /// 저장소 에러는 그대로 전파합니다. 반환 순서는 `symbols` 순서와 같습니다.
    pub async fn project(
        &self,
        symbols: &[String],
        virtual_time: DateTime<Utc>,
    ) -> Result<Vec<ProjectedQuote>> {
        let mut quotes = Vec::with_capacity(symbols.len());

        for symbol in symbols {
            let quote = match self.store.get_bar_near(symbol, virtual_time).await? {
                Some(bar) => {
                    self.remember(symbol, bar.close);
                    ProjectedQuote::historical(symbol.clone(), bar.close, bar.volume, virtual_time)
                }
                None => {
                    let price = self.synthesize(symbol);
                    debug!(symbol = %symbol, price = %price, %virtual_time, "캔들 없음, 합성 시세 사용");
                    ProjectedQuote::synthetic(symbol.clone(), price, Decimal::ZERO, virtual_time)
                }
            };
            quotes.push(quote);
        }

        Ok(quotes)
    }

    /// 심볼 기준가 (최근 관측가 → 설정 기준가 → 기본값).
    pub fn baseline(&self, symbol: &str) -> Decimal {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        self.baseline_locked(&state, symbol)
    }

    fn baseline_locked(&self, state: &SyntheticState, symbol: &str) -> Decimal {
        state
            .last_prices
            .get(symbol)
            .or_else(|| self.config.baselines.get(symbol))
            .copied()
            .unwrap_or(self.config.default_baseline)
    }

    fn remember(&self, symbol: &str, price: Decimal) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.last_prices.insert(symbol.to_string(), price);
    }

    fn synthesize(&self, symbol: &str) -> Decimal {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let baseline = self.baseline_locked(&state, symbol);

        let max = self.config.max_deviation.abs().min(0.99);
        let deviation = if max > 0.0 {
            state.rng.gen_range(-max..=max)
        } else {
            0.0
        };
        let factor = Decimal::ONE + Decimal::from_f64(deviation).unwrap_or(Decimal::ZERO);

        let price = (baseline * factor).round_dp(4);
        if price > Decimal::ZERO {
            price
        } else {
            baseline
        }
    }
}
