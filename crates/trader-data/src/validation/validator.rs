//! 데이터 무결성 검증기.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};
use trader_core::{Bar, DataGap, DataInconsistency, Timeframe, ValidationReport};

use super::TradingHours;
use crate::error::Result;
use crate::store::BarStore;

/// 기본 공백 허용 배수 (기대 간격의 1.5배 초과 시 공백).
pub const DEFAULT_GAP_TOLERANCE: f64 = 1.5;

/// 검증기 설정.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// 공백 허용 배수
    pub gap_tolerance: f64,
    /// 휴장 구간 필터 (없으면 배수 규칙만 적용)
    pub trading_hours: Option<TradingHours>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            gap_tolerance: DEFAULT_GAP_TOLERANCE,
            trading_hours: None,
        }
    }
}

/// 데이터 무결성 검증기.
///
/// 저장소에서 캔들을 읽어 공백과 OHLC 불일치를 리포트합니다.
/// 저장소 에러는 빈 결과로 바꾸지 않고 그대로 전파합니다.
pub struct DataIntegrityValidator {
    store: Arc<dyn BarStore>,
    config: ValidatorConfig,
}

impl DataIntegrityValidator {
    /// 새 검증기 생성.
    pub fn new(store: Arc<dyn BarStore>, config: ValidatorConfig) -> Self {
        Self { store, config }
    }

    /// 설정 조회.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// 심볼/타임프레임/구간 검증.
    #[instrument(skip(self))]
    pub async fn validate(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ValidationReport> {
        let bars = self.store.get_bars(symbol, timeframe, start, end).await?;
        Ok(self.inspect(symbol, timeframe, start, end, &bars))
    }

    /// 이미 조회한 캔들 시퀀스 검증 (I/O 없음).
    ///
    /// `bars`는 시간순으로 정렬되어 있어야 합니다.
    pub fn inspect(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        bars: &[Bar],
    ) -> ValidationReport {
        if bars.is_empty() {
            warn!(symbol = symbol, %timeframe, %start, %end, "요청 구간에 데이터 없음");
            return ValidationReport {
                symbol: symbol.to_string(),
                timeframe,
                requested_start: start,
                requested_end: end,
                is_valid: false,
                total_records: 0,
                covered_span_secs: 0,
                gaps: vec![DataGap::new(start, end, "요청 구간에 데이터 없음")],
                inconsistencies: Vec::new(),
            };
        }

        let gaps = self.find_gaps(timeframe, bars);
        let inconsistencies = find_inconsistencies(bars);

        for gap in &gaps {
            warn!(
                symbol = symbol,
                start = %gap.start,
                end = %gap.end,
                duration_secs = gap.duration_secs,
                "데이터 공백 발견"
            );
        }
        for issue in &inconsistencies {
            warn!(
                symbol = symbol,
                timestamp = %issue.timestamp,
                details = %issue.details,
                "OHLC 불일치 발견"
            );
        }

        let covered_span_secs = match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp).num_seconds(),
            _ => 0,
        };
        let is_valid = gaps.is_empty() && inconsistencies.is_empty();

        debug!(
            symbol = symbol,
            total = bars.len(),
            gaps = gaps.len(),
            inconsistencies = inconsistencies.len(),
            is_valid,
            "데이터 검증 완료"
        );

        ValidationReport {
            symbol: symbol.to_string(),
            timeframe,
            requested_start: start,
            requested_end: end,
            is_valid,
            total_records: bars.len(),
            covered_span_secs,
            gaps,
            inconsistencies,
        }
    }

    fn find_gaps(&self, timeframe: Timeframe, bars: &[Bar]) -> Vec<DataGap> {
        let expected = timeframe.duration();
        let threshold_ms = expected.num_milliseconds() as f64 * self.config.gap_tolerance;

        bars.windows(2)
            .filter_map(|pair| {
                let (prev, next) = (&pair[0], &pair[1]);
                let actual = next.timestamp - prev.timestamp;
                if (actual.num_milliseconds() as f64) <= threshold_ms {
                    return None;
                }
                if let Some(hours) = &self.config.trading_hours {
                    if hours.excuses(prev.timestamp, next.timestamp, expected, timeframe.is_intraday())
                    {
                        return None;
                    }
                }
                Some(DataGap::new(
                    prev.timestamp,
                    next.timestamp,
                    format!(
                        "기대 간격 {}초, 실제 간격 {}초",
                        expected.num_seconds(),
                        actual.num_seconds()
                    ),
                ))
            })
            .collect()
    }
}

fn find_inconsistencies(bars: &[Bar]) -> Vec<DataInconsistency> {
    bars.iter()
        .filter_map(|bar| {
            let issues = bar.ohlc_issues();
            if issues.is_empty() {
                return None;
            }
            let names: Vec<String> = issues.iter().map(ToString::to_string).collect();
            Some(DataInconsistency {
                timestamp: bar.timestamp,
                details: format!(
                    "{} (O={}, H={}, L={}, C={}, V={})",
                    names.join(", "),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                ),
                issues,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryBarStore;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn validator() -> DataIntegrityValidator {
        DataIntegrityValidator::new(Arc::new(InMemoryBarStore::new()), ValidatorConfig::default())
    }

    fn minute_bar(ts: DateTime<Utc>) -> Bar {
        Bar::new(
            "AAPL",
            Timeframe::minutes(1),
            ts,
            dec!(100),
            dec!(101),
            dec!(99),
            dec!(100.5),
            dec!(10),
        )
    }

    #[test]
    fn test_tolerance_boundary() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
        // 90초 = 정확히 1.5배 → 공백 아님
        let bars = vec![minute_bar(t0), minute_bar(t0 + Duration::seconds(90))];
        let report = validator().inspect("AAPL", Timeframe::minutes(1), t0, t0, &bars);
        assert!(report.gaps.is_empty());

        // 91초 → 공백
        let bars = vec![minute_bar(t0), minute_bar(t0 + Duration::seconds(91))];
        let report = validator().inspect("AAPL", Timeframe::minutes(1), t0, t0, &bars);
        assert_eq!(report.gaps.len(), 1);
        assert!(!report.is_valid);
    }

    #[test]
    fn test_covered_span() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
        let bars: Vec<Bar> = (0..5)
            .map(|i| minute_bar(t0 + Duration::minutes(i)))
            .collect();
        let report = validator().inspect(
            "AAPL",
            Timeframe::minutes(1),
            t0,
            t0 + Duration::minutes(4),
            &bars,
        );
        assert!(report.is_valid);
        assert_eq!(report.total_records, 5);
        assert_eq!(report.covered_span(), Duration::minutes(4));
    }
}
