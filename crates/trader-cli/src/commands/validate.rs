//! 데이터 무결성 검증 명령어.

use chrono::{DateTime, Utc};
use tracing::info;
use trader_core::Timeframe;
use trader_data::DataIntegrityValidator;
use trader_replay::ReplayConfig;

/// `replay validate` 인자.
#[derive(Debug, Clone)]
pub struct ValidateArgs {
    pub symbol: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timeframe: Option<Timeframe>,
}

/// 구간 검증 후 보고서를 JSON으로 출력.
pub async fn validate_range(
    database_url: &str,
    config: &ReplayConfig,
    args: ValidateArgs,
) -> anyhow::Result<()> {
    if args.start > args.end {
        anyhow::bail!("시작 시각이 종료 시각보다 늦습니다: {} > {}", args.start, args.end);
    }

    let (_db, bars) = super::connect(database_url).await?;
    let validator = DataIntegrityValidator::new(bars, config.validator_config());
    let timeframe = args.timeframe.unwrap_or(config.timeframe);
    let symbol = args.symbol.trim().to_string();

    let report = validator
        .validate(&symbol, timeframe, args.start, args.end)
        .await?;

    info!(
        symbol = %symbol,
        is_valid = report.is_valid,
        gaps = report.gaps.len(),
        inconsistencies = report.inconsistencies.len(),
        "검증 완료"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
