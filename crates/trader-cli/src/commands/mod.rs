//! CLI 명령어 구현.

pub mod run;
pub mod validate;

use std::sync::Arc;

use trader_data::{Database, DatabaseConfig, PgBarStore};

/// 데이터베이스 연결 후 캔들 저장소 생성.
pub(crate) async fn connect(database_url: &str) -> anyhow::Result<(Database, Arc<PgBarStore>)> {
    let db = Database::connect(&DatabaseConfig::for_replay(database_url)).await?;
    let bars = Arc::new(PgBarStore::new(db.pool().clone()));
    Ok((db, bars))
}
