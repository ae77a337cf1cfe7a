//! 리플레이 상태 머신.

use serde::{Deserialize, Serialize};

/// 리플레이 실행 상태.
///
/// ```text
/// Stopped ──start──> Running <──pause/resume──> Paused
///                       │
///                       └──(end 도달)──> Completed
/// (모든 상태) ──stop──> Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayState {
    /// 중지됨 (초기 상태)
    #[default]
    Stopped,
    /// 실행 중
    Running,
    /// 일시 정지
    Paused,
    /// 종료 시각 도달
    Completed,
}

impl ReplayState {
    /// 세션이 활성(Running/Paused) 상태인지 여부.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}
