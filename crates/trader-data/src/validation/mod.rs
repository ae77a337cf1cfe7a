//! 데이터 무결성 검증.
//!
//! 캔들 시퀀스의 시간 공백과 OHLC 불일치를 찾아 진단 리포트를 생성합니다.
//! 검증은 읽기 전용이며 데이터를 수정하지 않습니다.

mod trading_hours;
mod validator;

pub use trading_hours::TradingHours;
pub use validator::{DataIntegrityValidator, ValidatorConfig, DEFAULT_GAP_TOLERANCE};
