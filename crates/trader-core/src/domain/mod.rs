//! 리플레이 엔진 도메인 모델.

pub mod account;
pub mod bar;
pub mod quote;
pub mod replay;
pub mod trade;
pub mod validation;

pub use account::AccountState;
pub use bar::{Bar, Timeframe, TimeframeParseError, TimeframeUnit};
pub use quote::{ProjectedQuote, QuoteSource};
pub use replay::ReplayState;
pub use trade::{OrderType, Side, SimulatedTrade};
pub use validation::{DataGap, DataInconsistency, OhlcIssue, ValidationReport};
