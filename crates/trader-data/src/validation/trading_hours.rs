//! 시장 운영 시간 기반 공백 필터.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;

/// 시장 운영 시간.
///
/// 장 마감 ~ 다음 장 시작 사이의 공백을 정상 휴장으로 인정할 때 사용합니다.
#[derive(Debug, Clone)]
pub struct TradingHours {
    /// 시장 코드 (US, KR)
    pub market: String,
    /// 시장 타임존
    pub timezone: Tz,
    /// 장 시작 시간 (현지)
    pub open: NaiveTime,
    /// 장 마감 시간 (현지)
    pub close: NaiveTime,
    /// 주말 휴장 여부
    pub skip_weekends: bool,
    /// 공휴일 (현지 날짜)
    pub holidays: HashSet<NaiveDate>,
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
}

impl TradingHours {
    /// US 시장 (뉴욕, 09:30 ~ 16:00)
    pub fn us() -> Self {
        Self {
            market: "US".to_string(),
            timezone: chrono_tz::America::New_York,
            open: hm(9, 30),
            close: hm(16, 0),
            skip_weekends: true,
            holidays: HashSet::new(),
        }
    }

    /// KRX 시장 (서울, 09:00 ~ 15:30)
    pub fn krx() -> Self {
        Self {
            market: "KR".to_string(),
            timezone: chrono_tz::Asia::Seoul,
            open: hm(9, 0),
            close: hm(15, 30),
            skip_weekends: true,
            holidays: HashSet::new(),
        }
    }

    /// 시장 코드로 프리셋 조회.
    pub fn for_market(market: &str) -> Option<Self> {
        match market.trim().to_uppercase().as_str() {
            "US" => Some(Self::us()),
            "KR" | "KRX" => Some(Self::krx()),
            _ => None,
        }
    }

    /// 공휴일 추가.
    pub fn add_holiday(&mut self, date: NaiveDate) {
        self.holidays.insert(date);
    }

    /// 거래일 여부 (현지 날짜 기준).
    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        if self.skip_weekends && matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        !self.holidays.contains(&date)
    }

    /// 두 캔들 사이 공백이 휴장 구간만 걸쳐 있는지 확인.
    ///
    /// 분/시간봉은 앞 캔들이 장 마감 한 간격 이내, 뒤 캔들이 장 시작 한 간격 이내이고
    /// 사이 날짜가 모두 휴장일이어야 합니다. 일봉 이상은 사이 날짜만 봅니다.
    pub fn excuses(
        &self,
        prev: DateTime<Utc>,
        next: DateTime<Utc>,
        interval: Duration,
        intraday: bool,
    ) -> bool {
        let prev_local = prev.with_timezone(&self.timezone);
        let next_local = next.with_timezone(&self.timezone);
        let prev_date = prev_local.date_naive();
        let next_date = next_local.date_naive();

        if next_date <= prev_date {
            return false;
        }

        let mut day = prev_date.succ_opt();
        while let Some(d) = day {
            if d >= next_date {
                break;
            }
            if self.is_trading_day(d) {
                return false;
            }
            day = d.succ_opt();
        }

        if !intraday {
            return true;
        }

        // 마감 직전 캔들의 시작 시각은 close - interval 이후
        let near_close = prev_local.time() + interval >= self.close;
        let near_open = next_local.time() <= self.open + interval;
        near_close && near_open
    }
}
