//! US equity market clock
//!
//! Regular session is 09:30-16:00 US Eastern, Monday to Friday. Exchange
//! holidays are not modelled. Eastern time comes from the tz database
//! (`America/New_York`), so historical DST rules apply too.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Offset, Utc, Weekday};
use chrono_tz::America::New_York;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketStatus {
    Open,
    Closed,
}

impl std::fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketStatus::Open => f.write_str("OPEN"),
            MarketStatus::Closed => f.write_str("CLOSED"),
        }
    }
}

/// UTC offset of US Eastern time at `now`
pub fn eastern_offset(now: DateTime<Utc>) -> Duration {
    let seconds = now.with_timezone(&New_York).offset().fix().local_minus_utc();
    Duration::seconds(i64::from(seconds))
}

/// Regular-session status at `now`
pub fn market_status(now: DateTime<Utc>) -> MarketStatus {
    let local = now.with_timezone(&New_York);

    if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        return MarketStatus::Closed;
    }

    let (Some(open), Some(close)) = (NaiveTime::from_hms_opt(9, 30, 0), NaiveTime::from_hms_opt(16, 0, 0))
    else {
        return MarketStatus::Closed;
    };

    if (open..=close).contains(&local.time()) {
        MarketStatus::Open
    } else {
        MarketStatus::Closed
    }
}
