//! Calendar date in the configured timezone
//!
//! Ages, due dates and schedule dates are calendar dates, so "today" is
//! taken in the operator's timezone rather than UTC.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use edufund_core::{AppError, AppResult};

/// Parse an IANA timezone name such as `Asia/Singapore`
pub fn parse_timezone(name: &str) -> AppResult<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| AppError::Config(format!("Invalid batch.timezone '{}': {}", name, e)))
}

/// Current calendar date in `tz`
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}
