use crate::domain::ports::Storage;
use crate::utils::error::{MonitorError, Result};
use chrono::{Days, NaiveDate};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// `today` minus `days`. Negative or out-of-calendar lookbacks are reported
/// against `field` instead of overflowing.
pub fn lookback_start(today: NaiveDate, days: i64, field: &str) -> Result<NaiveDate> {
    u64::try_from(days)
        .ok()
        .and_then(|days| today.checked_sub_days(Days::new(days)))
        .ok_or_else(|| MonitorError::InvalidConfigValueError {
            field: field.to_string(),
            value: days.to_string(),
            reason: format!("cannot look back {} days from {}", days, today),
        })
}

/// The stored date, or `today - default_lookback_days` when nothing was stored yet.
/// Editing the file to an earlier date backfills missed papers.
pub async fn read_last_run<S: Storage>(
    storage: &S,
    path: &str,
    today: NaiveDate,
    default_lookback_days: i64,
) -> Result<NaiveDate> {
    if !storage.exists(path).await {
        return lookback_start(today, default_lookback_days, "arxiv.default_lookback_days");
    }

    let bytes = storage.read_file(path).await?;
    let text = String::from_utf8_lossy(&bytes);
    let value = text.trim();
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|source| MonitorError::DateError {
        value: value.to_string(),
        source,
    })
}

pub async fn write_last_run<S: Storage>(storage: &S, path: &str, today: NaiveDate) -> Result<()> {
    let value = today.format(DATE_FORMAT).to_string();
    storage.write_file(path, value.as_bytes()).await
}
