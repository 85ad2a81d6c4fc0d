//! Conversions between model types and their stored representations.

use chrono::{DateTime, TimeZone, Utc};

use super::error::StoreError;
use crate::models::IncomeFrequency;

pub(crate) fn datetime_to_millis(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

pub(crate) fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or(StoreError::InvalidTimestamp(ms))
}

pub(crate) fn parse_frequency(raw: &str) -> Result<IncomeFrequency, StoreError> {
    IncomeFrequency::parse(raw).ok_or_else(|| StoreError::UnknownFrequency(raw.to_string()))
}
