use chrono::NaiveDate;
use serde::de::Error;
use serde::{Deserialize, Deserializer};
use toml::value::Datetime;

/// A bare TOML date (`started_on = 2012-03-01`). Times and offsets are refused.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ConfigDate(pub NaiveDate);

impl<'de> Deserialize<'de> for ConfigDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Datetime::deserialize(deserializer)?;
        if value.time.is_some() || value.offset.is_some() {
            return Err(D::Error::custom(format!("expected a date without time, got {}", value)));
        }

        let date = value.date
            .ok_or_else(|| D::Error::custom("missing date"))?;
        NaiveDate::from_ymd_opt(date.year as i32, date.month as u32, date.day as u32)
            .map(ConfigDate)
            .ok_or_else(|| D::Error::custom(format!("invalid date {}", value)))
    }
}
