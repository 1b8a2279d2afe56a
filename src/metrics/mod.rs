pub mod metric_handler;
pub mod metric_publisher;
pub mod metric_sender;
pub mod metric_types;
pub mod visitor_stats;

pub(crate) mod naive_date_format {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let buf = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&buf, FORMAT).map_err(serde::de::Error::custom)
    }
}
