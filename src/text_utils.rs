use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

pub fn format_date(date_time: &DateTime<Utc>) -> String {
    date_time.format("%Y-%m-%d").to_string()
}

/// Parses the `YYYY-MM-DD` value of a date input. Empty means "no date".
pub fn parse_form_date(buf: &str) -> Result<Option<DateTime<Utc>>, String> {
    let buf = buf.trim();
    if buf.is_empty() {
        return Ok(None);
    }

    let date = NaiveDate::parse_from_str(buf, "%Y-%m-%d")
        .map_err(|e| format!("Unable to parse date {}: {}", buf, e))?;
    Ok(Some(date.and_time(NaiveTime::MIN).and_utc()))
}

/// Tags are typed as one line, separated by commas and/or spaces.
pub fn split_tags(buf: &str) -> BTreeSet<String> {
    buf.split(|c: char| c == ',' || c.is_whitespace())
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

pub fn join_tags(tags: &BTreeSet<String>) -> String {
    tags.iter().cloned().collect::<Vec<_>>().join(", ")
}

/// Whole years elapsed between two dates.
pub fn years_since(start: NaiveDate, today: NaiveDate) -> i64 {
    let mut years = (today.year() - start.year()) as i64;
    if (today.month(), today.day()) < (start.month(), start.day()) {
        years -= 1;
    }
    years.max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<a href=\"x\">Tom & 'Jerry'</a>"), "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;");
    }

    #[test]
    fn test_parse_form_date() {
        let date = parse_form_date("2024-03-09").unwrap().unwrap();
        assert_eq!(format_date(&date), "2024-03-09");
        assert_eq!(parse_form_date("  "), Ok(None));
        assert!(parse_form_date("09/03/2024").is_err());
    }

    #[test]
    fn test_split_tags() {
        let tags = split_tags("Rust, web  cli,,rust");
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["cli", "rust", "web"]);
        assert!(split_tags("").is_empty());
    }

    #[test]
    fn test_years_since() {
        let start = NaiveDate::from_ymd_opt(2010, 6, 15).unwrap();
        assert_eq!(years_since(start, NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()), 13);
        assert_eq!(years_since(start, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()), 14);
        assert_eq!(years_since(start, NaiveDate::from_ymd_opt(2001, 1, 1).unwrap()), 0);
    }
}
