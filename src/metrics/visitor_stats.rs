use std::collections::{BTreeMap, HashSet, VecDeque};

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::naive_date_format;

type DateProvider = Box<dyn Fn() -> NaiveDate + Send>;

#[derive(Clone, Debug, Default, PartialEq)]
struct PageCounter {
    hits: u64,
    origins: HashSet<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageTotal {
    pub page: String,
    pub hits: u64,
    pub unique_visitors: u64,
}

/// Totals of one finished day. This is what goes to the metrics log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    #[serde(with = "naive_date_format")]
    pub date: NaiveDate,
    pub hits: u64,
    pub unique_visitors: u64,
    pub pages: Vec<PageTotal>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StatsSummary {
    pub today: DaySummary,
    /// Newest first.
    pub past_days: Vec<DaySummary>,
}

/// Hits and unique origins per page for the current day, plus a short
/// in-memory history of finished days.
pub struct VisitorStats {
    date: NaiveDate,
    counters: BTreeMap<String, PageCounter>,
    day_origins: HashSet<String>,
    history: VecDeque<DaySummary>,
    retained_days: usize,
    date_provider: DateProvider,
}

impl VisitorStats {
    pub fn new(retained_days: usize) -> Self {
        Self::with_date_provider(retained_days, Box::new(|| Utc::now().date_naive()))
    }

    pub fn with_date_provider(retained_days: usize, date_provider: DateProvider) -> Self {
        let date = date_provider();
        Self {
            date,
            counters: BTreeMap::new(),
            day_origins: HashSet::new(),
            history: VecDeque::new(),
            retained_days,
            date_provider,
        }
    }

    /// Counts a hit. Returns the previous day when this hit started a new one.
    pub fn add(&mut self, page: &str, origin: &str) -> Option<DaySummary> {
        let rolled = self.roll_if_needed();

        let counter = self.counters.entry(page.to_string()).or_default();
        counter.hits += 1;
        if !counter.origins.contains(origin) {
            counter.origins.insert(origin.to_string());
        }
        if !self.day_origins.contains(origin) {
            self.day_origins.insert(origin.to_string());
        }

        rolled
    }

    /// Closes the current day if the date moved on. Days without hits are not kept.
    pub fn roll_if_needed(&mut self) -> Option<DaySummary> {
        let cur_date = (self.date_provider)();
        if cur_date == self.date {
            return None;
        }

        let finished = self.current_day();
        self.date = cur_date;
        self.counters.clear();
        self.day_origins.clear();

        if finished.hits == 0 {
            return None;
        }

        self.history.push_front(finished.clone());
        self.history.truncate(self.retained_days);
        Some(finished)
    }

    fn current_day(&self) -> DaySummary {
        let pages: Vec<PageTotal> = self.counters.iter()
            .map(|(page, counter)| PageTotal {
                page: page.clone(),
                hits: counter.hits,
                unique_visitors: counter.origins.len() as u64,
            })
            .collect();

        DaySummary {
            date: self.date,
            hits: pages.iter().map(|p| p.hits).sum(),
            unique_visitors: self.day_origins.len() as u64,
            pages,
        }
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            today: self.current_day(),
            past_days: self.history.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn stats_on(day_of_month: Arc<AtomicU32>, retained_days: usize) -> VisitorStats {
        VisitorStats::with_date_provider(retained_days, Box::new(move || day(day_of_month.load(Ordering::SeqCst))))
    }

    #[test]
    fn test_unique_origins_per_page() {
        let mut stats = stats_on(Arc::new(AtomicU32::new(28)), 7);
        stats.add("index", "127.0.0.1");
        stats.add("index", "10.1.2.3");
        stats.add("view/folio", "127.0.0.1");
        stats.add("index", "127.0.0.1");

        let today = stats.summary().today;
        assert_eq!(today.date, day(28));
        assert_eq!(today.hits, 4);
        assert_eq!(today.unique_visitors, 2);
        assert_eq!(today.pages, vec![
            PageTotal { page: "index".to_string(), hits: 3, unique_visitors: 2 },
            PageTotal { page: "view/folio".to_string(), hits: 1, unique_visitors: 1 },
        ]);
    }

    #[test]
    fn test_rolls_day() {
        let current = Arc::new(AtomicU32::new(21));
        let mut stats = stats_on(current.clone(), 7);
        assert_eq!(stats.add("index", "10.1.2.3"), None);
        stats.add("index", "10.1.2.4");

        current.store(22, Ordering::SeqCst);
        let rolled = stats.add("index", "10.1.2.5").unwrap();
        assert_eq!(rolled.date, day(21));
        assert_eq!(rolled.hits, 2);
        assert_eq!(rolled.unique_visitors, 2);

        let summary = stats.summary();
        assert_eq!(summary.today.hits, 1);
        assert_eq!(summary.past_days, vec![rolled]);
    }

    #[test]
    fn test_empty_days_are_skipped_and_history_is_bounded() {
        let current = Arc::new(AtomicU32::new(1));
        let mut stats = stats_on(current.clone(), 2);
        for d in 2..=5 {
            stats.add("about", "1.1.1.1");
            current.store(d, Ordering::SeqCst);
            assert!(stats.roll_if_needed().is_some());
        }
        current.store(6, Ordering::SeqCst);
        assert_eq!(stats.roll_if_needed(), None);

        let past: Vec<NaiveDate> = stats.summary().past_days.iter().map(|d| d.date).collect();
        assert_eq!(past, vec![day(4), day(3)]);
    }

    #[test]
    fn test_summary_json() {
        let mut stats = stats_on(Arc::new(AtomicU32::new(9)), 1);
        stats.add("rss", "1.1.1.1");
        let json = serde_json::to_string(&stats.summary().today).unwrap();
        assert_eq!(json, r#"{"date":"2024-05-09","hits":1,"unique_visitors":1,"pages":[{"page":"rss","hits":1,"unique_visitors":1}]}"#);
    }
}
