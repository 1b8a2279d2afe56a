use std::sync::{Arc, Mutex};

use spdlog::{debug, error, info, trace};
use tokio::sync::mpsc;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

use crate::metrics::metric_publisher::MetricPublisher;
use crate::metrics::metric_sender::MetricSender;
use crate::metrics::metric_types::MetricEvent;
use crate::metrics::visitor_stats::{DaySummary, VisitorStats};

const CHANNEL_CAPACITY: usize = 64;
const ROLL_CHECK_SECS: u64 = 60;

fn publish(publisher: &Option<MetricPublisher>, day: Option<DaySummary>) {
    if let (Some(publisher), Some(day)) = (publisher, day) {
        if let Err(e) = publisher.store_day(&day) {
            error!("Error writing visitor history for {}: {}", day.date, e);
        } else {
            debug!("Visitor history written for {}", day.date);
        }
    }
}

/// Receives page events on a tokio task and folds them into the shared stats.
pub struct MetricHandler {
    _receiver_task: JoinHandle<()>,
    sender: Sender<MetricEvent>,
}

impl MetricHandler {
    pub fn new(stats: Arc<Mutex<VisitorStats>>, publisher: Option<MetricPublisher>) -> Self {
        let (tx, mut rx) = mpsc::channel::<MetricEvent>(CHANNEL_CAPACITY);

        let receiver_task = tokio::spawn(async move {
            info!("Starting metrics receiver");
            loop {
                match tokio::time::timeout(std::time::Duration::from_secs(ROLL_CHECK_SECS), rx.recv()).await {
                    Ok(Some(event)) => {
                        let key = event.api.key();
                        let rolled = stats.lock()
                            .unwrap_or_else(|p| p.into_inner())
                            .add(&key, &event.origin);
                        publish(&publisher, rolled);
                    }
                    Ok(None) => break,
                    Err(_timeout) => {
                        trace!("No visits for a while - checking day rollover");
                        let rolled = stats.lock()
                            .unwrap_or_else(|p| p.into_inner())
                            .roll_if_needed();
                        publish(&publisher, rolled);
                    }
                }
            }
            info!("Metrics receiver stopped");
        });

        Self {
            _receiver_task: receiver_task,
            sender: tx,
        }
    }

    pub fn new_sender(&self) -> MetricSender {
        MetricSender::new(self.sender.clone())
    }

    pub fn no_op() -> MetricSender {
        MetricSender::no_op()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn test_events_reach_stats() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        runtime.block_on(async {
            let date = || NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
            let stats = Arc::new(Mutex::new(VisitorStats::with_date_provider(7, Box::new(date))));
            let handler = MetricHandler::new(stats.clone(), None);

            let sender = handler.new_sender();
            sender.index("1.1.1.1".to_string()).await;
            sender.view("folio".to_string(), "1.1.1.1".to_string()).await;
            sender.view("folio".to_string(), "2.2.2.2".to_string()).await;
            MetricHandler::no_op().rss("3.3.3.3".to_string()).await;

            for _ in 0..50 {
                if stats.lock().unwrap().summary().today.hits == 3 {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }

            let today = stats.lock().unwrap().summary().today;
            assert_eq!(today.hits, 3);
            assert_eq!(today.unique_visitors, 2);
            assert!(today.pages.iter().any(|p| p.page == "view/folio" && p.unique_visitors == 2));
        });
    }
}
