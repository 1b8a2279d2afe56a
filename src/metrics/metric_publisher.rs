use std::io;
use std::path::Path;
use std::sync::Arc;

use spdlog::sink::{RotatingFileSink, RotationPolicy};
use spdlog::{info, Logger};

use crate::metrics::visitor_stats::DaySummary;

/// Appends finished days as JSON lines to a daily rotated file.
pub struct MetricPublisher {
    logger: Arc<Logger>,
}

impl MetricPublisher {
    pub fn new(base_path: &Path, retained_days: usize) -> spdlog::Result<Self> {
        let daily: Arc<RotatingFileSink> = Arc::new(
            RotatingFileSink::builder()
                .base_path(base_path)
                .rotation_policy(RotationPolicy::Daily { hour: 0, minute: 0 })
                .max_files(retained_days)
                .rotate_on_open(false)
                .build()?
        );

        let logger = Arc::new(Logger::builder().sink(daily).build()?);
        Ok(Self {
            logger,
        })
    }

    pub fn store_day(&self, day: &DaySummary) -> io::Result<()> {
        let json = serde_json::to_string(day)?;
        info!(logger: self.logger, "{}", &json);
        self.logger.flush();
        Ok(())
    }
}
