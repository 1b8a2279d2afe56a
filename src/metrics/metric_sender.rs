use spdlog::error;
use tokio::sync::mpsc::Sender;

use crate::metrics::metric_types::EventApi::{About, Index, Projects, Rss, View};
use crate::metrics::metric_types::{EventApi, MetricEvent, PostDetail};

#[derive(Clone)]
pub struct MetricSender {
    sender_ch: Option<Sender<MetricEvent>>,
}

impl MetricSender {
    pub fn new(sender_ch: Sender<MetricEvent>) -> Self {
        Self {
            sender_ch: Some(sender_ch),
        }
    }

    pub fn no_op() -> Self {
        Self { sender_ch: None }
    }

    async fn send(&self, api: EventApi, origin: String) {
        if let Some(ref sender) = self.sender_ch {
            let key = api.key();
            if let Err(e) = sender.send(MetricEvent { api, origin }).await {
                error!("Error writing {} metrics: {}", key, e);
            }
        }
    }

    pub async fn index(&self, origin: String) {
        self.send(Index, origin).await
    }

    pub async fn projects(&self, origin: String) {
        self.send(Projects, origin).await
    }

    pub async fn view(&self, slug: String, origin: String) {
        self.send(View(PostDetail { slug }), origin).await
    }

    pub async fn about(&self, origin: String) {
        self.send(About, origin).await
    }

    pub async fn rss(&self, origin: String) {
        self.send(Rss, origin).await
    }
}
