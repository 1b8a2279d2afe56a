pub struct PostDetail {
    pub slug: String,
}

pub enum EventApi {
    Index,
    Projects,
    View(PostDetail),
    About,
    Rss,
}

impl EventApi {
    /// Counter key of the page, `view/<slug>` for posts.
    pub fn key(&self) -> String {
        match self {
            EventApi::Index => "index".to_string(),
            EventApi::Projects => "projects".to_string(),
            EventApi::View(detail) => format!("view/{}", detail.slug),
            EventApi::About => "about".to_string(),
            EventApi::Rss => "rss".to_string(),
        }
    }
}

pub struct MetricEvent {
    pub api: EventApi,
    pub origin: String,
}
