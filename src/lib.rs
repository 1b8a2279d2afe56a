pub mod app_state;
pub mod auth;
pub mod blocks;
pub mod config;
pub mod content_cache;
pub mod draft;
pub mod logger;
pub mod media;
pub mod metrics;
pub mod paginator;
pub mod post;
pub mod query_string;
pub mod server;
pub mod settings;
pub mod store;
pub mod text_utils;
pub mod util;
pub mod view;
#[cfg(test)]
mod test_data;
