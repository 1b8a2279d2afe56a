use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

/// Rendered HTML of posts and pages, keyed by slug or page name.
///
/// Post entries are dropped whenever a post is saved or deleted, so they never
/// expire on their own. Pages backed by files use a time limit instead.
pub struct ContentCache<T> {
    cache: Option<CacheMap<T>>,
}

type CacheMap<T> = HashMap<String, CacheValue<T>>;

pub enum Expire {
    Never,
    After(Duration),
}

struct CacheValue<T> {
    expire_date: DateTime<Utc>,
    value: Arc<T>,
}

fn post_key(slug: &str) -> String {
    format!("post-{}", slug)
}

fn page_key(name: &str) -> String {
    format!("page-{}", name)
}

impl<T> ContentCache<T> {
    pub fn new() -> Self {
        ContentCache { cache: Some(HashMap::new()) }
    }

    pub fn non_caching() -> Self {
        ContentCache { cache: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.cache.is_some()
    }

    fn add(&mut self, key: String, content: T, expire_after: Expire) -> Arc<T> {
        let value = Arc::new(content);
        if let Some(ref mut cache) = self.cache {
            let expire_date = match expire_after {
                Expire::Never => DateTime::<Utc>::MAX_UTC,
                Expire::After(duration) => Utc::now() + duration,
            };
            cache.insert(key, CacheValue { expire_date, value: value.clone() });
        }
        value
    }

    fn get(&self, key: &str) -> Option<Arc<T>> {
        let cache_value = self.cache.as_ref()?.get(key)?;
        if Utc::now() > cache_value.expire_date {
            return None;
        }
        Some(cache_value.value.clone())
    }

    fn get_or<F>(&mut self, key: String, expire_after: Expire, render: F) -> io::Result<Arc<T>>
        where F: FnOnce() -> io::Result<T>
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let content = render()?;
        Ok(self.add(key, content, expire_after))
    }

    pub fn get_post_or<F>(&mut self, slug: &str, render: F) -> io::Result<Arc<T>>
        where F: FnOnce() -> io::Result<T>
    {
        self.get_or(post_key(slug), Expire::Never, render)
    }

    pub fn get_page_or<F>(&mut self, name: &str, expire_after: Expire, render: F) -> io::Result<Arc<T>>
        where F: FnOnce() -> io::Result<T>
    {
        self.get_or(page_key(name), expire_after, render)
    }

    pub fn remove_post(&mut self, slug: &str) {
        if let Some(ref mut cache) = self.cache {
            cache.remove(&post_key(slug));
        }
    }

    pub fn clear(&mut self) {
        if let Some(ref mut cache) = self.cache {
            cache.clear();
        }
    }
}

impl<T> Default for ContentCache<T> {
    fn default() -> Self {
        ContentCache::new()
    }
}
