use std::fmt;
use std::fmt::{Display, Formatter};
use std::io;

use crate::post::{Post, PostId};
use crate::settings::SiteSettings;

pub mod json_file;

pub use json_file::JsonFileStore;

#[derive(Debug)]
pub enum StoreError {
    NotFound(PostId),
    SlugTaken(String),
    Corrupt(String),
    Io(io::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "Post {} not found", id),
            StoreError::SlugTaken(slug) => write!(f, "Slug '{}' is already used by another post", slug),
            StoreError::Corrupt(desc) => write!(f, "Invalid stored document: {}", desc),
            StoreError::Io(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(value: io::Error) -> Self {
        StoreError::Io(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        StoreError::Corrupt(value.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Whole-document persistence for posts and site settings.
pub trait DocumentStore: Send {
    fn list(&self) -> Vec<Post>;
    fn get(&self, id: &PostId) -> Option<Post>;
    fn get_by_slug(&self, slug: &str) -> Option<Post>;
    /// Assigns a fresh id and both timestamps, returns the stored document.
    fn create(&mut self, post: Post) -> StoreResult<Post>;
    /// Keeps the stored id and creation date and bumps the update date.
    fn replace(&mut self, id: &PostId, post: Post) -> StoreResult<Post>;
    fn delete(&mut self, id: &PostId) -> StoreResult<Post>;
    fn load_settings(&self) -> StoreResult<SiteSettings>;
    fn save_settings(&mut self, settings: &SiteSettings) -> StoreResult<()>;
}
