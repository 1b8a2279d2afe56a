use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use spdlog::{error, info, warn};

use crate::media::validate_key;
use crate::post::{Post, PostId};
use crate::settings::SiteSettings;
use crate::store::{DocumentStore, StoreError, StoreResult};

const POSTS_DIR: &str = "posts";
const SETTINGS_FILE: &str = "settings.json";

/// One pretty-printed JSON file per post, plus a settings file.
///
/// All documents are read once at open and kept in memory. Every write goes to
/// disk before the in-memory copy changes.
pub struct JsonFileStore {
    data_dir: PathBuf,
    posts: BTreeMap<PostId, Post>,
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, json)?;
    fs::rename(&tmp_path, path)
}

fn read_post(path: &Path) -> StoreResult<Post> {
    let buf = fs::read_to_string(path)?;
    let mut post: Post = serde_json::from_str(&buf)
        .map_err(|e| StoreError::Corrupt(format!("{}: {}", path.display(), e)))?;

    // Writes go to `<id>.json`, so the file name is the id
    let stem = path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| StoreError::Corrupt(format!("{}: file name is not a post id", path.display())))?;
    let file_id = PostId(stem.to_string());
    if let Some(ref doc_id) = post.id {
        if *doc_id != file_id {
            warn!("Post file {} carries id {}. Using {}", path.display(), doc_id, file_id);
        }
    }
    post.id = Some(file_id);
    Ok(post)
}

impl JsonFileStore {
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        let posts_dir = data_dir.join(POSTS_DIR);
        fs::create_dir_all(&posts_dir)?;

        let mut posts = BTreeMap::new();
        for entry in fs::read_dir(&posts_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_post(&path) {
                Ok(post) => {
                    if let Some(id) = post.id.clone() {
                        posts.insert(id, post);
                    }
                }
                Err(e) => error!("Skipping post file {}: {}", path.display(), e),
            }
        }

        info!("Loaded {} posts from {}", posts.len(), posts_dir.display());
        Ok(JsonFileStore {
            data_dir: data_dir.to_path_buf(),
            posts,
        })
    }

    fn post_path(&self, id: &PostId) -> io::Result<PathBuf> {
        validate_key(&id.0)
            .map_err(|_| io::Error::new(ErrorKind::InvalidInput, format!("Invalid post id {}", id)))?;
        Ok(self.data_dir.join(POSTS_DIR).join(format!("{}.json", id)))
    }

    fn check_slug(&self, slug: &str, owner: Option<&PostId>) -> StoreResult<()> {
        let taken = self.posts.values()
            .any(|p| p.slug == slug && p.id.as_ref() != owner);
        if taken {
            return Err(StoreError::SlugTaken(slug.to_string()));
        }
        Ok(())
    }
}

impl DocumentStore for JsonFileStore {
    fn list(&self) -> Vec<Post> {
        self.posts.values().cloned().collect()
    }

    fn get(&self, id: &PostId) -> Option<Post> {
        self.posts.get(id).cloned()
    }

    fn get_by_slug(&self, slug: &str) -> Option<Post> {
        self.posts.values().find(|p| p.slug == slug).cloned()
    }

    fn create(&mut self, mut post: Post) -> StoreResult<Post> {
        self.check_slug(&post.slug, None)?;

        let id = PostId::generate();
        let now = Utc::now();
        post.id = Some(id.clone());
        post.created_at = Some(now);
        post.updated_at = Some(now);

        write_json(&self.post_path(&id)?, &post)?;
        info!("Created post {} ({})", id, post.slug);
        self.posts.insert(id, post.clone());
        Ok(post)
    }

    fn replace(&mut self, id: &PostId, mut post: Post) -> StoreResult<Post> {
        let created_at = match self.posts.get(id) {
            Some(stored) => stored.created_at,
            None => return Err(StoreError::NotFound(id.clone())),
        };
        self.check_slug(&post.slug, Some(id))?;

        post.id = Some(id.clone());
        post.created_at = created_at;
        post.updated_at = Some(Utc::now());

        write_json(&self.post_path(id)?, &post)?;
        info!("Updated post {} ({})", id, post.slug);
        self.posts.insert(id.clone(), post.clone());
        Ok(post)
    }

    fn delete(&mut self, id: &PostId) -> StoreResult<Post> {
        if !self.posts.contains_key(id) {
            return Err(StoreError::NotFound(id.clone()));
        }
        fs::remove_file(self.post_path(id)?)?;
        info!("Deleted post {}", id);
        self.posts.remove(id).ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn load_settings(&self) -> StoreResult<SiteSettings> {
        let path = self.data_dir.join(SETTINGS_FILE);
        match fs::read_to_string(&path) {
            Ok(buf) => Ok(serde_json::from_str(&buf)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(SiteSettings::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save_settings(&mut self, settings: &SiteSettings) -> StoreResult<()> {
        write_json(&self.data_dir.join(SETTINGS_FILE), settings)?;
        Ok(())
    }
}
