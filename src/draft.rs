use std::collections::HashMap;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use spdlog::{debug, info, warn};
use uuid::Uuid;

use crate::blocks::editor::BlockEditor;
use crate::blocks::field_edit::EditorViewState;
use crate::media::{MediaStorage, UploadedMedia};
use crate::post::slug::slug_from_title;
use crate::post::validation::{validate_post, ValidationError};
use crate::post::{Category, CategorySet, Post, PostId, TechnologyEntry};
use crate::store::{DocumentStore, StoreError};
use crate::text_utils::{format_date, join_tags, parse_form_date, split_tags};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DraftId(pub String);

impl DraftId {
    pub fn generate() -> Self {
        DraftId(Uuid::new_v4().to_string())
    }
}

impl Display for DraftId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn is_checked(flag: &Option<String>) -> bool {
    matches!(flag.as_deref(), Some("on" | "true" | "1"))
}

fn optional(value: String) -> Option<String> {
    let value = value.trim();
    if value.is_empty() { None } else { Some(value.to_string()) }
}

/// Post metadata form of the editor page. Checkboxes are absent when unchecked.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PostFields {
    pub title: String,
    pub description: String,
    pub slug: String,
    pub tags: String,
    pub development: Option<String>,
    pub design: Option<String>,
    pub project_type: String,
    pub pinned: Option<String>,
    pub image: String,
    pub video: String,
    pub logo: String,
    pub demo: String,
    pub source: String,
    pub published_at: String,
}

impl PostFields {
    pub fn from_post(post: &Post) -> Self {
        let flag = |on: bool| if on { Some("on".to_string()) } else { None };
        PostFields {
            title: post.title.clone(),
            description: post.description.clone(),
            slug: post.slug.clone(),
            tags: join_tags(&post.tags),
            development: flag(post.category.contains(Category::Development)),
            design: flag(post.category.contains(Category::Design)),
            project_type: post.project_type.as_str().to_string(),
            pinned: flag(post.pinned),
            image: post.media.image.clone().unwrap_or_default(),
            video: post.media.video.clone().unwrap_or_default(),
            logo: post.media.logo.clone().unwrap_or_default(),
            demo: post.links.demo.clone().unwrap_or_default(),
            source: post.links.source.clone().unwrap_or_default(),
            published_at: post.published_at.as_ref().map(format_date).unwrap_or_default(),
        }
    }
}

/// Technology list form. `action` is one of `add`, `update` or `remove`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TechnologyForm {
    pub action: String,
    pub index: Option<usize>,
    pub name: String,
    pub logo: String,
    pub dark_logo: String,
    pub link: String,
}

impl TechnologyForm {
    fn entry(&self) -> TechnologyEntry {
        TechnologyEntry {
            name: self.name.trim().to_string(),
            logo: self.logo.trim().to_string(),
            dark_logo: optional(self.dark_logo.clone()),
            link: optional(self.link.clone()),
        }
    }
}

#[derive(Debug)]
pub enum SaveError {
    Invalid(Vec<ValidationError>),
    Store(StoreError),
}

impl Display for SaveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SaveError::Invalid(errors) => {
                let descs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                write!(f, "{}", descs.join("; "))
            }
            SaveError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl From<StoreError> for SaveError {
    fn from(value: StoreError) -> Self {
        SaveError::Store(value)
    }
}

/// Uncommitted copy of a post being edited. Lives only in memory.
pub struct Draft {
    /// Stored post this draft edits, `None` for a brand new post.
    pub post_id: Option<PostId>,
    pub post: Post,
    pub editor: BlockEditor,
    pub view: EditorViewState,
    pub pending_uploads: Vec<UploadedMedia>,
    /// Messages shown on the next render of the editor page.
    pub messages: Vec<String>,
    /// Set by the block editor listener and by metadata edits, cleared on save.
    unsaved: Arc<AtomicBool>,
    last_used: DateTime<Utc>,
}

impl Draft {
    pub fn new() -> Self {
        Draft::from_post(Post::default())
    }

    pub fn from_post(mut post: Post) -> Self {
        let post_id = post.id.clone();
        let blocks = std::mem::take(&mut post.content);
        let unsaved = Arc::new(AtomicBool::new(false));

        let mut editor = BlockEditor::new(blocks);
        let block_changes = unsaved.clone();
        editor.set_listener(Box::new(move |_| block_changes.store(true, Ordering::Relaxed)));

        Draft {
            post_id,
            post,
            editor,
            view: EditorViewState::default(),
            pending_uploads: vec![],
            messages: vec![],
            unsaved,
            last_used: Utc::now(),
        }
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved.load(Ordering::Relaxed)
    }

    fn mark_unsaved(&self) {
        self.unsaved.store(true, Ordering::Relaxed);
    }

    /// Copies the metadata form into the draft. The slug follows the title while
    /// the slug field is left empty.
    pub fn apply_fields(&mut self, fields: PostFields) -> Result<(), String> {
        let published_at = parse_form_date(&fields.published_at)?;
        let project_type = match fields.project_type.trim() {
            "" => self.post.project_type,
            x => x.parse()?,
        };

        let mut category = CategorySet::new();
        if is_checked(&fields.development) {
            category.insert(Category::Development);
        }
        if is_checked(&fields.design) {
            category.insert(Category::Design);
        }

        let post = &mut self.post;
        post.title = fields.title.trim().to_string();
        post.description = fields.description.trim().to_string();
        post.slug = match fields.slug.trim() {
            "" => slug_from_title(&post.title),
            slug => slug.to_string(),
        };
        post.tags = split_tags(&fields.tags);
        post.category = category;
        post.project_type = project_type;
        post.pinned = is_checked(&fields.pinned);
        post.media.image = optional(fields.image);
        post.media.video = optional(fields.video);
        post.media.logo = optional(fields.logo);
        post.links.demo = optional(fields.demo);
        post.links.source = optional(fields.source);
        post.published_at = published_at;
        self.mark_unsaved();
        Ok(())
    }

    pub fn apply_technology(&mut self, form: TechnologyForm) -> Result<(), String> {
        let technologies = &mut self.post.technologies;
        let check_index = |index: Option<usize>, len: usize| match index {
            Some(i) if i < len => Ok(i),
            Some(i) => Err(format!("Technology {} does not exist", i)),
            None => Err("Missing technology index".to_string()),
        };

        match form.action.as_str() {
            "add" => {
                let entry = form.entry();
                if entry.name.is_empty() {
                    return Err("Technology name is required".to_string());
                }
                technologies.push(entry);
            }
            "update" => {
                let index = check_index(form.index, technologies.len())?;
                technologies[index] = form.entry();
            }
            "remove" => {
                let index = check_index(form.index, technologies.len())?;
                technologies.remove(index);
            }
            x => return Err(format!("Unknown technology action '{}'", x)),
        }
        self.mark_unsaved();
        Ok(())
    }

    pub fn record_upload(&mut self, media: UploadedMedia) {
        debug!("Draft keeps pending upload {}", media.key);
        self.pending_uploads.push(media);
    }

    /// The post as it would be stored right now.
    pub fn to_post(&self) -> Post {
        let mut post = self.post.clone();
        post.id = self.post_id.clone();
        post.content = self.editor.blocks().to_vec();
        post
    }

    /// Validates and persists the draft, then drops the uploads the saved post
    /// no longer points at. The draft stays usable for further edits.
    pub fn save(&mut self, store: &mut dyn DocumentStore, media: &dyn MediaStorage) -> Result<Post, SaveError> {
        let post = self.to_post();
        validate_post(&post).map_err(SaveError::Invalid)?;

        let saved = match self.post_id {
            Some(ref id) => store.replace(id, post)?,
            None => store.create(post)?,
        };

        let referenced = saved.referenced_urls();
        let (kept, orphans): (Vec<_>, Vec<_>) = self.pending_uploads
            .drain(..)
            .partition(|upload| referenced.contains(upload.url.as_str()));
        delete_uploads(media, &orphans);
        info!("Saved post {} keeping {} uploads", saved.slug, kept.len());

        self.post_id = saved.id.clone();
        self.post = saved.clone();
        self.post.content.clear();
        self.unsaved.store(false, Ordering::Relaxed);
        Ok(saved)
    }

    /// Throws the draft away along with everything it uploaded.
    pub fn discard(self, media: &dyn MediaStorage) {
        delete_uploads(media, &self.pending_uploads);
    }
}

impl Default for Draft {
    fn default() -> Self {
        Draft::new()
    }
}

fn delete_uploads(media: &dyn MediaStorage, uploads: &[UploadedMedia]) {
    for upload in uploads {
        if let Err(e) = media.delete(&upload.key) {
            warn!("Could not delete upload {}: {}", upload.key, e);
        }
    }
}

/// Open drafts of the current server run.
#[derive(Default)]
pub struct DraftStore {
    drafts: HashMap<DraftId, Draft>,
}

impl DraftStore {
    pub fn new() -> Self {
        DraftStore::default()
    }

    pub fn open(&mut self, draft: Draft) -> DraftId {
        let id = DraftId::generate();
        self.drafts.insert(id.clone(), draft);
        id
    }

    /// Existing draft of a stored post, so two tabs edit the same draft.
    pub fn find_by_post(&self, post_id: &PostId) -> Option<DraftId> {
        self.drafts.iter()
            .find(|(_, d)| d.post_id.as_ref() == Some(post_id))
            .map(|(id, _)| id.clone())
    }

    pub fn get(&self, id: &DraftId) -> Option<&Draft> {
        self.drafts.get(id)
    }

    /// Mutable access counts as use and keeps the draft from expiring.
    pub fn get_mut(&mut self, id: &DraftId) -> Option<&mut Draft> {
        let draft = self.drafts.get_mut(id)?;
        draft.last_used = Utc::now();
        Some(draft)
    }

    /// Takes out every draft untouched for longer than `max_idle`.
    pub fn take_idle(&mut self, now: DateTime<Utc>, max_idle: Duration) -> Vec<(DraftId, Draft)> {
        let idle: Vec<DraftId> = self.drafts.iter()
            .filter(|(_, draft)| now - draft.last_used > max_idle)
            .map(|(id, _)| id.clone())
            .collect();

        idle.into_iter()
            .filter_map(|id| self.drafts.remove(&id).map(|draft| (id, draft)))
            .collect()
    }

    pub fn remove(&mut self, id: &DraftId) -> Option<Draft> {
        self.drafts.remove(id)
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::blocks::field_edit::attach_upload;
    use crate::blocks::BlockType;
    use crate::media::memory::MemoryMediaStorage;
    use crate::post::ProjectType;
    use crate::store::JsonFileStore;

    use super::*;

    fn temp_data_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("folio-draft-{}-{}", name, Uuid::new_v4()))
    }

    fn fields(title: &str, slug: &str) -> PostFields {
        PostFields {
            title: title.to_string(),
            description: "Something I built".to_string(),
            slug: slug.to_string(),
            ..PostFields::default()
        }
    }

    #[test]
    fn test_apply_fields() {
        let mut draft = Draft::new();
        let form = PostFields {
            tags: "Rust, web".to_string(),
            design: Some("on".to_string()),
            project_type: "professional".to_string(),
            pinned: Some("on".to_string()),
            demo: "  https://demo.example.com ".to_string(),
            published_at: "2024-05-01".to_string(),
            ..fields("Café Racer", "")
        };
        draft.apply_fields(form).unwrap();

        let post = draft.to_post();
        assert_eq!(post.slug, "cafe-racer");
        assert_eq!(post.tags.len(), 2);
        assert!(post.category.contains(Category::Design));
        assert!(!post.category.contains(Category::Development));
        assert_eq!(post.project_type, ProjectType::Professional);
        assert!(post.pinned);
        assert_eq!(post.links.demo.as_deref(), Some("https://demo.example.com"));
        assert_eq!(post.media.image, None);

        let round_trip = PostFields::from_post(&post);
        assert_eq!(round_trip.published_at, "2024-05-01");
        assert_eq!(round_trip.design.as_deref(), Some("on"));
        assert_eq!(round_trip.development, None);
    }

    #[test]
    fn test_apply_fields_rejects_bad_values() {
        let mut draft = Draft::new();
        let bad_date = PostFields { published_at: "yesterday".to_string(), ..fields("A", "a") };
        assert!(draft.apply_fields(bad_date).is_err());
        let bad_type = PostFields { project_type: "hobby".to_string(), ..fields("A", "a") };
        assert!(draft.apply_fields(bad_type).is_err());
    }

    #[test]
    fn test_technologies() {
        let mut draft = Draft::new();
        let add = |name: &str| TechnologyForm { action: "add".to_string(), name: name.to_string(), ..TechnologyForm::default() };
        draft.apply_technology(add("Rust")).unwrap();
        draft.apply_technology(add("ntex")).unwrap();
        assert!(draft.apply_technology(add(" ")).is_err());

        let update = TechnologyForm {
            action: "update".to_string(),
            index: Some(1),
            name: "ntex".to_string(),
            dark_logo: "/media/ntex-dark.png".to_string(),
            ..TechnologyForm::default()
        };
        draft.apply_technology(update).unwrap();
        assert_eq!(draft.post.technologies[1].dark_logo.as_deref(), Some("/media/ntex-dark.png"));

        let remove = TechnologyForm { action: "remove".to_string(), index: Some(0), ..TechnologyForm::default() };
        draft.apply_technology(remove).unwrap();
        assert_eq!(draft.post.technologies.len(), 1);

        let out_of_range = TechnologyForm { action: "remove".to_string(), index: Some(4), ..TechnologyForm::default() };
        assert!(draft.apply_technology(out_of_range).is_err());
    }

    #[test]
    fn test_save_drops_unreferenced_uploads() {
        let dir = temp_data_dir("save");
        let mut store = JsonFileStore::open(&dir).unwrap();
        let media = MemoryMediaStorage::default();

        let mut draft = Draft::new();
        draft.apply_fields(fields("Gallery", "gallery")).unwrap();
        draft.editor.add_block(BlockType::Image);

        let used = media.upload("used.png", b"x").unwrap();
        let replaced = media.upload("replaced.png", b"x").unwrap();
        draft.record_upload(replaced.clone());
        draft.record_upload(used.clone());

        let image = attach_upload(draft.editor.get(0).unwrap(), &used).unwrap();
        draft.editor.update_block(0, image).unwrap();

        let saved = draft.save(&mut store, &media).unwrap();
        assert!(saved.id.is_some());
        assert_eq!(draft.post_id, saved.id);
        assert!(draft.pending_uploads.is_empty());
        assert_eq!(*media.deleted.lock().unwrap(), vec![replaced.key]);
        assert_eq!(store.get_by_slug("gallery").unwrap().content.len(), 1);

        // Saving again replaces instead of creating
        draft.editor.add_block(BlockType::Separator);
        draft.save(&mut store, &media).unwrap();
        assert_eq!(store.list().len(), 1);
        assert_eq!(store.list()[0].content.len(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_invalid_draft_is_not_saved() {
        let dir = temp_data_dir("invalid");
        let mut store = JsonFileStore::open(&dir).unwrap();
        let media = MemoryMediaStorage::default();

        let mut draft = Draft::new();
        draft.record_upload(media.upload("a.png", b"x").unwrap());
        match draft.save(&mut store, &media) {
            Err(SaveError::Invalid(errors)) => assert!(errors.contains(&ValidationError::MissingTitle)),
            other => panic!("expected validation errors, got {:?}", other.map(|p| p.slug)),
        }
        assert!(store.list().is_empty());
        assert_eq!(draft.pending_uploads.len(), 1);
        assert!(media.deleted.lock().unwrap().is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_discard_deletes_every_upload() {
        let media = MemoryMediaStorage::default();
        let mut draft = Draft::new();
        draft.record_upload(media.upload("a.png", b"x").unwrap());
        draft.record_upload(media.upload("b.mp4", b"x").unwrap());
        draft.discard(&media);
        assert_eq!(media.deleted.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_discard_survives_storage_errors() {
        let media = MemoryMediaStorage { fail_deletes: true, ..MemoryMediaStorage::default() };
        let mut draft = Draft::new();
        draft.record_upload(media.upload("a.png", b"x").unwrap());
        draft.discard(&media);
    }

    #[test]
    fn test_unsaved_changes() {
        let dir = temp_data_dir("unsaved");
        let mut store = JsonFileStore::open(&dir).unwrap();
        let media = MemoryMediaStorage::default();

        let mut draft = Draft::new();
        assert!(!draft.has_unsaved_changes());
        draft.apply_fields(fields("Tracked", "tracked")).unwrap();
        assert!(draft.has_unsaved_changes());

        draft.save(&mut store, &media).unwrap();
        assert!(!draft.has_unsaved_changes());

        draft.editor.add_block(BlockType::Paragraph);
        assert!(draft.has_unsaved_changes());
        draft.save(&mut store, &media).unwrap();
        draft.editor.move_block(0, 0).unwrap();
        assert!(!draft.has_unsaved_changes());
        draft.editor.remove_block(0).unwrap();
        assert!(draft.has_unsaved_changes());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_idle_drafts_expire() {
        let mut drafts = DraftStore::new();
        let stale = drafts.open(Draft::new());
        let fresh = drafts.open(Draft::new());

        let now = Utc::now();
        drafts.drafts.get_mut(&stale).unwrap().last_used = now - Duration::hours(30);

        let expired = drafts.take_idle(now, Duration::hours(24));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].0, stale);
        assert!(drafts.get(&stale).is_none());
        assert!(drafts.get(&fresh).is_some());

        // Touching a draft resets its idle time
        drafts.drafts.get_mut(&fresh).unwrap().last_used = now - Duration::hours(30);
        drafts.get_mut(&fresh).unwrap();
        assert!(drafts.take_idle(Utc::now(), Duration::hours(24)).is_empty());
    }

    #[test]
    fn test_draft_store() {
        let mut drafts = DraftStore::new();
        let post = Post { id: Some(PostId("p1".to_string())), ..Post::default() };
        let id = drafts.open(Draft::from_post(post));
        assert_eq!(drafts.find_by_post(&PostId("p1".to_string())), Some(id.clone()));
        assert!(drafts.get(&id).is_some());
        assert!(drafts.remove(&id).is_some());
        assert!(drafts.is_empty());
    }
}
