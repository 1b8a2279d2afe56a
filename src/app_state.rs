use std::fmt;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::io::ErrorKind;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Duration, NaiveDate, Utc};
use spdlog::{debug, info, warn};

use crate::auth::DashboardAuth;
use crate::blocks::editor::EditorError;
use crate::blocks::field_edit::{attach_upload, edit_block, BlockEdit, EditError};
use crate::blocks::BlockType;
use crate::config::Config;
use crate::content_cache::{ContentCache, Expire};
use crate::draft::{Draft, DraftId, DraftStore, PostFields, SaveError, TechnologyForm};
use crate::media::{MediaStorage, UploadedMedia};
use crate::metrics::metric_sender::MetricSender;
use crate::metrics::visitor_stats::VisitorStats;
use crate::post::grouping::sort_posts;
use crate::post::{Post, PostId, ProjectType};
use crate::settings::{SettingToggle, SiteSettings};
use crate::store::{DocumentStore, StoreError, StoreResult};
use crate::view::dashboard_renderer::{render_dashboard, render_login, DashboardData};
use crate::view::editor_renderer::render_editor;
use crate::view::page_renderer::{render_about, render_index, render_post, render_post_body, render_projects, visible_posts};
use crate::view::rss_renderer::RssChannel;
use crate::view::Templates;

const ABOUT_CACHE_MINUTES: i64 = 5;
const DRAFT_IDLE_HOURS: i64 = 24;

/// Locks the shared state. A panic in another worker does not take the site down.
pub fn lock_state(state: &Mutex<AppState>) -> MutexGuard<'_, AppState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One change coming from the editor page.
pub enum DraftAction {
    Fields(PostFields),
    Technology(TechnologyForm),
    AddBlock(String),
    EditBlock { index: usize, field: String, value: String },
    RemoveBlock(usize),
    ToggleExpand(usize),
    MoveBlock { from: usize, to: usize },
}

#[derive(Debug, PartialEq)]
pub enum DraftActionError {
    NoDraft,
    /// The input was refused. The message is also queued on the draft.
    Rejected(String),
    Failed(String),
}

impl Display for DraftActionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DraftActionError::NoDraft => write!(f, "Draft not found"),
            DraftActionError::Rejected(desc) => write!(f, "{}", desc),
            DraftActionError::Failed(desc) => write!(f, "{}", desc),
        }
    }
}

fn rejected<E: Display>(e: E) -> DraftActionError {
    DraftActionError::Rejected(e.to_string())
}

impl From<EditorError> for DraftActionError {
    fn from(value: EditorError) -> Self {
        rejected(value)
    }
}

impl From<EditError> for DraftActionError {
    fn from(value: EditError) -> Self {
        rejected(value)
    }
}

impl From<SaveError> for DraftActionError {
    fn from(value: SaveError) -> Self {
        match value {
            SaveError::Invalid(_) => rejected(value),
            SaveError::Store(StoreError::SlugTaken(_)) | SaveError::Store(StoreError::NotFound(_)) => rejected(value),
            SaveError::Store(e) => DraftActionError::Failed(e.to_string()),
        }
    }
}

fn apply_action(draft: &mut Draft, action: DraftAction) -> Result<(), DraftActionError> {
    match action {
        DraftAction::Fields(fields) => draft.apply_fields(fields).map_err(rejected)?,
        DraftAction::Technology(form) => draft.apply_technology(form).map_err(rejected)?,
        DraftAction::AddBlock(type_name) => {
            let id = draft.editor.add_block_named(&type_name)?;
            debug!("Added {} block {}", type_name, id);
        }
        DraftAction::EditBlock { index, field, value } => {
            let block = draft.editor.get(index)
                .cloned()
                .ok_or(EditorError::IndexOutOfRange { index, len: draft.editor.len() })?;
            match field.as_str() {
                "pending_item" => draft.view.set_pending_item(&block.id, &value),
                "add_item" => {
                    draft.view.set_pending_item(&block.id, &value);
                    if let Some(updated) = draft.view.submit_pending_item(&block)? {
                        draft.editor.update_block(index, updated)?;
                    }
                }
                _ => {
                    let edit = BlockEdit::from_form(&field, &value)?;
                    let updated = edit_block(&block, edit)?;
                    draft.editor.update_block(index, updated)?;
                }
            }
        }
        DraftAction::RemoveBlock(index) => {
            let removed = draft.editor.remove_block(index)?;
            draft.view.forget(&removed.id);
        }
        DraftAction::ToggleExpand(index) => {
            let block = draft.editor.get(index)
                .ok_or(EditorError::IndexOutOfRange { index, len: draft.editor.len() })?;
            draft.view.toggle_expanded(block);
        }
        DraftAction::MoveBlock { from, to } => draft.editor.move_block(from, to)?,
    }
    Ok(())
}

/// Everything the request handlers share.
pub struct AppState {
    pub config: Config,
    pub templates: Templates,
    pub store: Box<dyn DocumentStore>,
    pub media: Box<dyn MediaStorage>,
    pub settings: SiteSettings,
    pub drafts: DraftStore,
    pub render_cache: ContentCache<String>,
    pub stats: Arc<Mutex<VisitorStats>>,
    pub metric_sender: MetricSender,
    pub auth: DashboardAuth,
}

impl AppState {
    pub fn new(
        config: Config,
        templates: Templates,
        store: Box<dyn DocumentStore>,
        media: Box<dyn MediaStorage>,
        stats: Arc<Mutex<VisitorStats>>,
        metric_sender: MetricSender,
    ) -> StoreResult<Self> {
        let settings = store.load_settings()?;
        let render_cache = if config.server.render_cache {
            ContentCache::new()
        } else {
            ContentCache::non_caching()
        };
        let auth = DashboardAuth::from_config(&config.dashboard);

        Ok(AppState {
            config,
            templates,
            store,
            media,
            settings,
            drafts: DraftStore::new(),
            render_cache,
            stats,
            metric_sender,
            auth,
        })
    }

    /// Sender for public page events. Drops everything while analytics is off.
    pub fn public_sender(&self) -> MetricSender {
        if self.settings.analytics_enabled {
            self.metric_sender.clone()
        } else {
            MetricSender::no_op()
        }
    }

    pub fn update_settings(&mut self, toggle: SettingToggle, value: bool) -> StoreResult<()> {
        let mut settings = self.settings.clone();
        settings.set(toggle, value);
        self.store.save_settings(&settings)?;
        self.settings = settings;
        info!("Setting {} is now {}", toggle, value);
        Ok(())
    }

    pub fn invalidate_post(&mut self, slug: &str) {
        self.render_cache.remove_post(slug);
    }

    fn public_posts(&self) -> Vec<Post> {
        visible_posts(self.store.list(), self.settings.show_personal_projects)
    }

    pub fn index_page(&self, today: NaiveDate) -> String {
        let posts = self.public_posts();
        render_index(&self.templates.index, &self.config.site, &posts, self.config.featured_count(), today)
    }

    pub fn projects_page(&self) -> String {
        render_projects(&self.templates.projects, &self.config.site, &self.public_posts())
    }

    /// `None` when no visible post has this slug.
    pub fn post_page(&mut self, slug: &str) -> io::Result<Option<String>> {
        let post = match self.store.get_by_slug(slug) {
            Some(post) => post,
            None => return Ok(None),
        };
        if post.project_type == ProjectType::Personal && !self.settings.show_personal_projects {
            return Ok(None);
        }

        let body = self.render_cache.get_post_or(slug, || Ok(render_post_body(&post)))?;
        Ok(Some(render_post(&self.templates.post, &self.config.site, &post, &body)))
    }

    pub fn about_page(&mut self) -> io::Result<Arc<String>> {
        let about_file = &self.config.paths.about_file;
        let template = &self.templates.about;
        let site = &self.config.site;
        self.render_cache.get_page_or("about", Expire::After(Duration::minutes(ABOUT_CACHE_MINUTES)), || {
            let about_md = fs::read_to_string(about_file)
                .map_err(|e| io::Error::new(e.kind(), format!("Error reading {}: {}", about_file.display(), e)))?;
            render_about(template, site, &about_md)
        })
    }

    /// `None` when the feed is not configured.
    pub fn rss_feed(&self) -> Option<io::Result<Vec<u8>>> {
        let rss_cfg = self.config.rss_feed.as_ref()?;
        let mut posts = self.public_posts();
        sort_posts(&mut posts);
        posts.truncate(rss_cfg.size);

        let channel = RssChannel {
            ch_title: &rss_cfg.title,
            ch_link: &self.config.site.base_url,
            ch_desc: &rss_cfg.description,
        };
        Some(channel.render(&posts).map_err(|e| io::Error::new(ErrorKind::Other, format!("Error rendering RSS feed: {}", e))))
    }

    pub fn login_page(&self, error: Option<&str>) -> String {
        render_login(&self.templates.login, &self.config.site.name, error, self.auth.is_locked())
    }

    pub fn dashboard_page(&self, message: Option<&str>, cur_page: usize) -> String {
        let stats = self.stats.lock()
            .unwrap_or_else(|p| p.into_inner())
            .summary();

        render_dashboard(&self.templates.dashboard, DashboardData {
            site_name: &self.config.site.name,
            message,
            posts: self.store.list(),
            cur_page,
            settings: &self.settings,
            stats,
            open_drafts: self.drafts.len(),
        })
    }

    /// Drops drafts nobody touched for a day along with their pending uploads.
    fn expire_idle_drafts(&mut self) {
        for (id, draft) in self.drafts.take_idle(Utc::now(), Duration::hours(DRAFT_IDLE_HOURS)) {
            if draft.has_unsaved_changes() {
                warn!("Draft {} expired with unsaved changes", id);
            } else {
                info!("Draft {} expired", id);
            }
            draft.discard(self.media.as_ref());
        }
    }

    pub fn open_new_draft(&mut self) -> DraftId {
        self.expire_idle_drafts();
        let id = self.drafts.open(Draft::new());
        info!("Opened draft {} for a new post", id);
        id
    }

    /// Reuses the draft already open for this post, if any.
    pub fn open_post_draft(&mut self, post_id: &PostId) -> Option<DraftId> {
        self.expire_idle_drafts();
        if let Some(draft_id) = self.drafts.find_by_post(post_id) {
            return Some(draft_id);
        }
        let post = self.store.get(post_id)?;
        let draft_id = self.drafts.open(Draft::from_post(post));
        info!("Opened draft {} for post {}", draft_id, post_id);
        Some(draft_id)
    }

    pub fn delete_post(&mut self, post_id: &PostId) -> StoreResult<Post> {
        let deleted = self.store.delete(post_id)?;
        self.invalidate_post(&deleted.slug);
        if let Some(draft) = self.drafts.find_by_post(post_id).and_then(|id| self.drafts.remove(&id)) {
            draft.discard(self.media.as_ref());
        }
        info!("Deleted post {}", deleted.slug);
        Ok(deleted)
    }

    /// Renders the editor and clears the messages it showed.
    pub fn editor_page(&mut self, draft_id: &DraftId) -> Option<String> {
        let draft = self.drafts.get_mut(draft_id)?;
        let html = render_editor(&self.templates.editor, &self.config.site.name, draft_id, draft);
        draft.messages.clear();
        Some(html)
    }

    fn note_rejection<T>(&mut self, draft_id: &DraftId, result: Result<T, DraftActionError>) -> Result<T, DraftActionError> {
        if let Err(DraftActionError::Rejected(ref desc)) = result {
            if let Some(draft) = self.drafts.get_mut(draft_id) {
                draft.messages.push(desc.clone());
            }
        }
        result
    }

    pub fn apply_draft_action(&mut self, draft_id: &DraftId, action: DraftAction) -> Result<(), DraftActionError> {
        let result = match self.drafts.get_mut(draft_id) {
            Some(draft) => apply_action(draft, action),
            None => Err(DraftActionError::NoDraft),
        };
        self.note_rejection(draft_id, result)
    }

    /// Stores `bytes` and points the image or video block at `index` to it.
    pub fn upload_media(&mut self, draft_id: &DraftId, index: usize, file_name: &str, bytes: &[u8]) -> Result<UploadedMedia, DraftActionError> {
        let result = self.upload_into_draft(draft_id, index, file_name, bytes);
        self.note_rejection(draft_id, result)
    }

    fn upload_into_draft(&mut self, draft_id: &DraftId, index: usize, file_name: &str, bytes: &[u8]) -> Result<UploadedMedia, DraftActionError> {
        let draft = self.drafts.get_mut(draft_id).ok_or(DraftActionError::NoDraft)?;
        let block = draft.editor.get(index)
            .cloned()
            .ok_or(EditorError::IndexOutOfRange { index, len: draft.editor.len() })?;
        if !matches!(block.block_type(), Some(BlockType::Image) | Some(BlockType::Video)) {
            return Err(rejected(EditError::NotApplicable {
                edit: "upload",
                block_type: block.type_name().to_string(),
            }));
        }

        let uploaded = self.media.upload(file_name, bytes).map_err(|e| match e.kind() {
            ErrorKind::InvalidInput => rejected(e),
            _ => DraftActionError::Failed(format!("Error storing {}: {}", file_name, e)),
        })?;
        draft.record_upload(uploaded.clone());

        let updated = attach_upload(&block, &uploaded)?;
        draft.editor.update_block(index, updated)?;
        Ok(uploaded)
    }

    pub fn save_draft(&mut self, draft_id: &DraftId) -> Result<Post, DraftActionError> {
        let result = self.save_into_store(draft_id);
        self.note_rejection(draft_id, result)
    }

    fn save_into_store(&mut self, draft_id: &DraftId) -> Result<Post, DraftActionError> {
        let draft = self.drafts.get_mut(draft_id).ok_or(DraftActionError::NoDraft)?;
        let old_slug = draft.post_id.as_ref()
            .and_then(|id| self.store.get(id))
            .map(|post| post.slug);

        let saved = draft.save(self.store.as_mut(), self.media.as_ref())?;
        draft.messages.push("Saved".to_string());

        if let Some(old_slug) = old_slug {
            self.invalidate_post(&old_slug);
        }
        self.invalidate_post(&saved.slug);
        Ok(saved)
    }

    pub fn discard_draft(&mut self, draft_id: &DraftId) -> bool {
        match self.drafts.remove(draft_id) {
            Some(draft) => {
                draft.discard(self.media.as_ref());
                info!("Discarded draft {}", draft_id);
                true
            }
            None => false,
        }
    }
}
