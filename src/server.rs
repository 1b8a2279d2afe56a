use std::fmt::Display;
use std::io;
use std::io::ErrorKind;
use std::sync::{Arc, Mutex};

use chrono::Local;
use ntex::http::header;
use ntex::util::Bytes;
use ntex::web;
use ntex::web::{HttpRequest, HttpResponse};
use ntex_files::NamedFile;
use serde::Deserialize;
use spdlog::{error, info, warn};

use crate::app_state::{lock_state, AppState, DraftAction, DraftActionError};
use crate::auth::DashboardAuth;
use crate::config::{Config, DEFAULT_RETAINED_DAYS};
use crate::draft::{DraftId, PostFields, TechnologyForm};
use crate::media::{validate_key, LocalMediaStorage};
use crate::metrics::metric_handler::MetricHandler;
use crate::metrics::metric_publisher::MetricPublisher;
use crate::metrics::visitor_stats::VisitorStats;
use crate::post::PostId;
use crate::query_string::QueryString;
use crate::settings::SettingToggle;
use crate::store::{JsonFileStore, StoreError};
use crate::view::page_renderer::render_maintenance;
use crate::view::Templates;

type SharedState = web::types::State<Arc<Mutex<AppState>>>;

const HTML: &str = "text/html; charset=utf-8";
const LOGIN_PATH: &str = "/dashboard/login";
const DASHBOARD_PATH: &str = "/dashboard";

#[derive(Deserialize)]
struct LoginForm {
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
struct SettingsForm {
    setting: String,
    #[serde(default)]
    enabled: String,
}

#[derive(Deserialize)]
struct AddBlockForm {
    block_type: String,
}

#[derive(Deserialize)]
struct BlockEditForm {
    field: String,
    #[serde(default)]
    value: String,
}

#[derive(Deserialize)]
struct MoveForm {
    from: usize,
    to: usize,
}

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(HTML)
        .body(body)
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .header("Location", location)
        .finish()
}

fn not_found(what: &str) -> HttpResponse {
    HttpResponse::NotFound()
        .content_type(HTML)
        .body(format!("{} not found", what))
}

fn server_error(context: &str, e: impl Display) -> HttpResponse {
    error!("{}: {}", context, e);
    HttpResponse::InternalServerError()
        .body(format!("{}. Please try again later", context))
}

fn maintenance(state: &AppState) -> HttpResponse {
    HttpResponse::ServiceUnavailable()
        .content_type(HTML)
        .header("Retry-After", "3600")
        .body(render_maintenance(&state.config.site))
}

fn dashboard_link(message: &str) -> String {
    match serde_urlencoded::to_string([("message", message)]) {
        Ok(query) => format!("{}?{}", DASHBOARD_PATH, query),
        Err(_) => DASHBOARD_PATH.to_string(),
    }
}

fn editor_link(draft_id: &DraftId) -> String {
    format!("/dashboard/drafts/{}", draft_id)
}

/// Visitor address for analytics. Proxies put the client first in x-forwarded-for.
fn get_origin(req: &HttpRequest) -> String {
    let forwarded = req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    forwarded
        .or_else(|| req.peer_addr().map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn get_query(req: &HttpRequest) -> QueryString {
    req.uri().query().map(QueryString::from).unwrap_or_default()
}

fn is_authorized(req: &HttpRequest, state: &AppState) -> bool {
    let cookie = req.headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok());
    state.auth.is_authorized(cookie)
}

/// Answer for a draft change: back to the editor, or the editor again with the reason.
fn draft_response<T>(state: &mut AppState, draft_id: &DraftId, result: Result<T, DraftActionError>) -> HttpResponse {
    match result {
        Ok(_) => redirect(&editor_link(draft_id)),
        Err(DraftActionError::NoDraft) => not_found("Draft"),
        Err(DraftActionError::Rejected(desc)) => {
            info!("Draft {} change refused: {}", draft_id, desc);
            match state.editor_page(draft_id) {
                Some(page) => HttpResponse::BadRequest().content_type(HTML).body(page),
                None => not_found("Draft"),
            }
        }
        Err(DraftActionError::Failed(desc)) => server_error("Error updating draft", desc),
    }
}

// Begin: Public region --------
#[web::get("/")]
async fn index(req: HttpRequest, state: SharedState) -> HttpResponse {
    let (page, sender) = {
        let state = lock_state(&state);
        if state.settings.maintenance_mode {
            return maintenance(&state);
        }
        (state.index_page(Local::now().date_naive()), state.public_sender())
    };

    sender.index(get_origin(&req)).await;
    html(page)
}

#[web::get("/projects")]
async fn projects(req: HttpRequest, state: SharedState) -> HttpResponse {
    let (page, sender) = {
        let state = lock_state(&state);
        if state.settings.maintenance_mode {
            return maintenance(&state);
        }
        (state.projects_page(), state.public_sender())
    };

    sender.projects(get_origin(&req)).await;
    html(page)
}

#[web::get("/projects/{slug}")]
async fn view(req: HttpRequest, path: web::types::Path<String>, state: SharedState) -> HttpResponse {
    let slug = path.into_inner();
    let (page, sender) = {
        let mut state = lock_state(&state);
        if state.settings.maintenance_mode {
            return maintenance(&state);
        }
        let page = match state.post_page(&slug) {
            Ok(Some(page)) => page,
            Ok(None) => return not_found("Project"),
            Err(e) => return server_error(&format!("Error rendering project {}", slug), e),
        };
        (page, state.public_sender())
    };

    sender.view(slug, get_origin(&req)).await;
    html(page)
}

#[web::get("/about")]
async fn about(req: HttpRequest, state: SharedState) -> HttpResponse {
    let (page, sender) = {
        let mut state = lock_state(&state);
        if state.settings.maintenance_mode {
            return maintenance(&state);
        }
        let page = match state.about_page() {
            Ok(page) => page,
            Err(e) => return server_error("Error rendering about page", e),
        };
        (page, state.public_sender())
    };

    sender.about(get_origin(&req)).await;
    html(page.to_string())
}

#[web::get("/rss")]
async fn rss(req: HttpRequest, state: SharedState) -> HttpResponse {
    let (feed, sender) = {
        let state = lock_state(&state);
        if state.settings.maintenance_mode {
            return maintenance(&state);
        }
        let feed = match state.rss_feed() {
            Some(Ok(feed)) => feed,
            Some(Err(e)) => return server_error("Error rendering RSS feed", e),
            None => return not_found("Feed"),
        };
        (feed, state.public_sender())
    };

    sender.rss(get_origin(&req)).await;
    HttpResponse::Ok()
        .content_type("application/rss+xml; charset=utf-8")
        .body(feed)
}

#[web::get("/public/{file_name}")]
async fn public_files(path: web::types::Path<String>, state: SharedState) -> Result<NamedFile, web::Error> {
    if path.contains("..") {
        return Err(web::error::ErrorUnauthorized("Access forbidden").into());
    }

    let file_path = lock_state(&state).config.paths.public_dir.join(path.into_inner());
    Ok(NamedFile::open(file_path)?)
}

#[web::get("/media/{key}")]
async fn media_files(path: web::types::Path<String>, state: SharedState) -> Result<NamedFile, web::Error> {
    let key = path.into_inner();
    if validate_key(&key).is_err() {
        return Err(web::error::ErrorUnauthorized("Access forbidden").into());
    }

    let file_path = lock_state(&state).config.paths.media_dir.join(key);
    Ok(NamedFile::open(file_path)?)
}
// End: Public region --------

// Begin: Dashboard region --------
#[web::get("/dashboard/login")]
async fn login_page(req: HttpRequest, state: SharedState) -> HttpResponse {
    let state = lock_state(&state);
    if is_authorized(&req, &state) {
        return redirect(DASHBOARD_PATH);
    }
    html(state.login_page(None))
}

#[web::post("/dashboard/login")]
async fn login(form: web::types::Form<LoginForm>, state: SharedState) -> HttpResponse {
    let state = lock_state(&state);
    let cookie = match state.auth.login_cookie() {
        Some(cookie) if state.auth.check_password(&form.password) => cookie,
        _ => {
            warn!("Failed dashboard login");
            return HttpResponse::Unauthorized()
                .content_type(HTML)
                .body(state.login_page(Some("Wrong password")));
        }
    };

    info!("Dashboard login");
    HttpResponse::SeeOther()
        .header("Location", DASHBOARD_PATH)
        .header("Set-Cookie", cookie)
        .finish()
}

#[web::post("/dashboard/logout")]
async fn logout() -> HttpResponse {
    HttpResponse::SeeOther()
        .header("Location", LOGIN_PATH)
        .header("Set-Cookie", DashboardAuth::logout_cookie())
        .finish()
}

#[web::get("/dashboard")]
async fn dashboard(req: HttpRequest, state: SharedState) -> HttpResponse {
    let state = lock_state(&state);
    if !is_authorized(&req, &state) {
        return redirect(LOGIN_PATH);
    }

    let query = get_query(&req);
    html(state.dashboard_page(query.get("message"), query.get_page()))
}

#[web::post("/dashboard/settings")]
async fn update_settings(req: HttpRequest, form: web::types::Form<SettingsForm>, state: SharedState) -> HttpResponse {
    let mut state = lock_state(&state);
    if !is_authorized(&req, &state) {
        return redirect(LOGIN_PATH);
    }

    let toggle: SettingToggle = match form.setting.parse() {
        Ok(toggle) => toggle,
        Err(e) => return HttpResponse::BadRequest().body(e),
    };
    let enabled = matches!(form.enabled.as_str(), "on" | "true" | "1");

    match state.update_settings(toggle, enabled) {
        Ok(()) => redirect(&dashboard_link("Settings saved")),
        Err(e) => server_error("Error saving settings", e),
    }
}

#[web::post("/dashboard/posts/new")]
async fn new_post(req: HttpRequest, state: SharedState) -> HttpResponse {
    let mut state = lock_state(&state);
    if !is_authorized(&req, &state) {
        return redirect(LOGIN_PATH);
    }

    let draft_id = state.open_new_draft();
    redirect(&editor_link(&draft_id))
}

#[web::post("/dashboard/posts/{id}/edit")]
async fn edit_post(req: HttpRequest, path: web::types::Path<String>, state: SharedState) -> HttpResponse {
    let mut state = lock_state(&state);
    if !is_authorized(&req, &state) {
        return redirect(LOGIN_PATH);
    }

    match state.open_post_draft(&PostId(path.into_inner())) {
        Some(draft_id) => redirect(&editor_link(&draft_id)),
        None => not_found("Post"),
    }
}

#[web::post("/dashboard/posts/{id}/delete")]
async fn delete_post(req: HttpRequest, path: web::types::Path<String>, state: SharedState) -> HttpResponse {
    let mut state = lock_state(&state);
    if !is_authorized(&req, &state) {
        return redirect(LOGIN_PATH);
    }

    match state.delete_post(&PostId(path.into_inner())) {
        Ok(post) => redirect(&dashboard_link(&format!("Deleted {}", post.title))),
        Err(StoreError::NotFound(_)) => not_found("Post"),
        Err(e) => server_error("Error deleting post", e),
    }
}

#[web::get("/dashboard/drafts/{id}")]
async fn editor(req: HttpRequest, path: web::types::Path<String>, state: SharedState) -> HttpResponse {
    let mut state = lock_state(&state);
    if !is_authorized(&req, &state) {
        return redirect(LOGIN_PATH);
    }

    match state.editor_page(&DraftId(path.into_inner())) {
        Some(page) => html(page),
        None => redirect(&dashboard_link("That draft is no longer open")),
    }
}

fn apply_action(req: &HttpRequest, state: &SharedState, draft_id: String, action: DraftAction) -> HttpResponse {
    let mut state = lock_state(state);
    if !is_authorized(req, &state) {
        return redirect(LOGIN_PATH);
    }

    let draft_id = DraftId(draft_id);
    let result = state.apply_draft_action(&draft_id, action);
    draft_response(&mut state, &draft_id, result)
}

#[web::post("/dashboard/drafts/{id}/fields")]
async fn draft_fields(req: HttpRequest, path: web::types::Path<String>, form: web::types::Form<PostFields>, state: SharedState) -> HttpResponse {
    apply_action(&req, &state, path.into_inner(), DraftAction::Fields(form.into_inner()))
}

#[web::post("/dashboard/drafts/{id}/technologies")]
async fn draft_technologies(req: HttpRequest, path: web::types::Path<String>, form: web::types::Form<TechnologyForm>, state: SharedState) -> HttpResponse {
    apply_action(&req, &state, path.into_inner(), DraftAction::Technology(form.into_inner()))
}

#[web::post("/dashboard/drafts/{id}/blocks")]
async fn add_block(req: HttpRequest, path: web::types::Path<String>, form: web::types::Form<AddBlockForm>, state: SharedState) -> HttpResponse {
    apply_action(&req, &state, path.into_inner(), DraftAction::AddBlock(form.into_inner().block_type))
}

#[web::post("/dashboard/drafts/{id}/blocks/move")]
async fn move_block(req: HttpRequest, path: web::types::Path<String>, form: web::types::Form<MoveForm>, state: SharedState) -> HttpResponse {
    let MoveForm { from, to } = form.into_inner();
    apply_action(&req, &state, path.into_inner(), DraftAction::MoveBlock { from, to })
}

#[web::post("/dashboard/drafts/{id}/blocks/{index}/edit")]
async fn edit_block(req: HttpRequest, path: web::types::Path<(String, usize)>, form: web::types::Form<BlockEditForm>, state: SharedState) -> HttpResponse {
    let (draft_id, block_index) = path.into_inner();
    let BlockEditForm { field, value } = form.into_inner();
    apply_action(&req, &state, draft_id, DraftAction::EditBlock { index: block_index, field, value })
}

#[web::post("/dashboard/drafts/{id}/blocks/{index}/remove")]
async fn remove_block(req: HttpRequest, path: web::types::Path<(String, usize)>, state: SharedState) -> HttpResponse {
    let (draft_id, block_index) = path.into_inner();
    apply_action(&req, &state, draft_id, DraftAction::RemoveBlock(block_index))
}

#[web::post("/dashboard/drafts/{id}/blocks/{index}/expand")]
async fn expand_block(req: HttpRequest, path: web::types::Path<(String, usize)>, state: SharedState) -> HttpResponse {
    let (draft_id, block_index) = path.into_inner();
    apply_action(&req, &state, draft_id, DraftAction::ToggleExpand(block_index))
}

#[web::post("/dashboard/drafts/{id}/blocks/{index}/upload")]
async fn upload_block_media(req: HttpRequest, path: web::types::Path<(String, usize)>, body: Bytes, state: SharedState) -> HttpResponse {
    let mut state = lock_state(&state);
    if !is_authorized(&req, &state) {
        return HttpResponse::Unauthorized().finish();
    }

    let (draft_id, block_index) = path.into_inner();
    let draft_id = DraftId(draft_id);
    let query = get_query(&req);
    let file_name = query.get("name").unwrap_or("upload");

    match state.upload_media(&draft_id, block_index, file_name, &body) {
        Ok(uploaded) => match serde_json::to_string(&uploaded) {
            Ok(json) => HttpResponse::Ok().content_type("application/json").body(json),
            Err(e) => server_error("Error encoding upload result", e),
        },
        Err(DraftActionError::NoDraft) => not_found("Draft"),
        Err(DraftActionError::Rejected(desc)) => HttpResponse::BadRequest().body(desc),
        Err(DraftActionError::Failed(desc)) => server_error("Error storing upload", desc),
    }
}

#[web::post("/dashboard/drafts/{id}/save")]
async fn save_draft(req: HttpRequest, path: web::types::Path<String>, state: SharedState) -> HttpResponse {
    let mut state = lock_state(&state);
    if !is_authorized(&req, &state) {
        return redirect(LOGIN_PATH);
    }

    let draft_id = DraftId(path.into_inner());
    let result = state.save_draft(&draft_id);
    draft_response(&mut state, &draft_id, result)
}

#[web::post("/dashboard/drafts/{id}/discard")]
async fn discard_draft(req: HttpRequest, path: web::types::Path<String>, state: SharedState) -> HttpResponse {
    let mut state = lock_state(&state);
    if !is_authorized(&req, &state) {
        return redirect(LOGIN_PATH);
    }

    if state.discard_draft(&DraftId(path.into_inner())) {
        redirect(&dashboard_link("Draft discarded"))
    } else {
        not_found("Draft")
    }
}
// End: Dashboard region --------

fn to_io_error(e: StoreError) -> io::Error {
    match e {
        StoreError::Io(e) => e,
        e => io::Error::new(ErrorKind::InvalidData, e.to_string()),
    }
}

fn open_publisher(config: &Config, retained_days: usize) -> Option<MetricPublisher> {
    let location = config.metrics.as_ref()?.location.as_ref()?;
    match MetricPublisher::new(location, retained_days) {
        Ok(publisher) => Some(publisher),
        Err(e) => {
            error!("Error opening metrics file {}: {}. Visitor history will not be written", location.display(), e);
            None
        }
    }
}

pub async fn server_run(config: Config) -> io::Result<()> {
    let templates = Templates::load(&config.paths.template_dir)?;
    let store = JsonFileStore::open(&config.paths.data_dir).map_err(to_io_error)?;
    let media = LocalMediaStorage::new(&config.paths.media_dir)?;

    let retained_days = config.metrics.as_ref()
        .and_then(|m| m.retained_days)
        .unwrap_or(DEFAULT_RETAINED_DAYS);
    let stats = Arc::new(Mutex::new(VisitorStats::new(retained_days)));
    let metric_handler = MetricHandler::new(stats.clone(), open_publisher(&config, retained_days));

    let bind_addr = config.server.address.clone();
    let bind_port = config.server.port;
    let max_upload = config.max_upload_bytes();

    let app_state = AppState::new(config, templates, Box::new(store), Box::new(media), stats, metric_handler.new_sender())
        .map_err(to_io_error)?;
    let app_state = Arc::new(Mutex::new(app_state));

    info!("Serving on {}:{}", bind_addr, bind_port);
    web::HttpServer::new(move || {
        web::App::new()
            .state(app_state.clone())
            .state(web::types::FormConfig::default().limit(max_upload))
            .state(web::types::PayloadConfig::new(max_upload))
            .service(index)
            .service(projects)
            .service(view)
            .service(about)
            .service(rss)
            .service(public_files)
            .service(media_files)
            .service(login_page)
            .service(login)
            .service(logout)
            .service(dashboard)
            .service(update_settings)
            .service(new_post)
            .service(edit_post)
            .service(delete_post)
            .service(editor)
            .service(draft_fields)
            .service(draft_technologies)
            .service(add_block)
            .service(move_block)
            .service(edit_block)
            .service(remove_block)
            .service(expand_block)
            .service(upload_block_media)
            .service(save_draft)
            .service(discard_draft)
    })
        .bind((bind_addr, bind_port))?
        .run()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_link_encodes_message() {
        assert_eq!(dashboard_link("Deleted A & B"), "/dashboard?message=Deleted+A+%26+B");
    }

    #[test]
    fn test_editor_link() {
        assert_eq!(editor_link(&DraftId("d1".to_string())), "/dashboard/drafts/d1");
    }
}
