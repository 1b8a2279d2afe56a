use ramhorns::Template;

use crate::metrics::visitor_stats::{DaySummary, StatsSummary};
use crate::paginator::Paginator;
use crate::post::grouping::sort_posts;
use crate::post::Post;
use crate::settings::{SettingToggle, SiteSettings};
use crate::text_utils::format_date;

pub const DASHBOARD_PAGE_SIZE: usize = 20;

#[derive(ramhorns::Content)]
struct LoginPage<'a> {
    site_name: &'a str,
    error: Option<&'a str>,
    locked: bool,
}

#[derive(ramhorns::Content)]
struct ViewPostRow {
    id: String,
    title: String,
    slug: String,
    date: String,
    project_type: &'static str,
    pinned: bool,
    block_count: usize,
}

#[derive(ramhorns::Content)]
struct ViewToggle {
    name: &'static str,
    label: &'static str,
    enabled: bool,
}

#[derive(ramhorns::Content)]
struct ViewPageHits {
    page: String,
    hits: u64,
    unique_visitors: u64,
}

#[derive(ramhorns::Content)]
struct ViewDay {
    date: String,
    hits: u64,
    unique_visitors: u64,
    pages: Vec<ViewPageHits>,
}

impl ViewDay {
    fn from(day: &DaySummary) -> Self {
        ViewDay {
            date: day.date.format("%Y-%m-%d").to_string(),
            hits: day.hits,
            unique_visitors: day.unique_visitors,
            pages: day.pages.iter()
                .map(|p| ViewPageHits { page: p.page.clone(), hits: p.hits, unique_visitors: p.unique_visitors })
                .collect(),
        }
    }
}

#[derive(ramhorns::Content)]
struct ViewPageLink {
    number: usize,
    current: bool,
}

#[derive(ramhorns::Content)]
struct DashboardPage<'a> {
    site_name: &'a str,
    message: Option<&'a str>,
    posts: Vec<ViewPostRow>,
    post_count: usize,
    pages: Vec<ViewPageLink>,
    show_pagination: bool,
    toggles: Vec<ViewToggle>,
    analytics_enabled: bool,
    today: ViewDay,
    past_days: Vec<ViewDay>,
    open_drafts: usize,
}

pub fn render_login(template: &Template, site_name: &str, error: Option<&str>, locked: bool) -> String {
    template.render(&LoginPage {
        site_name,
        error,
        locked,
    })
}

pub struct DashboardData<'a> {
    pub site_name: &'a str,
    pub message: Option<&'a str>,
    pub posts: Vec<Post>,
    pub cur_page: usize,
    pub settings: &'a SiteSettings,
    pub stats: StatsSummary,
    pub open_drafts: usize,
}

pub fn render_dashboard(template: &Template, data: DashboardData) -> String {
    let mut posts = data.posts;
    sort_posts(&mut posts);

    let paginator = Paginator::new(&posts, DASHBOARD_PAGE_SIZE);
    let cur_page = paginator.clamp_page(data.cur_page);
    let page_posts = paginator.get_page(cur_page).unwrap_or_default();

    let rows = page_posts.iter()
        .map(|post| ViewPostRow {
            id: post.id.as_ref().map(|id| id.0.clone()).unwrap_or_default(),
            title: post.title.clone(),
            slug: post.slug.clone(),
            date: format_date(&post.effective_date()),
            project_type: post.project_type.as_str(),
            pinned: post.pinned,
            block_count: post.content.len(),
        })
        .collect();

    let pages = (1..=paginator.page_count())
        .map(|number| ViewPageLink { number, current: number == cur_page })
        .collect();

    let toggles = SettingToggle::ALL.into_iter()
        .map(|toggle| ViewToggle {
            name: toggle.as_str(),
            label: toggle.label(),
            enabled: data.settings.get(toggle),
        })
        .collect();

    template.render(&DashboardPage {
        site_name: data.site_name,
        message: data.message,
        posts: rows,
        post_count: posts.len(),
        pages,
        show_pagination: paginator.page_count() > 1,
        toggles,
        analytics_enabled: data.settings.analytics_enabled,
        today: ViewDay::from(&data.stats.today),
        past_days: data.stats.past_days.iter().map(ViewDay::from).collect(),
        open_drafts: data.open_drafts,
    })
}
