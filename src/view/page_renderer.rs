use std::io;
use std::io::ErrorKind;

use chrono::NaiveDate;
use markdown::Options;
use ramhorns::Template;

use crate::blocks::renderer::render_blocks;
use crate::config::Site;
use crate::post::grouping::{group_posts, sort_posts, CategorySlices};
use crate::post::{Category, Post, ProjectType};
use crate::text_utils::{format_date, years_since};
use crate::view::{view_tags, ViewPostCard, ViewTag, ViewTechnology};

#[derive(ramhorns::Content)]
struct SiteHeader<'a> {
    site_name: &'a str,
    tagline: &'a str,
    description: &'a str,
}

impl<'a> SiteHeader<'a> {
    fn from(site: &'a Site) -> Self {
        SiteHeader {
            site_name: &site.name,
            tagline: &site.tagline,
            description: &site.description,
        }
    }
}

#[derive(ramhorns::Content)]
struct IndexPage<'a> {
    #[ramhorns(flatten)]
    header: SiteHeader<'a>,
    years_active: i64,
    project_count: usize,
    featured: Vec<ViewPostCard>,
}

#[derive(ramhorns::Content)]
struct ViewSlice {
    label: &'static str,
    category: &'static str,
    posts: Vec<ViewPostCard>,
}

#[derive(ramhorns::Content)]
struct ViewGroup {
    label: &'static str,
    project_type: &'static str,
    slices: Vec<ViewSlice>,
}

#[derive(ramhorns::Content)]
struct ProjectsPage<'a> {
    #[ramhorns(flatten)]
    header: SiteHeader<'a>,
    groups: Vec<ViewGroup>,
    empty: bool,
}

#[derive(ramhorns::Content)]
struct PostPage<'a> {
    #[ramhorns(flatten)]
    header: SiteHeader<'a>,
    title: &'a str,
    post_description: &'a str,
    slug: &'a str,
    date: String,
    project_type: &'static str,
    tags: Vec<ViewTag>,
    categories: Vec<ViewTag>,
    technologies: Vec<ViewTechnology>,
    image: Option<&'a str>,
    video: Option<&'a str>,
    demo: Option<&'a str>,
    source: Option<&'a str>,
    body: &'a str,
}

#[derive(ramhorns::Content)]
struct AboutPage<'a> {
    #[ramhorns(flatten)]
    header: SiteHeader<'a>,
    body: &'a str,
}

/// Posts shown to visitors, personal projects only when enabled.
pub fn visible_posts(posts: Vec<Post>, show_personal: bool) -> Vec<Post> {
    posts.into_iter()
        .filter(|p| show_personal || p.project_type != ProjectType::Personal)
        .collect()
}

pub fn render_index(template: &Template, site: &Site, posts: &[Post], featured_count: usize, today: NaiveDate) -> String {
    let mut sorted: Vec<&Post> = posts.iter().collect();
    sort_posts(&mut sorted);

    template.render(&IndexPage {
        header: SiteHeader::from(site),
        years_active: years_since(site.started_on.0, today),
        project_count: posts.len(),
        featured: sorted.into_iter().take(featured_count).map(ViewPostCard::from).collect(),
    })
}

fn view_slices(slices: &CategorySlices) -> Vec<ViewSlice> {
    let named = [
        ("Development", "development", Some(Category::Development)),
        ("Design", "design", Some(Category::Design)),
        ("Other", "uncategorized", None),
    ];
    named.into_iter()
        .filter(|(_, _, category)| !slices.get(*category).is_empty())
        .map(|(label, category_name, category)| ViewSlice {
            label,
            category: category_name,
            posts: slices.get(category).iter().map(|p| ViewPostCard::from(p)).collect(),
        })
        .collect()
}

pub fn render_projects(template: &Template, site: &Site, posts: &[Post]) -> String {
    let groups = group_posts(posts);
    let named = [
        ("Professional work", ProjectType::Professional),
        ("Personal projects", ProjectType::Personal),
    ];

    let groups: Vec<ViewGroup> = named.into_iter()
        .filter(|(_, project_type)| !groups.get(*project_type).is_empty())
        .map(|(label, project_type)| ViewGroup {
            label,
            project_type: project_type.as_str(),
            slices: view_slices(groups.get(project_type)),
        })
        .collect();

    template.render(&ProjectsPage {
        header: SiteHeader::from(site),
        empty: groups.is_empty(),
        groups,
    })
}

/// Block content of a post as HTML. This is the part worth caching.
pub fn render_post_body(post: &Post) -> String {
    render_blocks(&post.content)
}

pub fn render_post(template: &Template, site: &Site, post: &Post, body: &str) -> String {
    let categories = post.category.iter()
        .map(|c| ViewTag { tag: c.as_str().to_string() })
        .collect();

    template.render(&PostPage {
        header: SiteHeader::from(site),
        title: &post.title,
        post_description: &post.description,
        slug: &post.slug,
        date: format_date(&post.effective_date()),
        project_type: post.project_type.as_str(),
        tags: view_tags(post),
        categories,
        technologies: post.technologies.iter().map(ViewTechnology::from).collect(),
        image: post.media.image.as_deref(),
        video: post.media.video.as_deref(),
        demo: post.links.demo.as_deref(),
        source: post.links.source.as_deref(),
        body,
    })
}

pub fn markdown_to_html(src: &str) -> io::Result<String> {
    markdown::to_html_with_options(src, &Options::gfm())
        .map_err(|e| io::Error::new(ErrorKind::InvalidData, format!("Error rendering markdown: {}", e)))
}

pub fn render_about(template: &Template, site: &Site, about_md: &str) -> io::Result<String> {
    let body = markdown_to_html(about_md)?;
    Ok(template.render(&AboutPage {
        header: SiteHeader::from(site),
        body: &body,
    }))
}

pub fn render_maintenance(site: &Site) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{}</title></head>\
         <body><h1>Back soon</h1><p>The site is under maintenance.</p></body></html>",
        crate::text_utils::html_escape(&site.name)
    )
}
