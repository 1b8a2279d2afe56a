use std::io;
use std::io::ErrorKind;
use std::path::Path;

use ramhorns::Template;

use crate::post::{Post, TechnologyEntry};
use crate::text_utils::format_date;

pub mod dashboard_renderer;
pub mod editor_renderer;
pub mod page_renderer;
pub mod rss_renderer;

pub fn read_template(tpl_dir: &Path, file_name: &str) -> io::Result<String> {
    let full_path = tpl_dir.join(file_name);
    std::fs::read_to_string(&full_path)
        .map_err(|e| io::Error::new(e.kind(), format!("Error loading template {}: {}", full_path.display(), e)))
}

pub fn parse_template(src: String, name: &str) -> io::Result<Template<'static>> {
    Template::new(src)
        .map_err(|e| io::Error::new(ErrorKind::InvalidInput, format!("Error parsing {} template: {}", name, e)))
}

pub fn load_template(tpl_dir: &Path, file_name: &str) -> io::Result<Template<'static>> {
    parse_template(read_template(tpl_dir, file_name)?, file_name)
}

/// Every page template, parsed once at startup.
pub struct Templates {
    pub index: Template<'static>,
    pub projects: Template<'static>,
    pub post: Template<'static>,
    pub about: Template<'static>,
    pub login: Template<'static>,
    pub dashboard: Template<'static>,
    pub editor: Template<'static>,
}

impl Templates {
    pub fn load(tpl_dir: &Path) -> io::Result<Self> {
        Ok(Templates {
            index: load_template(tpl_dir, "index.tpl")?,
            projects: load_template(tpl_dir, "projects.tpl")?,
            post: load_template(tpl_dir, "post.tpl")?,
            about: load_template(tpl_dir, "about.tpl")?,
            login: load_template(tpl_dir, "login.tpl")?,
            dashboard: load_template(tpl_dir, "dashboard.tpl")?,
            editor: load_template(tpl_dir, "editor.tpl")?,
        })
    }
}

#[derive(ramhorns::Content)]
pub struct ViewTag {
    pub tag: String,
}

#[derive(ramhorns::Content)]
pub struct ViewTechnology {
    pub name: String,
    pub logo: String,
    pub dark_logo: Option<String>,
    pub link: Option<String>,
}

impl ViewTechnology {
    fn from(tech: &TechnologyEntry) -> Self {
        ViewTechnology {
            name: tech.name.clone(),
            logo: tech.logo.clone(),
            dark_logo: tech.dark_logo.clone(),
            link: tech.link.clone(),
        }
    }
}

/// A post as shown in listings.
#[derive(ramhorns::Content)]
pub struct ViewPostCard {
    pub title: String,
    pub description: String,
    pub link: String,
    pub date: String,
    pub pinned: bool,
    pub image: Option<String>,
    pub logo: Option<String>,
    pub tags: Vec<ViewTag>,
    pub technologies: Vec<ViewTechnology>,
}

impl ViewPostCard {
    pub fn from(post: &Post) -> Self {
        ViewPostCard {
            title: post.title.clone(),
            description: post.description.clone(),
            link: format!("/projects/{}", post.slug),
            date: format_date(&post.effective_date()),
            pinned: post.pinned,
            image: post.media.image.clone(),
            logo: post.media.logo.clone(),
            tags: view_tags(post),
            technologies: post.technologies.iter().map(ViewTechnology::from).collect(),
        }
    }
}

pub fn view_tags(post: &Post) -> Vec<ViewTag> {
    post.tags.iter().map(|t| ViewTag { tag: t.clone() }).collect()
}

#[derive(ramhorns::Content)]
pub struct ViewOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl ViewOption {
    pub fn new(value: &str, label: &str, selected: bool) -> Self {
        ViewOption {
            value: value.to_string(),
            label: label.to_string(),
            selected,
        }
    }
}
