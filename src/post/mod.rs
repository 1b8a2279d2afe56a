use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

use crate::blocks::{BlockKind, ContentBlock};

pub mod grouping;
pub mod slug;
pub mod validation;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub String);

impl PostId {
    pub fn generate() -> Self {
        PostId(Uuid::new_v4().to_string())
    }
}

impl Display for PostId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Development,
    Design,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Development, Category::Design];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Development => "development",
            Category::Design => "design",
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "development" => Ok(Category::Development),
            "design" => Ok(Category::Design),
            x => Err(format!("unknown category '{}'", x)),
        }
    }
}

/// Categories of a post. Empty means uncategorized.
///
/// Serialized as an array. Also reads the older comma-joined form
/// (`"development,design"`) and `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorySet(BTreeSet<Category>);

impl CategorySet {
    pub fn new() -> Self {
        CategorySet(BTreeSet::new())
    }

    pub fn parse_legacy(buf: &str) -> Result<Self, String> {
        let mut set = CategorySet::new();
        for part in buf.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            set.insert(part.parse()?);
        }
        Ok(set)
    }

    pub fn insert(&mut self, category: Category) -> bool {
        self.0.insert(category)
    }

    pub fn contains(&self, category: Category) -> bool {
        self.0.contains(&category)
    }

    pub fn is_uncategorized(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Category> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Category> for CategorySet {
    fn from_iter<T: IntoIterator<Item = Category>>(iter: T) -> Self {
        CategorySet(iter.into_iter().collect())
    }
}

impl Serialize for CategorySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CategorySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(CategorySet::new()),
            Value::String(legacy) => CategorySet::parse_legacy(&legacy).map_err(D::Error::custom),
            Value::Array(values) => {
                let mut set = CategorySet::new();
                for value in values {
                    match value {
                        Value::String(s) => set.insert(s.parse().map_err(D::Error::custom)?),
                        other => return Err(D::Error::custom(format!("invalid category {}", other))),
                    };
                }
                Ok(set)
            }
            other => Err(D::Error::custom(format!("invalid category {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    #[default]
    Personal,
    Professional,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Personal => "personal",
            ProjectType::Professional => "professional",
        }
    }
}

impl FromStr for ProjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "personal" => Ok(ProjectType::Personal),
            "professional" => Ok(ProjectType::Professional),
            x => Err(format!("unknown project type '{}'", x)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnologyEntry {
    pub name: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dark_logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostMedia {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PostId>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub slug: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub category: CategorySet,
    #[serde(default)]
    pub project_type: ProjectType,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub media: PostMedia,
    #[serde(default)]
    pub links: PostLinks,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub technologies: Vec<TechnologyEntry>,
}

impl Post {
    /// Publish date, else creation date, else the epoch.
    pub fn effective_date(&self) -> DateTime<Utc> {
        self.published_at
            .or(self.created_at)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Every media url the post points at, blocks included.
    pub fn referenced_urls(&self) -> HashSet<&str> {
        let mut urls: HashSet<&str> = HashSet::new();
        let media = [&self.media.image, &self.media.video, &self.media.logo];
        urls.extend(media.into_iter().flatten().map(|s| s.as_str()));

        for tech in self.technologies.iter() {
            urls.insert(tech.logo.as_str());
            if let Some(ref dark) = tech.dark_logo {
                urls.insert(dark.as_str());
            }
        }

        for block in self.content.iter() {
            match &block.kind {
                BlockKind::Image(media) | BlockKind::Video(media) => {
                    urls.insert(media.url.as_str());
                }
                _ => {}
            }
        }

        urls.remove("");
        urls
    }
}

impl Display for Post {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let id = self.id.as_ref().map(|id| id.0.as_str()).unwrap_or("<new>");
        write!(f, "id={}, slug={}, type={}, pinned={}, blocks={}\ntitle={}",
               id,
               self.slug,
               self.project_type.as_str(),
               self.pinned,
               self.content.len(),
               self.title
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use crate::test_data::POST_JSON;

    use super::*;

    #[test]
    fn test_parse_document() {
        let post: Post = serde_json::from_str(POST_JSON).unwrap();
        assert_eq!(post.id, Some(PostId("0b9f2a9e-3d5c-4a43-9d0c-7c3f6f1f2a11".to_string())));
        assert_eq!(post.slug, "block-editor-in-rust");
        assert_eq!(post.project_type, ProjectType::Professional);
        assert!(post.category.contains(Category::Development));
        assert!(post.category.contains(Category::Design));
        assert_eq!(post.content.len(), 9);
        assert_eq!(post.technologies[0].dark_logo.as_deref(), Some("/media/rust-dark.svg"));
        assert_eq!(post.content[8].type_name(), "quote");
    }

    #[test]
    fn test_category_forms() {
        let from_legacy: CategorySet = serde_json::from_value(json!("design,development")).unwrap();
        let from_array: CategorySet = serde_json::from_value(json!(["development", "design"])).unwrap();
        assert_eq!(from_legacy, from_array);
        assert_eq!(serde_json::to_value(&from_legacy).unwrap(), json!(["development", "design"]));

        let single: CategorySet = serde_json::from_value(json!("design")).unwrap();
        assert!(single.contains(Category::Design));
        assert!(!single.contains(Category::Development));

        let none: CategorySet = serde_json::from_value(json!(null)).unwrap();
        assert!(none.is_uncategorized());
        let empty: CategorySet = serde_json::from_value(json!("")).unwrap();
        assert!(empty.is_uncategorized());

        assert!(serde_json::from_value::<CategorySet>(json!("marketing")).is_err());
        assert!(serde_json::from_value::<CategorySet>(json!(3)).is_err());
    }

    #[test]
    fn test_missing_category_is_uncategorized() {
        let post: Post = serde_json::from_value(json!({"title": "t", "slug": "t"})).unwrap();
        assert!(post.category.is_uncategorized());
        assert_eq!(post.project_type, ProjectType::Personal);
        assert!(post.content.is_empty());
    }

    #[test]
    fn test_effective_date() {
        let created = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let published = Utc.with_ymd_and_hms(2023, 2, 1, 0, 0, 0).unwrap();
        let mut post = Post::default();
        assert_eq!(post.effective_date(), DateTime::<Utc>::UNIX_EPOCH);
        post.created_at = Some(created);
        assert_eq!(post.effective_date(), created);
        post.published_at = Some(published);
        assert_eq!(post.effective_date(), published);
    }

    #[test]
    fn test_referenced_urls() {
        let post: Post = serde_json::from_str(POST_JSON).unwrap();
        let urls = post.referenced_urls();
        assert!(urls.contains("/media/cover.png"));
        assert!(urls.contains("/media/diagram.png"));
        assert!(urls.contains("/media/rust.svg"));
        assert!(urls.contains("/media/rust-dark.svg"));
        assert!(!urls.contains(""));
    }
}
