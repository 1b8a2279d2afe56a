use std::collections::HashSet;
use std::fmt;
use std::fmt::{Display, Formatter};

use crate::blocks::BlockId;
use crate::post::slug::is_valid_slug;
use crate::post::Post;

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    MissingTitle,
    MissingDescription,
    InvalidSlug(String),
    DuplicateBlockId(BlockId),
    MissingTechnologyName(usize),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingTitle => write!(f, "Title is required"),
            ValidationError::MissingDescription => write!(f, "Description is required"),
            ValidationError::InvalidSlug(slug) => write!(
                f,
                "Slug '{}' must use lowercase letters, digits and single hyphens",
                slug
            ),
            ValidationError::DuplicateBlockId(id) => write!(f, "Block id {} is used more than once", id),
            ValidationError::MissingTechnologyName(pos) => write!(f, "Technology #{} has no name", pos + 1),
        }
    }
}

/// Checks a post before it goes to the store. All problems are reported at once.
pub fn validate_post(post: &Post) -> Result<(), Vec<ValidationError>> {
    let mut errors = vec![];

    if post.title.trim().is_empty() {
        errors.push(ValidationError::MissingTitle);
    }
    if post.description.trim().is_empty() {
        errors.push(ValidationError::MissingDescription);
    }
    if !is_valid_slug(&post.slug) {
        errors.push(ValidationError::InvalidSlug(post.slug.clone()));
    }

    let mut seen: HashSet<&BlockId> = HashSet::new();
    for block in post.content.iter() {
        if !seen.insert(&block.id) {
            errors.push(ValidationError::DuplicateBlockId(block.id.clone()));
        }
    }

    for (pos, tech) in post.technologies.iter().enumerate() {
        if tech.name.trim().is_empty() {
            errors.push(ValidationError::MissingTechnologyName(pos));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use crate::blocks::{BlockKind, ContentBlock};
    use crate::post::TechnologyEntry;

    use super::*;

    fn valid_post() -> Post {
        Post {
            title: "Folio".to_string(),
            description: "A portfolio".to_string(),
            slug: "folio".to_string(),
            ..Post::default()
        }
    }

    #[test]
    fn test_valid_post() {
        assert_eq!(validate_post(&valid_post()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut post = valid_post();
        post.title = "  ".to_string();
        post.description = String::new();
        post.slug = "Not A Slug".to_string();
        post.content = vec![
            ContentBlock::new(BlockId("1".to_string()), BlockKind::Separator),
            ContentBlock::new(BlockId("1".to_string()), BlockKind::Separator),
        ];
        post.technologies = vec![TechnologyEntry::default()];

        let errors = validate_post(&post).unwrap_err();
        assert_eq!(errors, vec![
            ValidationError::MissingTitle,
            ValidationError::MissingDescription,
            ValidationError::InvalidSlug("Not A Slug".to_string()),
            ValidationError::DuplicateBlockId(BlockId("1".to_string())),
            ValidationError::MissingTechnologyName(0),
        ]);
        assert_eq!(errors[4].to_string(), "Technology #1 has no name");
    }
}
