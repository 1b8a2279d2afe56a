use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::post::{Category, Post, ProjectType};

/// Pinned posts first, then newest first by effective date.
pub fn compare_posts(a: &Post, b: &Post) -> Ordering {
    b.pinned.cmp(&a.pinned)
        .then_with(|| b.effective_date().cmp(&a.effective_date()))
}

/// Stable sort, so posts with equal keys keep their incoming order.
pub fn sort_posts<P: Borrow<Post>>(posts: &mut [P]) {
    posts.sort_by(|a, b| compare_posts(a.borrow(), b.borrow()));
}

#[derive(Debug, Default)]
pub struct CategorySlices<'a> {
    pub development: Vec<&'a Post>,
    pub design: Vec<&'a Post>,
    pub uncategorized: Vec<&'a Post>,
}

impl<'a> CategorySlices<'a> {
    pub fn get(&self, category: Option<Category>) -> &[&'a Post] {
        match category {
            Some(Category::Development) => &self.development,
            Some(Category::Design) => &self.design,
            None => &self.uncategorized,
        }
    }

    pub fn len(&self) -> usize {
        self.development.len() + self.design.len() + self.uncategorized.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sort(&mut self) {
        sort_posts(&mut self.development);
        sort_posts(&mut self.design);
        sort_posts(&mut self.uncategorized);
    }
}

#[derive(Debug, Default)]
pub struct PostGroups<'a> {
    pub personal: CategorySlices<'a>,
    pub professional: CategorySlices<'a>,
}

impl<'a> PostGroups<'a> {
    pub fn get(&self, project_type: ProjectType) -> &CategorySlices<'a> {
        match project_type {
            ProjectType::Personal => &self.personal,
            ProjectType::Professional => &self.professional,
        }
    }
}

fn dedup_key(post: &Post) -> &str {
    match post.id {
        Some(ref id) => id.0.as_str(),
        None => post.slug.as_str(),
    }
}

fn push_once<'a>(slice: &mut Vec<&'a Post>, seen: &mut HashSet<(ProjectType, Option<Category>, &'a str)>,
                 project_type: ProjectType, category: Option<Category>, post: &'a Post) {
    if seen.insert((project_type, category, dedup_key(post))) {
        slice.push(post);
    }
}

/// Splits posts by project type and then by category.
///
/// A post carrying both categories is listed once in each of the two slices.
/// Posts without categories go to the uncategorized slice.
pub fn group_posts(posts: &[Post]) -> PostGroups<'_> {
    let mut groups = PostGroups::default();
    let mut seen = HashSet::new();

    for post in posts {
        let slices = match post.project_type {
            ProjectType::Personal => &mut groups.personal,
            ProjectType::Professional => &mut groups.professional,
        };

        if post.category.is_uncategorized() {
            push_once(&mut slices.uncategorized, &mut seen, post.project_type, None, post);
            continue;
        }

        for category in post.category.iter() {
            let slice = match category {
                Category::Development => &mut slices.development,
                Category::Design => &mut slices.design,
            };
            push_once(slice, &mut seen, post.project_type, Some(category), post);
        }
    }

    groups.personal.sort();
    groups.professional.sort();
    groups
}
