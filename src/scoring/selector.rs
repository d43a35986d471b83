use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::scoring::{CategoryCatalog, QualityFilter};
use crate::Post;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub top_per_category: usize,
    pub global_top: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            top_per_category: 1,
            global_top: 3,
        }
    }
}

pub const MIXED_BATCH: &str = "mixed";

/// Posts fetched for one category, in fetch order. A mixed batch carries
/// posts from a query spanning several categories.
#[derive(Debug, Clone)]
pub struct CategoryBatch {
    pub category: String,
    pub posts: Vec<Post>,
    pub mixed: bool,
}

impl CategoryBatch {
    pub fn new(category: impl Into<String>, posts: Vec<Post>) -> Self {
        Self {
            category: category.into(),
            posts,
            mixed: false,
        }
    }

    pub fn empty(category: impl Into<String>) -> Self {
        Self::new(category, Vec::new())
    }

    pub fn mixed(posts: Vec<Post>) -> Self {
        Self {
            mixed: true,
            ..Self::new(MIXED_BATCH, posts)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub category: String,
    pub fetched: usize,
    pub passed: usize,
    pub selected: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    Selected(Vec<Post>),
    NoQualifyingPosts,
}

impl SelectionOutcome {
    pub fn posts(&self) -> &[Post] {
        match self {
            SelectionOutcome::Selected(posts) => posts,
            SelectionOutcome::NoQualifyingPosts => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, SelectionOutcome::NoQualifyingPosts)
    }
}

#[derive(Debug, Clone)]
pub struct CategorySelector {
    filter: QualityFilter,
    config: SelectionConfig,
    catalog: CategoryCatalog,
}

impl CategorySelector {
    pub fn new(filter: QualityFilter, config: SelectionConfig) -> Self {
        Self {
            filter,
            config,
            catalog: CategoryCatalog::default(),
        }
    }

    /// Catalog used to place untagged posts from mixed batches. Without one
    /// they all land in the general category.
    pub fn with_catalog(mut self, catalog: CategoryCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn select(&self, batches: Vec<CategoryBatch>) -> SelectionOutcome {
        self.select_with_stats(batches).0
    }

    pub fn select_with_stats(&self, batches: Vec<CategoryBatch>) -> (SelectionOutcome, Vec<CategoryStats>) {
        let batches = self.regroup(batches);
        let mut merged = Vec::new();
        let mut stats = Vec::with_capacity(batches.len());

        for batch in batches {
            let fetched = batch.posts.len();
            let mut survivors = self.filter.apply(batch.posts);
            let passed = survivors.len();

            sort_by_engagement(&mut survivors);

            let mut selected = 0usize;
            for mut post in survivors {
                if selected >= self.config.top_per_category {
                    break;
                }
                if let Err(conflict) = post.assign_category(&batch.category) {
                    tracing::warn!(
                        post_id = %post.id,
                        existing = %conflict.existing,
                        batch = %conflict.requested,
                        "post category disagrees with its batch, skipping"
                    );
                    continue;
                }
                merged.push(post);
                selected += 1;
            }

            tracing::debug!(category = %batch.category, fetched, passed, selected, "category ranked");
            stats.push(CategoryStats {
                category: batch.category,
                fetched,
                passed,
                selected,
            });
        }

        sort_by_engagement(&mut merged);

        let mut seen = HashSet::new();
        let ranked: Vec<Post> = merged
            .into_iter()
            .filter(|post| seen.insert(post.id.clone()))
            .take(self.config.global_top)
            .collect();

        let outcome = if ranked.is_empty() {
            SelectionOutcome::NoQualifyingPosts
        } else {
            SelectionOutcome::Selected(ranked)
        };
        (outcome, stats)
    }
}

impl CategorySelector {
    /// Splits mixed batches by category. A post already tagged keeps its tag;
    /// otherwise the catalog infers one from the text. Groups join a fetched
    /// batch of the same name or are appended in first-seen order.
    fn regroup(&self, batches: Vec<CategoryBatch>) -> Vec<CategoryBatch> {
        let mut grouped: Vec<CategoryBatch> = Vec::with_capacity(batches.len());
        let mut mixed = Vec::new();
        for batch in batches {
            if batch.mixed {
                mixed.extend(batch.posts);
            } else {
                grouped.push(batch);
            }
        }

        for post in mixed {
            let category = match post.category() {
                Some(tagged) => tagged.to_string(),
                None => self.catalog.detect(&post.text).to_string(),
            };
            tracing::trace!(post_id = %post.id, %category, "placed post from mixed batch");
            match grouped.iter_mut().find(|batch| batch.category == category) {
                Some(batch) => batch.posts.push(post),
                None => grouped.push(CategoryBatch::new(category, vec![post])),
            }
        }
        grouped
    }
}

/// Descending by engagement score. `sort_by` is stable, so ties keep input order.
fn sort_by_engagement(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.engagement_score().cmp(&a.engagement_score()));
}
