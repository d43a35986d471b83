pub mod category;
pub mod filter;
pub mod selector;
pub mod velocity;

pub use category::{combined_search_query, Category, CategoryCatalog, QueryStrategy, GENERAL_CATEGORY};
pub use filter::{count_urls, FilterVerdict, QualityFilter, QualityFilterConfig, SpamPatterns};
pub use selector::{
    CategoryBatch, CategorySelector, CategoryStats, SelectionConfig, SelectionOutcome, MIXED_BATCH,
};
pub use velocity::viral_velocity;
