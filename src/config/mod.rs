//! Crawl run configuration
//!
//! Built through a typestate builder so a run cannot start without a base
//! URL and a goal.

pub mod builder;
pub mod getters;
pub mod types;

pub use builder::{CrawlConfigBuilder, WithBaseUrl, WithGoal};
pub use types::{CrawlConfig, Limits};
