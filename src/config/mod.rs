//! Configuration module for Arbor-Sweep
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. The site surface (taxonomy selectors, listing/detail rules,
//! pagination strategy) is pure configuration data; the crawl engine never
//! hard-codes a selector.

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ArchiveConfig, Config, CrawlerConfig, DetailConfig, ListingConfig, OutputConfig,
    PaginationConfig, RetryConfig, SiteConfig, TaxonomyConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
