//! Arbor-Sweep: a taxonomy-walking site scraper
//!
//! This crate implements a hierarchical site crawler: starting from a root
//! category listing it discovers subcategories, walks paginated item
//! listings, extracts structured fields from item detail pages, and mirrors
//! the site's taxonomy onto an output directory tree.

pub mod config;
pub mod crawl;
pub mod driver;
pub mod extract;
pub mod output;

use thiserror::Error;

/// Main error type for arbor-sweep operations
#[derive(Debug, Error)]
pub enum ArborError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Driver error: {0}")]
    Driver(#[from] driver::DriverError),

    #[error("{0}")]
    Navigation(#[from] crawl::NavigationError),

    #[error("{0}")]
    Pagination(#[from] crawl::PaginationError),

    #[error("Extraction error: {0}")]
    Extract(#[from] extract::ExtractError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Setup error: {0}")]
    Setup(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector in config: {0}")]
    InvalidSelector(String),
}

/// Result type alias for arbor-sweep operations
pub type Result<T> = std::result::Result<T, ArborError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawl::{Coordinator, CrawlNode, CrawlReport, NodeKind, RetryPolicy, RunOptions};
pub use extract::{ExtractionRule, Record, Transform};
pub use output::{sanitize_segment, OutputWriter};
