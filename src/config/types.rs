use crate::extract::ExtractionRule;
use chrono::Datelike;
use serde::Deserialize;

/// Main configuration structure for Arbor-Sweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    pub output: OutputConfig,
    pub site: SiteConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// User agent string sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Per-navigation timeout (milliseconds)
    #[serde(rename = "navigation-timeout-ms", default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// Number of concurrent detail-page fetches (1 = fully sequential)
    #[serde(rename = "detail-workers", default = "default_detail_workers")]
    pub detail_workers: usize,

    /// Delay after each detail-page fetch (milliseconds)
    #[serde(rename = "detail-delay-ms", default = "default_detail_delay_ms")]
    pub detail_delay_ms: u64,

    /// Optional whole-run timeout (seconds); the run stops pulling new
    /// nodes once it elapses
    #[serde(rename = "run-timeout-secs", default)]
    pub run_timeout_secs: Option<u64>,
}

/// Navigation retry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts per page load
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between failed attempts (milliseconds)
    #[serde(rename = "backoff-ms", default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// HTTP statuses that are never retried (empty = every status >= 400
    /// is retried up to the attempt limit)
    #[serde(rename = "terminal-statuses", default)]
    pub terminal_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            terminal_statuses: Vec::new(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory the taxonomy is mirrored into
    pub root: String,
}

/// Site-specific crawl surface: where the taxonomy lives and how listings
/// and detail pages are shaped. All selectors are configuration data; the
/// engine never hard-codes any.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Root category listing page
    #[serde(rename = "root-url")]
    pub root_url: String,

    pub taxonomy: TaxonomyConfig,
    pub listing: ListingConfig,
    pub detail: DetailConfig,

    /// Optional flat per-year archive listings
    #[serde(default)]
    pub archive: Option<ArchiveConfig>,
}

/// Selectors for discovering the category tree on the root page
#[derive(Debug, Clone, Deserialize)]
pub struct TaxonomyConfig {
    /// One match per top-level category block
    #[serde(rename = "category-container")]
    pub category_container: String,

    /// Category title link within a category block
    #[serde(rename = "category-link")]
    pub category_link: String,

    /// Subcategory links within a category block
    #[serde(rename = "subcategory-link")]
    pub subcategory_link: String,
}

/// Shape of a paginated item listing
#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
    /// One match per item card
    pub container: String,

    /// Field extraction rules applied to each item card
    pub rules: Vec<ExtractionRule>,

    pub pagination: PaginationConfig,

    /// Rule field holding the detail-page URL for an item
    #[serde(rename = "item-link-field")]
    pub item_link_field: String,

    /// Rule field holding a stable item identity; derived from the detail
    /// URL when absent
    #[serde(rename = "item-id-field", default)]
    pub item_id_field: Option<String>,

    /// Warn when the container matches nothing on the first page
    #[serde(rename = "expect-items", default = "default_true")]
    pub expect_items: bool,
}

/// Shape of an item detail page
#[derive(Debug, Clone, Deserialize)]
pub struct DetailConfig {
    /// Scope for the detail rules, usually the article/product body
    pub container: String,

    /// Field extraction rules applied within the container
    pub rules: Vec<ExtractionRule>,
}

/// Which pagination mechanism a listing uses
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum PaginationConfig {
    /// Numeric `?start=N` style pagination
    Offset {
        /// Query parameter carrying the offset
        #[serde(default = "default_offset_param")]
        param: String,

        /// First offset value requested
        #[serde(rename = "start-offset", default = "default_start_offset")]
        start_offset: u64,

        /// Offset increment per page
        #[serde(rename = "page-size")]
        page_size: u64,

        /// Hard cap on pages visited per listing
        #[serde(rename = "max-steps", default = "default_max_steps")]
        max_steps: u32,
    },

    /// An in-page "load more" affordance clicked until it disappears
    LoadMore {
        /// Selector for the affordance
        selector: String,

        /// Hard cap on click attempts per listing
        #[serde(rename = "max-clicks", default = "default_max_clicks")]
        max_clicks: u32,

        /// Settle wait after each click (milliseconds)
        #[serde(rename = "settle-ms", default = "default_settle_ms")]
        settle_ms: u64,
    },
}

/// Flat per-year archive listings (`.../archives/{year}/` style URLs)
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveConfig {
    /// Output directory segment the year folders live under
    pub name: String,

    /// Listing URL template containing a `{year}` placeholder
    #[serde(rename = "url-template")]
    pub url_template: String,

    #[serde(rename = "start-year")]
    pub start_year: u16,

    /// Defaults to the last fully elapsed year
    #[serde(rename = "end-year", default)]
    pub end_year: Option<u16>,
}

impl ArchiveConfig {
    /// Years to visit, most recent last, honoring an optional filter.
    pub fn years(&self, filter: Option<u16>) -> Vec<u16> {
        let end = self.end_year.unwrap_or_else(last_elapsed_year);
        (self.start_year..=end)
            .filter(|year| filter.map_or(true, |wanted| wanted == *year))
            .collect()
    }

    /// Listing URL for one year.
    pub fn url_for(&self, year: u16) -> String {
        self.url_template.replace("{year}", &year.to_string())
    }
}

fn last_elapsed_year() -> u16 {
    (chrono::Utc::now().year() - 1) as u16
}

fn default_user_agent() -> String {
    "arbor-sweep/1.0".to_string()
}

fn default_navigation_timeout_ms() -> u64 {
    30_000
}

fn default_detail_workers() -> usize {
    3
}

fn default_detail_delay_ms() -> u64 {
    1_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    5_000
}

fn default_offset_param() -> String {
    "start".to_string()
}

fn default_start_offset() -> u64 {
    1
}

fn default_max_steps() -> u32 {
    50
}

fn default_max_clicks() -> u32 {
    50
}

fn default_settle_ms() -> u64 {
    2_000
}

fn default_true() -> bool {
    true
}
