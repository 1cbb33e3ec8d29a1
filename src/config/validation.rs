use crate::config::types::{
    ArchiveConfig, Config, CrawlerConfig, DetailConfig, ListingConfig, PaginationConfig,
    RetryConfig, SiteConfig, TaxonomyConfig,
};
use crate::extract::ExtractionRule;
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_retry_config(&config.retry)?;
    validate_output_root(&config.output.root)?;
    validate_site_config(&config.site)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.navigation_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "navigation-timeout-ms must be >= 100ms, got {}ms",
            config.navigation_timeout_ms
        )));
    }

    if config.detail_workers < 1 || config.detail_workers > 16 {
        return Err(ConfigError::Validation(format!(
            "detail-workers must be between 1 and 16, got {}",
            config.detail_workers
        )));
    }

    Ok(())
}

/// Validates retry configuration
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    for status in &config.terminal_statuses {
        if *status < 400 {
            return Err(ConfigError::Validation(format!(
                "terminal-statuses entries must be >= 400, got {}",
                status
            )));
        }
    }

    Ok(())
}

fn validate_output_root(root: &str) -> Result<(), ConfigError> {
    if root.is_empty() {
        return Err(ConfigError::Validation(
            "output root cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates the site surface: URLs parse, selectors parse, rule fields
/// are consistent
fn validate_site_config(site: &SiteConfig) -> Result<(), ConfigError> {
    validate_http_url(&site.root_url, "root-url")?;
    validate_taxonomy_config(&site.taxonomy)?;
    validate_listing_config(&site.listing)?;
    validate_detail_config(&site.detail)?;

    if let Some(archive) = &site.archive {
        validate_archive_config(archive)?;
    }

    Ok(())
}

fn validate_taxonomy_config(taxonomy: &TaxonomyConfig) -> Result<(), ConfigError> {
    validate_selector(&taxonomy.category_container)?;
    validate_selector(&taxonomy.category_link)?;
    validate_selector(&taxonomy.subcategory_link)?;
    Ok(())
}

fn validate_listing_config(listing: &ListingConfig) -> Result<(), ConfigError> {
    validate_selector(&listing.container)?;
    validate_rules(&listing.rules, "site.listing")?;

    let fields: HashSet<&str> = listing.rules.iter().map(|r| r.field.as_str()).collect();
    if !fields.contains(listing.item_link_field.as_str()) {
        return Err(ConfigError::Validation(format!(
            "item-link-field '{}' does not match any listing rule field",
            listing.item_link_field
        )));
    }
    if let Some(id_field) = &listing.item_id_field {
        if !fields.contains(id_field.as_str()) {
            return Err(ConfigError::Validation(format!(
                "item-id-field '{}' does not match any listing rule field",
                id_field
            )));
        }
    }

    match &listing.pagination {
        PaginationConfig::Offset {
            param,
            page_size,
            max_steps,
            ..
        } => {
            if param.is_empty() {
                return Err(ConfigError::Validation(
                    "pagination param cannot be empty".to_string(),
                ));
            }
            if *page_size < 1 {
                return Err(ConfigError::Validation(format!(
                    "page-size must be >= 1, got {}",
                    page_size
                )));
            }
            if *max_steps < 1 {
                return Err(ConfigError::Validation(format!(
                    "max-steps must be >= 1, got {}",
                    max_steps
                )));
            }
        }
        PaginationConfig::LoadMore {
            selector,
            max_clicks,
            ..
        } => {
            validate_selector(selector)?;
            if *max_clicks < 1 {
                return Err(ConfigError::Validation(format!(
                    "max-clicks must be >= 1, got {}",
                    max_clicks
                )));
            }
        }
    }

    Ok(())
}

fn validate_detail_config(detail: &DetailConfig) -> Result<(), ConfigError> {
    validate_selector(&detail.container)?;
    validate_rules(&detail.rules, "site.detail")?;
    Ok(())
}

fn validate_archive_config(archive: &ArchiveConfig) -> Result<(), ConfigError> {
    if archive.name.is_empty() {
        return Err(ConfigError::Validation(
            "archive name cannot be empty".to_string(),
        ));
    }

    if !archive.url_template.contains("{year}") {
        return Err(ConfigError::Validation(format!(
            "archive url-template '{}' must contain a {{year}} placeholder",
            archive.url_template
        )));
    }
    validate_http_url(&archive.url_for(archive.start_year), "archive url-template")?;

    if let Some(end) = archive.end_year {
        if end < archive.start_year {
            return Err(ConfigError::Validation(format!(
                "archive end-year {} is before start-year {}",
                end, archive.start_year
            )));
        }
    }

    Ok(())
}

/// Validates a rule set: every selector parses, no duplicate field names
fn validate_rules(rules: &[ExtractionRule], context: &str) -> Result<(), ConfigError> {
    if rules.is_empty() {
        return Err(ConfigError::Validation(format!(
            "{} must declare at least one rule",
            context
        )));
    }

    let mut seen = HashSet::new();
    for rule in rules {
        if rule.field.is_empty() {
            return Err(ConfigError::Validation(format!(
                "{} has a rule with an empty field name",
                context
            )));
        }
        if !seen.insert(rule.field.as_str()) {
            return Err(ConfigError::Validation(format!(
                "{} declares field '{}' more than once",
                context, rule.field
            )));
        }
        validate_selector(&rule.selector)?;
    }

    Ok(())
}

fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|_| ConfigError::InvalidSelector(selector.to_string()))
}

fn validate_http_url(url: &str, context: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", context, e)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            context,
            parsed.scheme()
        )));
    }

    Ok(())
}
