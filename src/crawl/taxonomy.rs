//! Root-page taxonomy discovery
//!
//! The root listing page is scraped once for the category tree: one
//! container match per category, a title link inside it, and zero or more
//! subcategory links. The resulting structure is written verbatim to
//! `category.json` before any listing is visited.

use crate::config::TaxonomyConfig;
use crate::driver::RenderedPage;
use crate::extract::ExtractError;
use scraper::Html;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subcategory {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub url: String,
    pub subcategories: Vec<Subcategory>,
}

/// Extracts the category/subcategory tree from the root listing page.
/// Relative links are resolved against the page URL.
pub fn discover_taxonomy(
    page: &RenderedPage,
    config: &TaxonomyConfig,
) -> Result<Vec<Category>, ExtractError> {
    let container = crate::extract::parse_selector(&config.category_container)?;
    let link = crate::extract::parse_selector(&config.category_link)?;
    let sub_link = crate::extract::parse_selector(&config.subcategory_link)?;

    let document = Html::parse_document(page.raw_content());
    let mut categories = Vec::new();

    for element in document.select(&container) {
        let anchor = element.select(&link).next();
        let name = anchor
            .map(|a| a.text().collect::<String>().trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());
        let url = anchor
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| page.url().join(href).ok())
            .map(|u| u.to_string())
            .unwrap_or_default();

        let mut subcategories = Vec::new();
        for sub in element.select(&sub_link) {
            let sub_name = sub.text().collect::<String>().trim().to_string();
            let Some(sub_url) = sub
                .value()
                .attr("href")
                .and_then(|href| page.url().join(href).ok())
            else {
                continue;
            };
            if sub_name.is_empty() {
                continue;
            }
            subcategories.push(Subcategory {
                name: sub_name,
                url: sub_url.to_string(),
            });
        }

        categories.push(Category {
            name,
            url,
            subcategories,
        });
    }

    Ok(categories)
}
