//! Null-safe field extraction over a rendered page

use crate::driver::RenderedPage;
use crate::extract::record::Record;
use crate::extract::rules::{apply_transforms, ExtractionRule};
use scraper::{Html, Selector};
use thiserror::Error;

/// Errors that can occur during extraction. A selector that does not parse
/// is a configuration mistake; a selector that matches nothing is not.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    #[error("Invalid CSS selector `{0}`")]
    InvalidSelector(String),
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|_| ExtractError::InvalidSelector(selector.to_string()))
}

/// Extracts one record per `container` match, applying every rule to the
/// match's subtree.
///
/// A rule whose target element or attribute is absent resolves to the
/// rule's default value; extraction never fails on a data gap. Zero
/// container matches yields an empty vector; distinguishing a broken
/// selector from a legitimately empty page is the caller's concern.
pub fn extract(
    page: &RenderedPage,
    container: &str,
    rules: &[ExtractionRule],
) -> Result<Vec<Record>, ExtractError> {
    let container_selector = parse_selector(container)?;

    // Parse rule selectors up front so a config typo surfaces once, not
    // once per container.
    let mut rule_selectors = Vec::with_capacity(rules.len());
    for rule in rules {
        rule_selectors.push(parse_selector(&rule.selector)?);
    }

    let document = Html::parse_document(page.raw_content());
    let mut records = Vec::new();

    for element in document.select(&container_selector) {
        let mut record = Record::new();

        for (rule, selector) in rules.iter().zip(&rule_selectors) {
            let raw = element
                .select(selector)
                .next()
                .and_then(|target| match &rule.attribute {
                    Some(attribute) => target.value().attr(attribute).map(str::to_string),
                    None => Some(target.text().collect::<String>()),
                });

            let value = match raw {
                Some(retrieved) => Some(apply_transforms(&rule.transforms, retrieved, page.url())),
                None => rule.default_value.clone(),
            };

            record.insert(rule.field.clone(), value);
        }

        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::rules::Transform;
    use url::Url;

    fn page(html: &str) -> RenderedPage {
        RenderedPage::new(Url::parse("https://example.com/list/").unwrap(), html.to_string())
    }

    fn card_rules() -> Vec<ExtractionRule> {
        vec![
            ExtractionRule::text("title", ".title"),
            ExtractionRule::attr("link", "a.item", "href")
                .with_transforms(vec![Transform::ResolveUrl]),
            ExtractionRule::text("price", ".price").with_default("unpriced"),
        ]
    }

    const TWO_CARDS: &str = r#"
        <html><body>
            <div class="card">
                <span class="title"> Widget </span>
                <a class="item" href="/items/widget">go</a>
                <span class="price">$5</span>
            </div>
            <div class="card">
                <span class="title">Gadget</span>
                <a class="item" href="/items/gadget">go</a>
            </div>
        </body></html>
    "#;

    #[test]
    fn test_extracts_one_record_per_container() {
        let records = extract(&page(TWO_CARDS), "div.card", &card_rules()).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_text_value_trimmed_and_attr_resolved() {
        let records = extract(&page(TWO_CARDS), "div.card", &card_rules()).unwrap();
        assert_eq!(records[0].get("title"), Some("Widget"));
        assert_eq!(records[0].get("link"), Some("https://example.com/items/widget"));
    }

    #[test]
    fn test_missing_field_uses_declared_default() {
        let records = extract(&page(TWO_CARDS), "div.card", &card_rules()).unwrap();
        assert_eq!(records[0].get("price"), Some("$5"));
        assert_eq!(records[1].get("price"), Some("unpriced"));
    }

    #[test]
    fn test_missing_field_without_default_is_null() {
        let rules = vec![ExtractionRule::text("absent", ".nope")];
        let records = extract(&page(TWO_CARDS), "div.card", &rules).unwrap();
        assert_eq!(records[0].get("absent"), None);
        // The field is still present in the record, as an explicit null
        assert_eq!(records[0].len(), 1);
    }

    #[test]
    fn test_missing_attribute_uses_default() {
        let html = r#"<div class="card"><a class="item">no href</a></div>"#;
        let rules = vec![ExtractionRule::attr("link", "a.item", "href").with_default("none")];
        let records = extract(&page(html), "div.card", &rules).unwrap();
        assert_eq!(records[0].get("link"), Some("none"));
    }

    #[test]
    fn test_zero_container_matches_is_empty_not_error() {
        let records = extract(&page(TWO_CARDS), "div.missing", &card_rules()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_invalid_container_selector_is_error() {
        let result = extract(&page(TWO_CARDS), "div[", &card_rules());
        assert!(matches!(result, Err(ExtractError::InvalidSelector(_))));
    }

    #[test]
    fn test_invalid_rule_selector_is_error() {
        let rules = vec![ExtractionRule::text("broken", "p[")];
        let result = extract(&page(TWO_CARDS), "div.card", &rules);
        assert!(matches!(result, Err(ExtractError::InvalidSelector(_))));
    }

    #[test]
    fn test_values_are_never_coerced() {
        let records = extract(&page(TWO_CARDS), "div.card", &card_rules()).unwrap();
        // Prices stay strings even when they look numeric
        assert_eq!(records[0].get("price"), Some("$5"));
    }
}
