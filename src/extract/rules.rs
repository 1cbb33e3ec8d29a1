//! Extraction rules and value transforms

use serde::Deserialize;
use url::Url;

/// One field extraction rule, applied within a container element's subtree.
///
/// A rule resolves to its `default` when the target element or attribute is
/// absent; a missing optional field is a data gap, never an error.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionRule {
    /// Output field name
    pub field: String,

    /// CSS selector resolved within each container element
    pub selector: String,

    /// Attribute to read; text content when absent
    #[serde(default)]
    pub attribute: Option<String>,

    /// Transforms applied after retrieval, before default substitution
    #[serde(default)]
    pub transforms: Vec<Transform>,

    /// Value used when the target element or attribute is absent
    #[serde(rename = "default", default)]
    pub default_value: Option<String>,
}

impl ExtractionRule {
    /// Rule reading an element's text content.
    pub fn text(field: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            selector: selector.into(),
            attribute: None,
            transforms: vec![Transform::Trim],
            default_value: None,
        }
    }

    /// Rule reading an element attribute.
    pub fn attr(
        field: impl Into<String>,
        selector: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            selector: selector.into(),
            attribute: Some(attribute.into()),
            transforms: Vec::new(),
            default_value: None,
        }
    }

    pub fn with_transforms(mut self, transforms: Vec<Transform>) -> Self {
        self.transforms = transforms;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default_value = Some(default.into());
        self
    }
}

/// A post-retrieval value transform. All transforms map string to string;
/// numeric interpretation is the caller's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transform {
    /// Trim leading and trailing whitespace
    Trim,
    /// Remove embedded newlines and carriage returns
    StripNewlines,
    /// Resolve a relative URL against the page URL
    ResolveUrl,
    /// Lowercase the value
    Lowercase,
}

impl Transform {
    /// Applies this transform to a retrieved value. `base` is the URL of
    /// the page the value came from.
    pub fn apply(&self, value: String, base: &Url) -> String {
        match self {
            Self::Trim => value.trim().to_string(),
            Self::StripNewlines => value.replace(['\n', '\r'], ""),
            Self::ResolveUrl => match base.join(value.trim()) {
                Ok(resolved) => resolved.to_string(),
                // An unresolvable href is kept verbatim rather than dropped
                Err(_) => value,
            },
            Self::Lowercase => value.to_lowercase(),
        }
    }
}

/// Applies a rule's transform chain in declaration order.
pub fn apply_transforms(transforms: &[Transform], mut value: String, base: &Url) -> String {
    for transform in transforms {
        value = transform.apply(value, base);
    }
    value
}
