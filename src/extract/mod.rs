//! Extraction engine: rules, transforms, and null-safe record extraction
//!
//! Turns a rendered page into zero or more [`Record`]s by applying a static
//! rule set to every container match. Missing optional fields become the
//! rule's declared default; all values stay strings.

mod engine;
mod record;
mod rules;

pub use engine::{extract, ExtractError};
pub use record::{fingerprint, Record};
pub use rules::{apply_transforms, ExtractionRule, Transform};

pub(crate) use engine::parse_selector;
