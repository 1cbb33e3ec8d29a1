//! Browser-automation collaborator surface
//!
//! The crawl engine depends on two small traits: a [`Browser`] that opens
//! isolated page sessions, and a [`PageSession`] that loads URLs, exposes
//! document snapshots, and actuates in-page affordances. The production
//! implementation is a static-HTML fetcher; tests script their own.

mod http;
mod page;
mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use http::{build_http_client, HttpBrowser};
pub use page::RenderedPage;
pub use session::{Browser, ClickOutcome, PageSession};

use thiserror::Error;

/// Errors surfaced by a page driver
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Failed to build HTTP client: {0}")]
    Build(String),

    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("No page has been opened in this session")]
    NoPage,
}
