//! Crawl node identity and lifecycle

use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of traversal work a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Root,
    Category,
    Subcategory,
    ListingPage,
    DetailItem,
}

impl NodeKind {
    /// True for node kinds resolved through the pagination layer.
    pub fn is_listing(&self) -> bool {
        matches!(self, Self::Category | Self::Subcategory | Self::ListingPage)
    }

    fn slug(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Category => "category",
            Self::Subcategory => "subcategory",
            Self::ListingPage => "listing",
            Self::DetailItem => "detail",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

/// One unit of traversal work. Immutable once created; the coordinator
/// consumes each node at most once per run. A node is pending while it
/// waits in the frontier, completed once its id enters the checkpoint, and
/// failed when it lands in the failed-node snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlNode {
    pub id: String,
    pub kind: NodeKind,
    pub url: String,

    /// Parent node id, for lookup/reporting only
    #[serde(rename = "parent-id", default)]
    pub parent_id: Option<String>,

    /// Output path segments relative to the output root, unsanitized
    #[serde(rename = "output-prefix")]
    pub output_prefix: Vec<String>,

    /// Starting offset for listing nodes seeded mid-sequence
    #[serde(
        rename = "pagination-cursor",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub pagination_cursor: Option<u64>,

    /// Stable item identity for detail nodes; derived from the URL when
    /// absent
    #[serde(rename = "item-id", default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
}

impl CrawlNode {
    pub fn new(
        kind: NodeKind,
        url: impl Into<String>,
        parent: Option<&CrawlNode>,
        output_prefix: Vec<String>,
    ) -> Self {
        let url = url.into();
        Self {
            id: node_id(kind, &url),
            kind,
            url,
            parent_id: parent.map(|p| p.id.clone()),
            output_prefix,
            pagination_cursor: None,
            item_id: None,
        }
    }

    pub fn with_item_id(mut self, item_id: Option<String>) -> Self {
        self.item_id = item_id;
        self
    }

    pub fn with_cursor(mut self, cursor: Option<u64>) -> Self {
        self.pagination_cursor = cursor;
        self
    }
}

/// Deterministic node identity: stable across runs so checkpoint entries
/// survive a restart.
pub fn node_id(kind: NodeKind, url: &str) -> String {
    format!("{}:{}", kind, url)
}
