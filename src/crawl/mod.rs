//! Crawl module: traversal, navigation, and pagination
//!
//! This module contains the core crawl logic, including:
//! - Retrying page navigation with fixed backoff
//! - The polymorphic pagination resolver (offset and load-more)
//! - Root-page taxonomy discovery
//! - Frontier management and node dispatch in the coordinator

mod coordinator;
mod navigate;
mod node;
mod pagination;
mod taxonomy;

pub use coordinator::{Coordinator, CrawlReport, RunOptions};
pub use navigate::{navigate, FailureKind, NavigationError, RetryPolicy};
pub use node::{node_id, CrawlNode, NodeKind};
pub use pagination::{Batch, PaginationError, Paginator};
pub use taxonomy::{discover_taxonomy, Category, Subcategory};
