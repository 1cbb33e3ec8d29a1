//! Pagination resolver: lazy record batches for a listing URL
//!
//! One resolver hides the two pagination mechanisms the target sites use:
//! numeric offset pages (`?start=N`) and an in-page "load more" affordance.
//! Both are driven through the same `next_batch` interface and both carry a
//! hard step bound: listings expose no natural end condition, so an
//! unbounded loop is a correctness bug, not an implementation detail.

use crate::config::{ListingConfig, PaginationConfig};
use crate::crawl::navigate::{navigate, FailureKind, NavigationError, RetryPolicy};
use crate::driver::{ClickOutcome, DriverError, PageSession};
use crate::extract::{extract, fingerprint, ExtractError, Record};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

/// One page worth of records, in discovery order.
#[derive(Debug)]
pub struct Batch {
    /// 1-based index in discovery order
    pub index: u32,
    pub records: Vec<Record>,
}

/// Errors that abort a listing traversal. Mid-sequence navigation failures
/// on offset pagination are a normal end condition and never surface here.
#[derive(Debug, Error)]
pub enum PaginationError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("Driver error during pagination: {0}")]
    Driver(#[from] DriverError),

    #[error("Invalid listing URL {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
}

impl PaginationError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Navigation(e) if e.is_cancelled())
    }
}

enum StrategyState {
    Offset {
        param: String,
        cursor: u64,
        page_size: u64,
        max_steps: u32,
        last_fingerprint: Option<String>,
    },
    LoadMore {
        selector: String,
        max_clicks: u32,
        settle: Duration,
    },
    Done,
}

/// Resolves a listing URL into successive record batches. Owned state lives
/// only for one listing traversal and is discarded afterwards.
pub struct Paginator<'a> {
    session: &'a mut dyn PageSession,
    policy: &'a RetryPolicy,
    cancel: &'a CancellationToken,
    listing: &'a ListingConfig,
    url: String,
    state: StrategyState,
    batches: u32,
    bound_exceeded: bool,
}

impl<'a> Paginator<'a> {
    pub fn new(
        session: &'a mut dyn PageSession,
        policy: &'a RetryPolicy,
        cancel: &'a CancellationToken,
        listing: &'a ListingConfig,
        url: String,
        start_cursor: Option<u64>,
    ) -> Self {
        let state = match &listing.pagination {
            PaginationConfig::Offset {
                param,
                start_offset,
                page_size,
                max_steps,
            } => StrategyState::Offset {
                param: param.clone(),
                cursor: start_cursor.unwrap_or(*start_offset),
                page_size: *page_size,
                max_steps: *max_steps,
                last_fingerprint: None,
            },
            PaginationConfig::LoadMore {
                selector,
                max_clicks,
                settle_ms,
            } => StrategyState::LoadMore {
                selector: selector.clone(),
                max_clicks: *max_clicks,
                settle: Duration::from_millis(*settle_ms),
            },
        };

        Self {
            session,
            policy,
            cancel,
            listing,
            url,
            state,
            batches: 0,
            bound_exceeded: false,
        }
    }

    /// True when a hard step/click bound cut the traversal short.
    pub fn bound_exceeded(&self) -> bool {
        self.bound_exceeded
    }

    /// Batches produced so far.
    pub fn batches(&self) -> u32 {
        self.batches
    }

    /// Next batch of records; `Ok(None)` when the listing is exhausted.
    pub async fn next_batch(&mut self) -> Result<Option<Batch>, PaginationError> {
        match std::mem::replace(&mut self.state, StrategyState::Done) {
            StrategyState::Done => Ok(None),
            StrategyState::Offset {
                param,
                cursor,
                page_size,
                max_steps,
                last_fingerprint,
            } => {
                self.offset_step(param, cursor, page_size, max_steps, last_fingerprint)
                    .await
            }
            StrategyState::LoadMore {
                selector,
                max_clicks,
                settle,
            } => self.load_more_pass(&selector, max_clicks, settle).await,
        }
    }

    async fn offset_step(
        &mut self,
        param: String,
        cursor: u64,
        page_size: u64,
        max_steps: u32,
        last_fingerprint: Option<String>,
    ) -> Result<Option<Batch>, PaginationError> {
        if self.batches >= max_steps {
            self.bound_exceeded = true;
            tracing::warn!(
                "Offset pagination hit the {}-step cap for {}: keeping what was collected",
                max_steps,
                self.url
            );
            return Ok(None);
        }

        let page_url = offset_url(&self.url, &param, cursor)?;
        let page = match navigate(&mut *self.session, &page_url, self.policy, self.cancel).await {
            Ok(page) => page,
            Err(e) if e.is_cancelled() => return Err(e.into()),
            Err(e) => {
                // Offsets past the end commonly stop resolving; that is
                // the natural end of the listing, not a node failure.
                tracing::debug!("Pagination stopped at {}: {}", page_url, e);
                return Ok(None);
            }
        };

        let records = extract(&page, &self.listing.container, &self.listing.rules)?;
        if records.is_empty() {
            self.warn_on_first_empty(&page_url);
            return Ok(None);
        }

        let print = fingerprint(&records);
        if last_fingerprint.as_deref() == Some(print.as_str()) {
            // The site ignored an out-of-range offset and re-served the
            // last page.
            tracing::warn!(
                "Offset {} re-served identical content for {}: stopping",
                cursor,
                self.url
            );
            return Ok(None);
        }

        self.batches += 1;
        self.state = StrategyState::Offset {
            param,
            cursor: cursor + page_size,
            page_size,
            max_steps,
            last_fingerprint: Some(print),
        };
        Ok(Some(Batch {
            index: self.batches,
            records,
        }))
    }

    async fn load_more_pass(
        &mut self,
        selector: &str,
        max_clicks: u32,
        settle: Duration,
    ) -> Result<Option<Batch>, PaginationError> {
        navigate(&mut *self.session, &self.url, self.policy, self.cancel).await?;

        let mut clicks = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Err(NavigationError {
                    url: self.url.clone(),
                    attempts: 0,
                    kind: FailureKind::Cancelled,
                }
                .into());
            }
            if clicks >= max_clicks {
                self.bound_exceeded = true;
                tracing::warn!(
                    "Load-more hit the {}-click cap for {}: extracting the current page state",
                    max_clicks,
                    self.url
                );
                break;
            }

            match self.session.click(selector).await {
                Ok(ClickOutcome::Clicked) => {
                    self.session.settle(settle).await;
                    clicks += 1;
                }
                Ok(ClickOutcome::NotFound) | Ok(ClickOutcome::NotVisible) => break,
                Err(e) => {
                    tracing::debug!(
                        "Click on `{}` failed at {} ({}); stopping expansion",
                        selector,
                        self.url,
                        e
                    );
                    break;
                }
            }
        }
        tracing::debug!("Expanded {} with {} click(s)", self.url, clicks);

        // Exactly one extraction pass over the fully expanded page.
        let page = self.session.snapshot()?;
        let records = extract(&page, &self.listing.container, &self.listing.rules)?;
        if records.is_empty() {
            self.warn_on_first_empty(&self.url);
            return Ok(None);
        }

        self.batches = 1;
        Ok(Some(Batch {
            index: 1,
            records,
        }))
    }

    fn warn_on_first_empty(&self, page_url: &str) {
        if self.batches == 0 && self.listing.expect_items {
            tracing::warn!(
                "Listing container `{}` matched nothing at {}: selector mismatch or empty listing",
                self.listing.container,
                page_url
            );
        }
    }
}

/// Appends the offset parameter to a listing URL, respecting any query
/// string already present.
fn offset_url(base: &str, param: &str, cursor: u64) -> Result<String, PaginationError> {
    let mut url = Url::parse(base).map_err(|source| PaginationError::InvalidUrl {
        url: base.to_string(),
        source,
    })?;
    url.query_pairs_mut()
        .append_pair(param, &cursor.to_string());
    Ok(url.to_string())
}
