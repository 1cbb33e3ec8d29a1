//! Crawl coordinator - frontier management and node dispatch
//!
//! The coordinator owns the FIFO frontier of pending nodes and drives the
//! whole traversal: taxonomy discovery for the root node, pagination for
//! listing nodes, extraction plus snapshotting for detail nodes. Every
//! record and child a node produces is durably written before the node
//! enters the checkpoint, and one bad link never aborts the run.

use crate::config::Config;
use crate::crawl::navigate::{navigate, RetryPolicy};
use crate::crawl::node::{CrawlNode, NodeKind};
use crate::crawl::pagination::Paginator;
use crate::crawl::taxonomy::discover_taxonomy;
use crate::driver::{Browser, PageSession};
use crate::extract::extract;
use crate::output::{Checkpoint, CheckpointStore, FrontierSnapshot, OutputWriter};
use crate::ArborError;
use futures::stream::{self, StreamExt};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Options resolved from the CLI, separate from the config file.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Ignore any previous checkpoint/frontier state
    pub fresh: bool,

    /// Restrict traversal to top-level categories with this name
    pub category_filter: Option<String>,

    /// Restrict archive traversal to this year
    pub year_filter: Option<u16>,
}

/// Final accounting for one run.
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub records_written: u64,
    pub snapshots_written: u64,

    /// Failed node ids with their reasons, in failure order
    pub failures: Vec<(String, String)>,
}

impl CrawlReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Main crawl coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    browser: Arc<dyn Browser>,
    writer: Arc<OutputWriter>,
    store: CheckpointStore,
    policy: RetryPolicy,
    cancel: CancellationToken,
    options: RunOptions,
    frontier: VecDeque<CrawlNode>,
    /// Node ids enqueued this run; guards at-most-once processing
    seen: HashSet<String>,
    checkpoint: Checkpoint,
    failed_nodes: Vec<CrawlNode>,
    report: CrawlReport,
}

impl Coordinator {
    /// Creates a coordinator, loading previous checkpoint/frontier state
    /// unless `options.fresh` is set. Failure here is an unrecoverable
    /// setup failure; everything later is per-node.
    pub fn new(
        config: Config,
        browser: Arc<dyn Browser>,
        options: RunOptions,
        cancel: CancellationToken,
    ) -> Result<Self, ArborError> {
        let writer = Arc::new(OutputWriter::new(&config.output.root));
        let store = CheckpointStore::new(writer.root());

        let (checkpoint, resumed) = if options.fresh {
            store.clear()?;
            (Checkpoint::default(), None)
        } else {
            (store.load_checkpoint()?, store.load_frontier()?)
        };

        let policy = RetryPolicy::from_config(&config.retry, &config.crawler);

        let mut frontier = VecDeque::new();
        let mut seen = HashSet::new();
        match resumed {
            Some(snapshot) if !snapshot.is_empty() => {
                tracing::info!(
                    "Resuming: {} pending and {} previously failed nodes",
                    snapshot.pending.len(),
                    snapshot.failed.len()
                );
                for node in snapshot.pending.into_iter().chain(snapshot.failed) {
                    if seen.insert(node.id.clone()) {
                        frontier.push_back(node);
                    }
                }
            }
            _ => {
                let root = CrawlNode::new(NodeKind::Root, config.site.root_url.clone(), None, vec![]);
                seen.insert(root.id.clone());
                frontier.push_back(root);
            }
        }

        Ok(Self {
            config: Arc::new(config),
            browser,
            writer,
            store,
            policy,
            cancel,
            options,
            frontier,
            seen,
            checkpoint,
            failed_nodes: Vec::new(),
            report: CrawlReport::default(),
        })
    }

    /// Drives the frontier to exhaustion and returns the run report.
    ///
    /// Per-node failures are recorded and the run continues; the frontier
    /// going empty is the only normal terminal condition. Cancellation
    /// stops the run at the next node boundary and persists state as-is.
    pub async fn run(mut self) -> Result<CrawlReport, ArborError> {
        let started = Instant::now();
        let deadline = self
            .config
            .crawler
            .run_timeout_secs
            .map(|secs| started + Duration::from_secs(secs));
        tracing::info!(
            "Starting crawl of {} ({} nodes queued)",
            self.config.site.root_url,
            self.frontier.len()
        );

        while let Some(node) = self.frontier.pop_front() {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline && !self.cancel.is_cancelled() {
                    tracing::warn!("Run timeout reached, stopping");
                    self.cancel.cancel();
                }
            }
            if self.cancel.is_cancelled() {
                // Not yet started: stays pending for the next run
                self.frontier.push_front(node);
                break;
            }

            if self.checkpoint.contains(&node.id) {
                tracing::debug!("Skipping completed node {}", node.id);
                self.report.skipped += 1;
                continue;
            }

            let next_is_detail = self
                .frontier
                .front()
                .map_or(false, |n| n.kind == NodeKind::DetailItem);
            if node.kind == NodeKind::DetailItem && next_is_detail {
                // Detail items sit contiguously at the frontier head once
                // their listing resolves; fetch the whole run as one
                // pooled batch.
                let batch = self.drain_detail_run(node);
                self.process_detail_batch(batch).await;
            } else {
                self.process_node(node).await;
            }
        }

        self.persist_state();

        let elapsed = started.elapsed();
        tracing::info!(
            "Crawl finished in {:.1}s: {} completed, {} failed, {} skipped, {} records, {} snapshots",
            elapsed.as_secs_f64(),
            self.report.completed,
            self.report.failed,
            self.report.skipped,
            self.report.records_written,
            self.report.snapshots_written
        );

        Ok(self.report)
    }

    /// Processes one non-detail node and records its outcome.
    async fn process_node(&mut self, node: CrawlNode) {
        tracing::info!("Processing {} node: {}", node.kind, node.url);

        let result = match node.kind {
            NodeKind::Root => self.process_root(&node).await,
            NodeKind::Category | NodeKind::Subcategory | NodeKind::ListingPage => {
                self.process_listing(&node).await
            }
            NodeKind::DetailItem => self.process_single_detail(&node).await,
        };

        match result {
            Ok(()) => self.complete_node(&node),
            Err(e) => self.fail_node(node, e.to_string()),
        }
    }

    /// Root node: discover the taxonomy, persist it, seed listing nodes.
    async fn process_root(&mut self, node: &CrawlNode) -> Result<(), ArborError> {
        let config = Arc::clone(&self.config);
        let policy = self.policy.clone();
        let cancel = self.cancel.clone();

        let mut session = self.browser.new_page().await?;
        let page = navigate(session.as_mut(), &node.url, &policy, &cancel).await?;

        let mut categories = discover_taxonomy(&page, &config.site.taxonomy)?;
        if let Some(filter) = &self.options.category_filter {
            categories.retain(|c| c.name.eq_ignore_ascii_case(filter));
        }
        if categories.is_empty() {
            tracing::warn!(
                "No categories discovered at {}: taxonomy selectors may not match",
                node.url
            );
        }

        self.writer.write_taxonomy(&categories)?;
        tracing::info!("Discovered {} categories", categories.len());

        for category in &categories {
            if category.subcategories.is_empty() {
                if category.url.is_empty() {
                    continue;
                }
                self.enqueue(CrawlNode::new(
                    NodeKind::Category,
                    category.url.clone(),
                    Some(node),
                    vec![category.name.clone()],
                ));
            } else {
                for sub in &category.subcategories {
                    self.enqueue(CrawlNode::new(
                        NodeKind::Subcategory,
                        sub.url.clone(),
                        Some(node),
                        vec![category.name.clone(), sub.name.clone()],
                    ));
                }
            }
        }

        // Year archives are flat listings keyed by year rather than by
        // taxonomy position.
        if let Some(archive) = &config.site.archive {
            for year in archive.years(self.options.year_filter) {
                self.enqueue(CrawlNode::new(
                    NodeKind::ListingPage,
                    archive.url_for(year),
                    Some(node),
                    vec![archive.name.clone(), year.to_string()],
                ));
            }
        }

        Ok(())
    }

    /// Listing node: run pagination to exhaustion, persisting each batch
    /// in discovery order, then enqueue the discovered detail items.
    async fn process_listing(&mut self, node: &CrawlNode) -> Result<(), ArborError> {
        let config = Arc::clone(&self.config);
        let listing = &config.site.listing;
        let policy = self.policy.clone();
        let cancel = self.cancel.clone();

        let mut session = self.browser.new_page().await?;
        let mut paginator = Paginator::new(
            session.as_mut(),
            &policy,
            &cancel,
            listing,
            node.url.clone(),
            node.pagination_cursor,
        );

        let mut children: Vec<CrawlNode> = Vec::new();
        loop {
            let batch = match paginator.next_batch().await? {
                Some(batch) => batch,
                None => break,
            };

            self.writer
                .write_listing_page(&node.output_prefix, batch.index, &batch.records)?;
            self.report.records_written += batch.records.len() as u64;

            for record in &batch.records {
                let Some(link) = record.get(&listing.item_link_field) else {
                    continue;
                };
                if link.is_empty() {
                    continue;
                }
                let item_id = listing
                    .item_id_field
                    .as_deref()
                    .and_then(|field| record.get(field))
                    .map(str::to_string);
                children.push(
                    CrawlNode::new(
                        NodeKind::DetailItem,
                        link,
                        Some(node),
                        node.output_prefix.clone(),
                    )
                    .with_item_id(item_id),
                );
            }
        }

        tracing::info!(
            "Listing {} resolved: {} batches, {} detail items",
            node.url,
            paginator.batches(),
            children.len()
        );

        // Children enter the frontier before the parent is marked
        // Completed; the checkpoint invariant depends on this order.
        for child in children {
            self.enqueue(child);
        }

        Ok(())
    }

    /// Sequential fetch for a detail node with no queued siblings.
    async fn process_single_detail(&mut self, node: &CrawlNode) -> Result<(), ArborError> {
        let mut session = self.browser.new_page().await?;
        let outcome = fetch_detail(
            session.as_mut(),
            node,
            &self.config,
            &self.policy,
            &self.cancel,
            &self.writer,
        )
        .await?;
        self.report.records_written += outcome.records;
        self.report.snapshots_written += 1;
        Ok(())
    }

    /// Pops the contiguous run of detail items at the frontier head.
    fn drain_detail_run(&mut self, first: CrawlNode) -> Vec<CrawlNode> {
        let mut batch = vec![first];
        while self
            .frontier
            .front()
            .map_or(false, |n| n.kind == NodeKind::DetailItem)
        {
            let Some(node) = self.frontier.pop_front() else {
                break;
            };
            if self.checkpoint.contains(&node.id) {
                self.report.skipped += 1;
                continue;
            }
            batch.push(node);
        }
        batch
    }

    /// Fetches a batch of detail items through a bounded worker pool, one
    /// page session per worker. Outputs are keyed by stable item identity,
    /// so completion order does not matter.
    async fn process_detail_batch(&mut self, nodes: Vec<CrawlNode>) {
        let workers = self.config.crawler.detail_workers.max(1);
        let delay = Duration::from_millis(self.config.crawler.detail_delay_ms);
        tracing::info!(
            "Fetching {} detail items with {} worker(s)",
            nodes.len(),
            workers
        );

        let browser = Arc::clone(&self.browser);
        let writer = Arc::clone(&self.writer);
        let config = Arc::clone(&self.config);
        let policy = self.policy.clone();
        let cancel = self.cancel.clone();

        let mut results = stream::iter(nodes.into_iter().map(move |node| {
            let browser = Arc::clone(&browser);
            let writer = Arc::clone(&writer);
            let config = Arc::clone(&config);
            let policy = policy.clone();
            let cancel = cancel.clone();
            async move {
                if cancel.is_cancelled() {
                    return (node, Err("cancelled before dispatch".to_string()));
                }
                let result = async {
                    let mut session = browser.new_page().await?;
                    fetch_detail(
                        session.as_mut(),
                        &node,
                        &config,
                        &policy,
                        &cancel,
                        &writer,
                    )
                    .await
                }
                .await;
                if result.is_ok() && !cancel.is_cancelled() {
                    // Fixed per-worker delay between item fetches
                    tokio::time::sleep(delay).await;
                }
                (node, result.map_err(|e| e.to_string()))
            }
        }))
        .buffer_unordered(workers);

        while let Some((node, result)) = results.next().await {
            match result {
                Ok(outcome) => {
                    self.report.records_written += outcome.records;
                    self.report.snapshots_written += 1;
                    self.complete_node(&node);
                }
                Err(reason) => self.fail_node(node, reason),
            }
        }
    }

    fn enqueue(&mut self, node: CrawlNode) {
        if !self.seen.insert(node.id.clone()) {
            return;
        }
        self.frontier.push_back(node);
    }

    fn complete_node(&mut self, node: &CrawlNode) {
        self.checkpoint.record(node.id.clone());
        self.report.completed += 1;
        self.persist_state();
    }

    fn fail_node(&mut self, node: CrawlNode, reason: String) {
        tracing::error!("Node {} failed: {}", node.id, reason);
        self.report.failed += 1;
        self.report.failures.push((node.id.clone(), reason));
        self.failed_nodes.push(node);
        self.persist_state();
    }

    fn persist_state(&mut self) {
        let snapshot = FrontierSnapshot {
            pending: self.frontier.iter().cloned().collect(),
            failed: self.failed_nodes.clone(),
        };
        if let Err(e) = self.store.save(&self.checkpoint, &snapshot) {
            tracing::error!("Failed to persist checkpoint: {}", e);
        }
    }
}

struct DetailOutcome {
    records: u64,
}

/// Fetches one detail page: navigate, extract fields, persist the raw
/// snapshot and (when any fields matched) the extracted records.
async fn fetch_detail(
    session: &mut dyn PageSession,
    node: &CrawlNode,
    config: &Config,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    writer: &OutputWriter,
) -> Result<DetailOutcome, ArborError> {
    let page = navigate(session, &node.url, policy, cancel).await?;

    let detail = &config.site.detail;
    let records = extract(&page, &detail.container, &detail.rules)?;
    if records.is_empty() {
        tracing::warn!(
            "Detail container `{}` matched nothing at {}",
            detail.container,
            node.url
        );
    }

    let item_id = node
        .item_id
        .clone()
        .unwrap_or_else(|| derive_item_id(&node.url));

    writer.write_snapshot(&node.output_prefix, &item_id, page.raw_content())?;
    if !records.is_empty() {
        writer.write_detail(&node.output_prefix, &item_id, &records)?;
    }

    Ok(DetailOutcome {
        records: records.len() as u64,
    })
}

/// Stable item identity from a detail URL: the last non-empty path
/// segment, falling back to the host.
fn derive_item_id(url: &str) -> String {
    let fallback = || "item".to_string();
    match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|segments| {
                segments
                    .filter(|s| !s.is_empty())
                    .last()
                    .map(str::to_string)
            })
            .or_else(|| parsed.host_str().map(str::to_string))
            .unwrap_or_else(fallback),
        Err(_) => fallback(),
    }
}
