use super::{DriverError, RenderedPage};
use async_trait::async_trait;
use std::time::Duration;

/// Outcome of attempting to click an interactive affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The affordance was found, visible, and clicked
    Clicked,
    /// No element matched the selector
    NotFound,
    /// An element matched but is not visible/actionable
    NotVisible,
}

/// A browser capable of opening isolated page sessions.
///
/// Each session is the equivalent of one tab: concurrent workers must each
/// hold their own, since a session's current document is mutable state.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn PageSession>, DriverError>;
}

/// One page/tab. `open` replaces the current document; `click` may mutate
/// it in place.
#[async_trait]
pub trait PageSession: Send {
    /// Loads a URL.
    ///
    /// `Ok(Some(status))` is a response carrying a status code; `Ok(None)`
    /// means the collaborator produced no response object at all. `Err` is
    /// a transport or timeout failure. The current document is replaced
    /// only when the load produced one.
    async fn open(&mut self, url: &str, timeout: Duration) -> Result<Option<u16>, DriverError>;

    /// Snapshot of the current document.
    fn snapshot(&self) -> Result<RenderedPage, DriverError>;

    /// Attempts to click the first element matching `selector` on the
    /// current document.
    async fn click(&mut self, selector: &str) -> Result<ClickOutcome, DriverError>;

    /// Waits for the page to settle after an interaction. Bounded: returns
    /// after the timeout even if the page never goes idle.
    async fn settle(&mut self, timeout: Duration);
}
