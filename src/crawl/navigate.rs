//! Retrying navigation layer
//!
//! Wraps a single page load in bounded retries with a fixed backoff. The
//! fixed (not exponential) delay matches observed site rate limits: the
//! target backs off crawlers for a constant window, so growing delays only
//! waste time.

use crate::config::{CrawlerConfig, RetryConfig};
use crate::driver::{PageSession, RenderedPage};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Bounded-retry policy, shared read-only across all navigations in a run.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
    pub navigation_timeout: Duration,
    terminal_statuses: Vec<u16>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration, navigation_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            navigation_timeout,
            terminal_statuses: Vec::new(),
        }
    }

    pub fn from_config(retry: &RetryConfig, crawler: &CrawlerConfig) -> Self {
        Self::new(
            retry.max_attempts,
            Duration::from_millis(retry.backoff_ms),
            Duration::from_millis(crawler.navigation_timeout_ms),
        )
        .with_terminal_statuses(retry.terminal_statuses.clone())
    }

    pub fn with_terminal_statuses(mut self, statuses: Vec<u16>) -> Self {
        self.terminal_statuses = statuses;
        self
    }

    /// True for statuses that are never worth another attempt.
    pub fn is_terminal_failure(&self, status: u16) -> bool {
        self.terminal_statuses.contains(&status)
    }
}

/// Why the last attempt of a navigation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Transport or timeout error from the collaborator
    Transport(String),
    /// The collaborator returned no response object
    NoResponse,
    /// HTTP status >= 400
    Status(u16),
    /// The run was cancelled mid-navigation
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "transport error: {}", message),
            Self::NoResponse => write!(f, "no response"),
            Self::Status(status) => write!(f, "HTTP {}", status),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Terminal navigation failure, carrying the last attempt's outcome. The
/// caller decides whether this is fatal to the run or just to one node.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("navigation to {url} failed after {attempts} attempt(s): {kind}")]
pub struct NavigationError {
    pub url: String,
    pub attempts: u32,
    pub kind: FailureKind,
}

impl NavigationError {
    pub fn is_cancelled(&self) -> bool {
        self.kind == FailureKind::Cancelled
    }
}

/// Attempts a page load up to `policy.max_attempts` times.
///
/// A load succeeds only when the collaborator returns a response with a
/// status code below 400; no response, a transport error, and status >= 400
/// all count as attempt failures. Between failed attempts (never after the
/// last) the fixed backoff elapses; cancellation cuts the wait short.
pub async fn navigate(
    session: &mut dyn PageSession,
    url: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<RenderedPage, NavigationError> {
    let mut last_failure = FailureKind::NoResponse;

    for attempt in 1..=policy.max_attempts {
        if cancel.is_cancelled() {
            return Err(NavigationError {
                url: url.to_string(),
                attempts: attempt - 1,
                kind: FailureKind::Cancelled,
            });
        }

        match session.open(url, policy.navigation_timeout).await {
            Ok(Some(status)) if status < 400 => match session.snapshot() {
                Ok(page) => return Ok(page),
                Err(e) => last_failure = FailureKind::Transport(e.to_string()),
            },
            Ok(Some(status)) => {
                last_failure = FailureKind::Status(status);
                if policy.is_terminal_failure(status) {
                    return Err(NavigationError {
                        url: url.to_string(),
                        attempts: attempt,
                        kind: last_failure,
                    });
                }
            }
            Ok(None) => last_failure = FailureKind::NoResponse,
            Err(e) => last_failure = FailureKind::Transport(e.to_string()),
        }

        if attempt < policy.max_attempts {
            tracing::debug!(
                "Attempt {}/{} failed for {}: {}",
                attempt,
                policy.max_attempts,
                url,
                last_failure
            );
            tokio::select! {
                _ = tokio::time::sleep(policy.backoff) => {}
                _ = cancel.cancelled() => {
                    return Err(NavigationError {
                        url: url.to_string(),
                        attempts: attempt,
                        kind: FailureKind::Cancelled,
                    });
                }
            }
        }
    }

    Err(NavigationError {
        url: url.to_string(),
        attempts: policy.max_attempts,
        kind: last_failure,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::testing::{ScriptedBrowser, ScriptedOpen};
    use crate::driver::Browser;

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_attempts,
            Duration::from_millis(1),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let browser = ScriptedBrowser::new();
        browser.respond(
            "https://example.com/a",
            ScriptedOpen::Page(200, "<html>ok</html>".to_string()),
        );
        let mut session = browser.new_page().await.unwrap();

        let page = navigate(
            session.as_mut(),
            "https://example.com/a",
            &quick_policy(3),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(page.raw_content(), "<html>ok</html>");
        assert_eq!(browser.open_count("https://example.com/a"), 1);
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let browser = ScriptedBrowser::new();
        browser.respond_sequence(
            "https://example.com/flaky",
            vec![
                ScriptedOpen::Fail("connection reset".to_string()),
                ScriptedOpen::Page(503, String::new()),
                ScriptedOpen::Page(200, "<html>third time</html>".to_string()),
            ],
        );
        let mut session = browser.new_page().await.unwrap();

        let page = navigate(
            session.as_mut(),
            "https://example.com/flaky",
            &quick_policy(3),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(page.raw_content(), "<html>third time</html>");
        // Exactly attempts_until_success calls, never more
        assert_eq!(browser.open_count("https://example.com/flaky"), 3);
    }

    #[tokio::test]
    async fn test_exhausts_attempts_and_reports_last_failure() {
        let browser = ScriptedBrowser::new();
        browser.respond(
            "https://example.com/down",
            ScriptedOpen::Fail("timed out".to_string()),
        );
        let mut session = browser.new_page().await.unwrap();

        let err = navigate(
            session.as_mut(),
            "https://example.com/down",
            &quick_policy(3),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.attempts, 3);
        assert!(matches!(err.kind, FailureKind::Transport(_)));
        assert_eq!(browser.open_count("https://example.com/down"), 3);
    }

    #[tokio::test]
    async fn test_status_over_400_is_retried() {
        let browser = ScriptedBrowser::new();
        browser.respond(
            "https://example.com/500",
            ScriptedOpen::Page(500, String::new()),
        );
        let mut session = browser.new_page().await.unwrap();

        let err = navigate(
            session.as_mut(),
            "https://example.com/500",
            &quick_policy(3),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind, FailureKind::Status(500));
        assert_eq!(browser.open_count("https://example.com/500"), 3);
    }

    #[tokio::test]
    async fn test_terminal_status_stops_retrying() {
        let browser = ScriptedBrowser::new();
        browser.respond(
            "https://example.com/gone",
            ScriptedOpen::Page(404, String::new()),
        );
        let mut session = browser.new_page().await.unwrap();

        let policy = quick_policy(3).with_terminal_statuses(vec![404]);
        let err = navigate(
            session.as_mut(),
            "https://example.com/gone",
            &policy,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.attempts, 1);
        assert_eq!(err.kind, FailureKind::Status(404));
        assert_eq!(browser.open_count("https://example.com/gone"), 1);
    }

    #[tokio::test]
    async fn test_no_response_counts_as_failure() {
        let browser = ScriptedBrowser::new();
        browser.respond("https://example.com/void", ScriptedOpen::NoResponse);
        let mut session = browser.new_page().await.unwrap();

        let err = navigate(
            session.as_mut(),
            "https://example.com/void",
            &quick_policy(2),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind, FailureKind::NoResponse);
        assert_eq!(err.attempts, 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let browser = ScriptedBrowser::new();
        browser.respond(
            "https://example.com/a",
            ScriptedOpen::Page(200, String::new()),
        );
        let mut session = browser.new_page().await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = navigate(
            session.as_mut(),
            "https://example.com/a",
            &quick_policy(3),
            &cancel,
        )
        .await
        .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(browser.open_count("https://example.com/a"), 0);
    }
}
