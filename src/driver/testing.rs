//! Scripted collaborator doubles for unit tests
//!
//! The scripted browser answers `open` calls from per-URL response
//! sequences and `click` calls from a global click queue, so pagination and
//! retry behavior can be exercised without a network.

use super::session::{Browser, ClickOutcome, PageSession};
use super::{DriverError, RenderedPage};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// One scripted response to an `open` call.
#[derive(Debug, Clone)]
pub(crate) enum ScriptedOpen {
    /// A response with this status; the body becomes the current document
    /// when the status is below 400
    Page(u16, String),
    /// The collaborator produced no response object
    NoResponse,
    /// A transport/timeout error
    Fail(String),
}

/// One scripted reaction to a `click` call.
#[derive(Debug, Clone)]
pub(crate) struct ScriptedClick {
    pub outcome: ClickOutcome,
    /// Replacement document after the click, when the click mutates the page
    pub html: Option<String>,
}

#[derive(Debug, Default)]
struct Script {
    /// Per-URL response sequences; the last entry repeats once exhausted
    responses: HashMap<String, Vec<ScriptedOpen>>,
    cursors: HashMap<String, usize>,
    /// Global click sequence; NotFound once exhausted
    clicks: VecDeque<ScriptedClick>,
    /// Log of opened URLs, in call order
    opened: Vec<String>,
}

/// Browser double shared by every session it opens, so tests can assert
/// call counts across the whole run.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedBrowser {
    script: Arc<Mutex<Script>>,
}

impl ScriptedBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a single response for a URL, repeated on every visit.
    pub fn respond(&self, url: &str, open: ScriptedOpen) {
        self.respond_sequence(url, vec![open]);
    }

    /// Scripts a response sequence for a URL; the last entry repeats.
    pub fn respond_sequence(&self, url: &str, opens: Vec<ScriptedOpen>) {
        let mut script = self.script.lock().unwrap();
        script.responses.insert(url.to_string(), opens);
    }

    /// Appends one scripted click reaction.
    pub fn push_click(&self, outcome: ClickOutcome, html: Option<String>) {
        let mut script = self.script.lock().unwrap();
        script.clicks.push_back(ScriptedClick { outcome, html });
    }

    /// URLs opened so far, in call order.
    pub fn opened(&self) -> Vec<String> {
        self.script.lock().unwrap().opened.clone()
    }

    /// Number of `open` calls made for one URL.
    pub fn open_count(&self, url: &str) -> usize {
        self.script
            .lock()
            .unwrap()
            .opened
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }
}

#[async_trait]
impl Browser for ScriptedBrowser {
    async fn new_page(&self) -> Result<Box<dyn PageSession>, DriverError> {
        Ok(Box::new(ScriptedSession {
            script: Arc::clone(&self.script),
            current: None,
        }))
    }
}

struct ScriptedSession {
    script: Arc<Mutex<Script>>,
    current: Option<RenderedPage>,
}

#[async_trait]
impl PageSession for ScriptedSession {
    async fn open(&mut self, url: &str, _timeout: Duration) -> Result<Option<u16>, DriverError> {
        let scripted = {
            let mut script = self.script.lock().unwrap();
            script.opened.push(url.to_string());

            let cursor = script.cursors.get(url).copied().unwrap_or(0);
            let next = match script.responses.get(url) {
                Some(opens) if !opens.is_empty() => {
                    Some(opens[cursor.min(opens.len() - 1)].clone())
                }
                _ => None,
            };

            match next {
                Some(response) => {
                    script.cursors.insert(url.to_string(), cursor + 1);
                    response
                }
                // Unscripted URLs are dead ends
                None => ScriptedOpen::Page(404, String::new()),
            }
        };

        match scripted {
            ScriptedOpen::Page(status, html) => {
                if status < 400 {
                    let parsed = Url::parse(url).map_err(|e| DriverError::Transport {
                        url: url.to_string(),
                        message: e.to_string(),
                    })?;
                    self.current = Some(RenderedPage::new(parsed, html));
                }
                Ok(Some(status))
            }
            ScriptedOpen::NoResponse => Ok(None),
            ScriptedOpen::Fail(message) => Err(DriverError::Transport {
                url: url.to_string(),
                message,
            }),
        }
    }

    fn snapshot(&self) -> Result<RenderedPage, DriverError> {
        self.current.clone().ok_or(DriverError::NoPage)
    }

    async fn click(&mut self, _selector: &str) -> Result<ClickOutcome, DriverError> {
        let scripted = {
            let mut script = self.script.lock().unwrap();
            script.clicks.pop_front()
        };

        match scripted {
            Some(click) => {
                if let Some(html) = click.html {
                    let url = self
                        .current
                        .as_ref()
                        .map(|p| p.url().clone())
                        .unwrap_or_else(|| Url::parse("https://scripted.invalid/").unwrap());
                    self.current = Some(RenderedPage::new(url, html));
                }
                Ok(click.outcome)
            }
            None => Ok(ClickOutcome::NotFound),
        }
    }

    async fn settle(&mut self, _timeout: Duration) {}
}
