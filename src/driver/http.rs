//! Static-HTML driver backed by reqwest
//!
//! Fetches documents over plain HTTP without executing script. Interactive
//! affordances are therefore never actionable from here: `click` reports
//! them as such and load-more listings degrade to a single extraction pass
//! over the initial document.

use super::session::{Browser, ClickOutcome, PageSession};
use super::{DriverError, RenderedPage};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;

/// Builds the shared HTTP client with the configured user agent.
pub fn build_http_client(user_agent: &str) -> Result<Client, DriverError> {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
        .map_err(|e| DriverError::Build(e.to_string()))
}

/// Browser over plain HTTP fetches. Cloning a session's client is cheap;
/// every `new_page` call yields an independent tab.
pub struct HttpBrowser {
    client: Client,
}

impl HttpBrowser {
    pub fn new(user_agent: &str) -> Result<Self, DriverError> {
        Ok(Self {
            client: build_http_client(user_agent)?,
        })
    }
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn new_page(&self) -> Result<Box<dyn PageSession>, DriverError> {
        Ok(Box::new(HttpPageSession {
            client: self.client.clone(),
            current: None,
        }))
    }
}

struct HttpPageSession {
    client: Client,
    current: Option<RenderedPage>,
}

#[async_trait]
impl PageSession for HttpPageSession {
    async fn open(&mut self, url: &str, timeout: Duration) -> Result<Option<u16>, DriverError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DriverError::Timeout {
                        url: url.to_string(),
                    }
                } else {
                    DriverError::Transport {
                        url: url.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();

        if status < 400 {
            let body = response.text().await.map_err(|e| DriverError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;
            self.current = Some(RenderedPage::new(final_url, body));
        }

        Ok(Some(status))
    }

    fn snapshot(&self) -> Result<RenderedPage, DriverError> {
        self.current.clone().ok_or(DriverError::NoPage)
    }

    async fn click(&mut self, selector: &str) -> Result<ClickOutcome, DriverError> {
        // No script runs in a static fetch. Report an affordance that is
        // present in the markup as not actionable, anything else as absent.
        let Some(page) = &self.current else {
            return Ok(ClickOutcome::NotFound);
        };
        let Ok(parsed) = Selector::parse(selector) else {
            return Ok(ClickOutcome::NotFound);
        };

        let document = Html::parse_document(page.raw_content());
        if document.select(&parsed).next().is_some() {
            Ok(ClickOutcome::NotVisible)
        } else {
            Ok(ClickOutcome::NotFound)
        }
    }

    async fn settle(&mut self, _timeout: Duration) {
        // Nothing to settle: the document never changes after a fetch.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client("TestSweep/1.0").is_ok());
    }

    #[tokio::test]
    async fn test_snapshot_before_open_is_no_page() {
        let browser = HttpBrowser::new("TestSweep/1.0").unwrap();
        let session = browser.new_page().await.unwrap();
        assert!(matches!(session.snapshot(), Err(DriverError::NoPage)));
    }

    #[tokio::test]
    async fn test_click_before_open_is_not_found() {
        let browser = HttpBrowser::new("TestSweep/1.0").unwrap();
        let mut session = browser.new_page().await.unwrap();
        let outcome = session.click("a.pager-more").await.unwrap();
        assert_eq!(outcome, ClickOutcome::NotFound);
    }
}
