use url::Url;

/// A rendered page: the raw HTML of the current document plus the URL it
/// was served from (after redirects).
///
/// The handle deliberately owns plain text rather than a parsed DOM;
/// queries parse locally inside synchronous extraction code, so the handle
/// stays cheap to clone and safe to move across tasks.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    url: Url,
    raw: String,
}

impl RenderedPage {
    pub fn new(url: Url, raw: String) -> Self {
        Self { url, raw }
    }

    /// The URL this document was served from; base for resolving relative
    /// links found in it.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Full HTML snapshot of the document.
    pub fn raw_content(&self) -> &str {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_page_accessors() {
        let url = Url::parse("https://example.com/a").unwrap();
        let page = RenderedPage::new(url.clone(), "<html></html>".to_string());

        assert_eq!(page.url(), &url);
        assert_eq!(page.raw_content(), "<html></html>");
    }
}
