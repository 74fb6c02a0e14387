use crate::{
    resolver::Options,
    strategy::{web, Reason, Strategy},
    NormalizedTarget,
};
use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, Url};
use std::{sync::LazyLock, time::Duration};

static LINK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<link\b[^>]*>").expect("the regex is valid")
});
static REL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\srel\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("the regex is valid")
});
static HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\shref\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("the regex is valid")
});

const ICON_RELS: &[&str] = &["icon", "shortcut icon", "apple-touch-icon"];

/// Download the website's home page and look for a `<link rel="icon">`.
///
/// Whatever the link points at is checked with a HEAD request before it is
/// accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlScrape {
    page_timeout: Duration,
    probe_timeout: Duration,
    user_agent: String,
}

impl HtmlScrape {
    /// Create a new [`HtmlScrape`] strategy.
    pub fn new(options: &Options) -> Self {
        HtmlScrape {
            page_timeout: options.page_timeout,
            probe_timeout: options.probe_timeout,
            user_agent: options.user_agent.clone(),
        }
    }
}

#[async_trait]
impl Strategy for HtmlScrape {
    fn method_id(&self) -> &str { "html_parsing" }

    fn timeout(&self) -> Duration { self.page_timeout + self.probe_timeout }

    async fn attempt(
        &self,
        target: &NormalizedTarget,
        client: &Client,
    ) -> Result<String, Reason> {
        let page = target.url()?;
        let html =
            web::get_page(client, &page, self.page_timeout, &self.user_agent)
                .await?;

        let href = find_icon_href(&html).ok_or(Reason::NoIconLink)?;
        let icon = resolve_href(&page, &href)?;
        log::debug!("\"{}\" declares its icon at \"{}\"", page, icon);

        web::head(client, &icon, self.probe_timeout).await?;

        Ok(icon.to_string())
    }
}

/// Find the `href` of the first icon `<link>` in a HTML document.
///
/// # Examples
///
/// ```rust
/// use favicon_resolver::strategy::find_icon_href;
///
/// let html = r#"<head><link rel="stylesheet" href="/a.css">
///     <link rel="shortcut icon" href="/static/icon.png"></head>"#;
///
/// assert_eq!(find_icon_href(html).as_deref(), Some("/static/icon.png"));
/// ```
pub fn find_icon_href(html: &str) -> Option<String> {
    LINK_TAG
        .find_iter(html)
        .map(|tag| tag.as_str())
        .filter(|tag| {
            attribute(&REL, tag)
                .map(|rel| is_icon_rel(&rel))
                .unwrap_or(false)
        })
        .find_map(|tag| attribute(&HREF, tag))
        .map(|href| href.trim().replace("&amp;", "&"))
        .filter(|href| !href.is_empty())
}

fn attribute(pattern: &Regex, tag: &str) -> Option<String> {
    let caps = pattern.captures(tag)?;

    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

fn is_icon_rel(rel: &str) -> bool {
    let rel = rel.trim();
    ICON_RELS.iter().any(|candidate| rel.eq_ignore_ascii_case(candidate))
}

/// Resolve a (possibly relative) `href` against the page's origin.
fn resolve_href(page: &Url, href: &str) -> Result<Url, url::ParseError> {
    let origin = page.join("/")?;
    origin.join(href)
}
