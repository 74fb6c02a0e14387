//! The different ways we can go looking for a website's icon.

mod aggregator;
mod direct;
mod html;
mod web;

pub use aggregator::FaviconService;
pub use direct::WellKnownPath;
pub use html::{find_icon_href, HtmlScrape};
pub use web::{get_page, head};

use crate::{resolver::Options, NormalizedTarget};
use async_trait::async_trait;
use http::StatusCode;
use reqwest::Client;
use std::{fmt::Debug, time::Duration};

/// One independent method of locating a candidate icon.
///
/// # Note to Implementors
///
/// An attempt should give up by itself once [`Strategy::timeout()`] has
/// elapsed, but the [`StrategyChain`] enforces the timeout regardless.
#[async_trait]
pub trait Strategy: Debug + Send + Sync {
    /// A descriptive name for this [`Strategy`], used in log messages.
    fn method_id(&self) -> &str;

    /// The longest this [`Strategy`] is allowed to take.
    fn timeout(&self) -> Duration;

    /// Try to find an icon for `target`, returning its URL.
    async fn attempt(
        &self,
        target: &NormalizedTarget,
        client: &Client,
    ) -> Result<String, Reason>;
}

/// Why a single [`Strategy`] didn't find anything.
#[derive(Debug, thiserror::Error)]
pub enum Reason {
    /// The strategy ran out of time.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
    /// The request couldn't be completed.
    #[error("The request failed")]
    Http(#[from] reqwest::Error),
    /// The server answered with something other than a 2xx.
    #[error("The server responded with {0}")]
    Status(StatusCode),
    /// The resource exists but isn't an image.
    #[error("Expected an image but the content type was {0:?}")]
    NotAnImage(Option<String>),
    /// The page doesn't declare an icon.
    #[error("The page doesn't contain an icon link")]
    NoIconLink,
    /// We couldn't build a URL to probe.
    #[error("Invalid URL")]
    InvalidUrl(#[from] url::ParseError),
}

/// The icon found by a [`StrategyChain`].
#[derive(Debug, Clone, PartialEq)]
pub struct Found {
    /// Where the icon lives.
    pub icon_url: String,
    /// The winning strategy's 1-based position in the chain, as
    /// `method_<n>`.
    pub method_id: String,
}

/// An ordered list of [`Strategy`]s, tried one after the other until the
/// first success.
#[derive(Debug, Default)]
pub struct StrategyChain {
    strategies: Vec<Box<dyn Strategy>>,
}

impl StrategyChain {
    /// Create a [`StrategyChain`] which will try `strategies` in order.
    pub fn new(strategies: Vec<Box<dyn Strategy>>) -> Self {
        StrategyChain { strategies }
    }

    /// The standard chain, cheapest probes first.
    ///
    /// 1. [`FaviconService::google()`]
    /// 2. [`FaviconService::favicon_io()`]
    /// 3. [`WellKnownPath`]
    /// 4. [`HtmlScrape`]
    /// 5. [`FaviconService::duckduckgo()`]
    pub fn standard(options: &Options) -> Self {
        let mut chain = StrategyChain::default();
        chain.push(FaviconService::google(options));
        chain.push(FaviconService::favicon_io(options));
        chain.push(WellKnownPath::new(options.probe_timeout));
        chain.push(HtmlScrape::new(options));
        chain.push(FaviconService::duckduckgo(options));

        chain
    }

    /// Add a [`Strategy`] to the end of the chain.
    pub fn push<S: Strategy + 'static>(&mut self, strategy: S) {
        self.strategies.push(Box::new(strategy));
    }

    /// How many strategies are in the chain?
    pub fn len(&self) -> usize { self.strategies.len() }

    /// Is the chain empty?
    pub fn is_empty(&self) -> bool { self.strategies.is_empty() }

    /// Try each [`Strategy`] in turn, stopping at the first one which finds
    /// an icon.
    ///
    /// The winner is reported by its position (`method_1` for the first
    /// strategy, and so on). [`Strategy::method_id()`] only shows up in logs.
    /// Failures and timeouts are logged and otherwise ignored. Returns `None`
    /// when every strategy failed.
    pub async fn run(
        &self,
        target: &NormalizedTarget,
        client: &Client,
    ) -> Option<Found> {
        for (index, strategy) in self.strategies.iter().enumerate() {
            let method_id = strategy.method_id();
            log::debug!("Trying \"{}\" for \"{}\"", method_id, target.hostname);

            match attempt_with_timeout(strategy.as_ref(), target, client).await
            {
                Ok(icon_url) => {
                    log::debug!(
                        "\"{}\" found \"{}\" for \"{}\"",
                        method_id,
                        icon_url,
                        target.hostname
                    );

                    return Some(Found {
                        icon_url,
                        method_id: format!("method_{}", index + 1),
                    });
                },
                Err(reason) => {
                    log::warn!(
                        "Favicon method \"{}\" failed for \"{}\": {}",
                        method_id,
                        target.hostname,
                        reason
                    );
                },
            }
        }

        None
    }
}

async fn attempt_with_timeout(
    strategy: &dyn Strategy,
    target: &NormalizedTarget,
    client: &Client,
) -> Result<String, Reason> {
    let timeout = strategy.timeout();

    match tokio::time::timeout(timeout, strategy.attempt(target, client)).await
    {
        Ok(outcome) => outcome,
        Err(_elapsed) => Err(Reason::Timeout(timeout)),
    }
}

/// The outcome of resolving a website's icon.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StrategyResult {
    /// Was an icon found?
    pub success: bool,
    /// Where the icon can be found.
    pub icon_url: Option<String>,
    /// Which strategy found the icon.
    pub method_id: Option<String>,
    /// A human-readable explanation of why nothing was found.
    pub error: Option<String>,
    /// Was this answered from the cache?
    pub cached: bool,
}

impl StrategyResult {
    /// A freshly found icon.
    pub fn found(found: Found) -> Self {
        StrategyResult {
            success: true,
            icon_url: Some(found.icon_url),
            method_id: Some(found.method_id),
            error: None,
            cached: false,
        }
    }

    /// A failure with a message.
    pub fn failed<S: Into<String>>(error: S) -> Self {
        StrategyResult {
            success: false,
            icon_url: None,
            method_id: None,
            error: Some(error.into()),
            cached: false,
        }
    }

    /// Mark this result as coming from the cache.
    pub fn into_cached(self) -> Self {
        StrategyResult {
            cached: true,
            ..self
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    /// A [`Strategy`] which always gives the same answer and keeps track of
    /// how often it was asked.
    #[derive(Debug, Clone)]
    pub(crate) struct Canned {
        pub(crate) id: &'static str,
        pub(crate) icon_url: Option<&'static str>,
        pub(crate) delay: Duration,
        pub(crate) calls: Arc<AtomicUsize>,
    }

    impl Canned {
        pub(crate) fn failing(id: &'static str) -> Self {
            Canned {
                id,
                icon_url: None,
                delay: Duration::from_millis(0),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub(crate) fn succeeding(
            id: &'static str,
            icon_url: &'static str,
        ) -> Self {
            Canned {
                icon_url: Some(icon_url),
                ..Canned::failing(id)
            }
        }

        pub(crate) fn slow(self, delay: Duration) -> Self {
            Canned { delay, ..self }
        }

        pub(crate) fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
    }

    #[async_trait]
    impl Strategy for Canned {
        fn method_id(&self) -> &str { self.id }

        fn timeout(&self) -> Duration { Duration::from_secs(5) }

        async fn attempt(
            &self,
            _target: &NormalizedTarget,
            _client: &Client,
        ) -> Result<String, Reason> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            match self.icon_url {
                Some(url) => Ok(url.to_string()),
                None => Err(Reason::NoIconLink),
            }
        }
    }

    fn target() -> NormalizedTarget {
        NormalizedTarget::from_raw("example.com")
    }

    #[tokio::test]
    async fn the_chain_halts_at_the_first_success() {
        let strategies = vec![
            Canned::failing("first"),
            Canned::failing("second"),
            Canned::succeeding("third", "https://example.com/third.ico"),
            Canned::succeeding("fourth", "https://example.com/fourth.ico"),
        ];
        let chain = StrategyChain::new(
            strategies
                .iter()
                .cloned()
                .map(|s| Box::new(s) as Box<dyn Strategy>)
                .collect(),
        );

        let got = chain.run(&target(), &Client::new()).await.unwrap();

        assert_eq!(
            got,
            Found {
                icon_url: String::from("https://example.com/third.ico"),
                method_id: String::from("method_3"),
            }
        );
        let calls: Vec<_> = strategies.iter().map(Canned::calls).collect();
        assert_eq!(calls, vec![1, 1, 1, 0]);
    }

    #[tokio::test]
    async fn exhausting_every_strategy_gives_nothing() {
        let mut chain = StrategyChain::default();
        chain.push(Canned::failing("first"));
        chain.push(Canned::failing("second"));

        let got = chain.run(&target(), &Client::new()).await;

        assert!(got.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_strategies_are_skipped() {
        let slow = Canned::succeeding("slow", "https://example.com/slow.ico")
            .slow(Duration::from_secs(60));
        let fallback =
            Canned::succeeding("fallback", "https://example.com/fast.ico");
        let mut chain = StrategyChain::default();
        chain.push(slow.clone());
        chain.push(fallback.clone());

        let got = chain.run(&target(), &Client::new()).await.unwrap();

        assert_eq!(got.method_id, "method_2");
        assert_eq!(slow.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn winners_are_reported_by_position() {
        let mut chain = StrategyChain::default();
        chain.push(Canned::failing("google_favicon"));
        chain.push(Canned::succeeding(
            "favicon_io",
            "https://favicon.io/favicon/example.com",
        ));

        let got = chain.run(&target(), &Client::new()).await.unwrap();

        assert_eq!(got.method_id, "method_2");
    }

    #[test]
    fn the_standard_chain_is_cheapest_first() {
        let chain = StrategyChain::standard(&Options::default());

        let ids: Vec<_> =
            chain.strategies.iter().map(|s| s.method_id()).collect();

        assert_eq!(
            ids,
            vec![
                "google_favicon",
                "favicon_io",
                "direct_favicon",
                "html_parsing",
                "duckduckgo_favicon",
            ]
        );
    }
}
