use crate::{
    clock::SystemClock,
    strategy::{StrategyChain, StrategyResult},
    NormalizedTarget, ResolutionCache,
};
use reqwest::Client;
use std::{sync::Arc, time::Duration};

/// A request to resolve a website's icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    /// Whatever the user typed.
    pub raw_url: String,
    /// Skip the cache and always run the [`StrategyChain`].
    pub force_refresh: bool,
}

impl ResolutionRequest {
    /// A request which may be answered from the cache.
    pub fn new<S: Into<String>>(raw_url: S) -> Self {
        ResolutionRequest {
            raw_url: raw_url.into(),
            force_refresh: false,
        }
    }

    /// A request which always goes to the network.
    pub fn forced<S: Into<String>>(raw_url: S) -> Self {
        ResolutionRequest {
            force_refresh: true,
            ..ResolutionRequest::new(raw_url)
        }
    }
}

/// Options used when constructing a [`Resolver`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Options {
    /// How long a found icon is remembered for.
    pub success_ttl: Duration,
    /// How long to back off after every strategy failed.
    pub failure_ttl: Duration,
    /// The timeout used for each HEAD probe.
    pub probe_timeout: Duration,
    /// The timeout used when downloading a web page to scrape.
    pub page_timeout: Duration,
    /// The User-Agent sent when downloading a web page to scrape.
    pub user_agent: String,
    /// The icon size requested from services which support it.
    pub icon_size: u32,
}

impl Options {
    /// The User-Agent used when scraping pages.
    pub const USER_AGENT: &'static str =
        "Mozilla/5.0 (compatible; FaviconBot/1.0)";

    /// Create the default [`Options`].
    pub fn new() -> Self {
        Options {
            success_ttl: ResolutionCache::DEFAULT_SUCCESS_TTL,
            failure_ttl: ResolutionCache::DEFAULT_FAILURE_TTL,
            probe_timeout: Duration::from_secs(5),
            page_timeout: Duration::from_secs(10),
            user_agent: String::from(Options::USER_AGENT),
            icon_size: 32,
        }
    }

    /// Set the [`Options::probe_timeout`].
    pub fn with_probe_timeout(self, probe_timeout: Duration) -> Self {
        Options {
            probe_timeout,
            ..self
        }
    }

    /// Set the [`Options::page_timeout`].
    pub fn with_page_timeout(self, page_timeout: Duration) -> Self {
        Options {
            page_timeout,
            ..self
        }
    }

    /// Set the [`Options::user_agent`].
    pub fn with_user_agent<S: Into<String>>(self, user_agent: S) -> Self {
        Options {
            user_agent: user_agent.into(),
            ..self
        }
    }

    /// Set both cache TTLs.
    pub fn with_ttls(self, success_ttl: Duration, failure_ttl: Duration) -> Self {
        Options {
            success_ttl,
            failure_ttl,
            ..self
        }
    }
}

impl Default for Options {
    fn default() -> Self { Options::new() }
}

/// Resolves icons by consulting the [`ResolutionCache`] and falling back to
/// the [`StrategyChain`].
///
/// Concurrent resolutions for the same hostname aren't de-duplicated. Both
/// callers will run the full chain and whichever finishes last wins the
/// cache write.
#[derive(Debug)]
pub struct Resolver {
    client: Client,
    cache: Arc<ResolutionCache>,
    chain: StrategyChain,
}

impl Resolver {
    /// The message used when a hostname is still in its backoff window.
    pub const RECENTLY_FAILED: &'static str =
        "Recently failed, try again later";
    /// The message used when no strategy found an icon.
    pub const EXHAUSTED: &'static str = "All favicon fetch methods failed";

    /// Create a [`Resolver`] from its parts.
    pub fn new(
        client: Client,
        cache: Arc<ResolutionCache>,
        chain: StrategyChain,
    ) -> Self {
        Resolver {
            client,
            cache,
            chain,
        }
    }

    /// Create a [`Resolver`] using the standard [`StrategyChain`].
    pub fn with_options(
        client: Client,
        cache: Arc<ResolutionCache>,
        options: &Options,
    ) -> Self {
        Resolver::new(client, cache, StrategyChain::standard(options))
    }

    /// Create a [`Resolver`] with its own HTTP client and a cache driven by
    /// the system clock.
    pub fn from_options(options: &Options) -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        let cache = Arc::new(ResolutionCache::with_ttls(
            Arc::new(SystemClock),
            options.success_ttl,
            options.failure_ttl,
        ));

        Ok(Resolver::with_options(client, cache, options))
    }

    /// The cache shared by this [`Resolver`].
    pub fn cache(&self) -> &Arc<ResolutionCache> { &self.cache }

    /// Find an icon for the requested website.
    ///
    /// Unless [`ResolutionRequest::force_refresh`] is set, a hostname which
    /// recently failed is answered with a failure straight away and a
    /// hostname with a known icon is answered from the cache. Otherwise the
    /// [`StrategyChain`] is run and its outcome written back to the cache.
    pub async fn resolve(&self, request: &ResolutionRequest) -> StrategyResult {
        let target = NormalizedTarget::from_raw(&request.raw_url);
        let hostname = target.hostname.as_str();

        if !request.force_refresh {
            if self.cache.lookup_failure(hostname).is_some() {
                log::debug!("\"{}\" failed recently, not retrying", hostname);
                return StrategyResult::failed(Resolver::RECENTLY_FAILED)
                    .into_cached();
            }

            if let Some(entry) = self.cache.lookup_success(hostname) {
                log::debug!("Cache hit for \"{}\"", hostname);
                return StrategyResult {
                    success: true,
                    icon_url: Some(entry.icon_url),
                    method_id: Some(entry.method_id),
                    error: None,
                    cached: true,
                };
            }
        }

        match self.chain.run(&target, &self.client).await {
            Some(found) => {
                self.cache.record_success(
                    hostname,
                    &found.icon_url,
                    &found.method_id,
                );
                StrategyResult::found(found)
            },
            None => {
                log::debug!("Every strategy failed for \"{}\"", hostname);
                self.cache.record_failure(hostname);
                StrategyResult::failed(Resolver::EXHAUSTED)
            },
        }
    }
}
