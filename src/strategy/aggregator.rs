use crate::{
    resolver::Options,
    strategy::{web, Reason, Strategy},
    NormalizedTarget,
};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;

/// A third-party favicon service which serves icons for arbitrary domains.
///
/// The service is asked about a domain by substituting it into a URL
/// template. Any 2xx response to a HEAD request means the service has an
/// icon, and the templated URL is used as the icon itself.
#[derive(Debug, Clone, PartialEq)]
pub struct FaviconService {
    method_id: String,
    template: String,
    timeout: Duration,
}

impl FaviconService {
    /// The placeholder replaced with the hostname in a template.
    pub const DOMAIN: &'static str = "{domain}";

    /// Create a [`FaviconService`] from a URL template containing
    /// [`FaviconService::DOMAIN`].
    pub fn new<I, T>(method_id: I, template: T, timeout: Duration) -> Self
    where
        I: Into<String>,
        T: Into<String>,
    {
        FaviconService {
            method_id: method_id.into(),
            template: template.into(),
            timeout,
        }
    }

    /// Google's favicon service.
    pub fn google(options: &Options) -> Self {
        FaviconService::new(
            "google_favicon",
            format!(
                "https://www.google.com/s2/favicons?domain={{domain}}&sz={}",
                options.icon_size
            ),
            options.probe_timeout,
        )
    }

    /// The `favicon.io` service.
    pub fn favicon_io(options: &Options) -> Self {
        FaviconService::new(
            "favicon_io",
            "https://favicon.io/favicon/{domain}",
            options.probe_timeout,
        )
    }

    /// DuckDuckGo's icon service.
    pub fn duckduckgo(options: &Options) -> Self {
        FaviconService::new(
            "duckduckgo_favicon",
            "https://icons.duckduckgo.com/ip3/{domain}.ico",
            options.probe_timeout,
        )
    }

    /// The URL this service would serve `hostname`'s icon from.
    pub fn icon_url(&self, hostname: &str) -> String {
        self.template.replace(FaviconService::DOMAIN, hostname)
    }
}

#[async_trait]
impl Strategy for FaviconService {
    fn method_id(&self) -> &str { &self.method_id }

    fn timeout(&self) -> Duration { self.timeout }

    async fn attempt(
        &self,
        target: &NormalizedTarget,
        client: &Client,
    ) -> Result<String, Reason> {
        let icon_url = self.icon_url(&target.hostname);
        let url = Url::parse(&icon_url)?;

        web::head(client, &url, self.timeout).await?;

        Ok(icon_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn templates_are_filled_in_with_the_hostname() {
        let options = Options::default();

        assert_eq!(
            FaviconService::google(&options).icon_url("example.com"),
            "https://www.google.com/s2/favicons?domain=example.com&sz=32"
        );
        assert_eq!(
            FaviconService::favicon_io(&options).icon_url("example.com"),
            "https://favicon.io/favicon/example.com"
        );
        assert_eq!(
            FaviconService::duckduckgo(&options).icon_url("example.com"),
            "https://icons.duckduckgo.com/ip3/example.com.ico"
        );
    }
}
