use crate::{
    boundary::{self, CacheAck, FetchRequest, FetchResponse},
    Resolver,
};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::sync::Arc;

/// How the [`crate::AutoFetchController`] reaches a [`Resolver`].
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Ask for a website's icon.
    async fn resolve(
        &self,
        request: FetchRequest,
    ) -> Result<FetchResponse, TransportError>;

    /// Clear the resolver's cache for one domain, or for everything.
    async fn clear_cache(
        &self,
        domain: Option<&str>,
    ) -> Result<CacheAck, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn resolve(
        &self,
        request: FetchRequest,
    ) -> Result<FetchResponse, TransportError> {
        (**self).resolve(request).await
    }

    async fn clear_cache(
        &self,
        domain: Option<&str>,
    ) -> Result<CacheAck, TransportError> {
        (**self).clear_cache(domain).await
    }
}

/// Something went wrong while talking to the resolver.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request couldn't be sent or the response couldn't be read.
    #[error("Unable to reach the favicon resolver")]
    Http(#[from] reqwest::Error),
    /// The resolver's address is invalid.
    #[error("Invalid resolver URL")]
    Url(#[from] url::ParseError),
}

/// A [`Transport`] which calls a [`Resolver`] living in the same process.
#[derive(Debug, Clone)]
pub struct LocalTransport {
    resolver: Arc<Resolver>,
}

impl LocalTransport {
    /// Create a new [`LocalTransport`].
    pub fn new(resolver: Arc<Resolver>) -> Self { LocalTransport { resolver } }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn resolve(
        &self,
        request: FetchRequest,
    ) -> Result<FetchResponse, TransportError> {
        let (_status, response) = boundary::fetch(&self.resolver, request).await;
        Ok(response)
    }

    async fn clear_cache(
        &self,
        domain: Option<&str>,
    ) -> Result<CacheAck, TransportError> {
        Ok(boundary::clear_cache(self.resolver.cache(), domain))
    }
}

/// A [`Transport`] which talks to a remote server over HTTP.
///
/// Resolution requests are POSTed as JSON to the endpoint and cache clearing
/// sends a DELETE to the same endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    /// Where the endpoint lives, relative to the server's root.
    pub const PATH: &'static str = "/api/favicon/fetch";

    /// Create a [`HttpTransport`] for a specific endpoint.
    pub fn new(client: Client, endpoint: Url) -> Self {
        HttpTransport { client, endpoint }
    }

    /// Create a [`HttpTransport`] for the server at `base`, using the usual
    /// [`HttpTransport::PATH`].
    pub fn for_server(client: Client, base: &str) -> Result<Self, TransportError> {
        let endpoint = Url::parse(base)?.join(HttpTransport::PATH)?;
        Ok(HttpTransport::new(client, endpoint))
    }

    /// The endpoint requests are sent to.
    pub fn endpoint(&self) -> &Url { &self.endpoint }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn resolve(
        &self,
        request: FetchRequest,
    ) -> Result<FetchResponse, TransportError> {
        // error statuses still carry a JSON body explaining what went wrong
        let response: FetchResponse = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        Ok(response)
    }

    async fn clear_cache(
        &self,
        domain: Option<&str>,
    ) -> Result<CacheAck, TransportError> {
        let mut url = self.endpoint.clone();

        if let Some(domain) = domain {
            url.query_pairs_mut().append_pair("domain", domain);
        }

        let ack: CacheAck = self.client.delete(url).send().await?.json().await?;

        Ok(ack)
    }
}
