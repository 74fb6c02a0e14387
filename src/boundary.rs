//! The request/response types exchanged between the client-side controller
//! and whatever server hosts the [`Resolver`], plus handlers which a web
//! framework can call directly.

use crate::{
    resolver::{ResolutionRequest, Resolver},
    strategy::StrategyResult,
    ResolutionCache,
};
use http::StatusCode;

/// The body of a resolution request.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    /// The website whose icon we want.
    #[serde(default)]
    pub url: String,
    /// Skip the server's cache.
    #[serde(default)]
    pub force_refresh: bool,
}

impl FetchRequest {
    /// Create a new [`FetchRequest`].
    pub fn new<S: Into<String>>(url: S, force_refresh: bool) -> Self {
        FetchRequest {
            url: url.into(),
            force_refresh,
        }
    }
}

/// The body of a resolution response.
#[derive(
    Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse {
    /// Was an icon found?
    pub success: bool,
    /// Where the icon can be found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    /// Which strategy found the icon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Why nothing was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when the answer came from the server's cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
}

impl FetchResponse {
    /// A failed response with no other information.
    pub fn error<S: Into<String>>(message: S) -> Self {
        FetchResponse {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Was the answer served from the cache?
    pub fn is_cached(&self) -> bool { self.cached.unwrap_or(false) }
}

impl From<StrategyResult> for FetchResponse {
    fn from(result: StrategyResult) -> Self {
        FetchResponse {
            success: result.success,
            icon_url: result.icon_url,
            method: result.method_id,
            error: result.error,
            cached: if result.cached { Some(true) } else { None },
        }
    }
}

/// The acknowledgement sent back after clearing the cache.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CacheAck {
    /// Did it work?
    pub success: bool,
    /// A human-readable description of what was cleared.
    pub message: String,
}

/// The message sent back when the request has no URL.
pub const URL_REQUIRED: &str = "URL is required";
/// The message sent back when the request body couldn't be understood.
pub const INTERNAL_ERROR: &str = "Internal server error";

/// Handle a resolution request.
pub async fn fetch(
    resolver: &Resolver,
    request: FetchRequest,
) -> (StatusCode, FetchResponse) {
    if request.url.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, FetchResponse::error(URL_REQUIRED));
    }

    let request = ResolutionRequest {
        raw_url: request.url,
        force_refresh: request.force_refresh,
    };
    let result = resolver.resolve(&request).await;

    (StatusCode::OK, FetchResponse::from(result))
}

/// Handle a resolution request whose body is still raw JSON.
pub async fn fetch_json(resolver: &Resolver, body: &[u8]) -> (StatusCode, String) {
    let (status, response) = match serde_json::from_slice::<FetchRequest>(body) {
        Ok(request) => fetch(resolver, request).await,
        Err(e) => {
            log::warn!("Unable to parse the favicon fetch request: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                FetchResponse::error(INTERNAL_ERROR),
            )
        },
    };

    match serde_json::to_string(&response) {
        Ok(json) => (status, json),
        Err(e) => {
            log::warn!("Unable to serialize the favicon response: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, String::from("{}"))
        },
    }
}

/// Handle a cache administration request, clearing a single domain or (when
/// no domain is given) everything.
pub fn clear_cache(cache: &ResolutionCache, domain: Option<&str>) -> CacheAck {
    match domain.map(str::trim).filter(|d| !d.is_empty()) {
        Some(domain) => {
            let hostname = domain.to_lowercase();
            cache.invalidate(&hostname);
            log::info!("Cleared the favicon cache for \"{}\"", hostname);

            CacheAck {
                success: true,
                message: format!("Cache cleared for {}", hostname),
            }
        },
        None => {
            cache.invalidate_all();
            log::info!("Cleared the entire favicon cache");

            CacheAck {
                success: true,
                message: String::from("All caches cleared"),
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{tests::Canned, Strategy, StrategyChain};
    use pretty_assertions::assert_eq;
    use reqwest::Client;
    use std::sync::Arc;

    fn resolver(strategy: Canned) -> Resolver {
        let chain =
            StrategyChain::new(vec![Box::new(strategy) as Box<dyn Strategy>]);
        Resolver::new(Client::new(), Arc::new(ResolutionCache::default()), chain)
    }

    #[tokio::test]
    async fn blank_urls_are_rejected() {
        let strategy = Canned::succeeding("x", "https://example.com/a.ico");
        let resolver = resolver(strategy.clone());

        let (status, response) =
            fetch(&resolver, FetchRequest::new("   ", false)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response, FetchResponse::error(URL_REQUIRED));
        assert_eq!(strategy.calls(), 0);
    }

    #[tokio::test]
    async fn round_trip_through_json() {
        let resolver =
            resolver(Canned::succeeding("x", "https://example.com/a.ico"));

        let (status, first) =
            fetch_json(&resolver, br#"{"url": "example.com"}"#).await;
        let (_, second) = fetch_json(
            &resolver,
            br#"{"url": "example.com", "forceRefresh": false}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            first,
            r#"{"success":true,"iconUrl":"https://example.com/a.ico","method":"method_1"}"#
        );
        assert_eq!(
            second,
            r#"{"success":true,"iconUrl":"https://example.com/a.ico","method":"method_1","cached":true}"#
        );
    }

    #[tokio::test]
    async fn garbage_bodies_are_an_internal_error() {
        let resolver = resolver(Canned::failing("x"));

        let (status, body) = fetch_json(&resolver, b"not json").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, r#"{"success":false,"error":"Internal server error"}"#);
    }

    #[test]
    fn clear_one_domain() {
        let cache = ResolutionCache::default();
        cache.record_success("a.com", "https://a.com/favicon.ico", "x");
        cache.record_failure("b.com");

        let ack = clear_cache(&cache, Some("A.com"));

        assert_eq!(
            ack,
            CacheAck {
                success: true,
                message: String::from("Cache cleared for a.com"),
            }
        );
        assert!(cache.lookup_success("a.com").is_none());
        assert!(cache.lookup_failure("b.com").is_some());
    }

    #[test]
    fn clear_everything() {
        let cache = ResolutionCache::default();
        cache.record_success("a.com", "https://a.com/favicon.ico", "x");
        cache.record_failure("b.com");

        let ack = clear_cache(&cache, None);

        assert_eq!(ack.message, "All caches cleared");
        assert!(cache.is_empty());
    }
}
