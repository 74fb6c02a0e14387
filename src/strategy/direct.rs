use crate::{
    strategy::{web, Reason, Strategy},
    NormalizedTarget,
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Look for the icon at the well-known `/favicon.ico` path.
///
/// The response must be a 2xx *and* have an image content type.
#[derive(Debug, Clone, PartialEq)]
pub struct WellKnownPath {
    timeout: Duration,
}

impl WellKnownPath {
    /// The path every browser tries first.
    pub const PATH: &'static str = "/favicon.ico";

    /// Create a new [`WellKnownPath`] strategy.
    pub fn new(timeout: Duration) -> Self { WellKnownPath { timeout } }
}

#[async_trait]
impl Strategy for WellKnownPath {
    fn method_id(&self) -> &str { "direct_favicon" }

    fn timeout(&self) -> Duration { self.timeout }

    async fn attempt(
        &self,
        target: &NormalizedTarget,
        client: &Client,
    ) -> Result<String, Reason> {
        let url = target.url()?.join(WellKnownPath::PATH)?;

        let response = web::head(client, &url, self.timeout).await?;
        web::is_image(&response)?;

        Ok(url.to_string())
    }
}
