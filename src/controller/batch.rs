use crate::{
    boundary::FetchRequest,
    controller::{transport::Transport, ClientFetchState},
};
use futures::future;

/// The terminal state reached by one URL in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    /// The URL exactly as it was passed in.
    pub url: String,
    /// What happened when it was resolved.
    pub state: ClientFetchState,
}

/// Resolve every URL concurrently.
///
/// Each URL gets its own [`BatchEntry`], in the same order they were passed
/// in, no matter how the others turned out.
pub async fn resolve_all<T, I>(transport: &T, urls: I) -> Vec<BatchEntry>
where
    T: Transport + ?Sized,
    I: IntoIterator,
    I::Item: Into<String>,
{
    let pending = urls.into_iter().map(Into::into).map(|url: String| async move {
        let request = FetchRequest::new(url.trim(), false);
        let outcome = transport.resolve(request).await;

        if let Err(e) = &outcome {
            log::warn!("Unable to resolve \"{}\": {}", url, e);
        }

        BatchEntry {
            state: ClientFetchState::from_outcome(outcome),
            url,
        }
    });

    future::join_all(pending).await
}
