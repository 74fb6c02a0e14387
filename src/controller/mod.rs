//! The client-side half: keeping an icon preview up to date while the user
//! types a URL.

mod batch;
mod transport;

pub use batch::{resolve_all, BatchEntry};
pub use transport::{HttpTransport, LocalTransport, Transport, TransportError};

use crate::boundary::{CacheAck, FetchRequest, FetchResponse};
use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use tokio::{runtime::Handle, task::JoinHandle};

/// Options used when constructing an [`AutoFetchController`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ControllerOptions {
    /// When disabled the controller never issues any requests.
    pub enabled: bool,
    /// Automatically resolve the target whenever it changes.
    pub auto_fetch: bool,
    /// How long the target must stay the same before it is resolved.
    pub debounce: Duration,
}

impl ControllerOptions {
    /// The default quiet period.
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(800);

    /// Set the [`ControllerOptions::debounce`] period.
    pub fn with_debounce(self, debounce: Duration) -> Self {
        ControllerOptions { debounce, ..self }
    }

    /// Set [`ControllerOptions::auto_fetch`].
    pub fn with_auto_fetch(self, auto_fetch: bool) -> Self {
        ControllerOptions { auto_fetch, ..self }
    }
}

impl Default for ControllerOptions {
    fn default() -> Self {
        ControllerOptions {
            enabled: true,
            auto_fetch: true,
            debounce: ControllerOptions::DEFAULT_DEBOUNCE,
        }
    }
}

/// Everything a UI needs to show the icon for the current target.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClientFetchState {
    /// The icon, if one was found.
    pub icon_url: Option<String>,
    /// Is a request in flight?
    pub is_loading: bool,
    /// The last error, ready to be displayed.
    pub error: Option<String>,
    /// The strategy which found the icon.
    pub method_id: Option<String>,
    /// Was the icon served from the resolver's cache?
    pub is_cached: bool,
}

impl ClientFetchState {
    /// The error shown when the resolver failed without saying why.
    pub const FAILED_TO_FETCH: &'static str = "Failed to fetch favicon";

    /// Turn the outcome of a request into a terminal state.
    pub fn from_outcome(
        outcome: Result<FetchResponse, TransportError>,
    ) -> Self {
        match outcome {
            Ok(response) if response.success => ClientFetchState {
                is_cached: response.is_cached(),
                icon_url: response.icon_url,
                is_loading: false,
                error: None,
                method_id: response.method,
            },
            Ok(response) => ClientFetchState::failed(
                response
                    .error
                    .unwrap_or_else(|| String::from(Self::FAILED_TO_FETCH)),
            ),
            Err(e) => ClientFetchState::failed(e.to_string()),
        }
    }

    fn failed(error: String) -> Self {
        ClientFetchState {
            error: Some(error),
            ..Default::default()
        }
    }
}

/// What the controller is currently doing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Nothing is scheduled or running.
    Idle,
    /// A resolution will start once the debounce period is over.
    Scheduled,
    /// A resolution has been sent and we're waiting for the answer.
    InFlight,
}

/// Resolves the icon for a URL as the user types it.
///
/// Changes to the target are debounced so a burst of keystrokes results in a
/// single request. Every change bumps a generation counter, and a response
/// which arrives after its generation has been superseded is thrown away.
///
/// Requests which have already been sent are never aborted. Dropping the
/// controller cancels anything still scheduled and discards the results of
/// anything in flight.
#[derive(Debug)]
pub struct AutoFetchController<T: Transport> {
    shared: Arc<Shared<T>>,
}

#[derive(Debug)]
struct Shared<T> {
    transport: T,
    options: ControllerOptions,
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    target: String,
    state: ClientFetchState,
    phase: Phase,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl<T: Transport> AutoFetchController<T> {
    /// Create a new, idle [`AutoFetchController`].
    pub fn new(transport: T, options: ControllerOptions) -> Self {
        AutoFetchController {
            shared: Arc::new(Shared {
                transport,
                options,
                inner: Mutex::new(Inner {
                    target: String::new(),
                    state: ClientFetchState::default(),
                    phase: Phase::Idle,
                    generation: 0,
                    pending: None,
                }),
            }),
        }
    }

    /// The latest state.
    pub fn state(&self) -> ClientFetchState { self.shared.lock().state.clone() }

    /// The current target.
    pub fn target(&self) -> String { self.shared.lock().target.clone() }

    /// What the controller is doing right now.
    pub fn phase(&self) -> Phase { self.shared.lock().phase }

    /// The [`ControllerOptions`] this controller was created with.
    pub fn options(&self) -> &ControllerOptions { &self.shared.options }

    /// Change the target URL.
    ///
    /// If auto-fetching is enabled a resolution is scheduled once the
    /// debounce period passes without another change. Anything previously
    /// scheduled is cancelled. An empty target clears the state
    /// immediately.
    ///
    /// Nothing is scheduled when called outside a Tokio runtime.
    pub fn set_target(&self, url: &str) {
        let mut inner = self.shared.lock();
        inner.target = url.to_string();
        inner.supersede();

        let url = url.trim();

        if url.is_empty() {
            inner.state = ClientFetchState::default();
            return;
        }

        inner.state.is_loading = false;

        if !(self.shared.options.enabled && self.shared.options.auto_fetch) {
            return;
        }

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                log::warn!(
                    "Unable to schedule a resolution for \"{}\": {}",
                    url,
                    e
                );
                return;
            },
        };

        let generation = inner.generation;
        let debounce = self.shared.options.debounce;
        let shared = Arc::clone(&self.shared);
        let request = FetchRequest::new(url, false);

        log::debug!("Resolving \"{}\" in {:?}", url, debounce);
        inner.phase = Phase::Scheduled;
        inner.pending = Some(runtime.spawn(async move {
            tokio::time::sleep(debounce).await;
            shared.run_scheduled(generation, request).await;
        }));
    }

    /// Resolve `url` (or the current target) right now, cancelling anything
    /// which was scheduled.
    ///
    /// A blank `url` falls back to the current target. Returns the state once
    /// the request completes. Inside a Tokio runtime the request keeps
    /// running in the background if the returned future is dropped.
    pub async fn fetch_now(
        &self,
        url: Option<&str>,
        force_refresh: bool,
    ) -> ClientFetchState {
        let (generation, request) = {
            let mut inner = self.shared.lock();
            let url = match url {
                Some(url) if !url.trim().is_empty() => url.to_string(),
                _ => inner.target.clone(),
            };

            if !self.shared.options.enabled || url.trim().is_empty() {
                return inner.state.clone();
            }

            inner.supersede();
            inner.begin();
            let request = FetchRequest::new(url.trim(), force_refresh);
            inner.target = url;

            (inner.generation, request)
        };

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => return self.shared.perform(generation, request).await,
        };

        let shared = Arc::clone(&self.shared);
        let in_flight =
            runtime.spawn(async move { shared.perform(generation, request).await });

        match in_flight.await {
            Ok(state) => state,
            Err(e) => {
                log::warn!("The favicon request was interrupted: {}", e);
                self.shared.complete(
                    generation,
                    ClientFetchState::failed(e.to_string()),
                )
            },
        }
    }

    /// Resolve the current target again, bypassing the resolver's cache.
    pub async fn refresh(&self) -> ClientFetchState {
        self.fetch_now(None, true).await
    }

    /// Reset to the empty state and cancel anything scheduled.
    ///
    /// The resolver's cache is left untouched.
    pub fn clear(&self) {
        let mut inner = self.shared.lock();
        inner.supersede();
        inner.state = ClientFetchState::default();
    }

    /// Resolve several URLs at once.
    ///
    /// This has no effect on the controller's own target or state.
    pub async fn batch_resolve<I>(&self, urls: I) -> Vec<BatchEntry>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        batch::resolve_all(&self.shared.transport, urls).await
    }

    /// Ask the resolver to forget about one domain (or everything).
    pub async fn clear_server_cache(
        &self,
        domain: Option<&str>,
    ) -> Result<CacheAck, TransportError> {
        self.shared.transport.clear_cache(domain).await
    }

    /// Cancel scheduled work and make sure nothing in flight can touch this
    /// controller's state again.
    pub fn shutdown(&self) {
        let mut inner = self.shared.lock();
        inner.supersede();
        inner.state.is_loading = false;
    }
}

impl<T: Transport> Drop for AutoFetchController<T> {
    fn drop(&mut self) { self.shutdown(); }
}

impl<T: Transport> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("Mutex was poisoned")
    }

    async fn run_scheduled(&self, generation: u64, request: FetchRequest) {
        {
            let mut inner = self.lock();

            if inner.generation != generation {
                return;
            }

            // from here on the request can't be cancelled
            inner.pending = None;
            inner.begin();
        }

        self.perform(generation, request).await;
    }

    async fn perform(
        &self,
        generation: u64,
        request: FetchRequest,
    ) -> ClientFetchState {
        let url = request.url.clone();
        let outcome = self.transport.resolve(request).await;

        if let Err(e) = &outcome {
            log::warn!("Unable to resolve \"{}\": {}", url, e);
        }

        self.complete(generation, ClientFetchState::from_outcome(outcome))
    }

    /// Record the outcome of a request, unless it has been superseded.
    fn complete(
        &self,
        generation: u64,
        state: ClientFetchState,
    ) -> ClientFetchState {
        let mut inner = self.lock();

        if inner.generation != generation {
            log::debug!(
                "Discarding a stale response (generation {} != {})",
                generation,
                inner.generation
            );
            return inner.state.clone();
        }

        inner.phase = Phase::Idle;
        inner.state = state;
        inner.state.clone()
    }
}

impl Inner {
    /// Cancel anything scheduled and invalidate anything in flight.
    fn supersede(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }

        self.generation += 1;
        self.phase = Phase::Idle;
    }

    fn begin(&mut self) {
        self.phase = Phase::InFlight;
        self.state.is_loading = true;
        self.state.error = None;
    }
}
