//! A library for finding a usable icon for any website.
//!
//! The [`Resolver`] tries a fixed sequence of [`strategy::Strategy`]s until
//! one of them finds an icon, remembering successes and failures in a
//! [`ResolutionCache`]. On the client side, an [`AutoFetchController`]
//! debounces changes to a URL the user is typing and keeps a
//! [`ClientFetchState`] up to date. The [`render`] module decides what to
//! display for a stored record.

#![forbid(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod boundary;
mod cache;
pub mod clock;
mod controller;
mod normalize;
pub mod render;
mod resolver;
pub mod strategy;

pub use cache::{FailureEntry, ResolutionCache, SuccessEntry};
pub use controller::{
    resolve_all, AutoFetchController, BatchEntry, ClientFetchState,
    ControllerOptions, HttpTransport, LocalTransport, Phase, Transport,
    TransportError,
};
pub use normalize::{extract_hostname, is_valid_url, normalize, NormalizedTarget};
pub use resolver::{Options, ResolutionRequest, Resolver};
pub use strategy::{StrategyChain, StrategyResult};
