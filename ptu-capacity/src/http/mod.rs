//! HTTP transport for the management and storage endpoints.
//!
//! All remote calls go through the [`AsyncHttpClient`] trait so the
//! discovery pipeline can be exercised against canned responses in tests.
//! [`ReqwestClient`] is the production transport; [`RetryingClient`] wraps
//! any client with bounded exponential backoff.
//!
//! ```ignore
//! use ptu_capacity::http::{ReqwestClient, RetryingClient, RetryPolicy};
//!
//! let client = RetryingClient::new(ReqwestClient::with_timeout(30)?, RetryPolicy::exponential(3));
//! ```

mod client;
mod retry;

pub use client::{
    AsyncHttpClient, HttpError, HttpRequest, HttpResponse, Method, ReqwestClient,
    DEFAULT_TIMEOUT_SECS,
};
pub use retry::{is_transient_status, RetryPolicy, RetryingClient, DEFAULT_MAX_ATTEMPTS};

#[cfg(test)]
pub use client::tests::{MockAsyncHttpClient, SequenceHttpClient};
