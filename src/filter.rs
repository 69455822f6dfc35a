//! The transport filter chain.
//!
//! A send travels through an ordered list of [`HttpFilter`]s and ends at a
//! [`Transport`]. Each filter receives a [`Next`] handle for the rest of the
//! chain and decides whether, and how often, to call it. The client's chain is
//! always `retry filter -> custom filter (optional) -> transport`.
//!
//! # Examples
//!
//! ```
//! use async_trait::async_trait;
//! use xphttp::filter::{HttpFilter, Next};
//! use xphttp::{HttpRequest, HttpResponse, ProgressReporter, Result};
//!
//! /// Stamps every outgoing request with a client identifier.
//! struct ClientIdFilter(&'static str);
//!
//! #[async_trait]
//! impl HttpFilter for ClientIdFilter {
//!     async fn send(
//!         &self,
//!         request: &HttpRequest,
//!         progress: &ProgressReporter,
//!         next: Next<'_>,
//!     ) -> Result<HttpResponse> {
//!         let mut request = request.clone();
//!         request.set_header("X-Client-Id", self.0);
//!         next.run(&request, progress).await
//!     }
//! }
//! ```

use crate::progress::ProgressReporter;
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use crate::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// The base capability at the end of the chain: send one request, return the
/// fully read response.
///
/// Implementations must not consume the request; filters may hand the same
/// request to the transport several times.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request`, reporting progress as it goes.
    async fn send(&self, request: &HttpRequest, progress: &ProgressReporter)
        -> Result<HttpResponse>;
}

/// An interceptor in the chain.
#[async_trait]
pub trait HttpFilter: Send + Sync {
    /// Handles one send. Call `next.run(..)` to delegate to the inner chain.
    async fn send(
        &self,
        request: &HttpRequest,
        progress: &ProgressReporter,
        next: Next<'_>,
    ) -> Result<HttpResponse>;
}

/// The remainder of the chain below a filter.
///
/// `Next` is `Copy`, so a filter may run the inner chain any number of times.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    filters: &'a [Arc<dyn HttpFilter>],
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    /// Creates a handle over `filters` followed by `transport`.
    pub fn new(filters: &'a [Arc<dyn HttpFilter>], transport: &'a dyn Transport) -> Self {
        Self { filters, transport }
    }

    /// Sends `request` through the rest of the chain.
    pub async fn run(self, request: &HttpRequest, progress: &ProgressReporter) -> Result<HttpResponse> {
        match self.filters.split_first() {
            Some((filter, rest)) => {
                filter
                    .send(request, progress, Next::new(rest, self.transport))
                    .await
            }
            None => self.transport.send(request, progress).await,
        }
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining_filters", &self.filters.len())
            .finish_non_exhaustive()
    }
}

/// An immutable snapshot of the chain.
///
/// The client swaps whole pipelines on reconfiguration; a call keeps the
/// pipeline it started with.
#[derive(Clone)]
pub struct Pipeline {
    filters: Vec<Arc<dyn HttpFilter>>,
    transport: Arc<dyn Transport>,
}

impl Pipeline {
    /// Creates a pipeline from outermost filter to innermost, ending at
    /// `transport`.
    pub fn new(filters: Vec<Arc<dyn HttpFilter>>, transport: Arc<dyn Transport>) -> Self {
        Self { filters, transport }
    }

    /// Sends `request` through every filter and the transport.
    pub async fn send(&self, request: &HttpRequest, progress: &ProgressReporter) -> Result<HttpResponse> {
        Next::new(&self.filters, self.transport.as_ref())
            .run(request, progress)
            .await
    }

    /// Number of filters in front of the transport.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns `true` if requests go straight to the transport.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("filters", &self.filters.len())
            .finish_non_exhaustive()
    }
}
