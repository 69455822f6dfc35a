//! Callback sets for the two dispatch styles.
//!
//! [`ResponseHandler`] serves the handler-based API: one required callback for
//! a received response and optional ones for progress, cancellation and
//! failure. [`CallOptions`] carries the optional progress and cancel hooks of
//! the typed API. Both can carry a [`CancellationToken`] so the caller can
//! abort the call from outside.

use crate::progress::{HttpProgress, ProgressCallback};
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Callback invoked with the request of a cancelled call.
pub type CancelCallback = Box<dyn FnOnce(HttpRequest) + Send>;

/// Callback invoked with a response.
pub type ResponseCallback = Box<dyn FnOnce(HttpResponse) + Send>;

/// Callbacks for one handler-based call. Exactly one of `handle`,
/// `on_cancel` or `on_failed` runs per call, and only if it is present.
///
/// # Examples
///
/// ```
/// use xphttp::ResponseHandler;
///
/// let handler = ResponseHandler::new(|response| {
///     println!("{}: {}", response.status, response.text());
/// })
/// .on_cancel(|request| eprintln!("cancelled {}", request.url))
/// .on_failed(|response| eprintln!("failed: {}", response.text()));
///
/// assert!(handler.has_on_cancel());
/// assert!(!handler.has_on_progress());
/// ```
pub struct ResponseHandler {
    pub(crate) handle: ResponseCallback,
    pub(crate) on_progress: Option<ProgressCallback>,
    pub(crate) on_cancel: Option<CancelCallback>,
    pub(crate) on_failed: Option<ResponseCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl ResponseHandler {
    /// Creates a handler that receives every response the transport returns,
    /// whatever its status.
    pub fn new(handle: impl FnOnce(HttpResponse) + Send + 'static) -> Self {
        Self {
            handle: Box::new(handle),
            on_progress: None,
            on_cancel: None,
            on_failed: None,
            cancellation: None,
        }
    }

    /// Receives progress events.
    pub fn on_progress(mut self, callback: impl Fn(HttpProgress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    /// Runs when the call times out or is cancelled.
    pub fn on_cancel(mut self, callback: impl FnOnce(HttpRequest) + Send + 'static) -> Self {
        self.on_cancel = Some(Box::new(callback));
        self
    }

    /// Runs when the call fails. The response is synthetic: its body is the
    /// error text.
    pub fn on_failed(mut self, callback: impl FnOnce(HttpResponse) + Send + 'static) -> Self {
        self.on_failed = Some(Box::new(callback));
        self
    }

    /// Lets the caller cancel the call through `token`.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Returns `true` if a progress callback is set.
    pub fn has_on_progress(&self) -> bool {
        self.on_progress.is_some()
    }

    /// Returns `true` if a cancel callback is set.
    pub fn has_on_cancel(&self) -> bool {
        self.on_cancel.is_some()
    }

    /// Returns `true` if a failure callback is set.
    pub fn has_on_failed(&self) -> bool {
        self.on_failed.is_some()
    }
}

impl fmt::Debug for ResponseHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseHandler")
            .field("on_progress", &self.has_on_progress())
            .field("on_cancel", &self.has_on_cancel())
            .field("on_failed", &self.has_on_failed())
            .field("cancellable", &self.cancellation.is_some())
            .finish()
    }
}

/// Optional hooks for a typed call.
///
/// # Examples
///
/// ```
/// use tokio_util::sync::CancellationToken;
/// use xphttp::CallOptions;
///
/// let token = CancellationToken::new();
/// let options = CallOptions::new()
///     .on_progress(|p| println!("{:?}: {} bytes", p.stage, p.bytes_received))
///     .on_cancel(|request| eprintln!("gave up on {}", request.url))
///     .with_cancellation(token.clone());
///
/// // Somewhere else: token.cancel();
/// # drop(options);
/// ```
#[derive(Default)]
pub struct CallOptions {
    pub(crate) on_progress: Option<ProgressCallback>,
    pub(crate) on_cancel: Option<CancelCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl CallOptions {
    /// No hooks, no external cancellation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Receives progress events.
    pub fn on_progress(mut self, callback: impl Fn(HttpProgress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    /// Runs when the call times out or is cancelled.
    pub fn on_cancel(mut self, callback: impl FnOnce(HttpRequest) + Send + 'static) -> Self {
        self.on_cancel = Some(Box::new(callback));
        self
    }

    /// Lets the caller cancel the call through `token`.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

impl fmt::Debug for CallOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallOptions")
            .field("on_progress", &self.on_progress.is_some())
            .field("on_cancel", &self.on_cancel.is_some())
            .field("cancellable", &self.cancellation.is_some())
            .finish()
    }
}
