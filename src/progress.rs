//! Transfer progress events.

use std::fmt;
use std::sync::Arc;

/// Callback receiving progress events for one call.
pub type ProgressCallback = Arc<dyn Fn(HttpProgress) + Send + Sync>;

/// Where in the exchange a progress event was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStage {
    /// The request body is being written.
    SendingContent,
    /// The request is out; waiting for the status line and headers.
    WaitingForResponse,
    /// Status and headers arrived.
    ReceivingHeaders,
    /// Body chunks are arriving.
    ReceivingContent,
    /// The response body has been fully read.
    Completed,
}

/// A snapshot of transfer progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpProgress {
    /// Current stage.
    pub stage: ProgressStage,
    /// Request body bytes handed to the transport so far.
    pub bytes_sent: u64,
    /// Request body size, if there is a body.
    pub total_bytes_to_send: Option<u64>,
    /// Response body bytes read so far.
    pub bytes_received: u64,
    /// Response body size, when the server declared one.
    pub total_bytes_to_receive: Option<u64>,
    /// How many times the retry filter has resent this request.
    pub retries: u32,
}

impl HttpProgress {
    /// Creates an event for `stage` with all counters at zero.
    pub fn new(stage: ProgressStage) -> Self {
        Self {
            stage,
            bytes_sent: 0,
            total_bytes_to_send: None,
            bytes_received: 0,
            total_bytes_to_receive: None,
            retries: 0,
        }
    }
}

/// Forwards progress events to an optional callback.
///
/// Cheap to clone. Filters and transports receive a reporter with every send
/// and may report freely; without a callback reporting is a no-op.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    retries: u32,
}

impl ProgressReporter {
    /// Creates a reporter that forwards to `callback`.
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            retries: 0,
        }
    }

    /// A reporter that drops every event.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Returns `true` if events reach a callback.
    pub fn is_enabled(&self) -> bool {
        self.callback.is_some()
    }

    /// Returns a reporter that stamps `retries` on every event it forwards.
    pub fn with_retries(&self, retries: u32) -> Self {
        Self {
            callback: self.callback.clone(),
            retries,
        }
    }

    /// Reports one event.
    pub fn report(&self, mut progress: HttpProgress) {
        if let Some(callback) = &self.callback {
            progress.retries = self.retries;
            callback(progress);
        }
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("enabled", &self.is_enabled())
            .field("retries", &self.retries)
            .finish()
    }
}
