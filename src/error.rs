//! Error types for HTTP API calls.
//!
//! Every failure the request pipeline can observe is described by [`Error`].
//! The dispatch engine never lets these escape: the handler-based API routes
//! them to callbacks and the typed verb helpers collapse them to a default
//! value. [`Client::call`](crate::Client::call) is the one entry point that
//! hands them back to the caller untouched.

use http::{HeaderMap, StatusCode};

/// The main error type for HTTP API calls.
///
/// # Examples
///
/// ```no_run
/// use xphttp::{Client, Error, RequestParams};
/// use http::Method;
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")
///     .build()?;
///
/// let params = RequestParams::new();
/// match client
///     .call::<serde_json::Value>(Method::GET, "/endpoint", &params, Default::default())
///     .await
/// {
///     Ok(response) => println!("Success: {:?}", response.data),
///     Err(Error::DeserializationFailed { raw_response, serde_error, .. }) => {
///         eprintln!("Failed to deserialize. Raw response: {}", raw_response);
///         eprintln!("Serializer error: {}", serde_error);
///     }
///     Err(Error::HttpError { status, .. }) => eprintln!("HTTP error {}", status),
///     Err(e) if e.is_cancellation() => eprintln!("Cancelled: {}", e),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level error occurred (connection failed, DNS lookup failed,
    /// an illegal header was handed to the transport, etc.).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The call did not complete within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// The call was cancelled through its cancellation token.
    #[error("Request cancelled")]
    Cancelled,

    /// Failed to deserialize the response body into the expected type.
    ///
    /// # Fields
    ///
    /// * `raw_response` - The raw response body as a string
    /// * `serde_error` - The error message from the serializer
    /// * `status` - The HTTP status code of the response
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serializer error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// The server returned a non-2xx HTTP status code.
    ///
    /// Only produced by the typed path; the handler path passes the
    /// response through and lets the handler judge the status.
    #[error("HTTP error {status}")]
    HttpError {
        /// The HTTP status code
        status: StatusCode,
        /// The raw response body
        raw_response: String,
        /// The response headers
        headers: HeaderMap,
    },

    /// Invalid configuration was provided.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Failed to serialize the request body.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// The composed request URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A custom transport filter rejected or failed the send.
    #[error("Filter error: {0}")]
    Filter(String),
}

impl Error {
    /// Returns `true` for the outcomes routed to the cancel path: an elapsed
    /// timeout or an explicit cancellation.
    ///
    /// # Examples
    ///
    /// ```
    /// use xphttp::Error;
    ///
    /// assert!(Error::Timeout.is_cancellation());
    /// assert!(Error::Cancelled.is_cancellation());
    /// assert!(!Error::Filter("boom".into()).is_cancellation());
    /// ```
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Timeout | Error::Cancelled)
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::HttpError { status, .. } => Some(*status),
            Error::DeserializationFailed { status, .. } => Some(*status),
            Error::Network(e) => e.status(),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::HttpError { raw_response, .. } => Some(raw_response),
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

/// A specialized `Result` type for HTTP API calls.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_raw_response() {
        let err = Error::HttpError {
            status: StatusCode::SERVICE_UNAVAILABLE,
            raw_response: "busy".to_string(),
            headers: HeaderMap::new(),
        };
        assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(err.raw_response(), Some("busy"));
        assert!(!err.is_cancellation());

        assert_eq!(Error::Timeout.status(), None);
        assert_eq!(Error::Cancelled.raw_response(), None);
    }

    #[test]
    fn test_display() {
        let err = Error::DeserializationFailed {
            raw_response: "nope".to_string(),
            serde_error: "expected value".to_string(),
            status: StatusCode::OK,
        };
        assert_eq!(
            err.to_string(),
            "Failed to deserialize response (status 200 OK): expected value"
        );
        assert_eq!(Error::Timeout.to_string(), "Request timed out");
    }
}
