//! Response types.
//!
//! [`HttpResponse`] is what the transport produces and what the handler-based
//! API receives. [`Response`] wraps a decoded body together with the metadata
//! of the exchange for the typed API. [`ResponseOutcome`] is the terminal state
//! of one call.

use crate::request::HttpRequest;
use crate::Error;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use std::time::Duration;

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
    /// The response body.
    pub body: Bytes,
    /// Number of sends it took to obtain this response.
    ///
    /// `1` unless the retry filter resent the request.
    pub attempts: usize,
}

impl HttpResponse {
    /// Creates a response from its parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
            attempts: 1,
        }
    }

    /// Builds the stand-in response handed to a failure callback.
    ///
    /// There was no real response, so the status is `500` and the body
    /// carries the error text as `text/plain`.
    pub fn from_error(error: &Error) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, headers, error.to_string())
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns a header value by name, if it is valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// The declared media type, without parameters.
    ///
    /// `application/json; charset=utf-8` yields `application/json`.
    pub fn media_type(&self) -> Option<&str> {
        let content_type = self.header(header::CONTENT_TYPE.as_str())?;
        let media_type = content_type.split(';').next()?.trim();
        (!media_type.is_empty()).then_some(media_type)
    }

    /// The body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A wrapper around a successfully decoded HTTP response.
///
/// # Examples
///
/// ```no_run
/// use xphttp::{Client, RequestParams};
/// use http::Method;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), xphttp::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")
///     .build()?;
///
/// let params = RequestParams::new().segment("id", 123);
/// let response = client
///     .call::<User>(Method::GET, "/users/{id}", &params, Default::default())
///     .await?;
///
/// println!("User: {}", response.data.name);
/// println!("Request took {:?}", response.latency);
/// println!("Attempts: {}", response.attempts);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The deserialized response data.
    pub data: T,

    /// The raw response body as a string.
    pub raw_body: String,

    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// Time from building the request until the body was decoded, including
    /// every send the retry filter made.
    pub latency: Duration,

    /// The number of sends made to complete this request.
    pub attempts: usize,
}

impl<T> Response<T> {
    /// Creates a new `Response`.
    pub fn new(
        data: T,
        raw_body: String,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
        attempts: usize,
    ) -> Self {
        Self {
            data,
            raw_body,
            status,
            headers,
            latency,
            attempts,
        }
    }

    /// Maps the response data to a different type, keeping the metadata.
    ///
    /// # Examples
    ///
    /// ```
    /// # use xphttp::Response;
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let response = Response::new(
    ///     42,
    ///     "42".to_string(),
    ///     StatusCode::OK,
    ///     HeaderMap::new(),
    ///     Duration::from_millis(100),
    ///     1,
    /// );
    ///
    /// let string_response = response.map(|n| n.to_string());
    /// assert_eq!(string_response.data, "42");
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
        }
    }

    /// Returns `true` if the retry filter resent the request.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a reference to a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

/// Why a call ended on the cancel path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The configured timeout elapsed first.
    Timeout,
    /// The caller's cancellation token fired first.
    Cancelled,
}

impl From<CancelReason> for Error {
    fn from(reason: CancelReason) -> Self {
        match reason {
            CancelReason::Timeout => Error::Timeout,
            CancelReason::Cancelled => Error::Cancelled,
        }
    }
}

/// Terminal state of one dispatched call. Exactly one variant is produced.
#[derive(Debug)]
pub enum ResponseOutcome {
    /// The transport returned a response, whatever its status.
    Success(HttpResponse),
    /// The call was cancelled or timed out before the transport finished.
    Cancelled {
        /// The request that was in flight.
        request: HttpRequest,
        /// What ended the call.
        reason: CancelReason,
    },
    /// The request could not be built or the send failed.
    Failed(Error),
}

impl ResponseOutcome {
    /// Returns `true` for [`ResponseOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, ResponseOutcome::Success(_))
    }

    /// Returns `true` for [`ResponseOutcome::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ResponseOutcome::Cancelled { .. })
    }

    /// Returns `true` for [`ResponseOutcome::Failed`].
    pub fn is_failed(&self) -> bool {
        matches!(self, ResponseOutcome::Failed(_))
    }
}
