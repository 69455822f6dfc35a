//! HTTP client facade and dispatch engine.
//!
//! The [`Client`] type is the main entry point for making HTTP requests.
//! Use [`ClientBuilder`] to configure and create clients.
//!
//! Every call follows the same path: the function path is expanded against
//! the base URL and [`RequestParams`], default and per-call headers and the
//! body are applied, and the request is sent through the filter pipeline
//! (`retry filter -> custom filter -> transport`) while racing the configured
//! timeout and the caller's cancellation token. The call then ends in exactly
//! one [`ResponseOutcome`].

use crate::compose::compose_url;
use crate::config::ClientConfig;
use crate::filter::{HttpFilter, Pipeline, Transport};
use crate::handler::{CallOptions, ResponseHandler};
use crate::params::RequestParams;
use crate::progress::ProgressReporter;
use crate::request::{configure_request, HttpRequest};
use crate::response::{CancelReason, HttpResponse, Response, ResponseOutcome};
use crate::retry::RetryFilter;
use crate::serializer::{Serializer, SerializerExt, SerializerRegistry};
use crate::transport::ReqwestTransport;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

/// A configurable HTTP client.
///
/// The client is cheap to clone and designed to be reused: clones share one
/// transport (and its connection pool), one retry filter and one
/// configuration. Calls may run concurrently; each gets its own timeout and
/// cancellation.
///
/// # Examples
///
/// ```no_run
/// use serde::Deserialize;
/// use xphttp::{CallOptions, Client, RequestParams, ResponseHandler};
///
/// #[derive(Debug, Default, Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), xphttp::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")
///     .retry_times(2)
///     .build()?;
///
/// // Typed: decoded by the serializer matching the response content type,
/// // or `User::default()` if the call did not succeed.
/// let params = RequestParams::new().segment("id", 42);
/// let user: User = client.get("/users/{id}", &params, CallOptions::new()).await;
/// println!("User: {}", user.name);
///
/// // Handler-based: the handler sees the raw response.
/// client
///     .get_with(
///         "/users/{id}",
///         &params,
///         ResponseHandler::new(|response| println!("status {}", response.status))
///             .on_failed(|response| eprintln!("failed: {}", response.text())),
///     )
///     .await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    retry_filter: Arc<RetryFilter>,
    serializers: SerializerRegistry,
    state: RwLock<Arc<ClientState>>,
}

/// Configuration and the pipeline built from it, swapped as one unit.
struct ClientState {
    config: ClientConfig,
    pipeline: Pipeline,
}

impl ClientInner {
    fn assemble(&self, config: ClientConfig) -> ClientState {
        assemble(&self.transport, &self.retry_filter, config)
    }
}

/// Points the shared retry filter at the new policy and rebuilds the chain
/// around it.
fn assemble(
    transport: &Arc<dyn Transport>,
    retry_filter: &Arc<RetryFilter>,
    config: ClientConfig,
) -> ClientState {
    retry_filter.set_policy(config.retry_policy());

    let mut filters: Vec<Arc<dyn HttpFilter>> = vec![retry_filter.clone()];
    if let Some(custom) = config.custom_filter() {
        filters.push(custom.clone());
    }

    ClientState {
        pipeline: Pipeline::new(filters, transport.clone()),
        config,
    }
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use xphttp::Client;
    ///
    /// # fn example() -> Result<(), xphttp::Error> {
    /// let client = Client::builder()
    ///     .base_url("https://api.example.com")
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client from a finished configuration, using the default
    /// transport and serializers.
    ///
    /// # Errors
    ///
    /// Returns an error if the default transport cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        ClientBuilder::new().config(config).build()
    }

    fn state(&self) -> Arc<ClientState> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// A snapshot of the current configuration.
    pub fn config(&self) -> ClientConfig {
        self.state().config.clone()
    }

    /// Changes the configuration after construction.
    ///
    /// `update` receives a copy of the current configuration and returns the
    /// new one. The retry policy and the filter chain are rebuilt from it and
    /// swapped in as a whole; the transport and the retry filter instance are
    /// kept. Calls already in flight finish with the configuration they
    /// started with.
    ///
    /// `update` runs without any lock held, so it may read the client.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use http::StatusCode;
    /// use xphttp::Client;
    ///
    /// # fn example() -> Result<(), xphttp::Error> {
    /// let client = Client::builder().base_url("https://api.example.com").build()?;
    ///
    /// client.reconfigure(|config| {
    ///     config
    ///         .with_retry_times(5)
    ///         .with_retry_status_code(StatusCode::TOO_MANY_REQUESTS)
    /// });
    /// # Ok(())
    /// # }
    /// ```
    pub fn reconfigure(&self, update: impl FnOnce(ClientConfig) -> ClientConfig) {
        let config = update(self.config());
        tracing::debug!(config = ?config, "Applying client configuration");

        let mut state = self
            .inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *state = Arc::new(self.inner.assemble(config));
    }

    /// The serializers used by typed calls.
    pub fn serializers(&self) -> &SerializerRegistry {
        &self.inner.serializers
    }

    /// Resolves the serializer for a media type (see
    /// [`SerializerRegistry::get_serializer`]).
    pub fn serializer_for(&self, media_type: Option<&str>) -> Arc<dyn Serializer> {
        self.inner.serializers.get_serializer(media_type)
    }

    /// Expands `path` against the base URL and `params` without sending
    /// anything.
    pub fn build_url(&self, path: &str, params: &RequestParams) -> String {
        let state = self.state();
        compose_url(
            state.config.base_url(),
            path,
            params,
            state.config.date_formatter().as_ref(),
        )
    }

    /// Builds the request a call would send.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the expanded URL is not absolute and
    /// valid.
    pub fn build_request(
        &self,
        method: Method,
        path: &str,
        params: &RequestParams,
    ) -> Result<HttpRequest> {
        build_request(&self.state().config, method, path, params)
    }

    /// Runs one call through the pipeline and reports how it ended.
    ///
    /// This is the engine under both dispatch styles. It never fails:
    /// construction errors and send errors become
    /// [`ResponseOutcome::Failed`], an elapsed timeout or a fired
    /// `cancellation` token becomes [`ResponseOutcome::Cancelled`], and any
    /// response the transport returns, whatever its status, becomes
    /// [`ResponseOutcome::Success`].
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        params: &RequestParams,
        progress: &ProgressReporter,
        cancellation: Option<&CancellationToken>,
    ) -> ResponseOutcome {
        let state = self.state();

        let request = match build_request(&state.config, method, path, params) {
            Ok(request) => request,
            Err(error) => {
                tracing::warn!(error = %error, path = %path, "Failed to build request");
                return ResponseOutcome::Failed(error);
            }
        };

        let timeout = state.config.effective_timeout();
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            timeout_ms = timeout.map(millis),
            "Executing HTTP request"
        );

        let start_time = Instant::now();
        let result = {
            let deadline = async {
                match timeout {
                    Some(timeout) => tokio::time::sleep(timeout).await,
                    None => std::future::pending().await,
                }
            };
            let cancelled = async {
                match cancellation {
                    Some(token) => token.cancelled().await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                biased;
                () = cancelled => Err(CancelReason::Cancelled),
                () = deadline => Err(CancelReason::Timeout),
                result = state.pipeline.send(&request, progress) => Ok(result),
            }
        };
        let latency = start_time.elapsed();

        match result {
            Ok(Ok(response)) => {
                tracing::info!(
                    status = response.status.as_u16(),
                    latency_ms = millis(latency),
                    attempts = response.attempts,
                    "Received HTTP response"
                );
                ResponseOutcome::Success(response)
            }
            Ok(Err(error)) => {
                tracing::warn!(
                    error = %error,
                    method = %request.method,
                    url = %request.url,
                    "Request failed"
                );
                ResponseOutcome::Failed(error)
            }
            Err(reason) => {
                tracing::warn!(
                    reason = ?reason,
                    latency_ms = millis(latency),
                    method = %request.method,
                    url = %request.url,
                    "Request cancelled"
                );
                ResponseOutcome::Cancelled { request, reason }
            }
        }
    }

    /// Sends a request and routes the outcome to `handler`.
    ///
    /// * A received response (any status) goes to the handle callback.
    /// * A timeout or cancellation goes to `on_cancel`, if set.
    /// * Anything else goes to `on_failed`, if set, as a synthetic response
    ///   whose body is the error text.
    ///
    /// Nothing is returned and nothing escapes: without the matching optional
    /// callback a cancelled or failed call is dropped silently.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        params: &RequestParams,
        handler: ResponseHandler,
    ) {
        let ResponseHandler {
            handle,
            on_progress,
            on_cancel,
            on_failed,
            cancellation,
        } = handler;
        let progress = ProgressReporter::new(on_progress);

        match self
            .execute(method, path, params, &progress, cancellation.as_ref())
            .await
        {
            ResponseOutcome::Success(response) => handle(response),
            ResponseOutcome::Cancelled { request, .. } => {
                if let Some(on_cancel) = on_cancel {
                    on_cancel(request);
                }
            }
            ResponseOutcome::Failed(error) => match on_failed {
                Some(on_failed) => on_failed(HttpResponse::from_error(&error)),
                None => tracing::debug!(error = %error, "Dropping failure without a failure callback"),
            },
        }
    }

    /// Like [`Client::send`], but runs the call on the Tokio runtime and
    /// returns immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(
        &self,
        method: Method,
        path: impl Into<String>,
        params: RequestParams,
        handler: ResponseHandler,
    ) -> JoinHandle<()> {
        let client = self.clone();
        let path = path.into();
        tokio::spawn(async move { client.send(method, &path, &params, handler).await })
    }

    /// Sends a GET request and routes the outcome to `handler`.
    pub async fn get_with(&self, path: &str, params: &RequestParams, handler: ResponseHandler) {
        self.send(Method::GET, path, params, handler).await
    }

    /// Sends a POST request and routes the outcome to `handler`.
    pub async fn post_with(&self, path: &str, params: &RequestParams, handler: ResponseHandler) {
        self.send(Method::POST, path, params, handler).await
    }

    /// Sends a PUT request and routes the outcome to `handler`.
    pub async fn put_with(&self, path: &str, params: &RequestParams, handler: ResponseHandler) {
        self.send(Method::PUT, path, params, handler).await
    }

    /// Sends a DELETE request and routes the outcome to `handler`.
    pub async fn delete_with(&self, path: &str, params: &RequestParams, handler: ResponseHandler) {
        self.send(Method::DELETE, path, params, handler).await
    }

    /// Sends a PATCH request and routes the outcome to `handler`.
    pub async fn patch_with(&self, path: &str, params: &RequestParams, handler: ResponseHandler) {
        self.send(Method::PATCH, path, params, handler).await
    }

    /// Makes a typed request and reports every failure.
    ///
    /// On a 2xx response the body is decoded by the serializer registered for
    /// the response's `Content-Type` (or the default serializer).
    ///
    /// # Errors
    ///
    /// * [`Error::HttpError`] for a non-2xx status; no decoding is attempted.
    /// * [`Error::DeserializationFailed`] if the body does not decode into `T`.
    /// * [`Error::Timeout`] or [`Error::Cancelled`] after the `on_cancel`
    ///   hook of `options` has run.
    /// * Any construction or transport error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use http::Method;
    /// use serde::Deserialize;
    /// use xphttp::{CallOptions, Client, Error, RequestParams};
    ///
    /// #[derive(Deserialize)]
    /// struct SearchResults { results: Vec<String> }
    ///
    /// # async fn example() -> Result<(), Error> {
    /// let client = Client::builder().base_url("https://api.example.com").build()?;
    ///
    /// let params = RequestParams::new().query("q", "rust");
    /// match client
    ///     .call::<SearchResults>(Method::GET, "/search", &params, CallOptions::new())
    ///     .await
    /// {
    ///     Ok(response) => println!("Found {} results", response.data.results.len()),
    ///     Err(Error::HttpError { status, .. }) => eprintln!("HTTP {}", status),
    ///     Err(e) => eprintln!("{}", e),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn call<T>(
        &self,
        method: Method,
        path: &str,
        params: &RequestParams,
        options: CallOptions,
    ) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        let CallOptions {
            on_progress,
            on_cancel,
            cancellation,
        } = options;
        let progress = ProgressReporter::new(on_progress);
        let start_time = Instant::now();

        match self
            .execute(method, path, params, &progress, cancellation.as_ref())
            .await
        {
            ResponseOutcome::Success(response) => self.decode(response, start_time.elapsed()),
            ResponseOutcome::Cancelled { request, reason } => {
                if let Some(on_cancel) = on_cancel {
                    on_cancel(request);
                }
                Err(reason.into())
            }
            ResponseOutcome::Failed(error) => Err(error),
        }
    }

    /// Decodes a received response for the typed path.
    fn decode<T>(&self, response: HttpResponse, latency: Duration) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        let status = response.status;
        if !status.is_success() {
            return Err(Error::HttpError {
                status,
                raw_response: response.text(),
                headers: response.headers,
            });
        }

        let raw_body = match std::str::from_utf8(&response.body) {
            Ok(text) => text.to_string(),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    media_type = ?response.media_type(),
                    "Response body is not valid UTF-8"
                );

                return Err(Error::DeserializationFailed {
                    raw_response: response.text(),
                    serde_error: e.to_string(),
                    status,
                });
            }
        };
        let serializer = self.inner.serializers.get_serializer(response.media_type());

        match serializer.deserialize_value::<T>(&raw_body) {
            Ok(data) => Ok(Response::new(
                data,
                raw_body,
                status,
                response.headers,
                latency,
                response.attempts,
            )),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    media_type = ?response.media_type(),
                    raw_response = %raw_body,
                    "Failed to deserialize response"
                );

                Err(Error::DeserializationFailed {
                    raw_response: raw_body,
                    serde_error: e.to_string(),
                    status,
                })
            }
        }
    }

    /// Makes a typed request, returning `T::default()` for every failure.
    ///
    /// A non-2xx status, a timeout or cancellation (after `on_cancel` ran), a
    /// transport error and a body that does not decode all yield the default
    /// value. Use [`Client::call`] to tell these apart.
    pub async fn call_or_default<T>(
        &self,
        method: Method,
        path: &str,
        params: &RequestParams,
        options: CallOptions,
    ) -> T
    where
        T: DeserializeOwned + Default,
    {
        match self.call::<T>(method, path, params, options).await {
            Ok(response) => response.data,
            Err(error) => {
                match &error {
                    Error::DeserializationFailed { .. } => {
                        tracing::error!(error = %error, "Returning default value after decode failure")
                    }
                    _ => tracing::debug!(error = %error, "Returning default value"),
                }
                T::default()
            }
        }
    }

    /// Makes a typed GET request. See [`Client::call_or_default`].
    pub async fn get<T>(&self, path: &str, params: &RequestParams, options: CallOptions) -> T
    where
        T: DeserializeOwned + Default,
    {
        self.call_or_default(Method::GET, path, params, options).await
    }

    /// Makes a typed POST request. See [`Client::call_or_default`].
    pub async fn post<T>(&self, path: &str, params: &RequestParams, options: CallOptions) -> T
    where
        T: DeserializeOwned + Default,
    {
        self.call_or_default(Method::POST, path, params, options).await
    }

    /// Makes a typed PUT request. See [`Client::call_or_default`].
    pub async fn put<T>(&self, path: &str, params: &RequestParams, options: CallOptions) -> T
    where
        T: DeserializeOwned + Default,
    {
        self.call_or_default(Method::PUT, path, params, options).await
    }

    /// Makes a typed DELETE request. See [`Client::call_or_default`].
    pub async fn delete<T>(&self, path: &str, params: &RequestParams, options: CallOptions) -> T
    where
        T: DeserializeOwned + Default,
    {
        self.call_or_default(Method::DELETE, path, params, options).await
    }

    /// Makes a typed PATCH request. See [`Client::call_or_default`].
    pub async fn patch<T>(&self, path: &str, params: &RequestParams, options: CallOptions) -> T
    where
        T: DeserializeOwned + Default,
    {
        self.call_or_default(Method::PATCH, path, params, options).await
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Client")
            .field("config", &state.config)
            .field("pipeline", &state.pipeline)
            .field("serializers", &self.inner.serializers)
            .finish_non_exhaustive()
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Composes the URL, then applies default headers and call parameters.
fn build_request(
    config: &ClientConfig,
    method: Method,
    path: &str,
    params: &RequestParams,
) -> Result<HttpRequest> {
    let url = compose_url(config.base_url(), path, params, config.date_formatter().as_ref());
    let url = Url::parse(&url)?;

    let mut request = HttpRequest::new(method, url);
    for (name, value) in config.default_headers() {
        request.set_header(name.as_str(), value.as_str());
    }
    configure_request(&mut request, params);

    Ok(request)
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use http::StatusCode;
/// use std::time::Duration;
/// use xphttp::ClientBuilder;
///
/// # fn example() -> Result<(), xphttp::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com")
///     .timeout(Duration::from_secs(10))
///     .retry_times(2)
///     .retry_status_codes([StatusCode::SERVICE_UNAVAILABLE, StatusCode::BAD_GATEWAY])
///     .default_header("User-Agent", "my-app/1.0")
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    config: ClientConfig,
    serializers: SerializerRegistry,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::new(),
            serializers: SerializerRegistry::new(),
            transport: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the base URL every function path is appended to.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config = self.config.with_base_url(url);
        self
    }

    /// Adds a default header that will be included in all requests.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config = self.config.with_default_header(name, value);
        self
    }

    /// Sets the per-call timeout. A zero duration disables it.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_timeout(timeout);
        self
    }

    /// Sets the per-call timeout in whole seconds. Zero disables it.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config = self.config.with_timeout_secs(secs);
        self
    }

    /// Disables the per-call timeout.
    pub fn no_timeout(mut self) -> Self {
        self.config = self.config.without_timeout();
        self
    }

    /// Sets how many times a retry-eligible response is resent.
    pub fn retry_times(mut self, retry_times: u32) -> Self {
        self.config = self.config.with_retry_times(retry_times);
        self
    }

    /// Replaces the set of retry-eligible statuses.
    pub fn retry_status_codes(mut self, codes: impl IntoIterator<Item = StatusCode>) -> Self {
        self.config = self.config.with_retry_status_codes(codes);
        self
    }

    /// Adds one retry-eligible status.
    pub fn retry_status_code(mut self, code: StatusCode) -> Self {
        self.config = self.config.with_retry_status_code(code);
        self
    }

    /// Sets how dates in path segments and query values are rendered.
    pub fn date_formatter(
        mut self,
        formatter: impl Fn(&DateTime<Utc>) -> String + Send + Sync + 'static,
    ) -> Self {
        self.config = self.config.with_date_formatter(formatter);
        self
    }

    /// Installs a filter between the retry filter and the transport.
    pub fn custom_filter(mut self, filter: Arc<dyn HttpFilter>) -> Self {
        self.config = self.config.with_custom_filter(filter);
        self
    }

    /// Registers a serializer for a response media type.
    pub fn serializer(mut self, media_type: &str, serializer: Arc<dyn Serializer>) -> Self {
        self.serializers.register(media_type, serializer);
        self
    }

    /// Sets the serializer used for unknown or missing media types.
    pub fn default_serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializers.set_default(serializer);
        self
    }

    /// Replaces the transport at the end of the filter chain.
    ///
    /// By default a [`ReqwestTransport`] is created.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the default transport cannot be created.
    pub fn build(self) -> Result<Client> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };

        let retry_filter = Arc::new(RetryFilter::default());
        let state = assemble(&transport, &retry_filter, self.config);

        let inner = ClientInner {
            transport,
            retry_filter,
            serializers: self.serializers,
            state: RwLock::new(Arc::new(state)),
        };

        Ok(Client {
            inner: Arc::new(inner),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }
}
