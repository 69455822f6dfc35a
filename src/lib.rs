//! # xphttp - A configurable HTTP client facade
//!
//! xphttp layers URL templates, header and query composition, a pluggable
//! transport filter chain with status-code retries, per-call timeouts and
//! cancellation, progress reporting and content-type driven decoding on top
//! of `reqwest`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use serde::{Deserialize, Serialize};
//! use xphttp::{CallOptions, Client, RequestParams};
//!
//! #[derive(Serialize)]
//! struct CreateUser {
//!     name: String,
//! }
//!
//! #[derive(Debug, Default, Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), xphttp::Error> {
//!     let client = Client::builder()
//!         .base_url("https://api.example.com")
//!         .timeout_secs(10)
//!         .retry_times(2)
//!         .default_header("User-Agent", "my-app/1.0")
//!         .build()?;
//!
//!     // GET /users/42?fields=name
//!     let params = RequestParams::new().segment("id", 42).query("fields", "name");
//!     let user: User = client.get("/users/{id}", &params, CallOptions::new()).await;
//!     println!("User: {}", user.name);
//!
//!     // POST a JSON body
//!     let params = RequestParams::new().json_body(&CreateUser {
//!         name: "Alice".to_string(),
//!     })?;
//!     let created: User = client.post("/users", &params, CallOptions::new()).await;
//!     println!("Created user with ID: {}", created.id);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Two ways to dispatch
//!
//! * **Handler-based** ([`Client::send`], [`Client::get_with`], ...): the
//!   [`ResponseHandler`] receives whatever response the server returned and
//!   decides what its status means. Timeouts and cancellations go to
//!   `on_cancel`, other failures to `on_failed`.
//! * **Typed** ([`Client::get`], [`Client::post`], ...): a 2xx body is decoded
//!   into `T` by the serializer registered for the response content type.
//!   Anything else yields `T::default()`. [`Client::call`] is the same path
//!   without the collapsing, returning a [`Result`].
//!
//! Neither style lets an error escape the client unobserved.
//!
//! ## Filters
//!
//! Every send goes through `retry filter -> custom filter -> transport`. The
//! [`RetryFilter`] resends immediately while the status is in the configured
//! retry set. Install your own [`filter::HttpFilter`] with
//! [`ClientBuilder::custom_filter`], or swap the [`filter::Transport`] for
//! testing with [`ClientBuilder::transport`].

mod client;
mod compose;
mod config;
mod error;
pub mod filter;
mod handler;
mod params;
pub mod progress;
mod request;
mod response;
pub mod retry;
pub mod serializer;
mod transport;

pub use client::{Client, ClientBuilder};
pub use compose::compose_url;
pub use config::{ClientConfig, DateFormatter, DEFAULT_RETRY_TIMES, DEFAULT_TIMEOUT};
pub use error::{Error, Result};
pub use filter::{HttpFilter, Next, Pipeline, Transport};
pub use handler::{CallOptions, CancelCallback, ResponseCallback, ResponseHandler};
pub use params::{Body, ParamValue, RequestParams};
pub use progress::{HttpProgress, ProgressCallback, ProgressReporter, ProgressStage};
pub use request::{configure_request, HttpRequest};
pub use response::{CancelReason, HttpResponse, Response, ResponseOutcome};
pub use retry::{RetryFilter, RetryPolicy};
pub use serializer::{JsonSerializer, Serializer, SerializerExt, SerializerRegistry, TextSerializer};
pub use tokio_util::sync::CancellationToken;
pub use transport::ReqwestTransport;
