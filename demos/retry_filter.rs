//! Example demonstrating the retry filter and a custom filter.
//!
//! This example shows how to:
//! - Choose how often and on which statuses requests are resent
//! - Install a custom filter that sees every attempt
//! - Change the retry settings on a live client
//!
//! Run with: `cargo run --example retry_filter`

use async_trait::async_trait;
use http::{Method, StatusCode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use xphttp::{
    CallOptions, Client, Error, HttpFilter, HttpRequest, HttpResponse, Next, ProgressReporter,
    RequestParams, ResponseHandler,
};

/// Counts attempts and logs each status the server returned.
#[derive(Default)]
struct AttemptLogger {
    attempts: AtomicUsize,
}

#[async_trait]
impl HttpFilter for AttemptLogger {
    async fn send(
        &self,
        request: &HttpRequest,
        progress: &ProgressReporter,
        next: Next<'_>,
    ) -> xphttp::Result<HttpResponse> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let response = next.run(request, progress).await?;
        println!("  attempt {}: {} {}", attempt, request.url, response.status);
        Ok(response)
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("xphttp=info,retry_filter=info")
        .init();

    let logger = Arc::new(AttemptLogger::default());

    // httpbin answers /status/{code} with that status.
    let client = Client::builder()
        .base_url("https://httpbin.org")
        .retry_times(2)
        .retry_status_codes([StatusCode::SERVICE_UNAVAILABLE, StatusCode::BAD_GATEWAY])
        .custom_filter(logger.clone())
        .build()?;

    println!("=== 503 is retried twice ===");
    let params = RequestParams::new().segment("code", 503);
    client
        .send(
            Method::GET,
            "/status/{code}",
            &params,
            ResponseHandler::new(|response| {
                println!("Handler got {} after {} sends", response.status, response.attempts)
            }),
        )
        .await;
    println!();

    println!("=== 500 is not in the retry set ===");
    let params = RequestParams::new().segment("code", 500);
    client
        .get_with(
            "/status/{code}",
            &params,
            ResponseHandler::new(|response| println!("Handler got {}", response.status)),
        )
        .await;
    println!();

    println!("=== Retries disabled at runtime ===");
    client.reconfigure(|config| config.with_retry_times(0));
    let params = RequestParams::new().segment("code", 503);
    let result = client
        .call::<serde_json::Value>(Method::GET, "/status/{code}", &params, CallOptions::new())
        .await;
    if let Err(e) = result {
        println!("Typed call failed: {}", e);
    }

    println!();
    println!("Total attempts: {}", logger.attempts.load(Ordering::SeqCst));

    Ok(())
}
