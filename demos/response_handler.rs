//! Example demonstrating the handler-based API.
//!
//! This example shows how to:
//! - Route responses, cancellations and failures to callbacks
//! - Follow progress while a body downloads
//! - Cancel a running call from another task
//!
//! Run with: `cargo run --example response_handler`

use http::Method;
use std::time::Duration;
use xphttp::{CancellationToken, Client, Error, RequestParams, ResponseHandler};

fn handler(label: &'static str) -> ResponseHandler {
    ResponseHandler::new(move |response| {
        println!("[{}] {} ({} bytes)", label, response.status, response.body.len())
    })
    .on_cancel(move |request| println!("[{}] cancelled: {}", label, request.url))
    .on_failed(move |response| println!("[{}] failed: {}", label, response.text()))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("xphttp=info,response_handler=info")
        .init();

    let client = Client::builder()
        .base_url("https://httpbin.org")
        .timeout_secs(3)
        .build()?;

    println!("=== Progress ===");
    let params = RequestParams::new().segment("n", 16 * 1024);
    client
        .get_with(
            "/bytes/{n}",
            &params,
            handler("bytes").on_progress(|p| {
                println!(
                    "  {:?}: {} of {:?} bytes received",
                    p.stage, p.bytes_received, p.total_bytes_to_receive
                )
            }),
        )
        .await;
    println!();

    println!("=== Timeout goes to on_cancel ===");
    let params = RequestParams::new().segment("secs", 10);
    client.get_with("/delay/{secs}", &params, handler("slow")).await;
    println!();

    println!("=== Cancelling a spawned call ===");
    let token = CancellationToken::new();
    let task = client.spawn(
        Method::GET,
        "/delay/{secs}",
        RequestParams::new().segment("secs", 2),
        handler("spawned").with_cancellation(token.clone()),
    );
    tokio::time::sleep(Duration::from_millis(500)).await;
    token.cancel();
    let _ = task.await;
    println!();

    println!("=== Unreachable host goes to on_failed ===");
    let offline = Client::builder().base_url("http://127.0.0.1:1").build()?;
    offline
        .get_with("/anything", &RequestParams::new(), handler("offline"))
        .await;

    Ok(())
}
