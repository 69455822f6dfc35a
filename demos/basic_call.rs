//! Basic example demonstrating typed GET and POST requests.
//!
//! This example shows how to:
//! - Create a client with basic configuration
//! - Fill path placeholders and query parameters
//! - Send a JSON body
//! - Tell failures apart with `call`, or collapse them with `get`/`post`
//!
//! Run with: `cargo run --example basic_call`

use http::Method;
use serde::{Deserialize, Serialize};
use xphttp::{CallOptions, Client, Error, RequestParams};

#[derive(Debug, Default, Deserialize)]
#[allow(dead_code)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct NewPost {
    title: String,
    body: String,
    #[serde(rename = "userId")]
    user_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter("xphttp=debug,basic_call=info")
        .init();

    let client = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")
        .default_header("User-Agent", "xphttp-demo/0.1")
        .timeout_secs(10)
        .build()?;

    println!("=== GET Request Example ===");
    let params = RequestParams::new().segment("id", 1);
    println!("URL: {}", client.build_url("/posts/{id}", &params));

    let response = client
        .call::<Post>(Method::GET, "/posts/{id}", &params, CallOptions::new())
        .await?;

    println!("Post ID: {}", response.id);
    println!("Request latency: {:?}", response.latency);
    println!("Status code: {}", response.status);

    // Keep only the title, along with the response metadata.
    let title = response.map(|post| post.title);
    println!("Title: {} (after {} attempts)", title.data, title.attempts);
    println!();

    println!("=== Query Parameters ===");
    let params = RequestParams::new().query("userId", 1);
    let posts: Vec<Post> = client.get("/posts", &params, CallOptions::new()).await;
    println!("User 1 has {} posts", posts.len());
    println!();

    println!("=== POST Request Example ===");
    let params = RequestParams::new().json_body(&NewPost {
        title: "My New Post".to_string(),
        body: "This is the content of my new post!".to_string(),
        user_id: 1,
    })?;

    let created: Post = client.post("/posts", &params, CallOptions::new()).await;
    println!("Created post ID: {}", created.id);
    println!();

    println!("=== Failures collapse to the default ===");
    let params = RequestParams::new().segment("id", 999_999);
    let missing: Post = client.get("/posts/{id}", &params, CallOptions::new()).await;
    println!("Missing post: {:?}", missing);

    match client
        .call::<Post>(Method::GET, "/posts/{id}", &params, CallOptions::new())
        .await
    {
        Ok(response) => println!("Unexpected post: {}", response.data.title),
        Err(Error::HttpError { status, .. }) => println!("Server said {}", status),
        Err(e) => println!("Other error: {}", e),
    }

    Ok(())
}
