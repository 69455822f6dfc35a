//! The default [`Transport`], backed by `reqwest`.

use crate::filter::Transport;
use crate::progress::{HttpProgress, ProgressReporter, ProgressStage};
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use crate::{Error, Result};
use async_trait::async_trait;
use futures_util::StreamExt;

/// Upper bound on the body buffer reserved up front from `Content-Length`.
const MAX_PREALLOCATE: u64 = 1 << 20;

/// Sends requests with a shared `reqwest::Client` and reads bodies as a
/// stream so progress can be reported per chunk.
///
/// The underlying client keeps a connection pool; clone the transport (or
/// share it behind an `Arc`) instead of building new ones.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport with a default `reqwest::Client`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] if the TLS backend cannot be
    /// initialised.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
        })?;
        Ok(Self { client })
    }

    /// Wraps an already configured `reqwest::Client`.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest, progress: &ProgressReporter) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let total_to_send = request.body.as_ref().map(|b| b.len() as u64);
        if let Some(body) = &request.body {
            builder = builder.body(body.bytes.clone());
            progress.report(HttpProgress {
                total_bytes_to_send: total_to_send,
                ..HttpProgress::new(ProgressStage::SendingContent)
            });
        }

        let bytes_sent = total_to_send.unwrap_or(0);
        progress.report(HttpProgress {
            bytes_sent,
            total_bytes_to_send: total_to_send,
            ..HttpProgress::new(ProgressStage::WaitingForResponse)
        });
        let response = builder.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let total_to_receive = response.content_length();
        progress.report(HttpProgress {
            bytes_sent,
            total_bytes_to_send: total_to_send,
            total_bytes_to_receive: total_to_receive,
            ..HttpProgress::new(ProgressStage::ReceivingHeaders)
        });

        tracing::debug!(
            status = status.as_u16(),
            url = %request.url,
            content_length = ?total_to_receive,
            "Reading response body"
        );

        let mut body = Vec::with_capacity(total_to_receive.unwrap_or(0).min(MAX_PREALLOCATE) as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            body.extend_from_slice(&chunk);
            progress.report(HttpProgress {
                bytes_sent,
                total_bytes_to_send: total_to_send,
                bytes_received: body.len() as u64,
                total_bytes_to_receive: total_to_receive,
                ..HttpProgress::new(ProgressStage::ReceivingContent)
            });
        }

        progress.report(HttpProgress {
            bytes_sent,
            total_bytes_to_send: total_to_send,
            bytes_received: body.len() as u64,
            total_bytes_to_receive: total_to_receive,
            ..HttpProgress::new(ProgressStage::Completed)
        });

        Ok(HttpResponse::new(status, headers, body))
    }
}
