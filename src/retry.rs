//! Status-code driven retries.
//!
//! The [`RetryFilter`] sits at the front of every client's filter chain. When
//! the inner chain answers with a status from the retry-eligible set, the same
//! request is sent again immediately, up to [`RetryPolicy::retry_times`]
//! additional times. Errors from the inner chain are never retried.

use crate::filter::{HttpFilter, Next};
use crate::progress::ProgressReporter;
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use crate::Result;
use async_trait::async_trait;
use http::StatusCode;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

/// How many times to resend and which statuses trigger a resend.
///
/// # Examples
///
/// ```
/// use http::StatusCode;
/// use xphttp::RetryPolicy;
///
/// let policy = RetryPolicy::new(2, [StatusCode::SERVICE_UNAVAILABLE, StatusCode::BAD_GATEWAY]);
///
/// assert!(policy.should_retry(StatusCode::BAD_GATEWAY));
/// assert!(!policy.should_retry(StatusCode::INTERNAL_SERVER_ERROR));
/// assert_eq!(policy.max_sends(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of additional sends after the first.
    pub retry_times: u32,
    /// Statuses that trigger a resend.
    pub retry_status_codes: HashSet<StatusCode>,
}

impl RetryPolicy {
    /// Creates a policy.
    pub fn new(retry_times: u32, retry_status_codes: impl IntoIterator<Item = StatusCode>) -> Self {
        Self {
            retry_times,
            retry_status_codes: retry_status_codes.into_iter().collect(),
        }
    }

    /// A policy that never resends.
    pub fn none() -> Self {
        Self::new(0, [])
    }

    /// Returns `true` if a response with `status` should be resent.
    pub fn should_retry(&self, status: StatusCode) -> bool {
        self.retry_status_codes.contains(&status)
    }

    /// Upper bound on the number of sends for one request.
    pub fn max_sends(&self) -> u64 {
        u64::from(self.retry_times) + 1
    }
}

impl Default for RetryPolicy {
    /// Three retries on `503 Service Unavailable`.
    fn default() -> Self {
        Self::new(3, [StatusCode::SERVICE_UNAVAILABLE])
    }
}

/// Resends a request while the response status is retry-eligible.
///
/// The filter is created once per client and shared by every call. Its policy
/// can be replaced between calls with [`RetryFilter::set_policy`]; each send
/// reads the policy once when it starts, so a replacement only affects sends
/// that start afterwards.
///
/// Requests are resent as-is. Bodies are reference-counted buffers, so every
/// attempt of a POST, PUT or PATCH carries the full original content.
#[derive(Debug)]
pub struct RetryFilter {
    policy: RwLock<Arc<RetryPolicy>>,
}

impl RetryFilter {
    /// Creates a filter with the given policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy: RwLock::new(Arc::new(policy)),
        }
    }

    /// The policy new sends will use.
    pub fn policy(&self) -> Arc<RetryPolicy> {
        self.policy
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the policy for sends that start after this call.
    pub fn set_policy(&self, policy: RetryPolicy) {
        *self.policy.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(policy);
    }
}

impl Default for RetryFilter {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

#[async_trait]
impl HttpFilter for RetryFilter {
    async fn send(
        &self,
        request: &HttpRequest,
        progress: &ProgressReporter,
        next: Next<'_>,
    ) -> Result<HttpResponse> {
        let policy = self.policy();
        let mut retries: u32 = 0;
        let mut response = next.run(request, progress).await?;

        while policy.should_retry(response.status) && retries < policy.retry_times {
            retries += 1;
            tracing::warn!(
                status = response.status.as_u16(),
                retry = retries,
                max_retries = policy.retry_times,
                method = %request.method,
                url = %request.url,
                "Retry-eligible status, resending request"
            );
            response = next.run(request, &progress.with_retries(retries)).await?;
        }

        response.attempts = retries as usize + 1;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Pipeline, Transport};
    use crate::params::Body;
    use crate::progress::HttpProgress;
    use crate::Error;
    use http::{HeaderMap, Method};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use url::Url;

    /// Answers with a scripted sequence of statuses and records every body it saw.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<StatusCode>>>,
        bodies: Mutex<Vec<Option<Vec<u8>>>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<StatusCode>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                bodies: Mutex::new(Vec::new()),
            })
        }

        fn statuses(codes: &[u16]) -> Arc<Self> {
            Self::new(
                codes
                    .iter()
                    .map(|c| Ok(StatusCode::from_u16(*c).unwrap()))
                    .collect(),
            )
        }

        fn sends(&self) -> usize {
            self.bodies.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: &HttpRequest, progress: &ProgressReporter) -> Result<HttpResponse> {
            self.bodies
                .lock()
                .unwrap()
                .push(request.body.as_ref().map(|b| b.bytes.to_vec()));
            progress.report(HttpProgress::new(crate::ProgressStage::Completed));
            let status = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .expect("transport called more often than scripted")?;
            Ok(HttpResponse::new(status, HeaderMap::new(), status.as_str().to_string()))
        }
    }

    fn pipeline(policy: RetryPolicy, transport: Arc<ScriptedTransport>) -> (Arc<RetryFilter>, Pipeline) {
        let filter = Arc::new(RetryFilter::new(policy));
        let filters: Vec<Arc<dyn HttpFilter>> = vec![filter.clone()];
        let pipeline = Pipeline::new(filters, transport);
        (filter, pipeline)
    }

    fn request() -> HttpRequest {
        HttpRequest::new(Method::GET, Url::parse("http://localhost/").unwrap())
    }

    #[tokio::test]
    async fn test_retries_until_non_eligible_status() {
        let transport = ScriptedTransport::statuses(&[503, 503, 200]);
        let (_, pipeline) = pipeline(
            RetryPolicy::new(2, [StatusCode::SERVICE_UNAVAILABLE]),
            transport.clone(),
        );

        let response = pipeline.send(&request(), &ProgressReporter::disabled()).await.unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.attempts, 3);
        assert_eq!(transport.sends(), 3);
    }

    #[tokio::test]
    async fn test_stops_at_first_non_eligible_status() {
        let transport = ScriptedTransport::statuses(&[503, 500, 503]);
        let (_, pipeline) = pipeline(
            RetryPolicy::new(5, [StatusCode::SERVICE_UNAVAILABLE]),
            transport.clone(),
        );

        let response = pipeline.send(&request(), &ProgressReporter::disabled()).await.unwrap();

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(transport.sends(), 2);
    }

    #[tokio::test]
    async fn test_returns_last_response_when_exhausted() {
        let transport = ScriptedTransport::statuses(&[503, 503, 503]);
        let (_, pipeline) = pipeline(
            RetryPolicy::new(2, [StatusCode::SERVICE_UNAVAILABLE]),
            transport.clone(),
        );

        let response = pipeline.send(&request(), &ProgressReporter::disabled()).await.unwrap();

        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.attempts, 3);
        assert_eq!(transport.sends(), 3);
    }

    #[tokio::test]
    async fn test_zero_retry_times_sends_once() {
        let transport = ScriptedTransport::statuses(&[503]);
        let (_, pipeline) = pipeline(
            RetryPolicy::new(0, [StatusCode::SERVICE_UNAVAILABLE]),
            transport.clone(),
        );

        let response = pipeline.send(&request(), &ProgressReporter::disabled()).await.unwrap();
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(transport.sends(), 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_retried() {
        let transport = ScriptedTransport::new(vec![
            Ok(StatusCode::SERVICE_UNAVAILABLE),
            Err(Error::Filter("connection reset".to_string())),
            Ok(StatusCode::OK),
        ]);
        let (_, pipeline) = pipeline(
            RetryPolicy::new(3, [StatusCode::SERVICE_UNAVAILABLE]),
            transport.clone(),
        );

        let err = pipeline.send(&request(), &ProgressReporter::disabled()).await.unwrap_err();
        assert!(matches!(err, Error::Filter(_)));
        assert_eq!(transport.sends(), 2);
    }

    #[tokio::test]
    async fn test_body_replayed_on_every_attempt() {
        let transport = ScriptedTransport::statuses(&[503, 503, 201]);
        let (_, pipeline) = pipeline(
            RetryPolicy::new(2, [StatusCode::SERVICE_UNAVAILABLE]),
            transport.clone(),
        );

        let mut req = HttpRequest::new(Method::POST, Url::parse("http://localhost/items").unwrap());
        req.body = Some(Body::new("payload", Some("text/plain".to_string())));
        pipeline.send(&req, &ProgressReporter::disabled()).await.unwrap();

        let bodies = transport.bodies.lock().unwrap();
        assert_eq!(bodies.len(), 3);
        assert!(bodies.iter().all(|b| b.as_deref() == Some(&b"payload"[..])));
    }

    #[tokio::test]
    async fn test_policy_change_applies_to_later_sends() {
        let transport = ScriptedTransport::statuses(&[503, 200, 503]);
        let (filter, pipeline) = pipeline(
            RetryPolicy::new(1, [StatusCode::SERVICE_UNAVAILABLE]),
            transport.clone(),
        );

        let first = pipeline.send(&request(), &ProgressReporter::disabled()).await.unwrap();
        assert_eq!(first.status, StatusCode::OK);

        filter.set_policy(RetryPolicy::none());
        let second = pipeline.send(&request(), &ProgressReporter::disabled()).await.unwrap();
        assert_eq!(second.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(transport.sends(), 3);
    }

    #[tokio::test]
    async fn test_progress_carries_retry_count() {
        let transport = ScriptedTransport::statuses(&[503, 200]);
        let (_, pipeline) = pipeline(
            RetryPolicy::new(1, [StatusCode::SERVICE_UNAVAILABLE]),
            transport,
        );

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let reporter = ProgressReporter::new(Some(Arc::new(move |p: HttpProgress| {
            sink.lock().unwrap().push(p.retries);
        })));
        pipeline.send(&request(), &reporter).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.retry_times, 3);
        assert!(policy.should_retry(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!policy.should_retry(StatusCode::BAD_GATEWAY));
    }
}
