//! Client configuration.

use crate::filter::HttpFilter;
use crate::retry::RetryPolicy;
use chrono::{DateTime, Utc};
use http::StatusCode;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Renders dates placed into URLs.
pub type DateFormatter = Arc<dyn Fn(&DateTime<Utc>) -> String + Send + Sync>;

/// Timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Retries applied when none are configured.
pub const DEFAULT_RETRY_TIMES: u32 = 3;

/// Settings shared by every call a client makes.
///
/// Setters consume and return the config so they chain. A config is handed
/// to [`ClientBuilder`](crate::ClientBuilder) before the first call, or edited
/// later through [`Client::reconfigure`](crate::Client::reconfigure).
///
/// # Examples
///
/// ```
/// use http::StatusCode;
/// use std::time::Duration;
/// use xphttp::ClientConfig;
///
/// let config = ClientConfig::new()
///     .with_base_url("https://api.example.com")
///     .with_default_header("Accept", "application/json")
///     .with_timeout(Duration::from_secs(10))
///     .with_retry_times(2)
///     .with_retry_status_code(StatusCode::BAD_GATEWAY);
///
/// assert_eq!(config.effective_timeout(), Some(Duration::from_secs(10)));
/// assert!(config.retry_policy().should_retry(StatusCode::SERVICE_UNAVAILABLE));
/// assert!(config.retry_policy().should_retry(StatusCode::BAD_GATEWAY));
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    base_url: String,
    default_headers: Vec<(String, String)>,
    timeout: Option<Duration>,
    retry_times: u32,
    retry_status_codes: HashSet<StatusCode>,
    date_formatter: DateFormatter,
    custom_filter: Option<Arc<dyn HttpFilter>>,
}

impl ClientConfig {
    /// Default settings: empty base URL, no default headers, a 30 second
    /// timeout, three retries on `503` and `YYYY-MM-DD` dates.
    pub fn new() -> Self {
        Self {
            base_url: String::new(),
            default_headers: Vec::new(),
            timeout: Some(DEFAULT_TIMEOUT),
            retry_times: DEFAULT_RETRY_TIMES,
            retry_status_codes: HashSet::from([StatusCode::SERVICE_UNAVAILABLE]),
            date_formatter: Arc::new(|date: &DateTime<Utc>| date.format("%Y-%m-%d").to_string()),
            custom_filter: None,
        }
    }

    /// Sets the prefix every function path is appended to.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Adds a header sent with every request, replacing an earlier default
    /// with the same name.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.default_headers
            .retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.default_headers.push((name, value.into()));
        self
    }

    /// Sets the per-call timeout. A zero duration disables the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the per-call timeout in whole seconds. Zero disables it.
    pub fn with_timeout_secs(self, secs: u64) -> Self {
        self.with_timeout(Duration::from_secs(secs))
    }

    /// Lets calls run until the transport completes or they are cancelled.
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Sets how many times a retry-eligible response is resent.
    pub fn with_retry_times(mut self, retry_times: u32) -> Self {
        self.retry_times = retry_times;
        self
    }

    /// Replaces the set of retry-eligible statuses.
    pub fn with_retry_status_codes(mut self, codes: impl IntoIterator<Item = StatusCode>) -> Self {
        self.retry_status_codes = codes.into_iter().collect();
        self
    }

    /// Adds one retry-eligible status.
    pub fn with_retry_status_code(mut self, code: StatusCode) -> Self {
        self.retry_status_codes.insert(code);
        self
    }

    /// Sets how dates in path segments and query values are rendered.
    pub fn with_date_formatter(
        mut self,
        formatter: impl Fn(&DateTime<Utc>) -> String + Send + Sync + 'static,
    ) -> Self {
        self.date_formatter = Arc::new(formatter);
        self
    }

    /// Installs a filter between the retry filter and the transport.
    pub fn with_custom_filter(mut self, filter: Arc<dyn HttpFilter>) -> Self {
        self.custom_filter = Some(filter);
        self
    }

    /// Removes the custom filter; the retry filter talks to the transport
    /// directly.
    pub fn without_custom_filter(mut self) -> Self {
        self.custom_filter = None;
        self
    }

    /// The base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The default headers, in the order they are applied.
    pub fn default_headers(&self) -> &[(String, String)] {
        &self.default_headers
    }

    /// The timeout calls actually use: `None` when unbounded or zero.
    pub fn effective_timeout(&self) -> Option<Duration> {
        self.timeout.filter(|t| !t.is_zero())
    }

    /// The retry settings as a policy for the retry filter.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_times, self.retry_status_codes.iter().copied())
    }

    /// The date formatter.
    pub fn date_formatter(&self) -> &DateFormatter {
        &self.date_formatter
    }

    /// The custom filter, if one is installed.
    pub fn custom_filter(&self) -> Option<&Arc<dyn HttpFilter>> {
        self.custom_filter.as_ref()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut codes: Vec<u16> = self.retry_status_codes.iter().map(|c| c.as_u16()).collect();
        codes.sort_unstable();
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("default_headers", &self.default_headers)
            .field("timeout", &self.timeout)
            .field("retry_times", &self.retry_times)
            .field("retry_status_codes", &codes)
            .field("custom_filter", &self.custom_filter.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new();
        assert_eq!(config.base_url(), "");
        assert_eq!(config.effective_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert!(config.custom_filter().is_none());

        let date = Utc.with_ymd_and_hms(2015, 12, 24, 23, 59, 0).unwrap();
        assert_eq!((config.date_formatter())(&date), "2015-12-24");
    }

    #[test]
    fn test_zero_timeout_means_unbounded() {
        assert_eq!(ClientConfig::new().with_timeout_secs(0).effective_timeout(), None);
        assert_eq!(ClientConfig::new().without_timeout().effective_timeout(), None);
        assert_eq!(
            ClientConfig::new().with_timeout_secs(5).effective_timeout(),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_default_header_replaces_same_name() {
        let config = ClientConfig::new()
            .with_default_header("Accept", "text/plain")
            .with_default_header("X-Id", "1")
            .with_default_header("accept", "application/json");

        assert_eq!(
            config.default_headers(),
            &[
                ("X-Id".to_string(), "1".to_string()),
                ("accept".to_string(), "application/json".to_string()),
            ]
        );
    }

    #[test]
    fn test_retry_status_codes_replace() {
        let policy = ClientConfig::new()
            .with_retry_times(1)
            .with_retry_status_codes([StatusCode::TOO_MANY_REQUESTS])
            .retry_policy();
        assert_eq!(policy.retry_times, 1);
        assert!(policy.should_retry(StatusCode::TOO_MANY_REQUESTS));
        assert!(!policy.should_retry(StatusCode::SERVICE_UNAVAILABLE));
    }
}
