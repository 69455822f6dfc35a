//! Outgoing requests and how call parameters are applied to them.

use crate::params::{Body, RequestParams};
use http::{header, Method};
use url::Url;

/// A request ready to be handed to the filter pipeline.
///
/// Headers are kept as plain strings; their legality is checked by the
/// transport when it sends, so a bad header fails that call rather than the
/// request construction. The body is shared, so every send of the same
/// request (including retries) writes identical content.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method.
    pub method: Method,
    /// The absolute request URL.
    pub url: Url,
    /// Header name/value pairs in the order they will be sent.
    pub headers: Vec<(String, String)>,
    /// The body, if any.
    pub body: Option<Body>,
}

impl HttpRequest {
    /// Creates a request with no headers and no body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Sets a header, replacing any existing header with the same name
    /// (compared case-insensitively).
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    /// Returns the value of a header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Copies the parameter headers onto `request` and attaches the body.
///
/// Parameter headers override headers already present under the same name.
/// The body's content type becomes `Content-Type` unless a header already
/// sets it.
pub fn configure_request(request: &mut HttpRequest, params: &RequestParams) {
    for (name, value) in params.headers() {
        request.set_header(name.as_str(), value.as_str());
    }

    if let Some(body) = params.body_payload() {
        if let Some(content_type) = &body.content_type {
            if request.header(header::CONTENT_TYPE.as_str()).is_none() {
                request.set_header(header::CONTENT_TYPE.as_str(), content_type.as_str());
            }
        }
        request.body = Some(body.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> HttpRequest {
        HttpRequest::new(Method::POST, Url::parse("https://api.example.com/x").unwrap())
    }

    #[test]
    fn test_params_headers_override_existing() {
        let mut req = request();
        req.set_header("User-Agent", "default/1.0");
        req.set_header("Accept", "application/json");

        let params = RequestParams::new().header("user-agent", "custom/2.0");
        configure_request(&mut req, &params);

        assert_eq!(req.header("USER-AGENT"), Some("custom/2.0"));
        assert_eq!(req.header("accept"), Some("application/json"));
        assert_eq!(req.headers.len(), 2);
    }

    #[test]
    fn test_body_attaches_content_type() {
        let mut req = request();
        let params = RequestParams::new().text_body("hello");
        configure_request(&mut req, &params);

        assert_eq!(req.body.as_ref().unwrap().bytes.as_ref(), b"hello");
        assert_eq!(req.header("content-type"), Some("text/plain; charset=utf-8"));
    }

    #[test]
    fn test_explicit_content_type_wins() {
        let mut req = request();
        let params = RequestParams::new()
            .header("Content-Type", "application/vnd.custom+json")
            .json_body(&serde_json::json!({"a": 1}))
            .unwrap();
        configure_request(&mut req, &params);

        assert_eq!(req.header("content-type"), Some("application/vnd.custom+json"));
    }

    #[test]
    fn test_invalid_header_is_not_rejected_here() {
        let mut req = request();
        let params = RequestParams::new().header("bad header", "line\nbreak");
        configure_request(&mut req, &params);
        assert_eq!(req.header("bad header"), Some("line\nbreak"));
    }
}
