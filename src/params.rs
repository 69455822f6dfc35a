//! Per-call request parameters.
//!
//! [`RequestParams`] collects everything one logical call contributes on top of
//! the client configuration: values for `{name}` placeholders in the path,
//! query parameters, headers and an optional body. The client only ever reads
//! it, so the same value can be reused for several calls.

use crate::serializer::{Serializer, SerializerExt};
use crate::{Error, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A value placed into the URL, either as a path segment or a query value.
///
/// Dates are kept as dates until the URL is composed so the client's
/// configured date formatter decides how they are rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// Literal text.
    Text(String),
    /// A timestamp, rendered through the client's date formatter.
    Date(DateTime<Utc>),
}

impl ParamValue {
    /// Renders the value as plain (not yet percent-encoded) text.
    pub fn render(&self, date_formatter: &dyn Fn(&DateTime<Utc>) -> String) -> String {
        match self {
            ParamValue::Text(text) => text.clone(),
            ParamValue::Date(date) => date_formatter(date),
        }
    }
}

impl From<DateTime<Utc>> for ParamValue {
    fn from(date: DateTime<Utc>) -> Self {
        ParamValue::Date(date)
    }
}

/// A request body together with its media type.
#[derive(Clone, PartialEq, Eq)]
pub struct Body {
    /// The encoded payload. `Bytes` clones share the buffer, so a body can be
    /// replayed by the retry filter without being consumed.
    pub bytes: Bytes,
    /// The media type sent as `Content-Type` unless a header overrides it.
    pub content_type: Option<String>,
}

impl Body {
    /// Creates a body from raw bytes.
    pub fn new(bytes: impl Into<Bytes>, content_type: Option<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type,
        }
    }

    /// Length of the payload in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("len", &self.bytes.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Path segments, query parameters, headers and body for one logical call.
///
/// # Examples
///
/// ```
/// use xphttp::RequestParams;
///
/// let params = RequestParams::new()
///     .segment("id", 42)
///     .query("active", true)
///     .header("X-Trace", "abc");
///
/// assert_eq!(params.query_params().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestParams {
    segments: BTreeMap<String, ParamValue>,
    query: Vec<(String, ParamValue)>,
    headers: BTreeMap<String, String>,
    body: Option<Body>,
}

impl RequestParams {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value substituted for `{name}` in the function path.
    pub fn segment(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.segments
            .insert(name.into(), ParamValue::Text(value.to_string()));
        self
    }

    /// Sets a date substituted for `{name}`, formatted by the client.
    pub fn date_segment(mut self, name: impl Into<String>, date: DateTime<Utc>) -> Self {
        self.segments.insert(name.into(), ParamValue::Date(date));
        self
    }

    /// Appends a query parameter. Keys may repeat; insertion order is kept.
    pub fn query(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.query
            .push((key.into(), ParamValue::Text(value.to_string())));
        self
    }

    /// Appends a date query parameter, formatted by the client.
    pub fn date_query(mut self, key: impl Into<String>, date: DateTime<Utc>) -> Self {
        self.query.push((key.into(), ParamValue::Date(date)));
        self
    }

    /// Appends several query parameters.
    pub fn queries<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: fmt::Display,
    {
        for (key, value) in params {
            self = self.query(key, value);
        }
        self
    }

    /// Sets a header for this call. Names and values are not validated here;
    /// an illegal header fails the send at the transport.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attaches a raw body.
    pub fn body(mut self, bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        self.body = Some(Body::new(bytes, Some(content_type.into())));
        self
    }

    /// Attaches a `text/plain` body.
    pub fn text_body(self, text: impl Into<String>) -> Self {
        let text: String = text.into();
        self.body(text, "text/plain; charset=utf-8")
    }

    /// Serializes `value` as JSON and attaches it as the body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationFailed`] if `value` cannot be encoded.
    pub fn json_body<T: Serialize + ?Sized>(self, value: &T) -> Result<Self> {
        let json = serde_json::to_string(value)
            .map_err(|e| Error::SerializationFailed(e.to_string()))?;
        Ok(self.body(json, "application/json"))
    }

    /// Serializes `value` with the given serializer and attaches it as the
    /// body with `content_type`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationFailed`] if the serializer rejects `value`.
    pub fn serialized_body<T: Serialize + ?Sized>(
        self,
        serializer: &dyn Serializer,
        content_type: impl Into<String>,
        value: &T,
    ) -> Result<Self> {
        let text = serializer
            .serialize_value(value)
            .map_err(|e| Error::SerializationFailed(e.to_string()))?;
        Ok(self.body(text, content_type))
    }

    /// Placeholder values keyed by placeholder name.
    pub fn segments(&self) -> &BTreeMap<String, ParamValue> {
        &self.segments
    }

    /// Query parameters in insertion order.
    pub fn query_params(&self) -> &[(String, ParamValue)] {
        &self.query
    }

    /// Per-call headers.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// The body, if one was attached.
    pub fn body_payload(&self) -> Option<&Body> {
        self.body.as_ref()
    }
}
