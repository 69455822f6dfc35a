//! Content-type keyed serializers.
//!
//! The typed dispatch path picks a [`Serializer`] from the
//! [`SerializerRegistry`] using the media type the *response* declares, not
//! the type the caller expects. Serializers speak in terms of
//! [`serde_json::Value`] trees so they stay object safe; the generic
//! conversions live on [`SerializerExt`].

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Media type served by [`JsonSerializer`].
pub const APPLICATION_JSON: &str = "application/json";

/// Media type served by [`TextSerializer`].
pub const TEXT_PLAIN: &str = "text/plain";

/// Error raised by a serializer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct SerializerError(pub String);

impl From<serde_json::Error> for SerializerError {
    fn from(err: serde_json::Error) -> Self {
        SerializerError(err.to_string())
    }
}

/// A codec for one family of media types.
///
/// # Examples
///
/// ```
/// use serde_json::Value;
/// use xphttp::serializer::{Serializer, SerializerError};
///
/// /// Reads `key=value` lines into a JSON object.
/// struct LinesSerializer;
///
/// impl Serializer for LinesSerializer {
///     fn serialize(&self, value: &Value) -> Result<String, SerializerError> {
///         let object = value
///             .as_object()
///             .ok_or_else(|| SerializerError("expected an object".into()))?;
///         Ok(object
///             .iter()
///             .map(|(k, v)| format!("{}={}", k, v.as_str().unwrap_or_default()))
///             .collect::<Vec<_>>()
///             .join("\n"))
///     }
///
///     fn deserialize(&self, text: &str) -> Result<Value, SerializerError> {
///         let mut object = serde_json::Map::new();
///         for line in text.lines() {
///             if let Some((k, v)) = line.split_once('=') {
///                 object.insert(k.to_string(), Value::String(v.to_string()));
///             }
///         }
///         Ok(Value::Object(object))
///     }
/// }
/// ```
pub trait Serializer: Send + Sync {
    /// Encodes a value tree as text.
    fn serialize(&self, value: &Value) -> Result<String, SerializerError>;

    /// Decodes text into a value tree.
    fn deserialize(&self, text: &str) -> Result<Value, SerializerError>;
}

/// Typed conversions on top of any [`Serializer`].
pub trait SerializerExt {
    /// Serializes any `Serialize` value.
    fn serialize_value<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, SerializerError>;

    /// Deserializes text into `T`.
    fn deserialize_value<T: DeserializeOwned>(&self, text: &str) -> Result<T, SerializerError>;
}

impl<S: Serializer + ?Sized> SerializerExt for S {
    fn serialize_value<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, SerializerError> {
        let tree = serde_json::to_value(value)?;
        self.serialize(&tree)
    }

    fn deserialize_value<T: DeserializeOwned>(&self, text: &str) -> Result<T, SerializerError> {
        let tree = self.deserialize(text)?;
        Ok(serde_json::from_value(tree)?)
    }
}

/// JSON codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, value: &Value) -> Result<String, SerializerError> {
        Ok(serde_json::to_string(value)?)
    }

    fn deserialize(&self, text: &str) -> Result<Value, SerializerError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Plain text codec. The body becomes a JSON string, so it decodes into
/// `String`; serializing a string writes it verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextSerializer;

impl Serializer for TextSerializer {
    fn serialize(&self, value: &Value) -> Result<String, SerializerError> {
        match value {
            Value::String(text) => Ok(text.clone()),
            other => Ok(other.to_string()),
        }
    }

    fn deserialize(&self, text: &str) -> Result<Value, SerializerError> {
        Ok(Value::String(text.to_string()))
    }
}

/// Maps media types to serializers, falling back to a default.
///
/// Lookups ignore case and media type parameters, so
/// `Application/JSON; charset=utf-8` finds the `application/json` entry.
/// A missing or unknown media type always resolves to the default serializer.
///
/// # Examples
///
/// ```
/// use xphttp::serializer::{SerializerExt, SerializerRegistry};
///
/// let registry = SerializerRegistry::new();
/// let n: u32 = registry
///     .get_serializer(Some("application/json"))
///     .deserialize_value("7")
///     .unwrap();
/// assert_eq!(n, 7);
///
/// // Unknown media types fall back to the default (JSON).
/// let v: Vec<u8> = registry
///     .get_serializer(Some("application/x-unknown"))
///     .deserialize_value("[1,2]")
///     .unwrap();
/// assert_eq!(v, vec![1, 2]);
/// ```
#[derive(Clone)]
pub struct SerializerRegistry {
    serializers: HashMap<String, Arc<dyn Serializer>>,
    default: Arc<dyn Serializer>,
}

impl SerializerRegistry {
    /// Creates a registry with JSON (`application/json`, `text/json`) and
    /// plain text entries, defaulting to JSON.
    pub fn new() -> Self {
        let json: Arc<dyn Serializer> = Arc::new(JsonSerializer);
        let mut registry = Self {
            serializers: HashMap::new(),
            default: json.clone(),
        };
        registry.register(APPLICATION_JSON, json.clone());
        registry.register("text/json", json);
        registry.register(TEXT_PLAIN, Arc::new(TextSerializer));
        registry
    }

    /// Registers (or replaces) the serializer for a media type.
    pub fn register(&mut self, media_type: &str, serializer: Arc<dyn Serializer>) {
        self.serializers
            .insert(normalize_media_type(media_type), serializer);
    }

    /// Replaces the fallback serializer.
    pub fn set_default(&mut self, serializer: Arc<dyn Serializer>) {
        self.default = serializer;
    }

    /// Resolves the serializer for `media_type`, or the default one.
    pub fn get_serializer(&self, media_type: Option<&str>) -> Arc<dyn Serializer> {
        media_type
            .and_then(|m| self.serializers.get(&normalize_media_type(m)))
            .unwrap_or(&self.default)
            .clone()
    }
}

impl Default for SerializerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SerializerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut media_types: Vec<&String> = self.serializers.keys().collect();
        media_types.sort();
        f.debug_struct("SerializerRegistry")
            .field("media_types", &media_types)
            .finish_non_exhaustive()
    }
}

/// Strips parameters and lowercases a media type.
pub(crate) fn normalize_media_type(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq, Default)]
    struct User {
        id: u64,
        name: String,
    }

    #[test]
    fn test_json_serializer_round_trip() {
        let user = User {
            id: 42,
            name: "Alice".to_string(),
        };
        let serializer = SerializerRegistry::new().get_serializer(Some(APPLICATION_JSON));
        let text = serializer.serialize_value(&user).unwrap();
        let back: User = serializer.deserialize_value(&text).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_media_type_parameters_are_ignored() {
        let registry = SerializerRegistry::new();
        let text: String = registry
            .get_serializer(Some("Text/Plain; charset=utf-8"))
            .deserialize_value("hello")
            .unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn test_missing_media_type_uses_default() {
        let mut registry = SerializerRegistry::new();
        registry.set_default(Arc::new(TextSerializer));
        let text: String = registry.get_serializer(None).deserialize_value("raw").unwrap();
        assert_eq!(text, "raw");
    }

    #[test]
    fn test_deserialization_error_surfaces() {
        let registry = SerializerRegistry::new();
        let err = registry
            .get_serializer(Some(APPLICATION_JSON))
            .deserialize_value::<User>("{\"id\": \"nope\"}")
            .unwrap_err();
        assert!(err.0.contains("invalid type"));
    }

    #[test]
    fn test_text_serializer_writes_strings_verbatim() {
        let out = TextSerializer.serialize_value("plain words").unwrap();
        assert_eq!(out, "plain words");
    }
}
