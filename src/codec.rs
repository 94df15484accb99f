use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::{Map, Value};

use crate::error::{BoxError, Error, Result};

/// Charset appended to generated `content-type` headers
pub const CHARSET: &str = "utf-8";

pub const APPLICATION_JSON: &str = "application/json";
pub const APPLICATION_FORM: &str = "application/x-www-form-urlencoded";
pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_HTML: &str = "text/html";
pub const TEXT_JSON: &str = "text/json";

/// Turns a structured value into a byte sequence
pub type Encoder = Arc<dyn Fn(&Value) -> std::result::Result<Bytes, BoxError> + Send + Sync>;

/// Turns a byte sequence into a structured value
pub type Decoder = Arc<dyn Fn(&[u8]) -> std::result::Result<Value, BoxError> + Send + Sync>;

/// Resolve a short type alias to its MIME type
pub fn mime_alias(alias: &str) -> Option<&'static str> {
    match alias {
        "json" => Some(APPLICATION_JSON),
        "form" | "qs" | "querystring" => Some(APPLICATION_FORM),
        "text" => Some(TEXT_PLAIN),
        _ => None,
    }
}

/// Resolve a `type` option, accepting either an alias or a literal MIME type
pub fn resolve_mime(value: &str) -> Option<String> {
    match mime_alias(value) {
        Some(mime) => Some(mime.to_string()),
        None if value.contains('/') => Some(value.trim().to_ascii_lowercase()),
        None => None,
    }
}

/// Strip parameters (`; charset=...`) from a content-type value
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Registry of encoders and decoders keyed by MIME type
///
/// A fresh registry is seeded with the built-in JSON, form and text
/// codecs; entries can be replaced or added one MIME type at a time.
#[derive(Clone)]
pub struct Codecs {
    encoders: HashMap<String, Encoder>,
    decoders: HashMap<String, Decoder>,
}

impl Codecs {
    /// Create a registry holding the built-in codecs
    pub fn new() -> Self {
        let mut codecs = Self::empty();

        codecs.set_encoder(APPLICATION_JSON, json::encode);
        codecs.set_encoder(APPLICATION_FORM, form::encode);
        codecs.set_encoder(TEXT_PLAIN, text::encode);

        codecs.set_decoder(APPLICATION_JSON, json::decode);
        codecs.set_decoder(APPLICATION_FORM, form::decode);
        codecs.set_decoder(TEXT_HTML, text::decode);
        codecs.set_decoder(TEXT_JSON, json::decode);
        codecs.set_decoder(TEXT_PLAIN, text::decode);

        codecs
    }

    /// Create a registry without any codecs
    pub fn empty() -> Self {
        Self {
            encoders: HashMap::new(),
            decoders: HashMap::new(),
        }
    }

    /// Register or replace the encoder for a MIME type
    pub fn set_encoder<F>(&mut self, mime: &str, encoder: F)
    where
        F: Fn(&Value) -> std::result::Result<Bytes, BoxError> + Send + Sync + 'static,
    {
        self.encoders.insert(mime.to_ascii_lowercase(), Arc::new(encoder));
    }

    /// Register or replace the decoder for a MIME type
    pub fn set_decoder<F>(&mut self, mime: &str, decoder: F)
    where
        F: Fn(&[u8]) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.decoders.insert(mime.to_ascii_lowercase(), Arc::new(decoder));
    }

    /// Overlay another registry's entries onto this one
    pub fn extend(&mut self, other: &Codecs) {
        for (mime, encoder) in &other.encoders {
            self.encoders.insert(mime.clone(), encoder.clone());
        }
        for (mime, decoder) in &other.decoders {
            self.decoders.insert(mime.clone(), decoder.clone());
        }
    }

    /// Check if an encoder is registered for a MIME type
    pub fn has_encoder(&self, mime: &str) -> bool {
        self.encoders.contains_key(mime)
    }

    /// Check if a decoder is registered for a MIME type
    pub fn has_decoder(&self, mime: &str) -> bool {
        self.decoders.contains_key(mime)
    }

    /// Encode a value with the encoder registered for `mime`
    pub fn encode(&self, mime: &str, value: &Value) -> Result<Bytes> {
        let encoder = self
            .encoders
            .get(mime)
            .ok_or_else(|| Error::codec(format!("unknown encoder: {}", mime)))?;

        encoder(value).map_err(|err| {
            Error::codec_with(format!("encode ({}) failed: {}", mime, err), err)
        })
    }

    /// Decode bytes with the decoder registered for `mime`
    pub fn decode(&self, mime: &str, value: &[u8]) -> Result<Value> {
        let decoder = self
            .decoders
            .get(mime)
            .ok_or_else(|| Error::codec(format!("unknown decoder: {}", mime)))?;

        decoder(value).map_err(|err| {
            Error::codec_with(format!("decode ({}) failed: {}", mime, err), err)
        })
    }
}

impl Default for Codecs {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Codecs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut encoders: Vec<_> = self.encoders.keys().collect();
        let mut decoders: Vec<_> = self.decoders.keys().collect();
        encoders.sort();
        decoders.sort();

        f.debug_struct("Codecs")
            .field("encoders", &encoders)
            .field("decoders", &decoders)
            .finish()
    }
}

/// JSON codec
pub mod json {
    use super::*;

    pub fn encode(value: &Value) -> std::result::Result<Bytes, BoxError> {
        Ok(Bytes::from(serde_json::to_vec(value)?))
    }

    pub fn decode(value: &[u8]) -> std::result::Result<Value, BoxError> {
        Ok(serde_json::from_slice(value)?)
    }
}

/// URL-encoded form codec
///
/// Arrays expand to repeated keys; nested objects and nulls encode as an
/// empty value. Repeated keys decode back into arrays.
pub mod form {
    use super::*;
    use url::form_urlencoded;

    fn scalar(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => String::new(),
        }
    }

    pub fn encode(value: &Value) -> std::result::Result<Bytes, BoxError> {
        let map = value
            .as_object()
            .ok_or("form data must be an object")?;

        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in map {
            match value {
                Value::Array(items) => {
                    for item in items {
                        serializer.append_pair(key, &scalar(item));
                    }
                }
                other => {
                    serializer.append_pair(key, &scalar(other));
                }
            }
        }

        Ok(Bytes::from(serializer.finish()))
    }

    pub fn decode(value: &[u8]) -> std::result::Result<Value, BoxError> {
        let mut map = Map::new();

        for (key, value) in form_urlencoded::parse(value) {
            let value = Value::String(value.into_owned());
            match map.get_mut(key.as_ref()) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    map.insert(key.into_owned(), value);
                }
            }
        }

        Ok(Value::Object(map))
    }
}

/// Plain text codec
pub mod text {
    use super::*;

    pub fn encode(value: &Value) -> std::result::Result<Bytes, BoxError> {
        match value {
            Value::String(s) => Ok(Bytes::from(s.clone())),
            Value::Number(n) => Ok(Bytes::from(n.to_string())),
            Value::Bool(b) => Ok(Bytes::from(b.to_string())),
            _ => Err("text body must be a string".into()),
        }
    }

    pub fn decode(value: &[u8]) -> std::result::Result<Value, BoxError> {
        Ok(Value::String(std::str::from_utf8(value)?.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_round_trip() {
        let codecs = Codecs::new();
        let value = json!({"name": "ok", "tags": [1, 2, 3], "nested": {"a": null}});

        let encoded = codecs.encode(APPLICATION_JSON, &value).unwrap();
        let decoded = codecs.decode(APPLICATION_JSON, &encoded).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_form_round_trip() {
        let codecs = Codecs::new();
        let value = json!({"hello": "world", "space": "a b", "amp": "x&y"});

        let encoded = codecs.encode(APPLICATION_FORM, &value).unwrap();
        let decoded = codecs.decode(APPLICATION_FORM, &encoded).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_form_encode() {
        let encoded = form::encode(&json!({"hello": "world"})).unwrap();
        assert_eq!(&encoded[..], b"hello=world");

        let encoded = form::encode(&json!({"a": [1, 2], "b": true})).unwrap();
        assert_eq!(&encoded[..], b"a=1&a=2&b=true");
    }

    #[test]
    fn test_form_decode_repeated_keys() {
        let decoded = form::decode(b"a=1&a=2&b=3").unwrap();
        assert_eq!(decoded, json!({"a": ["1", "2"], "b": "3"}));
    }

    #[test]
    fn test_unknown_codecs() {
        let codecs = Codecs::new();

        let err = codecs.encode("application/xml", &json!({})).unwrap_err();
        assert!(err.is_codec());
        assert_eq!(err.to_string(), "unknown encoder: application/xml");

        let err = codecs.decode("application/xml", b"<a/>").unwrap_err();
        assert!(err.is_codec());
        assert_eq!(err.to_string(), "unknown decoder: application/xml");
    }

    #[test]
    fn test_failed_codecs_are_rewrapped() {
        let codecs = Codecs::new();

        let err = codecs.decode(APPLICATION_JSON, b"{").unwrap_err();
        assert!(err.is_codec());
        assert!(err.to_string().starts_with("decode (application/json) failed: "));

        let err = codecs.encode(TEXT_PLAIN, &json!({"a": 1})).unwrap_err();
        assert!(err.is_codec());
        assert!(err.to_string().starts_with("encode (text/plain) failed: "));
    }

    #[test]
    fn test_overrides_are_per_key() {
        let mut codecs = Codecs::new();
        codecs.set_encoder(TEXT_PLAIN, |_| Ok(Bytes::from_static(b"fixed")));

        assert_eq!(&codecs.encode(TEXT_PLAIN, &json!("x")).unwrap()[..], b"fixed");
        assert!(codecs.has_encoder(APPLICATION_JSON));
        assert!(codecs.has_decoder(TEXT_HTML));
    }

    #[test]
    fn test_mime_resolution() {
        assert_eq!(resolve_mime("form").as_deref(), Some(APPLICATION_FORM));
        assert_eq!(resolve_mime("qs").as_deref(), Some(APPLICATION_FORM));
        assert_eq!(resolve_mime("application/xml").as_deref(), Some("application/xml"));
        assert_eq!(resolve_mime("unknown"), None);
        assert_eq!(essence("Application/JSON; charset=utf-8"), APPLICATION_JSON);
    }
}
