use std::net::SocketAddr;

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use serde_json::Value;

use crate::error::{Error, Result};

/// Response body after the execute stage
///
/// Bodies with a registered decoder for their content type are decoded
/// into a `Value`; everything else stays raw. Piped responses and empty
/// payloads leave the body `Empty`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResponseBody {
    /// No body was buffered
    #[default]
    Empty,
    /// Raw bytes, undecoded
    Bytes(Bytes),
    /// Decoded value
    Value(Value),
}

impl ResponseBody {
    /// Check if no body was buffered
    pub fn is_empty(&self) -> bool {
        matches!(self, ResponseBody::Empty)
    }

    /// Get the decoded value, if any
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ResponseBody::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Get the raw bytes, if the body was not decoded
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            ResponseBody::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// HTTP response produced by the pipeline
///
/// The response is attached to any error raised after it was received,
/// so it can be inspected even when the request failed.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
    method: Method,
    path: String,
    remote_addr: Option<SocketAddr>,
}

impl Response {
    /// Create an empty response with a status code
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ResponseBody::Empty,
            method: Method::GET,
            path: String::new(),
            remote_addr: None,
        }
    }

    pub(crate) fn from_parts(
        status: StatusCode,
        headers: HeaderMap,
        method: Method,
        path: String,
        remote_addr: Option<SocketAddr>,
    ) -> Self {
        Self {
            status,
            headers,
            body: ResponseBody::Empty,
            method,
            path,
            remote_addr,
        }
    }

    /// Create a response builder
    pub fn builder(status: StatusCode) -> ResponseBuilder {
        ResponseBuilder::new(status)
    }

    /// Get the HTTP status code
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a specific header value
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    /// Get the content type
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Get the content length
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(http::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
    }

    /// Get the response body
    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// Replace the response body
    pub fn set_body(&mut self, body: ResponseBody) {
        self.body = body;
    }

    /// Take the response body
    pub fn into_body(self) -> ResponseBody {
        self.body
    }

    /// Get the request method that produced this response
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get the request path (including query) that produced this response
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the peer address
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Check if the response is successful (2xx status code)
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Check if the response is a client error (4xx status code)
    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }

    /// Check if the response is a server error (5xx status code)
    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }

    /// Check if the response indicates a redirect
    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }

    /// Get the body as text
    pub fn text(&self) -> Result<String> {
        match &self.body {
            ResponseBody::Empty => Ok(String::new()),
            ResponseBody::Bytes(bytes) => String::from_utf8(bytes.to_vec())
                .map_err(|e| Error::codec(format!("body is not valid utf-8: {}", e))),
            ResponseBody::Value(Value::String(s)) => Ok(s.clone()),
            ResponseBody::Value(value) => Ok(value.to_string()),
        }
    }

    /// Deserialize the body into a typed value
    pub fn json<T>(&self) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let parsed = match &self.body {
            ResponseBody::Value(value) => T::deserialize(value),
            ResponseBody::Bytes(bytes) => serde_json::from_slice(bytes),
            ResponseBody::Empty => return Err(Error::codec("response has no body")),
        };

        parsed.map_err(|e| Error::codec_with(format!("invalid response body: {}", e), e.into()))
    }
}

/// Builder for synthesizing responses in middleware
pub struct ResponseBuilder {
    response: Response,
}

impl ResponseBuilder {
    /// Create a new response builder
    pub fn new(status: StatusCode) -> Self {
        Self {
            response: Response::new(status),
        }
    }

    /// Set a header
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = name.parse::<http::header::HeaderName>()?;
        let value = value.parse::<HeaderValue>()?;
        self.response.headers.insert(name, value);
        Ok(self)
    }

    /// Set the body
    pub fn body(mut self, body: ResponseBody) -> Self {
        self.response.body = body;
        self
    }

    /// Set a decoded body
    pub fn value(self, value: Value) -> Self {
        self.body(ResponseBody::Value(value))
    }

    /// Set the method and path the response answers
    pub fn request(mut self, method: Method, path: impl Into<String>) -> Self {
        self.response.method = method;
        self.response.path = path.into();
        self
    }

    /// Build the response
    pub fn build(self) -> Response {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        name: String,
    }

    #[test]
    fn test_response_builder() {
        let response = Response::builder(StatusCode::OK)
            .header("Content-Type", "application/json")
            .unwrap()
            .value(json!({"name": "ok"}))
            .build();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.content_type(), Some("application/json"));
        assert_eq!(response.body().as_value(), Some(&json!({"name": "ok"})));
    }

    #[test]
    fn test_response_status_checks() {
        let response = Response::new(StatusCode::OK);
        assert!(response.is_success());
        assert!(!response.is_client_error());

        let response = Response::new(StatusCode::NOT_FOUND);
        assert!(response.is_client_error());

        let response = Response::new(StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.is_server_error());
    }

    #[test]
    fn test_typed_json_body() {
        let response = Response::builder(StatusCode::OK)
            .value(json!({"name": "ok"}))
            .build();
        assert_eq!(response.json::<User>().unwrap(), User { name: "ok".into() });

        let response = Response::builder(StatusCode::OK)
            .body(ResponseBody::Bytes(Bytes::from_static(br#"{"name":"raw"}"#)))
            .build();
        assert_eq!(response.json::<User>().unwrap().name, "raw");

        let err = Response::new(StatusCode::OK).json::<User>().unwrap_err();
        assert!(err.is_codec());
    }

    #[test]
    fn test_text_body() {
        let response = Response::builder(StatusCode::OK)
            .value(json!("hello"))
            .build();
        assert_eq!(response.text().unwrap(), "hello");
        assert_eq!(Response::new(StatusCode::NO_CONTENT).text().unwrap(), "");
    }
}
