use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use http::{HeaderMap, Method};
use serde_json::{Map, Value};
use tokio::io::AsyncWrite;

use crate::context::RequestContext;
use crate::error::{BoxError, Error, Result};
use crate::middleware::{ExtensionPoint, ExtensionRegistry, Middleware};
use crate::utils::headers_from_pairs;

/// Single-use stream of body chunks
pub type BodyStream = Pin<Box<dyn Stream<Item = std::result::Result<Bytes, BoxError>> + Send + Sync>>;

/// Writable destination for a piped response body
pub type PipeSink = Box<dyn AsyncWrite + Send + Unpin>;

/// Produces a fresh body for each attempt
pub type BodyThunk = Arc<dyn Fn() -> std::result::Result<Body, BoxError> + Send + Sync>;

/// Produces a fresh sink for each attempt
pub type PipeThunk = Arc<dyn Fn() -> std::result::Result<PipeSink, BoxError> + Send + Sync>;

/// Request body
///
/// `Value` bodies are run through the encoder selected by the request's
/// type; `Bytes` and `Stream` bodies are sent as-is. A `Stream` is
/// consumed by the first attempt, which makes the request non-retryable.
/// Wrap the stream in a `Thunk` to build a fresh one per attempt.
pub enum Body {
    /// Structured value encoded by a codec
    Value(Value),
    /// Pre-encoded bytes
    Bytes(Bytes),
    /// Single-use chunk stream
    Stream(BodyStream),
    /// Lazily produced body, invoked once per attempt
    Thunk(BodyThunk),
}

impl Body {
    /// Create a body from a structured value
    pub fn value(value: impl Into<Value>) -> Self {
        Body::Value(value.into())
    }

    /// Create a body from a serializable type
    pub fn json<T>(value: &T) -> Result<Self>
    where
        T: serde::Serialize,
    {
        serde_json::to_value(value)
            .map(Body::Value)
            .map_err(|e| Error::validation(format!("body is not serializable: {}", e)))
    }

    /// Create a pre-encoded body
    pub fn bytes(bytes: impl Into<Bytes>) -> Self {
        Body::Bytes(bytes.into())
    }

    /// Create a single-use streaming body
    pub fn stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        Body::Stream(Box::pin(stream.map_err(Into::<BoxError>::into)))
    }

    /// Create a body that is produced again for every attempt
    pub fn thunk<F>(f: F) -> Self
    where
        F: Fn() -> std::result::Result<Body, BoxError> + Send + Sync + 'static,
    {
        Body::Thunk(Arc::new(f))
    }

    /// Check if the body is a single-use stream
    pub fn is_stream(&self) -> bool {
        matches!(self, Body::Stream(_))
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Value(value) => write!(f, "Value({})", value),
            Body::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Body::Stream(_) => write!(f, "Stream"),
            Body::Thunk(_) => write!(f, "Thunk"),
        }
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Body::Value(value)
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(bytes.into())
    }
}

/// Destination for the response body
///
/// A piped response is streamed into the sink and never buffered or
/// decoded. A literal `Sink` is single-use and makes the request
/// non-retryable; a `Thunk` builds a fresh sink per attempt.
pub enum Pipe {
    /// Single-use sink
    Sink(PipeSink),
    /// Sink produced again for every attempt
    Thunk(PipeThunk),
}

impl Pipe {
    /// Pipe into a single writer
    pub fn sink<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Pipe::Sink(Box::new(writer))
    }

    /// Pipe into a writer produced per attempt
    pub fn thunk<F>(f: F) -> Self
    where
        F: Fn() -> std::result::Result<PipeSink, BoxError> + Send + Sync + 'static,
    {
        Pipe::Thunk(Arc::new(f))
    }
}

impl fmt::Debug for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pipe::Sink(_) => write!(f, "Sink"),
            Pipe::Thunk(_) => write!(f, "Thunk"),
        }
    }
}

/// Value substituted for a `{name}` path placeholder
///
/// Values are percent-encoded unless created with [`Param::raw`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    value: String,
    encode: bool,
}

impl Param {
    /// Create a percent-encoded parameter
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            encode: true,
        }
    }

    /// Create a parameter inserted verbatim
    pub fn raw(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            encode: false,
        }
    }

    /// Get the unencoded value
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Check if the value is percent-encoded on substitution
    pub fn is_encoded(&self) -> bool {
        self.encode
    }

    /// Render the value for insertion into a path
    pub fn render(&self) -> String {
        if self.encode {
            urlencoding::encode(&self.value).into_owned()
        } else {
            self.value.clone()
        }
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::new(value)
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::new(value)
    }
}

macro_rules! param_from_display {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Param {
                fn from(value: $ty) -> Self {
                    Param::new(value.to_string())
                }
            }
        )*
    };
}

param_from_display!(i32, i64, u32, u64, usize, bool);

/// Declarative description of one request
///
/// # Examples
///
/// ```rust
/// use papi::RequestOptions;
///
/// let opts = RequestOptions::new("/users/{id}")
///     .param("id", "42")
///     .query("expand", "groups");
/// assert_eq!(opts.path.as_deref(), Some("/users/{id}"));
/// ```
#[derive(Debug, Default)]
pub struct RequestOptions {
    /// Path template, appended to the client's base path
    pub path: Option<String>,
    /// HTTP method
    pub method: Method,
    /// Values for `{name}` placeholders in `path`
    pub params: HashMap<String, Param>,
    /// Query parameters, form-encoded onto the path
    pub query: Map<String, Value>,
    /// Request body
    pub body: Option<Body>,
    /// Body MIME type or alias (`json`, `form`, `text`, ...)
    pub body_type: Option<String>,
    /// Per-request headers, merged over the client defaults
    pub headers: HeaderMap,
    /// Timeout override; zero disables the client default
    pub timeout: Option<Duration>,
    /// Observability tags
    pub tags: Vec<String>,
    /// Request name, used as a tag and an error prefix
    pub name: Option<String>,
    /// Keep the raw response bytes and skip decoding
    pub buffer: bool,
    /// Stream the response body into a sink
    pub pipe: Option<Pipe>,
    /// Cancellation handle
    pub ctx: Option<RequestContext>,
    /// One-off extensions for this request
    pub exts: ExtensionRegistry,
}

impl RequestOptions {
    /// Create options for a path
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Set the path template
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the HTTP method
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set a path parameter
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Param>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Set a query parameter
    pub fn query(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Set the request body
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a JSON body from a serializable type
    pub fn json<T>(mut self, body: &T) -> Result<Self>
    where
        T: serde::Serialize,
    {
        self.body = Some(Body::json(body)?);
        self.body_type = Some(crate::codec::APPLICATION_JSON.to_string());
        Ok(self)
    }

    /// Set the body type (MIME type or alias)
    pub fn body_type(mut self, body_type: impl Into<String>) -> Self {
        self.body_type = Some(body_type.into());
        self
    }

    /// Set a header
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let headers = headers_from_pairs([(name, value)])?;
        self.headers.extend(headers);
        Ok(self)
    }

    /// Set multiple headers
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Set the timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add a tag
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Set the request name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Keep the response body as raw bytes
    pub fn buffer(mut self, buffer: bool) -> Self {
        self.buffer = buffer;
        self
    }

    /// Stream the response body into a sink
    pub fn pipe(mut self, pipe: Pipe) -> Self {
        self.pipe = Some(pipe);
        self
    }

    /// Attach a cancellation handle
    pub fn ctx(mut self, ctx: RequestContext) -> Self {
        self.ctx = Some(ctx);
        self
    }

    /// Register a one-off extension for this request
    pub fn ext<M>(mut self, point: ExtensionPoint, middleware: M) -> Self
    where
        M: Middleware + 'static,
    {
        self.exts.register(point, Arc::new(middleware));
        self
    }
}

impl From<&str> for RequestOptions {
    fn from(path: &str) -> Self {
        RequestOptions::new(path)
    }
}

impl From<String> for RequestOptions {
    fn from(path: String) -> Self {
        RequestOptions::new(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_param_rendering() {
        assert_eq!(Param::from("a b/c").render(), "a%20b%2Fc");
        assert_eq!(Param::raw("a/b").render(), "a/b");
        assert_eq!(Param::from(42u64).render(), "42");
        assert!(!Param::raw("x").is_encoded());
    }

    #[test]
    fn test_request_options_builder() {
        let opts = RequestOptions::new("/users/{id}")
            .method(Method::POST)
            .param("id", 42u64)
            .query("page", 2)
            .body(json!({"hello": "world"}))
            .body_type("form")
            .header("X-Request-Id", "abc")
            .unwrap()
            .tag("users")
            .name("createUser");

        assert_eq!(opts.method, Method::POST);
        assert_eq!(opts.params.get("id").unwrap().as_str(), "42");
        assert_eq!(opts.query.get("page"), Some(&json!(2)));
        assert_eq!(opts.headers.get("x-request-id").unwrap(), "abc");
        assert_eq!(opts.body_type.as_deref(), Some("form"));
        assert_eq!(opts.tags, vec!["users"]);
        assert!(matches!(opts.body, Some(Body::Value(_))));
    }

    #[test]
    fn test_path_conversion() {
        let opts: RequestOptions = "/health".into();
        assert_eq!(opts.path.as_deref(), Some("/health"));
        assert_eq!(opts.method, Method::GET);
    }

    #[test]
    fn test_stream_body_detection() {
        let body = Body::stream(futures::stream::iter(vec![Ok::<_, BoxError>(Bytes::from("x"))]));
        assert!(body.is_stream());
        assert!(!Body::bytes("x").is_stream());
    }

    #[tokio::test]
    async fn test_stream_body_converts_errors() {
        let chunks = futures::stream::iter(vec![
            Ok(Bytes::from("x")),
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed")),
        ]);

        let mut stream = match Body::stream(chunks) {
            Body::Stream(stream) => stream,
            _ => panic!("expected a stream body"),
        };
        assert_eq!(stream.try_next().await.unwrap(), Some(Bytes::from("x")));
        assert_eq!(stream.try_next().await.unwrap_err().to_string(), "closed");
    }
}
