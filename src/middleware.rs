use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use http::HeaderValue;
use tracing::Level;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::pipeline::{Flow, PipelineState};

/// Middleware run at an extension point of the request pipeline
///
/// Returning `Ok(Flow::Continue)` advances to the next stage; `Err` rejects
/// the request immediately. Failures of the network exchange itself are not
/// returned as `Err` but recorded on [`PipelineState::err`], so response
/// middleware can inspect, clear or replace them, or call
/// [`PipelineState::retry`].
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Process the pipeline state
    async fn handle(&self, client: &Client, state: &mut PipelineState) -> Result<Flow>;

    /// Get the name of this middleware
    fn name(&self) -> &str {
        "Unknown"
    }
}

/// Named slots where middleware is inserted into the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionPoint {
    /// Before the request is materialized
    OnCreate,
    /// After the transport request is built, before it is sent
    OnRequest,
    /// After the exchange completed or failed
    OnResponse,
}

impl ExtensionPoint {
    /// Get the conventional name of the extension point
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtensionPoint::OnCreate => "onCreate",
            ExtensionPoint::OnRequest => "onRequest",
            ExtensionPoint::OnResponse => "onResponse",
        }
    }
}

impl FromStr for ExtensionPoint {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "" => Err(Error::validation("extension point required")),
            "onCreate" => Ok(ExtensionPoint::OnCreate),
            "onRequest" => Ok(ExtensionPoint::OnRequest),
            "onResponse" => Ok(ExtensionPoint::OnResponse),
            other => Err(Error::validation(format!("unknown extension point: {}", other))),
        }
    }
}

impl fmt::Display for ExtensionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered middleware lists per extension point
///
/// Lists only grow; middleware registered under the same point runs in
/// registration order.
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    on_create: Vec<Arc<dyn Middleware>>,
    on_request: Vec<Arc<dyn Middleware>>,
    on_response: Vec<Arc<dyn Middleware>>,
}

impl ExtensionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append middleware to an extension point
    pub fn register(&mut self, point: ExtensionPoint, middleware: Arc<dyn Middleware>) {
        match point {
            ExtensionPoint::OnCreate => self.on_create.push(middleware),
            ExtensionPoint::OnRequest => self.on_request.push(middleware),
            ExtensionPoint::OnResponse => self.on_response.push(middleware),
        }
    }

    /// Get the middleware registered at an extension point
    pub fn get(&self, point: ExtensionPoint) -> &[Arc<dyn Middleware>] {
        match point {
            ExtensionPoint::OnCreate => &self.on_create,
            ExtensionPoint::OnRequest => &self.on_request,
            ExtensionPoint::OnResponse => &self.on_response,
        }
    }

    /// Get the number of middleware registered at an extension point
    pub fn len(&self, point: ExtensionPoint) -> usize {
        self.get(point).len()
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.on_create.is_empty() && self.on_request.is_empty() && self.on_response.is_empty()
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |list: &[Arc<dyn Middleware>]| {
            list.iter().map(|m| m.name().to_string()).collect::<Vec<_>>()
        };

        f.debug_struct("ExtensionRegistry")
            .field("onCreate", &names(&self.on_create))
            .field("onRequest", &names(&self.on_request))
            .field("onResponse", &names(&self.on_response))
            .finish()
    }
}

/// Middleware built from a synchronous closure
pub struct FnMiddleware<F> {
    f: F,
    name: String,
}

/// Wrap a closure as middleware
///
/// # Examples
///
/// ```rust
/// use papi::{from_fn, Flow};
///
/// let middleware = from_fn(|state| {
///     state.opts.tags.push("seen".to_string());
///     Ok(Flow::Continue)
/// });
/// ```
pub fn from_fn<F>(f: F) -> FnMiddleware<F>
where
    F: Fn(&mut PipelineState) -> Result<Flow> + Send + Sync + 'static,
{
    FnMiddleware {
        f,
        name: "Fn".to_string(),
    }
}

impl<F> FnMiddleware<F> {
    /// Name the middleware
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }
}

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut PipelineState) -> Result<Flow> + Send + Sync + 'static,
{
    async fn handle(&self, _client: &Client, state: &mut PipelineState) -> Result<Flow> {
        (self.f)(state)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Authentication middleware
///
/// Register at [`ExtensionPoint::OnRequest`]: it sets the `authorization`
/// header on the materialized transport request.
pub struct AuthMiddleware {
    auth_header: HeaderValue,
}

impl AuthMiddleware {
    /// Create a new authentication middleware
    pub fn new(auth_header: &str) -> Result<Self> {
        let mut auth_header = auth_header.parse::<HeaderValue>()?;
        auth_header.set_sensitive(true);
        Ok(Self { auth_header })
    }

    /// Create middleware with bearer token
    pub fn bearer(token: &str) -> Result<Self> {
        Self::new(&format!("Bearer {}", token))
    }

    /// Create middleware with basic auth
    pub fn basic(username: &str, password: &str) -> Result<Self> {
        let credentials = format!("{}:{}", username, password);
        let encoded = BASE64.encode(credentials.as_bytes());
        Self::new(&format!("Basic {}", encoded))
    }
}

#[async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(&self, _client: &Client, state: &mut PipelineState) -> Result<Flow> {
        let request = state
            .req
            .as_mut()
            .ok_or_else(|| Error::validation("auth middleware requires a created request"))?;

        request
            .headers
            .insert(http::header::AUTHORIZATION, self.auth_header.clone());

        Ok(Flow::Continue)
    }

    fn name(&self) -> &str {
        "Authentication"
    }
}

/// Logging middleware
///
/// Register at [`ExtensionPoint::OnResponse`] to log the outcome of each
/// attempt.
pub struct LoggingMiddleware {
    level: Level,
    include_headers: bool,
}

impl LoggingMiddleware {
    /// Create a new logging middleware
    pub fn new() -> Self {
        Self {
            level: Level::INFO,
            include_headers: false,
        }
    }

    /// Set the log level
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Include headers in logs
    pub fn include_headers(mut self, include: bool) -> Self {
        self.include_headers = include;
        self
    }

    fn emit(&self, line: &str) {
        match self.level {
            Level::ERROR => tracing::error!("{}", line),
            Level::WARN => tracing::warn!("{}", line),
            Level::INFO => tracing::info!("{}", line),
            Level::DEBUG => tracing::debug!("{}", line),
            Level::TRACE => tracing::trace!("{}", line),
        }
    }
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(&self, _client: &Client, state: &mut PipelineState) -> Result<Flow> {
        match (&state.res, &state.err) {
            (Some(response), err) => {
                let outcome = err.as_ref().map(|e| e.to_string()).unwrap_or_default();
                self.emit(&format!(
                    "{} {} -> {} {}",
                    response.method(),
                    response.path(),
                    response.status(),
                    outcome
                ));

                if self.include_headers {
                    for (name, value) in response.headers() {
                        self.emit(&format!("  {}: {}", name, value.to_str().unwrap_or("")));
                    }
                }
            }
            (None, Some(err)) => {
                self.emit(&format!("{} {} failed: {}", state.opts.method, state.opts.path.as_deref().unwrap_or(""), err));
            }
            (None, None) => {}
        }

        Ok(Flow::Continue)
    }

    fn name(&self) -> &str {
        "Logging"
    }
}
