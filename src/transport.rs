use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::TryStreamExt;
use http::{HeaderMap, Method, StatusCode};
use reqwest::{Client as ReqwestClient, ClientBuilder as ReqwestBuilder};

use crate::error::{BoxError, Result};
use crate::request::BodyStream;
use crate::tls::TlsOptions;

/// Response body chunks as delivered by a transport
pub type ResponseStream = BoxStream<'static, std::result::Result<bytes::Bytes, BoxError>>;

/// URL scheme of the base authority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Plain HTTP
    Http,
    /// HTTP over TLS
    Https,
}

impl Scheme {
    /// Parse a URL scheme
    pub fn parse(scheme: &str) -> Option<Self> {
        match scheme {
            "http" => Some(Scheme::Http),
            "https" => Some(Scheme::Https),
            _ => None,
        }
    }

    /// Get the scheme as a string
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    /// Get the port used when the base URL names none
    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body handed to the transport
pub enum TransportBody {
    /// No body
    Empty,
    /// Encoded bytes
    Bytes(bytes::Bytes),
    /// Chunk stream, consumed by the send
    Stream(BodyStream),
}

impl TransportBody {
    /// Length of a buffered body
    pub fn len(&self) -> Option<usize> {
        match self {
            TransportBody::Empty => Some(0),
            TransportBody::Bytes(bytes) => Some(bytes.len()),
            TransportBody::Stream(_) => None,
        }
    }

    /// Check if there is no body
    pub fn is_empty(&self) -> bool {
        matches!(self, TransportBody::Empty)
    }
}

impl fmt::Debug for TransportBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportBody::Empty => write!(f, "Empty"),
            TransportBody::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            TransportBody::Stream(_) => write!(f, "Stream"),
        }
    }
}

/// Transport-ready request produced by the create stage
///
/// `onRequest` middleware may still adjust any field before the execute
/// stage hands it to the transport.
#[derive(Debug)]
pub struct TransportRequest {
    pub method: Method,
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    /// `user[:password]` credentials from the base URL
    pub auth: Option<String>,
    /// Base path + request path + query string
    pub path: String,
    pub headers: HeaderMap,
    pub body: TransportBody,
}

impl TransportRequest {
    /// Get the absolute URL of the request
    pub fn url(&self) -> String {
        format!("{}://{}:{}{}", self.scheme, self.host, self.port, self.path)
    }

    /// Copy of the request as it went out, without a streaming body
    ///
    /// Buffered bodies are kept; a stream is already consumed by the send.
    pub fn sent_copy(&self) -> TransportRequest {
        let body = match &self.body {
            TransportBody::Bytes(bytes) => TransportBody::Bytes(bytes.clone()),
            TransportBody::Empty | TransportBody::Stream(_) => TransportBody::Empty,
        };

        TransportRequest {
            method: self.method.clone(),
            scheme: self.scheme,
            host: self.host.clone(),
            port: self.port,
            auth: self.auth.clone(),
            path: self.path.clone(),
            headers: self.headers.clone(),
            body,
        }
    }
}

/// Response head and body stream returned by a transport
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub remote_addr: Option<SocketAddr>,
    pub body: ResponseStream,
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("remote_addr", &self.remote_addr)
            .finish()
    }
}

/// Transport trait for HTTP exchanges
///
/// A transport performs one physical exchange. Dropping the returned
/// future (or the body stream) aborts the exchange; the pipeline relies on
/// that for timeouts and cancellation.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and return the response head with its body stream
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;

    /// Get the transport name
    fn name(&self) -> &str;
}

/// Transport backed by reqwest
///
/// Redirects are not followed and no timeouts are configured; both are
/// left to the pipeline and its middleware.
pub struct HttpTransport {
    client: ReqwestClient,
    name: &'static str,
}

impl HttpTransport {
    fn builder() -> ReqwestBuilder {
        ReqwestClient::builder().redirect(reqwest::redirect::Policy::none())
    }

    /// Create a plain HTTP transport
    pub fn plain() -> Result<Self> {
        Ok(Self {
            client: Self::builder().build()?,
            name: "http",
        })
    }

    /// Create an encrypted transport with TLS options applied
    pub fn secure(tls: &TlsOptions) -> Result<Self> {
        Ok(Self {
            client: tls.apply_to_builder(Self::builder())?.build()?,
            name: "https",
        })
    }

    /// Get the underlying reqwest client
    pub fn client(&self) -> &ReqwestClient {
        &self.client
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url())
            .headers(request.headers);

        if let Some(auth) = &request.auth {
            builder = match auth.split_once(':') {
                Some((user, password)) => builder.basic_auth(user, Some(password)),
                None => builder.basic_auth(auth, None::<&str>),
            };
        }

        builder = match request.body {
            TransportBody::Empty => builder,
            TransportBody::Bytes(bytes) => builder.body(bytes),
            TransportBody::Stream(stream) => builder.body(reqwest::Body::wrap_stream(stream)),
        };

        let response = builder.send().await?;

        Ok(TransportResponse {
            status: response.status(),
            headers: response.headers().clone(),
            remote_addr: response.remote_addr(),
            body: Box::pin(response.bytes_stream().map_err(Into::<BoxError>::into)),
        })
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Plain and encrypted transports, selected by scheme
#[derive(Clone)]
pub struct TransportSet {
    plain: Arc<dyn Transport>,
    secure: Arc<dyn Transport>,
}

impl TransportSet {
    /// Create a set from two transports
    pub fn new(plain: Arc<dyn Transport>, secure: Arc<dyn Transport>) -> Self {
        Self { plain, secure }
    }

    /// Use one transport for both schemes
    pub fn single(transport: Arc<dyn Transport>) -> Self {
        Self {
            plain: transport.clone(),
            secure: transport,
        }
    }

    /// Build the default reqwest transports
    pub fn reqwest(tls: &TlsOptions) -> Result<Self> {
        Ok(Self {
            plain: Arc::new(HttpTransport::plain()?),
            secure: Arc::new(HttpTransport::secure(tls)?),
        })
    }

    /// Select the transport for a scheme
    pub fn select(&self, scheme: Scheme) -> Arc<dyn Transport> {
        match scheme {
            Scheme::Http => self.plain.clone(),
            Scheme::Https => self.secure.clone(),
        }
    }
}

impl fmt::Debug for TransportSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportSet")
            .field("plain", &self.plain.name())
            .field("secure", &self.secure.name())
            .finish()
    }
}
