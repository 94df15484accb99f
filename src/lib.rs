//! papi - building blocks for typed HTTP API clients
//!
//! A [`Client`] is bound to one base URL. Each request is described by
//! [`RequestOptions`] and runs through a small pipeline that can be
//! extended at three points:
//!
//! - **onCreate** runs before the request is materialized
//! - **onRequest** sees the transport request before it is sent
//! - **onResponse** sees the outcome and may clear errors or retry
//!
//! Bodies are encoded and decoded by a per-client codec registry keyed by
//! MIME type (JSON, form and text are built in). Every attempt can be
//! bounded by a timeout and aborted through a [`RequestContext`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use papi::{Client, RequestOptions};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> papi::Result<()> {
//!     let client = Client::builder()
//!         .base_url("https://api.example.org")
//!         .name("example")
//!         .build()?;
//!
//!     let created = client
//!         .post(RequestOptions::new("/users").body(json!({"name": "ada"})).body_type("json"))
//!         .await?;
//!     println!("Status: {}", created.status());
//!
//!     let user = client
//!         .get(RequestOptions::new("/users/{id}").param("id", 1))
//!         .await?;
//!     println!("Body: {:?}", user.body());
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod context;
pub mod error;
pub mod events;
pub mod issuer;
pub mod middleware;
pub mod pipeline;
pub mod plugin;
pub mod request;
pub mod response;
pub mod shortcuts;
pub mod timeout;
pub mod tls;
pub mod transport;
pub mod utils;

mod create;
mod execute;

// Re-export main types for convenience
pub use client::{BaseAuthority, Client, ClientBuilder, ClientConfig};
pub use codec::Codecs;
pub use context::RequestContext;
pub use error::{BoxError, Error, ErrorKind, Result};
pub use events::{LogData, LogEvent};
pub use execute::DEFAULT_USER_AGENT;
pub use issuer::RequestIssuer;
pub use middleware::{
    from_fn, AuthMiddleware, ExtensionPoint, ExtensionRegistry, LoggingMiddleware, Middleware,
};
pub use pipeline::{Flow, Phase, PipelineState};
pub use plugin::{Plugin, PluginAttributes};
pub use request::{Body, Param, Pipe, RequestOptions};
pub use response::{Response, ResponseBody, ResponseBuilder};
pub use shortcuts::request;
pub use tls::{TlsOptions, TlsVersion};
pub use transport::{Transport, TransportRequest, TransportResponse, TransportSet};

// Re-export common HTTP types
pub use http::{HeaderMap, HeaderValue, Method, StatusCode};

// Re-export URL types
pub use url::Url;

// Re-export common traits
pub use async_trait::async_trait;
