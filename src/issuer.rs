use async_trait::async_trait;

use crate::client::Client;
use crate::error::Result;
use crate::request::RequestOptions;
use crate::response::Response;

/// Anything that can issue requests through a [`Client`]
///
/// Typed API clients implement `client()` and get the request methods for
/// free, which keeps them decoupled from how requests are executed.
///
/// # Examples
///
/// ```rust,no_run
/// use papi::{Client, RequestIssuer, RequestOptions, Result};
///
/// struct Users {
///     client: Client,
/// }
///
/// impl RequestIssuer for Users {
///     fn client(&self) -> &Client {
///         &self.client
///     }
/// }
///
/// impl Users {
///     async fn fetch(&self, id: u64) -> Result<serde_json::Value> {
///         let opts = RequestOptions::new("/users/{id}").param("id", id);
///         RequestIssuer::get(self, opts).await?.json()
///     }
/// }
/// ```
#[async_trait]
pub trait RequestIssuer: Send + Sync {
    /// Client the requests are issued through
    fn client(&self) -> &Client;

    async fn request(&self, opts: RequestOptions) -> Result<Response> {
        self.client().request(opts).await
    }

    async fn options(&self, opts: RequestOptions) -> Result<Response> {
        self.client().options(opts).await
    }

    async fn get(&self, opts: RequestOptions) -> Result<Response> {
        self.client().get(opts).await
    }

    async fn head(&self, opts: RequestOptions) -> Result<Response> {
        self.client().head(opts).await
    }

    async fn post(&self, opts: RequestOptions) -> Result<Response> {
        self.client().post(opts).await
    }

    async fn put(&self, opts: RequestOptions) -> Result<Response> {
        self.client().put(opts).await
    }

    async fn delete(&self, opts: RequestOptions) -> Result<Response> {
        self.client().delete(opts).await
    }

    async fn patch(&self, opts: RequestOptions) -> Result<Response> {
        self.client().patch(opts).await
    }
}

impl RequestIssuer for Client {
    fn client(&self) -> &Client {
        self
    }
}
