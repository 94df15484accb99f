//! One-off requests against an absolute URL, without keeping a client.

use http::Method;
use serde_json::{Map, Value};
use url::Url;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::request::RequestOptions;
use crate::response::Response;
use crate::utils::merge_objects;

/// Split an absolute URL into a client base URL and request options
///
/// The URL path becomes the request path and its query pairs are merged
/// under `opts.query`, where explicit options win. Repeated keys collect
/// into an array.
fn split_url(url: &str, mut opts: RequestOptions) -> Result<(Url, RequestOptions)> {
    if url.is_empty() {
        return Err(Error::validation("url required"));
    }

    let parsed = Url::parse(url)
        .map_err(|e| Error::validation(format!("url is invalid ({}): {}", url, e)))?;

    let mut query = Map::new();
    for (key, value) in parsed.query_pairs() {
        let value = Value::String(value.into_owned());
        match query.get_mut(key.as_ref()) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                query.insert(key.into_owned(), value);
            }
        }
    }
    opts.query = merge_objects([&query, &opts.query]);
    opts.path = Some(parsed.path().to_string());

    let mut base = parsed;
    base.set_path("");
    base.set_query(None);
    base.set_fragment(None);

    Ok((base, opts))
}

/// Send a request to an absolute URL
///
/// # Examples
///
/// ```rust,no_run
/// # async fn run() -> papi::Result<()> {
/// let response = papi::request("https://example.org/health?verbose=1", Default::default()).await?;
/// assert!(response.is_success());
/// # Ok(())
/// # }
/// ```
pub async fn request(url: &str, opts: RequestOptions) -> Result<Response> {
    let (base, opts) = split_url(url, opts)?;
    let client = Client::builder().base_url(base).build()?;
    client.request(opts).await
}

async fn request_method(method: Method, url: &str, mut opts: RequestOptions) -> Result<Response> {
    opts.method = method;
    request(url, opts).await
}

/// Send an OPTIONS request to an absolute URL
pub async fn options(url: &str, opts: RequestOptions) -> Result<Response> {
    request_method(Method::OPTIONS, url, opts).await
}

/// Send a GET request to an absolute URL
pub async fn get(url: &str, opts: RequestOptions) -> Result<Response> {
    request_method(Method::GET, url, opts).await
}

/// Send a HEAD request to an absolute URL
pub async fn head(url: &str, opts: RequestOptions) -> Result<Response> {
    request_method(Method::HEAD, url, opts).await
}

/// Send a POST request to an absolute URL
pub async fn post(url: &str, opts: RequestOptions) -> Result<Response> {
    request_method(Method::POST, url, opts).await
}

/// Send a PUT request to an absolute URL
pub async fn put(url: &str, opts: RequestOptions) -> Result<Response> {
    request_method(Method::PUT, url, opts).await
}

/// Send a DELETE request to an absolute URL
pub async fn delete(url: &str, opts: RequestOptions) -> Result<Response> {
    request_method(Method::DELETE, url, opts).await
}

/// Send a PATCH request to an absolute URL
pub async fn patch(url: &str, opts: RequestOptions) -> Result<Response> {
    request_method(Method::PATCH, url, opts).await
}
