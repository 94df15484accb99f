#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use papi::transport::{TransportBody, TransportRequest, TransportResponse, TransportSet};
use papi::{Client, Transport};
use tokio::io::AsyncWrite;

/// What a recording transport saw for one exchange
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// Transport answering every request with a fixed JSON body
#[derive(Clone)]
pub struct RecordingTransport {
    pub requests: Arc<Mutex<Vec<Recorded>>>,
    status: StatusCode,
    body: &'static str,
}

impl RecordingTransport {
    pub fn new(status: StatusCode, body: &'static str) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            status,
            body,
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn client(&self) -> Client {
        self.builder().build().unwrap()
    }

    pub fn builder(&self) -> papi::ClientBuilder {
        Client::builder()
            .base_url("http://api.test/v1")
            .transports(TransportSet::single(Arc::new(self.clone())))
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: TransportRequest) -> papi::Result<TransportResponse> {
        let body = match &request.body {
            TransportBody::Bytes(bytes) => Some(bytes.clone()),
            _ => None,
        };

        self.requests.lock().unwrap().push(Recorded {
            method: request.method.clone(),
            url: request.url(),
            headers: request.headers.clone(),
            body,
        });

        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let chunk = Bytes::from_static(self.body.as_bytes());
        Ok(TransportResponse {
            status: self.status,
            headers,
            remote_addr: None,
            body: Box::pin(futures::stream::iter(vec![Ok::<_, papi::BoxError>(chunk)])),
        })
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Transport that answers with a response head and a body that never arrives
#[derive(Clone)]
pub struct StallingTransport {
    pub status: StatusCode,
}

impl StallingTransport {
    pub fn builder(&self) -> papi::ClientBuilder {
        Client::builder()
            .base_url("http://api.test")
            .transports(TransportSet::single(Arc::new(self.clone())))
    }
}

#[async_trait]
impl Transport for StallingTransport {
    async fn send(&self, _request: TransportRequest) -> papi::Result<TransportResponse> {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        Ok(TransportResponse {
            status: self.status,
            headers,
            remote_addr: None,
            body: Box::pin(futures::stream::pending::<Result<Bytes, papi::BoxError>>()),
        })
    }

    fn name(&self) -> &str {
        "stalling"
    }
}

/// Sink collecting piped bytes into a shared buffer
#[derive(Clone, Default)]
pub struct SharedSink(pub Arc<Mutex<Vec<u8>>>);

impl SharedSink {
    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl AsyncWrite for SharedSink {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
