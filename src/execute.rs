use bytes::BytesMut;
use futures::TryStreamExt;
use http::header::USER_AGENT;
use http::HeaderValue;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::client::Client;
use crate::codec::{essence, TEXT_PLAIN};
use crate::error::{Error, Result};
use crate::events::LogData;
use crate::pipeline::PipelineState;
use crate::request::PipeSink;
use crate::response::{Response, ResponseBody};
use crate::timeout;
use crate::transport::{TransportRequest, TransportResponse};

/// `user-agent` sent when the request carries none
pub const DEFAULT_USER_AGENT: &str = concat!("papi/", env!("CARGO_PKG_VERSION"));

/// Longest text body used verbatim as a response error message
const MAX_MESSAGE_LEN: usize = 80;

impl Client {
    /// Perform one network exchange for the created request
    ///
    /// Exchange failures are recorded on the state rather than returned, so
    /// response middleware can see them.
    pub(crate) async fn execute(&self, state: &mut PipelineState) -> Result<()> {
        if let Some(ctx) = &state.opts.ctx {
            if ctx.is_canceled() {
                return Err(Error::validation("ctx already canceled"));
            }
            if ctx.is_finished() {
                return Err(Error::validation("ctx already finished"));
            }
        }

        let mut request = state
            .req
            .take()
            .ok_or_else(|| Error::validation("request was not created"))?;

        if !request.headers.contains_key(USER_AGENT) {
            request
                .headers
                .insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        }

        let tags = self.event_tags(&["request"], &state.opts.tags);
        self.emit(&tags, LogData::Request(&request));
        state.req = Some(request.sent_copy());

        state.attempts += 1;
        let pipe = state.pipe.take();
        let bound = timeout::effective_timeout(state.opts.timeout, self.timeout());

        let mut head = None;
        let exchange = self.exchange(request, pipe, state.opts.buffer, &state.opts.tags, &mut head);
        let outcome = timeout::race(exchange, bound, state.opts.ctx.as_ref()).await;
        state.res = head;

        match outcome {
            Ok(error) => state.err = error,
            Err(err) => {
                if err.is_timeout() {
                    let tags = self.event_tags(&["request", "error", "timeout"], &state.opts.tags);
                    self.emit(&tags, LogData::Error(&err));
                }
                let tags = self.event_tags(&["request", "error"], &state.opts.tags);
                self.emit(&tags, LogData::Error(&err));
                state.err = Some(err);
            }
        }

        Ok(())
    }

    /// Send the request and read the body into the response in `head`
    ///
    /// `head` is filled as soon as the response head arrives, so it
    /// survives a timeout or cancellation during the body read. Returns
    /// the attempt's failure for a decode error or a non-2xx status.
    async fn exchange(
        &self,
        request: TransportRequest,
        pipe: Option<PipeSink>,
        buffer: bool,
        tags: &[String],
        head: &mut Option<Response>,
    ) -> Result<Option<Error>> {
        let method = request.method.clone();
        let path = request.path.clone();
        let transport = self.transports().select(request.scheme);

        let TransportResponse {
            status,
            headers,
            remote_addr,
            mut body,
        } = transport.send(request).await?;

        let response = head.insert(Response::from_parts(status, headers, method, path, remote_addr));
        let tags = self.event_tags(&["response"], tags);
        self.emit(&tags, LogData::Response(response));

        let mut mime = None;

        if let Some(mut sink) = pipe {
            while let Some(chunk) = body.try_next().await.map_err(Error::transport)? {
                sink.write_all(&chunk).await?;
            }
            sink.flush().await?;
        } else {
            let mut collected = BytesMut::new();
            while let Some(chunk) = body.try_next().await.map_err(Error::transport)? {
                collected.extend_from_slice(&chunk);
            }

            if !collected.is_empty() {
                let raw = collected.freeze();
                response.set_body(ResponseBody::Bytes(raw.clone()));

                if !buffer {
                    let content_type = response.content_type().map(essence).unwrap_or_default();
                    if self.codecs().has_decoder(&content_type) {
                        match self.decode(&content_type, &raw) {
                            Ok(value) => response.set_body(ResponseBody::Value(value)),
                            Err(err) => return Ok(Some(err)),
                        }
                    }
                    mime = Some(content_type);
                }
            }
        }

        if status.is_success() {
            Ok(None)
        } else {
            let message = status_message(response, mime.as_deref());
            Ok(Some(Error::response(message, response.clone())))
        }
    }
}

/// Message of a non-2xx response error
///
/// Short plain-text bodies are used verbatim, otherwise the lowercased
/// reason phrase.
fn status_message(response: &Response, mime: Option<&str>) -> String {
    if mime == Some(TEXT_PLAIN) {
        if let ResponseBody::Value(Value::String(text)) = response.body() {
            if !text.is_empty() && text.len() < MAX_MESSAGE_LEN {
                return text.clone();
            }
        }
    }

    match response.status().canonical_reason() {
        Some(reason) => reason.to_lowercase(),
        None => format!("request failed: {}", response.status().as_u16()),
    }
}
