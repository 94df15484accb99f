use std::fmt;
use std::sync::Arc;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::events::LogData;
use crate::middleware::Middleware;
use crate::request::{PipeSink, RequestOptions};
use crate::response::Response;
use crate::transport::TransportRequest;

/// Outcome of a pipeline stage
#[derive(Debug)]
pub enum Flow {
    /// Advance to the next stage
    Continue,
    /// Stop the pipeline and resolve with this response
    Resolve(Response),
    /// Restart the pipeline from the first stage
    ///
    /// Only obtainable from [`PipelineState::retry`].
    Retry(Retry),
}

/// Proof that a retry was granted by [`PipelineState::retry`]
#[derive(Debug)]
pub struct Retry {
    _private: (),
}

/// Part of the pipeline a stage belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// `onCreate` hooks and the create stage
    Create,
    /// `onRequest` hooks and the execute stage
    Request,
    /// `onResponse` hooks and trailing middleware
    Response,
}

/// Mutable state threaded through every stage of one request
///
/// `req` is populated by the create stage; `res` and `err` by the execute
/// stage. Response middleware may replace or clear any of them.
pub struct PipelineState {
    /// Normalized request options
    pub opts: RequestOptions,
    /// Transport request built by the create stage
    ///
    /// After the execute stage this holds a copy of what was sent, without
    /// a streaming body.
    pub req: Option<TransportRequest>,
    /// Response of the last attempt
    pub res: Option<Response>,
    /// Failure of the last attempt
    pub err: Option<Error>,
    pub(crate) pipe: Option<PipeSink>,
    pub(crate) phase: Phase,
    pub(crate) retryable: bool,
    pub(crate) attempts: u32,
}

impl PipelineState {
    pub(crate) fn new(opts: RequestOptions) -> Self {
        Self {
            opts,
            req: None,
            res: None,
            err: None,
            pipe: None,
            phase: Phase::Create,
            retryable: true,
            attempts: 0,
        }
    }

    /// Get the phase of the running stage
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Check if the request can be replayed
    ///
    /// Single-use stream bodies and literal pipe sinks make it false.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Get the number of exchanges attempted so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Request that the whole pipeline runs again
    ///
    /// Clears the outcome of the last attempt. Only response middleware may
    /// retry, and only while the request is retryable.
    ///
    /// ```rust,ignore
    /// async fn handle(&self, _client: &Client, state: &mut PipelineState) -> Result<Flow> {
    ///     if state.err.is_some() && state.attempts() < 3 {
    ///         return state.retry();
    ///     }
    ///     Ok(Flow::Continue)
    /// }
    /// ```
    pub fn retry(&mut self) -> Result<Flow> {
        if self.phase != Phase::Response {
            return Err(Error::validation("retry is only allowed after a response"));
        }
        if !self.retryable {
            return Err(Error::validation("request is not retryable"));
        }

        self.req = None;
        self.res = None;
        self.err = None;
        self.pipe = None;

        Ok(Flow::Retry(Retry { _private: () }))
    }
}

impl fmt::Debug for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineState")
            .field("opts", &self.opts)
            .field("req", &self.req)
            .field("res", &self.res)
            .field("err", &self.err)
            .field("phase", &self.phase)
            .field("retryable", &self.retryable)
            .field("attempts", &self.attempts)
            .finish()
    }
}

/// One step of the dispatch stack
#[derive(Clone)]
pub(crate) enum Stage {
    Hook(Phase, Arc<dyn Middleware>),
    Create,
    Execute,
}

impl Stage {
    async fn run(&self, client: &Client, state: &mut PipelineState) -> Result<Flow> {
        match self {
            Stage::Hook(phase, middleware) => {
                state.phase = *phase;
                middleware.handle(client, state).await
            }
            Stage::Create => {
                state.phase = Phase::Create;
                client.create(state).await?;
                Ok(Flow::Continue)
            }
            Stage::Execute => {
                state.phase = Phase::Request;
                client.execute(state).await?;
                Ok(Flow::Continue)
            }
        }
    }
}

impl Client {
    /// Run the stack to completion
    ///
    /// A stage error rejects immediately. At the end of the stack a recorded
    /// error rejects, otherwise the request resolves with its response.
    pub(crate) async fn dispatch(&self, mut state: PipelineState, stack: Vec<Stage>) -> Result<Response> {
        let mut cursor = 0;

        while let Some(stage) = stack.get(cursor) {
            cursor += 1;

            match stage.run(self, &mut state).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Resolve(response)) => return Ok(response),
                Ok(Flow::Retry(_)) => {
                    let tags = self.event_tags(&["request", "retry"], &state.opts.tags);
                    self.emit(&tags, LogData::Retry(state.attempts));
                    cursor = 0;
                }
                Err(err) => return Err(self.reject(err, &mut state)),
            }
        }

        if let Some(err) = state.err.take() {
            return Err(self.reject(err, &mut state));
        }

        match state.res.take() {
            Some(response) => Ok(response),
            None => Err(self.reject(
                Error::validation("request completed without a response"),
                &mut state,
            )),
        }
    }

    fn reject(&self, err: Error, state: &mut PipelineState) -> Error {
        let err = match state.res.take() {
            Some(response) => err.with_response(response),
            None => err,
        };
        let err = match &state.opts.name {
            Some(name) => err.prefixed(name),
            None => err,
        };
        self.named(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::from_fn;

    #[test]
    fn test_retry_requires_response_phase() {
        let mut state = PipelineState::new(RequestOptions::new("/"));
        let err = state.retry().unwrap_err();
        assert!(err.is_validation());

        state.phase = Phase::Response;
        assert!(matches!(state.retry().unwrap(), Flow::Retry(_)));
    }

    #[test]
    fn test_retry_rejected_when_not_retryable() {
        let mut state = PipelineState::new(RequestOptions::new("/"));
        state.phase = Phase::Response;
        state.retryable = false;

        let err = state.retry().unwrap_err();
        assert_eq!(err.to_string(), "request is not retryable");
    }

    #[test]
    fn test_retry_clears_outcome() {
        let mut state = PipelineState::new(RequestOptions::new("/"));
        state.phase = Phase::Response;
        state.res = Some(Response::new(http::StatusCode::BAD_GATEWAY));
        state.err = Some(Error::validation("x"));

        state.retry().unwrap();
        assert!(state.res.is_none());
        assert!(state.err.is_none());
    }

    #[tokio::test]
    async fn test_resolve_stops_the_stack() {
        let client = Client::new("http://example.org").unwrap();
        let stack = vec![
            Stage::Hook(
                Phase::Create,
                Arc::new(from_fn(|_| Ok(Flow::Resolve(Response::new(http::StatusCode::ACCEPTED))))),
            ),
            Stage::Hook(
                Phase::Create,
                Arc::new(from_fn(|_| Err(Error::validation("unreachable")))),
            ),
        ];

        let response = client
            .dispatch(PipelineState::new(RequestOptions::new("/")), stack)
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_empty_stack_has_no_response() {
        let client = Client::builder()
            .base_url("http://example.org")
            .name("api")
            .build()
            .unwrap();
        let state = PipelineState::new(RequestOptions::new("/").name("ping"));

        let err = client.dispatch(state, Vec::new()).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "api: ping: request completed without a response");
    }
}
