use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

use crate::response::Response;

/// Boxed error used for caller-supplied failures and transport sources
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for papi operations
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of an [`Error`]
///
/// The first five kinds form the library's taxonomy. `Transport` covers
/// raw wire failures and `User` wraps errors raised by caller thunks,
/// which are passed through without being tagged or renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid configuration or request shape
    Validation,
    /// An encoder or decoder is missing or failed
    Codec,
    /// The peer answered with a non-2xx status
    Response,
    /// A timeout bound elapsed before completion
    Timeout,
    /// A cancellation signal terminated the request
    Abort,
    /// Connection, TLS or IO failure reported by the transport
    Transport,
    /// Error raised by a caller-supplied body or pipe thunk
    User,
}

/// Main error type for papi
///
/// Callers branch on the capability predicates (`is_validation`,
/// `is_timeout`, ...) rather than on a concrete type. When a response was
/// received before the failure it stays attached, so status, headers and
/// the raw body remain available for diagnostics.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    response: Option<Box<Response>>,
    source: Option<BoxError>,
}

impl Error {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            response: None,
            source: None,
        }
    }

    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a new codec error
    pub fn codec(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Codec, message)
    }

    /// Create a codec error that keeps the codec's own failure as source
    pub fn codec_with(message: impl Into<String>, source: BoxError) -> Self {
        let mut err = Self::new(ErrorKind::Codec, message);
        err.source = Some(source);
        err
    }

    /// Create a response error for a non-2xx answer
    pub fn response(message: impl Into<String>, response: Response) -> Self {
        let mut err = Self::new(ErrorKind::Response, message);
        err.response = Some(Box::new(response));
        err
    }

    /// Create a new timeout error
    pub fn timeout(duration: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("request timed out ({}ms)", duration.as_millis()),
        )
    }

    /// Create a new abort error
    pub fn abort(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Abort, message)
    }

    /// Create a transport error from a wire failure
    pub fn transport(source: impl Into<BoxError>) -> Self {
        let source = source.into();
        let mut err = Self::new(ErrorKind::Transport, source.to_string());
        err.source = Some(source);
        err
    }

    /// Wrap an error raised by caller code
    pub fn user(source: impl Into<BoxError>) -> Self {
        Self::transport(source).with_kind(ErrorKind::User)
    }

    fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        self.kind == ErrorKind::Validation
    }

    /// Check if this is a codec error
    pub fn is_codec(&self) -> bool {
        self.kind == ErrorKind::Codec
    }

    /// Check if this is a response error
    pub fn is_response(&self) -> bool {
        self.kind == ErrorKind::Response
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }

    /// Check if this is an abort error
    pub fn is_abort(&self) -> bool {
        self.kind == ErrorKind::Abort
    }

    /// Check if this is a transport error
    pub fn is_transport(&self) -> bool {
        self.kind == ErrorKind::Transport
    }

    /// Check if this error was raised by caller code
    pub fn is_user(&self) -> bool {
        self.kind == ErrorKind::User
    }

    /// Check if the error belongs to the library's own taxonomy
    pub fn is_papi(&self) -> bool {
        !matches!(self.kind, ErrorKind::Transport | ErrorKind::User)
    }

    /// Get the response received before the failure, if any
    pub fn response_ref(&self) -> Option<&Response> {
        self.response.as_deref()
    }

    /// Take the attached response out of the error
    pub fn into_response(self) -> Option<Response> {
        self.response.map(|r| *r)
    }

    /// Get the status code of the attached response
    pub fn status(&self) -> Option<StatusCode> {
        self.response.as_ref().map(|r| r.status())
    }

    /// Get the original error raised by caller code
    pub fn user_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self.kind {
            ErrorKind::User => self.source.as_deref(),
            _ => None,
        }
    }

    /// Attach a response unless one is already present
    pub(crate) fn with_response(mut self, response: Response) -> Self {
        if self.response.is_none() {
            self.response = Some(Box::new(response));
        }
        self
    }

    /// Prefix the message with a client or request name
    pub(crate) fn prefixed(mut self, name: &str) -> Self {
        if self.kind != ErrorKind::User {
            self.message = format!("{}: {}", name, self.message);
        }
        self
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Error::validation(format!("invalid header name: {}", err))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Error::validation(format!("invalid header value: {}", err))
    }
}

impl From<http::method::InvalidMethod> for Error {
    fn from(err: http::method::InvalidMethod) -> Self {
        Error::validation(format!("invalid method: {}", err))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::transport(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::transport(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_flags_are_exclusive() {
        let err = Error::validation("path required");
        assert!(err.is_validation());
        assert!(!err.is_codec());
        assert!(!err.is_timeout());
        assert!(err.is_papi());
        assert_eq!(err.to_string(), "path required");
    }

    #[test]
    fn test_timeout_message_embeds_bound() {
        let err = Error::timeout(Duration::from_millis(10));
        assert!(err.is_timeout());
        assert_eq!(err.message(), "request timed out (10ms)");
    }

    #[test]
    fn test_prefix_names() {
        let err = Error::abort("request aborted")
            .prefixed("method")
            .prefixed("client");
        assert_eq!(err.to_string(), "client: method: request aborted");
    }

    #[test]
    fn test_user_errors_pass_through() {
        let source = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err = Error::user(source).prefixed("client");

        assert!(err.is_user());
        assert!(!err.is_papi());
        assert_eq!(err.to_string(), "boom");
        assert!(err.user_error().is_some());
    }

    #[test]
    fn test_codec_keeps_source() {
        let err = Error::codec_with("decode (application/json) failed: eof", "eof".into());
        assert!(err.is_codec());
        assert!(std::error::Error::source(&err).is_some());
    }
}
