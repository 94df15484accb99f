use std::fmt;
use std::sync::Arc;

use crate::client::Client;
use crate::error::Error;
use crate::response::Response;
use crate::transport::TransportRequest;

/// Tag carried by every event the library emits
pub const TAG: &str = "papi";

/// Payload of a log event
#[derive(Debug)]
pub enum LogData<'a> {
    /// A transport request is about to be sent
    Request(&'a TransportRequest),
    /// A response head was received
    Response(&'a Response),
    /// An attempt failed
    Error(&'a Error),
    /// The pipeline restarts; carries the attempts made so far
    Retry(u32),
}

/// Tagged event delivered to log subscribers
#[derive(Debug)]
pub struct LogEvent<'a> {
    pub tags: &'a [String],
    pub data: LogData<'a>,
}

impl LogEvent<'_> {
    /// Check if the event carries a tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

impl fmt::Display for LogEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.tags.join(","))?;
        match &self.data {
            LogData::Request(req) => write!(f, "{} {}", req.method, req.url()),
            LogData::Response(res) => write!(f, "{} {} {}", res.method(), res.path(), res.status()),
            LogData::Error(err) => write!(f, "{}", err),
            LogData::Retry(attempts) => write!(f, "retry after {} attempts", attempts),
        }
    }
}

/// Callback receiving log events
pub type LogSubscriber = Arc<dyn Fn(&LogEvent<'_>) + Send + Sync>;

impl Client {
    pub(crate) fn event_tags(&self, kind: &[&str], tags: &[String]) -> Vec<String> {
        std::iter::once(TAG)
            .chain(kind.iter().copied())
            .map(str::to_string)
            .chain(tags.iter().cloned())
            .collect()
    }

    /// Send an event to tracing and every subscriber
    pub(crate) fn emit(&self, tags: &[String], data: LogData<'_>) {
        let event = LogEvent { tags, data };

        match &event.data {
            LogData::Error(_) | LogData::Retry(_) => tracing::warn!(tags = ?event.tags, "{}", event),
            _ => tracing::debug!(tags = ?event.tags, "{}", event),
        }

        for subscriber in self.subscribers() {
            subscriber(&event);
        }
    }
}
