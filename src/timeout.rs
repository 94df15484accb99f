use std::future::{pending, Future};
use std::time::Duration;

use tokio::time::sleep;

use crate::context::RequestContext;
use crate::error::{Error, Result};

/// Resolve the timeout bound for one exchange
///
/// The request value wins over the client default; a zero duration on
/// either side means no bound.
pub fn effective_timeout(request: Option<Duration>, client: Option<Duration>) -> Option<Duration> {
    request.or(client).filter(|timeout| !timeout.is_zero())
}

/// Race a future against a timeout and a cancellation handle
///
/// Whichever settles first wins; the losers are dropped, which aborts the
/// in-flight exchange.
pub async fn race<F, T>(future: F, timeout: Option<Duration>, ctx: Option<&RequestContext>) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let timer = async {
        match timeout {
            Some(duration) => sleep(duration).await,
            None => pending::<()>().await,
        }
    };

    let cancelled = async {
        match ctx {
            Some(ctx) => ctx.cancelled().await,
            None => pending::<()>().await,
        }
    };

    tokio::select! {
        result = future => result,
        _ = timer => Err(Error::timeout(timeout.unwrap_or_default())),
        _ = cancelled => Err(Error::abort("request aborted")),
    }
}
