use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ContextState {
    canceled: bool,
    finished: bool,
}

/// Cancellation handle shared between a caller and its requests
///
/// Canceling the handle aborts any in-flight attempt subscribed to it.
/// Submitting a request with a handle that is already canceled or finished
/// fails before any network activity.
///
/// # Examples
///
/// ```rust
/// use papi::RequestContext;
///
/// let ctx = RequestContext::new();
/// let handle = ctx.clone();
/// handle.cancel();
/// assert!(ctx.is_canceled());
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    state: Arc<watch::Sender<ContextState>>,
}

impl RequestContext {
    /// Create a new, active context
    pub fn new() -> Self {
        let (sender, _) = watch::channel(ContextState::default());
        Self {
            state: Arc::new(sender),
        }
    }

    /// Cancel the context, aborting subscribed requests
    pub fn cancel(&self) {
        self.state.send_modify(|state| state.canceled = true);
    }

    /// Mark the context finished; later submissions are rejected
    pub fn finish(&self) {
        self.state.send_modify(|state| state.finished = true);
    }

    /// Check if the context was canceled
    pub fn is_canceled(&self) -> bool {
        self.state.borrow().canceled
    }

    /// Check if the context was finished
    pub fn is_finished(&self) -> bool {
        self.state.borrow().finished
    }

    /// Wait until the context is canceled
    ///
    /// The subscription lives as long as the returned future, so dropping it
    /// unsubscribes.
    pub async fn cancelled(&self) {
        let mut receiver = self.state.subscribe();
        if receiver.wait_for(|state| state.canceled).await.is_err() {
            // sender dropped: cancellation can no longer happen
            std::future::pending::<()>().await;
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
