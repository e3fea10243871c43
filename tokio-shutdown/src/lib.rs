//! Cooperative shutdown signal shared between a tracker and its background tasks.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A graceful shutdown manager for tokio applications
#[derive(Debug, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    /// Create a new Shutdown instance wrapped in Arc
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Trigger shutdown. Calling this more than once is harmless.
    pub fn shutdown(&self) {
        if !self.token.is_cancelled() {
            debug!("Shutdown requested");
        }
        self.token.cancel();
    }

    /// Check if shutdown has been triggered
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Get a clone of the cancellation token.
    /// This token can be shared across multiple tasks and components.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Run a task and trigger shutdown when it completes.
    /// The task is dropped, yielding `None`, if shutdown is requested first.
    pub fn shutdown_when_done<Fut, T>(
        self: &Arc<Self>,
        fut: Fut,
    ) -> tokio::task::JoinHandle<Option<T>>
    where
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let shutdown = Arc::clone(self);

        tokio::spawn(async move {
            if shutdown.is_cancelled() {
                return None;
            }

            tokio::pin!(fut);
            let result = tokio::select! {
                res = &mut fut => Some(res),
                _ = shutdown.token.cancelled() => None,
            };

            if result.is_some() {
                shutdown.shutdown();
            }

            result
        })
    }
}
