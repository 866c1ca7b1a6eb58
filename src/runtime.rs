//! Generic background-service host shared by both binaries.
//!
//! Both services are a handful of cooperating long-lived tasks (an HTTP
//! server plus some number of periodic loops) that must all shut down
//! cleanly on the same signal. `Services` spawns each as a child of one
//! root [`CancellationToken`] and joins them on shutdown, surfacing the
//! first error encountered.

use std::future::Future;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct Services {
    root: CancellationToken,
    handles: Vec<(String, JoinHandle<Result<()>>)>,
}

impl Services {
    pub fn new() -> Self {
        Self {
            root: CancellationToken::new(),
            handles: Vec::new(),
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.root.child_token()
    }

    /// Spawns `f` as a named service, handing it a child of the root
    /// cancellation token. `f` is expected to return once that token is
    /// cancelled.
    pub fn spawn<F, Fut>(&mut self, name: impl Into<String>, f: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let token = self.root.child_token();
        let handle = tokio::spawn(f(token));
        self.handles.push((name.into(), handle));
    }

    /// Cancels the root token and waits for every service to return,
    /// returning the first error encountered (if any). Services are
    /// joined in spawn order; this only affects which error surfaces
    /// first when several fail simultaneously.
    pub async fn shutdown(self) -> Result<()> {
        self.root.cancel();

        for (name, handle) in self.handles {
            match handle.await {
                Ok(Ok(())) => info!(service = %name, "service shut down cleanly"),
                Ok(Err(err)) => return Err(err),
                Err(join_err) => return Err(join_err.into()),
            }
        }

        Ok(())
    }
}

impl Default for Services {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once SIGINT or SIGTERM (SIGTERM is unix-only) is received.
pub async fn wait_for_shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
