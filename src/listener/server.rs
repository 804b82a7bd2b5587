//! Listener startup and the accept loop.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinSet;

use crate::config::{
    ConfigError, ListenerConfig, ACCEPT_BACKOFF_INITIAL_MS, ACCEPT_BACKOFF_MAX_MS,
};
use crate::health::ConnectionHandler;

use super::connection::{serve_connection, ConnectionLimits};

/// Listener startup error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A bound listener that hands every accepted connection to one handler.
pub struct HealthListener {
    listener: TcpListener,
    handler: Arc<dyn ConnectionHandler>,
    limits: ConnectionLimits,
    shutdown_grace: Duration,
}

impl HealthListener {
    /// Bind the configured address. Port 0 picks a free port.
    pub async fn bind(
        config: &ListenerConfig,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Result<Self, ServerError> {
        let addr = config.socket_addr()?;
        let listener = TcpListener::bind(addr).await?;

        Ok(Self {
            listener,
            handler,
            limits: ConnectionLimits {
                request_timeout: config.request_timeout(),
                max_request_bytes: config.max_request_bytes,
            },
            shutdown_grace: config.shutdown_grace(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` resolves, then drain sessions.
    pub async fn run_until_stopped<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut sessions = JoinSet::new();
        let mut backoff = AcceptBackoff::new();
        tokio::pin!(shutdown);

        match self.listener.local_addr() {
            Ok(addr) => tracing::info!(%addr, "Health listener accepting connections"),
            Err(e) => tracing::warn!(error = %e, "Health listener address unavailable"),
        }

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        backoff.reset();
                        let handler = Arc::clone(&self.handler);
                        let limits = self.limits;
                        sessions.spawn(async move {
                            serve_connection(stream, peer, handler.as_ref(), limits).await;
                        });
                    }
                    Err(e) => {
                        let stop = tokio::select! {
                            _ = &mut shutdown => true,
                            _ = backoff.pause(&e) => false,
                        };
                        if stop {
                            break;
                        }
                    }
                },
                // Reap finished sessions so the set does not grow unbounded.
                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Session task failed");
                    }
                }
            }
        }

        drop(self.listener);
        let in_flight = sessions.len();
        tracing::info!(
            in_flight,
            grace_secs = self.shutdown_grace.as_secs(),
            "Health listener stopped accepting, draining sessions"
        );

        let drain = async { while sessions.join_next().await.is_some() {} };
        if tokio::time::timeout(self.shutdown_grace, drain).await.is_err() {
            tracing::warn!("Grace period elapsed, aborting remaining sessions");
            sessions.abort_all();
        }

        tracing::info!("Health listener shut down");
    }
}

/// Capped exponential delay between accept attempts after failures.
///
/// Accept keeps failing while the process is out of file descriptors, so
/// retrying immediately would spin.
#[derive(Debug)]
struct AcceptBackoff {
    current: Option<Duration>,
}

impl AcceptBackoff {
    fn new() -> Self {
        Self { current: None }
    }

    fn next_delay(&mut self) -> Duration {
        let next = match self.current {
            None => Duration::from_millis(ACCEPT_BACKOFF_INITIAL_MS),
            Some(delay) => (delay * 2).min(Duration::from_millis(ACCEPT_BACKOFF_MAX_MS)),
        };
        self.current = Some(next);
        next
    }

    fn reset(&mut self) {
        self.current = None;
    }

    /// Log the accept failure and sleep for the next delay.
    async fn pause(&mut self, error: &std::io::Error) {
        let delay = self.next_delay();
        tracing::error!(
            error = %error,
            retry_in_ms = delay.as_millis() as u64,
            "Failed to accept connection"
        );
        tokio::time::sleep(delay).await;
    }
}
