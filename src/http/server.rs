//! Proxy server: accept loop and session dispatch.
//!
//! # Responsibilities
//! - Accept connections through the bounded listener
//! - Spawn one self-cleaning task per connection
//! - Stop accepting on shutdown and let in-flight sessions drain

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::broadcast;

use crate::config::ProxyConfig;
use crate::http::session::{Session, SessionContext};
use crate::net::{ConnectionPermit, ConnectionTracker, Listener, ListenerError};
use crate::observability::AccessLogger;

/// Pause after a failed accept (e.g. out of file descriptors) before retrying.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Forwarding proxy server.
pub struct ProxyServer {
    context: Arc<SessionContext>,
    tracker: ConnectionTracker,
    drain_timeout: Duration,
}

impl ProxyServer {
    /// Create a new server with the given configuration and access log.
    pub fn new(config: &ProxyConfig, logger: AccessLogger) -> Self {
        Self {
            context: Arc::new(SessionContext::from_config(config, logger)),
            tracker: ConnectionTracker::new(),
            drain_timeout: Duration::from_secs(config.timeouts.drain_secs),
        }
    }

    /// Live session counter, for observing the server from outside.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Serve until a shutdown signal arrives, then wait for in-flight
    /// sessions (up to the drain timeout).
    ///
    /// The loop never waits on a session: each one runs in its own task.
    pub async fn run(self, listener: Listener, mut shutdown: broadcast::Receiver<()>) -> Result<(), ListenerError> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(address = %addr, "Proxy server starting");
        }

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => self.spawn_session(stream, peer, permit),
                    Err(ListenerError::Accept(e)) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                    Err(e) => return Err(e),
                },
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown requested, no longer accepting connections");
                    break;
                }
            }
        }
        drop(listener);

        let active = self.tracker.active_count();
        if active > 0 {
            tracing::info!(active, timeout = ?self.drain_timeout, "Draining sessions");
            if tokio::time::timeout(self.drain_timeout, self.tracker.wait_for_drain())
                .await
                .is_err()
            {
                tracing::warn!(
                    remaining = self.tracker.active_count(),
                    "Drain timeout elapsed, abandoning sessions"
                );
            }
        }

        tracing::info!("Proxy server stopped");
        Ok(())
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr, permit: ConnectionPermit) {
        let guard = self.tracker.track();
        let session = Session::new(guard.id(), peer, stream, Arc::clone(&self.context));

        tokio::spawn(async move {
            let _permit = permit;
            let _guard = guard;
            session.run().await;
        });
    }
}
