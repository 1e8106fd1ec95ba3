//! Bounded-time export handshake with the external renderer.
//!
//! The renderer answers export requests asynchronously, through a callback
//! the core does not control the timing of. The gateway bridges that
//! callback into an awaitable call: each request gets a unique token and a
//! one-shot reply channel, and only a response carrying the token of the
//! most recent outstanding request is ever accepted. Stale responses are
//! discarded, never resolved to a caller that has already moved on.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::DiagramSurface;

/// How long to wait for the renderer before giving up on an export.
pub const EXPORT_TIMEOUT: Duration = Duration::from_secs(10);

/// Identifies one export request. Monotonic per gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExportToken(u64);

impl fmt::Display for ExportToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "export#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("diagram export timed out after {0} seconds")]
    TimedOut(u64),

    #[error("diagram export superseded by a newer request")]
    Superseded,
}

struct PendingExport {
    token: ExportToken,
    reply: oneshot::Sender<String>,
}

pub struct ExportGateway {
    surface: Arc<dyn DiagramSurface>,
    pending: Mutex<Option<PendingExport>>,
    next_token: AtomicU64,
}

impl ExportGateway {
    pub fn new(surface: Arc<dyn DiagramSurface>) -> Self {
        Self {
            surface,
            pending: Mutex::new(None),
            next_token: AtomicU64::new(0),
        }
    }

    /// Fetch the diagram's current serialized state, waiting at most
    /// `timeout` for the renderer to answer.
    ///
    /// At most one request is outstanding at a time: a newer call replaces
    /// the pending slot and the superseded caller fails with
    /// [`ExportError::Superseded`].
    pub async fn fetch_current(&self, timeout: Duration) -> Result<String, ExportError> {
        let token = ExportToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        let (reply, response) = oneshot::channel();

        if let Some(stale) = self.pending().replace(PendingExport { token, reply }) {
            // Dropping the stale sender wakes its caller with Superseded.
            warn!(stale = %stale.token, newer = %token, "superseding pending export request");
        }

        self.surface.request_export(token).await;

        match tokio::time::timeout(timeout, response).await {
            Ok(Ok(snapshot)) => Ok(snapshot),
            Ok(Err(_)) => Err(ExportError::Superseded),
            Err(_) => {
                // Empty the slot so a late reply for this token is discarded.
                let mut pending = self.pending();
                if pending.as_ref().is_some_and(|p| p.token == token) {
                    pending.take();
                }
                warn!(token = %token, "diagram export timed out");
                Err(ExportError::TimedOut(timeout.as_secs()))
            }
        }
    }

    /// Entry point for the renderer's export callback. A response is only
    /// accepted if `token` matches the most recent outstanding request.
    pub fn deliver(&self, token: ExportToken, snapshot: String) {
        let mut pending = self.pending();
        match pending.take() {
            Some(p) if p.token == token => {
                // The receiver may already be gone if the caller timed out
                // between our lock and its cleanup.
                let _ = p.reply.send(snapshot);
            }
            Some(p) => {
                debug!(stale = %token, current = %p.token, "discarding stale export response");
                *pending = Some(p);
            }
            None => {
                debug!(token = %token, "discarding export response with no pending request");
            }
        }
    }

    fn pending(&self) -> MutexGuard<'_, Option<PendingExport>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
