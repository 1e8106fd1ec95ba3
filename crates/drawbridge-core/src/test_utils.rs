//! Test doubles for the canvas and transport seams.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::{Notify, mpsc};

use crate::canvas::{DiagramSurface, ExportGateway, ExportToken, LoadError};
use crate::transport::{ChatTransport, OutgoingTurn, TransportError, TurnEvent};

/// What a freshly cleared renderer displays.
pub const DEFAULT_SNAPSHOT: &str = "<mxGraphModel><root/></mxGraphModel>";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory renderer. Owns a snapshot string the way the real editor owns
/// the diagram; answers export requests through a wired gateway, or stays
/// silent to exercise the timeout paths.
pub struct StubSurface {
    snapshot: Mutex<String>,
    respond: bool,
    gateway: Mutex<Option<Arc<ExportGateway>>>,
    requested: Mutex<Vec<ExportToken>>,
    request_seen: Notify,
    loaded: Mutex<Vec<String>>,
    next_load_error: Mutex<Option<String>>,
    clear_calls: AtomicUsize,
}

impl StubSurface {
    pub fn with_snapshot(snapshot: &str) -> Self {
        Self::build(snapshot, true)
    }

    /// A surface that records export requests but never answers them.
    pub fn silent() -> Self {
        Self::build(DEFAULT_SNAPSHOT, false)
    }

    fn build(snapshot: &str, respond: bool) -> Self {
        Self {
            snapshot: Mutex::new(snapshot.to_string()),
            respond,
            gateway: Mutex::new(None),
            requested: Mutex::new(Vec::new()),
            request_seen: Notify::new(),
            loaded: Mutex::new(Vec::new()),
            next_load_error: Mutex::new(None),
            clear_calls: AtomicUsize::new(0),
        }
    }

    /// Connect the export callback to a gateway, as the embedding bridge
    /// does for the real renderer.
    pub fn wire_gateway(&self, gateway: &Arc<ExportGateway>) {
        *lock(&self.gateway) = Some(gateway.clone());
    }

    pub fn current_snapshot(&self) -> String {
        lock(&self.snapshot).clone()
    }

    pub fn requested_tokens(&self) -> Vec<ExportToken> {
        lock(&self.requested).clone()
    }

    pub async fn wait_for_requests(&self, count: usize) {
        loop {
            if lock(&self.requested).len() >= count {
                return;
            }
            let notified = self.request_seen.notified();
            if lock(&self.requested).len() >= count {
                return;
            }
            notified.await;
        }
    }

    pub fn loaded_snapshots(&self) -> Vec<String> {
        lock(&self.loaded).clone()
    }

    pub fn fail_next_load(&self, message: &str) {
        *lock(&self.next_load_error) = Some(message.to_string());
    }

    pub fn clear_calls(&self) -> usize {
        self.clear_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl DiagramSurface for StubSurface {
    async fn request_export(&self, token: ExportToken) {
        lock(&self.requested).push(token);
        self.request_seen.notify_waiters();
        if self.respond {
            let gateway = lock(&self.gateway).clone();
            if let Some(gateway) = gateway {
                gateway.deliver(token, self.current_snapshot());
            }
        }
    }

    async fn load(&self, snapshot: &str) -> Result<(), LoadError> {
        if let Some(message) = lock(&self.next_load_error).take() {
            return Err(LoadError::new(message));
        }
        lock(&self.loaded).push(snapshot.to_string());
        *lock(&self.snapshot) = snapshot.to_string();
        Ok(())
    }

    async fn clear(&self) {
        self.clear_calls.fetch_add(1, Ordering::Relaxed);
        *lock(&self.snapshot) = DEFAULT_SNAPSHOT.to_string();
    }
}

/// Transport that plays back a scripted list of event streams, one per
/// turn, and records every outgoing turn it was asked to run.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Vec<TurnEvent>>>,
    turns: Mutex<Vec<OutgoingTurn>>,
    fail_to_start: Mutex<Option<TransportError>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Vec<TurnEvent>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            turns: Mutex::new(Vec::new()),
            fail_to_start: Mutex::new(None),
        }
    }

    pub fn fail_next_start(&self, message: &str) {
        *lock(&self.fail_to_start) = Some(TransportError::new(message));
    }

    pub fn turns(&self) -> Vec<OutgoingTurn> {
        lock(&self.turns).clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn start_turn(
        &self,
        turn: OutgoingTurn,
    ) -> Result<mpsc::Receiver<TurnEvent>, TransportError> {
        if let Some(error) = lock(&self.fail_to_start).take() {
            return Err(error);
        }
        lock(&self.turns).push(turn);

        let events = lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| vec![TurnEvent::Completed]);
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            let _ = tx.try_send(event);
        }
        Ok(rx)
    }
}
