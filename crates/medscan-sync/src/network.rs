//! # Network Monitor
//!
//! Tracks reachability and turns offline → online edges into drain triggers.
//!
//! ## Observation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      NetworkMonitor Flow                                │
//! │                                                                         │
//! │   Platform reachability API        TcpProbe (spawn_probe_loop)         │
//! │            │                               │                            │
//! │            └───────────────┬───────────────┘                            │
//! │                            ▼                                            │
//! │                 report(NetworkState)                                   │
//! │                            │                                            │
//! │               same link as current? ──yes──► dropped (debounced)       │
//! │                            │ no                                         │
//! │                            ▼                                            │
//! │                 swap state, log transition                             │
//! │                            │                                            │
//! │             ┌──────────────┴──────────────┐                             │
//! │             ▼                             ▼                             │
//! │   every subscriber callback     offline → online edge?                 │
//! │                                           │ yes                         │
//! │                                           ▼                             │
//! │                              ONE reconnect signal on the               │
//! │                              drain trigger channel                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Probe failures never surface as errors. They degrade to an offline
//! observation.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use medscan_core::{ConnectionType, NetworkState};

// =============================================================================
// Subscriptions
// =============================================================================

/// Handle returned by [`NetworkMonitor::subscribe`].
pub type SubscriptionId = u64;

type Listener = Arc<dyn Fn(&NetworkState) + Send + Sync>;

// =============================================================================
// Network Monitor
// =============================================================================

/// Point-in-time reachability plus change notification.
pub struct NetworkMonitor {
    state: RwLock<NetworkState>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
    reconnect_tx: Mutex<Option<mpsc::UnboundedSender<NetworkState>>>,
}

impl NetworkMonitor {
    /// Creates a monitor that assumes the device starts offline, so the first
    /// online observation counts as a reconnect.
    pub fn new() -> Self {
        Self::with_state(NetworkState::offline())
    }

    /// Creates a monitor with a known initial state.
    pub fn with_state(initial: NetworkState) -> Self {
        NetworkMonitor {
            state: RwLock::new(initial),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            reconnect_tx: Mutex::new(None),
        }
    }

    /// Returns the latest observed state.
    pub fn current_state(&self) -> NetworkState {
        match self.state.read() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Shorthand for `current_state().is_online`.
    pub fn is_online(&self) -> bool {
        self.current_state().is_online
    }

    /// Wires the drain trigger. Replaces any previous sender.
    pub fn set_reconnect_trigger(&self, tx: mpsc::UnboundedSender<NetworkState>) {
        let mut slot = self.reconnect_tx.lock().unwrap_or_else(|p| p.into_inner());
        *slot = Some(tx);
    }

    /// Registers a callback fired on every state change.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&NetworkState) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut listeners = self.listeners.lock().unwrap_or_else(|p| p.into_inner());
        listeners.push((id, Arc::new(callback)));
        debug!(subscription = id, "Network listener subscribed");
        id
    }

    /// Removes a callback. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(|p| p.into_inner());
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }

    /// Feeds one observation into the monitor.
    ///
    /// Returns true if the state changed.
    pub fn report(&self, observed: NetworkState) -> bool {
        let previous = {
            let mut state = self.state.write().unwrap_or_else(|p| p.into_inner());
            if state.same_link(&observed) {
                return false;
            }
            std::mem::replace(&mut *state, observed.clone())
        };

        info!(
            prev_online = previous.is_online,
            prev_connection = %previous.connection_type,
            next_online = observed.is_online,
            next_connection = %observed.connection_type,
            "Network state changed"
        );

        // Snapshot so callbacks can subscribe/unsubscribe without deadlocking.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .map(|(_, l)| l.clone())
            .collect();

        for listener in listeners {
            listener(&observed);
        }

        if !previous.is_online && observed.is_online {
            self.signal_reconnect(observed);
        }

        true
    }

    fn signal_reconnect(&self, state: NetworkState) {
        let slot = self.reconnect_tx.lock().unwrap_or_else(|p| p.into_inner());
        match slot.as_ref() {
            Some(tx) => {
                if tx.send(state).is_err() {
                    warn!("Reconnect trigger closed, drain not scheduled");
                }
            }
            None => debug!("Reconnected with no drain trigger wired"),
        }
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Reachability Probe
// =============================================================================

/// Source of reachability observations.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Observes the network once. Must not fail: errors mean offline.
    async fn probe(&self) -> NetworkState;
}

/// Probe that opens a TCP connection to a known host.
///
/// TCP alone cannot tell Wi-Fi from cellular, so online observations carry
/// [`ConnectionType::Unknown`].
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    /// Creates a probe for `host:port`.
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        TcpProbe {
            addr: addr.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ReachabilityProbe for TcpProbe {
    async fn probe(&self) -> NetworkState {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(_)) => NetworkState::online(ConnectionType::Unknown),
            Ok(Err(e)) => {
                debug!(addr = %self.addr, error = %e, "Reachability probe failed");
                NetworkState::offline()
            }
            Err(_) => {
                debug!(addr = %self.addr, "Reachability probe timed out");
                NetworkState::offline()
            }
        }
    }
}

/// Polls `probe` on an interval and reports each observation.
///
/// Runs until a message arrives on `shutdown_rx` or its sender is dropped.
pub fn spawn_probe_loop(
    monitor: Arc<NetworkMonitor>,
    probe: Arc<dyn ReachabilityProbe>,
    every: Duration,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_ms = every.as_millis() as u64, "Reachability probe starting");

        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let observed = probe.probe().await;
                    monitor.report(observed);
                }

                _ = shutdown_rx.recv() => {
                    info!("Reachability probe shutting down");
                    break;
                }
            }
        }
    })
}
