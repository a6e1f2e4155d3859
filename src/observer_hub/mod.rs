//! ObserverHub - in-process event distribution
//!
//! ## Responsibilities
//!
//! - Observer registration management
//! - Violation and status broadcasting to all registered observers
//! - Session lifecycle notifications

use crate::session::{MonitoringStatus, SessionData};
use crate::violation_engine::types::ViolationEvent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Messages delivered to observers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum MonitorMessage {
    /// A violation was appended to the session timeline
    ViolationDetected(ViolationEvent),
    /// The live status was refreshed after a processed frame
    StatusUpdated(MonitoringStatus),
    /// The integrity score changed
    ScoreUpdated(ScoreUpdate),
    /// The session stopped; carries the finalized aggregate
    SessionStopped(SessionData),
}

/// Score change notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreUpdate {
    pub session_id: Uuid,
    pub integrity_score: u8,
}

/// Registered observer
struct ObserverConnection {
    id: Uuid,
    tx: mpsc::UnboundedSender<MonitorMessage>,
}

/// ObserverHub instance
pub struct ObserverHub {
    observers: RwLock<HashMap<Uuid, ObserverConnection>>,
    observer_count: AtomicU64,
}

impl ObserverHub {
    /// Create new ObserverHub
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
            observer_count: AtomicU64::new(0),
        }
    }

    /// Register a new observer
    pub async fn register(&self) -> (Uuid, mpsc::UnboundedReceiver<MonitorMessage>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let mut observers = self.observers.write().await;
            observers.insert(id, ObserverConnection { id, tx });
        }

        self.observer_count.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(observer_id = %id, "Observer registered");

        (id, rx)
    }

    /// Unregister an observer
    pub async fn unregister(&self, id: &Uuid) {
        let mut observers = self.observers.write().await;
        if observers.remove(id).is_some() {
            self.observer_count.fetch_sub(1, Ordering::Relaxed);
            tracing::debug!(observer_id = %id, "Observer unregistered");
        }
    }

    /// Broadcast a message to all observers
    pub async fn broadcast(&self, message: MonitorMessage) {
        let observers = self.observers.read().await;
        for conn in observers.values() {
            if let Err(e) = conn.tx.send(message.clone()) {
                tracing::warn!(observer_id = %conn.id, error = %e, "Failed to deliver message");
            }
        }
    }

    /// Get observer count
    pub fn observer_count(&self) -> u64 {
        self.observer_count.load(Ordering::Relaxed)
    }
}

impl Default for ObserverHub {
    fn default() -> Self {
        Self::new()
    }
}
