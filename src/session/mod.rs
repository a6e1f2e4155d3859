//! Session state management
//!
//! ## Responsibilities
//!
//! - Own the `SessionData` aggregate (violation timeline + integrity score)
//! - Own the live `MonitoringStatus` updated on every processed frame
//! - Session lifecycle (start/stop) and read-only snapshots for observers

use crate::scoring::compute_integrity_score;
use crate::violation_engine::types::{ViolationEvent, ViolationType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Live monitoring status, refreshed on every processed frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringStatus {
    pub is_recording: bool,
    pub face_detected: bool,
    pub objects_detected: Vec<String>,
    /// Condition currently held by a pending debounce timer, if any
    pub current_violation: Option<ViolationType>,
    pub violation_start_time: Option<DateTime<Utc>>,
}

impl Default for MonitoringStatus {
    fn default() -> Self {
        Self {
            is_recording: false,
            face_detected: false,
            objects_detected: Vec::new(),
            current_violation: None,
            violation_start_time: None,
        }
    }
}

/// One monitoring session: timeline, score, lifecycle timestamps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub candidate_name: String,
    pub session_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub violations: Vec<ViolationEvent>,
    /// Whole seconds from start to stop, finalized at stop
    pub total_duration: u64,
    pub integrity_score: u8,
}

impl SessionData {
    fn new(candidate_name: &str) -> Self {
        Self {
            candidate_name: candidate_name.to_string(),
            session_id: Uuid::new_v4(),
            start_time: Utc::now(),
            end_time: None,
            violations: Vec::new(),
            total_duration: 0,
            integrity_score: 100,
        }
    }
}

/// SessionManager instance
pub struct SessionManager {
    data: RwLock<SessionData>,
    status: RwLock<MonitoringStatus>,
}

impl SessionManager {
    /// Create a session for a candidate
    pub fn new(candidate_name: &str) -> Self {
        let data = SessionData::new(candidate_name);
        tracing::info!(
            session_id = %data.session_id,
            candidate = %data.candidate_name,
            "Session created"
        );
        Self {
            data: RwLock::new(data),
            status: RwLock::new(MonitoringStatus::default()),
        }
    }

    /// Begin recording. The violation timeline is preserved across restarts
    /// within the same session; only the start instant is reset.
    pub async fn start(&self) {
        let mut data = self.data.write().await;
        data.start_time = Utc::now();
        data.end_time = None;

        let mut status = self.status.write().await;
        status.is_recording = true;

        tracing::info!(session_id = %data.session_id, "Monitoring started");
    }

    /// Stop recording and finalize duration. Returns the finalized snapshot.
    pub async fn stop(&self) -> SessionData {
        let now = Utc::now();
        let mut data = self.data.write().await;
        data.end_time = Some(now);
        data.total_duration = (now - data.start_time).num_seconds().max(0) as u64;

        let mut status = self.status.write().await;
        status.is_recording = false;
        status.current_violation = None;
        status.violation_start_time = None;

        tracing::info!(
            session_id = %data.session_id,
            total_duration = data.total_duration,
            integrity_score = data.integrity_score,
            violations = data.violations.len(),
            "Monitoring stopped"
        );

        data.clone()
    }

    /// Append a violation and recompute the integrity score.
    /// Returns the updated score.
    pub async fn append_violation(&self, event: ViolationEvent) -> u8 {
        let mut data = self.data.write().await;
        data.violations.push(event);
        data.integrity_score = compute_integrity_score(&data.violations);
        data.integrity_score
    }

    /// Refresh the per-frame observation fields of the status
    pub async fn record_observation(
        &self,
        face_detected: bool,
        objects_detected: Vec<String>,
        current_violation: Option<(ViolationType, DateTime<Utc>)>,
    ) {
        let mut status = self.status.write().await;
        status.face_detected = face_detected;
        status.objects_detected = objects_detected;
        match current_violation {
            Some((violation_type, started_at)) => {
                status.current_violation = Some(violation_type);
                status.violation_start_time = Some(started_at);
            }
            None => {
                status.current_violation = None;
                status.violation_start_time = None;
            }
        }
    }

    /// Session identifier
    pub async fn session_id(&self) -> Uuid {
        self.data.read().await.session_id
    }

    /// Whether the session is currently recording
    pub async fn is_recording(&self) -> bool {
        self.status.read().await.is_recording
    }

    /// Snapshot of the session aggregate
    pub async fn session_data(&self) -> SessionData {
        self.data.read().await.clone()
    }

    /// Snapshot of the live status
    pub async fn status(&self) -> MonitoringStatus {
        self.status.read().await.clone()
    }
}
