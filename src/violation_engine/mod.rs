//! Violation inference engine
//!
//! ## Responsibilities
//!
//! - Per-frame rule evaluation over face/object detection results
//! - Debounce timers (single-shot, cancelable, at most one per type)
//! - Per-type and per-label cooldown ledgers
//! - Violation emission into the session timeline (single mutation point)

pub mod types;

use crate::config::MonitorConfig;
use crate::detection::{analyze_looking_direction, FaceResult, ObjectDetection};
use crate::observer_hub::{MonitorMessage, ObserverHub, ScoreUpdate};
use crate::session::SessionManager;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use types::{Severity, ViolationEvent, ViolationType};

/// Face must stay absent this long before a violation is emitted
const FACE_ABSENCE_DEBOUNCE: Duration = Duration::from_secs(10);
/// Gaze must stay averted this long before a violation is emitted
const LOOKING_AWAY_DEBOUNCE: Duration = Duration::from_secs(5);
/// Continued absence after a face-loss violation escalates after this long
const CANDIDATE_ABSENT_DEBOUNCE: Duration = Duration::from_secs(30);
/// Minimum interval between emissions for the same object label
const OBJECT_LABEL_COOLDOWN: Duration = Duration::from_secs(30);

/// Armed single-shot debounce timer
struct PendingTimer {
    /// Distinguishes this arming from earlier ones of the same type; a
    /// firing timer must present a matching generation to emit
    generation: u64,
    handle: JoinHandle<()>,
    started_at: DateTime<Utc>,
    started_instant: Instant,
}

/// Mutable inference state, single writer at a time
struct EngineState {
    type_cooldowns: HashMap<ViolationType, Instant>,
    label_cooldowns: HashMap<String, Instant>,
    pending: HashMap<ViolationType, PendingTimer>,
    next_generation: u64,
}

impl EngineState {
    fn new() -> Self {
        Self {
            type_cooldowns: HashMap::new(),
            label_cooldowns: HashMap::new(),
            pending: HashMap::new(),
            next_generation: 1,
        }
    }
}

/// ViolationEngine instance
pub struct ViolationEngine {
    session: Arc<SessionManager>,
    hub: Arc<ObserverHub>,
    config: Arc<MonitorConfig>,
    state: RwLock<EngineState>,
}

/// Map an object label to a violation type and severity
fn classify_object(label: &str) -> Option<(ViolationType, Severity)> {
    if label.contains("phone") {
        Some((ViolationType::PhoneDetected, Severity::Critical))
    } else if label.contains("book") {
        Some((ViolationType::BookDetected, Severity::High))
    } else if label.contains("laptop") || label.contains("tablet") {
        Some((ViolationType::DeviceDetected, Severity::High))
    } else {
        None
    }
}

/// Fixed description for debounce-driven violations
fn debounce_description(violation_type: ViolationType) -> &'static str {
    match violation_type {
        ViolationType::FaceNotVisible => "Face not visible in frame for an extended period",
        ViolationType::LookingAway => "Candidate looking away from the screen",
        ViolationType::CandidateAbsent => "Candidate absent from camera view",
        _ => "Integrity violation detected",
    }
}

impl ViolationEngine {
    /// Create new ViolationEngine
    pub fn new(
        session: Arc<SessionManager>,
        hub: Arc<ObserverHub>,
        config: Arc<MonitorConfig>,
    ) -> Self {
        Self {
            session,
            hub,
            config,
            state: RwLock::new(EngineState::new()),
        }
    }

    /// Evaluate all rules against one frame's detection results
    pub async fn process_frame(self: &Arc<Self>, face: &FaceResult, objects: &[ObjectDetection]) {
        // Face absence: debounced, resolved by any frame with a face
        if !face.has_face {
            self.start_debounce(
                ViolationType::FaceNotVisible,
                FACE_ABSENCE_DEBOUNCE,
                Severity::High,
            )
            .await;
        } else {
            self.cancel_debounce(ViolationType::FaceNotVisible).await;
            self.cancel_debounce(ViolationType::CandidateAbsent).await;
        }

        // Multiple faces: immediate
        if face.has_face && face.count > 1 && face.multiple_faces {
            self.add_violation(
                ViolationType::MultipleFaces,
                Severity::Critical,
                "Multiple faces detected in frame",
                None,
            )
            .await;
        }

        // Gaze: only evaluated when a face box is available
        match face.faces.first() {
            Some(first) => {
                let gaze = analyze_looking_direction(
                    first,
                    face.frame_width,
                    face.frame_height,
                    self.config.gaze_offset_threshold,
                );
                if gaze.is_looking_away {
                    self.start_debounce(
                        ViolationType::LookingAway,
                        LOOKING_AWAY_DEBOUNCE,
                        Severity::Medium,
                    )
                    .await;
                } else {
                    self.cancel_debounce(ViolationType::LookingAway).await;
                }
            }
            None => self.cancel_debounce(ViolationType::LookingAway).await,
        }

        // Suspicious objects: per-label cooldown layered under the type cooldown
        for object in objects {
            let label = object.label.to_lowercase();
            let Some((violation_type, severity)) = classify_object(&label) else {
                continue;
            };

            {
                let mut state = self.state.write().await;
                if let Some(last) = state.label_cooldowns.get(&label) {
                    if last.elapsed() < OBJECT_LABEL_COOLDOWN {
                        tracing::debug!(label = %label, "Object label in cooldown");
                        continue;
                    }
                }
                state.label_cooldowns.insert(label.clone(), Instant::now());
            }

            self.add_violation(
                violation_type,
                severity,
                format!("Prohibited object detected: {}", label),
                None,
            )
            .await;
        }

        // Status refresh: report the most serious pending condition
        let current = {
            let state = self.state.read().await;
            [
                ViolationType::CandidateAbsent,
                ViolationType::FaceNotVisible,
                ViolationType::LookingAway,
            ]
            .iter()
            .find_map(|t| state.pending.get(t).map(|p| (*t, p.started_at)))
        };
        self.session
            .record_observation(
                face.has_face,
                objects.iter().map(|o| o.label.to_lowercase()).collect(),
                current,
            )
            .await;
        self.hub
            .broadcast(MonitorMessage::StatusUpdated(self.session.status().await))
            .await;
    }

    /// Arm a debounce timer for a violation type. A no-op while a timer for
    /// that type is already pending: the original deadline stands.
    async fn start_debounce(
        self: &Arc<Self>,
        violation_type: ViolationType,
        delay: Duration,
        severity: Severity,
    ) {
        let mut state = self.state.write().await;
        if state.pending.contains_key(&violation_type) {
            return;
        }

        let generation = state.next_generation;
        state.next_generation += 1;

        let engine = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            engine.fire_debounce(violation_type, generation, severity).await;
        });

        state.pending.insert(
            violation_type,
            PendingTimer {
                generation,
                handle,
                started_at: Utc::now(),
                started_instant: Instant::now(),
            },
        );

        tracing::debug!(
            violation_type = violation_type.as_str(),
            delay_sec = delay.as_secs(),
            "Debounce timer armed"
        );
    }

    /// Cancel a pending debounce timer. Idempotent: canceling a type with
    /// no pending timer is a no-op.
    async fn cancel_debounce(&self, violation_type: ViolationType) {
        let mut state = self.state.write().await;
        if let Some(timer) = state.pending.remove(&violation_type) {
            timer.handle.abort();
            tracing::debug!(
                violation_type = violation_type.as_str(),
                "Debounce timer canceled"
            );
        }
    }

    /// Timer expiry path. The generation is validated under the state lock,
    /// so a timer canceled or superseded after its sleep can never emit.
    ///
    /// Returns a concrete boxed `Send` future rather than using `async fn`:
    /// this breaks the Send-inference cycle with `start_debounce`, which
    /// spawns this future (`fire_debounce` -> `start_debounce` -> spawn
    /// `fire_debounce`). Behavior is identical to an `async fn`.
    fn fire_debounce(
        self: &Arc<Self>,
        violation_type: ViolationType,
        generation: u64,
        severity: Severity,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> {
        let this = Arc::clone(self);
        Box::pin(async move {
            let held_for = {
                let mut state = this.state.write().await;
                match state.pending.get(&violation_type) {
                    Some(timer) if timer.generation == generation => {
                        let held = timer.started_instant.elapsed().as_secs_f64();
                        state.pending.remove(&violation_type);
                        held
                    }
                    _ => return,
                }
            };

            this.add_violation(
                violation_type,
                severity,
                debounce_description(violation_type),
                Some(held_for),
            )
            .await;

            // Absence that outlives the face-loss violation escalates
            if violation_type == ViolationType::FaceNotVisible {
                this.start_debounce(
                    ViolationType::CandidateAbsent,
                    CANDIDATE_ABSENT_DEBOUNCE,
                    Severity::Critical,
                )
                .await;
            }
        })
    }

    /// Emit a violation unless the type is cooling down. The single
    /// mutation point: appends to the timeline, recomputes the score, and
    /// notifies observers. Returns whether the event was emitted.
    pub async fn add_violation(
        &self,
        violation_type: ViolationType,
        severity: Severity,
        description: impl Into<String>,
        duration: Option<f64>,
    ) -> bool {
        {
            let mut state = self.state.write().await;
            if let Some(last) = state.type_cooldowns.get(&violation_type) {
                if last.elapsed() < violation_type.cooldown() {
                    tracing::debug!(
                        violation_type = violation_type.as_str(),
                        "Violation suppressed by type cooldown"
                    );
                    return false;
                }
            }
            state.type_cooldowns.insert(violation_type, Instant::now());
        }

        let event = ViolationEvent::new(violation_type, severity, description, duration);
        let integrity_score = self.session.append_violation(event.clone()).await;

        tracing::info!(
            violation_type = violation_type.as_str(),
            severity = ?severity,
            integrity_score = integrity_score,
            "Violation recorded"
        );

        let session_id = self.session.session_id().await;
        self.hub
            .broadcast(MonitorMessage::ViolationDetected(event))
            .await;
        self.hub
            .broadcast(MonitorMessage::ScoreUpdated(ScoreUpdate {
                session_id,
                integrity_score,
            }))
            .await;

        true
    }

    /// Cancel every pending timer and clear both cooldown ledgers. Called on
    /// session stop; no timer armed before this call can fire after it.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        for (_, timer) in state.pending.drain() {
            timer.handle.abort();
        }
        state.type_cooldowns.clear();
        state.label_cooldowns.clear();
        tracing::debug!("Inference state cleared");
    }

    /// Number of pending debounce timers (diagnostics)
    pub async fn pending_timer_count(&self) -> usize {
        self.state.read().await.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::FaceBox;

    fn engine() -> Arc<ViolationEngine> {
        let session = Arc::new(SessionManager::new("test-candidate"));
        let hub = Arc::new(ObserverHub::new());
        let config = Arc::new(MonitorConfig::default());
        Arc::new(ViolationEngine::new(session, hub, config))
    }

    fn face_absent() -> FaceResult {
        FaceResult::empty(640, 480)
    }

    fn face_present() -> FaceResult {
        FaceResult::from_candidates(
            vec![FaceBox {
                x: 270.0,
                y: 190.0,
                width: 100.0,
                height: 100.0,
                confidence: 0.9,
            }],
            640,
            480,
            0.7,
        )
    }

    #[test]
    fn test_object_classification() {
        assert_eq!(
            classify_object("cell phone"),
            Some((ViolationType::PhoneDetected, Severity::Critical))
        );
        assert_eq!(
            classify_object("book"),
            Some((ViolationType::BookDetected, Severity::High))
        );
        assert_eq!(
            classify_object("laptop"),
            Some((ViolationType::DeviceDetected, Severity::High))
        );
        assert_eq!(
            classify_object("tablet"),
            Some((ViolationType::DeviceDetected, Severity::High))
        );
        assert_eq!(classify_object("tv"), None);
    }

    #[tokio::test]
    async fn test_multiple_faces_emit_immediately() {
        let engine = engine();
        let face = FaceResult::from_candidates(
            vec![
                FaceBox {
                    x: 280.0,
                    y: 200.0,
                    width: 80.0,
                    height: 80.0,
                    confidence: 0.9,
                },
                FaceBox {
                    x: 480.0,
                    y: 200.0,
                    width: 80.0,
                    height: 80.0,
                    confidence: 0.85,
                },
            ],
            640,
            480,
            0.7,
        );

        engine.process_frame(&face, &[]).await;

        let data = engine.session.session_data().await;
        assert_eq!(data.violations.len(), 1);
        assert_eq!(
            data.violations[0].violation_type,
            ViolationType::MultipleFaces
        );
        assert_eq!(data.violations[0].severity, Severity::Critical);
        assert_eq!(data.integrity_score, 80);
    }

    #[tokio::test]
    async fn test_type_cooldown_suppresses_repeat() {
        let engine = engine();
        assert!(
            engine
                .add_violation(
                    ViolationType::MultipleFaces,
                    Severity::Critical,
                    "Multiple faces detected in frame",
                    None,
                )
                .await
        );
        assert!(
            !engine
                .add_violation(
                    ViolationType::MultipleFaces,
                    Severity::Critical,
                    "Multiple faces detected in frame",
                    None,
                )
                .await
        );

        let data = engine.session.session_data().await;
        assert_eq!(data.violations.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_reopens_after_window() {
        let engine = engine();
        assert!(
            engine
                .add_violation(
                    ViolationType::MultipleFaces,
                    Severity::Critical,
                    "Multiple faces detected in frame",
                    None,
                )
                .await
        );

        tokio::time::sleep(Duration::from_secs(16)).await;

        assert!(
            engine
                .add_violation(
                    ViolationType::MultipleFaces,
                    Severity::Critical,
                    "Multiple faces detected in frame",
                    None,
                )
                .await
        );
        let data = engine.session.session_data().await;
        assert_eq!(data.violations.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_face_absence_debounce_fires_once() {
        let engine = engine();
        engine.process_frame(&face_absent(), &[]).await;
        assert_eq!(engine.pending_timer_count().await, 1);

        tokio::time::sleep(Duration::from_secs(11)).await;

        let data = engine.session.session_data().await;
        assert_eq!(data.violations.len(), 1);
        assert_eq!(
            data.violations[0].violation_type,
            ViolationType::FaceNotVisible
        );
        let held = data.violations[0].duration.unwrap();
        assert!((10.0..11.0).contains(&held));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_absence_does_not_extend_deadline() {
        let engine = engine();
        engine.process_frame(&face_absent(), &[]).await;

        tokio::time::sleep(Duration::from_secs(6)).await;
        // Second absent frame mid-window must not re-arm the timer
        engine.process_frame(&face_absent(), &[]).await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        let data = engine.session.session_data().await;
        assert_eq!(data.violations.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_face_return_cancels_pending_timer() {
        let engine = engine();
        engine.process_frame(&face_absent(), &[]).await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        engine.process_frame(&face_present(), &[]).await;
        assert_eq!(engine.pending_timer_count().await, 0);

        tokio::time::sleep(Duration::from_secs(20)).await;
        let data = engine.session.session_data().await;
        assert!(data.violations.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_continued_absence_escalates() {
        let engine = engine();
        engine.process_frame(&face_absent(), &[]).await;

        // Face loss fires at 10s, escalation 30s later
        tokio::time::sleep(Duration::from_secs(41)).await;

        let data = engine.session.session_data().await;
        assert_eq!(data.violations.len(), 2);
        assert_eq!(
            data.violations[1].violation_type,
            ViolationType::CandidateAbsent
        );
        assert_eq!(data.violations[1].severity, Severity::Critical);
    }

    #[tokio::test(start_paused = true)]
    async fn test_label_cooldowns_are_independent() {
        let engine = engine();
        let laptop = ObjectDetection {
            label: "laptop".to_string(),
            confidence: 0.8,
        };
        let tablet = ObjectDetection {
            label: "tablet".to_string(),
            confidence: 0.8,
        };

        engine.process_frame(&face_present(), &[laptop.clone()]).await;
        // Different label passes its own ledger; the shared type cooldown
        // still bounds the emission rate
        engine.process_frame(&face_present(), &[tablet]).await;

        let data = engine.session.session_data().await;
        assert_eq!(data.violations.len(), 1);

        // The laptop label itself stays cooled down past the type window
        tokio::time::sleep(Duration::from_secs(20)).await;
        engine.process_frame(&face_present(), &[laptop]).await;
        let data = engine.session.session_data().await;
        assert_eq!(data.violations.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_timers_and_ledgers() {
        let engine = engine();
        engine.process_frame(&face_absent(), &[]).await;
        engine
            .add_violation(
                ViolationType::MultipleFaces,
                Severity::Critical,
                "Multiple faces detected in frame",
                None,
            )
            .await;

        engine.reset().await;
        assert_eq!(engine.pending_timer_count().await, 0);

        tokio::time::sleep(Duration::from_secs(15)).await;
        let data = engine.session.session_data().await;
        // The canceled timer never fired; the cooldown ledger was cleared
        assert_eq!(data.violations.len(), 1);
        assert!(
            engine
                .add_violation(
                    ViolationType::MultipleFaces,
                    Severity::Critical,
                    "Multiple faces detected in frame",
                    None,
                )
                .await
        );
    }

    #[tokio::test]
    async fn test_status_reflects_pending_condition() {
        let engine = engine();
        engine.process_frame(&face_absent(), &[]).await;

        let status = engine.session.status().await;
        assert!(!status.face_detected);
        assert_eq!(status.current_violation, Some(ViolationType::FaceNotVisible));
        assert!(status.violation_start_time.is_some());

        engine.process_frame(&face_present(), &[]).await;
        let status = engine.session.status().await;
        assert!(status.face_detected);
        assert_eq!(status.current_violation, None);
        assert!(status.violation_start_time.is_none());
    }
}
