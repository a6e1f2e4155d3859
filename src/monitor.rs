//! Monitor facade
//!
//! Wires the detection backend, frame sampler, inference engine, session
//! state and observer hub into one lifecycle-managed unit.

use crate::config::MonitorConfig;
use crate::detection::DetectionBackend;
use crate::error::Result;
use crate::frame_sampler::{Frame, FrameSampler, FrameSource};
use crate::observer_hub::{MonitorMessage, ObserverHub};
use crate::session::{MonitoringStatus, SessionData, SessionManager};
use crate::violation_engine::ViolationEngine;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// ProctorMonitor instance
pub struct ProctorMonitor {
    config: Arc<MonitorConfig>,
    backend: Arc<DetectionBackend>,
    session: Arc<SessionManager>,
    engine: Arc<ViolationEngine>,
    hub: Arc<ObserverHub>,
    sampler: FrameSampler,
}

impl ProctorMonitor {
    /// Initialize with automatic backend selection. Fails only when no
    /// detection backend can be brought up at all.
    pub async fn initialize(
        config: MonitorConfig,
        candidate_name: &str,
        source: Arc<dyn FrameSource>,
    ) -> Result<Self> {
        let backend = DetectionBackend::initialize(&config).await?;
        Ok(Self::with_backend(config, candidate_name, source, backend))
    }

    /// Assemble the monitor around an already-selected backend
    pub fn with_backend(
        config: MonitorConfig,
        candidate_name: &str,
        source: Arc<dyn FrameSource>,
        backend: DetectionBackend,
    ) -> Self {
        let config = Arc::new(config);
        let backend = Arc::new(backend);
        let hub = Arc::new(ObserverHub::new());
        let session = Arc::new(SessionManager::new(candidate_name));
        let engine = Arc::new(ViolationEngine::new(
            session.clone(),
            hub.clone(),
            config.clone(),
        ));
        let sampler = FrameSampler::new(source, backend.clone(), engine.clone(), config.clone());

        tracing::info!(backend = backend.name(), "Proctor monitor initialized");

        Self {
            config,
            backend,
            session,
            engine,
            hub,
            sampler,
        }
    }

    /// Begin monitoring: mark the session recording and start the sampler
    pub async fn start(&self) {
        self.session.start().await;
        self.sampler.start().await;
    }

    /// Stop monitoring: halt sampling, cancel pending timers, clear cooldown
    /// ledgers, finalize the session and notify observers.
    pub async fn stop(&self) {
        self.sampler.stop().await;
        self.engine.reset().await;
        let data = self.session.stop().await;
        self.hub
            .broadcast(MonitorMessage::SessionStopped(data))
            .await;
    }

    /// Run one inference cycle over a frame, outside the sampler cadence.
    /// Fire-and-forget: detection failures skip the frame and leave the
    /// status untouched.
    pub async fn process_frame(&self, frame: &Frame) {
        if !frame.is_ready() {
            tracing::debug!("Frame not ready (no decoded dimensions), skipped");
            return;
        }

        let faces = match self.backend.detect_faces(frame, &self.config).await {
            Ok(faces) => faces,
            Err(e) => {
                tracing::warn!(error = %e, "Face detection failed, frame skipped");
                return;
            }
        };
        let objects = match self.backend.detect_objects(frame, &self.config).await {
            Ok(objects) => objects,
            Err(e) => {
                tracing::warn!(error = %e, "Object detection failed, frame skipped");
                return;
            }
        };

        self.engine.process_frame(&faces, &objects).await;
    }

    /// Register an observer for violation/status/score notifications
    pub async fn subscribe(&self) -> (Uuid, mpsc::UnboundedReceiver<MonitorMessage>) {
        self.hub.register().await
    }

    /// Remove a registered observer
    pub async fn unsubscribe(&self, id: &Uuid) {
        self.hub.unregister(id).await;
    }

    /// Snapshot of the session aggregate
    pub async fn session_data(&self) -> SessionData {
        self.session.session_data().await
    }

    /// Snapshot of the live monitoring status
    pub async fn status(&self) -> MonitoringStatus {
        self.session.status().await
    }

    /// Name of the active detection backend
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::HeuristicAnalyzer;
    use crate::error::Result as CrateResult;
    use chrono::Utc;

    struct NoFrames;

    #[async_trait::async_trait]
    impl FrameSource for NoFrames {
        async fn next_frame(&self) -> CrateResult<Option<Frame>> {
            Ok(None)
        }
    }

    fn monitor() -> ProctorMonitor {
        ProctorMonitor::with_backend(
            MonitorConfig::default(),
            "test-candidate",
            Arc::new(NoFrames),
            DetectionBackend::Heuristic(HeuristicAnalyzer::new()),
        )
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let monitor = monitor();
        assert_eq!(monitor.backend_name(), "heuristic");

        monitor.start().await;
        assert!(monitor.status().await.is_recording);

        monitor.stop().await;
        let data = monitor.session_data().await;
        assert!(data.end_time.is_some());
        assert!(!monitor.status().await.is_recording);
    }

    #[tokio::test]
    async fn test_stop_notifies_observers() {
        let monitor = monitor();
        let (_id, mut rx) = monitor.subscribe().await;

        monitor.start().await;
        monitor.stop().await;

        let mut saw_stop = false;
        while let Ok(msg) = rx.try_recv() {
            if matches!(msg, MonitorMessage::SessionStopped(_)) {
                saw_stop = true;
            }
        }
        assert!(saw_stop);
    }

    #[tokio::test]
    async fn test_unready_frame_is_ignored() {
        let monitor = monitor();
        let frame = Frame {
            data: Vec::new(),
            width: 0,
            height: 0,
            captured_at: Utc::now(),
        };
        monitor.process_frame(&frame).await;

        let status = monitor.status().await;
        assert!(!status.face_detected);
        assert!(status.current_violation.is_none());
    }
}
