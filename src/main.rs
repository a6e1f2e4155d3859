//! ExamWatch - exam monitoring demo binary
//!
//! Reference wiring: builds a monitor from the environment, runs it over a
//! synthetic frame source (real capture plugs in through `FrameSource`),
//! and logs the violation stream until interrupted.

use chrono::Utc;
use examwatch::frame_sampler::{Frame, FrameSource};
use examwatch::observer_hub::MonitorMessage;
use examwatch::{MonitorConfig, ProctorMonitor};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Flat gray frames: stands in for a camera while no capture layer is wired
struct SyntheticSource {
    width: u32,
    height: u32,
}

#[async_trait::async_trait]
impl FrameSource for SyntheticSource {
    async fn next_frame(&self) -> examwatch::Result<Option<Frame>> {
        Ok(Some(Frame {
            data: vec![128; (self.width * self.height * 3) as usize],
            width: self.width,
            height: self.height,
            captured_at: Utc::now(),
        }))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "examwatch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ExamWatch v{}", env!("CARGO_PKG_VERSION"));

    let config = MonitorConfig::default();
    tracing::info!(
        model_url = %config.model_url,
        sample_interval_ms = config.sample_interval.as_millis() as u64,
        allow_fallback = config.allow_fallback,
        "Configuration loaded"
    );

    let candidate = std::env::var("CANDIDATE_NAME").unwrap_or_else(|_| "demo-candidate".to_string());
    let source = Arc::new(SyntheticSource {
        width: 640,
        height: 480,
    });

    let monitor = ProctorMonitor::initialize(config, &candidate, source).await?;
    tracing::info!(backend = monitor.backend_name(), "Monitor ready");

    let (observer_id, mut rx) = monitor.subscribe().await;
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            match message {
                MonitorMessage::ViolationDetected(event) => {
                    tracing::warn!(
                        violation_type = event.violation_type.as_str(),
                        severity = ?event.severity,
                        description = %event.description,
                        "Violation"
                    );
                }
                MonitorMessage::ScoreUpdated(update) => {
                    tracing::info!(integrity_score = update.integrity_score, "Score updated");
                }
                MonitorMessage::SessionStopped(data) => {
                    tracing::info!(
                        session_id = %data.session_id,
                        integrity_score = data.integrity_score,
                        violations = data.violations.len(),
                        total_duration = data.total_duration,
                        "Session summary"
                    );
                }
                MonitorMessage::StatusUpdated(_) => {}
            }
        }
    });

    monitor.start().await;
    tracing::info!("Monitoring, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;

    monitor.stop().await;
    monitor.unsubscribe(&observer_id).await;

    let data = monitor.session_data().await;
    tracing::info!(
        candidate = %data.candidate_name,
        integrity_score = data.integrity_score,
        violations = data.violations.len(),
        "ExamWatch stopped"
    );

    Ok(())
}
