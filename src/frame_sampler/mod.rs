//! Frame sampling
//!
//! ## Responsibilities
//!
//! - Pull frames from the live source at a fixed cadence
//! - Hand frames to the detection backend and the inference engine
//! - Guarantee at most one capture-to-detect cycle in flight

use crate::config::MonitorConfig;
use crate::detection::DetectionBackend;
use crate::error::Result;
use crate::violation_engine::ViolationEngine;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{interval, MissedTickBehavior};

/// One still frame pulled from the video source (RGB24)
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    /// Whether the frame carries decoded pixels. Sources report frames
    /// without dimensions while the stream is still warming up.
    pub fn is_ready(&self) -> bool {
        self.width > 0 && self.height > 0 && self.data.len() >= (self.width * self.height * 3) as usize
    }
}

/// Live frame provider (camera, stream decoder, test fixture)
#[async_trait::async_trait]
pub trait FrameSource: Send + Sync {
    /// Pull the most recent frame. `None` when the source has no frame yet.
    async fn next_frame(&self) -> Result<Option<Frame>>;
}

/// FrameSampler instance
pub struct FrameSampler {
    source: Arc<dyn FrameSource>,
    backend: Arc<DetectionBackend>,
    engine: Arc<ViolationEngine>,
    config: Arc<MonitorConfig>,
    running: Arc<RwLock<bool>>,
    in_flight: Arc<AtomicBool>,
}

impl FrameSampler {
    /// Create new FrameSampler
    pub fn new(
        source: Arc<dyn FrameSource>,
        backend: Arc<DetectionBackend>,
        engine: Arc<ViolationEngine>,
        config: Arc<MonitorConfig>,
    ) -> Self {
        Self {
            source,
            backend,
            engine,
            config,
            running: Arc::new(RwLock::new(false)),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the sampling loop
    pub async fn start(&self) {
        {
            let mut running = self.running.write().await;
            if *running {
                tracing::warn!("Sampler already running");
                return;
            }
            *running = true;
        }

        tracing::info!(
            interval_ms = self.config.sample_interval.as_millis() as u64,
            backend = self.backend.name(),
            "Starting frame sampler"
        );

        let source = self.source.clone();
        let backend = self.backend.clone();
        let engine = self.engine.clone();
        let config = self.config.clone();
        let running = self.running.clone();
        let in_flight = self.in_flight.clone();

        tokio::spawn(async move {
            let mut ticker = interval(config.sample_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                {
                    let is_running = running.read().await;
                    if !*is_running {
                        break;
                    }
                }

                // Skip (never queue) while the previous cycle is outstanding
                if in_flight
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    tracing::debug!("Previous detection cycle still in flight, tick skipped");
                    continue;
                }

                let source = source.clone();
                let backend = backend.clone();
                let engine = engine.clone();
                let config = config.clone();
                let in_flight = in_flight.clone();

                tokio::spawn(async move {
                    if let Err(e) = sample_once(&source, &backend, &engine, &config).await {
                        tracing::warn!(error = %e, "Frame cycle failed, skipping frame");
                    }
                    in_flight.store(false, Ordering::Release);
                });
            }

            tracing::info!("Frame sampler stopped");
        });
    }

    /// Stop the sampling loop
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
        tracing::info!("Stopping frame sampler");
    }
}

/// One capture-to-detect cycle
async fn sample_once(
    source: &Arc<dyn FrameSource>,
    backend: &Arc<DetectionBackend>,
    engine: &Arc<ViolationEngine>,
    config: &MonitorConfig,
) -> Result<()> {
    let frame = match source.next_frame().await? {
        Some(frame) => frame,
        None => return Ok(()),
    };

    if !frame.is_ready() {
        tracing::debug!("Frame not ready (no decoded dimensions), tick skipped");
        return Ok(());
    }

    let faces = backend.detect_faces(&frame, config).await?;
    let objects = backend.detect_objects(&frame, config).await?;

    engine.process_frame(&faces, &objects).await;

    Ok(())
}
