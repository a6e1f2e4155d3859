//! Detection adapter - perception backend boundary
//!
//! ## Responsibilities
//!
//! - Uniform face/object detection contract over swappable backends
//! - Backend selection at initialization (model server, heuristic fallback)
//! - Gaze direction analysis (pure geometry over face boxes)
//!
//! Callers never observe which backend variant is active; a degraded
//! backend returns the same shapes at lower fidelity.

pub mod heuristic;
pub mod remote;

use crate::config::MonitorConfig;
use crate::error::{Error, Result};
use crate::frame_sampler::Frame;
use serde::{Deserialize, Serialize};

pub use heuristic::HeuristicAnalyzer;
pub use remote::RemoteModelClient;

/// Object classes considered suspicious during an exam
pub const SUSPICIOUS_OBJECT_CLASSES: &[&str] = &[
    "cell phone",
    "mobile phone",
    "telephone",
    "phone",
    "book",
    "laptop",
    "tablet",
    "tv",
    "remote",
];

/// Detected face bounding box in frame pixel coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

impl FaceBox {
    /// Box center
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Per-frame face detection result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceResult {
    pub has_face: bool,
    /// Number of faces above the confidence threshold
    pub count: u32,
    pub multiple_faces: bool,
    pub faces: Vec<FaceBox>,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl FaceResult {
    /// Build a result from raw candidate boxes, applying the confidence cut
    pub fn from_candidates(
        candidates: Vec<FaceBox>,
        frame_width: u32,
        frame_height: u32,
        confidence_threshold: f32,
    ) -> Self {
        let faces: Vec<FaceBox> = candidates
            .into_iter()
            .filter(|f| f.confidence >= confidence_threshold)
            .collect();
        let count = faces.len() as u32;
        Self {
            has_face: count > 0,
            count,
            multiple_faces: count > 1,
            faces,
            frame_width,
            frame_height,
        }
    }

    /// Result for a frame with no detections
    pub fn empty(frame_width: u32, frame_height: u32) -> Self {
        Self {
            has_face: false,
            count: 0,
            multiple_faces: false,
            faces: Vec::new(),
            frame_width,
            frame_height,
        }
    }
}

/// Detected suspicious object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectDetection {
    pub label: String,
    pub confidence: f32,
}

/// Gaze direction verdict for a single face
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GazeAnalysis {
    pub is_looking_away: bool,
    pub confidence: f32,
}

/// Classify gaze from face-box geometry.
///
/// The face center is compared against the frame center; a normalized
/// offset beyond `offset_threshold` on either axis counts as looking away.
/// Confidence grows with the distance from the threshold boundary.
pub fn analyze_looking_direction(
    face: &FaceBox,
    frame_width: u32,
    frame_height: u32,
    offset_threshold: f32,
) -> GazeAnalysis {
    if frame_width == 0 || frame_height == 0 {
        return GazeAnalysis {
            is_looking_away: false,
            confidence: 0.0,
        };
    }

    let (cx, cy) = face.center();
    let dx = (cx - frame_width as f32 / 2.0).abs() / frame_width as f32;
    let dy = (cy - frame_height as f32 / 2.0).abs() / frame_height as f32;
    let offset = dx.max(dy);

    let is_looking_away = offset > offset_threshold;
    let confidence = if is_looking_away {
        ((offset - offset_threshold) / offset_threshold).clamp(0.0, 1.0)
    } else {
        ((offset_threshold - offset) / offset_threshold).clamp(0.0, 1.0)
    };

    GazeAnalysis {
        is_looking_away,
        confidence,
    }
}

/// Perception backend, selected once at initialization
pub enum DetectionBackend {
    /// Remote model server (full fidelity)
    Model(RemoteModelClient),
    /// Local pixel heuristics (degraded fidelity)
    Heuristic(HeuristicAnalyzer),
}

impl DetectionBackend {
    /// Select a backend: probe the model server, fall back to heuristics
    /// when it is unreachable and fallback is allowed.
    pub async fn initialize(config: &MonitorConfig) -> Result<Self> {
        let client = RemoteModelClient::with_timeout(config.model_url.clone(), config.model_timeout);

        match client.health_check().await {
            Ok(true) => {
                tracing::info!(model_url = %config.model_url, "Detection backend: model server");
                return Ok(DetectionBackend::Model(client));
            }
            Ok(false) | Err(_) => {
                if !config.allow_fallback {
                    return Err(Error::Initialization(format!(
                        "model server unreachable at {} and fallback disabled",
                        config.model_url
                    )));
                }
            }
        }

        tracing::warn!(
            model_url = %config.model_url,
            "Model server unreachable, falling back to heuristic analysis"
        );
        Ok(DetectionBackend::Heuristic(HeuristicAnalyzer::new()))
    }

    /// Backend name for logging
    pub fn name(&self) -> &'static str {
        match self {
            DetectionBackend::Model(_) => "model",
            DetectionBackend::Heuristic(_) => "heuristic",
        }
    }

    /// Detect faces in a frame
    pub async fn detect_faces(&self, frame: &Frame, config: &MonitorConfig) -> Result<FaceResult> {
        let candidates = match self {
            DetectionBackend::Model(client) => client.analyze(frame).await?.faces,
            DetectionBackend::Heuristic(analyzer) => analyzer.find_faces(frame).await,
        };

        Ok(FaceResult::from_candidates(
            candidates,
            frame.width,
            frame.height,
            config.face_confidence_threshold,
        ))
    }

    /// Detect suspicious objects in a frame
    pub async fn detect_objects(
        &self,
        frame: &Frame,
        config: &MonitorConfig,
    ) -> Result<Vec<ObjectDetection>> {
        let raw = match self {
            DetectionBackend::Model(client) => client.analyze(frame).await?.objects,
            // The heuristic backend cannot label objects
            DetectionBackend::Heuristic(_) => Vec::new(),
        };

        Ok(raw
            .into_iter()
            .filter(|o| o.confidence >= config.object_confidence_threshold)
            .filter(|o| {
                let label = o.label.to_lowercase();
                SUSPICIOUS_OBJECT_CLASSES.iter().any(|c| *c == label)
            })
            .collect())
    }
}
