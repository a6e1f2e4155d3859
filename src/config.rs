//! Monitor configuration
//!
//! All knobs resolve from the environment with working defaults so the
//! monitor can be constructed with `MonitorConfig::default()`.

use std::time::Duration;

/// Monitor configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Model server base URL (face/object detection backend)
    pub model_url: String,
    /// Model server request timeout
    pub model_timeout: Duration,
    /// Substitute the heuristic backend when the model server is unreachable
    pub allow_fallback: bool,
    /// Frame sampling cadence
    pub sample_interval: Duration,
    /// Faces below this confidence are excluded from the face count
    pub face_confidence_threshold: f32,
    /// Objects below this confidence are discarded
    pub object_confidence_threshold: f32,
    /// Normalized face-center offset from frame center counted as looking away
    pub gaze_offset_threshold: f32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            model_url: std::env::var("MODEL_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:9400".to_string()),
            model_timeout: Duration::from_secs(
                std::env::var("MODEL_TIMEOUT_SEC")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),
            allow_fallback: std::env::var("ALLOW_HEURISTIC_FALLBACK")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            sample_interval: Duration::from_millis(
                std::env::var("SAMPLE_INTERVAL_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1500),
            ),
            face_confidence_threshold: std::env::var("FACE_CONFIDENCE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.7),
            object_confidence_threshold: std::env::var("OBJECT_CONFIDENCE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.4),
            gaze_offset_threshold: std::env::var("GAZE_OFFSET_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let config = MonitorConfig::default();
        assert!(config.face_confidence_threshold > config.object_confidence_threshold);
        assert_eq!(config.sample_interval, Duration::from_millis(1500));
        assert!(config.allow_fallback);
    }
}
