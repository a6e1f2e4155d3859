//! RemoteModelClient - model server communication adapter
//!
//! ## Responsibilities
//!
//! - Send frame analysis requests to the model server
//! - Handle response parsing
//! - Health probing for backend selection

use crate::detection::{FaceBox, ObjectDetection};
use crate::error::{Error, Result};
use crate::frame_sampler::Frame;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;

/// Model server client
pub struct RemoteModelClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

/// Frame analysis response from the model server
#[derive(Debug, Clone, Deserialize)]
pub struct FrameAnalysis {
    #[serde(default)]
    pub faces: Vec<FaceBox>,

    #[serde(default)]
    pub objects: Vec<ObjectDetection>,
}

impl RemoteModelClient {
    /// Create new client
    pub fn new(base_url: String) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(10))
    }

    /// Create new client with custom timeout
    pub fn with_timeout(base_url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url,
            timeout,
        }
    }

    /// Check model server health
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/healthz", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Analyze one frame.
    ///
    /// No retries: a failed call is a degraded frame, never a stalled loop.
    pub async fn analyze(&self, frame: &Frame) -> Result<FrameAnalysis> {
        let url = format!("{}/v1/frames/analyze", self.base_url);

        let form = Form::new()
            .part(
                "frame",
                Part::bytes(frame.data.clone())
                    .file_name("frame.rgb")
                    .mime_str("application/octet-stream")?,
            )
            .text("width", frame.width.to_string())
            .text("height", frame.height.to_string())
            .text("captured_at", frame.captured_at.to_rfc3339());

        let resp = self.client.post(&url).multipart(form).send().await?;

        if !resp.status().is_success() {
            return Err(Error::Detection(format!(
                "model server analysis failed: {}",
                resp.status()
            )));
        }

        let analysis: FrameAnalysis = resp.json().await?;
        Ok(analysis)
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_parses_with_missing_fields() {
        let analysis: FrameAnalysis = serde_json::from_str("{}").unwrap();
        assert!(analysis.faces.is_empty());
        assert!(analysis.objects.is_empty());

        let analysis: FrameAnalysis = serde_json::from_str(
            r#"{"faces":[{"x":10.0,"y":20.0,"width":64.0,"height":64.0,"confidence":0.88}],
                "objects":[{"label":"cell phone","confidence":0.55}]}"#,
        )
        .unwrap();
        assert_eq!(analysis.faces.len(), 1);
        assert_eq!(analysis.objects[0].label, "cell phone");
    }

    #[test]
    fn test_client_defaults() {
        let client = RemoteModelClient::new("http://localhost:9400".to_string());
        assert_eq!(client.base_url(), "http://localhost:9400");
        assert_eq!(client.timeout(), Duration::from_secs(10));
    }
}
