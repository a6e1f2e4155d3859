//! Violation event types and classification tables

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Integrity violation categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    /// No face visible in frame beyond the debounce window
    FaceNotVisible,
    /// Gaze held away from the screen beyond the debounce window
    LookingAway,
    /// More than one face in frame
    MultipleFaces,
    /// Mobile phone in frame
    PhoneDetected,
    /// Book or printed notes in frame
    BookDetected,
    /// Secondary device (laptop, tablet) in frame
    DeviceDetected,
    /// Prolonged absence after face loss
    CandidateAbsent,
}

impl ViolationType {
    /// Minimum interval between two emissions of this type
    pub fn cooldown(&self) -> Duration {
        match self {
            ViolationType::MultipleFaces => Duration::from_secs(15),
            ViolationType::FaceNotVisible => Duration::from_secs(20),
            ViolationType::LookingAway => Duration::from_secs(10),
            ViolationType::PhoneDetected
            | ViolationType::BookDetected
            | ViolationType::DeviceDetected => Duration::from_secs(30),
            _ => Duration::from_secs(10),
        }
    }

    /// Label for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationType::FaceNotVisible => "face_not_visible",
            ViolationType::LookingAway => "looking_away",
            ViolationType::MultipleFaces => "multiple_faces",
            ViolationType::PhoneDetected => "phone_detected",
            ViolationType::BookDetected => "book_detected",
            ViolationType::DeviceDetected => "device_detected",
            ViolationType::CandidateAbsent => "candidate_absent",
        }
    }
}

/// Violation severity, ordered from least to most serious
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Integrity score deduction for this severity
    pub fn deduction(&self) -> u32 {
        match self {
            Severity::Low => 2,
            Severity::Medium => 5,
            Severity::High => 10,
            Severity::Critical => 20,
        }
    }
}

/// Immutable violation record, appended to the session timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationEvent {
    pub id: Uuid,
    pub violation_type: ViolationType,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub severity: Severity,
    /// Seconds the underlying condition was held before emission, when debounced
    pub duration: Option<f64>,
}

impl ViolationEvent {
    /// Create a new event stamped with the current instant
    pub fn new(
        violation_type: ViolationType,
        severity: Severity,
        description: impl Into<String>,
        duration: Option<f64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            violation_type,
            timestamp: Utc::now(),
            description: description.into(),
            severity,
            duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
        assert_eq!(
            [Severity::High, Severity::Low, Severity::Critical]
                .into_iter()
                .max(),
            Some(Severity::Critical)
        );
    }

    #[test]
    fn test_deduction_table() {
        assert_eq!(Severity::Low.deduction(), 2);
        assert_eq!(Severity::Medium.deduction(), 5);
        assert_eq!(Severity::High.deduction(), 10);
        assert_eq!(Severity::Critical.deduction(), 20);
    }

    #[test]
    fn test_cooldown_table() {
        assert_eq!(
            ViolationType::MultipleFaces.cooldown(),
            Duration::from_secs(15)
        );
        assert_eq!(
            ViolationType::FaceNotVisible.cooldown(),
            Duration::from_secs(20)
        );
        assert_eq!(
            ViolationType::LookingAway.cooldown(),
            Duration::from_secs(10)
        );
        assert_eq!(
            ViolationType::PhoneDetected.cooldown(),
            Duration::from_secs(30)
        );
        // Unlisted types fall back to the default window
        assert_eq!(
            ViolationType::CandidateAbsent.cooldown(),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_event_serialization_round_trip() {
        let event = ViolationEvent::new(
            ViolationType::PhoneDetected,
            Severity::Critical,
            "Prohibited object detected: cell phone",
            None,
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("phone_detected"));
        assert!(json.contains("critical"));
        let back: ViolationEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, event.id);
        assert_eq!(back.violation_type, ViolationType::PhoneDetected);
    }
}
