//! Integrity scoring
//!
//! ## Responsibilities
//!
//! - Reduce the violation timeline to a 0-100 integrity score
//! - Deterministic and order-independent: recomputation from the list
//!   always matches the incrementally maintained value

use crate::violation_engine::types::{Severity, ViolationEvent, ViolationType};
use std::collections::HashMap;

/// Compute the integrity score for a violation timeline.
///
/// Only the worst severity observed per violation type counts; repeated
/// events of a type already seen at equal or higher severity change nothing.
pub fn compute_integrity_score(violations: &[ViolationEvent]) -> u8 {
    let mut worst: HashMap<ViolationType, Severity> = HashMap::new();

    for event in violations {
        worst
            .entry(event.violation_type)
            .and_modify(|s| {
                if event.severity > *s {
                    *s = event.severity;
                }
            })
            .or_insert(event.severity);
    }

    let deductions: u32 = worst.values().map(|s| s.deduction()).sum();

    100u32.saturating_sub(deductions).min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(violation_type: ViolationType, severity: Severity) -> ViolationEvent {
        ViolationEvent::new(violation_type, severity, "test", None)
    }

    #[test]
    fn test_empty_timeline_scores_full() {
        assert_eq!(compute_integrity_score(&[]), 100);
    }

    #[test]
    fn test_single_deductions() {
        assert_eq!(
            compute_integrity_score(&[event(ViolationType::LookingAway, Severity::Medium)]),
            95
        );
        assert_eq!(
            compute_integrity_score(&[event(ViolationType::FaceNotVisible, Severity::High)]),
            90
        );
        assert_eq!(
            compute_integrity_score(&[event(ViolationType::MultipleFaces, Severity::Critical)]),
            80
        );
    }

    #[test]
    fn test_mixed_severities_sum() {
        let timeline = vec![
            event(ViolationType::MultipleFaces, Severity::Critical),
            event(ViolationType::FaceNotVisible, Severity::High),
            event(ViolationType::LookingAway, Severity::Medium),
        ];
        // 100 - (20 + 10 + 5)
        assert_eq!(compute_integrity_score(&timeline), 65);
    }

    #[test]
    fn test_permutation_invariance() {
        let mut timeline = vec![
            event(ViolationType::PhoneDetected, Severity::Critical),
            event(ViolationType::BookDetected, Severity::High),
            event(ViolationType::LookingAway, Severity::Medium),
            event(ViolationType::FaceNotVisible, Severity::High),
        ];
        let reference = compute_integrity_score(&timeline);

        timeline.reverse();
        assert_eq!(compute_integrity_score(&timeline), reference);

        timeline.swap(0, 2);
        assert_eq!(compute_integrity_score(&timeline), reference);
    }

    #[test]
    fn test_duplicate_type_keeps_max_severity() {
        let timeline = vec![
            event(ViolationType::LookingAway, Severity::High),
            event(ViolationType::LookingAway, Severity::Medium),
            event(ViolationType::LookingAway, Severity::Low),
        ];
        // Only the High deduction applies
        assert_eq!(compute_integrity_score(&timeline), 90);
    }

    #[test]
    fn test_clamps_at_zero() {
        let mut timeline = Vec::new();
        for violation_type in [
            ViolationType::FaceNotVisible,
            ViolationType::LookingAway,
            ViolationType::MultipleFaces,
            ViolationType::PhoneDetected,
            ViolationType::BookDetected,
            ViolationType::DeviceDetected,
            ViolationType::CandidateAbsent,
        ] {
            timeline.push(event(violation_type, Severity::Critical));
        }
        // 7 types at Critical deduct 140 points
        assert_eq!(compute_integrity_score(&timeline), 0);
    }
}
