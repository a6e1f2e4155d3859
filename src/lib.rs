//! ExamWatch Proctoring Core
//!
//! Turns noisy per-frame face/object detection signals into a stable,
//! de-bounced violation timeline and an integrity score for one exam
//! monitoring session.
//!
//! ## Architecture (7 Components)
//!
//! 1. DetectionBackend - face/object perception boundary (model server or
//!    heuristic fallback, selected once at initialization)
//! 2. FrameSampler - fixed-cadence frame pulling with an in-flight guard
//! 3. ViolationEngine - debounce timers, cooldown ledgers, rule evaluation
//! 4. Scoring - deterministic integrity score reduction
//! 5. SessionManager - SessionData/MonitoringStatus ownership and lifecycle
//! 6. ObserverHub - in-process event distribution to observers
//! 7. ProctorMonitor - component wiring facade
//!
//! ## Design Principles
//!
//! - Single mutation point: every violation flows through
//!   `ViolationEngine::add_violation`
//! - The integrity score is always recomputable from the timeline alone
//! - Detection degradation is invisible to the inference layer

pub mod config;
pub mod detection;
pub mod error;
pub mod frame_sampler;
pub mod monitor;
pub mod observer_hub;
pub mod scoring;
pub mod session;
pub mod violation_engine;

pub use config::MonitorConfig;
pub use error::{Error, Result};
pub use monitor::ProctorMonitor;
