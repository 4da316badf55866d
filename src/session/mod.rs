//! Interactive capture session management
//!
//! This module contains:
//! - Ports to the surface, readout and artifact collaborators
//! - The two-corner pick session state machine
//! - The capture orchestrator driving pick, stitch and delivery
//! - Console command parsing for the interactive driver

pub mod orchestrator;
pub mod pick;
pub mod ports;
pub mod shortcuts;

pub use orchestrator::{CaptureOrchestrator, CaptureOutcome, CaptureSettings};
pub use ports::{ArtifactSink, PickTiming, ReadoutSource, SurfaceBounds};
