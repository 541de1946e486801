//! Synchronization layer
//!
//! Structure:
//! - `controller.rs` - Event-driven graph controller
//! - `status.rs` - Readiness and per-kind load state

mod controller;
mod status;

pub use controller::GraphController;
pub use status::{ControllerStatus, KindStatus, LoadPhase};
