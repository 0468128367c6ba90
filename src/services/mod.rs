//! Service layer for power governing
//!
//! Services encapsulate the control law, the loop that drives it, and
//! cooperative shutdown.

pub mod control_loop;
pub mod controller;
pub mod shutdown;

pub use control_loop::{ControlLoop, LoopConfig, LoopSummary, StopReason};
pub use controller::{PowerController, ProportionalController};
pub use shutdown::ShutdownSignal;
