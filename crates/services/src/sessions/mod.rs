mod plan;
mod registry;
mod service;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use plan::{ActiveSegment, TargetNode, TracePlan};
pub use registry::SessionRegistry;
pub use service::{HIT_RADIUS, TraceSession, TraceState};
