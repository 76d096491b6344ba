#![forbid(unsafe_code)]

pub mod error;
pub mod identity;
pub mod sessions;
pub mod streak_service;

pub use trace_core::Clock;

pub use error::{IdentityError, SessionError, StreakError};
pub use identity::IdentityProvider;
pub use sessions::{
    ActiveSegment, HIT_RADIUS, SessionRegistry, TargetNode, TracePlan, TraceSession, TraceState,
};
pub use streak_service::{StreakService, TaskProgress, UserStats};
