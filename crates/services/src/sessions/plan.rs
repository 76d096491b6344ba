use serde::{Deserialize, Serialize};

use trace_core::model::{Point, ShapeName};

/// The segment currently being drawn: last reached target to the fingertip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSegment {
    pub from: Point,
    pub to: Point,
}

/// A not-yet-reached target with its display number.
///
/// Numbers are 1-based positions in the full sequence, so the renderer can
/// color node *i* and segment *i* from the same palette slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetNode {
    pub number: usize,
    pub point: Point,
}

/// Render plan for one tick, handed to the external renderer.
///
/// The core never touches pixels: this is coordinates and indices only, and
/// the renderer owns palette cycling over them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracePlan {
    pub shape_name: ShapeName,
    pub progress: usize,
    pub total: usize,
    pub completed: bool,
    /// Indices of segments already connected; segment `i` joins targets `i`
    /// and `i + 1`.
    pub connected: Vec<usize>,
    /// Present only while tracing: at least one target reached, not yet
    /// completed, and a fingertip was detected this tick.
    pub active: Option<ActiveSegment>,
    pub remaining: Vec<TargetNode>,
}
