use std::fmt;
use std::sync::Arc;

use trace_core::model::{Point, Shape, ShapeName};

use super::plan::{ActiveSegment, TargetNode, TracePlan};

/// Maximum fingertip distance (frame pixels) counted as reaching a target.
pub const HIT_RADIUS: f64 = 40.0;

//
// ─── TRACE STATE ───────────────────────────────────────────────────────────────
//

/// Lifecycle of a tracing session over one shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceState {
    /// No target reached yet.
    NotStarted,
    /// Some but not all targets reached.
    InProgress,
    /// Every target reached; only `reset` leaves this state.
    Completed,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Per-user progress over a chosen shape.
///
/// Consumes one fingertip sample per tick and tests it against the next
/// unreached target only; progress moves by at most one per call and never
/// decreases except on `reset`.
pub struct TraceSession {
    shape: Arc<Shape>,
    progress: usize,
}

impl TraceSession {
    #[must_use]
    pub fn new(shape: Arc<Shape>) -> Self {
        Self { shape, progress: 0 }
    }

    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[must_use]
    pub fn shape_name(&self) -> &ShapeName {
        self.shape.name()
    }

    /// Number of targets reached so far.
    #[must_use]
    pub fn progress(&self) -> usize {
        self.progress
    }

    /// Total number of targets in the bound shape.
    #[must_use]
    pub fn total(&self) -> usize {
        self.shape.len()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.progress == self.shape.len()
    }

    #[must_use]
    pub fn state(&self) -> TraceState {
        if self.progress == 0 {
            TraceState::NotStarted
        } else if self.is_complete() {
            TraceState::Completed
        } else {
            TraceState::InProgress
        }
    }

    /// Bind a new shape and start over. Legal from any state.
    pub fn reset(&mut self, shape: Arc<Shape>) {
        self.shape = shape;
        self.progress = 0;
    }

    /// Feed one fingertip sample and return the resulting render plan.
    ///
    /// A missing sample is a valid "no detection this tick" input: the hit
    /// test is skipped and the plan reflects the unchanged state. Once
    /// completed, further calls are no-ops until `reset`.
    pub fn advance(&mut self, fingertip: Option<Point>) -> TracePlan {
        if let Some(tip) = fingertip {
            if !self.is_complete() {
                if let Some(target) = self.shape.target(self.progress) {
                    if tip.distance_to(target) < HIT_RADIUS {
                        self.progress += 1;
                    }
                }
            }
        }
        self.plan(fingertip)
    }

    /// Render plan for the current state.
    #[must_use]
    pub fn plan(&self, fingertip: Option<Point>) -> TracePlan {
        let completed = self.is_complete();

        let connected: Vec<usize> = (0..self.progress.saturating_sub(1)).collect();

        let active = match (completed, self.progress, fingertip) {
            (false, 1.., Some(tip)) => self.shape.target(self.progress - 1).map(|from| {
                ActiveSegment { from, to: tip }
            }),
            _ => None,
        };

        let remaining = (self.progress..self.shape.len())
            .filter_map(|i| {
                self.shape.target(i).map(|point| TargetNode {
                    number: i + 1,
                    point,
                })
            })
            .collect();

        TracePlan {
            shape_name: self.shape_name().clone(),
            progress: self.progress,
            total: self.total(),
            completed,
            connected,
            active,
            remaining,
        }
    }
}

impl fmt::Debug for TraceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceSession")
            .field("shape", &self.shape_name())
            .field("progress", &self.progress)
            .field("total", &self.total())
            .finish()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
