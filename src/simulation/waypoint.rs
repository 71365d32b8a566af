//! Waypoints a car consumes in order

use super::types::{ModuleId, Position, DEFAULT_ARRIVAL_TOLERANCE};

/// A point on a car's planned route
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub position: Position,
    /// Arrival radius; `None` uses DEFAULT_ARRIVAL_TOLERANCE
    pub tolerance: Option<f32>,
    /// Entrance gate that must be held before passing this point
    pub gate: Option<ModuleId>,
}

impl Waypoint {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            tolerance: None,
            gate: None,
        }
    }

    pub fn gated(position: Position, gate: ModuleId) -> Self {
        Self {
            position,
            tolerance: None,
            gate: Some(gate),
        }
    }

    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance.unwrap_or(DEFAULT_ARRIVAL_TOLERANCE)
    }

    pub fn is_reached_from(&self, position: &Position) -> bool {
        self.position.distance(position) <= self.tolerance()
    }
}

impl From<Position> for Waypoint {
    fn from(position: Position) -> Self {
        Waypoint::new(position)
    }
}
