//! Error taxonomy of the traffic core
//!
//! None of these are fatal: the traffic system recovers from planning and
//! reservation failures locally and only logs them.

use super::module::SpotState;
use super::types::{CarId, ModuleId, SpotRef};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrafficError {
    /// No reachable entry or road path to the target facility
    #[error("no route into module {module:?}")]
    PlanningFailure { module: ModuleId },

    /// A spot transition was requested from the wrong state
    #[error("spot {spot:?} is {state:?}, cannot {action}")]
    ResourceConflict {
        spot: SpotRef,
        state: SpotState,
        action: &'static str,
    },

    /// A car id that no longer resolves
    #[error("car {0:?} no longer exists")]
    DanglingReference(CarId),

    /// An operation that makes no sense in the current state
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("unknown spot {0:?}")]
    UnknownSpot(SpotRef),
}

/// A tick length must be finite and non-negative before any timer sees it
pub fn check_time_step(delta_secs: f32) -> Result<f32, TrafficError> {
    if !delta_secs.is_finite() || delta_secs < 0.0 {
        return Err(TrafficError::InvalidState(format!(
            "time step {} is not a finite non-negative number",
            delta_secs
        )));
    }
    Ok(delta_secs)
}
