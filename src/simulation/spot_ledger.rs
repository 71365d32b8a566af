//! Spot occupancy transitions
//!
//! FREE → RESERVED → OCCUPIED → FREE. A transition is checked against the
//! current state before it is applied, so a spot can never be handed to two
//! cars. Only the traffic system calls into this module.

use super::entity_manager::EntityManager;
use super::error::TrafficError;
use super::module::SpotState;
use super::types::SpotRef;

fn transition(
    entities: &mut EntityManager,
    spot_ref: SpotRef,
    from: SpotState,
    to: SpotState,
    action: &'static str,
) -> Result<(), TrafficError> {
    let spot = entities
        .spot_mut(spot_ref)
        .ok_or(TrafficError::UnknownSpot(spot_ref))?;

    if spot.state() != from {
        return Err(TrafficError::ResourceConflict {
            spot: spot_ref,
            state: spot.state(),
            action,
        });
    }

    spot.set_state(to);
    Ok(())
}

/// FREE → RESERVED
pub fn reserve(entities: &mut EntityManager, spot_ref: SpotRef) -> Result<(), TrafficError> {
    transition(entities, spot_ref, SpotState::Free, SpotState::Reserved, "reserve")
}

/// RESERVED → OCCUPIED
pub fn occupy(entities: &mut EntityManager, spot_ref: SpotRef) -> Result<(), TrafficError> {
    transition(entities, spot_ref, SpotState::Reserved, SpotState::Occupied, "occupy")
}

/// Any state → FREE; returns the state the spot was in
pub fn release(entities: &mut EntityManager, spot_ref: SpotRef) -> Result<SpotState, TrafficError> {
    let spot = entities
        .spot_mut(spot_ref)
        .ok_or(TrafficError::UnknownSpot(spot_ref))?;
    let previous = spot.state();
    spot.set_state(SpotState::Free);
    Ok(previous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::module::{Module, Orientation};

    #[test]
    fn test_rejects_bad_transitions() {
        let mut entities = EntityManager::new();
        let lot = entities.add_module(Module::small_parking(Orientation::Up));
        let spot_ref = SpotRef { module: lot, spot: 0 };

        assert!(matches!(
            occupy(&mut entities, spot_ref),
            Err(TrafficError::ResourceConflict { .. })
        ));

        reserve(&mut entities, spot_ref).unwrap();
        assert!(matches!(
            reserve(&mut entities, spot_ref),
            Err(TrafficError::ResourceConflict { .. })
        ));

        occupy(&mut entities, spot_ref).unwrap();
        assert_eq!(release(&mut entities, spot_ref).unwrap(), SpotState::Occupied);
        assert_eq!(entities.spot(spot_ref).unwrap().state(), SpotState::Free);

        let missing = SpotRef { module: lot, spot: 99 };
        assert_eq!(
            reserve(&mut entities, missing),
            Err(TrafficError::UnknownSpot(missing))
        );
    }
}
