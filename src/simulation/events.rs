//! Events exchanged over the simulation bus

use super::event_bus::Event;
use super::types::{CarId, Position, SpotRef};

/// One simulation tick
#[derive(Debug, Clone, Copy)]
pub struct GameUpdate {
    pub dt: f32,
}

/// Ask the spawn system for a new car
#[derive(Debug, Clone, Copy, Default)]
pub struct SpawnCarRequest;

#[derive(Debug, Clone, Copy)]
pub struct CarSpawned {
    pub car: CarId,
}

/// The car is gone from the entity manager; its id no longer resolves
#[derive(Debug, Clone, Copy)]
pub struct CarDeleted {
    pub car: CarId,
}

/// The world was regenerated; every car and module id from before is stale
#[derive(Debug, Clone, Copy)]
pub struct GenerateWorld {
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StartTracking;

#[derive(Debug, Clone, Copy, Default)]
pub struct StopTracking;

#[derive(Debug, Clone, Copy)]
pub struct TrackingStatusChanged {
    pub active: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct CameraMove {
    pub position: Position,
}

/// The car reached its spot
#[derive(Debug, Clone, Copy)]
pub struct CarArrived {
    pub car: CarId,
    pub spot: SpotRef,
    pub charging: bool,
}

/// The car left its spot (or never had one) and is heading out
#[derive(Debug, Clone, Copy)]
pub struct CarExiting {
    pub car: CarId,
}

#[derive(Debug, Clone, Copy)]
pub struct EnergyDepleted {
    pub car: CarId,
}

impl Event for GameUpdate {}
impl Event for SpawnCarRequest {}
impl Event for CarSpawned {}
impl Event for CarDeleted {}
impl Event for GenerateWorld {}
impl Event for StartTracking {}
impl Event for StopTracking {}
impl Event for TrackingStatusChanged {}
impl Event for CameraMove {}
impl Event for CarArrived {}
impl Event for CarExiting {}
impl Event for EnergyDepleted {}
