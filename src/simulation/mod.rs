//! Parking facility traffic simulation
//!
//! Cars enter along a road, reserve a parking or charging spot, drive to it
//! through the entrance gates, dwell and leave by the far exit. Systems talk
//! to each other only through the event bus and resolve cars and modules by id
//! through the entity manager. Nothing here draws to a screen.

mod car;
mod config;
mod entity_manager;
mod error;
mod event_bus;
mod events;
mod gate;
mod module;
pub mod path_planner;
mod road_network;
mod spawn_system;
pub(crate) mod spot_ledger;
mod tracking_system;
mod traffic_system;
mod types;
mod waypoint;
mod world;
pub mod world_gen;

// Re-export public types for external use
pub use car::{Car, CarSnapshot, CarState, CarUpdateResult, PRICE_PRIORITY_SPEED_FACTOR};
pub use config::{make_rng, SimConfig, SpawnConfig, TrafficConfig, WorldConfig};
pub use entity_manager::EntityManager;
pub use error::TrafficError;
pub use event_bus::{Event, EventBus, Subscription};
pub use events::{
    CameraMove, CarArrived, CarDeleted, CarExiting, CarSpawned, EnergyDepleted, GameUpdate,
    GenerateWorld, SpawnCarRequest, StartTracking, StopTracking, TrackingStatusChanged,
};
pub use gate::{EntranceGate, GateRegistry, DEFAULT_CROSSING_TIME};
pub use module::{
    EntranceKind, Facility, FacilityKind, Module, ModuleKind, Orientation, Spot, SpotState,
    FACILITY_WIDTH, LANE_OFFSET_Y, LARGE_FACILITY_HEIGHT, ROAD_MODULE_HEIGHT, ROAD_MODULE_WIDTH,
    SMALL_FACILITY_HEIGHT,
};
pub use road_network::{NodeKind, RoadEdge, RoadNetwork, RoadNode};
pub use spawn_system::SpawnSystem;
pub use tracking_system::{TrackingStatus, TrackingSystem};
pub use traffic_system::{TrafficStats, TrafficSystem};
pub use types::{
    CarId, CarType, ModuleId, Position, Priority, SimId, SpotRef, CAR_LENGTH, MAX_ENERGY,
    MIN_ENERGY, SAFE_FOLLOWING_MULTIPLIER,
};
pub use waypoint::Waypoint;
pub use world::SimWorld;
