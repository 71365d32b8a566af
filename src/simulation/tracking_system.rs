//! Camera tracking of a single car
//!
//! Starting a track requests a fresh car and follows the first one that
//! spawns. The camera follows it every tick until it leaves, is deleted or the
//! world is regenerated. Every stop is announced exactly once.

use log::{debug, info, warn};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::car::CarState;
use super::entity_manager::EntityManager;
use super::event_bus::{EventBus, Subscription};
use super::events::{
    CameraMove, CarDeleted, CarSpawned, GameUpdate, GenerateWorld, SpawnCarRequest, StartTracking,
    StopTracking, TrackingStatusChanged,
};
use super::types::CarId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingStatus {
    #[default]
    Inactive,
    /// Spawn requested, follows the next car that appears
    WaitingForSpawn,
    Active(CarId),
}

fn start(status: &Cell<TrackingStatus>, bus: &EventBus) {
    status.set(TrackingStatus::WaitingForSpawn);
    info!("Tracking started, requesting a car");
    bus.publish(SpawnCarRequest);
    bus.publish(TrackingStatusChanged { active: true });
}

fn stop(status: &Cell<TrackingStatus>, bus: &EventBus) {
    if status.get() == TrackingStatus::Inactive {
        return;
    }
    status.set(TrackingStatus::Inactive);
    info!("Tracking stopped");
    bus.publish(TrackingStatusChanged { active: false });
}

fn follow(status: &Cell<TrackingStatus>, entities: &RefCell<EntityManager>, bus: &EventBus) {
    let TrackingStatus::Active(car_id) = status.get() else {
        return;
    };

    let target = {
        let Ok(entities) = entities.try_borrow() else {
            debug!("World busy, camera update skipped");
            return;
        };
        entities.car(car_id).map(|car| {
            (
                car.position(),
                car.state() == CarState::Exiting && car.has_arrived(),
            )
        })
    };

    match target {
        Some((position, finished)) => {
            bus.publish(CameraMove { position });
            if finished {
                info!("Tracked car {:?} reached its exit", car_id);
                stop(status, bus);
            }
        }
        None => {
            warn!("Tracked car {:?} no longer exists", car_id);
            stop(status, bus);
        }
    }
}

pub struct TrackingSystem {
    status: Rc<Cell<TrackingStatus>>,
    _subscriptions: Vec<Subscription>,
}

impl TrackingSystem {
    pub fn new(bus: &Rc<EventBus>, entities: Rc<RefCell<EntityManager>>) -> Self {
        let status = Rc::new(Cell::new(TrackingStatus::Inactive));
        let mut subscriptions = Vec::new();

        {
            let status = Rc::clone(&status);
            subscriptions.push(bus.subscribe(move |_: &StartTracking, bus: &EventBus| {
                start(&status, bus);
            }));
        }

        {
            let status = Rc::clone(&status);
            subscriptions.push(bus.subscribe(move |_: &StopTracking, bus: &EventBus| {
                stop(&status, bus);
            }));
        }

        {
            let status = Rc::clone(&status);
            subscriptions.push(bus.subscribe(move |event: &CarSpawned, _: &EventBus| {
                if status.get() == TrackingStatus::WaitingForSpawn {
                    info!("Tracking car {:?}", event.car);
                    status.set(TrackingStatus::Active(event.car));
                }
            }));
        }

        {
            let status = Rc::clone(&status);
            subscriptions.push(bus.subscribe(move |event: &CarDeleted, bus: &EventBus| {
                if status.get() == TrackingStatus::Active(event.car) {
                    info!("Tracked car {:?} was removed", event.car);
                    stop(&status, bus);
                }
            }));
        }

        {
            let status = Rc::clone(&status);
            subscriptions.push(bus.subscribe(move |_: &GenerateWorld, bus: &EventBus| {
                stop(&status, bus);
            }));
        }

        {
            let status = Rc::clone(&status);
            subscriptions.push(bus.subscribe(move |_: &GameUpdate, bus: &EventBus| {
                follow(&status, &entities, bus);
            }));
        }

        Self {
            status,
            _subscriptions: subscriptions,
        }
    }

    /// Request a car and follow it once it spawns
    pub fn start(&self, bus: &EventBus) {
        start(&self.status, bus);
    }

    pub fn stop(&self, bus: &EventBus) {
        stop(&self.status, bus);
    }

    pub fn status(&self) -> TrackingStatus {
        self.status.get()
    }

    pub fn is_active(&self) -> bool {
        self.status.get() != TrackingStatus::Inactive
    }

    /// The car being followed, once one has spawned
    pub fn target(&self) -> Option<CarId> {
        match self.status.get() {
            TrackingStatus::Active(car_id) => Some(car_id),
            _ => None,
        }
    }
}
