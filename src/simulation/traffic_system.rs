//! Traffic coordination
//!
//! The traffic system is the only component that hands out spots and assigns
//! routes. It routes every spawned car to the best free spot it can reserve,
//! moves cars through their lifecycle each tick and gives back everything a
//! car held when it leaves, is deleted, or the world is reset.

use log::{debug, error, info, warn};
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::Rng;
use sorted_vec::SortedVec;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::car::{CarState, CarUpdateResult};
use super::config::{make_rng, TrafficConfig};
use super::entity_manager::EntityManager;
use super::error::{check_time_step, TrafficError};
use super::event_bus::{EventBus, Subscription};
use super::events::{
    CarArrived, CarDeleted, CarExiting, CarSpawned, EnergyDepleted, GameUpdate, GenerateWorld,
};
use super::gate::GateRegistry;
use super::path_planner::{self, ENTRY_EPSILON};
use super::road_network::RoadNetwork;
use super::spot_ledger;
use super::types::{CarId, CarType, ModuleId, Position, Priority, SpotRef};

/// Running totals of what happened to cars
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrafficStats {
    /// Cars the traffic system routed after they spawned
    pub spawned: usize,
    pub parked: usize,
    pub charged: usize,
    /// Cars sent straight to an exit because no spot could be reached
    pub pass_through: usize,
    /// Cars that reached an exit and left the world
    pub completed: usize,
    pub planning_failures: usize,
    pub depleted: usize,
}

/// Ranking key: primary score, tie-breaker, spot
type Candidate = (OrderedFloat<f32>, OrderedFloat<f32>, SpotRef);

/// What spot selection needs to know about a car
#[derive(Debug, Clone, Copy)]
struct CarProfile {
    position: Position,
    car_type: CarType,
    priority: Priority,
    energy_level: f32,
}

/// Events produced while the state is borrowed, published afterwards
enum Outgoing {
    Arrived(CarArrived),
    Exiting(CarExiting),
    Deleted(CarDeleted),
    Depleted(EnergyDepleted),
}

impl Outgoing {
    fn publish(self, bus: &EventBus) {
        match self {
            Outgoing::Arrived(event) => bus.publish(event),
            Outgoing::Exiting(event) => bus.publish(event),
            Outgoing::Deleted(event) => bus.publish(event),
            Outgoing::Depleted(event) => bus.publish(event),
        }
    }
}

struct TrafficState {
    config: TrafficConfig,
    network: RoadNetwork,
    /// Layout generation the network was built from
    network_generation: Option<u64>,
    gates: GateRegistry,
    /// Spot held by each car, reserved or occupied
    reservations: HashMap<CarId, SpotRef>,
    rng: StdRng,
    stats: TrafficStats,
}

impl TrafficState {
    fn new(config: TrafficConfig, seed: Option<u64>) -> Self {
        let gates = GateRegistry::new(config.gate_crossing_secs);
        Self {
            config,
            network: RoadNetwork::new(),
            network_generation: None,
            gates,
            reservations: HashMap::new(),
            rng: make_rng(seed),
            stats: TrafficStats::default(),
        }
    }

    fn ensure_network(&mut self, entities: &EntityManager) {
        let generation = entities.layout_generation();
        if self.network_generation != Some(generation) {
            self.network = RoadNetwork::from_modules(entities.road_modules());
            self.network_generation = Some(generation);
            debug!(
                "Rebuilt road network: {} nodes, {} exits",
                self.network.node_count(),
                self.network.exit_nodes().len()
            );
        }
    }

    fn has_road_access(&self, entry: &Position) -> bool {
        self.network.connector_near(entry, ENTRY_EPSILON).is_some()
    }

    /// Free spots the car may use, best first
    fn rank_candidates(
        &self,
        entities: &EntityManager,
        profile: &CarProfile,
        chargers_only: bool,
    ) -> SortedVec<Candidate> {
        let mut ranked = SortedVec::new();

        for (module_id, module) in entities.facilities() {
            let Some(facility) = module.as_facility() else {
                continue;
            };
            if !facility.kind.accepts(profile.car_type)
                || (chargers_only && !facility.kind.is_charging())
            {
                continue;
            }
            let reachable = module
                .world_entry_point()
                .is_some_and(|entry| self.has_road_access(&entry));
            if !reachable {
                continue;
            }

            for spot in facility.free_spots() {
                let distance = profile
                    .position
                    .distance(&module.spot_world_position(spot));
                let key = match profile.priority {
                    Priority::Distance => (distance, spot.price),
                    Priority::Price => (spot.price, distance),
                };
                ranked.insert((
                    OrderedFloat(key.0),
                    OrderedFloat(key.1),
                    SpotRef {
                        module: module_id,
                        spot: spot.id,
                    },
                ));
            }
        }

        ranked
    }

    fn route_new_car(&mut self, entities: &mut EntityManager, car_id: CarId) -> Vec<Outgoing> {
        self.ensure_network(entities);

        let Some(car) = entities.car(car_id) else {
            warn!("{}", TrafficError::DanglingReference(car_id));
            return Vec::new();
        };
        if car.state() != CarState::Idle || self.reservations.contains_key(&car_id) {
            debug!("Car {:?} already has a route", car_id);
            return Vec::new();
        }

        let profile = CarProfile {
            position: car.position(),
            car_type: car.car_type(),
            priority: car.priority(),
            energy_level: car.energy_level(),
        };
        self.stats.spawned += 1;

        let wants_charge = profile.car_type == CarType::Electric
            && profile.energy_level < self.config.low_battery_threshold;
        let mut candidates = self.rank_candidates(entities, &profile, wants_charge);
        if candidates.is_empty() && wants_charge {
            candidates = self.rank_candidates(entities, &profile, false);
        }

        for &(_, _, spot_ref) in candidates.iter() {
            // Reserve before committing a path so nobody else can take the spot
            if let Err(err) = spot_ledger::reserve(entities, spot_ref) {
                debug!("Skipping candidate: {}", err);
                continue;
            }

            let path = match (entities.car(car_id), entities.module_and_spot(spot_ref)) {
                (Some(car), Ok((module, spot))) => {
                    path_planner::generate_route(&self.network, car, module, spot)
                }
                _ => Vec::new(),
            };

            if path.is_empty() {
                self.stats.planning_failures += 1;
                warn!(
                    "{}",
                    TrafficError::PlanningFailure {
                        module: spot_ref.module
                    }
                );
                if let Err(err) = spot_ledger::release(entities, spot_ref) {
                    error!("Failed to release spot after planning failure: {}", err);
                }
                continue;
            }

            if let Some(car) = entities.car_mut(car_id) {
                car.assign_path(path, CarState::EnRoute);
            }
            self.reservations.insert(car_id, spot_ref);
            info!(
                "Car {:?} heading to spot {} of module {:?}",
                car_id, spot_ref.spot, spot_ref.module
            );
            return Vec::new();
        }

        // Nothing reachable: drive straight through
        let path = match entities.car(car_id) {
            Some(car) => path_planner::generate_pass_through(&self.network, car),
            None => return Vec::new(),
        };
        if let Some(car) = entities.car_mut(car_id) {
            car.assign_path(path, CarState::Exiting);
        }
        self.stats.pass_through += 1;
        info!("Car {:?} found no spot, passing through", car_id);

        vec![Outgoing::Exiting(CarExiting { car: car_id })]
    }

    fn tick(&mut self, entities: &mut EntityManager, delta_secs: f32) -> Vec<Outgoing> {
        self.ensure_network(entities);
        self.gates.update(delta_secs);

        let mut outgoing = Vec::new();

        for (car_id, result) in entities.update_cars(delta_secs, &mut self.gates) {
            if result == CarUpdateResult::EnergyDepleted {
                self.stats.depleted += 1;
                warn!("Car {:?} ran out of energy", car_id);
                outgoing.push(Outgoing::Depleted(EnergyDepleted { car: car_id }));
            }
        }

        for car_id in entities.car_ids() {
            let Some((state, arrived, dwell_finished)) = entities
                .car(car_id)
                .map(|car| (car.state(), car.has_arrived(), car.dwell_finished()))
            else {
                continue;
            };

            match state {
                CarState::Idle => outgoing.extend(self.route_new_car(entities, car_id)),
                CarState::EnRoute if arrived => {
                    outgoing.extend(self.park_car(entities, car_id));
                }
                CarState::Parked | CarState::Charging if dwell_finished => {
                    outgoing.extend(self.send_out(entities, car_id));
                }
                CarState::Exiting if arrived => {
                    outgoing.extend(self.despawn_car(entities, car_id));
                }
                _ => {}
            }
        }

        outgoing
    }

    fn park_car(&mut self, entities: &mut EntityManager, car_id: CarId) -> Vec<Outgoing> {
        let Some(spot_ref) = self.reservations.get(&car_id).copied() else {
            warn!("Car {:?} arrived without a reservation, sending it out", car_id);
            return self.send_out(entities, car_id);
        };

        if let Err(err) = spot_ledger::occupy(entities, spot_ref) {
            warn!("{}", err);
        }

        let (is_charger, heading) = match entities.module_and_spot(spot_ref) {
            Ok((module, spot)) => (
                module
                    .as_facility()
                    .is_some_and(|facility| facility.kind.is_charging()),
                spot.orientation,
            ),
            Err(err) => {
                warn!("Car {:?} parked at a missing spot: {}", car_id, err);
                return self.send_out(entities, car_id);
            }
        };

        let dwell = self
            .rng
            .random_range(self.config.min_dwell_secs..=self.config.max_dwell_secs);
        let charge_rate = self.config.charge_rate;

        let Some(car) = entities.car_mut(car_id) else {
            return Vec::new();
        };
        let charging = is_charger && car.car_type() == CarType::Electric;
        car.park(dwell, charging.then_some(charge_rate), heading);

        if charging {
            self.stats.charged += 1;
        } else {
            self.stats.parked += 1;
        }
        info!(
            "Car {:?} {} at spot {} of module {:?} for {:.1}s",
            car_id,
            if charging { "charging" } else { "parked" },
            spot_ref.spot,
            spot_ref.module,
            dwell
        );

        vec![Outgoing::Arrived(CarArrived {
            car: car_id,
            spot: spot_ref,
            charging,
        })]
    }

    /// Give the spot back and route the car to an exit
    fn send_out(&mut self, entities: &mut EntityManager, car_id: CarId) -> Vec<Outgoing> {
        let spot_ref = self.reservations.remove(&car_id);

        let path = match entities.car(car_id) {
            Some(car) => {
                let parked_in = spot_ref.and_then(|spot_ref| entities.module_and_spot(spot_ref).ok());
                path_planner::generate_exit_path(&self.network, car, parked_in)
            }
            None => return Vec::new(),
        };

        if let Some(spot_ref) = spot_ref {
            if let Err(err) = spot_ledger::release(entities, spot_ref) {
                warn!("{}", err);
            }
        }

        if let Some(car) = entities.car_mut(car_id) {
            car.assign_path(path, CarState::Exiting);
        }
        debug!("Car {:?} leaving", car_id);

        vec![Outgoing::Exiting(CarExiting { car: car_id })]
    }

    fn despawn_car(&mut self, entities: &mut EntityManager, car_id: CarId) -> Vec<Outgoing> {
        entities.remove_car(car_id);
        self.forget_car(entities, car_id);
        self.stats.completed += 1;
        info!("Car {:?} left the world", car_id);

        vec![Outgoing::Deleted(CarDeleted { car: car_id })]
    }

    /// Drop everything a car holds; safe to call more than once
    fn forget_car(&mut self, entities: &mut EntityManager, car_id: CarId) {
        self.gates.release_all(car_id);
        if let Some(spot_ref) = self.reservations.remove(&car_id) {
            match spot_ledger::release(entities, spot_ref) {
                Ok(previous) => debug!(
                    "Released spot {:?} ({:?}) held by deleted car {:?}",
                    spot_ref, previous, car_id
                ),
                Err(err) => debug!("Nothing to release for car {:?}: {}", car_id, err),
            }
        }
    }

    fn reset(&mut self, entities: &mut EntityManager) {
        let reservations: Vec<_> = self.reservations.drain().collect();
        for (_, spot_ref) in reservations {
            // Spots of a regenerated world are unknown here, which is fine
            let _ = spot_ledger::release(entities, spot_ref);
        }
        self.gates.clear();
        self.network_generation = None;
        info!("Traffic state reset");
    }
}

fn with_borrows<F>(
    state: &RefCell<TrafficState>,
    entities: &RefCell<EntityManager>,
    action: F,
) -> Vec<Outgoing>
where
    F: FnOnce(&mut TrafficState, &mut EntityManager) -> Vec<Outgoing>,
{
    let (Ok(mut state), Ok(mut entities)) = (state.try_borrow_mut(), entities.try_borrow_mut())
    else {
        error!("Traffic system received an event while the world was borrowed; event dropped");
        return Vec::new();
    };
    action(&mut *state, &mut *entities)
}

fn publish_all(outgoing: Vec<Outgoing>, bus: &EventBus) {
    for event in outgoing {
        event.publish(bus);
    }
}

/// Sole arbiter of spots and entrance gates
pub struct TrafficSystem {
    state: Rc<RefCell<TrafficState>>,
    _subscriptions: Vec<Subscription>,
}

impl TrafficSystem {
    pub fn new(bus: &Rc<EventBus>, entities: Rc<RefCell<EntityManager>>) -> Self {
        Self::with_config(bus, entities, TrafficConfig::default(), None)
    }

    pub fn with_config(
        bus: &Rc<EventBus>,
        entities: Rc<RefCell<EntityManager>>,
        config: TrafficConfig,
        seed: Option<u64>,
    ) -> Self {
        let state = Rc::new(RefCell::new(TrafficState::new(config, seed)));
        let mut subscriptions = Vec::new();

        {
            let state = Rc::clone(&state);
            let entities = Rc::clone(&entities);
            subscriptions.push(bus.subscribe(move |event: &CarSpawned, bus: &EventBus| {
                let outgoing = with_borrows(&state, &entities, |state, entities| {
                    state.route_new_car(entities, event.car)
                });
                publish_all(outgoing, bus);
            }));
        }

        {
            let state = Rc::clone(&state);
            let entities = Rc::clone(&entities);
            subscriptions.push(bus.subscribe(move |event: &GameUpdate, bus: &EventBus| {
                let delta_secs = match check_time_step(event.dt) {
                    Ok(delta_secs) => delta_secs,
                    Err(err) => {
                        error!("Traffic update skipped: {}", err);
                        return;
                    }
                };
                let outgoing = with_borrows(&state, &entities, |state, entities| {
                    state.tick(entities, delta_secs)
                });
                publish_all(outgoing, bus);
            }));
        }

        {
            let state = Rc::clone(&state);
            let entities = Rc::clone(&entities);
            subscriptions.push(bus.subscribe(move |event: &CarDeleted, _: &EventBus| {
                with_borrows(&state, &entities, |state, entities| {
                    state.forget_car(entities, event.car);
                    Vec::new()
                });
            }));
        }

        {
            let state = Rc::clone(&state);
            subscriptions.push(bus.subscribe(move |_: &GenerateWorld, _: &EventBus| {
                with_borrows(&state, &entities, |state, entities| {
                    state.reset(entities);
                    Vec::new()
                });
            }));
        }

        Self {
            state,
            _subscriptions: subscriptions,
        }
    }

    pub fn stats(&self) -> TrafficStats {
        self.state.borrow().stats
    }

    /// The spot a car currently holds, reserved or occupied
    pub fn reservation_for(&self, car_id: CarId) -> Option<SpotRef> {
        self.state.borrow().reservations.get(&car_id).copied()
    }

    pub fn reservation_count(&self) -> usize {
        self.state.borrow().reservations.len()
    }

    pub fn gate_holder(&self, entrance: ModuleId) -> Option<CarId> {
        self.state.borrow().gates.holder(entrance)
    }

    pub fn held_gate_count(&self) -> usize {
        self.state.borrow().gates.held_count()
    }
}
