//! Spot reservation, routing and release through the traffic system

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use parking_sim::simulation::{
    Car, CarArrived, CarDeleted, CarId, CarSpawned, CarState, CarType, EnergyDepleted,
    EntityManager, EntranceKind, EventBus, FacilityKind, GameUpdate, GenerateWorld, Module,
    Orientation, Position, Priority, SpotRef, SpotState, TrafficConfig, TrafficSystem,
};

struct Harness {
    bus: Rc<EventBus>,
    entities: Rc<RefCell<EntityManager>>,
    traffic: TrafficSystem,
}

impl Harness {
    fn new(modules: Vec<Module>) -> Self {
        let config = TrafficConfig {
            min_dwell_secs: 1.0,
            max_dwell_secs: 1.0,
            ..TrafficConfig::default()
        };
        Self::with_config(modules, config)
    }

    fn with_config(modules: Vec<Module>, config: TrafficConfig) -> Self {
        let bus = EventBus::new();
        let entities = Rc::new(RefCell::new(EntityManager::new()));
        for module in modules {
            entities.borrow_mut().add_module(module);
        }
        let traffic = TrafficSystem::with_config(&bus, Rc::clone(&entities), config, Some(3));
        Self {
            bus,
            entities,
            traffic,
        }
    }

    /// Add a car at the west end of the road and announce it
    fn spawn(&self, car_type: CarType) -> CarId {
        let car = Car::new(Position::new(0.0, 450.0), Position::new(60.0, 0.0), car_type)
            .with_energy_level(80.0);
        let car_id = self.entities.borrow_mut().add_car(car);
        self.bus.publish(CarSpawned { car: car_id });
        car_id
    }

    fn car_state(&self, car_id: CarId) -> Option<CarState> {
        self.entities.borrow().car(car_id).map(|car| car.state())
    }

    fn spot_state(&self, spot_ref: SpotRef) -> SpotState {
        self.entities.borrow().spot(spot_ref).unwrap().state()
    }

    fn run_until<F: Fn(&Self) -> bool>(&self, max_ticks: usize, done: F) -> bool {
        for _ in 0..max_ticks {
            if done(self) {
                return true;
            }
            self.bus.publish(GameUpdate { dt: 0.1 });
        }
        done(self)
    }
}

fn road_row() -> Module {
    Module::normal_road().at(Position::new(0.0, 400.0))
}

fn small_lot() -> Vec<Module> {
    vec![
        road_row(),
        Module::entrance(EntranceKind::Up).at(Position::new(200.0, 400.0)),
        Module::small_parking(Orientation::Up).at(Position::new(200.0, 250.0)),
    ]
}

fn small_charger() -> Vec<Module> {
    vec![
        road_row(),
        Module::entrance(EntranceKind::Down).at(Position::new(200.0, 400.0)),
        Module::small_charging_station(Orientation::Down).at(Position::new(200.0, 500.0)),
    ]
}

#[test]
fn test_road_only_world_passes_car_through() {
    let harness = Harness::new(vec![Module::normal_road()]);
    let car = Car::new(Position::new(0.0, 50.0), Position::new(60.0, 0.0), CarType::Combustion);
    let car_id = harness.entities.borrow_mut().add_car(car);

    harness.bus.publish(CarSpawned { car: car_id });

    let entities = harness.entities.borrow();
    let car = entities.car(car_id).unwrap();
    assert_eq!(car.state(), CarState::Exiting);
    assert!(!car.has_arrived());
    assert_eq!(harness.traffic.stats().pass_through, 1);
    assert_eq!(harness.traffic.reservation_for(car_id), None);
}

#[test]
fn test_spawned_car_reserves_a_spot() {
    let harness = Harness::new(small_lot());

    let car_id = harness.spawn(CarType::Combustion);

    assert_eq!(harness.car_state(car_id), Some(CarState::EnRoute));
    let spot_ref = harness.traffic.reservation_for(car_id).unwrap();
    assert_eq!(harness.spot_state(spot_ref), SpotState::Reserved);
    assert_eq!(harness.traffic.stats().spawned, 1);
}

#[test]
fn test_spots_are_never_shared() {
    let harness = Harness::new(small_lot());

    let cars: Vec<CarId> = (0..4).map(|_| harness.spawn(CarType::Combustion)).collect();
    let mut spots: Vec<SpotRef> = cars
        .iter()
        .map(|car_id| harness.traffic.reservation_for(*car_id).unwrap())
        .collect();
    spots.sort();
    spots.dedup();
    assert_eq!(spots.len(), 4);

    // The lot is full now
    let extra = harness.spawn(CarType::Combustion);
    assert_eq!(harness.car_state(extra), Some(CarState::Exiting));
    assert_eq!(harness.traffic.reservation_for(extra), None);
    assert_eq!(harness.traffic.stats().pass_through, 1);
}

#[test]
fn test_combustion_car_skips_chargers() {
    let harness = Harness::new(small_charger());

    let combustion = harness.spawn(CarType::Combustion);
    assert_eq!(harness.car_state(combustion), Some(CarState::Exiting));

    let electric = harness.spawn(CarType::Electric);
    assert_eq!(harness.car_state(electric), Some(CarState::EnRoute));
    assert!(harness.traffic.reservation_for(electric).is_some());
}

#[test]
fn test_deleted_car_releases_its_spot() {
    let harness = Harness::new(small_lot());
    let car_id = harness.spawn(CarType::Combustion);
    let spot_ref = harness.traffic.reservation_for(car_id).unwrap();

    harness.entities.borrow_mut().remove_car(car_id);
    harness.bus.publish(CarDeleted { car: car_id });

    assert_eq!(harness.spot_state(spot_ref), SpotState::Free);
    assert_eq!(harness.traffic.reservation_for(car_id), None);

    // A second notification is harmless
    harness.bus.publish(CarDeleted { car: car_id });
    assert_eq!(harness.traffic.reservation_count(), 0);
}

#[test]
fn test_car_parks_then_leaves() {
    let harness = Harness::new(small_lot());
    let arrivals = Rc::new(Cell::new(0));
    let _arrived = {
        let arrivals = Rc::clone(&arrivals);
        harness
            .bus
            .subscribe(move |_: &CarArrived, _: &EventBus| arrivals.set(arrivals.get() + 1))
    };

    let car_id = harness.spawn(CarType::Combustion);
    let spot_ref = harness.traffic.reservation_for(car_id).unwrap();

    assert!(harness.run_until(2000, |h| h.car_state(car_id) == Some(CarState::Parked)));
    assert_eq!(harness.spot_state(spot_ref), SpotState::Occupied);
    assert_eq!(arrivals.get(), 1);

    assert!(harness.run_until(3000, |h| h.car_state(car_id).is_none()));
    assert_eq!(harness.spot_state(spot_ref), SpotState::Free);

    let stats = harness.traffic.stats();
    assert_eq!(stats.parked, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(harness.traffic.reservation_count(), 0);
    assert_eq!(harness.traffic.held_gate_count(), 0);
}

#[test]
fn test_electric_car_charges_at_station() {
    let harness = Harness::new(small_charger());
    let car_id = harness.spawn(CarType::Electric);

    assert!(harness.run_until(2000, |h| h.car_state(car_id) == Some(CarState::Charging)));
    assert!(harness.run_until(3000, |h| h.car_state(car_id).is_none()));
    assert_eq!(harness.traffic.stats().charged, 1);
}

#[test]
fn test_low_battery_car_prefers_charger() {
    let mut modules = small_lot();
    modules.push(Module::entrance(EntranceKind::Down).at(Position::new(400.0, 400.0)));
    modules.push(Module::small_charging_station(Orientation::Down).at(Position::new(400.0, 500.0)));
    let harness = Harness::new(modules);

    let car = Car::new(Position::new(0.0, 450.0), Position::new(60.0, 0.0), CarType::Electric)
        .with_energy_level(10.0);
    let car_id = harness.entities.borrow_mut().add_car(car);
    harness.bus.publish(CarSpawned { car: car_id });

    let spot_ref = harness.traffic.reservation_for(car_id).unwrap();
    let entities = harness.entities.borrow();
    let module = entities.module(spot_ref.module).unwrap();
    assert!(module.as_facility().unwrap().kind.is_charging());
}

#[test]
fn test_world_reset_drops_reservations() {
    let harness = Harness::new(small_lot());
    let car_id = harness.spawn(CarType::Combustion);
    let spot_ref = harness.traffic.reservation_for(car_id).unwrap();

    harness.bus.publish(GenerateWorld { seed: None });

    assert_eq!(harness.traffic.reservation_count(), 0);
    assert_eq!(harness.spot_state(spot_ref), SpotState::Free);
}

#[test]
fn test_spot_moves_through_reserved_and_occupied() {
    let harness = Harness::new(small_lot());
    let car_id = harness.spawn(CarType::Combustion);
    let spot_ref = harness.traffic.reservation_for(car_id).unwrap();
    assert_eq!(harness.spot_state(spot_ref), SpotState::Reserved);

    assert!(harness.run_until(2000, |h| h.spot_state(spot_ref) != SpotState::Reserved));
    assert_eq!(harness.spot_state(spot_ref), SpotState::Occupied);

    assert!(harness.run_until(3000, |h| h.spot_state(spot_ref) == SpotState::Free));
    assert_eq!(harness.traffic.reservation_for(car_id), None);
}

#[test]
fn test_price_minded_car_picks_cheaper_lot() {
    // Small lot (3.0) sits next to the spawn, the cheaper large lot (2.0) further east
    let mut modules = small_lot();
    modules.push(Module::entrance(EntranceKind::Down).at(Position::new(400.0, 400.0)));
    modules.push(Module::large_parking(Orientation::Down).at(Position::new(400.0, 500.0)));
    let harness = Harness::new(modules);

    let spawn_with = |priority: Priority| {
        let car = Car::new(Position::new(0.0, 450.0), Position::new(60.0, 0.0), CarType::Combustion)
            .with_energy_level(80.0)
            .with_priority(priority);
        let car_id = harness.entities.borrow_mut().add_car(car);
        harness.bus.publish(CarSpawned { car: car_id });
        car_id
    };
    let facility_kind = |car_id: CarId| {
        let spot_ref = harness.traffic.reservation_for(car_id).unwrap();
        let entities = harness.entities.borrow();
        let kind = entities
            .module(spot_ref.module)
            .and_then(|module| module.as_facility())
            .map(|facility| facility.kind);
        kind.unwrap()
    };

    let frugal = spawn_with(Priority::Price);
    assert_eq!(facility_kind(frugal), FacilityKind::LargeParking);

    let hurried = spawn_with(Priority::Distance);
    assert_eq!(facility_kind(hurried), FacilityKind::SmallParking);
}

#[test]
fn test_energy_depletion_is_announced_once() {
    let harness = Harness::new(small_lot());
    let depleted = Rc::new(Cell::new(0));
    let _depleted_sub = {
        let depleted = Rc::clone(&depleted);
        harness
            .bus
            .subscribe(move |_: &EnergyDepleted, _: &EventBus| depleted.set(depleted.get() + 1))
    };

    let car = Car::new(Position::new(0.0, 450.0), Position::new(60.0, 0.0), CarType::Combustion)
        .with_energy_level(0.05);
    let car_id = harness.entities.borrow_mut().add_car(car);
    harness.bus.publish(CarSpawned { car: car_id });

    // Keeps driving on an empty tank and eventually leaves
    assert!(harness.run_until(5000, |h| h.car_state(car_id).is_none()));
    assert_eq!(depleted.get(), 1);
    assert_eq!(harness.traffic.stats().depleted, 1);
}

#[test]
fn test_bad_time_step_leaves_gates_working() {
    let harness = Harness::new(small_lot());
    let car_id = harness.spawn(CarType::Combustion);
    assert!(harness.run_until(2000, |h| h.traffic.held_gate_count() > 0));

    harness.bus.publish(GameUpdate { dt: f32::NAN });
    harness.bus.publish(GameUpdate { dt: -1.0 });

    // The gate holder still crosses and parks
    assert!(harness.run_until(2000, |h| h.car_state(car_id) == Some(CarState::Parked)));
    assert!(harness.run_until(3000, |h| h.car_state(car_id).is_none()));
    assert_eq!(harness.traffic.held_gate_count(), 0);
}
