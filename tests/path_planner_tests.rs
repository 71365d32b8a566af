//! Facility paths, road routes and exit paths

use parking_sim::simulation::path_planner::{
    generate_exit_path, generate_pass_through, generate_path, generate_route,
};
use parking_sim::simulation::{
    Car, CarType, EntityManager, EntranceKind, Module, NodeKind, Orientation, Position,
    RoadNetwork, Spot,
};

fn car_at(position: Position, car_type: CarType) -> Car {
    Car::new(position, Position::new(60.0, 0.0), car_type)
}

/// Plain road, then an entrance opening up with a small parking lot above it
fn small_lot_world() -> EntityManager {
    let mut entities = EntityManager::new();
    entities.add_module(Module::normal_road().at(Position::new(0.0, 400.0)));
    entities.add_module(Module::entrance(EntranceKind::Up).at(Position::new(200.0, 400.0)));
    entities.add_module(Module::small_parking(Orientation::Up).at(Position::new(200.0, 250.0)));
    entities
}

#[test]
fn test_path_ends_on_spot() {
    let station = Module::small_charging_station(Orientation::Down).at(Position::new(500.0, 500.0));
    let spot = Spot::new(Position::new(20.0, 20.0), 0.0, 0, 6.0);
    let car = car_at(Position::new(0.0, 450.0), CarType::Electric);

    let path = generate_path(&car, &station, &spot);

    assert!(path.len() >= 2);
    let last = path.last().unwrap().position;
    assert!(last.distance(&Position::new(520.0, 520.0)) <= 5.0);
}

#[test]
fn test_path_through_every_default_spot() {
    let lot = Module::large_parking(Orientation::Down).at(Position::new(0.0, 0.0));
    let car = car_at(Position::new(0.0, -50.0), CarType::Combustion);
    let facility = lot.as_facility().unwrap();

    assert_eq!(facility.spots().len(), 10);
    for spot in facility.spots() {
        let path = generate_path(&car, &lot, spot);
        assert!(path.len() >= 2);
        assert!(path.last().unwrap().position.approx_eq(&lot.spot_world_position(spot), 5.0));
    }
}

#[test]
fn test_upward_facility_is_entered_from_below() {
    let lot = Module::small_parking(Orientation::Up).at(Position::new(0.0, 0.0));
    let spot = lot.as_facility().unwrap().spots()[0].clone();
    let car = car_at(Position::new(0.0, 200.0), CarType::Combustion);

    let path = generate_path(&car, &lot, &spot);

    // Entry edge is the bottom edge at y = 150
    assert!(path[0].position.y > 150.0);
    assert!(path.last().unwrap().position.y < 150.0);
}

#[test]
fn test_downward_facility_is_entered_from_above() {
    let lot = Module::small_parking(Orientation::Down).at(Position::new(0.0, 100.0));
    let spot = lot.as_facility().unwrap().spots()[0].clone();
    let car = car_at(Position::new(0.0, 50.0), CarType::Combustion);

    let path = generate_path(&car, &lot, &spot);

    assert!(path[0].position.y < 100.0);
    assert!(path.last().unwrap().position.y > 100.0);
}

#[test]
fn test_charging_station_rejects_combustion_car() {
    let station = Module::small_charging_station(Orientation::Up);
    let spot = station.as_facility().unwrap().spots()[0].clone();
    let car = car_at(Position::ZERO, CarType::Combustion);

    assert!(generate_path(&car, &station, &spot).is_empty());
}

#[test]
fn test_road_module_has_no_facility_path() {
    let road = Module::normal_road();
    let spot = Spot::new(Position::new(20.0, 20.0), 0.0, 0, 1.0);
    let car = car_at(Position::ZERO, CarType::Electric);

    assert!(generate_path(&car, &road, &spot).is_empty());
}

#[test]
fn test_network_merges_touching_modules() {
    let entities = small_lot_world();
    let network = RoadNetwork::from_modules(entities.road_modules());

    // West end, shared middle point, gate, east end, connector
    assert_eq!(network.node_count(), 5);
    assert_eq!(network.exit_nodes().len(), 2);
    assert!(network
        .connector_near(&Position::new(300.0, 400.0), 1.0)
        .is_some());
}

#[test]
fn test_route_passes_gate_and_ends_on_spot() {
    let entities = small_lot_world();
    let network = RoadNetwork::from_modules(entities.road_modules());
    let (_, lot) = entities.facilities().next().unwrap();
    let spot = lot.as_facility().unwrap().spots()[0].clone();
    let car = car_at(Position::new(0.0, 450.0), CarType::Combustion);

    let route = generate_route(&network, &car, lot, &spot);

    assert!(!route.is_empty());
    assert!(route
        .last()
        .unwrap()
        .position
        .approx_eq(&lot.spot_world_position(&spot), 5.0));

    let entrance_id = entities
        .road_modules()
        .find(|(_, module)| module.gate_point().is_some())
        .map(|(id, _)| id)
        .unwrap();
    assert!(route.iter().any(|waypoint| waypoint.gate == Some(entrance_id)));
}

#[test]
fn test_route_fails_for_detached_facility() {
    let mut entities = small_lot_world();
    let far_lot = entities.add_module(
        Module::large_parking(Orientation::Up).at(Position::new(2000.0, 0.0)),
    );
    let network = RoadNetwork::from_modules(entities.road_modules());
    let lot = entities.module(far_lot).unwrap();
    let spot = lot.as_facility().unwrap().spots()[0].clone();
    let car = car_at(Position::new(0.0, 450.0), CarType::Combustion);

    assert!(generate_route(&network, &car, lot, &spot).is_empty());
}

#[test]
fn test_pass_through_heads_for_far_exit() {
    let mut entities = EntityManager::new();
    entities.add_module(Module::normal_road());
    let network = RoadNetwork::from_modules(entities.road_modules());
    let car = car_at(Position::new(0.0, 50.0), CarType::Combustion);

    let path = generate_pass_through(&network, &car);

    assert!(!path.is_empty());
    assert_eq!(path.last().unwrap().position, Position::new(200.0, 50.0));
}

#[test]
fn test_exit_path_leaves_facility_through_entry() {
    let entities = small_lot_world();
    let network = RoadNetwork::from_modules(entities.road_modules());
    let (_, lot) = entities.facilities().next().unwrap();
    let spot = lot.as_facility().unwrap().spots()[0].clone();

    // Sitting on the spot it was routed to
    let car = Car::new(lot.spot_world_position(&spot), Position::ZERO, CarType::Combustion);

    let path = generate_exit_path(&network, &car, Some((lot, &spot)));

    let entry = lot.world_entry_point().unwrap();
    assert!(path
        .iter()
        .any(|waypoint| waypoint.position.approx_eq(&entry, 1.0)));
    let exit = path.last().unwrap().position;
    let exits: Vec<Position> = network
        .exit_nodes()
        .into_iter()
        .filter_map(|index| network.node(index))
        .filter(|node| node.kind == NodeKind::Lane)
        .map(|node| node.position)
        .collect();
    assert!(exits.contains(&exit));
}

#[test]
fn test_exit_path_without_roads_goes_straight_ahead() {
    let network = RoadNetwork::new();
    let car = car_at(Position::new(10.0, 10.0), CarType::Combustion);

    let path = generate_exit_path(&network, &car, None);

    assert_eq!(path.len(), 1);
    assert!(path[0].position.approx_eq(&Position::new(410.0, 10.0), 0.01));
}
