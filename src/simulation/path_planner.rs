//! Path planning into and out of facilities
//!
//! All functions here are pure: they read the car, the module geometry and the
//! road network and return a fresh waypoint list. An empty list means planning
//! failed and the caller decides what to do instead.

use log::warn;

use super::car::Car;
use super::module::{Module, Spot, ENTRY_APPROACH_OFFSET};
use super::road_network::RoadNetwork;
use super::types::{Position, PASS_THROUGH_DISTANCE, POSITION_EPSILON};
use super::waypoint::Waypoint;

/// How close a facility entry must be to an entrance connector to count as attached
pub const ENTRY_EPSILON: f32 = 5.0;

fn push_distinct(path: &mut Vec<Waypoint>, waypoint: Waypoint) {
    let duplicate = path
        .last()
        .is_some_and(|last| last.position.approx_eq(&waypoint.position, POSITION_EPSILON));
    if !duplicate {
        path.push(waypoint);
    }
}

/// Facility-local path: approach point outside the entry edge, the entry, the
/// aisle level with the spot, and the spot itself.
///
/// The entry edge follows the facility's orientation, so an upward facility is
/// always entered from below and a downward one from above. Returns an empty
/// path if the module is not a facility or does not serve this car's type.
pub fn generate_path(car: &Car, facility_module: &Module, spot: &Spot) -> Vec<Waypoint> {
    let Some(facility) = facility_module.as_facility() else {
        return Vec::new();
    };
    if !facility.kind.accepts(car.car_type()) {
        return Vec::new();
    }

    let entry = facility_module.to_world(facility.entry_point());
    let approach = entry + facility.outward() * ENTRY_APPROACH_OFFSET;
    let aisle = facility_module.to_world(Position::new(
        facility.aisle_x(),
        spot.local_position.y,
    ));
    let target = facility_module.spot_world_position(spot);

    let mut path = vec![Waypoint::new(approach)];
    for point in [entry, aisle] {
        if !point.approx_eq(&target, POSITION_EPSILON) {
            push_distinct(&mut path, Waypoint::new(point));
        }
    }
    // The approach and the spot are always both present
    path.push(Waypoint::new(target));
    path
}

/// Full route from the car's nearest lane node through the road network into
/// the facility and onto the spot. Empty when the facility's entry is not
/// attached to any entrance or no road path leads there.
pub fn generate_route(
    network: &RoadNetwork,
    car: &Car,
    facility_module: &Module,
    spot: &Spot,
) -> Vec<Waypoint> {
    let local = generate_path(car, facility_module, spot);
    if local.is_empty() {
        return local;
    }

    let Some(entry) = facility_module.world_entry_point() else {
        return Vec::new();
    };
    let Some(connector) = network.connector_near(&entry, ENTRY_EPSILON) else {
        return Vec::new();
    };
    let Some(start) = network.closest_lane_node(&car.position()) else {
        return Vec::new();
    };
    let Some(nodes) = network.find_path(start, connector) else {
        return Vec::new();
    };

    let mut route = network.waypoints_for(&nodes);
    // The road already ends at the entry, so the approach point is not needed
    for waypoint in local.into_iter().skip(1) {
        push_distinct(&mut route, waypoint);
    }
    route
}

/// Route out of the world: back through the aisle and entry if parked, then
/// along the road to the exit farthest from where the car spawned.
///
/// Never returns an empty path. Without any reachable exit a single waypoint
/// straight ahead of the car is used.
pub fn generate_exit_path(
    network: &RoadNetwork,
    car: &Car,
    parked_in: Option<(&Module, &Spot)>,
) -> Vec<Waypoint> {
    let mut path = Vec::new();

    let start_node = match parked_in {
        Some((module, spot)) => match module.as_facility() {
            Some(facility) => {
                let aisle =
                    module.to_world(Position::new(facility.aisle_x(), spot.local_position.y));
                let entry = module.to_world(facility.entry_point());
                if !aisle.approx_eq(&car.position(), POSITION_EPSILON) {
                    path.push(Waypoint::new(aisle));
                }
                push_distinct(&mut path, Waypoint::new(entry));
                network.connector_near(&entry, ENTRY_EPSILON)
            }
            None => network.closest_lane_node(&car.position()),
        },
        None => network.closest_lane_node(&car.position()),
    };

    let exit_route = start_node.and_then(|start| {
        let spawn = car.spawn_position();
        let mut exits = network.exit_nodes();
        exits.sort_by(|&a, &b| {
            let dist_a = network.node(a).map_or(0.0, |node| spawn.distance(&node.position));
            let dist_b = network.node(b).map_or(0.0, |node| spawn.distance(&node.position));
            dist_b
                .partial_cmp(&dist_a)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        exits
            .into_iter()
            .find_map(|exit| network.find_path(start, exit))
    });

    match exit_route {
        Some(nodes) => {
            for waypoint in network.waypoints_for(&nodes) {
                push_distinct(&mut path, waypoint);
            }
        }
        None => {
            warn!("No reachable exit, sending car straight ahead");
            let ahead = car.position() + Position::from_angle(car.heading()) * PASS_THROUGH_DISTANCE;
            push_distinct(&mut path, Waypoint::new(ahead));
        }
    }

    path
}

/// Route for a car that never parks: straight to an exit
pub fn generate_pass_through(network: &RoadNetwork, car: &Car) -> Vec<Waypoint> {
    generate_exit_path(network, car, None)
}
