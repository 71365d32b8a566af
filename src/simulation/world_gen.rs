//! Layout generation
//!
//! Worlds are one east-west road row. Entrances on the row open up, down or
//! both ways, and every open side gets a facility attached to its connector.

use log::debug;
use rand::Rng;

use super::config::WorldConfig;
use super::entity_manager::EntityManager;
use super::module::{EntranceKind, FacilityKind, Module, Orientation, ROAD_MODULE_HEIGHT, ROAD_MODULE_WIDTH};
use super::types::Position;

/// Top edge of the road row
pub const ROAD_ROW_Y: f32 = 400.0;

const ENTRANCE_KINDS: [EntranceKind; 3] = [EntranceKind::Up, EntranceKind::Down, EntranceKind::Double];

const FACILITY_KINDS: [FacilityKind; 4] = [
    FacilityKind::SmallParking,
    FacilityKind::LargeParking,
    FacilityKind::SmallChargingStation,
    FacilityKind::LargeChargingStation,
];

fn slot_position(slot: usize) -> Position {
    Position::new(slot as f32 * ROAD_MODULE_WIDTH, ROAD_ROW_Y)
}

/// Place a facility on one side of the road slot so its entry meets the connector
fn place_facility(
    entities: &mut EntityManager,
    slot: usize,
    kind: FacilityKind,
    orientation: Orientation,
    price_scale: f32,
) {
    let x = slot_position(slot).x;
    let y = match orientation {
        Orientation::Up => ROAD_ROW_Y - kind.height(),
        Orientation::Down => ROAD_ROW_Y + ROAD_MODULE_HEIGHT,
    };
    let module = Module::facility(kind, orientation)
        .at(Position::new(x, y))
        .with_price_scale(price_scale);
    entities.add_module(module);
}

fn place_entrance(
    entities: &mut EntityManager,
    slot: usize,
    kind: EntranceKind,
    up: Option<FacilityKind>,
    down: Option<FacilityKind>,
    price_scale: f32,
) {
    entities.add_module(Module::entrance(kind).at(slot_position(slot)));
    if let (true, Some(facility)) = (kind.opens_up(), up) {
        place_facility(entities, slot, facility, Orientation::Up, price_scale);
    }
    if let (true, Some(facility)) = (kind.opens_down(), down) {
        place_facility(entities, slot, facility, Orientation::Down, price_scale);
    }
}

/// Fixed layout with every entrance and facility kind
pub fn build_demo_layout(entities: &mut EntityManager) {
    entities.add_module(Module::normal_road().at(slot_position(0)));
    place_entrance(
        entities,
        1,
        EntranceKind::Up,
        Some(FacilityKind::SmallParking),
        None,
        1.0,
    );
    place_entrance(
        entities,
        2,
        EntranceKind::Down,
        None,
        Some(FacilityKind::LargeParking),
        1.0,
    );
    entities.add_module(Module::normal_road().at(slot_position(3)));
    place_entrance(
        entities,
        4,
        EntranceKind::Double,
        Some(FacilityKind::SmallChargingStation),
        Some(FacilityKind::LargeChargingStation),
        1.0,
    );
    entities.add_module(Module::normal_road().at(slot_position(5)));

    debug!("Built demo layout with {} modules", entities.module_count());
}

/// Seeded layout: plain road at both ends, random entrances in between
pub fn generate_random_layout<R: Rng + ?Sized>(
    entities: &mut EntityManager,
    config: &WorldConfig,
    rng: &mut R,
) {
    let slots = config.road_slots.max(2);

    for slot in 0..slots {
        let inner = slot > 0 && slot + 1 < slots;
        if !inner || !rng.random_bool(config.entrance_chance) {
            entities.add_module(Module::normal_road().at(slot_position(slot)));
            continue;
        }

        let kind = ENTRANCE_KINDS[rng.random_range(0..ENTRANCE_KINDS.len())];
        let up = FACILITY_KINDS[rng.random_range(0..FACILITY_KINDS.len())];
        let down = FACILITY_KINDS[rng.random_range(0..FACILITY_KINDS.len())];
        let price_scale = rng.random_range(0.8..=1.2);
        place_entrance(entities, slot, kind, Some(up), Some(down), price_scale);
    }

    debug!(
        "Generated random layout: {} slots, {} modules",
        slots,
        entities.module_count()
    );
}
