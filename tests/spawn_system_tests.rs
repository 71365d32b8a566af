//! Timed and requested spawns

use std::cell::RefCell;
use std::rc::Rc;

use parking_sim::simulation::{
    EntityManager, EventBus, GameUpdate, GenerateWorld, Module, Position, SpawnCarRequest,
    SpawnConfig, SpawnSystem,
};

fn road_world() -> Rc<RefCell<EntityManager>> {
    let entities = Rc::new(RefCell::new(EntityManager::new()));
    entities.borrow_mut().add_module(Module::normal_road());
    entities
        .borrow_mut()
        .add_module(Module::normal_road().at(Position::new(200.0, 0.0)));
    entities
}

fn spawner(
    interval_secs: f32,
    max_cars: usize,
) -> (Rc<EventBus>, Rc<RefCell<EntityManager>>, SpawnSystem) {
    let bus = EventBus::new();
    let entities = road_world();
    let config = SpawnConfig {
        interval_secs,
        max_cars,
        ..SpawnConfig::default()
    };
    let spawner = SpawnSystem::new(&bus, Rc::clone(&entities), config, Some(5));
    (bus, entities, spawner)
}

#[test]
fn test_request_spawns_immediately() {
    let (bus, entities, spawner) = spawner(0.0, 12);

    bus.publish(SpawnCarRequest);

    assert_eq!(entities.borrow().car_count(), 1);
    assert_eq!(spawner.pending(), 0);
}

#[test]
fn test_blocked_spawn_point_queues_requests() {
    let (bus, entities, spawner) = spawner(0.0, 12);

    bus.publish(SpawnCarRequest);
    bus.publish(SpawnCarRequest);

    // Nothing moves the first car, so the second one waits
    assert_eq!(entities.borrow().car_count(), 1);
    assert_eq!(spawner.pending(), 1);
}

#[test]
fn test_long_tick_counts_every_elapsed_interval() {
    let (bus, entities, spawner) = spawner(0.5, 12);

    bus.publish(GameUpdate { dt: 2.0 });

    // Four intervals elapsed, one car placed, three waiting
    assert_eq!(entities.borrow().car_count(), 1);
    assert_eq!(spawner.pending(), 3);
}

#[test]
fn test_timer_respects_population_cap() {
    let (bus, entities, spawner) = spawner(0.5, 2);

    bus.publish(GameUpdate { dt: 5.0 });

    assert_eq!(entities.borrow().car_count() + spawner.pending(), 2);
}

#[test]
fn test_bad_time_step_keeps_timer_running() {
    let (bus, entities, _spawner) = spawner(1.0, 12);

    bus.publish(GameUpdate { dt: f32::NAN });
    bus.publish(GameUpdate { dt: -3.0 });
    assert_eq!(entities.borrow().car_count(), 0);

    for _ in 0..11 {
        bus.publish(GameUpdate { dt: 0.1 });
    }
    assert_eq!(entities.borrow().car_count(), 1);
}

#[test]
fn test_world_reset_drops_pending_spawns() {
    let (bus, _entities, spawner) = spawner(0.0, 12);
    bus.publish(SpawnCarRequest);
    bus.publish(SpawnCarRequest);
    assert_eq!(spawner.pending(), 1);

    bus.publish(GenerateWorld { seed: None });

    assert_eq!(spawner.pending(), 0);
}
