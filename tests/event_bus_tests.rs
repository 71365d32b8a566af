//! Typed publish/subscribe behaviour

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use parking_sim::simulation::{
    CarSpawned, EntityManager, Event, EventBus, GameUpdate, TrafficSystem,
};

#[derive(Debug, Clone, Copy)]
struct Ping(u32);

#[derive(Debug, Clone, Copy)]
struct Pong(u32);

impl Event for Ping {}
impl Event for Pong {}

#[test]
fn test_handler_receives_published_event() {
    let bus = EventBus::new();
    let seen = Rc::new(Cell::new(0));
    let _sub = {
        let seen = Rc::clone(&seen);
        bus.subscribe(move |event: &Ping, _: &EventBus| seen.set(event.0))
    };

    bus.publish(Ping(7));

    assert_eq!(seen.get(), 7);
    assert_eq!(bus.subscriber_count::<Ping>(), 1);
    assert_eq!(bus.subscriber_count::<Pong>(), 0);
}

#[test]
fn test_dropping_subscription_unsubscribes() {
    let bus = EventBus::new();
    let calls = Rc::new(Cell::new(0));
    let sub = {
        let calls = Rc::clone(&calls);
        bus.subscribe(move |_: &Ping, _: &EventBus| calls.set(calls.get() + 1))
    };

    bus.publish(Ping(1));
    drop(sub);
    bus.publish(Ping(2));

    assert_eq!(calls.get(), 1);
    assert_eq!(bus.subscriber_count::<Ping>(), 0);
}

#[test]
fn test_handlers_run_in_subscription_order() {
    let bus = EventBus::new();
    let order = Rc::new(RefCell::new(Vec::new()));
    let _subs: Vec<_> = (0..3)
        .map(|index| {
            let order = Rc::clone(&order);
            bus.subscribe(move |_: &Ping, _: &EventBus| order.borrow_mut().push(index))
        })
        .collect();

    bus.publish(Ping(0));

    assert_eq!(*order.borrow(), vec![0, 1, 2]);
}

#[test]
fn test_handler_can_publish_follow_up_event() {
    let bus = EventBus::new();
    let pongs = Rc::new(Cell::new(0));
    let _ping = bus.subscribe(|event: &Ping, bus: &EventBus| bus.publish(Pong(event.0 + 1)));
    let _pong = {
        let pongs = Rc::clone(&pongs);
        bus.subscribe(move |event: &Pong, _: &EventBus| pongs.set(event.0))
    };

    bus.publish(Ping(41));

    assert_eq!(pongs.get(), 42);
}

#[test]
fn test_reentrant_delivery_is_skipped() {
    let bus = EventBus::new();
    let calls = Rc::new(Cell::new(0));
    let _sub = {
        let calls = Rc::clone(&calls);
        bus.subscribe(move |event: &Ping, bus: &EventBus| {
            calls.set(calls.get() + 1);
            bus.publish(Ping(event.0 + 1));
        })
    };

    bus.publish(Ping(0));

    assert_eq!(calls.get(), 1);
}

#[test]
fn test_publish_without_subscribers_is_noop() {
    let bus = EventBus::new();
    bus.publish(Pong(3));
    assert_eq!(bus.subscriber_count::<Pong>(), 0);
}

#[test]
fn test_system_subscriptions_end_with_the_system() {
    let bus = EventBus::new();
    let entities = Rc::new(RefCell::new(EntityManager::new()));

    let traffic = TrafficSystem::new(&bus, Rc::clone(&entities));
    assert_eq!(bus.subscriber_count::<CarSpawned>(), 1);
    assert_eq!(bus.subscriber_count::<GameUpdate>(), 1);

    drop(traffic);
    assert_eq!(bus.subscriber_count::<CarSpawned>(), 0);
    assert_eq!(bus.subscriber_count::<GameUpdate>(), 0);
}

#[test]
fn test_subscription_outliving_bus_is_harmless() {
    let bus = EventBus::new();
    let sub = bus.subscribe(|_: &Ping, _: &EventBus| {});
    drop(bus);
    drop(sub);
}
