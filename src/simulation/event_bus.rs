//! In-process typed publish/subscribe
//!
//! Delivery is synchronous: every handler for an event runs to completion
//! before `publish` returns. Handlers receive the bus so they can publish
//! follow-up events without keeping a reference to it. Subscribing returns a
//! `Subscription`; dropping it unregisters the handler.

use log::warn;
use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Marker for types that travel over the bus
pub trait Event: Any {}

type Handler = Rc<RefCell<dyn FnMut(&(dyn Any + 'static), &EventBus)>>;

#[derive(Default)]
struct Registry {
    next_token: u64,
    handlers: HashMap<TypeId, Vec<(u64, Handler)>>,
}

#[derive(Default)]
pub struct EventBus {
    registry: RefCell<Registry>,
}

impl EventBus {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Register `handler` for events of type `E`
    pub fn subscribe<E, F>(self: &Rc<Self>, mut handler: F) -> Subscription
    where
        E: Event,
        F: FnMut(&E, &EventBus) + 'static,
    {
        let erased: Handler = Rc::new(RefCell::new(move |event: &(dyn Any + 'static), bus: &EventBus| {
            if let Some(event) = event.downcast_ref::<E>() {
                handler(event, bus);
            }
        }));

        let type_id = TypeId::of::<E>();
        let mut registry = self.registry.borrow_mut();
        let token = registry.next_token;
        registry.next_token += 1;
        registry
            .handlers
            .entry(type_id)
            .or_default()
            .push((token, erased));

        Subscription {
            bus: Rc::downgrade(self),
            type_id,
            token,
        }
    }

    /// Deliver `event` to every current subscriber, in subscription order
    pub fn publish<E: Event>(&self, event: E) {
        // Snapshot so handlers can subscribe, unsubscribe and publish freely
        let handlers: Vec<Handler> = self
            .registry
            .borrow()
            .handlers
            .get(&TypeId::of::<E>())
            .map(|handlers| handlers.iter().map(|(_, handler)| Rc::clone(handler)).collect())
            .unwrap_or_default();

        for handler in handlers {
            match handler.try_borrow_mut() {
                Ok(mut handler) => (&mut *handler)(&event, self),
                Err(_) => warn!(
                    "Skipping re-entrant delivery of {} to a handler that is still running",
                    type_name::<E>()
                ),
            }
        }
    }

    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.registry
            .borrow()
            .handlers
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }

    fn unsubscribe(&self, type_id: TypeId, token: u64) {
        let mut registry = self.registry.borrow_mut();
        if let Some(handlers) = registry.handlers.get_mut(&type_id) {
            handlers.retain(|(existing, _)| *existing != token);
            if handlers.is_empty() {
                registry.handlers.remove(&type_id);
            }
        }
    }
}

/// Owned registration; the handler stays subscribed for as long as this lives
#[must_use = "dropping a Subscription unsubscribes its handler immediately"]
pub struct Subscription {
    bus: Weak<EventBus>,
    type_id: TypeId,
    token: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.unsubscribe(self.type_id, self.token);
        }
    }
}
