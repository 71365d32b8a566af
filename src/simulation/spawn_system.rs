//! Car spawning
//!
//! Cars appear at the west end of the westernmost lane, either on a timer or
//! on request. A spawn waits while the spawn point is occupied so cars never
//! start on top of each other.

use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::Rng;
use std::cell::RefCell;
use std::rc::Rc;

use super::car::Car;
use super::config::{make_rng, SpawnConfig};
use super::entity_manager::EntityManager;
use super::error::check_time_step;
use super::event_bus::{EventBus, Subscription};
use super::events::{CarSpawned, GameUpdate, GenerateWorld, SpawnCarRequest};
use super::types::{CarId, CarType, Position, Priority};

struct SpawnState {
    config: SpawnConfig,
    rng: StdRng,
    /// Time since the last automatic spawn
    timer: f32,
    /// Spawns requested but not placed yet
    pending: usize,
}

impl SpawnState {
    fn make_car(&mut self, position: Position) -> Car {
        let car_type = if self.rng.random_bool(self.config.electric_ratio) {
            CarType::Electric
        } else {
            CarType::Combustion
        };
        let priority = if self.rng.random_bool(self.config.price_priority_ratio) {
            Priority::Price
        } else {
            Priority::Distance
        };
        let speed = self
            .rng
            .random_range(self.config.min_cruise_speed..=self.config.max_cruise_speed);

        Car::with_rng(position, Position::new(speed, 0.0), car_type, &mut self.rng)
            .with_cruise_speed(speed)
            .with_priority(priority)
    }

    fn advance_timer(&mut self, delta_secs: f32, live_cars: usize) {
        let interval = self.config.interval_secs;
        if interval <= 0.0 {
            return;
        }
        self.timer += delta_secs;
        while self.timer >= interval {
            self.timer -= interval;
            if live_cars + self.pending < self.config.max_cars {
                self.pending += 1;
            }
        }
    }

    /// Place one pending car if the spawn point is clear
    fn spawn_pending(&mut self, entities: &mut EntityManager) -> Option<CarId> {
        if self.pending == 0 {
            return None;
        }

        let point = entities.spawn_point().unwrap_or(Position::ZERO);
        if !entities.is_area_clear(&point, self.config.clearance) {
            debug!("Spawn point occupied, {} spawn(s) waiting", self.pending);
            return None;
        }

        let car = self.make_car(point);
        let car_type = car.car_type();
        let car_id = entities.add_car(car);
        self.pending -= 1;
        info!("Spawned {:?} car {:?} at ({:.0}, {:.0})", car_type, car_id, point.x, point.y);
        Some(car_id)
    }
}

fn spawn_and_announce(
    state: &RefCell<SpawnState>,
    entities: &RefCell<EntityManager>,
    bus: &EventBus,
) {
    let spawned = {
        let (Ok(mut state), Ok(mut entities)) = (state.try_borrow_mut(), entities.try_borrow_mut())
        else {
            error!("Spawn system could not borrow the world; spawn postponed");
            return;
        };
        state.spawn_pending(&mut entities)
    };

    if let Some(car) = spawned {
        bus.publish(CarSpawned { car });
    }
}

/// Places new cars in the world and announces them with `CarSpawned`
pub struct SpawnSystem {
    state: Rc<RefCell<SpawnState>>,
    _subscriptions: Vec<Subscription>,
}

impl SpawnSystem {
    pub fn new(
        bus: &Rc<EventBus>,
        entities: Rc<RefCell<EntityManager>>,
        config: SpawnConfig,
        seed: Option<u64>,
    ) -> Self {
        let state = Rc::new(RefCell::new(SpawnState {
            config,
            rng: make_rng(seed),
            timer: 0.0,
            pending: 0,
        }));
        let mut subscriptions = Vec::new();

        {
            let state = Rc::clone(&state);
            let entities = Rc::clone(&entities);
            subscriptions.push(bus.subscribe(move |_: &SpawnCarRequest, bus: &EventBus| {
                match state.try_borrow_mut() {
                    Ok(mut state) => state.pending += 1,
                    Err(_) => {
                        error!("Spawn system busy; spawn request dropped");
                        return;
                    }
                }
                spawn_and_announce(&state, &entities, bus);
            }));
        }

        {
            let state = Rc::clone(&state);
            let entities = Rc::clone(&entities);
            subscriptions.push(bus.subscribe(move |event: &GameUpdate, bus: &EventBus| {
                let delta_secs = match check_time_step(event.dt) {
                    Ok(delta_secs) => delta_secs,
                    Err(err) => {
                        error!("Spawn timer not advanced: {}", err);
                        return;
                    }
                };
                {
                    let (Ok(mut state), Ok(entities)) =
                        (state.try_borrow_mut(), entities.try_borrow())
                    else {
                        error!("Spawn system could not borrow the world; timer not advanced");
                        return;
                    };
                    state.advance_timer(delta_secs, entities.car_count());
                }
                spawn_and_announce(&state, &entities, bus);
            }));
        }

        {
            let state = Rc::clone(&state);
            subscriptions.push(bus.subscribe(move |_: &GenerateWorld, _: &EventBus| {
                let Ok(mut state) = state.try_borrow_mut() else {
                    error!("Spawn system could not reset its timer");
                    return;
                };
                state.pending = 0;
                state.timer = 0.0;
            }));
        }

        Self {
            state,
            _subscriptions: subscriptions,
        }
    }

    pub fn pending(&self) -> usize {
        self.state.try_borrow().map_or(0, |state| state.pending)
    }
}
