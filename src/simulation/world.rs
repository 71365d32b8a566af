//! Main simulation world that ties everything together
//!
//! `SimWorld` owns the event bus, the entity manager and the systems wired to
//! it. Everything after construction happens through events: a tick is one
//! `GameUpdate`, regenerating is one `GenerateWorld`.

use anyhow::Result;
use log::{error, info};
use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use super::config::{make_rng, SimConfig};
use super::entity_manager::EntityManager;
use super::error::check_time_step;
use super::event_bus::{EventBus, Subscription};
use super::events::{
    CameraMove, CarDeleted, GameUpdate, GenerateWorld, SpawnCarRequest, StartTracking, StopTracking,
};
use super::module::SpotState;
use super::spawn_system::SpawnSystem;
use super::tracking_system::{TrackingStatus, TrackingSystem};
use super::traffic_system::{TrafficStats, TrafficSystem};
use super::types::{CarId, CarType, Position};
use super::world_gen;

// Independent RNG streams per subsystem
const SPAWN_STREAM: u64 = 1;
const TRAFFIC_STREAM: u64 = 2;
const LAYOUT_STREAM: u64 = 3;

/// World units per map character, horizontally and vertically
const MAP_CELL_WIDTH: f32 = 20.0;
const MAP_CELL_HEIGHT: f32 = 40.0;

/// The main simulation world
pub struct SimWorld {
    bus: Rc<EventBus>,
    entities: Rc<RefCell<EntityManager>>,
    spawner: SpawnSystem,
    traffic: TrafficSystem,
    tracking: TrackingSystem,
    config: SimConfig,

    /// Simulation time
    pub time: f32,

    grid_enabled: bool,
    camera: Rc<Cell<Option<Position>>>,
    _subscriptions: Vec<Subscription>,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl SimWorld {
    /// Empty world with all systems subscribed
    pub fn new(config: SimConfig) -> Self {
        let bus = EventBus::new();
        let entities = Rc::new(RefCell::new(EntityManager::new()));

        let spawner = SpawnSystem::new(
            &bus,
            Rc::clone(&entities),
            config.spawn.clone(),
            config.seed_for(SPAWN_STREAM),
        );
        let traffic = TrafficSystem::with_config(
            &bus,
            Rc::clone(&entities),
            config.traffic.clone(),
            config.seed_for(TRAFFIC_STREAM),
        );
        let tracking = TrackingSystem::new(&bus, Rc::clone(&entities));

        let camera = Rc::new(Cell::new(None));
        let subscriptions = {
            let camera = Rc::clone(&camera);
            vec![bus.subscribe(move |event: &CameraMove, _: &EventBus| {
                camera.set(Some(event.position));
            })]
        };

        Self {
            bus,
            entities,
            spawner,
            traffic,
            tracking,
            config,
            time: 0.0,
            grid_enabled: false,
            camera,
            _subscriptions: subscriptions,
        }
    }

    /// Validate the configuration and build the configured layout
    pub fn from_config(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let seed = config.seed;
        let mut world = Self::new(config);
        world.generate_world(seed);
        Ok(world)
    }

    /// Demo layout with default settings
    pub fn create_test_world() -> Self {
        let mut world = Self::default();
        world.generate_world(None);
        world
    }

    pub fn create_test_world_with_seed(seed: u64) -> Self {
        let config = SimConfig {
            seed: Some(seed),
            ..SimConfig::default()
        };
        let mut world = Self::new(config);
        world.generate_world(Some(seed));
        world
    }

    /// Replace every module and car, then tell the systems to reset
    pub fn generate_world(&mut self, seed: Option<u64>) {
        {
            let mut entities = self.entities.borrow_mut();
            entities.clear();
            if self.config.world.random_layout {
                let mut rng = make_rng(seed.map(|seed| seed ^ LAYOUT_STREAM));
                world_gen::generate_random_layout(&mut entities, &self.config.world, &mut rng);
            } else {
                world_gen::build_demo_layout(&mut entities);
            }
        }
        self.time = 0.0;
        self.camera.set(None);
        info!("Generated world (seed {:?})", seed);
        self.bus.publish(GenerateWorld { seed });
    }

    /// Advance the simulation by one step
    pub fn tick(&mut self, delta_secs: f32) {
        if let Err(err) = check_time_step(delta_secs) {
            error!("Tick skipped: {}", err);
            return;
        }
        self.time += delta_secs;
        self.bus.publish(GameUpdate { dt: delta_secs });
    }

    pub fn request_spawn(&self) {
        self.bus.publish(SpawnCarRequest);
    }

    /// Spawn a car and follow it with the camera
    pub fn start_tracking(&self) {
        self.bus.publish(StartTracking);
    }

    pub fn stop_tracking(&self) {
        self.bus.publish(StopTracking);
    }

    /// Remove a car from the world; its spot and gates are released by the
    /// traffic system once `CarDeleted` is delivered
    pub fn delete_car(&self, car_id: CarId) -> bool {
        let removed = self.entities.borrow_mut().remove_car(car_id).is_some();
        if removed {
            self.bus.publish(CarDeleted { car: car_id });
        }
        removed
    }

    pub fn toggle_grid(&mut self) -> bool {
        self.grid_enabled = !self.grid_enabled;
        self.grid_enabled
    }

    pub fn is_grid_enabled(&self) -> bool {
        self.grid_enabled
    }

    /// Last position published by the tracking camera
    pub fn camera_position(&self) -> Option<Position> {
        self.camera.get()
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    pub fn entities(&self) -> Ref<'_, EntityManager> {
        self.entities.borrow()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn width(&self) -> f32 {
        self.config.world.width
    }

    pub fn height(&self) -> f32 {
        self.config.world.height
    }

    pub fn traffic(&self) -> &TrafficSystem {
        &self.traffic
    }

    pub fn traffic_stats(&self) -> TrafficStats {
        self.traffic.stats()
    }

    pub fn tracking_status(&self) -> TrackingStatus {
        self.tracking.status()
    }

    pub fn pending_spawns(&self) -> usize {
        self.spawner.pending()
    }

    /// Print a summary of the world state
    pub fn print_summary(&self) {
        let entities = self.entities.borrow();
        let stats = self.traffic.stats();

        println!("=== Parking Simulation Summary ===");
        println!("Time: {:.2}s", self.time);
        println!(
            "Modules: {}, Facilities: {}",
            entities.module_count(),
            entities.facilities().count()
        );
        println!("Cars: {}", entities.car_count());
        println!(
            "Parked: {}, Charged: {}, Passed through: {}, Completed: {}",
            stats.parked, stats.charged, stats.pass_through, stats.completed
        );
        println!();

        println!("--- Facilities ---");
        for (module_id, module) in entities.facilities() {
            let Some(facility) = module.as_facility() else {
                continue;
            };
            let count = |state: SpotState| {
                facility
                    .spots()
                    .iter()
                    .filter(|spot| spot.state() == state)
                    .count()
            };
            println!(
                "  {:?} {:?}: free={}, reserved={}, occupied={}",
                facility.kind,
                module_id.0 .0,
                count(SpotState::Free),
                count(SpotState::Reserved),
                count(SpotState::Occupied)
            );
        }

        if entities.car_count() > 0 {
            println!("--- Active Cars ---");
            for (car_id, car) in entities.cars() {
                println!(
                    "  Car {:?}: {:?} {:?}, energy={:.1}, position=({:.1}, {:.1}), path_remaining={}",
                    car_id.0 .0,
                    car.car_type(),
                    car.state(),
                    car.energy_level(),
                    car.position().x,
                    car.position().y,
                    car.remaining_waypoints()
                );
            }
        }

        if let TrackingStatus::Active(car_id) = self.tracking.status() {
            println!("--- Tracking car {:?} ---", car_id.0 .0);
        }
    }

    /// Render the world as characters, one row per line
    pub fn render_map(&self) -> Vec<String> {
        let entities = self.entities.borrow();

        let mut min = Position::new(f32::INFINITY, f32::INFINITY);
        let mut max = Position::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for (_, module) in entities.modules() {
            let far = module.world_position + module.size();
            min = Position::new(min.x.min(module.world_position.x), min.y.min(module.world_position.y));
            max = Position::new(max.x.max(far.x), max.y.max(far.y));
        }
        if !min.x.is_finite() {
            return Vec::new();
        }

        let width = ((max.x - min.x) / MAP_CELL_WIDTH).ceil() as usize;
        let height = ((max.y - min.y) / MAP_CELL_HEIGHT).ceil() as usize;
        if width == 0 || height == 0 {
            return Vec::new();
        }

        let background = |row: usize, col: usize| {
            if self.grid_enabled && row % 5 == 0 && col % 10 == 0 {
                '+'
            } else {
                ' '
            }
        };
        let mut grid: Vec<Vec<char>> = (0..height)
            .map(|row| (0..width).map(|col| background(row, col)).collect())
            .collect();

        let to_grid = |point: &Position| -> (usize, usize) {
            let col = ((point.x - min.x) / MAP_CELL_WIDTH).max(0.0) as usize;
            let row = ((point.y - min.y) / MAP_CELL_HEIGHT).max(0.0) as usize;
            (row.min(height - 1), col.min(width - 1))
        };

        // Modules
        for (_, module) in entities.modules() {
            let (top, left) = to_grid(&module.world_position);
            let (bottom, right) = to_grid(&(module.world_position + module.size() - Position::new(1.0, 1.0)));
            for row in grid.iter_mut().take(bottom + 1).skip(top) {
                for cell in row.iter_mut().take(right + 1).skip(left) {
                    *cell = module.glyph();
                }
            }
        }

        // Spots
        for (_, module) in entities.facilities() {
            let Some(facility) = module.as_facility() else {
                continue;
            };
            for spot in facility.spots() {
                let (row, col) = to_grid(&module.spot_world_position(spot));
                grid[row][col] = match spot.state() {
                    SpotState::Free => '.',
                    SpotState::Reserved => 'r',
                    SpotState::Occupied => 'o',
                };
            }
        }

        // Cars
        for (car_id, car) in entities.cars() {
            let (row, col) = to_grid(&car.position());
            grid[row][col] = if self.tracking.target() == Some(car_id) {
                '@'
            } else {
                match car.car_type() {
                    CarType::Electric => 'E',
                    CarType::Combustion => 'G',
                }
            };
        }

        grid.into_iter().map(|row| row.into_iter().collect()).collect()
    }

    /// Draw a visual map of the world in the terminal
    pub fn draw_map(&self) {
        println!("\n=== World Map ===");
        println!(
            "Legend: ==Road, #=Entrance, p/P=Parking, c/C=Charging, .=Free, r=Reserved, o=Occupied, E/G=Car, @=Tracked"
        );
        println!();
        for line in self.render_map() {
            println!("{}", line);
        }
        println!();
    }

    /// Log final statistics
    pub fn log_final_stats(&self) {
        let stats = self.traffic.stats();
        let entities = self.entities.borrow();

        info!("=== SIMULATION COMPLETE ===");
        info!("Elapsed time: {:.2}s", self.time);
        info!("Total cars spawned: {}", stats.spawned);
        info!("Total cars completed: {}", stats.completed);
        info!("Active cars: {}", entities.car_count());
        info!("Cars parked: {}", stats.parked);
        info!("Cars charged: {}", stats.charged);
        info!("Pass-through cars: {}", stats.pass_through);
        info!("Planning failures: {}", stats.planning_failures);
        info!("Energy depleted: {}", stats.depleted);
        info!("Total modules: {}", entities.module_count());
        info!(
            "Success rate: {:.1}%",
            if stats.spawned > 0 {
                (stats.completed as f32 / stats.spawned as f32) * 100.0
            } else {
                0.0
            }
        );
    }
}
