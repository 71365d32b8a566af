//! Simulation configuration
//!
//! Plain structs with sensible defaults; the binary fills them from the
//! command line and calls `validate` before building a world.

use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::gate::DEFAULT_CROSSING_TIME;

/// World size and layout generation
#[derive(Debug, Clone)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
    /// Number of road modules in a generated layout
    pub road_slots: usize,
    /// Chance that a generated road slot is an entrance with facilities
    pub entrance_chance: f64,
    /// Use the seeded random layout instead of the fixed demo layout
    pub random_layout: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 1600.0,
            height: 900.0,
            road_slots: 8,
            entrance_chance: 0.6,
            random_layout: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpawnConfig {
    /// Seconds between automatic spawns; zero disables them
    pub interval_secs: f32,
    /// Automatic spawns stop at this many live cars
    pub max_cars: usize,
    /// Share of spawned cars that are electric
    pub electric_ratio: f64,
    /// Share of spawned cars that pick spots by price
    pub price_priority_ratio: f64,
    pub min_cruise_speed: f32,
    pub max_cruise_speed: f32,
    /// Spawn is postponed while another car is this close to the spawn point
    pub clearance: f32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            interval_secs: 2.0,
            max_cars: 12,
            electric_ratio: 0.5,
            price_priority_ratio: 0.3,
            min_cruise_speed: 50.0,
            max_cruise_speed: 80.0,
            clearance: 40.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrafficConfig {
    pub min_dwell_secs: f32,
    pub max_dwell_secs: f32,
    /// Electric cars below this level only look at chargers first
    pub low_battery_threshold: f32,
    /// Energy gained per second while charging
    pub charge_rate: f32,
    /// Time a car holds an entrance gate before crossing
    pub gate_crossing_secs: f32,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            min_dwell_secs: 5.0,
            max_dwell_secs: 15.0,
            low_battery_threshold: 30.0,
            charge_rate: 8.0,
            gate_crossing_secs: DEFAULT_CROSSING_TIME,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimConfig {
    /// Seed for every random choice; `None` draws from the OS
    pub seed: Option<u64>,
    pub world: WorldConfig,
    pub spawn: SpawnConfig,
    pub traffic: TrafficConfig,
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        if self.world.width <= 0.0 || self.world.height <= 0.0 {
            bail!("World dimensions must be positive");
        }
        if !(0.0..=1.0).contains(&self.world.entrance_chance) {
            bail!("Entrance chance must be between 0 and 1");
        }
        if self.spawn.interval_secs < 0.0 {
            bail!("Spawn interval cannot be negative");
        }
        if !(0.0..=1.0).contains(&self.spawn.electric_ratio) {
            bail!("Electric ratio must be between 0 and 1");
        }
        if !(0.0..=1.0).contains(&self.spawn.price_priority_ratio) {
            bail!("Price priority ratio must be between 0 and 1");
        }
        if self.spawn.min_cruise_speed <= 0.0
            || self.spawn.min_cruise_speed > self.spawn.max_cruise_speed
        {
            bail!("Cruise speed range is invalid");
        }
        if self.traffic.min_dwell_secs < 0.0
            || self.traffic.min_dwell_secs > self.traffic.max_dwell_secs
        {
            bail!("Dwell time range is invalid");
        }
        if self.traffic.charge_rate < 0.0 || self.traffic.gate_crossing_secs < 0.0 {
            bail!("Charge rate and gate crossing time cannot be negative");
        }
        Ok(())
    }

    /// Seed for one subsystem, so each draws an independent sequence
    pub fn seed_for(&self, stream: u64) -> Option<u64> {
        self.seed
            .map(|seed| seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(stream))
    }
}

/// Seeded RNG when a seed is given, OS-seeded otherwise
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
