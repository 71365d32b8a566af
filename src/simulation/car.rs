//! Car state machine and movement
//!
//! A car drives toward the head of its waypoint queue, pops waypoints as it
//! reaches them and reports arrival through `has_arrived()`. The traffic system
//! decides what the car does next; the car only moves, charges and counts down
//! its dwell time.

use std::collections::VecDeque;

use rand::Rng;

use super::error::{check_time_step, TrafficError};
use super::gate::GateRegistry;
use super::types::{
    CarId, CarType, Position, Priority, ACCELERATION, CAR_LENGTH, DEFAULT_CRUISE_SPEED,
    ENERGY_PER_UNIT, GATE_APPROACH_DISTANCE, INITIAL_ENERGY_MAX, INITIAL_ENERGY_MIN,
    LANE_HALF_WIDTH, MAX_ENERGY, MIN_ENERGY, SAFE_FOLLOWING_MULTIPLIER,
};
use super::waypoint::Waypoint;

/// Price-minded drivers cruise a little slower
pub const PRICE_PRIORITY_SPEED_FACTOR: f32 = 0.85;

/// Lifecycle of a car; removal from the world is the terminal step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarState {
    /// Spawned, no path assigned yet
    Idle,
    /// Driving to a reserved spot
    EnRoute,
    Parked,
    Charging,
    /// Driving to a world exit
    Exiting,
}

/// Result of a car update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarUpdateResult {
    /// Nothing to drive toward (parked, charging, or empty queue)
    Idle,
    Moving,
    /// Held back by a car ahead or a gate
    Waiting,
    /// The energy level just reached zero; the car keeps driving
    EnergyDepleted,
}

/// What other cars see of a car during one update pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarSnapshot {
    pub id: CarId,
    pub position: Position,
    /// Unit heading vector
    pub heading: Position,
    pub moving: bool,
}

/// A car in the parking simulation
#[derive(Debug, Clone)]
pub struct Car {
    position: Position,
    velocity: Position,
    /// Heading angle in radians
    heading: f32,
    car_type: CarType,
    priority: Priority,
    state: CarState,
    /// Battery or fuel level in [MIN_ENERGY, MAX_ENERGY]
    energy_level: f32,
    cruise_speed: f32,
    spawn_position: Position,
    waypoints: VecDeque<Waypoint>,
    dwell_remaining: f32,
    charge_rate: f32,
}

impl Car {
    /// Create a car with a randomized energy level
    pub fn new(position: Position, velocity: Position, car_type: CarType) -> Self {
        Self::with_rng(position, velocity, car_type, &mut rand::rng())
    }

    pub fn with_rng<R: Rng + ?Sized>(
        position: Position,
        velocity: Position,
        car_type: CarType,
        rng: &mut R,
    ) -> Self {
        let heading = if velocity.length() > 0.0 {
            velocity.y.atan2(velocity.x)
        } else {
            0.0
        };

        Self {
            position,
            velocity,
            heading,
            car_type,
            priority: Priority::default(),
            state: CarState::Idle,
            energy_level: rng.random_range(INITIAL_ENERGY_MIN..=INITIAL_ENERGY_MAX),
            cruise_speed: DEFAULT_CRUISE_SPEED,
            spawn_position: position,
            waypoints: VecDeque::new(),
            dwell_remaining: 0.0,
            charge_rate: 0.0,
        }
    }

    pub fn with_energy_level(mut self, level: f32) -> Self {
        self.energy_level = level.clamp(MIN_ENERGY, MAX_ENERGY);
        self
    }

    pub fn with_cruise_speed(mut self, speed: f32) -> Self {
        self.cruise_speed = speed;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn velocity(&self) -> Position {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: Position) {
        self.velocity = velocity;
    }

    pub fn heading(&self) -> f32 {
        self.heading
    }

    pub fn car_type(&self) -> CarType {
        self.car_type
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    pub fn state(&self) -> CarState {
        self.state
    }

    pub fn energy_level(&self) -> f32 {
        self.energy_level
    }

    pub fn cruise_speed(&self) -> f32 {
        self.cruise_speed
    }

    pub fn spawn_position(&self) -> Position {
        self.spawn_position
    }

    pub fn is_moving(&self) -> bool {
        matches!(self.state, CarState::EnRoute | CarState::Exiting)
    }

    /// Add `delta` (may be negative) to the energy level, clamped to
    /// [MIN_ENERGY, MAX_ENERGY]. Returns true if this call used up the last of it.
    pub fn charge(&mut self, delta: f32) -> bool {
        let before = self.energy_level;
        self.energy_level = (self.energy_level + delta).clamp(MIN_ENERGY, MAX_ENERGY);
        before > MIN_ENERGY && self.energy_level <= MIN_ENERGY
    }

    /// True when there is no waypoint left to drive to
    pub fn has_arrived(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn add_waypoint(&mut self, waypoint: Waypoint) {
        self.waypoints.push_back(waypoint);
    }

    pub fn clear_waypoints(&mut self) {
        self.waypoints.clear();
    }

    pub fn waypoints(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.iter()
    }

    pub fn next_waypoint(&self) -> Option<&Waypoint> {
        self.waypoints.front()
    }

    pub fn remaining_waypoints(&self) -> usize {
        self.waypoints.len()
    }

    /// Replace the route and switch state, used by the traffic system
    pub fn assign_path(&mut self, path: Vec<Waypoint>, state: CarState) {
        self.waypoints = path.into();
        self.state = state;
    }

    /// Stop at the current spot for `dwell_secs`; with a charge rate the car charges
    pub fn park(&mut self, dwell_secs: f32, charge_rate: Option<f32>, heading: f32) {
        self.waypoints.clear();
        self.velocity = Position::ZERO;
        self.heading = heading;
        self.dwell_remaining = dwell_secs.max(0.0);
        match charge_rate {
            Some(rate) => {
                self.state = CarState::Charging;
                self.charge_rate = rate;
            }
            None => {
                self.state = CarState::Parked;
                self.charge_rate = 0.0;
            }
        }
    }

    /// Parked long enough, or charged full
    pub fn dwell_finished(&self) -> bool {
        match self.state {
            CarState::Parked => self.dwell_remaining <= 0.0,
            CarState::Charging => {
                self.dwell_remaining <= 0.0 || self.energy_level >= MAX_ENERGY
            }
            _ => false,
        }
    }

    pub fn snapshot(&self, id: CarId) -> CarSnapshot {
        CarSnapshot {
            id,
            position: self.position,
            heading: Position::from_angle(self.heading),
            moving: self.is_moving(),
        }
    }

    fn target_speed(&self) -> f32 {
        match self.priority {
            Priority::Distance => self.cruise_speed,
            Priority::Price => self.cruise_speed * PRICE_PRIORITY_SPEED_FACTOR,
        }
    }

    /// Whether `other` is a moving car in our lane, close ahead, going our way
    fn is_following(&self, id: CarId, other: &CarSnapshot, direction: Position, step: f32) -> bool {
        if other.id == id || !other.moving {
            return false;
        }

        let offset = other.position - self.position;
        let along = offset.dot(&direction);
        if along <= 0.0 || along > step + CAR_LENGTH * SAFE_FOLLOWING_MULTIPLIER {
            return false;
        }

        direction.cross(&offset).abs() < LANE_HALF_WIDTH && other.heading.dot(&direction) > 0.5
    }

    /// Update car movement logic
    pub fn update(
        &mut self,
        id: CarId,
        delta_secs: f32,
        gates: &mut GateRegistry,
        neighbours: &[CarSnapshot],
    ) -> Result<CarUpdateResult, TrafficError> {
        check_time_step(delta_secs).map_err(|_| {
            TrafficError::InvalidState(format!("car {:?} updated with time step {}", id, delta_secs))
        })?;

        if matches!(self.state, CarState::Parked | CarState::Charging) {
            self.velocity = Position::ZERO;
            self.dwell_remaining = (self.dwell_remaining - delta_secs).max(0.0);
            if self.state == CarState::Charging {
                self.charge(self.charge_rate * delta_secs);
            }
            return Ok(CarUpdateResult::Idle);
        }

        let Some(head) = self.waypoints.front().copied() else {
            self.velocity = Position::ZERO;
            return Ok(CarUpdateResult::Idle);
        };

        let to_target = head.position - self.position;
        let distance = to_target.length();
        let direction = if distance > f32::EPSILON {
            to_target.normalized()
        } else {
            Position::from_angle(self.heading)
        };

        let speed = (self.velocity.length() + ACCELERATION * delta_secs).min(self.target_speed());
        let mut step = speed * delta_secs;

        let blocked_by_car_ahead = neighbours
            .iter()
            .any(|other| self.is_following(id, other, direction, step));
        if blocked_by_car_ahead {
            step = 0.0;
        }

        // Only ask for the gate when not stuck behind someone, unless we already hold it
        if let Some(gate_id) = head.gate {
            if distance <= GATE_APPROACH_DISTANCE {
                let gate = gates.gate_mut(gate_id);
                if (!blocked_by_car_ahead || gate.is_held_by(id)) && !gate.can_proceed(id) {
                    step = 0.0;
                }
            }
        }

        let within_tolerance = distance <= head.tolerance();
        let arrives = (step > 0.0 && (within_tolerance || step >= distance))
            || (within_tolerance && head.gate.is_none());

        let previous = self.position;
        if arrives {
            self.position = head.position;
            self.waypoints.pop_front();
            if let Some(gate_id) = head.gate {
                gates.gate_mut(gate_id).release(id);
            }
            self.velocity = if self.waypoints.is_empty() {
                Position::ZERO
            } else {
                direction * speed
            };
        } else if step > 0.0 {
            self.position = self.position + direction * step;
            self.velocity = direction * speed;
        } else {
            self.velocity = Position::ZERO;
        }

        if distance > f32::EPSILON {
            self.heading = direction.y.atan2(direction.x);
        }

        let travelled = previous.distance(&self.position);
        if travelled > 0.0 && self.charge(-travelled * ENERGY_PER_UNIT) {
            return Ok(CarUpdateResult::EnergyDepleted);
        }

        if arrives || step > 0.0 {
            Ok(CarUpdateResult::Moving)
        } else {
            Ok(CarUpdateResult::Waiting)
        }
    }
}
