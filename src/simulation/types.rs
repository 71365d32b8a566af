//! Core types for the parking simulation
//!
//! Identifiers, the 2D position type and the tuning constants shared by the
//! car, planner and traffic modules.

use std::ops::{Add, Mul, Sub};

/// A unique identifier for simulation entities
/// This is a simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimId(pub usize);

/// A wrapper type for car IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CarId(pub SimId);

/// A wrapper type for module IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(pub SimId);

/// Addresses one spot inside one facility module
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpotRef {
    pub module: ModuleId,
    pub spot: u32,
}

/// Power source of a car
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarType {
    Electric,
    Combustion,
}

/// What a car optimises for when picking a spot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    /// Closest free spot wins
    #[default]
    Distance,
    /// Cheapest free spot wins, distance breaks ties
    Price,
}

/// A 2D position in world units (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const ZERO: Position = Position { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(&self, other: &Position) -> f32 {
        (*other - *self).length()
    }

    pub fn dot(&self, other: &Position) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Magnitude of the 2D cross product, i.e. the perpendicular distance of
    /// `other` from a line along `self` when `self` is a unit vector.
    pub fn cross(&self, other: &Position) -> f32 {
        self.x * other.y - self.y * other.x
    }

    /// Unit vector in the same direction, or zero for a zero vector
    pub fn normalized(&self) -> Position {
        let len = self.length();
        if len > f32::EPSILON {
            Position::new(self.x / len, self.y / len)
        } else {
            Position::ZERO
        }
    }

    pub fn lerp(&self, other: &Position, t: f32) -> Position {
        Position {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Calculate the heading angle from this position to another (radians)
    pub fn angle_to(&self, other: &Position) -> f32 {
        let delta = *other - *self;
        if delta.length() > 0.0 {
            delta.y.atan2(delta.x)
        } else {
            0.0
        }
    }

    /// Unit vector for a heading angle
    pub fn from_angle(angle: f32) -> Position {
        Position::new(angle.cos(), angle.sin())
    }

    pub fn approx_eq(&self, other: &Position, epsilon: f32) -> bool {
        self.distance(other) <= epsilon
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Position {
    type Output = Position;

    fn mul(self, rhs: f32) -> Position {
        Position::new(self.x * rhs, self.y * rhs)
    }
}

/// Length of a car in world units
pub const CAR_LENGTH: f32 = 24.0;

/// Safe following distance multiplier for CAR_LENGTH
pub const SAFE_FOLLOWING_MULTIPLIER: f32 = 1.5;

/// Half the width of a lane; cars further apart sideways don't follow each other
pub const LANE_HALF_WIDTH: f32 = 10.0;

/// Distance from a gated waypoint at which a car starts asking for the lock
pub const GATE_APPROACH_DISTANCE: f32 = 30.0;

/// Default radius within which a waypoint counts as reached
pub const DEFAULT_ARRIVAL_TOLERANCE: f32 = 2.0;

/// Default cruise speed in world units per second
pub const DEFAULT_CRUISE_SPEED: f32 = 60.0;

/// Acceleration in world units per second squared
pub const ACCELERATION: f32 = 120.0;

/// Energy (battery or fuel percent) used per world unit travelled
pub const ENERGY_PER_UNIT: f32 = 0.004;

/// Bounds of a car's energy level
pub const MIN_ENERGY: f32 = 0.0;
pub const MAX_ENERGY: f32 = 100.0;

/// Range of the randomized initial energy level
pub const INITIAL_ENERGY_MIN: f32 = 10.0;
pub const INITIAL_ENERGY_MAX: f32 = 90.0;

/// Two positions closer than this are treated as the same point
pub const POSITION_EPSILON: f32 = 1.0;

/// How far ahead of a car a last-resort exit waypoint is placed
pub const PASS_THROUGH_DISTANCE: f32 = 400.0;
