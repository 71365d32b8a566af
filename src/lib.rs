//! Parking Simulation Library
//!
//! A headless simulation of cars looking for parking and charging spots.

pub mod simulation;
