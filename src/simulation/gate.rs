//! Entrance gate locks
//!
//! Each entrance's lane cell is a shared resource: through traffic and cars
//! turning in or out of a facility all pass the gate point, one at a time.

use std::collections::HashMap;

use super::types::{CarId, ModuleId};

/// Default time a car must hold the gate before crossing
pub const DEFAULT_CROSSING_TIME: f32 = 0.2;

/// Lock on the cell in the middle of an entrance
#[derive(Debug, Clone)]
pub struct EntranceGate {
    pub module: ModuleId,
    /// The car currently holding the gate (if any)
    pub held_by: Option<CarId>,
    /// How long the current holder has held the gate
    pub hold_timer: f32,
    /// Time it takes for a car to cross the gate
    pub crossing_time: f32,
}

impl EntranceGate {
    pub fn new(module: ModuleId, crossing_time: f32) -> Self {
        Self {
            module,
            held_by: None,
            hold_timer: 0.0,
            crossing_time,
        }
    }

    pub fn is_held_by(&self, car_id: CarId) -> bool {
        self.held_by == Some(car_id)
    }

    /// Release the gate lock
    pub fn release(&mut self, car_id: CarId) {
        if self.is_held_by(car_id) {
            self.held_by = None;
            self.hold_timer = 0.0;
        }
    }

    /// Check if a car can move through the gate
    /// This handles both acquiring the lock and checking the crossing time
    /// Returns true if the car can proceed, false if it must wait
    pub fn can_proceed(&mut self, car_id: CarId) -> bool {
        match self.held_by {
            None => {
                self.held_by = Some(car_id);
                self.hold_timer = 0.0;
                false
            }
            Some(current) if current == car_id => self.hold_timer >= self.crossing_time,
            Some(_) => false,
        }
    }

    pub fn update_timer(&mut self, delta_secs: f32) {
        if self.held_by.is_some() {
            self.hold_timer += delta_secs;
        }
    }
}

/// All gates of the current world, created on first use
#[derive(Debug, Clone)]
pub struct GateRegistry {
    gates: HashMap<ModuleId, EntranceGate>,
    crossing_time: f32,
}

impl Default for GateRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CROSSING_TIME)
    }
}

impl GateRegistry {
    pub fn new(crossing_time: f32) -> Self {
        Self {
            gates: HashMap::new(),
            crossing_time,
        }
    }

    pub fn gate_mut(&mut self, module: ModuleId) -> &mut EntranceGate {
        let crossing_time = self.crossing_time;
        self.gates
            .entry(module)
            .or_insert_with(|| EntranceGate::new(module, crossing_time))
    }

    pub fn gate(&self, module: ModuleId) -> Option<&EntranceGate> {
        self.gates.get(&module)
    }

    pub fn holder(&self, module: ModuleId) -> Option<CarId> {
        self.gates.get(&module).and_then(|gate| gate.held_by)
    }

    pub fn update(&mut self, delta_secs: f32) {
        for gate in self.gates.values_mut() {
            gate.update_timer(delta_secs);
        }
    }

    /// Drop every lock held by a car
    pub fn release_all(&mut self, car_id: CarId) {
        for gate in self.gates.values_mut() {
            gate.release(car_id);
        }
    }

    pub fn clear(&mut self) {
        self.gates.clear();
    }

    pub fn held_count(&self) -> usize {
        self.gates.values().filter(|gate| gate.held_by.is_some()).count()
    }
}
