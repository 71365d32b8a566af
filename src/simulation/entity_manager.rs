//! Ownership of all modules and cars
//!
//! The entity manager is the only place cars and modules are added or removed.
//! Ids are handed out from one counter and never reused, so a deleted car's id
//! simply stops resolving instead of pointing at somebody else.

use anyhow::{Context, Result};
use log::warn;
use std::collections::BTreeMap;

use super::car::{Car, CarSnapshot, CarUpdateResult};
use super::gate::GateRegistry;
use super::module::{Module, Spot};
use super::types::{CarId, ModuleId, Position, SimId, SpotRef};

#[derive(Debug, Default)]
pub struct EntityManager {
    modules: BTreeMap<ModuleId, Module>,
    cars: BTreeMap<CarId, Car>,

    /// Next ID to assign
    next_id: usize,

    /// Bumped whenever the module set changes
    layout_generation: u64,
}

impl EntityManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_sim_id(&mut self) -> SimId {
        let id = SimId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn add_module(&mut self, module: Module) -> ModuleId {
        let id = ModuleId(self.next_sim_id());
        self.modules.insert(id, module);
        self.layout_generation += 1;
        id
    }

    pub fn add_car(&mut self, car: Car) -> CarId {
        let id = CarId(self.next_sim_id());
        self.cars.insert(id, car);
        id
    }

    /// Remove a car; callers publish `CarDeleted` once they release their borrow
    pub fn remove_car(&mut self, car_id: CarId) -> Option<Car> {
        self.cars.remove(&car_id)
    }

    /// Drop every module and car
    pub fn clear(&mut self) {
        self.modules.clear();
        self.cars.clear();
        self.layout_generation += 1;
    }

    pub fn layout_generation(&self) -> u64 {
        self.layout_generation
    }

    pub fn module(&self, module_id: ModuleId) -> Option<&Module> {
        self.modules.get(&module_id)
    }

    pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules.iter().map(|(id, module)| (*id, module))
    }

    pub fn road_modules(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules().filter(|(_, module)| module.is_road())
    }

    pub fn facilities(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules()
            .filter(|(_, module)| module.as_facility().is_some())
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn car(&self, car_id: CarId) -> Option<&Car> {
        self.cars.get(&car_id)
    }

    pub fn car_mut(&mut self, car_id: CarId) -> Option<&mut Car> {
        self.cars.get_mut(&car_id)
    }

    pub fn cars(&self) -> impl Iterator<Item = (CarId, &Car)> {
        self.cars.iter().map(|(id, car)| (*id, car))
    }

    pub fn car_ids(&self) -> Vec<CarId> {
        self.cars.keys().copied().collect()
    }

    pub fn car_count(&self) -> usize {
        self.cars.len()
    }

    pub fn spot(&self, spot_ref: SpotRef) -> Option<&Spot> {
        self.modules
            .get(&spot_ref.module)
            .and_then(Module::as_facility)
            .and_then(|facility| facility.spot(spot_ref.spot))
    }

    /// Module and spot together, as the planner wants them
    pub fn module_and_spot(&self, spot_ref: SpotRef) -> Result<(&Module, &Spot)> {
        let module = self
            .modules
            .get(&spot_ref.module)
            .context("Module not found")?;
        let spot = module
            .as_facility()
            .and_then(|facility| facility.spot(spot_ref.spot))
            .context("Spot not found")?;
        Ok((module, spot))
    }

    /// Mutable spot access is reserved for the spot ledger
    pub(crate) fn spot_mut(&mut self, spot_ref: SpotRef) -> Option<&mut Spot> {
        self.modules
            .get_mut(&spot_ref.module)
            .and_then(Module::as_facility_mut)
            .and_then(|facility| facility.spot_mut(spot_ref.spot))
    }

    /// West end of the westernmost lane, where new cars enter the world
    pub fn spawn_point(&self) -> Option<Position> {
        self.road_modules()
            .filter_map(|(_, module)| module.lane_ends())
            .map(|(west, _)| west)
            .min_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// Whether any car is within `radius` of `position`
    pub fn is_area_clear(&self, position: &Position, radius: f32) -> bool {
        self.cars
            .values()
            .all(|car| car.position().distance(position) > radius)
    }

    /// Update all cars in the simulation
    ///
    /// Every car sees the same snapshot of the others, taken before the pass.
    /// Returns the non-trivial results (depletion) for the caller to handle.
    pub fn update_cars(
        &mut self,
        delta_secs: f32,
        gates: &mut GateRegistry,
    ) -> Vec<(CarId, CarUpdateResult)> {
        let snapshots: Vec<CarSnapshot> = self
            .cars
            .iter()
            .map(|(id, car)| car.snapshot(*id))
            .collect();

        let mut results = Vec::new();
        for (car_id, car) in self.cars.iter_mut() {
            match car.update(*car_id, delta_secs, gates, &snapshots) {
                Ok(CarUpdateResult::EnergyDepleted) => {
                    results.push((*car_id, CarUpdateResult::EnergyDepleted));
                }
                Ok(_) => {}
                Err(err) => warn!("Car {:?} failed to update: {}", car_id, err),
            }
        }

        results
    }
}
