//! Placed world modules: roads, entrances and facilities with their spots
//!
//! Every module has a fixed local geometry anchored at its top-left world
//! position. Road-like modules carry a two-way lane at `LANE_OFFSET_Y`;
//! facilities hang above (`Orientation::Up`) or below (`Orientation::Down`) the
//! road and are entered through the middle of the edge that faces it.

use super::types::{CarType, Position};

/// Footprint of road and entrance modules
pub const ROAD_MODULE_WIDTH: f32 = 200.0;
pub const ROAD_MODULE_HEIGHT: f32 = 100.0;

/// Local y of the lane centre line inside a road module
pub const LANE_OFFSET_Y: f32 = 50.0;

/// Footprint of facilities
pub const FACILITY_WIDTH: f32 = 200.0;
pub const SMALL_FACILITY_HEIGHT: f32 = 150.0;
pub const LARGE_FACILITY_HEIGHT: f32 = 270.0;

/// How far outside the entry edge the planner places the approach point
pub const ENTRY_APPROACH_OFFSET: f32 = 25.0;

const SPOT_COLUMN_OFFSET: f32 = 45.0;
const SPOT_ROW_SPACING: f32 = 40.0;
const SPOT_FAR_MARGIN: f32 = 30.0;
/// Spot rows keep at least this distance from the entry edge
const ENTRY_CLEARANCE: f32 = 60.0;

/// Occupancy of a spot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotState {
    Free,
    Reserved,
    Occupied,
}

/// A single parking or charging position inside a facility
#[derive(Debug, Clone, PartialEq)]
pub struct Spot {
    /// Position relative to the owning module's world position
    pub local_position: Position,
    /// Heading of a parked car in radians
    pub orientation: f32,
    /// Unique within the owning module
    pub id: u32,
    pub price: f32,
    state: SpotState,
}

impl Spot {
    pub fn new(local_position: Position, orientation: f32, id: u32, price: f32) -> Self {
        Self {
            local_position,
            orientation,
            id,
            price,
            state: SpotState::Free,
        }
    }

    pub fn state(&self) -> SpotState {
        self.state
    }

    pub fn is_free(&self) -> bool {
        self.state == SpotState::Free
    }

    /// Only the spot ledger changes occupancy
    pub(crate) fn set_state(&mut self, state: SpotState) {
        self.state = state;
    }
}

/// Which sides of the road an entrance opens onto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntranceKind {
    Up,
    Down,
    Double,
}

impl EntranceKind {
    pub fn opens_up(&self) -> bool {
        matches!(self, EntranceKind::Up | EntranceKind::Double)
    }

    pub fn opens_down(&self) -> bool {
        matches!(self, EntranceKind::Down | EntranceKind::Double)
    }
}

/// Side of the road a facility sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Above the road, entered from its bottom edge
    Up,
    /// Below the road, entered from its top edge
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacilityKind {
    SmallParking,
    LargeParking,
    SmallChargingStation,
    LargeChargingStation,
}

impl FacilityKind {
    pub fn is_charging(&self) -> bool {
        matches!(
            self,
            FacilityKind::SmallChargingStation | FacilityKind::LargeChargingStation
        )
    }

    pub fn is_large(&self) -> bool {
        matches!(
            self,
            FacilityKind::LargeParking | FacilityKind::LargeChargingStation
        )
    }

    pub fn default_price(&self) -> f32 {
        match self {
            FacilityKind::SmallParking => 3.0,
            FacilityKind::LargeParking => 2.0,
            FacilityKind::SmallChargingStation => 6.0,
            FacilityKind::LargeChargingStation => 5.0,
        }
    }

    pub fn height(&self) -> f32 {
        if self.is_large() {
            LARGE_FACILITY_HEIGHT
        } else {
            SMALL_FACILITY_HEIGHT
        }
    }

    /// Charging stations only serve electric cars
    pub fn accepts(&self, car_type: CarType) -> bool {
        !self.is_charging() || car_type == CarType::Electric
    }
}

/// Parking or charging facility payload
#[derive(Debug, Clone, PartialEq)]
pub struct Facility {
    pub kind: FacilityKind,
    pub orientation: Orientation,
    spots: Vec<Spot>,
}

impl Facility {
    pub fn new(kind: FacilityKind, orientation: Orientation) -> Self {
        let spots = default_spots(kind, orientation);
        Self {
            kind,
            orientation,
            spots,
        }
    }

    pub fn spots(&self) -> &[Spot] {
        &self.spots
    }

    pub fn spot(&self, id: u32) -> Option<&Spot> {
        self.spots.iter().find(|spot| spot.id == id)
    }

    pub(crate) fn spot_mut(&mut self, id: u32) -> Option<&mut Spot> {
        self.spots.iter_mut().find(|spot| spot.id == id)
    }

    pub fn free_spots(&self) -> impl Iterator<Item = &Spot> {
        self.spots.iter().filter(|spot| spot.is_free())
    }

    pub fn size(&self) -> Position {
        Position::new(FACILITY_WIDTH, self.kind.height())
    }

    /// Middle of the edge facing the road, in local coordinates
    pub fn entry_point(&self) -> Position {
        let size = self.size();
        match self.orientation {
            Orientation::Up => Position::new(size.x / 2.0, size.y),
            Orientation::Down => Position::new(size.x / 2.0, 0.0),
        }
    }

    /// Unit vector pointing from the entry out toward the road
    pub fn outward(&self) -> Position {
        match self.orientation {
            Orientation::Up => Position::new(0.0, 1.0),
            Orientation::Down => Position::new(0.0, -1.0),
        }
    }

    pub fn aisle_x(&self) -> f32 {
        self.size().x / 2.0
    }
}

/// Spots in two columns either side of the aisle, rows starting at the far edge
fn default_spots(kind: FacilityKind, orientation: Orientation) -> Vec<Spot> {
    let height = kind.height();
    let aisle_x = FACILITY_WIDTH / 2.0;
    let price = kind.default_price();

    let mut spots = Vec::new();
    let mut depth = SPOT_FAR_MARGIN;
    while depth <= height - ENTRY_CLEARANCE {
        let y = match orientation {
            Orientation::Up => depth,
            Orientation::Down => height - depth,
        };
        for (x, heading) in [
            (aisle_x - SPOT_COLUMN_OFFSET, std::f32::consts::PI),
            (aisle_x + SPOT_COLUMN_OFFSET, 0.0),
        ] {
            let id = spots.len() as u32;
            spots.push(Spot::new(Position::new(x, y), heading, id, price));
        }
        depth += SPOT_ROW_SPACING;
    }
    spots
}

/// Variant payload of a module
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleKind {
    NormalRoad,
    Entrance(EntranceKind),
    Facility(Facility),
}

/// A static placed world object
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// Top-left corner in world coordinates
    pub world_position: Position,
    pub kind: ModuleKind,
}

impl Module {
    pub fn new(kind: ModuleKind) -> Self {
        Self {
            world_position: Position::ZERO,
            kind,
        }
    }

    pub fn normal_road() -> Self {
        Self::new(ModuleKind::NormalRoad)
    }

    pub fn entrance(kind: EntranceKind) -> Self {
        Self::new(ModuleKind::Entrance(kind))
    }

    pub fn facility(kind: FacilityKind, orientation: Orientation) -> Self {
        Self::new(ModuleKind::Facility(Facility::new(kind, orientation)))
    }

    pub fn small_parking(orientation: Orientation) -> Self {
        Self::facility(FacilityKind::SmallParking, orientation)
    }

    pub fn large_parking(orientation: Orientation) -> Self {
        Self::facility(FacilityKind::LargeParking, orientation)
    }

    pub fn small_charging_station(orientation: Orientation) -> Self {
        Self::facility(FacilityKind::SmallChargingStation, orientation)
    }

    pub fn large_charging_station(orientation: Orientation) -> Self {
        Self::facility(FacilityKind::LargeChargingStation, orientation)
    }

    pub fn at(mut self, world_position: Position) -> Self {
        self.world_position = world_position;
        self
    }

    /// Multiply every spot price, used to vary generated layouts
    pub fn with_price_scale(mut self, scale: f32) -> Self {
        if let ModuleKind::Facility(facility) = &mut self.kind {
            for spot in &mut facility.spots {
                spot.price *= scale;
            }
        }
        self
    }

    pub fn size(&self) -> Position {
        match &self.kind {
            ModuleKind::NormalRoad | ModuleKind::Entrance(_) => {
                Position::new(ROAD_MODULE_WIDTH, ROAD_MODULE_HEIGHT)
            }
            ModuleKind::Facility(facility) => facility.size(),
        }
    }

    pub fn is_road(&self) -> bool {
        matches!(self.kind, ModuleKind::NormalRoad | ModuleKind::Entrance(_))
    }

    pub fn as_facility(&self) -> Option<&Facility> {
        match &self.kind {
            ModuleKind::Facility(facility) => Some(facility),
            _ => None,
        }
    }

    pub(crate) fn as_facility_mut(&mut self) -> Option<&mut Facility> {
        match &mut self.kind {
            ModuleKind::Facility(facility) => Some(facility),
            _ => None,
        }
    }

    pub fn to_world(&self, local: Position) -> Position {
        self.world_position + local
    }

    /// World position of a spot of this module
    pub fn spot_world_position(&self, spot: &Spot) -> Position {
        self.to_world(spot.local_position)
    }

    /// World position of the facility entry, if this is a facility
    pub fn world_entry_point(&self) -> Option<Position> {
        self.as_facility()
            .map(|facility| self.to_world(facility.entry_point()))
    }

    /// Lane end points (west, east) in world coordinates, for road-like modules
    pub fn lane_ends(&self) -> Option<(Position, Position)> {
        if !self.is_road() {
            return None;
        }
        Some((
            self.to_world(Position::new(0.0, LANE_OFFSET_Y)),
            self.to_world(Position::new(ROAD_MODULE_WIDTH, LANE_OFFSET_Y)),
        ))
    }

    /// The gate point in the middle of an entrance lane
    pub fn gate_point(&self) -> Option<Position> {
        match self.kind {
            ModuleKind::Entrance(_) => {
                Some(self.to_world(Position::new(ROAD_MODULE_WIDTH / 2.0, LANE_OFFSET_Y)))
            }
            _ => None,
        }
    }

    /// Connector points where facilities attach to an entrance
    pub fn connectors(&self) -> Vec<Position> {
        let mut points = Vec::new();
        if let ModuleKind::Entrance(kind) = self.kind {
            if kind.opens_up() {
                points.push(self.to_world(Position::new(ROAD_MODULE_WIDTH / 2.0, 0.0)));
            }
            if kind.opens_down() {
                points.push(self.to_world(Position::new(
                    ROAD_MODULE_WIDTH / 2.0,
                    ROAD_MODULE_HEIGHT,
                )));
            }
        }
        points
    }

    pub fn contains(&self, point: &Position) -> bool {
        let size = self.size();
        point.x >= self.world_position.x
            && point.x <= self.world_position.x + size.x
            && point.y >= self.world_position.y
            && point.y <= self.world_position.y + size.y
    }

    /// Single character used by the ASCII map
    pub fn glyph(&self) -> char {
        match &self.kind {
            ModuleKind::NormalRoad => '=',
            ModuleKind::Entrance(_) => '#',
            ModuleKind::Facility(facility) => match facility.kind {
                FacilityKind::SmallParking => 'p',
                FacilityKind::LargeParking => 'P',
                FacilityKind::SmallChargingStation => 'c',
                FacilityKind::LargeChargingStation => 'C',
            },
        }
    }
}
