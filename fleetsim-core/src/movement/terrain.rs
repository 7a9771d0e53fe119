//! Map cells, their water classification, and weather.

use crate::config::MovementConfig;
use crate::fixed::Fixed;
use crate::state::{ActorId, CellId};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Broad category of a map cell. Everything except `Land` is navigable water.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    Land,
    /// Navigable river.
    River,
    /// Shelf water adjacent to land.
    Coastal,
    DeepOcean,
    /// Water that is neither coastal nor deep (inland seas, straits).
    OpenSea,
}

impl CellKind {
    pub fn is_water(self) -> bool {
        !matches!(self, CellKind::Land)
    }
}

/// Ground type, used for order-delay terrain sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LandTerrain {
    #[default]
    Plains,
    Forest,
    Hills,
    Mountains,
    Marsh,
    Desert,
    Water,
    Snow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// 1 for a fishing harbour, higher for dockyards.
    pub level: u32,
    pub naval_base: bool,
}

/// Ships a port can berth per level.
pub const SHIPS_PER_PORT_LEVEL: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapCell {
    pub id: CellId,
    pub kind: CellKind,
    pub terrain: LandTerrain,
    /// Cell centre in kilometres.
    pub x: i32,
    pub y: i32,
    pub neighbors: Vec<CellId>,
    /// Realm that controls the cell or sea zone. `None` is international water.
    pub controller: Option<ActorId>,
    pub port: Option<Port>,
    /// Surveyed depth. Falls back to the category estimate when unset.
    pub depth: Option<Fixed>,
}

impl MapCell {
    pub fn new(id: CellId, kind: CellKind, x: i32, y: i32) -> Self {
        Self {
            id,
            kind,
            terrain: if kind.is_water() {
                LandTerrain::Water
            } else {
                LandTerrain::Plains
            },
            x,
            y,
            neighbors: Vec::new(),
            controller: None,
            port: None,
            depth: None,
        }
    }

    pub fn is_water(&self) -> bool {
        self.kind.is_water()
    }

    pub fn is_river(&self) -> bool {
        self.kind == CellKind::River
    }

    pub fn is_coastal(&self) -> bool {
        self.kind == CellKind::Coastal
    }

    pub fn is_deep_ocean(&self) -> bool {
        self.kind == CellKind::DeepOcean
    }

    /// Depth in metres. Land has depth zero.
    pub fn water_depth(&self, config: &MovementConfig) -> Fixed {
        if let Some(depth) = self.depth {
            return depth;
        }
        match self.kind {
            CellKind::Land => Fixed::ZERO,
            CellKind::River => config.river_depth,
            CellKind::Coastal => config.coastal_depth,
            CellKind::DeepOcean => config.deep_ocean_depth,
            CellKind::OpenSea => config.default_water_depth,
        }
    }

    pub fn has_port(&self) -> bool {
        self.port.is_some()
    }

    pub fn is_naval_base(&self) -> bool {
        self.port.is_some_and(|p| p.naval_base)
    }

    /// Ships that can berth here. Zero without a port.
    pub fn port_capacity(&self) -> u32 {
        self.port
            .map_or(0, |p| p.level.max(1).saturating_mul(SHIPS_PER_PORT_LEVEL))
    }

    /// Sea lanes worth contesting: the coast and the deep ocean.
    pub fn is_strategic_zone(&self) -> bool {
        self.is_coastal() || self.is_deep_ocean()
    }
}

/// Integer square root (floor).
pub fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    let mut x = n;
    let mut y = x / 2 + x % 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

/// Cell graph keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameMap {
    cells: FxHashMap<CellId, MapCell>,
}

impl GameMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cell: MapCell) {
        self.cells.insert(cell.id, cell);
    }

    /// Add a two-way adjacency. Unknown ids are ignored.
    pub fn connect(&mut self, a: CellId, b: CellId) {
        if a == b || !self.cells.contains_key(&a) || !self.cells.contains_key(&b) {
            return;
        }
        for (from, to) in [(a, b), (b, a)] {
            if let Some(cell) = self.cells.get_mut(&from) {
                if !cell.neighbors.contains(&to) {
                    cell.neighbors.push(to);
                }
            }
        }
    }

    pub fn get(&self, id: CellId) -> Option<&MapCell> {
        self.cells.get(&id)
    }

    pub fn get_mut(&mut self, id: CellId) -> Option<&mut MapCell> {
        self.cells.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells in ascending id order.
    pub fn cells(&self) -> Vec<&MapCell> {
        let mut cells: Vec<_> = self.cells.values().collect();
        cells.sort_unstable_by_key(|c| c.id);
        cells
    }

    /// Whole-kilometre straight-line distance between two cell centres.
    pub fn distance_km(&self, a: CellId, b: CellId) -> Option<u64> {
        let (a, b) = (self.get(a)?, self.get(b)?);
        let dx = (a.x as i64 - b.x as i64).unsigned_abs();
        let dy = (a.y as i64 - b.y as i64).unsigned_abs();
        Some(isqrt(dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))))
    }

    pub fn water_neighbors(&self, id: CellId) -> Vec<CellId> {
        self.get(id)
            .map(|cell| {
                cell.neighbors
                    .iter()
                    .copied()
                    .filter(|n| self.get(*n).is_some_and(MapCell::is_water))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Two water cells sharing a border.
    pub fn are_connected_by_water(&self, a: CellId, b: CellId) -> bool {
        match (self.get(a), self.get(b)) {
            (Some(ca), Some(cb)) => {
                ca.is_water() && cb.is_water() && ca.neighbors.contains(&b)
            }
            _ => false,
        }
    }

    /// Terrain of the cell whose centre is nearest to `(x, y)` km.
    /// Ties go to the lower id. An empty map reads as plains.
    pub fn terrain_near(&self, x: Fixed, y: Fixed) -> LandTerrain {
        self.cells()
            .into_iter()
            .min_by_key(|c| {
                let dx = (Fixed::from_int(c.x as i64) - x).to_int() as i128;
                let dy = (Fixed::from_int(c.y as i64) - y).to_int() as i128;
                (dx * dx + dy * dy, c.id)
            })
            .map_or(LandTerrain::Plains, |c| c.terrain)
    }
}

/// Weather category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WeatherKind {
    #[default]
    Clear,
    Rain,
    HeavyRain,
    Stormy,
    Snow,
    Blizzard,
    Fog,
}

/// Conditions at a cell for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Weather {
    pub kind: WeatherKind,
    /// Wind speed in knots.
    pub wind_speed: Fixed,
    /// [0, 1]
    pub fog_density: Fixed,
}

impl Weather {
    pub fn calm() -> Self {
        Self::default()
    }

    pub fn storm(wind_knots: i64) -> Self {
        Self {
            kind: WeatherKind::Stormy,
            wind_speed: Fixed::from_int(wind_knots),
            fog_density: Fixed::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MovementConfig {
        MovementConfig::default()
    }

    #[test]
    fn test_depth_estimates_by_category() {
        let cfg = config();
        assert_eq!(MapCell::new(1, CellKind::River, 0, 0).water_depth(&cfg), Fixed::from_int(5));
        assert_eq!(MapCell::new(2, CellKind::Coastal, 0, 0).water_depth(&cfg), Fixed::from_int(50));
        assert_eq!(
            MapCell::new(3, CellKind::DeepOcean, 0, 0).water_depth(&cfg),
            Fixed::from_int(1000)
        );
        assert_eq!(MapCell::new(4, CellKind::OpenSea, 0, 0).water_depth(&cfg), Fixed::from_int(20));
        assert_eq!(MapCell::new(5, CellKind::Land, 0, 0).water_depth(&cfg), Fixed::ZERO);
    }

    #[test]
    fn test_surveyed_depth_overrides_estimate() {
        let mut cell = MapCell::new(1, CellKind::Coastal, 0, 0);
        cell.depth = Some(Fixed::from_int(8));
        assert_eq!(cell.water_depth(&config()), Fixed::from_int(8));
    }

    #[test]
    fn test_ports() {
        let mut cell = MapCell::new(1, CellKind::Coastal, 0, 0);
        assert_eq!(cell.port_capacity(), 0);
        assert!(!cell.is_naval_base());
        cell.port = Some(Port {
            level: 2,
            naval_base: true,
        });
        assert!(cell.has_port());
        assert!(cell.is_naval_base());
        assert_eq!(cell.port_capacity(), 20);
    }

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(24), 4);
        assert_eq!(isqrt(25), 5);
        assert_eq!(isqrt(u64::MAX), 4_294_967_295);
    }

    #[test]
    fn test_water_connectivity() {
        let mut map = GameMap::new();
        map.insert(MapCell::new(1, CellKind::Coastal, 0, 0));
        map.insert(MapCell::new(2, CellKind::DeepOcean, 100, 0));
        map.insert(MapCell::new(3, CellKind::Land, 0, 100));
        map.connect(1, 2);
        map.connect(1, 3);

        assert_eq!(map.water_neighbors(1), vec![2]);
        assert!(map.are_connected_by_water(1, 2));
        assert!(!map.are_connected_by_water(1, 3));
        assert!(!map.are_connected_by_water(2, 3));
        assert_eq!(map.distance_km(1, 2), Some(100));
        assert_eq!(map.distance_km(1, 99), None);
    }

    #[test]
    fn test_terrain_near_picks_closest_cell() {
        let mut map = GameMap::new();
        let mut hills = MapCell::new(1, CellKind::Land, 0, 0);
        hills.terrain = LandTerrain::Hills;
        map.insert(hills);
        map.insert(MapCell::new(2, CellKind::Coastal, 100, 0));
        assert_eq!(map.terrain_near(Fixed::from_int(10), Fixed::ZERO), LandTerrain::Hills);
        assert_eq!(map.terrain_near(Fixed::from_int(90), Fixed::ZERO), LandTerrain::Water);
    }
}
