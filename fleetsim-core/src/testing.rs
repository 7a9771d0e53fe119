use crate::fixed::Fixed;
use crate::movement::terrain::{CellKind, GameMap, LandTerrain, MapCell, Port};
use crate::state::{ActorId, CellId, CommanderId, Force, ForceId, MoraleState, Unit, UnitType};

pub struct UnitBuilder {
    unit: Unit,
}

impl UnitBuilder {
    pub fn new(unit_type: UnitType) -> Self {
        Self {
            unit: Unit::new(unit_type),
        }
    }

    pub fn strength(mut self, strength: u32) -> Self {
        self.unit.max_strength = self.unit.max_strength.max(strength);
        self.unit.current_strength = strength;
        self
    }

    pub fn max_strength(mut self, max: u32) -> Self {
        self.unit.max_strength = max;
        self.unit.current_strength = self.unit.current_strength.min(max);
        self
    }

    pub fn equipment(mut self, quality: f32) -> Self {
        self.unit.equipment_quality = Fixed::from_f32(quality);
        self
    }

    pub fn training(mut self, training: f32) -> Self {
        self.unit.training = Fixed::from_f32(training);
        self
    }

    pub fn experience(mut self, experience: f32) -> Self {
        self.unit.experience = Fixed::from_f32(experience);
        self
    }

    pub fn morale(mut self, morale: MoraleState) -> Self {
        self.unit.morale = morale;
        self
    }

    pub fn supply(mut self, supply: f32) -> Self {
        self.unit.supply_level = Fixed::from_f32(supply);
        self
    }

    pub fn build(self) -> Unit {
        self.unit
    }
}

pub struct ForceBuilder {
    force: Force,
}

impl ForceBuilder {
    pub fn new(id: ForceId) -> Self {
        Self {
            force: Force::new(id, format!("Force {id}"), 1, 0),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.force.name = name.to_string();
        self
    }

    pub fn owner(mut self, owner: ActorId) -> Self {
        self.force.owner = owner;
        self
    }

    pub fn location(mut self, cell: CellId) -> Self {
        self.force.location = cell;
        self.force.home_location = cell;
        self
    }

    pub fn commander(mut self, id: CommanderId) -> Self {
        self.force.commander = Some(id);
        self
    }

    pub fn morale(mut self, morale: f32) -> Self {
        self.force.morale = Fixed::from_f32(morale);
        self
    }

    pub fn supply(mut self, supply: f32) -> Self {
        self.force.supply_level = Fixed::from_f32(supply);
        self
    }

    /// Append a fresh unit at exactly `strength` men.
    pub fn unit(mut self, unit_type: UnitType, strength: u32) -> Self {
        self.force
            .units
            .push(Unit::with_strength(unit_type, strength));
        self
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.force.units.push(unit);
        self
    }

    pub fn build(mut self) -> Force {
        self.force.recalculate_strength();
        self.force
    }
}

/// Builds a [`GameMap`]. Links are applied at `build` so cells can be
/// declared in any order.
#[derive(Default)]
pub struct MapBuilder {
    map: GameMap,
    links: Vec<(CellId, CellId)>,
}

impl MapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cell(mut self, id: CellId, kind: CellKind, x: i32, y: i32) -> Self {
        self.map.insert(MapCell::new(id, kind, x, y));
        self
    }

    pub fn terrain(mut self, id: CellId, terrain: LandTerrain) -> Self {
        if let Some(cell) = self.map.get_mut(id) {
            cell.terrain = terrain;
        }
        self
    }

    pub fn port(mut self, id: CellId, level: u32, naval_base: bool) -> Self {
        if let Some(cell) = self.map.get_mut(id) {
            cell.port = Some(Port { level, naval_base });
        }
        self
    }

    pub fn controller(mut self, id: CellId, owner: ActorId) -> Self {
        if let Some(cell) = self.map.get_mut(id) {
            cell.controller = Some(owner);
        }
        self
    }

    pub fn link(mut self, a: CellId, b: CellId) -> Self {
        self.links.push((a, b));
        self
    }

    pub fn build(mut self) -> GameMap {
        for (a, b) in self.links {
            self.map.connect(a, b);
        }
        self.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_force_builder_sums_strength() {
        let force = ForceBuilder::new(3)
            .owner(7)
            .location(12)
            .unit(UnitType::Frigates, 300)
            .unit(UnitType::Frigates, 300)
            .build();
        assert_eq!(force.total_strength, 600);
        assert_eq!(force.owner, 7);
        assert_eq!(force.home_location, 12);
    }

    #[test]
    fn test_unit_builder() {
        let unit = UnitBuilder::new(UnitType::Galleons)
            .strength(250)
            .equipment(0.9)
            .morale(MoraleState::Confident)
            .build();
        assert_eq!(unit.current_strength, 250);
        assert_eq!(unit.equipment_quality, Fixed::from_raw(9000));
        assert_eq!(unit.morale, MoraleState::Confident);
    }

    #[test]
    fn test_map_builder_links_late_cells() {
        let map = MapBuilder::new()
            .link(1, 2)
            .cell(1, CellKind::Coastal, 0, 0)
            .cell(2, CellKind::OpenSea, 10, 0)
            .port(1, 2, true)
            .build();
        assert!(map.are_connected_by_water(1, 2));
        assert!(map.get(1).unwrap().is_naval_base());
    }
}
