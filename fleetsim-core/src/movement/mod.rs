//! Movement legality, cost and hazards.
//!
//! A force may enter a cell only if every one of its units can. Armies stay
//! on land, fleets stay on water, and each vessel class has its own depth
//! and access limits.

pub mod pathfinding;
pub mod terrain;

pub use pathfinding::{find_path, MovementGraph};
pub use terrain::{CellKind, GameMap, LandTerrain, MapCell, Port, Weather, WeatherKind};

use crate::config::MovementConfig;
use crate::fixed::Fixed;
use crate::state::{ActorId, Force, UnitType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod defines {
    use crate::fixed::Fixed;

    /// Wind above this (knots) adds attrition anywhere at sea.
    pub const HIGH_WIND: Fixed = Fixed::from_int(30);
    /// Wind above this makes deep water risky.
    pub const DEEP_WATER_WIND: Fixed = Fixed::from_int(20);
    /// Wind above this makes any water dangerous.
    pub const DANGEROUS_WIND: Fixed = Fixed::from_int(40);
    /// Wind speed that maps to full sail effect.
    pub const FULL_SAIL_WIND: Fixed = Fixed::from_int(50);
    pub const LOW_SUPPLY: Fixed = Fixed::from_raw(3000); // 0.3
    /// Storm-damage multiplier for galleys and cogs.
    pub const SMALL_SHIP_STORM_FACTOR: Fixed = Fixed::from_raw(15000); // 1.5
    pub const STORM_SPEED: Fixed = Fixed::from_raw(5000); // 0.5
    pub const FOG_SPEED: Fixed = Fixed::from_raw(8000); // 0.8
    pub const THICK_FOG: Fixed = Fixed::from_raw(5000); // 0.5
    pub const COASTER_OFFSHORE_SPEED: Fixed = Fixed::from_raw(7000); // 0.7
    pub const OCEAN_GOER_INSHORE_SPEED: Fixed = Fixed::from_raw(9000); // 0.9
}

/// What a vessel class may sail into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VesselRestrictions {
    /// False for land units, which never enter water.
    pub seaworthy: bool,
    pub can_enter_rivers: bool,
    pub can_enter_coastal: bool,
    pub requires_deep_water: bool,
    pub min_water_depth: Fixed,
    pub draft: Fixed,
}

pub fn restrictions_for(unit_type: UnitType, config: &MovementConfig) -> VesselRestrictions {
    let d = &config.min_depth;
    let vessel = |rivers: bool, coastal: bool, deep: bool, depth: Fixed, draft: i64| {
        VesselRestrictions {
            seaworthy: true,
            can_enter_rivers: rivers,
            can_enter_coastal: coastal,
            requires_deep_water: deep,
            min_water_depth: depth,
            draft: Fixed::from_int(draft),
        }
    };
    match unit_type {
        UnitType::Galleys => vessel(true, true, false, d.galleys, 2),
        UnitType::Cogs => vessel(true, true, false, d.cogs, 3),
        UnitType::Carracks => vessel(false, true, false, d.carracks, 6),
        UnitType::Frigates => vessel(false, true, false, d.frigates, 7),
        UnitType::Galleons => vessel(false, true, false, d.galleons, 8),
        UnitType::ShipsOfTheLine => vessel(false, false, true, d.ships_of_the_line, 12),
        _ => VesselRestrictions {
            seaworthy: false,
            can_enter_rivers: false,
            can_enter_coastal: false,
            requires_deep_water: false,
            min_water_depth: Fixed::ZERO,
            draft: Fixed::ZERO,
        },
    }
}

pub fn ship_draft(unit_type: UnitType, config: &MovementConfig) -> Fixed {
    restrictions_for(unit_type, config).draft
}

/// Built for open water.
pub fn is_ocean_going(unit_type: UnitType) -> bool {
    matches!(
        unit_type,
        UnitType::Carracks | UnitType::Galleons | UnitType::ShipsOfTheLine
    )
}

/// Built for sheltered water.
pub fn is_coastal_vessel(unit_type: UnitType) -> bool {
    matches!(unit_type, UnitType::Galleys | UnitType::Cogs)
}

/// Why a move was refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveBlock {
    #[error("force has no units")]
    EmptyForce,
    #[error("land units cannot enter water")]
    LandUnitsAtSea,
    #[error("ships cannot enter land")]
    ShipsOnLand,
    #[error("water too shallow for {0:?}")]
    TooShallow(UnitType),
    #[error("{0:?} requires deep ocean")]
    RequiresDeepWater(UnitType),
    #[error("{0:?} cannot enter rivers")]
    NoRivers(UnitType),
    #[error("{0:?} cannot enter coastal waters")]
    NoCoastal(UnitType),
}

/// Check one vessel against a water cell.
pub fn can_unit_enter(
    unit_type: UnitType,
    cell: &MapCell,
    config: &MovementConfig,
) -> Result<(), MoveBlock> {
    let r = restrictions_for(unit_type, config);
    if !cell.is_water() {
        return if r.seaworthy {
            Err(MoveBlock::ShipsOnLand)
        } else {
            Ok(())
        };
    }
    if !r.seaworthy {
        return Err(MoveBlock::LandUnitsAtSea);
    }
    if cell.water_depth(config) < r.min_water_depth {
        return Err(MoveBlock::TooShallow(unit_type));
    }
    if r.requires_deep_water && !cell.is_deep_ocean() {
        return Err(MoveBlock::RequiresDeepWater(unit_type));
    }
    if cell.is_river() && !r.can_enter_rivers {
        return Err(MoveBlock::NoRivers(unit_type));
    }
    if cell.is_coastal() && !r.can_enter_coastal {
        return Err(MoveBlock::NoCoastal(unit_type));
    }
    Ok(())
}

/// A force may enter only if every unit can. Mixed land and sea forces
/// can enter nothing.
pub fn can_force_enter(force: &Force, cell: &MapCell, config: &MovementConfig) -> Result<(), MoveBlock> {
    if force.units.is_empty() {
        return Err(MoveBlock::EmptyForce);
    }
    if cell.is_water() && force.has_land_units() {
        return Err(MoveBlock::LandUnitsAtSea);
    }
    for unit in &force.units {
        can_unit_enter(unit.unit_type, cell, config)?;
    }
    Ok(())
}

/// Cost multiplier for one vessel stepping into `to`. Land costs 1.
pub fn movement_cost(to: &MapCell, unit_type: UnitType, config: &MovementConfig) -> Fixed {
    if !to.is_water() {
        return Fixed::ONE;
    }
    let mut cost = Fixed::ONE;
    if to.is_coastal() {
        cost *= config.coastal_cost;
    }
    if to.is_river() {
        cost *= config.river_cost;
    }
    if to.is_deep_ocean() {
        cost *= config.ocean_cost;
    }
    match unit_type {
        UnitType::Galleys if to.is_coastal() => cost *= config.galley_coastal_cost,
        UnitType::ShipsOfTheLine => cost *= config.line_ship_cost,
        _ => {}
    }
    cost
}

/// The slowest unit sets the pace.
pub fn force_movement_cost(force: &Force, to: &MapCell, config: &MovementConfig) -> Fixed {
    force
        .units
        .iter()
        .map(|u| movement_cost(to, u.unit_type, config))
        .max()
        .unwrap_or(Fixed::ONE)
}

/// Per-tick chance that a fleet at sea loses ships to the elements.
pub fn naval_attrition(
    force: &Force,
    cell: &MapCell,
    weather: &Weather,
    config: &MovementConfig,
) -> Fixed {
    let mut risk = config.base_attrition;
    match weather.kind {
        WeatherKind::Stormy => risk += config.storm_attrition,
        WeatherKind::HeavyRain => risk += config.heavy_rain_attrition,
        _ => {}
    }
    if weather.wind_speed > defines::HIGH_WIND {
        risk += config.high_wind_attrition;
    }
    if cell.is_deep_ocean() && weather.wind_speed > defines::DEEP_WATER_WIND {
        risk += config.deep_water_wind_attrition;
    }
    if force.supply_level < defines::LOW_SUPPLY {
        risk += config.low_supply_attrition;
    }
    risk
}

pub fn is_dangerous_waters(weather: &Weather) -> bool {
    matches!(weather.kind, WeatherKind::Stormy | WeatherKind::Blizzard)
        || weather.wind_speed > defines::DANGEROUS_WIND
}

/// Men lost to a storm of the given intensity. Galleys and cogs suffer more.
pub fn storm_damage(force: &Force, intensity: Fixed, config: &MovementConfig) -> u32 {
    force
        .units
        .iter()
        .map(|unit| {
            let mut damage =
                Fixed::from(unit.current_strength) * intensity.max(Fixed::ZERO) * config.storm_damage_rate;
            if is_coastal_vessel(unit.unit_type) {
                damage *= defines::SMALL_SHIP_STORM_FACTOR;
            }
            damage.floor_to_u32()
        })
        .fold(0u32, u32::saturating_add)
}

/// Sailing speed multiplier from wind, weather and hull type.
pub fn movement_speed_modifier(unit_type: UnitType, cell: &MapCell, weather: &Weather) -> Fixed {
    let wind = weather.wind_speed.max(Fixed::ZERO) / defines::FULL_SAIL_WIND;
    let mut modifier = Fixed::from_raw(7000) + wind * Fixed::from_raw(6000);
    if weather.kind == WeatherKind::Stormy {
        modifier *= defines::STORM_SPEED;
    }
    if weather.fog_density > defines::THICK_FOG {
        modifier *= defines::FOG_SPEED;
    }
    if is_coastal_vessel(unit_type) && cell.is_deep_ocean() {
        modifier *= defines::COASTER_OFFSHORE_SPEED;
    }
    if is_ocean_going(unit_type) && cell.is_coastal() {
        modifier *= defines::OCEAN_GOER_INSHORE_SPEED;
    }
    modifier
}

/// Friendly port.
pub fn can_resupply_at(force: &Force, cell: &MapCell) -> bool {
    cell.has_port() && cell.controller == Some(force.owner)
}

/// International water, or water the owner controls. Diplomatic access is
/// decided elsewhere.
pub fn has_passage_rights(owner: ActorId, cell: &MapCell) -> bool {
    match cell.controller {
        None => true,
        Some(controller) => controller == owner,
    }
}

/// Cost and risk of a legal step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCheck {
    pub cost: Fixed,
    pub attrition_risk: Fixed,
}

/// Validate a single step and price it under calm weather.
pub fn check_move(force: &Force, to: &MapCell, config: &MovementConfig) -> Result<MoveCheck, MoveBlock> {
    if let Err(reason) = can_force_enter(force, to, config) {
        log::debug!("Force {} cannot enter cell {}: {}", force.id, to.id, reason);
        return Err(reason);
    }
    let attrition_risk = if to.is_water() {
        naval_attrition(force, to, &Weather::calm(), config)
    } else {
        Fixed::ZERO
    };
    Ok(MoveCheck {
        cost: force_movement_cost(force, to, config),
        attrition_risk,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ForceBuilder;

    fn cfg() -> MovementConfig {
        MovementConfig::default()
    }

    fn cell(kind: CellKind) -> MapCell {
        MapCell::new(1, kind, 0, 0)
    }

    #[test]
    fn test_galleys_go_upriver_carracks_do_not() {
        let river = cell(CellKind::River);
        assert!(can_unit_enter(UnitType::Galleys, &river, &cfg()).is_ok());
        assert!(can_unit_enter(UnitType::Cogs, &river, &cfg()).is_ok());
        // Rivers are 5m deep; a carrack needs 10m.
        assert_eq!(
            can_unit_enter(UnitType::Carracks, &river, &cfg()),
            Err(MoveBlock::TooShallow(UnitType::Carracks))
        );
    }

    #[test]
    fn test_line_ships_need_deep_ocean() {
        let c = cfg();
        assert_eq!(
            can_unit_enter(UnitType::ShipsOfTheLine, &cell(CellKind::Coastal), &c),
            Err(MoveBlock::RequiresDeepWater(UnitType::ShipsOfTheLine))
        );
        assert_eq!(
            can_unit_enter(UnitType::ShipsOfTheLine, &cell(CellKind::OpenSea), &c),
            Err(MoveBlock::TooShallow(UnitType::ShipsOfTheLine))
        );
        assert!(can_unit_enter(UnitType::ShipsOfTheLine, &cell(CellKind::DeepOcean), &c).is_ok());
    }

    #[test]
    fn test_one_unfit_ship_blocks_the_fleet() {
        let fleet = ForceBuilder::new(1)
            .unit(UnitType::Galleys, 200)
            .unit(UnitType::Carracks, 300)
            .build();
        assert!(can_force_enter(&fleet, &cell(CellKind::River), &cfg()).is_err());
        assert!(can_force_enter(&fleet, &cell(CellKind::Coastal), &cfg()).is_ok());
    }

    #[test]
    fn test_land_water_exclusivity() {
        let army = ForceBuilder::new(1).unit(UnitType::Pikemen, 800).build();
        let fleet = ForceBuilder::new(2).unit(UnitType::Cogs, 500).build();
        let mixed = ForceBuilder::new(3)
            .unit(UnitType::Cogs, 500)
            .unit(UnitType::Pikemen, 800)
            .build();
        let land = cell(CellKind::Land);
        let sea = cell(CellKind::Coastal);

        assert!(can_force_enter(&army, &land, &cfg()).is_ok());
        assert_eq!(can_force_enter(&army, &sea, &cfg()), Err(MoveBlock::LandUnitsAtSea));
        assert_eq!(can_force_enter(&fleet, &land, &cfg()), Err(MoveBlock::ShipsOnLand));
        assert!(can_force_enter(&mixed, &land, &cfg()).is_err());
        assert!(can_force_enter(&mixed, &sea, &cfg()).is_err());
    }

    #[test]
    fn test_empty_force_cannot_move() {
        let empty = ForceBuilder::new(1).build();
        assert_eq!(
            can_force_enter(&empty, &cell(CellKind::Coastal), &cfg()),
            Err(MoveBlock::EmptyForce)
        );
    }

    #[test]
    fn test_movement_costs() {
        let c = cfg();
        assert_eq!(
            movement_cost(&cell(CellKind::Coastal), UnitType::Cogs, &c),
            Fixed::from_raw(12000)
        );
        assert_eq!(
            movement_cost(&cell(CellKind::Coastal), UnitType::Galleys, &c),
            Fixed::from_raw(9600)
        );
        assert_eq!(
            movement_cost(&cell(CellKind::River), UnitType::Galleys, &c),
            Fixed::from_raw(15000)
        );
        assert_eq!(
            movement_cost(&cell(CellKind::DeepOcean), UnitType::ShipsOfTheLine, &c),
            Fixed::from_raw(10400)
        );
        assert_eq!(movement_cost(&cell(CellKind::OpenSea), UnitType::Cogs, &c), Fixed::ONE);
    }

    #[test]
    fn test_slowest_ship_sets_fleet_cost() {
        let fleet = ForceBuilder::new(1)
            .unit(UnitType::Galleys, 200)
            .unit(UnitType::Cogs, 500)
            .build();
        assert_eq!(
            force_movement_cost(&fleet, &cell(CellKind::Coastal), &cfg()),
            Fixed::from_raw(12000)
        );
    }

    #[test]
    fn test_attrition_accumulates_hazards() {
        let c = cfg();
        let mut fleet = ForceBuilder::new(1).unit(UnitType::Carracks, 300).build();
        let ocean = cell(CellKind::DeepOcean);
        assert_eq!(naval_attrition(&fleet, &ocean, &Weather::calm(), &c), Fixed::from_raw(100));

        fleet.supply_level = Fixed::TENTH;
        let risk = naval_attrition(&fleet, &ocean, &Weather::storm(35), &c);
        // 0.01 base + 0.1 storm + 0.05 wind + 0.03 deep water + 0.05 supply
        assert_eq!(risk, Fixed::from_raw(2400));
        assert!(is_dangerous_waters(&Weather::storm(10)));
        assert!(!is_dangerous_waters(&Weather::calm()));
    }

    #[test]
    fn test_storm_damage_hits_small_ships_harder() {
        let fleet = ForceBuilder::new(1)
            .unit(UnitType::Galleys, 200)
            .unit(UnitType::Carracks, 200)
            .build();
        // galleys: 200 * 1.0 * 0.05 * 1.5 = 15, carracks: 10
        assert_eq!(storm_damage(&fleet, Fixed::ONE, &cfg()), 25);
    }

    #[test]
    fn test_speed_modifier() {
        let ocean = cell(CellKind::DeepOcean);
        let calm = Weather::calm();
        assert_eq!(
            movement_speed_modifier(UnitType::Carracks, &ocean, &calm),
            Fixed::from_raw(7000)
        );
        assert_eq!(
            movement_speed_modifier(UnitType::Galleys, &ocean, &calm),
            Fixed::from_raw(4900)
        );
        let fresh = Weather {
            wind_speed: Fixed::from_int(50),
            ..Weather::calm()
        };
        assert_eq!(
            movement_speed_modifier(UnitType::Carracks, &ocean, &fresh),
            Fixed::from_raw(13000)
        );
    }

    #[test]
    fn test_ports_and_passage() {
        let fleet = ForceBuilder::new(1).owner(4).unit(UnitType::Cogs, 500).build();
        let mut harbour = cell(CellKind::Coastal);
        harbour.port = Some(Port {
            level: 1,
            naval_base: false,
        });
        harbour.controller = Some(4);
        assert!(can_resupply_at(&fleet, &harbour));
        assert!(has_passage_rights(4, &harbour));
        assert!(!has_passage_rights(5, &harbour));

        harbour.controller = Some(5);
        assert!(!can_resupply_at(&fleet, &harbour));
        assert!(has_passage_rights(5, &cell(CellKind::DeepOcean)));
    }

    #[test]
    fn test_drafts_grow_with_hull_size() {
        let c = cfg();
        assert_eq!(ship_draft(UnitType::Galleys, &c), Fixed::from_int(2));
        assert_eq!(ship_draft(UnitType::ShipsOfTheLine, &c), Fixed::from_int(12));
        assert_eq!(ship_draft(UnitType::Levies, &c), Fixed::ZERO);
        assert!(!restrictions_for(UnitType::Levies, &c).seaworthy);
    }

    #[test]
    fn test_check_move_prices_legal_steps() {
        let fleet = ForceBuilder::new(1).unit(UnitType::Cogs, 500).build();
        let check = check_move(&fleet, &cell(CellKind::Coastal), &cfg()).unwrap();
        assert_eq!(check.cost, Fixed::from_raw(12000));
        assert_eq!(check.attrition_risk, Fixed::from_raw(100));
        assert!(check_move(&fleet, &cell(CellKind::Land), &cfg()).is_err());
    }
}
