//! Tunables for every engine in the crate.
//!
//! Every struct is `#[serde(default)]`, so a config document only needs the
//! keys it overrides. `Fixed` values are written as raw scaled integers
//! (`15000` means 1.5).

use crate::error::ConfigError;
use crate::fixed::Fixed;
use serde::{Deserialize, Serialize};

const fn fx(raw: i64) -> Fixed {
    Fixed::from_raw(raw)
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub combat: CombatConfig,
    pub naval: NavalCombatConfig,
    pub blockade: BlockadeConfig,
    pub movement: MovementConfig,
    pub orders: OrderConfig,
    pub bridge: BridgeConfig,
    pub cache: CacheConfig,
}

impl SimConfig {
    /// Parse a JSON document and validate it. Missing keys take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Cross-field sanity checks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = &self.naval;
        if n.boarding_threshold >= n.sinking_threshold {
            return Err(ConfigError::Invalid(
                "naval boarding threshold must be below the sinking threshold".into(),
            ));
        }
        if n.capture_threshold >= n.sinking_threshold {
            return Err(ConfigError::Invalid(
                "naval capture threshold must be below the sinking threshold".into(),
            ));
        }

        let b = &self.blockade;
        let tiers = [b.partial_ratio, b.moderate_ratio, b.strong_ratio, b.total_ratio];
        if tiers.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::Invalid(
                "blockade strength tiers must strictly ascend".into(),
            ));
        }

        let d = &self.movement.min_depth;
        let depths = [
            d.galleys, d.cogs, d.carracks, d.frigates, d.galleons, d.ships_of_the_line,
        ];
        if depths.windows(2).any(|w| w[0] > w[1]) {
            return Err(ConfigError::Invalid(
                "vessel minimum depths must not decrease with ship size".into(),
            ));
        }

        if self.bridge.update_interval_days <= Fixed::ZERO
            || self.bridge.maintenance_interval_days <= Fixed::ZERO
        {
            return Err(ConfigError::Invalid("bridge intervals must be positive".into()));
        }
        if self.cache.capacity == 0 {
            return Err(ConfigError::Invalid("cache capacity must be positive".into()));
        }
        if self.bridge.history_size == 0 || self.orders.history_limit == 0 {
            return Err(ConfigError::Invalid("history bounds must be positive".into()));
        }
        Ok(())
    }
}

/// Generic battle resolution, shared by land and naval combat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub base_casualty_rate: Fixed,
    pub morale_casualty_multiplier: Fixed,
    pub strength_ratio_impact: Fixed,
    pub experience_multiplier: Fixed,
    pub equipment_multiplier: Fixed,
    pub commander_skill_impact: Fixed,
    pub command_limit_penalty_threshold: Fixed,
    pub routing_threshold: Fixed,
    pub wavering_threshold: Fixed,
    pub confident_threshold: Fixed,
    pub terrain_modifier_max: Fixed,
    pub fortification_defense_multiplier: Fixed,
    pub base_battle_duration: Fixed,
    pub max_battle_duration: Fixed,
    pub experience_per_casualty_dealt: Fixed,
    pub prestige_per_strength_defeated: Fixed,
    /// Effective strength ratio at or above which the stronger side wins decisively.
    pub decisive_ratio: Fixed,
    /// Ratio at or above which the stronger side wins marginally.
    pub marginal_ratio: Fixed,
    /// A winner losing more than this fraction of its strength won a pyrrhic victory.
    pub pyrrhic_casualty_fraction: Fixed,
    pub max_casualty_rate: Fixed,
    pub min_casualty_rate: Fixed,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            base_casualty_rate: fx(1500),
            morale_casualty_multiplier: fx(5000),
            strength_ratio_impact: fx(15000),
            experience_multiplier: fx(2000),
            equipment_multiplier: fx(3000),
            commander_skill_impact: fx(2500),
            command_limit_penalty_threshold: fx(12000),
            routing_threshold: fx(3000),
            wavering_threshold: fx(5000),
            confident_threshold: fx(8000),
            terrain_modifier_max: fx(3000),
            fortification_defense_multiplier: fx(15000),
            base_battle_duration: fx(10000),
            max_battle_duration: fx(50000),
            experience_per_casualty_dealt: fx(100),
            prestige_per_strength_defeated: fx(10),
            decisive_ratio: fx(20000),
            marginal_ratio: fx(12500),
            pyrrhic_casualty_fraction: fx(3000),
            max_casualty_rate: fx(8000),
            min_casualty_rate: fx(500),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavalCombatConfig {
    pub broadside_damage: Fixed,
    pub ram_damage: Fixed,
    pub boarding_damage: Fixed,
    pub fire_damage: Fixed,
    /// Crew ratio above which a boarding attempt succeeds.
    pub boarding_threshold: Fixed,
    /// Casualty fraction above which ships start being captured.
    pub capture_threshold: Fixed,
    /// Fire chance per unit of broadside intensity.
    pub fire_chance: Fixed,
    /// Casualty fraction above which ships start sinking.
    pub sinking_threshold: Fixed,
    /// Secondary phase weight in mixed engagements.
    pub mixed_mode_damping: Fixed,
    pub naval_specialty_multiplier: Fixed,
    pub master_and_commander_bonus: Fixed,
    pub sea_dog_bonus: Fixed,
    pub tradition_per_sunk: Fixed,
    pub tradition_per_captured: Fixed,
    pub tradition_per_victory: Fixed,
    pub decisive_tradition_multiplier: Fixed,
    pub prestige_per_decisive_victory: Fixed,
    pub famous_battle_min_sunk: u32,
}

impl Default for NavalCombatConfig {
    fn default() -> Self {
        Self {
            broadside_damage: fx(15000),
            ram_damage: fx(20000),
            boarding_damage: fx(10000),
            fire_damage: fx(8000),
            boarding_threshold: fx(6000),
            capture_threshold: fx(3000),
            fire_chance: fx(500),
            sinking_threshold: fx(8000),
            mixed_mode_damping: fx(7000),
            naval_specialty_multiplier: fx(15000),
            master_and_commander_bonus: fx(3000),
            sea_dog_bonus: fx(2000),
            tradition_per_sunk: fx(20000),
            tradition_per_captured: fx(30000),
            tradition_per_victory: fx(50000),
            decisive_tradition_multiplier: fx(15000),
            prestige_per_decisive_victory: fx(100_000),
            famous_battle_min_sunk: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockadeConfig {
    pub partial_ratio: Fixed,
    pub moderate_ratio: Fixed,
    pub strong_ratio: Fixed,
    pub total_ratio: Fixed,
    pub partial_disruption: Fixed,
    pub moderate_disruption: Fixed,
    pub strong_disruption: Fixed,
    pub total_disruption: Fixed,
    pub base_attrition: Fixed,
    pub attrition_per_day: Fixed,
    pub min_ships: usize,
    /// Ship-strength needed to blockade an ordinary port.
    pub base_required_strength: u32,
    /// Extra requirement for a naval base.
    pub naval_base_required_strength: u32,
}

impl Default for BlockadeConfig {
    fn default() -> Self {
        Self {
            partial_ratio: fx(5000),
            moderate_ratio: fx(10000),
            strong_ratio: fx(15000),
            total_ratio: fx(20000),
            partial_disruption: fx(3500),
            moderate_disruption: fx(6000),
            strong_disruption: fx(8000),
            total_disruption: fx(9500),
            base_attrition: fx(1000),
            attrition_per_day: fx(100),
            min_ships: 3,
            base_required_strength: 1000,
            naval_base_required_strength: 2000,
        }
    }
}

/// Minimum water depth per vessel category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VesselDepths {
    pub galleys: Fixed,
    pub cogs: Fixed,
    pub carracks: Fixed,
    pub frigates: Fixed,
    pub galleons: Fixed,
    pub ships_of_the_line: Fixed,
}

impl Default for VesselDepths {
    fn default() -> Self {
        Self {
            galleys: Fixed::from_int(3),
            cogs: Fixed::from_int(4),
            carracks: Fixed::from_int(10),
            frigates: Fixed::from_int(12),
            galleons: Fixed::from_int(15),
            ships_of_the_line: Fixed::from_int(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub min_depth: VesselDepths,
    pub river_depth: Fixed,
    pub coastal_depth: Fixed,
    pub deep_ocean_depth: Fixed,
    pub default_water_depth: Fixed,
    pub coastal_cost: Fixed,
    pub river_cost: Fixed,
    pub ocean_cost: Fixed,
    pub galley_coastal_cost: Fixed,
    pub line_ship_cost: Fixed,
    pub base_attrition: Fixed,
    pub storm_attrition: Fixed,
    pub heavy_rain_attrition: Fixed,
    pub high_wind_attrition: Fixed,
    pub deep_water_wind_attrition: Fixed,
    pub low_supply_attrition: Fixed,
    pub storm_damage_rate: Fixed,
    pub max_pathfinding_iterations: usize,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            min_depth: VesselDepths::default(),
            river_depth: Fixed::from_int(5),
            coastal_depth: Fixed::from_int(50),
            deep_ocean_depth: Fixed::from_int(1000),
            default_water_depth: Fixed::from_int(20),
            coastal_cost: fx(12000),
            river_cost: fx(15000),
            ocean_cost: fx(8000),
            galley_coastal_cost: fx(8000),
            line_ship_cost: fx(13000),
            base_attrition: fx(100),
            storm_attrition: fx(1000),
            heavy_rain_attrition: fx(500),
            high_wind_attrition: fx(500),
            deep_water_wind_attrition: fx(300),
            low_supply_attrition: fx(500),
            storm_damage_rate: fx(500),
            max_pathfinding_iterations: 1000,
        }
    }
}

/// Speed (km/h) and floor delay (hours) for one communication method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub speed_kmh: Fixed,
    pub min_delay_hours: Fixed,
}

const fn channel(speed_kmh: i64, min_delay_raw: i64) -> ChannelSpec {
    ChannelSpec {
        speed_kmh: Fixed::from_int(speed_kmh),
        min_delay_hours: Fixed::from_raw(min_delay_raw),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunicationTable {
    pub messenger: ChannelSpec,
    pub courier: ChannelSpec,
    pub signal_fire: ChannelSpec,
    pub semaphore: ChannelSpec,
    pub telegraph: ChannelSpec,
    pub radio: ChannelSpec,
    pub instant: ChannelSpec,
}

impl Default for CommunicationTable {
    fn default() -> Self {
        Self {
            messenger: channel(15, 5000),
            courier: channel(25, 2500),
            signal_fire: channel(1000, 500),
            semaphore: channel(500, 500),
            telegraph: channel(10_000, 100),
            radio: channel(100_000, 10),
            instant: channel(1_000_000, 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainDelays {
    pub plains: Fixed,
    pub forest: Fixed,
    pub hills: Fixed,
    pub mountains: Fixed,
    pub marsh: Fixed,
    pub desert: Fixed,
    pub water: Fixed,
    pub snow: Fixed,
}

impl Default for TerrainDelays {
    fn default() -> Self {
        Self {
            plains: fx(10000),
            forest: fx(13000),
            hills: fx(12000),
            mountains: fx(18000),
            marsh: fx(15000),
            desert: fx(11000),
            water: fx(20000),
            snow: fx(14000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherDelays {
    pub clear: Fixed,
    pub rain: Fixed,
    pub storm: Fixed,
    pub snow: Fixed,
    pub fog: Fixed,
}

impl Default for WeatherDelays {
    fn default() -> Self {
        Self {
            clear: fx(10000),
            rain: fx(12000),
            storm: fx(15000),
            snow: fx(16000),
            fog: fx(13000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderConfig {
    pub channels: CommunicationTable,
    pub terrain: TerrainDelays,
    pub weather: WeatherDelays,
    /// Global multiplier on every computed delay.
    pub delay_multiplier: Fixed,
    pub terrain_samples: u32,
    pub history_limit: usize,
    pub road_speed_bonus: Fixed,
    pub infrastructure_speed_bonus: Fixed,
    /// Signal-network coverage above which messengers upgrade to signal fires.
    pub signal_network_threshold: Fixed,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            channels: CommunicationTable::default(),
            terrain: TerrainDelays::default(),
            weather: WeatherDelays::default(),
            delay_multiplier: Fixed::ONE,
            terrain_samples: 11,
            history_limit: 100,
            road_speed_bonus: fx(3000),
            infrastructure_speed_bonus: fx(2000),
            signal_network_threshold: fx(8000),
        }
    }
}

/// Per-1000-men cost by unit class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRates {
    pub levies: Fixed,
    pub infantry: Fixed,
    pub cavalry: Fixed,
    pub siege: Fixed,
    pub naval: Fixed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub update_interval_days: Fixed,
    pub maintenance_interval_days: Fixed,
    pub maintenance_per_1000: ClassRates,
    pub recruitment_per_1000: ClassRates,
    pub supply_cost_per_soldier: Fixed,
    pub war_trade_disruption: Fixed,
    pub war_exhaustion_per_month: Fixed,
    pub max_war_exhaustion: Fixed,
    pub war_exhaustion_peace_recovery: Fixed,
    pub war_productivity_penalty: Fixed,
    pub war_impact_event_interval_months: u32,
    pub loot_ratio: Fixed,
    pub siege_loot_multiplier: Fixed,
    pub raid_loot_multiplier: Fixed,
    pub territory_loot_multiplier: Fixed,
    pub military_budget_share: Fixed,
    pub budget_crisis_threshold: Fixed,
    pub unpaid_morale_penalty_per_month: Fixed,
    pub base_desertion_rate: Fixed,
    pub desertion_per_unpaid_month: Fixed,
    pub supply_crisis_threshold: Fixed,
    pub equipment_wealth_factor: Fixed,
    pub max_equipment_modifier: Fixed,
    pub recruitment_income_factor: Fixed,
    pub reserve_months: Fixed,
    /// Treasury above which units are fully supplied.
    pub full_supply_treasury: Fixed,
    /// Treasury above which mercenaries can be hired.
    pub mercenary_treasury: Fixed,
    pub history_size: usize,
    pub max_debt: Fixed,
    pub crisis_severity_step: Fixed,
    pub crisis_severity_decay: Fixed,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            update_interval_days: Fixed::ONE,
            maintenance_interval_days: Fixed::from_int(30),
            maintenance_per_1000: ClassRates {
                levies: Fixed::from_int(5),
                infantry: Fixed::from_int(10),
                cavalry: Fixed::from_int(25),
                siege: Fixed::from_int(40),
                naval: Fixed::from_int(50),
            },
            recruitment_per_1000: ClassRates {
                levies: Fixed::from_int(20),
                infantry: Fixed::from_int(50),
                cavalry: Fixed::from_int(150),
                siege: Fixed::from_int(300),
                naval: Fixed::from_int(400),
            },
            supply_cost_per_soldier: fx(5000),
            war_trade_disruption: fx(2000),
            war_exhaustion_per_month: fx(500),
            max_war_exhaustion: Fixed::ONE,
            war_exhaustion_peace_recovery: fx(1000),
            war_productivity_penalty: fx(3000),
            war_impact_event_interval_months: 3,
            loot_ratio: fx(3000),
            siege_loot_multiplier: fx(15000),
            raid_loot_multiplier: fx(5000),
            territory_loot_multiplier: fx(20000),
            military_budget_share: fx(4000),
            budget_crisis_threshold: fx(12000),
            unpaid_morale_penalty_per_month: fx(1000),
            base_desertion_rate: fx(500),
            desertion_per_unpaid_month: fx(1000),
            supply_crisis_threshold: fx(3000),
            equipment_wealth_factor: fx(1),
            max_equipment_modifier: fx(20000),
            recruitment_income_factor: fx(100),
            reserve_months: Fixed::from_int(3),
            full_supply_treasury: Fixed::from_int(500),
            mercenary_treasury: Fixed::from_int(1000),
            history_size: 12,
            max_debt: Fixed::from_int(100_000),
            crisis_severity_step: fx(1000),
            crisis_severity_decay: fx(500),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache.capacity, 100);
        assert_eq!(config.bridge.history_size, 12);
        assert_eq!(config.movement.max_pathfinding_iterations, 1000);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = SimConfig::from_json_str("{}").unwrap();
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let config = SimConfig::from_json_str(
            r#"{"combat": {"base_casualty_rate": 2000}, "bridge": {"max_debt": 500000000}}"#,
        )
        .unwrap();
        assert_eq!(config.combat.base_casualty_rate, Fixed::from_raw(2000));
        assert_eq!(config.combat.routing_threshold, Fixed::from_raw(3000));
        assert_eq!(config.bridge.max_debt, Fixed::from_int(50_000));
        assert_eq!(config.bridge.history_size, 12);
    }

    #[test]
    fn test_nested_partial_override() {
        let config =
            SimConfig::from_json_str(r#"{"movement": {"min_depth": {"galleys": 20000}}}"#).unwrap();
        assert_eq!(config.movement.min_depth.galleys, Fixed::from_int(2));
        assert_eq!(config.movement.min_depth.ships_of_the_line, Fixed::from_int(30));
    }

    #[test]
    fn test_rejects_unordered_thresholds() {
        let err = SimConfig::from_json_str(r#"{"naval": {"boarding_threshold": 90000}}"#);
        assert!(matches!(err, Err(ConfigError::Invalid(_))));

        let err = SimConfig::from_json_str(r#"{"blockade": {"moderate_ratio": 4000}}"#);
        assert!(matches!(err, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_non_monotonic_depths() {
        let err = SimConfig::from_json_str(r#"{"movement": {"min_depth": {"cogs": 500000}}}"#);
        assert!(matches!(err, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_parse_error_surfaces() {
        let err = SimConfig::from_json_str("{not json");
        assert!(matches!(err, Err(ConfigError::Parse(_))));
    }
}
