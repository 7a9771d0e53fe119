//! Single-shot land battle resolution.
//!
//! Pure: reads two forces and returns casualties and deltas. Applying them
//! is the caller's job (see [`super::apply_battle_losses`]).

use super::outcome::{self, BattleOutcome, Contender, OutcomeEffects};
use crate::config::CombatConfig;
use crate::fixed::Fixed;
use crate::movement::LandTerrain;
use crate::state::{Commander, Force, Unit, UnitClass};
use serde::{Deserialize, Serialize};

pub mod defines {
    use crate::fixed::Fixed;

    /// Attack plus defense of an average unit.
    pub const STAT_NORMALIZER: Fixed = Fixed::from_int(20);
    pub const BASE_EQUIPMENT: Fixed = Fixed::from_raw(7000); // 0.7
    pub const BASE_TRAINING: Fixed = Fixed::from_raw(5000); // 0.5

    pub const ROUTING_MULTIPLIER: Fixed = Fixed::from_raw(3000); // 0.3
    pub const WAVERING_MULTIPLIER: Fixed = Fixed::from_raw(6000); // 0.6
    pub const CONFIDENT_MULTIPLIER: Fixed = Fixed::from_raw(13000); // 1.3

    pub const SUPPLY_FLOOR: Fixed = Fixed::from_raw(5000); // 0.5
    pub const FATIGUE_PENALTY: Fixed = Fixed::from_raw(3000); // 0.3

    pub const COMMAND_OVERSIZE_PENALTY: Fixed = Fixed::from_raw(2000); // 0.2
    pub const MAX_COMMAND_PENALTY: Fixed = Fixed::from_raw(5000); // 0.5
    pub const CHARISMA_BONUS: Fixed = Fixed::from_raw(1000); // 0.1

    /// Extra casualty rate per unit of headcount disadvantage, after the
    /// configured impact.
    pub const OUTNUMBERED_WEIGHT: Fixed = Fixed::from_raw(1500); // 0.15
    pub const OUTPOWERED_WEIGHT: Fixed = Fixed::from_raw(1000); // 0.1
    pub const MORALE_CASUALTY_WEIGHT: Fixed = Fixed::from_raw(1000); // 0.1

    pub const HEAVY_LOSSES: Fixed = Fixed::from_raw(5000); // 0.5
    pub const CATASTROPHIC_LOSSES: Fixed = Fixed::from_raw(7000); // 0.7

    pub const POOR_WEATHER: Fixed = Fixed::from_raw(3000);
    pub const FINE_WEATHER: Fixed = Fixed::from_raw(7000);
    pub const POOR_WEATHER_MODIFIER: Fixed = Fixed::from_raw(-2000);
    pub const FINE_WEATHER_MODIFIER: Fixed = Fixed::from_raw(1000);

    pub const WALLS_WEIGHT: Fixed = Fixed::from_raw(2000);
    pub const TOWERS_WEIGHT: Fixed = Fixed::from_raw(1500);
    pub const CITADEL_WEIGHT: Fixed = Fixed::from_raw(3000);
    pub const MOAT_WEIGHT: Fixed = Fixed::from_raw(1000);

    /// Divisor turning duration times combined power into intensity.
    pub const INTENSITY_SCALE: i64 = 2000;
}

/// Defensive works at the battle site. Only the defender benefits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fortification {
    pub walls_level: u32,
    pub towers_level: u32,
    pub citadel_level: u32,
    pub moat_level: u32,
    /// [0, 1]
    pub structural_integrity: Fixed,
    pub siege_resistance: Fixed,
}

impl Fortification {
    /// Fractional defense bonus these works grant.
    pub fn defense_bonus(&self, config: &CombatConfig) -> Fixed {
        let levels = defines::WALLS_WEIGHT.mul_int(self.walls_level as i64)
            + defines::TOWERS_WEIGHT.mul_int(self.towers_level as i64)
            + defines::CITADEL_WEIGHT.mul_int(self.citadel_level as i64)
            + defines::MOAT_WEIGHT.mul_int(self.moat_level as i64);
        levels
            * self.structural_integrity.unit()
            * self.siege_resistance.max(Fixed::ZERO)
            * config.fortification_defense_multiplier
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandBattleContext {
    pub terrain: LandTerrain,
    /// 0 is terrible, 0.5 ordinary, 1 ideal.
    pub weather_quality: Fixed,
    pub fortification: Option<Fortification>,
}

impl Default for LandBattleContext {
    fn default() -> Self {
        Self {
            terrain: LandTerrain::Plains,
            weather_quality: Fixed::HALF,
            fortification: None,
        }
    }
}

/// Commanders present on each side. A missing commander simply grants no bonus.
#[derive(Debug, Clone, Copy, Default)]
pub struct Commanders<'a> {
    pub attacker: Option<&'a Commander>,
    pub defender: Option<&'a Commander>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandBattleResult {
    pub outcome: BattleOutcome,
    pub pyrrhic: bool,
    pub attacker: Contender,
    pub defender: Contender,
    pub effects: OutcomeEffects,
    /// In battle-duration units (1 = a short engagement).
    pub duration: Fixed,
    pub intensity: Fixed,
    /// Attacker casualties per defender casualty.
    pub casualty_ratio: Fixed,
}

/// Fighting value of one unit before force-level modifiers.
pub fn unit_strength(unit: &Unit, config: &CombatConfig) -> Fixed {
    Fixed::from_int(unit.current_strength as i64)
        * (unit.attack_strength + unit.defense_strength).div(defines::STAT_NORMALIZER)
        * (Fixed::ONE + unit.experience * config.experience_multiplier)
        * (defines::BASE_EQUIPMENT + unit.equipment_quality * config.equipment_multiplier)
        * (defines::BASE_TRAINING + unit.training * Fixed::HALF)
        * unit.cohesion
}

/// Step curve from force morale to a strength multiplier.
pub fn morale_multiplier(morale: Fixed, config: &CombatConfig) -> Fixed {
    if morale < config.routing_threshold {
        defines::ROUTING_MULTIPLIER
    } else if morale < config.wavering_threshold {
        defines::WAVERING_MULTIPLIER
    } else if morale < config.confident_threshold {
        Fixed::ONE
    } else {
        defines::CONFIDENT_MULTIPLIER
    }
}

/// Fractional bonus a commander grants a force of `army_size` men.
pub fn commander_bonus(commander: &Commander, army_size: u32, config: &CombatConfig) -> Fixed {
    let mut skill = (commander.martial + commander.tactical) * Fixed::HALF * config.commander_skill_impact;
    let size_ratio = Fixed::from_ratio(army_size as i64, commander.command_limit as i64);
    if commander.command_limit > 0 && size_ratio > config.command_limit_penalty_threshold {
        let penalty = (size_ratio - config.command_limit_penalty_threshold)
            * defines::COMMAND_OVERSIZE_PENALTY;
        skill = skill * (Fixed::ONE - penalty.min(defines::MAX_COMMAND_PENALTY));
    }
    skill + commander.charisma * defines::CHARISMA_BONUS
}

/// Unit class with the most men. Ties go to the class listed first.
fn dominant_class(force: &Force) -> Option<UnitClass> {
    let classes = [
        UnitClass::Infantry,
        UnitClass::Cavalry,
        UnitClass::Siege,
        UnitClass::Naval,
    ];
    let mut best: Option<(UnitClass, u64)> = None;
    for class in classes {
        let men: u64 = force
            .units
            .iter()
            .filter(|u| u.unit_type.class() == class)
            .map(|u| u.current_strength as u64)
            .sum();
        if men > 0 && best.map_or(true, |(_, m)| men > m) {
            best = Some((class, men));
        }
    }
    best.map(|(class, _)| class)
}

/// Terrain bonus or penalty for a force, by its dominant unit class.
pub fn terrain_modifier(terrain: LandTerrain, force: &Force, config: &CombatConfig) -> Fixed {
    let max = config.terrain_modifier_max;
    let weight = match (terrain, dominant_class(force)) {
        (LandTerrain::Plains, Some(UnitClass::Cavalry)) => Fixed::from_raw(5000),
        (LandTerrain::Forest, Some(UnitClass::Infantry)) => Fixed::from_raw(3000),
        (LandTerrain::Forest, Some(UnitClass::Cavalry)) => Fixed::from_raw(-5000),
        (LandTerrain::Hills | LandTerrain::Mountains, Some(UnitClass::Infantry)) => {
            Fixed::from_raw(4000)
        }
        (LandTerrain::Hills | LandTerrain::Mountains, Some(UnitClass::Cavalry)) => {
            Fixed::from_raw(-6000)
        }
        _ => Fixed::ZERO,
    };
    max * weight
}

pub fn weather_modifier(weather_quality: Fixed) -> Fixed {
    if weather_quality < defines::POOR_WEATHER {
        defines::POOR_WEATHER_MODIFIER
    } else if weather_quality > defines::FINE_WEATHER {
        defines::FINE_WEATHER_MODIFIER
    } else {
        Fixed::ZERO
    }
}

/// Force strength after morale, supply, fatigue, organization, leadership,
/// ground and works.
pub fn force_strength(
    force: &Force,
    commander: Option<&Commander>,
    field_modifier: Fixed,
    fortification_bonus: Fixed,
    config: &CombatConfig,
) -> Fixed {
    let base: Fixed = force.units.iter().map(|u| unit_strength(u, config)).sum();
    let leadership = commander.map_or(Fixed::ZERO, |c| {
        commander_bonus(c, force.total_strength, config)
    });
    let strength = base
        * morale_multiplier(force.morale, config)
        * (defines::SUPPLY_FLOOR + force.supply_level.unit() * Fixed::HALF)
        * (Fixed::ONE - force.fatigue.unit() * defines::FATIGUE_PENALTY)
        * force.organization.unit()
        * (Fixed::ONE + leadership)
        * (Fixed::ONE + field_modifier)
        * (Fixed::ONE + fortification_bonus);
    strength.max(Fixed::ZERO)
}

/// Routed by low morale, by heavy losses on wavering morale, or by
/// catastrophic losses whatever the morale.
pub fn check_routing(morale: Fixed, casualty_fraction: Fixed, config: &CombatConfig) -> bool {
    morale < config.routing_threshold
        || (casualty_fraction > defines::HEAVY_LOSSES && morale < config.wavering_threshold)
        || casualty_fraction > defines::CATASTROPHIC_LOSSES
}

/// Per-duration casualty rate for one side.
///
/// The base rate scales with `exposure`, the enemy's power over our own.
/// `headcount_ratio` and `power_ratio` are own over enemy; a side only pays
/// the extra penalties when it is below parity.
fn casualty_rate(
    exposure: Fixed,
    headcount_ratio: Fixed,
    power_ratio: Fixed,
    morale: Fixed,
    config: &CombatConfig,
) -> Fixed {
    let mut rate = config.base_casualty_rate * exposure;
    if headcount_ratio < Fixed::ONE {
        rate += (Fixed::ONE - headcount_ratio)
            * config.strength_ratio_impact
            * defines::OUTNUMBERED_WEIGHT;
    }
    if power_ratio < Fixed::ONE {
        rate += (Fixed::ONE - power_ratio) * defines::OUTPOWERED_WEIGHT;
    }
    rate + (Fixed::ONE - morale.unit())
        * config.morale_casualty_multiplier
        * defines::MORALE_CASUALTY_WEIGHT
}

/// Men lost by a side of `strength` at `rate` over `duration`, clamped to
/// the configured band.
pub(crate) fn casualties(strength: u32, rate: Fixed, duration: Fixed, config: &CombatConfig) -> u32 {
    let men = Fixed::from_int(strength as i64);
    let applied = (rate * duration).min(config.max_casualty_rate);
    let lost = (men * applied).floor_to_u32();
    let floor = (men * config.min_casualty_rate).floor_to_u32();
    lost.max(floor).min(strength)
}

/// Own-over-enemy ratio. An absent enemy is treated as one man.
fn ratio(own: Fixed, enemy: Fixed) -> Fixed {
    own.div(enemy.max(Fixed::ONE))
}

/// Battle length from how evenly matched the sides are.
pub fn battle_duration(strength_ratio: Fixed, config: &CombatConfig) -> Fixed {
    let spread = (Fixed::ONE - strength_ratio)
        .abs()
        .min(config.max_battle_duration - Fixed::ONE);
    config.base_battle_duration * (Fixed::ONE + spread)
}

#[tracing::instrument(skip_all, name = "land_battle")]
pub fn resolve_battle(
    attacker: &Force,
    defender: &Force,
    context: &LandBattleContext,
    commanders: Commanders<'_>,
    config: &CombatConfig,
) -> LandBattleResult {
    let weather = weather_modifier(context.weather_quality);
    let fort = context
        .fortification
        .map_or(Fixed::ZERO, |f| f.defense_bonus(config));

    let att_power = force_strength(
        attacker,
        commanders.attacker,
        terrain_modifier(context.terrain, attacker, config) + weather,
        Fixed::ZERO,
        config,
    );
    let def_power = force_strength(
        defender,
        commanders.defender,
        terrain_modifier(context.terrain, defender, config) + weather,
        fort,
        config,
    );

    let power_ratio = ratio(att_power, def_power);
    let duration = battle_duration(power_ratio, config);

    let (att_men, def_men) = (
        Fixed::from_int(attacker.total_strength as i64),
        Fixed::from_int(defender.total_strength as i64),
    );
    let def_ratio = ratio(def_power, att_power);
    let att_rate = casualty_rate(
        def_ratio,
        ratio(att_men, def_men),
        power_ratio,
        attacker.morale,
        config,
    );
    let def_rate = casualty_rate(
        power_ratio,
        ratio(def_men, att_men),
        def_ratio,
        defender.morale,
        config,
    );

    let mut att = Contender {
        initial_strength: attacker.total_strength,
        effective_strength: att_power,
        casualties: casualties(attacker.total_strength, att_rate, duration, config),
        routed: false,
    };
    let mut def = Contender {
        initial_strength: defender.total_strength,
        effective_strength: def_power,
        casualties: casualties(defender.total_strength, def_rate, duration, config),
        routed: false,
    };
    att.routed = att.initial_strength > 0
        && check_routing(attacker.morale, att.casualty_fraction(), config);
    def.routed = def.initial_strength > 0
        && check_routing(defender.morale, def.casualty_fraction(), config);

    let result = outcome::classify(&att, &def, config);
    let pyrrhic = outcome::is_pyrrhic(result, &att, &def, config);
    let effects = outcome::outcome_effects(result, pyrrhic, &att, &def, config);

    let intensity = duration.mul_int(att_power.to_int() + def_power.to_int())
        / Fixed::from_int(defines::INTENSITY_SCALE);
    let casualty_ratio = Fixed::from_ratio(att.casualties as i64, def.casualties.max(1) as i64);

    log::debug!(
        "Land battle {} vs {}: {:?} (casualties {} / {}, power {} / {})",
        attacker.id,
        defender.id,
        result,
        att.casualties,
        def.casualties,
        att_power,
        def_power
    );

    LandBattleResult {
        outcome: result,
        pyrrhic,
        attacker: att,
        defender: def,
        effects,
        duration,
        intensity,
        casualty_ratio,
    }
}
