//! Naval battle resolution.
//!
//! A battle runs through four stages:
//!
//! 1. **Mode selection** from the ships present and the sea state.
//! 2. **Phases**: broadside, boarding and ramming damage models, plus fire.
//! 3. **Aggregation** into per-side casualties and ship losses.
//! 4. **Outcome** through the shared ratio mapping in [`super::outcome`].
//!
//! Nothing here mutates a fleet; the only side effect is drawing from the
//! injected [`RandomSource`] for fire.

use super::land::{self, Commanders};
use super::outcome::{self, BattleOutcome, Contender, OutcomeEffects, Side};
use crate::config::{CombatConfig, NavalCombatConfig};
use crate::fixed::Fixed;
use crate::rng::RandomSource;
use crate::state::{Commander, CommanderSpecialty, Force, Unit, UnitType};
use serde::{Deserialize, Serialize};

pub mod defines {
    use crate::fixed::Fixed;

    pub const LINE_WIND: Fixed = Fixed::from_raw(3000); // 0.3
    pub const LINE_VISIBILITY: Fixed = Fixed::from_raw(5000); // 0.5
    pub const RAMMING_SHARE: Fixed = Fixed::from_raw(5000); // galleys > 50%

    /// Crew-to-gun factor of a broadside.
    pub const BROADSIDE_PER_MAN: Fixed = Fixed::from_int(2);
    /// Share of broadside power that turns into casualties.
    pub const BROADSIDE_CASUALTY_SHARE: Fixed = Fixed::TENTH;

    pub const FIRE_MIN_CHANCE: Fixed = Fixed::TENTH;
    pub const FIRE_CASUALTY_SHARE: Fixed = Fixed::from_raw(500); // 0.05

    pub const GALLEON_BOARDING: Fixed = Fixed::from_raw(13000); // 1.3
    pub const GALLEY_BOARDING: Fixed = Fixed::from_raw(15000); // 1.5
    pub const BOARDING_SUCCESS_LOSSES: Fixed = Fixed::from_raw(1500); // 0.15
    pub const BOARDING_FAILURE_LOSSES: Fixed = Fixed::TENTH;
    pub const BOARDING_CAPTURE_RATIO: Fixed = Fixed::from_raw(15000); // 1.5

    pub const GALLEY_RAM: Fixed = Fixed::from_raw(15000); // 1.5
    pub const HEAVY_RAM: Fixed = Fixed::HALF;
    pub const CALM_SEA: Fixed = Fixed::from_raw(3000);
    pub const CALM_RAM_BONUS: Fixed = Fixed::from_raw(13000); // 1.3
    pub const RAM_CASUALTY_SHARE: Fixed = Fixed::from_raw(500); // 0.05
    pub const RAM_SINKING_ASYMMETRY: Fixed = Fixed::from_raw(15000); // 1.5
    pub const RAM_SINKING_SHARE: Fixed = Fixed::TENTH;

    /// Share of a battered fleet's hulls that strike their colours.
    pub const CAPTURE_SHARE: Fixed = Fixed::from_raw(3000); // 0.3
    pub const SINKING_SCALE: Fixed = Fixed::from_int(2);

    pub const WIND_ADVANTAGE: Fixed = Fixed::from_raw(4000); // 0.4
    pub const WAVE_PENALTY: Fixed = Fixed::from_raw(3000); // 0.3
    pub const SMALL_HULL_WAVES: Fixed = Fixed::from_raw(15000); // 1.5
    pub const LARGE_HULL_WAVES: Fixed = Fixed::from_raw(7000); // 0.7

    pub const CARRACK_OCEAN_BONUS: Fixed = Fixed::from_raw(3000);
    pub const GALLEY_CALM_COAST_BONUS: Fixed = Fixed::from_raw(4000);
    pub const LINE_MODERATE_SEA_BONUS: Fixed = Fixed::from_raw(2000);
    pub const LINE_MAX_WAVES: Fixed = Fixed::from_raw(6000);

    pub const ADMIRAL_MARTIAL: Fixed = Fixed::from_raw(3000);
    pub const ADMIRAL_TACTICAL: Fixed = Fixed::from_raw(4000);

    pub const MASTER_AND_COMMANDER: &str = "Master and Commander";
    pub const SEA_DOG: &str = "Sea Dog";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NavalCombatMode {
    LineBattle,
    BoardingAction,
    RammingAttack,
    Chase,
    BlockadeEngagement,
}

/// How the fleets came to fight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Engagement {
    #[default]
    Pitched,
    /// One fleet is running.
    Pursuit,
    /// The defender is trying to force a blockade.
    Blockade,
}

/// Sea state at the battle site. Scalars are in [0, 1] except
/// `wind_direction`, which runs from -1 (in the defender's favour) to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavalEnvironment {
    pub wind_strength: Fixed,
    pub wind_direction: Fixed,
    pub visibility: Fixed,
    pub wave_height: Fixed,
    pub coastal: bool,
    pub deep_ocean: bool,
    pub engagement: Engagement,
}

impl Default for NavalEnvironment {
    fn default() -> Self {
        Self {
            wind_strength: Fixed::HALF,
            wind_direction: Fixed::ZERO,
            visibility: Fixed::ONE,
            wave_height: Fixed::from_raw(2000),
            coastal: false,
            deep_ocean: false,
            engagement: Engagement::Pitched,
        }
    }
}

/// Casualties one side took, by damage model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhaseCasualties {
    pub broadside: u32,
    pub boarding: u32,
    pub ramming: u32,
    pub fire: u32,
}

impl PhaseCasualties {
    pub fn total(&self) -> u32 {
        self.broadside
            .saturating_add(self.boarding)
            .saturating_add(self.ramming)
            .saturating_add(self.fire)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NavalSide {
    pub contender: Contender,
    pub phases: PhaseCasualties,
    /// Ships this side lost to the sea.
    pub ships_sunk: u32,
    /// Ships this side lost to the enemy.
    pub ships_captured: u32,
    pub tradition_gained: Fixed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavalBattleResult {
    pub mode: NavalCombatMode,
    pub outcome: BattleOutcome,
    pub pyrrhic: bool,
    pub attacker: NavalSide,
    pub defender: NavalSide,
    pub effects: OutcomeEffects,
    pub intensity: Fixed,
    pub famous_name: Option<String>,
}

impl NavalBattleResult {
    pub fn side(&self, side: Side) -> &NavalSide {
        match side {
            Side::Attacker => &self.attacker,
            Side::Defender => &self.defender,
        }
    }

    /// Ships `side` took as prizes from the other fleet.
    pub fn prizes_taken_by(&self, side: Side) -> u32 {
        self.side(side.opponent()).ships_captured
    }
}

fn vessels(fleet: &Force) -> impl Iterator<Item = &Unit> {
    fleet.units.iter().filter(|u| u.unit_type.is_naval())
}

fn vessel_count(fleet: &Force) -> u32 {
    vessels(fleet).count() as u32
}

fn crew(fleet: &Force) -> u32 {
    vessels(fleet).map(|u| u.current_strength).sum()
}

pub fn select_mode(attacker: &Force, defender: &Force, env: &NavalEnvironment) -> NavalCombatMode {
    match env.engagement {
        Engagement::Pursuit => return NavalCombatMode::Chase,
        Engagement::Blockade => return NavalCombatMode::BlockadeEngagement,
        Engagement::Pitched => {}
    }
    let has_line = |f: &Force| vessels(f).any(|u| u.unit_type == UnitType::ShipsOfTheLine);
    if (has_line(attacker) || has_line(defender))
        && env.wind_strength > defines::LINE_WIND
        && env.visibility > defines::LINE_VISIBILITY
    {
        return NavalCombatMode::LineBattle;
    }
    let galleys = vessels(attacker)
        .filter(|u| u.unit_type == UnitType::Galleys)
        .count() as i64;
    let share = Fixed::from_ratio(galleys, attacker.units.len() as i64);
    if share > defines::RAMMING_SHARE {
        return NavalCombatMode::RammingAttack;
    }
    if env.coastal {
        return NavalCombatMode::BoardingAction;
    }
    NavalCombatMode::LineBattle
}

/// Broadside multiplier per hull, `1 + factor`.
fn broadside_factor(unit_type: UnitType) -> Fixed {
    match unit_type {
        UnitType::ShipsOfTheLine => Fixed::from_raw(18000),
        UnitType::Galleons => Fixed::from_raw(15000),
        UnitType::Frigates => Fixed::from_raw(12000),
        UnitType::Carracks => Fixed::ONE,
        UnitType::Cogs => Fixed::HALF,
        UnitType::Galleys => Fixed::from_raw(3000),
        _ => Fixed::ZERO,
    }
}

/// Weight of fire a fleet throws, after gunnery quality and visibility.
pub fn broadside_power(fleet: &Force, env: &NavalEnvironment) -> Fixed {
    let visibility = Fixed::HALF + env.visibility.unit() * Fixed::HALF;
    vessels(fleet)
        .map(|u| {
            Fixed::from_int(u.current_strength as i64)
                * defines::BROADSIDE_PER_MAN
                * broadside_factor(u.unit_type)
                * (land::defines::BASE_EQUIPMENT + u.equipment_quality * Fixed::from_raw(3000))
        })
        .sum::<Fixed>()
        * visibility
}

pub fn boarding_strength(fleet: &Force) -> Fixed {
    vessels(fleet)
        .map(|u| {
            let hull = match u.unit_type {
                UnitType::Galleons => defines::GALLEON_BOARDING,
                UnitType::Galleys => defines::GALLEY_BOARDING,
                _ => Fixed::ONE,
            };
            Fixed::from_int(u.current_strength as i64)
                * hull
                * (land::defines::BASE_TRAINING + u.training * Fixed::HALF)
        })
        .sum()
}

pub fn ramming_power(fleet: &Force, env: &NavalEnvironment) -> Fixed {
    let calm = if env.wave_height < defines::CALM_SEA {
        defines::CALM_RAM_BONUS
    } else {
        Fixed::ONE
    };
    vessels(fleet)
        .map(|u| {
            let hull = match u.unit_type {
                UnitType::Galleys => defines::GALLEY_RAM,
                UnitType::ShipsOfTheLine | UnitType::Carracks => defines::HEAVY_RAM,
                _ => Fixed::ZERO,
            };
            Fixed::from_int(u.current_strength as i64) * hull * calm
        })
        .sum()
}

/// Hull-specific bonus for the sea state.
pub fn weather_bonus(unit_type: UnitType, env: &NavalEnvironment) -> Fixed {
    let mut bonus = Fixed::ZERO;
    if unit_type == UnitType::Carracks && env.deep_ocean {
        bonus += defines::CARRACK_OCEAN_BONUS;
    }
    if unit_type == UnitType::Galleys && env.coastal && env.wave_height < defines::CALM_SEA {
        bonus += defines::GALLEY_CALM_COAST_BONUS;
    }
    if unit_type == UnitType::ShipsOfTheLine
        && env.wind_strength > defines::LINE_WIND
        && env.wave_height < defines::LINE_MAX_WAVES
    {
        bonus += defines::LINE_MODERATE_SEA_BONUS;
    }
    bonus
}

/// Strength lost to rough seas. Small hulls suffer most.
pub fn wave_penalty(unit_type: UnitType, env: &NavalEnvironment) -> Fixed {
    let base = env.wave_height.unit() * defines::WAVE_PENALTY;
    match unit_type {
        UnitType::Galleys | UnitType::Cogs => base * defines::SMALL_HULL_WAVES,
        _ => base * defines::LARGE_HULL_WAVES,
    }
}

/// Tailwind bonus for `side`. Zero-sum between the fleets.
pub fn wind_advantage(env: &NavalEnvironment, side: Side) -> Fixed {
    let bonus = env.wind_direction.clamp(-Fixed::ONE, Fixed::ONE)
        * env.wind_strength.unit()
        * defines::WIND_ADVANTAGE;
    match side {
        Side::Attacker => bonus,
        Side::Defender => -bonus,
    }
}

pub fn admiral_bonus(
    admiral: &Commander,
    naval: &NavalCombatConfig,
    combat: &CombatConfig,
) -> Fixed {
    let mut bonus = admiral.martial * defines::ADMIRAL_MARTIAL
        + admiral.tactical * defines::ADMIRAL_TACTICAL;
    if admiral.specialty == CommanderSpecialty::Naval {
        bonus = bonus * naval.naval_specialty_multiplier;
    }
    if admiral.has_trait(defines::MASTER_AND_COMMANDER) {
        bonus += naval.master_and_commander_bonus;
    }
    if admiral.has_trait(defines::SEA_DOG) {
        bonus += naval.sea_dog_bonus;
    }
    bonus * combat.commander_skill_impact
}

/// Crew strength after sea state, leadership, morale, organization and wind.
pub fn naval_strength(
    fleet: &Force,
    admiral: Option<&Commander>,
    side: Side,
    env: &NavalEnvironment,
    naval: &NavalCombatConfig,
    combat: &CombatConfig,
) -> Fixed {
    let hulls: Fixed = vessels(fleet)
        .map(|u| {
            let sea = Fixed::ONE + weather_bonus(u.unit_type, env) - wave_penalty(u.unit_type, env);
            Fixed::from_int(u.current_strength as i64) * sea.max(Fixed::ZERO)
        })
        .sum();
    let leadership = admiral.map_or(Fixed::ZERO, |a| admiral_bonus(a, naval, combat));
    let strength = hulls
        * (Fixed::ONE + leadership)
        * land::morale_multiplier(fleet.morale, combat)
        * fleet.organization.unit()
        * (Fixed::ONE + wind_advantage(env, side));
    strength.max(Fixed::ZERO)
}

fn share_of(men: u32, share: Fixed) -> u32 {
    (Fixed::from_int(men as i64) * share).floor_to_u32()
}

fn fire_losses(crew: u32, enemy_broadside: Fixed, naval: &NavalCombatConfig, rng: &mut dyn RandomSource) -> u32 {
    let chance = (naval.fire_chance * enemy_broadside)
        .div(Fixed::from_int(crew.max(1) as i64))
        .min(Fixed::ONE);
    if chance > defines::FIRE_MIN_CHANCE && rng.chance(chance) {
        share_of(crew, chance * defines::FIRE_CASUALTY_SHARE * naval.fire_damage)
    } else {
        0
    }
}

struct Phases {
    attacker: PhaseCasualties,
    defender: PhaseCasualties,
    /// Defender hulls taken in a successful boarding.
    boarded_prizes: u32,
    attacker_rammed_under: u32,
    defender_rammed_under: u32,
}

fn broadside_phase(
    attacker: &Force,
    defender: &Force,
    env: &NavalEnvironment,
    damping: Fixed,
    naval: &NavalCombatConfig,
    rng: &mut dyn RandomSource,
    phases: &mut Phases,
) {
    let att_bs = broadside_power(attacker, env);
    let def_bs = broadside_power(defender, env);
    let scale = naval.broadside_damage * defines::BROADSIDE_CASUALTY_SHARE * damping;
    phases.attacker.broadside = (def_bs * scale).floor_to_u32();
    phases.defender.broadside = (att_bs * scale).floor_to_u32();
    phases.attacker.fire = fire_losses(crew(attacker), def_bs, naval, rng);
    phases.defender.fire = fire_losses(crew(defender), att_bs, naval, rng);
}

fn boarding_phase(attacker: &Force, defender: &Force, naval: &NavalCombatConfig, phases: &mut Phases) {
    let ratio = boarding_strength(attacker).div(boarding_strength(defender).max(Fixed::ONE));
    if ratio > naval.boarding_threshold {
        phases.defender.boarding = share_of(
            crew(defender),
            defines::BOARDING_SUCCESS_LOSSES * naval.boarding_damage,
        );
        if ratio > defines::BOARDING_CAPTURE_RATIO {
            phases.boarded_prizes = share_of(vessel_count(defender), defines::CAPTURE_SHARE);
        }
    } else {
        phases.attacker.boarding = share_of(
            crew(attacker),
            defines::BOARDING_FAILURE_LOSSES * naval.boarding_damage,
        );
    }
}

fn ramming_phase(
    attacker: &Force,
    defender: &Force,
    env: &NavalEnvironment,
    naval: &NavalCombatConfig,
    phases: &mut Phases,
) {
    let att_ram = ramming_power(attacker, env);
    let def_ram = ramming_power(defender, env);
    let scale = naval.ram_damage * defines::RAM_CASUALTY_SHARE;
    phases.attacker.ramming = (def_ram * scale).floor_to_u32();
    phases.defender.ramming = (att_ram * scale).floor_to_u32();
    if att_ram > def_ram * defines::RAM_SINKING_ASYMMETRY {
        phases.defender_rammed_under = share_of(vessel_count(defender), defines::RAM_SINKING_SHARE);
    } else if def_ram > att_ram * defines::RAM_SINKING_ASYMMETRY {
        phases.attacker_rammed_under = share_of(vessel_count(attacker), defines::RAM_SINKING_SHARE);
    }
}

/// Hulls sunk and struck for a side losing `casualties` of `crew` men.
///
/// Above the sinking threshold ships go down; between the capture and
/// sinking thresholds some surrender instead. Both are capped so that
/// `sunk + captured <= hulls`.
pub fn ship_losses(hulls: u32, crew: u32, casualties: u32, naval: &NavalCombatConfig) -> (u32, u32) {
    let fraction = Fixed::from_ratio(casualties as i64, crew.max(1) as i64);
    let hulls_fx = Fixed::from_int(hulls as i64);
    let mut sunk = 0;
    let mut captured = 0;
    if fraction > naval.sinking_threshold {
        sunk = (hulls_fx * (fraction - naval.sinking_threshold) * defines::SINKING_SCALE).floor_to_u32();
    } else if fraction > naval.capture_threshold {
        captured = (hulls_fx * defines::CAPTURE_SHARE * fraction).floor_to_u32();
    }
    let sunk = sunk.min(hulls);
    (sunk, captured.min(hulls - sunk))
}

fn tradition(
    won: bool,
    decisive: bool,
    enemy_sunk: u32,
    prizes: u32,
    naval: &NavalCombatConfig,
) -> Fixed {
    let mut gained = naval.tradition_per_sunk.mul_int(enemy_sunk as i64)
        + naval.tradition_per_captured.mul_int(prizes as i64);
    if won {
        gained += naval.tradition_per_victory;
        if decisive {
            gained = gained * naval.decisive_tradition_multiplier;
        }
    }
    gained
}

#[tracing::instrument(skip_all, name = "naval_battle")]
pub fn resolve_naval_battle(
    attacker: &Force,
    defender: &Force,
    env: &NavalEnvironment,
    admirals: Commanders<'_>,
    naval: &NavalCombatConfig,
    combat: &CombatConfig,
    rng: &mut dyn RandomSource,
) -> NavalBattleResult {
    let mode = select_mode(attacker, defender, env);
    let mut phases = Phases {
        attacker: PhaseCasualties::default(),
        defender: PhaseCasualties::default(),
        boarded_prizes: 0,
        attacker_rammed_under: 0,
        defender_rammed_under: 0,
    };
    match mode {
        NavalCombatMode::LineBattle => {
            broadside_phase(attacker, defender, env, Fixed::ONE, naval, rng, &mut phases)
        }
        NavalCombatMode::BoardingAction => boarding_phase(attacker, defender, naval, &mut phases),
        NavalCombatMode::RammingAttack => ramming_phase(attacker, defender, env, naval, &mut phases),
        NavalCombatMode::Chase | NavalCombatMode::BlockadeEngagement => {
            broadside_phase(
                attacker,
                defender,
                env,
                naval.mixed_mode_damping,
                naval,
                rng,
                &mut phases,
            );
            boarding_phase(attacker, defender, naval, &mut phases);
        }
    }

    let (att_crew, def_crew) = (crew(attacker), crew(defender));
    let (att_hulls, def_hulls) = (vessel_count(attacker), vessel_count(defender));
    let att_cas = phases.attacker.total().min(att_crew);
    let def_cas = phases.defender.total().min(def_crew);

    let (mut att_sunk, mut att_captured) = ship_losses(att_hulls, att_crew, att_cas, naval);
    let (mut def_sunk, mut def_captured) = ship_losses(def_hulls, def_crew, def_cas, naval);
    att_sunk = (att_sunk + phases.attacker_rammed_under).min(att_hulls);
    def_sunk = (def_sunk + phases.defender_rammed_under).min(def_hulls);
    def_captured += phases.boarded_prizes;
    att_captured = att_captured.min(att_hulls - att_sunk);
    def_captured = def_captured.min(def_hulls - def_sunk);

    let mut att = Contender {
        initial_strength: att_crew,
        effective_strength: naval_strength(attacker, admirals.attacker, Side::Attacker, env, naval, combat),
        casualties: att_cas,
        routed: false,
    };
    let mut def = Contender {
        initial_strength: def_crew,
        effective_strength: naval_strength(defender, admirals.defender, Side::Defender, env, naval, combat),
        casualties: def_cas,
        routed: false,
    };
    att.routed = att_crew > 0 && land::check_routing(attacker.morale, att.casualty_fraction(), combat);
    def.routed = def_crew > 0 && land::check_routing(defender.morale, def.casualty_fraction(), combat);

    let result = outcome::classify(&att, &def, combat);
    let pyrrhic = outcome::is_pyrrhic(result, &att, &def, combat);
    let mut effects = outcome::outcome_effects(result, pyrrhic, &att, &def, combat);
    match result {
        BattleOutcome::AttackerDecisive => effects.attacker_prestige += naval.prestige_per_decisive_victory,
        BattleOutcome::DefenderDecisive => effects.defender_prestige += naval.prestige_per_decisive_victory,
        _ => {}
    }

    let winner = result.winner();
    let decisive = result.is_decisive();
    let att_tradition = tradition(winner == Some(Side::Attacker), decisive, def_sunk, def_captured, naval);
    let def_tradition = tradition(winner == Some(Side::Defender), decisive, att_sunk, att_captured, naval);

    let famous_name = (decisive && att_sunk + def_sunk >= naval.famous_battle_min_sunk).then(|| {
        if env.coastal {
            "Battle of the Coastal Straits".to_string()
        } else {
            "Battle of the Open Seas".to_string()
        }
    });

    let intensity = land::battle_duration(
        att.effective_strength.div(def.effective_strength.max(Fixed::ONE)),
        combat,
    )
    .mul_int(att.effective_strength.to_int() + def.effective_strength.to_int())
        / Fixed::from_int(land::defines::INTENSITY_SCALE);

    log::debug!(
        "Naval battle {} vs {} ({:?}): {:?}, casualties {} / {}, sunk {} / {}",
        attacker.id,
        defender.id,
        mode,
        result,
        att_cas,
        def_cas,
        att_sunk,
        def_sunk
    );
    if let Some(name) = &famous_name {
        log::info!("{} fought between fleets {} and {}", name, attacker.id, defender.id);
    }

    NavalBattleResult {
        mode,
        outcome: result,
        pyrrhic,
        attacker: NavalSide {
            contender: att,
            phases: phases.attacker,
            ships_sunk: att_sunk,
            ships_captured: att_captured,
            tradition_gained: att_tradition,
        },
        defender: NavalSide {
            contender: def,
            phases: phases.defender,
            ships_sunk: def_sunk,
            ships_captured: def_captured,
            tradition_gained: def_tradition,
        },
        effects,
        intensity,
        famous_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{FixedRoll, SimRng};
    use crate::testing::ForceBuilder;

    fn cfgs() -> (NavalCombatConfig, CombatConfig) {
        (NavalCombatConfig::default(), CombatConfig::default())
    }

    fn calm() -> NavalEnvironment {
        NavalEnvironment {
            wind_strength: Fixed::from_raw(2000),
            wind_direction: Fixed::ZERO,
            visibility: Fixed::ONE,
            wave_height: Fixed::TENTH,
            coastal: false,
            deep_ocean: false,
            engagement: Engagement::Pitched,
        }
    }

    fn frigates_vs_line() -> (Force, Force) {
        let frigates = ForceBuilder::new(1)
            .unit(UnitType::Frigates, 300)
            .unit(UnitType::Frigates, 300)
            .unit(UnitType::Frigates, 300)
            .build();
        let line = ForceBuilder::new(2)
            .owner(2)
            .unit(UnitType::ShipsOfTheLine, 1000)
            .build();
        (frigates, line)
    }

    #[test]
    fn test_frigates_against_a_line_ship_is_contested() {
        let (frigates, line) = frigates_vs_line();
        let (naval, combat) = cfgs();
        let mut rng = SimRng::seeded(7);
        let r = resolve_naval_battle(
            &frigates,
            &line,
            &calm(),
            Commanders::default(),
            &naval,
            &combat,
            &mut rng,
        );
        assert_eq!(r.mode, NavalCombatMode::LineBattle);
        assert_eq!(r.outcome, BattleOutcome::Draw);
        assert!(r.attacker.contender.casualties > 0);
        assert!(r.defender.contender.casualties > 0);
        assert_eq!(r.attacker.ships_sunk + r.defender.ships_sunk, 0);
        // 1836 broadside * 1.5 * 0.1
        assert_eq!(r.defender.phases.broadside, 275);
        // 3060 broadside * 1.5 * 0.1
        assert_eq!(r.attacker.phases.broadside, 459);
        assert!(r.famous_name.is_none());
    }

    #[test]
    fn test_broadside_power_by_hull() {
        let (frigates, line) = frigates_vs_line();
        assert_eq!(broadside_power(&frigates, &calm()), Fixed::from_int(1836));
        assert_eq!(broadside_power(&line, &calm()), Fixed::from_int(3060));
        let mut fog = calm();
        fog.visibility = Fixed::ZERO;
        assert_eq!(broadside_power(&line, &fog), Fixed::from_int(1530));
    }

    #[test]
    fn test_mode_selection() {
        let (frigates, line) = frigates_vs_line();
        let mut env = calm();
        env.wind_strength = Fixed::from_raw(6000);
        assert_eq!(select_mode(&frigates, &line, &env), NavalCombatMode::LineBattle);

        let galleys = ForceBuilder::new(3)
            .unit(UnitType::Galleys, 200)
            .unit(UnitType::Galleys, 200)
            .unit(UnitType::Cogs, 400)
            .build();
        assert_eq!(select_mode(&galleys, &frigates, &calm()), NavalCombatMode::RammingAttack);

        env = calm();
        env.coastal = true;
        assert_eq!(select_mode(&frigates, &line, &env), NavalCombatMode::BoardingAction);

        env.engagement = Engagement::Pursuit;
        assert_eq!(select_mode(&frigates, &line, &env), NavalCombatMode::Chase);
        env.engagement = Engagement::Blockade;
        assert_eq!(select_mode(&frigates, &line, &env), NavalCombatMode::BlockadeEngagement);
    }

    #[test]
    fn test_ship_loss_thresholds() {
        let naval = NavalCombatConfig::default();
        assert_eq!(ship_losses(10, 1000, 200, &naval), (0, 0));
        // 50% losses: 10 * 0.3 * 0.5 surrender
        assert_eq!(ship_losses(10, 1000, 500, &naval), (0, 1));
        // 90% losses: 10 * 0.1 * 2
        assert_eq!(ship_losses(10, 1000, 900, &naval), (2, 0));
        assert_eq!(ship_losses(3, 1000, 1000, &naval), (1, 0));
        assert_eq!(ship_losses(0, 0, 0, &naval), (0, 0));
    }

    #[test]
    fn test_admiral_traits_stack() {
        let (naval, combat) = cfgs();
        let mut admiral = Commander::new(9, "Adm. Tromp");
        // (0.5 * 0.3 + 0.5 * 0.4) * 0.25
        assert_eq!(admiral_bonus(&admiral, &naval, &combat), Fixed::from_raw(875));
        admiral.specialty = CommanderSpecialty::Naval;
        admiral.traits.push("Sea Dog".into());
        // (0.35 * 1.5 + 0.2) * 0.25
        assert_eq!(admiral_bonus(&admiral, &naval, &combat), Fixed::from_raw(1812));
    }

    #[test]
    fn test_wind_is_zero_sum() {
        let mut env = calm();
        env.wind_strength = Fixed::ONE;
        env.wind_direction = Fixed::HALF;
        assert_eq!(wind_advantage(&env, Side::Attacker), Fixed::from_raw(2000));
        assert_eq!(wind_advantage(&env, Side::Defender), Fixed::from_raw(-2000));
    }

    #[test]
    fn test_galleys_ram_and_sink() {
        let (naval, combat) = cfgs();
        let mut fb = ForceBuilder::new(1);
        for _ in 0..10 {
            fb = fb.unit(UnitType::Galleys, 200);
        }
        let galleys = fb.build();
        let mut fb = ForceBuilder::new(2);
        for _ in 0..10 {
            fb = fb.unit(UnitType::Galleons, 400);
        }
        let galleons = fb.build();
        let r = resolve_naval_battle(
            &galleys,
            &galleons,
            &calm(),
            Commanders::default(),
            &naval,
            &combat,
            &mut FixedRoll(Fixed::ZERO),
        );
        assert_eq!(r.mode, NavalCombatMode::RammingAttack);
        // galleons cannot ram back, so one in ten goes under
        assert_eq!(r.defender.ships_sunk, 1);
        assert_eq!(r.attacker.phases.ramming, 0);
        // 2000 men * 1.5 * 1.3 * 2.0 * 0.05
        assert_eq!(r.defender.phases.ramming, 390);
    }

    #[test]
    fn test_successful_boarding_takes_prizes() {
        let (naval, combat) = cfgs();
        let mut fb = ForceBuilder::new(1);
        for _ in 0..4 {
            fb = fb.unit(UnitType::Galleons, 400);
        }
        let boarders = fb.build();
        let mut fb = ForceBuilder::new(2);
        for _ in 0..10 {
            fb = fb.unit(UnitType::Cogs, 50);
        }
        let cogs = fb.build();
        let mut env = calm();
        env.coastal = true;
        let r = resolve_naval_battle(
            &boarders,
            &cogs,
            &env,
            Commanders::default(),
            &naval,
            &combat,
            &mut FixedRoll(Fixed::ZERO),
        );
        assert_eq!(r.mode, NavalCombatMode::BoardingAction);
        assert_eq!(r.defender.phases.boarding, 75);
        assert_eq!(r.defender.ships_captured, 3);
        assert_eq!(r.prizes_taken_by(Side::Attacker), 3);
        assert_eq!(r.outcome, BattleOutcome::AttackerDecisive);
        assert!(r.attacker.tradition_gained > r.defender.tradition_gained);
    }

    #[test]
    fn test_fire_needs_a_hot_broadside() {
        let naval = NavalCombatConfig::default();
        assert_eq!(fire_losses(1000, Fixed::from_int(1000), &naval, &mut FixedRoll(Fixed::ZERO)), 0);
        // chance 0.05 * 4000 / 1000 = 0.2; losses 1000 * 0.2 * 0.05 * 0.8
        assert_eq!(fire_losses(1000, Fixed::from_int(4000), &naval, &mut FixedRoll(Fixed::ZERO)), 8);
        assert_eq!(fire_losses(1000, Fixed::from_int(4000), &naval, &mut FixedRoll(Fixed::HALF)), 0);
    }

    #[test]
    fn test_fleet_without_ships_loses() {
        let (naval, combat) = cfgs();
        let (frigates, _) = frigates_vs_line();
        let empty = ForceBuilder::new(5).build();
        let r = resolve_naval_battle(
            &empty,
            &frigates,
            &calm(),
            Commanders::default(),
            &naval,
            &combat,
            &mut SimRng::seeded(1),
        );
        assert_eq!(r.outcome, BattleOutcome::DefenderDecisive);
        assert_eq!(r.attacker.contender.casualties, 0);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn ship() -> impl Strategy<Value = UnitType> {
            prop_oneof![
                Just(UnitType::Galleys),
                Just(UnitType::Cogs),
                Just(UnitType::Carracks),
                Just(UnitType::Galleons),
                Just(UnitType::Frigates),
                Just(UnitType::ShipsOfTheLine),
            ]
        }

        fn fleet(id: u32) -> impl Strategy<Value = Force> {
            prop::collection::vec((ship(), 0u32..1500), 0..12).prop_map(move |ships| {
                let mut fb = ForceBuilder::new(id);
                for (t, crew) in ships {
                    fb = fb.unit(t, crew);
                }
                fb.build()
            })
        }

        fn env() -> impl Strategy<Value = NavalEnvironment> {
            (
                0i64..=10_000,
                -10_000i64..=10_000,
                0i64..=10_000,
                0i64..=10_000,
                any::<bool>(),
                0u8..3,
            )
                .prop_map(|(wind, dir, vis, wave, coastal, kind)| NavalEnvironment {
                    wind_strength: Fixed::from_raw(wind),
                    wind_direction: Fixed::from_raw(dir),
                    visibility: Fixed::from_raw(vis),
                    wave_height: Fixed::from_raw(wave),
                    coastal,
                    deep_ocean: !coastal,
                    engagement: match kind {
                        0 => Engagement::Pitched,
                        1 => Engagement::Pursuit,
                        _ => Engagement::Blockade,
                    },
                })
        }

        proptest! {
            #[test]
            fn combat_conserves_men_and_hulls(a in fleet(1), d in fleet(2), env in env(), seed in any::<u64>()) {
                let (naval, combat) = cfgs();
                let r = resolve_naval_battle(&a, &d, &env, Commanders::default(), &naval, &combat, &mut SimRng::seeded(seed));
                prop_assert!(r.attacker.contender.casualties <= a.total_strength);
                prop_assert!(r.defender.contender.casualties <= d.total_strength);
                prop_assert!(r.attacker.ships_sunk + r.attacker.ships_captured <= a.units.len() as u32);
                prop_assert!(r.defender.ships_sunk + r.defender.ships_captured <= d.units.len() as u32);
            }

            #[test]
            fn same_seed_same_battle(a in fleet(1), d in fleet(2), env in env(), seed in any::<u64>()) {
                let (naval, combat) = cfgs();
                let first = resolve_naval_battle(&a, &d, &env, Commanders::default(), &naval, &combat, &mut SimRng::seeded(seed));
                let second = resolve_naval_battle(&a, &d, &env, Commanders::default(), &naval, &combat, &mut SimRng::seeded(seed));
                prop_assert_eq!(first, second);
            }
        }
    }
}
