//! Battle resolution.
//!
//! The resolvers in [`land`] and [`naval`] are pure: they read forces and
//! return a result. [`CombatSession`] is the stateful wrapper that marks the
//! forces as engaged, tracks elapsed time and applies the result to the
//! forces once the battle is resolved.

pub mod blockade;
pub mod land;
pub mod naval;
pub mod outcome;

pub use blockade::{BlockadeStatus, BlockadeTier};
pub use land::{resolve_battle, Commanders, Fortification, LandBattleContext, LandBattleResult};
pub use naval::{resolve_naval_battle, NavalBattleResult, NavalCombatMode, NavalEnvironment};
pub use outcome::{BattleOutcome, Contender, OutcomeEffects, Side};

use crate::config::{CombatConfig, NavalCombatConfig};
use crate::events::GameEvent;
use crate::fixed::Fixed;
use crate::rng::RandomSource;
use crate::state::{CellId, Force, ForceId, MoraleState, SimHours, Unit};
use serde::{Deserialize, Serialize};

/// Experience points per full point of unit experience.
const EXPERIENCE_SCALE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleKind {
    Land,
    Naval,
}

/// An engagement between two forces that has started but may not be over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatSession {
    pub kind: BattleKind,
    pub attacker: ForceId,
    pub defender: ForceId,
    pub location: CellId,
    pub attacker_initial_strength: u32,
    pub defender_initial_strength: u32,
    pub attacker_initial_morale: Fixed,
    pub defender_initial_morale: Fixed,
    pub started_at: SimHours,
    pub elapsed_hours: Fixed,
    pub active: bool,
    /// Set once the battle has been resolved.
    pub outcome: Option<BattleOutcome>,
}

impl CombatSession {
    /// Open a battle between two forces and mark both as engaged.
    pub fn begin(
        kind: BattleKind,
        attacker: &mut Force,
        defender: &mut Force,
        now: SimHours,
    ) -> Self {
        attacker.in_battle = true;
        defender.in_battle = true;
        log::debug!(
            "{:?} battle opens: force {} ({} men) attacks force {} ({} men) at cell {}",
            kind,
            attacker.id,
            attacker.total_strength,
            defender.id,
            defender.total_strength,
            defender.location
        );
        Self {
            kind,
            attacker: attacker.id,
            defender: defender.id,
            location: defender.location,
            attacker_initial_strength: attacker.total_strength,
            defender_initial_strength: defender.total_strength,
            attacker_initial_morale: attacker.morale,
            defender_initial_morale: defender.morale,
            started_at: now,
            elapsed_hours: Fixed::ZERO,
            active: true,
            outcome: None,
        }
    }

    pub fn advance(&mut self, hours: Fixed) {
        if self.active && hours > Fixed::ZERO {
            self.elapsed_hours += hours;
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Resolve a land battle and apply its losses and morale to both forces.
    pub fn resolve_land(
        &mut self,
        attacker: &mut Force,
        defender: &mut Force,
        context: &LandBattleContext,
        commanders: Commanders<'_>,
        config: &CombatConfig,
    ) -> LandBattleResult {
        let result = land::resolve_battle(attacker, defender, context, commanders, config);
        apply_battle_losses(
            attacker,
            result.attacker.casualties,
            result.effects.attacker_morale_change,
            result.effects.attacker_experience_gain,
        );
        apply_battle_losses(
            defender,
            result.defender.casualties,
            result.effects.defender_morale_change,
            result.effects.defender_experience_gain,
        );
        self.close(attacker, defender, result.outcome);
        result
    }

    /// Resolve a naval battle, apply crew losses, sink hulls and hand
    /// captured ships to the side that took them.
    pub fn resolve_naval(
        &mut self,
        attacker: &mut Force,
        defender: &mut Force,
        env: &NavalEnvironment,
        commanders: Commanders<'_>,
        naval: &NavalCombatConfig,
        combat: &CombatConfig,
        rng: &mut dyn RandomSource,
    ) -> NavalBattleResult {
        let result =
            naval::resolve_naval_battle(attacker, defender, env, commanders, naval, combat, rng);
        apply_battle_losses(
            attacker,
            result.attacker.contender.casualties,
            result.effects.attacker_morale_change,
            result.effects.attacker_experience_gain,
        );
        apply_battle_losses(
            defender,
            result.defender.contender.casualties,
            result.effects.defender_morale_change,
            result.effects.defender_experience_gain,
        );
        let taken_from_attacker = apply_ship_losses(
            attacker,
            result.attacker.ships_sunk,
            result.attacker.ships_captured,
        );
        let taken_from_defender = apply_ship_losses(
            defender,
            result.defender.ships_sunk,
            result.defender.ships_captured,
        );
        for prize in taken_from_defender {
            attacker.add_unit(prize);
        }
        for prize in taken_from_attacker {
            defender.add_unit(prize);
        }
        self.close(attacker, defender, result.outcome);
        result
    }

    fn close(&mut self, attacker: &mut Force, defender: &mut Force, outcome: BattleOutcome) {
        attacker.in_battle = false;
        defender.in_battle = false;
        self.active = false;
        self.outcome = Some(outcome);
        log::info!(
            "Battle at cell {} after {}h: force {} vs force {} -> {:?}",
            self.location,
            self.elapsed_hours,
            self.attacker,
            self.defender,
            outcome
        );
    }
}

/// Apply one side's share of a battle result to a force.
///
/// Casualties are spread across units by strength, force morale is shifted
/// and clamped to [0, 1], every unit's morale moves at most one rung, and
/// experience is credited. Units wiped out in the process are pruned.
pub fn apply_battle_losses(
    force: &mut Force,
    casualties: u32,
    morale_change: Fixed,
    experience_gain: Fixed,
) {
    force.distribute_casualties(casualties);
    force.morale = (force.morale + morale_change).unit();
    let gain = experience_gain.div(Fixed::from_int(EXPERIENCE_SCALE));
    for unit in &mut force.units {
        unit.update_morale(morale_change);
        unit.experience = (unit.experience + gain).unit();
    }
    let pruned = force.prune_destroyed();
    if pruned > 0 {
        log::debug!("Force {} lost {} units outright", force.id, pruned);
    }
}

/// Remove sunk and captured hulls, most battered first. Returns the
/// captured ships so the captor can take them in.
pub fn apply_ship_losses(force: &mut Force, sunk: u32, captured: u32) -> Vec<Unit> {
    let mut order: Vec<usize> = (0..force.units.len()).collect();
    order.sort_by_key(|&i| force.units[i].current_strength);
    let sunk = (sunk as usize).min(order.len());
    let captured = (captured as usize).min(order.len() - sunk);

    let sunk_set: Vec<usize> = order[..sunk].to_vec();
    let captured_set: Vec<usize> = order[sunk..sunk + captured].to_vec();

    let mut prizes = Vec::with_capacity(captured);
    let mut kept = Vec::with_capacity(force.units.len());
    for (i, unit) in std::mem::take(&mut force.units).into_iter().enumerate() {
        if sunk_set.contains(&i) {
            continue;
        }
        if captured_set.contains(&i) {
            let mut prize = unit;
            prize.morale = MoraleState::Broken;
            prize.loyalty = Fixed::ZERO;
            prizes.push(prize);
            continue;
        }
        kept.push(unit);
    }
    force.units = kept;
    force.recalculate_strength();
    if sunk + captured > 0 {
        log::debug!(
            "Force {}: {} ships sunk, {} captured",
            force.id,
            sunk,
            captured
        );
    }
    prizes
}

/// Put a land force in front of `cell`. Fleets and forces already busy
/// fighting or besieging cannot start one.
pub fn begin_siege(force: &mut Force, cell: CellId, now: SimHours) -> Option<GameEvent> {
    if !force.is_active || force.in_battle || force.besieging || !force.has_land_units() {
        log::debug!("Force {} cannot besiege cell {}", force.id, cell);
        return None;
    }
    force.besieging = true;
    log::info!("Force {} lays siege to cell {}", force.id, cell);
    Some(GameEvent::SiegeStarted {
        at: now,
        force: force.id,
        cell,
    })
}

pub fn end_siege(force: &mut Force, cell: CellId, captured: bool, now: SimHours) -> GameEvent {
    force.besieging = false;
    log::info!(
        "Siege of cell {} by force {} ends ({})",
        cell,
        force.id,
        if captured { "taken" } else { "abandoned" }
    );
    GameEvent::SiegeResolved {
        at: now,
        force: force.id,
        cell,
        captured,
    }
}
