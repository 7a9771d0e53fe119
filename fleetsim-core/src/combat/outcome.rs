//! Outcome classification and post-battle effects shared by land and naval
//! combat.
//!
//! Both engines reduce a battle to two [`Contender`]s and hand them here, so
//! the same ratio thresholds decide a skirmish in a mountain pass and a
//! line battle at sea.

use crate::config::CombatConfig;
use crate::fixed::Fixed;
use serde::{Deserialize, Serialize};

pub mod defines {
    use crate::fixed::Fixed;

    pub const DECISIVE_WINNER_MORALE: Fixed = Fixed::from_raw(1500); // +0.15
    pub const DECISIVE_LOSER_MORALE: Fixed = Fixed::from_raw(-3000); // -0.30
    pub const MARGINAL_WINNER_MORALE: Fixed = Fixed::from_raw(1000); // +0.10
    pub const MARGINAL_LOSER_MORALE: Fixed = Fixed::from_raw(-2000); // -0.20
    pub const PYRRHIC_WINNER_MORALE: Fixed = Fixed::from_raw(300); // +0.03
    pub const PYRRHIC_LOSER_MORALE: Fixed = Fixed::from_raw(-1500); // -0.15
    pub const DRAW_MORALE: Fixed = Fixed::from_raw(-800); // -0.08
    /// Morale lost per unit of own casualty fraction.
    pub const CASUALTY_MORALE_WEIGHT: Fixed = Fixed::from_raw(2000); // 0.2
    pub const MIN_MORALE_CHANGE: Fixed = Fixed::from_raw(-4000);
    pub const MAX_MORALE_CHANGE: Fixed = Fixed::from_raw(2000);

    pub const BASE_EXPERIENCE: Fixed = Fixed::from_int(5);
    pub const VICTORY_EXPERIENCE: Fixed = Fixed::from_int(5);

    pub const DECISIVE_WAR_SCORE: Fixed = Fixed::from_int(15);
    pub const MARGINAL_WAR_SCORE: Fixed = Fixed::from_int(10);
    pub const PYRRHIC_WAR_SCORE: Fixed = Fixed::from_int(5);
    /// Casualties per unit of war-score scale.
    pub const WAR_SCORE_CASUALTY_UNIT: i64 = 1000;
    pub const MAX_WAR_SCORE_SCALE: Fixed = Fixed::from_int(3);

    pub const DECISIVE_PRESTIGE: Fixed = Fixed::from_int(5);
    pub const MARGINAL_PRESTIGE: Fixed = Fixed::from_int(3);
    pub const PYRRHIC_PRESTIGE: Fixed = Fixed::from_int(1);
    pub const DRAW_PRESTIGE: Fixed = Fixed::from_int(-1);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Attacker,
    Defender,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Attacker => Side::Defender,
            Side::Defender => Side::Attacker,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleOutcome {
    AttackerDecisive,
    AttackerMarginal,
    Draw,
    DefenderMarginal,
    DefenderDecisive,
}

impl BattleOutcome {
    pub fn winner(self) -> Option<Side> {
        match self {
            BattleOutcome::AttackerDecisive | BattleOutcome::AttackerMarginal => {
                Some(Side::Attacker)
            }
            BattleOutcome::DefenderDecisive | BattleOutcome::DefenderMarginal => {
                Some(Side::Defender)
            }
            BattleOutcome::Draw => None,
        }
    }

    pub fn is_decisive(self) -> bool {
        matches!(
            self,
            BattleOutcome::AttackerDecisive | BattleOutcome::DefenderDecisive
        )
    }

    fn decisive_for(side: Side) -> Self {
        match side {
            Side::Attacker => BattleOutcome::AttackerDecisive,
            Side::Defender => BattleOutcome::DefenderDecisive,
        }
    }

    fn marginal_for(side: Side) -> Self {
        match side {
            Side::Attacker => BattleOutcome::AttackerMarginal,
            Side::Defender => BattleOutcome::DefenderMarginal,
        }
    }
}

/// One side of a battle as the outcome mapping sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Contender {
    /// Men (or crew) on the field before the battle.
    pub initial_strength: u32,
    /// Strength after every modifier.
    pub effective_strength: Fixed,
    pub casualties: u32,
    pub routed: bool,
}

impl Contender {
    /// Share of the initial strength lost. Zero for an empty side.
    pub fn casualty_fraction(&self) -> Fixed {
        Fixed::from_ratio(self.casualties as i64, self.initial_strength as i64)
    }
}

/// Map the two sides to an outcome.
///
/// An empty side loses outright. A routed side loses decisively. Otherwise
/// the effective strengths are compared against the decisive and marginal
/// ratios, and a zero-strength defender counts as an infinite ratio in the
/// attacker's favour.
pub fn classify(attacker: &Contender, defender: &Contender, config: &CombatConfig) -> BattleOutcome {
    match (attacker.initial_strength == 0, defender.initial_strength == 0) {
        (true, true) => return BattleOutcome::Draw,
        (true, false) => return BattleOutcome::DefenderDecisive,
        (false, true) => return BattleOutcome::AttackerDecisive,
        (false, false) => {}
    }
    match (attacker.routed, defender.routed) {
        (true, true) => return BattleOutcome::Draw,
        (false, true) => return BattleOutcome::AttackerDecisive,
        (true, false) => return BattleOutcome::DefenderDecisive,
        (false, false) => {}
    }

    let (a, d) = (attacker.effective_strength, defender.effective_strength);
    if d <= Fixed::ZERO {
        return if a > Fixed::ZERO {
            BattleOutcome::AttackerDecisive
        } else {
            BattleOutcome::Draw
        };
    }
    for (strong, weak, side) in [(a, d, Side::Attacker), (d, a, Side::Defender)] {
        if strong >= weak * config.decisive_ratio {
            return BattleOutcome::decisive_for(side);
        }
        if strong >= weak * config.marginal_ratio {
            return BattleOutcome::marginal_for(side);
        }
    }
    BattleOutcome::Draw
}

/// The winner paid more than the configured share of its own strength.
pub fn is_pyrrhic(
    outcome: BattleOutcome,
    attacker: &Contender,
    defender: &Contender,
    config: &CombatConfig,
) -> bool {
    let winner = match outcome.winner() {
        Some(Side::Attacker) => attacker,
        Some(Side::Defender) => defender,
        None => return false,
    };
    winner.casualty_fraction() > config.pyrrhic_casualty_fraction
}

/// Deltas the caller applies after a battle. War score is from the
/// attacker's point of view; everything else is per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutcomeEffects {
    pub attacker_morale_change: Fixed,
    pub defender_morale_change: Fixed,
    pub attacker_experience_gain: Fixed,
    pub defender_experience_gain: Fixed,
    pub war_score_change: Fixed,
    pub attacker_prestige: Fixed,
    pub defender_prestige: Fixed,
}

pub fn outcome_effects(
    outcome: BattleOutcome,
    pyrrhic: bool,
    attacker: &Contender,
    defender: &Contender,
    config: &CombatConfig,
) -> OutcomeEffects {
    let winner = outcome.winner();
    let morale = |side: Side, own: &Contender| {
        let base = match winner {
            None => defines::DRAW_MORALE,
            Some(w) if pyrrhic => {
                if w == side {
                    defines::PYRRHIC_WINNER_MORALE
                } else {
                    defines::PYRRHIC_LOSER_MORALE
                }
            }
            Some(w) => match (w == side, outcome.is_decisive()) {
                (true, true) => defines::DECISIVE_WINNER_MORALE,
                (true, false) => defines::MARGINAL_WINNER_MORALE,
                (false, true) => defines::DECISIVE_LOSER_MORALE,
                (false, false) => defines::MARGINAL_LOSER_MORALE,
            },
        };
        (base - own.casualty_fraction() * defines::CASUALTY_MORALE_WEIGHT)
            .clamp(defines::MIN_MORALE_CHANGE, defines::MAX_MORALE_CHANGE)
    };

    let experience = |side: Side, inflicted: u32, received: u32| {
        let mut gain = defines::BASE_EXPERIENCE
            + config.experience_per_casualty_dealt.mul_int(inflicted as i64);
        match winner {
            Some(w) if w == side => gain += defines::VICTORY_EXPERIENCE,
            Some(_) if received as u64 > inflicted as u64 * 2 => gain = gain.mul(Fixed::HALF),
            _ => {}
        }
        gain
    };

    let total_casualties = attacker.casualties as i64 + defender.casualties as i64;
    let scale = Fixed::from_ratio(total_casualties, defines::WAR_SCORE_CASUALTY_UNIT)
        .min(defines::MAX_WAR_SCORE_SCALE);
    let base_score = if pyrrhic {
        defines::PYRRHIC_WAR_SCORE
    } else if outcome.is_decisive() {
        defines::DECISIVE_WAR_SCORE
    } else {
        defines::MARGINAL_WAR_SCORE
    };
    let war_score_change = match winner {
        Some(Side::Attacker) => base_score * scale,
        Some(Side::Defender) => -(base_score * scale),
        None => Fixed::ZERO,
    };

    let prestige = |side: Side, defeated: u32| match winner {
        None => defines::DRAW_PRESTIGE,
        Some(w) if w == side => {
            let base = if pyrrhic {
                defines::PYRRHIC_PRESTIGE
            } else if outcome.is_decisive() {
                defines::DECISIVE_PRESTIGE
            } else {
                defines::MARGINAL_PRESTIGE
            };
            base + config.prestige_per_strength_defeated.mul_int(defeated as i64)
        }
        Some(_) => Fixed::ZERO,
    };

    OutcomeEffects {
        attacker_morale_change: morale(Side::Attacker, attacker),
        defender_morale_change: morale(Side::Defender, defender),
        attacker_experience_gain: experience(
            Side::Attacker,
            defender.casualties,
            attacker.casualties,
        ),
        defender_experience_gain: experience(
            Side::Defender,
            attacker.casualties,
            defender.casualties,
        ),
        war_score_change,
        attacker_prestige: prestige(Side::Attacker, defender.casualties),
        defender_prestige: prestige(Side::Defender, attacker.casualties),
    }
}
