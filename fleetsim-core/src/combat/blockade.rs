//! Port blockades: how tight they are, what they cost the port, and how a
//! trapped fleet breaks out.

use crate::config::BlockadeConfig;
use crate::fixed::Fixed;
use crate::movement::MapCell;
use crate::rng::RandomSource;
use crate::state::{CellId, Force, ForceId};
use serde::{Deserialize, Serialize};

/// Days after which a blockade starts to bite harder.
const TIGHTENING_AFTER_DAYS: u32 = 30;
const DAILY_TIGHTENING: Fixed = Fixed::from_raw(10500); // x1.05
const MIN_BLOCKADE_SUPPLY: Fixed = Fixed::from_raw(3000);
const CLEAR_BREAKOUT_RATIO: Fixed = Fixed::from_raw(15000);
const EVEN_BREAKOUT_CHANCE: Fixed = Fixed::HALF;

/// Ordered from no blockade to a sealed port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum BlockadeTier {
    #[default]
    None,
    Partial,
    Moderate,
    Strong,
    Total,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockadeStatus {
    pub active: bool,
    pub tier: BlockadeTier,
    pub fleet: ForceId,
    pub port: CellId,
    /// Share of the port's trade that cannot get through, [0, 1].
    pub trade_disruption: Fixed,
    /// Daily attrition inflicted on the blockaded port's garrison and shipping.
    pub attrition_rate: Fixed,
    pub days_active: u32,
    pub ships_intercepted: u32,
}

/// Fleet strength a port demands before a blockade holds at all.
pub fn required_strength(port: &MapCell, config: &BlockadeConfig) -> u32 {
    let level = port.port.map_or(1, |p| p.level.max(1));
    let mut required = config.base_required_strength.saturating_mul(level);
    if port.is_naval_base() {
        required = required.saturating_add(config.naval_base_required_strength);
    }
    required.max(1)
}

pub fn blockade_effectiveness(fleet: &Force, port: &MapCell, config: &BlockadeConfig) -> BlockadeTier {
    let ratio = Fixed::from_ratio(
        fleet.total_strength as i64,
        required_strength(port, config) as i64,
    );
    if ratio >= config.total_ratio {
        BlockadeTier::Total
    } else if ratio >= config.strong_ratio {
        BlockadeTier::Strong
    } else if ratio >= config.moderate_ratio {
        BlockadeTier::Moderate
    } else if ratio >= config.partial_ratio {
        BlockadeTier::Partial
    } else {
        BlockadeTier::None
    }
}

pub fn trade_disruption(tier: BlockadeTier, config: &BlockadeConfig) -> Fixed {
    match tier {
        BlockadeTier::None => Fixed::ZERO,
        BlockadeTier::Partial => config.partial_disruption,
        BlockadeTier::Moderate => config.moderate_disruption,
        BlockadeTier::Strong => config.strong_disruption,
        BlockadeTier::Total => config.total_disruption,
    }
}

/// Attrition grows linearly with the days the port has been shut.
pub fn blockade_attrition(tier: BlockadeTier, days: u32, config: &BlockadeConfig) -> Fixed {
    let base = trade_disruption(tier, config) * config.base_attrition;
    base * (Fixed::ONE + config.attrition_per_day.mul_int(days as i64))
}

/// Naval only, enough hulls, not tied up in a battle and still supplied.
pub fn can_maintain_blockade(fleet: &Force, config: &BlockadeConfig) -> bool {
    fleet.is_active
        && fleet.is_naval()
        && fleet.units.len() >= config.min_ships
        && !fleet.in_battle
        && fleet.supply_level >= MIN_BLOCKADE_SUPPLY
}

/// Start a blockade of `port`. The returned status is inactive when the
/// fleet cannot hold one.
pub fn establish_blockade(fleet: &Force, port: &MapCell, config: &BlockadeConfig) -> BlockadeStatus {
    let mut status = BlockadeStatus {
        fleet: fleet.id,
        port: port.id,
        ..BlockadeStatus::default()
    };
    if !can_maintain_blockade(fleet, config) || !port.has_port() {
        log::debug!("Fleet {} cannot blockade cell {}", fleet.id, port.id);
        return status;
    }
    status.active = true;
    status.tier = blockade_effectiveness(fleet, port, config);
    status.trade_disruption = trade_disruption(status.tier, config);
    status.attrition_rate = blockade_attrition(status.tier, 0, config);
    log::info!(
        "Fleet {} blockades cell {} ({:?})",
        fleet.id,
        port.id,
        status.tier
    );
    status
}

/// Advance an active blockade by `days`. Lifts it if the fleet can no
/// longer hold station.
pub fn update_blockade(status: &mut BlockadeStatus, fleet: &Force, days: u32, config: &BlockadeConfig) {
    if !status.active {
        return;
    }
    if !can_maintain_blockade(fleet, config) {
        lift_blockade(status);
        log::info!("Fleet {} lifts blockade of cell {}", fleet.id, status.port);
        return;
    }
    for _ in 0..days {
        status.days_active += 1;
        if status.days_active > TIGHTENING_AFTER_DAYS {
            status.trade_disruption = (status.trade_disruption * DAILY_TIGHTENING).min(Fixed::ONE);
        }
    }
    status.attrition_rate = blockade_attrition(status.tier, status.days_active, config);
}

pub fn lift_blockade(status: &mut BlockadeStatus) {
    status.active = false;
    status.tier = BlockadeTier::None;
    status.trade_disruption = Fixed::ZERO;
    status.attrition_rate = Fixed::ZERO;
}

/// Whether the trapped fleet gets out. Clearly stronger fleets always do;
/// a modest edge is a coin flip; anything less fails.
pub fn attempt_blockade_break(
    blockaded: &Force,
    blockader: &Force,
    rng: &mut dyn RandomSource,
) -> bool {
    let ratio = Fixed::from_ratio(
        blockaded.total_strength as i64,
        blockader.total_strength.max(1) as i64,
    );
    if ratio > CLEAR_BREAKOUT_RATIO {
        true
    } else if ratio > Fixed::ONE {
        rng.chance(EVEN_BREAKOUT_CHANCE)
    } else {
        false
    }
}
