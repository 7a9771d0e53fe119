//! Fleet composition analysis and its per-force cache.
//!
//! [`analyze`] is a pure function of the unit list. [`CompositionCache`]
//! memoizes it per force, keyed by a content hash over `(type, strength)`
//! pairs, with least-recently-used eviction.

use crate::config::CacheConfig;
use crate::fixed::Fixed;
use crate::forces::lock;
use crate::state::{Force, ForceId, Unit, UnitType};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

pub mod defines {
    /// Broadside weight per ship.
    pub const FIREPOWER_LINE: u32 = 2000;
    pub const FIREPOWER_FRIGATE: u32 = 1500;
    pub const FIREPOWER_GALLEON: u32 = 1000;
    pub const FIREPOWER_LIGHT: u32 = 500;
    pub const FIREPOWER_GALLEY: u32 = 300;

    /// Soldiers each hull can carry.
    pub const TRANSPORT_COG: u32 = 1000;
    pub const TRANSPORT_CARRACK: u32 = 600;
    pub const TRANSPORT_GALLEON: u32 = 400;
    pub const TRANSPORT_GALLEY: u32 = 100;

    /// Shore-bombardment weight per ship.
    pub const BOMBARD_LINE: u32 = 30;
    pub const BOMBARD_FRIGATE: u32 = 15;
    pub const BOMBARD_GALLEON: u32 = 10;
    pub const BOMBARD_CARRACK: u32 = 5;
}

/// Derived per-category counts and capacities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FleetComposition {
    pub ships_of_the_line: u32,
    pub frigates: u32,
    pub galleons: u32,
    /// Carracks and cogs.
    pub light_ships: u32,
    pub galleys: u32,
    pub total_ships: u32,
    /// Non-naval units embarked or attached.
    pub land_units: u32,
    pub total_firepower: u32,
    pub transport_capacity: u32,
    pub bombardment_power: u32,
    pub total_strength: u32,
}

/// Count a force's units by category.
pub fn analyze(units: &[Unit]) -> FleetComposition {
    use defines::*;
    let mut c = FleetComposition::default();
    for unit in units {
        c.total_strength = c.total_strength.saturating_add(unit.current_strength);
        if !unit.unit_type.is_naval() {
            c.land_units += 1;
            continue;
        }
        c.total_ships += 1;
        let (firepower, transport, bombard) = match unit.unit_type {
            UnitType::ShipsOfTheLine => {
                c.ships_of_the_line += 1;
                (FIREPOWER_LINE, 0, BOMBARD_LINE)
            }
            UnitType::Frigates => {
                c.frigates += 1;
                (FIREPOWER_FRIGATE, 0, BOMBARD_FRIGATE)
            }
            UnitType::Galleons => {
                c.galleons += 1;
                (FIREPOWER_GALLEON, TRANSPORT_GALLEON, BOMBARD_GALLEON)
            }
            UnitType::Carracks => {
                c.light_ships += 1;
                (FIREPOWER_LIGHT, TRANSPORT_CARRACK, BOMBARD_CARRACK)
            }
            UnitType::Cogs => {
                c.light_ships += 1;
                (FIREPOWER_LIGHT, TRANSPORT_COG, 0)
            }
            _ => {
                c.galleys += 1;
                (FIREPOWER_GALLEY, TRANSPORT_GALLEY, 0)
            }
        };
        c.total_firepower = c.total_firepower.saturating_add(firepower);
        c.transport_capacity = c.transport_capacity.saturating_add(transport);
        c.bombardment_power = c.bombardment_power.saturating_add(bombard);
    }
    c
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FleetRole {
    BattleFleet,
    RaidingSquadron,
    EscortGroup,
    BlockadeForce,
    ExplorationFleet,
    TransportConvoy,
}

impl FleetRole {
    pub fn name(self) -> &'static str {
        match self {
            FleetRole::BattleFleet => "Battle Fleet",
            FleetRole::RaidingSquadron => "Raiding Squadron",
            FleetRole::EscortGroup => "Escort Group",
            FleetRole::BlockadeForce => "Blockade Force",
            FleetRole::ExplorationFleet => "Exploration Fleet",
            FleetRole::TransportConvoy => "Transport Convoy",
        }
    }
}

pub fn determine_optimal_role(c: &FleetComposition) -> FleetRole {
    if c.ships_of_the_line >= 3 || c.frigates >= 5 {
        return FleetRole::BattleFleet;
    }
    if c.land_units > 0 && c.transport_capacity > 0 {
        return FleetRole::TransportConvoy;
    }
    if c.light_ships > c.total_ships / 2 {
        return FleetRole::RaidingSquadron;
    }
    if c.galleys > c.total_ships / 2 {
        return FleetRole::BlockadeForce;
    }
    if c.galleons > 0 && c.galleons == c.total_ships {
        return FleetRole::ExplorationFleet;
    }
    FleetRole::EscortGroup
}

/// Index of the strongest unit. Ties keep the first.
pub fn flagship(force: &Force) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (i, unit) in force.units.iter().enumerate() {
        if best.map_or(true, |(_, s)| unit.current_strength > s) {
            best = Some((i, unit.current_strength));
        }
    }
    best.map(|(i, _)| i)
}

/// Mean of (training + experience + cohesion) / 3 over all units.
pub fn average_crew_quality(force: &Force) -> Fixed {
    if force.units.is_empty() {
        return Fixed::ZERO;
    }
    let total: Fixed = force
        .units
        .iter()
        .map(|u| (u.training + u.experience + u.cohesion) / Fixed::from_int(3))
        .sum();
    total / Fixed::from_int(force.units.len() as i64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetStatus {
    pub at_sea: bool,
    pub in_port: bool,
    pub blockading: bool,
    pub engaged: bool,
    pub readiness: Fixed,
    pub crew_quality: Fixed,
    pub supply: Fixed,
}

pub fn fleet_status(force: &Force) -> FleetStatus {
    FleetStatus {
        at_sea: force.is_active && !force.in_battle,
        in_port: !force.is_active,
        blockading: force.besieging,
        engaged: force.in_battle,
        readiness: force.organization * force.morale,
        crew_quality: average_crew_quality(force),
        supply: force.supply_level,
    }
}

/// Content hash over `(type, strength)` pairs.
pub fn composition_hash(units: &[Unit]) -> u32 {
    units.iter().fold(0u32, |h, u| {
        h.wrapping_mul(31)
            .wrapping_add(u.unit_type as u32)
            .wrapping_mul(31)
            .wrapping_add(u.current_strength)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
}

impl CacheStats {
    /// Hits over lookups. Zero before the first lookup.
    pub fn hit_rate(&self) -> Fixed {
        Fixed::from_ratio(self.hits as i64, (self.hits + self.misses) as i64)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    hash: u32,
    composition: FleetComposition,
    last_used: u64,
}

#[derive(Debug)]
struct Inner {
    capacity: usize,
    entries: FxHashMap<ForceId, Entry>,
    clock: u64,
    stats: CacheStats,
}

/// Shared memo of [`analyze`] per force. All methods take `&self`.
#[derive(Debug)]
pub struct CompositionCache {
    inner: Mutex<Inner>,
}

impl Default for CompositionCache {
    fn default() -> Self {
        Self::new(CacheConfig::default().capacity)
    }
}

impl CompositionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                capacity: capacity.max(1),
                entries: FxHashMap::default(),
                clock: 0,
                stats: CacheStats::default(),
            }),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity)
    }

    /// Cached composition when the force's units still hash the same,
    /// otherwise a fresh analysis. Never touches the force.
    pub fn get_or_compute(&self, force: &Force) -> FleetComposition {
        let hash = composition_hash(&force.units);
        let mut guard = lock(&self.inner);
        let inner = &mut *guard;
        inner.clock += 1;
        let now = inner.clock;

        if let Some(entry) = inner.entries.get_mut(&force.id) {
            if entry.hash == hash {
                entry.last_used = now;
                let composition = entry.composition;
                inner.stats.hits += 1;
                return composition;
            }
            inner.entries.remove(&force.id);
        }

        inner.stats.misses += 1;
        let composition = analyze(&force.units);
        if inner.entries.len() >= inner.capacity {
            inner.evict_lru();
        }
        inner.entries.insert(
            force.id,
            Entry {
                hash,
                composition,
                last_used: now,
            },
        );
        composition
    }

    /// Drop one force's entry. Returns whether it was cached.
    pub fn invalidate(&self, id: ForceId) -> bool {
        lock(&self.inner).entries.remove(&id).is_some()
    }

    /// Drop every entry and reset the counters.
    pub fn clear(&self) {
        let mut inner = lock(&self.inner);
        inner.entries.clear();
        inner.stats = CacheStats::default();
    }

    pub fn stats(&self) -> CacheStats {
        let inner = lock(&self.inner);
        CacheStats {
            size: inner.entries.len(),
            ..inner.stats
        }
    }

    pub fn hit_rate(&self) -> Fixed {
        self.stats().hit_rate()
    }
}

impl Inner {
    fn evict_lru(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(id, e)| (e.last_used, **id))
            .map(|(id, _)| *id);
        if let Some(id) = oldest {
            self.entries.remove(&id);
            self.stats.evictions += 1;
            log::trace!("Composition cache evicted force {}", id);
        }
    }
}
