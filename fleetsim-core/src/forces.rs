//! Unit and force mutation, and the registry that owns every force.
//!
//! Units live inside their force by value. The registry keeps each force
//! behind its own lock, so two callers working on different forces never
//! contend, and readers get cloned snapshots rather than references.

use crate::error::ForceError;
use crate::fixed::Fixed;
use crate::state::{ActorId, CellId, Force, ForceId, MoraleState, Unit, UnitClass};
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Morale swing needed to move one rung on the ladder.
const MORALE_STEP_THRESHOLD: Fixed = Fixed::from_raw(2000);
/// Losses above this share of max strength cost a morale rung.
const HEAVY_LOSS_FRACTION: Fixed = Fixed::from_raw(3000);
/// Reinforced above this share of max strength, morale recovers to steady.
const WELL_REINFORCED_FRACTION: Fixed = Fixed::from_raw(8000);
const LOW_SUPPLY: Fixed = Fixed::from_raw(3000);

impl Unit {
    /// Remove `casualties` men. Strength never goes below zero.
    pub fn apply_losses(&mut self, casualties: u32) {
        if casualties >= self.current_strength {
            self.current_strength = 0;
            self.morale = MoraleState::Broken;
            return;
        }
        self.current_strength -= casualties;
        let loss_ratio = Fixed::from_ratio(casualties as i64, self.max_strength.max(1) as i64);
        if loss_ratio > HEAVY_LOSS_FRACTION {
            self.morale = self.morale.step_down();
        }
    }

    pub fn restore_strength(&mut self, reinforcements: u32) {
        self.current_strength = self
            .current_strength
            .saturating_add(reinforcements)
            .min(self.max_strength);
        let fill = Fixed::from_ratio(self.current_strength as i64, self.max_strength.max(1) as i64);
        if fill > WELL_REINFORCED_FRACTION && self.morale < MoraleState::Steady {
            self.morale = MoraleState::Steady;
        }
    }

    /// Nudge morale. Moves at most one rung per call.
    pub fn update_morale(&mut self, change: Fixed) {
        if change > MORALE_STEP_THRESHOLD {
            self.morale = self.morale.step_up();
        } else if change < -MORALE_STEP_THRESHOLD {
            self.morale = self.morale.step_down();
        }
    }

    pub fn consume_supplies(&mut self, rate: Fixed) {
        self.supply_level = (self.supply_level - rate).max(Fixed::ZERO);
        self.ammunition = (self.ammunition - rate.mul(Fixed::HALF)).max(Fixed::ZERO);
        if self.supply_level < LOW_SUPPLY {
            self.update_morale(-Fixed::TENTH);
        }
    }

    pub fn is_effective(&self) -> bool {
        self.current_strength.saturating_mul(10) > self.max_strength
            && self.morale > MoraleState::Broken
            && self.supply_level > Fixed::TENTH
    }

    /// Attack scaled by fill, morale rung, supply and equipment. Zero when
    /// the unit is not effective.
    pub fn combat_effectiveness(&self) -> Fixed {
        if !self.is_effective() {
            return Fixed::ZERO;
        }
        let fill = Fixed::from_ratio(self.current_strength as i64, self.max_strength as i64);
        let morale = Fixed::from_ratio(
            self.morale.level(),
            MoraleState::Fanatical.level(),
        );
        self.attack_strength * fill * morale * self.supply_level * self.equipment_quality
    }

    /// Clamp out-of-range fields back into their invariants.
    pub fn sanitize(&mut self) {
        if self.current_strength > self.max_strength {
            log::warn!(
                "{:?} strength {} above max {}, clamping",
                self.unit_type,
                self.current_strength,
                self.max_strength
            );
            self.current_strength = self.max_strength;
        }
        self.training = self.training.unit();
        self.equipment_quality = self.equipment_quality.unit();
        self.supply_level = self.supply_level.unit();
        self.ammunition = self.ammunition.unit();
        self.cohesion = self.cohesion.unit();
        self.loyalty = self.loyalty.unit();
    }
}

impl Force {
    pub fn recalculate_strength(&mut self) {
        let total: u64 = self.units.iter().map(|u| u.current_strength as u64).sum();
        self.total_strength = total.min(u32::MAX as u64) as u32;
    }

    pub fn add_unit(&mut self, mut unit: Unit) {
        unit.sanitize();
        self.units.push(unit);
        self.recalculate_strength();
    }

    pub fn remove_unit(&mut self, index: usize) -> Result<Unit, ForceError> {
        self.check_index(index)?;
        let unit = self.units.remove(index);
        self.recalculate_strength();
        Ok(unit)
    }

    /// Disband a unit. Same as removal, but logged.
    pub fn disband_unit(&mut self, index: usize) -> Result<Unit, ForceError> {
        let unit = self.remove_unit(index)?;
        log::debug!(
            "Force {} disbanded {:?} ({} men)",
            self.id,
            unit.unit_type,
            unit.current_strength
        );
        Ok(unit)
    }

    /// Fold unit `b` into unit `a`. Both must be the same type. Excess men
    /// above `a`'s max strength raise it rather than being lost.
    pub fn merge_units(&mut self, a: usize, b: usize) -> Result<(), ForceError> {
        self.check_index(a)?;
        self.check_index(b)?;
        if a == b {
            return Err(ForceError::UnitIndexOutOfRange {
                force: self.id,
                index: b,
                len: self.units.len(),
            });
        }
        if self.units[a].unit_type != self.units[b].unit_type {
            return Err(ForceError::MismatchedUnitTypes);
        }

        let donor = self.units[b].clone();
        let target = &mut self.units[a];
        let (kept, added) = (target.current_strength, donor.current_strength);
        let total = kept.saturating_add(added);
        // Strength-weighted blend of quality attributes.
        let blend = |x: Fixed, y: Fixed| {
            if total == 0 {
                return x;
            }
            (x.mul_int(kept as i64) + y.mul_int(added as i64)).div(Fixed::from_int(total as i64))
        };
        target.experience = blend(target.experience, donor.experience);
        target.training = blend(target.training, donor.training);
        target.equipment_quality = blend(target.equipment_quality, donor.equipment_quality);
        target.max_strength = target.max_strength.max(total).max(donor.max_strength);
        target.current_strength = total;

        self.units.remove(b);
        self.recalculate_strength();
        Ok(())
    }

    /// Split `split_size` men off unit `index` into a new unit appended to the force.
    pub fn split_unit(&mut self, index: usize, split_size: u32) -> Result<(), ForceError> {
        self.check_index(index)?;
        let available = self.units[index].current_strength;
        if split_size == 0 || split_size >= available {
            return Err(ForceError::InvalidSplit {
                requested: split_size,
                available,
            });
        }
        let source = &mut self.units[index];
        source.current_strength -= split_size;
        let mut new_unit = source.clone();
        new_unit.current_strength = split_size;
        self.units.push(new_unit);
        self.recalculate_strength();
        Ok(())
    }

    /// Drop units whose strength reached zero. Returns how many were removed.
    pub fn prune_destroyed(&mut self) -> usize {
        let before = self.units.len();
        self.units.retain(|u| u.current_strength > 0);
        self.recalculate_strength();
        before - self.units.len()
    }

    /// Spread `casualties` across units in proportion to their strength.
    /// Any remainder from rounding goes to the largest units first.
    pub fn distribute_casualties(&mut self, casualties: u32) {
        let total = self.total_strength;
        if total == 0 || casualties == 0 {
            return;
        }
        let casualties = casualties.min(total);
        let mut assigned = 0u32;
        for unit in &mut self.units {
            let share = (casualties as u64 * unit.current_strength as u64 / total as u64) as u32;
            unit.apply_losses(share);
            assigned += share;
        }
        let mut remainder = casualties - assigned;
        let mut order: Vec<usize> = (0..self.units.len()).collect();
        order.sort_by(|&i, &j| self.units[j].current_strength.cmp(&self.units[i].current_strength));
        for i in order {
            if remainder == 0 {
                break;
            }
            let take = remainder.min(self.units[i].current_strength);
            self.units[i].apply_losses(take);
            remainder -= take;
        }
        self.recalculate_strength();
    }

    pub fn can_move(&self) -> bool {
        self.movement_points > Fixed::ZERO && !self.units.is_empty() && !self.besieging
    }

    pub fn has_land_units(&self) -> bool {
        self.units.iter().any(|u| !u.unit_type.is_naval())
    }

    /// Non-empty and made only of vessels.
    pub fn is_naval(&self) -> bool {
        !self.units.is_empty() && self.units.iter().all(|u| u.unit_type.is_naval())
    }

    pub fn count_class(&self, class: UnitClass) -> usize {
        self.units
            .iter()
            .filter(|u| u.unit_type.class() == class)
            .count()
    }

    fn check_index(&self, index: usize) -> Result<(), ForceError> {
        if index >= self.units.len() {
            log::warn!(
                "Force {}: unit index {} out of range ({} units)",
                self.id,
                index,
                self.units.len()
            );
            return Err(ForceError::UnitIndexOutOfRange {
                force: self.id,
                index,
                len: self.units.len(),
            });
        }
        Ok(())
    }
}

/// Owns every force, one lock per force.
#[derive(Default)]
pub struct ForceRegistry {
    forces: RwLock<FxHashMap<ForceId, Arc<Mutex<Force>>>>,
    next_id: Mutex<ForceId>,
}

impl ForceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id and register an empty force.
    pub fn create_force(&self, name: &str, owner: ActorId, location: CellId) -> ForceId {
        let id = self.allocate_id();
        self.insert(Force::new(id, name, owner, location));
        id
    }

    /// Register a force under its own id, replacing any previous one.
    pub fn insert(&self, mut force: Force) {
        force.recalculate_strength();
        let id = force.id;
        {
            let mut next = lock(&self.next_id);
            *next = (*next).max(id + 1);
        }
        write(&self.forces).insert(id, Arc::new(Mutex::new(force)));
    }

    pub fn contains(&self, id: ForceId) -> bool {
        read(&self.forces).contains_key(&id)
    }

    pub fn len(&self) -> usize {
        read(&self.forces).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> Vec<ForceId> {
        let mut ids: Vec<_> = read(&self.forces).keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Cloned copy of a force taken under its lock.
    pub fn snapshot(&self, id: ForceId) -> Option<Force> {
        let handle = self.handle(id)?;
        let force = lock(&handle).clone();
        Some(force)
    }

    /// Snapshots of every force owned by `owner`, by ascending id.
    pub fn forces_of(&self, owner: ActorId) -> Vec<Force> {
        self.ids()
            .into_iter()
            .filter_map(|id| self.snapshot(id))
            .filter(|f| f.owner == owner)
            .collect()
    }

    /// Every actor owning at least one active force, ascending.
    pub fn owners(&self) -> Vec<ActorId> {
        let handles: Vec<_> = read(&self.forces).values().cloned().collect();
        let mut owners: Vec<ActorId> = handles
            .iter()
            .filter_map(|h| {
                let force = lock(h);
                force.is_active.then_some(force.owner)
            })
            .collect();
        owners.sort_unstable();
        owners.dedup();
        owners
    }

    /// Ids of the forces owned by `owner`, ascending.
    pub fn ids_of(&self, owner: ActorId) -> Vec<ForceId> {
        self.ids()
            .into_iter()
            .filter(|&id| self.handle(id).is_some_and(|h| lock(&h).owner == owner))
            .collect()
    }

    /// Run `f` with exclusive access to one force. The strength total is
    /// recomputed afterwards whatever `f` did.
    pub fn with_force_mut<R>(
        &self,
        id: ForceId,
        f: impl FnOnce(&mut Force) -> R,
    ) -> Result<R, ForceError> {
        let handle = self.handle(id).ok_or(ForceError::UnknownForce(id))?;
        let mut force = lock(&handle);
        let result = f(&mut force);
        force.recalculate_strength();
        Ok(result)
    }

    /// Mark a force inactive. It stays in the registry for history.
    pub fn disband(&self, id: ForceId) -> Result<(), ForceError> {
        self.with_force_mut(id, |force| {
            force.is_active = false;
            force.units.clear();
            log::info!("Force {} ({}) disbanded", force.id, force.name);
        })
    }

    /// Move the listed units out of `id` into a new force at the same location.
    pub fn split_fleet(&self, id: ForceId, unit_indices: &[usize]) -> Result<ForceId, ForceError> {
        let new_id = self.allocate_id();
        let new_force = self.with_force_mut(id, |force| {
            let mut indices: Vec<usize> = unit_indices.to_vec();
            indices.sort_unstable();
            indices.dedup();
            if indices.is_empty() || indices.len() >= force.units.len() {
                return Err(ForceError::InvalidSplit {
                    requested: indices.len() as u32,
                    available: force.units.len() as u32,
                });
            }
            if let Some(&bad) = indices.iter().find(|&&i| i >= force.units.len()) {
                return Err(ForceError::UnitIndexOutOfRange {
                    force: force.id,
                    index: bad,
                    len: force.units.len(),
                });
            }
            let mut split = Force::new(
                new_id,
                format!("{} (detached)", force.name),
                force.owner,
                force.location,
            );
            split.home_location = force.home_location;
            split.morale = force.morale;
            split.organization = force.organization;
            split.supply_level = force.supply_level;
            for &i in indices.iter().rev() {
                split.units.push(force.units.remove(i));
            }
            split.units.reverse();
            force.recalculate_strength();
            split.recalculate_strength();
            Ok(split)
        })??;
        self.insert(new_force);
        Ok(new_id)
    }

    /// Move every unit of `absorbed` into `survivor`. The absorbed force is
    /// marked inactive. Both forces are held locked for the whole move.
    pub fn merge_fleets(&self, survivor: ForceId, absorbed: ForceId) -> Result<(), ForceError> {
        if survivor == absorbed {
            return Err(ForceError::InvalidMerge(survivor));
        }
        let keep = self.handle(survivor).ok_or(ForceError::UnknownForce(survivor))?;
        let give = self.handle(absorbed).ok_or(ForceError::UnknownForce(absorbed))?;
        // Ascending id order, so opposite merges cannot deadlock.
        let (mut into, mut from) = if survivor < absorbed {
            let into = lock(&keep);
            (into, lock(&give))
        } else {
            let from = lock(&give);
            (lock(&keep), from)
        };
        if !into.units.is_empty() && !from.units.is_empty() && into.is_naval() != from.is_naval() {
            return Err(ForceError::MixedDomain(survivor));
        }
        let units = std::mem::take(&mut from.units);
        into.units.extend(units);
        into.recalculate_strength();
        from.is_active = false;
        from.recalculate_strength();
        log::debug!("Force {} absorbed force {}", survivor, absorbed);
        Ok(())
    }

    fn handle(&self, id: ForceId) -> Option<Arc<Mutex<Force>>> {
        read(&self.forces).get(&id).cloned()
    }

    fn allocate_id(&self) -> ForceId {
        let mut next = lock(&self.next_id);
        let id = (*next).max(1);
        *next = id + 1;
        id
    }
}

// A poisoned lock still holds structurally valid data; keep using it.
pub(crate) fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

pub(crate) fn read<T>(l: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    l.read().unwrap_or_else(|e| e.into_inner())
}

pub(crate) fn write<T>(l: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::UnitType;
    use crate::testing::ForceBuilder;

    #[test]
    fn test_apply_losses_clamps_at_zero() {
        let mut unit = Unit::with_strength(UnitType::Spearmen, 500);
        unit.apply_losses(900);
        assert_eq!(unit.current_strength, 0);
        assert_eq!(unit.morale, MoraleState::Broken);
    }

    #[test]
    fn test_heavy_losses_cost_one_morale_rung() {
        let mut unit = Unit::with_strength(UnitType::Spearmen, 800);
        unit.apply_losses(300);
        assert_eq!(unit.morale, MoraleState::Wavering);
        assert_eq!(unit.current_strength, 500);
    }

    #[test]
    fn test_restore_caps_at_max_and_recovers_morale() {
        let mut unit = Unit::new(UnitType::Levies);
        unit.current_strength = 100;
        unit.morale = MoraleState::Broken;
        unit.restore_strength(5000);
        assert_eq!(unit.current_strength, unit.max_strength);
        assert_eq!(unit.morale, MoraleState::Steady);
    }

    #[test]
    fn test_update_morale_single_step() {
        let mut unit = Unit::new(UnitType::Levies);
        unit.update_morale(Fixed::from_int(5));
        assert_eq!(unit.morale, MoraleState::Confident);
        unit.update_morale(Fixed::from_raw(1000));
        assert_eq!(unit.morale, MoraleState::Confident);
    }

    #[test]
    fn test_split_and_merge_preserve_strength() {
        let mut force = ForceBuilder::new(1).unit(UnitType::Spearmen, 800).build();
        force.split_unit(0, 300).unwrap();
        assert_eq!(force.units.len(), 2);
        assert_eq!(force.total_strength, 800);

        force.merge_units(0, 1).unwrap();
        assert_eq!(force.units.len(), 1);
        assert_eq!(force.units[0].current_strength, 800);
        assert_eq!(force.total_strength, 800);
    }

    #[test]
    fn test_invalid_inputs_leave_force_untouched() {
        let mut force = ForceBuilder::new(1)
            .unit(UnitType::Spearmen, 800)
            .unit(UnitType::Levies, 1000)
            .build();
        let before = force.clone();

        assert!(matches!(
            force.remove_unit(5),
            Err(ForceError::UnitIndexOutOfRange { index: 5, .. })
        ));
        assert!(matches!(
            force.split_unit(0, 800),
            Err(ForceError::InvalidSplit { .. })
        ));
        assert_eq!(force.merge_units(0, 1), Err(ForceError::MismatchedUnitTypes));
        assert_eq!(force, before);
    }

    #[test]
    fn test_distribute_casualties_exact() {
        let mut force = ForceBuilder::new(1)
            .unit(UnitType::Frigates, 300)
            .unit(UnitType::Frigates, 300)
            .unit(UnitType::Frigates, 300)
            .build();
        force.distribute_casualties(100);
        assert_eq!(force.total_strength, 800);
    }

    #[test]
    fn test_registry_split_and_merge_fleets() {
        let registry = ForceRegistry::new();
        registry.insert(
            ForceBuilder::new(1)
                .unit(UnitType::Galleons, 400)
                .unit(UnitType::Carracks, 300)
                .unit(UnitType::Cogs, 500)
                .build(),
        );

        let detached = registry.split_fleet(1, &[0, 2]).unwrap();
        let a = registry.snapshot(1).unwrap();
        let b = registry.snapshot(detached).unwrap();
        assert_eq!(a.total_strength, 300);
        assert_eq!(b.total_strength, 900);
        assert_eq!(b.units[0].unit_type, UnitType::Galleons);

        registry.merge_fleets(1, detached).unwrap();
        assert_eq!(registry.snapshot(1).unwrap().total_strength, 1200);
        assert!(!registry.snapshot(detached).unwrap().is_active);
    }

    #[test]
    fn test_registry_rejects_mixed_domain_merge() {
        let registry = ForceRegistry::new();
        registry.insert(ForceBuilder::new(1).unit(UnitType::Galleons, 400).build());
        registry.insert(ForceBuilder::new(2).unit(UnitType::Pikemen, 800).build());
        assert_eq!(registry.merge_fleets(1, 2), Err(ForceError::MixedDomain(1)));
    }

    #[test]
    fn test_merge_into_empty_force_takes_any_domain() {
        let registry = ForceRegistry::new();
        registry.insert(ForceBuilder::new(1).build());
        registry.insert(ForceBuilder::new(2).unit(UnitType::Frigates, 300).build());
        registry.merge_fleets(1, 2).unwrap();
        let merged = registry.snapshot(1).unwrap();
        assert!(merged.is_naval());
        assert_eq!(merged.total_strength, 300);
        assert_eq!(registry.merge_fleets(1, 1), Err(ForceError::InvalidMerge(1)));
    }

    #[test]
    fn test_opposite_merges_conserve_units() {
        use std::sync::Barrier;

        for _ in 0..200 {
            let registry = ForceRegistry::new();
            registry.insert(
                ForceBuilder::new(1)
                    .unit(UnitType::Galleons, 400)
                    .unit(UnitType::Galleons, 400)
                    .build(),
            );
            registry.insert(ForceBuilder::new(2).unit(UnitType::Frigates, 300).build());
            let barrier = Barrier::new(2);
            std::thread::scope(|scope| {
                scope.spawn(|| {
                    barrier.wait();
                    registry.merge_fleets(1, 2).unwrap();
                });
                scope.spawn(|| {
                    barrier.wait();
                    registry.merge_fleets(2, 1).unwrap();
                });
            });
            let a = registry.snapshot(1).unwrap();
            let b = registry.snapshot(2).unwrap();
            assert_eq!(a.units.len() + b.units.len(), 3);
            assert_eq!(a.total_strength + b.total_strength, 1100);
            assert!(a.units.is_empty() || b.units.is_empty());
        }
    }

    #[test]
    fn test_huge_strengths_saturate() {
        let force = ForceBuilder::new(1)
            .unit(UnitType::Pikemen, 3_000_000_000)
            .unit(UnitType::Pikemen, 3_000_000_000)
            .build();
        assert_eq!(force.total_strength, u32::MAX);

        let mut unit = Unit::with_strength(UnitType::Pikemen, 4_000_000_000);
        unit.current_strength = 500_000_000;
        assert!(unit.is_effective());
    }

    #[test]
    fn test_registry_unknown_force() {
        let registry = ForceRegistry::new();
        assert_eq!(
            registry.with_force_mut(9, |_| ()),
            Err(ForceError::UnknownForce(9))
        );
    }

    #[test]
    fn test_create_force_ids_do_not_collide() {
        let registry = ForceRegistry::new();
        registry.insert(ForceBuilder::new(7).build());
        let id = registry.create_force("New", 1, 0);
        assert_eq!(id, 8);
        assert_eq!(registry.ids(), vec![7, 8]);
    }

    #[test]
    fn test_owners_skip_disbanded_forces() {
        let registry = ForceRegistry::new();
        registry.insert(ForceBuilder::new(1).owner(5).build());
        registry.insert(ForceBuilder::new(2).owner(3).build());
        registry.insert(ForceBuilder::new(3).owner(5).build());
        registry.insert(ForceBuilder::new(4).owner(9).build());
        registry.disband(4).unwrap();
        assert_eq!(registry.owners(), vec![3, 5]);
        assert_eq!(registry.ids_of(5), vec![1, 3]);
        assert_eq!(registry.ids_of(9), vec![4]);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Remove(usize),
            Split(usize, u32),
            Merge(usize, usize),
            Losses(u32),
            Prune,
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0usize..6).prop_map(Op::Remove),
                (0usize..6, 0u32..1200).prop_map(|(i, n)| Op::Split(i, n)),
                (0usize..6, 0usize..6).prop_map(|(a, b)| Op::Merge(a, b)),
                (0u32..3000).prop_map(Op::Losses),
                Just(Op::Prune),
            ]
        }

        proptest! {
            #[test]
            fn total_strength_is_sum_of_units(
                strengths in prop::collection::vec(1u32..1000, 1..6),
                ops in prop::collection::vec(op(), 0..20),
            ) {
                let mut builder = ForceBuilder::new(1);
                for s in &strengths {
                    builder = builder.unit(UnitType::Spearmen, *s);
                }
                let mut force = builder.build();
                for op in ops {
                    let _ = match op {
                        Op::Remove(i) => force.remove_unit(i).map(|_| ()),
                        Op::Split(i, n) => force.split_unit(i, n),
                        Op::Merge(a, b) => force.merge_units(a, b),
                        Op::Losses(n) => { force.distribute_casualties(n); Ok(()) }
                        Op::Prune => { force.prune_destroyed(); Ok(()) }
                    };
                    let sum: u32 = force.units.iter().map(|u| u.current_strength).sum();
                    prop_assert_eq!(force.total_strength, sum);
                    for u in &force.units {
                        prop_assert!(u.current_strength <= u.max_strength);
                    }
                }
            }
        }
    }
}
