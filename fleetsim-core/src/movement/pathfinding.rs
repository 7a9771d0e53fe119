//! Least-cost routes over the cell adjacency graph.

use super::terrain::GameMap;
use super::{can_force_enter, force_movement_cost};
use crate::config::MovementConfig;
use crate::fixed::Fixed;
use crate::state::{CellId, Force};
use game_pathfinding::{AStar, Graph, SearchOutcome};

/// The map as seen by one moving force: only cells the force may enter
/// are neighbours.
pub struct MovementGraph<'a> {
    map: &'a GameMap,
    config: &'a MovementConfig,
    /// Lowest per-kilometre multiplier any step can have. Keeps the
    /// heuristic below the true cost.
    floor_multiplier: Fixed,
}

impl<'a> MovementGraph<'a> {
    pub fn new(map: &'a GameMap, config: &'a MovementConfig) -> Self {
        let floor_multiplier = [
            Fixed::ONE,
            config.ocean_cost,
            config.coastal_cost,
            config.river_cost,
            config.coastal_cost * config.galley_coastal_cost,
            config.ocean_cost * config.line_ship_cost,
        ]
        .into_iter()
        .min()
        .unwrap_or(Fixed::ONE)
        .max(Fixed::ZERO);
        Self {
            map,
            config,
            floor_multiplier,
        }
    }

    fn step_km(&self, from: CellId, to: CellId) -> u64 {
        self.map.distance_km(from, to).unwrap_or(1).max(1)
    }
}

fn to_cost(v: Fixed) -> u32 {
    v.raw().clamp(0, u32::MAX as i64) as u32
}

impl Graph<CellId, Force> for MovementGraph<'_> {
    fn neighbors(&self, node: CellId, force: &Force) -> Vec<CellId> {
        let Some(cell) = self.map.get(node) else {
            return Vec::new();
        };
        cell.neighbors
            .iter()
            .copied()
            .filter(|&n| {
                self.map
                    .get(n)
                    .is_some_and(|c| can_force_enter(force, c, self.config).is_ok())
            })
            .collect()
    }

    fn cost(&self, from: CellId, to: CellId, force: &Force) -> u32 {
        let Some(cell) = self.map.get(to) else {
            return u32::MAX;
        };
        let per_km = force_movement_cost(force, cell, self.config);
        to_cost(per_km.mul_int(self.step_km(from, to) as i64))
    }

    fn heuristic(&self, from: CellId, target: CellId, _force: &Force) -> u32 {
        let km = self.map.distance_km(from, target).unwrap_or(0);
        // Cell centres are whole kilometres, so summed edge lengths can round
        // below the straight line. Scale down to stay admissible.
        let estimate = self.floor_multiplier.mul_int(km as i64) * Fixed::from_raw(7500);
        to_cost(estimate)
    }
}

/// Route from `start` to `goal` that the whole force can legally follow.
///
/// Empty when there is no such route, when either end is off-limits for the
/// force, or when the search hits the iteration cap. `start == goal` yields
/// a single-cell path.
#[tracing::instrument(skip_all, name = "find_path")]
pub fn find_path(
    map: &GameMap,
    force: &Force,
    start: CellId,
    goal: CellId,
    config: &MovementConfig,
) -> Vec<CellId> {
    let (Some(from), Some(to)) = (map.get(start), map.get(goal)) else {
        log::debug!("Force {}: unknown cell in route {} -> {}", force.id, start, goal);
        return Vec::new();
    };
    for cell in [from, to] {
        if let Err(reason) = can_force_enter(force, cell, config) {
            log::debug!("Force {}: cell {} off-limits ({})", force.id, cell.id, reason);
            return Vec::new();
        }
    }
    if start == goal {
        return vec![start];
    }

    let graph = MovementGraph::new(map, config);
    match AStar::find_path_bounded(&graph, start, goal, force, config.max_pathfinding_iterations) {
        SearchOutcome::Found { path, cost } => {
            log::trace!(
                "Force {} routed {} -> {} in {} steps (cost {})",
                force.id,
                start,
                goal,
                path.len() - 1,
                cost
            );
            path
        }
        SearchOutcome::Unreachable => {
            log::debug!("Force {}: no route {} -> {}", force.id, start, goal);
            Vec::new()
        }
        SearchOutcome::IterationLimit { expanded } => {
            log::warn!(
                "Force {}: route {} -> {} abandoned after {} expansions",
                force.id,
                start,
                goal,
                expanded
            );
            Vec::new()
        }
    }
}

/// Summed movement cost of walking `path`, or `None` if any step is illegal.
pub fn path_cost(map: &GameMap, force: &Force, path: &[CellId], config: &MovementConfig) -> Option<Fixed> {
    let graph = MovementGraph::new(map, config);
    let mut total = Fixed::ZERO;
    for step in path.windows(2) {
        let cell = map.get(step[1])?;
        if !map.get(step[0])?.neighbors.contains(&step[1])
            || can_force_enter(force, cell, config).is_err()
        {
            return None;
        }
        total += Fixed::from_raw(graph.cost(step[0], step[1], force) as i64);
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::terrain::CellKind;
    use crate::state::UnitType;
    use crate::testing::{ForceBuilder, MapBuilder};

    /// ```text
    ///  1 coast ── 2 deep ── 3 deep ── 4 coast
    ///     │                             │
    ///  5 river ─────── 6 river ──────── 7 coast
    ///     │
    ///  8 land ── 9 land
    /// ```
    fn sea_map() -> GameMap {
        MapBuilder::new()
            .cell(1, CellKind::Coastal, 0, 0)
            .cell(2, CellKind::DeepOcean, 100, 0)
            .cell(3, CellKind::DeepOcean, 200, 0)
            .cell(4, CellKind::Coastal, 300, 0)
            .cell(5, CellKind::River, 0, 100)
            .cell(6, CellKind::River, 150, 100)
            .cell(7, CellKind::Coastal, 300, 100)
            .cell(8, CellKind::Land, 0, 200)
            .cell(9, CellKind::Land, 100, 200)
            .link(1, 2)
            .link(2, 3)
            .link(3, 4)
            .link(1, 5)
            .link(5, 6)
            .link(6, 7)
            .link(4, 7)
            .link(5, 8)
            .link(8, 9)
            .build()
    }

    fn cfg() -> MovementConfig {
        MovementConfig::default()
    }

    #[test]
    fn test_start_equals_goal() {
        let fleet = ForceBuilder::new(1).unit(UnitType::Cogs, 500).build();
        assert_eq!(find_path(&sea_map(), &fleet, 1, 1, &cfg()), vec![1]);
    }

    #[test]
    fn test_only_shallow_draught_ships_go_upriver() {
        let map = sea_map();
        let galleys = ForceBuilder::new(1).unit(UnitType::Galleys, 200).build();
        assert_eq!(find_path(&map, &galleys, 1, 6, &cfg()), vec![1, 5, 6]);

        let carracks = ForceBuilder::new(2).unit(UnitType::Carracks, 300).build();
        assert!(find_path(&map, &carracks, 1, 6, &cfg()).is_empty());
    }

    #[test]
    fn test_carracks_avoid_rivers() {
        let fleet = ForceBuilder::new(1).unit(UnitType::Carracks, 300).build();
        let path = find_path(&sea_map(), &fleet, 1, 7, &cfg());
        assert_eq!(path, vec![1, 2, 3, 4, 7]);
    }

    #[test]
    fn test_line_ships_cannot_leave_deep_water() {
        let fleet = ForceBuilder::new(1).unit(UnitType::ShipsOfTheLine, 500).build();
        let map = sea_map();
        assert_eq!(find_path(&map, &fleet, 2, 3, &cfg()), vec![2, 3]);
        assert!(find_path(&map, &fleet, 2, 4, &cfg()).is_empty());
    }

    #[test]
    fn test_armies_walk_and_fleets_sail() {
        let map = sea_map();
        let army = ForceBuilder::new(1).unit(UnitType::Pikemen, 800).build();
        assert_eq!(find_path(&map, &army, 8, 9, &cfg()), vec![8, 9]);
        assert!(find_path(&map, &army, 8, 5, &cfg()).is_empty());

        let fleet = ForceBuilder::new(2).unit(UnitType::Galleys, 200).build();
        assert!(find_path(&map, &fleet, 5, 8, &cfg()).is_empty());
    }

    #[test]
    fn test_unknown_cells_and_empty_forces() {
        let map = sea_map();
        let fleet = ForceBuilder::new(1).unit(UnitType::Cogs, 500).build();
        assert!(find_path(&map, &fleet, 1, 42, &cfg()).is_empty());
        let empty = ForceBuilder::new(2).build();
        assert!(find_path(&map, &empty, 1, 2, &cfg()).is_empty());
    }

    #[test]
    fn test_iteration_cap_gives_up() {
        let mut builder = MapBuilder::new();
        for i in 0..50u32 {
            builder = builder.cell(i, CellKind::OpenSea, i as i32 * 10, 0);
            if i > 0 {
                builder = builder.link(i - 1, i);
            }
        }
        let map = builder.build();
        let fleet = ForceBuilder::new(1).unit(UnitType::Cogs, 500).build();
        let mut config = cfg();
        config.max_pathfinding_iterations = 10;
        assert!(find_path(&map, &fleet, 0, 49, &config).is_empty());
        config.max_pathfinding_iterations = 1000;
        assert_eq!(find_path(&map, &fleet, 0, 49, &config).len(), 50);
    }

    #[test]
    fn test_path_cost_matches_steps() {
        let map = sea_map();
        let fleet = ForceBuilder::new(1).unit(UnitType::Cogs, 500).build();
        // 100 km of deep ocean at 0.8
        assert_eq!(path_cost(&map, &fleet, &[1, 2], &cfg()), Some(Fixed::from_int(80)));
        assert_eq!(path_cost(&map, &fleet, &[1, 3], &cfg()), None);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn kind() -> impl Strategy<Value = CellKind> {
            prop_oneof![
                Just(CellKind::Land),
                Just(CellKind::River),
                Just(CellKind::Coastal),
                Just(CellKind::DeepOcean),
                Just(CellKind::OpenSea),
            ]
        }

        fn ship() -> impl Strategy<Value = UnitType> {
            prop_oneof![
                Just(UnitType::Galleys),
                Just(UnitType::Cogs),
                Just(UnitType::Carracks),
                Just(UnitType::Galleons),
                Just(UnitType::ShipsOfTheLine),
                Just(UnitType::Spearmen),
            ]
        }

        proptest! {
            #[test]
            fn every_cell_on_a_path_is_enterable(
                kinds in prop::collection::vec(kind(), 16),
                edges in prop::collection::vec((0u32..16, 0u32..16), 0..40),
                ships in prop::collection::vec(ship(), 1..3),
                goal in 0u32..16,
            ) {
                let mut builder = MapBuilder::new();
                for (i, k) in kinds.iter().enumerate() {
                    builder = builder.cell(i as u32, *k, (i as i32 % 4) * 50, (i as i32 / 4) * 50);
                }
                for (a, b) in edges {
                    builder = builder.link(a, b);
                }
                let map = builder.build();
                let mut fb = ForceBuilder::new(1);
                for s in ships {
                    fb = fb.unit(s, 100);
                }
                let force = fb.build();
                let config = MovementConfig::default();

                let path = find_path(&map, &force, 0, goal, &config);
                if let Some(first) = path.first() {
                    prop_assert_eq!(*first, 0);
                    prop_assert_eq!(*path.last().unwrap(), goal);
                }
                for pair in path.windows(2) {
                    prop_assert!(map.get(pair[0]).unwrap().neighbors.contains(&pair[1]));
                }
                for id in &path {
                    prop_assert!(can_force_enter(&force, map.get(*id).unwrap(), &config).is_ok());
                }
            }
        }
    }
}
