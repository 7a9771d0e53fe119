//! Generic A* search over caller-defined graphs.
//!
//! Costs are integer (`u32`) so searches are reproducible across platforms.
//! Callers that work in fixed-point scale their costs before handing them in.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::hash::Hash;

/// A graph that can be searched.
///
/// `Node`: node identifier (e.g. a map cell id).
/// `Ctx`: context passed to every query (e.g. the force that is moving).
pub trait Graph<Node, Ctx> {
    /// Nodes reachable from `node` in one step under `context`.
    fn neighbors(&self, node: Node, context: &Ctx) -> Vec<Node>;

    /// Cost of stepping from `from` to `to`.
    fn cost(&self, from: Node, to: Node, context: &Ctx) -> u32;

    /// Estimated remaining cost from `from` to `target`.
    /// Must never overestimate or the returned path may not be optimal.
    fn heuristic(&self, from: Node, target: Node, context: &Ctx) -> u32;
}

/// Result of a bounded search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome<Node> {
    /// Path from start to goal (both inclusive) and its total cost.
    Found { path: Vec<Node>, cost: u32 },
    /// The open set drained without reaching the goal.
    Unreachable,
    /// The search expanded `expanded` nodes and gave up.
    IterationLimit { expanded: usize },
}

impl<Node> SearchOutcome<Node> {
    /// Path if one was found, otherwise empty.
    pub fn into_path(self) -> Vec<Node> {
        match self {
            SearchOutcome::Found { path, .. } => path,
            _ => Vec::new(),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found { .. })
    }
}

/// A generic A* pathfinder.
pub struct AStar;

impl AStar {
    /// Find the shortest path from `start` to `goal` with no expansion limit.
    pub fn find_path<Node, Ctx, G>(
        graph: &G,
        start: Node,
        goal: Node,
        context: &Ctx,
    ) -> Option<(Vec<Node>, u32)>
    where
        Node: Copy + Eq + Hash + std::fmt::Debug,
        G: Graph<Node, Ctx>,
    {
        match Self::find_path_bounded(graph, start, goal, context, usize::MAX) {
            SearchOutcome::Found { path, cost } => Some((path, cost)),
            _ => None,
        }
    }

    /// Find the shortest path, expanding at most `max_iterations` nodes.
    ///
    /// A node counts as expanded when it is popped from the open set and
    /// was not already closed.
    pub fn find_path_bounded<Node, Ctx, G>(
        graph: &G,
        start: Node,
        goal: Node,
        context: &Ctx,
        max_iterations: usize,
    ) -> SearchOutcome<Node>
    where
        Node: Copy + Eq + Hash + std::fmt::Debug,
        G: Graph<Node, Ctx>,
    {
        let mut open_set = BinaryHeap::new();
        let mut came_from: HashMap<Node, Node> = HashMap::new();
        let mut g_score: HashMap<Node, u32> = HashMap::new();
        let mut closed_set: HashSet<Node> = HashSet::new();
        let mut expanded = 0usize;

        g_score.insert(start, 0);
        open_set.push(State {
            node: start,
            cost: 0,
            priority: graph.heuristic(start, goal, context),
        });

        while let Some(State { node: current, cost, .. }) = open_set.pop() {
            if !closed_set.insert(current) {
                continue;
            }
            let current_g = g_score.get(&current).copied().unwrap_or(cost);

            if current == goal {
                let mut path = vec![current];
                let mut curr = current;
                while let Some(&prev) = came_from.get(&curr) {
                    path.push(prev);
                    curr = prev;
                }
                path.reverse();
                return SearchOutcome::Found {
                    path,
                    cost: current_g,
                };
            }

            expanded += 1;
            if expanded > max_iterations {
                return SearchOutcome::IterationLimit { expanded };
            }

            for neighbor in graph.neighbors(current, context) {
                if closed_set.contains(&neighbor) {
                    continue;
                }

                let tentative_g =
                    current_g.saturating_add(graph.cost(current, neighbor, context));

                if tentative_g < *g_score.get(&neighbor).unwrap_or(&u32::MAX) {
                    came_from.insert(neighbor, current);
                    g_score.insert(neighbor, tentative_g);
                    open_set.push(State {
                        node: neighbor,
                        cost: tentative_g,
                        priority: tentative_g
                            .saturating_add(graph.heuristic(neighbor, goal, context)),
                    });
                }
            }
        }

        SearchOutcome::Unreachable
    }
}

/// Open-set entry.
#[derive(Copy, Clone, Eq, PartialEq)]
struct State<Node> {
    node: Node,
    cost: u32,     // g
    priority: u32, // f = g + h
}

// BinaryHeap is a max-heap; reverse the comparison to pop the lowest f first.
// Ties prefer the entry with the larger g (closer to the goal).
impl<Node: Eq> Ord for State<Node> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| self.cost.cmp(&other.cost))
    }
}

impl<Node: Eq> PartialOrd for State<Node> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
