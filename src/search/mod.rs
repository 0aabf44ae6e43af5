//! Search strategies over [`ProblemState`]s.
//!
//! Every strategy owns its own [`SearchSpace`]: an arena of states plus the
//! best-known table keyed by [`StateKey`]. Frontiers only hold [`NodeId`]s;
//! an entry whose id is no longer the table's current node for its key is
//! stale and dropped when popped.

mod ant_colony;
mod best_first;
mod swarm;
mod uninformed;

use std::cmp::Ordering;
use std::fmt;
use std::mem::size_of;

use rustc_hash::FxHashMap;

use crate::config::SolverConfig;
use crate::moves::MoveGenerator;
use crate::state::{NodeId, ProblemState, StateGraph, StateKey};

/// Selector for the strategy to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Algorithm {
    #[value(name = "bfs")]
    Bfs,
    #[value(name = "dfs")]
    Dfs,
    #[value(name = "ucs")]
    Ucs,
    #[value(name = "astar")]
    AStar,
    #[value(name = "greedy")]
    Greedy,
    #[value(name = "dijkstra")]
    Dijkstra,
    #[value(name = "swarm")]
    Swarm,
    #[value(name = "convergent-swarm")]
    ConvergentSwarm,
    #[value(name = "bidirectional-swarm")]
    BidirectionalSwarm,
    #[value(name = "ant-colony")]
    AntColony,
}

impl Algorithm {
    pub const ALL: [Algorithm; 10] = [
        Algorithm::Bfs,
        Algorithm::Dfs,
        Algorithm::Ucs,
        Algorithm::AStar,
        Algorithm::Greedy,
        Algorithm::Dijkstra,
        Algorithm::Swarm,
        Algorithm::ConvergentSwarm,
        Algorithm::BidirectionalSwarm,
        Algorithm::AntColony,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Algorithm::Bfs => "BFS",
            Algorithm::Dfs => "DFS",
            Algorithm::Ucs => "UCS",
            Algorithm::AStar => "A*",
            Algorithm::Greedy => "GBFS",
            Algorithm::Dijkstra => "Dijkstra",
            Algorithm::Swarm => "Swarm",
            Algorithm::ConvergentSwarm => "Convergent Swarm",
            Algorithm::BidirectionalSwarm => "Bidirectional Swarm",
            Algorithm::AntColony => "Ant Colony",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Algorithm::ALL.into_iter().find(|a| a.label() == label)
    }

    /// Strategies whose results do not depend on the random seed.
    pub fn is_deterministic(self) -> bool {
        !matches!(self, Algorithm::Swarm | Algorithm::AntColony)
    }

    /// Strategies guaranteed to return a minimum-cost solution.
    pub fn is_cost_optimal(self) -> bool {
        matches!(self, Algorithm::Ucs | Algorithm::AStar | Algorithm::Dijkstra)
    }

    pub fn search(self, gen: &MoveGenerator<'_>, config: &SolverConfig) -> SearchOutcome {
        match self {
            Algorithm::Bfs => uninformed::breadth_first(gen, config),
            Algorithm::Dfs => uninformed::depth_first(gen, config),
            Algorithm::Ucs => best_first::search(gen, config, best_first::Policy::UniformCost),
            Algorithm::AStar => best_first::search(gen, config, best_first::Policy::AStar),
            Algorithm::Greedy => best_first::search(gen, config, best_first::Policy::Greedy),
            Algorithm::Dijkstra => best_first::search(gen, config, best_first::Policy::Dijkstra),
            Algorithm::Swarm => swarm::swarm(gen, config),
            Algorithm::ConvergentSwarm => swarm::convergent(gen, config),
            Algorithm::BidirectionalSwarm => swarm::bidirectional(gen, config),
            Algorithm::AntColony => ant_colony::search(gen, config),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchStatus {
    Solved,
    /// The reachable space was exhausted without reaching a goal.
    Impossible,
    /// An expansion or time limit stopped the search.
    Aborted,
}

impl SearchStatus {
    /// Text printed in place of a path when there is none.
    pub fn sentinel(self) -> Option<&'static str> {
        match self {
            SearchStatus::Solved => None,
            SearchStatus::Impossible => Some("Impossible"),
            SearchStatus::Aborted => Some("Aborted"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchOutcome {
    pub status: SearchStatus,
    /// Move string, empty unless solved.
    pub path: String,
    /// Sum of pushed stone weights along `path`.
    pub weight: u64,
    /// Path cost (`g` of the terminal state).
    pub cost: u64,
    pub expanded: u64,
    pub explored: u64,
    /// Peak estimated bytes held by the run's own structures.
    pub peak_memory: usize,
}

impl SearchOutcome {
    pub fn is_solved(&self) -> bool {
        self.status == SearchStatus::Solved
    }

    /// The path, or the `Impossible` / `Aborted` sentinel.
    pub fn path_or_sentinel(&self) -> &str {
        self.status.sentinel().unwrap_or(&self.path)
    }
}

/// Best-known table entry for one state key.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Record {
    /// Authoritative node for this key; any other node with the same key
    /// found in a frontier is stale.
    pub node: NodeId,
    pub best_g: u32,
    pub in_frontier: bool,
    /// Set once the state has been reopened above its best cost.
    pub diversified: bool,
}

pub(crate) enum Offer {
    New(NodeId),
    Updated(NodeId),
    Rejected,
}

impl Offer {
    pub fn node(&self) -> Option<NodeId> {
        match *self {
            Offer::New(node) | Offer::Updated(node) => Some(node),
            Offer::Rejected => None,
        }
    }
}

/// State arena plus best-known table for a single run.
pub(crate) struct SearchSpace {
    pub graph: StateGraph,
    pub table: FxHashMap<StateKey, Record>,
    pub expanded: u64,
    pub reopened: u64,
    pub stale: u64,
    peak_frontier_bytes: usize,
}

impl SearchSpace {
    pub fn new() -> Self {
        SearchSpace {
            graph: StateGraph::with_capacity(1024),
            table: FxHashMap::default(),
            expanded: 0,
            reopened: 0,
            stale: 0,
            peak_frontier_bytes: 0,
        }
    }

    pub fn insert_root(&mut self, state: ProblemState) -> NodeId {
        match self.offer(state, |_, _, _| false) {
            Offer::New(node) | Offer::Updated(node) => node,
            // The table is empty, so the root is always new.
            Offer::Rejected => NodeId(0),
        }
    }

    /// Records `state` if its key is unknown, otherwise asks `accept`
    /// (new state, current state, record) whether it replaces the current
    /// node. Accepted states become the authoritative node and are marked
    /// as in the frontier.
    pub fn offer(
        &mut self,
        state: ProblemState,
        accept: impl FnOnce(&ProblemState, &ProblemState, &mut Record) -> bool,
    ) -> Offer {
        match self.table.get_mut(&state.key) {
            Some(record) => {
                let current = self.graph.get(record.node);
                if !accept(&state, current, record) {
                    return Offer::Rejected;
                }
                if !record.in_frontier {
                    self.reopened += 1;
                }
                record.best_g = record.best_g.min(state.g);
                record.node = self.graph.add(state);
                record.in_frontier = true;
                Offer::Updated(record.node)
            }
            None => {
                let key = state.key.clone();
                let best_g = state.g;
                let node = self.graph.add(state);
                self.table.insert(
                    key,
                    Record {
                        node,
                        best_g,
                        in_frontier: true,
                        diversified: false,
                    },
                );
                Offer::New(node)
            }
        }
    }

    /// False for frontier entries superseded by a later offer.
    pub fn is_current(&self, node: NodeId) -> bool {
        self.table
            .get(&self.graph.get(node).key)
            .is_some_and(|r| r.node == node)
    }

    /// Pops `node` out of the frontier; returns false (and counts it) when
    /// the entry is stale.
    pub fn take(&mut self, node: NodeId) -> bool {
        match self.table.get_mut(&self.graph.get(node).key) {
            Some(record) if record.node == node => {
                record.in_frontier = false;
                true
            }
            _ => {
                self.stale += 1;
                false
            }
        }
    }

    pub fn is_closed(&self, key: &StateKey) -> Option<NodeId> {
        self.table
            .get(key)
            .filter(|r| !r.in_frontier)
            .map(|r| r.node)
    }

    pub fn observe_frontier<T>(&mut self, len: usize) {
        self.peak_frontier_bytes = self.peak_frontier_bytes.max(len * size_of::<T>());
    }

    pub fn explored(&self) -> u64 {
        self.table.len() as u64
    }

    pub fn footprint(&self) -> usize {
        self.graph.footprint()
            + self.table.capacity() * (size_of::<StateKey>() + size_of::<Record>() + 8)
            + self.peak_frontier_bytes
    }

    pub fn solved(&self, node: NodeId) -> SearchOutcome {
        let (path, weight) = self.graph.reconstruct_path(node);
        SearchOutcome {
            status: SearchStatus::Solved,
            path,
            weight,
            cost: self.graph.get(node).g as u64,
            expanded: self.expanded,
            explored: self.explored(),
            peak_memory: self.footprint(),
        }
    }

    pub fn finish(&self, status: SearchStatus) -> SearchOutcome {
        SearchOutcome {
            status,
            path: String::new(),
            weight: 0,
            cost: 0,
            expanded: self.expanded,
            explored: self.explored(),
            peak_memory: self.footprint(),
        }
    }

    pub fn log_stats(&self, name: &str) {
        log::debug!(
            "{}: expanded={} explored={} reopened={} stale={} arena={}",
            name,
            self.expanded,
            self.explored(),
            self.reopened,
            self.stale,
            self.graph.len()
        );
    }
}

/// Priority queue entry. `BinaryHeap` is a max-heap, so the ordering is
/// inverted: lowest `priority` first, then highest `g`, then lowest `tie`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct HeapEntry {
    pub priority: u32,
    pub g: u32,
    pub tie: u32,
    pub node: NodeId,
}

impl HeapEntry {
    /// Ties beyond `g` go to the older node.
    pub fn new(priority: u32, state: &ProblemState, node: NodeId) -> Self {
        HeapEntry {
            priority,
            g: state.g,
            tie: node.0,
            node,
        }
    }
}

impl Ord for HeapEntry {
    #[inline(always)]
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| self.g.cmp(&other.g))
            .then_with(|| other.tie.cmp(&self.tie))
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for HeapEntry {
    #[inline(always)]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BinaryHeap;

    use super::*;
    use crate::grid::Point;
    use crate::state::StoneSet;

    fn entry(priority: u32, g: u32, node: u32) -> HeapEntry {
        HeapEntry {
            priority,
            g,
            tie: node,
            node: NodeId(node),
        }
    }

    #[test]
    fn test_heap_prefers_low_f_then_high_g() {
        let mut heap = BinaryHeap::new();
        heap.push(entry(5, 1, 0));
        heap.push(entry(3, 0, 1));
        heap.push(entry(3, 2, 2));
        heap.push(entry(3, 2, 3));
        let order: Vec<u32> = std::iter::from_fn(|| heap.pop()).map(|e| e.node.0).collect();
        assert_eq!(order, vec![2, 3, 1, 0]);
    }

    #[test]
    fn test_labels_round_trip() {
        for algo in Algorithm::ALL {
            assert_eq!(Algorithm::from_label(algo.label()), Some(algo));
        }
        assert_eq!(Algorithm::from_label("nope"), None);
        assert_eq!(Algorithm::AStar.to_string(), "A*");
    }

    #[test]
    fn test_space_offer_and_staleness() {
        let mut space = SearchSpace::new();
        let mut a = ProblemState::root(Point::new(1, 1), StoneSet::new());
        a.g = 10;
        let first = space.insert_root(a.clone());

        let mut worse = a.clone();
        worse.g = 12;
        assert!(matches!(
            space.offer(worse, |new, cur, _| new.g < cur.g),
            Offer::Rejected
        ));

        let mut better = a.clone();
        better.g = 7;
        let offer = space.offer(better, |new, cur, _| new.g < cur.g);
        let second = offer.node().unwrap();
        assert!(matches!(offer, Offer::Updated(_)));
        assert_eq!(space.reopened, 0);
        assert!(!space.is_current(first));
        assert!(space.is_current(second));
        assert_eq!(space.table[&a.key].best_g, 7);

        assert!(!space.take(first));
        assert_eq!(space.stale, 1);
        assert!(space.take(second));
        assert_eq!(space.is_closed(&a.key), Some(second));
        assert_eq!(space.explored(), 1);
    }

    #[test]
    fn test_sentinels() {
        assert_eq!(SearchStatus::Impossible.sentinel(), Some("Impossible"));
        assert_eq!(SearchStatus::Aborted.sentinel(), Some("Aborted"));
        assert_eq!(SearchStatus::Solved.sentinel(), None);
    }
}
