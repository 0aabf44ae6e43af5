//! Priority-queue searches: uniform cost, A*, greedy best-first and
//! Dijkstra. All of them test for the goal when a state is popped and use
//! lazy deletion: an improved state is pushed as a fresh entry and the old
//! one is skipped when it surfaces.

use std::collections::BinaryHeap;

use super::{HeapEntry, SearchOutcome, SearchSpace, SearchStatus};
use crate::config::SolverConfig;
use crate::heuristic::Heuristic;
use crate::moves::MoveGenerator;
use crate::state::{NodeId, ProblemState};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Policy {
    UniformCost,
    AStar,
    Greedy,
    Dijkstra,
}

impl Policy {
    fn name(self) -> &'static str {
        match self {
            Policy::UniformCost => "ucs",
            Policy::AStar => "astar",
            Policy::Greedy => "greedy",
            Policy::Dijkstra => "dijkstra",
        }
    }

    fn heuristic(self, config: &SolverConfig) -> Option<Heuristic> {
        match self {
            Policy::AStar | Policy::Greedy => Some(config.heuristic),
            Policy::UniformCost | Policy::Dijkstra => None,
        }
    }

    #[inline]
    fn priority(self, state: &ProblemState) -> u32 {
        match self {
            Policy::UniformCost | Policy::Dijkstra => state.g,
            Policy::AStar => state.f(),
            Policy::Greedy => state.h.unwrap_or(0),
        }
    }

    /// Whether a newly generated copy of a known state replaces it.
    #[inline]
    fn improves(self, new: &ProblemState, current: &ProblemState) -> bool {
        match self {
            Policy::Greedy => new.h < current.h,
            _ => new.g < current.g,
        }
    }

    fn exits_on_goal(self, config: &SolverConfig) -> bool {
        self != Policy::Dijkstra || config.dijkstra_early_exit
    }
}

pub(super) fn search(gen: &MoveGenerator<'_>, config: &SolverConfig, policy: Policy) -> SearchOutcome {
    let heuristic = policy.heuristic(config);
    let exits_on_goal = policy.exits_on_goal(config);

    let mut space = SearchSpace::new();
    let mut budget = config.limits.start();

    let root_state = match heuristic {
        Some(h) => gen.initial_state_with(h),
        None => gen.initial_state(),
    };
    let root_priority = policy.priority(&root_state);
    let root = space.insert_root(root_state);

    let mut open = BinaryHeap::with_capacity(1024);
    open.push(HeapEntry::new(root_priority, space.graph.get(root), root));

    while let Some(HeapEntry { node, .. }) = open.pop() {
        if !space.take(node) {
            continue;
        }
        if !budget.spend() {
            space.log_stats(policy.name());
            return space.finish(SearchStatus::Aborted);
        }
        space.expanded += 1;

        if exits_on_goal && gen.is_goal(space.graph.get(node).stones()) {
            space.log_stats(policy.name());
            return space.solved(node);
        }

        let successors = gen.successors(space.graph.get(node), node, heuristic);
        for (_, child) in successors {
            let priority = policy.priority(&child);
            let offer = space.offer(child, |new, current, _| policy.improves(new, current));
            if let Some(id) = offer.node() {
                open.push(HeapEntry::new(priority, space.graph.get(id), id));
            }
        }
        space.observe_frontier::<HeapEntry>(open.len());
    }

    space.log_stats(policy.name());
    match cheapest_goal(gen, &space) {
        Some(node) if !exits_on_goal => space.solved(node),
        _ => space.finish(SearchStatus::Impossible),
    }
}

/// Scans every closed state in creation order for the lowest-cost goal.
fn cheapest_goal(gen: &MoveGenerator<'_>, space: &SearchSpace) -> Option<NodeId> {
    let mut best: Option<(u32, NodeId)> = None;
    for (id, state) in space.graph.iter() {
        if !gen.is_goal(state.stones()) || !space.is_current(id) {
            continue;
        }
        if best.map_or(true, |(g, _)| state.g < g) {
            best = Some((state.g, id));
        }
    }
    best.map(|(_, id)| id)
}
