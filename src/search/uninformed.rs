//! Breadth-first and depth-first search. First visit wins and goals are
//! recognised as soon as they are generated.

use std::collections::VecDeque;

use super::{Offer, SearchOutcome, SearchSpace, SearchStatus};
use crate::config::SolverConfig;
use crate::moves::MoveGenerator;
use crate::state::NodeId;

pub(super) fn breadth_first(gen: &MoveGenerator<'_>, config: &SolverConfig) -> SearchOutcome {
    let mut space = SearchSpace::new();
    let mut budget = config.limits.start();
    let root = space.insert_root(gen.initial_state());
    if gen.is_goal(space.graph.get(root).stones()) {
        return space.solved(root);
    }

    let mut open = VecDeque::with_capacity(1024);
    open.push_back(root);

    while let Some(node) = open.pop_front() {
        space.take(node);
        if !budget.spend() {
            return space.finish(SearchStatus::Aborted);
        }
        space.expanded += 1;

        let successors = gen.successors(space.graph.get(node), node, None);
        for (_, child) in successors {
            let goal = gen.is_goal(child.stones());
            if let Offer::New(id) = space.offer(child, |_, _, _| false) {
                if goal {
                    space.log_stats("bfs");
                    return space.solved(id);
                }
                open.push_back(id);
            }
        }
        space.observe_frontier::<NodeId>(open.len());
    }

    space.log_stats("bfs");
    space.finish(SearchStatus::Impossible)
}

pub(super) fn depth_first(gen: &MoveGenerator<'_>, config: &SolverConfig) -> SearchOutcome {
    let mut space = SearchSpace::new();
    let mut budget = config.limits.start();
    let root = space.insert_root(gen.initial_state());
    if gen.is_goal(space.graph.get(root).stones()) {
        return space.solved(root);
    }

    let mut open = Vec::with_capacity(1024);
    open.push(root);

    while let Some(node) = open.pop() {
        space.take(node);
        if !budget.spend() {
            return space.finish(SearchStatus::Aborted);
        }
        space.expanded += 1;

        let successors = gen.successors(space.graph.get(node), node, None);
        // Reversed so the first direction is explored first.
        for (_, child) in successors.into_iter().rev() {
            let goal = gen.is_goal(child.stones());
            if let Offer::New(id) = space.offer(child, |_, _, _| false) {
                if goal {
                    space.log_stats("dfs");
                    return space.solved(id);
                }
                open.push(id);
            }
        }
        space.observe_frontier::<NodeId>(open.len());
    }

    space.log_stats("dfs");
    space.finish(SearchStatus::Impossible)
}
