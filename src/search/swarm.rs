//! Swarm-flavoured best-first searches.
//!
//! - `swarm`: f-ordered with random tie-breaking; a closed state may be
//!   reopened once at up to 110% of its best known cost, which spreads the
//!   search over near-optimal alternatives. Not cost-optimal.
//! - `convergent`: heuristic-only ordering, every state is closed on first
//!   sight.
//! - `bidirectional`: a forward search from the start and a backward search
//!   (reverse steps and pulls) from the solved configuration, alternating
//!   one expansion each until some state is closed on both sides. The
//!   forward side alone decides impossibility.

use std::collections::BinaryHeap;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::{HeapEntry, Offer, Record, SearchOutcome, SearchSpace, SearchStatus};
use crate::config::SolverConfig;
use crate::grid::{Direction, Move, Point};
use crate::heuristic::Heuristic;
use crate::moves::MoveGenerator;
use crate::state::{NodeId, ProblemState, StateKey, Stone, StoneSet};

/// Reopen threshold as a ratio: `new_g / best_g <= 11 / 10`.
const REOPEN_NUM: u64 = 11;
const REOPEN_DEN: u64 = 10;

/// Decides whether a repeat offer for a known key replaces its record.
type ReopenRule = fn(&ProblemState, &mut Record) -> bool;

/// Strict improvements always win. Otherwise a closed state is reopened at
/// most once, and only within 110% of its best cost.
fn diversifying_reopen(new: &ProblemState, record: &mut Record) -> bool {
    if new.g < record.best_g {
        return true;
    }
    let within = new.g as u64 * REOPEN_DEN <= record.best_g as u64 * REOPEN_NUM;
    if within && !record.in_frontier && !record.diversified {
        record.diversified = true;
        return true;
    }
    false
}

pub(super) fn swarm(gen: &MoveGenerator<'_>, config: &SolverConfig) -> SearchOutcome {
    swarm_in(&mut SearchSpace::new(), gen, config, diversifying_reopen)
}

fn swarm_in(
    space: &mut SearchSpace,
    gen: &MoveGenerator<'_>,
    config: &SolverConfig,
    reopen: ReopenRule,
) -> SearchOutcome {
    let heuristic = config.heuristic;
    let mut rng = SmallRng::seed_from_u64(config.seed);
    let mut budget = config.limits.start();

    let root = space.insert_root(gen.initial_state_with(heuristic));
    if gen.is_goal(space.graph.get(root).stones()) {
        return space.solved(root);
    }

    let mut open = BinaryHeap::with_capacity(1024);
    let root_state = space.graph.get(root);
    open.push(HeapEntry {
        tie: rng.gen(),
        ..HeapEntry::new(root_state.f(), root_state, root)
    });

    while let Some(HeapEntry { node, .. }) = open.pop() {
        if !space.take(node) {
            continue;
        }
        if !budget.spend() {
            space.log_stats("swarm");
            return space.finish(SearchStatus::Aborted);
        }
        space.expanded += 1;

        let successors = gen.successors(space.graph.get(node), node, Some(heuristic));
        for (_, child) in successors {
            let goal = gen.is_goal(child.stones());
            let offer = space.offer(child, |new, _, record| reopen(new, record));
            let Some(id) = offer.node() else {
                continue;
            };
            if goal {
                space.log_stats("swarm");
                return space.solved(id);
            }
            let state = space.graph.get(id);
            open.push(HeapEntry {
                tie: rng.gen(),
                ..HeapEntry::new(state.f(), state, id)
            });
        }
        space.observe_frontier::<HeapEntry>(open.len());
    }

    space.log_stats("swarm");
    space.finish(SearchStatus::Impossible)
}

pub(super) fn convergent(gen: &MoveGenerator<'_>, config: &SolverConfig) -> SearchOutcome {
    let heuristic = config.heuristic;
    let mut space = SearchSpace::new();
    let mut budget = config.limits.start();

    let root = space.insert_root(gen.initial_state_with(heuristic));
    if gen.is_goal(space.graph.get(root).stones()) {
        return space.solved(root);
    }

    let mut open = BinaryHeap::with_capacity(1024);
    let root_state = space.graph.get(root);
    open.push(HeapEntry::new(root_state.h.unwrap_or(0), root_state, root));

    while let Some(HeapEntry { node, .. }) = open.pop() {
        space.take(node);
        if !budget.spend() {
            space.log_stats("convergent swarm");
            return space.finish(SearchStatus::Aborted);
        }
        space.expanded += 1;

        let successors = gen.successors(space.graph.get(node), node, Some(heuristic));
        for (_, child) in successors {
            let goal = gen.is_goal(child.stones());
            if let Offer::New(id) = space.offer(child, |_, _, _| false) {
                if goal {
                    space.log_stats("convergent swarm");
                    return space.solved(id);
                }
                let state = space.graph.get(id);
                open.push(HeapEntry::new(state.h.unwrap_or(0), state, id));
            }
        }
        space.observe_frontier::<HeapEntry>(open.len());
    }

    space.log_stats("convergent swarm");
    space.finish(SearchStatus::Impossible)
}

/// Position-only identity used to match forward and backward states.
fn positions_key(key: &StateKey) -> StateKey {
    StateKey {
        player: key.player,
        stones: key.stones.unweighted(),
    }
}

/// Side of the bidirectional search that generates predecessors.
struct Backward<'g, 'a> {
    gen: &'g MoveGenerator<'a>,
    heuristic: Heuristic,
    /// Initial stone positions: the backward search's goal.
    targets: SmallVec<[Point; 16]>,
    prune: bool,
}

impl Backward<'_, '_> {
    fn state(
        &self,
        player: Point,
        stones: StoneSet,
        g: u32,
        ancestor: Option<NodeId>,
        pushed: Option<Stone>,
    ) -> ProblemState {
        let h = self.heuristic.estimate(&stones, &self.targets);
        ProblemState {
            key: StateKey { player, stones },
            g,
            h: Some(h),
            ancestor,
            pushed,
        }
    }

    /// Solved configuration with the player on every free cell next to a
    /// switch; the last push of any solution leaves the player there.
    fn seeds(&self) -> Vec<ProblemState> {
        let level = self.gen.level();
        let grid = level.grid();
        let stones = StoneSet::from_stones(level.switches().iter().map(|&p| Stone::new(p, 1)))
            .unwrap_or_default();

        let mut players: SmallVec<[Point; 32]> = SmallVec::new();
        for &switch in level.switches() {
            for dir in Direction::ALL {
                let p = switch.step(dir);
                if !grid.is_wall(p) && !stones.contains(p) && !players.contains(&p) {
                    players.push(p);
                }
            }
        }
        players.sort_unstable();
        players
            .into_iter()
            .map(|p| self.state(p, stones.clone(), 0, None, None))
            .collect()
    }

    /// States from which one legal forward move reaches `state`. Each
    /// predecessor's ancestor is `node`, and `pushed` marks a forward push.
    fn predecessors(&self, state: &ProblemState, node: NodeId) -> SmallVec<[ProblemState; 8]> {
        let grid = self.gen.level().grid();
        let player = state.player();
        let stones = state.stones();
        let mut out = SmallVec::new();

        for dir in Direction::ALL {
            let from = player.step(dir.opposite());
            if grid.is_wall(from) || stones.contains(from) {
                continue;
            }
            let g = state.g.saturating_add(1);

            out.push(self.state(from, stones.clone(), g, Some(node), None));

            let ahead = player.step(dir);
            if let Some(stone) = stones.get(ahead) {
                let pulled = stones.moved(ahead, player);
                let key = StateKey {
                    player: from,
                    stones: pulled,
                };
                if self.gen.legal(&key, dir, self.prune) {
                    let pushed = Some(Stone::new(player, stone.weight));
                    out.push(self.state(from, key.stones, g, Some(node), pushed));
                }
            }
        }
        out
    }

    /// Forward moves from `node` down its backward ancestor chain to a seed.
    fn moves_to_goal(space: &SearchSpace, node: NodeId) -> Vec<Move> {
        let mut moves = Vec::new();
        let mut current = space.graph.get(node);
        while let Some(next) = current.ancestor {
            let after = space.graph.get(next);
            if let Some(dir) = Direction::between(current.player(), after.player()) {
                moves.push(Move::new(dir, current.pushed.is_some()));
            }
            current = after;
        }
        moves
    }
}

pub(super) fn bidirectional(gen: &MoveGenerator<'_>, config: &SolverConfig) -> SearchOutcome {
    let heuristic = config.heuristic;
    let mut budget = config.limits.start();

    let mut fwd = SearchSpace::new();
    let root = fwd.insert_root(gen.initial_state_with(heuristic));
    if gen.is_goal(fwd.graph.get(root).stones()) {
        return fwd.solved(root);
    }

    let backward = Backward {
        gen,
        heuristic,
        targets: gen.level().stones().positions().collect(),
        prune: config.use_deadlock,
    };

    let mut bwd = SearchSpace::new();
    let mut fwd_open = BinaryHeap::with_capacity(1024);
    let mut bwd_open = BinaryHeap::with_capacity(1024);
    // Forward states closed so far, by position-only key.
    let mut fwd_closed: FxHashMap<StateKey, NodeId> = FxHashMap::default();

    let root_state = fwd.graph.get(root);
    fwd_open.push(HeapEntry::new(root_state.h.unwrap_or(0), root_state, root));
    for seed in backward.seeds() {
        if let Offer::New(id) = bwd.offer(seed, |_, _, _| false) {
            let state = bwd.graph.get(id);
            bwd_open.push(HeapEntry::new(state.h.unwrap_or(0), state, id));
        }
    }

    let finish = |fwd: &SearchSpace, bwd: &SearchSpace, status| {
        fwd.log_stats("bidirectional swarm (forward)");
        bwd.log_stats("bidirectional swarm (backward)");
        combine(fwd.finish(status), bwd)
    };

    loop {
        // forward half-step
        let Some(HeapEntry { node, .. }) = fwd_open.pop() else {
            return finish(&fwd, &bwd, SearchStatus::Impossible);
        };
        fwd.take(node);
        if !budget.spend() {
            return finish(&fwd, &bwd, SearchStatus::Aborted);
        }
        fwd.expanded += 1;

        let state = fwd.graph.get(node);
        if gen.is_goal(state.stones()) {
            fwd.log_stats("bidirectional swarm (forward)");
            return combine(fwd.solved(node), &bwd);
        }
        let key = positions_key(&state.key);
        if let Some(meet) = bwd.is_closed(&key) {
            if let Some(outcome) = join(gen, &fwd, node, &bwd, meet) {
                return outcome;
            }
        }
        fwd_closed.insert(key, node);

        let successors = gen.successors(fwd.graph.get(node), node, Some(heuristic));
        for (_, child) in successors {
            if let Offer::New(id) = fwd.offer(child, |_, _, _| false) {
                let state = fwd.graph.get(id);
                fwd_open.push(HeapEntry::new(state.h.unwrap_or(0), state, id));
            }
        }
        fwd.observe_frontier::<HeapEntry>(fwd_open.len());

        // backward half-step; once it runs dry the forward side goes on alone
        let Some(HeapEntry { node, .. }) = bwd_open.pop() else {
            continue;
        };
        bwd.take(node);
        if !budget.spend() {
            return finish(&fwd, &bwd, SearchStatus::Aborted);
        }
        bwd.expanded += 1;

        if let Some(&meet) = fwd_closed.get(&bwd.graph.get(node).key) {
            if let Some(outcome) = join(gen, &fwd, meet, &bwd, node) {
                return outcome;
            }
        }

        let predecessors = backward.predecessors(bwd.graph.get(node), node);
        for pred in predecessors {
            if let Offer::New(id) = bwd.offer(pred, |_, _, _| false) {
                let state = bwd.graph.get(id);
                bwd_open.push(HeapEntry::new(state.h.unwrap_or(0), state, id));
            }
        }
        bwd.observe_frontier::<HeapEntry>(bwd_open.len());
    }
}

/// Adds the backward side's expansions and memory to a forward outcome.
/// `explored` stays the forward count: backward states live in a different
/// space (unweighted stones, reverse moves).
fn combine(mut outcome: SearchOutcome, bwd: &SearchSpace) -> SearchOutcome {
    outcome.expanded += bwd.expanded;
    outcome.peak_memory += bwd.footprint();
    outcome
}

/// Forward path to `fwd_node` followed by the backward chain from
/// `bwd_node`, priced by replaying it on the level.
fn join(
    gen: &MoveGenerator<'_>,
    fwd: &SearchSpace,
    fwd_node: NodeId,
    bwd: &SearchSpace,
    bwd_node: NodeId,
) -> Option<SearchOutcome> {
    let path: String = fwd
        .graph
        .moves_to(fwd_node)
        .into_iter()
        .chain(Backward::moves_to_goal(bwd, bwd_node))
        .map(Move::to_char)
        .collect();

    match gen.validate(&path) {
        Ok(replay) => {
            fwd.log_stats("bidirectional swarm (forward)");
            bwd.log_stats("bidirectional swarm (backward)");
            let outcome = SearchOutcome {
                status: SearchStatus::Solved,
                path,
                weight: replay.weight,
                cost: replay.cost,
                expanded: fwd.expanded,
                explored: fwd.explored(),
                peak_memory: fwd.footprint(),
            };
            Some(combine(outcome, bwd))
        }
        Err(err) => {
            log::warn!("bidirectional swarm: discarded joined path {:?}: {}", path, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;

    const SIMPLE: &str = "#######\n#.    #\n#  $  #\n#  @  #\n#######\n";

    fn backward<'g, 'a>(gen: &'g MoveGenerator<'a>) -> Backward<'g, 'a> {
        Backward {
            gen,
            heuristic: Heuristic::Matching,
            targets: gen.level().stones().positions().collect(),
            prune: true,
        }
    }

    #[test]
    fn test_seeds_surround_switches() {
        let level = Level::parse(SIMPLE).unwrap();
        let gen = MoveGenerator::new(&level, &SolverConfig::default());
        let seeds = backward(&gen).seeds();
        let players: Vec<_> = seeds.iter().map(|s| s.player()).collect();
        assert_eq!(players, vec![Point::new(1, 2), Point::new(2, 1)]);
        assert!(seeds.iter().all(|s| s.stones().contains(Point::new(1, 1))));
    }

    #[test]
    fn test_predecessors_are_forward_legal() {
        let level = Level::parse(SIMPLE).unwrap();
        let gen = MoveGenerator::new(&level, &SolverConfig::default());
        let bw = backward(&gen);
        let seed = bw.state(
            Point::new(1, 2),
            StoneSet::from_stones([Stone::new(Point::new(1, 1), 1)]).unwrap(),
            0,
            None,
            None,
        );
        for pred in bw.predecessors(&seed, NodeId(0)) {
            let dir = Direction::between(pred.player(), seed.player()).unwrap();
            assert!(gen.legal(&pred.key, dir, true));
            let after = gen.apply_move(&pred, None, dir, None);
            assert_eq!(after.key, seed.key);
            assert_eq!(after.pushed.is_some(), pred.pushed.is_some());
        }
        // player at (1,2) came from (1,3) either stepping or pushing left
        assert!(bw
            .predecessors(&seed, NodeId(0))
            .iter()
            .any(|p| p.pushed.is_some() && p.stones().contains(Point::new(1, 2))));
    }

    #[test]
    fn test_bidirectional_solves_simple_level() {
        let level = Level::parse(SIMPLE).unwrap();
        let config = SolverConfig::default();
        let gen = MoveGenerator::new(&level, &config);
        let outcome = bidirectional(&gen, &config);
        assert!(outcome.is_solved());
        let replay = gen.replay(&outcome.path).unwrap();
        assert!(replay.solved);
        assert_eq!(replay.weight, outcome.weight);
    }

    fn at(col: i16, g: u32) -> ProblemState {
        let mut state = ProblemState::root(Point::new(1, col), StoneSet::new());
        state.g = g;
        state
    }

    fn strict_only(new: &ProblemState, record: &mut Record) -> bool {
        new.g < record.best_g
    }

    #[test]
    fn test_reopen_within_ten_percent_once() {
        let mut space = SearchSpace::new();
        let first = space.insert_root(at(1, 20));
        assert!(space.take(first));

        // 10% of 20 is 2: 22 reopens the closed state
        let offer = space.offer(at(1, 22), |new, _, r| diversifying_reopen(new, r));
        let second = offer.node().unwrap();
        assert_eq!(space.reopened, 1);
        assert!(space.table[&at(1, 0).key].diversified);
        assert_eq!(space.table[&at(1, 0).key].best_g, 20);
        assert!(space.take(second));

        // only once per state
        let offer = space.offer(at(1, 21), |new, _, r| diversifying_reopen(new, r));
        assert!(matches!(offer, Offer::Rejected));

        // strict improvements are always accepted
        let offer = space.offer(at(1, 19), |new, _, r| diversifying_reopen(new, r));
        assert!(matches!(offer, Offer::Updated(_)));
        assert_eq!(space.reopened, 2);
        assert_eq!(space.table[&at(1, 0).key].best_g, 19);
    }

    #[test]
    fn test_reopen_rejects_beyond_threshold_and_open_states() {
        let mut space = SearchSpace::new();
        let closed = space.insert_root(at(1, 20));
        assert!(space.take(closed));
        let offer = space.offer(at(1, 23), |new, _, r| diversifying_reopen(new, r));
        assert!(matches!(offer, Offer::Rejected));

        // still in the frontier: equal or worse costs never replace it
        space.offer(at(2, 20), |_, _, _| false);
        let offer = space.offer(at(2, 21), |new, _, r| diversifying_reopen(new, r));
        assert!(matches!(offer, Offer::Rejected));
        assert!(!space.table[&at(2, 0).key].diversified);
        assert_eq!(space.reopened, 0);
    }

    #[test]
    fn test_long_corridor_reopens_closed_states() {
        // The stone is frozen in the corner, so only the player moves. Far
        // enough down the corridor, stepping back costs at most 10% more than
        // the cell's first visit.
        let text = format!("{0}\n#$@{1}.#\n{0}\n", "#".repeat(35), " ".repeat(30));
        let level = Level::parse(&text).unwrap();
        let config = SolverConfig::default();
        let gen = MoveGenerator::new(&level, &config);

        let mut strict = SearchSpace::new();
        let plain = swarm_in(&mut strict, &gen, &config, strict_only);
        assert_eq!(plain.status, SearchStatus::Impossible);
        assert_eq!(strict.reopened, 0);
        assert_eq!(plain.explored, 32);
        assert_eq!(plain.expanded, 32);

        let mut diverse = SearchSpace::new();
        let spread = swarm_in(&mut diverse, &gen, &config, diversifying_reopen);
        assert_eq!(spread.status, SearchStatus::Impossible);
        assert_eq!(spread.explored, 32);
        assert!(diverse.reopened > 0);
        assert_eq!(spread.expanded, 32 + diverse.reopened);
    }
}
