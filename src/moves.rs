//! Move legality and successor generation.

use arrayvec::ArrayVec;

use crate::config::SolverConfig;
use crate::deadlock::{has_freeze_deadlock, SimpleDeadlockMap, Visiting};
use crate::error::ReplayError;
use crate::grid::{Direction, Move, Point};
use crate::heuristic::Heuristic;
use crate::level::Level;
use crate::state::{NodeId, ProblemState, StateKey, StoneSet};

pub type Successors = ArrayVec<(Direction, ProblemState), 4>;

/// Outcome of stepping a move string through a level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Replay {
    pub player: Point,
    pub stones: StoneSet,
    pub steps: usize,
    /// Sum of the weights of every pushed stone.
    pub weight: u64,
    /// Path cost under the generator's weighting.
    pub cost: u64,
    pub solved: bool,
}

pub struct MoveGenerator<'a> {
    level: &'a Level,
    simple: SimpleDeadlockMap,
    use_deadlock: bool,
    weighted: bool,
}

impl<'a> MoveGenerator<'a> {
    pub fn new(level: &'a Level, config: &SolverConfig) -> Self {
        let simple = SimpleDeadlockMap::compute(level.grid(), level.switches());
        log::debug!("simple deadlock cells: {}", simple.count());
        MoveGenerator {
            level,
            simple,
            use_deadlock: config.use_deadlock,
            weighted: config.weighted,
        }
    }

    #[inline(always)]
    pub fn level(&self) -> &'a Level {
        self.level
    }

    pub fn simple_deadlocks(&self) -> &SimpleDeadlockMap {
        &self.simple
    }

    pub fn initial_state(&self) -> ProblemState {
        ProblemState::root(self.level.player(), self.level.stones().clone())
    }

    /// Same as [`initial_state`](Self::initial_state) with `h` filled in.
    pub fn initial_state_with(&self, heuristic: Heuristic) -> ProblemState {
        let mut state = self.initial_state();
        state.h = Some(heuristic.estimate(state.stones(), self.level.switches()));
        state
    }

    #[inline]
    pub fn is_goal(&self, stones: &StoneSet) -> bool {
        stones.len() == self.level.switches().len()
            && stones.positions().eq(self.level.switches().iter().copied())
    }

    #[inline]
    pub fn can_move(&self, state: &ProblemState, dir: Direction) -> bool {
        self.legal(&state.key, dir, self.use_deadlock)
    }

    /// Legality of moving the player of `key` one cell in `dir`.
    pub fn legal(&self, key: &StateKey, dir: Direction, prune: bool) -> bool {
        let grid = self.level.grid();
        let target = key.player.step(dir);

        if grid.is_wall(target) {
            return false;
        }
        if !key.stones.contains(target) {
            return true;
        }

        // Off-grid reads as wall, so stones are never pushed out of the grid.
        let beyond = target.step(dir);
        if grid.is_wall(beyond) || key.stones.contains(beyond) {
            return false;
        }
        if !prune {
            return true;
        }
        if self.simple.is_dead(beyond) {
            return false;
        }

        let pushed = key.stones.moved(target, beyond);
        !has_freeze_deadlock(beyond, self.level, &pushed, &self.simple, &Visiting::new())
    }

    /// Successor of `state` after moving in `dir`; legality is the caller's
    /// business. `ancestor` is the arena id of `state`, when it has one.
    pub fn apply_move(
        &self,
        state: &ProblemState,
        ancestor: Option<NodeId>,
        dir: Direction,
        heuristic: Option<Heuristic>,
    ) -> ProblemState {
        let player = state.player().step(dir);
        let pushed = state.stones().get(player);

        let stones = match pushed {
            Some(_) => state.stones().moved(player, player.step(dir)),
            None => state.stones().clone(),
        };

        let step_cost = match pushed {
            Some(stone) if self.weighted => stone.weight,
            _ => 1,
        };
        let g = state.g.saturating_add(step_cost);
        let h = heuristic.map(|h| h.estimate(&stones, self.level.switches()));

        ProblemState {
            key: StateKey { player, stones },
            g,
            h,
            ancestor,
            pushed,
        }
    }

    /// Every legal successor in `Direction::ALL` order.
    pub fn successors(
        &self,
        state: &ProblemState,
        ancestor: NodeId,
        heuristic: Option<Heuristic>,
    ) -> Successors {
        let mut out = Successors::new();
        for dir in Direction::ALL {
            if self.can_move(state, dir) {
                out.push((dir, self.apply_move(state, Some(ancestor), dir, heuristic)));
            }
        }
        out
    }

    /// Steps `path` from the initial state checking physical legality only
    /// (walls and stones, no deadlock pruning). Push codes must match.
    pub fn replay(&self, path: &str) -> Result<Replay, ReplayError> {
        let mut state = self.initial_state();
        let mut weight = 0u64;
        let mut steps = 0usize;

        for (index, ch) in path.chars().enumerate() {
            let mv = Move::from_char(ch).ok_or(ReplayError::UnknownMove { index, ch })?;
            if !self.legal(&state.key, mv.dir, false) {
                return Err(ReplayError::IllegalMove { index, ch });
            }
            let next = self.apply_move(&state, None, mv.dir, None);
            if next.pushed.is_some() != mv.push {
                return Err(ReplayError::IllegalMove { index, ch });
            }
            weight += next.pushed.map_or(0, |s| s.weight as u64);
            steps += 1;
            state = next;
        }

        Ok(Replay {
            solved: self.is_goal(state.stones()),
            player: state.player(),
            cost: state.g as u64,
            stones: state.key.stones,
            steps,
            weight,
        })
    }

    /// [`replay`](Self::replay) that also requires the path to end solved.
    pub fn validate(&self, path: &str) -> Result<Replay, ReplayError> {
        let replay = self.replay(path)?;
        if !replay.solved {
            let misplaced = replay
                .stones
                .positions()
                .filter(|&p| !self.level.is_switch(p))
                .count();
            return Err(ReplayError::NotSolved { misplaced });
        }
        Ok(replay)
    }
}
