//! Ant colony optimisation.
//!
//! Each iteration sends `num_ants` independent random walks from the start.
//! An ant picks its next move with probability proportional to
//! `tau^alpha * (1 / (1 + h))^beta`, where `tau` is the pheromone on the
//! (state, direction) edge and `h` the heuristic of the successor. Trails
//! evaporate once per iteration, then every ant that reached the goal
//! deposits `1 / cost` on each edge it used.

use std::mem::size_of;

use arrayvec::ArrayVec;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rustc_hash::{FxHashMap, FxHashSet};

use super::{SearchOutcome, SearchStatus};
use crate::config::{AntColonyConfig, Budget, SolverConfig};
use crate::grid::{Direction, Move};
use crate::heuristic::Heuristic;
use crate::moves::MoveGenerator;
use crate::state::{ProblemState, StateKey};

const INITIAL_PHEROMONE: f64 = 1.0;

/// Pheromone per direction, indexed by `Direction as usize`.
type Trails = [f64; 4];

/// A walk that reached the goal.
#[derive(Clone, Debug)]
struct Walk {
    edges: Vec<(StateKey, Direction)>,
    path: String,
    weight: u64,
    cost: u64,
}

struct Colony<'g, 'a> {
    gen: &'g MoveGenerator<'a>,
    heuristic: Heuristic,
    params: AntColonyConfig,
    rng: SmallRng,
    budget: Budget,
    pheromone: FxHashMap<StateKey, Trails>,
    seen: FxHashSet<StateKey>,
    steps: u64,
    aborted: bool,
}

impl<'g, 'a> Colony<'g, 'a> {
    fn new(gen: &'g MoveGenerator<'a>, config: &SolverConfig) -> Self {
        Colony {
            gen,
            heuristic: config.heuristic,
            params: config.ant_colony,
            rng: SmallRng::seed_from_u64(config.seed),
            budget: config.limits.start(),
            pheromone: FxHashMap::default(),
            seen: FxHashSet::default(),
            steps: 0,
            aborted: false,
        }
    }

    fn trail(&self, key: &StateKey, dir: Direction) -> f64 {
        self.pheromone
            .get(key)
            .map_or(INITIAL_PHEROMONE, |t| t[dir as usize])
    }

    fn desirability(&self, key: &StateKey, dir: Direction, next: &ProblemState) -> f64 {
        let tau = self.trail(key, dir);
        let eta = 1.0 / (1.0 + next.h.unwrap_or(0) as f64);
        tau.powf(self.params.alpha) * eta.powf(self.params.beta)
    }

    /// Index drawn proportionally to `weights`, uniformly when they cannot
    /// form a distribution (all zero or not finite).
    fn choose(&mut self, weights: &[f64]) -> usize {
        match WeightedIndex::new(weights) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => self.rng.gen_range(0..weights.len()),
        }
    }

    /// One ant. Returns `None` when it dies at a dead end, runs out of
    /// steps, or the budget runs out (which also sets `aborted`).
    fn walk(&mut self, start: &ProblemState) -> Option<Walk> {
        let mut state = start.clone();
        let mut tabu = FxHashSet::default();
        tabu.insert(state.key.clone());

        let mut edges = Vec::new();
        let mut path = String::new();
        let mut weight = 0u64;

        for _ in 0..self.params.max_walk {
            if !self.budget.spend() {
                self.aborted = true;
                return None;
            }
            self.steps += 1;

            let mut candidates: ArrayVec<(Direction, ProblemState), 4> = ArrayVec::new();
            let mut weights: ArrayVec<f64, 4> = ArrayVec::new();
            for dir in Direction::ALL {
                if !self.gen.can_move(&state, dir) {
                    continue;
                }
                let next = self.gen.apply_move(&state, None, dir, Some(self.heuristic));
                if tabu.contains(&next.key) {
                    continue;
                }
                weights.push(self.desirability(&state.key, dir, &next));
                candidates.push((dir, next));
            }
            if candidates.is_empty() {
                return None;
            }

            let pick = self.choose(&weights);
            let (dir, next) = candidates.into_iter().nth(pick)?;

            self.seen.insert(next.key.clone());
            tabu.insert(next.key.clone());
            edges.push((state.key.clone(), dir));
            path.push(Move::new(dir, next.pushed.is_some()).to_char());
            weight += next.pushed.map_or(0, |s| s.weight as u64);
            state = next;

            if self.gen.is_goal(state.stones()) {
                return Some(Walk {
                    edges,
                    path,
                    weight,
                    cost: state.g as u64,
                });
            }
        }
        None
    }

    fn evaporate(&mut self) {
        let keep = 1.0 - self.params.evaporation_rate;
        for trails in self.pheromone.values_mut() {
            for tau in trails.iter_mut() {
                *tau *= keep;
            }
        }
    }

    fn deposit(&mut self, walk: &Walk) {
        let amount = 1.0 / walk.cost.max(1) as f64;
        for (key, dir) in &walk.edges {
            let trails = self
                .pheromone
                .entry(key.clone())
                .or_insert([INITIAL_PHEROMONE; 4]);
            trails[*dir as usize] += amount;
        }
    }

    fn footprint(&self) -> usize {
        self.pheromone.capacity() * (size_of::<StateKey>() + size_of::<Trails>() + 8)
            + self.seen.capacity() * (size_of::<StateKey>() + 8)
    }

    fn outcome(&self, status: SearchStatus, best: Option<Walk>) -> SearchOutcome {
        let (status, path, weight, cost) = match best {
            Some(walk) => (SearchStatus::Solved, walk.path, walk.weight, walk.cost),
            None => (status, String::new(), 0, 0),
        };
        SearchOutcome {
            status,
            path,
            weight,
            cost,
            expanded: self.steps,
            explored: self.seen.len() as u64,
            peak_memory: self.footprint(),
        }
    }
}

pub(super) fn search(gen: &MoveGenerator<'_>, config: &SolverConfig) -> SearchOutcome {
    let mut colony = Colony::new(gen, config);
    let start = gen.initial_state_with(config.heuristic);
    colony.seen.insert(start.key.clone());

    if gen.is_goal(start.stones()) {
        return colony.outcome(SearchStatus::Solved, None);
    }

    let mut best: Option<Walk> = None;
    for iteration in 0..colony.params.iterations {
        let mut arrived = Vec::new();
        for _ in 0..colony.params.num_ants {
            if let Some(walk) = colony.walk(&start) {
                arrived.push(walk);
            }
            if colony.aborted {
                break;
            }
        }

        // Trails from earlier iterations decay before this round's deposit.
        colony.evaporate();
        for walk in &arrived {
            colony.deposit(walk);
        }
        if let Some(cheapest) = arrived.into_iter().min_by_key(|w| w.cost) {
            if best.as_ref().map_or(true, |b| cheapest.cost < b.cost) {
                best = Some(cheapest);
            }
        }

        log::trace!(
            "ant colony: iteration {} steps={} trails={} best={:?}",
            iteration,
            colony.steps,
            colony.pheromone.len(),
            best.as_ref().map(|b| b.cost)
        );
        if colony.aborted {
            return colony.outcome(SearchStatus::Aborted, best);
        }
    }

    log::debug!(
        "ant colony: steps={} explored={} trails={}",
        colony.steps,
        colony.seen.len(),
        colony.pheromone.len()
    );
    colony.outcome(SearchStatus::Impossible, best)
}
