use std::time::{Duration, Instant};

use crate::heuristic::Heuristic;

/// Knobs shared by every strategy run.
#[derive(Clone, Debug)]
pub struct SolverConfig {
    pub heuristic: Heuristic,
    /// Prune pushes into simple and freeze deadlocks.
    pub use_deadlock: bool,
    /// When false every move costs 1 regardless of stone weight.
    pub weighted: bool,
    pub limits: SearchLimits,
    /// Stop Dijkstra at the first goal pop instead of exhausting the space
    /// and scanning for the cheapest goal.
    pub dijkstra_early_exit: bool,
    /// Seeds Swarm tie-breaking and the ant colony.
    pub seed: u64,
    pub ant_colony: AntColonyConfig,
    /// Run the selected algorithms on the rayon pool.
    pub parallel: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            heuristic: Heuristic::Matching,
            use_deadlock: true,
            weighted: true,
            limits: SearchLimits::default(),
            dijkstra_early_exit: false,
            seed: 514514,
            ant_colony: AntColonyConfig::default(),
            parallel: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchLimits {
    pub max_expansions: Option<u64>,
    pub time_limit: Option<Duration>,
}

impl SearchLimits {
    pub fn unlimited() -> Self {
        SearchLimits::default()
    }

    pub fn start(&self) -> Budget {
        Budget {
            max_expansions: self.max_expansions,
            deadline: self.time_limit.map(|t| Instant::now() + t),
            expansions: 0,
        }
    }
}

/// Running budget for one search; `spend` is called once per expansion.
#[derive(Clone, Debug)]
pub struct Budget {
    max_expansions: Option<u64>,
    deadline: Option<Instant>,
    expansions: u64,
}

impl Budget {
    /// Returns false once either limit is exhausted.
    #[inline]
    pub fn spend(&mut self) -> bool {
        self.expansions += 1;
        if self.max_expansions.is_some_and(|max| self.expansions > max) {
            return false;
        }
        // Clock reads are not free; sample every 1024 expansions.
        if self.expansions % 1024 == 0 {
            if let Some(deadline) = self.deadline {
                return Instant::now() < deadline;
            }
        }
        true
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AntColonyConfig {
    pub num_ants: usize,
    pub iterations: usize,
    pub alpha: f64,
    pub beta: f64,
    pub evaporation_rate: f64,
    /// Steps after which a wandering ant gives up.
    pub max_walk: usize,
}

impl Default for AntColonyConfig {
    fn default() -> Self {
        AntColonyConfig {
            num_ants: 10,
            iterations: 100,
            alpha: 1.0,
            beta: 2.0,
            evaporation_rate: 0.5,
            max_walk: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expansion_budget() {
        let limits = SearchLimits {
            max_expansions: Some(3),
            time_limit: None,
        };
        let mut budget = limits.start();
        assert!(budget.spend());
        assert!(budget.spend());
        assert!(budget.spend());
        assert!(!budget.spend());
    }

    #[test]
    fn test_unlimited_budget() {
        let mut budget = SearchLimits::unlimited().start();
        assert!((0..5000).all(|_| budget.spend()));
    }

    #[test]
    fn test_expired_deadline() {
        let limits = SearchLimits {
            max_expansions: None,
            time_limit: Some(Duration::ZERO),
        };
        let mut budget = limits.start();
        assert!((0..2048).any(|_| !budget.spend()));
    }
}
