//! Weighted Sokoban solver.
//!
//! Stones carry integer weights and pushing a stone costs its weight. The
//! crate parses level text, precomputes dead squares, and runs one of ten
//! search strategies over (player, stones) states:
//!
//! ```no_run
//! use weighted_sokoban::{Algorithm, Solver, SolverConfig};
//!
//! let level = "3 1\n#######\n#@ $ .#\n# $ . #\n#######\n";
//! let solver = Solver::from_text(level, SolverConfig::default()).unwrap();
//! let report = solver.run(Algorithm::AStar);
//! print!("{}", report);
//! ```

pub mod config;
pub mod deadlock;
pub mod error;
pub mod grid;
pub mod heuristic;
pub mod level;
pub mod moves;
pub mod search;
pub mod solver;
pub mod state;

pub use config::{AntColonyConfig, SearchLimits, SolverConfig};
pub use error::{LevelError, ReplayError, ReportParseError};
pub use grid::{Direction, Move, Point};
pub use heuristic::Heuristic;
pub use level::Level;
pub use moves::{MoveGenerator, Replay};
pub use search::{Algorithm, SearchOutcome, SearchStatus};
pub use solver::{Report, Solver};
pub use state::{ProblemState, StateKey, Stone, StoneSet};
