use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use weighted_sokoban::{Algorithm, Heuristic, SearchLimits, Solver, SolverConfig};

#[derive(Parser, Debug)]
#[command(name = "weighted-sokoban", version, about = "Weighted Sokoban solver")]
struct Args {
    /// Level file: optional weight line followed by the grid
    level: PathBuf,

    /// Algorithm to run; repeat for several, all of them when omitted
    #[arg(short, long = "algorithm", value_enum)]
    algorithms: Vec<Algorithm>,

    #[arg(long, value_enum, default_value_t = Heuristic::Matching)]
    heuristic: Heuristic,

    /// Disable simple and freeze deadlock pruning
    #[arg(long)]
    no_deadlock: bool,

    /// Charge 1 per move regardless of stone weight
    #[arg(long)]
    unweighted: bool,

    /// Seed for the randomised strategies
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    max_expansions: Option<u64>,

    #[arg(long)]
    time_limit_ms: Option<u64>,

    /// Stop Dijkstra at the first goal instead of scanning every closed state
    #[arg(long)]
    dijkstra_early_exit: bool,

    /// Run the algorithms concurrently
    #[arg(long)]
    parallel: bool,

    /// Write the reports here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log progress at info level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> SolverConfig {
        let defaults = SolverConfig::default();
        SolverConfig {
            heuristic: self.heuristic,
            use_deadlock: !self.no_deadlock,
            weighted: !self.unweighted,
            limits: SearchLimits {
                max_expansions: self.max_expansions,
                time_limit: self.time_limit_ms.map(Duration::from_millis),
            },
            dijkstra_early_exit: self.dijkstra_early_exit,
            seed: self.seed.unwrap_or(defaults.seed),
            parallel: self.parallel,
            ..defaults
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let text = fs::read_to_string(&args.level)
        .with_context(|| format!("failed to read level {}", args.level.display()))?;
    let solver = Solver::from_text(&text, args.config())
        .with_context(|| format!("invalid level {}", args.level.display()))?;

    let reports = solver.run_all(&args.algorithms);
    let output: String = reports.iter().map(ToString::to_string).collect();

    match &args.output {
        Some(path) => fs::write(path, output)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{}", output),
    }
    Ok(())
}
