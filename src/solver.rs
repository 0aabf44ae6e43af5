//! Entry point for callers: load a level, run strategies, collect reports.

use std::fmt;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::config::SolverConfig;
use crate::error::{LevelError, ReportParseError};
use crate::level::Level;
use crate::moves::MoveGenerator;
use crate::search::{Algorithm, SearchOutcome, SearchStatus};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub struct Solver {
    level: Level,
    config: SolverConfig,
}

impl Solver {
    pub fn new(level: Level, config: SolverConfig) -> Self {
        Solver { level, config }
    }

    /// Parses `text` and logs a summary of the level.
    pub fn from_text(text: &str, config: SolverConfig) -> Result<Self, LevelError> {
        let level = Level::parse(text)?;
        log::info!(
            "loaded {}x{} level: {} stones (total weight {}), {} switches",
            level.grid().rows(),
            level.grid().cols(),
            level.stones().len(),
            level.stones().total_weight(),
            level.switches().len()
        );
        log::debug!("heuristic: {}", config.heuristic);
        Ok(Solver::new(level, config))
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn run(&self, algorithm: Algorithm) -> Report {
        let gen = MoveGenerator::new(&self.level, &self.config);
        self.run_with(&gen, algorithm)
    }

    /// Runs each algorithm on its own state graph, every one of them when
    /// `algorithms` is empty. Reports come back in request order.
    pub fn run_all(&self, algorithms: &[Algorithm]) -> Vec<Report> {
        let algorithms = if algorithms.is_empty() {
            &Algorithm::ALL[..]
        } else {
            algorithms
        };
        let gen = MoveGenerator::new(&self.level, &self.config);

        if self.config.parallel {
            algorithms
                .par_iter()
                .map(|&algorithm| self.run_with(&gen, algorithm))
                .collect()
        } else {
            algorithms
                .iter()
                .map(|&algorithm| self.run_with(&gen, algorithm))
                .collect()
        }
    }

    fn run_with(&self, gen: &MoveGenerator<'_>, algorithm: Algorithm) -> Report {
        let start = Instant::now();
        let outcome = algorithm.search(gen, &self.config);
        let report = Report::new(algorithm, &outcome, start.elapsed());
        log::info!(
            "{}: {:?}, steps={} weight={} nodes={} time={:.2}ms",
            report.label,
            report.status,
            report.steps,
            report.weight,
            report.expanded,
            report.time_ms()
        );
        report
    }
}

/// One algorithm's result in the form handed to presentation code.
///
/// The text form is three lines:
///
/// ```text
/// A*
/// Steps: 5, Weight: 3, Node: 12, Time: 0.41, Memory: 0.01
/// UruLL
/// ```
///
/// `Node` is the expanded count. Cost and explored count are not part of the
/// text form and read back as 0.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    pub label: String,
    pub status: SearchStatus,
    pub steps: usize,
    pub weight: u64,
    pub cost: u64,
    pub expanded: u64,
    pub explored: u64,
    pub time: Duration,
    /// Megabytes.
    pub memory: f64,
    pub path: String,
}

impl Report {
    pub fn new(algorithm: Algorithm, outcome: &SearchOutcome, time: Duration) -> Self {
        Report {
            label: algorithm.label().to_string(),
            status: outcome.status,
            steps: outcome.path.chars().count(),
            weight: outcome.weight,
            cost: outcome.cost,
            expanded: outcome.expanded,
            explored: outcome.explored,
            time,
            memory: outcome.peak_memory as f64 / BYTES_PER_MB,
            path: outcome.path.clone(),
        }
    }

    pub fn algorithm(&self) -> Option<Algorithm> {
        Algorithm::from_label(&self.label)
    }

    pub fn is_solved(&self) -> bool {
        self.status == SearchStatus::Solved
    }

    pub fn time_ms(&self) -> f64 {
        self.time.as_secs_f64() * 1000.0
    }

    /// Reads back consecutive records as written by `Display`. Blank lines
    /// between records are skipped; the `Time (ms):` and `Memory (MB):`
    /// spellings are accepted as well.
    pub fn parse_many(text: &str) -> Result<Vec<Report>, ReportParseError> {
        let mut lines = text.lines();
        let mut reports = Vec::new();

        while let Some(label) = lines.by_ref().find(|l| !l.trim().is_empty()) {
            let record = reports.len();
            let info = lines.next().ok_or(ReportParseError::Truncated { record })?;
            // A solved zero-move record may end without its path line.
            let path = lines.next().unwrap_or("").trim();
            reports.push(parse_record(record, label.trim(), info.trim(), path)?);
        }
        Ok(reports)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.label)?;
        writeln!(
            f,
            "Steps: {}, Weight: {}, Node: {}, Time: {:.2}, Memory: {:.2}",
            self.steps,
            self.weight,
            self.expanded,
            self.time_ms(),
            self.memory
        )?;
        match self.status.sentinel() {
            Some(sentinel) => writeln!(f, "{}", sentinel),
            None => writeln!(f, "{}", self.path),
        }
    }
}

fn parse_record(record: usize, label: &str, info: &str, path: &str) -> Result<Report, ReportParseError> {
    let mut steps = None;
    let mut weight = None;
    let mut node = None;
    let mut time = None;
    let mut memory = None;

    for field in info.split(',') {
        let Some((name, value)) = field.split_once(':') else {
            continue;
        };
        // "Time (ms)" -> "Time"; "12.5 ms" -> "12.5"
        let name = name.split_whitespace().next().unwrap_or("");
        let value = value.split_whitespace().next().unwrap_or("");
        match name {
            "Steps" => steps = Some(value),
            "Weight" => weight = Some(value),
            "Node" => node = Some(value),
            "Time" => time = Some(value),
            "Memory" => memory = Some(value),
            _ => {}
        }
    }

    let status = match path {
        "Impossible" => SearchStatus::Impossible,
        "Aborted" => SearchStatus::Aborted,
        _ => SearchStatus::Solved,
    };
    let time_ms: f64 = number(record, "Time", time)?;
    if !time_ms.is_finite() || time_ms < 0.0 {
        return Err(ReportParseError::BadValue {
            record,
            field: "Time",
            value: time.unwrap_or_default().to_string(),
        });
    }

    Ok(Report {
        label: label.to_string(),
        status,
        steps: number(record, "Steps", steps)?,
        weight: number(record, "Weight", weight)?,
        cost: 0,
        expanded: number(record, "Node", node)?,
        explored: 0,
        time: Duration::from_secs_f64(time_ms / 1000.0),
        memory: number(record, "Memory", memory)?,
        path: match status {
            SearchStatus::Solved => path.to_string(),
            _ => String::new(),
        },
    })
}

fn number<T: std::str::FromStr>(
    record: usize,
    field: &'static str,
    value: Option<&str>,
) -> Result<T, ReportParseError> {
    let value = value.ok_or(ReportParseError::MissingField { record, field })?;
    value.parse().map_err(|_| ReportParseError::BadValue {
        record,
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "#######\n#.    #\n#  $  #\n#  @  #\n#######\n";

    fn report(status: SearchStatus, path: &str) -> Report {
        Report {
            label: "BFS".into(),
            status,
            steps: path.len(),
            weight: 695,
            cost: 0,
            expanded: 4321,
            explored: 0,
            time: Duration::from_micros(58_120),
            memory: 12.56,
            path: path.into(),
        }
    }

    #[test]
    fn test_display_format() {
        let r = report(SearchStatus::Solved, "uLulDrrRRRRRRurD");
        assert_eq!(
            r.to_string(),
            "BFS\nSteps: 16, Weight: 695, Node: 4321, Time: 58.12, Memory: 12.56\nuLulDrrRRRRRRurD\n"
        );
    }

    #[test]
    fn test_display_sentinels() {
        let r = Report {
            steps: 0,
            weight: 0,
            ..report(SearchStatus::Impossible, "")
        };
        assert!(r.to_string().ends_with("\nImpossible\n"));
        let r = report(SearchStatus::Aborted, "");
        assert!(r.to_string().ends_with("\nAborted\n"));
    }

    #[test]
    fn test_parse_legacy_units() {
        let text = "BFS\nSteps: 16, Weight: 695, Node: 4321, Time (ms): 58.12, Memory (MB): 12.56\nuLulDrrRRRRRRurD\n";
        let parsed = Report::parse_many(text).unwrap();
        assert_eq!(parsed.len(), 1);
        let r = &parsed[0];
        assert_eq!(r.label, "BFS");
        assert_eq!(r.algorithm(), Some(Algorithm::Bfs));
        assert_eq!(r.steps, 16);
        assert_eq!(r.weight, 695);
        assert_eq!(r.expanded, 4321);
        assert!((r.time_ms() - 58.12).abs() < 1e-6);
        assert_eq!(r.memory, 12.56);
        assert_eq!(r.path, "uLulDrrRRRRRRurD");
        assert!(r.is_solved());
    }

    #[test]
    fn test_parse_many_with_sentinels_and_empty_path() {
        let mut text = report(SearchStatus::Impossible, "").to_string();
        text.push('\n');
        text += &report(SearchStatus::Solved, "").to_string();
        let parsed = Report::parse_many(&text).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].status, SearchStatus::Impossible);
        assert!(parsed[0].path.is_empty());
        assert_eq!(parsed[1].status, SearchStatus::Solved);
        assert!(parsed[1].path.is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            Report::parse_many("BFS\n"),
            Err(ReportParseError::Truncated { record: 0 })
        );
        assert_eq!(
            Report::parse_many("BFS\nSteps: 1, Weight: 1, Node: 1, Time: 1.0\nr\n"),
            Err(ReportParseError::MissingField {
                record: 0,
                field: "Memory"
            })
        );
        assert_eq!(
            Report::parse_many("BFS\nSteps: x, Weight: 1, Node: 1, Time: 1.0, Memory: 0\nr\n"),
            Err(ReportParseError::BadValue {
                record: 0,
                field: "Steps",
                value: "x".into()
            })
        );
    }

    #[test]
    fn test_run_reports_in_request_order() {
        let solver = Solver::from_text(SIMPLE, SolverConfig::default()).unwrap();
        let reports = solver.run_all(&[Algorithm::AStar, Algorithm::Bfs]);
        let labels: Vec<_> = reports.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["A*", "BFS"]);
        assert!(reports.iter().all(Report::is_solved));
        assert_eq!(reports[0].steps, reports[0].path.len());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sequential = Solver::from_text(SIMPLE, SolverConfig::default()).unwrap();
        let parallel = Solver::from_text(
            SIMPLE,
            SolverConfig {
                parallel: true,
                ..SolverConfig::default()
            },
        )
        .unwrap();
        let a = sequential.run_all(&[]);
        let b = parallel.run_all(&[]);
        assert_eq!(a.len(), Algorithm::ALL.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!((&x.label, &x.path, x.weight, x.expanded), (&y.label, &y.path, y.weight, y.expanded));
        }
    }
}
