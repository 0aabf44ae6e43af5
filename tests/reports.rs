use weighted_sokoban::{Algorithm, LevelError, Report, SearchStatus, Solver, SolverConfig};

const WEIGHTED: &str = "2 1\n#######\n#.  . #\n# $ $ #\n#  @  #\n#######\n";
const CORNER: &str = "#####\n#$  #\n#  .#\n# @ #\n#####\n";

#[test]
fn test_reports_survive_the_text_form() {
    let solver = Solver::from_text(WEIGHTED, SolverConfig::default()).unwrap();
    let reports = solver.run_all(&[Algorithm::Bfs, Algorithm::AStar, Algorithm::Greedy]);
    let text: String = reports.iter().map(ToString::to_string).collect();

    let parsed = Report::parse_many(&text).unwrap();
    assert_eq!(parsed.len(), reports.len());
    for (original, back) in reports.iter().zip(&parsed) {
        assert_eq!(back.algorithm(), original.algorithm());
        assert_eq!(back.path, original.path);
        assert_eq!(back.steps, original.steps);
        assert_eq!(back.weight, original.weight);
        assert_eq!(back.expanded, original.expanded);
        assert_eq!(back.status, SearchStatus::Solved);
    }
}

#[test]
fn test_unsolvable_level_prints_impossible() {
    let solver = Solver::from_text(CORNER, SolverConfig::default()).unwrap();
    for report in solver.run_all(&[]) {
        assert_eq!(report.status, SearchStatus::Impossible);
        let text = report.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], report.label);
        assert!(lines[1].starts_with("Steps: 0, Weight: 0, Node: "));
        assert_eq!(lines[2], "Impossible");
    }
}

#[test]
fn test_single_run_matches_batch() {
    let solver = Solver::from_text(WEIGHTED, SolverConfig::default()).unwrap();
    let single = solver.run(Algorithm::Ucs);
    let batch = solver.run_all(&[Algorithm::Ucs]).remove(0);
    assert_eq!(single.path, batch.path);
    assert_eq!(single.cost, batch.cost);
    assert_eq!(single.explored, batch.explored);
}

#[test]
fn test_bad_levels_are_rejected() {
    let err = Solver::from_text("3\n#####\n#@$.#\n#####\n#$ .#\n", SolverConfig::default()).err();
    assert_eq!(err, Some(LevelError::WeightCount { stones: 2, weights: 1 }));
    let err = Solver::from_text("#####\n# $.#\n#####\n", SolverConfig::default()).err();
    assert_eq!(err, Some(LevelError::MissingPlayer));
}
