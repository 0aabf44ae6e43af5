use thiserror::Error;

/// Reasons a level text is rejected before any search starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LevelError {
    #[error("level is empty")]
    Empty,
    #[error("level has no player")]
    MissingPlayer,
    #[error("level has more than one player (second at row {row}, col {col})")]
    MultiplePlayers { row: usize, col: usize },
    #[error("unknown cell '{ch}' at row {row}, col {col}")]
    UnknownCell { row: usize, col: usize, ch: char },
    #[error("weight line has {weights} entries but the level has {stones} stones")]
    WeightCount { stones: usize, weights: usize },
    #[error("invalid stone weight '{token}'")]
    InvalidWeight { token: String },
    #[error("stone #{index} has weight 0, weights must be at least 1")]
    ZeroWeight { index: usize },
    #[error("level has {stones} stones but {switches} switches")]
    SwitchCount { stones: usize, switches: usize },
    #[error("level is too large ({rows}x{cols})")]
    TooLarge { rows: usize, cols: usize },
}

/// Raised when a move string cannot be replayed on a level.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    #[error("unknown move code '{ch}' at index {index}")]
    UnknownMove { index: usize, ch: char },
    #[error("illegal move '{ch}' at index {index}")]
    IllegalMove { index: usize, ch: char },
    #[error("path ends with {misplaced} stone(s) off their switches")]
    NotSolved { misplaced: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportParseError {
    #[error("report record {record} is truncated")]
    Truncated { record: usize },
    #[error("report record {record}: missing field '{field}'")]
    MissingField { record: usize, field: &'static str },
    #[error("report record {record}: bad value for '{field}': {value}")]
    BadValue {
        record: usize,
        field: &'static str,
        value: String,
    },
}
