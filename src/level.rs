//! Level loading.
//!
//! The text format is the usual Sokoban one (`#` wall, ` ` floor, `$` stone,
//! `@` player, `.` switch, `*` stone on switch, `+` player on switch),
//! optionally preceded by one line of whitespace separated stone weights in
//! row-major stone order. Without that line every stone weighs 1.

use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

use crate::error::LevelError;
use crate::grid::{Cell, Grid, Point};
use crate::state::{Stone, StoneSet};

/// Largest accepted row or column count. Moves look up to two cells past a
/// border cell, and those coordinates must still fit in an `i16`.
pub const MAX_SIDE: usize = i16::MAX as usize - 2;

pub type SwitchList = SmallVec<[Point; 16]>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Level {
    grid: Grid,
    player: Point,
    stones: StoneSet,
    switches: SwitchList,
}

impl Level {
    /// Builds a level from parts. Switches are taken from the grid.
    pub fn new(grid: Grid, player: Point, stones: StoneSet) -> Result<Self, LevelError> {
        let switches: SwitchList = grid.points().filter(|&p| grid.cell(p) == Cell::Switch).collect();
        if switches.len() != stones.len() {
            return Err(LevelError::SwitchCount {
                stones: stones.len(),
                switches: switches.len(),
            });
        }
        Ok(Level {
            grid,
            player,
            stones,
            switches,
        })
    }

    pub fn parse(text: &str) -> Result<Self, LevelError> {
        parse_level(text)
    }

    #[inline(always)]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[inline(always)]
    pub fn player(&self) -> Point {
        self.player
    }

    #[inline(always)]
    pub fn stones(&self) -> &StoneSet {
        &self.stones
    }

    /// Switch positions in row-major order.
    #[inline(always)]
    pub fn switches(&self) -> &[Point] {
        &self.switches
    }

    #[inline(always)]
    pub fn is_switch(&self, pos: Point) -> bool {
        self.grid.cell(pos) == Cell::Switch
    }

    /// Renders `player` and `stones` on this level's grid.
    pub fn render(&self, player: Point, stones: &StoneSet) -> String {
        let mut out = String::with_capacity(self.grid.size() + self.grid.rows() as usize);
        for row in 0..self.grid.rows() {
            let mut line = String::with_capacity(self.grid.cols() as usize);
            for col in 0..self.grid.cols() {
                let pos = Point::new(row, col);
                let on_switch = self.is_switch(pos);
                line.push(match self.grid.cell(pos) {
                    Cell::Wall => '#',
                    _ if stones.contains(pos) => {
                        if on_switch {
                            '*'
                        } else {
                            '$'
                        }
                    }
                    _ if pos == player => {
                        if on_switch {
                            '+'
                        } else {
                            '@'
                        }
                    }
                    Cell::Switch => '.',
                    Cell::Floor => ' ',
                });
            }
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}

impl FromStr for Level {
    type Err = LevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_level(s)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(self.player, &self.stones))
    }
}

fn split_lines(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    for end in memchr::memchr_iter(b'\n', bytes) {
        lines.push(text[start..end].trim_end_matches('\r'));
        start = end + 1;
    }
    if start < bytes.len() {
        lines.push(text[start..].trim_end_matches('\r'));
    }
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    lines
}

fn parse_weights(line: &str) -> Result<Vec<u32>, LevelError> {
    line.split_whitespace()
        .map(|token| {
            token.parse::<u32>().map_err(|_| LevelError::InvalidWeight {
                token: token.to_string(),
            })
        })
        .collect()
}

fn parse_level(text: &str) -> Result<Level, LevelError> {
    let mut lines = split_lines(text);

    let weights = match lines.first() {
        Some(first) if first.bytes().any(|b| b.is_ascii_digit()) => {
            let weights = parse_weights(first)?;
            lines.remove(0);
            Some(weights)
        }
        _ => None,
    };

    if lines.is_empty() {
        return Err(LevelError::Empty);
    }

    let rows = lines.len();
    let cols = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    if cols == 0 {
        return Err(LevelError::Empty);
    }
    if rows > MAX_SIDE || cols > MAX_SIDE {
        return Err(LevelError::TooLarge { rows, cols });
    }

    let mut cells = vec![Cell::Floor; rows * cols];
    let mut player = None;
    let mut stone_positions = Vec::new();

    for (row, line) in lines.iter().enumerate() {
        for (col, ch) in line.chars().enumerate() {
            let pos = Point::new(row as i16, col as i16);
            let idx = row * cols + col;
            cells[idx] = match ch {
                '#' => Cell::Wall,
                ' ' | '-' | '_' => Cell::Floor,
                '.' => Cell::Switch,
                '$' => {
                    stone_positions.push(pos);
                    Cell::Floor
                }
                '*' => {
                    stone_positions.push(pos);
                    Cell::Switch
                }
                '@' | '+' => {
                    if player.replace(pos).is_some() {
                        return Err(LevelError::MultiplePlayers { row, col });
                    }
                    if ch == '+' {
                        Cell::Switch
                    } else {
                        Cell::Floor
                    }
                }
                _ => return Err(LevelError::UnknownCell { row, col, ch }),
            };
        }
    }

    let player = player.ok_or(LevelError::MissingPlayer)?;

    let weights = match weights {
        Some(weights) => {
            if weights.len() != stone_positions.len() {
                return Err(LevelError::WeightCount {
                    stones: stone_positions.len(),
                    weights: weights.len(),
                });
            }
            if let Some(index) = weights.iter().position(|&w| w == 0) {
                return Err(LevelError::ZeroWeight { index });
            }
            weights
        }
        None => vec![1; stone_positions.len()],
    };

    // Positions come from distinct cells, so they are unique.
    let stones = StoneSet::from_stones(
        stone_positions
            .into_iter()
            .zip(weights)
            .map(|(pos, weight)| Stone::new(pos, weight)),
    )
    .unwrap_or_default();

    let grid = Grid::new(rows as i16, cols as i16, cells);
    Level::new(grid, player, stones)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Direction;

    const SIMPLE: &str = "#######\n#.    #\n#  $  #\n#  @  #\n#######\n";

    #[test]
    fn test_parse_simple_level() {
        let level = Level::parse(SIMPLE).unwrap();
        assert_eq!(level.grid().rows(), 5);
        assert_eq!(level.grid().cols(), 7);
        assert_eq!(level.player(), Point::new(3, 3));
        assert_eq!(level.switches(), &[Point::new(1, 1)]);
        let stones: Vec<_> = level.stones().iter().copied().collect();
        assert_eq!(stones, vec![Stone::new(Point::new(2, 3), 1)]);
    }

    #[test]
    fn test_parse_weight_line_in_row_major_order() {
        let text = "3 7\n######\n#@$$.#\n#   .#\n######\n";
        let level = Level::parse(text).unwrap();
        assert_eq!(level.stones().get(Point::new(1, 2)).unwrap().weight, 3);
        assert_eq!(level.stones().get(Point::new(1, 3)).unwrap().weight, 7);
    }

    #[test]
    fn test_parse_weight_line_with_tabs_and_crlf() {
        let text = "2\t5\r\n######\r\n#@$$.#\r\n#   .#\r\n######\r\n\r\n";
        let level = Level::parse(text).unwrap();
        assert_eq!(level.stones().total_weight(), 7);
        assert_eq!(level.grid().rows(), 4);
    }

    #[test]
    fn test_ragged_rows_are_padded() {
        let text = "#####\n#@$.#\n####";
        let level = Level::parse(text).unwrap();
        assert_eq!(level.grid().cols(), 5);
        assert_eq!(level.grid().cell(Point::new(2, 4)), Cell::Floor);
    }

    #[test]
    fn test_special_cells() {
        let text = "#####\n#+*$#\n#####\n";
        let level = Level::parse(text).unwrap();
        assert_eq!(level.player(), Point::new(1, 1));
        assert!(level.is_switch(Point::new(1, 1)));
        assert!(level.is_switch(Point::new(1, 2)));
        assert!(!level.is_switch(Point::new(1, 3)));
        assert!(level.stones().contains(Point::new(1, 2)));
        assert!(level.stones().contains(Point::new(1, 3)));
        assert_eq!(level.switches().len(), 2);
        assert_eq!(
            Level::parse("######\n#+$ .#\n######\n"),
            Err(LevelError::SwitchCount { stones: 1, switches: 2 })
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(Level::parse(""), Err(LevelError::Empty));
        assert_eq!(Level::parse("1 2\n"), Err(LevelError::Empty));
        assert_eq!(Level::parse("####\n#$.#\n####"), Err(LevelError::MissingPlayer));
        assert_eq!(
            Level::parse("#####\n#@@ #\n#####"),
            Err(LevelError::MultiplePlayers { row: 1, col: 2 })
        );
        assert_eq!(
            Level::parse("####\n#@x#\n####"),
            Err(LevelError::UnknownCell { row: 1, col: 2, ch: 'x' })
        );
        assert_eq!(
            Level::parse("1 2\n#####\n#@$.#\n#####"),
            Err(LevelError::WeightCount { stones: 1, weights: 2 })
        );
        assert_eq!(
            Level::parse("0\n#####\n#@$.#\n#####"),
            Err(LevelError::ZeroWeight { index: 0 })
        );
        assert_eq!(
            Level::parse("1 x2\n#####\n#@$.#\n#####"),
            Err(LevelError::InvalidWeight { token: "x2".into() })
        );
        assert_eq!(
            Level::parse("#####\n#@$ #\n#####"),
            Err(LevelError::SwitchCount { stones: 1, switches: 0 })
        );
    }

    #[test]
    fn test_display_round_trip() {
        let level = Level::parse(SIMPLE).unwrap();
        let again = Level::parse(&level.to_string()).unwrap();
        assert_eq!(level, again);
    }

    #[test]
    fn test_zero_stone_level() {
        let level = Level::parse("####\n#@ #\n####").unwrap();
        assert!(level.stones().is_empty());
        assert!(level.switches().is_empty());
    }

    #[test]
    fn test_size_limit_keeps_lookahead_in_range() {
        let tall = "#\n".repeat(MAX_SIDE + 1);
        assert_eq!(
            Level::parse(&tall),
            Err(LevelError::TooLarge { rows: MAX_SIDE + 1, cols: 1 })
        );

        let wide = format!("#{}#\n", " ".repeat(MAX_SIDE - 1));
        assert!(matches!(Level::parse(&wide), Err(LevelError::TooLarge { .. })));

        let mut corridor = "#@#\n".to_string();
        corridor.push_str(&"# #\n".repeat(MAX_SIDE - 2));
        corridor.push_str("#*#\n");
        let level = Level::parse(&corridor).unwrap();
        assert_eq!(level.grid().rows() as usize, MAX_SIDE);
        let last = Point::new(MAX_SIDE as i16 - 1, 1);
        assert_eq!(last.step(Direction::Down).step(Direction::Down).row, i16::MAX - 1);
        assert!(level.grid().is_wall(last.step(Direction::Down)));
    }
}
