//! Static level geometry: positions, directions, move codes and the
//! wall/floor/switch layout.

use std::fmt;

const DIR_OFFSETS: [(i16, i16); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const DIR_CHARS: [char; 4] = ['u', 'd', 'l', 'r'];

// Compact point using i16 for better cache performance
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Point {
    pub row: i16,
    pub col: i16,
}

impl Point {
    #[inline(always)]
    pub const fn new(row: i16, col: i16) -> Self {
        Point { row, col }
    }

    #[inline(always)]
    pub fn step(self, dir: Direction) -> Self {
        let (drow, dcol) = dir.offset();
        Point::new(self.row + drow, self.col + dcol)
    }

    #[inline(always)]
    pub fn manhattan(self, other: Point) -> u32 {
        (self.row - other.row).unsigned_abs() as u32 + (self.col - other.col).unsigned_abs() as u32
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    #[inline(always)]
    pub fn offset(self) -> (i16, i16) {
        DIR_OFFSETS[self as usize]
    }

    #[inline(always)]
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Lowercase step code (`u`, `d`, `l`, `r`).
    #[inline(always)]
    pub fn to_char(self) -> char {
        DIR_CHARS[self as usize]
    }

    /// Accepts both step and push codes.
    pub fn from_char(ch: char) -> Option<Self> {
        match ch.to_ascii_lowercase() {
            'u' => Some(Direction::Up),
            'd' => Some(Direction::Down),
            'l' => Some(Direction::Left),
            'r' => Some(Direction::Right),
            _ => None,
        }
    }

    /// Direction that takes `from` to the orthogonally adjacent `to`.
    pub fn between(from: Point, to: Point) -> Option<Self> {
        Direction::ALL.into_iter().find(|&dir| from.step(dir) == to)
    }
}

/// One character of a solution string: a step, or a push when `push` is set.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Move {
    pub dir: Direction,
    pub push: bool,
}

impl Move {
    pub const fn new(dir: Direction, push: bool) -> Self {
        Move { dir, push }
    }

    pub fn to_char(self) -> char {
        let ch = self.dir.to_char();
        if self.push {
            ch.to_ascii_uppercase()
        } else {
            ch
        }
    }

    pub fn from_char(ch: char) -> Option<Self> {
        Direction::from_char(ch).map(|dir| Move::new(dir, ch.is_ascii_uppercase()))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cell {
    Wall,
    Floor,
    Switch,
}

/// Immutable rows x cols cell layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    rows: i16,
    cols: i16,
    cells: Vec<Cell>,
}

impl Grid {
    /// `cells` is row-major and must hold exactly `rows * cols` entries.
    pub fn new(rows: i16, cols: i16, cells: Vec<Cell>) -> Self {
        debug_assert_eq!(cells.len(), rows as usize * cols as usize);
        Grid { rows, cols, cells }
    }

    #[inline(always)]
    pub fn rows(&self) -> i16 {
        self.rows
    }

    #[inline(always)]
    pub fn cols(&self) -> i16 {
        self.cols
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    #[inline(always)]
    pub fn is_valid(&self, pos: Point) -> bool {
        pos.row >= 0 && pos.row < self.rows && pos.col >= 0 && pos.col < self.cols
    }

    #[inline(always)]
    pub fn to_idx(&self, pos: Point) -> usize {
        pos.row as usize * self.cols as usize + pos.col as usize
    }

    /// Cells outside the grid read as walls.
    #[inline(always)]
    pub fn cell(&self, pos: Point) -> Cell {
        if self.is_valid(pos) {
            self.cells[self.to_idx(pos)]
        } else {
            Cell::Wall
        }
    }

    #[inline(always)]
    pub fn is_wall(&self, pos: Point) -> bool {
        self.cell(pos) == Cell::Wall
    }

    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| Point::new(row, col)))
    }
}
