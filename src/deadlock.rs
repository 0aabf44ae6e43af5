//! Deadlock detection.
//!
//! Simple deadlocks are precomputed once per level by pulling a lone stone
//! backwards from every switch: any floor cell the pull flood never reaches
//! can never deliver a stone to a switch. Freeze deadlocks are checked on
//! demand after a hypothetical push.

use std::collections::VecDeque;

use smallvec::SmallVec;

use crate::grid::{Direction, Grid, Point};
use crate::level::Level;
use crate::state::StoneSet;

/// One bit per grid cell, set when the cell is a simple deadlock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimpleDeadlockMap {
    rows: i16,
    cols: i16,
    dead_squares: Vec<u64>,
}

impl SimpleDeadlockMap {
    /// Reverse flood from the switches using pull moves: a stone at `origin`
    /// can be pulled onto `target` when both `origin` and the cell behind it
    /// (where the player stands) are not walls.
    pub fn compute(grid: &Grid, switches: &[Point]) -> Self {
        let size = grid.size();
        let mut live_squares = vec![false; size];
        let mut queue = VecDeque::with_capacity(switches.len() * 4);

        for &goal in switches {
            let idx = grid.to_idx(goal);
            if !live_squares[idx] {
                live_squares[idx] = true;
                queue.push_back(goal);
            }
        }

        while let Some(pull_target) = queue.pop_front() {
            for dir in Direction::ALL {
                let pull_origin = pull_target.step(dir);
                let player = pull_origin.step(dir);

                if grid.is_wall(pull_origin) || grid.is_wall(player) {
                    continue;
                }
                let po_idx = grid.to_idx(pull_origin);
                if !live_squares[po_idx] {
                    live_squares[po_idx] = true;
                    queue.push_back(pull_origin);
                }
            }
        }

        let mut dead_squares = vec![0u64; size.div_ceil(64)];
        for pos in grid.points() {
            let i = grid.to_idx(pos);
            if !grid.is_wall(pos) && !live_squares[i] {
                dead_squares[i / 64] |= 1u64 << (i % 64);
            }
        }

        SimpleDeadlockMap {
            rows: grid.rows(),
            cols: grid.cols(),
            dead_squares,
        }
    }

    /// Walls and off-grid cells are never reported as deadlocks.
    #[inline(always)]
    pub fn is_dead(&self, pos: Point) -> bool {
        if pos.row < 0 || pos.row >= self.rows || pos.col < 0 || pos.col >= self.cols {
            return false;
        }
        let i = pos.row as usize * self.cols as usize + pos.col as usize;
        (self.dead_squares[i / 64] & (1u64 << (i % 64))) != 0
    }

    pub fn count(&self) -> usize {
        self.dead_squares.iter().map(|w| w.count_ones() as usize).sum()
    }
}

/// Positions already on the current recursion chain. Each recursive call
/// gets its own copy so sibling axis checks never see each other's marks.
pub type Visiting = SmallVec<[Point; 8]>;

#[derive(Clone, Copy)]
enum Axis {
    Vertical,
    Horizontal,
}

impl Axis {
    fn sides(self) -> [Direction; 2] {
        match self {
            Axis::Vertical => [Direction::Down, Direction::Up],
            Axis::Horizontal => [Direction::Right, Direction::Left],
        }
    }
}

/// True when a stone at `pos` (already present in `stones`) is frozen along
/// both axes and the chain of stones examined is not entirely on switches.
///
/// A neighbouring stone that is already on the recursion chain does not
/// prove anything, so cycles end in the "not frozen" answer.
pub fn has_freeze_deadlock(
    pos: Point,
    level: &Level,
    stones: &StoneSet,
    simple: &SimpleDeadlockMap,
    visiting: &Visiting,
) -> bool {
    let mut chain = visiting.clone();
    chain.push(pos);

    if !axis_frozen(pos, Axis::Vertical, level, stones, simple, &chain)
        || !axis_frozen(pos, Axis::Horizontal, level, stones, simple, &chain)
    {
        return false;
    }

    chain.iter().any(|&p| !level.is_switch(p))
}

fn axis_frozen(
    pos: Point,
    axis: Axis,
    level: &Level,
    stones: &StoneSet,
    simple: &SimpleDeadlockMap,
    chain: &Visiting,
) -> bool {
    let grid = level.grid();
    let mut simple_count = 0;

    for dir in axis.sides() {
        let next = pos.step(dir);

        if grid.is_wall(next) {
            return true;
        }

        // A frozen neighbour blocks the axis even when it sits on a dead cell.
        if stones.contains(next)
            && !chain.contains(&next)
            && has_freeze_deadlock(next, level, stones, simple, chain)
        {
            return true;
        }

        if simple.is_dead(next) {
            simple_count += 1;
            if simple_count == 2 {
                return true;
            }
        }
    }

    false
}
