//! Cost-to-go estimators over a stone set and a list of target cells.

use std::fmt;

use crate::grid::Point;
use crate::state::StoneSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum Heuristic {
    /// Each stone's weight times the distance to its nearest target.
    #[value(name = "manhattan")]
    ManhattanSum,
    /// Minimum-cost perfect matching of stones to targets.
    #[default]
    #[value(name = "matching")]
    Matching,
}

impl Heuristic {
    pub fn estimate(self, stones: &StoneSet, targets: &[Point]) -> u32 {
        let cost = match self {
            Heuristic::ManhattanSum => manhattan_sum(stones, targets),
            Heuristic::Matching => matching(stones, targets),
        };
        cost.min(u32::MAX as u64) as u32
    }
}

impl fmt::Display for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Heuristic::ManhattanSum => write!(f, "manhattan"),
            Heuristic::Matching => write!(f, "matching"),
        }
    }
}

pub fn manhattan_sum(stones: &StoneSet, targets: &[Point]) -> u64 {
    stones
        .iter()
        .map(|stone| {
            let nearest = targets
                .iter()
                .map(|&t| stone.pos.manhattan(t))
                .min()
                .unwrap_or(0);
            stone.weight as u64 * nearest as u64
        })
        .sum()
}

/// `cost[i][j] = weight_i * manhattan(stone_i, target_j)`, solved exactly.
/// More stones than targets cannot be matched and falls back to the
/// nearest-target sum.
pub fn matching(stones: &StoneSet, targets: &[Point]) -> u64 {
    let n = stones.len();
    let m = targets.len();
    if n == 0 {
        return 0;
    }
    if n > m {
        return manhattan_sum(stones, targets);
    }

    let mut cost = Vec::with_capacity(n * m);
    for stone in stones.iter() {
        for &t in targets {
            cost.push(stone.weight as i64 * stone.pos.manhattan(t) as i64);
        }
    }
    hungarian(&cost, n, m) as u64
}

/// Hungarian algorithm with potentials, O(n^2 m). `cost` is row-major n x m
/// with n <= m; returns the minimum total cost of assigning every row to a
/// distinct column.
pub fn hungarian(cost: &[i64], n: usize, m: usize) -> i64 {
    debug_assert!(n <= m);
    debug_assert_eq!(cost.len(), n * m);
    const INF: i64 = i64::MAX / 4;

    // 1-based; column 0 and row 0 are sentinels.
    let mut u = vec![0i64; n + 1];
    let mut v = vec![0i64; m + 1];
    let mut p = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![INF; m + 1];
        let mut used = vec![false; m + 1];

        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = INF;
            let mut j1 = 0usize;

            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let cur = cost[(i0 - 1) * m + (j - 1)] - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }

            for j in 0..=m {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }

            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }

        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    (1..=m)
        .filter(|&j| p[j] != 0)
        .map(|j| cost[(p[j] - 1) * m + (j - 1)])
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Stone;

    fn stones(list: &[(i16, i16, u32)]) -> StoneSet {
        StoneSet::from_stones(list.iter().map(|&(r, c, w)| Stone::new(Point::new(r, c), w))).unwrap()
    }

    fn brute_force(cost: &[i64], n: usize) -> i64 {
        fn go(row: usize, n: usize, cost: &[i64], used: &mut Vec<bool>) -> i64 {
            if row == n {
                return 0;
            }
            let mut best = i64::MAX;
            for j in 0..n {
                if !used[j] {
                    used[j] = true;
                    best = best.min(cost[row * n + j] + go(row + 1, n, cost, used));
                    used[j] = false;
                }
            }
            best
        }
        go(0, n, cost, &mut vec![false; n])
    }

    #[test]
    fn test_hungarian_small_matrices() {
        let cost = [4, 1, 3, 2, 0, 5, 3, 2, 2];
        assert_eq!(hungarian(&cost, 3, 3), 5);
        assert_eq!(hungarian(&cost, 3, 3), brute_force(&cost, 3));

        let cost = [7, 3, 9, 1, 8, 6, 2, 5, 4, 7, 9, 1, 6, 3, 8, 2];
        assert_eq!(hungarian(&cost, 4, 4), brute_force(&cost, 4));
    }

    #[test]
    fn test_hungarian_rectangular() {
        // two rows, three columns: pick columns 2 and 0
        let cost = [5, 9, 1, 2, 8, 7];
        assert_eq!(hungarian(&cost, 2, 3), 3);
    }

    #[test]
    fn test_manhattan_sum_shares_nearest_switch() {
        let s = stones(&[(1, 1, 2), (1, 2, 3)]);
        let targets = [Point::new(1, 3), Point::new(5, 5)];
        // both stones pick (1,3): 2*2 + 3*1
        assert_eq!(manhattan_sum(&s, &targets), 7);
    }

    #[test]
    fn test_matching_dominates_manhattan_sum() {
        let s = stones(&[(1, 1, 2), (1, 2, 3)]);
        let targets = [Point::new(1, 3), Point::new(5, 5)];
        let m = matching(&s, &targets);
        // (1,2)->(1,3) costs 3, (1,1)->(5,5) costs 2*8
        assert_eq!(m, 19);
        assert!(m >= manhattan_sum(&s, &targets));
        assert_eq!(Heuristic::Matching.estimate(&s, &targets), 19);
        assert_eq!(Heuristic::ManhattanSum.estimate(&s, &targets), 7);
    }

    #[test]
    fn test_estimates_are_zero_on_goal() {
        let s = stones(&[(1, 3, 4), (5, 5, 9)]);
        let targets = [Point::new(1, 3), Point::new(5, 5)];
        assert_eq!(Heuristic::Matching.estimate(&s, &targets), 0);
        assert_eq!(Heuristic::ManhattanSum.estimate(&s, &targets), 0);
        assert_eq!(Heuristic::Matching.estimate(&StoneSet::new(), &[]), 0);
    }
}
