//! Search graph nodes.
//!
//! A [`ProblemState`] is identified by its [`StateKey`] (player position plus
//! the stone set); cost bookkeeping and the ancestor link are excluded from
//! equality and hashing. States live in a [`StateGraph`] arena and point at
//! their ancestor by index, so ancestor chains never own anything.

use std::hash::{Hash, Hasher};

use smallvec::SmallVec;

use crate::grid::{Direction, Move, Point};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Stone {
    pub pos: Point,
    pub weight: u32,
}

impl Stone {
    pub const fn new(pos: Point, weight: u32) -> Self {
        Stone { pos, weight }
    }
}

/// Stones kept sorted by position so that derived equality and hashing are
/// set semantics. Positions are unique.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct StoneSet {
    stones: SmallVec<[Stone; 16]>,
}

impl StoneSet {
    pub fn new() -> Self {
        StoneSet::default()
    }

    /// Returns `None` when two stones share a position.
    pub fn from_stones(stones: impl IntoIterator<Item = Stone>) -> Option<Self> {
        let mut stones: SmallVec<[Stone; 16]> = stones.into_iter().collect();
        stones.sort_unstable_by_key(|s| s.pos);
        if stones.windows(2).any(|w| w[0].pos == w[1].pos) {
            return None;
        }
        Some(StoneSet { stones })
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.stones.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.stones.is_empty()
    }

    #[inline(always)]
    pub fn iter(&self) -> impl Iterator<Item = &Stone> + '_ {
        self.stones.iter()
    }

    pub fn positions(&self) -> impl Iterator<Item = Point> + '_ {
        self.stones.iter().map(|s| s.pos)
    }

    #[inline(always)]
    pub fn get(&self, pos: Point) -> Option<Stone> {
        self.stones
            .binary_search_by_key(&pos, |s| s.pos)
            .ok()
            .map(|i| self.stones[i])
    }

    #[inline(always)]
    pub fn contains(&self, pos: Point) -> bool {
        self.get(pos).is_some()
    }

    /// New set with the stone at `from` relocated to `to`. The receiver is
    /// left untouched; callers check that `to` is free.
    pub fn moved(&self, from: Point, to: Point) -> StoneSet {
        let mut stones = self.stones.clone();
        if let Ok(i) = stones.binary_search_by_key(&from, |s| s.pos) {
            let weight = stones.remove(i).weight;
            let at = stones
                .binary_search_by_key(&to, |s| s.pos)
                .unwrap_or_else(|at| at);
            stones.insert(at, Stone::new(to, weight));
        }
        StoneSet { stones }
    }

    /// Same positions with every weight forced to 1.
    pub fn unweighted(&self) -> StoneSet {
        StoneSet {
            stones: self.stones.iter().map(|s| Stone::new(s.pos, 1)).collect(),
        }
    }

    pub fn total_weight(&self) -> u64 {
        self.stones.iter().map(|s| s.weight as u64).sum()
    }
}

/// Identity of a search node.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct StateKey {
    pub player: Point,
    pub stones: StoneSet,
}

/// Index of a state inside its [`StateGraph`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(pub u32);

#[derive(Clone, Debug)]
pub struct ProblemState {
    pub key: StateKey,
    /// Cost so far.
    pub g: u32,
    /// Heuristic estimate, `None` when the producer was not given one.
    pub h: Option<u32>,
    pub ancestor: Option<NodeId>,
    /// Stone moved to reach this state, as it was before the push.
    pub pushed: Option<Stone>,
}

impl ProblemState {
    pub fn root(player: Point, stones: StoneSet) -> Self {
        ProblemState {
            key: StateKey { player, stones },
            g: 0,
            h: None,
            ancestor: None,
            pushed: None,
        }
    }

    #[inline(always)]
    pub fn player(&self) -> Point {
        self.key.player
    }

    #[inline(always)]
    pub fn stones(&self) -> &StoneSet {
        &self.key.stones
    }

    /// `g + h`, with a missing heuristic counting as 0.
    #[inline(always)]
    pub fn f(&self) -> u32 {
        self.g.saturating_add(self.h.unwrap_or(0))
    }
}

impl PartialEq for ProblemState {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ProblemState {}

impl Hash for ProblemState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// Arena owning every state created during one search run.
#[derive(Debug, Default)]
pub struct StateGraph {
    nodes: Vec<ProblemState>,
}

impl StateGraph {
    pub fn new() -> Self {
        StateGraph::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        StateGraph {
            nodes: Vec::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, state: ProblemState) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(state);
        id
    }

    #[inline(always)]
    pub fn get(&self, id: NodeId) -> &ProblemState {
        &self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ProblemState)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, state)| (NodeId(i as u32), state))
    }

    /// Rough heap footprint of the arena in bytes.
    pub fn footprint(&self) -> usize {
        self.nodes.capacity() * std::mem::size_of::<ProblemState>()
            + self
                .nodes
                .iter()
                .filter(|n| n.key.stones.stones.spilled())
                .map(|n| n.key.stones.stones.capacity() * std::mem::size_of::<Stone>())
                .sum::<usize>()
    }

    /// Moves from the root to `id`, oldest first.
    pub fn moves_to(&self, id: NodeId) -> Vec<Move> {
        let mut moves = Vec::new();
        let mut current = self.get(id);
        while let Some(parent_id) = current.ancestor {
            let parent = self.get(parent_id);
            // Ancestors are always one orthogonal step away.
            if let Some(dir) = Direction::between(parent.player(), current.player()) {
                moves.push(Move::new(dir, current.pushed.is_some()));
            }
            current = parent;
        }
        moves.reverse();
        moves
    }

    /// Walks ancestor links from `id` back to the root and returns the move
    /// string together with the summed weight of every pushed stone.
    pub fn reconstruct_path(&self, id: NodeId) -> (String, u64) {
        let mut weight = 0u64;
        let mut current = self.get(id);
        while let Some(parent_id) = current.ancestor {
            weight += current.pushed.map_or(0, |s| s.weight as u64);
            current = self.get(parent_id);
        }
        let path = self.moves_to(id).into_iter().map(Move::to_char).collect();
        (path, weight)
    }
}
