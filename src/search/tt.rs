use std::mem::size_of;

use static_assertions::const_assert;

use crate::board::{Board, Pos, ZobristHash};
use crate::search::{Score, WIN_MIN};

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum Bound {
    #[default]
    Empty,
    /// Beta cutoff: the true score is at least this value.
    LowerBound,
    /// A fully searched PV node: the score is exact.
    Exact,
    /// Every move failed low: the true score is at most this value.
    UpperBound,
}

const NUM_GENERATIONS: u8 = 64;

#[derive(Debug, Copy, Clone)]
pub struct TTEntry<B: Board> {
    pub hash: ZobristHash,
    pub best_move: B::Position,
    pub score: Score,
    pub depth: u8,
    pub bound: Bound,
    pub generation: u8,
}

impl<B: Board> Default for TTEntry<B> {
    fn default() -> Self {
        Self {
            hash: ZobristHash::default(),
            best_move: B::Position::NULL,
            score: Score(0),
            depth: 0,
            bound: Bound::Empty,
            generation: 0,
        }
    }
}

impl<B: Board> TTEntry<B> {
    fn is_empty(&self) -> bool {
        self.bound == Bound::Empty
    }

    /// `true` iff this entry can answer a probe at `depth` inside `[alpha, beta]`
    /// without recursing further.
    pub fn usable_for(&self, depth: f32, alpha: Score, beta: Score) -> bool {
        if self.is_empty() || (self.depth as f32) < depth {
            return false;
        }
        match self.bound {
            Bound::Empty => false,
            Bound::Exact => true,
            Bound::LowerBound => self.score >= beta,
            Bound::UpperBound => self.score <= alpha,
        }
    }
}

const_assert!(size_of::<Bound>() <= 8);

pub const DEFAULT_HASH_SIZE_MB: usize = 16;

/// A single direct-mapped transposition table: `index = hash % capacity`. Lossy
/// (collisions overwrite per the replacement policy below), single owner (the
/// engine), cleared on `new_game` and whenever configuration reload demands it.
#[derive(Debug)]
pub struct TT<B: Board> {
    slots: Vec<TTEntry<B>>,
    mask: u64,
    generation: u8,
}

impl<B: Board> TT<B> {
    pub fn new_with_bytes(size_in_bytes: usize) -> Self {
        let mut res = Self {
            slots: vec![],
            mask: 0,
            generation: 0,
        };
        res.resize_bytes(size_in_bytes);
        res
    }

    pub fn resize_bytes(&mut self, size_in_bytes: usize) {
        let entry_size = size_of::<TTEntry<B>>().max(1);
        let num_entries = (size_in_bytes / entry_size).max(1);
        let num_bits = num_entries.ilog2();
        let num_entries = 1usize << num_bits;
        self.slots.resize_with(num_entries, TTEntry::default);
        self.mask = num_entries as u64 - 1;
    }

    fn index_of(&self, hash: ZobristHash) -> usize {
        (hash.0 & self.mask) as usize
    }

    /// Returns `(hit, current contents of the candidate slot)`. `hit` means the
    /// slot's key matches; a non-hit slot is still returned so the search can
    /// adopt its move for ordering even when the stored depth doesn't suffice.
    pub fn probe(&self, hash: ZobristHash, ply: usize) -> (bool, TTEntry<B>) {
        let idx = self.index_of(hash);
        let mut entry = self.slots[idx];
        let hit = !entry.is_empty() && entry.hash == hash;
        if hit {
            entry.score = adjust_out(entry.score, ply);
        }
        (hit, entry)
    }

    pub fn save(
        &mut self,
        hash: ZobristHash,
        best_move: B::Position,
        score: Score,
        depth: f32,
        bound: Bound,
        ply: usize,
    ) {
        let idx = self.index_of(hash);
        let depth = depth.round().clamp(0.0, u8::MAX as f32) as u8;
        let candidate = TTEntry {
            hash,
            best_move,
            score: adjust_in(score, ply),
            depth,
            bound,
            generation: self.generation,
        };
        let existing = self.slots[idx];
        let replace = existing.is_empty()
            || existing.hash == hash
            || existing.generation != self.generation
            || existing.depth < candidate.depth;
        if replace {
            self.slots[idx] = candidate;
        }
    }

    /// Advances the aging counter at the start of a new search; used by the
    /// replacement policy to prefer overwriting stale entries.
    pub fn new_search(&mut self) {
        self.generation = (self.generation + 1) % NUM_GENERATIONS;
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = TTEntry::default();
        }
        self.generation = 0;
    }
}

impl<B: Board> Default for TT<B> {
    fn default() -> Self {
        TT::new_with_bytes(DEFAULT_HASH_SIZE_MB * 1_000_000)
    }
}

/// Converts a score from "absolute" (ply-0-relative) to the ply-relative form
/// stored in the table, so that a mate found deep in one search remains
/// comparable when probed at a shallower ply in a later one.
fn adjust_in(mut score: Score, ply: usize) -> Score {
    if score.0 >= WIN_MIN {
        score.0 += ply as i32;
    } else if score.0 <= -WIN_MIN {
        score.0 -= ply as i32;
    }
    score
}

fn adjust_out(mut score: Score, ply: usize) -> Score {
    if score.0 >= WIN_MIN {
        score.0 -= ply as i32;
    } else if score.0 <= -WIN_MIN {
        score.0 += ply as i32;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::gomoku::{Cell, GomokuBoard};

    #[test]
    fn mate_score_round_trips_through_store_and_load() {
        let mut tt: TT<GomokuBoard> = TT::new_with_bytes(1 << 16);
        let hash = ZobristHash(12345);
        let stored_at_ply = 4;
        let score = Score(crate::search::WIN_MAX - 10);
        tt.save(hash, Cell::new(7, 7), score, 6.0, Bound::Exact, stored_at_ply);
        let (hit, entry) = tt.probe(hash, stored_at_ply);
        assert!(hit);
        assert_eq!(entry.score, score);

        // probing from a shallower ply should reveal a longer mate distance
        let (hit2, entry2) = tt.probe(hash, stored_at_ply - 2);
        assert!(hit2);
        assert_eq!(entry2.score.0, score.0 - 2);
    }

    #[test]
    fn clear_wipes_all_slots() {
        let mut tt: TT<GomokuBoard> = TT::new_with_bytes(1 << 16);
        tt.save(ZobristHash(1), Cell::new(0, 0), Score(50), 3.0, Bound::Exact, 0);
        tt.clear();
        let (hit, _) = tt.probe(ZobristHash(1), 0);
        assert!(!hit);
    }
}
