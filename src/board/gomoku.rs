use std::fmt::{Display, Formatter};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::board::{Board, Pattern4, Pos, Side, ZobristHash};

pub const DEFAULT_SIZE: usize = 15;

/// A single `(row, col)` coordinate on a square board, or the sentinel `NULL`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Hash)]
pub struct Cell {
    /// `row == u8::MAX` marks the null sentinel.
    row: u8,
    col: u8,
}

impl Cell {
    pub fn new(row: usize, col: usize) -> Self {
        Self {
            row: row as u8,
            col: col as u8,
        }
    }

    pub fn row(self) -> usize {
        self.row as usize
    }

    pub fn col(self) -> usize {
        self.col as usize
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            write!(f, "null")
        } else {
            write!(f, "({}, {})", self.row, self.col)
        }
    }
}

impl Pos for Cell {
    const NULL: Self = Cell {
        row: u8::MAX,
        col: u8::MAX,
    };
}

const DIRECTIONS: [(i32, i32); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

fn weight(class: Pattern4) -> i32 {
    match class {
        Pattern4::AFive => 100_000,
        Pattern4::BFlex4 => 10_000,
        Pattern4::CBlock4Flex3 => 5_000,
        Pattern4::DBlock4Plus => 3_000,
        Pattern4::EBlock4 => 1_000,
        Pattern4::FFlex3x2 => 800,
        Pattern4::None => 0,
    }
}

/// A straightforward reference board + pattern evaluator for an `n`x`n` Gomoku/Renju
/// board. This is the "external collaborator" the search core is built against; it
/// favors correctness and a small, readable implementation over the incremental O(1)
/// make/undo the contract in DESIGN.md asks of a production evaluator. See DESIGN.md
/// for the tradeoff.
#[derive(Debug, Clone)]
pub struct GomokuBoard {
    size: usize,
    stones: Vec<Option<Side>>,
    history: Vec<Cell>,
    zobrist_table: Vec<[u64; 2]>,
    hash: ZobristHash,
    side_to_move: Side,
    patterns: [Vec<Pattern4>; 2],
    p4count: [[usize; 7]; 2],
}

impl GomokuBoard {
    pub fn new(size: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(0xC0FFEE);
        let zobrist_table = (0..size * size)
            .map(|_| [rng.gen::<u64>(), rng.gen::<u64>()])
            .collect();
        let mut res = Self {
            size,
            stones: vec![None; size * size],
            history: Vec::with_capacity(size * size),
            zobrist_table,
            hash: ZobristHash(0),
            side_to_move: Side::First,
            patterns: [vec![Pattern4::None; size * size], vec![Pattern4::None; size * size]],
            p4count: [[0; 7]; 2],
        };
        res.recompute_all_patterns();
        res
    }

    fn idx(&self, cell: Cell) -> usize {
        cell.row() * self.size + cell.col()
    }

    fn in_bounds(&self, row: i32, col: i32) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.size && (col as usize) < self.size
    }

    fn stone_at(&self, row: i32, col: i32) -> Option<Side> {
        if !self.in_bounds(row, col) {
            None
        } else {
            self.stones[row as usize * self.size + col as usize]
        }
    }

    /// Scans along `(dr, dc)` through `(row, col)` as if `side` had just played
    /// there, returning `(run_length, open_start, open_end)` where `run_length`
    /// includes the hypothetical stone and the `open_*` flags say whether the
    /// cell immediately past each end of the run is empty and on the board.
    fn axis_run(&self, side: Side, row: i32, col: i32, dr: i32, dc: i32) -> (usize, bool, bool) {
        let mut fwd = 0usize;
        let (mut r, mut c) = (row + dr, col + dc);
        while self.stone_at(r, c) == Some(side) {
            fwd += 1;
            r += dr;
            c += dc;
        }
        let open_end = self.stone_at(r, c).is_none() && self.in_bounds(r, c);

        let mut back = 0usize;
        let (mut r, mut c) = (row - dr, col - dc);
        while self.stone_at(r, c) == Some(side) {
            back += 1;
            r -= dr;
            c -= dc;
        }
        let open_start = self.stone_at(r, c).is_none() && self.in_bounds(r, c);

        (1 + fwd + back, open_start, open_end)
    }

    /// Whether placing `side` at `(row, col)` would create an open three on this
    /// axis: three in a row with both extension cells empty, one step further
    /// on each side also clear so the three can still grow into an open four.
    fn is_open_three(&self, side: Side, row: i32, col: i32, dr: i32, dc: i32) -> bool {
        let (len, open_start, open_end) = self.axis_run(side, row, col, dr, dc);
        if len != 3 || !open_start || !open_end {
            return false;
        }
        true
    }

    fn classify(&self, side: Side, cell: Cell) -> Pattern4 {
        if self.stones[self.idx(cell)].is_some() {
            return Pattern4::None;
        }
        let (row, col) = (cell.row() as i32, cell.col() as i32);
        let mut fives = 0;
        let mut open_fours = 0;
        let mut closed_fours = 0;
        let mut open_threes = 0;
        for (dr, dc) in DIRECTIONS {
            let (len, open_start, open_end) = self.axis_run(side, row, col, dr, dc);
            if len >= 5 {
                fives += 1;
            } else if len == 4 {
                match (open_start, open_end) {
                    (true, true) => open_fours += 1,
                    (true, false) | (false, true) => closed_fours += 1,
                    (false, false) => {}
                }
            } else if self.is_open_three(side, row, col, dr, dc) {
                open_threes += 1;
            }
        }
        if fives > 0 {
            Pattern4::AFive
        } else if open_fours > 0 {
            Pattern4::BFlex4
        } else if closed_fours > 0 && open_threes > 0 {
            Pattern4::CBlock4Flex3
        } else if closed_fours >= 2 {
            Pattern4::DBlock4Plus
        } else if closed_fours == 1 {
            Pattern4::EBlock4
        } else if open_threes >= 2 {
            Pattern4::FFlex3x2
        } else {
            Pattern4::None
        }
    }

    fn recompute_all_patterns(&mut self) {
        self.p4count = [[0; 7]; 2];
        for side in [Side::First, Side::Second] {
            for row in 0..self.size {
                for col in 0..self.size {
                    let cell = Cell::new(row, col);
                    let class = self.classify(side, cell);
                    self.patterns[side.idx()][self.idx(cell)] = class;
                    self.p4count[side.idx()][class as usize] += 1;
                }
            }
        }
    }

    /// Locates the single empty square that would complete a five for `side`
    /// along the axis through `stone`, assuming `stone` already carries a
    /// closed four for `side` (i.e. `pattern_at` classified it `EBlock4` or
    /// stronger before it was played).
    fn find_extension_square(&self, side: Side, stone: Cell) -> Cell {
        let (row, col) = (stone.row() as i32, stone.col() as i32);
        for (dr, dc) in DIRECTIONS {
            let mut fwd = 0usize;
            let (mut r, mut c) = (row + dr, col + dc);
            while self.stone_at(r, c) == Some(side) {
                fwd += 1;
                r += dr;
                c += dc;
            }
            let fwd_open = self.stone_at(r, c).is_none() && self.in_bounds(r, c);
            let (fwd_r, fwd_c) = (r, c);

            let mut back = 0usize;
            let (mut r, mut c) = (row - dr, col - dc);
            while self.stone_at(r, c) == Some(side) {
                back += 1;
                r -= dr;
                c -= dc;
            }
            let back_open = self.stone_at(r, c).is_none() && self.in_bounds(r, c);
            let (back_r, back_c) = (r, c);

            let len = 1 + fwd + back;
            if len == 4 {
                if fwd_open {
                    return Cell::new(fwd_r as usize, fwd_c as usize);
                }
                if back_open {
                    return Cell::new(back_r as usize, back_c as usize);
                }
            }
        }
        Cell::NULL
    }
}

impl Board for GomokuBoard {
    type Position = Cell;

    fn size(&self) -> usize {
        self.size
    }

    fn side_to_move(&self) -> Side {
        self.side_to_move
    }

    fn ply(&self) -> usize {
        self.history.len()
    }

    fn zobrist(&self) -> ZobristHash {
        self.hash
    }

    fn make_move(&mut self, mov: Cell) {
        assert!(
            self.stones[self.idx(mov)].is_none(),
            "attempted to record a non-empty square as a move"
        );
        let side = self.side_to_move;
        self.stones[self.idx(mov)] = Some(side);
        self.hash.0 ^= self.zobrist_table[self.idx(mov)][side.idx()];
        self.history.push(mov);
        self.side_to_move = self.side_to_move.other();
        self.recompute_all_patterns();
    }

    fn undo_move(&mut self) {
        let mov = self.history.pop().expect("undo_move called with empty history");
        self.side_to_move = self.side_to_move.other();
        let side = self.side_to_move;
        self.stones[self.idx(mov)] = None;
        self.hash.0 ^= self.zobrist_table[self.idx(mov)][side.idx()];
        self.recompute_all_patterns();
    }

    fn is_empty(&self, pos: Cell) -> bool {
        self.stones[self.idx(pos)].is_none()
    }

    fn empty_count(&self) -> usize {
        self.stones.iter().filter(|s| s.is_none()).count()
    }

    fn eval(&self, side: Side) -> i32 {
        Pattern4::iter_variants()
            .map(|class| weight(class) * self.p4count[side.idx()][class as usize] as i32)
            .sum()
    }

    fn pattern_count(&self, side: Side, class: Pattern4) -> usize {
        self.p4count[side.idx()][class as usize]
    }

    fn pattern_at(&self, side: Side, pos: Cell) -> Pattern4 {
        self.patterns[side.idx()][self.idx(pos)]
    }

    fn score_of(&self, side: Side, pos: Cell) -> i32 {
        let mine = weight(self.pattern_at(side, pos));
        let theirs = weight(self.pattern_at(side.other(), pos));
        mine * 2 + theirs
    }

    fn vcf_score_of(&self, side: Side, pos: Cell) -> i32 {
        self.score_of(side, pos)
    }

    fn candidates_with_pattern_at_least(&self, side: Side, class: Pattern4) -> Vec<Cell> {
        let mut res: Vec<Cell> = (0..self.size * self.size)
            .filter(|&i| self.patterns[side.idx()][i] <= class && self.patterns[side.idx()][i] != Pattern4::None)
            .map(|i| Cell::new(i / self.size, i % self.size))
            .collect();
        res.sort_by_key(|&c| std::cmp::Reverse(self.score_of(side, c)));
        res
    }

    fn all_candidates(&self) -> Vec<Cell> {
        let mut res: Vec<Cell> = Vec::new();
        for row in 0..self.size {
            for col in 0..self.size {
                let cell = Cell::new(row, col);
                if !self.is_empty(cell) {
                    continue;
                }
                // Only squares within two steps of an existing stone are useful
                // candidates; an empty board falls back to the center in the
                // opening policy rather than through this list.
                let mut near_stone = false;
                'scan: for dr in -2i32..=2 {
                    for dc in -2i32..=2 {
                        if self.stone_at(row as i32 + dr, col as i32 + dc).is_some() {
                            near_stone = true;
                            break 'scan;
                        }
                    }
                }
                if near_stone {
                    res.push(cell);
                }
            }
        }
        res.sort_by_key(|&c| std::cmp::Reverse(self.score_of(self.side_to_move, c)));
        res
    }

    fn neighbors_on_lines(&self, pos: Cell) -> Vec<Cell> {
        let (row, col) = (pos.row() as i32, pos.col() as i32);
        let mut res = Vec::new();
        for (dr, dc) in DIRECTIONS {
            for step in -4i32..=4 {
                if step == 0 {
                    continue;
                }
                let (r, c) = (row + dr * step, col + dc * step);
                if self.in_bounds(r, c) {
                    let cell = Cell::new(r as usize, c as usize);
                    if self.is_empty(cell) {
                        res.push(cell);
                    }
                }
            }
        }
        res
    }

    fn forced_block_against_five(&self, _side_with_five: Side, threat: Cell) -> Cell {
        // `threat` is itself the empty square completing the five: occupying
        // it first is the only way to deny it.
        threat
    }

    fn forced_block_against_four(&self, side_with_four: Side, threat: Cell) -> Cell {
        self.find_extension_square(side_with_four, threat)
    }

    fn squares_against_open_four(&self, attacker: Side, threat: Cell) -> Vec<Cell> {
        let (row, col) = (threat.row() as i32, threat.col() as i32);
        let mut res = Vec::new();
        for (dr, dc) in DIRECTIONS {
            let (len, open_start, open_end) = self.axis_run(attacker, row, col, dr, dc);
            if len != 4 || !open_start || !open_end {
                continue;
            }
            res.push(threat);
            let (mut r, mut c) = (row + dr, col + dc);
            while self.stone_at(r, c) == Some(attacker) {
                r += dr;
                c += dc;
            }
            if self.in_bounds(r, c) {
                res.push(Cell::new(r as usize, c as usize));
            }
            let (mut r, mut c) = (row - dr, col - dc);
            while self.stone_at(r, c) == Some(attacker) {
                r -= dr;
                c -= dc;
            }
            if self.in_bounds(r, c) {
                res.push(Cell::new(r as usize, c as usize));
            }
        }
        res.dedup();
        res
    }

    fn center(&self) -> Cell {
        Cell::new(self.size / 2, self.size / 2)
    }

    fn far_from_edge(&self, pos: Cell, margin: usize) -> bool {
        let (row, col) = (pos.row(), pos.col());
        row >= margin && col >= margin && row + margin < self.size && col + margin < self.size
    }

    fn last_move(&self) -> Option<Cell> {
        self.history.last().copied()
    }

    fn chebyshev_distance(&self, a: Cell, b: Cell) -> usize {
        a.row().abs_diff(b.row()).max(a.col().abs_diff(b.col()))
    }

    fn adjacent_empty(&self, pos: Cell) -> Vec<Cell> {
        let (row, col) = (pos.row() as i32, pos.col() as i32);
        let mut res = Vec::with_capacity(8);
        for dr in -1i32..=1 {
            for dc in -1i32..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let (r, c) = (row + dr, col + dc);
                if self.in_bounds(r, c) {
                    let cell = Cell::new(r as usize, c as usize);
                    if self.is_empty(cell) {
                        res.push(cell);
                    }
                }
            }
        }
        res
    }

    fn random_legal_move(&self, rng: &mut impl Rng) -> Option<Cell> {
        let empties: Vec<Cell> = (0..self.size * self.size)
            .filter(|&i| self.stones[i].is_none())
            .map(|i| Cell::new(i / self.size, i % self.size))
            .collect();
        if empties.is_empty() {
            None
        } else {
            Some(empties[rng.gen_range(0..empties.len())])
        }
    }
}

impl Default for GomokuBoard {
    fn default() -> Self {
        Self::new(DEFAULT_SIZE)
    }
}

impl Pattern4 {
    fn iter_variants() -> impl Iterator<Item = Pattern4> {
        use strum::IntoEnumIterator;
        Pattern4::iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_board_has_no_patterns() {
        let b = GomokuBoard::new(15);
        assert_eq!(b.pattern_count(Side::First, Pattern4::AFive), 0);
        assert_eq!(b.eval(Side::First), 0);
    }

    #[test]
    fn open_three_becomes_open_four() {
        let mut b = GomokuBoard::new(15);
        // First plays three in a row at 7,5..7,7, both ends (7,4 and 7,8) empty.
        for (col, opp_col) in [(5, 0), (6, 1), (7, 2)] {
            b.make_move(Cell::new(7, col));
            b.make_move(Cell::new(12, opp_col));
        }
        // a lone open three carries no named pattern class of its own
        assert_eq!(b.pattern_at(Side::First, Cell::new(7, 4)), Pattern4::None);
        // but either open end would turn it into an open four
        assert_eq!(b.pattern_at(Side::First, Cell::new(7, 8)), Pattern4::BFlex4);
        b.make_move(Cell::new(7, 8));
        assert_eq!(b.pattern_count(Side::First, Pattern4::BFlex4), 1);
    }

    #[test]
    fn make_undo_restores_hash() {
        let mut b = GomokuBoard::new(15);
        let before = b.zobrist();
        let mov = b.center();
        b.make_move(mov);
        assert_ne!(b.zobrist(), before);
        b.undo_move();
        assert_eq!(b.zobrist(), before);
    }

    #[test]
    fn forced_block_against_five_is_the_threat_square() {
        let mut b = GomokuBoard::new(15);
        for col in 4..8 {
            b.make_move(Cell::new(7, col));
            if col != 7 {
                b.make_move(Cell::new(0, col));
            }
        }
        let threat = Cell::new(7, 8);
        assert_eq!(b.pattern_at(Side::First, threat), Pattern4::AFive);
        assert_eq!(b.forced_block_against_five(Side::First, threat), threat);
    }
}
