use std::fmt::{Debug, Display};

use rand::Rng;

pub mod gomoku;

/// A zobrist hash of a position, updated incrementally on make/undo.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ZobristHash(pub u64);

/// A single board coordinate. `NULL` is the sentinel used for "no move"
/// (e.g. when a search finds no legal move, or a MoveList slot is unset).
pub trait Pos: Copy + Clone + Eq + PartialEq + Default + Debug + Display + 'static {
    const NULL: Self;

    fn is_null(self) -> bool {
        self == Self::NULL
    }
}

/// Pattern-strength classes produced by the evaluator, strongest first.
/// Search never constructs these; it only reads and compares them.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[derive(strum_macros::Display, strum_macros::EnumIter)]
pub enum Pattern4 {
    /// Already five in a row.
    AFive,
    /// Open four: two ways to complete a five.
    BFlex4,
    /// Closed four plus an open three.
    CBlock4Flex3,
    /// A four stronger than a plain closed four but weaker than C.
    DBlock4Plus,
    /// A plain closed four: exactly one way to complete a five.
    EBlock4,
    /// Two open threes at once.
    FFlex3x2,
    #[default]
    None,
}

impl Pattern4 {
    /// Patterns from `EBlock4` and stronger can be extended into a five in one move;
    /// these are the patterns the VCF searcher is allowed to chain through.
    pub fn is_closed_four_or_better(self) -> bool {
        self <= Pattern4::EBlock4 && self != Pattern4::None
    }

    pub fn is_four_class(self) -> bool {
        matches!(
            self,
            Pattern4::AFive
                | Pattern4::BFlex4
                | Pattern4::CBlock4Flex3
                | Pattern4::DBlock4Plus
                | Pattern4::EBlock4
        )
    }
}

/// Hint returned by the root move generator about how the position currently stands.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WinState {
    Win,
    Lose,
    Unknown,
}

/// The side to move. Search never cares which concrete color this is, only
/// that it alternates on every `make_move`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Side {
    First,
    Second,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Side::First => Side::Second,
            Side::Second => Side::First,
        }
    }

    pub fn idx(self) -> usize {
        match self {
            Side::First => 0,
            Side::Second => 1,
        }
    }
}

/// The external collaborator search is built against: a position plus an
/// incremental pattern evaluator. Search treats every implementor as a mutable
/// singleton obeying strict make/undo discipline; it never constructs board
/// state of its own beyond the scratch it keeps per ply.
pub trait Board: Clone + Debug {
    type Position: Pos;

    /// Side-length of a square board, used for the default center opening move
    /// and for sizing scratch tables.
    fn size(&self) -> usize;

    fn side_to_move(&self) -> Side;

    fn ply(&self) -> usize;

    fn zobrist(&self) -> ZobristHash;

    /// Plays `mov` for the side to move. Panics (a programmer error, per the
    /// narrow error taxonomy of this crate) if the square is occupied.
    fn make_move(&mut self, mov: Self::Position);

    /// Undoes the most recent `make_move`. Panics if there is nothing to undo.
    fn undo_move(&mut self);

    fn is_empty(&self, pos: Self::Position) -> bool;

    fn empty_count(&self) -> usize;

    /// Static, incrementally maintained evaluation for `side`, from that side's
    /// own perspective (larger is better for `side`).
    fn eval(&self, side: Side) -> i32;

    /// Number of patterns of `class` currently held by `side`.
    fn pattern_count(&self, side: Side, class: Pattern4) -> usize;

    /// The pattern class `side` would hold at `pos` right now, or `Pattern4::None`
    /// if `pos` is occupied or carries no pattern for `side`.
    fn pattern_at(&self, side: Side, pos: Self::Position) -> Pattern4;

    /// Ordering score for playing `pos` as `side`, as produced by the evaluator.
    fn score_of(&self, side: Side, pos: Self::Position) -> i32;

    /// Ordering score for a VCF attacking move at `pos` as `side`.
    fn vcf_score_of(&self, side: Side, pos: Self::Position) -> i32;

    /// All empty squares carrying a pattern of `class` or stronger for `side`.
    fn candidates_with_pattern_at_least(&self, side: Side, class: Pattern4) -> Vec<Self::Position>;

    /// All empty squares, in evaluator-preferred order, used for full move generation.
    fn all_candidates(&self) -> Vec<Self::Position>;

    /// Squares within a precomputed line-offset window of `pos`, used by the
    /// non-root VCF continuation generator to stay local to the last attack.
    fn neighbors_on_lines(&self, pos: Self::Position) -> Vec<Self::Position>;

    /// The unique empty square that completes a five for `side` against the
    /// `A_FIVE` pattern found at `threat`, i.e. the forced block.
    fn forced_block_against_five(&self, side_with_five: Side, threat: Self::Position) -> Self::Position;

    /// The unique empty square that blocks the closed four at `threat`.
    fn forced_block_against_four(&self, side_with_four: Side, threat: Self::Position) -> Self::Position;

    /// All squares that counter the open four (`B_FLEX4`) held by `attacker` at `threat`.
    fn squares_against_open_four(&self, attacker: Side, threat: Self::Position) -> Vec<Self::Position>;

    /// The board center, used by the opening policy.
    fn center(&self) -> Self::Position;

    /// True iff `pos` is farther than `margin` squares from every edge.
    fn far_from_edge(&self, pos: Self::Position, margin: usize) -> bool;

    /// The move played immediately before the current position, if any.
    fn last_move(&self) -> Option<Self::Position>;

    /// Chebyshev (chessboard) distance between two squares, used to cap move-loop
    /// branching near the horizon based on proximity to recent play.
    fn chebyshev_distance(&self, a: Self::Position, b: Self::Position) -> usize;

    /// The empty squares in the 3x3 neighborhood (Chebyshev distance 1) around `pos`.
    fn adjacent_empty(&self, pos: Self::Position) -> Vec<Self::Position>;

    fn random_legal_move(&self, rng: &mut impl Rng) -> Option<Self::Position>;
}
