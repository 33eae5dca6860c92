use std::fmt::Debug;
use std::time::Duration;

use derive_more::{Add, Neg, Sub};

use crate::board::Board;

pub mod alphabeta;
pub mod config;
pub mod move_list;
pub mod movegen;
pub mod time_manager;
pub mod tt;
pub mod vcf;

/// Forced-mate upper bound: a score this large (or larger, once a distance-to-mate
/// offset is subtracted) means a proven win.
pub const WIN_MAX: i32 = 30_000;
/// The smallest magnitude still counted as a mate score. Anything strictly inside
/// `(-WIN_MIN, WIN_MIN)` is a heuristic evaluation, not a proof.
pub const WIN_MIN: i32 = 29_000;

pub const MAX_PLY: usize = 150;
pub const MAX_SEARCH_DEPTH: usize = 64;

/// A search score from the perspective of the side to move (negamax convention).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Add, Sub, Neg, Default)]
pub struct Score(pub i32);

impl Score {
    pub const DRAW: Score = Score(0);

    pub fn is_mate(self) -> bool {
        self.0.abs() >= WIN_MIN
    }

    pub fn is_win(self) -> bool {
        self.0 >= WIN_MIN
    }

    pub fn is_loss(self) -> bool {
        self.0 <= -WIN_MIN
    }

    /// Plies until mate, signed so that a loss is negative. `None` for non-mate scores.
    pub fn mate_in_plies(self) -> Option<i32> {
        if self.is_win() {
            Some(WIN_MAX - self.0)
        } else if self.is_loss() {
            Some(-(WIN_MAX + self.0))
        } else {
            None
        }
    }
}

/// Caller-writable search parameters, named to match the protocol front-end's view
/// of the engine (the front end itself is out of scope here).
#[derive(Debug, Copy, Clone)]
pub struct Info {
    pub timeout_turn: Duration,
    pub timeout_match: Duration,
    pub time_left: Duration,
    pub max_memory: usize,
    pub exact5: bool,
    pub renju: bool,
}

impl Default for Info {
    fn default() -> Self {
        Self {
            timeout_turn: Duration::from_secs(30),
            timeout_match: Duration::MAX,
            time_left: Duration::from_secs(600),
            max_memory: 256 * 1024 * 1024,
            exact5: true,
            renju: false,
        }
    }
}

/// Telemetry emitted once per completed root iteration. The front end is
/// responsible for formatting/printing; this crate never writes to stdout itself
/// outside of `main`'s own demo loop.
#[derive(Debug, Clone)]
pub struct SearchInfo<B: Board> {
    pub depth: usize,
    pub score: Score,
    pub best_move: B::Position,
    pub elapsed: Duration,
    pub nodes: u64,
    pub pv: Vec<B::Position>,
}

impl<B: Board> SearchInfo<B> {
    pub fn nps(&self) -> u64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            0
        } else {
            (self.nodes as f64 / secs) as u64
        }
    }

    /// Default for callers that don't care about telemetry.
    pub fn ignore(_info: &SearchInfo<B>) {}
}

#[derive(Clone)]
pub struct InfoCallback<B: Board> {
    pub func: fn(&SearchInfo<B>),
}

impl<B: Board> InfoCallback<B> {
    pub fn call(&self, info: &SearchInfo<B>) {
        (self.func)(info)
    }
}

impl<B: Board> Default for InfoCallback<B> {
    fn default() -> Self {
        Self {
            func: SearchInfo::ignore,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchResult<B: Board> {
    pub chosen_move: B::Position,
    pub score: Score,
    pub pv: Vec<B::Position>,
    pub nodes: u64,
}

/// The engine API consumed by the protocol front-end, per the external-interfaces
/// section: one active search at a time, run to completion before returning.
pub trait Engine<B: Board>: Debug {
    fn new_game(&mut self);

    fn set_max_depth(&mut self, depth: usize);

    fn turn_move(&mut self, pos: &mut B, info: Info) -> SearchResult<B>;

    fn stop_thinking(&mut self);

    fn clear_hash(&mut self);

    fn try_read_config(&mut self, path: &str) -> Result<(), String>;

    fn set_info_callback(&mut self, callback: InfoCallback<B>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mate_distance_round_trips() {
        let s = Score(WIN_MAX - 4);
        assert_eq!(s.mate_in_plies(), Some(4));
        let s = Score(-WIN_MAX + 5);
        assert_eq!(s.mate_in_plies(), Some(-5));
        assert_eq!(Score(0).mate_in_plies(), None);
    }

    #[test]
    fn negation_flips_perspective() {
        let s = Score(123);
        assert_eq!(-s, Score(-123));
    }
}
