use std::time::{Duration, Instant};

use rand::Rng;

use crate::board::Board;
use crate::search::Info;

pub const TIME_RESERVED_MS: i64 = 40;
pub const MATCH_SPARE: f64 = 23.0;
pub const MATCH_SPARE_MIN: f64 = 7.0;
pub const BM_STABLE_MIN: u32 = 3;
pub const BM_CHANGE_MIN_DEPTH: usize = 7;
pub const TIMEOUT_PREVENT: i64 = 45;

fn time_for_turn(info: &Info, move_left: usize, max_cells: usize) -> Duration {
    let timeout_turn_ms = info.timeout_turn.as_millis() as i64;
    let time_left_ms = info.time_left.as_millis() as i64;
    let divisor = (MATCH_SPARE * move_left as f64 / max_cells.max(1) as f64)
        .round()
        .max(MATCH_SPARE_MIN);
    let budget_ms = (time_left_ms as f64 / divisor) as i64;
    let result = timeout_turn_ms.min(budget_ms) - TIME_RESERVED_MS;
    Duration::from_millis(result.max(0) as u64)
}

fn time_for_turn_max(info: &Info) -> Duration {
    let timeout_turn_ms = info.timeout_turn.as_millis() as i64;
    let time_left_ms = info.time_left.as_millis() as i64;
    let budget_ms = (time_left_ms as f64 / MATCH_SPARE_MIN) as i64;
    let result = timeout_turn_ms.min(budget_ms) - TIME_RESERVED_MS;
    Duration::from_millis(result.max(0) as u64)
}

/// Drives the per-turn budget: a base allocation derived from the match clock,
/// revised up or down as the iterative deepener reports whether the best move
/// is still changing.
#[derive(Debug)]
pub struct TimeManager {
    pub start: Instant,
    base_budget: Duration,
    budget: Duration,
    max_budget: Duration,
    stable_count: u32,
}

impl TimeManager {
    pub fn new<B: Board>(info: &Info, board: &B) -> Self {
        let move_left = (board.empty_count() / 2).max(1);
        let max_cells = board.size() * board.size();
        let base_budget = time_for_turn(info, move_left, max_cells);
        let max_budget = time_for_turn_max(info).max(base_budget);
        Self {
            start: Instant::now(),
            base_budget,
            budget: base_budget,
            max_budget,
            stable_count: 0,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn soft_limit_reached(&self) -> bool {
        self.elapsed() >= self.budget
    }

    pub fn hard_limit_reached(&self) -> bool {
        self.elapsed() >= self.max_budget
    }

    pub fn hard_limit(&self) -> Duration {
        self.max_budget
    }

    /// Revises the budget after a completed root iteration.
    pub fn on_iteration_complete(&mut self, depth: usize, best_move_changed: bool) {
        if !best_move_changed {
            self.stable_count += 1;
            if self.stable_count >= BM_STABLE_MIN {
                self.budget = self.budget.mul_f64(0.9).max(self.base_budget / 3);
            }
        } else {
            self.stable_count = 0;
            if depth >= BM_CHANGE_MIN_DEPTH {
                self.budget = self.budget.mul_f64(1.05).min(self.max_budget);
            }
        }
    }

    /// "(time low OR elapsed dominates) AND next iteration is likely over
    /// budget": read as comparing the scaled current budget against the last
    /// iteration's duration scaled by `TIMEOUT_PREVENT`. See DESIGN.md for why
    /// this precedence was chosen over the source's unparenthesized form.
    pub fn next_iteration_likely_over_budget(&self, last_iteration_elapsed: Duration) -> bool {
        let turn_time = self.budget.as_millis() as i64 * 10;
        let predicted = last_iteration_elapsed.as_millis() as i64 * TIMEOUT_PREVENT;
        turn_time <= predicted
    }
}

/// Plays the book-free opening heuristic described for the first couple of
/// plies. Returns `None` to defer to the normal iterative-deepening search.
pub fn opening_move<B: Board>(board: &B, rng: &mut impl Rng) -> Option<B::Position> {
    if board.ply() == 0 {
        return Some(board.center());
    }
    if board.ply() == 1 {
        let last = board.last_move().expect("ply 1 implies a move has been played");
        if last == board.center() {
            return Some(board.center());
        }
        if board.far_from_edge(last, 2) {
            let candidates = board.adjacent_empty(last);
            if !candidates.is_empty() {
                return Some(candidates[rng.gen_range(0..candidates.len())]);
            }
        }
        // Close to the edge: fall through and let the normal search seed from
        // the wider candidate radius `all_candidates` already produces.
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::gomoku::GomokuBoard;
    use rand::thread_rng;

    #[test]
    fn empty_board_opens_at_center() {
        let b = GomokuBoard::new(15);
        let mut rng = thread_rng();
        assert_eq!(opening_move(&b, &mut rng), Some(b.center()));
    }

    #[test]
    fn reply_to_center_is_center_too() {
        let mut b = GomokuBoard::new(15);
        let c = b.center();
        b.make_move(c);
        let mut rng = thread_rng();
        assert_eq!(opening_move(&b, &mut rng), Some(c));
    }

    #[test]
    fn budget_shrinks_after_stable_best_move() {
        let info = Info::default();
        let b = GomokuBoard::new(15);
        let mut tm = TimeManager::new(&info, &b);
        let before = tm.budget;
        for _ in 0..BM_STABLE_MIN {
            tm.on_iteration_complete(3, false);
        }
        assert!(tm.budget < before);
    }
}
