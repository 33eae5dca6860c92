use std::time::{Duration, Instant};

use crate::board::{Board, Pattern4, Pos, Side, WinState};
use crate::search::config::Config;
use crate::search::move_list::MoveList;
use crate::search::movegen::{gen_move_root, move_next, quick_win_check};
use crate::search::time_manager::{opening_move, TimeManager};
use crate::search::tt::{Bound, TT};
use crate::search::vcf::{vcf_search, VcfContext};
use crate::search::{Engine, Info, InfoCallback, Score, SearchInfo, SearchResult, MAX_PLY, MAX_SEARCH_DEPTH, WIN_MAX, WIN_MIN};

const RAZORING_DEPTH: f32 = 4.0;
const FUTILITY_DEPTH: f32 = 4.0;
/// Ply at which a bare static evaluation is trusted enough to return from a
/// depth-exhausted leaf. The source leaves this implicit; chosen here to keep
/// the very first few plies of every line fully searched. See DESIGN.md.
const MIN_EVAL_PLY: usize = 2;
const LMR_MIN_BRANCH_PV: usize = 30;
const LMR_MIN_BRANCH_NON_PV: usize = 20;
const MAX_WINNING_CHECK_BRANCH: usize = 50;
const SINGULAR_MIN_DEPTH: f32 = 8.0;
const TIME_SAMPLE_NODES: u64 = 3_000;

fn max_branch(ply: usize) -> usize {
    (64i64 - 2 * ply as i64).max(25) as usize
}

/// Per-ply search scratch: invariants hold that a slot is always overwritten
/// before being read again at the same ply, per the data model.
#[derive(Clone)]
struct Scratch<B: Board> {
    raw_eval: Vec<i32>,
    excluded: Vec<B::Position>,
    move_lists: Vec<MoveList<B::Position>>,
}

impl<B: Board> Scratch<B> {
    fn new() -> Self {
        Self {
            raw_eval: vec![0; MAX_PLY],
            excluded: vec![B::Position::NULL; MAX_PLY],
            move_lists: (0..MAX_PLY).map(|_| MoveList::default()).collect(),
        }
    }
}

/// The engine: iterative-deepening PVS alpha-beta plus its dedicated VCF
/// searcher, built against a single transposition table.
pub struct AlphaBetaEngine<B: Board> {
    tt: TT<B>,
    config: Config,
    nodes: u64,
    terminated: bool,
    max_depth: usize,
    info_callback: InfoCallback<B>,
    scratch: Scratch<B>,
    deepest_ply: usize,
    time_manager: Option<TimeManager>,
    lost_moves: Vec<B::Position>,
    root_best_move_change_count: u32,
}

impl<B: Board> std::fmt::Debug for AlphaBetaEngine<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlphaBetaEngine").field("nodes", &self.nodes).finish()
    }
}

impl<B: Board> Default for AlphaBetaEngine<B> {
    fn default() -> Self {
        Self {
            tt: TT::default(),
            config: Config::default(),
            nodes: 0,
            terminated: false,
            max_depth: MAX_SEARCH_DEPTH,
            info_callback: InfoCallback::default(),
            scratch: Scratch::new(),
            deepest_ply: 0,
            time_manager: None,
            lost_moves: Vec::new(),
            root_best_move_change_count: 0,
        }
    }
}

impl<B: Board> AlphaBetaEngine<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    fn hard_deadline(&self) -> Instant {
        match &self.time_manager {
            Some(tm) => tm.start + tm.hard_limit(),
            None => Instant::now() + Duration::from_secs(3600),
        }
    }

    fn sample_time(&mut self) {
        if self.nodes % TIME_SAMPLE_NODES == 0 {
            if let Some(tm) = &self.time_manager {
                if tm.hard_limit_reached() {
                    self.terminated = true;
                }
            }
        }
    }

    /// Step 4.4: interior alpha-beta. `IS_PV` selects PVS's two node types;
    /// `PV` implies `!cut_node` at the call site.
    fn alphabeta<const IS_PV: bool>(
        &mut self,
        board: &mut B,
        depth: f32,
        mut alpha: Score,
        mut beta: Score,
        ply: usize,
        cut_node: bool,
    ) -> Score {
        // 1. Mate-distance pruning.
        alpha = alpha.max(Score(-WIN_MAX + ply as i32));
        beta = beta.min(Score(WIN_MAX - ply as i32 - 1));
        if alpha >= beta {
            return alpha;
        }

        let self_side = board.side_to_move();
        let oppo = self_side.other();

        // 2. Immediate tactical check.
        let quick = quick_win_check(board, self_side, ply);
        if quick.0 != 0 {
            self.deepest_ply = self.deepest_ply.max(ply);
            return quick;
        }
        // `quick_defence_check` is only ever reached through a flag that is
        // permanently false in the reference search (see DESIGN.md); kept
        // unwired here to match that dead-in-practice status rather than
        // making it affect every node's result.

        // 3. Draw.
        if board.empty_count() <= 1 {
            return Score(0);
        }

        // 4. Static evaluation, smoothed against the previous ply's raw value.
        let raw_static = board.eval(self_side) - board.eval(oppo);
        let static_eval = if ply >= 1 {
            Score((raw_static - self.scratch.raw_eval[ply - 1]) / 2)
        } else {
            Score(raw_static)
        };
        self.scratch.raw_eval[ply] = raw_static;

        // 5. Leaf.
        if depth <= 0.0 && ply >= MIN_EVAL_PLY {
            if let Some(score) = self.leaf_vcf_probe(board, self_side, ply, static_eval, alpha, beta) {
                return score;
            }
            return static_eval;
        }

        // 6. TT probe.
        let is_singular_context = !self.scratch.excluded[ply].is_null();
        let (hit, tt_entry) = self.tt.probe(board.zobrist(), ply);
        let mut hash_move = B::Position::NULL;
        let mut static_eval = static_eval;
        if hit {
            hash_move = tt_entry.best_move;
            if !is_singular_context && tt_entry.usable_for(depth, alpha, beta) {
                return tt_entry.score;
            }
            let consistent = match tt_entry.bound {
                Bound::LowerBound => tt_entry.score > static_eval,
                Bound::UpperBound => tt_entry.score < static_eval,
                Bound::Exact => true,
                Bound::Empty => false,
            };
            if consistent {
                static_eval = tt_entry.score;
            }
        }

        // 7. Time sampling.
        self.nodes += 1;
        self.sample_time();
        if self.terminated {
            return Score(0);
        }

        // 8. Razoring (non-PV only).
        if !IS_PV && depth < RAZORING_DEPTH {
            let margin_idx = (depth.max(0.0) as usize).min(3);
            if static_eval.0 + self.config.razoring_margin[margin_idx] < alpha.0 {
                return static_eval;
            }
        }

        // 9. Futility.
        if depth < FUTILITY_DEPTH {
            let margin_idx = (depth.max(0.0) as usize).min(3);
            if static_eval.0 - self.config.futility_margin[margin_idx] >= beta.0 {
                return static_eval;
            }
        }

        // 10. Internal iterative deepening.
        let oppo_threatens_open_four = board.pattern_count(oppo, Pattern4::BFlex4) > 0;
        if IS_PV && hash_move.is_null() && depth >= self.config.iid_min_depth as f32 && !oppo_threatens_open_four {
            self.alphabeta::<true>(board, depth * 2.0 / 3.0, alpha, beta, ply, cut_node);
            let (hit2, entry2) = self.tt.probe(board.zobrist(), ply);
            if hit2 {
                hash_move = entry2.best_move;
            }
        }

        // 11. Move loop.
        self.scratch.move_lists[ply].reset(hash_move);
        let mut best = Score(-WIN_MAX - 1);
        let mut best_move = B::Position::NULL;
        let mut bound = Bound::UpperBound;
        let mut branch = 0usize;

        loop {
            let mov = {
                let list = &mut self.scratch.move_lists[ply];
                move_next(board, self_side, list)
            };
            let Some(mov) = mov else { break };
            if mov == self.scratch.excluded[ply] {
                continue;
            }
            branch += 1;

            let self_p4 = board.pattern_at(self_side, mov);
            let oppo_p4 = board.pattern_at(oppo, mov);
            let has_threat_at_move = self_p4 != Pattern4::None || oppo_p4 != Pattern4::None;

            if !has_threat_at_move {
                let cap = if best.0 <= -WIN_MIN {
                    MAX_WINNING_CHECK_BRANCH
                } else {
                    max_branch(ply)
                };
                if branch > cap {
                    break;
                }
                if !IS_PV && best.0 > -WIN_MIN && ply + 2 >= MIN_EVAL_PLY && depth - 1.0 <= 1.0 {
                    let proximity_cap = match board.last_move() {
                        Some(last) if board.chebyshev_distance(last, mov) <= 2 => 24,
                        Some(last) if board.chebyshev_distance(last, mov) <= 4 => 18,
                        _ => 10,
                    };
                    if branch > proximity_cap {
                        break;
                    }
                }
            }

            // Singular extension.
            let mut extension = 0.0f32;
            if depth >= SINGULAR_MIN_DEPTH
                && board.pattern_count(oppo, Pattern4::AFive) == 0
                && !is_singular_context
                && hit
                && tt_entry.bound == Bound::LowerBound
                && tt_entry.depth as f32 >= depth - 3.0
                && mov == hash_move
            {
                let r_beta = Score(tt_entry.score.0 - (self.config.se_beta_margin * depth) as i32);
                self.scratch.excluded[ply] = mov;
                let se_value = self.alphabeta::<false>(board, depth / 2.0, r_beta - Score(1), r_beta, ply, true);
                self.scratch.excluded[ply] = B::Position::NULL;
                if se_value < r_beta {
                    extension = 1.0;
                }
            }

            board.make_move(mov);
            let new_depth = depth - 1.0 + extension;

            let mut value;
            if IS_PV && branch == 1 {
                value = -self.alphabeta::<true>(board, new_depth, -beta, -alpha, ply + 1, false);
            } else {
                let mut reduction = 0.0f32;
                let lmr_min_branch = if IS_PV { LMR_MIN_BRANCH_PV } else { LMR_MIN_BRANCH_NON_PV };
                if new_depth >= 3.0 && !oppo_threatens_open_four && branch >= lmr_min_branch {
                    reduction = (branch - lmr_min_branch) as f32 * 0.5 * self.config.depth_reduction_base.max(0.01);
                    if cut_node {
                        reduction += 1.0;
                    }
                    if self_p4.is_four_class() || oppo_p4.is_four_class() {
                        reduction -= 1.0;
                    }
                    reduction = reduction.clamp(0.0, new_depth - 1.0).max(0.0);
                }
                value = -self.alphabeta::<false>(board, new_depth - reduction, -(alpha + Score(1)), -alpha, ply + 1, !cut_node);
                if reduction > 0.0 && value > alpha {
                    value = -self.alphabeta::<false>(board, new_depth, -(alpha + Score(1)), -alpha, ply + 1, !cut_node);
                }
                if IS_PV && value > alpha && value < beta {
                    value = -self.alphabeta::<true>(board, new_depth, -beta, -alpha, ply + 1, false);
                }
            }

            board.undo_move();

            if self.terminated {
                break;
            }

            if value > best {
                best = value;
                best_move = mov;
                if value >= beta {
                    bound = Bound::LowerBound;
                    break;
                }
                if value > alpha {
                    alpha = value;
                    bound = Bound::Exact;
                }
            }
        }

        // 12. TT store.
        if !self.terminated && !is_singular_context {
            self.tt.save(board.zobrist(), best_move, best, depth, bound, ply);
        }
        best
    }

    fn leaf_vcf_probe(
        &mut self,
        board: &mut B,
        self_side: Side,
        ply: usize,
        static_eval: Score,
        alpha: Score,
        beta: Score,
    ) -> Option<Score> {
        let oppo = self_side.other();
        let deadline = self.hard_deadline();
        let oppo_has_five = board.pattern_count(oppo, Pattern4::AFive) > 0;

        if static_eval >= beta {
            // Failing high looks good for self, but a forced opponent five
            // would make that a lie; check it before trusting the bound.
            if oppo_has_five && has_closed_four(board, oppo) {
                let mut terminated = false;
                let mut ctx = VcfContext { nodes: 0, terminated: &mut terminated, deadline };
                let v = vcf_search::<B, true>(board, &mut self.tt, &mut ctx, oppo, B::Position::NULL, ply, ply);
                self.terminated |= terminated;
                if v.is_mate() {
                    return Some(-v);
                }
            }
        } else if !oppo_has_five {
            if has_closed_four(board, self_side) {
                let mut terminated = false;
                let mut ctx = VcfContext { nodes: 0, terminated: &mut terminated, deadline };
                let v = vcf_search::<B, true>(board, &mut self.tt, &mut ctx, self_side, B::Position::NULL, ply, ply);
                self.terminated |= terminated;
                if v.is_mate() {
                    self.deepest_ply = self.deepest_ply.max(ply);
                    return Some(v);
                }
            }
        } else if static_eval >= alpha && has_closed_four(board, oppo) {
            let mut terminated = false;
            let mut ctx = VcfContext { nodes: 0, terminated: &mut terminated, deadline };
            let v = vcf_search::<B, true>(board, &mut self.tt, &mut ctx, oppo, B::Position::NULL, ply, ply);
            self.terminated |= terminated;
            if v.is_mate() {
                return Some(-v);
            }
        }
        None
    }

    /// Step 4.5: the root search. Differs from the interior search in move-
    /// time bookkeeping and in how lost candidates are retired between
    /// iterations.
    fn alphabeta_root(&mut self, board: &mut B, depth: f32, info: &Info) -> (Score, B::Position, Vec<B::Position>) {
        let self_side = board.side_to_move();
        let mut list = MoveList::default();
        let (hit, entry) = self.tt.probe(board.zobrist(), 0);
        list.reset(if hit { entry.best_move } else { B::Position::NULL });
        let win_state = gen_move_root(board, self_side, &mut list);

        let candidates: Vec<B::Position> = list
            .as_slice()
            .iter()
            .copied()
            .filter(|c| !self.lost_moves.contains(c))
            .collect();

        if candidates.is_empty() {
            let fallback = board.all_candidates().into_iter().next().unwrap_or(board.center());
            return (Score(0), fallback, Vec::new());
        }
        if candidates.len() == 1 {
            return (Score(0), candidates[0], Vec::new());
        }
        match win_state {
            WinState::Win => {
                return (Score(WIN_MAX - 1), candidates[0], Vec::new());
            }
            WinState::Lose => {}
            WinState::Unknown => {}
        }

        let mut alpha = Score(-WIN_MAX - 1);
        let beta = Score(WIN_MAX + 1);
        let mut best_move = candidates[0];
        let mut best = alpha;
        let mut newly_lost = Vec::new();

        for (branch, &mov) in candidates.iter().enumerate() {
            if let Some(tm) = &self.time_manager {
                let move_guard = branch > 0
                    && tm.elapsed() + Duration::from_millis(0) > tm.hard_limit().saturating_sub(Duration::from_millis(200));
                if move_guard {
                    break;
                }
            }
            board.make_move(mov);
            let value = if branch == 0 {
                -self.alphabeta::<true>(board, depth - 1.0, -beta, -alpha, 1, false)
            } else {
                let v = -self.alphabeta::<false>(board, depth - 1.0, -(alpha + Score(1)), -alpha, 1, true);
                if v > alpha && v < beta {
                    -self.alphabeta::<true>(board, depth - 1.0, -beta, -alpha, 1, false)
                } else {
                    v
                }
            };
            board.undo_move();

            if self.terminated {
                break;
            }
            if value.0 <= -WIN_MIN {
                newly_lost.push(mov);
            }
            if value > best {
                best = value;
                best_move = mov;
                alpha = alpha.max(value);
                self.root_best_move_change_count += 1;
            }
            let _ = info;
        }
        (best, best_move, newly_lost)
    }

    /// Step 4.6: the iterative deepener and its time manager.
    fn iterative_deepening(&mut self, board: &mut B, info: Info) -> SearchResult<B> {
        self.nodes = 0;
        self.terminated = false;
        self.deepest_ply = 0;
        self.lost_moves.clear();
        self.tt.new_search();
        self.time_manager = Some(TimeManager::new(&info, board));

        if self.config.use_opening_book {
            use rand::thread_rng;
            if let Some(mov) = opening_move(board, &mut thread_rng()) {
                return SearchResult { chosen_move: mov, score: Score(0), pv: vec![mov], nodes: 0 };
            }
        }

        let mut best_move = board.all_candidates().into_iter().next().unwrap_or(board.center());
        let mut best_score = Score(0);
        let mut last_iter_elapsed = Duration::ZERO;

        for depth in 2..=self.max_depth.min(MAX_SEARCH_DEPTH) {
            let iter_start = Instant::now();
            self.root_best_move_change_count = 0;
            let (score, mov, newly_lost) = self.alphabeta_root(board, depth as f32, &info);
            if mov.is_null() {
                break;
            }
            self.lost_moves.extend(newly_lost);

            if self.terminated && self.nodes == 0 {
                break;
            }

            best_move = mov;
            best_score = score;
            last_iter_elapsed = iter_start.elapsed();

            self.info_callback.call(&SearchInfo {
                depth,
                score,
                best_move: mov,
                elapsed: self.time_manager.as_ref().unwrap().elapsed(),
                nodes: self.nodes,
                pv: vec![mov],
            });

            let best_move_changed = self.root_best_move_change_count > 0;
            if let Some(tm) = &mut self.time_manager {
                tm.on_iteration_complete(depth, best_move_changed);
            }

            if self.terminated || best_score.is_mate() {
                break;
            }
            if let Some(tm) = &self.time_manager {
                if tm.soft_limit_reached() {
                    break;
                }
                if tm.next_iteration_likely_over_budget(last_iter_elapsed) {
                    break;
                }
            }
        }

        SearchResult { chosen_move: best_move, score: best_score, pv: vec![best_move], nodes: self.nodes }
    }
}

fn has_closed_four<B: Board>(board: &B, side: Side) -> bool {
    board.pattern_count(side, Pattern4::EBlock4) > 0
        || board.pattern_count(side, Pattern4::DBlock4Plus) > 0
        || board.pattern_count(side, Pattern4::CBlock4Flex3) > 0
}

impl<B: Board> Engine<B> for AlphaBetaEngine<B> {
    fn new_game(&mut self) {
        self.tt.clear();
        self.lost_moves.clear();
        self.terminated = false;
    }

    fn set_max_depth(&mut self, depth: usize) {
        self.max_depth = depth.clamp(2, 255);
    }

    fn turn_move(&mut self, pos: &mut B, info: Info) -> SearchResult<B> {
        self.iterative_deepening(pos, info)
    }

    fn stop_thinking(&mut self) {
        self.terminated = true;
    }

    fn clear_hash(&mut self) {
        self.tt.clear();
    }

    fn try_read_config(&mut self, path: &str) -> Result<(), String> {
        self.config.load_overrides(path)?;
        if self.config.reload_config_on_each_move {
            self.tt.clear();
        }
        Ok(())
    }

    fn set_info_callback(&mut self, callback: InfoCallback<B>) {
        self.info_callback = callback;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::gomoku::GomokuBoard;

    #[test]
    fn empty_board_turn_move_is_center() {
        let mut engine: AlphaBetaEngine<GomokuBoard> = AlphaBetaEngine::new();
        let mut board = GomokuBoard::new(15);
        let result = engine.turn_move(&mut board, Info::default());
        assert_eq!(result.chosen_move, board.center());
    }

    #[test]
    fn forced_block_against_five_is_found_quickly() {
        let mut engine: AlphaBetaEngine<GomokuBoard> = AlphaBetaEngine::new();
        engine.config.use_opening_book = false;
        let mut board = GomokuBoard::new(15);
        for col in 4..8 {
            board.make_move(crate::board::gomoku::Cell::new(7, col));
            if col != 7 {
                board.make_move(crate::board::gomoku::Cell::new(0, col));
            }
        }
        let mut info = Info::default();
        info.timeout_turn = Duration::from_millis(200);
        let result = engine.turn_move(&mut board, info);
        assert!(result.chosen_move == crate::board::gomoku::Cell::new(7, 3) || result.chosen_move == crate::board::gomoku::Cell::new(7, 8));
    }
}
