use crate::board::{Board, Pattern4, Pos, Side, WinState};
use crate::search::move_list::{MoveList, Phase};
use crate::search::{Score, MAX_PLY, WIN_MAX};

const FOUR_CLASSES: [Pattern4; 5] = [
    Pattern4::AFive,
    Pattern4::BFlex4,
    Pattern4::CBlock4Flex3,
    Pattern4::DBlock4Plus,
    Pattern4::EBlock4,
];

fn has_four_class_threat<B: Board>(board: &B, side: Side) -> bool {
    FOUR_CLASSES.iter().any(|&c| board.pattern_count(side, c) > 0)
}

/// The sole iterator used by interior alpha-beta: advances `list` through its
/// phases, generating moves lazily the first time a phase is entered.
pub fn move_next<B: Board>(board: &B, self_side: Side, list: &mut MoveList<B::Position>) -> Option<B::Position> {
    loop {
        match list.phase {
            Phase::HashMove => {
                list.phase = Phase::GenAllMoves;
                if !list.hash_move.is_null() && board.is_empty(list.hash_move) {
                    return Some(list.hash_move);
                }
            }
            Phase::GenAllMoves => {
                gen_all_moves(board, self_side, list);
                list.phase = Phase::AllMoves;
                return list.next_all_moves();
            }
            Phase::AllMoves => return list.next_all_moves(),
        }
    }
}

fn gen_all_moves<B: Board>(board: &B, self_side: Side, list: &mut MoveList<B::Position>) {
    let oppo = self_side.other();
    let oppo_fives = board.candidates_with_pattern_at_least(oppo, Pattern4::AFive);
    if !oppo_fives.is_empty() {
        let block = board.forced_block_against_five(oppo, oppo_fives[0]);
        list.push(block, 0);
        return;
    }
    let oppo_open4 = board.candidates_with_pattern_at_least(oppo, Pattern4::BFlex4);
    if !oppo_open4.is_empty() {
        gen_moves_defence(board, self_side, list);
        return;
    }
    for cell in board.all_candidates() {
        let score = board.score_of(self_side, cell);
        list.push(cell, score);
    }
    list.sort_remaining();
}

/// Generates defensive replies against an opponent open four plus attacking
/// replies via self's own closed fours, boosting every gathered defensive
/// square by 10000 over the normal candidate ordering.
fn gen_moves_defence<B: Board>(board: &B, self_side: Side, list: &mut MoveList<B::Position>) {
    let oppo = self_side.other();
    let mut defensive: Vec<B::Position> = Vec::new();
    for threat in board.candidates_with_pattern_at_least(oppo, Pattern4::BFlex4) {
        if board.pattern_at(oppo, threat) == Pattern4::BFlex4 {
            defensive.extend(board.squares_against_open_four(oppo, threat));
        }
    }
    for cell in board.candidates_with_pattern_at_least(self_side, Pattern4::EBlock4) {
        defensive.push(cell);
    }
    for cell in board.all_candidates() {
        let score = board.score_of(self_side, cell);
        list.push(cell, score);
        if defensive.contains(&cell) {
            list.boost(cell, 10_000);
        }
    }
    list.sort_remaining();
}

/// Every empty candidate where `self_side` holds a closed four or stronger,
/// scored by the evaluator's VCF-specific ordering score.
pub fn gen_moves_vcf<B: Board>(board: &B, self_side: Side) -> Vec<B::Position> {
    let mut res = board.candidates_with_pattern_at_least(self_side, Pattern4::EBlock4);
    res.sort_by_key(|&c| std::cmp::Reverse(board.vcf_score_of(self_side, c)));
    res
}

/// Restricted to squares within `anchor`'s line-offset window, for non-root VCF
/// continuations where the last attack fixes where the next one can occur.
pub fn gen_continue_moves_vcf<B: Board>(board: &B, self_side: Side, anchor: B::Position) -> Vec<B::Position> {
    let mut res: Vec<B::Position> = board
        .neighbors_on_lines(anchor)
        .into_iter()
        .filter(|&c| board.pattern_at(self_side, c).is_closed_four_or_better())
        .collect();
    res.sort_by_key(|&c| std::cmp::Reverse(board.vcf_score_of(self_side, c)));
    res.dedup();
    res
}

/// The root generator: populates `list` and reports whether the position is
/// already decided at a glance. Uses a stable sort so ties keep discovery order.
pub fn gen_move_root<B: Board>(board: &B, self_side: Side, list: &mut MoveList<B::Position>) -> WinState {
    let oppo = self_side.other();
    let win_state = if !board.candidates_with_pattern_at_least(self_side, Pattern4::AFive).is_empty()
        || !board.candidates_with_pattern_at_least(self_side, Pattern4::BFlex4).is_empty()
    {
        WinState::Win
    } else if board.candidates_with_pattern_at_least(oppo, Pattern4::AFive).len() >= 2 {
        WinState::Lose
    } else {
        WinState::Unknown
    };
    let hash_move = list.hash_move;
    for cell in board.all_candidates() {
        let score = board.score_of(self_side, cell);
        list.push(cell, score);
        if cell == hash_move {
            list.boost(cell, 10_000);
        }
    }
    list.sort_remaining();
    win_state
}

/// A ply-cheap tactical oracle consulted before doing any real search work.
pub fn quick_win_check<B: Board>(board: &mut B, self_side: Side, ply: usize) -> Score {
    let oppo = self_side.other();
    if board.pattern_count(self_side, Pattern4::AFive) > 0 {
        return Score(WIN_MAX - ply as i32);
    }
    let oppo_fives = board.pattern_count(oppo, Pattern4::AFive);
    if oppo_fives >= 2 {
        return Score(-WIN_MAX + ply as i32 + 1);
    }
    if oppo_fives == 1 {
        return Score(0);
    }
    if board.pattern_count(self_side, Pattern4::BFlex4) > 0 {
        return Score(WIN_MAX - ply as i32 - 2);
    }
    let oppo_has_four_threat = has_four_class_threat(board, oppo);
    if board.pattern_count(self_side, Pattern4::CBlock4Flex3) > 0
        && !oppo_has_four_threat
        && verify_double_threat(board, self_side)
    {
        return Score(WIN_MAX - ply as i32 - 4);
    }
    // `F_FLEX3_2X` is preserved here for completeness even though the flag that
    // would feed it is always cleared upstream before it is consulted in the
    // reference evaluator (see DESIGN.md); this branch is reachable only with a
    // board implementation that does not clear it.
    if board.pattern_count(self_side, Pattern4::FFlex3x2) > 0 && !oppo_has_four_threat {
        return Score(WIN_MAX - ply as i32 - 4);
    }
    Score(0)
}

/// Confirms a `C_BLOCK4_FLEX3` double threat actually wins: play it, let the
/// opponent make their forced reply, and check that reply didn't itself counter
/// with a four. Always undoes everything it plays.
fn verify_double_threat<B: Board>(board: &mut B, self_side: Side) -> bool {
    let candidates = board.candidates_with_pattern_at_least(self_side, Pattern4::CBlock4Flex3);
    let Some(&mov) = candidates.first() else {
        return false;
    };
    board.make_move(mov);
    let block = board.forced_block_against_four(self_side, mov);
    let result = if block.is_null() || !board.is_empty(block) {
        false
    } else {
        board.make_move(block);
        let oppo_now_threatens = has_four_class_threat(board, self_side.other());
        board.undo_move();
        !oppo_now_threatens
    };
    board.undo_move();
    result
}

/// Optional auxiliary: when self holds `D_BLOCK4_PLUS`/`E_BLOCK4` threats,
/// simulates the forced attacker-four/defender-block sequence until self has no
/// closed fours left, then judges whether the opponent's remaining open fours
/// dominate. Every simulated move is undone before returning.
pub fn quick_defence_check<B: Board>(board: &mut B, self_side: Side, ply: usize) -> Score {
    let oppo = self_side.other();
    let has_threat =
        board.pattern_count(self_side, Pattern4::DBlock4Plus) > 0 || board.pattern_count(self_side, Pattern4::EBlock4) > 0;
    if !has_threat {
        return Score(0);
    }
    let mut made = 0usize;
    loop {
        if made >= MAX_PLY {
            break;
        }
        let fours = board.candidates_with_pattern_at_least(self_side, Pattern4::EBlock4);
        let Some(&mov) = fours.first() else {
            break;
        };
        board.make_move(mov);
        made += 1;
        let block = board.forced_block_against_four(self_side, mov);
        if block.is_null() || !board.is_empty(block) {
            break;
        }
        board.make_move(block);
        made += 1;
    }
    let self_b4 = board.pattern_count(self_side, Pattern4::EBlock4) + board.pattern_count(self_side, Pattern4::DBlock4Plus);
    let oppo_open4 = board.pattern_count(oppo, Pattern4::BFlex4);
    let result = if oppo_open4 > 0 {
        Score(-WIN_MAX + ply as i32 + 3 + (self_b4 as i32) / 2)
    } else {
        Score(0)
    };
    for _ in 0..made {
        board.undo_move();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::gomoku::{Cell, GomokuBoard};

    #[test]
    fn move_next_forces_block_against_five() {
        let mut b = GomokuBoard::new(15);
        for col in 4..8 {
            b.make_move(Cell::new(7, col));
            if col != 7 {
                b.make_move(Cell::new(0, col));
            }
        }
        // First to move now faces a First A_FIVE threat at (7,8) or (7,3); it's
        // Second's turn since the loop above ends after First's move.
        let mut list: MoveList<Cell> = MoveList::default();
        list.reset(Cell::NULL);
        let mov = move_next(&b, Side::Second, &mut list);
        assert!(mov.is_some());
        assert_eq!(move_next(&b, Side::Second, &mut list), None);
    }

    #[test]
    fn quick_win_check_detects_opponent_open_four() {
        let mut b = GomokuBoard::new(15);
        for col in 4..8 {
            b.make_move(Cell::new(7, col));
            if col != 7 {
                b.make_move(Cell::new(0, col));
            }
        }
        // First now holds an open four; it's Second's move and Second is lost.
        let side = b.side_to_move();
        let score = quick_win_check(&mut b, side, b.ply());
        assert!(score.is_mate());
        assert!(score.is_loss());
    }
}
