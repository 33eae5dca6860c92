use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};

use lib::board::gomoku::GomokuBoard;
use lib::board::Board;
use lib::search::alphabeta::AlphaBetaEngine;
use lib::search::{Engine, Info};

fn search_from_empty_board(c: &mut Criterion) {
    c.bench_function("search depth-limited from empty board", |b| {
        b.iter(|| {
            let mut board = GomokuBoard::new(15);
            let mut engine: AlphaBetaEngine<GomokuBoard> = AlphaBetaEngine::new();
            engine.set_max_depth(4);
            let info = Info {
                timeout_turn: Duration::from_secs(5),
                ..Info::default()
            };
            engine.turn_move(&mut board, info)
        });
    });
}

fn search_from_midgame(c: &mut Criterion) {
    c.bench_function("search depth-limited from a midgame position", |b| {
        b.iter(|| {
            let mut board = GomokuBoard::new(15);
            for (col, opp_col) in [(5, 2), (6, 3), (7, 9)] {
                board.make_move(lib::board::gomoku::Cell::new(7, col));
                board.make_move(lib::board::gomoku::Cell::new(12, opp_col));
            }
            let mut engine: AlphaBetaEngine<GomokuBoard> = AlphaBetaEngine::new();
            engine.set_max_depth(4);
            let info = Info {
                timeout_turn: Duration::from_secs(5),
                ..Info::default()
            };
            engine.turn_move(&mut board, info)
        });
    });
}

criterion_group!(benches, search_from_empty_board, search_from_midgame);
criterion_main!(benches);
