use std::time::Duration;

use clap::Parser;
use colored::Colorize;

use lib::board::gomoku::GomokuBoard;
use lib::board::Board;
use lib::search::alphabeta::AlphaBetaEngine;
use lib::search::{Engine, Info, InfoCallback, SearchInfo};

/// A small command-line driver around the search core: plays a fixed number
/// of moves against itself and prints each one. The protocol front-end
/// (UGI/UCI-style I/O) is out of scope for this crate; this is a demo/bench
/// harness, not a client.
#[derive(Parser, Debug)]
#[command(name = "stones", author, version, about, long_about = None)]
struct CommandLineArgs {
    /// Board side length.
    #[arg(long, default_value_t = 15)]
    size: usize,
    /// Number of plies to self-play before stopping.
    #[arg(long, default_value_t = 10)]
    moves: usize,
    /// Per-move time budget in milliseconds.
    #[arg(long, default_value_t = 1000)]
    move_time_ms: u64,
    /// Maximum search depth per move.
    #[arg(long, default_value_t = 20)]
    max_depth: usize,
    /// Path to an override config file (`Override:1` format). Skipped if absent.
    #[arg(long)]
    config: Option<String>,
}

fn print_info(info: &SearchInfo<GomokuBoard>) {
    println!(
        "{} depth={} score={} nodes={} nps={}",
        "info".dimmed(),
        info.depth,
        info.score.0,
        info.nodes,
        info.nps()
    );
}

fn main() {
    let args = CommandLineArgs::parse();

    let mut board = GomokuBoard::new(args.size);
    let mut engine: AlphaBetaEngine<GomokuBoard> = AlphaBetaEngine::new();
    engine.set_max_depth(args.max_depth);
    engine.set_info_callback(InfoCallback { func: print_info });

    if let Some(path) = &args.config {
        if let Err(e) = engine.try_read_config(path) {
            eprintln!("{}: {e}", "failed to read config".red());
        }
    }

    let info = Info {
        timeout_turn: Duration::from_millis(args.move_time_ms),
        ..Info::default()
    };

    for ply in 0..args.moves {
        if board.empty_count() == 0 {
            println!("board is full");
            break;
        }
        let result = engine.turn_move(&mut board, info);
        println!(
            "{} {} {}",
            format!("ply {ply}:").bold(),
            result.chosen_move,
            format!("(score {})", result.score.0).dimmed()
        );
        board.make_move(result.chosen_move);
    }
}
