//! An iterative-deepening alpha-beta search core for Gomoku/Renju-style games.
//!
//! The crate is split into two modules: [`board`] holds the position
//! representation and incremental pattern evaluator the search is built
//! against, and [`search`] holds the engine itself (move ordering, VCF,
//! transposition table, time management, and the alpha-beta driver).

pub mod board;
pub mod search;
