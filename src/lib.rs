//! # Slide Tiles Library
//!
//! This library provides the core logic of a 4x4 sliding-tile puzzle: tiles holding
//! powers of two slide in one of four directions, equal tiles merge and score, and the
//! game ends when no move remains. Reaching a 2048 tile wins.
//!
//! It is used by the `play` binary, an interactive terminal front end.
//!
//! ## Modules
//! - `engine`: Tiles (`Tile`), game state (`GameState`), directions (`Direction`) and the
//!   move-resolution engine (`Engine`): sliding, merging, spawning, win and stalemate detection.
//! - `codec`: Save codes, an opaque reversible string form of a `GameState`.
//! - `store`: The best-score store capability (`BestScoreStore`) with in-memory and
//!   file-backed implementations, and a single-slot save file.
//! - `utils`: Utility functions, such as parsing boards from strings.

pub mod codec;
pub mod engine;
pub mod store;
pub mod utils;

pub use crate::codec::{decode, encode};
pub use crate::engine::{Direction, Engine, GameState, Tile};
pub use crate::store::BestScoreStore;
