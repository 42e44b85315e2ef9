//! Move-resolution engine for the sliding-tile puzzle.
//!
//! This module defines the game's fundamental components:
//! - `Direction`: The four directions a move can slide the board in.
//! - `Tile`: A numbered piece on the 4x4 grid, with a stable identity.
//! - `GameState`: The full session state (tiles, score, best score, win/over flags).
//! - `Engine`: Owns the random source, the best-score store and the tile-id counter,
//!   and resolves moves into new `GameState`s without mutating the input state.
//!
//! The pure parts of a move (sliding and merging) live in [`slide`], which is
//! deterministic; the engine adds the random spawn, the win/stalemate checks and
//! the best-score bookkeeping on top of it.
use log::{debug, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use crate::store::BestScoreStore;

/// Width and height of the (square) grid.
pub const GRID_SIZE: usize = 4;

/// Number of cells on the grid.
pub const CELL_COUNT: usize = GRID_SIZE * GRID_SIZE;

/// A tile of at least this value wins the game.
pub const WIN_VALUE: u32 = 2048;

/// Probability that a spawned tile is a 4 rather than a 2.
pub const FOUR_PROBABILITY: f64 = 0.1;

/// Largest tile a 4x4 board can ever hold (every cell merged upward from 4s).
pub const MAX_TILE_VALUE: u32 = 1 << 17;

/// The direction in which all tiles slide during a move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All four directions, in a fixed order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Returns the `(row, col)` unit vector of this direction.
    ///
    /// # Examples
    /// ```
    /// use slide_tiles::engine::Direction;
    /// assert_eq!(Direction::Up.vector(), (-1, 0));
    /// assert_eq!(Direction::Right.vector(), (0, 1));
    /// ```
    pub fn vector(self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
        };
        f.write_str(name)
    }
}

/// Returned when a string names none of the four directions.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized direction '{0}'")]
pub struct ParseDirectionError(String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    /// Accepts the direction names (`up`, `down`, `left`, `right`) and the
    /// `w`/`a`/`s`/`d` keys, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "w" => Ok(Direction::Up),
            "down" | "s" => Ok(Direction::Down),
            "left" | "a" => Ok(Direction::Left),
            "right" | "d" => Ok(Direction::Right),
            _ => Err(ParseDirectionError(s.to_string())),
        }
    }
}

/// A single numbered piece on the board.
///
/// `id` is stable for the lifetime of the tile and only serves to correlate a
/// tile across states (e.g. for rendering); game logic never depends on it.
/// `is_new` and `is_merged` are transient: they describe the move that produced
/// the state and are cleared at the start of the next move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub id: u64,
    /// Always a power of two, at least 2.
    pub value: u32,
    pub row: usize,
    pub col: usize,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_merged: bool,
}

impl Tile {
    /// Creates a tile with both transient flags cleared.
    pub fn new(id: u64, value: u32, row: usize, col: usize) -> Self {
        Tile {
            id,
            value,
            row,
            col,
            is_new: false,
            is_merged: false,
        }
    }

    /// Returns a copy of this tile with the transient flags cleared.
    pub fn settled(&self) -> Self {
        Tile {
            is_new: false,
            is_merged: false,
            ..*self
        }
    }
}

/// The full state of a game session.
///
/// States are replaced wholesale: [`Engine::apply_move`] returns a new state
/// and never mutates the one it was given.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Live tiles. Order carries no meaning for the game.
    pub tiles: Vec<Tile>,
    pub score: u64,
    /// Highest score ever reached on this installation, as known when the state was produced.
    pub best_score: u64,
    /// Sticky: once a tile reaches `WIN_VALUE` this stays true.
    pub won: bool,
    /// True when the board is full and no two axis-adjacent tiles are equal.
    pub over: bool,
    /// Required in save codes; `null` when no move has been made.
    #[serde(deserialize_with = "Option::deserialize")]
    pub last_move_direction: Option<Direction>,
}

impl GameState {
    /// Creates a zero-score state around the given tiles.
    ///
    /// Score and best score start at 0; `won` and `over` are derived from the tiles.
    /// Mostly useful for setting up specific scenarios.
    pub fn from_tiles(tiles: Vec<Tile>) -> Self {
        let won = tiles.iter().any(|t| t.value >= WIN_VALUE);
        let over = is_stalemate(&tiles);
        GameState {
            tiles,
            score: 0,
            best_score: 0,
            won,
            over,
            last_move_direction: None,
        }
    }

    /// Returns a snapshot of tile values per cell (`None` for empty cells).
    pub fn grid(&self) -> [[Option<u32>; GRID_SIZE]; GRID_SIZE] {
        value_grid(&self.tiles)
    }

    /// Returns the tile at `(row, col)`, if any.
    pub fn tile_at(&self, row: usize, col: usize) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.row == row && t.col == col)
    }

    /// Returns the highest tile value on the board, or 0 for an empty board.
    pub fn max_tile(&self) -> u32 {
        self.tiles.iter().map(|t| t.value).max().unwrap_or(0)
    }

    /// Whether every cell is occupied.
    pub fn is_full(&self) -> bool {
        self.tiles.len() == CELL_COUNT
    }
}

impl fmt::Display for GameState {
    /// Renders the grid as right-aligned columns, `.` for empty cells.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let grid = self.grid();
        for (r, row) in grid.iter().enumerate() {
            for cell in row {
                match cell {
                    Some(value) => write!(f, "{:>6}", value)?,
                    None => write!(f, "{:>6}", ".")?,
                }
            }
            if r < GRID_SIZE - 1 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

fn on_grid(tile: &Tile) -> bool {
    tile.row < GRID_SIZE && tile.col < GRID_SIZE
}

// Tiles outside the grid are left out of the snapshot.
fn value_grid(tiles: &[Tile]) -> [[Option<u32>; GRID_SIZE]; GRID_SIZE] {
    let mut grid = [[None; GRID_SIZE]; GRID_SIZE];
    for tile in tiles.iter().filter(|t| on_grid(t)) {
        grid[tile.row][tile.col] = Some(tile.value);
    }
    grid
}

/// Returns true if any two horizontally or vertically adjacent tiles share a value.
///
/// Only axis-adjacent pairs count; there is no diagonal or wraparound adjacency.
pub fn has_available_merge(tiles: &[Tile]) -> bool {
    let grid = value_grid(tiles);
    for r in 0..GRID_SIZE {
        for c in 0..GRID_SIZE - 1 {
            if grid[r][c].is_some() && grid[r][c] == grid[r][c + 1] {
                return true;
            }
        }
    }
    for c in 0..GRID_SIZE {
        for r in 0..GRID_SIZE - 1 {
            if grid[r][c].is_some() && grid[r][c] == grid[r + 1][c] {
                return true;
            }
        }
    }
    false
}

/// Returns true if the board is full and no merge is possible in any direction.
///
/// # Examples
/// ```
/// use slide_tiles::engine::is_stalemate;
/// use slide_tiles::utils::tiles_from_str_array;
///
/// let full = tiles_from_str_array(&[
///     "2 4 2 4",
///     "4 2 4 2",
///     "2 4 2 4",
///     "4 2 4 2",
/// ]).unwrap();
/// assert!(is_stalemate(&full));
///
/// let not_full = tiles_from_str_array(&["2 4 . 4"]).unwrap();
/// assert!(!is_stalemate(&not_full));
/// ```
pub fn is_stalemate(tiles: &[Tile]) -> bool {
    tiles.len() == CELL_COUNT && !has_available_merge(tiles)
}

/// The deterministic part of a move: tiles after sliding and merging, before any spawn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slide {
    /// Surviving tiles, flags reset, in processing order. Consumed tiles are gone.
    pub tiles: Vec<Tile>,
    /// Sum of the values of all tiles produced by merges during this move.
    pub score_delta: u64,
    /// Whether any tile changed position or any merge happened.
    pub moved: bool,
}

fn step(row: usize, col: usize, (dr, dc): (isize, isize)) -> Option<(usize, usize)> {
    let next_row = row.checked_add_signed(dr)?;
    let next_col = col.checked_add_signed(dc)?;
    (next_row < GRID_SIZE && next_col < GRID_SIZE).then_some((next_row, next_col))
}

/// Slides every tile as far as it goes in `direction`, merging equal neighbours.
///
/// Tiles farthest along the direction of travel are resolved first, so a tile
/// sliding toward a neighbour always sees that neighbour's final position. The
/// occupancy map starts from the pre-move positions and is updated as each tile
/// resolves.
///
/// A tile merges into the first occupied cell ahead of it when that tile has the
/// same value and has not already absorbed a merge during this move. The moving
/// tile is removed immediately, and the target doubles, is flagged `is_merged`
/// and is locked against further merges. Two tiles whose doubled value would not
/// fit in a `u32` do not merge.
///
/// Tiles lying outside the grid cannot be placed and are dropped with a warning.
pub fn slide(tiles: &[Tile], direction: Direction) -> Slide {
    let mut tiles: Vec<Tile> = tiles
        .iter()
        .filter(|t| {
            if !on_grid(t) {
                warn!("dropping tile {} at ({}, {}): off the grid", t.id, t.row, t.col);
            }
            on_grid(t)
        })
        .map(Tile::settled)
        .collect();
    // Farthest along the direction of travel goes first; stable sort keeps the
    // original order within a row or column.
    match direction {
        Direction::Up => tiles.sort_by_key(|t| t.row),
        Direction::Down => tiles.sort_by_key(|t| Reverse(t.row)),
        Direction::Left => tiles.sort_by_key(|t| t.col),
        Direction::Right => tiles.sort_by_key(|t| Reverse(t.col)),
    }

    let vector = direction.vector();
    // Index into `tiles` of whoever currently holds each cell.
    let mut occupancy = [[None::<usize>; GRID_SIZE]; GRID_SIZE];
    for (i, tile) in tiles.iter().enumerate() {
        occupancy[tile.row][tile.col] = Some(i);
    }
    let mut consumed = vec![false; tiles.len()];
    let mut locked = vec![false; tiles.len()];
    let mut score_delta = 0u64;
    let mut moved = false;

    for i in 0..tiles.len() {
        let (row, col) = (tiles[i].row, tiles[i].col);
        let (mut dest_row, mut dest_col) = (row, col);
        let mut target = None;

        // Walk toward the edge until the first occupied cell or the boundary.
        while let Some((next_row, next_col)) = step(dest_row, dest_col, vector) {
            match occupancy[next_row][next_col] {
                Some(j) => {
                    // Only an equal, not yet merged neighbour can absorb this tile.
                    if tiles[j].value == tiles[i].value && !locked[j] {
                        target = tiles[j].value.checked_mul(2).map(|doubled| (j, doubled));
                    }
                    break;
                }
                None => {
                    dest_row = next_row;
                    dest_col = next_col;
                }
            }
        }

        occupancy[row][col] = None;
        if let Some((j, doubled)) = target {
            // The moving tile vanishes now; the target stays put and is locked.
            consumed[i] = true;
            locked[j] = true;
            tiles[j].value = doubled;
            tiles[j].is_merged = true;
            score_delta = score_delta.saturating_add(u64::from(doubled));
            moved = true;
        } else {
            // Later tiles must see this one at its new position.
            occupancy[dest_row][dest_col] = Some(i);
            if (dest_row, dest_col) != (row, col) {
                tiles[i].row = dest_row;
                tiles[i].col = dest_col;
                moved = true;
            }
        }
    }

    let tiles = tiles
        .into_iter()
        .zip(consumed)
        .filter_map(|(tile, gone)| (!gone).then_some(tile))
        .collect();
    Slide {
        tiles,
        score_delta,
        moved,
    }
}

/// Whether moving `state` in `direction` would change the board.
///
/// Always false for a finished game.
pub fn can_move(state: &GameState, direction: Direction) -> bool {
    !state.over && slide(&state.tiles, direction).moved
}

/// Resolves moves and creates new games.
///
/// The engine owns everything a move needs besides the state itself: the random
/// source used for spawning, the best-score store, and a session-scoped counter
/// handing out tile ids. Two engines never share ids through global state.
///
/// # Examples
/// ```
/// use slide_tiles::engine::{Direction, Engine};
/// use slide_tiles::store::MemoryStore;
///
/// let mut engine = Engine::with_seed(MemoryStore::default(), 7);
/// let state = engine.create_initial_state();
/// assert_eq!(state.tiles.len(), 2);
///
/// let next = engine.apply_move(&state, Direction::Left);
/// assert!(next.score >= state.score);
/// ```
#[derive(Debug)]
pub struct Engine<S, R = SmallRng> {
    store: S,
    rng: R,
    next_id: u64,
}

impl<S: BestScoreStore> Engine<S, SmallRng> {
    /// Creates an engine whose spawns are seeded from system entropy.
    pub fn new(store: S) -> Self {
        Self::with_rng(store, SmallRng::from_entropy())
    }

    /// Creates an engine with reproducible spawns.
    pub fn with_seed(store: S, seed: u64) -> Self {
        Self::with_rng(store, SmallRng::seed_from_u64(seed))
    }
}

impl<S: BestScoreStore, R: Rng> Engine<S, R> {
    /// Creates an engine drawing spawns from the given random source.
    pub fn with_rng(store: S, rng: R) -> Self {
        Engine {
            store,
            rng,
            next_id: 1,
        }
    }

    /// Returns the best score currently held by the store.
    pub fn best_score(&self) -> u64 {
        self.store.get()
    }

    /// Returns the underlying best-score store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Starts a new game: two random tiles, zero score, best score from the store.
    pub fn create_initial_state(&mut self) -> GameState {
        let mut tiles = Vec::with_capacity(CELL_COUNT);
        self.spawn_random_tile(&mut tiles);
        self.spawn_random_tile(&mut tiles);
        GameState {
            tiles,
            score: 0,
            best_score: self.store.get(),
            won: false,
            over: false,
            last_move_direction: None,
        }
    }

    /// Places a new tile in a uniformly chosen empty cell.
    ///
    /// The tile is a 2 with probability 0.9 and a 4 otherwise, and is flagged `is_new`.
    ///
    /// # Returns
    /// The `(row, col)` of the new tile, or `None` if the board was full (in which
    /// case `tiles` is left untouched).
    pub fn spawn_random_tile(&mut self, tiles: &mut Vec<Tile>) -> Option<(usize, usize)> {
        let grid = value_grid(tiles);
        let empty_cells: Vec<(usize, usize)> = (0..GRID_SIZE)
            .flat_map(|r| (0..GRID_SIZE).map(move |c| (r, c)))
            .filter(|&(r, c)| grid[r][c].is_none())
            .collect();
        if empty_cells.is_empty() {
            return None;
        }

        let (row, col) = empty_cells[self.rng.gen_range(0..empty_cells.len())];
        let value = if self.rng.gen_bool(FOUR_PROBABILITY) { 4 } else { 2 };
        self.observe_ids(tiles);
        let id = self.allocate_id();
        tiles.push(Tile {
            is_new: true,
            ..Tile::new(id, value, row, col)
        });
        Some((row, col))
    }

    /// Applies one move and returns the resulting state.
    ///
    /// - A finished game (`over`) is returned unchanged.
    /// - A move that neither slides nor merges anything returns the prior state with
    ///   transient flags cleared: no spawn, no score change, `last_move_direction` kept.
    /// - Otherwise exactly one tile is spawned, `won` is OR'd with the presence of a
    ///   winning tile, `over` is recomputed, and the best score is raised if beaten.
    ///
    /// Persisting the best score is best-effort and never affects the returned state.
    /// Scores saturate at `u64::MAX` instead of overflowing.
    pub fn apply_move(&mut self, state: &GameState, direction: Direction) -> GameState {
        if state.over {
            return state.clone();
        }
        self.observe_ids(&state.tiles);

        let Slide {
            mut tiles,
            score_delta,
            moved,
        } = slide(&state.tiles, direction);
        if !moved {
            debug!("move {} changed nothing", direction);
            return GameState {
                tiles: state.tiles.iter().map(Tile::settled).collect(),
                ..state.clone()
            };
        }

        self.spawn_random_tile(&mut tiles);
        let won = state.won || tiles.iter().any(|t| t.value >= WIN_VALUE);
        let over = is_stalemate(&tiles);
        let score = state.score.saturating_add(score_delta);
        let best_score = state.best_score.max(score);
        if best_score > self.store.get() {
            self.store.set(best_score);
        }
        debug!(
            "move {}: +{} points, score {}, {} tiles, won={}, over={}",
            direction,
            score_delta,
            score,
            tiles.len(),
            won,
            over
        );

        GameState {
            tiles,
            score,
            best_score,
            won,
            over,
            last_move_direction: Some(direction),
        }
    }

    // States loaded from a save code carry their own ids; never hand those out again.
    fn observe_ids(&mut self, tiles: &[Tile]) {
        if let Some(max_id) = tiles.iter().map(|t| t.id).max() {
            self.next_id = self.next_id.max(max_id.saturating_add(1));
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}
