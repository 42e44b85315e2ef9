//! Save codes: the full `GameState` as an opaque, copy-pasteable string.
//!
//! A code is the state's JSON document in standard base64. Only round-trip
//! fidelity is promised; the layout itself is not a compatibility contract.
//!
//! Decoding validates the board as well as the syntax, so a code that parses but
//! describes an impossible board is rejected as a whole and never applied.
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::{error, warn};
use std::collections::HashSet;

use crate::engine::{is_stalemate, GameState, CELL_COUNT, GRID_SIZE, MAX_TILE_VALUE};

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("malformed state: {0}")]
    Json(#[from] serde_json::Error),
    #[error("impossible state: {0}")]
    Invalid(String),
}

/// Encodes `state` as a save code.
///
/// Serialization of a well-formed state does not fail; should it ever, the
/// error is logged and an empty string is returned.
///
/// # Examples
/// ```
/// use slide_tiles::codec::{decode, encode};
/// use slide_tiles::engine::Engine;
/// use slide_tiles::store::MemoryStore;
///
/// let state = Engine::with_seed(MemoryStore::default(), 1).create_initial_state();
/// let code = encode(&state);
/// assert_eq!(decode(&code), Some(state));
/// ```
pub fn encode(state: &GameState) -> String {
    match serde_json::to_vec(state) {
        Ok(json) => STANDARD.encode(json),
        Err(e) => {
            error!("failed to encode game state: {}", e);
            String::new()
        }
    }
}

/// Decodes a save code, reporting only whether it was valid.
///
/// This is the surface offered to the UI: garbage yields `None`, never a panic.
pub fn decode(code: &str) -> Option<GameState> {
    match try_decode(code) {
        Ok(state) => Some(state),
        Err(e) => {
            warn!("rejected save code: {}", e);
            None
        }
    }
}

/// Decodes a save code, with the reason for rejection on failure.
///
/// Surrounding whitespace is ignored. Besides requiring every field, the board
/// must be consistent:
/// - every tile lies inside the grid and holds a power of two between 2 and
///   `MAX_TILE_VALUE`;
/// - no two tiles share a cell or an id;
/// - a state marked `over` really is a stalemate.
pub fn try_decode(code: &str) -> Result<GameState, CodecError> {
    let json = STANDARD.decode(code.trim())?;
    let state: GameState = serde_json::from_slice(&json)?;
    validate(&state)?;
    Ok(state)
}

fn validate(state: &GameState) -> Result<(), CodecError> {
    // More tiles than cells means at least two share a cell; say so plainly.
    if state.tiles.len() > CELL_COUNT {
        return Err(CodecError::Invalid(format!(
            "{} tiles on a board of {} cells",
            state.tiles.len(),
            CELL_COUNT
        )));
    }

    // Seen (row, col) pairs and ids, to catch stacked tiles and reused ids.
    let mut cells = HashSet::new();
    let mut ids = HashSet::new();
    for tile in &state.tiles {
        if tile.row >= GRID_SIZE || tile.col >= GRID_SIZE {
            return Err(CodecError::Invalid(format!(
                "tile {} at ({}, {}) is off the board",
                tile.id, tile.row, tile.col
            )));
        }
        if tile.value < 2 || !tile.value.is_power_of_two() {
            return Err(CodecError::Invalid(format!(
                "tile {} has value {}, not a power of two",
                tile.id, tile.value
            )));
        }
        // Anything larger could never be built on a 4x4 board.
        if tile.value > MAX_TILE_VALUE {
            return Err(CodecError::Invalid(format!(
                "tile {} has value {}, above the largest reachable tile {}",
                tile.id, tile.value, MAX_TILE_VALUE
            )));
        }
        if !cells.insert((tile.row, tile.col)) {
            return Err(CodecError::Invalid(format!(
                "two tiles at ({}, {})",
                tile.row, tile.col
            )));
        }
        if !ids.insert(tile.id) {
            return Err(CodecError::Invalid(format!("duplicate tile id {}", tile.id)));
        }
    }

    // `won` is not cross-checked: a front end may legitimately play on past a win.
    if state.over && !is_stalemate(&state.tiles) {
        return Err(CodecError::Invalid(
            "marked over but a move is still possible".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Direction, Engine, Tile};
    use crate::store::MemoryStore;
    use crate::utils::tiles_from_str_array;
    use serde_json::json;

    fn code_of(value: serde_json::Value) -> String {
        STANDARD.encode(value.to_string())
    }

    fn sample_state() -> GameState {
        let mut engine = Engine::with_seed(MemoryStore::new(300), 99);
        let mut state = engine.create_initial_state();
        for direction in [Direction::Left, Direction::Up, Direction::Right, Direction::Down] {
            state = engine.apply_move(&state, direction);
        }
        state
    }

    #[test]
    fn test_round_trip_after_moves() {
        let state = sample_state();
        let decoded = decode(&encode(&state)).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_round_trip_keeps_flags_and_direction() {
        let mut tiles = tiles_from_str_array(&["2048 4 . .", ". . . 2"]).unwrap();
        tiles[0].is_merged = true;
        tiles[2].is_new = true;
        let state = GameState {
            tiles,
            score: 20_000,
            best_score: 31_337,
            won: true,
            over: false,
            last_move_direction: Some(Direction::Down),
        };
        assert_eq!(try_decode(&encode(&state)).unwrap(), state);
    }

    #[test]
    fn test_decode_ignores_surrounding_whitespace() {
        let state = sample_state();
        let code = format!("  {}\n", encode(&state));
        assert_eq!(decode(&code), Some(state));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(decode("").is_none());
        assert!(decode("not base64 at all!").is_none());
        assert!(decode(&STANDARD.encode("{ not json")).is_none());
        assert!(decode(&STANDARD.encode([0xffu8, 0xfe, 0x00])).is_none());
        assert!(matches!(
            try_decode("%%%"),
            Err(CodecError::Base64(_))
        ));
    }

    #[test]
    fn test_decode_truncated_code() {
        let code = encode(&sample_state());
        assert!(decode(&code[..code.len() / 2]).is_none());
    }

    #[test]
    fn test_decode_requires_tiles_and_numeric_score() {
        let missing_tiles = code_of(json!({
            "score": 0, "best_score": 0, "won": false, "over": false,
            "last_move_direction": null
        }));
        assert!(matches!(try_decode(&missing_tiles), Err(CodecError::Json(_))));

        let string_score = code_of(json!({
            "tiles": [], "score": "12", "best_score": 0, "won": false, "over": false,
            "last_move_direction": null
        }));
        assert!(matches!(try_decode(&string_score), Err(CodecError::Json(_))));

        let negative_score = code_of(json!({
            "tiles": [], "score": -4, "best_score": 0, "won": false, "over": false,
            "last_move_direction": null
        }));
        assert!(decode(&negative_score).is_none());

        let tiles_not_a_list = code_of(json!({
            "tiles": 3, "score": 0, "best_score": 0, "won": false, "over": false,
            "last_move_direction": null
        }));
        assert!(decode(&tiles_not_a_list).is_none());
    }

    #[test]
    fn test_decode_rejects_impossible_boards() {
        let base = sample_state();

        let mut off_board = base.clone();
        off_board.tiles.push(Tile::new(900, 2, GRID_SIZE, 0));
        assert!(matches!(try_decode(&encode(&off_board)), Err(CodecError::Invalid(_))));

        let mut bad_value = base.clone();
        bad_value.tiles[0].value = 6;
        assert!(matches!(try_decode(&encode(&bad_value)), Err(CodecError::Invalid(_))));

        let mut one = base.clone();
        one.tiles[0].value = 1;
        assert!(decode(&encode(&one)).is_none());

        let mut stacked = base.clone();
        let first = stacked.tiles[0];
        stacked.tiles.push(Tile::new(901, 2, first.row, first.col));
        assert!(decode(&encode(&stacked)).is_none());

        let mut same_id = base.clone();
        same_id.tiles[1].id = same_id.tiles[0].id;
        assert!(decode(&encode(&same_id)).is_none());

        let mut false_over = base;
        false_over.over = true;
        assert!(decode(&encode(&false_over)).is_none());
    }

    #[test]
    fn test_decode_rejects_unreachable_tile_values() {
        let huge = GameState::from_tiles(vec![
            Tile::new(1, 1 << 31, 0, 0),
            Tile::new(2, 1 << 31, 0, 1),
        ]);
        assert!(matches!(try_decode(&encode(&huge)), Err(CodecError::Invalid(_))));

        let just_above = GameState::from_tiles(vec![Tile::new(1, MAX_TILE_VALUE * 2, 0, 0)]);
        assert!(decode(&encode(&just_above)).is_none());

        let largest = GameState::from_tiles(vec![Tile::new(1, MAX_TILE_VALUE, 3, 3)]);
        assert_eq!(decode(&encode(&largest)), Some(largest));
    }

    #[test]
    fn test_decoded_huge_score_keeps_playing() {
        let mut state = GameState::from_tiles(tiles_from_str_array(&["2 2 . ."]).unwrap());
        state.score = u64::MAX;
        state.best_score = u64::MAX;
        let loaded = decode(&encode(&state)).unwrap();

        let mut engine = Engine::with_seed(MemoryStore::default(), 4);
        let after = engine.apply_move(&loaded, Direction::Left);
        assert_eq!(after.score, u64::MAX);
        assert_eq!(after.best_score, u64::MAX);
        assert_eq!(after.tile_at(0, 0).map(|t| t.value), Some(4));
    }

    #[test]
    fn test_decode_requires_last_move_direction() {
        let missing = code_of(json!({
            "tiles": [], "score": 0, "best_score": 0, "won": false, "over": false
        }));
        assert!(matches!(try_decode(&missing), Err(CodecError::Json(_))));

        let explicit_null = code_of(json!({
            "tiles": [], "score": 0, "best_score": 0, "won": false, "over": false,
            "last_move_direction": null
        }));
        assert_eq!(try_decode(&explicit_null).unwrap().last_move_direction, None);

        let moved = code_of(json!({
            "tiles": [], "score": 0, "best_score": 0, "won": false, "over": false,
            "last_move_direction": "LEFT"
        }));
        assert_eq!(
            try_decode(&moved).unwrap().last_move_direction,
            Some(Direction::Left)
        );
    }

    #[test]
    fn test_decode_accepts_real_stalemate() {
        let tiles = tiles_from_str_array(&[
            "2 4 2 4",
            "4 2 4 2",
            "2 4 2 4",
            "4 2 4 2",
        ])
        .unwrap();
        let state = GameState::from_tiles(tiles);
        assert!(state.over);
        assert_eq!(decode(&encode(&state)), Some(state));
    }
}
