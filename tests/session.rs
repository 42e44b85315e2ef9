use slide_tiles::engine::{can_move, is_stalemate, Direction, Engine, GameState, CELL_COUNT};
use slide_tiles::store::MemoryStore;
use slide_tiles::{decode, encode};
use std::collections::HashSet;

fn check_transition(prev: &GameState, next: &GameState, changed: bool) {
    let cells: HashSet<(usize, usize)> = next.tiles.iter().map(|t| (t.row, t.col)).collect();
    assert_eq!(cells.len(), next.tiles.len(), "two tiles share a cell");
    assert!(next.tiles.len() <= CELL_COUNT);
    assert!(next.score >= prev.score, "score went down");
    assert!(next.best_score >= next.score);
    if prev.won {
        assert!(next.won, "won was cleared by a move");
    }
    if next.over {
        assert!(is_stalemate(&next.tiles));
    }

    let spawned = next.tiles.iter().filter(|t| t.is_new).count();
    let merged = next.tiles.iter().filter(|t| t.is_merged).count();
    if changed {
        assert_eq!(spawned, 1, "a changing move spawns exactly one tile");
        assert_eq!(next.tiles.len(), prev.tiles.len() - merged + 1);
        let new_tile = next.tiles.iter().find(|t| t.is_new).unwrap();
        assert!(new_tile.value == 2 || new_tile.value == 4);
    } else {
        assert_eq!(spawned, 0, "a null move must not spawn");
        assert_eq!(next.score, prev.score);
        assert_eq!(next.tiles.len(), prev.tiles.len());
    }
}

#[test]
fn random_games_keep_invariants() {
    for seed in 0..20u64 {
        let mut engine = Engine::with_seed(MemoryStore::default(), seed);
        let mut state = engine.create_initial_state();
        let mut best_seen = engine.best_score();

        for turn in 0..5_000usize {
            let direction = Direction::ALL[(turn * 7 + seed as usize) % 4];
            let changed = can_move(&state, direction);
            let next = engine.apply_move(&state, direction);
            check_transition(&state, &next, changed);
            if changed {
                assert_eq!(next.last_move_direction, Some(direction));
            }
            assert!(engine.best_score() >= best_seen, "persisted best went down");
            best_seen = engine.best_score();

            assert_eq!(decode(&encode(&next)).as_ref(), Some(&next));
            state = next;
            if state.over {
                break;
            }
        }

        if state.over {
            for direction in Direction::ALL {
                let again = engine.apply_move(&state, direction);
                assert_eq!(again, state);
            }
        }
    }
}

#[test]
fn games_eventually_end() {
    let mut engine = Engine::with_seed(MemoryStore::default(), 2024);
    let mut state = engine.create_initial_state();
    let mut turns = 0;
    while !state.over && turns < 100_000 {
        // Cycle through every direction so a stuck direction never stalls the loop.
        for direction in Direction::ALL {
            state = engine.apply_move(&state, direction);
        }
        turns += 1;
    }
    assert!(state.over);
    assert!(state.is_full());
    assert!(state.score > 0);
    assert_eq!(engine.best_score(), state.best_score);
}

#[test]
fn best_score_survives_new_game() {
    let mut engine = Engine::with_seed(MemoryStore::default(), 8);
    let mut state = engine.create_initial_state();
    while !state.over {
        for direction in Direction::ALL {
            state = engine.apply_move(&state, direction);
        }
    }
    let best = engine.best_score();
    assert!(best > 0);

    let fresh = engine.create_initial_state();
    assert_eq!(fresh.score, 0);
    assert_eq!(fresh.best_score, best);
}

#[test]
fn loaded_game_continues_with_fresh_ids() {
    let mut first = Engine::with_seed(MemoryStore::default(), 31);
    let mut state = first.create_initial_state();
    for turn in 0..40 {
        state = first.apply_move(&state, Direction::ALL[turn % 4]);
    }
    let code = encode(&state);

    let mut second = Engine::with_seed(MemoryStore::default(), 32);
    let loaded = decode(&code).expect("code produced by encode must decode");
    let mut ids: HashSet<u64> = loaded.tiles.iter().map(|t| t.id).collect();
    let mut current = loaded;
    for turn in 0..40 {
        let next = second.apply_move(&current, Direction::ALL[(turn + 1) % 4]);
        for tile in next.tiles.iter().filter(|t| t.is_new) {
            assert!(ids.insert(tile.id), "id {} reused after loading", tile.id);
        }
        current = next;
    }
}
