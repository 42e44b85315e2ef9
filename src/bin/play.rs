use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;
use slide_tiles::codec::{decode, encode};
use slide_tiles::engine::{can_move, Direction, Engine, GameState};
use slide_tiles::store::{resolve_data_dir, FileStore, SaveSlot};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Play the sliding-tile puzzle in the terminal", long_about = None)]
struct Args {
    /// Directory holding the best score and the save slot
    /// (defaults to $SLIDE_TILES_DIR, then ./.slide_tiles)
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Seed for tile spawns, for reproducible games
    #[arg(long)]
    seed: Option<u64>,

    /// Start from a save code instead of a new game
    #[arg(long, value_name = "CODE")]
    load: Option<String>,
}

const HELP: &str = "Moves: w/a/s/d or up/down/left/right. \
n: new game, k: keep going after a win, c: show save code, l <code>: load code, \
save/load: use the save slot, q: quit.";

fn print_state(state: &GameState, keep_going: bool) {
    println!("---------------------");
    println!("Score: {}, Best: {}", state.score, state.best_score);
    println!("{}", state);
    if state.won && !keep_going {
        println!("🎉 You reached 2048! Press 'k' to keep going or 'n' for a new game.");
    }
    if state.over {
        println!("GAME OVER! Final score: {}. Press 'n' for a new game.", state.score);
    } else {
        let legal: Vec<String> = Direction::ALL
            .iter()
            .filter(|&&d| can_move(state, d))
            .map(|d| d.to_string())
            .collect();
        println!("Possible moves: {}", legal.join(", "));
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let data_dir = resolve_data_dir(args.data_dir);
    info!("using data directory {}", data_dir.display());
    let store = FileStore::open(&data_dir);
    let slot = SaveSlot::open(&data_dir);
    let mut engine = match args.seed {
        Some(seed) => Engine::with_seed(store, seed),
        None => Engine::new(store),
    };

    let mut state = match args.load.as_deref() {
        Some(code) => decode(code).context("invalid save code given to --load")?,
        None => engine.create_initial_state(),
    };
    // The win banner is a display concern; the state keeps `won` set.
    let mut keep_going = false;

    println!("Welcome to Slide Tiles!");
    println!("{}", HELP);
    print_state(&state, keep_going);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let input = line?;
        let input = input.trim();

        match input {
            "" => continue,
            "q" | "quit" => {
                println!("Thanks for playing!");
                break;
            }
            "h" | "help" => println!("{}", HELP),
            "n" | "new" => {
                state = engine.create_initial_state();
                keep_going = false;
                print_state(&state, keep_going);
            }
            "k" => {
                if state.won {
                    keep_going = true;
                }
                print_state(&state, keep_going);
            }
            "c" | "code" => println!("Save code:\n{}", encode(&state)),
            "save" => match slot.store(&state) {
                Ok(()) => println!("Game saved."),
                Err(e) => println!("Could not save the game: {}", e),
            },
            "load" => match slot.load() {
                Ok(Some(loaded)) => {
                    state = loaded;
                    keep_going = false;
                    print_state(&state, keep_going);
                }
                Ok(None) => println!("No saved game yet."),
                Err(e) => println!("Could not load the saved game: {}", e),
            },
            _ => {
                if let Some(code) = input.strip_prefix("l ") {
                    match decode(code) {
                        Some(loaded) => {
                            state = loaded;
                            keep_going = false;
                            print_state(&state, keep_going);
                        }
                        None => println!("Invalid code."),
                    }
                } else if let Ok(direction) = input.parse::<Direction>() {
                    state = engine.apply_move(&state, direction);
                    print_state(&state, keep_going);
                } else {
                    println!("Unknown command '{}'. Type 'h' for help.", input);
                }
            }
        }
    }
    Ok(())
}
