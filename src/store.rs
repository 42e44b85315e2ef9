//! Persistence for the pieces of state that outlive a single game.
//!
//! - `BestScoreStore`: the narrow get/set capability the engine uses for the best score.
//! - `MemoryStore`: an in-memory implementation, used in tests and as a fallback.
//! - `FileStore`: keeps the best score in a file under a data directory. If the file
//!   cannot be written the store keeps serving the in-memory value for the rest of
//!   the session.
//! - `SaveSlot`: a single save code kept next to the best score.
use log::{info, warn};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::codec::{encode, try_decode, CodecError};
use crate::engine::GameState;

/// Environment variable overriding the default data directory.
pub const DATA_DIR_ENV: &str = "SLIDE_TILES_DIR";

/// Data directory used when neither a CLI option nor `DATA_DIR_ENV` is given.
pub const DEFAULT_DATA_DIR: &str = ".slide_tiles";

const BEST_SCORE_FILE: &str = "best_score";
const SAVE_CODE_FILE: &str = "save_code";

/// Where the best score lives. Reads never fail; writes are best-effort.
pub trait BestScoreStore {
    fn get(&self) -> u64;
    fn set(&mut self, score: u64);
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("stored save code is invalid: {0}")]
    Codec(#[from] CodecError),
}

/// Resolves the data directory: explicit path, then `DATA_DIR_ENV`, then `DEFAULT_DATA_DIR`.
pub fn resolve_data_dir(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| env::var_os(DATA_DIR_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryStore {
    best: u64,
}

impl MemoryStore {
    pub fn new(best: u64) -> Self {
        MemoryStore { best }
    }
}

impl BestScoreStore for MemoryStore {
    fn get(&self) -> u64 {
        self.best
    }

    fn set(&mut self, score: u64) {
        self.best = score;
    }
}

/// Best score persisted as a decimal number in `<dir>/best_score`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    best: u64,
    degraded: bool,
}

impl FileStore {
    /// Opens the store under `dir`, reading the current best score.
    ///
    /// A missing file means a best score of 0. An unreadable or unparsable file is
    /// logged and also treated as 0. The directory is only created on the first write.
    pub fn open(dir: impl AsRef<Path>) -> Self {
        let path = dir.as_ref().join(BEST_SCORE_FILE);
        let best = read_best_score(&path);
        FileStore {
            path,
            best,
            degraded: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a write has failed and the store is running from memory only.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    fn persist(&self, score: u64) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, score.to_string())?;
        Ok(())
    }
}

fn read_best_score(path: &Path) -> u64 {
    match fs::read_to_string(path) {
        Ok(content) => content.trim().parse().unwrap_or_else(|e| {
            warn!("ignoring unparsable best score in {}: {}", path.display(), e);
            0
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
        Err(e) => {
            warn!("cannot read best score from {}: {}", path.display(), e);
            0
        }
    }
}

impl BestScoreStore for FileStore {
    fn get(&self) -> u64 {
        self.best
    }

    fn set(&mut self, score: u64) {
        self.best = score;
        if self.degraded {
            return;
        }
        if let Err(e) = self.persist(score) {
            warn!(
                "cannot persist best score to {}, keeping it in memory for this session: {}",
                self.path.display(),
                e
            );
            self.degraded = true;
        }
    }
}

/// A single save code stored in `<dir>/save_code`.
#[derive(Clone, Debug)]
pub struct SaveSlot {
    path: PathBuf,
}

impl SaveSlot {
    pub fn open(dir: impl AsRef<Path>) -> Self {
        SaveSlot {
            path: dir.as_ref().join(SAVE_CODE_FILE),
        }
    }

    /// Encodes `state` and writes it to the slot, replacing any previous save.
    pub fn store(&self, state: &GameState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, encode(state))?;
        info!("saved game to {}", self.path.display());
        Ok(())
    }

    /// Reads the saved game back.
    ///
    /// # Returns
    /// * `Ok(None)` if nothing was saved yet.
    /// * `Err(StoreError::Codec)` if the slot holds something that does not decode.
    pub fn load(&self) -> Result<Option<GameState>, StoreError> {
        let code = match fs::read_to_string(&self.path) {
            Ok(code) => code,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(try_decode(&code)?))
    }
}
