//! Simulation settings from the environment.

use monopoly_core::{BoardConfig, BoardError, GameConfig};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{var} must be a number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("SIM_PLAYERS must be between 2 and 8, got {0}")]
    PlayerCount(usize),

    #[error("Cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid game config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Invalid board: {0}")]
    Board(#[from] BoardError),
}

/// How many games to run and with what rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimSettings {
    /// Games to play
    pub games: u32,
    /// Bots per game
    pub players: usize,
    /// Seed for dice and bots; random when absent
    pub seed: Option<u64>,
    /// Turns after which a game is abandoned as a draw
    pub max_turns: u32,
    /// JSON file with a `GameConfig`
    pub config_path: Option<PathBuf>,
    /// JSON file with a `BoardConfig`
    pub board_path: Option<PathBuf>,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            games: 10,
            players: 4,
            seed: None,
            max_turns: 1000,
            config_path: None,
            board_path: None,
        }
    }
}

impl SimSettings {
    /// Read `SIM_*` variables from the process environment
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read settings through `lookup`; unset variables keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let defaults = Self::default();

        let settings = Self {
            games: parse_var(&lookup, "SIM_GAMES")?.unwrap_or(defaults.games),
            players: parse_var(&lookup, "SIM_PLAYERS")?.unwrap_or(defaults.players),
            seed: parse_var(&lookup, "SIM_SEED")?,
            max_turns: parse_var(&lookup, "SIM_MAX_TURNS")?.unwrap_or(defaults.max_turns),
            config_path: lookup("SIM_CONFIG").map(PathBuf::from),
            board_path: lookup("SIM_BOARD").map(PathBuf::from),
        };

        if !(2..=8).contains(&settings.players) {
            return Err(SettingsError::PlayerCount(settings.players));
        }
        Ok(settings)
    }

    /// The game rules, from `SIM_CONFIG` or the defaults
    pub fn load_config(&self) -> Result<GameConfig, SettingsError> {
        match &self.config_path {
            Some(path) => Ok(GameConfig::from_json(&read(path)?)?),
            None => Ok(GameConfig::default()),
        }
    }

    /// The board layout, from `SIM_BOARD` or the standard board
    pub fn load_board(&self) -> Result<BoardConfig, SettingsError> {
        let board = match &self.board_path {
            Some(path) => BoardConfig::from_json(&read(path)?)?,
            None => BoardConfig::standard(),
        };
        // Reject a broken layout before any game starts
        board.build()?;
        Ok(board)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, SettingsError> {
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| SettingsError::InvalidNumber { var, value }),
        None => Ok(None),
    }
}

fn read(path: &Path) -> Result<String, SettingsError> {
    std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })
}
