//! Match configuration and its validation.
//!
//! A [`MatchConfig`] can be built in code, deserialized from JSON, or
//! assembled from command-line flags. [`MatchConfig::validate`] is the only
//! gate between it and a running match.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BOARD_SIZE, DEFAULT_SEED, MAX_BOARD_SIZE, MAX_PLAYERS, MIN_BOARD_SIZE, MIN_PLAYERS,
};
use crate::error::{GameError, Result};
use crate::walls::WallType;

/// How the chronometer limits players.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimingMode {
    /// No clock.
    #[default]
    None,
    /// Every turn must finish within `turn_limit_ms`.
    AgainstTheClock { turn_limit_ms: u64 },
    /// Each player has `total_limit_ms` for the whole match.
    Timed { total_limit_ms: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub board_width: usize,
    pub board_height: usize,
    pub player_count: usize,
    /// Starting inventory of each player.
    pub walls_per_player: BTreeMap<WallType, u32>,
    pub timing: TimingMode,
    pub special_cells: bool,
    /// Seed for the special-cell layout.
    pub seed: u64,
    /// Display names; missing entries default to "Player N".
    pub player_names: Vec<String>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            board_width: DEFAULT_BOARD_SIZE,
            board_height: DEFAULT_BOARD_SIZE,
            player_count: MIN_PLAYERS,
            walls_per_player: WallType::ALL
                .into_iter()
                .map(|t| (t, t.default_count()))
                .collect(),
            timing: TimingMode::None,
            special_cells: false,
            seed: DEFAULT_SEED,
            player_names: Vec::new(),
        }
    }
}

impl MatchConfig {
    /// Read a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            GameError::InvalidConfiguration(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text)
            .map_err(|e| GameError::InvalidConfiguration(format!("{}: {e}", path.display())))
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(GameError::InvalidConfiguration(msg));
        let size_range = MIN_BOARD_SIZE..=MAX_BOARD_SIZE;
        if !size_range.contains(&self.board_width) || !size_range.contains(&self.board_height) {
            return invalid(format!(
                "board must be between {MIN_BOARD_SIZE} and {MAX_BOARD_SIZE} cells per side (got {}x{})",
                self.board_width, self.board_height
            ));
        }
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.player_count) {
            return invalid(format!(
                "player count must be between {MIN_PLAYERS} and {MAX_PLAYERS} (got {})",
                self.player_count
            ));
        }
        match self.timing {
            TimingMode::AgainstTheClock { turn_limit_ms: 0 } => {
                return invalid("turn time limit must be positive".into());
            }
            TimingMode::Timed { total_limit_ms: 0 } => {
                return invalid("match time limit must be positive".into());
            }
            _ => {}
        }
        if self.player_names.len() > self.player_count {
            return invalid(format!(
                "{} player names given for {} players",
                self.player_names.len(),
                self.player_count
            ));
        }
        Ok(())
    }

    pub fn player_name(&self, id: usize) -> String {
        self.player_names
            .get(id)
            .cloned()
            .unwrap_or_else(|| format!("Player {}", id + 1))
    }
}
