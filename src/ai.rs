//! Computer player: uniformly random legal moves.
//!
//! The agent never places walls. A full random game (see [`playout`]) is
//! what the demo and the property tests use to reach arbitrary positions.

use tracing::debug;

use crate::board::Coord;
use crate::error::{GameError, Result};
use crate::game::{MatchManager, Outcome, Phase};
use crate::player::PlayerId;

#[derive(Debug, Clone)]
pub struct RandomAgent {
    rng: fastrand::Rng,
}

impl Default for RandomAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomAgent {
    pub fn new() -> Self {
        Self {
            rng: fastrand::Rng::new(),
        }
    }

    /// Reproducible agent.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Pick one of the player's legal destinations.
    pub fn choose_move(&mut self, game: &MatchManager, player: PlayerId) -> Result<Coord> {
        let moves = game.possible_movements(player)?;
        if moves.is_empty() {
            return Err(GameError::IllegalMove(format!(
                "player {player} has no legal destination"
            )));
        }
        Ok(moves[self.rng.usize(..moves.len())])
    }

    /// Pick and play a move; engine failures (wrong turn, match over) are
    /// passed through unchanged.
    pub fn execute_move(&mut self, game: &mut MatchManager, player: PlayerId) -> Result<Coord> {
        let dest = self.choose_move(game, player)?;
        game.execute_move(player, dest)?;
        debug!(player, to = %dest, "ai moved");
        Ok(dest)
    }
}

/// Let the agent play every seat until someone wins or `max_turns` actions
/// have been played. Returns the winner, if any.
pub fn playout(
    game: &mut MatchManager,
    agent: &mut RandomAgent,
    max_turns: u32,
) -> Result<Option<PlayerId>> {
    let mut played = 0;
    while game.phase() == Phase::Playing && played < max_turns {
        let player = game.current_player();
        let dest = agent.choose_move(game, player)?;
        if let Outcome::Won(winner) = game.execute_move(player, dest)? {
            return Ok(Some(winner));
        }
        played += 1;
    }
    Ok(game.winner())
}
