//! Thread-safe handle around a live match.
//!
//! Every mutation, including the chronometer's timeout action, goes through
//! the one mutex in [`SharedMatch`]. Queries hand back owned snapshots.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::ai::RandomAgent;
use crate::board::{Coord, Slot};
use crate::chronometer::{Chronometer, SharedMatch, lock};
use crate::config::MatchConfig;
use crate::constants::CHRONO_TICK_MS;
use crate::error::Result;
use crate::game::{MatchManager, Outcome, Phase};
use crate::player::PlayerId;
use crate::snapshot::MatchSnapshot;
use crate::walls::WallType;

#[derive(Debug)]
pub struct MatchSession {
    shared: SharedMatch,
    clock: Option<Chronometer>,
    tick: Duration,
}

impl MatchSession {
    pub fn create(config: MatchConfig) -> Result<Self> {
        Ok(Self::from_match(MatchManager::create_match(config)?))
    }

    pub fn from_match(game: MatchManager) -> Self {
        Self {
            shared: Arc::new(Mutex::new(game)),
            clock: None,
            tick: Duration::from_millis(CHRONO_TICK_MS),
        }
    }

    /// Override the chronometer tick. Takes effect on the next `start_clock`.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn shared(&self) -> SharedMatch {
        Arc::clone(&self.shared)
    }

    /// Run a read-only closure against the match under the lock.
    pub fn with_match<T>(&self, f: impl FnOnce(&MatchManager) -> T) -> T {
        f(&lock(&self.shared))
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        lock(&self.shared).snapshot()
    }

    pub fn execute_move(&self, player: PlayerId, destination: Coord) -> Result<Outcome> {
        lock(&self.shared).execute_move(player, destination)
    }

    pub fn place_wall(
        &self,
        player: PlayerId,
        anchor: Slot,
        wall_type: WallType,
        quarter_turns: u8,
    ) -> Result<Outcome> {
        lock(&self.shared).place_wall(player, anchor, wall_type, quarter_turns)
    }

    pub fn ai_move(&self, player: PlayerId, agent: &mut RandomAgent) -> Result<Coord> {
        agent.execute_move(&mut lock(&self.shared), player)
    }

    pub fn save_json(&self) -> Result<String> {
        lock(&self.shared).save_json()
    }

    /// Replace the running match with a saved one. The clock is stopped.
    pub fn load_json(&mut self, text: &str) -> Result<()> {
        let game = MatchManager::load_json(text)?;
        self.stop_clock();
        *lock(&self.shared) = game;
        Ok(())
    }

    /// Start the background clock for the configured timing mode. A player
    /// who runs out of time gets a random move played for them.
    pub fn start_clock(&mut self) -> io::Result<()> {
        self.stop_clock();
        let mode = lock(&self.shared).config().timing;
        let weak = Arc::downgrade(&self.shared);
        let clock = Chronometer::start(self.shared(), mode, self.tick, move |player, turn| {
            if let Some(shared) = weak.upgrade() {
                force_timeout_move(&mut lock(&shared), player, turn, &mut RandomAgent::new());
            }
        })?;
        self.clock = Some(clock);
        Ok(())
    }

    pub fn stop_clock(&mut self) {
        if let Some(mut clock) = self.clock.take() {
            clock.stop();
        }
    }

    pub fn clock_running(&self) -> bool {
        self.clock.as_ref().is_some_and(Chronometer::is_running)
    }
}

/// Play a random move for a player who ran out of time on `turn`. Does
/// nothing if that turn has already been resolved.
fn force_timeout_move(
    game: &mut MatchManager,
    player: PlayerId,
    turn: u32,
    agent: &mut RandomAgent,
) -> Option<Coord> {
    if game.phase() != Phase::Playing
        || game.turn_count() != turn
        || game.current_player() != player
    {
        debug!(player, turn, "stale time out ignored");
        return None;
    }
    match agent.execute_move(game, player) {
        Ok(dest) => {
            info!(player, to = %dest, "time out, random move played");
            Some(dest)
        }
        Err(e) => {
            warn!(player, error = %e, "time out move rejected");
            None
        }
    }
}

impl Drop for MatchSession {
    fn drop(&mut self) {
        self.stop_clock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimingMode;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_session_moves_and_snapshots() {
        let session = MatchSession::create(MatchConfig::default()).unwrap();
        session.execute_move(0, Coord::new(4, 1)).unwrap();
        session
            .place_wall(1, Slot::new(0, 1), WallType::Normal, 0)
            .unwrap();
        let snap = session.snapshot();
        assert_eq!(snap.turn_count, 2);
        assert_eq!(snap.players[1].walls_placed, 1);
    }

    #[test]
    fn test_timeout_forces_a_move() {
        let config = MatchConfig {
            timing: TimingMode::AgainstTheClock { turn_limit_ms: 15 },
            ..MatchConfig::default()
        };
        let mut session = MatchSession::create(config)
            .unwrap()
            .with_tick(Duration::from_millis(2));
        session.start_clock().unwrap();
        assert!(session.clock_running());

        let deadline = Instant::now() + Duration::from_secs(5);
        while session.snapshot().turn_count == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        session.stop_clock();
        assert!(!session.clock_running());
        let snap = session.snapshot();
        assert!(snap.turn_count >= 1);

        // Clock is stopped: nothing moves any more
        thread::sleep(Duration::from_millis(50));
        assert_eq!(session.snapshot().turn_count, snap.turn_count);
    }

    #[test]
    fn test_stale_timeout_is_ignored() {
        let mut game = MatchManager::create_match(MatchConfig::default()).unwrap();
        let mut agent = RandomAgent::with_seed(5);
        // Player 0 timed out on turn 0, but both players moved since
        game.execute_move(0, Coord::new(4, 1)).unwrap();
        game.execute_move(1, Coord::new(4, 7)).unwrap();
        let before = game.clone();
        assert_eq!(force_timeout_move(&mut game, 0, 0, &mut agent), None);
        assert_eq!(game, before);

        // Current turn is forced
        assert!(force_timeout_move(&mut game, 0, 2, &mut agent).is_some());
        assert_eq!(game.turn_count(), 3);
        assert_eq!(force_timeout_move(&mut game, 0, 3, &mut agent), None);
    }

    #[test]
    fn test_load_replaces_match() {
        let mut session = MatchSession::create(MatchConfig::default()).unwrap();
        let saved = session.save_json().unwrap();
        session.execute_move(0, Coord::new(3, 0)).unwrap();
        session.load_json(&saved).unwrap();
        assert_eq!(session.snapshot().players[0].position, Coord::new(4, 0));
        assert!(session.load_json("not json").is_err());
    }
}
