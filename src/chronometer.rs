//! Background turn clock.
//!
//! The chronometer runs its own thread and wakes every tick. Each tick it
//! locks the shared match, credits the elapsed time to the player in turn,
//! and compares the turn (or match) time against the configured limit. When
//! the limit is reached it releases the lock and calls the timeout callback
//! with the player and the turn counter it timed out on. The callback is
//! expected to go through the same locked path as any other action.
//!
//! Against the clock, the turn reference restarts after each timeout, so a
//! turn nobody resolves fires again one limit later. In timed matches the
//! budget covers the whole match: once spent it stays spent, and the callback
//! fires once on every later turn of that player.
//!
//! Never stop a chronometer while holding the match lock: stopping joins the
//! thread, and the thread may be waiting for that lock.

use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::TimingMode;
use crate::game::{MatchManager, Phase};
use crate::player::PlayerId;

/// The single serialization point for a live match.
pub type SharedMatch = Arc<Mutex<MatchManager>>;

/// Lock a shared match. Actions are validated before they write, so a
/// poisoned lock still guards consistent state.
pub fn lock(shared: &SharedMatch) -> MutexGuard<'_, MatchManager> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy)]
enum Limit {
    Turn(Duration),
    Total(u64),
}

/// Handle to a running clock thread. Dropping it stops the thread.
#[derive(Debug)]
pub struct Chronometer {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Chronometer {
    /// Start ticking. `TimingMode::None` returns an idle chronometer.
    pub fn start<F>(
        shared: SharedMatch,
        mode: TimingMode,
        tick: Duration,
        on_timeout: F,
    ) -> io::Result<Self>
    where
        F: Fn(PlayerId, u32) + Send + 'static,
    {
        let limit = match mode {
            TimingMode::None => {
                return Ok(Self {
                    stop_tx: None,
                    handle: None,
                });
            }
            TimingMode::AgainstTheClock { turn_limit_ms } => {
                Limit::Turn(Duration::from_millis(turn_limit_ms))
            }
            TimingMode::Timed { total_limit_ms } => Limit::Total(total_limit_ms),
        };
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("chronometer".into())
            .spawn(move || {
                let mut last = Instant::now();
                let mut turn_started = last;
                let mut seen: Option<(u32, PlayerId)> = None;
                let mut fired: Option<(u32, PlayerId)> = None;
                loop {
                    match stop_rx.recv_timeout(tick) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    let now = Instant::now();
                    let expired = {
                        let mut game = lock(&shared);
                        if game.phase() != Phase::Playing {
                            last = now;
                            seen = None;
                            continue;
                        }
                        let player = game.current_player();
                        let key = (game.turn_count(), player);
                        if seen != Some(key) {
                            seen = Some(key);
                            turn_started = last;
                        }
                        // Whole milliseconds only; the remainder carries over.
                        let ms = now.duration_since(last).as_millis() as u64;
                        last += Duration::from_millis(ms);
                        game.add_elapsed(player, ms);
                        let spent = match limit {
                            Limit::Turn(l) => now.duration_since(turn_started) >= l,
                            Limit::Total(l) => {
                                fired != Some(key)
                                    && game.player(player).is_ok_and(|p| p.elapsed_ms >= l)
                            }
                        };
                        spent.then_some(key)
                    };
                    if let Some((turn, player)) = expired {
                        if !matches!(stop_rx.try_recv(), Err(mpsc::TryRecvError::Empty)) {
                            break;
                        }
                        debug!(player, turn, "time limit reached");
                        turn_started = now;
                        fired = Some((turn, player));
                        on_timeout(player, turn);
                    }
                }
                debug!("chronometer stopped");
            })?;
        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Stop the thread and wait for it. No callback runs after this returns.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("chronometer thread panicked");
            }
        }
    }
}

impl Drop for Chronometer {
    fn drop(&mut self) {
        self.stop();
    }
}
