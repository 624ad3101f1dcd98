//! Wallrace: rules engine for a two-to-four player wall-blocking race game.
//!
//! Pawns race to the opposite edge of the board while players place walls of
//! several kinds to slow each other down. No wall may ever cut a player off
//! from their goal.
//!
//! ## Modules
//!
//! - [`constants`] - Defaults and limits
//! - [`board`] - Cell grid, wall-slot grid, special cells
//! - [`walls`] - Wall types, shapes and rotation
//! - [`connectivity`] - Path-to-goal checks for wall placement
//! - [`player`] - Per-player state and win conditions
//! - [`config`] - Match configuration
//! - [`game`] - The match state machine
//! - [`snapshot`] - Owned views of a match
//! - [`chronometer`] - Background turn clock
//! - [`session`] - Thread-safe match handle
//! - [`ai`] - Random computer player
//! - [`console`] - Text protocol front-end
//!
//! ## Example
//!
//! ```
//! use wallrace::board::{Coord, Slot};
//! use wallrace::config::MatchConfig;
//! use wallrace::game::MatchManager;
//! use wallrace::walls::WallType;
//!
//! let mut game = MatchManager::create_match(MatchConfig::default()).unwrap();
//!
//! // Player 0 steps forward, player 1 answers with a wall
//! game.execute_move(0, Coord::new(4, 1)).unwrap();
//! game.place_wall(1, Slot::new(8, 3), WallType::Normal, 0).unwrap();
//!
//! println!("{game}");
//! ```

pub mod ai;
pub mod board;
pub mod chronometer;
pub mod config;
pub mod connectivity;
pub mod console;
pub mod constants;
pub mod error;
pub mod game;
pub mod player;
pub mod session;
pub mod snapshot;
pub mod walls;

pub use error::GameError;
