//! Constants for board dimensions, wall allotments, and timing defaults.
//!
//! This module contains the configuration defaults for the rules engine.
//! Anything a match can override lives in [`crate::config::MatchConfig`];
//! the values here are what it falls back to.

// =============================================================================
// Board Geometry
// =============================================================================

/// Default board width and height. Odd sizes give symmetric center spawns.
pub const DEFAULT_BOARD_SIZE: usize = 9;

/// Smallest accepted board side.
pub const MIN_BOARD_SIZE: usize = 5;

/// Largest accepted board side.
pub const MAX_BOARD_SIZE: usize = 25;

/// Accepted player counts.
pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 4;

// =============================================================================
// Walls
// =============================================================================

/// Default number of walls of each type handed to every player.
pub const DEFAULT_WALLS_PER_TYPE: u32 = 2;

/// Number of turns a Temporal wall stays on the board.
pub const TEMPORAL_WALL_LIFESPAN: u32 = 4;

// =============================================================================
// Players
// =============================================================================

/// Capacity of the per-player move buffer (previous + current cell).
pub const MOVE_HISTORY_LEN: usize = 2;

// =============================================================================
// Special Cells
// =============================================================================

/// Number of cells of each special type scattered when special cells are enabled.
pub const SPECIAL_CELLS_PER_TYPE: usize = 2;

/// Seed used for special-cell layout when the configuration gives none.
pub const DEFAULT_SEED: u64 = 0x5eed;

// =============================================================================
// Timing
// =============================================================================

/// Chronometer tick period in milliseconds.
pub const CHRONO_TICK_MS: u64 = 10;

/// Default per-turn budget for Against-the-Clock matches.
pub const DEFAULT_TURN_LIMIT_MS: u64 = 30_000;

/// Default whole-match budget per player for Timed matches.
pub const DEFAULT_TOTAL_LIMIT_MS: u64 = 300_000;

// =============================================================================
// Demo
// =============================================================================

/// Upper bound on actions in an AI-vs-AI demo game.
pub const DEMO_MAX_TURNS: u32 = 2_000;

// =============================================================================
// Direction Offsets
// =============================================================================

/// Orthogonal step offsets `(dx, dy)`.
/// Order: North, East, South, West
pub const DIRECTIONS: [(isize, isize); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// All 8 surrounding offsets, used by Teleport cells.
/// Order: N, NE, E, SE, S, SW, W, NW
pub const RING: [(isize, isize); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];
