//! Error type shared by every engine operation.

use thiserror::Error;

use crate::player::PlayerId;
use crate::walls::WallType;

/// Everything that can go wrong while creating or playing a match.
///
/// Configuration and rule violations are recoverable: the engine state is
/// untouched when one of them is returned. `OutOfBounds` and
/// `InvalidWallType` signal contract violations on internal geometry calls
/// or unparseable input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// Bad setup parameters.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Wrong turn, destination not legal, or match not in play.
    #[error("illegal move: {0}")]
    IllegalMove(String),
    /// Anchor is not a wall slot or the footprint leaves the board.
    #[error("invalid wall position ({x}, {y})")]
    InvalidPosition { x: usize, y: usize },
    /// A covered sub-cell already holds a wall.
    #[error("wall slot ({x}, {y}) is already occupied")]
    SlotOccupied { x: usize, y: usize },
    /// The player has no walls of this type left.
    #[error("no {0} walls left")]
    WallExhausted(WallType),
    /// Placement would cut a player off from their goal.
    #[error("wall would block every path of player {player}")]
    WallWouldBlockPath { player: PlayerId },
    /// Coordinate outside the addressed grid.
    #[error("coordinate ({x}, {y}) out of bounds")]
    OutOfBounds { x: usize, y: usize },
    /// Unrecognized wall type name.
    #[error("unknown wall type '{0}'")]
    InvalidWallType(String),
    /// A persisted match could not be decoded or is inconsistent.
    #[error("invalid snapshot: {0}")]
    Snapshot(String),
}

pub type Result<T> = std::result::Result<T, GameError>;
