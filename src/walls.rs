//! Wall catalog: archetypes, shapes, rotation, and placed wall instances.
//!
//! Every wall type is described by a square boolean mask laid over the
//! expanded board grid (see [`crate::board`]). A horizontal Normal wall
//! covers two wall segments plus the post between them, which is what makes
//! two crossing walls collide.
//!
//! Per-type rules (passability, lifespan) are looked up through
//! [`WallType::behavior`] rather than dispatched on wall objects.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::board::Slot;
use crate::constants::{DEFAULT_WALLS_PER_TYPE, TEMPORAL_WALL_LIFESPAN};
use crate::error::GameError;
use crate::player::PlayerId;

/// Identifier of a placed wall, unique within a match.
pub type WallId = u32;

/// The closed set of wall archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WallType {
    Normal,
    Large,
    Temporal,
    Ally,
}

/// Rules attached to a wall type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallBehavior {
    /// Whether the owner may walk (and jump) through it.
    pub passable_for_owner: bool,
    /// Turns before the wall removes itself. `None` means permanent.
    pub lifespan: Option<u32>,
}

impl WallType {
    pub const ALL: [WallType; 4] = [
        WallType::Normal,
        WallType::Large,
        WallType::Temporal,
        WallType::Ally,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WallType::Normal => "normal",
            WallType::Large => "large",
            WallType::Temporal => "temporal",
            WallType::Ally => "ally",
        }
    }

    /// Unrotated shape. Every archetype starts horizontal.
    pub fn shape(self) -> WallShape {
        match self {
            WallType::Normal | WallType::Temporal | WallType::Ally => {
                WallShape::from_rows(&["...", "###", "..."])
            }
            WallType::Large => {
                WallShape::from_rows(&[".....", ".....", "#####", ".....", "....."])
            }
        }
    }

    pub fn behavior(self) -> WallBehavior {
        match self {
            WallType::Normal | WallType::Large => WallBehavior {
                passable_for_owner: false,
                lifespan: None,
            },
            WallType::Temporal => WallBehavior {
                passable_for_owner: false,
                lifespan: Some(TEMPORAL_WALL_LIFESPAN),
            },
            WallType::Ally => WallBehavior {
                passable_for_owner: true,
                lifespan: None,
            },
        }
    }

    /// Per-match inventory each player starts with unless configured otherwise.
    pub fn default_count(self) -> u32 {
        DEFAULT_WALLS_PER_TYPE
    }
}

impl fmt::Display for WallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WallType {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WallType::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| GameError::InvalidWallType(s.to_string()))
    }
}

/// Immutable square occupancy mask of a wall over the expanded grid.
///
/// Rows run along `y`, columns along `x`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallShape {
    size: usize,
    mask: Vec<bool>,
}

impl WallShape {
    /// Build a shape from text rows, `#` marking occupied sub-cells.
    /// Rows must all have the same length as the number of rows.
    fn from_rows(rows: &[&str]) -> Self {
        let size = rows.len();
        let mask = rows
            .iter()
            .flat_map(|row| row.bytes().map(|b| b == b'#'))
            .collect::<Vec<_>>();
        debug_assert_eq!(mask.len(), size * size, "wall mask must be square");
        Self { size, mask }
    }

    /// Quarter turn: transpose, then reverse the row order.
    pub fn rotate(&self) -> Self {
        let n = self.size;
        let mut mask = vec![false; n * n];
        for r in 0..n {
            for c in 0..n {
                mask[r * n + c] = self.mask[c * n + (n - 1 - r)];
            }
        }
        Self { size: n, mask }
    }

    /// Apply `quarter_turns` rotations (taken modulo 4).
    pub fn rotated(&self, quarter_turns: u8) -> Self {
        (0..quarter_turns % 4).fold(self.clone(), |shape, _| shape.rotate())
    }

    /// Occupied offsets `(dx, dy)` relative to the top-left of the trimmed
    /// bounding box, in row-major order.
    pub fn footprint(&self) -> Vec<(usize, usize)> {
        let cells = self.occupied();
        let min_row = cells.iter().map(|&(r, _)| r).min().unwrap_or(0);
        let min_col = cells.iter().map(|&(_, c)| c).min().unwrap_or(0);
        cells
            .into_iter()
            .map(|(r, c)| (c - min_col, r - min_row))
            .collect()
    }

    /// Width and height of the trimmed bounding box.
    pub fn dimensions(&self) -> (usize, usize) {
        let fp = self.footprint();
        let w = fp.iter().map(|&(dx, _)| dx + 1).max().unwrap_or(0);
        let h = fp.iter().map(|&(_, dy)| dy + 1).max().unwrap_or(0);
        (w, h)
    }

    fn occupied(&self) -> Vec<(usize, usize)> {
        let n = self.size;
        (0..n * n)
            .filter(|&i| self.mask[i])
            .map(|i| (i / n, i % n))
            .collect()
    }
}

/// A wall standing on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wall {
    pub id: WallId,
    pub wall_type: WallType,
    /// Oriented shape as placed.
    pub shape: WallShape,
    pub owner: PlayerId,
    /// Top-left of the footprint in expanded-grid coordinates.
    pub anchor: Slot,
    /// Turn counter value when the wall was placed.
    pub created_turn: u32,
}

impl Wall {
    /// Whether this wall stops `player` from crossing it.
    pub fn blocks(&self, player: PlayerId) -> bool {
        !(self.wall_type.behavior().passable_for_owner && self.owner == player)
    }

    /// Finish-turn hook: true once the wall has outlived its lifespan.
    pub fn expired(&self, turn_count: u32) -> bool {
        self.wall_type
            .behavior()
            .lifespan
            .is_some_and(|life| turn_count.saturating_sub(self.created_turn) >= life)
    }

    /// Whether the shape is one of the four orientations of its type.
    pub fn has_catalog_shape(&self) -> bool {
        let base = self.wall_type.shape();
        (0..4).any(|k| base.rotated(k) == self.shape)
    }

    /// Expanded-grid sub-cells covered by this wall. Coordinates saturate
    /// instead of wrapping, so an absurd anchor lands off the grid.
    pub fn covered(&self) -> Vec<Slot> {
        self.shape
            .footprint()
            .into_iter()
            .map(|(dx, dy)| {
                Slot::new(
                    self.anchor.x.saturating_add(dx),
                    self.anchor.y.saturating_add(dy),
                )
            })
            .collect()
    }
}
