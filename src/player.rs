//! Per-player state: position, goal, wall inventory and time.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::board::Coord;
use crate::constants::MOVE_HISTORY_LEN;
use crate::walls::{WallId, WallType};

/// Stable player index in `[0, player_count)`.
pub type PlayerId = usize;

/// Where a player has to go to win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinCondition {
    /// Reach any cell of this row.
    Row(usize),
    /// Reach any cell of this column.
    Column(usize),
}

impl WinCondition {
    /// The opposite edge from a start cell on the board border.
    ///
    /// Top and bottom rows take precedence over the side columns, so a
    /// corner start races to the far row.
    pub fn from_start(start: Coord, width: usize, height: usize) -> Self {
        if start.y == 0 {
            WinCondition::Row(height - 1)
        } else if start.y + 1 == height {
            WinCondition::Row(0)
        } else if start.x == 0 {
            WinCondition::Column(width - 1)
        } else {
            WinCondition::Column(0)
        }
    }

    pub fn is_goal(self, c: Coord) -> bool {
        match self {
            WinCondition::Row(y) => c.y == y,
            WinCondition::Column(x) => c.x == x,
        }
    }
}

/// Start cell of player `id` on a `width x height` board.
pub fn start_position(id: PlayerId, width: usize, height: usize) -> Coord {
    match id {
        0 => Coord::new(width / 2, 0),
        1 => Coord::new(width / 2, height - 1),
        2 => Coord::new(0, height / 2),
        _ => Coord::new(width - 1, height / 2),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub position: Coord,
    pub win: WinCondition,
    /// Remaining walls by type.
    pub inventory: BTreeMap<WallType, u32>,
    /// Walls of this player currently on the board.
    pub placed: Vec<WallId>,
    /// Time spent in turn, in milliseconds.
    pub elapsed_ms: u64,
    /// Last positions, oldest first.
    history: VecDeque<Coord>,
}

impl Player {
    pub fn new(
        id: PlayerId,
        name: String,
        start: Coord,
        win: WinCondition,
        inventory: BTreeMap<WallType, u32>,
    ) -> Self {
        let mut history = VecDeque::with_capacity(MOVE_HISTORY_LEN);
        history.push_back(start);
        Self {
            id,
            name,
            position: start,
            win,
            inventory,
            placed: Vec::new(),
            elapsed_ms: 0,
            history,
        }
    }

    pub fn walls_left(&self, t: WallType) -> u32 {
        self.inventory.get(&t).copied().unwrap_or(0)
    }

    pub fn has_won(&self) -> bool {
        self.win.is_goal(self.position)
    }

    /// Move to `c`, evicting the oldest buffered position when full.
    pub fn move_to(&mut self, c: Coord) {
        if self.history.len() == MOVE_HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(c);
        self.position = c;
    }

    /// The cell occupied before the current one.
    pub fn previous_position(&self) -> Option<Coord> {
        self.history.iter().rev().nth(1).copied()
    }

    pub(crate) fn take_wall(&mut self, t: WallType) {
        if let Some(n) = self.inventory.get_mut(&t) {
            *n = n.saturating_sub(1);
        }
    }

    pub(crate) fn return_wall(&mut self, t: WallType, id: WallId) {
        *self.inventory.entry(t).or_insert(0) += 1;
        self.placed.retain(|&w| w != id);
    }
}
