//! Copy-out views of a match for display and inspection.
//!
//! A [`MatchSnapshot`] owns everything it holds, so a reader never observes
//! a half-applied action no matter what happens to the match afterwards.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::board::{CellType, Coord, Slot, SlotKind};
use crate::game::{MatchManager, Phase};
use crate::player::{PlayerId, WinCondition};
use crate::walls::{WallId, WallType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub position: Coord,
    pub win: WinCondition,
    pub in_turn: bool,
    pub legal_moves: Vec<Coord>,
    pub walls_remaining: BTreeMap<WallType, u32>,
    pub walls_placed: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WallView {
    pub id: WallId,
    pub wall_type: WallType,
    pub owner: PlayerId,
    pub covered: Vec<Slot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchSnapshot {
    pub width: usize,
    pub height: usize,
    /// Row-major cell types.
    pub cells: Vec<CellType>,
    pub walls: Vec<WallView>,
    pub players: Vec<PlayerView>,
    pub phase: Phase,
    pub winner: Option<PlayerId>,
    pub turn_count: u32,
}

impl MatchSnapshot {
    pub fn capture(game: &MatchManager) -> Self {
        let board = game.board();
        let in_play = game.phase() == Phase::Playing;
        let players = game
            .players()
            .iter()
            .map(|p| PlayerView {
                id: p.id,
                name: p.name.clone(),
                position: p.position,
                win: p.win,
                in_turn: in_play && game.current_player() == p.id,
                legal_moves: game.possible_movements(p.id).unwrap_or_default(),
                walls_remaining: p.inventory.clone(),
                walls_placed: p.placed.len(),
                elapsed_ms: p.elapsed_ms,
            })
            .collect();
        let walls = board
            .walls()
            .map(|w| WallView {
                id: w.id,
                wall_type: w.wall_type,
                owner: w.owner,
                covered: w.covered(),
            })
            .collect();
        Self {
            width: board.width(),
            height: board.height(),
            cells: board
                .coords()
                .map(|c| board.cell_at(c).unwrap_or_default())
                .collect(),
            walls,
            players,
            phase: game.phase(),
            winner: game.winner(),
            turn_count: game.turn_count(),
        }
    }

    pub fn cell(&self, c: Coord) -> Option<CellType> {
        (c.x < self.width && c.y < self.height).then(|| self.cells[c.y * self.width + c.x])
    }

    /// Owner of the wall covering a wall slot or post, if any.
    pub fn wall_owner(&self, s: Slot) -> Option<PlayerId> {
        if SlotKind::of(s) == SlotKind::Cell {
            return None;
        }
        self.walls
            .iter()
            .find(|w| w.covered.contains(&s))
            .map(|w| w.owner)
    }

    pub fn in_turn(&self) -> Option<&PlayerView> {
        self.players.iter().find(|p| p.in_turn)
    }
}

impl MatchManager {
    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot::capture(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;

    #[test]
    fn test_snapshot_reflects_state() {
        let mut game = MatchManager::create_match(MatchConfig {
            player_count: 4,
            ..MatchConfig::default()
        })
        .unwrap();
        game.place_wall(0, Slot::new(6, 1), WallType::Large, 0).unwrap();

        let snap = game.snapshot();
        assert_eq!(snap.players.len(), 4);
        assert_eq!(snap.in_turn().map(|p| p.id), Some(1));
        assert_eq!(snap.players[0].walls_placed, 1);
        assert_eq!(snap.players[0].walls_remaining[&WallType::Large], 1);
        assert_eq!(snap.wall_owner(Slot::new(8, 1)), Some(0));
        assert_eq!(snap.wall_owner(Slot::new(8, 0)), None);
        assert_eq!(snap.cell(Coord::new(9, 0)), None);
        // Wall under (4,0) stops the southward step
        assert!(!snap.players[0].legal_moves.contains(&Coord::new(4, 1)));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut game = MatchManager::create_match(MatchConfig::default()).unwrap();
        let before = game.snapshot();
        game.execute_move(0, Coord::new(4, 1)).unwrap();
        assert_eq!(before.players[0].position, Coord::new(4, 0));
        assert_eq!(game.snapshot().players[0].position, Coord::new(4, 1));
        assert!(serde_json::to_string(&before).is_ok());
    }
}
