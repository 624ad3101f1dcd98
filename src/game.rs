//! Match state machine: turns, moves, wall placements and victory.
//!
//! A match goes `Initialized -> Playing -> Winner`. Every mutating call is
//! validated completely before anything is written, so a rejected action
//! leaves the match exactly as it was.
//!
//! Turn processing after a successful action:
//! 1. Apply the destination cell's landing hook (Return, DoubleTurn)
//! 2. Check victory; a winner ends the match without advancing the turn
//! 3. Advance the turn order (skipped once by DoubleTurn)
//! 4. Increment the turn counter
//! 5. Run every wall's finish-turn hook (Temporal expiry)

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::board::{Board, Coord, Slot};
use crate::config::MatchConfig;
use crate::connectivity::first_blocked_player;
use crate::constants::{DIRECTIONS, RING};
use crate::error::{GameError, Result};
use crate::player::{Player, PlayerId, WinCondition, start_position};
use crate::walls::{Wall, WallId, WallType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Initialized,
    Playing,
    Winner,
}

/// Result of a completed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The match goes on with `next` in turn.
    Continue { next: PlayerId },
    /// The acting player reached their goal.
    Won(PlayerId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchManager {
    config: MatchConfig,
    board: Board,
    players: Vec<Player>,
    /// Fixed at creation.
    turn_order: Vec<PlayerId>,
    turn_index: usize,
    /// Completed actions so far.
    turn_count: u32,
    phase: Phase,
    winner: Option<PlayerId>,
    next_wall_id: WallId,
}

impl MatchManager {
    /// Build a match from a validated configuration. The match stays
    /// `Initialized` until [`MatchManager::start`].
    pub fn new(config: MatchConfig) -> Result<Self> {
        config.validate()?;
        let (w, h) = (config.board_width, config.board_height);
        let players: Vec<Player> = (0..config.player_count)
            .map(|id| {
                let start = start_position(id, w, h);
                Player::new(
                    id,
                    config.player_name(id),
                    start,
                    WinCondition::from_start(start, w, h),
                    config.walls_per_player.clone(),
                )
            })
            .collect();

        let mut board = Board::new(w, h);
        if config.special_cells {
            let reserved: Vec<Coord> = players.iter().map(|p| p.position).collect();
            let mut rng = fastrand::Rng::with_seed(config.seed);
            board.scatter_special_cells(&mut rng, &reserved);
        }

        Ok(Self {
            turn_order: (0..players.len()).collect(),
            config,
            board,
            players,
            turn_index: 0,
            turn_count: 0,
            phase: Phase::Initialized,
            winner: None,
            next_wall_id: 0,
        })
    }

    pub fn start(&mut self) -> Result<()> {
        if self.phase != Phase::Initialized {
            return Err(GameError::IllegalMove("match already started".into()));
        }
        self.phase = Phase::Playing;
        info!(
            width = self.board.width(),
            height = self.board.height(),
            players = self.players.len(),
            "match started"
        );
        Ok(())
    }

    /// Create and start a match in one step.
    pub fn create_match(config: MatchConfig) -> Result<Self> {
        let mut game = Self::new(config)?;
        game.start()?;
        Ok(game)
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player> {
        self.players
            .get(id)
            .ok_or_else(|| GameError::IllegalMove(format!("unknown player {id}")))
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Set once the phase is `Winner`.
    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn current_player(&self) -> PlayerId {
        self.turn_order[self.turn_index]
    }

    /// Credit time spent in turn to a player.
    pub fn add_elapsed(&mut self, id: PlayerId, ms: u64) {
        if let Some(p) = self.players.get_mut(id) {
            p.elapsed_ms = p.elapsed_ms.saturating_add(ms);
        }
    }

    fn is_occupied(&self, c: Coord) -> bool {
        self.players.iter().any(|p| p.position == c)
    }

    /// One step in `dir` if it stays on the board and no wall blocks `player`.
    fn open_step(&self, from: Coord, dir: (isize, isize), player: PlayerId) -> Option<Coord> {
        self.board
            .step(from, dir)
            .filter(|&to| !self.board.blocks_step(from, to, player, &[]))
    }

    fn free_step(&self, from: Coord, dir: (isize, isize), player: PlayerId) -> Option<Coord> {
        self.open_step(from, dir, player)
            .filter(|&c| !self.is_occupied(c))
    }

    /// Legal destinations for a player, in direction order N, E, S, W.
    ///
    /// A pawn in the way is jumped straight over when the landing cell is
    /// free. Only when a wall or the board edge stops that jump are the two
    /// diagonal cells beside the pawn offered, left of the travel direction
    /// first. Standing on a Teleport cell adds the 8
    /// surrounding cells regardless of walls. If nothing is reachable the
    /// player may stay where they are, so the set is never empty.
    ///
    /// This is a read-only query and may be asked for any player.
    pub fn possible_movements(&self, id: PlayerId) -> Result<Vec<Coord>> {
        let from = self.player(id)?.position;
        let mut moves: Vec<Coord> = Vec::with_capacity(8);
        let mut push = |c: Coord| {
            if !moves.contains(&c) {
                moves.push(c);
            }
        };

        for dir in DIRECTIONS {
            let Some(next) = self.open_step(from, dir, id) else {
                continue;
            };
            if !self.is_occupied(next) {
                push(next);
                continue;
            }
            if let Some(jump) = self.open_step(next, dir, id) {
                // A pawn on the landing cell forbids the jump but does not
                // open the diagonals.
                if !self.is_occupied(jump) {
                    push(jump);
                }
                continue;
            }
            let (dx, dy) = dir;
            for side in [(dy, -dx), (-dy, dx)] {
                if let Some(diagonal) = self.free_step(next, side, id) {
                    push(diagonal);
                }
            }
        }

        if self.board.cell_at(from)?.behavior().teleport {
            for offset in RING {
                if let Some(c) = self.board.step(from, offset).filter(|&c| !self.is_occupied(c)) {
                    push(c);
                }
            }
        }

        if moves.is_empty() {
            moves.push(from);
        }
        Ok(moves)
    }

    fn ensure_turn(&self, id: PlayerId) -> Result<()> {
        if self.phase != Phase::Playing {
            return Err(GameError::IllegalMove(format!(
                "match is not in play ({:?})",
                self.phase
            )));
        }
        self.player(id)?;
        if self.current_player() != id {
            return Err(GameError::IllegalMove(format!(
                "it is player {}'s turn, not player {id}'s",
                self.current_player()
            )));
        }
        Ok(())
    }

    /// Move the in-turn player's pawn.
    #[instrument(skip(self), fields(turn = self.turn_count))]
    pub fn execute_move(&mut self, id: PlayerId, destination: Coord) -> Result<Outcome> {
        self.ensure_turn(id)?;
        if !self.possible_movements(id)?.contains(&destination) {
            return Err(GameError::IllegalMove(format!(
                "{destination} is not a legal destination for player {id}"
            )));
        }
        let landing = self.board.cell_at(destination)?.behavior();
        let from = self.players[id].position;
        // Standing still on a DoubleTurn cell does not grant another turn.
        let extra_turn = landing.extra_turn && destination != from;

        let player = &mut self.players[id];
        player.move_to(destination);
        debug!(player = id, to = %destination, "pawn moved");
        if landing.sends_back {
            if let Some(prev) = player.previous_position() {
                player.move_to(prev);
                debug!(player = id, to = %prev, "return cell sent pawn back");
            }
        }

        if player.has_won() {
            self.phase = Phase::Winner;
            self.winner = Some(id);
            info!(player = id, name = %player.name, turn = self.turn_count, "player reached goal");
            return Ok(Outcome::Won(id));
        }
        if extra_turn {
            debug!(player = id, "double turn granted");
        }
        Ok(self.finish_turn(extra_turn))
    }

    /// Place a wall for the in-turn player.
    ///
    /// `anchor` is the top-left of the footprint on the expanded grid and
    /// `quarter_turns` rotates the wall before placement.
    #[instrument(skip(self), fields(turn = self.turn_count))]
    pub fn place_wall(
        &mut self,
        id: PlayerId,
        anchor: Slot,
        wall_type: WallType,
        quarter_turns: u8,
    ) -> Result<Outcome> {
        self.ensure_turn(id)?;
        if self.players[id].walls_left(wall_type) == 0 {
            return Err(GameError::WallExhausted(wall_type));
        }
        let shape = wall_type.shape().rotated(quarter_turns);
        let covered = self.board.footprint(&shape, anchor)?;
        self.board.ensure_free(&covered)?;
        let passable = wall_type.behavior().passable_for_owner;
        if let Some(blocked) =
            first_blocked_player(&self.board, &self.players, &covered, id, passable)
        {
            return Err(GameError::WallWouldBlockPath { player: blocked });
        }

        let wall_id = self.next_wall_id;
        self.board.place_wall(Wall {
            id: wall_id,
            wall_type,
            shape,
            owner: id,
            anchor,
            created_turn: self.turn_count,
        })?;
        self.next_wall_id += 1;
        let player = &mut self.players[id];
        player.take_wall(wall_type);
        player.placed.push(wall_id);
        debug!(player = id, wall = wall_id, %wall_type, x = anchor.x, y = anchor.y, "wall placed");
        Ok(self.finish_turn(false))
    }

    fn finish_turn(&mut self, extra_turn: bool) -> Outcome {
        if !extra_turn {
            self.turn_index = (self.turn_index + 1) % self.turn_order.len();
        }
        self.turn_count += 1;
        self.expire_walls();
        Outcome::Continue {
            next: self.current_player(),
        }
    }

    /// Finish-turn hook for walls: remove expired ones and hand them back.
    fn expire_walls(&mut self) {
        let expired: Vec<WallId> = self
            .board
            .walls()
            .filter(|w| w.expired(self.turn_count))
            .map(|w| w.id)
            .collect();
        for id in expired {
            let Some(wall) = self.board.remove_wall(id) else {
                continue;
            };
            if let Some(owner) = self.players.get_mut(wall.owner) {
                owner.return_wall(wall.wall_type, id);
            }
            info!(wall = id, owner = wall.owner, turn = self.turn_count, "wall expired");
        }
    }

    /// Serialize the whole match state.
    pub fn save_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| GameError::Snapshot(e.to_string()))
    }

    /// Restore a match saved with [`MatchManager::save_json`], rejecting
    /// inconsistent state.
    pub fn load_json(text: &str) -> Result<Self> {
        let game: Self =
            serde_json::from_str(text).map_err(|e| GameError::Snapshot(e.to_string()))?;
        game.check_consistency()?;
        Ok(game)
    }

    fn check_consistency(&self) -> Result<()> {
        let bad = |msg: &str| Err(GameError::Snapshot(msg.to_string()));
        self.config.validate()?;
        if self.board.width() != self.config.board_width
            || self.board.height() != self.config.board_height
        {
            return bad("board dimensions differ from configuration");
        }
        self.board.check_integrity()?;
        let n = self.players.len();
        if n != self.config.player_count || self.turn_order.len() != n || self.turn_index >= n {
            return bad("player list and turn order disagree");
        }
        if self.players.iter().enumerate().any(|(i, p)| p.id != i) {
            return bad("player ids are not sequential");
        }
        if self.turn_order.iter().any(|&id| id >= n) {
            return bad("turn order names an unknown player");
        }
        if self.players.iter().any(|p| !self.board.contains(p.position)) {
            return bad("player outside the board");
        }
        let owned = self
            .players
            .iter()
            .all(|p| p.placed.iter().all(|&w| self.board.wall(w).is_some_and(|w| w.owner == p.id)));
        if !owned || self.board.walls().any(|w| w.id >= self.next_wall_id) {
            return bad("placed walls do not match the board");
        }
        if (self.phase == Phase::Winner) != self.winner.is_some() {
            return bad("winner and phase disagree");
        }
        Ok(())
    }

    /// Pawn positions indexed by player id.
    pub fn pawns(&self) -> Vec<Coord> {
        self.players.iter().map(|p| p.position).collect()
    }
}

impl fmt::Display for MatchManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.board.render(&self.pawns()))?;
        for p in &self.players {
            let marker = if p.id == self.current_player() { '*' } else { ' ' };
            write!(f, "{marker}{} {} at {}, walls:", p.id, p.name, p.position)?;
            for (t, n) in &p.inventory {
                write!(f, " {t}={n}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::CellType;
    use crate::constants::TEMPORAL_WALL_LIFESPAN;

    fn two_player() -> MatchManager {
        MatchManager::create_match(MatchConfig::default()).unwrap()
    }

    fn sorted(mut v: Vec<Coord>) -> Vec<Coord> {
        v.sort();
        v
    }

    #[test]
    fn test_new_is_initialized() {
        let mut game = MatchManager::new(MatchConfig::default()).unwrap();
        assert_eq!(game.phase(), Phase::Initialized);
        assert!(matches!(
            game.execute_move(0, Coord::new(4, 1)),
            Err(GameError::IllegalMove(_))
        ));
        game.start().unwrap();
        assert_eq!(game.phase(), Phase::Playing);
        assert!(game.start().is_err());
    }

    #[test]
    fn test_opening_moves() {
        let game = two_player();
        assert_eq!(
            sorted(game.possible_movements(0).unwrap()),
            sorted(vec![Coord::new(3, 0), Coord::new(5, 0), Coord::new(4, 1)])
        );
    }

    #[test]
    fn test_wrong_turn_and_illegal_destination() {
        let mut game = two_player();
        assert!(matches!(
            game.execute_move(1, Coord::new(4, 7)),
            Err(GameError::IllegalMove(_))
        ));
        assert!(matches!(
            game.execute_move(0, Coord::new(4, 2)),
            Err(GameError::IllegalMove(_))
        ));
        assert!(game.execute_move(9, Coord::new(0, 0)).is_err());
        assert_eq!(game.turn_count(), 0);
        assert_eq!(
            game.execute_move(0, Coord::new(4, 1)),
            Ok(Outcome::Continue { next: 1 })
        );
        assert_eq!(game.turn_count(), 1);
    }

    #[test]
    fn test_diagonals_when_jump_walled() {
        let mut game = two_player();
        game.players[0].position = Coord::new(4, 4);
        game.players[1].position = Coord::new(4, 5);
        // Horizontal wall below (4,5): slot y = 11, covering x 8..=10
        game.board
            .place_wall(Wall {
                id: 0,
                wall_type: WallType::Normal,
                shape: WallType::Normal.shape(),
                owner: 1,
                anchor: Slot::new(8, 11),
                created_turn: 0,
            })
            .unwrap();
        let moves = game.possible_movements(0).unwrap();
        // Travelling south, left is east
        let diagonals: Vec<Coord> = moves.iter().copied().filter(|c| c.y == 5).collect();
        assert_eq!(diagonals, vec![Coord::new(5, 5), Coord::new(3, 5)]);
        assert!(!moves.contains(&Coord::new(4, 6)));
    }

    #[test]
    fn test_diagonals_at_board_edge() {
        let mut game = two_player();
        game.players[0].position = Coord::new(4, 7);
        game.players[1].position = Coord::new(4, 8);
        let moves = game.possible_movements(0).unwrap();
        assert!(moves.contains(&Coord::new(3, 8)));
        assert!(moves.contains(&Coord::new(5, 8)));
    }

    #[test]
    fn test_stand_still_when_boxed_in() {
        let mut game = two_player();
        // Player 0 in the corner, player 1 beside, every other exit walled
        game.players[0].position = Coord::new(0, 0);
        game.players[1].position = Coord::new(1, 0);
        for (anchor, turns) in [(Slot::new(0, 1), 0), (Slot::new(3, 0), 1)] {
            let id = game.next_wall_id;
            game.next_wall_id += 1;
            game.board
                .place_wall(Wall {
                    id,
                    wall_type: WallType::Normal,
                    shape: WallType::Normal.shape().rotated(turns),
                    owner: 1,
                    anchor,
                    created_turn: 0,
                })
                .unwrap();
        }
        assert_eq!(game.possible_movements(0).unwrap(), vec![Coord::new(0, 0)]);
    }

    #[test]
    fn test_occupied_landing_offers_no_diagonals() {
        let mut game = MatchManager::create_match(MatchConfig {
            player_count: 3,
            ..MatchConfig::default()
        })
        .unwrap();
        game.players[0].position = Coord::new(4, 3);
        game.players[1].position = Coord::new(4, 4);
        game.players[2].position = Coord::new(4, 5);
        assert_eq!(
            game.possible_movements(0).unwrap(),
            vec![Coord::new(4, 2), Coord::new(5, 3), Coord::new(3, 3)]
        );
    }

    #[test]
    fn test_stand_still_on_double_turn_passes_the_turn() {
        let mut game = two_player();
        game.players[0].position = Coord::new(0, 0);
        game.players[1].position = Coord::new(1, 0);
        game.board.set_cell(Coord::new(0, 0), CellType::DoubleTurn).unwrap();
        for (anchor, turns) in [(Slot::new(0, 1), 0), (Slot::new(3, 0), 1)] {
            let id = game.next_wall_id;
            game.next_wall_id += 1;
            game.board
                .place_wall(Wall {
                    id,
                    wall_type: WallType::Normal,
                    shape: WallType::Normal.shape().rotated(turns),
                    owner: 1,
                    anchor,
                    created_turn: 0,
                })
                .unwrap();
        }
        assert_eq!(
            game.execute_move(0, Coord::new(0, 0)),
            Ok(Outcome::Continue { next: 1 })
        );
    }

    #[test]
    fn test_teleport_adds_ring() {
        let mut game = two_player();
        game.board.set_cell(Coord::new(4, 0), CellType::Teleport).unwrap();
        let moves = game.possible_movements(0).unwrap();
        assert!(moves.contains(&Coord::new(3, 1)));
        assert!(moves.contains(&Coord::new(5, 1)));
        assert_eq!(moves.len(), 5);
    }

    #[test]
    fn test_return_cell_sends_back() {
        let mut game = two_player();
        game.board.set_cell(Coord::new(4, 1), CellType::Return).unwrap();
        game.execute_move(0, Coord::new(4, 1)).unwrap();
        assert_eq!(game.players[0].position, Coord::new(4, 0));
        assert_eq!(game.current_player(), 1);
    }

    #[test]
    fn test_double_turn_keeps_player() {
        let mut game = two_player();
        game.board.set_cell(Coord::new(4, 1), CellType::DoubleTurn).unwrap();
        assert_eq!(
            game.execute_move(0, Coord::new(4, 1)),
            Ok(Outcome::Continue { next: 0 })
        );
        assert_eq!(game.turn_count(), 1);
        game.execute_move(0, Coord::new(4, 2)).unwrap();
        assert_eq!(game.current_player(), 1);
    }

    #[test]
    fn test_wall_checks_in_order() {
        let mut game = two_player();
        assert!(matches!(
            game.place_wall(1, Slot::new(0, 1), WallType::Normal, 0),
            Err(GameError::IllegalMove(_))
        ));
        assert_eq!(
            game.place_wall(0, Slot::new(1, 1), WallType::Normal, 0),
            Err(GameError::InvalidPosition { x: 1, y: 1 })
        );
        game.players[0].inventory.insert(WallType::Large, 0);
        assert_eq!(
            game.place_wall(0, Slot::new(0, 1), WallType::Large, 0),
            Err(GameError::WallExhausted(WallType::Large))
        );
        assert_eq!(game.turn_count(), 0);
        assert!(game.board.walls().next().is_none());
    }

    #[test]
    fn test_temporal_wall_expires() {
        let mut game = two_player();
        let before = game.players[0].walls_left(WallType::Temporal);
        game.place_wall(0, Slot::new(0, 3), WallType::Temporal, 0).unwrap();
        assert_eq!(game.players[0].walls_left(WallType::Temporal), before - 1);
        assert_eq!(game.players[0].placed.len(), 1);

        // Placed at turn 0; three more actions bring the counter to the lifespan
        for (id, x, y) in [(1, 4, 7), (0, 4, 1), (1, 4, 6)] {
            assert!(game.board.walls().next().is_some());
            game.execute_move(id, Coord::new(x, y)).unwrap();
        }
        assert_eq!(game.turn_count(), TEMPORAL_WALL_LIFESPAN);
        assert!(game.board.walls().next().is_none());
        assert_eq!(game.players[0].walls_left(WallType::Temporal), before);
        assert!(game.players[0].placed.is_empty());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let mut game = two_player();
        game.place_wall(0, Slot::new(2, 5), WallType::Ally, 1).unwrap_err();
        game.place_wall(0, Slot::new(3, 4), WallType::Ally, 1).unwrap();
        game.execute_move(1, Coord::new(4, 7)).unwrap();
        let text = game.save_json().unwrap();
        let loaded = MatchManager::load_json(&text).unwrap();
        assert_eq!(loaded, game);
    }

    #[test]
    fn test_load_rejects_inconsistent_state() {
        let mut game = two_player();
        game.turn_index = 5;
        let text = serde_json::to_string(&game).unwrap();
        assert!(matches!(
            MatchManager::load_json(&text),
            Err(GameError::Snapshot(_))
        ));
        assert!(MatchManager::load_json("{}").is_err());
    }

    #[test]
    fn test_load_rejects_tampered_walls() {
        let mut game = two_player();
        game.place_wall(0, Slot::new(0, 1), WallType::Normal, 0).unwrap();
        let text = game.save_json().unwrap();
        assert!(text.contains("\"size\":3"));
        assert!(text.contains("\"anchor\":{\"x\":0,\"y\":1}"));

        let tampered = [
            // Mask length no longer matches its size
            text.replacen("\"size\":3", "\"size\":9", 1),
            // Anchor far outside the grid
            text.replacen(
                "\"anchor\":{\"x\":0,\"y\":1}",
                &format!("\"anchor\":{{\"x\":{},\"y\":1}}", usize::MAX),
                1,
            ),
            // A Large wall carrying the Normal mask
            text.replacen("\"wall_type\":\"Normal\"", "\"wall_type\":\"Large\"", 1),
        ];
        for text in tampered {
            assert!(matches!(
                MatchManager::load_json(&text),
                Err(GameError::Snapshot(_))
            ));
        }
    }
}
