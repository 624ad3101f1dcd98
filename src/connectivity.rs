//! Reachability checks guaranteeing no player is ever walled off.
//!
//! Wall placements are validated against a hypothetical footprint before
//! anything is written to the board. Pawns never block a path; only walls do.

use std::collections::VecDeque;

use crate::board::{Board, Coord, Slot};
use crate::constants::DIRECTIONS;
use crate::player::{Player, PlayerId, WinCondition};

/// Breadth-first search from `start` to any cell satisfying `win`.
///
/// `extra` lists additional blocking sub-cells (a wall not yet placed).
pub fn has_path(
    board: &Board,
    player: PlayerId,
    start: Coord,
    win: WinCondition,
    extra: &[Slot],
) -> bool {
    let w = board.width();
    let mut visited = vec![false; w * board.height()];
    let mut queue = VecDeque::from([start]);
    visited[start.y * w + start.x] = true;

    while let Some(c) = queue.pop_front() {
        if win.is_goal(c) {
            return true;
        }
        for dir in DIRECTIONS {
            let Some(n) = board.step(c, dir) else {
                continue;
            };
            let i = n.y * w + n.x;
            if !visited[i] && !board.blocks_step(c, n, player, extra) {
                visited[i] = true;
                queue.push_back(n);
            }
        }
    }
    false
}

/// Whether `player` can still reach their goal with `extra` sub-cells blocked.
pub fn has_path_to_goal(board: &Board, player: &Player, extra: &[Slot]) -> bool {
    has_path(board, player.id, player.position, player.win, extra)
}

/// Check a candidate wall for every player. Returns the first player it
/// would cut off.
///
/// `passable_for_owner` exempts `owner` from the hypothetical footprint, as
/// for Ally walls.
pub fn first_blocked_player(
    board: &Board,
    players: &[Player],
    covered: &[Slot],
    owner: PlayerId,
    passable_for_owner: bool,
) -> Option<PlayerId> {
    players
        .iter()
        .find(|p| {
            let extra = if passable_for_owner && p.id == owner {
                &[][..]
            } else {
                covered
            };
            !has_path_to_goal(board, p, extra)
        })
        .map(|p| p.id)
}
