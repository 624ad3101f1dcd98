//! Board geometry: the cell grid and the interleaved wall-slot grid.
//!
//! Walls live on an "expanded" grid of `(2w-1) x (2h-1)` sub-cells. Cell
//! `(x, y)` sits at expanded `(2x, 2y)`; a sub-cell with exactly one odd
//! coordinate is a wall segment between two cells, and a sub-cell with both
//! coordinates odd is a post where segments meet.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::SPECIAL_CELLS_PER_TYPE;
use crate::error::{GameError, Result};
use crate::player::PlayerId;
use crate::walls::{Wall, WallId, WallShape};

/// A cell coordinate. `x` is the column, `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
}

impl Coord {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Shift by `(dx, dy)`, or `None` if that leaves the non-negative quadrant.
    pub fn offset(self, dx: isize, dy: isize) -> Option<Coord> {
        Some(Coord {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A coordinate on the expanded grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub x: usize,
    pub y: usize,
}

impl Slot {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// What an expanded-grid coordinate addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Cell,
    WallSlot,
    Post,
}

impl SlotKind {
    pub fn of(slot: Slot) -> Self {
        match (slot.x % 2, slot.y % 2) {
            (0, 0) => SlotKind::Cell,
            (1, 1) => SlotKind::Post,
            _ => SlotKind::WallSlot,
        }
    }
}

/// Special behaviour attached to a cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellType {
    #[default]
    Normal,
    Teleport,
    Return,
    DoubleTurn,
}

/// Hook table for a cell type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellBehavior {
    /// Start-turn: the 8 surrounding cells become reachable, walls ignored.
    pub teleport: bool,
    /// On landing: the mover goes back to their previous cell.
    pub sends_back: bool,
    /// On landing: the mover plays again.
    pub extra_turn: bool,
}

impl CellType {
    pub const SPECIAL: [CellType; 3] = [CellType::Teleport, CellType::Return, CellType::DoubleTurn];

    pub fn behavior(self) -> CellBehavior {
        let none = CellBehavior {
            teleport: false,
            sends_back: false,
            extra_turn: false,
        };
        match self {
            CellType::Normal => none,
            CellType::Teleport => CellBehavior {
                teleport: true,
                ..none
            },
            CellType::Return => CellBehavior {
                sends_back: true,
                ..none
            },
            CellType::DoubleTurn => CellBehavior {
                extra_turn: true,
                ..none
            },
        }
    }

    fn symbol(self) -> char {
        match self {
            CellType::Normal => '.',
            CellType::Teleport => 'T',
            CellType::Return => 'R',
            CellType::DoubleTurn => 'D',
        }
    }
}

/// The playing field. Walls are owned here; players only keep their ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    width: usize,
    height: usize,
    cells: Vec<CellType>,
    slots: Vec<Option<WallId>>,
    walls: BTreeMap<WallId, Wall>,
}

impl Board {
    pub fn new(width: usize, height: usize) -> Self {
        let (sw, sh) = (2 * width - 1, 2 * height - 1);
        Self {
            width,
            height,
            cells: vec![CellType::Normal; width * height],
            slots: vec![None; sw * sh],
            walls: BTreeMap::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Dimensions of the expanded grid.
    pub fn slot_dims(&self) -> (usize, usize) {
        (2 * self.width - 1, 2 * self.height - 1)
    }

    fn idx(&self, c: Coord) -> usize {
        c.y * self.width + c.x
    }

    fn slot_idx(&self, s: Slot) -> usize {
        s.y * self.slot_dims().0 + s.x
    }

    pub fn contains(&self, c: Coord) -> bool {
        c.x < self.width && c.y < self.height
    }

    fn contains_slot(&self, s: Slot) -> bool {
        let (sw, sh) = self.slot_dims();
        s.x < sw && s.y < sh
    }

    pub fn cell_at(&self, c: Coord) -> Result<CellType> {
        if !self.contains(c) {
            return Err(GameError::OutOfBounds { x: c.x, y: c.y });
        }
        Ok(self.cells[self.idx(c)])
    }

    pub fn set_cell(&mut self, c: Coord, cell: CellType) -> Result<()> {
        if !self.contains(c) {
            return Err(GameError::OutOfBounds { x: c.x, y: c.y });
        }
        let i = self.idx(c);
        self.cells[i] = cell;
        Ok(())
    }

    /// The wall covering an expanded-grid sub-cell, if any.
    pub fn wall_at(&self, s: Slot) -> Result<Option<&Wall>> {
        if !self.contains_slot(s) {
            return Err(GameError::OutOfBounds { x: s.x, y: s.y });
        }
        Ok(self.slots[self.slot_idx(s)].and_then(|id| self.walls.get(&id)))
    }

    pub fn classify(&self, s: Slot) -> Result<SlotKind> {
        if !self.contains_slot(s) {
            return Err(GameError::OutOfBounds { x: s.x, y: s.y });
        }
        Ok(SlotKind::of(s))
    }

    pub fn wall(&self, id: WallId) -> Option<&Wall> {
        self.walls.get(&id)
    }

    pub fn walls(&self) -> impl Iterator<Item = &Wall> {
        self.walls.values()
    }

    /// Sub-cells a shape would cover when anchored at `anchor`.
    ///
    /// Fails with `InvalidPosition` if the anchor is not a wall slot, the
    /// footprint leaves the expanded grid, or it would cover a cell.
    pub fn footprint(&self, shape: &WallShape, anchor: Slot) -> Result<Vec<Slot>> {
        let invalid = GameError::InvalidPosition {
            x: anchor.x,
            y: anchor.y,
        };
        if !self.contains_slot(anchor) || SlotKind::of(anchor) != SlotKind::WallSlot {
            return Err(invalid);
        }
        let mut covered = Vec::new();
        for (dx, dy) in shape.footprint() {
            let s = Slot::new(anchor.x + dx, anchor.y + dy);
            if !self.contains_slot(s) || SlotKind::of(s) == SlotKind::Cell {
                return Err(invalid);
            }
            covered.push(s);
        }
        Ok(covered)
    }

    /// Fail with `SlotOccupied` on the first covered sub-cell holding a wall.
    pub fn ensure_free(&self, covered: &[Slot]) -> Result<()> {
        for &s in covered {
            if self.wall_at(s)?.is_some() {
                return Err(GameError::SlotOccupied { x: s.x, y: s.y });
            }
        }
        Ok(())
    }

    /// Write a wall's footprint into the slot grid and take ownership of it.
    /// Nothing is written unless every sub-cell is free.
    pub fn place_wall(&mut self, wall: Wall) -> Result<()> {
        let covered = wall.covered();
        self.ensure_free(&covered)?;
        for s in covered {
            let i = self.slot_idx(s);
            self.slots[i] = Some(wall.id);
        }
        self.walls.insert(wall.id, wall);
        Ok(())
    }

    /// Clear every sub-cell written by the wall and hand it back.
    pub fn remove_wall(&mut self, id: WallId) -> Option<Wall> {
        let wall = self.walls.remove(&id)?;
        for s in wall.covered() {
            let i = self.slot_idx(s);
            if self.slots[i] == Some(id) {
                self.slots[i] = None;
            }
        }
        Some(wall)
    }

    /// The wall segment between two orthogonally adjacent cells.
    pub fn slot_between(a: Coord, b: Coord) -> Slot {
        Slot::new(a.x + b.x, a.y + b.y)
    }

    /// Whether `player` is stopped from stepping between adjacent cells,
    /// counting `extra` as additional blocking sub-cells.
    pub fn blocks_step(&self, from: Coord, to: Coord, player: PlayerId, extra: &[Slot]) -> bool {
        let s = Self::slot_between(from, to);
        if extra.contains(&s) {
            return true;
        }
        match self.wall_at(s) {
            Ok(Some(wall)) => wall.blocks(player),
            Ok(None) => false,
            Err(_) => true,
        }
    }

    /// Move one step in `(dx, dy)`, staying on the board.
    pub fn step(&self, c: Coord, (dx, dy): (isize, isize)) -> Option<Coord> {
        c.offset(dx, dy).filter(|&n| self.contains(n))
    }

    /// Every cell on the board, row by row.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Coord::new(x, y)))
    }

    /// Scatter special cells over interior cells not listed in `reserved`.
    pub fn scatter_special_cells(&mut self, rng: &mut fastrand::Rng, reserved: &[Coord]) {
        let mut candidates: Vec<Coord> = self
            .coords()
            .filter(|c| c.x > 0 && c.y > 0 && c.x + 1 < self.width && c.y + 1 < self.height)
            .filter(|c| !reserved.contains(c))
            .collect();
        rng.shuffle(&mut candidates);
        let mut picks = candidates.into_iter();
        for cell in CellType::SPECIAL {
            for c in picks.by_ref().take(SPECIAL_CELLS_PER_TYPE) {
                let i = self.idx(c);
                self.cells[i] = cell;
            }
        }
    }

    /// Check the slot grid and the wall registry agree. Used after loading.
    pub fn check_integrity(&self) -> Result<()> {
        let bad = |msg: String| Err(GameError::Snapshot(msg));
        let (sw, sh) = self.slot_dims();
        if self.cells.len() != self.width * self.height || self.slots.len() != sw * sh {
            return bad("grid sizes do not match board dimensions".into());
        }
        for (i, id) in self.slots.iter().enumerate() {
            match id {
                Some(id) if !self.walls.contains_key(id) => {
                    return bad(format!("slot {i} references unknown wall {id}"));
                }
                _ => {}
            }
        }
        for (&id, wall) in &self.walls {
            if id != wall.id {
                return bad(format!("wall {} is registered as {id}", wall.id));
            }
            if !wall.has_catalog_shape() {
                return bad(format!("wall {id} does not have a {} shape", wall.wall_type));
            }
            if !self.contains_slot(wall.anchor) {
                return bad(format!("wall {id} is anchored outside the grid"));
            }
            for s in wall.covered() {
                if !self.contains_slot(s) || self.slots[self.slot_idx(s)] != Some(wall.id) {
                    return bad(format!("wall {} footprint is not fully placed", wall.id));
                }
            }
        }
        Ok(())
    }

    /// Text rendering with pawns drawn as their player id.
    pub fn render(&self, pawns: &[Coord]) -> String {
        let (sw, sh) = self.slot_dims();
        let mut out = String::with_capacity((sw + 1) * sh);
        for sy in 0..sh {
            for sx in 0..sw {
                let s = Slot::new(sx, sy);
                let ch = match SlotKind::of(s) {
                    SlotKind::Cell => {
                        let c = Coord::new(sx / 2, sy / 2);
                        match pawns.iter().position(|&p| p == c) {
                            Some(id) => char::from_digit(id as u32, 10).unwrap_or('?'),
                            None => self.cells[self.idx(c)].symbol(),
                        }
                    }
                    _ => match self.slots[self.slot_idx(s)] {
                        Some(_) => '#',
                        None => ' ',
                    },
                };
                out.push(ch);
            }
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&[]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walls::WallType;

    fn wall(id: WallId, t: WallType, anchor: Slot, turns: u8) -> Wall {
        Wall {
            id,
            wall_type: t,
            shape: t.shape().rotated(turns),
            owner: 0,
            anchor,
            created_turn: 0,
        }
    }

    #[test]
    fn test_classify_by_parity() {
        let board = Board::new(9, 9);
        assert_eq!(board.classify(Slot::new(0, 0)), Ok(SlotKind::Cell));
        assert_eq!(board.classify(Slot::new(1, 0)), Ok(SlotKind::WallSlot));
        assert_eq!(board.classify(Slot::new(0, 1)), Ok(SlotKind::WallSlot));
        assert_eq!(board.classify(Slot::new(1, 1)), Ok(SlotKind::Post));
        assert_eq!(
            board.classify(Slot::new(17, 0)),
            Err(GameError::OutOfBounds { x: 17, y: 0 })
        );
    }

    #[test]
    fn test_cell_at_out_of_bounds() {
        let board = Board::new(5, 7);
        assert_eq!(board.cell_at(Coord::new(4, 6)), Ok(CellType::Normal));
        assert!(matches!(
            board.cell_at(Coord::new(5, 0)),
            Err(GameError::OutOfBounds { .. })
        ));
        assert!(board.wall_at(Slot::new(0, 13)).is_err());
    }

    #[test]
    fn test_footprint_rejects_bad_anchors() {
        let board = Board::new(9, 9);
        let horizontal = WallType::Normal.shape();
        // Cell and post anchors
        assert!(board.footprint(&horizontal, Slot::new(0, 0)).is_err());
        assert!(board.footprint(&horizontal, Slot::new(1, 1)).is_err());
        // Horizontal shape on a vertical slot would cover a cell
        assert!(board.footprint(&horizontal, Slot::new(1, 0)).is_err());
        // Leaves the grid on the right
        assert!(board.footprint(&horizontal, Slot::new(16, 1)).is_err());
        assert_eq!(
            board.footprint(&horizontal, Slot::new(14, 1)),
            Ok(vec![Slot::new(14, 1), Slot::new(15, 1), Slot::new(16, 1)])
        );
        let vertical = horizontal.rotate();
        assert!(board.footprint(&vertical, Slot::new(1, 0)).is_ok());
    }

    #[test]
    fn test_place_and_remove_wall() {
        let mut board = Board::new(9, 9);
        board
            .place_wall(wall(7, WallType::Normal, Slot::new(0, 1), 0))
            .unwrap();
        assert_eq!(board.wall_at(Slot::new(1, 1)).unwrap().map(|w| w.id), Some(7));

        // Crossing vertical wall through the same post collides
        let err = board
            .place_wall(wall(8, WallType::Normal, Slot::new(1, 0), 1))
            .unwrap_err();
        assert_eq!(err, GameError::SlotOccupied { x: 1, y: 1 });
        assert!(board.wall(8).is_none());

        assert!(board.remove_wall(7).is_some());
        assert!(board.wall_at(Slot::new(0, 1)).unwrap().is_none());
        assert!(board.remove_wall(7).is_none());
        assert!(board.check_integrity().is_ok());
    }

    #[test]
    fn test_blocks_step() {
        let mut board = Board::new(9, 9);
        let a = Coord::new(0, 0);
        let b = Coord::new(0, 1);
        assert!(!board.blocks_step(a, b, 0, &[]));
        assert!(board.blocks_step(a, b, 0, &[Slot::new(0, 1)]));

        let mut ally = wall(1, WallType::Ally, Slot::new(0, 1), 0);
        ally.owner = 1;
        board.place_wall(ally).unwrap();
        assert!(board.blocks_step(a, b, 0, &[]));
        assert!(!board.blocks_step(b, a, 1, &[]));
    }

    #[test]
    fn test_scatter_special_cells_avoids_reserved_and_border() {
        let mut board = Board::new(9, 9);
        let reserved = [Coord::new(4, 4)];
        let mut rng = fastrand::Rng::with_seed(3);
        board.scatter_special_cells(&mut rng, &reserved);
        let special: Vec<Coord> = board
            .coords()
            .filter(|&c| board.cell_at(c) != Ok(CellType::Normal))
            .collect();
        assert_eq!(special.len(), 3 * SPECIAL_CELLS_PER_TYPE);
        for c in special {
            assert!(c.x > 0 && c.y > 0 && c.x < 8 && c.y < 8);
            assert_ne!(c, Coord::new(4, 4));
        }
    }

    #[test]
    fn test_render_dimensions() {
        let board = Board::new(5, 5);
        let text = board.render(&[Coord::new(2, 0), Coord::new(2, 4)]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 9);
        assert!(lines.iter().all(|l| l.chars().count() == 9));
        assert_eq!(lines[0].chars().nth(4), Some('0'));
        assert_eq!(lines[8].chars().nth(4), Some('1'));
    }
}
