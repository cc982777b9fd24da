//! Board Mirror
//!
//! Local 10×10 projection of the remote board. Each cell holds at most one
//! tile-view. Lookups are tolerant: off-board coordinates yield `None`,
//! which is what adjacency checks at the edges rely on.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::accounts::board::{BoardAccount, BOARD_CELLS, BOARD_HEIGHT, BOARD_WIDTH};
use crate::accounts::tile::Tile;

use super::catalog::{TileCatalog, TileConfig};

/// Mirror operation failures. All are logged and treated as no-ops.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MirrorError {
    /// Coordinate outside the 10×10 grid.
    #[error("coordinate ({x}, {y}) is off the board")]
    OutOfRange {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
    },
    /// Cell already carries a tile-view.
    #[error("cell ({x}, {y}) is already occupied")]
    CellAlreadyOccupied {
        /// Column.
        x: u8,
        /// Row.
        y: u8,
    },
}

/// Rendered state of one occupied cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileView {
    /// Catalog entry used to present it.
    pub config: TileConfig,
    /// Decoded tile it was built from.
    pub tile: Tile,
    /// Mirror revision at which it was last (re)initialized.
    pub revision: u64,
}

impl TileView {
    /// Building type as decoded, which may differ from the catalog entry
    /// when the catalog fell back.
    pub fn building_type(&self) -> u8 {
        self.tile.building_type
    }
}

/// What an applied tile did to its cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellChange {
    /// Empty cell gained a view.
    Placed,
    /// Existing view rebuilt from new tile data.
    Reinitialized,
    /// View removed (tile reverted to a tree).
    Cleared,
}

/// One grid coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    x: u8,
    y: u8,
    view: Option<TileView>,
}

impl Cell {
    fn empty(x: u8, y: u8) -> Self {
        Self { x, y, view: None }
    }

    /// Coordinates.
    pub fn coords(&self) -> (u8, u8) {
        (self.x, self.y)
    }

    /// Tile-view, if occupied.
    pub fn tile_view(&self) -> Option<&TileView> {
        self.view.as_ref()
    }

    /// Whether a tile-view is present.
    pub fn is_occupied(&self) -> bool {
        self.view.is_some()
    }
}

/// The grid.
#[derive(Debug, Clone)]
pub struct BoardMirror {
    cells: Vec<Cell>,
    initialized: bool,
    revision: u64,
}

impl Default for BoardMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardMirror {
    /// Create an empty, uninitialized mirror.
    pub fn new() -> Self {
        let mut mirror = Self {
            cells: Vec::new(),
            initialized: false,
            revision: 0,
        };
        mirror.init_grid();
        mirror
    }

    /// Allocate all 100 cells empty. Safe to call again.
    pub fn init_grid(&mut self) {
        self.cells.clear();
        self.cells.reserve(BOARD_CELLS);
        for x in 0..BOARD_WIDTH as u8 {
            for y in 0..BOARD_HEIGHT as u8 {
                self.cells.push(Cell::empty(x, y));
            }
        }
        self.initialized = false;
    }

    /// Whether the mirror has been built from a snapshot since the last reset.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Monotonic mutation counter.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn index(x: i32, y: i32) -> Option<usize> {
        if (0..BOARD_WIDTH as i32).contains(&x) && (0..BOARD_HEIGHT as i32).contains(&y) {
            Some(x as usize * BOARD_HEIGHT + y as usize)
        } else {
            None
        }
    }

    /// Bounds-checked lookup.
    pub fn get_cell(&self, x: i32, y: i32) -> Option<&Cell> {
        let i = Self::index(x, y)?;
        self.cells.get(i)
    }

    /// Bounds-checked mutable lookup.
    pub fn get_cell_mut(&mut self, x: i32, y: i32) -> Option<&mut Cell> {
        let i = Self::index(x, y)?;
        self.cells.get_mut(i)
    }

    /// Neighbour of `cell` at `(dx, dy)`. `dy` points up, so rows go the
    /// other way.
    pub fn adjacent_cell(&self, cell: &Cell, (dx, dy): (i32, i32)) -> Option<&Cell> {
        self.get_cell(cell.x as i32 + dx, cell.y as i32 - dy)
    }

    /// All cells, outer index (x) first.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Cells with a tile-view.
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_occupied()).count()
    }

    /// Building type shown at a cell, if any.
    pub fn building_type_at(&self, x: i32, y: i32) -> Option<u8> {
        self.get_cell(x, y)?.tile_view().map(TileView::building_type)
    }

    fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    /// Put a tile-view on an empty cell.
    ///
    /// An occupied cell is left untouched; several update paths may race
    /// to populate the same cell.
    pub fn place_tile(
        &mut self,
        x: i32,
        y: i32,
        config: &TileConfig,
        tile: Tile,
    ) -> Result<(), MirrorError> {
        let Some(i) = Self::index(x, y) else {
            warn!(x, y, "Ignoring tile placement off the board");
            return Err(MirrorError::OutOfRange { x, y });
        };

        if self.cells[i].is_occupied() {
            debug!(x, y, "Cell already occupied, placement skipped");
            let (x, y) = self.cells[i].coords();
            return Err(MirrorError::CellAlreadyOccupied { x, y });
        }

        let revision = self.next_revision();
        self.cells[i].view = Some(TileView {
            config: config.clone(),
            tile,
            revision,
        });
        Ok(())
    }

    /// Apply an action's post-state tile to a cell.
    ///
    /// Occupied cells are re-initialized in place, empty ones get a new
    /// view, and a tree clears the cell.
    pub fn apply_tile(
        &mut self,
        x: i32,
        y: i32,
        config: &TileConfig,
        tile: Tile,
    ) -> Result<CellChange, MirrorError> {
        let Some(i) = Self::index(x, y) else {
            warn!(x, y, "Ignoring tile transition off the board");
            return Err(MirrorError::OutOfRange { x, y });
        };

        if !tile.is_occupied() {
            self.cells[i].view = None;
            self.next_revision();
            return Ok(CellChange::Cleared);
        }

        let revision = self.next_revision();
        let change = if self.cells[i].is_occupied() {
            CellChange::Reinitialized
        } else {
            CellChange::Placed
        };
        self.cells[i].view = Some(TileView {
            config: config.clone(),
            tile,
            revision,
        });
        Ok(change)
    }

    /// Drop every tile-view and mark the mirror uninitialized.
    pub fn reset(&mut self) {
        for cell in &mut self.cells {
            cell.view = None;
        }
        self.initialized = false;
        self.next_revision();
    }

    /// Place a view on every occupied cell of `snapshot` and mark the
    /// mirror initialized. Returns the number of views placed.
    pub fn build_from_snapshot(&mut self, snapshot: &BoardAccount, catalog: &TileCatalog) -> usize {
        let mut placed = 0;
        for (x, y, tile) in snapshot.tiles() {
            if !tile.is_occupied() {
                continue;
            }
            if self
                .place_tile(x as i32, y as i32, catalog.for_tile(tile), *tile)
                .is_ok()
            {
                placed += 1;
            }
        }
        self.initialized = true;
        placed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::tile::{BUILDING_TYPE_EMPTY, BUILDING_TYPE_SAWMILL, BUILDING_TYPE_TREE};

    fn mill() -> (TileConfig, Tile) {
        let catalog = TileCatalog::default();
        (
            catalog.find_by_type(BUILDING_TYPE_SAWMILL).clone(),
            Tile::with_type(BUILDING_TYPE_SAWMILL),
        )
    }

    #[test]
    fn test_init_grid_allocates_all_cells() {
        let mirror = BoardMirror::new();
        assert_eq!(mirror.cells().count(), 100);
        assert_eq!(mirror.occupied_count(), 0);
        assert!(!mirror.is_initialized());
        assert_eq!(mirror.get_cell(3, 7).unwrap().coords(), (3, 7));
    }

    #[test]
    fn test_out_of_range_lookup_is_none() {
        let mirror = BoardMirror::new();
        assert!(mirror.get_cell(-1, 5).is_none());
        assert!(mirror.get_cell(10, 0).is_none());
        assert!(mirror.get_cell(0, 10).is_none());
        assert!(mirror.get_cell(9, 9).is_some());
    }

    #[test]
    fn test_adjacent_cell() {
        let mirror = BoardMirror::new();
        let corner = mirror.get_cell(0, 0).unwrap();
        assert_eq!(mirror.adjacent_cell(corner, (1, 0)).unwrap().coords(), (1, 0));
        assert_eq!(mirror.adjacent_cell(corner, (0, -1)).unwrap().coords(), (0, 1));
        assert!(mirror.adjacent_cell(corner, (0, 1)).is_none());
        assert!(mirror.adjacent_cell(corner, (-1, 0)).is_none());
    }

    #[test]
    fn test_place_on_occupied_cell_is_noop() {
        let mut mirror = BoardMirror::new();
        let (config, tile) = mill();
        mirror.place_tile(2, 2, &config, tile).unwrap();
        let before = mirror.get_cell(2, 2).cloned();

        let other = Tile::with_type(BUILDING_TYPE_EMPTY);
        assert_eq!(
            mirror.place_tile(2, 2, &config, other),
            Err(MirrorError::CellAlreadyOccupied { x: 2, y: 2 })
        );
        assert_eq!(mirror.get_cell(2, 2).cloned(), before);
        assert_eq!(
            mirror.place_tile(11, 2, &config, tile),
            Err(MirrorError::OutOfRange { x: 11, y: 2 })
        );
    }

    #[test]
    fn test_apply_tile_transitions() {
        let mut mirror = BoardMirror::new();
        let (config, tile) = mill();

        assert_eq!(mirror.apply_tile(4, 4, &config, tile), Ok(CellChange::Placed));
        let first = mirror.get_cell(4, 4).unwrap().tile_view().unwrap().revision;

        let upgraded = Tile { building_level: 2, ..tile };
        assert_eq!(mirror.apply_tile(4, 4, &config, upgraded), Ok(CellChange::Reinitialized));
        let view = mirror.get_cell(4, 4).unwrap().tile_view().unwrap();
        assert_eq!(view.tile.building_level, 2);
        assert!(view.revision > first);

        let tree = Tile::with_type(BUILDING_TYPE_TREE);
        assert_eq!(mirror.apply_tile(4, 4, &config, tree), Ok(CellChange::Cleared));
        assert!(!mirror.get_cell(4, 4).unwrap().is_occupied());
    }

    #[test]
    fn test_build_and_reset() {
        let mut snapshot = BoardAccount::default();
        snapshot.board[3][4] = Tile::with_type(BUILDING_TYPE_SAWMILL);
        snapshot.board[0][9] = Tile::with_type(BUILDING_TYPE_EMPTY);

        let mut mirror = BoardMirror::new();
        assert_eq!(mirror.build_from_snapshot(&snapshot, &TileCatalog::default()), 2);
        assert!(mirror.is_initialized());
        assert_eq!(mirror.building_type_at(3, 4), Some(BUILDING_TYPE_SAWMILL));
        assert_eq!(mirror.building_type_at(4, 3), None);

        mirror.reset();
        assert!(!mirror.is_initialized());
        assert_eq!(mirror.occupied_count(), 0);
        assert_eq!(mirror.cells().count(), 100);
    }
}
