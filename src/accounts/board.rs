//! Board Record
//!
//! The shared 10×10 board plus global resources. The matrix is addressed
//! `board[x][y]` and serialized row-major, outer index first.

use serde::{Deserialize, Serialize};

use crate::codec::{discriminator, ByteReader, ByteWriter, CodecResult, Discriminator};

use super::tile::{Tile, TILE_LEN};
use super::AccountRecord;

/// Board columns.
pub const BOARD_WIDTH: usize = 10;

/// Board rows.
pub const BOARD_HEIGHT: usize = 10;

/// Cells on the board.
pub const BOARD_CELLS: usize = BOARD_WIDTH * BOARD_HEIGHT;

/// Encoded size: tag + matrix + four u64 counters.
pub const BOARD_ACCOUNT_LEN: usize =
    discriminator::DISCRIMINATOR_LEN + BOARD_CELLS * TILE_LEN + 8 * 4;

/// Shared board account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardAccount {
    /// Tile matrix, `board[x][y]`.
    pub board: [[Tile; BOARD_HEIGHT]; BOARD_WIDTH],
    /// Id of the latest committed action. Never decreases.
    pub action_id: u64,
    /// Global wood.
    pub wood: u64,
    /// Global stone.
    pub stone: u64,
    /// Level of the shared dam.
    pub dam_level: u64,
}

impl BoardAccount {
    /// Tile at a coordinate, if on the board.
    pub fn tile(&self, x: usize, y: usize) -> Option<&Tile> {
        self.board.get(x)?.get(y)
    }

    /// Mutable tile at a coordinate, if on the board.
    pub fn tile_mut(&mut self, x: usize, y: usize) -> Option<&mut Tile> {
        self.board.get_mut(x)?.get_mut(y)
    }

    /// All tiles with their coordinates, outer index first.
    pub fn tiles(&self) -> impl Iterator<Item = (u8, u8, &Tile)> + '_ {
        self.board.iter().enumerate().flat_map(|(x, column)| {
            column
                .iter()
                .enumerate()
                .map(move |(y, tile)| (x as u8, y as u8, tile))
        })
    }

    /// Number of cells that should carry a tile-view.
    pub fn occupied_count(&self) -> usize {
        self.tiles().filter(|(_, _, tile)| tile.is_occupied()).count()
    }
}

impl AccountRecord for BoardAccount {
    const NAME: &'static str = "BoardAccount";
    const DISCRIMINATOR: Discriminator = discriminator::BOARD_ACCOUNT;

    fn read_fields(reader: &mut ByteReader<'_>) -> CodecResult<Self> {
        let mut board = [[Tile::default(); BOARD_HEIGHT]; BOARD_WIDTH];
        for column in board.iter_mut() {
            for tile in column.iter_mut() {
                *tile = Tile::read(reader)?;
            }
        }

        Ok(Self {
            board,
            action_id: reader.read_u64()?,
            wood: reader.read_u64()?,
            stone: reader.read_u64()?,
            dam_level: reader.read_u64()?,
        })
    }

    fn write_fields(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        for column in &self.board {
            for tile in column {
                tile.write(writer)?;
            }
        }
        writer.write_u64(self.action_id)?;
        writer.write_u64(self.wood)?;
        writer.write_u64(self.stone)?;
        writer.write_u64(self.dam_level)?;
        Ok(())
    }

    fn encoded_len(&self) -> usize {
        BOARD_ACCOUNT_LEN
    }
}
