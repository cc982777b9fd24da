//! Tile Record
//!
//! Per-cell building state, nested inside the board and inside each
//! action. No discriminator of its own.

use serde::{Deserialize, Serialize};

use crate::codec::pubkey::PUBKEY_LEN;
use crate::codec::{ByteReader, ByteWriter, CodecResult, Pubkey};

/// Encoded tile size: type(1) + level(1) + owner(32) + 3 timestamps(8).
pub const TILE_LEN: usize = 1 + 1 + PUBKEY_LEN + 8 * 3;

/// Building type: tree (the untouched cell).
pub const BUILDING_TYPE_TREE: u8 = 0;
/// Building type: cleared ground.
pub const BUILDING_TYPE_EMPTY: u8 = 1;
/// Building type: saw mill, produces wood.
pub const BUILDING_TYPE_SAWMILL: u8 = 2;
/// Building type: stone mine, produces stone.
pub const BUILDING_TYPE_STONE_MINE: u8 = 3;

/// Seconds between collections from a building.
pub const COLLECT_COOLDOWN_SECS: i64 = 60;

/// Units granted per collection.
pub const COLLECT_REWARD: u64 = 5;

/// Building state of a single board cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    /// Building type code.
    pub building_type: u8,
    /// Upgrade level.
    pub building_level: u8,
    /// Player (or avatar) that built it.
    pub owner: Pubkey,
    /// Unix time the building was placed.
    pub start_time: i64,
    /// Unix time the last upgrade started.
    pub upgrade_start_time: i64,
    /// Unix time of the last collection.
    pub collect_start_time: i64,
}

impl Tile {
    /// Create a tile of the given type with zeroed metadata.
    pub fn with_type(building_type: u8) -> Self {
        Self {
            building_type,
            ..Self::default()
        }
    }

    /// Decode a nested tile at the reader's cursor.
    pub fn read(reader: &mut ByteReader<'_>) -> CodecResult<Self> {
        Ok(Self {
            building_type: reader.read_u8()?,
            building_level: reader.read_u8()?,
            owner: reader.read_pubkey()?,
            start_time: reader.read_i64()?,
            upgrade_start_time: reader.read_i64()?,
            collect_start_time: reader.read_i64()?,
        })
    }

    /// Encode at the writer's cursor.
    pub fn write(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        writer.write_u8(self.building_type)?;
        writer.write_u8(self.building_level)?;
        writer.write_pubkey(&self.owner)?;
        writer.write_i64(self.start_time)?;
        writer.write_i64(self.upgrade_start_time)?;
        writer.write_i64(self.collect_start_time)?;
        Ok(())
    }

    /// Whether the mirror should hold a tile-view for this cell.
    #[inline]
    pub fn is_occupied(&self) -> bool {
        self.building_type != BUILDING_TYPE_TREE
    }

    /// Whether this building produces resources.
    #[inline]
    pub fn is_producer(&self) -> bool {
        matches!(
            self.building_type,
            BUILDING_TYPE_SAWMILL | BUILDING_TYPE_STONE_MINE
        )
    }

    /// Whether the program would accept a collect at `now` (unix seconds).
    pub fn is_collectable(&self, now: i64) -> bool {
        self.is_producer() && now.saturating_sub(self.collect_start_time) >= COLLECT_COOLDOWN_SECS
    }

    /// Reward granted by a collect on this tile.
    pub fn collect_reward(&self) -> Reward {
        let resource = if self.building_type == BUILDING_TYPE_STONE_MINE {
            Resource::Stone
        } else {
            Resource::Wood
        };
        Reward {
            resource,
            amount: COLLECT_REWARD,
        }
    }
}

/// Global board resources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// Wood.
    Wood,
    /// Stone.
    Stone,
}

/// A collected amount of one resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    /// Resource kind.
    pub resource: Resource,
    /// Units.
    pub amount: u64,
}
