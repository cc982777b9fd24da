//! Action History Record
//!
//! Ring buffer of the most recent committed actions. The program writes
//! slot `action_index` and wraps, so slot order is only chronological
//! until the first wrap; [`GameActionHistory::ordered_actions`] restores
//! the log order by `action_id`.

use serde::{Deserialize, Serialize};

use crate::codec::pubkey::PUBKEY_LEN;
use crate::codec::{discriminator, ByteReader, ByteWriter, CodecResult, Discriminator, Pubkey};

use super::tile::{Tile, TILE_LEN};
use super::AccountRecord;

/// Actions kept in the ring buffer.
pub const HISTORY_CAPACITY: usize = 30;

/// Encoded action size.
pub const GAME_ACTION_LEN: usize = 8 + 1 + 1 + 1 + TILE_LEN + PUBKEY_LEN * 2;

/// Encoded history size.
pub const GAME_ACTION_HISTORY_LEN: usize =
    discriminator::DISCRIMINATOR_LEN + 8 + 8 + HISTORY_CAPACITY * GAME_ACTION_LEN;

/// `action_id` of an unused slot.
pub const SENTINEL_ACTION_ID: u64 = 0;

/// Kind of committed action.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    /// Tree chopped.
    #[default]
    Chop,
    /// Building placed.
    Build,
    /// Building upgraded.
    Upgrade,
    /// Resources collected.
    Collect,
    /// Code this client does not know. Never applied.
    Unknown(u8),
}

impl ActionType {
    /// Whether the replay engine knows how to apply it.
    pub fn is_known(self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<u8> for ActionType {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Chop,
            1 => Self::Build,
            2 => Self::Upgrade,
            3 => Self::Collect,
            other => Self::Unknown(other),
        }
    }
}

impl From<ActionType> for u8 {
    fn from(action: ActionType) -> Self {
        match action {
            ActionType::Chop => 0,
            ActionType::Build => 1,
            ActionType::Upgrade => 2,
            ActionType::Collect => 3,
            ActionType::Unknown(code) => code,
        }
    }
}

/// One committed action.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameAction {
    /// Unique id, the dedup key. Zero marks an unused slot.
    pub action_id: u64,
    /// What happened.
    pub action_type: ActionType,
    /// Target column.
    pub x: u8,
    /// Target row.
    pub y: u8,
    /// Tile state after the action.
    pub tile: Tile,
    /// Acting player.
    pub player: Pubkey,
    /// Acting player's avatar mint.
    pub avatar: Pubkey,
}

impl GameAction {
    /// Whether this is an unused slot.
    #[inline]
    pub fn is_sentinel(&self) -> bool {
        self.action_id == SENTINEL_ACTION_ID
    }

    fn read(reader: &mut ByteReader<'_>) -> CodecResult<Self> {
        Ok(Self {
            action_id: reader.read_u64()?,
            action_type: ActionType::from(reader.read_u8()?),
            x: reader.read_u8()?,
            y: reader.read_u8()?,
            tile: Tile::read(reader)?,
            player: reader.read_pubkey()?,
            avatar: reader.read_pubkey()?,
        })
    }

    fn write(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        writer.write_u64(self.action_id)?;
        writer.write_u8(self.action_type.into())?;
        writer.write_u8(self.x)?;
        writer.write_u8(self.y)?;
        self.tile.write(writer)?;
        writer.write_pubkey(&self.player)?;
        writer.write_pubkey(&self.avatar)?;
        Ok(())
    }
}

/// Ring buffer of recent actions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameActionHistory {
    /// Last id handed out by the program.
    pub id_counter: u64,
    /// Next slot to be written.
    pub action_index: u64,
    /// Slots.
    pub game_actions: [GameAction; HISTORY_CAPACITY],
}

impl GameActionHistory {
    /// Non-sentinel actions in ascending `action_id` order.
    pub fn ordered_actions(&self) -> Vec<GameAction> {
        let mut actions: Vec<GameAction> = self
            .game_actions
            .iter()
            .filter(|action| !action.is_sentinel())
            .copied()
            .collect();
        actions.sort_by_key(|action| action.action_id);
        actions
    }

    /// Append an action the way the program does: write the slot at
    /// `action_index`, then advance and wrap. The id counter wraps to zero
    /// past `u64::MAX`.
    pub fn push(&mut self, mut action: GameAction) -> u64 {
        self.id_counter = self.id_counter.checked_add(1).unwrap_or(0);
        action.action_id = self.id_counter;
        let slot = (self.action_index as usize) % HISTORY_CAPACITY;
        self.game_actions[slot] = action;
        self.action_index = ((slot + 1) % HISTORY_CAPACITY) as u64;
        action.action_id
    }
}

impl AccountRecord for GameActionHistory {
    const NAME: &'static str = "GameActionHistory";
    const DISCRIMINATOR: Discriminator = discriminator::GAME_ACTION_HISTORY;

    fn read_fields(reader: &mut ByteReader<'_>) -> CodecResult<Self> {
        let id_counter = reader.read_u64()?;
        let action_index = reader.read_u64()?;
        let mut game_actions = [GameAction::default(); HISTORY_CAPACITY];
        for action in game_actions.iter_mut() {
            *action = GameAction::read(reader)?;
        }
        Ok(Self {
            id_counter,
            action_index,
            game_actions,
        })
    }

    fn write_fields(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        writer.write_u64(self.id_counter)?;
        writer.write_u64(self.action_index)?;
        for action in &self.game_actions {
            action.write(writer)?;
        }
        Ok(())
    }

    fn encoded_len(&self) -> usize {
        GAME_ACTION_HISTORY_LEN
    }
}
