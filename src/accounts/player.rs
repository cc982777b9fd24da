//! Player Record
//!
//! One per player. Only ever replaced by a freshly decoded snapshot;
//! the client never edits it speculatively.

use serde::{Deserialize, Serialize};

use crate::codec::primitive::string_len;
use crate::codec::pubkey::PUBKEY_LEN;
use crate::codec::{discriminator, ByteReader, ByteWriter, CodecResult, Discriminator, Pubkey};

use super::AccountRecord;

/// Energy cap.
pub const MAX_ENERGY: u64 = 10;

/// Seconds per refilled energy unit.
pub const TIME_TO_REFILL_ENERGY: i64 = 60;

/// Player account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerData {
    /// Wallet that owns this player.
    pub authority: Pubkey,
    /// Avatar NFT mint.
    pub avatar: Pubkey,
    /// Display name.
    pub name: String,
    /// Player level.
    pub level: u8,
    /// Experience points.
    pub xp: u64,
    /// Energy as of `last_login`.
    pub energy: u64,
    /// Unix time energy was last settled.
    pub last_login: i64,
}

impl PlayerData {
    /// Energy the program would settle to at `now` (unix seconds).
    ///
    /// One unit per full refill interval past `last_login`, capped at
    /// [`MAX_ENERGY`]. Display only.
    pub fn projected_energy(&self, now: i64) -> u64 {
        if self.energy >= MAX_ENERGY {
            return self.energy;
        }

        let mut energy = self.energy;
        let mut elapsed = now.saturating_sub(self.last_login);
        while elapsed > TIME_TO_REFILL_ENERGY {
            energy += 1;
            elapsed -= TIME_TO_REFILL_ENERGY;
            if energy >= MAX_ENERGY {
                break;
            }
        }
        energy
    }
}

impl AccountRecord for PlayerData {
    const NAME: &'static str = "PlayerData";
    const DISCRIMINATOR: Discriminator = discriminator::PLAYER_DATA;

    fn read_fields(reader: &mut ByteReader<'_>) -> CodecResult<Self> {
        Ok(Self {
            authority: reader.read_pubkey()?,
            avatar: reader.read_pubkey()?,
            name: reader.read_string()?,
            level: reader.read_u8()?,
            xp: reader.read_u64()?,
            energy: reader.read_u64()?,
            last_login: reader.read_i64()?,
        })
    }

    fn write_fields(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        writer.write_pubkey(&self.authority)?;
        writer.write_pubkey(&self.avatar)?;
        writer.write_string(&self.name)?;
        writer.write_u8(self.level)?;
        writer.write_u64(self.xp)?;
        writer.write_u64(self.energy)?;
        writer.write_i64(self.last_login)?;
        Ok(())
    }

    fn encoded_len(&self) -> usize {
        discriminator::DISCRIMINATOR_LEN + PUBKEY_LEN * 2 + string_len(&self.name) + 1 + 8 * 3
    }
}
