//! Account Records
//!
//! Typed views of the program's accounts, decoded from and encoded to the
//! exact on-chain byte layout.
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────┬──────────────────────────────────────────────┐
//! │ 8-byte tag   │ fields in declaration order, little-endian   │
//! └──────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! A tag mismatch is not an error: it means "not this record type", so
//! callers can try several decoders in turn. Truncated input is an
//! error ([`BufferTooShort`](crate::codec::CodecError::BufferTooShort)) and the record is dropped.
//! Trailing bytes past the last field are ignored (accounts are allocated
//! with spare space).

pub mod tile;
pub mod player;
pub mod board;
pub mod history;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, warn};

use crate::codec::{discriminator, ByteReader, ByteWriter, CodecResult, Discriminator};

// Re-export record types
pub use tile::{Resource, Reward, Tile, TILE_LEN};
pub use player::PlayerData;
pub use board::{BoardAccount, BOARD_HEIGHT, BOARD_WIDTH};
pub use history::{ActionType, GameAction, GameActionHistory, HISTORY_CAPACITY};

/// A record type with its own discriminator.
pub trait AccountRecord: Sized {
    /// Type name, for logs.
    const NAME: &'static str;

    /// Leading 8-byte tag.
    const DISCRIMINATOR: Discriminator;

    /// Decode the fields following the tag.
    fn read_fields(reader: &mut ByteReader<'_>) -> CodecResult<Self>;

    /// Encode the fields following the tag.
    fn write_fields(&self, writer: &mut ByteWriter) -> CodecResult<()>;

    /// Total encoded size including the tag.
    fn encoded_len(&self) -> usize;

    /// Decode, distinguishing "not this record" (`Ok(None)`) from
    /// malformed input (`Err`).
    fn try_decode(data: &[u8]) -> CodecResult<Option<Self>> {
        let mut reader = ByteReader::new(data);
        if reader.read_array::<{ discriminator::DISCRIMINATOR_LEN }>()? != Self::DISCRIMINATOR {
            return Ok(None);
        }
        Self::read_fields(&mut reader).map(Some)
    }

    /// Decode, logging and dropping malformed input.
    fn decode(data: &[u8]) -> Option<Self> {
        match Self::try_decode(data) {
            Ok(record) => record,
            Err(err) => {
                warn!(record = Self::NAME, %err, "Dropping malformed account data");
                None
            }
        }
    }

    /// Encode tag and fields. Deterministic: same record, same bytes.
    fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut writer = ByteWriter::with_capacity(self.encoded_len());
        writer.write_bytes(&Self::DISCRIMINATOR)?;
        self.write_fields(&mut writer)?;
        Ok(writer.finish())
    }
}

/// Any account this client understands.
#[derive(Debug, Clone, PartialEq)]
pub enum AccountData {
    /// Player record.
    Player(PlayerData),
    /// Shared board.
    Board(Box<BoardAccount>),
    /// Recent action ring buffer.
    History(Box<GameActionHistory>),
}

impl AccountData {
    /// Route raw bytes by discriminator.
    ///
    /// Returns `None` for unknown tags and for malformed records.
    pub fn decode(data: &[u8]) -> Option<Self> {
        let tag = match discriminator::read(data) {
            Ok(tag) => tag,
            Err(err) => {
                warn!(%err, "Account data shorter than a discriminator");
                return None;
            }
        };

        match tag {
            discriminator::PLAYER_DATA => PlayerData::decode(data).map(Self::Player),
            discriminator::BOARD_ACCOUNT => {
                BoardAccount::decode(data).map(|b| Self::Board(Box::new(b)))
            }
            discriminator::GAME_ACTION_HISTORY => {
                GameActionHistory::decode(data).map(|h| Self::History(Box::new(h)))
            }
            other => {
                debug!(tag = %hex::encode(other), "Unknown account discriminator");
                None
            }
        }
    }

    /// Record name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Player(_) => PlayerData::NAME,
            Self::Board(_) => BoardAccount::NAME,
            Self::History(_) => GameActionHistory::NAME,
        }
    }
}

/// Decode a base64 account envelope to raw bytes.
pub fn decode_base64(payload: &str) -> CodecResult<Vec<u8>> {
    Ok(STANDARD.decode(payload.trim())?)
}

/// Encode raw account bytes as a base64 envelope.
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode a base64 envelope and route it by discriminator.
pub fn decode_account_data(payload: &str) -> Option<AccountData> {
    match decode_base64(payload) {
        Ok(bytes) => AccountData::decode(&bytes),
        Err(err) => {
            warn!(%err, "Dropping undecodable account envelope");
            None
        }
    }
}
