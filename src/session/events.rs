//! Session Messages
//!
//! Commands flow into the session over one mpsc channel; events flow out
//! over a broadcast channel to every registered subscriber.

use std::sync::Arc;

use crate::accounts::{BoardAccount, PlayerData};
use crate::board::replay::{ReplayEffect, RewardNotice, TileTransition};
use crate::codec::Pubkey;

// =============================================================================
// INBOUND
// =============================================================================

/// Work for the session task, processed one at a time in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Fresh account payload (base64), routed by discriminator.
    AccountUpdate {
        /// Account it came from, for logs.
        address: Pubkey,
        /// Base64 account data.
        payload: String,
    },
    /// Reset and rebuild the mirror from the latest snapshot.
    Rebuild,
    /// Stop the session task.
    Shutdown,
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// Notifications for collaborators (UI, renderer, logs).
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// New player snapshot decoded.
    PlayerDataChanged(PlayerData),
    /// New board snapshot decoded.
    BoardChanged(Arc<BoardAccount>),
    /// Snapshot disagrees with the mirror; actions are held.
    OutOfSync {
        /// Divergent coordinates.
        cells: Vec<(u8, u8)>,
    },
    /// Mirror rebuilt from the latest snapshot.
    Rebuilt {
        /// Coordinates that had diverged.
        cells: Vec<(u8, u8)>,
        /// Views placed.
        placed: usize,
    },
    /// Mirror consistent; actions are applied again.
    Ready,
    /// Re-initialize a cell's visual.
    TileTransition(TileTransition),
    /// Show a reward popup.
    RewardNotice(RewardNotice),
}

impl From<ReplayEffect> for SessionEvent {
    fn from(effect: ReplayEffect) -> Self {
        match effect {
            ReplayEffect::TileTransition(transition) => Self::TileTransition(transition),
            ReplayEffect::RewardNotice(notice) => Self::RewardNotice(notice),
        }
    }
}

impl SessionEvent {
    /// Short name, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PlayerDataChanged(_) => "player_data_changed",
            Self::BoardChanged(_) => "board_changed",
            Self::OutOfSync { .. } => "out_of_sync",
            Self::Rebuilt { .. } => "rebuilt",
            Self::Ready => "ready",
            Self::TileTransition(_) => "tile_transition",
            Self::RewardNotice(_) => "reward_notice",
        }
    }
}
