//! # Lumberjack Client
//!
//! Client-side boundary layer for the Lumberjack on-chain game: decodes the
//! program's fixed-layout accounts, encodes its instructions, and keeps a
//! local board mirror reconciled with snapshots and the action history.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    LUMBERJACK CLIENT                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  codec/          - Byte-level encoding                       │
//! │  ├── primitive.rs- LE integers, strings, cursors             │
//! │  ├── pubkey.rs   - 32-byte public keys                       │
//! │  └── discriminator.rs - 8-byte schema tags                   │
//! │                                                              │
//! │  accounts/       - Account records                           │
//! │  ├── tile.rs     - Per-cell building state                   │
//! │  ├── player.rs   - PlayerData                                │
//! │  ├── board.rs    - 10×10 BoardAccount                        │
//! │  └── history.rs  - GameActionHistory ring buffer             │
//! │                                                              │
//! │  program/        - Outbound instructions                     │
//! │                                                              │
//! │  board/          - Local state (single owner)                │
//! │  ├── catalog.rs  - Tile configs with fallback                │
//! │  ├── mirror.rs   - Board mirror                              │
//! │  ├── reconcile.rs- Snapshot desync detection                 │
//! │  └── replay.rs   - Exactly-once action replay                │
//! │                                                              │
//! │  session/        - Async pipeline (tokio)                    │
//! │  ├── pipeline.rs - Command-draining session task             │
//! │  ├── events.rs   - Commands in, events out                   │
//! │  ├── client.rs   - Collaborator wiring, instructions         │
//! │  └── memory.rs   - In-process collaborators                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Policy
//!
//! Nothing here is fatal. Malformed accounts are dropped, off-board
//! actions are skipped, failed avatar lookups fall back to a placeholder,
//! and desync leads to a full rebuild. An action id is marked applied only
//! after its transition completes, so redelivery never double-applies.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod codec;
pub mod accounts;
pub mod program;
pub mod board;
pub mod collaborators;
pub mod config;
pub mod session;

// Re-export commonly used types
pub use codec::{CodecError, Pubkey};
pub use accounts::{
    decode_account_data, AccountData, AccountRecord, BoardAccount, GameAction, GameActionHistory,
    PlayerData, Tile,
};
pub use program::{Instruction, LumberjackInstruction, PROGRAM_ID};
pub use board::{ActionReplayEngine, BoardMirror, RebuildPolicy, ReconciliationMonitor, TileCatalog};
pub use config::ClientConfig;
pub use session::{GameSession, LumberjackClient, SessionCommand, SessionEvent};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
