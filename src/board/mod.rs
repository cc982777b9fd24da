//! Board State
//!
//! The local mirror of the shared board and the two components that keep
//! it honest: the reconciliation monitor (snapshots) and the replay engine
//! (action log).

pub mod catalog;
pub mod mirror;
pub mod reconcile;
pub mod replay;

// Re-export board types
pub use catalog::{CatalogError, TileCatalog, TileConfig};
pub use mirror::{BoardMirror, Cell, CellChange, MirrorError, TileView};
pub use reconcile::{RebuildPolicy, ReconciliationMonitor, SyncStatus};
pub use replay::{
    ActionReplayEngine, ReplayEffect, ReplayPhase, ReplayReport, RewardNotice, TileTransition,
};
