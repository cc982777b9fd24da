//! Reconciliation Monitor
//!
//! Compares the mirror against every fresh board snapshot. A consistent
//! mirror is "ready" for replayed actions. Any divergent cell marks the
//! whole snapshot out of sync; individual cells are never patched, since
//! actions may already be in flight against them. Recovery is a full
//! rebuild, either immediately or on an explicit trigger.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::accounts::board::BoardAccount;

use super::catalog::TileCatalog;
use super::mirror::BoardMirror;

/// What to do when a snapshot disagrees with the mirror.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuildPolicy {
    /// Reset and rebuild from the snapshot right away.
    #[default]
    Automatic,
    /// Stay out of sync until a rebuild is requested.
    Manual,
}

impl FromStr for RebuildPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "automatic" | "auto" => Ok(Self::Automatic),
            "manual" => Ok(Self::Manual),
            other => Err(format!("unknown rebuild policy: {other}")),
        }
    }
}

impl fmt::Display for RebuildPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Automatic => f.write_str("automatic"),
            Self::Manual => f.write_str("manual"),
        }
    }
}

/// Outcome of processing one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncStatus {
    /// Mirror was uninitialized and has been built.
    Built {
        /// Views placed.
        placed: usize,
    },
    /// Mirror matches the snapshot.
    InSync,
    /// Divergent cells found; waiting for a rebuild.
    OutOfSync {
        /// Divergent coordinates, outer index first.
        cells: Vec<(u8, u8)>,
    },
    /// Divergence found and the mirror rebuilt from the snapshot.
    Rebuilt {
        /// Divergent coordinates before the rebuild.
        cells: Vec<(u8, u8)>,
        /// Views placed by the rebuild.
        placed: usize,
    },
    /// Snapshot older than one already accepted. Compared, never applied.
    Stale {
        /// The stale snapshot's `action_id`.
        action_id: u64,
        /// Cells where it disagrees with the mirror.
        cells: Vec<(u8, u8)>,
    },
}

impl SyncStatus {
    /// Whether the mirror is consistent after this outcome.
    pub fn is_consistent(&self) -> bool {
        !matches!(self, Self::OutOfSync { .. })
    }
}

/// Snapshot-vs-mirror comparator.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationMonitor {
    policy: RebuildPolicy,
    ready: bool,
    out_of_sync: bool,
    last_action_id: Option<u64>,
    latest: Option<Box<BoardAccount>>,
}

impl ReconciliationMonitor {
    /// Create with a rebuild policy.
    pub fn new(policy: RebuildPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Configured policy.
    pub fn policy(&self) -> RebuildPolicy {
        self.policy
    }

    /// Mirror is consistent and may accept replayed actions.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Last snapshot disagreed and no rebuild has happened since.
    pub fn is_out_of_sync(&self) -> bool {
        self.out_of_sync
    }

    /// Most recent snapshot seen.
    pub fn latest_snapshot(&self) -> Option<&BoardAccount> {
        self.latest.as_deref()
    }

    /// Highest `action_id` accepted so far.
    pub fn last_action_id(&self) -> Option<u64> {
        self.last_action_id
    }

    /// Cells where the mirror disagrees with `snapshot`.
    ///
    /// A cell diverges when the snapshot expects a building the mirror
    /// lacks, or the mirror shows a different building type (including one
    /// the snapshot no longer has).
    pub fn find_desync(mirror: &BoardMirror, snapshot: &BoardAccount) -> Vec<(u8, u8)> {
        snapshot
            .tiles()
            .filter(|(x, y, tile)| {
                let shown = mirror.building_type_at(*x as i32, *y as i32);
                match shown {
                    None => tile.is_occupied(),
                    Some(building_type) => building_type != tile.building_type,
                }
            })
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    /// Process a fresh snapshot.
    ///
    /// A snapshot whose `action_id` is below the highest accepted one is
    /// only compared: the mirror, readiness and the rebuild source stay
    /// as they were.
    pub fn on_snapshot(
        &mut self,
        mirror: &mut BoardMirror,
        catalog: &TileCatalog,
        snapshot: &BoardAccount,
    ) -> SyncStatus {
        if let Some(last) = self.last_action_id.filter(|last| snapshot.action_id < *last) {
            let cells = Self::find_desync(mirror, snapshot);
            warn!(
                last,
                action_id = snapshot.action_id,
                divergent = cells.len(),
                "Ignoring stale board snapshot"
            );
            return SyncStatus::Stale {
                action_id: snapshot.action_id,
                cells,
            };
        }
        self.last_action_id = Some(snapshot.action_id);
        self.latest = Some(Box::new(snapshot.clone()));

        if !mirror.is_initialized() {
            let placed = mirror.build_from_snapshot(snapshot, catalog);
            info!(placed, action_id = snapshot.action_id, "Board mirror built");
            self.mark_consistent();
            return SyncStatus::Built { placed };
        }

        let cells = Self::find_desync(mirror, snapshot);
        if cells.is_empty() {
            debug!(action_id = snapshot.action_id, "Board mirror in sync");
            self.mark_consistent();
            return SyncStatus::InSync;
        }

        warn!(
            divergent = cells.len(),
            action_id = snapshot.action_id,
            policy = %self.policy,
            "Board mirror out of sync"
        );
        self.ready = false;
        self.out_of_sync = true;

        match self.policy {
            RebuildPolicy::Automatic => {
                let placed = Self::rebuild_from(mirror, catalog, snapshot);
                self.mark_consistent();
                SyncStatus::Rebuilt { cells, placed }
            }
            RebuildPolicy::Manual => SyncStatus::OutOfSync { cells },
        }
    }

    /// Full rebuild from the latest snapshot. `None` before any snapshot.
    pub fn rebuild(
        &mut self,
        mirror: &mut BoardMirror,
        catalog: &TileCatalog,
    ) -> Option<SyncStatus> {
        let Some(snapshot) = self.latest.as_deref() else {
            warn!("Rebuild requested before any board snapshot");
            return None;
        };

        let cells = Self::find_desync(mirror, snapshot);
        let placed = Self::rebuild_from(mirror, catalog, snapshot);
        self.mark_consistent();
        Some(SyncStatus::Rebuilt { cells, placed })
    }

    fn rebuild_from(
        mirror: &mut BoardMirror,
        catalog: &TileCatalog,
        snapshot: &BoardAccount,
    ) -> usize {
        mirror.reset();
        let placed = mirror.build_from_snapshot(snapshot, catalog);
        info!(placed, action_id = snapshot.action_id, "Board mirror rebuilt");
        placed
    }

    fn mark_consistent(&mut self) {
        self.ready = true;
        self.out_of_sync = false;
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::tile::{
        Tile, BUILDING_TYPE_EMPTY, BUILDING_TYPE_SAWMILL, BUILDING_TYPE_STONE_MINE,
    };

    fn built(
        snapshot: &BoardAccount,
        policy: RebuildPolicy,
    ) -> (ReconciliationMonitor, BoardMirror) {
        let mut monitor = ReconciliationMonitor::new(policy);
        let mut mirror = BoardMirror::new();
        let status = monitor.on_snapshot(&mut mirror, &TileCatalog::default(), snapshot);
        assert!(matches!(status, SyncStatus::Built { .. }));
        (monitor, mirror)
    }

    #[test]
    fn test_first_snapshot_builds_mirror() {
        let mut snapshot = BoardAccount::default();
        snapshot.board[1][2] = Tile::with_type(BUILDING_TYPE_EMPTY);

        let mut monitor = ReconciliationMonitor::default();
        let mut mirror = BoardMirror::new();
        assert!(!monitor.is_ready());
        assert_eq!(
            monitor.on_snapshot(&mut mirror, &TileCatalog::default(), &snapshot),
            SyncStatus::Built { placed: 1 }
        );
        assert!(monitor.is_ready());
        assert_eq!(mirror.building_type_at(1, 2), Some(BUILDING_TYPE_EMPTY));
    }

    #[test]
    fn test_identical_snapshot_is_in_sync() {
        let mut snapshot = BoardAccount::default();
        snapshot.board[5][5] = Tile::with_type(BUILDING_TYPE_SAWMILL);
        let (mut monitor, mut mirror) = built(&snapshot, RebuildPolicy::Manual);

        let status = monitor.on_snapshot(&mut mirror, &TileCatalog::default(), &snapshot);
        assert_eq!(status, SyncStatus::InSync);
        assert!(monitor.is_ready());
    }

    #[test]
    fn test_missing_tile_flags_only_that_cell() {
        let empty = BoardAccount::default();
        let (mut monitor, mut mirror) = built(&empty, RebuildPolicy::Manual);
        let before: Vec<_> = mirror.cells().cloned().collect();

        let mut snapshot = BoardAccount::default();
        snapshot.board[3][4] = Tile::with_type(BUILDING_TYPE_SAWMILL);

        let status = monitor.on_snapshot(&mut mirror, &TileCatalog::default(), &snapshot);
        assert_eq!(status, SyncStatus::OutOfSync { cells: vec![(3, 4)] });
        assert!(monitor.is_out_of_sync());
        assert!(!monitor.is_ready());

        let after: Vec<_> = mirror.cells().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_type_mismatch_and_stale_view_are_desync() {
        let mut snapshot = BoardAccount::default();
        snapshot.board[0][0] = Tile::with_type(BUILDING_TYPE_SAWMILL);
        snapshot.board[9][9] = Tile::with_type(BUILDING_TYPE_EMPTY);
        let (_, mirror) = built(&snapshot, RebuildPolicy::Manual);

        let mut next = BoardAccount::default();
        next.board[0][0] = Tile::with_type(BUILDING_TYPE_STONE_MINE);
        assert_eq!(ReconciliationMonitor::find_desync(&mirror, &next), vec![(0, 0), (9, 9)]);
    }

    #[test]
    fn test_manual_rebuild() {
        let (mut monitor, mut mirror) = built(&BoardAccount::default(), RebuildPolicy::Manual);

        let mut snapshot = BoardAccount::default();
        snapshot.board[3][4] = Tile::with_type(BUILDING_TYPE_SAWMILL);
        monitor.on_snapshot(&mut mirror, &TileCatalog::default(), &snapshot);

        let status = monitor.rebuild(&mut mirror, &TileCatalog::default()).unwrap();
        assert_eq!(status, SyncStatus::Rebuilt { cells: vec![(3, 4)], placed: 1 });
        assert!(monitor.is_ready());
        assert!(ReconciliationMonitor::find_desync(&mirror, &snapshot).is_empty());
    }

    #[test]
    fn test_automatic_rebuild() {
        let (mut monitor, mut mirror) = built(&BoardAccount::default(), RebuildPolicy::Automatic);

        let mut snapshot = BoardAccount::default();
        snapshot.board[3][4] = Tile::with_type(BUILDING_TYPE_SAWMILL);
        let status = monitor.on_snapshot(&mut mirror, &TileCatalog::default(), &snapshot);

        assert_eq!(status, SyncStatus::Rebuilt { cells: vec![(3, 4)], placed: 1 });
        assert!(monitor.is_ready());
        assert!(!monitor.is_out_of_sync());
        assert_eq!(mirror.building_type_at(3, 4), Some(BUILDING_TYPE_SAWMILL));
    }

    #[test]
    fn test_rebuild_without_snapshot() {
        let mut monitor = ReconciliationMonitor::default();
        assert!(monitor.rebuild(&mut BoardMirror::new(), &TileCatalog::default()).is_none());
    }

    #[test]
    fn test_action_id_regression_is_tolerated() {
        let snapshot = BoardAccount { action_id: 9, ..BoardAccount::default() };
        let (mut monitor, mut mirror) = built(&snapshot, RebuildPolicy::Manual);

        let stale = BoardAccount { action_id: 4, ..BoardAccount::default() };
        assert_eq!(
            monitor.on_snapshot(&mut mirror, &TileCatalog::default(), &stale),
            SyncStatus::Stale { action_id: 4, cells: vec![] }
        );
        assert_eq!(monitor.last_action_id(), Some(9));
        assert!(monitor.is_ready());
    }

    #[test]
    fn test_stale_snapshot_never_rebuilds_mirror() {
        let mut newer = BoardAccount { action_id: 2, ..BoardAccount::default() };
        newer.board[1][1] = Tile::with_type(BUILDING_TYPE_SAWMILL);
        let (mut monitor, mut mirror) = built(&newer, RebuildPolicy::Automatic);

        let mut older = BoardAccount { action_id: 1, ..BoardAccount::default() };
        older.board[1][1] = Tile::with_type(BUILDING_TYPE_EMPTY);
        let status = monitor.on_snapshot(&mut mirror, &TileCatalog::default(), &older);

        assert_eq!(status, SyncStatus::Stale { action_id: 1, cells: vec![(1, 1)] });
        assert_eq!(mirror.building_type_at(1, 1), Some(BUILDING_TYPE_SAWMILL));
        assert!(monitor.is_ready());
        assert!(!monitor.is_out_of_sync());
        assert_eq!(monitor.latest_snapshot().map(|s| s.action_id), Some(2));

        // A later rebuild still uses the newest snapshot.
        monitor.rebuild(&mut mirror, &TileCatalog::default()).unwrap();
        assert_eq!(mirror.building_type_at(1, 1), Some(BUILDING_TYPE_SAWMILL));
    }

    #[test]
    fn test_equal_action_id_is_not_stale() {
        let snapshot = BoardAccount { action_id: 5, ..BoardAccount::default() };
        let (mut monitor, mut mirror) = built(&snapshot, RebuildPolicy::Manual);
        assert_eq!(
            monitor.on_snapshot(&mut mirror, &TileCatalog::default(), &snapshot),
            SyncStatus::InSync
        );
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("Manual".parse::<RebuildPolicy>(), Ok(RebuildPolicy::Manual));
        assert_eq!("auto".parse::<RebuildPolicy>(), Ok(RebuildPolicy::Automatic));
        assert!("sometimes".parse::<RebuildPolicy>().is_err());
    }
}
