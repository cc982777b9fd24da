//! Action Replay Engine
//!
//! Applies committed actions to the mirror exactly once per `action_id`.
//!
//! ## Phases
//!
//! ```text
//! first log ──► Priming ──► Steady
//!               record ids   apply unseen ids in log order
//!               no effects
//! ```
//!
//! While the reconciliation monitor is not ready, unseen actions are held
//! in a pending buffer and applied once the mirror is consistent again.
//! An id enters the applied set only after its transition is done.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::accounts::board::{BOARD_HEIGHT, BOARD_WIDTH};
use crate::accounts::history::{ActionType, GameAction};
use crate::accounts::tile::{Reward, Tile};
use crate::codec::Pubkey;
use crate::collaborators::{AvatarIdentity, AvatarLookup};

use super::catalog::{TileCatalog, TileConfig};
use super::mirror::{BoardMirror, CellChange};

/// Default lifetime of a reward notice.
pub const DEFAULT_REWARD_NOTICE: Duration = Duration::from_millis(1500);

/// Engine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReplayPhase {
    /// No log seen yet; the first one is recorded silently.
    Priming,
    /// Unseen actions are applied.
    Steady,
}

/// Re-initialize the visual at a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileTransition {
    /// Source action.
    pub action_id: u64,
    /// Action kind.
    pub action_type: ActionType,
    /// Column.
    pub x: u8,
    /// Row.
    pub y: u8,
    /// Catalog entry to present.
    pub config: TileConfig,
    /// Post-action tile.
    pub tile: Tile,
    /// What happened to the cell.
    pub change: CellChange,
}

/// Timed reward popup for a collect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewardNotice {
    /// Source action.
    pub action_id: u64,
    /// Column.
    pub x: u8,
    /// Row.
    pub y: u8,
    /// Granted reward.
    pub reward: Reward,
    /// Catalog entry of the collected building.
    pub config: TileConfig,
    /// Collector's avatar, or a placeholder.
    pub identity: AvatarIdentity,
    /// How long to show it.
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

/// Side effect requested by an applied action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum ReplayEffect {
    /// Cell visual changed.
    TileTransition(TileTransition),
    /// Reward popup.
    RewardNotice(RewardNotice),
}

mod duration_ms {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}

/// Counters for one delivered log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    /// Ids recorded silently while priming.
    pub primed: usize,
    /// Actions applied to the mirror.
    pub applied: usize,
    /// Ids already applied (or already rejected).
    pub duplicates: usize,
    /// Sentinel slots skipped.
    pub sentinels: usize,
    /// Protocol violations skipped.
    pub rejected: usize,
    /// Actions held until the mirror is consistent.
    pub deferred: usize,
}

/// Replays the action log onto the mirror.
pub struct ActionReplayEngine<L> {
    lookup: L,
    phase: ReplayPhase,
    applied: BTreeSet<u64>,
    rejected: BTreeSet<u64>,
    pending: BTreeMap<u64, GameAction>,
    reward_notice: Duration,
}

impl<L: AvatarLookup> ActionReplayEngine<L> {
    /// Create in the priming phase.
    pub fn new(lookup: L) -> Self {
        Self {
            lookup,
            phase: ReplayPhase::Priming,
            applied: BTreeSet::new(),
            rejected: BTreeSet::new(),
            pending: BTreeMap::new(),
            reward_notice: DEFAULT_REWARD_NOTICE,
        }
    }

    /// Set how long reward notices last.
    pub fn with_reward_notice(mut self, duration: Duration) -> Self {
        self.reward_notice = duration;
        self
    }

    /// Current phase.
    pub fn phase(&self) -> ReplayPhase {
        self.phase
    }

    /// Whether `action_id` has been applied (or primed).
    pub fn is_applied(&self, action_id: u64) -> bool {
        self.applied.contains(&action_id)
    }

    /// Applied ids, ascending.
    pub fn applied_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.applied.iter().copied()
    }

    /// Actions waiting for the mirror to become consistent.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Process a delivered log. `ready` is the monitor's readiness.
    pub async fn on_action_log(
        &mut self,
        actions: &[GameAction],
        mirror: &mut BoardMirror,
        catalog: &TileCatalog,
        ready: bool,
    ) -> (ReplayReport, Vec<ReplayEffect>) {
        let mut report = ReplayReport::default();

        if self.phase == ReplayPhase::Priming {
            for action in actions {
                if action.is_sentinel() {
                    report.sentinels += 1;
                } else if self.applied.insert(action.action_id) {
                    report.primed += 1;
                }
            }
            self.phase = ReplayPhase::Steady;
            info!(primed = report.primed, "Action history primed");
            return (report, Vec::new());
        }

        let mut batch = Vec::new();
        let mut batched = BTreeSet::new();
        for action in actions {
            if action.is_sentinel() {
                report.sentinels += 1;
                continue;
            }
            let id = action.action_id;
            if self.applied.contains(&id) || self.rejected.contains(&id) {
                report.duplicates += 1;
                continue;
            }
            if ready {
                // Deferred copies are applied from `pending` below.
                if !self.pending.contains_key(&id) && batched.insert(id) {
                    batch.push(*action);
                }
            } else if self.pending.insert(id, *action).is_none() {
                report.deferred += 1;
            }
        }

        if !ready {
            if report.deferred > 0 {
                debug!(deferred = report.deferred, "Board not ready, actions deferred");
            }
            return (report, Vec::new());
        }

        // Older deferred actions go first.
        let mut ordered: Vec<GameAction> =
            std::mem::take(&mut self.pending).into_values().collect();
        ordered.extend(batch);

        let effects = self.apply_batch(&ordered, mirror, catalog, &mut report).await;
        (report, effects)
    }

    /// Apply deferred actions after the mirror became consistent.
    pub async fn drain_pending(
        &mut self,
        mirror: &mut BoardMirror,
        catalog: &TileCatalog,
    ) -> (ReplayReport, Vec<ReplayEffect>) {
        let mut report = ReplayReport::default();
        if self.pending.is_empty() {
            return (report, Vec::new());
        }

        let ordered: Vec<GameAction> = std::mem::take(&mut self.pending).into_values().collect();
        let effects = self.apply_batch(&ordered, mirror, catalog, &mut report).await;
        (report, effects)
    }

    async fn apply_batch(
        &mut self,
        actions: &[GameAction],
        mirror: &mut BoardMirror,
        catalog: &TileCatalog,
        report: &mut ReplayReport,
    ) -> Vec<ReplayEffect> {
        let mut valid = Vec::with_capacity(actions.len());
        for action in actions {
            if let Some(reason) = violation(action) {
                warn!(
                    action_id = action.action_id,
                    x = action.x,
                    y = action.y,
                    reason,
                    "Skipping invalid action"
                );
                self.rejected.insert(action.action_id);
                report.rejected += 1;
            } else {
                valid.push(*action);
            }
        }

        // Lookups run concurrently; results are consumed in log order.
        let lookups = valid
            .iter()
            .filter(|action| action.action_type == ActionType::Collect)
            .map(|action| self.resolve_identity(action.avatar));
        let mut identities = join_all(lookups).await.into_iter();

        let mut effects = Vec::new();
        for action in valid {
            let config = catalog.for_tile(&action.tile);

            if action.action_type == ActionType::Collect {
                let identity = identities
                    .next()
                    .unwrap_or_else(|| AvatarIdentity::placeholder(action.avatar));
                effects.push(ReplayEffect::RewardNotice(RewardNotice {
                    action_id: action.action_id,
                    x: action.x,
                    y: action.y,
                    reward: action.tile.collect_reward(),
                    config: config.clone(),
                    identity,
                    duration: self.reward_notice,
                }));
            }

            match mirror.apply_tile(action.x as i32, action.y as i32, config, action.tile) {
                Ok(change) => effects.push(ReplayEffect::TileTransition(TileTransition {
                    action_id: action.action_id,
                    action_type: action.action_type,
                    x: action.x,
                    y: action.y,
                    config: config.clone(),
                    tile: action.tile,
                    change,
                })),
                Err(err) => warn!(action_id = action.action_id, %err, "Tile transition failed"),
            }

            self.applied.insert(action.action_id);
            report.applied += 1;
            debug!(
                action_id = action.action_id,
                kind = ?action.action_type,
                x = action.x,
                y = action.y,
                "Action applied"
            );
        }

        effects
    }

    async fn resolve_identity(&self, avatar: Pubkey) -> AvatarIdentity {
        match self.lookup.lookup(avatar).await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                debug!(avatar = %avatar.short(), "Avatar not found, using placeholder");
                AvatarIdentity::placeholder(avatar)
            }
            Err(err) => {
                warn!(avatar = %avatar.short(), %err, "Avatar lookup failed, using placeholder");
                AvatarIdentity::placeholder(avatar)
            }
        }
    }
}

fn violation(action: &GameAction) -> Option<&'static str> {
    if action.x as usize >= BOARD_WIDTH || action.y as usize >= BOARD_HEIGHT {
        Some("target off the board")
    } else if !action.action_type.is_known() {
        Some("unknown action type")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::tile::{BUILDING_TYPE_EMPTY, BUILDING_TYPE_SAWMILL};
    use crate::session::memory::StaticAvatarLookup;

    fn action(
        action_id: u64,
        action_type: ActionType,
        x: u8,
        y: u8,
        building_type: u8,
    ) -> GameAction {
        GameAction {
            action_id,
            action_type,
            x,
            y,
            tile: Tile::with_type(building_type),
            player: Pubkey::new([1; 32]),
            avatar: Pubkey::new([2; 32]),
        }
    }

    async fn primed() -> (ActionReplayEngine<StaticAvatarLookup>, BoardMirror) {
        let mut engine = ActionReplayEngine::new(StaticAvatarLookup::default());
        let mut mirror = BoardMirror::new();
        engine.on_action_log(&[], &mut mirror, &TileCatalog::default(), true).await;
        (engine, mirror)
    }

    #[tokio::test]
    async fn test_priming_is_silent() {
        let mut engine = ActionReplayEngine::new(StaticAvatarLookup::default());
        let mut mirror = BoardMirror::new();
        let log = [action(7, ActionType::Chop, 1, 1, BUILDING_TYPE_EMPTY)];

        let (report, effects) = engine
            .on_action_log(&log, &mut mirror, &TileCatalog::default(), true)
            .await;
        assert_eq!(report.primed, 1);
        assert!(effects.is_empty());
        assert_eq!(mirror.occupied_count(), 0);
        assert!(engine.is_applied(7));
        assert_eq!(engine.phase(), ReplayPhase::Steady);
    }

    #[tokio::test]
    async fn test_priming_skips_sentinel_slots() {
        let mut engine = ActionReplayEngine::new(StaticAvatarLookup::default());
        let mut mirror = BoardMirror::new();
        let catalog = TileCatalog::default();
        let log = [
            action(0, ActionType::Build, 3, 3, BUILDING_TYPE_SAWMILL),
            action(5, ActionType::Chop, 1, 1, BUILDING_TYPE_EMPTY),
            action(0, ActionType::Chop, 2, 2, BUILDING_TYPE_EMPTY),
        ];

        let (report, effects) = engine.on_action_log(&log, &mut mirror, &catalog, true).await;
        assert_eq!(report.primed, 1);
        assert_eq!(report.sentinels, 2);
        assert!(effects.is_empty());
        assert!(!engine.is_applied(0));
        assert_eq!(engine.applied_ids().collect::<Vec<_>>(), vec![5]);

        // Still skipped once steady.
        let (report, effects) = engine.on_action_log(&log, &mut mirror, &catalog, true).await;
        assert_eq!(report.sentinels, 2);
        assert_eq!(report.duplicates, 1);
        assert!(effects.is_empty());
        assert!(!engine.is_applied(0));
    }

    #[tokio::test]
    async fn test_sentinel_never_applied() {
        let (mut engine, mut mirror) = primed().await;
        let log = [action(0, ActionType::Build, 4, 4, BUILDING_TYPE_SAWMILL)];

        let (report, effects) = engine
            .on_action_log(&log, &mut mirror, &TileCatalog::default(), true)
            .await;
        assert_eq!(report.sentinels, 1);
        assert!(effects.is_empty());
        assert!(!engine.is_applied(0));
        assert!(!mirror.get_cell(4, 4).unwrap().is_occupied());
    }

    #[tokio::test]
    async fn test_replaying_same_log_is_idempotent() {
        let (mut engine, mut mirror) = primed().await;
        let catalog = TileCatalog::default();
        let log = [
            action(1, ActionType::Chop, 2, 3, BUILDING_TYPE_EMPTY),
            action(2, ActionType::Build, 2, 3, BUILDING_TYPE_SAWMILL),
            action(3, ActionType::Collect, 2, 3, BUILDING_TYPE_SAWMILL),
        ];

        let (first, effects) = engine.on_action_log(&log, &mut mirror, &catalog, true).await;
        assert_eq!(first.applied, 3);
        let rewards = effects
            .iter()
            .filter(|e| matches!(e, ReplayEffect::RewardNotice(_)))
            .count();
        assert_eq!(rewards, 1);
        let snapshot: Vec<_> = mirror.cells().cloned().collect();

        let (second, effects) = engine.on_action_log(&log, &mut mirror, &catalog, true).await;
        assert_eq!(second.applied, 0);
        assert_eq!(second.duplicates, 3);
        assert!(effects.is_empty());
        assert_eq!(mirror.cells().cloned().collect::<Vec<_>>(), snapshot);
    }

    #[tokio::test]
    async fn test_applies_in_log_order() {
        let (mut engine, mut mirror) = primed().await;
        let log = [
            action(10, ActionType::Build, 5, 5, BUILDING_TYPE_SAWMILL),
            action(11, ActionType::Upgrade, 5, 5, BUILDING_TYPE_SAWMILL),
        ];

        let (_, effects) = engine
            .on_action_log(&log, &mut mirror, &TileCatalog::default(), true)
            .await;
        let changes: Vec<CellChange> = effects
            .iter()
            .filter_map(|e| match e {
                ReplayEffect::TileTransition(transition) => Some(transition.change),
                _ => None,
            })
            .collect();
        assert_eq!(changes, vec![CellChange::Placed, CellChange::Reinitialized]);
    }

    #[tokio::test]
    async fn test_invalid_actions_skipped_without_aborting_batch() {
        let (mut engine, mut mirror) = primed().await;
        let log = [
            action(20, ActionType::Build, 10, 0, BUILDING_TYPE_SAWMILL),
            action(21, ActionType::Unknown(9), 1, 1, BUILDING_TYPE_SAWMILL),
            action(22, ActionType::Build, 1, 1, BUILDING_TYPE_SAWMILL),
        ];

        let (report, _) = engine
            .on_action_log(&log, &mut mirror, &TileCatalog::default(), true)
            .await;
        assert_eq!(report.rejected, 2);
        assert_eq!(report.applied, 1);
        assert!(!engine.is_applied(20));
        assert!(engine.is_applied(22));

        let (again, _) = engine
            .on_action_log(&log, &mut mirror, &TileCatalog::default(), true)
            .await;
        assert_eq!(again.rejected, 0);
        assert_eq!(again.duplicates, 3);
    }

    #[tokio::test]
    async fn test_deferred_until_ready() {
        let (mut engine, mut mirror) = primed().await;
        let catalog = TileCatalog::default();
        let log = [action(30, ActionType::Build, 0, 0, BUILDING_TYPE_SAWMILL)];

        let (report, effects) = engine.on_action_log(&log, &mut mirror, &catalog, false).await;
        assert_eq!(report.deferred, 1);
        assert!(effects.is_empty());
        assert!(!engine.is_applied(30));

        // Redelivery while still not ready does not duplicate.
        engine.on_action_log(&log, &mut mirror, &catalog, false).await;
        assert_eq!(engine.pending_len(), 1);

        let (report, effects) = engine.drain_pending(&mut mirror, &catalog).await;
        assert_eq!(report.applied, 1);
        assert_eq!(effects.len(), 1);
        assert!(engine.is_applied(30));
        assert_eq!(engine.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_collect_uses_found_identity() {
        let avatar = Pubkey::new([2; 32]);
        let identity = AvatarIdentity {
            mint: avatar,
            name: "Axe Master".to_string(),
            image_uri: Some("https://example.invalid/axe.png".to_string()),
            placeholder: false,
        };
        let lookup = StaticAvatarLookup::default().with_identity(identity.clone());
        let mut engine =
            ActionReplayEngine::new(lookup).with_reward_notice(Duration::from_millis(250));
        let mut mirror = BoardMirror::new();
        let catalog = TileCatalog::default();
        engine.on_action_log(&[], &mut mirror, &catalog, true).await;

        let log = [action(40, ActionType::Collect, 6, 6, BUILDING_TYPE_SAWMILL)];
        let (_, effects) = engine.on_action_log(&log, &mut mirror, &catalog, true).await;
        match &effects[0] {
            ReplayEffect::RewardNotice(notice) => {
                assert_eq!(notice.identity, identity);
                assert_eq!(notice.duration, Duration::from_millis(250));
                assert_eq!(notice.reward.amount, 5);
            }
            other => panic!("expected reward notice, got {other:?}"),
        }
        assert!(matches!(&effects[1], ReplayEffect::TileTransition(t) if (t.x, t.y) == (6, 6)));
    }

    #[tokio::test]
    async fn test_failed_lookup_falls_back() {
        let mut engine = ActionReplayEngine::new(StaticAvatarLookup::failing());
        let mut mirror = BoardMirror::new();
        let catalog = TileCatalog::default();
        engine.on_action_log(&[], &mut mirror, &catalog, true).await;

        let log = [
            action(50, ActionType::Collect, 1, 1, BUILDING_TYPE_SAWMILL),
            action(51, ActionType::Collect, 2, 2, BUILDING_TYPE_SAWMILL),
        ];
        let (report, effects) = engine.on_action_log(&log, &mut mirror, &catalog, true).await;
        assert_eq!(report.applied, 2);
        let placeholders = effects
            .iter()
            .filter(|e| {
                matches!(e, ReplayEffect::RewardNotice(notice) if notice.identity.placeholder)
            })
            .count();
        assert_eq!(placeholders, 2);
    }
}
