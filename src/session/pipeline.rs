//! Game Session
//!
//! Single owner of the board mirror, the reconciliation monitor and the
//! replay engine. Commands are drained from one channel by one task, each
//! handled to completion before the next, so no state is shared.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::accounts::{
    decode_account_data, AccountData, BoardAccount, GameActionHistory, PlayerData,
};
use crate::board::catalog::TileCatalog;
use crate::board::mirror::BoardMirror;
use crate::board::reconcile::{ReconciliationMonitor, SyncStatus};
use crate::board::replay::{ActionReplayEngine, ReplayEffect, ReplayReport};
use crate::collaborators::AvatarLookup;
use crate::config::ClientConfig;

use super::client::ClientError;
use super::events::{SessionCommand, SessionEvent};

/// Reconciliation and replay state for one connected client.
pub struct GameSession<L> {
    id: Uuid,
    mirror: BoardMirror,
    monitor: ReconciliationMonitor,
    engine: ActionReplayEngine<L>,
    catalog: TileCatalog,
    player: Option<PlayerData>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl<L: AvatarLookup> GameSession<L> {
    /// Create a session from configuration.
    pub fn new(config: &ClientConfig, catalog: TileCatalog, lookup: L) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));

        Self {
            id: Uuid::new_v4(),
            mirror: BoardMirror::new(),
            monitor: ReconciliationMonitor::new(config.rebuild_policy),
            engine: ActionReplayEngine::new(lookup).with_reward_notice(config.reward_notice()),
            catalog,
            player: None,
            event_tx,
        }
    }

    /// Session identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Register an event subscriber.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Local board.
    pub fn mirror(&self) -> &BoardMirror {
        &self.mirror
    }

    /// Snapshot comparator.
    pub fn monitor(&self) -> &ReconciliationMonitor {
        &self.monitor
    }

    /// Action replay state.
    pub fn engine(&self) -> &ActionReplayEngine<L> {
        &self.engine
    }

    /// Latest player snapshot.
    pub fn player(&self) -> Option<&PlayerData> {
        self.player.as_ref()
    }

    /// Handle one command. Returns `false` on shutdown.
    pub async fn handle(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::AccountUpdate { address, payload } => {
                match decode_account_data(&payload) {
                    Some(AccountData::Player(player)) => self.on_player(player),
                    Some(AccountData::Board(board)) => self.on_board(*board).await,
                    Some(AccountData::History(history)) => self.on_history(&history).await,
                    None => {
                        debug!(account = %address.short(), "Ignoring undecodable account update")
                    }
                }
                true
            }
            SessionCommand::Rebuild => {
                self.rebuild().await;
                true
            }
            SessionCommand::Shutdown => false,
        }
    }

    /// Drain commands until shutdown or until every sender is gone.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        info!(session = %self.id, "Game session started");
        while let Some(command) = commands.recv().await {
            if !self.handle(command).await {
                break;
            }
        }
        info!(session = %self.id, "Game session stopped");
    }

    /// Run on its own task.
    pub fn spawn(self, command_capacity: usize) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::channel(command_capacity.max(1));
        let event_tx = self.event_tx.clone();
        let id = self.id;
        let task = tokio::spawn(self.run(command_rx));

        SessionHandle {
            id,
            commands: command_tx,
            events: event_tx,
            task,
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }

    fn emit_effects(&self, effects: Vec<ReplayEffect>) {
        for effect in effects {
            self.emit(effect.into());
        }
    }

    fn on_player(&mut self, player: PlayerData) {
        debug!(name = %player.name, energy = player.energy, "Player data changed");
        self.player = Some(player.clone());
        self.emit(SessionEvent::PlayerDataChanged(player));
    }

    async fn on_board(&mut self, board: BoardAccount) {
        let was_ready = self.monitor.is_ready();
        let status = self.monitor.on_snapshot(&mut self.mirror, &self.catalog, &board);
        if let SyncStatus::Stale { action_id, cells } = &status {
            debug!(action_id, divergent = cells.len(), "Stale board snapshot dropped");
            return;
        }
        self.emit(SessionEvent::BoardChanged(Arc::new(board)));
        self.after_sync(status, was_ready).await;
    }

    async fn on_history(&mut self, history: &GameActionHistory) {
        let actions = history.ordered_actions();
        let ready = self.monitor.is_ready();
        let (report, effects) = self
            .engine
            .on_action_log(&actions, &mut self.mirror, &self.catalog, ready)
            .await;
        log_report(&report);
        self.emit_effects(effects);
    }

    async fn rebuild(&mut self) {
        let was_ready = self.monitor.is_ready();
        match self.monitor.rebuild(&mut self.mirror, &self.catalog) {
            Some(status) => self.after_sync(status, was_ready).await,
            None => warn!("Nothing to rebuild from yet"),
        }
    }

    async fn after_sync(&mut self, status: SyncStatus, was_ready: bool) {
        match status {
            SyncStatus::OutOfSync { cells } => {
                self.emit(SessionEvent::OutOfSync { cells });
                return;
            }
            SyncStatus::Rebuilt { cells, placed } => {
                self.emit(SessionEvent::Rebuilt { cells, placed });
            }
            SyncStatus::Built { .. } | SyncStatus::InSync => {}
            SyncStatus::Stale { .. } => return,
        }

        if !was_ready {
            self.emit(SessionEvent::Ready);
        }

        let (report, effects) = self.engine.drain_pending(&mut self.mirror, &self.catalog).await;
        if report.applied > 0 {
            log_report(&report);
        }
        self.emit_effects(effects);
    }
}

fn log_report(report: &ReplayReport) {
    debug!(
        primed = report.primed,
        applied = report.applied,
        duplicates = report.duplicates,
        sentinels = report.sentinels,
        rejected = report.rejected,
        deferred = report.deferred,
        "Action log processed"
    );
}

/// Sending side of a spawned session.
pub struct SessionHandle {
    id: Uuid,
    commands: mpsc::Sender<SessionCommand>,
    events: broadcast::Sender<SessionEvent>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Session identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Queue a command.
    pub async fn send(&self, command: SessionCommand) -> Result<(), ClientError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ClientError::SessionClosed)
    }

    /// Another sender for forwarder tasks.
    pub fn command_sender(&self) -> mpsc::Sender<SessionCommand> {
        self.commands.clone()
    }

    /// Register an event subscriber.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Stop the session and wait for it to finish.
    pub async fn shutdown(self) {
        // Already stopped if the channel is closed.
        let _ = self.commands.send(SessionCommand::Shutdown).await;
        if let Err(err) = self.task.await {
            warn!(%err, "Game session task failed");
        }
    }
}
