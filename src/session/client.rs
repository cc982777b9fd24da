//! Client Facade
//!
//! Wires the collaborators to a spawned [`GameSession`]: fetches current
//! account state once, forwards every change notification into the
//! session channel in arrival order, and turns game actions into
//! instructions for the submitter.

use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::codec::{CodecError, Pubkey};
use crate::collaborators::{
    AccountSource, AvatarLookup, SourceError, SubmitError, TransactionSubmitter,
};
use crate::config::{ClientConfig, ConfigError};
use crate::program::LumberjackInstruction;

use super::events::{SessionCommand, SessionEvent};
use super::pipeline::{GameSession, SessionHandle};

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Instruction could not be encoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    /// Account source failed.
    #[error(transparent)]
    Source(#[from] SourceError),
    /// Submission failed.
    #[error(transparent)]
    Submit(#[from] SubmitError),
    /// Bad configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Session task is gone.
    #[error("game session closed")]
    SessionClosed,
}

/// Decrements the in-flight counter when the submission resolves or is
/// dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Connected game client.
pub struct LumberjackClient<T> {
    config: ClientConfig,
    submitter: T,
    session: SessionHandle,
    forwarders: Vec<JoinHandle<()>>,
    in_flight: AtomicUsize,
}

impl<T: TransactionSubmitter> LumberjackClient<T> {
    /// Start a session and attach it to the account source.
    pub async fn connect<S, L>(
        config: ClientConfig,
        source: &S,
        lookup: L,
        submitter: T,
    ) -> Result<Self, ClientError>
    where
        S: AccountSource,
        L: AvatarLookup,
    {
        let catalog = config.load_catalog()?;
        let session = GameSession::new(&config, catalog, lookup);
        let session_id = session.id();
        let handle = session.spawn(config.command_capacity);

        let addresses = [
            config.accounts.player,
            config.accounts.board,
            config.accounts.history,
        ];

        // Subscribe before fetching so no change between the two is lost.
        let mut subscriptions = Vec::with_capacity(addresses.len());
        for address in addresses {
            subscriptions.push((address, source.subscribe(address).await?));
        }

        for address in addresses {
            match source.fetch(address).await? {
                Some(payload) => {
                    handle.send(SessionCommand::AccountUpdate { address, payload }).await?
                }
                None => debug!(account = %address.short(), "Account not created yet"),
            }
        }

        let forwarders = subscriptions
            .into_iter()
            .map(|(address, updates)| {
                tokio::spawn(forward(address, updates, handle.command_sender()))
            })
            .collect();

        info!(
            session = %session_id,
            program = %config.program_id.short(),
            "Lumberjack client connected"
        );

        Ok(Self {
            config,
            submitter,
            session: handle,
            forwarders,
            in_flight: AtomicUsize::new(0),
        })
    }

    /// Register an event subscriber.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.session.subscribe()
    }

    /// Configuration in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Submitter in use.
    pub fn submitter(&self) -> &T {
        &self.submitter
    }

    /// Submissions not yet resolved.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Whether any submission is unresolved.
    pub fn is_any_transaction_in_progress(&self) -> bool {
        self.in_flight() > 0
    }

    /// Create the player account.
    pub async fn init_player(&self) -> Result<String, ClientError> {
        self.submit(LumberjackInstruction::InitPlayer).await
    }

    /// Chop a tree.
    pub async fn chop_tree(&self, x: u8, y: u8) -> Result<String, ClientError> {
        self.submit(LumberjackInstruction::ChopTree { x, y }).await
    }

    /// Place a building.
    pub async fn build(&self, x: u8, y: u8, building_type: u8) -> Result<String, ClientError> {
        self.submit(LumberjackInstruction::Build { x, y, building_type }).await
    }

    /// Upgrade a building.
    pub async fn upgrade(&self, x: u8, y: u8) -> Result<String, ClientError> {
        self.submit(LumberjackInstruction::Upgrade { x, y }).await
    }

    /// Collect from a building.
    pub async fn collect(&self, x: u8, y: u8) -> Result<String, ClientError> {
        self.submit(LumberjackInstruction::Collect { x, y }).await
    }

    /// Settle energy.
    pub async fn update(&self) -> Result<String, ClientError> {
        self.submit(LumberjackInstruction::Update).await
    }

    /// Ask the session to rebuild the mirror.
    pub async fn request_rebuild(&self) -> Result<(), ClientError> {
        self.session.send(SessionCommand::Rebuild).await
    }

    async fn submit(&self, method: LumberjackInstruction) -> Result<String, ClientError> {
        let instruction =
            method.into_instruction(self.config.program_id, &self.config.account_keys())?;

        let _guard = InFlight::start(&self.in_flight);
        match self.submitter.submit(instruction).await {
            Ok(signature) => {
                debug!(method = method.name(), %signature, "Transaction submitted");
                Ok(signature)
            }
            Err(err) => {
                warn!(method = method.name(), %err, "Transaction failed");
                Err(err.into())
            }
        }
    }

    /// Stop forwarding and shut the session down.
    pub async fn shutdown(self) {
        for forwarder in &self.forwarders {
            forwarder.abort();
        }
        self.session.shutdown().await;
        info!("Lumberjack client stopped");
    }
}

async fn forward(
    address: Pubkey,
    mut updates: mpsc::Receiver<String>,
    commands: mpsc::Sender<SessionCommand>,
) {
    while let Some(payload) = updates.recv().await {
        if commands
            .send(SessionCommand::AccountUpdate { address, payload })
            .await
            .is_err()
        {
            break;
        }
    }
    debug!(account = %address.short(), "Account subscription ended");
}
