//! In-Memory Collaborators
//!
//! Process-local implementations of the collaborator traits. The demo
//! binary runs the full pipeline on them, and the tests script them.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::accounts::encode_base64;
use crate::codec::Pubkey;
use crate::collaborators::{
    AccountSource, AvatarIdentity, AvatarLookup, LookupError, SourceError, SubmitError,
    TransactionSubmitter,
};
use crate::program::Instruction;

/// Subscription buffer per account.
const SUBSCRIPTION_CAPACITY: usize = 64;

// =============================================================================
// ACCOUNT SOURCE
// =============================================================================

/// Account store with change notification.
#[derive(Default)]
pub struct MemoryAccountSource {
    accounts: Mutex<BTreeMap<Pubkey, String>>,
    subscribers: Mutex<BTreeMap<Pubkey, Vec<mpsc::Sender<String>>>>,
}

impl MemoryAccountSource {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw account bytes and notify subscribers.
    pub async fn publish(&self, address: Pubkey, data: &[u8]) -> usize {
        let payload = encode_base64(data);
        self.accounts.lock().await.insert(address, payload.clone());

        let mut subscribers = self.subscribers.lock().await;
        let Some(senders) = subscribers.get_mut(&address) else {
            return 0;
        };
        let mut delivered = 0;
        let mut open = Vec::with_capacity(senders.len());
        for sender in senders.drain(..) {
            if sender.send(payload.clone()).await.is_ok() {
                delivered += 1;
                open.push(sender);
            }
        }
        *senders = open;
        debug!(account = %address.short(), delivered, "Account published");
        delivered
    }
}

impl AccountSource for MemoryAccountSource {
    async fn fetch(&self, address: Pubkey) -> Result<Option<String>, SourceError> {
        Ok(self.accounts.lock().await.get(&address).cloned())
    }

    async fn subscribe(&self, address: Pubkey) -> Result<mpsc::Receiver<String>, SourceError> {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_CAPACITY);
        self.subscribers.lock().await.entry(address).or_default().push(tx);
        Ok(rx)
    }
}

// =============================================================================
// AVATAR LOOKUP
// =============================================================================

/// Fixed avatar table, optionally failing every lookup.
#[derive(Default)]
pub struct StaticAvatarLookup {
    identities: BTreeMap<Pubkey, AvatarIdentity>,
    fail: bool,
    calls: AtomicUsize,
}

impl StaticAvatarLookup {
    /// Lookup where every call fails transiently.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Add a known identity.
    pub fn with_identity(mut self, identity: AvatarIdentity) -> Self {
        self.identities.insert(identity.mint, identity);
        self
    }

    /// Lookups performed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl AvatarLookup for StaticAvatarLookup {
    async fn lookup(&self, avatar: Pubkey) -> Result<Option<AvatarIdentity>, LookupError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            return Err(LookupError::Transient("metadata service unreachable".into()));
        }
        Ok(self.identities.get(&avatar).cloned())
    }
}

// =============================================================================
// SUBMITTER
// =============================================================================

/// Records every submitted instruction.
#[derive(Default)]
pub struct RecordingSubmitter {
    submitted: Mutex<Vec<Instruction>>,
    reject: Option<String>,
}

impl RecordingSubmitter {
    /// Submitter that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Submitter that rejects everything with `reason`.
    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self {
            reject: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Instructions accepted so far.
    pub async fn submitted(&self) -> Vec<Instruction> {
        self.submitted.lock().await.clone()
    }
}

impl TransactionSubmitter for RecordingSubmitter {
    async fn submit(&self, instruction: Instruction) -> Result<String, SubmitError> {
        if let Some(reason) = &self.reject {
            return Err(SubmitError::Rejected(reason.clone()));
        }
        let mut submitted = self.submitted.lock().await;
        submitted.push(instruction);
        Ok(format!("sig-{:08}", submitted.len()))
    }
}
