//! External Collaborators
//!
//! Narrow interfaces to the services this crate does not own: account
//! transport, avatar metadata and transaction submission. Implementations
//! are injected at construction.

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::codec::Pubkey;
use crate::program::Instruction;

/// Account transport failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Endpoint unreachable or returned an error.
    #[error("account source unavailable: {0}")]
    Unavailable(String),
    /// Subscription could not be opened.
    #[error("cannot subscribe to {0}")]
    Subscribe(Pubkey),
}

/// Avatar lookup failure. "Not found" is `Ok(None)`, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// Lookup may succeed if retried.
    #[error("avatar lookup failed: {0}")]
    Transient(String),
}

/// Transaction submission failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The cluster rejected the transaction.
    #[error("transaction rejected: {0}")]
    Rejected(String),
    /// Could not reach the cluster.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Fetch and subscribe to raw account payloads (base64).
pub trait AccountSource: Send + Sync + 'static {
    /// Current payload, `None` if the account does not exist.
    fn fetch(
        &self,
        address: Pubkey,
    ) -> impl Future<Output = Result<Option<String>, SourceError>> + Send;

    /// Stream of payloads, one per change, in commit order.
    fn subscribe(
        &self,
        address: Pubkey,
    ) -> impl Future<Output = Result<mpsc::Receiver<String>, SourceError>> + Send;
}

/// Avatar metadata for a public key.
pub trait AvatarLookup: Send + Sync + 'static {
    /// Identity for `avatar`, `Ok(None)` when there is none.
    fn lookup(
        &self,
        avatar: Pubkey,
    ) -> impl Future<Output = Result<Option<AvatarIdentity>, LookupError>> + Send;
}

/// Submit a pre-built instruction.
pub trait TransactionSubmitter: Send + Sync + 'static {
    /// Returns the transaction signature.
    fn submit(
        &self,
        instruction: Instruction,
    ) -> impl Future<Output = Result<String, SubmitError>> + Send;
}

/// Display identity of an avatar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarIdentity {
    /// Avatar mint.
    pub mint: Pubkey,
    /// Display name.
    pub name: String,
    /// Image, if any.
    pub image_uri: Option<String>,
    /// Synthesized locally because the lookup gave nothing.
    pub placeholder: bool,
}

impl AvatarIdentity {
    /// Local stand-in for an avatar the lookup could not resolve.
    pub fn placeholder(mint: Pubkey) -> Self {
        Self {
            mint,
            name: format!("Lumberjack {}", mint.short()),
            image_uri: None,
            placeholder: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_identity() {
        let mint = Pubkey::new([0xab; 32]);
        let identity = AvatarIdentity::placeholder(mint);
        assert!(identity.placeholder);
        assert_eq!(identity.mint, mint);
        assert_eq!(identity.name, "Lumberjack CZ8Y..ky9t");
        assert!(identity.image_uri.is_none());
    }
}
