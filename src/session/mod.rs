//! Session Pipeline
//!
//! Message-passing glue between the collaborators and the board state:
//! one consuming task per session, explicit event subscription, and a
//! client facade for outbound instructions.

pub mod client;
pub mod events;
pub mod memory;
pub mod pipeline;

// Re-export session types
pub use client::{ClientError, LumberjackClient};
pub use events::{SessionCommand, SessionEvent};
pub use pipeline::{GameSession, SessionHandle};
