//! Program Interface
//!
//! Outbound side of the codec: instruction payloads for the Lumberjack
//! program and the account metas each one expects.

pub mod instruction;

use crate::codec::Pubkey;

// Re-export instruction types
pub use instruction::{
    AccountKeys, AccountMeta, Instruction, LumberjackInstruction, INSTRUCTION_SCRATCH_LEN,
};

/// Deployed Lumberjack program, `HsT4yX959Qh1vis8fEqoQdgrHEJuKvaWGtHoPcTjk4mJ`.
pub const PROGRAM_ID: Pubkey = Pubkey::new([
    250, 167, 129, 206, 25, 193, 160, 220, 0, 22, 15, 162, 67, 152, 151, 232, 75, 95, 112, 85,
    55, 76, 245, 173, 32, 66, 90, 57, 193, 216, 48, 205,
]);

/// System program, `11111111111111111111111111111111`.
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new([0; 32]);
