//! Instruction Encoding
//!
//! Every instruction is the method's 8-byte discriminator followed by its
//! arguments in call-signature order. Payloads are written into a fixed
//! scratch buffer and truncated to the bytes actually written.

use serde::{Deserialize, Serialize};

use crate::codec::{
    discriminator, ByteReader, ByteWriter, CodecError, CodecResult, Discriminator, Pubkey,
};

use super::SYSTEM_PROGRAM_ID;

/// Scratch capacity for instruction payloads.
pub const INSTRUCTION_SCRATCH_LEN: usize = 1200;

// =============================================================================
// INSTRUCTIONS
// =============================================================================

/// Program methods this client can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum LumberjackInstruction {
    /// Create the player account.
    InitPlayer,
    /// Chop the tree at a cell.
    ChopTree {
        /// Column.
        x: u8,
        /// Row.
        y: u8,
    },
    /// Place a building on a cleared cell.
    Build {
        /// Column.
        x: u8,
        /// Row.
        y: u8,
        /// Building type code.
        building_type: u8,
    },
    /// Upgrade the building at a cell.
    Upgrade {
        /// Column.
        x: u8,
        /// Row.
        y: u8,
    },
    /// Collect from the building at a cell.
    Collect {
        /// Column.
        x: u8,
        /// Row.
        y: u8,
    },
    /// Settle energy.
    Update,
}

impl LumberjackInstruction {
    /// Method discriminator.
    pub fn discriminator(&self) -> Discriminator {
        match self {
            Self::InitPlayer => discriminator::INIT_PLAYER,
            Self::ChopTree { .. } => discriminator::CHOP_TREE,
            Self::Build { .. } => discriminator::BUILD,
            Self::Upgrade { .. } => discriminator::UPGRADE,
            Self::Collect { .. } => discriminator::COLLECT,
            Self::Update => discriminator::UPDATE,
        }
    }

    /// Program method name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitPlayer => "init_player",
            Self::ChopTree { .. } => "chop_tree",
            Self::Build { .. } => "build",
            Self::Upgrade { .. } => "upgrade",
            Self::Collect { .. } => "collect",
            Self::Update => "update",
        }
    }

    /// Target cell, for board actions.
    pub fn target(&self) -> Option<(u8, u8)> {
        match *self {
            Self::ChopTree { x, y }
            | Self::Build { x, y, .. }
            | Self::Upgrade { x, y }
            | Self::Collect { x, y } => Some((x, y)),
            Self::InitPlayer | Self::Update => None,
        }
    }

    /// Encode discriminator and arguments.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut writer = ByteWriter::with_capacity(INSTRUCTION_SCRATCH_LEN);
        writer.write_bytes(&self.discriminator())?;

        match *self {
            Self::InitPlayer | Self::Update => {}
            Self::ChopTree { x, y } | Self::Upgrade { x, y } | Self::Collect { x, y } => {
                writer.write_u8(x)?;
                writer.write_u8(y)?;
            }
            Self::Build { x, y, building_type } => {
                writer.write_u8(x)?;
                writer.write_u8(y)?;
                writer.write_u8(building_type)?;
            }
        }

        Ok(writer.finish())
    }

    /// Decode an instruction payload.
    pub fn decode(data: &[u8]) -> CodecResult<Self> {
        let mut reader = ByteReader::new(data);
        let tag = reader.read_array::<{ discriminator::DISCRIMINATOR_LEN }>()?;

        let instruction = match tag {
            discriminator::INIT_PLAYER => Self::InitPlayer,
            discriminator::UPDATE => Self::Update,
            discriminator::CHOP_TREE => Self::ChopTree {
                x: reader.read_u8()?,
                y: reader.read_u8()?,
            },
            discriminator::UPGRADE => Self::Upgrade {
                x: reader.read_u8()?,
                y: reader.read_u8()?,
            },
            discriminator::COLLECT => Self::Collect {
                x: reader.read_u8()?,
                y: reader.read_u8()?,
            },
            discriminator::BUILD => Self::Build {
                x: reader.read_u8()?,
                y: reader.read_u8()?,
                building_type: reader.read_u8()?,
            },
            other => return Err(CodecError::UnknownInstruction(other)),
        };
        Ok(instruction)
    }

    /// Build a complete instruction with its account metas.
    pub fn into_instruction(
        self,
        program_id: Pubkey,
        keys: &AccountKeys,
    ) -> CodecResult<Instruction> {
        let accounts = match self {
            Self::InitPlayer => vec![
                AccountMeta::writable(keys.player, false),
                AccountMeta::writable(keys.board, false),
                AccountMeta::writable(keys.signer, true),
                AccountMeta::readonly(SYSTEM_PROGRAM_ID),
            ],
            _ => vec![
                AccountMeta::readonly(keys.session_token.unwrap_or(program_id)),
                AccountMeta::writable(keys.board, false),
                AccountMeta::writable(keys.player, false),
                AccountMeta::writable(keys.signer, true),
            ],
        };

        Ok(Instruction {
            program_id,
            accounts,
            data: self.encode()?,
        })
    }
}

// =============================================================================
// ACCOUNT METAS
// =============================================================================

/// Account reference carried by an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMeta {
    /// Account address.
    pub pubkey: Pubkey,
    /// Must sign the transaction.
    pub is_signer: bool,
    /// Written by the program.
    pub is_writable: bool,
}

impl AccountMeta {
    /// Writable account.
    pub fn writable(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    /// Read-only, non-signing account.
    pub fn readonly(pubkey: Pubkey) -> Self {
        Self {
            pubkey,
            is_signer: false,
            is_writable: false,
        }
    }
}

/// Addresses an instruction needs. Derivation is the caller's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountKeys {
    /// Player account.
    pub player: Pubkey,
    /// Board account.
    pub board: Pubkey,
    /// Fee payer / signer.
    pub signer: Pubkey,
    /// Session token, when signing with a session key.
    pub session_token: Option<Pubkey>,
}

/// Unsigned instruction handed to the submission collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Invoked program.
    pub program_id: Pubkey,
    /// Account metas, in the program's declared order.
    pub accounts: Vec<AccountMeta>,
    /// Discriminator + arguments.
    pub data: Vec<u8>,
}

impl Instruction {
    /// Decode the payload back to the method.
    pub fn method(&self) -> CodecResult<LumberjackInstruction> {
        LumberjackInstruction::decode(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::PROGRAM_ID;

    fn keys() -> AccountKeys {
        AccountKeys {
            player: Pubkey::new([1; 32]),
            board: Pubkey::new([2; 32]),
            signer: Pubkey::new([3; 32]),
            session_token: None,
        }
    }

    #[test]
    fn test_payload_lengths() {
        let cases = [
            (LumberjackInstruction::InitPlayer, 8),
            (LumberjackInstruction::Update, 8),
            (LumberjackInstruction::ChopTree { x: 1, y: 2 }, 10),
            (LumberjackInstruction::Upgrade { x: 1, y: 2 }, 10),
            (LumberjackInstruction::Collect { x: 1, y: 2 }, 10),
            (LumberjackInstruction::Build { x: 1, y: 2, building_type: 3 }, 11),
        ];
        for (instruction, len) in cases {
            let bytes = instruction.encode().unwrap();
            assert_eq!(bytes.len(), len, "{}", instruction.name());
            assert_eq!(&bytes[..8], &instruction.discriminator());
        }
    }

    #[test]
    fn test_chop_tree_bytes() {
        let bytes = LumberjackInstruction::ChopTree { x: 4, y: 7 }.encode().unwrap();
        assert_eq!(&bytes[..8], &discriminator::CHOP_TREE);
        assert_eq!(&bytes[8..], &[4, 7]);
    }

    #[test]
    fn test_build_argument_order() {
        let bytes = LumberjackInstruction::Build { x: 9, y: 0, building_type: 2 }
            .encode()
            .unwrap();
        assert_eq!(&bytes[8..], &[9, 0, 2]);
    }

    #[test]
    fn test_decode_inverts_encode() {
        let instruction = LumberjackInstruction::Build { x: 3, y: 4, building_type: 3 };
        let bytes = instruction.encode().unwrap();
        assert_eq!(LumberjackInstruction::decode(&bytes).unwrap(), instruction);
        assert_eq!(instruction.encode().unwrap(), bytes);
    }

    #[test]
    fn test_decode_rejects_unknown_and_short() {
        let mut bytes = LumberjackInstruction::Update.encode().unwrap();
        bytes[0] ^= 1;
        assert!(matches!(
            LumberjackInstruction::decode(&bytes),
            Err(CodecError::UnknownInstruction(_))
        ));

        let chop = LumberjackInstruction::ChopTree { x: 1, y: 1 }.encode().unwrap();
        assert!(matches!(
            LumberjackInstruction::decode(&chop[..9]),
            Err(CodecError::BufferTooShort { .. })
        ));
    }

    #[test]
    fn test_init_player_accounts() {
        let ix = LumberjackInstruction::InitPlayer
            .into_instruction(PROGRAM_ID, &keys())
            .unwrap();
        assert_eq!(ix.program_id, PROGRAM_ID);
        assert_eq!(ix.accounts.len(), 4);
        assert_eq!(ix.accounts[0], AccountMeta::writable(keys().player, false));
        assert!(ix.accounts[2].is_signer);
        assert_eq!(ix.accounts[3], AccountMeta::readonly(SYSTEM_PROGRAM_ID));
    }

    #[test]
    fn test_board_action_session_token_slot() {
        let ix = LumberjackInstruction::Collect { x: 2, y: 2 }
            .into_instruction(PROGRAM_ID, &keys())
            .unwrap();
        assert_eq!(ix.accounts[0], AccountMeta::readonly(PROGRAM_ID));
        assert_eq!(ix.accounts[1].pubkey, keys().board);
        assert_eq!(ix.accounts[2].pubkey, keys().player);
        assert_eq!(ix.method().unwrap(), LumberjackInstruction::Collect { x: 2, y: 2 });

        let token = Pubkey::new([9; 32]);
        let with_session = AccountKeys { session_token: Some(token), ..keys() };
        let ix = LumberjackInstruction::Update
            .into_instruction(PROGRAM_ID, &with_session)
            .unwrap();
        assert_eq!(ix.accounts[0], AccountMeta::readonly(token));
    }

    #[test]
    fn test_program_id_address() {
        assert_eq!(PROGRAM_ID.to_string(), "HsT4yX959Qh1vis8fEqoQdgrHEJuKvaWGtHoPcTjk4mJ");
        assert_eq!(SYSTEM_PROGRAM_ID.to_string(), "11111111111111111111111111111111");
    }

    #[test]
    fn test_target() {
        assert_eq!(LumberjackInstruction::Upgrade { x: 5, y: 6 }.target(), Some((5, 6)));
        assert_eq!(LumberjackInstruction::InitPlayer.target(), None);
    }
}
