//! Schema Discriminators
//!
//! Every account record and every instruction starts with an 8-byte tag:
//! the first 8 bytes of `SHA-256("<namespace>:<Name>")`. Records use the
//! `account` namespace with the type name, instructions use `global` with
//! the snake_case method name.
//!
//! The constants below are what the decoders compare against; [`derive`]
//! recomputes them and the tests pin the two together.

use sha2::{Digest, Sha256};

use super::primitive::{get_array, CodecResult};

/// Discriminator length in bytes.
pub const DISCRIMINATOR_LEN: usize = 8;

/// 8-byte schema tag.
pub type Discriminator = [u8; DISCRIMINATOR_LEN];

/// Namespace for account records.
pub const ACCOUNT_NAMESPACE: &str = "account";

/// Namespace for instructions.
pub const INSTRUCTION_NAMESPACE: &str = "global";

// Account records
/// `account:PlayerData`
pub const PLAYER_DATA: Discriminator = [197, 65, 216, 202, 43, 139, 147, 128];
/// `account:BoardAccount`
pub const BOARD_ACCOUNT: Discriminator = [8, 5, 241, 133, 101, 69, 36, 241];
/// `account:GameActionHistory`
pub const GAME_ACTION_HISTORY: Discriminator = [136, 187, 67, 235, 229, 173, 36, 123];

// Instructions
/// `global:init_player`
pub const INIT_PLAYER: Discriminator = [114, 27, 219, 144, 50, 15, 228, 66];
/// `global:chop_tree`
pub const CHOP_TREE: Discriminator = [120, 56, 196, 91, 213, 182, 36, 28];
/// `global:build`
pub const BUILD: Discriminator = [185, 78, 176, 79, 189, 139, 56, 25];
/// `global:upgrade`
pub const UPGRADE: Discriminator = [239, 238, 57, 74, 205, 87, 165, 26];
/// `global:collect`
pub const COLLECT: Discriminator = [208, 47, 194, 155, 17, 98, 82, 236];
/// `global:update`
pub const UPDATE: Discriminator = [219, 200, 88, 176, 158, 63, 253, 127];

/// Derive a discriminator from namespace and name.
pub fn derive(namespace: &str, name: &str) -> Discriminator {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(b":");
    hasher.update(name.as_bytes());
    let hash = hasher.finalize();

    let mut tag = [0u8; DISCRIMINATOR_LEN];
    tag.copy_from_slice(&hash[..DISCRIMINATOR_LEN]);
    tag
}

/// Derive an account record discriminator.
pub fn account(name: &str) -> Discriminator {
    derive(ACCOUNT_NAMESPACE, name)
}

/// Derive an instruction discriminator.
pub fn instruction(method: &str) -> Discriminator {
    derive(INSTRUCTION_NAMESPACE, method)
}

/// Read the leading tag of a buffer.
pub fn read(data: &[u8]) -> CodecResult<Discriminator> {
    get_array::<DISCRIMINATOR_LEN>(data, 0)
}
