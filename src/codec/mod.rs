//! Binary codec primitives.
//!
//! Fixed-width little-endian reads and writes at explicit offsets, the
//! 32-byte public key type, and the 8-byte schema discriminators used by
//! the on-chain program. Everything above this module composes these.

pub mod primitive;
pub mod pubkey;
pub mod discriminator;

// Re-export codec types
pub use primitive::{ByteReader, ByteWriter, CodecError, CodecResult};
pub use pubkey::Pubkey;
pub use discriminator::{Discriminator, DISCRIMINATOR_LEN};
