//! # Cryptographic Primitives
//!
//! Hashing and hierarchical key derivation. Both are thin typed wrappers
//! over external implementations: `blake2` for digests, `bip39`, `pbkdf2`
//! and `ed25519-bip32` for keys. Nothing here reimplements a primitive.

pub mod hash;
pub mod keys;

pub use hash::{blake2b_224, blake2b_256};
pub use keys::{
    derive_path, generate_mnemonic, harden, AccountKeys, ChildIndex, DerivationPath, KeyMaterial,
    KeyRole, RootKey,
};
