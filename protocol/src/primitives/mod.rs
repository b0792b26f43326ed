//! Primitive domain values and their canonical encodings.
//!
//! Everything a transaction is built from bottoms out here: fixed-width
//! hashes, credentials, amounts, and addresses. Each type encodes to CBOR
//! with `minicbor` and decodes back with length and shape checks.

pub mod address;
pub mod bytes;
pub mod credential;
pub mod value;

pub use address::{Address, RewardAddress};
pub use bytes::{
    AnchorDataHash, AuxiliaryDataHash, Ed25519KeyHash, Ed25519Signature, PolicyId, PublicKey,
    ScriptHash, TransactionHash,
};
pub use credential::Credential;
pub use value::{AssetName, Coin, MultiAsset, Value};
