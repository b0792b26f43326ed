//! Fixed-width byte values: key hashes, script hashes, transaction hashes,
//! anchor data hashes, public keys, and signatures.
//!
//! Each type is a thin newtype over `[u8; N]`. Construction from a slice or
//! a hex string checks the length and never pads or truncates. In the
//! canonical encoding every one of them is a CBOR byte string.

use std::fmt;

use minicbor::decode::{self, Decode, Decoder};
use minicbor::encode::{self, Encode, Encoder, Write};
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::{HASH_LENGTH, KEY_HASH_LENGTH, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use crate::error::{LedgerError, Result};

macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr, $field:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; $len]);

        impl $name {
            /// Length of the value in bytes.
            pub const LENGTH: usize = $len;

            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Builds the value from a slice, rejecting any other length.
            pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
                let array: [u8; $len] = bytes.try_into().map_err(|_| {
                    LedgerError::malformed(
                        $field,
                        format!("expected {} bytes, got {}", $len, bytes.len()),
                    )
                })?;
                Ok(Self(array))
            }

            pub fn from_hex(hex_str: &str) -> Result<Self> {
                let bytes =
                    hex::decode(hex_str).map_err(|e| LedgerError::malformed($field, e.to_string()))?;
                Self::from_bytes(&bytes)
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Fills a new value from the supplied randomness source.
            pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
                let mut bytes = [0u8; $len];
                rng.fill_bytes(&mut bytes);
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }

        impl<C> Encode<C> for $name {
            fn encode<W: Write>(
                &self,
                e: &mut Encoder<W>,
                _ctx: &mut C,
            ) -> std::result::Result<(), encode::Error<W::Error>> {
                e.bytes(&self.0)?;
                Ok(())
            }
        }

        impl<'b, C> Decode<'b, C> for $name {
            fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> std::result::Result<Self, decode::Error> {
                let bytes = d.bytes()?;
                Self::from_bytes(bytes).map_err(|e| decode::Error::message(e.to_string()))
            }
        }
    };
}

fixed_bytes!(
    /// Blake2b-224 hash of an Ed25519 verification key. Identifies payment,
    /// stake, DRep, and pool keys without revealing the key itself.
    Ed25519KeyHash,
    KEY_HASH_LENGTH,
    "ed25519 key hash"
);

fixed_bytes!(
    /// Blake2b-224 hash of a script.
    ScriptHash,
    KEY_HASH_LENGTH,
    "script hash"
);

fixed_bytes!(
    /// Minting policy identifier of a native asset.
    PolicyId,
    KEY_HASH_LENGTH,
    "policy id"
);

fixed_bytes!(
    /// Blake2b-256 hash of a transaction body.
    TransactionHash,
    HASH_LENGTH,
    "transaction hash"
);

fixed_bytes!(
    /// Hash of the off-chain document an [`Anchor`](crate::governance::Anchor)
    /// points to.
    AnchorDataHash,
    HASH_LENGTH,
    "anchor data hash"
);

fixed_bytes!(
    /// Blake2b-256 hash of a transaction's auxiliary data.
    AuxiliaryDataHash,
    HASH_LENGTH,
    "auxiliary data hash"
);

fixed_bytes!(
    /// Ed25519 verification key.
    PublicKey,
    PUBLIC_KEY_LENGTH,
    "public key"
);

fixed_bytes!(
    /// Ed25519 signature carried in a verification key witness.
    Ed25519Signature,
    SIGNATURE_LENGTH,
    "ed25519 signature"
);
