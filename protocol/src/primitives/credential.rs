//! Credentials: who has to authorize an action.

use std::fmt;

use minicbor::decode::{self, Decode, Decoder};
use minicbor::encode::{self, Encode, Encoder, Write};
use serde::Serialize;

use super::bytes::{Ed25519KeyHash, ScriptHash};

/// A key hash or script hash that must witness an action.
///
/// Encoded as `[0, key_hash]` or `[1, script_hash]`. Equality is structural:
/// a key credential never equals a script credential even when the hash
/// bytes coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "type", content = "hash", rename_all = "snake_case")]
pub enum Credential {
    KeyHash(Ed25519KeyHash),
    ScriptHash(ScriptHash),
}

impl Credential {
    pub fn from_keyhash(hash: Ed25519KeyHash) -> Self {
        Self::KeyHash(hash)
    }

    pub fn from_scripthash(hash: ScriptHash) -> Self {
        Self::ScriptHash(hash)
    }

    /// The key hash, if this credential is key-based.
    pub fn to_keyhash(&self) -> Option<Ed25519KeyHash> {
        match self {
            Self::KeyHash(hash) => Some(*hash),
            Self::ScriptHash(_) => None,
        }
    }

    pub fn is_script(&self) -> bool {
        matches!(self, Self::ScriptHash(_))
    }

    /// The raw 28 hash bytes regardless of kind.
    pub fn hash_bytes(&self) -> &[u8; 28] {
        match self {
            Self::KeyHash(hash) => hash.as_bytes(),
            Self::ScriptHash(hash) => hash.as_bytes(),
        }
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyHash(hash) => write!(f, "keyhash:{}", hash),
            Self::ScriptHash(hash) => write!(f, "scripthash:{}", hash),
        }
    }
}

impl<C> Encode<C> for Credential {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), encode::Error<W::Error>> {
        e.array(2)?;
        match self {
            Self::KeyHash(hash) => {
                e.u8(0)?;
                hash.encode(e, ctx)
            }
            Self::ScriptHash(hash) => {
                e.u8(1)?;
                hash.encode(e, ctx)
            }
        }
    }
}

impl<'b, C> Decode<'b, C> for Credential {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, decode::Error> {
        if d.array()? != Some(2) {
            return Err(decode::Error::message("credential must be a 2-element array"));
        }
        match d.u8()? {
            0 => Ok(Self::KeyHash(Ed25519KeyHash::decode(d, ctx)?)),
            1 => Ok(Self::ScriptHash(ScriptHash::decode(d, ctx)?)),
            tag => Err(decode::Error::message(format!("unknown credential tag {}", tag))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_and_script_credentials_differ() {
        let key = Credential::from_keyhash(Ed25519KeyHash::new([9; 28]));
        let script = Credential::from_scripthash(ScriptHash::new([9; 28]));
        assert_ne!(key, script);
        assert_eq!(key.hash_bytes(), script.hash_bytes());
        assert!(script.is_script());
        assert_eq!(script.to_keyhash(), None);
    }

    #[test]
    fn encodes_tagged_array() {
        let cred = Credential::from_scripthash(ScriptHash::new([1; 28]));
        let bytes = minicbor::to_vec(&cred).unwrap();
        assert_eq!(&bytes[..2], &[0x82, 0x01]);
        let back: Credential = minicbor::decode(&bytes).unwrap();
        assert_eq!(back, cred);
    }

    #[test]
    fn decode_rejects_unknown_tag() {
        let mut bytes = vec![0x82, 0x05, 0x58, 28];
        bytes.extend_from_slice(&[0u8; 28]);
        assert!(minicbor::decode::<Credential>(&bytes).is_err());
    }
}
