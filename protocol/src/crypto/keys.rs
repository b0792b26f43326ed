//! # Hierarchical Key Derivation
//!
//! Thin, typed adapter over the external BIP-39 and BIP32-Ed25519
//! implementations. A [`RootKey`] comes from a mnemonic (Icarus master key
//! generation), and [`derive_path`] walks a [`DerivationPath`] such as
//! `m/1852'/1815'/0'/0/0` down to a [`KeyMaterial`].
//!
//! ## Layout (CIP-1852)
//!
//! ```text
//! m / purpose' / coin_type' / account' / role / index
//!     1852'      1815'        0'         0 payment, 2 stake, 3 DRep
//! ```
//!
//! Hardened indices are written with a trailing `'` and encoded by adding
//! `0x8000_0000`. An index that is already `>= 2^31` cannot be hardened.
//!
//! Nothing in this module logs key bytes. `Debug` output shows only the
//! derivation path and the public key hash.

use std::fmt;
use std::str::FromStr;

use bip39::Mnemonic;
use ed25519_bip32::{DerivationScheme, XPrv};
use pbkdf2::pbkdf2_hmac;
use rand::{CryptoRng, RngCore};
use sha2::Sha512;
use tracing::debug;
use zeroize::Zeroizing;

use crate::config::{
    CARDANO_COIN_TYPE, CIP1852_PURPOSE, EXTENDED_KEY_LENGTH, HARDENED_OFFSET,
    ICARUS_PBKDF2_ROUNDS, PUBLIC_KEY_LENGTH,
};
use crate::crypto::hash::blake2b_224;
use crate::error::{LedgerError, Result};
use crate::primitives::{Credential, Ed25519KeyHash, PublicKey};

/// Adds the hardened offset to `index`.
///
/// Fails for `index >= 2^31`, where the sum would either overflow or alias a
/// hardened index.
pub fn harden(index: u32) -> Result<u32> {
    if index >= HARDENED_OFFSET {
        return Err(LedgerError::malformed(
            "derivation index",
            format!("{} is already in the hardened range", index),
        ));
    }
    index
        .checked_add(HARDENED_OFFSET)
        .ok_or_else(|| LedgerError::malformed("derivation index", "hardening overflowed"))
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// One step of a derivation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildIndex {
    /// Hardened child; holds the unhardened index (`< 2^31`).
    Hardened(u32),
    /// Soft child (`< 2^31`).
    Soft(u32),
}

impl ChildIndex {
    pub fn hardened(index: u32) -> Result<Self> {
        harden(index)?;
        Ok(Self::Hardened(index))
    }

    pub fn soft(index: u32) -> Result<Self> {
        if index >= HARDENED_OFFSET {
            return Err(LedgerError::malformed(
                "derivation index",
                format!("soft index {} must be below 2^31", index),
            ));
        }
        Ok(Self::Soft(index))
    }

    /// Splits a raw 32-bit index into its kind and position.
    pub fn from_raw(raw: u32) -> Self {
        if raw >= HARDENED_OFFSET {
            Self::Hardened(raw - HARDENED_OFFSET)
        } else {
            Self::Soft(raw)
        }
    }

    /// The raw index handed to the derivation function.
    pub fn to_raw(self) -> u32 {
        match self {
            Self::Hardened(index) => index | HARDENED_OFFSET,
            Self::Soft(index) => index,
        }
    }

    pub fn is_hardened(self) -> bool {
        matches!(self, Self::Hardened(_))
    }
}

impl fmt::Display for ChildIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hardened(index) => write!(f, "{}'", index),
            Self::Soft(index) => write!(f, "{}", index),
        }
    }
}

/// Key roles at the fourth level of a CIP-1852 path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum KeyRole {
    /// Payment keys for receiving addresses.
    External = 0,
    /// Payment keys for change addresses.
    Internal = 1,
    Stake = 2,
    DRep = 3,
    CommitteeCold = 4,
    CommitteeHot = 5,
}

impl KeyRole {
    pub fn index(self) -> u32 {
        self as u32
    }
}

/// An ordered sequence of child indices below the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DerivationPath(Vec<ChildIndex>);

impl DerivationPath {
    pub fn new(indices: Vec<ChildIndex>) -> Self {
        Self(indices)
    }

    /// `m/1852'/1815'/account'/role/index`.
    pub fn cip1852(account: u32, role: KeyRole, index: u32) -> Result<Self> {
        Ok(Self(vec![
            ChildIndex::hardened(CIP1852_PURPOSE)?,
            ChildIndex::hardened(CARDANO_COIN_TYPE)?,
            ChildIndex::hardened(account)?,
            ChildIndex::soft(role.index())?,
            ChildIndex::soft(index)?,
        ]))
    }

    /// Builds a path from raw indices plus a parallel set of hardening
    /// flags. Both slices must have the same length.
    pub fn from_indices(indices: &[u32], hardened: &[bool]) -> Result<Self> {
        if indices.len() != hardened.len() {
            return Err(LedgerError::malformed(
                "derivation path",
                format!(
                    "{} indices but {} hardening flags",
                    indices.len(),
                    hardened.len()
                ),
            ));
        }
        indices
            .iter()
            .zip(hardened)
            .map(|(&index, &hard)| {
                if hard {
                    ChildIndex::hardened(index)
                } else {
                    ChildIndex::soft(index)
                }
            })
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    /// Returns a new path with `child` appended.
    pub fn child(&self, child: ChildIndex) -> Self {
        let mut indices = self.0.clone();
        indices.push(child);
        Self(indices)
    }

    pub fn indices(&self) -> &[ChildIndex] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for index in &self.0 {
            write!(f, "/{}", index)?;
        }
        Ok(())
    }
}

impl FromStr for DerivationPath {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().split('/');
        if parts.next() != Some("m") {
            return Err(LedgerError::malformed(
                "derivation path",
                format!("'{}' must start with 'm'", s),
            ));
        }
        parts
            .map(|part| {
                let hardened = part.strip_suffix('\'').or_else(|| part.strip_suffix('H'));
                let (digits, hard) = match hardened {
                    Some(digits) => (digits, true),
                    None => (part, false),
                };
                let index: u32 = digits.parse().map_err(|_| {
                    LedgerError::malformed("derivation path", format!("bad index '{}'", part))
                })?;
                if hard {
                    ChildIndex::hardened(index)
                } else {
                    ChildIndex::soft(index)
                }
            })
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Master extended private key.
pub struct RootKey {
    xprv: XPrv,
}

impl RootKey {
    /// Icarus master key from a BIP-39 phrase and optional passphrase.
    pub fn from_mnemonic(phrase: &str, passphrase: &str) -> Result<Self> {
        let mnemonic = Mnemonic::from_str(phrase)
            .map_err(|e| LedgerError::malformed("mnemonic", e.to_string()))?;
        let entropy = Zeroizing::new(mnemonic.to_entropy());
        Ok(Self::from_entropy(&entropy, passphrase))
    }

    /// Icarus master key: PBKDF2-HMAC-SHA512 over the entropy with the
    /// passphrase as password, then clamped to a valid extended key.
    pub fn from_entropy(entropy: &[u8], passphrase: &str) -> Self {
        let mut seed = Zeroizing::new([0u8; EXTENDED_KEY_LENGTH]);
        pbkdf2_hmac::<Sha512>(
            passphrase.as_bytes(),
            entropy,
            ICARUS_PBKDF2_ROUNDS,
            &mut seed[..],
        );
        Self {
            xprv: XPrv::normalize_bytes_force3rd(*seed),
        }
    }

    /// Imports a raw 96-byte extended key (64-byte scalar plus chain code).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; EXTENDED_KEY_LENGTH] = bytes.try_into().map_err(|_| {
            LedgerError::malformed(
                "root key",
                format!(
                    "expected {} bytes, got {}",
                    EXTENDED_KEY_LENGTH,
                    bytes.len()
                ),
            )
        })?;
        let xprv = XPrv::from_bytes_verified(raw)
            .map_err(|e| LedgerError::malformed("root key", format!("{:?}", e)))?;
        Ok(Self { xprv })
    }

    /// The raw 96-byte extended key.
    pub fn to_bytes(&self) -> Zeroizing<[u8; EXTENDED_KEY_LENGTH]> {
        let mut out = Zeroizing::new([0u8; EXTENDED_KEY_LENGTH]);
        out.copy_from_slice(self.xprv.as_ref());
        out
    }

    /// Key material at `m` itself.
    pub fn key_material(&self) -> KeyMaterial {
        KeyMaterial {
            xprv: self.xprv.clone(),
            path: DerivationPath::default(),
        }
    }
}

impl fmt::Debug for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RootKey(..)")
    }
}

/// Generates a new English mnemonic of `word_count` words from `rng`.
pub fn generate_mnemonic<R: RngCore + CryptoRng>(rng: &mut R, word_count: usize) -> Result<String> {
    let entropy_len = match word_count {
        12 => 16,
        15 => 20,
        18 => 24,
        21 => 28,
        24 => 32,
        other => {
            return Err(LedgerError::malformed(
                "mnemonic",
                format!("unsupported word count {}", other),
            ))
        }
    };
    let mut entropy = Zeroizing::new(vec![0u8; entropy_len]);
    rng.fill_bytes(&mut entropy);
    let mnemonic = Mnemonic::from_entropy(&entropy)
        .map_err(|e| LedgerError::malformed("mnemonic", e.to_string()))?;
    Ok(mnemonic.to_string())
}

/// Derives the key at `path` below `root`. Pure: the same root and path
/// always yield the same key.
pub fn derive_path(root: &RootKey, path: &DerivationPath) -> KeyMaterial {
    let xprv = path.indices().iter().fold(root.xprv.clone(), |key, index| {
        key.derive(DerivationScheme::V2, index.to_raw())
    });
    debug!(path = %path, "derived key");
    KeyMaterial {
        xprv,
        path: path.clone(),
    }
}

/// An extended private key together with the path it was derived at.
#[derive(Clone)]
pub struct KeyMaterial {
    xprv: XPrv,
    path: DerivationPath,
}

impl KeyMaterial {
    /// Derives one more level below this key.
    pub fn derive(&self, index: ChildIndex) -> KeyMaterial {
        KeyMaterial {
            xprv: self.xprv.derive(DerivationScheme::V2, index.to_raw()),
            path: self.path.child(index),
        }
    }

    pub fn path(&self) -> &DerivationPath {
        &self.path
    }

    pub fn public_key(&self) -> PublicKey {
        let xpub = self.xprv.public();
        let mut key = [0u8; PUBLIC_KEY_LENGTH];
        key.copy_from_slice(&xpub.as_ref()[..PUBLIC_KEY_LENGTH]);
        PublicKey::new(key)
    }

    /// Blake2b-224 of the public key.
    pub fn key_hash(&self) -> Ed25519KeyHash {
        Ed25519KeyHash::new(blake2b_224(self.public_key().as_bytes()))
    }

    pub fn credential(&self) -> Credential {
        Credential::from_keyhash(self.key_hash())
    }

    /// The 64-byte extended scalar. Wiped when the returned buffer drops.
    pub fn private_key_bytes(&self) -> Zeroizing<[u8; 64]> {
        let mut out = Zeroizing::new([0u8; 64]);
        out.copy_from_slice(&self.xprv.as_ref()[..64]);
        out
    }

    pub fn chain_code(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.xprv.as_ref()[64..]);
        out
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("path", &self.path.to_string())
            .field("key_hash", &self.key_hash())
            .finish()
    }
}

/// Payment, stake and DRep keys of one account at address index 0.
#[derive(Debug, Clone)]
pub struct AccountKeys {
    pub payment: KeyMaterial,
    pub stake: KeyMaterial,
    pub drep: KeyMaterial,
}

impl AccountKeys {
    pub fn from_root(root: &RootKey, account: u32) -> Result<Self> {
        let key = |role| -> Result<KeyMaterial> {
            Ok(derive_path(root, &DerivationPath::cip1852(account, role, 0)?))
        };
        Ok(Self {
            payment: key(KeyRole::External)?,
            stake: key(KeyRole::Stake)?,
            drep: key(KeyRole::DRep)?,
        })
    }

    /// Account 0 keys for a mnemonic with an empty passphrase.
    pub fn from_mnemonic(phrase: &str) -> Result<Self> {
        Self::from_root(&RootKey::from_mnemonic(phrase, "")?, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_root() -> RootKey {
        RootKey::from_entropy(&[0x42; 16], "")
    }

    // CIP-19 reference mnemonic; its account 0 keys fund the published
    // testnet base address.
    const CIP19_MNEMONIC: &str =
        "test walk nut penalty hip pave soap entry language right filter choice";

    #[test]
    fn reference_mnemonic_payment_key_hash() {
        let keys = AccountKeys::from_mnemonic(CIP19_MNEMONIC).unwrap();
        assert_eq!(
            keys.payment.key_hash().to_hex(),
            "9493315cd92eb5d8c4304e67b7e16ae36d61d34502694657811a2c8e"
        );
        assert_eq!(keys.payment.path().to_string(), "m/1852'/1815'/0'/0/0");
    }

    #[test]
    fn harden_adds_offset() {
        assert_eq!(harden(0).unwrap(), 0x8000_0000);
        assert_eq!(harden(1852).unwrap(), 0x8000_073C);
        assert_eq!(harden(0x7FFF_FFFF).unwrap(), u32::MAX);
    }

    #[test]
    fn harden_rejects_high_indices() {
        assert!(harden(0x8000_0000).is_err());
        assert!(harden(u32::MAX).is_err());
    }

    #[test]
    fn path_parses_and_displays() {
        let path: DerivationPath = "m/1852'/1815'/0'/2/0".parse().unwrap();
        assert_eq!(path, DerivationPath::cip1852(0, KeyRole::Stake, 0).unwrap());
        assert_eq!(path.to_string(), "m/1852'/1815'/0'/2/0");
        assert_eq!(path.indices()[0].to_raw(), 0x8000_073C);
    }

    #[test]
    fn path_rejects_garbage() {
        assert!("1852'/0".parse::<DerivationPath>().is_err());
        assert!("m/abc".parse::<DerivationPath>().is_err());
        assert!("m/2147483648'".parse::<DerivationPath>().is_err());
    }

    #[test]
    fn from_indices_checks_flag_count() {
        assert!(DerivationPath::from_indices(&[1852, 1815], &[true]).is_err());
        let flags = [true, true, true, false, false];
        let path = DerivationPath::from_indices(&[1852, 1815, 0, 3, 0], &flags).unwrap();
        assert_eq!(path, DerivationPath::cip1852(0, KeyRole::DRep, 0).unwrap());
    }

    #[test]
    fn derivation_is_deterministic() {
        let path = DerivationPath::cip1852(0, KeyRole::External, 0).unwrap();
        let a = derive_path(&test_root(), &path);
        let b = derive_path(&test_root(), &path);
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(*a.private_key_bytes(), *b.private_key_bytes());
        assert_eq!(a.chain_code(), b.chain_code());
    }

    #[test]
    fn stepwise_derivation_matches_full_path() {
        let root = test_root();
        let path = DerivationPath::cip1852(0, KeyRole::Stake, 0).unwrap();
        let direct = derive_path(&root, &path);
        let stepwise = path
            .indices()
            .iter()
            .fold(root.key_material(), |key, index| key.derive(*index));
        assert_eq!(direct.key_hash(), stepwise.key_hash());
        assert_eq!(stepwise.path(), &path);
    }

    #[test]
    fn roles_yield_distinct_keys() {
        let keys = AccountKeys::from_root(&test_root(), 0).unwrap();
        assert_ne!(keys.payment.key_hash(), keys.stake.key_hash());
        assert_ne!(keys.stake.key_hash(), keys.drep.key_hash());
    }

    #[test]
    fn key_hash_is_blake2b_224_of_public_key() {
        let key = derive_path(
            &test_root(),
            &DerivationPath::cip1852(0, KeyRole::DRep, 0).unwrap(),
        );
        assert_eq!(
            key.key_hash().as_bytes(),
            &blake2b_224(key.public_key().as_bytes())
        );
        assert_eq!(key.credential(), Credential::from_keyhash(key.key_hash()));
    }

    #[test]
    fn root_key_bytes_roundtrip() {
        let root = test_root();
        let restored = RootKey::from_bytes(&root.to_bytes()[..]).unwrap();
        assert_eq!(
            restored.key_material().key_hash(),
            root.key_material().key_hash()
        );
        assert!(RootKey::from_bytes(&[0u8; 64]).is_err());
    }

    #[test]
    fn generated_mnemonic_restores_same_root() {
        let phrase = generate_mnemonic(&mut StdRng::seed_from_u64(1), 24).unwrap();
        assert_eq!(phrase.split_whitespace().count(), 24);
        let a = AccountKeys::from_mnemonic(&phrase).unwrap();
        let b = AccountKeys::from_mnemonic(&phrase).unwrap();
        assert_eq!(a.payment.key_hash(), b.payment.key_hash());
        assert!(generate_mnemonic(&mut StdRng::seed_from_u64(1), 13).is_err());
    }

    #[test]
    fn passphrase_changes_root() {
        let a = RootKey::from_entropy(&[7; 16], "");
        let b = RootKey::from_entropy(&[7; 16], "secret");
        assert_ne!(a.key_material().key_hash(), b.key_material().key_hash());
    }

    #[test]
    fn invalid_mnemonic_is_malformed_input() {
        let err = RootKey::from_mnemonic("not a real mnemonic phrase", "").unwrap_err();
        assert!(matches!(err, LedgerError::MalformedInput { field: "mnemonic", .. }));
    }

    #[test]
    fn debug_output_hides_key_bytes() {
        let key = test_root().key_material();
        let rendered = format!("{:?}", key);
        assert!(rendered.contains("key_hash"));
        assert!(!rendered.contains(&hex::encode(&key.private_key_bytes()[..])));
    }
}
