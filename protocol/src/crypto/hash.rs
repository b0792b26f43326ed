//! # Hashing Utilities
//!
//! Blake2b in the two widths the ledger uses:
//!
//! - **Blake2b-224** for key hashes and script hashes (28 bytes).
//! - **Blake2b-256** for transaction ids, auxiliary data, and anchors
//!   (32 bytes).

use blake2::digest::consts::{U28, U32};
use blake2::{Blake2b, Digest};

use crate::config::{HASH_LENGTH, KEY_HASH_LENGTH};

type Blake2b224 = Blake2b<U28>;
type Blake2b256 = Blake2b<U32>;

/// Blake2b-224 digest of `data`.
///
/// # Example
///
/// ```
/// use conway_tx::crypto::blake2b_224;
///
/// assert_eq!(blake2b_224(b"").len(), 28);
/// ```
pub fn blake2b_224(data: &[u8]) -> [u8; KEY_HASH_LENGTH] {
    let mut hasher = Blake2b224::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Blake2b-256 digest of `data`.
pub fn blake2b_256(data: &[u8]) -> [u8; HASH_LENGTH] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake2b_256_of_empty_input() {
        assert_eq!(
            hex::encode(blake2b_256(b"")),
            "0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8"
        );
    }

    #[test]
    fn blake2b_224_of_empty_input() {
        assert_eq!(
            hex::encode(blake2b_224(b"")),
            "836cc68931c2e4e3e838602eca1902591d216837bafddfe6f0c8cb07"
        );
    }

    #[test]
    fn widths_are_independent_functions() {
        let short = blake2b_224(b"conway");
        let long = blake2b_256(b"conway");
        // Blake2b parameterizes the output length, so the 224-bit digest is
        // not a prefix of the 256-bit one.
        assert_ne!(&long[..28], &short[..]);
    }
}
