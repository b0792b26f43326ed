//! Fee and size calculation.
//!
//! Both the fee and the minimum output value are pure functions of encoded
//! size and protocol parameters, so they must be recomputed whenever the
//! transaction content changes.
//!
//! ```text
//! fee         = constant + coefficient * tx_size
//! min_utxo    = (160 + output_size) * coins_per_utxo_byte
//! ```

use serde::{Deserialize, Serialize};

use super::metadata::AuxiliaryData;
use super::serializer::{encoded_len, to_canonical_bytes};
use super::types::{Transaction, TransactionBody, TransactionOutput, WitnessSet};
use crate::config::MIN_UTXO_OVERHEAD_BYTES;
use crate::error::{LedgerError, Result};
use crate::primitives::Coin;

/// Linear fee parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearFee {
    /// Lovelace per byte.
    pub coefficient: u64,
    /// Flat lovelace per transaction.
    pub constant: u64,
}

impl LinearFee {
    pub fn new(coefficient: u64, constant: u64) -> Self {
        Self {
            coefficient,
            constant,
        }
    }

    pub fn fee_for_size(&self, size: usize) -> Result<Coin> {
        (size as u64)
            .checked_mul(self.coefficient)
            .and_then(|variable| variable.checked_add(self.constant))
            .ok_or(LedgerError::ValueOverflow("linear fee"))
    }
}

/// Encoded size of a transaction in bytes.
pub fn transaction_size(tx: &Transaction) -> usize {
    to_canonical_bytes(tx).len()
}

/// Fee for `tx` exactly as encoded, witnesses included.
pub fn min_fee(tx: &Transaction, fee_algo: &LinearFee) -> Result<Coin> {
    fee_algo.fee_for_size(transaction_size(tx))
}

/// Fee for `body` once it carries `signers` verification key witnesses.
///
/// The body's own `fee` field is encoded as given, so callers estimating
/// iteratively should pass the candidate fee in the body.
pub fn estimate_fee(
    body: &TransactionBody,
    signers: usize,
    auxiliary_data: Option<&AuxiliaryData>,
    fee_algo: &LinearFee,
) -> Result<Coin> {
    let draft = Transaction::new(
        body.clone(),
        WitnessSet::placeholders(signers),
        auxiliary_data.cloned(),
    );
    min_fee(&draft, fee_algo)
}

/// Minimum lovelace `output` must carry.
pub fn min_ada_required(output: &TransactionOutput, coins_per_utxo_byte: u64) -> Result<Coin> {
    (encoded_len(output) as u64 + MIN_UTXO_OVERHEAD_BYTES)
        .checked_mul(coins_per_utxo_byte)
        .ok_or(LedgerError::ValueOverflow("minimum utxo value"))
}
