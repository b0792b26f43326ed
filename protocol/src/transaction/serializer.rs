//! Canonical binary and structured output.
//!
//! The binary form is the chain's CBOR transaction format. It is fully
//! determined by the transaction's content: all maps are ordered and every
//! length is definite, so equal transactions always encode to equal bytes.
//! Fee estimation relies on this.
//!
//! The structured form is a JSON tree for logs and inspection. It is not
//! meant to be parsed back into a [`Transaction`].

use minicbor::{Decode, Decoder, Encode};
use serde_json::json;

use super::fees::transaction_size;
use super::types::Transaction;
use crate::error::{LedgerError, Result};

/// Canonical encoding of the full transaction.
pub fn to_canonical_bytes(tx: &Transaction) -> Vec<u8> {
    encode(tx)
}

/// Hex of [`to_canonical_bytes`], the form submission tools accept.
pub fn to_hex(tx: &Transaction) -> String {
    hex::encode(to_canonical_bytes(tx))
}

/// Human-readable tree of the transaction with its id and size.
pub fn to_structured(tx: &Transaction) -> serde_json::Value {
    json!({
        "hash": tx.hash().to_hex(),
        "size": transaction_size(tx),
        "transaction": serde_json::to_value(tx).expect("transaction types serialize to JSON"),
    })
}

pub fn to_json_pretty(tx: &Transaction) -> String {
    serde_json::to_string_pretty(&to_structured(tx)).expect("JSON values always serialize")
}

/// Decodes a single primitive value, rejecting trailing bytes.
pub fn from_canonical_bytes<'b, T: Decode<'b, ()>>(
    bytes: &'b [u8],
    field: &'static str,
) -> Result<T> {
    let mut decoder = Decoder::new(bytes);
    let value = decoder
        .decode::<T>()
        .map_err(|e| LedgerError::malformed(field, e.to_string()))?;
    if decoder.position() != bytes.len() {
        return Err(LedgerError::malformed(
            field,
            format!("{} trailing bytes", bytes.len() - decoder.position()),
        ));
    }
    Ok(value)
}

/// [`from_canonical_bytes`] over a hex string.
pub fn from_hex<T>(hex_str: &str, field: &'static str) -> Result<T>
where
    T: for<'b> Decode<'b, ()>,
{
    let bytes = hex::decode(hex_str).map_err(|e| LedgerError::malformed(field, e.to_string()))?;
    from_canonical_bytes(&bytes, field)
}

pub(crate) fn encode<T: Encode<()>>(value: &T) -> Vec<u8> {
    minicbor::to_vec(value).expect("encoding into a Vec cannot fail")
}

pub(crate) fn encoded_len<T: Encode<()>>(value: &T) -> usize {
    encode(value).len()
}
