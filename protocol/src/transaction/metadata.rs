//! Transaction metadata (auxiliary data).
//!
//! Metadata is a map from unsigned labels to [`Metadatum`] trees. The body
//! commits to it through the blake2b-256 hash of its encoding.

use std::collections::BTreeMap;

use minicbor::encode::{self, Encode, Encoder, Write};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::config::MAX_METADATUM_CHUNK;
use crate::crypto::hash::blake2b_256;
use crate::error::{LedgerError, Result};
use crate::primitives::AuxiliaryDataHash;

/// A metadata value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Metadatum {
    Int(i64),
    Bytes(Vec<u8>),
    Text(String),
    List(Vec<Metadatum>),
    /// Key order is preserved as inserted. Keys must be distinct.
    Map(Vec<(Metadatum, Metadatum)>),
}

impl Metadatum {
    /// Text of at most 64 bytes.
    pub fn text(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        check_chunk("metadata text", s.len())?;
        Ok(Self::Text(s))
    }

    /// Byte string of at most 64 bytes.
    pub fn bytes(b: Vec<u8>) -> Result<Self> {
        check_chunk("metadata bytes", b.len())?;
        Ok(Self::Bytes(b))
    }

    /// Checks chunk limits throughout a tree assembled by hand.
    fn validate(&self) -> Result<()> {
        match self {
            Self::Int(_) => Ok(()),
            Self::Bytes(b) => check_chunk("metadata bytes", b.len()),
            Self::Text(s) => check_chunk("metadata text", s.len()),
            Self::List(items) => items.iter().try_for_each(Metadatum::validate),
            Self::Map(entries) => {
                for (i, (key, value)) in entries.iter().enumerate() {
                    if entries[..i].iter().any(|(earlier, _)| earlier == key) {
                        return Err(LedgerError::malformed(
                            "metadata map",
                            "duplicate key in metadata map",
                        ));
                    }
                    key.validate()?;
                    value.validate()?;
                }
                Ok(())
            }
        }
    }
}

fn check_chunk(field: &'static str, len: usize) -> Result<()> {
    if len > MAX_METADATUM_CHUNK {
        return Err(LedgerError::malformed(
            field,
            format!("at most {} bytes allowed, got {}", MAX_METADATUM_CHUNK, len),
        ));
    }
    Ok(())
}

impl Serialize for Metadatum {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Bytes(b) => serializer.serialize_str(&format!("0x{}", hex::encode(b))),
            Self::Text(s) => serializer.serialize_str(s),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut seq = serializer.serialize_seq(Some(entries.len()))?;
                for (k, v) in entries {
                    seq.serialize_element(&(k, v))?;
                }
                seq.end()
            }
        }
    }
}

impl<C> Encode<C> for Metadatum {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> std::result::Result<(), encode::Error<W::Error>> {
        match self {
            Self::Int(i) => {
                e.i64(*i)?;
            }
            Self::Bytes(b) => {
                e.bytes(b)?;
            }
            Self::Text(s) => {
                e.str(s)?;
            }
            Self::List(items) => {
                e.array(items.len() as u64)?;
                for item in items {
                    item.encode(e, ctx)?;
                }
            }
            Self::Map(entries) => {
                e.map(entries.len() as u64)?;
                for (k, v) in entries {
                    k.encode(e, ctx)?;
                    v.encode(e, ctx)?;
                }
            }
        }
        Ok(())
    }
}

/// Labelled metadata attached to a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuxiliaryData {
    metadata: BTreeMap<u64, Metadatum>,
}

impl AuxiliaryData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value under `label`, replacing any previous one.
    pub fn insert(&mut self, label: u64, value: Metadatum) -> Result<&mut Self> {
        value.validate()?;
        self.metadata.insert(label, value);
        Ok(self)
    }

    pub fn get(&self, label: u64) -> Option<&Metadatum> {
        self.metadata.get(&label)
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Blake2b-256 of the encoded metadata, as committed to by the body.
    pub fn hash(&self) -> AuxiliaryDataHash {
        let bytes = super::serializer::encode(self);
        AuxiliaryDataHash::new(blake2b_256(&bytes))
    }
}

impl Serialize for AuxiliaryData {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.metadata.len()))?;
        for (label, value) in &self.metadata {
            map.serialize_entry(&label.to_string(), value)?;
        }
        map.end()
    }
}

impl<C> Encode<C> for AuxiliaryData {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> std::result::Result<(), encode::Error<W::Error>> {
        e.map(self.metadata.len() as u64)?;
        for (label, value) in &self.metadata {
            e.u64(*label)?;
            value.encode(e, ctx)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_are_limited_to_64_bytes() {
        assert!(Metadatum::text("a".repeat(64)).is_ok());
        assert!(Metadatum::text("a".repeat(65)).is_err());
        assert!(Metadatum::bytes(vec![0; 65]).is_err());
    }

    #[test]
    fn insert_validates_nested_values() {
        let mut aux = AuxiliaryData::new();
        let nested = Metadatum::List(vec![Metadatum::Text("x".repeat(70))]);
        assert!(aux.insert(674, nested).is_err());
        assert!(aux.is_empty());
    }

    #[test]
    fn duplicate_map_keys_are_rejected() {
        let mut aux = AuxiliaryData::new();
        let map = Metadatum::Map(vec![
            (Metadatum::Int(1), Metadatum::Text("a".into())),
            (Metadatum::Int(2), Metadatum::Text("b".into())),
            (Metadatum::Int(1), Metadatum::Text("c".into())),
        ]);
        let err = aux.insert(674, map).unwrap_err();
        assert!(matches!(err, LedgerError::MalformedInput { field: "metadata map", .. }));
        assert!(aux.is_empty());

        let nested = Metadatum::List(vec![Metadatum::Map(vec![
            (Metadatum::Text("k".into()), Metadatum::Int(1)),
            (Metadatum::Text("k".into()), Metadatum::Int(2)),
        ])]);
        assert!(aux.insert(674, nested).is_err());

        let distinct = Metadatum::Map(vec![
            (Metadatum::Int(1), Metadatum::Int(1)),
            (Metadatum::Text("1".into()), Metadatum::Int(1)),
        ]);
        assert!(aux.insert(674, distinct).is_ok());
    }

    #[test]
    fn encoding_and_hash() {
        let mut aux = AuxiliaryData::new();
        aux.insert(674, Metadatum::text("hi").unwrap()).unwrap();
        let bytes = minicbor::to_vec(&aux).unwrap();
        // {674: "hi"}
        assert_eq!(bytes, vec![0xa1, 0x19, 0x02, 0xa2, 0x62, b'h', b'i']);
        assert_eq!(aux.hash().as_bytes(), &blake2b_256(&bytes));
    }

    #[test]
    fn structured_form_uses_string_labels() {
        let mut aux = AuxiliaryData::new();
        aux.insert(1, Metadatum::Int(-5)).unwrap();
        aux.insert(2, Metadatum::bytes(vec![0xde, 0xad]).unwrap()).unwrap();
        let json = serde_json::to_value(&aux).unwrap();
        assert_eq!(json["1"], -5);
        assert_eq!(json["2"], "0xdead");
    }
}
