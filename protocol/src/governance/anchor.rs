//! Anchors: pointers to off-chain metadata.

use minicbor::decode::{self, Decode, Decoder};
use minicbor::encode::{self, Encode, Encoder, Write};
use serde::Serialize;

use crate::config::MAX_ANCHOR_URL_LENGTH;
use crate::error::{LedgerError, Result};
use crate::primitives::AnchorDataHash;

/// A URL plus the hash of the document it serves. Encoded as `[url, hash]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Anchor {
    url: String,
    data_hash: AnchorDataHash,
}

impl Anchor {
    /// Fails if the URL is empty or longer than 128 bytes.
    pub fn new(url: impl Into<String>, data_hash: AnchorDataHash) -> Result<Self> {
        let url = url.into();
        if url.is_empty() || url.len() > MAX_ANCHOR_URL_LENGTH {
            return Err(LedgerError::malformed(
                "anchor url",
                format!(
                    "length must be 1..={} bytes, got {}",
                    MAX_ANCHOR_URL_LENGTH,
                    url.len()
                ),
            ));
        }
        Ok(Self { url, data_hash })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn data_hash(&self) -> &AnchorDataHash {
        &self.data_hash
    }
}

impl<C> Encode<C> for Anchor {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> std::result::Result<(), encode::Error<W::Error>> {
        e.array(2)?.str(&self.url)?;
        self.data_hash.encode(e, ctx)
    }
}

impl<'b, C> Decode<'b, C> for Anchor {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> std::result::Result<Self, decode::Error> {
        if d.array()? != Some(2) {
            return Err(decode::Error::message("anchor must be a 2-element array"));
        }
        let url = d.str()?.to_string();
        let data_hash = AnchorDataHash::decode(d, ctx)?;
        Self::new(url, data_hash).map_err(|e| decode::Error::message(e.to_string()))
    }
}

/// Encodes `Some(x)` as `x` and `None` as CBOR null.
pub(crate) fn encode_nullable<C, W: Write, T: Encode<C>>(
    value: Option<&T>,
    e: &mut Encoder<W>,
    ctx: &mut C,
) -> std::result::Result<(), encode::Error<W::Error>> {
    match value {
        Some(value) => value.encode(e, ctx),
        None => {
            e.null()?;
            Ok(())
        }
    }
}
