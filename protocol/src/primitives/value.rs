//! Amounts: lovelace plus optional native assets.
//!
//! All arithmetic is checked. Values never go negative and an overflowing
//! sum is reported instead of wrapping.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use minicbor::data::Type;
use minicbor::decode::{self, Decode, Decoder};
use minicbor::encode::{self, Encode, Encoder, Write};
use serde::{Serialize, Serializer};

use super::bytes::PolicyId;
use crate::error::{LedgerError, Result};

/// Lovelace amount. 1 ADA = 1,000,000 lovelace.
pub type Coin = u64;

/// Maximum length of a native asset name in bytes.
pub const MAX_ASSET_NAME_LENGTH: usize = 32;

/// Name of a native asset under a policy, 0 to 32 bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetName(Vec<u8>);

impl AssetName {
    pub fn new(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() > MAX_ASSET_NAME_LENGTH {
            return Err(LedgerError::malformed(
                "asset name",
                format!(
                    "at most {} bytes allowed, got {}",
                    MAX_ASSET_NAME_LENGTH,
                    bytes.len()
                ),
            ));
        }
        Ok(Self(bytes))
    }

    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes =
            hex::decode(hex_str).map_err(|e| LedgerError::malformed("asset name", e.to_string()))?;
        Self::new(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl Serialize for AssetName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<C> Encode<C> for AssetName {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut C,
    ) -> std::result::Result<(), encode::Error<W::Error>> {
        e.bytes(&self.0)?;
        Ok(())
    }
}

impl<'b, C> Decode<'b, C> for AssetName {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> std::result::Result<Self, decode::Error> {
        let bytes = d.bytes()?;
        Self::new(bytes.to_vec()).map_err(|e| decode::Error::message(e.to_string()))
    }
}

/// Native asset quantities grouped by policy.
///
/// Zero quantities are never stored, so two bundles holding the same
/// non-zero amounts always compare (and encode) equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MultiAsset(BTreeMap<PolicyId, BTreeMap<AssetName, u64>>);

impl MultiAsset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the quantity of one asset, returning the previous quantity.
    pub fn set(&mut self, policy: PolicyId, name: AssetName, amount: u64) -> Option<u64> {
        if amount == 0 {
            let assets = self.0.get_mut(&policy)?;
            let previous = assets.remove(&name);
            if assets.is_empty() {
                self.0.remove(&policy);
            }
            return previous;
        }
        self.0.entry(policy).or_default().insert(name, amount)
    }

    pub fn get(&self, policy: &PolicyId, name: &AssetName) -> Option<u64> {
        self.0.get(policy).and_then(|assets| assets.get(name)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct assets across all policies.
    pub fn asset_count(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PolicyId, &AssetName, u64)> {
        self.0
            .iter()
            .flat_map(|(policy, assets)| assets.iter().map(move |(name, qty)| (policy, name, *qty)))
    }

    pub fn checked_add(&self, other: &MultiAsset) -> Result<MultiAsset> {
        let mut sum = self.clone();
        for (policy, name, qty) in other.iter() {
            let current = sum.get(policy, name).unwrap_or(0);
            let total = current
                .checked_add(qty)
                .ok_or(LedgerError::ValueOverflow("multi-asset sum"))?;
            sum.set(*policy, name.clone(), total);
        }
        Ok(sum)
    }

    /// `self - other`, or `None` when any asset would go negative.
    pub fn checked_sub(&self, other: &MultiAsset) -> Option<MultiAsset> {
        let mut diff = self.clone();
        for (policy, name, qty) in other.iter() {
            let current = diff.get(policy, name).unwrap_or(0);
            diff.set(*policy, name.clone(), current.checked_sub(qty)?);
        }
        Some(diff)
    }
}

impl<C> Encode<C> for MultiAsset {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> std::result::Result<(), encode::Error<W::Error>> {
        e.map(self.0.len() as u64)?;
        for (policy, assets) in &self.0 {
            policy.encode(e, ctx)?;
            e.map(assets.len() as u64)?;
            for (name, qty) in assets {
                name.encode(e, ctx)?;
                e.u64(*qty)?;
            }
        }
        Ok(())
    }
}

impl<'b, C> Decode<'b, C> for MultiAsset {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> std::result::Result<Self, decode::Error> {
        let policies = d
            .map()?
            .ok_or_else(|| decode::Error::message("indefinite multi-asset map"))?;
        let mut bundle = MultiAsset::new();
        let mut seen_policies = BTreeSet::new();
        for _ in 0..policies {
            let policy = PolicyId::decode(d, ctx)?;
            if !seen_policies.insert(policy) {
                return Err(decode::Error::message("duplicate policy id in multi-asset map"));
            }
            let assets = d
                .map()?
                .ok_or_else(|| decode::Error::message("indefinite asset map"))?;
            let mut seen_names = BTreeSet::new();
            for _ in 0..assets {
                let name = AssetName::decode(d, ctx)?;
                if !seen_names.insert(name.clone()) {
                    return Err(decode::Error::message("duplicate asset name in multi-asset map"));
                }
                let qty = d.u64()?;
                bundle.set(policy, name, qty);
            }
        }
        Ok(bundle)
    }
}

/// Lovelace plus native assets carried by an output or consumed by inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Value {
    pub coin: Coin,
    #[serde(skip_serializing_if = "MultiAsset::is_empty")]
    pub multiasset: MultiAsset,
}

impl Value {
    pub fn new(coin: Coin) -> Self {
        Self {
            coin,
            multiasset: MultiAsset::new(),
        }
    }

    pub fn new_with_assets(coin: Coin, multiasset: MultiAsset) -> Self {
        Self { coin, multiasset }
    }

    pub fn is_zero(&self) -> bool {
        self.coin == 0 && self.multiasset.is_empty()
    }

    pub fn checked_add(&self, other: &Value) -> Result<Value> {
        let coin = self
            .coin
            .checked_add(other.coin)
            .ok_or(LedgerError::ValueOverflow("lovelace sum"))?;
        Ok(Value {
            coin,
            multiasset: self.multiasset.checked_add(&other.multiasset)?,
        })
    }

    /// `self - other`, or `None` when lovelace or any asset would go negative.
    pub fn checked_sub(&self, other: &Value) -> Option<Value> {
        Some(Value {
            coin: self.coin.checked_sub(other.coin)?,
            multiasset: self.multiasset.checked_sub(&other.multiasset)?,
        })
    }

    /// Encoded size of this value in bytes.
    pub fn encoded_size(&self) -> usize {
        minicbor::to_vec(self)
            .expect("encoding into a Vec cannot fail")
            .len()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} lovelace", self.coin)?;
        let assets = self.multiasset.asset_count();
        if assets > 0 {
            write!(f, " + {} asset(s)", assets)?;
        }
        Ok(())
    }
}

impl<C> Encode<C> for Value {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> std::result::Result<(), encode::Error<W::Error>> {
        if self.multiasset.is_empty() {
            e.u64(self.coin)?;
            return Ok(());
        }
        e.array(2)?.u64(self.coin)?;
        self.multiasset.encode(e, ctx)
    }
}

impl<'b, C> Decode<'b, C> for Value {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> std::result::Result<Self, decode::Error> {
        match d.datatype()? {
            Type::Array => {
                if d.array()? != Some(2) {
                    return Err(decode::Error::message("value must be a 2-element array"));
                }
                let coin = d.u64()?;
                let multiasset = MultiAsset::decode(d, ctx)?;
                Ok(Value { coin, multiasset })
            }
            _ => Ok(Value::new(d.u64()?)),
        }
    }
}
