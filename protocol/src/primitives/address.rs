//! Shelley-era addresses (CIP-19) and their bech32 text form.
//!
//! ```text
//! header byte = address type (high nibble) | network id (low nibble)
//! base        = header | payment credential (28) | stake credential (28)
//! enterprise  = header | payment credential (28)
//! reward      = header | stake credential (28)
//! ```
//!
//! Pointer and Byron addresses are not supported and fail decoding.

use std::fmt;
use std::str::FromStr;

use bech32::primitives::decode::CheckedHrpstring;
use bech32::{Bech32, Hrp};
use minicbor::decode::{self, Decode, Decoder};
use minicbor::encode::{self, Encode, Encoder, Write};
use serde::{Serialize, Serializer};

use super::bytes::{Ed25519KeyHash, ScriptHash};
use super::credential::Credential;
use crate::config::{
    KEY_HASH_LENGTH, MAINNET_ADDRESS_HRP, MAINNET_NETWORK_ID, MAINNET_REWARD_HRP,
    TESTNET_ADDRESS_HRP, TESTNET_REWARD_HRP,
};
use crate::error::{LedgerError, Result};

/// Header type nibbles.
const TYPE_BASE_MIN: u8 = 0b0000;
const TYPE_BASE_MAX: u8 = 0b0011;
const TYPE_ENTERPRISE_KEY: u8 = 0b0110;
const TYPE_ENTERPRISE_SCRIPT: u8 = 0b0111;
const TYPE_REWARD_KEY: u8 = 0b1110;
const TYPE_REWARD_SCRIPT: u8 = 0b1111;

/// A stake (reward) address. Used as the deposit return account of
/// governance proposals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RewardAddress {
    network: u8,
    stake: Credential,
}

impl RewardAddress {
    pub fn new(network: u8, stake: Credential) -> Result<Self> {
        check_network(network)?;
        Ok(Self { network, stake })
    }

    pub fn network_id(&self) -> u8 {
        self.network
    }

    pub fn stake_credential(&self) -> &Credential {
        &self.stake
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let kind = if self.stake.is_script() {
            TYPE_REWARD_SCRIPT
        } else {
            TYPE_REWARD_KEY
        };
        let mut out = Vec::with_capacity(1 + KEY_HASH_LENGTH);
        out.push(kind << 4 | self.network);
        out.extend_from_slice(self.stake.hash_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match Address::from_bytes(bytes)? {
            Address::Reward(reward) => Ok(reward),
            _ => Err(LedgerError::malformed(
                "reward address",
                "header does not describe a reward address",
            )),
        }
    }

    pub fn to_bech32(&self) -> String {
        encode_bech32(reward_hrp(self.network), &self.to_bytes())
    }

    pub fn from_bech32(s: &str) -> Result<Self> {
        match Address::from_bech32(s)? {
            Address::Reward(reward) => Ok(reward),
            _ => Err(LedgerError::malformed(
                "reward address",
                "expected a stake address",
            )),
        }
    }
}

/// A Shelley address that can receive or own funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Address {
    /// Payment credential plus a stake credential.
    Base {
        network: u8,
        payment: Credential,
        stake: Credential,
    },
    /// Payment credential only; funds do not participate in staking.
    Enterprise { network: u8, payment: Credential },
    /// Reward account.
    Reward(RewardAddress),
}

impl Address {
    pub fn base(network: u8, payment: Credential, stake: Credential) -> Result<Self> {
        check_network(network)?;
        Ok(Self::Base {
            network,
            payment,
            stake,
        })
    }

    pub fn enterprise(network: u8, payment: Credential) -> Result<Self> {
        check_network(network)?;
        Ok(Self::Enterprise { network, payment })
    }

    pub fn network_id(&self) -> u8 {
        match self {
            Self::Base { network, .. } | Self::Enterprise { network, .. } => *network,
            Self::Reward(reward) => reward.network,
        }
    }

    /// The credential that must sign to spend from this address. Reward
    /// addresses hold no spendable outputs and return `None`.
    pub fn payment_credential(&self) -> Option<&Credential> {
        match self {
            Self::Base { payment, .. } | Self::Enterprise { payment, .. } => Some(payment),
            Self::Reward(_) => None,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Base {
                network,
                payment,
                stake,
            } => {
                let kind = (payment.is_script() as u8) | (stake.is_script() as u8) << 1;
                let mut out = Vec::with_capacity(1 + 2 * KEY_HASH_LENGTH);
                out.push(kind << 4 | network);
                out.extend_from_slice(payment.hash_bytes());
                out.extend_from_slice(stake.hash_bytes());
                out
            }
            Self::Enterprise { network, payment } => {
                let kind = if payment.is_script() {
                    TYPE_ENTERPRISE_SCRIPT
                } else {
                    TYPE_ENTERPRISE_KEY
                };
                let mut out = Vec::with_capacity(1 + KEY_HASH_LENGTH);
                out.push(kind << 4 | network);
                out.extend_from_slice(payment.hash_bytes());
                out
            }
            Self::Reward(reward) => reward.to_bytes(),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (&header, payload) = bytes
            .split_first()
            .ok_or_else(|| LedgerError::malformed("address", "empty address bytes"))?;
        let kind = header >> 4;
        let network = header & 0x0F;

        match kind {
            TYPE_BASE_MIN..=TYPE_BASE_MAX => {
                expect_len(payload, 2 * KEY_HASH_LENGTH)?;
                let payment = credential(&payload[..KEY_HASH_LENGTH], kind & 0b01 != 0)?;
                let stake = credential(&payload[KEY_HASH_LENGTH..], kind & 0b10 != 0)?;
                Ok(Self::Base {
                    network,
                    payment,
                    stake,
                })
            }
            TYPE_ENTERPRISE_KEY | TYPE_ENTERPRISE_SCRIPT => {
                expect_len(payload, KEY_HASH_LENGTH)?;
                let payment = credential(payload, kind == TYPE_ENTERPRISE_SCRIPT)?;
                Ok(Self::Enterprise { network, payment })
            }
            TYPE_REWARD_KEY | TYPE_REWARD_SCRIPT => {
                expect_len(payload, KEY_HASH_LENGTH)?;
                let stake = credential(payload, kind == TYPE_REWARD_SCRIPT)?;
                Ok(Self::Reward(RewardAddress { network, stake }))
            }
            other => Err(LedgerError::malformed(
                "address",
                format!("unsupported address type {}", other),
            )),
        }
    }

    pub fn to_bech32(&self) -> String {
        let hrp = match self {
            Self::Reward(reward) => reward_hrp(reward.network),
            _ => address_hrp(self.network_id()),
        };
        encode_bech32(hrp, &self.to_bytes())
    }

    /// Decodes a bech32 address, checking the checksum and that the prefix
    /// agrees with the header's address type and network. Bech32m checksums
    /// are rejected.
    pub fn from_bech32(s: &str) -> Result<Self> {
        let checked = CheckedHrpstring::new::<Bech32>(s)
            .map_err(|e| LedgerError::malformed("address", e.to_string()))?;
        let hrp = checked.hrp();
        let data: Vec<u8> = checked.byte_iter().collect();
        let address = Self::from_bytes(&data)?;

        let expected = match &address {
            Self::Reward(reward) => reward_hrp(reward.network),
            other => address_hrp(other.network_id()),
        };
        let got = hrp.to_lowercase();
        if got != expected {
            return Err(LedgerError::malformed(
                "address",
                format!("prefix '{}' does not match expected '{}'", got, expected),
            ));
        }
        Ok(address)
    }
}

impl From<RewardAddress> for Address {
    fn from(reward: RewardAddress) -> Self {
        Self::Reward(reward)
    }
}

impl FromStr for Address {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_bech32(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_bech32())
    }
}

impl fmt::Display for RewardAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_bech32())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_bech32())
    }
}

impl Serialize for RewardAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_bech32())
    }
}

impl<C> Encode<C> for Address {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut C,
    ) -> std::result::Result<(), encode::Error<W::Error>> {
        e.bytes(&self.to_bytes())?;
        Ok(())
    }
}

impl<'b, C> Decode<'b, C> for Address {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> std::result::Result<Self, decode::Error> {
        let bytes = d.bytes()?;
        Self::from_bytes(bytes).map_err(|e| decode::Error::message(e.to_string()))
    }
}

impl<C> Encode<C> for RewardAddress {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut C,
    ) -> std::result::Result<(), encode::Error<W::Error>> {
        e.bytes(&self.to_bytes())?;
        Ok(())
    }
}

fn check_network(network: u8) -> Result<()> {
    if network > 0x0F {
        return Err(LedgerError::malformed(
            "network id",
            format!("must fit in 4 bits, got {}", network),
        ));
    }
    Ok(())
}

fn expect_len(payload: &[u8], expected: usize) -> Result<()> {
    if payload.len() != expected {
        return Err(LedgerError::malformed(
            "address",
            format!(
                "expected {} payload bytes, got {}",
                expected,
                payload.len()
            ),
        ));
    }
    Ok(())
}

fn credential(hash: &[u8], is_script: bool) -> Result<Credential> {
    Ok(if is_script {
        Credential::ScriptHash(ScriptHash::from_bytes(hash)?)
    } else {
        Credential::KeyHash(Ed25519KeyHash::from_bytes(hash)?)
    })
}

fn address_hrp(network: u8) -> &'static str {
    if network == MAINNET_NETWORK_ID {
        MAINNET_ADDRESS_HRP
    } else {
        TESTNET_ADDRESS_HRP
    }
}

fn reward_hrp(network: u8) -> &'static str {
    if network == MAINNET_NETWORK_ID {
        MAINNET_REWARD_HRP
    } else {
        TESTNET_REWARD_HRP
    }
}

fn encode_bech32(hrp: &'static str, data: &[u8]) -> String {
    let hrp = Hrp::parse(hrp).expect("static HRP is valid");
    bech32::encode::<Bech32>(hrp, data).expect("address payloads are far below the bech32 limit")
}
