//! # Protocol Configuration & Constants
//!
//! Network identifiers, address prefixes, derivation constants, and the
//! [`ProtocolParameters`] set the builder prices transactions with.
//!
//! There is deliberately no `Default` for [`ProtocolParameters`]. A wrong
//! deposit or size limit yields a transaction the network rejects, so every
//! value has to be supplied, either through [`ProtocolParametersBuilder`] or
//! from JSON.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::transaction::fees::LinearFee;

// ---------------------------------------------------------------------------
// Network Identifiers
// ---------------------------------------------------------------------------

/// Network id of mainnet, as carried in the address header.
pub const MAINNET_NETWORK_ID: u8 = 1;

/// Network id shared by the public testnets.
pub const TESTNET_NETWORK_ID: u8 = 0;

/// Bech32 prefixes for payment addresses.
pub const MAINNET_ADDRESS_HRP: &str = "addr";
pub const TESTNET_ADDRESS_HRP: &str = "addr_test";

/// Bech32 prefixes for reward (stake) addresses.
pub const MAINNET_REWARD_HRP: &str = "stake";
pub const TESTNET_REWARD_HRP: &str = "stake_test";

// ---------------------------------------------------------------------------
// Hash and Key Lengths
// ---------------------------------------------------------------------------

/// Blake2b-224 digest length: key hashes, script hashes, policy ids.
pub const KEY_HASH_LENGTH: usize = 28;

/// Blake2b-256 digest length: transaction, anchor, and metadata hashes.
pub const HASH_LENGTH: usize = 32;

/// Ed25519 verification key length.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Ed25519 signature length.
pub const SIGNATURE_LENGTH: usize = 64;

/// Extended private key (64) plus chain code (32).
pub const EXTENDED_KEY_LENGTH: usize = 96;

// ---------------------------------------------------------------------------
// Key Derivation
// ---------------------------------------------------------------------------

/// Offset added to an index to select hardened derivation.
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// CIP-1852 purpose.
pub const CIP1852_PURPOSE: u32 = 1852;

/// SLIP-44 coin type of ADA.
pub const CARDANO_COIN_TYPE: u32 = 1815;

/// PBKDF2 rounds of the Icarus master key derivation.
pub const ICARUS_PBKDF2_ROUNDS: u32 = 4096;

// ---------------------------------------------------------------------------
// Transaction Limits
// ---------------------------------------------------------------------------

/// Bytes added to an output's size when computing its minimum lovelace.
pub const MIN_UTXO_OVERHEAD_BYTES: u64 = 160;

/// Fee and change estimation passes before giving up.
pub const MAX_BALANCE_PASSES: usize = 4;

/// Longest URL an anchor may carry.
pub const MAX_ANCHOR_URL_LENGTH: usize = 128;

/// Longest text or byte string allowed in a single metadatum.
pub const MAX_METADATUM_CHUNK: usize = 64;

// ---------------------------------------------------------------------------
// Protocol Parameters
// ---------------------------------------------------------------------------

/// A ratio in `[0, 1]`-style notation, used for execution unit prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitInterval {
    numerator: u64,
    denominator: u64,
}

impl UnitInterval {
    pub fn new(numerator: u64, denominator: u64) -> Result<Self> {
        if denominator == 0 {
            return Err(LedgerError::malformed(
                "unit interval",
                "denominator must be non-zero",
            ));
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    pub fn numerator(&self) -> u64 {
        self.numerator
    }

    pub fn denominator(&self) -> u64 {
        self.denominator
    }
}

/// Prices of script execution units. Carried for completeness; no script
/// costs are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExUnitPrices {
    pub mem_price: UnitInterval,
    pub step_price: UnitInterval,
}

/// The parameter set a transaction is priced and validated against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParameters {
    /// Linear fee: `constant + coefficient * tx_size`.
    pub fee_algo: LinearFee,

    /// Lovelace per byte of an output, including the fixed overhead.
    pub coins_per_utxo_byte: u64,

    pub pool_deposit: u64,

    /// Deposit for registering a stake credential.
    pub key_deposit: u64,

    /// Deposit for registering a DRep.
    pub drep_deposit: u64,

    /// Deposit locked by each governance proposal.
    pub voting_proposal_deposit: u64,

    /// Maximum serialized transaction size in bytes.
    pub max_tx_size: u32,

    /// Maximum serialized size of a single output value in bytes.
    pub max_value_size: u32,

    pub ex_unit_prices: ExUnitPrices,
}

impl ProtocolParameters {
    /// Starts a builder with every field unset.
    pub fn builder() -> ProtocolParametersBuilder {
        ProtocolParametersBuilder::default()
    }

    /// Parses a parameter set from JSON. Every field must be present.
    pub fn from_json(json: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(json)
            .map_err(|e| LedgerError::malformed("protocol parameters", e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("parameters always serialize")
    }

    fn validate(&self) -> Result<()> {
        for (name, price) in [
            ("mem price", self.ex_unit_prices.mem_price),
            ("step price", self.ex_unit_prices.step_price),
        ] {
            if price.denominator == 0 {
                return Err(LedgerError::malformed(
                    "protocol parameters",
                    format!("{} has a zero denominator", name),
                ));
            }
        }
        if self.max_tx_size == 0 || self.max_value_size == 0 {
            return Err(LedgerError::malformed(
                "protocol parameters",
                "size limits must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Fluent builder for [`ProtocolParameters`]. `build` fails with
/// [`LedgerError::MissingParameter`] naming the first unset field.
#[derive(Debug, Clone, Default)]
pub struct ProtocolParametersBuilder {
    fee_algo: Option<LinearFee>,
    coins_per_utxo_byte: Option<u64>,
    pool_deposit: Option<u64>,
    key_deposit: Option<u64>,
    drep_deposit: Option<u64>,
    voting_proposal_deposit: Option<u64>,
    max_tx_size: Option<u32>,
    max_value_size: Option<u32>,
    ex_unit_prices: Option<ExUnitPrices>,
}

impl ProtocolParametersBuilder {
    pub fn fee_algo(mut self, fee_algo: LinearFee) -> Self {
        self.fee_algo = Some(fee_algo);
        self
    }

    pub fn coins_per_utxo_byte(mut self, coins: u64) -> Self {
        self.coins_per_utxo_byte = Some(coins);
        self
    }

    /// Accepts the pre-Babbage per-word price and converts it to per-byte
    /// (eight bytes per word, rounded down).
    pub fn coins_per_utxo_word(mut self, coins: u64) -> Self {
        self.coins_per_utxo_byte = Some(coins / 8);
        self
    }

    pub fn pool_deposit(mut self, deposit: u64) -> Self {
        self.pool_deposit = Some(deposit);
        self
    }

    pub fn key_deposit(mut self, deposit: u64) -> Self {
        self.key_deposit = Some(deposit);
        self
    }

    pub fn drep_deposit(mut self, deposit: u64) -> Self {
        self.drep_deposit = Some(deposit);
        self
    }

    pub fn voting_proposal_deposit(mut self, deposit: u64) -> Self {
        self.voting_proposal_deposit = Some(deposit);
        self
    }

    pub fn max_tx_size(mut self, size: u32) -> Self {
        self.max_tx_size = Some(size);
        self
    }

    pub fn max_value_size(mut self, size: u32) -> Self {
        self.max_value_size = Some(size);
        self
    }

    pub fn ex_unit_prices(mut self, prices: ExUnitPrices) -> Self {
        self.ex_unit_prices = Some(prices);
        self
    }

    pub fn build(self) -> Result<ProtocolParameters> {
        let params = ProtocolParameters {
            fee_algo: self
                .fee_algo
                .ok_or(LedgerError::MissingParameter("fee_algo"))?,
            coins_per_utxo_byte: self
                .coins_per_utxo_byte
                .ok_or(LedgerError::MissingParameter("coins_per_utxo_byte"))?,
            pool_deposit: self
                .pool_deposit
                .ok_or(LedgerError::MissingParameter("pool_deposit"))?,
            key_deposit: self
                .key_deposit
                .ok_or(LedgerError::MissingParameter("key_deposit"))?,
            drep_deposit: self
                .drep_deposit
                .ok_or(LedgerError::MissingParameter("drep_deposit"))?,
            voting_proposal_deposit: self
                .voting_proposal_deposit
                .ok_or(LedgerError::MissingParameter("voting_proposal_deposit"))?,
            max_tx_size: self
                .max_tx_size
                .ok_or(LedgerError::MissingParameter("max_tx_size"))?,
            max_value_size: self
                .max_value_size
                .ok_or(LedgerError::MissingParameter("max_value_size"))?,
            ex_unit_prices: self
                .ex_unit_prices
                .ok_or(LedgerError::MissingParameter("ex_unit_prices"))?,
        };
        params.validate()?;
        Ok(params)
    }
}
