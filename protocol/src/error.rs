//! Error types for key derivation, codecs, and transaction building.
//!
//! Every fallible operation in the crate returns a [`LedgerError`]. The
//! variants carry the offending field or amount so callers can report the
//! exact cause without re-deriving it.

use thiserror::Error;

use crate::governance::voting::{GovernanceActionId, Voter};

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors produced while deriving keys, decoding primitives, or assembling
/// transactions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// A value could not be decoded or violates its fixed shape
    /// (wrong-length hash, bad address checksum, out-of-range index).
    #[error("malformed {field}: {reason}")]
    MalformedInput {
        /// The field that failed validation.
        field: &'static str,
        /// Human-readable description of the problem.
        reason: String,
    },

    /// A certificate or proposal carries a deposit that differs from the
    /// configured protocol deposit for its action class.
    #[error("invalid deposit for {action}: expected {expected}, got {actual}")]
    InvalidDeposit {
        /// The certificate or proposal kind.
        action: &'static str,
        /// Deposit required by the protocol parameters.
        expected: u64,
        /// Deposit supplied by the caller.
        actual: u64,
    },

    /// Consumed value does not cover outputs, deposits, and fee.
    #[error("insufficient funds: required {required} lovelace, available {available}")]
    InsufficientFunds {
        /// Lovelace required on the produced side.
        required: u64,
        /// Lovelace available on the consumed side.
        available: u64,
    },

    /// A serialized transaction or output value exceeds its protocol limit.
    #[error("{what} size {size} exceeds maximum {max}")]
    SizeLimitExceeded {
        /// What was measured ("transaction" or "output value").
        what: &'static str,
        /// Serialized size in bytes.
        size: u64,
        /// Configured maximum in bytes.
        max: u64,
    },

    /// The same voter voted twice on the same governance action.
    #[error("duplicate vote by {voter} on governance action {action}")]
    DuplicateVote {
        /// The voter casting the duplicate vote.
        voter: Voter,
        /// The governance action voted on.
        action: GovernanceActionId,
    },

    /// A mutation or second `build` was attempted on a finalized builder.
    #[error("transaction builder already finalized")]
    BuilderAlreadyFinalized,

    /// Fee estimation and change sizing did not reach a fixed point.
    #[error("transaction could not be balanced after {passes} passes")]
    UnbalanceableTransaction {
        /// Number of estimation passes attempted.
        passes: usize,
    },

    /// An output carries less lovelace than the minimum UTxO value.
    #[error("output value {provided} is below the minimum UTxO value {required}")]
    OutputBelowMinimum {
        /// Minimum lovelace for the output.
        required: u64,
        /// Lovelace the output actually carries.
        provided: u64,
    },

    /// Consumed value exceeds produced value and no change output absorbs it.
    #[error("transaction is unbalanced: {surplus} left unspent")]
    UnspentSurplus {
        /// Description of the unspent lovelace and assets.
        surplus: String,
    },

    /// A required protocol parameter was never supplied.
    #[error("missing protocol parameter: {0}")]
    MissingParameter(&'static str),

    /// Checked arithmetic on an amount overflowed or underflowed.
    #[error("value overflow while computing {0}")]
    ValueOverflow(&'static str),
}

impl LedgerError {
    /// Shorthand for [`LedgerError::MalformedInput`].
    pub fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            field,
            reason: reason.into(),
        }
    }
}
