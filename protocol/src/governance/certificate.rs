//! Certificates: stake registration and delegation, DRep lifecycle, and
//! vote delegation.
//!
//! Constructors check deposits against the [`ProtocolParameters`] they are
//! given. [`CertificatesBuilder`] re-checks every certificate it accepts, so
//! a variant assembled by hand with a wrong deposit is still rejected before
//! it reaches a transaction.
//!
//! ```text
//! stake_registration       [7,  cred, coin]
//! stake_deregistration     [8,  cred, coin]
//! stake_delegation         [2,  cred, pool]
//! vote_delegation          [9,  cred, drep]
//! stake_vote_reg_deleg     [13, cred, pool, drep, coin]
//! drep_registration        [16, cred, coin, anchor / null]
//! drep_deregistration      [17, cred, coin]
//! drep_update              [18, cred, anchor / null]
//! ```

use std::fmt;

use minicbor::encode::{self, Encode, Encoder, Write};
use serde::Serialize;
use tracing::debug;

use super::anchor::{encode_nullable, Anchor};
use crate::config::ProtocolParameters;
use crate::error::{LedgerError, Result};
use crate::primitives::{Coin, Credential, Ed25519KeyHash, ScriptHash};

/// Delegate representative a stake credential delegates its votes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "type", content = "hash", rename_all = "snake_case")]
pub enum DRep {
    KeyHash(Ed25519KeyHash),
    ScriptHash(ScriptHash),
    /// Predefined DRep that abstains on every action.
    AlwaysAbstain,
    /// Predefined DRep that votes no-confidence on every action.
    AlwaysNoConfidence,
}

impl DRep {
    /// The DRep whose key or script the credential names.
    pub fn from_credential(credential: &Credential) -> Self {
        match credential {
            Credential::KeyHash(hash) => Self::KeyHash(*hash),
            Credential::ScriptHash(hash) => Self::ScriptHash(*hash),
        }
    }
}

impl fmt::Display for DRep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyHash(hash) => write!(f, "drep-keyhash:{}", hash),
            Self::ScriptHash(hash) => write!(f, "drep-scripthash:{}", hash),
            Self::AlwaysAbstain => f.write_str("always-abstain"),
            Self::AlwaysNoConfidence => f.write_str("always-no-confidence"),
        }
    }
}

impl<C> Encode<C> for DRep {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> std::result::Result<(), encode::Error<W::Error>> {
        match self {
            Self::KeyHash(hash) => {
                e.array(2)?.u8(0)?;
                hash.encode(e, ctx)
            }
            Self::ScriptHash(hash) => {
                e.array(2)?.u8(1)?;
                hash.encode(e, ctx)
            }
            Self::AlwaysAbstain => {
                e.array(1)?.u8(2)?;
                Ok(())
            }
            Self::AlwaysNoConfidence => {
                e.array(1)?.u8(3)?;
                Ok(())
            }
        }
    }
}

/// A ledger certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Certificate {
    StakeRegistration {
        stake_credential: Credential,
        deposit: Coin,
    },
    StakeDeregistration {
        stake_credential: Credential,
        deposit: Coin,
    },
    StakeDelegation {
        stake_credential: Credential,
        pool_keyhash: Ed25519KeyHash,
    },
    VoteDelegation {
        stake_credential: Credential,
        drep: DRep,
    },
    StakeVoteRegistrationAndDelegation {
        stake_credential: Credential,
        pool_keyhash: Ed25519KeyHash,
        drep: DRep,
        deposit: Coin,
    },
    #[serde(rename = "drep_registration")]
    DRepRegistration {
        voting_credential: Credential,
        deposit: Coin,
        anchor: Option<Anchor>,
    },
    #[serde(rename = "drep_deregistration")]
    DRepDeregistration {
        voting_credential: Credential,
        deposit: Coin,
    },
    #[serde(rename = "drep_update")]
    DRepUpdate {
        voting_credential: Credential,
        anchor: Option<Anchor>,
    },
}

impl Certificate {
    pub fn stake_registration(
        params: &ProtocolParameters,
        stake_credential: Credential,
        deposit: Coin,
    ) -> Result<Self> {
        let cert = Self::StakeRegistration {
            stake_credential,
            deposit,
        };
        cert.validate(params)?;
        Ok(cert)
    }

    pub fn stake_deregistration(
        params: &ProtocolParameters,
        stake_credential: Credential,
        deposit: Coin,
    ) -> Result<Self> {
        let cert = Self::StakeDeregistration {
            stake_credential,
            deposit,
        };
        cert.validate(params)?;
        Ok(cert)
    }

    pub fn stake_delegation(stake_credential: Credential, pool_keyhash: Ed25519KeyHash) -> Self {
        Self::StakeDelegation {
            stake_credential,
            pool_keyhash,
        }
    }

    pub fn vote_delegation(stake_credential: Credential, drep: DRep) -> Self {
        Self::VoteDelegation {
            stake_credential,
            drep,
        }
    }

    /// Registers a stake credential and delegates both stake and votes in
    /// one certificate.
    pub fn stake_vote_registration_and_delegation(
        params: &ProtocolParameters,
        stake_credential: Credential,
        pool_keyhash: Ed25519KeyHash,
        drep: DRep,
        deposit: Coin,
    ) -> Result<Self> {
        let cert = Self::StakeVoteRegistrationAndDelegation {
            stake_credential,
            pool_keyhash,
            drep,
            deposit,
        };
        cert.validate(params)?;
        Ok(cert)
    }

    pub fn drep_registration(
        params: &ProtocolParameters,
        voting_credential: Credential,
        deposit: Coin,
        anchor: Option<Anchor>,
    ) -> Result<Self> {
        let cert = Self::DRepRegistration {
            voting_credential,
            deposit,
            anchor,
        };
        cert.validate(params)?;
        Ok(cert)
    }

    /// The caller is responsible for the DRep having been registered; chain
    /// state is not consulted.
    pub fn drep_deregistration(
        params: &ProtocolParameters,
        voting_credential: Credential,
        deposit: Coin,
    ) -> Result<Self> {
        let cert = Self::DRepDeregistration {
            voting_credential,
            deposit,
        };
        cert.validate(params)?;
        Ok(cert)
    }

    pub fn drep_update(voting_credential: Credential, anchor: Option<Anchor>) -> Self {
        Self::DRepUpdate {
            voting_credential,
            anchor,
        }
    }

    /// Short name used in errors and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StakeRegistration { .. } => "stake registration",
            Self::StakeDeregistration { .. } => "stake deregistration",
            Self::StakeDelegation { .. } => "stake delegation",
            Self::VoteDelegation { .. } => "vote delegation",
            Self::StakeVoteRegistrationAndDelegation { .. } => {
                "stake vote registration and delegation"
            }
            Self::DRepRegistration { .. } => "drep registration",
            Self::DRepDeregistration { .. } => "drep deregistration",
            Self::DRepUpdate { .. } => "drep update",
        }
    }

    /// The credential that must witness this certificate.
    pub fn credential(&self) -> &Credential {
        match self {
            Self::StakeRegistration {
                stake_credential, ..
            }
            | Self::StakeDeregistration {
                stake_credential, ..
            }
            | Self::StakeDelegation {
                stake_credential, ..
            }
            | Self::VoteDelegation {
                stake_credential, ..
            }
            | Self::StakeVoteRegistrationAndDelegation {
                stake_credential, ..
            } => stake_credential,
            Self::DRepRegistration {
                voting_credential, ..
            }
            | Self::DRepDeregistration {
                voting_credential, ..
            }
            | Self::DRepUpdate {
                voting_credential, ..
            } => voting_credential,
        }
    }

    /// Deposit this certificate locks (paid by the transaction).
    pub fn deposit(&self) -> Coin {
        match self {
            Self::StakeRegistration { deposit, .. }
            | Self::StakeVoteRegistrationAndDelegation { deposit, .. }
            | Self::DRepRegistration { deposit, .. } => *deposit,
            _ => 0,
        }
    }

    /// Deposit this certificate returns (available to the transaction).
    pub fn refund(&self) -> Coin {
        match self {
            Self::StakeDeregistration { deposit, .. }
            | Self::DRepDeregistration { deposit, .. } => *deposit,
            _ => 0,
        }
    }

    /// Checks the carried deposit against the configured amount for this
    /// certificate class.
    pub fn validate(&self, params: &ProtocolParameters) -> Result<()> {
        let (expected, actual) = match self {
            Self::StakeRegistration { deposit, .. }
            | Self::StakeDeregistration { deposit, .. }
            | Self::StakeVoteRegistrationAndDelegation { deposit, .. } => {
                (params.key_deposit, *deposit)
            }
            Self::DRepRegistration { deposit, .. } | Self::DRepDeregistration { deposit, .. } => {
                (params.drep_deposit, *deposit)
            }
            Self::StakeDelegation { .. } | Self::VoteDelegation { .. } | Self::DRepUpdate { .. } => {
                return Ok(())
            }
        };
        if expected != actual {
            return Err(LedgerError::InvalidDeposit {
                action: self.kind(),
                expected,
                actual,
            });
        }
        Ok(())
    }
}

impl<C> Encode<C> for Certificate {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> std::result::Result<(), encode::Error<W::Error>> {
        match self {
            Self::StakeRegistration {
                stake_credential,
                deposit,
            } => {
                e.array(3)?.u8(7)?;
                stake_credential.encode(e, ctx)?;
                e.u64(*deposit)?;
            }
            Self::StakeDeregistration {
                stake_credential,
                deposit,
            } => {
                e.array(3)?.u8(8)?;
                stake_credential.encode(e, ctx)?;
                e.u64(*deposit)?;
            }
            Self::StakeDelegation {
                stake_credential,
                pool_keyhash,
            } => {
                e.array(3)?.u8(2)?;
                stake_credential.encode(e, ctx)?;
                pool_keyhash.encode(e, ctx)?;
            }
            Self::VoteDelegation {
                stake_credential,
                drep,
            } => {
                e.array(3)?.u8(9)?;
                stake_credential.encode(e, ctx)?;
                drep.encode(e, ctx)?;
            }
            Self::StakeVoteRegistrationAndDelegation {
                stake_credential,
                pool_keyhash,
                drep,
                deposit,
            } => {
                e.array(5)?.u8(13)?;
                stake_credential.encode(e, ctx)?;
                pool_keyhash.encode(e, ctx)?;
                drep.encode(e, ctx)?;
                e.u64(*deposit)?;
            }
            Self::DRepRegistration {
                voting_credential,
                deposit,
                anchor,
            } => {
                e.array(4)?.u8(16)?;
                voting_credential.encode(e, ctx)?;
                e.u64(*deposit)?;
                encode_nullable(anchor.as_ref(), e, ctx)?;
            }
            Self::DRepDeregistration {
                voting_credential,
                deposit,
            } => {
                e.array(3)?.u8(17)?;
                voting_credential.encode(e, ctx)?;
                e.u64(*deposit)?;
            }
            Self::DRepUpdate {
                voting_credential,
                anchor,
            } => {
                e.array(3)?.u8(18)?;
                voting_credential.encode(e, ctx)?;
                encode_nullable(anchor.as_ref(), e, ctx)?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CertificatesBuilder
// ---------------------------------------------------------------------------

/// Ordered, validated set of certificates for one transaction.
#[derive(Debug, Clone)]
pub struct CertificatesBuilder {
    params: ProtocolParameters,
    certs: Vec<Certificate>,
}

impl CertificatesBuilder {
    pub fn new(params: &ProtocolParameters) -> Self {
        Self {
            params: params.clone(),
            certs: Vec::new(),
        }
    }

    /// Appends a certificate after checking its deposit.
    pub fn add(&mut self, cert: Certificate) -> Result<&mut Self> {
        cert.validate(&self.params)?;
        debug!(kind = cert.kind(), credential = %cert.credential(), "certificate added");
        self.certs.push(cert);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    pub fn certificates(&self) -> &[Certificate] {
        &self.certs
    }

    /// Sum of deposits locked by the certificates.
    pub fn total_deposits(&self) -> Result<Coin> {
        sum(self.certs.iter().map(Certificate::deposit), "certificate deposits")
    }

    /// Sum of deposits returned by the certificates.
    pub fn total_refunds(&self) -> Result<Coin> {
        sum(self.certs.iter().map(Certificate::refund), "certificate refunds")
    }
}

pub(crate) fn sum(mut amounts: impl Iterator<Item = Coin>, what: &'static str) -> Result<Coin> {
    amounts.try_fold(0u64, |acc, amount| {
        acc.checked_add(amount).ok_or(LedgerError::ValueOverflow(what))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExUnitPrices, UnitInterval};
    use crate::primitives::AnchorDataHash;
    use crate::transaction::fees::LinearFee;

    fn params() -> ProtocolParameters {
        ProtocolParameters::builder()
            .fee_algo(LinearFee::new(44, 155_381))
            .coins_per_utxo_byte(4_310)
            .pool_deposit(500_000_000)
            .key_deposit(2_000_000)
            .drep_deposit(1_000_000)
            .voting_proposal_deposit(500_000_000)
            .max_tx_size(16_384)
            .max_value_size(5_000)
            .ex_unit_prices(ExUnitPrices {
                mem_price: UnitInterval::new(577, 10_000).unwrap(),
                step_price: UnitInterval::new(721, 10_000_000).unwrap(),
            })
            .build()
            .unwrap()
    }

    fn cred(byte: u8) -> Credential {
        Credential::from_keyhash(Ed25519KeyHash::new([byte; 28]))
    }

    #[test]
    fn drep_registration_rejects_wrong_deposit() {
        let err = Certificate::drep_registration(&params(), cred(1), 500_000, None).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InvalidDeposit {
                action: "drep registration",
                expected: 1_000_000,
                actual: 500_000,
            }
        );
    }

    #[test]
    fn drep_deregistration_checks_deposit() {
        assert!(Certificate::drep_deregistration(&params(), cred(1), 1_000_000).is_ok());
        assert!(Certificate::drep_deregistration(&params(), cred(1), 2_000_000).is_err());
    }

    #[test]
    fn stake_certificates_use_key_deposit() {
        assert!(Certificate::stake_registration(&params(), cred(2), 2_000_000).is_ok());
        let err = Certificate::stake_vote_registration_and_delegation(
            &params(),
            cred(2),
            Ed25519KeyHash::new([9; 28]),
            DRep::AlwaysAbstain,
            1_000_000,
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidDeposit { expected: 2_000_000, .. }));
    }

    #[test]
    fn builder_revalidates_hand_built_certificates() {
        let mut builder = CertificatesBuilder::new(&params());
        let forged = Certificate::DRepRegistration {
            voting_credential: cred(1),
            deposit: 1,
            anchor: None,
        };
        assert!(builder.add(forged).is_err());
        assert!(builder.is_empty());
    }

    #[test]
    fn deposits_and_refunds_are_summed() {
        let p = params();
        let mut builder = CertificatesBuilder::new(&p);
        builder
            .add(Certificate::drep_registration(&p, cred(1), 1_000_000, None).unwrap())
            .unwrap()
            .add(Certificate::stake_registration(&p, cred(2), 2_000_000).unwrap())
            .unwrap()
            .add(Certificate::stake_deregistration(&p, cred(3), 2_000_000).unwrap())
            .unwrap()
            .add(Certificate::vote_delegation(cred(2), DRep::from_credential(&cred(1))))
            .unwrap();
        assert_eq!(builder.len(), 4);
        assert_eq!(builder.total_deposits().unwrap(), 3_000_000);
        assert_eq!(builder.total_refunds().unwrap(), 2_000_000);
    }

    #[test]
    fn drep_registration_encoding() {
        let anchor = Anchor::new("https://a.io", AnchorDataHash::new([0; 32])).unwrap();
        let cert = Certificate::drep_registration(&params(), cred(1), 1_000_000, Some(anchor)).unwrap();
        let bytes = minicbor::to_vec(&cert).unwrap();
        // array(4), uint 16, array(2) credential, uint 0
        assert_eq!(&bytes[..5], &[0x84, 0x10, 0x82, 0x00, 0x58]);

        let bare = Certificate::drep_registration(&params(), cred(1), 1_000_000, None).unwrap();
        let bytes = minicbor::to_vec(&bare).unwrap();
        assert_eq!(*bytes.last().unwrap(), 0xf6);
    }

    #[test]
    fn predefined_dreps_encode_as_single_element_arrays() {
        assert_eq!(minicbor::to_vec(DRep::AlwaysAbstain).unwrap(), vec![0x81, 0x02]);
        assert_eq!(minicbor::to_vec(DRep::AlwaysNoConfidence).unwrap(), vec![0x81, 0x03]);
    }

    #[test]
    fn vote_delegation_encoding() {
        let cert = Certificate::vote_delegation(cred(1), DRep::AlwaysAbstain);
        let bytes = minicbor::to_vec(&cert).unwrap();
        assert_eq!(&bytes[..2], &[0x83, 0x09]);
        assert_eq!(&bytes[bytes.len() - 2..], &[0x81, 0x02]);
    }
}
