//! Votes on governance actions.
//!
//! A [`VotingBuilder`] collects `(voter, action) -> procedure` entries and
//! refuses a second vote by the same voter on the same action. The result
//! encodes as the body's voting procedures map:
//!
//! ```text
//! { voter => { gov_action_id => [vote, anchor / null] } }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use minicbor::encode::{self, Encode, Encoder, Write};
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use tracing::debug;

use super::anchor::{encode_nullable, Anchor};
use crate::error::{LedgerError, Result};
use crate::primitives::{Credential, Ed25519KeyHash, TransactionHash};

/// A yes / no / abstain choice. Encoded as 1 / 0 / 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteKind {
    No,
    Yes,
    Abstain,
}

impl VoteKind {
    fn code(self) -> u8 {
        match self {
            Self::No => 0,
            Self::Yes => 1,
            Self::Abstain => 2,
        }
    }
}

/// The vote itself plus an optional rationale anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VotingProcedure {
    vote: VoteKind,
    anchor: Option<Anchor>,
}

impl VotingProcedure {
    pub fn new(vote: VoteKind) -> Self {
        Self { vote, anchor: None }
    }

    pub fn new_with_anchor(vote: VoteKind, anchor: Anchor) -> Self {
        Self {
            vote,
            anchor: Some(anchor),
        }
    }

    pub fn vote(&self) -> VoteKind {
        self.vote
    }

    pub fn anchor(&self) -> Option<&Anchor> {
        self.anchor.as_ref()
    }
}

impl<C> Encode<C> for VotingProcedure {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> std::result::Result<(), encode::Error<W::Error>> {
        e.array(2)?.u8(self.vote.code())?;
        encode_nullable(self.anchor.as_ref(), e, ctx)
    }
}

/// A credential acting in a governance role.
///
/// Ordering follows the encoded tags, so a map of voters iterates in the
/// same order it serializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "role", content = "credential", rename_all = "snake_case")]
pub enum Voter {
    /// Constitutional committee hot credential (tags 0 / 1).
    ConstitutionalCommitteeHot(Credential),
    /// Delegate representative (tags 2 / 3).
    #[serde(rename = "drep")]
    DRep(Credential),
    /// Stake pool operator, always a key hash (tag 4).
    StakePool(Ed25519KeyHash),
}

impl Voter {
    /// The key that must sign for this voter, if key-based.
    pub fn key_hash(&self) -> Option<Ed25519KeyHash> {
        match self {
            Self::ConstitutionalCommitteeHot(cred) | Self::DRep(cred) => cred.to_keyhash(),
            Self::StakePool(hash) => Some(*hash),
        }
    }
}

impl fmt::Display for Voter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConstitutionalCommitteeHot(cred) => write!(f, "committee/{}", cred),
            Self::DRep(cred) => write!(f, "drep/{}", cred),
            Self::StakePool(hash) => write!(f, "pool/{}", hash),
        }
    }
}

impl<C> Encode<C> for Voter {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut C,
    ) -> std::result::Result<(), encode::Error<W::Error>> {
        let (tag, hash): (u8, &[u8; 28]) = match self {
            Self::ConstitutionalCommitteeHot(cred) => (cred.is_script() as u8, cred.hash_bytes()),
            Self::DRep(cred) => (2 + cred.is_script() as u8, cred.hash_bytes()),
            Self::StakePool(hash) => (4, hash.as_bytes()),
        };
        e.array(2)?.u8(tag)?.bytes(hash)?;
        Ok(())
    }
}

/// Identifies a governance action by the transaction that proposed it and
/// the proposal's position in that transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GovernanceActionId {
    pub transaction_id: TransactionHash,
    pub index: u32,
}

impl GovernanceActionId {
    pub fn new(transaction_id: TransactionHash, index: u32) -> Self {
        Self {
            transaction_id,
            index,
        }
    }
}

impl fmt::Display for GovernanceActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.transaction_id, self.index)
    }
}

impl<C> Encode<C> for GovernanceActionId {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> std::result::Result<(), encode::Error<W::Error>> {
        e.array(2)?;
        self.transaction_id.encode(e, ctx)?;
        e.u32(self.index)?;
        Ok(())
    }
}

/// One vote: who, on what, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    pub voter: Voter,
    pub action_id: GovernanceActionId,
    pub procedure: VotingProcedure,
}

impl Vote {
    pub fn new(voter: Voter, action_id: GovernanceActionId, procedure: VotingProcedure) -> Self {
        Self {
            voter,
            action_id,
            procedure,
        }
    }
}

/// The voting procedures of a transaction body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VotingProcedures(BTreeMap<Voter, BTreeMap<GovernanceActionId, VotingProcedure>>);

impl VotingProcedures {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of individual votes.
    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn get(&self, voter: &Voter, action_id: &GovernanceActionId) -> Option<&VotingProcedure> {
        self.0.get(voter).and_then(|votes| votes.get(action_id))
    }

    pub fn voters(&self) -> impl Iterator<Item = &Voter> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = Vote> + '_ {
        self.0.iter().flat_map(|(voter, votes)| {
            votes
                .iter()
                .map(move |(action_id, procedure)| Vote::new(*voter, *action_id, procedure.clone()))
        })
    }
}

impl Serialize for VotingProcedures {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Entry<'a> {
            voter: &'a Voter,
            action_id: &'a GovernanceActionId,
            procedure: &'a VotingProcedure,
        }

        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for (voter, votes) in &self.0 {
            for (action_id, procedure) in votes {
                seq.serialize_element(&Entry {
                    voter,
                    action_id,
                    procedure,
                })?;
            }
        }
        seq.end()
    }
}

impl<C> Encode<C> for VotingProcedures {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> std::result::Result<(), encode::Error<W::Error>> {
        e.map(self.0.len() as u64)?;
        for (voter, votes) in &self.0 {
            voter.encode(e, ctx)?;
            e.map(votes.len() as u64)?;
            for (action_id, procedure) in votes {
                action_id.encode(e, ctx)?;
                procedure.encode(e, ctx)?;
            }
        }
        Ok(())
    }
}

/// Accumulates votes for one transaction.
#[derive(Debug, Clone, Default)]
pub struct VotingBuilder {
    procedures: VotingProcedures,
}

impl VotingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a vote. Fails with [`LedgerError::DuplicateVote`] if the
    /// voter already voted on `action_id`.
    pub fn add(
        &mut self,
        voter: Voter,
        action_id: GovernanceActionId,
        procedure: VotingProcedure,
    ) -> Result<&mut Self> {
        let votes = self.procedures.0.entry(voter).or_default();
        if votes.contains_key(&action_id) {
            return Err(LedgerError::DuplicateVote {
                voter,
                action: action_id,
            });
        }
        debug!(voter = %voter, action = %action_id, vote = ?procedure.vote(), "vote added");
        votes.insert(action_id, procedure);
        Ok(self)
    }

    pub fn add_vote(&mut self, vote: Vote) -> Result<&mut Self> {
        self.add(vote.voter, vote.action_id, vote.procedure)
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }

    pub fn procedures(&self) -> &VotingProcedures {
        &self.procedures
    }
}
