//! Governance proposals.
//!
//! ```text
//! proposal_procedure = [deposit, reward_account, gov_action, anchor]
//! no_confidence      = [3, prev_action_id / null]
//! new_constitution   = [5, prev_action_id / null, [anchor, script_hash / null]]
//! info_action        = [6]
//! ```

use minicbor::encode::{self, Encode, Encoder, Write};
use serde::Serialize;
use tracing::debug;

use super::anchor::{encode_nullable, Anchor};
use super::certificate::sum;
use super::voting::GovernanceActionId;
use crate::config::ProtocolParameters;
use crate::error::{LedgerError, Result};
use crate::primitives::{Coin, RewardAddress, ScriptHash};

/// A constitution document plus its optional guardrails script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Constitution {
    pub anchor: Anchor,
    pub script_hash: Option<ScriptHash>,
}

impl Constitution {
    pub fn new(anchor: Anchor, script_hash: Option<ScriptHash>) -> Self {
        Self {
            anchor,
            script_hash,
        }
    }
}

impl<C> Encode<C> for Constitution {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> std::result::Result<(), encode::Error<W::Error>> {
        e.array(2)?;
        self.anchor.encode(e, ctx)?;
        encode_nullable(self.script_hash.as_ref(), e, ctx)
    }
}

/// What a proposal asks the chain to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GovernanceAction {
    /// Motion of no confidence in the current committee.
    NoConfidence {
        prev_action_id: Option<GovernanceActionId>,
    },
    /// Replace the constitution.
    NewConstitution {
        prev_action_id: Option<GovernanceActionId>,
        constitution: Constitution,
    },
    /// Purely informational; has no on-chain effect.
    Info,
}

impl GovernanceAction {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoConfidence { .. } => "no confidence",
            Self::NewConstitution { .. } => "new constitution",
            Self::Info => "info",
        }
    }
}

impl<C> Encode<C> for GovernanceAction {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> std::result::Result<(), encode::Error<W::Error>> {
        match self {
            Self::NoConfidence { prev_action_id } => {
                e.array(2)?.u8(3)?;
                encode_nullable(prev_action_id.as_ref(), e, ctx)
            }
            Self::NewConstitution {
                prev_action_id,
                constitution,
            } => {
                e.array(3)?.u8(5)?;
                encode_nullable(prev_action_id.as_ref(), e, ctx)?;
                constitution.encode(e, ctx)
            }
            Self::Info => {
                e.array(1)?.u8(6)?;
                Ok(())
            }
        }
    }
}

/// A governance action submitted with its deposit and the reward account
/// the deposit returns to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VotingProposal {
    action: GovernanceAction,
    anchor: Anchor,
    reward_account: RewardAddress,
    deposit: Coin,
}

impl VotingProposal {
    /// Fails with [`LedgerError::InvalidDeposit`] unless `deposit` equals the
    /// configured proposal deposit.
    pub fn new(
        params: &ProtocolParameters,
        action: GovernanceAction,
        anchor: Anchor,
        reward_account: RewardAddress,
        deposit: Coin,
    ) -> Result<Self> {
        let proposal = Self {
            action,
            anchor,
            reward_account,
            deposit,
        };
        proposal.validate(params)?;
        Ok(proposal)
    }

    pub fn action(&self) -> &GovernanceAction {
        &self.action
    }

    pub fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    pub fn reward_account(&self) -> &RewardAddress {
        &self.reward_account
    }

    pub fn deposit(&self) -> Coin {
        self.deposit
    }

    pub fn validate(&self, params: &ProtocolParameters) -> Result<()> {
        if self.deposit != params.voting_proposal_deposit {
            return Err(LedgerError::InvalidDeposit {
                action: "voting proposal",
                expected: params.voting_proposal_deposit,
                actual: self.deposit,
            });
        }
        Ok(())
    }
}

impl<C> Encode<C> for VotingProposal {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> std::result::Result<(), encode::Error<W::Error>> {
        e.array(4)?.u64(self.deposit)?;
        self.reward_account.encode(e, ctx)?;
        self.action.encode(e, ctx)?;
        self.anchor.encode(e, ctx)
    }
}

/// Validated list of proposals for one transaction.
#[derive(Debug, Clone)]
pub struct VotingProposalBuilder {
    params: ProtocolParameters,
    proposals: Vec<VotingProposal>,
}

impl VotingProposalBuilder {
    pub fn new(params: &ProtocolParameters) -> Self {
        Self {
            params: params.clone(),
            proposals: Vec::new(),
        }
    }

    pub fn add(&mut self, proposal: VotingProposal) -> Result<&mut Self> {
        proposal.validate(&self.params)?;
        debug!(
            action = proposal.action.kind(),
            deposit = proposal.deposit,
            "voting proposal added"
        );
        self.proposals.push(proposal);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    pub fn proposals(&self) -> &[VotingProposal] {
        &self.proposals
    }

    pub fn total_deposits(&self) -> Result<Coin> {
        sum(
            self.proposals.iter().map(VotingProposal::deposit),
            "proposal deposits",
        )
    }
}
