//! # Certificates & Governance
//!
//! Typed certificates, votes, and proposals. Every deposit-carrying item is
//! checked against the [`ProtocolParameters`](crate::config::ProtocolParameters)
//! when it is constructed and again when it is added to one of the
//! accumulating builders handed to the transaction builder.
//!
//! The model does not track chain state. Whether a DRep being deregistered
//! was ever registered is the caller's concern.

pub mod anchor;
pub mod certificate;
pub mod proposal;
pub mod voting;

pub use anchor::Anchor;
pub use certificate::{Certificate, CertificatesBuilder, DRep};
pub use proposal::{Constitution, GovernanceAction, VotingProposal, VotingProposalBuilder};
pub use voting::{
    GovernanceActionId, Vote, VoteKind, Voter, VotingBuilder, VotingProcedure, VotingProcedures,
};
