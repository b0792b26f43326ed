//! Core transaction types: inputs, outputs, the body, witnesses, and the
//! finalized [`Transaction`].

use std::fmt;

use minicbor::decode::{self, Decode, Decoder};
use minicbor::encode::{self, Encode, Encoder, Write};
use serde::Serialize;

use super::metadata::AuxiliaryData;
use crate::crypto::hash::blake2b_256;
use crate::governance::{Certificate, VotingProcedures, VotingProposal};
use crate::primitives::{
    Address, AuxiliaryDataHash, Coin, Ed25519Signature, PublicKey, TransactionHash, Value,
};

// ---------------------------------------------------------------------------
// Inputs and Outputs
// ---------------------------------------------------------------------------

/// Reference to an output of a previous transaction. Encoded as
/// `[tx_hash, index]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TransactionInput {
    pub transaction_id: TransactionHash,
    pub index: u32,
}

impl TransactionInput {
    pub fn new(transaction_id: TransactionHash, index: u32) -> Self {
        Self {
            transaction_id,
            index,
        }
    }
}

impl fmt::Display for TransactionInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.transaction_id, self.index)
    }
}

impl<C> Encode<C> for TransactionInput {
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

impl<'b, C> Decode<'b, C> for TransactionInput {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> std::result::Result<Self, decode::Error> {
        if d.array()? != Some(2) {
            return Err(decode::Error::message("input must be a 2-element array"));
        }
        let transaction_id = TransactionHash::decode(d, ctx)?;
        let index = d.u32()?;
        Ok(Self {
            transaction_id,
            index,
        })
    }
}

/// An address plus the value sent to it. Encoded as `[address, value]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionOutput {
    pub address: Address,
    pub amount: Value,
}

impl TransactionOutput {
    pub fn new(address: Address, amount: Value) -> Self {
        Self { address, amount }
    }
}

impl<C> Encode<C> for TransactionOutput {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> std::result::Result<(), encode::Error<W::Error>> {
        e.array(2)?;
        self.address.encode(e, ctx)?;
        self.amount.encode(e, ctx)
    }
}

impl<'b, C> Decode<'b, C> for TransactionOutput {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> std::result::Result<Self, decode::Error> {
        if d.array()? != Some(2) {
            return Err(decode::Error::message("output must be a 2-element array"));
        }
        let address = Address::decode(d, ctx)?;
        let amount = Value::decode(d, ctx)?;
        Ok(Self { address, amount })
    }
}

// ---------------------------------------------------------------------------
// Body
// ---------------------------------------------------------------------------

/// The signed-over part of a transaction.
///
/// Optional fields and empty collections are left out of the encoding, so
/// a body with no governance content encodes exactly like a plain payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionBody {
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub fee: Coin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub certificates: Vec<Certificate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auxiliary_data_hash: Option<AuxiliaryDataHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validity_start_interval: Option<u64>,
    #[serde(skip_serializing_if = "VotingProcedures::is_empty")]
    pub voting_procedures: VotingProcedures,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub proposal_procedures: Vec<VotingProposal>,
}

impl TransactionBody {
    /// Blake2b-256 of the encoded body: the transaction id.
    pub fn hash(&self) -> TransactionHash {
        let bytes = super::serializer::encode(self);
        TransactionHash::new(blake2b_256(&bytes))
    }
}

impl<C> Encode<C> for TransactionBody {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> std::result::Result<(), encode::Error<W::Error>> {
        let entries = 3
            + self.ttl.is_some() as u64
            + !self.certificates.is_empty() as u64
            + self.auxiliary_data_hash.is_some() as u64
            + self.validity_start_interval.is_some() as u64
            + !self.voting_procedures.is_empty() as u64
            + !self.proposal_procedures.is_empty() as u64;
        e.map(entries)?;

        e.u8(0)?.array(self.inputs.len() as u64)?;
        for input in &self.inputs {
            input.encode(e, ctx)?;
        }
        e.u8(1)?.array(self.outputs.len() as u64)?;
        for output in &self.outputs {
            output.encode(e, ctx)?;
        }
        e.u8(2)?.u64(self.fee)?;
        if let Some(ttl) = self.ttl {
            e.u8(3)?.u64(ttl)?;
        }
        if !self.certificates.is_empty() {
            e.u8(4)?.array(self.certificates.len() as u64)?;
            for cert in &self.certificates {
                cert.encode(e, ctx)?;
            }
        }
        if let Some(hash) = &self.auxiliary_data_hash {
            e.u8(7)?;
            hash.encode(e, ctx)?;
        }
        if let Some(start) = self.validity_start_interval {
            e.u8(8)?.u64(start)?;
        }
        if !self.voting_procedures.is_empty() {
            e.u8(19)?;
            self.voting_procedures.encode(e, ctx)?;
        }
        if !self.proposal_procedures.is_empty() {
            e.u8(20)?.array(self.proposal_procedures.len() as u64)?;
            for proposal in &self.proposal_procedures {
                proposal.encode(e, ctx)?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Witnesses
// ---------------------------------------------------------------------------

/// A verification key and its signature over the body hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VkeyWitness {
    pub vkey: PublicKey,
    pub signature: Ed25519Signature,
}

impl VkeyWitness {
    pub fn new(vkey: PublicKey, signature: Ed25519Signature) -> Self {
        Self { vkey, signature }
    }

    /// All-zero witness with the exact encoded size of a real one. Used to
    /// size a transaction before it is signed.
    pub fn placeholder() -> Self {
        Self {
            vkey: PublicKey::new([0; 32]),
            signature: Ed25519Signature::new([0; 64]),
        }
    }
}

impl<C> Encode<C> for VkeyWitness {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> std::result::Result<(), encode::Error<W::Error>> {
        e.array(2)?;
        self.vkey.encode(e, ctx)?;
        self.signature.encode(e, ctx)
    }
}

/// Witnesses authorizing a transaction. Encoded as `{0: [vkey_witness]}`,
/// or `{}` when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WitnessSet {
    pub vkeys: Vec<VkeyWitness>,
}

impl WitnessSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// `count` placeholder witnesses.
    pub fn placeholders(count: usize) -> Self {
        Self {
            vkeys: vec![VkeyWitness::placeholder(); count],
        }
    }

    pub fn add_vkey_witness(&mut self, witness: VkeyWitness) {
        self.vkeys.push(witness);
    }

    pub fn is_empty(&self) -> bool {
        self.vkeys.is_empty()
    }
}

impl<C> Encode<C> for WitnessSet {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> std::result::Result<(), encode::Error<W::Error>> {
        if self.vkeys.is_empty() {
            e.map(0)?;
            return Ok(());
        }
        e.map(1)?.u8(0)?.array(self.vkeys.len() as u64)?;
        for witness in &self.vkeys {
            witness.encode(e, ctx)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A finalized transaction: body, witnesses, validity flag, and optional
/// auxiliary data. Encoded as `[body, witness_set, true, aux / null]`.
///
/// Produced by [`TransactionBuilder::build`](super::TransactionBuilder::build)
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    body: TransactionBody,
    witness_set: WitnessSet,
    is_valid: bool,
    auxiliary_data: Option<AuxiliaryData>,
}

impl Transaction {
    pub(crate) fn new(
        body: TransactionBody,
        witness_set: WitnessSet,
        auxiliary_data: Option<AuxiliaryData>,
    ) -> Self {
        Self {
            body,
            witness_set,
            is_valid: true,
            auxiliary_data,
        }
    }

    pub fn body(&self) -> &TransactionBody {
        &self.body
    }

    pub fn witness_set(&self) -> &WitnessSet {
        &self.witness_set
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn auxiliary_data(&self) -> Option<&AuxiliaryData> {
        self.auxiliary_data.as_ref()
    }

    pub fn fee(&self) -> Coin {
        self.body.fee
    }

    /// The transaction id: blake2b-256 of the encoded body.
    pub fn hash(&self) -> TransactionHash {
        self.body.hash()
    }
}

impl<C> Encode<C> for Transaction {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> std::result::Result<(), encode::Error<W::Error>> {
        e.array(4)?;
        self.body.encode(e, ctx)?;
        self.witness_set.encode(e, ctx)?;
        e.bool(self.is_valid)?;
        match &self.auxiliary_data {
            Some(aux) => aux.encode(e, ctx),
            None => {
                e.null()?;
                Ok(())
            }
        }
    }
}
