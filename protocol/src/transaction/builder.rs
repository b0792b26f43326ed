//! Transaction construction via the builder pattern.
//!
//! The [`TransactionBuilder`] accumulates inputs, outputs, certificates,
//! votes, and proposals, prices the result under the linear fee model, and
//! balances it with a change output. `build` checks balance and size limits
//! and returns an immutable [`Transaction`].
//!
//! ## Balance
//!
//! ```text
//! inputs + refunds == outputs + fee + deposits
//! ```
//!
//! Deposits come from registration certificates and proposals; refunds from
//! deregistration certificates.
//!
//! ## State
//!
//! A builder is `Open` until `build` succeeds, then `Built`. Every call on a
//! built builder fails with [`LedgerError::BuilderAlreadyFinalized`]. A
//! failed `build` leaves the builder open so the caller can fix it.
//!
//! The builder does not sign. Fees are sized with one placeholder witness
//! per required signer, so they hold once real signatures are attached.

use std::collections::BTreeSet;

use tracing::{debug, info, trace, warn};

use super::fees::{estimate_fee, min_ada_required, transaction_size};
use super::metadata::AuxiliaryData;
use super::types::{Transaction, TransactionBody, TransactionInput, TransactionOutput, WitnessSet};
use crate::config::{ProtocolParameters, MAX_BALANCE_PASSES};
use crate::error::{LedgerError, Result};
use crate::governance::certificate::sum;
use crate::governance::{
    Certificate, CertificatesBuilder, VotingBuilder, VotingProcedures, VotingProposal,
    VotingProposalBuilder,
};
use crate::primitives::{Address, Coin, Ed25519KeyHash, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuilderState {
    Open,
    Built,
}

/// Fluent builder for a single transaction.
///
/// # Usage
///
/// ```rust,no_run
/// # use conway_tx::config::ProtocolParameters;
/// # use conway_tx::primitives::{Address, Value};
/// # use conway_tx::transaction::{TransactionBuilder, TransactionInput, TransactionOutput};
/// # fn demo(params: &ProtocolParameters, addr: Address, input: TransactionInput)
/// #     -> conway_tx::error::Result<()> {
/// let mut builder = TransactionBuilder::new(params);
/// builder
///     .add_input(&addr, input, Value::new(999_999_999_999))?
///     .add_output(TransactionOutput::new(addr, Value::new(5_000_000)))?;
/// builder.add_change_if_needed(&addr)?;
/// let tx = builder.build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    params: ProtocolParameters,
    state: BuilderState,
    inputs: Vec<(TransactionInput, Value)>,
    input_signers: BTreeSet<Ed25519KeyHash>,
    outputs: Vec<TransactionOutput>,
    fee: Option<Coin>,
    ttl: Option<u64>,
    validity_start_interval: Option<u64>,
    certificates: Vec<Certificate>,
    votes: VotingProcedures,
    proposals: Vec<VotingProposal>,
    auxiliary_data: Option<AuxiliaryData>,
}

impl TransactionBuilder {
    pub fn new(params: &ProtocolParameters) -> Self {
        debug!(
            max_tx_size = params.max_tx_size,
            coins_per_utxo_byte = params.coins_per_utxo_byte,
            "transaction builder opened"
        );
        Self {
            params: params.clone(),
            state: BuilderState::Open,
            inputs: Vec::new(),
            input_signers: BTreeSet::new(),
            outputs: Vec::new(),
            fee: None,
            ttl: None,
            validity_start_interval: None,
            certificates: Vec::new(),
            votes: VotingProcedures::default(),
            proposals: Vec::new(),
            auxiliary_data: None,
        }
    }

    pub fn params(&self) -> &ProtocolParameters {
        &self.params
    }

    pub fn is_built(&self) -> bool {
        self.state == BuilderState::Built
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            BuilderState::Open => Ok(()),
            BuilderState::Built => Err(LedgerError::BuilderAlreadyFinalized),
        }
    }

    /// Marks content as changed. Any fee computed so far no longer matches.
    fn touch(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.fee = None;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Mutators
    // -----------------------------------------------------------------------

    /// Spends `input`, which holds `amount` at `address`.
    ///
    /// The address's payment key, if any, becomes a required signer. Reward
    /// addresses cannot hold spendable outputs and are rejected, as is an
    /// input that was already added.
    pub fn add_input(
        &mut self,
        address: &Address,
        input: TransactionInput,
        amount: Value,
    ) -> Result<&mut Self> {
        self.ensure_open()?;
        let payment = address.payment_credential().ok_or_else(|| {
            LedgerError::malformed("input address", "reward addresses cannot own inputs")
        })?;
        if self.inputs.iter().any(|(existing, _)| *existing == input) {
            return Err(LedgerError::malformed(
                "transaction input",
                format!("{} is already spent by this transaction", input),
            ));
        }
        self.touch()?;
        if let Some(key_hash) = payment.to_keyhash() {
            self.input_signers.insert(key_hash);
        }
        debug!(input = %input, amount = %amount, "input added");
        self.inputs.push((input, amount));
        Ok(self)
    }

    /// Appends an output. Fails with [`LedgerError::OutputBelowMinimum`] if
    /// it carries less than the minimum UTxO value for its size.
    pub fn add_output(&mut self, output: TransactionOutput) -> Result<&mut Self> {
        self.ensure_open()?;
        let required = min_ada_required(&output, self.params.coins_per_utxo_byte)?;
        if output.amount.coin < required {
            return Err(LedgerError::OutputBelowMinimum {
                required,
                provided: output.amount.coin,
            });
        }
        self.touch()?;
        debug!(address = %output.address, amount = %output.amount, "output added");
        self.outputs.push(output);
        Ok(self)
    }

    /// Replaces the certificates. Each is re-checked against this builder's
    /// parameters.
    pub fn set_certificates(&mut self, certs: &CertificatesBuilder) -> Result<&mut Self> {
        self.ensure_open()?;
        for cert in certs.certificates() {
            cert.validate(&self.params)?;
        }
        self.touch()?;
        debug!(count = certs.len(), "certificates set");
        self.certificates = certs.certificates().to_vec();
        Ok(self)
    }

    /// Replaces the voting procedures.
    pub fn set_votes(&mut self, votes: &VotingBuilder) -> Result<&mut Self> {
        self.touch()?;
        debug!(count = votes.len(), "votes set");
        self.votes = votes.procedures().clone();
        Ok(self)
    }

    /// Replaces the proposals. Each deposit is re-checked.
    pub fn set_voting_proposals(&mut self, proposals: &VotingProposalBuilder) -> Result<&mut Self> {
        self.ensure_open()?;
        for proposal in proposals.proposals() {
            proposal.validate(&self.params)?;
        }
        self.touch()?;
        debug!(count = proposals.len(), "voting proposals set");
        self.proposals = proposals.proposals().to_vec();
        Ok(self)
    }

    /// Slot after which the transaction is invalid.
    pub fn set_ttl(&mut self, slot: u64) -> Result<&mut Self> {
        self.touch()?;
        self.ttl = Some(slot);
        Ok(self)
    }

    /// Slot before which the transaction is invalid.
    pub fn set_validity_start_interval(&mut self, slot: u64) -> Result<&mut Self> {
        self.touch()?;
        self.validity_start_interval = Some(slot);
        Ok(self)
    }

    pub fn set_auxiliary_data(&mut self, auxiliary_data: AuxiliaryData) -> Result<&mut Self> {
        self.touch()?;
        self.auxiliary_data = Some(auxiliary_data);
        Ok(self)
    }

    // -----------------------------------------------------------------------
    // Accounting
    // -----------------------------------------------------------------------

    pub fn get_total_input(&self) -> Result<Value> {
        self.inputs
            .iter()
            .try_fold(Value::default(), |acc, (_, amount)| acc.checked_add(amount))
    }

    pub fn get_total_output(&self) -> Result<Value> {
        self.outputs
            .iter()
            .try_fold(Value::default(), |acc, output| acc.checked_add(&output.amount))
    }

    /// Deposits locked by certificates and proposals.
    pub fn implicit_deposits(&self) -> Result<Coin> {
        let certs = sum(
            self.certificates.iter().map(Certificate::deposit),
            "certificate deposits",
        )?;
        let proposals = sum(
            self.proposals.iter().map(VotingProposal::deposit),
            "proposal deposits",
        )?;
        certs
            .checked_add(proposals)
            .ok_or(LedgerError::ValueOverflow("deposits"))
    }

    /// Deposits returned by deregistration certificates.
    pub fn implicit_refunds(&self) -> Result<Coin> {
        sum(
            self.certificates.iter().map(Certificate::refund),
            "certificate refunds",
        )
    }

    /// The fee fixed by [`add_change_if_needed`](Self::add_change_if_needed),
    /// if it still matches the content.
    pub fn get_fee(&self) -> Option<Coin> {
        self.fee
    }

    /// Key hashes that must sign: input payment keys, key-based certificate
    /// credentials, and key-based voters.
    pub fn required_signers(&self) -> BTreeSet<Ed25519KeyHash> {
        let mut signers = self.input_signers.clone();
        signers.extend(
            self.certificates
                .iter()
                .filter_map(|cert| cert.credential().to_keyhash()),
        );
        signers.extend(self.votes.voters().filter_map(|voter| voter.key_hash()));
        signers
    }

    /// Inputs plus refunds.
    fn consumed(&self) -> Result<Value> {
        self.get_total_input()?
            .checked_add(&Value::new(self.implicit_refunds()?))
    }

    /// Outputs plus deposits, without the fee.
    fn produced(&self) -> Result<Value> {
        self.get_total_output()?
            .checked_add(&Value::new(self.implicit_deposits()?))
    }

    // -----------------------------------------------------------------------
    // Fees
    // -----------------------------------------------------------------------

    fn draft_body(&self, fee: Coin, change: Option<&TransactionOutput>) -> TransactionBody {
        let mut outputs = self.outputs.clone();
        outputs.extend(change.cloned());
        TransactionBody {
            inputs: self.inputs.iter().map(|(input, _)| *input).collect(),
            outputs,
            fee,
            ttl: self.ttl,
            certificates: self.certificates.clone(),
            auxiliary_data_hash: self.auxiliary_data.as_ref().map(AuxiliaryData::hash),
            validity_start_interval: self.validity_start_interval,
            voting_procedures: self.votes.clone(),
            proposal_procedures: self.proposals.clone(),
        }
    }

    /// Fee for the current content (plus `change`) with `fee` encoded in the
    /// body.
    fn fee_for(&self, fee: Coin, change: Option<&TransactionOutput>) -> Result<Coin> {
        estimate_fee(
            &self.draft_body(fee, change),
            self.required_signers().len(),
            self.auxiliary_data.as_ref(),
            &self.params.fee_algo,
        )
    }

    /// Smallest fee that covers the current content once signed.
    pub fn min_fee(&self) -> Result<Coin> {
        self.settle_fee(0, None, MAX_BALANCE_PASSES)
    }

    /// Raises `fee` until it covers a body that encodes that same fee, for
    /// at most `max_passes` rounds.
    fn settle_fee(
        &self,
        mut fee: Coin,
        change: Option<&TransactionOutput>,
        max_passes: usize,
    ) -> Result<Coin> {
        for pass in 1..=max_passes {
            let needed = self.fee_for(fee, change)?;
            trace!(pass, fee, needed, "fee pass");
            if needed <= fee {
                return Ok(fee);
            }
            fee = needed;
        }
        Err(LedgerError::UnbalanceableTransaction { passes: max_passes })
    }

    // -----------------------------------------------------------------------
    // Change
    // -----------------------------------------------------------------------

    /// Balances the transaction against `change_address`.
    ///
    /// Returns `true` if a change output was added. If the surplus is too
    /// small to fund an output it is added to the fee and `false` is
    /// returned. Leftover native assets always need a change output; when
    /// the lovelace surplus cannot fund one the result is
    /// [`LedgerError::InsufficientFunds`].
    pub fn add_change_if_needed(&mut self, change_address: &Address) -> Result<bool> {
        self.balance_with_change(change_address, MAX_BALANCE_PASSES)
    }

    fn balance_with_change(&mut self, change_address: &Address, max_passes: usize) -> Result<bool> {
        self.ensure_open()?;

        let consumed = self.consumed()?;
        let produced = self.produced()?;
        let available = consumed.checked_sub(&produced).ok_or(
            LedgerError::InsufficientFunds {
                required: produced.coin,
                available: consumed.coin,
            },
        )?;

        let base_fee = self.settle_fee(0, None, max_passes)?;
        if available.coin < base_fee {
            return Err(LedgerError::InsufficientFunds {
                required: produced.coin.saturating_add(base_fee),
                available: consumed.coin,
            });
        }

        let mut fee = base_fee;
        for pass in 1..=max_passes {
            let change = TransactionOutput::new(
                *change_address,
                Value::new_with_assets(available.coin - fee, available.multiasset.clone()),
            );
            let min_change = min_ada_required(&change, self.params.coins_per_utxo_byte)?;

            if change.amount.coin < min_change {
                let required = produced.coin.saturating_add(fee).saturating_add(min_change);
                return self.burn_surplus(&available, required, &consumed, &produced);
            }

            let needed = self.fee_for(fee, Some(&change))?;
            trace!(pass, fee, needed, change = change.amount.coin, "change pass");
            if needed <= fee {
                debug!(
                    fee,
                    change = %change.amount,
                    address = %change_address,
                    passes = pass,
                    "change output added"
                );
                self.outputs.push(change);
                self.fee = Some(fee);
                return Ok(true);
            }
            if needed > available.coin {
                // The change output cannot pay for its own bytes.
                let required = produced.coin.saturating_add(needed).saturating_add(min_change);
                return self.burn_surplus(&available, required, &consumed, &produced);
            }
            fee = needed;
        }

        Err(LedgerError::UnbalanceableTransaction { passes: max_passes })
    }

    /// Takes the whole lovelace surplus as fee when no change output can be
    /// funded. Fails if native assets are left over, since only a change
    /// output could carry them, or if even the whole surplus does not cover
    /// a body encoding it. `change_required` is the total a change output
    /// would have needed.
    fn burn_surplus(
        &mut self,
        available: &Value,
        change_required: Coin,
        consumed: &Value,
        produced: &Value,
    ) -> Result<bool> {
        if !available.multiasset.is_empty() {
            return Err(LedgerError::InsufficientFunds {
                required: change_required,
                available: consumed.coin,
            });
        }
        let surplus = available.coin;
        let needed = self.fee_for(surplus, None)?;
        if needed > surplus {
            return Err(LedgerError::InsufficientFunds {
                required: produced.coin.saturating_add(needed),
                available: consumed.coin,
            });
        }
        warn!(
            surplus,
            min_fee = needed,
            "surplus below minimum change output, added to fee"
        );
        self.fee = Some(surplus);
        Ok(false)
    }

    // -----------------------------------------------------------------------
    // Build
    // -----------------------------------------------------------------------

    /// Finalizes the transaction.
    ///
    /// Fails if the transaction has no inputs, if consumed value does not
    /// cover outputs, deposits and fee ([`LedgerError::InsufficientFunds`]),
    /// if value is left unspent ([`LedgerError::UnspentSurplus`]), or if the
    /// signed size or any output value exceeds its protocol maximum. On
    /// success the builder is finalized.
    pub fn build(&mut self) -> Result<Transaction> {
        self.ensure_open()?;

        if self.inputs.is_empty() {
            return Err(LedgerError::malformed(
                "transaction inputs",
                "a transaction must spend at least one input",
            ));
        }

        let fee = match self.fee {
            Some(fee) => fee,
            None => self.settle_fee(0, None, MAX_BALANCE_PASSES)?,
        };

        let consumed = self.consumed()?;
        let produced = self
            .produced()?
            .checked_add(&Value::new(fee))?;
        let surplus = consumed
            .checked_sub(&produced)
            .ok_or(LedgerError::InsufficientFunds {
                required: produced.coin,
                available: consumed.coin,
            })?;
        if !surplus.is_zero() {
            return Err(LedgerError::UnspentSurplus {
                surplus: surplus.to_string(),
            });
        }

        let max_value_size = u64::from(self.params.max_value_size);
        for output in &self.outputs {
            let size = output.amount.encoded_size() as u64;
            if size > max_value_size {
                return Err(LedgerError::SizeLimitExceeded {
                    what: "output value",
                    size,
                    max: max_value_size,
                });
            }
        }

        let body = self.draft_body(fee, None);
        let signers = self.required_signers().len();
        let signed = Transaction::new(
            body.clone(),
            WitnessSet::placeholders(signers),
            self.auxiliary_data.clone(),
        );
        let size = transaction_size(&signed) as u64;
        let max_tx_size = u64::from(self.params.max_tx_size);
        if size > max_tx_size {
            return Err(LedgerError::SizeLimitExceeded {
                what: "transaction",
                size,
                max: max_tx_size,
            });
        }

        let tx = Transaction::new(body, WitnessSet::new(), self.auxiliary_data.clone());
        self.state = BuilderState::Built;
        info!(
            tx_hash = %tx.hash(),
            fee,
            inputs = self.inputs.len(),
            outputs = self.outputs.len(),
            signed_size = size,
            "transaction built"
        );
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExUnitPrices, UnitInterval, TESTNET_NETWORK_ID};
    use crate::governance::{
        Anchor, DRep, GovernanceAction, GovernanceActionId, VoteKind, Voter, VotingProcedure,
    };
    use crate::primitives::{
        AnchorDataHash, AssetName, Credential, MultiAsset, PolicyId, RewardAddress,
        TransactionHash,
    };
    use crate::transaction::fees::LinearFee;

    fn params() -> ProtocolParameters {
        ProtocolParameters::builder()
            .fee_algo(LinearFee::new(44, 155_381))
            .coins_per_utxo_word(34_482)
            .pool_deposit(500_000_000)
            .key_deposit(2_000_000)
            .drep_deposit(500_000_000)
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

    fn address() -> Address {
        Address::base(TESTNET_NETWORK_ID, cred(1), cred(2)).unwrap()
    }

    fn input(index: u32) -> TransactionInput {
        TransactionInput::new(TransactionHash::new([0xAB; 32]), index)
    }

    fn funded(amount: Coin) -> TransactionBuilder {
        let mut builder = TransactionBuilder::new(&params());
        builder.add_input(&address(), input(0), Value::new(amount)).unwrap();
        builder
    }

    fn assert_balanced(builder: &TransactionBuilder, tx: &Transaction) {
        let consumed = builder.get_total_input().unwrap().coin + builder.implicit_refunds().unwrap();
        let produced = builder.get_total_output().unwrap().coin
            + builder.implicit_deposits().unwrap()
            + tx.fee();
        assert_eq!(consumed, produced);
    }

    #[test]
    fn change_balances_large_input() {
        let mut builder = funded(999_999_999_999);
        builder
            .add_output(TransactionOutput::new(address(), Value::new(5_000_000)))
            .unwrap();
        assert!(builder.add_change_if_needed(&address()).unwrap());
        let tx = builder.build().unwrap();

        assert_eq!(tx.body().outputs.len(), 2);
        assert_balanced(&builder, &tx);
        assert!(tx.fee() >= 155_381);
    }

    #[test]
    fn fee_covers_signed_size() {
        let mut builder = funded(999_999_999_999);
        builder
            .add_output(TransactionOutput::new(address(), Value::new(5_000_000)))
            .unwrap();
        builder.add_change_if_needed(&address()).unwrap();
        let tx = builder.build().unwrap();

        let signed = Transaction::new(tx.body().clone(), WitnessSet::placeholders(1), None);
        let needed = LinearFee::new(44, 155_381)
            .fee_for_size(transaction_size(&signed))
            .unwrap();
        assert!(tx.fee() >= needed);
        // The fixed point should not overshoot by more than the fee field's
        // own encoding growth.
        assert!(tx.fee() - needed <= 44 * 8);
    }

    #[test]
    fn output_below_minimum_is_rejected() {
        let mut builder = funded(10_000_000);
        let err = builder
            .add_output(TransactionOutput::new(address(), Value::new(1)))
            .unwrap_err();
        assert!(matches!(err, LedgerError::OutputBelowMinimum { provided: 1, .. }));
    }

    #[test]
    fn small_surplus_is_folded_into_fee() {
        let mut builder = funded(10_000_000);
        builder
            .add_output(TransactionOutput::new(address(), Value::new(9_500_000)))
            .unwrap();
        // 500_000 left: enough for the fee, too little for a change output.
        assert!(!builder.add_change_if_needed(&address()).unwrap());
        let tx = builder.build().unwrap();
        assert_eq!(tx.fee(), 500_000);
        assert_eq!(tx.body().outputs.len(), 1);
    }

    #[test]
    fn insufficient_funds_on_change() {
        let mut builder = funded(5_000_000);
        builder
            .add_output(TransactionOutput::new(address(), Value::new(4_990_000)))
            .unwrap();
        let err = builder.add_change_if_needed(&address()).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { available: 5_000_000, .. }));
    }

    #[test]
    fn build_without_funds_fails() {
        let mut builder = funded(3_000_000);
        builder
            .add_output(TransactionOutput::new(address(), Value::new(3_000_000)))
            .unwrap();
        let err = builder.build().unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert!(!builder.is_built());
    }

    #[test]
    fn build_without_change_reports_surplus() {
        let mut builder = funded(100_000_000);
        builder
            .add_output(TransactionOutput::new(address(), Value::new(5_000_000)))
            .unwrap();
        let err = builder.build().unwrap_err();
        assert!(matches!(err, LedgerError::UnspentSurplus { .. }));
    }

    #[test]
    fn mutators_fail_after_build() {
        let mut builder = funded(999_999_999_999);
        builder.add_change_if_needed(&address()).unwrap();
        builder.build().unwrap();
        assert!(builder.is_built());

        let out = TransactionOutput::new(address(), Value::new(5_000_000));
        assert_eq!(builder.add_output(out).unwrap_err(), LedgerError::BuilderAlreadyFinalized);
        assert_eq!(
            builder
                .add_input(&address(), input(1), Value::new(1))
                .unwrap_err(),
            LedgerError::BuilderAlreadyFinalized
        );
        assert_eq!(
            builder.set_ttl(10).unwrap_err(),
            LedgerError::BuilderAlreadyFinalized
        );
        assert_eq!(
            builder.add_change_if_needed(&address()).unwrap_err(),
            LedgerError::BuilderAlreadyFinalized
        );
        assert_eq!(builder.build().unwrap_err(), LedgerError::BuilderAlreadyFinalized);
    }

    #[test]
    fn duplicate_input_rejected() {
        let mut builder = funded(10_000_000);
        let err = builder
            .add_input(&address(), input(0), Value::new(10_000_000))
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::MalformedInput {
                field: "transaction input",
                ..
            }
        ));
    }

    #[test]
    fn reward_address_cannot_fund_input() {
        let mut builder = TransactionBuilder::new(&params());
        let reward: Address = RewardAddress::new(TESTNET_NETWORK_ID, cred(2)).unwrap().into();
        assert!(builder.add_input(&reward, input(0), Value::new(1)).is_err());
    }

    #[test]
    fn mutation_after_change_invalidates_fee() {
        let mut builder = funded(999_999_999_999);
        builder.add_change_if_needed(&address()).unwrap();
        assert!(builder.get_fee().is_some());
        builder.set_ttl(1_000).unwrap();
        assert_eq!(builder.get_fee(), None);
        // The stale change output no longer balances against a fresh fee.
        assert!(builder.build().is_err());
    }

    #[test]
    fn deposits_and_refunds_are_balanced() {
        let p = params();
        let mut certs = CertificatesBuilder::new(&p);
        certs
            .add(Certificate::drep_registration(&p, cred(3), 500_000_000, None).unwrap())
            .unwrap()
            .add(Certificate::stake_deregistration(&p, cred(2), 2_000_000).unwrap())
            .unwrap();

        let mut builder = funded(999_999_999_999);
        builder.set_certificates(&certs).unwrap();
        assert_eq!(builder.implicit_deposits().unwrap(), 500_000_000);
        assert_eq!(builder.implicit_refunds().unwrap(), 2_000_000);
        builder.add_change_if_needed(&address()).unwrap();
        let tx = builder.build().unwrap();
        assert_balanced(&builder, &tx);
        assert_eq!(tx.body().certificates.len(), 2);
    }

    #[test]
    fn signers_include_certificates_and_voters() {
        let p = params();
        let mut certs = CertificatesBuilder::new(&p);
        certs
            .add(Certificate::vote_delegation(cred(2), DRep::AlwaysAbstain))
            .unwrap();
        let mut votes = VotingBuilder::new();
        votes
            .add(
                Voter::DRep(cred(3)),
                GovernanceActionId::new(TransactionHash::new([1; 32]), 0),
                VotingProcedure::new(VoteKind::Yes),
            )
            .unwrap();

        let mut builder = funded(999_999_999_999);
        let before = builder.min_fee().unwrap();
        builder.set_certificates(&certs).unwrap().set_votes(&votes).unwrap();
        let signers = builder.required_signers();
        assert_eq!(signers.len(), 3);
        assert!(signers.contains(&Ed25519KeyHash::new([1; 28])));
        assert!(builder.min_fee().unwrap() > before);
    }

    #[test]
    fn proposal_deposit_is_produced() {
        let p = params();
        let anchor = Anchor::new("https://example.com/p.json", AnchorDataHash::new([4; 32])).unwrap();
        let reward = RewardAddress::new(TESTNET_NETWORK_ID, cred(2)).unwrap();
        let mut proposals = VotingProposalBuilder::new(&p);
        proposals
            .add(
                VotingProposal::new(&p, GovernanceAction::Info, anchor, reward, 500_000_000)
                    .unwrap(),
            )
            .unwrap();

        let mut builder = funded(999_999_999_999);
        builder.set_voting_proposals(&proposals).unwrap();
        builder.add_change_if_needed(&address()).unwrap();
        let tx = builder.build().unwrap();
        assert_balanced(&builder, &tx);
        assert_eq!(tx.body().proposal_procedures.len(), 1);
    }

    #[test]
    fn assets_flow_into_change() {
        let policy = PolicyId::new([7; 28]);
        let name = AssetName::new(b"gov".to_vec()).unwrap();
        let mut assets = MultiAsset::new();
        assets.set(policy, name.clone(), 42);

        let mut builder = TransactionBuilder::new(&params());
        builder
            .add_input(&address(), input(0), Value::new_with_assets(50_000_000, assets))
            .unwrap();
        assert!(builder.add_change_if_needed(&address()).unwrap());
        let tx = builder.build().unwrap();
        let change = tx.body().outputs.last().unwrap();
        assert_eq!(change.amount.multiasset.get(&policy, &name), Some(42));
    }

    #[test]
    fn leftover_assets_without_lovelace_fail() {
        let mut assets = MultiAsset::new();
        assets.set(PolicyId::new([7; 28]), AssetName::new(b"x".to_vec()).unwrap(), 1);

        let mut builder = TransactionBuilder::new(&params());
        builder
            .add_input(&address(), input(0), Value::new_with_assets(1_400_000, assets))
            .unwrap();
        builder
            .add_output(TransactionOutput::new(address(), Value::new(1_200_000)))
            .unwrap();
        let err = builder.add_change_if_needed(&address()).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    }

    #[test]
    fn leftover_assets_when_change_cannot_pay_for_itself() {
        let p = ProtocolParameters {
            coins_per_utxo_byte: 1,
            ..params()
        };
        let mut assets = MultiAsset::new();
        assets.set(PolicyId::new([7; 28]), AssetName::new(b"x".to_vec()).unwrap(), 1);

        // The body does not encode input amounts, so this is the fee of the
        // real transaction without a change output.
        let mut sizing = TransactionBuilder::new(&p);
        sizing.add_input(&address(), input(0), Value::new(1)).unwrap();
        let fee_without_change = sizing.min_fee().unwrap();

        // 1000 lovelace over the fee: above the minimum change output, but
        // below what the change output adds to the fee.
        let mut builder = TransactionBuilder::new(&p);
        builder
            .add_input(
                &address(),
                input(0),
                Value::new_with_assets(fee_without_change + 1_000, assets),
            )
            .unwrap();
        let err = builder.add_change_if_needed(&address()).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(builder.get_fee(), None);
        assert!(builder.get_total_output().unwrap().is_zero());
    }

    #[test]
    fn fee_settling_is_bounded() {
        let mut builder = funded(999_999_999_999);
        // Pass 1 prices a zero fee field, pass 2 widens it, pass 3 confirms.
        assert_eq!(
            builder.settle_fee(0, None, 1).unwrap_err(),
            LedgerError::UnbalanceableTransaction { passes: 1 }
        );
        assert_eq!(
            builder.balance_with_change(&address(), 2).unwrap_err(),
            LedgerError::UnbalanceableTransaction { passes: 2 }
        );
        assert!(builder.outputs.is_empty());
        assert!(builder.balance_with_change(&address(), 3).unwrap());
        let tx = builder.build().unwrap();
        assert_balanced(&builder, &tx);
    }

    #[test]
    fn oversized_transaction_is_rejected() {
        let p = ProtocolParameters {
            max_tx_size: 200,
            ..params()
        };
        let mut builder = TransactionBuilder::new(&p);
        builder.add_input(&address(), input(0), Value::new(999_999_999_999)).unwrap();
        for i in 0..3 {
            builder
                .add_output(TransactionOutput::new(address(), Value::new(2_000_000 + i)))
                .unwrap();
        }
        builder.add_change_if_needed(&address()).unwrap();
        let err = builder.build().unwrap_err();
        assert!(matches!(
            err,
            LedgerError::SizeLimitExceeded {
                what: "transaction",
                max: 200,
                ..
            }
        ));
        assert!(!builder.is_built());
    }

    #[test]
    fn oversized_output_value_is_rejected() {
        let p = ProtocolParameters {
            max_value_size: 8,
            ..params()
        };
        let mut assets = MultiAsset::new();
        assets.set(PolicyId::new([7; 28]), AssetName::new(b"x".to_vec()).unwrap(), 1);
        let mut builder = TransactionBuilder::new(&p);
        builder
            .add_input(&address(), input(0), Value::new_with_assets(999_999_999_999, assets))
            .unwrap();
        builder.add_change_if_needed(&address()).unwrap();
        let err = builder.build().unwrap_err();
        assert!(matches!(err, LedgerError::SizeLimitExceeded { what: "output value", .. }));
    }

    #[test]
    fn auxiliary_data_hash_is_committed() {
        use crate::transaction::metadata::Metadatum;

        let mut aux = AuxiliaryData::new();
        aux.insert(674, Metadatum::text("vote rationale").unwrap()).unwrap();
        let mut builder = funded(999_999_999_999);
        builder.set_auxiliary_data(aux.clone()).unwrap();
        builder.add_change_if_needed(&address()).unwrap();
        let tx = builder.build().unwrap();
        assert_eq!(tx.body().auxiliary_data_hash, Some(aux.hash()));
        assert_eq!(tx.auxiliary_data(), Some(&aux));
    }
}
