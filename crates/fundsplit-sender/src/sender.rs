//! Token sender service
//!
//! Holds native value and accepted tokens on behalf of an owner and pushes
//! them out in batches. Every mutating operation is owner-gated.
//!
//! Batches run under a [`FailurePolicy`]. With
//! [`FailurePolicy::AbortForAccounts`] a contract recipient that refuses a
//! delivery is recorded and skipped, while a plain account ends the batch.

use std::sync::Arc;

use fundsplit_common::{
    Address, Amount, EventLog, FailurePolicy, FundError, LedgerEvent, OrderedRemovableSet,
    Result, TransferError, ValueTransfer,
};
use parking_lot::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::report::{BatchReport, Distribution, FailedDistribution, TokenBalance};
use crate::token::{TokenDirectory, TokenLedger};
use crate::{CLAIM_MEMO, DISTRIBUTION_MEMO, MINT_THRESHOLD, NATIVE_TO_TOKEN_RATE, SENDER_NAME};

/// Owner-operated token distribution service
///
/// The sender's own address is the treasury of its value bank.
pub struct TokenSender {
    owner: Address,
    accepted: RwLock<OrderedRemovableSet<Address>>,
    bank: Arc<dyn ValueTransfer>,
    tokens: Arc<dyn TokenDirectory>,
    events: EventLog,
}

impl TokenSender {
    pub fn new(
        owner: Address,
        bank: Arc<dyn ValueTransfer>,
        tokens: Arc<dyn TokenDirectory>,
    ) -> Self {
        Self {
            owner,
            accepted: RwLock::new(OrderedRemovableSet::new()),
            bank,
            tokens,
            events: EventLog::new(SENDER_NAME),
        }
    }

    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }

    pub fn name(&self) -> &'static str {
        SENDER_NAME
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    /// Address holding the sender's native value and tokens
    pub fn address(&self) -> &Address {
        self.bank.treasury()
    }

    fn ensure_owner(&self, caller: &Address) -> Result<()> {
        if caller != &self.owner {
            warn!(%caller, "Rejected call from non-owner");
            return Err(FundError::Unauthorized {
                caller: caller.clone(),
            });
        }
        Ok(())
    }

    /// Resolve an accepted token to its ledger
    fn accepted_ledger(&self, token: &Address) -> Result<Arc<dyn TokenLedger>> {
        if !self.accepted.read().contains(token) {
            return Err(FundError::TokenNotAccepted(token.to_string()));
        }
        self.tokens.resolve(token).ok_or_else(|| {
            FundError::Transfer(TransferError::Unavailable(format!(
                "no ledger registered for {token}"
            )))
        })
    }

    // ============ ACCEPTED TOKENS ============

    /// Allow `token` to be distributed; adding it twice is a no-op
    #[instrument(skip(self))]
    pub fn add_accepted_token(&self, caller: &Address, token: &Address) -> Result<()> {
        self.ensure_owner(caller)?;
        if !token.is_contract() {
            return Err(FundError::NotAContract(token.to_string()));
        }

        if self.accepted.write().add(token.clone()) {
            info!(%token, "Token accepted");
        }
        Ok(())
    }

    /// Stop accepting `token`; the last accepted token takes its slot
    #[instrument(skip(self))]
    pub fn remove_accepted_token(&self, caller: &Address, token: &Address) -> Result<()> {
        self.ensure_owner(caller)?;
        self.accepted.write().remove(token)?;
        info!(%token, "Token no longer accepted");
        Ok(())
    }

    pub fn accepted_tokens(&self) -> Vec<Address> {
        self.accepted.read().as_slice().to_vec()
    }

    // ============ BATCHES ============

    /// Transfer `distributions` of `token` from the sender's holdings
    #[instrument(skip(self, distributions), fields(entries = distributions.len()))]
    pub async fn distribute_token(
        &self,
        caller: &Address,
        token: &Address,
        distributions: &[Distribution],
        policy: FailurePolicy,
    ) -> Result<BatchReport> {
        self.ensure_owner(caller)?;
        let ledger = self.accepted_ledger(token)?;

        let mut report = BatchReport::default();
        for entry in distributions {
            let outcome = ledger
                .transfer(self.address(), &entry.address, entry.value, DISTRIBUTION_MEMO)
                .await;
            self.settle(token, entry, outcome, policy, &mut report)?;
        }

        info!(
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "Token distribution complete"
        );
        Ok(report)
    }

    /// Mint `token` to each recipient, paying the token contract
    /// `value / NATIVE_TO_TOKEN_RATE` native units per mint
    ///
    /// Entries at or below [`MINT_THRESHOLD`] are skipped.
    #[instrument(skip(self, distributions), fields(entries = distributions.len()))]
    pub async fn mint_and_distribute(
        &self,
        caller: &Address,
        token: &Address,
        distributions: &[Distribution],
        policy: FailurePolicy,
    ) -> Result<BatchReport> {
        self.ensure_owner(caller)?;
        let ledger = self.accepted_ledger(token)?;

        let mut report = BatchReport::default();
        for entry in distributions {
            if entry.value <= MINT_THRESHOLD {
                debug!(to = %entry.address, value = entry.value, "Below mint threshold");
                report.skipped.push(entry.clone());
                continue;
            }

            let outcome = self.mint_one(token, ledger.as_ref(), entry).await?;
            self.settle(token, entry, outcome, policy, &mut report)?;
        }

        info!(
            delivered = report.delivered.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Mint distribution complete"
        );
        Ok(report)
    }

    /// Pay the token contract for one entry and mint it
    ///
    /// A failed mint refunds the payment before the failure is reported.
    /// The outer error is a refund that did not go through.
    async fn mint_one(
        &self,
        token: &Address,
        ledger: &dyn TokenLedger,
        entry: &Distribution,
    ) -> Result<std::result::Result<(), TransferError>> {
        let native = entry.value / NATIVE_TO_TOKEN_RATE;
        if let Err(err) = self.bank.transfer(token, native).await {
            return Ok(Err(err));
        }

        match ledger.mint(&entry.address, entry.value, native).await {
            Ok(()) => Ok(Ok(())),
            Err(err) => {
                if let Err(refund_err) = self.bank.refund(token, native).await {
                    error!(%token, native, error = %refund_err, "Mint payment refund failed");
                    return Err(FundError::Transfer(refund_err));
                }
                debug!(%token, native, error = %err, "Mint failed, payment refunded");
                Ok(Err(err))
            }
        }
    }

    /// Apply one delivery outcome to the report under `policy`
    fn settle(
        &self,
        token: &Address,
        entry: &Distribution,
        outcome: std::result::Result<(), TransferError>,
        policy: FailurePolicy,
        report: &mut BatchReport,
    ) -> Result<()> {
        match outcome {
            Ok(()) => {
                self.events.emit(LedgerEvent::TokenDistributed {
                    token: token.clone(),
                    to: entry.address.clone(),
                    value: entry.value,
                });
                report.delivered.push(entry.clone());
                Ok(())
            }
            Err(err) => {
                self.events.emit(LedgerEvent::TransferFailed {
                    destination: entry.address.clone(),
                    amount: entry.value,
                    reason: err.to_string(),
                });

                if policy.aborts_on(&entry.address) {
                    warn!(to = %entry.address, %policy, error = %err, "Batch aborted");
                    return Err(FundError::BatchAborted {
                        delivered: report.delivered.len(),
                        to: entry.address.clone(),
                        source: err,
                    });
                }

                report.failed.push(FailedDistribution {
                    distribution: entry.clone(),
                    reason: err.to_string(),
                });
                Ok(())
            }
        }
    }

    // ============ DEPOSITS ============

    /// Check a token deposit into the sender
    ///
    /// Only accepted tokens sent by the owner are taken.
    pub fn token_fallback(&self, token: &Address, from: &Address, value: Amount) -> Result<()> {
        if !self.accepted.read().contains(token) {
            return Err(FundError::TokenNotAccepted(token.to_string()));
        }
        self.ensure_owner(from)?;
        debug!(%token, value, "Token deposit accepted");
        Ok(())
    }

    /// Acknowledge native value sent to the sender by `caller`
    pub fn receive_native(&self, caller: &Address, value: Amount) -> Result<()> {
        self.ensure_owner(caller)?;
        self.events.emit(LedgerEvent::FundReceived { value });
        Ok(())
    }

    // ============ CLAIMS ============

    /// Send native value back to the owner; `amount == 0` claims everything
    #[instrument(skip(self))]
    pub async fn claim_native(&self, caller: &Address, amount: Amount) -> Result<Amount> {
        self.ensure_owner(caller)?;

        let available = self.bank.balance_of(self.address()).await;
        let claim = if amount == 0 { available } else { amount };
        if claim > available {
            return Err(FundError::InvalidAmount(format!(
                "claim of {claim} exceeds balance {available}"
            )));
        }

        self.bank.transfer(&self.owner, claim).await?;
        info!(claim, "Native value claimed");
        Ok(claim)
    }

    /// Send `token` back to the owner; `amount == 0` claims everything
    #[instrument(skip(self))]
    pub async fn claim_token(
        &self,
        caller: &Address,
        token: &Address,
        amount: Amount,
    ) -> Result<Amount> {
        self.ensure_owner(caller)?;
        let ledger = self.accepted_ledger(token)?;

        let available = ledger.balance_of(self.address()).await;
        let claim = if amount == 0 { available } else { amount };
        if claim > available {
            return Err(FundError::InvalidAmount(format!(
                "claim of {claim} exceeds balance {available}"
            )));
        }

        ledger
            .transfer(self.address(), &self.owner, claim, CLAIM_MEMO)
            .await?;
        info!(claim, "Tokens claimed");
        Ok(claim)
    }

    // ============ REPORTING ============

    /// Name and sender-held balance of every accepted token, in order
    pub async fn token_balances(&self) -> Result<Vec<TokenBalance>> {
        let tokens = self.accepted_tokens();

        let mut balances = Vec::with_capacity(tokens.len());
        for token in tokens {
            let ledger = self.accepted_ledger(&token)?;
            balances.push(TokenBalance {
                name: ledger.name().await,
                balance: ledger.balance_of(self.address()).await,
                address: token,
            });
        }
        Ok(balances)
    }
}
