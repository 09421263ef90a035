//! Drives a customer payment for one order: approve the collector (if needed), then transfer the order total.
//!
//! Each run of [`PaymentOrchestrator::pay`] re-reads the on-chain allowance before deciding whether to approve, so a
//! run that is interrupted after a confirmed approval continues with the transfer on the next attempt. A transaction
//! that was submitted but not seen confirmed is remembered and waited for again instead of being resubmitted.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use log::*;
use tokio::sync::watch;

use crate::{
    db_types::{Order, OrderId, OrderStatusType},
    order_objects::PaymentConfirmation,
    payments::{
        errors::PaymentError,
        in_flight::InFlightRegistry,
        state::{PaymentContext, PaymentState, PaymentStep, PendingTx, TxKind},
    },
    traits::{ReconciliationNotifier, TokenContract, TokenError, TxHash, TxOutcome, TxReceipt},
};

pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);
/// Recorded as the order's payment method for wallet payments
pub const WALLET_PAYMENT_METHOD: &str = "stablecoin";

pub struct PaymentOrchestrator<N> {
    notifier: N,
    in_flight: InFlightRegistry,
    sessions: Arc<Mutex<HashMap<OrderId, PaymentState>>>,
    progress: watch::Sender<Option<PaymentState>>,
    confirmation_timeout: Duration,
}

impl<N> PaymentOrchestrator<N> {
    pub fn new(notifier: N) -> Self {
        let (progress, _) = watch::channel(None);
        Self {
            notifier,
            in_flight: InFlightRegistry::default(),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            progress,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }

    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    /// Every state change of every payment is published on this channel.
    pub fn subscribe(&self) -> watch::Receiver<Option<PaymentState>> {
        self.progress.subscribe()
    }

    /// The last known state of the payment for `order_id`, if a payment was attempted in this session.
    pub fn state(&self, order_id: &OrderId) -> Option<PaymentState> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner).get(order_id).cloned()
    }

    pub fn is_in_flight(&self, order_id: &OrderId) -> bool {
        self.in_flight.is_in_flight(order_id)
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    fn session(&self, order_id: &OrderId) -> PaymentState {
        self.state(order_id).unwrap_or_else(|| PaymentState::new(order_id.clone()))
    }

    fn save(&self, state: &PaymentState) {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner).insert(state.order_id.clone(), state.clone());
        self.progress.send_replace(Some(state.clone()));
    }

    fn advance(&self, state: &mut PaymentState, step: PaymentStep) {
        trace!("💸️ Order [{}]: {} -> {step}", state.order_id, state.step);
        state.step = step;
        state.failed_step = None;
        state.error = None;
        self.save(state);
    }

    fn fail(&self, state: &mut PaymentState, step: PaymentStep, err: PaymentError) -> PaymentError {
        warn!("💸️ Payment for order [{}] failed while {step}. {err}", state.order_id);
        state.step = PaymentStep::Error;
        state.failed_step = Some(step);
        state.error = Some(err.to_string());
        self.save(state);
        err
    }
}

impl<N> PaymentOrchestrator<N>
where N: ReconciliationNotifier
{
    /// Pays `order_id` from `ctx.customer_address` to `ctx.collector_address`, and reports the confirmed transfer to
    /// the ledger.
    ///
    /// Nothing is submitted on chain when validation fails or the customer's balance is short. Only one run per order
    /// can be active at a time; a concurrent call fails with [`PaymentError::AlreadyInFlight`].
    ///
    /// If a previous run confirmed the transfer but could not update the ledger, this call only repeats the ledger
    /// update.
    pub async fn pay<T>(&self, ctx: &PaymentContext<T>, order_id: &OrderId) -> Result<Order, PaymentError>
    where T: TokenContract {
        let _guard =
            self.in_flight.try_acquire(order_id).ok_or_else(|| PaymentError::AlreadyInFlight(order_id.clone()))?;
        let mut state = self.session(order_id);
        if state.is_completed() && !state.reconciled {
            info!("💸️ The transfer for order [{order_id}] is already confirmed. Reporting it to the ledger again");
            return self.reconcile(ctx, &mut state).await;
        }
        let order = self.notifier.fetch_order(order_id).await.map_err(PaymentError::Ledger)?;
        validate_payment(ctx, &order)?;

        let decimals = ctx.token.decimals().await.map_err(|e| self.token_error(&mut state, PaymentStep::Approving, e))?;
        let required = order.total_amount.to_token_units(decimals)?;
        if required == 0 {
            return Err(PaymentError::Validation(format!("Order {order_id} has nothing to pay")));
        }
        state.required_amount = required;
        debug!("💸️ Order [{order_id}] requires {required} token units ({} {})", order.total_amount, order.currency);

        if let Some(pending) = state.awaiting.clone() {
            match pending.kind {
                TxKind::Approve => {
                    info!("💸️ Waiting for earlier approval {} of order [{order_id}]", pending.hash);
                    self.confirm(ctx, &mut state, PaymentStep::Approving, &pending.hash).await?;
                },
                TxKind::Transfer => {
                    info!("💸️ Waiting for earlier transfer {} of order [{order_id}]", pending.hash);
                    let receipt = self.confirm(ctx, &mut state, PaymentStep::Transferring, &pending.hash).await?;
                    return self.complete(ctx, &mut state, receipt).await;
                },
            }
        }

        let balance = ctx
            .token
            .balance_of(&ctx.customer_address)
            .await
            .map_err(|e| self.token_error(&mut state, PaymentStep::Approving, e))?;
        if balance < required {
            debug!("💸️ Balance of {} is {balance}, but order [{order_id}] needs {required}", ctx.customer_address);
            return Err(PaymentError::InsufficientBalance { required, available: balance });
        }

        let allowance = self.read_allowance(ctx, &mut state).await?;
        if allowance >= required {
            debug!("💸️ Allowance of {allowance} covers order [{order_id}]. No approval needed");
        } else {
            self.advance(&mut state, PaymentStep::Approving);
            let hash = ctx
                .token
                .approve(&ctx.collector_address, required)
                .await
                .map_err(|e| self.token_error(&mut state, PaymentStep::Approving, e))?;
            info!("💸️ Approval {hash} submitted for order [{order_id}]");
            state.approve_tx = Some(hash.clone());
            state.awaiting = Some(PendingTx { kind: TxKind::Approve, hash: hash.clone() });
            self.save(&state);
            self.confirm(ctx, &mut state, PaymentStep::Approving, &hash).await?;
            // The chain is the source of truth for what was actually approved
            let allowance = self.read_allowance(ctx, &mut state).await?;
            if allowance < required {
                let reason = format!("the allowance is {allowance} after approval, but {required} is required");
                let err = PaymentError::TransactionFailed { step: PaymentStep::Approving, reason };
                return Err(self.fail(&mut state, PaymentStep::Approving, err));
            }
        }
        self.advance(&mut state, PaymentStep::Approved);

        self.advance(&mut state, PaymentStep::Transferring);
        let hash = ctx
            .token
            .transfer(&ctx.collector_address, required)
            .await
            .map_err(|e| self.token_error(&mut state, PaymentStep::Transferring, e))?;
        info!("💸️ Transfer {hash} submitted for order [{order_id}]");
        state.transfer_tx = Some(hash.clone());
        state.awaiting = Some(PendingTx { kind: TxKind::Transfer, hash: hash.clone() });
        self.save(&state);
        let receipt = self.confirm(ctx, &mut state, PaymentStep::Transferring, &hash).await?;
        self.complete(ctx, &mut state, receipt).await
    }

    fn token_error(&self, state: &mut PaymentState, step: PaymentStep, e: TokenError) -> PaymentError {
        self.fail(state, step, PaymentError::Token { step, source: e })
    }

    async fn read_allowance<T: TokenContract>(
        &self,
        ctx: &PaymentContext<T>,
        state: &mut PaymentState,
    ) -> Result<u128, PaymentError> {
        ctx.token
            .allowance(&ctx.customer_address, &ctx.collector_address)
            .await
            .map_err(|e| self.token_error(state, PaymentStep::Approving, e))
    }

    /// Waits for `hash`. A timeout or network error keeps the transaction on record as pending, so that the next run
    /// waits for it again.
    async fn confirm<T: TokenContract>(
        &self,
        ctx: &PaymentContext<T>,
        state: &mut PaymentState,
        step: PaymentStep,
        hash: &TxHash,
    ) -> Result<TxReceipt, PaymentError> {
        debug!("💸️ Waiting for {hash} to be confirmed");
        match ctx.token.wait_for_confirmation(hash, self.confirmation_timeout).await {
            Ok(TxOutcome::Confirmed(receipt)) => {
                debug!("💸️ {hash} confirmed in block {}", receipt.block_number);
                state.awaiting = None;
                self.save(state);
                Ok(receipt)
            },
            Ok(TxOutcome::Failed { reason }) => {
                state.awaiting = None;
                Err(self.fail(state, step, PaymentError::TransactionFailed { step, reason }))
            },
            Err(e) => Err(self.token_error(state, step, e)),
        }
    }

    async fn complete<T: TokenContract>(
        &self,
        ctx: &PaymentContext<T>,
        state: &mut PaymentState,
        receipt: TxReceipt,
    ) -> Result<Order, PaymentError> {
        state.receipt = Some(receipt);
        self.advance(state, PaymentStep::Completed);
        info!("💸️ Payment for order [{}] confirmed in block {}", state.order_id, receipt.block_number);
        self.reconcile(ctx, state).await
    }

    async fn reconcile<T: TokenContract>(
        &self,
        ctx: &PaymentContext<T>,
        state: &mut PaymentState,
    ) -> Result<Order, PaymentError> {
        let transfer_tx = state
            .transfer_tx
            .clone()
            .ok_or_else(|| PaymentError::Validation("There is no confirmed transfer to report".into()))?;
        let mut payment = PaymentConfirmation::new(state.order_id.clone(), &transfer_tx)
            .with_customer_wallet(ctx.customer_address.clone())
            .with_token_address(ctx.token.address())
            .with_payment_method(WALLET_PAYMENT_METHOD);
        if let Some(receipt) = &state.receipt {
            payment = payment.with_receipt(receipt);
        }
        match self.notifier.order_paid(payment).await {
            Ok(order) => {
                state.reconciled = true;
                state.error = None;
                self.save(state);
                info!("💸️ Order [{}] is recorded as {}", order.id, order.status);
                Ok(order)
            },
            Err(e) => {
                error!("💸️ Transfer {transfer_tx} for order [{}] could not be reconciled. {e}", state.order_id);
                state.error = Some(e.to_string());
                self.save(state);
                Err(PaymentError::ReconciliationFailed { transfer_tx, reason: e.to_string() })
            },
        }
    }
}

/// Checks that the order can be paid with this context. Runs before any chain call.
fn validate_payment<T: TokenContract>(ctx: &PaymentContext<T>, order: &Order) -> Result<(), PaymentError> {
    if order.status != OrderStatusType::Pending {
        return Err(PaymentError::Validation(format!("Order {} is {} and cannot be paid", order.id, order.status)));
    }
    if ctx.collector_address != order.merchant_wallet {
        return Err(PaymentError::Validation(format!(
            "The collector address {} is not the merchant wallet {} of order {}",
            ctx.collector_address, order.merchant_wallet, order.id
        )));
    }
    if ctx.token.owner() != &ctx.customer_address {
        return Err(PaymentError::Validation(format!(
            "The connected wallet {} is not the paying customer {}",
            ctx.token.owner(),
            ctx.customer_address
        )));
    }
    if ctx.token.chain_id() != ctx.chain_id {
        return Err(PaymentError::Validation(format!(
            "The token contract is on chain {}, but the payment is for chain {}",
            ctx.token.chain_id(),
            ctx.chain_id
        )));
    }
    if let Some(token) = &order.token_address {
        if !token.eq_ignore_ascii_case(ctx.token.address().as_str()) {
            return Err(PaymentError::Validation(format!(
                "Order {} must be paid with token {token}, not {}",
                order.id,
                ctx.token.address()
            )));
        }
    }
    Ok(())
}
