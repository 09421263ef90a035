//! Merchant-initiated refunds: a direct token transfer of the order total from the merchant wallet back to the
//! customer, followed by `PAID -> REFUNDED` in the ledger.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use log::*;
use tokio::sync::watch;

use crate::{
    db_types::{Order, OrderId, OrderStatusType, WalletAddress},
    order_objects::RefundConfirmation,
    payments::{
        errors::RefundError,
        in_flight::InFlightRegistry,
        payment_orchestrator::DEFAULT_CONFIRMATION_TIMEOUT,
        state::{RefundState, RefundStep},
    },
    traits::{ReconciliationNotifier, TokenContract, TokenError, TxHash, TxOutcome, TxReceipt},
};

pub struct RefundOrchestrator<N> {
    notifier: N,
    in_flight: InFlightRegistry,
    sessions: Arc<Mutex<HashMap<OrderId, RefundState>>>,
    progress: watch::Sender<Option<RefundState>>,
    confirmation_timeout: Duration,
}

impl<N> RefundOrchestrator<N> {
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

    pub fn subscribe(&self) -> watch::Receiver<Option<RefundState>> {
        self.progress.subscribe()
    }

    pub fn state(&self, order_id: &OrderId) -> Option<RefundState> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner).get(order_id).cloned()
    }

    pub fn is_in_flight(&self, order_id: &OrderId) -> bool {
        self.in_flight.is_in_flight(order_id)
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    fn save(&self, state: &RefundState) {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner).insert(state.order_id.clone(), state.clone());
        self.progress.send_replace(Some(state.clone()));
    }

    fn advance(&self, state: &mut RefundState, step: RefundStep) {
        state.step = step;
        state.error = None;
        self.save(state);
    }

    fn fail(&self, state: &mut RefundState, err: RefundError) -> RefundError {
        warn!("↩️ Refund of order [{}] failed. {err}", state.order_id);
        state.step = RefundStep::Error;
        state.error = Some(err.to_string());
        self.save(state);
        err
    }

    fn token_error(&self, state: &mut RefundState, e: TokenError) -> RefundError {
        self.fail(state, RefundError::Token { step: RefundStep::Transferring, source: e })
    }
}

impl<N> RefundOrchestrator<N>
where N: ReconciliationNotifier
{
    /// Refunds `order_id` in full. `token` must be signed by the order's merchant wallet.
    ///
    /// The order must be `PAID`, not refunded before, and have a customer wallet on record; the merchant must hold at
    /// least the order total. Any of these failing rejects the refund with nothing submitted. A failed transfer leaves
    /// the order `PAID`, so the refund can be retried.
    pub async fn refund<T>(&self, token: &T, order_id: &OrderId) -> Result<Order, RefundError>
    where T: TokenContract {
        let _guard =
            self.in_flight.try_acquire(order_id).ok_or_else(|| RefundError::AlreadyInFlight(order_id.clone()))?;
        let mut state = self.state(order_id).unwrap_or_else(|| RefundState::new(order_id.clone()));
        if state.step == RefundStep::Completed && !state.reconciled {
            info!("↩️ The refund for order [{order_id}] is already confirmed. Reporting it to the ledger again");
            return self.reconcile(&mut state).await;
        }
        let order = self.notifier.fetch_order(order_id).await.map_err(RefundError::Ledger)?;
        let customer = validate_refund(token, &order)?;

        let decimals = token.decimals().await.map_err(|e| self.token_error(&mut state, e))?;
        let amount = order.total_amount.to_token_units(decimals)?;
        if amount == 0 {
            return Err(RefundError::Validation(format!("Order {order_id} has nothing to refund")));
        }
        state.amount = amount;

        if let Some(hash) = state.awaiting.clone() {
            info!("↩️ Waiting for earlier refund transfer {hash} of order [{order_id}]");
            let receipt = self.confirm(token, &mut state, &hash).await?;
            return self.complete(&mut state, receipt).await;
        }

        let balance = token.balance_of(token.owner()).await.map_err(|e| self.token_error(&mut state, e))?;
        if balance < amount {
            return Err(RefundError::InsufficientBalance { required: amount, available: balance });
        }

        self.advance(&mut state, RefundStep::Transferring);
        let hash = token.transfer(&customer, amount).await.map_err(|e| self.token_error(&mut state, e))?;
        info!("↩️ Refund transfer {hash} of {amount} units submitted for order [{order_id}]");
        state.refund_tx = Some(hash.clone());
        state.awaiting = Some(hash.clone());
        self.save(&state);
        let receipt = self.confirm(token, &mut state, &hash).await?;
        self.complete(&mut state, receipt).await
    }

    async fn confirm<T: TokenContract>(
        &self,
        token: &T,
        state: &mut RefundState,
        hash: &TxHash,
    ) -> Result<TxReceipt, RefundError> {
        match token.wait_for_confirmation(hash, self.confirmation_timeout).await {
            Ok(TxOutcome::Confirmed(receipt)) => {
                state.awaiting = None;
                self.save(state);
                Ok(receipt)
            },
            Ok(TxOutcome::Failed { reason }) => {
                state.awaiting = None;
                Err(self.fail(state, RefundError::TransactionFailed(reason)))
            },
            Err(e) => Err(self.token_error(state, e)),
        }
    }

    async fn complete(&self, state: &mut RefundState, receipt: TxReceipt) -> Result<Order, RefundError> {
        state.receipt = Some(receipt);
        self.advance(state, RefundStep::Completed);
        info!("↩️ Refund for order [{}] confirmed in block {}", state.order_id, receipt.block_number);
        self.reconcile(state).await
    }

    async fn reconcile(&self, state: &mut RefundState) -> Result<Order, RefundError> {
        let refund_tx = state
            .refund_tx
            .clone()
            .ok_or_else(|| RefundError::Validation("There is no confirmed refund to report".into()))?;
        let refund = RefundConfirmation::new(state.order_id.clone(), &refund_tx);
        match self.notifier.order_refunded(refund).await {
            Ok(order) => {
                state.reconciled = true;
                state.error = None;
                self.save(state);
                Ok(order)
            },
            Err(e) => {
                error!("↩️ Refund {refund_tx} for order [{}] could not be reconciled. {e}", state.order_id);
                state.error = Some(e.to_string());
                self.save(state);
                Err(RefundError::ReconciliationFailed { refund_tx, reason: e.to_string() })
            },
        }
    }
}

/// Checks the refund preconditions and returns the wallet to refund to.
fn validate_refund<T: TokenContract>(token: &T, order: &Order) -> Result<WalletAddress, RefundError> {
    if order.refund_transfer_hash.is_some() || order.status == OrderStatusType::Refunded {
        return Err(RefundError::AlreadyRefunded(order.id.clone()));
    }
    if order.status != OrderStatusType::Paid {
        return Err(RefundError::NotRefundable { order_id: order.id.clone(), status: order.status });
    }
    let customer = order.customer_wallet.clone().ok_or_else(|| RefundError::MissingCustomerWallet(order.id.clone()))?;
    if token.owner() != &order.merchant_wallet {
        return Err(RefundError::Validation(format!(
            "Refunds for order {} must be sent from the merchant wallet {}, not {}",
            order.id,
            order.merchant_wallet,
            token.owner()
        )));
    }
    if let Some(paid_with) = &order.token_address {
        if !paid_with.eq_ignore_ascii_case(token.address().as_str()) {
            return Err(RefundError::Validation(format!(
                "Order {} was paid with token {paid_with}, not {}",
                order.id,
                token.address()
            )));
        }
    }
    Ok(customer)
}
