use anyhow::{anyhow, Result};
use kaia_payment_engine::{
    db_types::{Order, OrderId},
    payments::{PaymentContext, PaymentError, PaymentOrchestrator, RefundError, RefundOrchestrator},
    traits::{TokenContract, TokenError},
};
use kaia_payment_server::data_objects::InvoiceRequest;
use log::*;

use crate::{
    command_def::{Arguments, Command, InvoiceCommand, InvoiceParams, PayParams, RefundParams},
    formatting::{describe_payment, describe_refund, format_merchant, format_order, format_orders, format_payment_link},
    ledger_client::LedgerClient,
    progress::{follow, spinner},
};

pub async fn handle_command(args: Arguments) -> Result<()> {
    let client = LedgerClient::new(args.server)?;
    match args.command {
        Command::Health => {
            let status = client.health().await?;
            println!("{} says {}", client.server(), status.trim());
        },
        Command::Merchant { wallet } => {
            let auth = client.merchant_auth(&wallet).await?;
            println!("{}", format_merchant(&auth.merchant, auth.is_new)?);
        },
        Command::Invoice(InvoiceCommand::Create(params)) => create_invoice(&client, params).await?,
        Command::Invoice(InvoiceCommand::List { wallet }) => {
            let orders = client.merchant_invoices(&wallet).await?;
            println!("{} orders for {wallet}", orders.len());
            println!("{}", format_orders(&orders));
        },
        Command::Order { id } => {
            let order = fetch_order(&client, &OrderId::new(id)).await?;
            println!("{}", format_order(&order)?);
        },
        Command::Pay(params) => pay(client, params).await?,
        Command::Refund(params) => refund(client, params).await?,
    }
    Ok(())
}

async fn fetch_order(client: &LedgerClient, order_id: &OrderId) -> Result<Order> {
    client.order_by_id(order_id).await?.ok_or_else(|| anyhow!("Order {order_id} does not exist"))
}

async fn create_invoice(client: &LedgerClient, params: InvoiceParams) -> Result<()> {
    let request = InvoiceRequest {
        product_name: Some(params.product),
        total_amount: Some(params.amount),
        currency: params.currency,
        customer_email: params.email,
        description: params.description,
        merchant_wallet: Some(params.wallet),
        expires_in_minutes: params.expires_in_minutes,
    };
    let invoice = client.create_invoice(&request).await?;
    println!("{}", format_order(&invoice.order)?);
    println!("{}", format_payment_link(&client.public_link(&invoice.payment_link)));
    Ok(())
}

async fn pay(client: LedgerClient, params: PayParams) -> Result<()> {
    let order_id = OrderId::new(params.order_id);
    let order = fetch_order(&client, &order_id).await?;
    let token = params.chain.token()?;
    let collector = params.collector.unwrap_or_else(|| order.merchant_wallet.clone());
    println!("Paying {} {} for order {order_id} from {} to {collector}", order.total_amount, order.currency, token.owner());
    let ctx = PaymentContext::new(token.owner().clone(), params.chain.chain_id, collector, token);
    let orchestrator =
        PaymentOrchestrator::new(client).with_confirmation_timeout(params.chain.confirmation_timeout());

    let pb = spinner("Starting payment");
    let tracker = follow(orchestrator.subscribe(), pb.clone(), describe_payment);
    let mut attempts_left = params.chain.retries;
    let result = loop {
        match orchestrator.pay(&ctx, &order_id).await {
            Err(e) if attempts_left > 0 && is_retryable_payment(&e) => {
                attempts_left -= 1;
                warn!("Payment for order {order_id} is not settled yet. {e}. Trying again.");
            },
            result => break result,
        }
    };
    tracker.abort();
    match result {
        Ok(order) => {
            pb.finish_with_message("Payment complete");
            println!("{}", format_order(&order)?);
            Ok(())
        },
        Err(e) => {
            pb.finish_with_message("Payment failed");
            if let Some(pending) = orchestrator.state(&order_id).and_then(|s| s.awaiting) {
                println!("Transaction {} is still pending. Check it before paying again.", pending.hash);
            }
            Err(e.into())
        },
    }
}

async fn refund(client: LedgerClient, params: RefundParams) -> Result<()> {
    let order_id = OrderId::new(params.order_id);
    let order = fetch_order(&client, &order_id).await?;
    let token = params.chain.token()?;
    if token.owner() != &order.merchant_wallet {
        return Err(anyhow!(
            "Order {order_id} was paid to {}. Refunds must be signed with that wallet, not {}",
            order.merchant_wallet,
            token.owner()
        ));
    }
    let orchestrator = RefundOrchestrator::new(client).with_confirmation_timeout(params.chain.confirmation_timeout());

    let pb = spinner("Starting refund");
    let tracker = follow(orchestrator.subscribe(), pb.clone(), describe_refund);
    let mut attempts_left = params.chain.retries;
    let result = loop {
        match orchestrator.refund(&token, &order_id).await {
            Err(e) if attempts_left > 0 && is_retryable_refund(&e) => {
                attempts_left -= 1;
                warn!("Refund of order {order_id} is not settled yet. {e}. Trying again.");
            },
            result => break result,
        }
    };
    tracker.abort();
    match result {
        Ok(order) => {
            pb.finish_with_message("Refund complete");
            println!("{}", format_order(&order)?);
            Ok(())
        },
        Err(e) => {
            pb.finish_with_message("Refund failed");
            Err(e.into())
        },
    }
}

/// A run that timed out waiting for a transaction, or that could not report a confirmed transfer, picks up where it
/// left off when repeated.
fn is_retryable_payment(e: &PaymentError) -> bool {
    matches!(
        e,
        PaymentError::Token { source: TokenError::ConfirmationTimeout(_), .. } | PaymentError::ReconciliationFailed { .. }
    )
}

fn is_retryable_refund(e: &RefundError) -> bool {
    matches!(
        e,
        RefundError::Token { source: TokenError::ConfirmationTimeout(_), .. } | RefundError::ReconciliationFailed { .. }
    )
}
