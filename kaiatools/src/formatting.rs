use std::fmt::Write;

use anyhow::Result;
use kaia_payment_engine::{
    db_types::{Merchant, Order},
    payments::{PaymentState, PaymentStep, RefundState, RefundStep, TxKind},
};
use prettytable::{
    format::{LinePosition, LineSeparator, TableFormat},
    row,
    Table,
};
use qrcode::{render::unicode, QrCode};

fn markdown_format() -> TableFormat {
    prettytable::format::FormatBuilder::new()
        .column_separator('|')
        .borders('|')
        .separator(LinePosition::Title, LineSeparator::new('-', '|', '|', '|'))
        .padding(1, 1)
        .build()
}

fn markdown_style(table: &mut Table) {
    table.set_format(markdown_format());
}

pub fn format_merchant(merchant: &Merchant, is_new: bool) -> Result<String> {
    let mut f = String::new();
    let heading = if is_new { "New merchant registered" } else { "Merchant" };
    writeln!(f, "## {heading}")?;
    writeln!(f, "Name:    {}", merchant.name)?;
    writeln!(f, "Wallet:  {}", merchant.wallet_address)?;
    writeln!(f, "Email:   {}", merchant.email.as_deref().unwrap_or("Not given"))?;
    writeln!(f, "API key: {}", merchant.api_key)?;
    writeln!(f, "Since:   {}", merchant.created_at)?;
    Ok(f)
}

pub fn format_orders(orders: &[Order]) -> String {
    if orders.is_empty() {
        return "No orders".to_string();
    }
    let mut table = Table::new();
    table.set_titles(row!["Order id", "Type", "Status", "Amount", "Cur", "Product", "Customer", "Created At"]);
    orders.iter().for_each(|order| {
        table.add_row(row![
            order.id,
            order.order_type,
            order.status,
            r->order.total_amount,
            order.currency,
            order.product_name,
            order.customer_email.as_deref().unwrap_or_default(),
            order.created_at.format("%Y-%m-%d %H:%M")
        ]);
    });
    markdown_style(&mut table);
    format!("{table}\n")
}

pub fn format_order(order: &Order) -> Result<String> {
    let mut f = String::new();
    writeln!(f, "Order id: {:<25} {} order, created {}", order.id.as_str(), order.order_type, order.created_at)?;
    writeln!(f, "[{:^15}]                  Updated {}", order.status.to_string(), order.updated_at)?;
    writeln!(f, "-----------------------------------------------------------------------------")?;
    writeln!(f, "Product:   {}", order.product_name)?;
    if let Some(description) = &order.description {
        writeln!(f, "           {description}")?;
    }
    writeln!(f, "Total:     {} {}", order.total_amount, order.currency)?;
    writeln!(f, "Merchant:  {} ({})", order.merchant_name, order.merchant_wallet)?;
    if let Some(confirmation) = &order.order_confirmation {
        writeln!(f, "Store ref: {confirmation}")?;
    }
    if let Some(email) = &order.customer_email {
        writeln!(f, "Customer:  {email}")?;
    }
    if let Some(expires_at) = order.expires_at {
        writeln!(f, "Expires:   {expires_at}")?;
    }
    if let Some(hash) = &order.transfer_hash {
        writeln!(f, "Paid:      {} by {}", order.paid_at.map(|t| t.to_string()).unwrap_or_default(), hash)?;
        if let Some(wallet) = &order.customer_wallet {
            writeln!(f, "           from {wallet}")?;
        }
        if let Some(block) = order.block_number {
            writeln!(f, "           in block {block}, gas used {}", order.gas_used.unwrap_or_default())?;
        }
    }
    if let Some(hash) = &order.refund_transfer_hash {
        writeln!(f, "Refunded:  {} by {}", order.refunded_at.map(|t| t.to_string()).unwrap_or_default(), hash)?;
    }
    writeln!(f, "-----------------------------------------------------------------------------")?;
    Ok(f)
}

pub fn format_payment_link(link: &str) -> String {
    let code = QrCode::new(link)
        .map(|code| {
            code.render::<unicode::Dense1x2>()
                .dark_color(unicode::Dense1x2::Dark)
                .light_color(unicode::Dense1x2::Light)
                .quiet_zone(false)
                .build()
        })
        .unwrap_or_default();
    format!("Payment link: {link}\n{code}")
}

/// A one-line summary of a payment in progress, for the progress spinner.
pub fn describe_payment(state: &PaymentState) -> String {
    let waiting = state.awaiting.as_ref().map(|tx| {
        let kind = match tx.kind {
            TxKind::Approve => "approval",
            TxKind::Transfer => "transfer",
        };
        format!(" Waiting for {kind} {}", tx.hash)
    });
    match state.step {
        PaymentStep::Idle => format!("Preparing payment for order {}", state.order_id),
        PaymentStep::Approving => format!("Approving {} token units.{}", state.required_amount, waiting.unwrap_or_default()),
        PaymentStep::Approved => "Approved".to_string(),
        PaymentStep::Transferring => {
            format!("Transferring {} token units.{}", state.required_amount, waiting.unwrap_or_default())
        },
        PaymentStep::Completed if state.reconciled => "Payment confirmed and recorded".to_string(),
        PaymentStep::Completed => "Payment confirmed. Updating the ledger".to_string(),
        PaymentStep::Error => format!(
            "Failed while {}: {}",
            state.failed_step.unwrap_or_default(),
            state.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

pub fn describe_refund(state: &RefundState) -> String {
    match state.step {
        RefundStep::Idle => format!("Preparing refund for order {}", state.order_id),
        RefundStep::Transferring => match &state.awaiting {
            Some(hash) => format!("Refunding {} token units. Waiting for {hash}", state.amount),
            None => format!("Refunding {} token units", state.amount),
        },
        RefundStep::Completed if state.reconciled => "Refund confirmed and recorded".to_string(),
        RefundStep::Completed => "Refund confirmed. Updating the ledger".to_string(),
        RefundStep::Error => format!("Refund failed: {}", state.error.as_deref().unwrap_or("unknown error")),
    }
}
