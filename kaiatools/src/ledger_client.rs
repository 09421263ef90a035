use anyhow::{anyhow, Result};
use kaia_payment_engine::{
    db_types::{Order, OrderId, OrderStatusType},
    order_objects::{OrderStatusUpdate, PaymentConfirmation, RefundConfirmation},
    traits::{ReconciliationError, ReconciliationNotifier},
};
use kaia_payment_server::data_objects::{
    InvoiceRequest,
    InvoiceResponse,
    MerchantAuthRequest,
    MerchantAuthResponse,
    StatusUpdateResponse,
};
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

/// An HTTP client for the payment server's ledger API.
///
/// It doubles as the [`ReconciliationNotifier`] for payments and refunds run from the command line, so that confirmed
/// transfers are reported to the server that owns the order.
#[derive(Clone)]
pub struct LedgerClient {
    client: Client,
    server: Url,
}

impl LedgerClient {
    pub fn new(server: Url) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .user_agent("Kaia Payment Gateway Client")
            .default_headers(headers)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client. {e}"))?;
        Ok(Self { client, server })
    }

    pub fn server(&self) -> &str {
        self.server.as_str()
    }

    pub fn url(&self, path: &str) -> Result<Url> {
        self.server.join(path).map_err(|e| anyhow!("Failed to join URL: {e}"))
    }

    /// The server's public payment page for `link`, a path such as `/pay?orderId=inv-1`.
    pub fn public_link(&self, link: &str) -> String {
        self.url(link).map(String::from).unwrap_or_else(|_| link.to_string())
    }

    pub async fn health(&self) -> Result<String> {
        let url = self.url("/health")?;
        let res = self.client.get(url).send().await?;
        Ok(res.text().await?)
    }

    pub async fn merchant_auth(&self, wallet: &str) -> Result<MerchantAuthResponse> {
        let url = self.url("/api/merchants/auth")?;
        let body = MerchantAuthRequest { wallet_address: Some(wallet.to_string()) };
        let res = self.client.post(url).json(&body).send().await?;
        if !res.status().is_success() {
            let msg = error_message(&res.text().await?);
            return Err(anyhow!("Could not sign in merchant {wallet}. {msg}"));
        }
        Ok(res.json().await?)
    }

    pub async fn create_invoice(&self, invoice: &InvoiceRequest) -> Result<InvoiceResponse> {
        let url = self.url("/api/merchants/invoices")?;
        let res = self.client.post(url).json(invoice).send().await?;
        let code = res.status();
        if !code.is_success() {
            let msg = error_message(&res.text().await?);
            return Err(anyhow!("Error {code}. Could not create invoice. {msg}"));
        }
        Ok(res.json().await?)
    }

    pub async fn merchant_invoices(&self, wallet: &str) -> Result<Vec<Order>> {
        let mut url = self.url("/api/merchants/invoices")?;
        url.query_pairs_mut().append_pair("wallet", wallet);
        self.get_request(url).await
    }

    pub async fn order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>> {
        let id = urlencoding::encode(order_id.as_str());
        let url = self.url(&format!("/api/orders/{id}"))?;
        let res = self.client.get(url).send().await?;
        match res.status() {
            StatusCode::OK => Ok(Some(res.json().await?)),
            StatusCode::NOT_FOUND => Ok(None),
            code => {
                let msg = error_message(&res.text().await?);
                Err(anyhow!("Error {code}. Could not fetch order {order_id}. {msg}"))
            },
        }
    }

    pub async fn update_status(&self, update: &OrderStatusUpdate) -> Result<Order, ReconciliationError> {
        let url = self.url("/api/orders/update-status").map_err(|e| ReconciliationError::Unavailable(e.to_string()))?;
        debug!("📡️ Reporting order [{}] as {} to {url}", update.order_id, update.status);
        let res = self
            .client
            .post(url)
            .json(update)
            .send()
            .await
            .map_err(|e| ReconciliationError::Unavailable(e.to_string()))?;
        let code = res.status();
        if !code.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ledger_error(code, &update.order_id, &body));
        }
        let response: StatusUpdateResponse =
            res.json().await.map_err(|e| ReconciliationError::Unavailable(format!("Unexpected response. {e}")))?;
        Ok(response.order)
    }

    async fn get_request<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let path = url.path().to_string();
        let res = self.client.get(url).send().await?;
        match res.status() {
            StatusCode::OK => Ok(res.json().await?),
            code => {
                let msg = error_message(&res.text().await?);
                Err(anyhow!("Error fetching {path}: {code}, {msg}"))
            },
        }
    }
}

impl ReconciliationNotifier for LedgerClient {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Order, ReconciliationError> {
        self.order_by_id(order_id)
            .await
            .map_err(|e| ReconciliationError::Unavailable(e.to_string()))?
            .ok_or_else(|| ReconciliationError::NotFound(order_id.clone()))
    }

    async fn order_paid(&self, payment: PaymentConfirmation) -> Result<Order, ReconciliationError> {
        self.update_status(&paid_update(payment)).await
    }

    async fn order_refunded(&self, refund: RefundConfirmation) -> Result<Order, ReconciliationError> {
        let update = OrderStatusUpdate::new(refund.order_id, OrderStatusType::Refunded)
            .with_refund_transfer_hash(&refund.refund_transfer_hash);
        self.update_status(&update).await
    }
}

pub fn paid_update(payment: PaymentConfirmation) -> OrderStatusUpdate {
    let mut update =
        OrderStatusUpdate::new(payment.order_id, OrderStatusType::Paid).with_transfer_hash(&payment.transfer_hash);
    update.customer_wallet = payment.customer_wallet;
    update.block_number = payment.block_number;
    update.gas_used = payment.gas_used;
    update.token_address = payment.token_address;
    update.payment_method = payment.payment_method;
    update
}

/// The server reports errors as `{"error": "..."}`. Anything else is passed through as-is.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Client errors mean the ledger refused the update and retrying will not help. Server errors might go away.
pub fn ledger_error(code: StatusCode, order_id: &OrderId, body: &str) -> ReconciliationError {
    let message = error_message(body);
    match code {
        StatusCode::NOT_FOUND => ReconciliationError::NotFound(order_id.clone()),
        code if code.is_client_error() => ReconciliationError::Rejected(message),
        code => ReconciliationError::Unavailable(format!("{code}. {message}")),
    }
}

#[cfg(test)]
mod test {
    use kaia_payment_engine::{db_types::WalletAddress, traits::TxHash};

    use super::*;

    #[test]
    fn server_error_bodies() {
        assert_eq!(error_message(r#"{"error":"Order inv-1 cannot move from CANCELLED to PAID"}"#), "Order inv-1 cannot move from CANCELLED to PAID");
        assert_eq!(error_message("Bad Gateway\n"), "Bad Gateway");
        assert_eq!(error_message(r#"{"success":false}"#), r#"{"success":false}"#);
    }

    #[test]
    fn status_codes_map_to_reconciliation_errors() {
        let id = OrderId::from("inv-1");
        assert!(matches!(ledger_error(StatusCode::NOT_FOUND, &id, ""), ReconciliationError::NotFound(o) if o == id));
        let err = ledger_error(StatusCode::CONFLICT, &id, r#"{"error":"Order inv-1 cannot move from EXPIRED to PAID"}"#);
        assert!(matches!(err, ReconciliationError::Rejected(ref m) if m == "Order inv-1 cannot move from EXPIRED to PAID"));
        let err = ledger_error(StatusCode::BAD_GATEWAY, &id, "upstream down");
        assert!(matches!(err, ReconciliationError::Unavailable(ref m) if m.contains("upstream down")));
    }

    #[test]
    fn payment_confirmations_become_status_updates() {
        let customer = WalletAddress::parse("0x1111111111111111111111111111111111111111").unwrap();
        let payment = PaymentConfirmation::new(OrderId::from("inv-7"), &TxHash::from("0xabc"))
            .with_customer_wallet(customer.clone())
            .with_payment_method("stablecoin");
        let update = paid_update(payment);
        assert_eq!(update.status, OrderStatusType::Paid);
        assert_eq!(update.transfer_hash.as_deref(), Some("0xabc"));
        assert_eq!(update.customer_wallet, Some(customer));
        assert_eq!(update.payment_method.as_deref(), Some("stablecoin"));
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["orderId"], "inv-7");
        assert_eq!(json["status"], "PAID");
        assert_eq!(json["transferHash"], "0xabc");
    }

    #[test]
    fn links_are_resolved_against_the_server() {
        let client = LedgerClient::new(Url::parse("http://localhost:8360").unwrap()).unwrap();
        assert_eq!(client.public_link("/pay?orderId=inv-1"), "http://localhost:8360/pay?orderId=inv-1");
    }
}
