use chrono::Utc;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::helpers::order_gid;

/// The subset of the Shopify order webhook payload that the gateway reads.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShopifyOrder {
    pub id: i64,
    #[serde(default)]
    pub admin_graphql_api_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    pub currency: String,
    /// Shown to the customer, e.g. `#1001`
    #[serde(default)]
    pub name: String,
    /// e.g. `pending`, `authorized`, `paid`, `refunded`
    #[serde(default)]
    pub financial_status: Option<String>,
    pub total_price: String,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub customer: Option<Customer>,
}

impl ShopifyOrder {
    pub fn is_paid(&self) -> bool {
        self.financial_status.as_deref() == Some("paid")
    }

    /// The product name shown on the payment page: every line item title, in order.
    pub fn product_summary(&self) -> String {
        self.line_items.iter().map(|i| i.title.as_str()).collect::<Vec<_>>().join(", ")
    }

    /// The order's contact email, falling back to the customer record.
    pub fn contact_email(&self) -> Option<String> {
        self.email
            .clone()
            .filter(|e| !e.is_empty())
            .or_else(|| self.customer.as_ref().and_then(|c| c.email.clone()))
            .filter(|e| !e.is_empty())
    }

    /// The Admin API global id, derived from the numeric id when the payload omits it.
    pub fn global_id(&self) -> String {
        self.admin_graphql_api_id.clone().unwrap_or_else(|| order_gid(self.id))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub price: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Builds webhook payloads for tests and local tooling.
#[derive(Debug, Clone, Default)]
pub struct OrderBuilder {
    id: Option<i64>,
    email: Option<String>,
    currency: Option<String>,
    name: Option<String>,
    financial_status: Option<String>,
    total_price: Option<String>,
    line_items: Vec<LineItem>,
    customer: Option<Customer>,
}

impl OrderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&mut self, id: i64) -> &mut Self {
        self.id = Some(id);
        self
    }

    pub fn email(&mut self, email: &str) -> &mut Self {
        self.email = Some(email.to_string());
        self
    }

    pub fn currency(&mut self, currency: &str) -> &mut Self {
        self.currency = Some(currency.to_string());
        self
    }

    pub fn name(&mut self, name: &str) -> &mut Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn financial_status(&mut self, status: &str) -> &mut Self {
        self.financial_status = Some(status.to_string());
        self
    }

    pub fn total_price(&mut self, total_price: &str) -> &mut Self {
        self.total_price = Some(total_price.to_string());
        self
    }

    pub fn line_item(&mut self, title: &str, quantity: i64, price: &str) -> &mut Self {
        let id = self.line_items.len() as i64 + 1;
        self.line_items.push(LineItem { id, title: title.to_string(), quantity, price: price.to_string() });
        self
    }

    pub fn customer(&mut self, customer: Customer) -> &mut Self {
        self.customer = Some(customer);
        self
    }

    pub fn build(&self) -> ShopifyOrder {
        let mut rng = rand::thread_rng();
        #[allow(clippy::cast_possible_wrap)]
        let id = self.id.unwrap_or_else(|| (rng.next_u64() >> 12) as i64);
        let now = Utc::now().to_rfc3339();
        ShopifyOrder {
            id,
            admin_graphql_api_id: Some(order_gid(id)),
            email: self.email.clone(),
            created_at: now.clone(),
            updated_at: Some(now),
            note: None,
            currency: self.currency.clone().unwrap_or_else(|| "USD".to_string()),
            name: self.name.clone().unwrap_or_else(|| format!("#{}", rng.gen_range(1000..10_000))),
            financial_status: self.financial_status.clone(),
            total_price: self.total_price.clone().unwrap_or_else(|| format!("{}.00", rng.gen_range(1..500))),
            line_items: self.line_items.clone(),
            customer: self.customer.clone(),
        }
    }
}
