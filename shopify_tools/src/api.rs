use std::sync::Arc;

use graphql_parser::parse_query;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{config::ShopifyConfig, ShopifyApiError};

const MARK_AS_PAID: &str = r#"
mutation orderMarkAsPaid($input: OrderMarkAsPaidInput!) {
  orderMarkAsPaid(input: $input) {
    userErrors { field message }
    order {
      id
      name
      canMarkAsPaid
      displayFinancialStatus
      totalPrice
      totalOutstandingSet { shopMoney { amount currencyCode } }
      transactions(first: 10) {
        id
        kind
        status
        amountSet { shopMoney { amount currencyCode } }
        gateway
        createdAt
      }
    }
  }
}"#;

#[derive(Clone)]
pub struct ShopifyApi {
    config: ShopifyConfig,
    client: Arc<Client>,
}

/// The storefront's view of an order after `orderMarkAsPaid`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAsPaidResult {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub can_mark_as_paid: bool,
    pub display_financial_status: Option<String>,
    pub total_price: Option<String>,
    pub total_outstanding_set: Option<MoneyBag>,
    #[serde(default)]
    pub transactions: Vec<OrderTransaction>,
}

impl MarkAsPaidResult {
    /// The amount still owed, e.g. `0.0 USD` once the order is settled.
    pub fn outstanding(&self) -> Option<String> {
        self.total_outstanding_set.as_ref().map(|m| format!("{} {}", m.shop_money.amount, m.shop_money.currency_code))
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyBag {
    pub shop_money: Money,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    pub amount: String,
    pub currency_code: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTransaction {
    pub id: String,
    pub kind: String,
    pub status: String,
    pub amount_set: Option<MoneyBag>,
    pub gateway: Option<String>,
    pub created_at: Option<String>,
}

impl ShopifyApi {
    pub fn new(config: ShopifyConfig) -> Result<Self, ShopifyApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(config.admin_access_token.reveal().as_str())
            .map_err(|e| ShopifyApiError::Initialization(e.to_string()))?;
        headers.insert("X-Shopify-Access-Token", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ShopifyApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn shop(&self) -> &str {
        &self.config.shop
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        shop: &str,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, ShopifyApiError> {
        let url = self.url(shop, path);
        trace!("🛍️ Sending REST query: {url}");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| ShopifyApiError::RestRequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("🛍️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| ShopifyApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| ShopifyApiError::RestResponseError(e.to_string()))?;
            Err(ShopifyApiError::QueryError { status, message })
        }
    }

    /// Runs a GraphQL query or mutation against `shop`, or against the configured shop if `shop` is `None`.
    pub async fn graphql_query<T: DeserializeOwned>(
        &self,
        shop: Option<&str>,
        query: &str,
        variables: Option<Value>,
    ) -> Result<T, ShopifyApiError> {
        let query = parse_query::<String>(query).map_err(|e| ShopifyApiError::InvalidGraphQL(e.to_string()))?;
        let mut body = serde_json::json!({
            "query": query.to_string(),
        });
        if let Some(vars) = variables {
            body["variables"] = vars;
        }
        let shop = shop.filter(|s| !s.is_empty()).unwrap_or(self.config.shop.as_str());
        if shop.is_empty() {
            return Err(ShopifyApiError::RestRequestError("No shop domain is configured".to_string()));
        }
        trace!("🛍️ Sending GraphQL query to {shop}: {body}");
        let result = self.rest_query::<Value, Value>(shop, Method::POST, "/graphql.json", Some(body)).await?;
        if let Some(errors) = result["errors"].as_array() {
            let e = errors.iter().map(|e| e.to_string()).collect::<Vec<String>>().join(", ");
            return Err(ShopifyApiError::GraphQLError(e));
        }
        let data = result["data"].clone();
        let costs = result["extensions"]["cost"].clone();
        trace!("🛍️ GraphQL response: {data}");
        trace!("🛍️ GraphQL costs: {costs}");
        if data.is_null() {
            return Err(ShopifyApiError::EmptyResponse);
        }
        let result = serde_json::from_value(data).map_err(|e| ShopifyApiError::JsonError(e.to_string()))?;
        Ok(result)
    }

    pub fn url(&self, shop: &str, path: &str) -> String {
        format!("https://{shop}/admin/api/{}{path}", self.config.api_version)
    }

    /// Marks the order with Admin API global id `gid` as paid on the storefront.
    ///
    /// `shop` is the domain the order came from; if it is `None` the configured shop is used.
    pub async fn mark_order_as_paid(&self, shop: Option<&str>, gid: &str) -> Result<MarkAsPaidResult, ShopifyApiError> {
        let variables = serde_json::json!({ "input": { "id": gid } });
        debug!("🛍️ Marking order {gid} as paid");
        let response = self.graphql_query::<Value>(shop, MARK_AS_PAID, Some(variables)).await?;
        let result = mark_as_paid_result(&response)?;
        info!(
            "🛍️ Order {} ({gid}) is marked as paid on Shopify. Total {}, outstanding {}, {} transactions",
            result.name,
            result.total_price.as_deref().unwrap_or("unknown"),
            result.outstanding().unwrap_or_else(|| "unknown".into()),
            result.transactions.len()
        );
        Ok(result)
    }
}

fn mark_as_paid_result(response: &Value) -> Result<MarkAsPaidResult, ShopifyApiError> {
    check_user_errors(&response["orderMarkAsPaid"])?;
    let order = response["orderMarkAsPaid"]["order"].clone();
    if order.is_null() {
        return Err(ShopifyApiError::EmptyResponse);
    }
    serde_json::from_value(order).map_err(|e| ShopifyApiError::JsonError(e.to_string()))
}

fn check_user_errors(payload: &Value) -> Result<(), ShopifyApiError> {
    match payload["userErrors"].as_array() {
        Some(errors) if !errors.is_empty() => {
            let e = errors.iter().map(|e| e.to_string()).collect::<Vec<String>>().join(", ");
            Err(ShopifyApiError::GraphQLError(e))
        },
        _ => Ok(()),
    }
}
