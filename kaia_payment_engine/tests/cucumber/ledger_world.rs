use std::fmt::Debug;

use cucumber::World;
use kaia_payment_engine::{
    db_types::{Merchant, WalletAddress},
    events::EventProducers,
    test_utils::prepare_env::{create_database, random_db_path, run_migrations},
    MerchantManagement,
    OrderFlowApi,
    SqliteDatabase,
};
use log::*;

#[derive(Default, Debug, World)]
pub struct LedgerWorld {
    pub system: Option<OrderLedgerSystem>,
    pub last_error: Option<String>,
}

pub struct OrderLedgerSystem {
    pub db_path: String,
    pub api: OrderFlowApi<SqliteDatabase>,
}

impl Debug for OrderLedgerSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderLedgerSystem({})", self.db_path)
    }
}

impl LedgerWorld {
    pub fn api(&self) -> &OrderFlowApi<SqliteDatabase> {
        &self.system.as_ref().expect("OrderFlowApi not initialised").api
    }

    pub async fn merchant(&self, wallet: &str) -> Merchant {
        let wallet = WalletAddress::parse(wallet).expect("Not a valid wallet address");
        let (merchant, _) = self.api().db().fetch_or_create_merchant(&wallet).await.expect("Error fetching merchant");
        merchant
    }
}

impl OrderLedgerSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let api = OrderFlowApi::new(db, EventProducers::default());
        Self { db_path: url, api }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
