use cucumber::given;

use crate::cucumber::{ledger_world::OrderLedgerSystem, LedgerWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut LedgerWorld) {
    let system = OrderLedgerSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "a merchant with wallet {word}")]
async fn merchant_signs_in(world: &mut LedgerWorld, wallet: String) {
    let _merchant = world.merchant(&wallet).await;
}
