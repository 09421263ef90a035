use actix_web::{
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use kaia_payment_engine::{events::EventProducers, traits::PaymentGatewayDatabase, MerchantApi, OrderFlowApi};
use log::debug;

use crate::routes::{
    health,
    CreateInvoiceRoute,
    MerchantAuthRoute,
    MerchantInvoicesRoute,
    MerchantProfileRoute,
    OrderByIdRoute,
    RotateApiKeyRoute,
    UpdateOrderStatusRoute,
};

pub const WALLET: &str = "0x742D35Cc6634C0532925a3b844Bc9e7595f0bEb7";

/// Registers the ledger API and both engine APIs on top of `db`.
pub fn configure_api<B: PaymentGatewayDatabase + 'static>(db: B) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(OrderFlowApi::new(db.clone(), EventProducers::default())))
            .app_data(web::Data::new(MerchantApi::new(db)))
            .service(health)
            .service(
                web::scope("/api")
                    .service(MerchantAuthRoute::<B>::new())
                    .service(MerchantProfileRoute::<B>::new())
                    .service(RotateApiKeyRoute::<B>::new())
                    .service(MerchantInvoicesRoute::<B>::new())
                    .service(CreateInvoiceRoute::<B>::new())
                    .service(OrderByIdRoute::<B>::new())
                    .service(UpdateOrderStatusRoute::<B>::new()),
            );
    }
}

pub async fn get_request<F: FnOnce(&mut ServiceConfig)>(path: &str, configure: F) -> (StatusCode, String) {
    send(TestRequest::get().uri(path), configure).await
}

pub async fn post_request<F: FnOnce(&mut ServiceConfig)>(
    path: &str,
    body: &str,
    headers: &[(&str, &str)],
    configure: F,
) -> (StatusCode, String) {
    let mut req = TestRequest::post().uri(path).insert_header(("Content-Type", "application/json"));
    for &(name, value) in headers {
        req = req.insert_header((name, value));
    }
    send(req.set_payload(body.to_string()), configure).await
}

async fn send<F: FnOnce(&mut ServiceConfig)>(req: TestRequest, configure: F) -> (StatusCode, String) {
    let service = test::init_service(App::new().configure(configure)).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => (e.as_response_error().status_code(), e.to_string()),
    }
}
