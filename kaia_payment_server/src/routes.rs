//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. For this reason, any long, non-cpu-bound operation (e.g. I/O,
//! database operations, etc.) should be expressed as futures or asynchronous functions.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use kaia_payment_engine::{
    db_types::{Merchant, OrderId, WalletAddress},
    order_objects::{NewInvoice, OrderStatusUpdate},
    traits::PaymentGatewayDatabase,
    MerchantApi,
    OrderFlowApi,
};
use log::*;

use crate::{
    data_objects::{
        InvoiceRequest,
        InvoiceResponse,
        MerchantAuthRequest,
        MerchantAuthResponse,
        MerchantProfileUpdate,
        StatusUpdateResponse,
        WalletQuery,
    },
    errors::ServerError,
    helpers::api_key_from_request,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Merchants  ----------------------------------------------------
route!(merchant_auth => Post "/merchants/auth" impl PaymentGatewayDatabase);
/// Signs a merchant in with their wallet address, registering them on first use.
///
/// The response carries the merchant record, including the API key that storefront plugins use, and `isNew`.
pub async fn merchant_auth<B: PaymentGatewayDatabase>(
    body: web::Json<MerchantAuthRequest>,
    api: web::Data<MerchantApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let wallet = body
        .into_inner()
        .wallet_address
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ServerError::ValidationError("walletAddress is required".into()))?;
    debug!("💻️ POST merchant sign-in for {wallet}");
    let (merchant, is_new) = api.authenticate(&wallet).await?;
    Ok(HttpResponse::Ok().json(MerchantAuthResponse { merchant, is_new }))
}

route!(merchant_profile => Post "/merchants/profile" impl PaymentGatewayDatabase);
pub async fn merchant_profile<B: PaymentGatewayDatabase>(
    req: HttpRequest,
    body: web::Json<MerchantProfileUpdate>,
    api: web::Data<MerchantApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let merchant = merchant_from_request(&req, api.as_ref()).await?;
    debug!("💻️ POST profile update for merchant {}", merchant.wallet_address);
    let MerchantProfileUpdate { name, email } = body.into_inner();
    let merchant = api.update_profile(&merchant.wallet_address, name, email).await?;
    Ok(HttpResponse::Ok().json(merchant))
}

route!(rotate_api_key => Post "/merchants/api-key" impl PaymentGatewayDatabase);
/// Issues a new API key for the calling merchant. The key used to authenticate this call stops working immediately.
pub async fn rotate_api_key<B: PaymentGatewayDatabase>(
    req: HttpRequest,
    api: web::Data<MerchantApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let merchant = merchant_from_request(&req, api.as_ref()).await?;
    debug!("💻️ POST API key rotation for merchant {}", merchant.wallet_address);
    let merchant = api.rotate_api_key(&merchant.wallet_address).await?;
    Ok(HttpResponse::Ok().json(merchant))
}

//----------------------------------------------   Invoices  ----------------------------------------------------
route!(merchant_invoices => Get "/merchants/invoices" impl PaymentGatewayDatabase);
/// Every order, of every type, that pays into the given merchant wallet. Newest first.
pub async fn merchant_invoices<B: PaymentGatewayDatabase>(
    query: web::Query<WalletQuery>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let wallet = WalletAddress::parse(query.wallet.trim())
        .map_err(|e| ServerError::ValidationError(format!("wallet is invalid. {e}")))?;
    debug!("💻️ GET invoices for {wallet}");
    let orders = api.orders_for_merchant(&wallet).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(create_invoice => Post "/merchants/invoices" impl PaymentGatewayDatabase);
pub async fn create_invoice<B: PaymentGatewayDatabase>(
    body: web::Json<InvoiceRequest>,
    api: web::Data<MerchantApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let invoice = NewInvoice::try_from(body.into_inner())?;
    debug!("💻️ POST new invoice for {}", invoice.merchant_wallet);
    let order = api.create_invoice(invoice).await?;
    Ok(HttpResponse::Created().json(InvoiceResponse::from(order)))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(order_by_id => Get "/orders/{order_id}" impl PaymentGatewayDatabase);
pub async fn order_by_id<B: PaymentGatewayDatabase>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::new(path.into_inner());
    debug!("💻️ GET order [{order_id}]");
    let order =
        api.fetch_order(&order_id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id}")))?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_order_status => Post "/orders/update-status" impl PaymentGatewayDatabase);
/// Moves an order to a new status. This is how the payment page reports a confirmed transfer, and how refunds and
/// cancellations are recorded.
pub async fn update_order_status<B: PaymentGatewayDatabase>(
    body: web::Json<OrderStatusUpdate>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let update = body.into_inner();
    info!("💻️ POST status update for order [{}] to {}", update.order_id, update.status);
    let order = api.update_order_status(update).await?;
    Ok(HttpResponse::Ok().json(StatusUpdateResponse { success: true, order }))
}

/// Finds the merchant that owns the API key presented with the request.
pub(crate) async fn merchant_from_request<B: PaymentGatewayDatabase>(
    req: &HttpRequest,
    api: &MerchantApi<B>,
) -> Result<Merchant, ServerError> {
    let api_key = api_key_from_request(req).ok_or(ServerError::InvalidApiKey)?;
    match api.merchant_for_api_key(&api_key).await? {
        Some(merchant) => Ok(merchant),
        None => {
            warn!("💻️ Request to {} with an unknown API key", req.path());
            Err(ServerError::InvalidApiKey)
        },
    }
}
