//! HTTP handlers for the storefront API.
//!
//! Handlers stay thin: they pull the caller out of the [`AuthSession`], hand the request to the engine, and map the
//! result into a response. Anything longer belongs in the engine's `sf_api` module.
//!
//! Every handler is generic over the backend and the payment gateway, which actix cannot register directly. The
//! [`route!`] macro generates a concrete `HttpServiceFactory` per handler so `server.rs` can mount them with the
//! production types and the endpoint tests can mount them with mocks.
//!
//! Routes outside the `/api` scope (health, gateway key, webhooks) never see a session. Routes declared with
//! `requires [...]` are additionally gated by the ACL middleware on the caller's roles.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use storefront_engine::{
    db_types::Role,
    order_objects::{NewOrderRequest, PaymentReceipt, RefundOrderRequest},
    traits::Pagination,
    AccountApi,
    OrderFlowApi,
    OrderLedger,
    PaymentGateway,
    StorefrontDatabase,
};

use crate::{
    auth::AuthSession,
    config::ProxyConfig,
    data_objects::{
        CreateOrderResponse,
        GatewayKey,
        NewOrderParams,
        OrderPageResponse,
        OrderResponse,
        PageParams,
        PaymentFailedParams,
        RefundResponse,
        WebhookResponse,
    },
    errors::ServerError,
    helpers::get_remote_ip,
};

/// The header the gateway signs webhook bodies into.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "X-Razorpay-Signature";

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name);
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

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

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),*])  => {
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
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
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

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(gateway_key => Get "/api/gateway_key");
/// The public key id the checkout widget needs to open a payment. No session is needed, so this is mounted ahead of
/// the authenticated `/api` scope.
pub async fn gateway_key(key: web::Data<GatewayKey>) -> HttpResponse {
    HttpResponse::Ok().json(key.as_ref())
}

route!(create_order => Post "/orders" impl StorefrontDatabase, PaymentGateway);
/// Route handler for order creation.
///
/// Prices the requested items, stores a `pending` order for the caller and mints its counterpart at the gateway.
/// The response carries everything the checkout widget needs to take the payment.
///
/// * 400 if the items fail validation (unknown or inactive product, bad quantity, not enough stock, a zero total,
///   missing billing details).
/// * 502 if the gateway could not be reached. No order is left behind in this case.
pub async fn create_order<B, G>(
    session: AuthSession,
    key: web::Data<GatewayKey>,
    api: web::Data<OrderFlowApi<B, G>>,
    body: web::Json<NewOrderParams>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontDatabase,
    G: PaymentGateway,
{
    let NewOrderParams { items, billing_address } = body.into_inner();
    debug!("💻️ Buyer #{} is placing an order for {} line(s)", session.buyer_id(), items.len());
    let request = NewOrderRequest { buyer_id: session.buyer_id(), items, billing_address };
    let created = api.create_order(request).await.map_err(|e| {
        debug!("💻️ Could not create order for buyer #{}. {e}", session.buyer_id());
        e
    })?;
    info!("💻️ Order {} created for buyer #{}", created.order.order_number, session.buyer_id());
    Ok(HttpResponse::Created().json(CreateOrderResponse::new(created, &key)))
}

route!(verify_payment => Post "/orders/verify" impl StorefrontDatabase, PaymentGateway);
/// Route handler for the client payment callback.
///
/// The body is the signed receipt the checkout widget hands to the client. A receipt with a bad signature fails the
/// order. A receipt for a payment that has already been applied (by an earlier callback or by the webhook) returns the
/// order as it stands.
pub async fn verify_payment<B, G>(
    session: AuthSession,
    api: web::Data<OrderFlowApi<B, G>>,
    body: web::Json<PaymentReceipt>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontDatabase,
    G: PaymentGateway,
{
    let receipt = body.into_inner();
    debug!(
        "💻️ Buyer #{} submitted payment {} for order #{}",
        session.buyer_id(),
        receipt.remote_payment_id,
        receipt.order_id
    );
    let order = api.verify_payment(session.buyer_id(), receipt).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

route!(payment_failed => Post "/orders/payment_failed" impl StorefrontDatabase, PaymentGateway);
pub async fn payment_failed<B, G>(
    session: AuthSession,
    api: web::Data<OrderFlowApi<B, G>>,
    body: web::Json<PaymentFailedParams>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontDatabase,
    G: PaymentGateway,
{
    let PaymentFailedParams { order_id, reason } = body.into_inner();
    debug!("💻️ Buyer #{} reports a failed payment for order #{order_id}", session.buyer_id());
    let order = api.report_payment_failure(session.buyer_id(), order_id, reason).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

//----------------------------------------------   Refunds  -----------------------------------------------------
route!(refund_order => Post "/orders/{id}/refund" impl StorefrontDatabase, PaymentGateway where requires [Role::Admin]);
pub async fn refund_order<B, G>(
    session: AuthSession,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B, G>>,
    body: web::Json<RefundOrderRequest>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontDatabase,
    G: PaymentGateway,
{
    let order_id = path.into_inner();
    info!("💻️ Admin #{} requested a refund for order #{order_id}", session.buyer_id());
    let result = api.refund_order(order_id, body.into_inner()).await.map_err(|e| {
        warn!("💻️ Refund for order #{order_id} failed. {e}");
        e
    })?;
    Ok(HttpResponse::Ok().json(RefundResponse::from(result)))
}

//----------------------------------------------   Orders  ------------------------------------------------------
route!(my_orders => Get "/orders/mine" impl OrderLedger);
pub async fn my_orders<B: OrderLedger>(
    session: AuthSession,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Fetching orders for buyer #{}", session.buyer_id());
    let orders = api.fetch_my_orders(session.buyer_id()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{id}" impl OrderLedger);
/// Buyers can only see their own orders. Admins can see any order.
pub async fn order_by_id<B: OrderLedger>(
    session: AuthSession,
    path: web::Path<i64>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    trace!("💻️ Buyer #{} is fetching order #{order_id}", session.buyer_id());
    let order = api.fetch_order(&session, order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(order_history => Get "/orders/{id}/history" impl OrderLedger where requires [Role::Admin]);
pub async fn order_history<B: OrderLedger>(
    path: web::Path<i64>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let history = api.fetch_status_history(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(history))
}

route!(claim_download => Get "/orders/{id}/download/{product_id}" impl OrderLedger);
pub async fn claim_download<B: OrderLedger>(
    session: AuthSession,
    path: web::Path<(i64, i64)>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (order_id, product_id) = path.into_inner();
    debug!("💻️ Buyer #{} is downloading product #{product_id} from order #{order_id}", session.buyer_id());
    let grant = api.claim_download(session.buyer_id(), order_id, product_id).await?;
    Ok(HttpResponse::Ok().json(grant))
}

route!(all_orders => Get "/admin/orders" impl OrderLedger where requires [Role::Admin]);
pub async fn all_orders<B: OrderLedger>(
    query: web::Query<PageParams>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let PageParams { page, limit } = query.into_inner();
    let pagination = Pagination::new(page, limit);
    trace!("💻️ Fetching page {} of all orders ({} per page)", pagination.page, pagination.limit);
    let page = api.fetch_all_orders(pagination).await?;
    Ok(HttpResponse::Ok().json(OrderPageResponse::from(page)))
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(gateway_webhook => Post "/gateway" impl StorefrontDatabase, PaymentGateway);
/// Route handler for gateway webhooks.
///
/// The body is taken as raw bytes, since the signature in the `X-Razorpay-Signature` header is computed over the exact
/// bytes the gateway sent. Only after the signature checks out is the body decoded.
///
/// Webhooks for orders we do not know about, and events we do not handle, are acknowledged with a 200 so that the
/// gateway stops retrying them.
pub async fn gateway_webhook<B, G>(
    req: HttpRequest,
    body: web::Bytes,
    proxy: web::Data<ProxyConfig>,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontDatabase,
    G: PaymentGateway,
{
    let peer = get_remote_ip(&req, *proxy.as_ref());
    trace!("🪝️ Webhook received from {peer:?}");
    let signature = req
        .headers()
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            warn!("🪝️ Webhook from {peer:?} has no signature. It is rejected.");
            ServerError::InvalidRequestBody(format!("The {WEBHOOK_SIGNATURE_HEADER} header is missing"))
        })?;
    let outcome = api.process_webhook(body.as_ref(), signature).await.map_err(|e| {
        warn!("🪝️ Webhook from {peer:?} was rejected. {e}");
        e
    })?;
    let response = WebhookResponse::from(outcome);
    info!("🪝️ Webhook processed: {} ({})", response.outcome, response.message);
    Ok(HttpResponse::Ok().json(response))
}
