use std::time::Duration;

use actix_web::{
    dev::{Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpServer,
};
use futures::{future::ok, FutureExt};
use log::{info, warn};
use storefront_engine::{events::EventProducers, AccountApi, AuthApi, OrderFlowApi, SqliteDatabase};

use crate::{
    config::ServerConfig,
    data_objects::GatewayKey,
    errors::{AuthError, ServerError, ServerError::AuthenticationError},
    helpers::get_remote_ip,
    integrations::{hooks::create_event_handlers, razorpay::RazorpayGateway},
    middleware::AuthenticationMiddlewareFactory,
    routes::{
        health,
        AllOrdersRoute,
        ClaimDownloadRoute,
        CreateOrderRoute,
        GatewayKeyRoute,
        GatewayWebhookRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        OrderHistoryRoute,
        PaymentFailedRoute,
        RefundOrderRoute,
        VerifyPaymentRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway =
        RazorpayGateway::new(config.gateway.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = create_event_handlers();
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, gateway, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: RazorpayGateway,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let verifier = config.signature_verifier();
    let gateway_key = GatewayKey::new(gateway.key_id());
    let proxy = config.proxy_config();
    let currency = config.currency.clone();
    let whitelist = config.webhook_whitelist.clone();
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), gateway.clone(), verifier.clone(), producers.clone())
            .with_currency(currency.clone());
        let accounts_api = AccountApi::new(db.clone());
        let auth_api = AuthApi::new(db.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("sf::access_log"))
            .app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(accounts_api))
            .app_data(web::Data::new(auth_api))
            .app_data(web::Data::new(gateway_key.clone()))
            .app_data(web::Data::new(proxy))
            .service(GatewayKeyRoute::new());
        // Routes that require authentication. `/orders/mine` must be registered before `/orders/{id}`.
        let api_scope = web::scope("/api")
            .wrap(AuthenticationMiddlewareFactory::<SqliteDatabase>::new())
            .service(CreateOrderRoute::<SqliteDatabase, RazorpayGateway>::new())
            .service(VerifyPaymentRoute::<SqliteDatabase, RazorpayGateway>::new())
            .service(PaymentFailedRoute::<SqliteDatabase, RazorpayGateway>::new())
            .service(RefundOrderRoute::<SqliteDatabase, RazorpayGateway>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(OrderHistoryRoute::<SqliteDatabase>::new())
            .service(ClaimDownloadRoute::<SqliteDatabase>::new())
            .service(AllOrdersRoute::<SqliteDatabase>::new());
        let whitelist = whitelist.clone();
        let webhook_scope = web::scope("/webhooks")
            .wrap_fn(move |req, srv| {
                let peer_ip = get_remote_ip(req.request(), proxy);
                let whitelisted = match (peer_ip, &whitelist) {
                    (Some(ip), Some(whitelist)) => {
                        info!("🪝️ Gateway webhook from {ip}");
                        whitelist.contains(&ip)
                    },
                    (_, None) => true,
                    (None, Some(_)) => {
                        warn!("🪝️ No IP address found in webhook request, denying access.");
                        false
                    },
                };
                if whitelisted {
                    srv.call(req)
                } else {
                    warn!("🪝️ Webhook from {peer_ip:?} is not on the whitelist, denying access.");
                    ok(req.error_response(AuthenticationError(AuthError::ForbiddenPeer))).boxed_local()
                }
            })
            .service(GatewayWebhookRoute::<SqliteDatabase, RazorpayGateway>::new());
        app.service(health).service(api_scope).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Malformed bodies get the same `{"error": ...}` treatment as every other failure.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _| ServerError::InvalidRequestBody(err.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _| ServerError::InvalidRequestPath(err.to_string()).into())
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _| ServerError::InvalidRequestPath(err.to_string()).into())
}
